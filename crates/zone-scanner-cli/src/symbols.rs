use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StockRow {
    #[serde(rename = "YahooSymbol")]
    yahoo_symbol: Option<String>,
    #[serde(rename = "Sector", default)]
    sector: Option<String>,
}

/// Canonical form of a ticker, used for cache file names.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Load Yahoo symbols from a stock list CSV (`YahooSymbol`, optional `Sector`).
/// With `sectors` given, only rows in one of those sectors are kept.
pub fn load_symbols(path: &Path, sectors: Option<&[String]>) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open symbol list {}", path.display()))?;
    read_symbols(file, sectors)
        .with_context(|| format!("failed to read symbol list {}", path.display()))
}

fn read_symbols<R: Read>(reader: R, sectors: Option<&[String]>) -> Result<Vec<String>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut symbols = Vec::new();

    for row in csv.deserialize::<StockRow>() {
        let row = row?;
        if let Some(wanted) = sectors {
            let in_sector = row
                .sector
                .as_deref()
                .is_some_and(|s| wanted.iter().any(|w| w.eq_ignore_ascii_case(s.trim())));
            if !in_sector {
                continue;
            }
        }

        if let Some(symbol) = row.yahoo_symbol.as_deref().map(normalize_symbol)
            && !symbol.is_empty()
            && !symbols.contains(&symbol)
        {
            symbols.push(symbol);
        }
    }

    Ok(symbols)
}
