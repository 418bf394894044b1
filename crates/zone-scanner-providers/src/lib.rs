pub mod error;
pub mod provider;
pub mod yahoo;

pub use error::ProviderError;
pub use provider::SeriesProvider;
pub use yahoo::YahooProvider;
