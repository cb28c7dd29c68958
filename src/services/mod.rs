//! Collaborator interfaces consumed by the pipeline

pub mod market_data;

pub use market_data::{InMemoryMarketData, RetryingProvider, SeriesProvider, UniverseProvider};
