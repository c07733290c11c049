pub mod aggregator;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod history;
pub mod metrics;
pub mod web_config;

pub use error::{ExporterError, Result};
