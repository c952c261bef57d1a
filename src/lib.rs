pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{EnrichArgs, ExtractArgs};

pub use config::cli::LocalStorage;
pub use core::{enrich::EnrichmentPipeline, etl::EtlEngine, extract::IdExtractor};
pub use utils::error::{EtlError, Result};
