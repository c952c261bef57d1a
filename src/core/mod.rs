pub mod enrich;
pub mod etl;
pub mod extract;
pub mod usage;

pub use crate::domain::model::{EnrichmentReport, IdColumn, OutputRow, RowOutcome, UsageMap};
pub use crate::domain::ports::{Pipeline, Storage, StudentDirectory, UsageStore};
pub use crate::utils::error::Result;
