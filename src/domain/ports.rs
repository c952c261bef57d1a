use crate::domain::model::{ClassificationRecord, DegreeRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Appends to `path`, creating it when missing.
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Remote source of per-student academic records for the current term.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn degrees(&self, student_id: &str) -> Result<Vec<DegreeRecord>>;

    /// `Ok(None)` when the API answered but holds no classification for the student.
    async fn classification(&self, student_id: &str) -> Result<Option<ClassificationRecord>>;
}

/// Per-day documents listing the students who opened the app that day.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// `Ok(None)` when no document exists for `date` (`YYYY-MM-DD`).
    async fn opened_ids(&self, date: &str) -> Result<Option<Vec<String>>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
