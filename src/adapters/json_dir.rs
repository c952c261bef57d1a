use crate::adapters::firestore::OPENED_IDS_FIELD;
use crate::domain::ports::UsageStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Usage documents exported as `<dir>/<YYYY-MM-DD>.json`, each holding an `openedIDs` list.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl UsageStore for JsonDirStore {
    async fn opened_ids(&self, date: &str) -> Result<Option<Vec<String>>> {
        let path = self.dir.join(format!("{}.json", date));

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EtlError::DataStoreError {
                    message: format!("{}: {}", path.display(), e),
                })
            }
        };

        let document: Value =
            serde_json::from_slice(&data).map_err(|e| EtlError::DataStoreError {
                message: format!("{}: {}", path.display(), e),
            })?;

        let ids = match document.get(OPENED_IDS_FIELD) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Some(ids))
    }
}
