use crate::core::{IdColumn, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

pub const DEFAULT_KEY_PATH: &str = "data";
pub const DEFAULT_COLUMN: &str = "STUDENT_ID";

/// Pulls `column` out of every object in the `key_path` list of `document`.
///
/// A missing list yields an empty column. Elements without the column, or
/// with a `null` value, are skipped.
pub fn project_column(document: &Value, key_path: &str, column: &str) -> Result<IdColumn> {
    let mut ids = IdColumn {
        header: column.to_string(),
        values: Vec::new(),
    };

    let records = match document.get(key_path) {
        None => {
            tracing::warn!("No '{}' field in input document, writing header only", key_path);
            return Ok(ids);
        }
        Some(Value::Array(records)) => records,
        Some(other) => {
            return Err(EtlError::ParseError {
                source_name: format!("field '{}'", key_path),
                message: format!("expected a list, found {}", json_type(other)),
            });
        }
    };

    for record in records {
        match record.get(column) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => ids.values.push(s.clone()),
            Some(other) => ids.values.push(other.to_string()),
        }
    }

    Ok(ids)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

pub fn render_id_csv(ids: &IdColumn) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([ids.header.as_str()])?;
    for id in &ids.values {
        writer.write_record([id.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

pub struct IdExtractor<S: Storage> {
    storage: S,
    input_path: String,
    output_path: String,
    key_path: String,
    column: String,
}

impl<S: Storage> IdExtractor<S> {
    pub fn new(storage: S, input_path: impl Into<String>, output_path: impl Into<String>) -> Self {
        Self {
            storage,
            input_path: input_path.into(),
            output_path: output_path.into(),
            key_path: DEFAULT_KEY_PATH.to_string(),
            column: DEFAULT_COLUMN.to_string(),
        }
    }

    pub fn with_key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = key_path.into();
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for IdExtractor<S> {
    type Extracted = Value;
    type Transformed = IdColumn;

    async fn extract(&self) -> Result<Value> {
        let data = self.storage.read_file(&self.input_path).await?;
        serde_json::from_slice(&data).map_err(|e| EtlError::ParseError {
            source_name: self.input_path.clone(),
            message: e.to_string(),
        })
    }

    async fn transform(&self, data: Value) -> Result<IdColumn> {
        project_column(&data, &self.key_path, &self.column)
    }

    async fn load(&self, result: IdColumn) -> Result<String> {
        let csv_data = render_id_csv(&result)?;
        self.storage.write_file(&self.output_path, &csv_data).await?;
        println!(
            "Successfully created CSV file: {} with {} records.",
            self.output_path,
            result.values.len()
        );
        Ok(self.output_path.clone())
    }
}
