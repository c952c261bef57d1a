use crate::core::{EnrichmentReport, OutputRow, Pipeline, RowOutcome, Storage, StudentDirectory, UsageMap};
use crate::domain::model::{Category, NOT_APPLICABLE};
use crate::domain::services::{apply_identical_college_correction, classify_degrees, resolve_year};
use crate::utils::error::{EtlError, Result};

pub const OUTPUT_HEADER: [&str; 6] = [
    "STUDENT_ID",
    "CLASSIFICATION",
    "PRIMARY_COLLEGE",
    "SECONDARY_COLLEGE",
    "HC_OR_COE",
    "USAGE_OVER_LAST_90_DAYS",
];

/// Builds the output row for one student, or the reason no row is written.
///
/// Transport and missing-data failures become skip outcomes; anything else
/// is returned as an error and stops the batch.
pub async fn enrich_student<D: StudentDirectory + ?Sized>(
    directory: &D,
    usage: &UsageMap,
    student_id: &str,
) -> Result<RowOutcome> {
    let usage_count = usage.count(student_id);

    match build_row(directory, student_id, usage_count).await {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_row_recoverable() => {
            tracing::warn!("Could not process student ID {}: {}", student_id, e);
            let reason = e.to_string();
            Ok(match e {
                EtlError::MissingDataError { .. } => RowOutcome::SkippedMissingData(reason),
                _ => RowOutcome::SkippedTransportError(reason),
            })
        }
        Err(e) => Err(e),
    }
}

async fn build_row<D: StudentDirectory + ?Sized>(
    directory: &D,
    student_id: &str,
    usage_count: u32,
) -> Result<RowOutcome> {
    let degrees = directory.degrees(student_id).await?;
    let mut department = classify_degrees(&degrees);

    if department.category == Category::Unknown {
        tracing::debug!("Student {} is neither COE nor HC, skipping", student_id);
        return Ok(RowOutcome::SkippedUnknownCategory);
    }

    let classification = directory.classification(student_id).await?;
    let year = resolve_year(student_id, classification.as_ref())?;

    apply_identical_college_correction(&mut department);

    // a non-Unknown category implies at least one degree record
    let primary_college = department
        .primary()
        .ok_or_else(|| EtlError::MissingDataError {
            student_id: student_id.to_string(),
            field: "college".to_string(),
        })?
        .to_string();
    let secondary_college = department.secondary().unwrap_or(NOT_APPLICABLE).to_string();

    Ok(RowOutcome::Included(OutputRow {
        student_id: student_id.to_string(),
        classification_year: year,
        primary_college,
        secondary_college,
        category: department.category,
        usage_count,
    }))
}

/// Identifiers from the first column of a headerless CSV; blank rows and cells are dropped.
///
/// IDs made only of dots are dropped too: they would turn into `.`/`..` URL
/// path steps and hit a different endpoint.
pub fn parse_student_ids(data: &[u8]) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(id) = record.get(0).map(str::trim).filter(|id| !id.is_empty()) else {
            continue;
        };
        if id.chars().all(|c| c == '.') {
            tracing::warn!("Ignoring invalid student ID: {:?}", id);
            continue;
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

pub fn render_output_header() -> Result<Vec<u8>> {
    let mut writer = csv_writer();
    writer.write_record(OUTPUT_HEADER)?;
    finish_csv(writer)
}

pub fn render_output_row(row: &OutputRow) -> Result<Vec<u8>> {
    let mut writer = csv_writer();
    writer.serialize(row)?;
    finish_csv(writer)
}

pub struct EnrichmentPipeline<S: Storage, D: StudentDirectory> {
    storage: S,
    directory: D,
    usage: UsageMap,
    input_path: String,
    output_path: String,
}

impl<S: Storage, D: StudentDirectory> EnrichmentPipeline<S, D> {
    pub fn new(
        storage: S,
        directory: D,
        usage: UsageMap,
        input_path: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            directory,
            usage,
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, D: StudentDirectory> Pipeline for EnrichmentPipeline<S, D> {
    type Extracted = Vec<String>;
    type Transformed = EnrichmentReport;

    async fn extract(&self) -> Result<Vec<String>> {
        tracing::debug!("Reading student IDs from: {}", self.input_path);
        let data = self.storage.read_file(&self.input_path).await?;
        let ids = parse_student_ids(&data)?;
        tracing::info!("📋 Loaded {} student IDs", ids.len());
        Ok(ids)
    }

    /// Rows are appended to the output file as soon as they are built, so an
    /// interrupted run keeps every student finished so far.
    async fn transform(&self, data: Vec<String>) -> Result<EnrichmentReport> {
        tracing::info!("Processing student data. This might take a while...");
        self.storage
            .write_file(&self.output_path, &render_output_header()?)
            .await?;

        let mut report = EnrichmentReport::default();
        for student_id in data {
            let outcome = enrich_student(&self.directory, &self.usage, &student_id).await?;
            if let Some(row) = outcome.row() {
                self.storage
                    .append_file(&self.output_path, &render_output_row(row)?)
                    .await?;
            }
            report.push(student_id, outcome);
        }

        tracing::info!(
            "✅ {} rows written, skipped {} unknown / {} transport / {} missing data",
            report.included(),
            report.skipped_unknown(),
            report.skipped_transport(),
            report.skipped_missing_data()
        );
        Ok(report)
    }

    async fn load(&self, result: EnrichmentReport) -> Result<String> {
        tracing::debug!(
            "{} rows already streamed to {}",
            result.included(),
            self.output_path
        );
        Ok(self.output_path.clone())
    }
}
