use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sentinel written when a student has no distinct secondary college.
pub const NOT_APPLICABLE: &str = "N/A";

pub const ENGINEERING_COLLEGE: &str = "College of Engineering";
pub const HONORS_DEGREE_PREFIX: &str = "Honors";

/// One academic program entry for the current term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeRecord {
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
}

impl DegreeRecord {
    pub fn new(college: impl Into<String>, degree: impl Into<String>) -> Self {
        Self {
            college: Some(college.into()),
            degree: Some(degree.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Both")]
    Both,
    #[serde(rename = "COE")]
    Coe,
    #[serde(rename = "HC")]
    Hc,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Both => "Both",
            Category::Coe => "COE",
            Category::Hc => "HC",
            Category::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Colleges in encounter order; padded with [`NOT_APPLICABLE`] when only one was found.
    pub colleges: Vec<String>,
    pub category: Category,
}

impl ClassificationResult {
    pub fn primary(&self) -> Option<&str> {
        self.colleges.first().map(String::as_str)
    }

    pub fn secondary(&self) -> Option<&str> {
        self.colleges.get(1).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    #[serde(default)]
    pub classification: Option<String>,
}

/// Days-used count per student over the aggregation window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageMap {
    counts: HashMap<String, u32>,
    missing_days: Vec<String>,
}

impl UsageMap {
    pub fn new(counts: HashMap<String, u32>, missing_days: Vec<String>) -> Self {
        Self {
            counts,
            missing_days,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Students absent from the window count as zero.
    pub fn count(&self, student_id: &str) -> u32 {
        self.counts.get(student_id).copied().unwrap_or(0)
    }

    pub fn missing_days(&self) -> &[String] {
        &self.missing_days
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, u32)> for UsageMap {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect(), Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "STUDENT_ID")]
    pub student_id: String,
    #[serde(rename = "CLASSIFICATION")]
    pub classification_year: String,
    #[serde(rename = "PRIMARY_COLLEGE")]
    pub primary_college: String,
    #[serde(rename = "SECONDARY_COLLEGE")]
    pub secondary_college: String,
    #[serde(rename = "HC_OR_COE")]
    pub category: Category,
    #[serde(rename = "USAGE_OVER_LAST_90_DAYS")]
    pub usage_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Included(OutputRow),
    SkippedUnknownCategory,
    SkippedTransportError(String),
    SkippedMissingData(String),
}

impl RowOutcome {
    pub fn row(&self) -> Option<&OutputRow> {
        match self {
            RowOutcome::Included(row) => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub outcomes: Vec<(String, RowOutcome)>,
}

impl EnrichmentReport {
    pub fn push(&mut self, student_id: String, outcome: RowOutcome) {
        self.outcomes.push((student_id, outcome));
    }

    pub fn rows(&self) -> impl Iterator<Item = &OutputRow> {
        self.outcomes.iter().filter_map(|(_, outcome)| outcome.row())
    }

    pub fn included(&self) -> usize {
        self.rows().count()
    }

    pub fn skipped_unknown(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::SkippedUnknownCategory))
    }

    pub fn skipped_transport(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::SkippedTransportError(_)))
    }

    pub fn skipped_missing_data(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::SkippedMissingData(_)))
    }

    fn count_matching(&self, pred: impl Fn(&RowOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Raw identifiers pulled out of the extractor's JSON input, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdColumn {
    pub header: String,
    pub values: Vec<String>,
}
