//! Classification rules applied to the records fetched for one student.

use crate::domain::model::{
    Category, ClassificationRecord, ClassificationResult, DegreeRecord, ENGINEERING_COLLEGE,
    HONORS_DEGREE_PREFIX, NOT_APPLICABLE,
};
use crate::utils::error::{EtlError, Result};

/// Value the registrar uses for students whose year depends on their student type.
pub const GRADUATE_SENTINEL: &str = "Determine from Student Type";
pub const GRADUATE: &str = "Graduate";

/// Derives the college list and honors/engineering category from a student's degrees.
///
/// Colleges keep encounter order and duplicates; a single college is padded
/// with `"N/A"`. A record without a college contributes `"N/A"`.
pub fn classify_degrees(records: &[DegreeRecord]) -> ClassificationResult {
    let mut is_engineering = false;
    let mut is_honors = false;
    let mut colleges = Vec::with_capacity(records.len().max(2));

    for record in records {
        if record.college.as_deref() == Some(ENGINEERING_COLLEGE) {
            is_engineering = true;
        }
        if record
            .degree
            .as_deref()
            .is_some_and(|degree| degree.starts_with(HONORS_DEGREE_PREFIX))
        {
            is_honors = true;
        }
        colleges.push(
            record
                .college
                .clone()
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        );
    }

    if colleges.len() == 1 {
        colleges.push(NOT_APPLICABLE.to_string());
    }

    let category = match (is_engineering, is_honors) {
        (true, true) => Category::Both,
        (true, false) => Category::Coe,
        (false, true) => Category::Hc,
        (false, false) => Category::Unknown,
    };

    ClassificationResult { colleges, category }
}

/// Graduate programs can list the same college twice; only the first counts.
pub fn apply_identical_college_correction(result: &mut ClassificationResult) {
    if let [primary, secondary, ..] = result.colleges.as_mut_slice() {
        if primary == secondary {
            *secondary = NOT_APPLICABLE.to_string();
        }
    }
}

pub fn resolve_classification(classification: &str) -> String {
    if classification == GRADUATE_SENTINEL {
        GRADUATE.to_string()
    } else {
        classification.to_string()
    }
}

/// Resolves the classification year, failing when the API returned no usable record.
pub fn resolve_year(student_id: &str, record: Option<&ClassificationRecord>) -> Result<String> {
    record
        .and_then(|r| r.classification.as_deref())
        .map(resolve_classification)
        .ok_or_else(|| EtlError::MissingDataError {
            student_id: student_id.to_string(),
            field: "classification".to_string(),
        })
}
