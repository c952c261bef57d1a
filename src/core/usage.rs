use crate::core::{UsageMap, UsageStore};
use crate::utils::error::Result;
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_WINDOW_DAYS: u32 = 90;

/// ISO dates covering `days` calendar days ending at (and including) `today`, newest first.
pub fn usage_window(today: NaiveDate, days: u32) -> Vec<String> {
    (0..i64::from(days))
        .map(|offset| {
            (today - Duration::days(offset))
                .format("%Y-%m-%d")
                .to_string()
        })
        .collect()
}

/// Exports sometimes keep the JSON quoting around each ID.
fn clean_id(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

/// Counts, per student, the days in the window on which they opened the app.
///
/// A student listed more than once in a single day's document still counts
/// once for that day. Days without a document are skipped with a warning; any
/// store error abandons the whole scan and yields an empty map.
pub async fn aggregate_usage<S: UsageStore + ?Sized>(
    store: &S,
    today: NaiveDate,
    window_days: u32,
) -> UsageMap {
    match try_aggregate_usage(store, today, window_days).await {
        Ok(usage) => usage,
        Err(e) => {
            tracing::error!("❌ Error fetching usage data, continuing without it: {}", e);
            UsageMap::empty()
        }
    }
}

async fn try_aggregate_usage<S: UsageStore + ?Sized>(
    store: &S,
    today: NaiveDate,
    window_days: u32,
) -> Result<UsageMap> {
    let dates = usage_window(today, window_days);
    tracing::debug!("Usage window: {:?}", dates);

    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut missing_days = Vec::new();

    for date in dates {
        let Some(opened_ids) = store.opened_ids(&date).await? else {
            tracing::warn!("No usage data found for date: {}", date);
            missing_days.push(date);
            continue;
        };

        let seen_today: HashSet<&str> = opened_ids
            .iter()
            .map(|id| clean_id(id))
            .filter(|id| !id.is_empty())
            .collect();

        for student_id in seen_today {
            *counts.entry(student_id.to_string()).or_insert(0) += 1;
        }
    }

    tracing::info!(
        "📈 Usage aggregated for {} students ({} of {} days missing)",
        counts.len(),
        missing_days.len(),
        window_days
    );

    Ok(UsageMap::new(counts, missing_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct InMemoryStore {
        days: HashMap<String, Vec<String>>,
        fail_on: Option<String>,
        calls: AtomicUsize,
    }

    impl InMemoryStore {
        fn new(days: Vec<(String, Vec<&str>)>) -> Self {
            Self {
                days: days
                    .into_iter()
                    .map(|(d, ids)| (d, ids.into_iter().map(String::from).collect()))
                    .collect(),
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UsageStore for InMemoryStore {
        async fn opened_ids(&self, date: &str) -> Result<Option<Vec<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(date) {
                return Err(EtlError::DataStoreError {
                    message: "permission denied".to_string(),
                });
            }
            Ok(self.days.get(date).cloned())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_window_includes_today_and_crosses_months() {
        let window = usage_window(today(), 3);
        assert_eq!(window, vec!["2025-03-01", "2025-02-28", "2025-02-27"]);
        assert_eq!(usage_window(today(), DEFAULT_WINDOW_DAYS).len(), 90);
        assert!(usage_window(today(), 0).is_empty());
    }

    #[tokio::test]
    async fn test_counts_days_per_student() {
        let store = InMemoryStore::new(vec![
            ("2025-03-01".to_string(), vec!["111", "222"]),
            ("2025-02-28".to_string(), vec!["111"]),
            ("2025-02-27".to_string(), vec!["333"]),
        ]);

        let usage = aggregate_usage(&store, today(), 3).await;

        assert_eq!(usage.count("111"), 2);
        assert_eq!(usage.count("222"), 1);
        assert_eq!(usage.count("333"), 1);
        assert_eq!(usage.count("999"), 0);
        assert!(usage.missing_days().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_entries_within_a_day_count_once() {
        let store = InMemoryStore::new(vec![
            ("2025-03-01".to_string(), vec!["111", "111", "\"111\""]),
            ("2025-02-28".to_string(), vec!["111"]),
        ]);

        let usage = aggregate_usage(&store, today(), 2).await;
        assert_eq!(usage.count("111"), 2);
        assert_eq!(usage.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_days_are_tolerated() {
        let window = usage_window(today(), DEFAULT_WINDOW_DAYS);
        let present: Vec<(String, Vec<&str>)> = window
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 18 != 0)
            .map(|(_, d)| (d.clone(), vec!["111"]))
            .collect();
        assert_eq!(present.len(), 85);

        let store = InMemoryStore::new(present);
        let usage = aggregate_usage(&store, today(), DEFAULT_WINDOW_DAYS).await;

        assert_eq!(usage.count("111"), 85);
        assert_eq!(usage.missing_days().len(), 5);
        assert_eq!(usage.missing_days()[0], "2025-03-01");
        assert_eq!(store.calls.load(Ordering::SeqCst), 90);
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_each_missing_day_logs_a_warning() {
        let window = usage_window(today(), 10);
        let present: Vec<(String, Vec<&str>)> = window
            .iter()
            .skip(3)
            .map(|d| (d.clone(), vec!["111"]))
            .collect();
        let store = InMemoryStore::new(present);

        let captured = CaptureWriter::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let usage = aggregate_usage(&store, today(), 10).await;
        assert_eq!(usage.count("111"), 7);

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<&str> = logs
            .lines()
            .filter(|l| l.contains("No usage data found for date"))
            .collect();
        assert_eq!(warnings.len(), 3);
        for (line, date) in warnings.iter().zip(&window[..3]) {
            assert!(line.contains(date.as_str()), "{} missing from {}", date, line);
        }
    }

    #[tokio::test]
    async fn test_store_error_yields_empty_map() {
        let mut store = InMemoryStore::new(vec![
            ("2025-03-01".to_string(), vec!["111"]),
            ("2025-02-27".to_string(), vec!["222"]),
        ]);
        store.fail_on = Some("2025-02-28".to_string());

        let usage = aggregate_usage(&store, today(), 3).await;

        assert!(usage.is_empty());
        assert_eq!(usage.count("111"), 0);
        // scan stops at the failing day
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
