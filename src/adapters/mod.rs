// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod firestore;
pub mod google_auth;
pub mod json_dir;
pub mod osu_api;

pub use firestore::FirestoreStore;
pub use google_auth::{fetch_service_account_token, ServiceAccountKey};
pub use json_dir::JsonDirStore;
pub use osu_api::{fetch_access_token, OsuApiClient};

use crate::utils::error::{EtlError, Result};
use url::Url;

/// Appends percent-encoded path segments to `base`.
pub(crate) fn join_segments(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| EtlError::InvalidConfigValueError {
        field: "base_url".to_string(),
        value: base.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })?;

    url.path_segments_mut()
        .map_err(|_| EtlError::InvalidConfigValueError {
            field: "base_url".to_string(),
            value: base.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
