//! Wiring for a full enrichment run: token, usage map, then the per-student pipeline.

use crate::adapters::osu_api::build_http_client;
use crate::adapters::{
    fetch_access_token, fetch_service_account_token, FirestoreStore, JsonDirStore, OsuApiClient,
    ServiceAccountKey,
};
use crate::config::cli::LocalStorage;
use crate::config::toml_config::{EnrichSettings, UsageConfig};
use crate::config::Credentials;
use crate::core::enrich::EnrichmentPipeline;
use crate::core::usage::aggregate_usage;
use crate::core::{UsageMap, UsageStore};
use crate::utils::error::Result;
use crate::EtlEngine;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use secrecy::SecretString;

/// Picks the usage source: a local export directory wins over Firestore.
pub fn usage_store(
    usage: &UsageConfig,
    client: Client,
    firestore_token: Option<SecretString>,
) -> Option<Box<dyn UsageStore>> {
    if let Some(dir) = &usage.usage_dir {
        tracing::info!("📂 Reading usage data from {}", dir);
        return Some(Box::new(JsonDirStore::new(dir)));
    }

    let project_id = usage.project_id.as_ref()?;
    tracing::info!("🔥 Reading usage data from Firestore project {}", project_id);

    let mut store = FirestoreStore::new(client, project_id)
        .with_base_url(&usage.firestore_base_url)
        .with_collection(&usage.collection);
    match firestore_token {
        Some(token) => store = store.with_access_token(token),
        None => tracing::warn!(
            "⚠️ No Firestore credentials configured (set FIREBASE_CRED_PATH or FIREBASE_ACCESS_TOKEN); requests will be unauthenticated"
        ),
    }
    Some(Box::new(store))
}

/// Mints a Firestore token from the configured service-account key, filling
/// in the project from the key when none was given.
async fn service_account_token(
    usage: &mut UsageConfig,
    client: &Client,
) -> Result<Option<SecretString>> {
    if usage.usage_dir.is_some() {
        return Ok(None);
    }
    let Some(path) = &usage.credentials_path else {
        return Ok(None);
    };

    let key = ServiceAccountKey::from_file(path)?;
    if usage.project_id.is_none() {
        usage.project_id = key.project_id.clone();
    }
    fetch_service_account_token(client, &key).await.map(Some)
}

/// Builds the usage map for the window ending `today`.
///
/// An explicit `firestore_token` wins over the service-account key. Failing to
/// sign in is treated like any other store error: the run continues with
/// empty usage counts.
pub async fn load_usage(
    usage: &UsageConfig,
    client: Client,
    firestore_token: Option<SecretString>,
    today: NaiveDate,
) -> UsageMap {
    let mut usage = usage.clone();
    let firestore_token = match firestore_token {
        Some(token) => Some(token),
        None => match service_account_token(&mut usage, &client).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("❌ Firestore sign-in failed, continuing without usage data: {}", e);
                return UsageMap::empty();
            }
        },
    };

    match usage_store(&usage, client, firestore_token) {
        Some(store) => aggregate_usage(store.as_ref(), today, usage.window_days).await,
        None => {
            tracing::warn!(
                "⚠️ No usage store configured (set FIREBASE_PROJECT_ID or --usage-dir); usage counts will be 0"
            );
            UsageMap::empty()
        }
    }
}

/// Runs the enrichment end to end and returns the output path.
///
/// Only configuration and token failures are fatal; per-student failures are
/// logged and skipped inside the pipeline.
pub async fn run_enrichment(
    settings: &EnrichSettings,
    credentials: &Credentials,
    firestore_token: Option<SecretString>,
    monitor: bool,
) -> Result<String> {
    let client = build_http_client(settings.api.accept_invalid_certs)?;

    let access_token = fetch_access_token(
        &client,
        &settings.api.token_url,
        &credentials.client_id,
        &credentials.client_secret,
    )
    .await?;

    let today = Local::now().date_naive();
    let usage = load_usage(&settings.usage, client.clone(), firestore_token, today).await;

    let directory = OsuApiClient::new(
        client,
        &settings.api.base_url,
        &settings.api.term,
        access_token,
    );
    let pipeline = EnrichmentPipeline::new(
        LocalStorage::current_dir(),
        directory,
        usage,
        &settings.files.input,
        &settings.files.output,
    );

    EtlEngine::new_with_monitoring(pipeline, monitor).run().await
}
