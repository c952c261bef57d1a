//! Client for the Oregon State University student API.
//!
//! Authentication uses the OAuth2 client-credentials grant; every student
//! request carries the resulting bearer token.

use crate::adapters::join_segments;
use crate::domain::model::{ClassificationRecord, DegreeRecord};
use crate::domain::ports::StudentDirectory;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "https://api.oregonstate.edu/v1";
pub const DEFAULT_TOKEN_URL: &str =
    "https://developer.oregonstate.edu/api-proxy/osu-api?_api_proxy_uri=oauth2%2Ftoken";
pub const DEFAULT_TERM: &str = "current";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    attributes: Option<A>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    // tried first: a derived struct would also accept a JSON array
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.into_iter().next(),
        }
    }
}

pub fn build_http_client(accept_invalid_certs: bool) -> Result<Client> {
    if accept_invalid_certs {
        tracing::warn!("⚠️ TLS certificate verification is disabled");
    }
    Ok(Client::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?)
}

/// Exchanges the client id and secret for an access token.
pub async fn fetch_access_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &SecretString,
) -> Result<SecretString> {
    tracing::debug!("Requesting access token from: {}", token_url);

    let form = [
        ("grant_type", "client_credentials"),
        ("scope", "full"),
        ("client_id", client_id),
        ("client_secret", client_secret.expose_secret()),
    ];

    let response = client
        .post(token_url)
        .form(&form)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| EtlError::AuthError {
            message: e.to_string(),
        })?;

    let token: TokenResponse = response.json().await.map_err(|e| EtlError::AuthError {
        message: format!("unexpected token response: {}", e),
    })?;

    tracing::info!("🔑 Access token acquired");
    Ok(SecretString::from(token.access_token))
}

pub struct OsuApiClient {
    client: Client,
    base_url: String,
    term: String,
    access_token: SecretString,
}

impl OsuApiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        term: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            term: term.into(),
            access_token,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = join_segments(&self.base_url, segments)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl StudentDirectory for OsuApiClient {
    async fn degrees(&self, student_id: &str) -> Result<Vec<DegreeRecord>> {
        let envelope: Envelope<Vec<Resource<DegreeRecord>>> = self
            .get_json(
                &["students", student_id, "degrees"],
                &[("term", self.term.as_str())],
            )
            .await?;

        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|resource| resource.attributes.unwrap_or_default())
            .collect())
    }

    async fn classification(&self, student_id: &str) -> Result<Option<ClassificationRecord>> {
        let envelope: Envelope<OneOrMany<Resource<ClassificationRecord>>> = self
            .get_json(&["students", student_id, "classification"], &[])
            .await?;

        Ok(envelope
            .data
            .and_then(OneOrMany::into_first)
            .and_then(|resource| resource.attributes))
    }
}
