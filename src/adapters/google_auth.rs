//! OAuth access tokens for Firestore minted from a Google service-account key.

use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_GOOGLE_TOKEN_URI.to_string()
}

/// The fields of a service-account JSON key file needed to sign in.
/// Not `Debug`: the private key must never reach a log line.
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_json(&content).map_err(|e| match e {
            EtlError::ParseError { message, .. } => EtlError::ParseError {
                source_name: path.as_ref().display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| EtlError::ParseError {
            source_name: "service account key".to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs the RS256 assertion exchanged at `token_uri` for an access token.
fn build_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: DATASTORE_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| EtlError::AuthError {
            message: format!("invalid service account private key: {}", e),
        })?;

    encode(&header, &claims, &signing_key).map_err(|e| EtlError::AuthError {
        message: format!("could not sign token request: {}", e),
    })
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

pub async fn fetch_service_account_token(
    client: &Client,
    key: &ServiceAccountKey,
) -> Result<SecretString> {
    tracing::debug!(
        "Requesting Firestore token for {} from {}",
        key.client_email,
        key.token_uri
    );

    let assertion = build_assertion(key, Utc::now().timestamp())?;
    let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

    let response = client
        .post(&key.token_uri)
        .form(&form)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| EtlError::AuthError {
            message: e.to_string(),
        })?;

    let token: GoogleTokenResponse = response.json().await.map_err(|e| EtlError::AuthError {
        message: format!("unexpected token response: {}", e),
    })?;

    tracing::info!("🔑 Firestore access token acquired for {}", key.client_email);
    Ok(SecretString::from(token.access_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use secrecy::ExposeSecret;
    use serde_json::json;

    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/service_account_pub.pem");

    fn key_json(token_uri: &str) -> String {
        json!({
            "type": "service_account",
            "project_id": "osu-events",
            "private_key_id": "kid-1",
            "private_key": PRIVATE_KEY,
            "client_email": "etl@osu-events.iam.gserviceaccount.com",
            "client_id": "1234567890",
            "token_uri": token_uri
        })
        .to_string()
    }

    #[test]
    fn test_key_file_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("firebase.json");
        std::fs::write(&path, key_json("https://oauth2.example.test/token")).unwrap();

        let key = ServiceAccountKey::from_file(&path).unwrap();
        assert_eq!(key.client_email, "etl@osu-events.iam.gserviceaccount.com");
        assert_eq!(key.project_id.as_deref(), Some("osu-events"));
        assert_eq!(key.private_key_id.as_deref(), Some("kid-1"));
        assert_eq!(key.token_uri, "https://oauth2.example.test/token");
    }

    #[test]
    fn test_token_uri_defaults_to_google() {
        let key = ServiceAccountKey::from_json(
            &json!({"client_email": "a@b.c", "private_key": PRIVATE_KEY}).to_string(),
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_GOOGLE_TOKEN_URI);
        assert!(key.project_id.is_none());
    }

    #[test]
    fn test_malformed_key_file_names_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("firebase.json");
        std::fs::write(&path, "{\"client_email\": 42}").unwrap();

        let err = ServiceAccountKey::from_file(&path).err().unwrap();
        assert!(
            matches!(err, EtlError::ParseError { ref source_name, .. } if source_name.ends_with("firebase.json"))
        );
    }

    #[test]
    fn test_assertion_is_signed_with_the_key() {
        let key = ServiceAccountKey::from_json(&key_json("https://oauth2.example.test/token"))
            .unwrap();
        let now = Utc::now().timestamp();
        let assertion = build_assertion(&key, now).unwrap();

        let header = jsonwebtoken::decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("kid-1"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.example.test/token"]);
        validation.set_issuer(&["etl@osu-events.iam.gserviceaccount.com"]);
        let decoded = decode::<Claims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.scope, DATASTORE_SCOPE);
        assert_eq!(decoded.claims.iat, now);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, ASSERTION_LIFETIME_SECS);
    }

    #[test]
    fn test_bad_private_key_is_an_auth_error() {
        let key = ServiceAccountKey::from_json(
            &json!({"client_email": "a@b.c", "private_key": "not a pem"}).to_string(),
        )
        .unwrap();
        let err = build_assertion(&key, 0).unwrap_err();
        assert!(matches!(err, EtlError::AuthError { .. }));
    }

    #[tokio::test]
    async fn test_exchanges_assertion_for_token() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .x_www_form_urlencoded_tuple("grant_type", JWT_BEARER_GRANT)
                .x_www_form_urlencoded_key_exists("assertion");
            then.status(200).json_body(json!({
                "access_token": "ya29.minted",
                "expires_in": 3599,
                "token_type": "Bearer"
            }));
        });

        let key = ServiceAccountKey::from_json(&key_json(&server.url("/token"))).unwrap();
        let token = fetch_service_account_token(&Client::new(), &key).await.unwrap();

        token_mock.assert();
        assert_eq!(token.expose_secret(), "ya29.minted");
    }

    #[tokio::test]
    async fn test_rejected_assertion_is_an_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400).json_body(json!({"error": "invalid_grant"}));
        });

        let key = ServiceAccountKey::from_json(&key_json(&server.url("/token"))).unwrap();
        let err = fetch_service_account_token(&Client::new(), &key).await.unwrap_err();
        assert!(matches!(err, EtlError::AuthError { .. }));
    }
}
