use crate::adapters::firestore::{DEFAULT_FIRESTORE_BASE_URL, DEFAULT_USAGE_COLLECTION};
use crate::adapters::osu_api::{DEFAULT_API_BASE_URL, DEFAULT_TERM, DEFAULT_TOKEN_URL};
use crate::core::usage::DEFAULT_WINDOW_DAYS;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_INPUT_FILE: &str = "OSU-Events-Users.csv";
pub const DEFAULT_OUTPUT_FILE: &str = "output.csv";
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Non-secret settings for an enrichment run; credentials come from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichSettings {
    pub api: ApiConfig,
    pub usage: UsageConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token_url: String,
    pub term: String,
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            term: DEFAULT_TERM.to_string(),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub window_days: u32,
    pub collection: String,
    pub firestore_base_url: String,
    /// Defaults to the `project_id` of the service-account key when unset.
    pub project_id: Option<String>,
    /// Service-account JSON key used to mint a Firestore access token.
    pub credentials_path: Option<String>,
    /// Read day documents from `<usage_dir>/<date>.json` instead of Firestore.
    pub usage_dir: Option<String>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            collection: DEFAULT_USAGE_COLLECTION.to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            project_id: None,
            credentials_path: None,
            usage_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub input: String,
    pub output: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT_FILE.to_string(),
            output: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl EnrichSettings {
    /// Loads settings from a TOML file, substituting `${VAR}` references first.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
        message: e.to_string(),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

impl Validate for EnrichSettings {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_url("api.token_url", &self.api.token_url)?;
        validate_non_empty_string("api.term", &self.api.term)?;

        validate_range("usage.window_days", self.usage.window_days, 1, MAX_WINDOW_DAYS)?;
        validate_non_empty_string("usage.collection", &self.usage.collection)?;
        validate_url("usage.firestore_base_url", &self.usage.firestore_base_url)?;
        if let Some(project_id) = &self.usage.project_id {
            validate_non_empty_string("usage.project_id", project_id)?;
        }
        if let Some(path) = &self.usage.credentials_path {
            validate_path("usage.credentials_path", path)?;
            validate_file_extension("usage.credentials_path", path, &["json"])?;
        }
        if let Some(dir) = &self.usage.usage_dir {
            validate_path("usage.usage_dir", dir)?;
        }

        validate_path("files.input", &self.files.input)?;
        validate_file_extension("files.input", &self.files.input, &["csv"])?;
        validate_path("files.output", &self.files.output)?;
        validate_file_extension("files.output", &self.files.output, &["csv"])?;

        Ok(())
    }
}
