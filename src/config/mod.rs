pub mod cli;
pub mod toml_config;

use secrecy::SecretString;

#[cfg(feature = "cli")]
pub use args::{EnrichArgs, ExtractArgs};

/// OSU API client credentials for the client-credentials grant.
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

#[cfg(feature = "cli")]
mod args {
    use super::toml_config::EnrichSettings;
    use super::Credentials;
    use crate::core::extract::{DEFAULT_COLUMN, DEFAULT_KEY_PATH};
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_file_extension, validate_non_empty_string, validate_path,
        validate_required_field, Validate,
    };
    use clap::Parser;
    use secrecy::SecretString;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "roster-etl")]
    #[command(about = "Enrich student IDs with college, classification and app usage")]
    pub struct EnrichArgs {
        /// Path to a TOML settings file
        #[arg(short, long)]
        pub config: Option<String>,

        /// Headerless CSV with one student ID per row
        #[arg(long)]
        pub input: Option<String>,

        #[arg(long)]
        pub output: Option<String>,

        #[arg(long)]
        pub api_base_url: Option<String>,

        #[arg(long)]
        pub token_url: Option<String>,

        #[arg(long)]
        pub term: Option<String>,

        /// Number of trailing days (including today) to count usage over
        #[arg(long)]
        pub usage_days: Option<u32>,

        /// Read usage documents from <DIR>/<YYYY-MM-DD>.json instead of Firestore
        #[arg(long)]
        pub usage_dir: Option<String>,

        #[arg(long)]
        pub usage_collection: Option<String>,

        #[arg(long, env = "FIREBASE_PROJECT_ID")]
        pub firestore_project: Option<String>,

        #[arg(long)]
        pub firestore_base_url: Option<String>,

        #[arg(long, env = "FIREBASE_ACCESS_TOKEN", hide_env_values = true)]
        pub firestore_token: Option<String>,

        /// Service-account JSON key used to sign in to Firestore
        #[arg(long, env = "FIREBASE_CRED_PATH")]
        pub firestore_credentials: Option<String>,

        #[arg(long, env = "OSU_API_KEY", hide_env_values = true)]
        pub client_id: Option<String>,

        #[arg(long, env = "OSU_API_SECRET", hide_env_values = true)]
        pub client_secret: Option<String>,

        /// Skip TLS certificate verification for the student API
        #[arg(long)]
        pub insecure: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per stage")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl EnrichArgs {
        /// Defaults, then the TOML file (if any), then command-line flags.
        pub fn resolve(&self) -> Result<EnrichSettings> {
            let mut settings = match &self.config {
                Some(path) => EnrichSettings::from_file(path)?,
                None => EnrichSettings::default(),
            };

            if let Some(input) = &self.input {
                settings.files.input = input.clone();
            }
            if let Some(output) = &self.output {
                settings.files.output = output.clone();
            }
            if let Some(base_url) = &self.api_base_url {
                settings.api.base_url = base_url.clone();
            }
            if let Some(token_url) = &self.token_url {
                settings.api.token_url = token_url.clone();
            }
            if let Some(term) = &self.term {
                settings.api.term = term.clone();
            }
            if self.insecure {
                settings.api.accept_invalid_certs = true;
            }
            if let Some(days) = self.usage_days {
                settings.usage.window_days = days;
            }
            if let Some(dir) = &self.usage_dir {
                settings.usage.usage_dir = Some(dir.clone());
            }
            if let Some(collection) = &self.usage_collection {
                settings.usage.collection = collection.clone();
            }
            if let Some(project) = &self.firestore_project {
                settings.usage.project_id = Some(project.clone());
            }
            if let Some(base_url) = &self.firestore_base_url {
                settings.usage.firestore_base_url = base_url.clone();
            }
            if let Some(path) = &self.firestore_credentials {
                settings.usage.credentials_path = Some(path.clone());
            }

            settings.validate()?;
            Ok(settings)
        }

        pub fn credentials(&self) -> Result<Credentials> {
            let client_id = validate_required_field("OSU_API_KEY", &self.client_id)?;
            let client_secret = validate_required_field("OSU_API_SECRET", &self.client_secret)?;
            validate_non_empty_string("OSU_API_KEY", client_id)?;
            validate_non_empty_string("OSU_API_SECRET", client_secret)?;

            Ok(Credentials {
                client_id: client_id.clone(),
                client_secret: SecretString::from(client_secret.clone()),
            })
        }

        pub fn firestore_token(&self) -> Option<SecretString> {
            self.firestore_token.clone().map(SecretString::from)
        }
    }

    #[derive(Debug, Clone, Parser)]
    #[command(name = "extract_ids")]
    #[command(about = "Extract one column of a JSON list into a single-column CSV")]
    pub struct ExtractArgs {
        #[arg(long, default_value = "student_ids.json")]
        pub input: String,

        #[arg(long, default_value = "OSU-Events-Users.csv")]
        pub output: String,

        /// Top-level field holding the list of records
        #[arg(long, default_value = DEFAULT_KEY_PATH)]
        pub key_path: String,

        /// Field of each record to write out
        #[arg(long, default_value = DEFAULT_COLUMN)]
        pub column: String,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl Validate for ExtractArgs {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            validate_file_extension("input", &self.input, &["json"])?;
            validate_path("output", &self.output)?;
            validate_file_extension("output", &self.output, &["csv"])?;
            validate_non_empty_string("key_path", &self.key_path)?;
            validate_non_empty_string("column", &self.column)?;
            Ok(())
        }
    }

}
