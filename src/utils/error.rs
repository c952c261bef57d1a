use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to parse {source_name}: {message}")]
    ParseError { source_name: String, message: String },

    #[error("Missing data for student {student_id}: {field}")]
    MissingDataError { student_id: String, field: String },

    #[error("Usage store error: {message}")]
    DataStoreError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Data,
    Storage,
    Configuration,
    FileSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::AuthError { .. } => ErrorCategory::Authentication,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ParseError { .. }
            | EtlError::MissingDataError { .. } => ErrorCategory::Data,
            EtlError::DataStoreError { .. } => ErrorCategory::Storage,
            EtlError::IoError(_) => ErrorCategory::FileSystem,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Storage => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::FileSystem => ErrorSeverity::High,
            ErrorCategory::Authentication | ErrorCategory::Configuration => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,      // warning only, the run still succeeded
            ErrorSeverity::Medium => 2,   // worth retrying
            ErrorSeverity::High => 1,     // bad input or output file
            ErrorSeverity::Critical => 3, // configuration or credentials
        }
    }

    /// Whether the enrichment driver may skip the current student and move on.
    pub fn is_row_recoverable(&self) -> bool {
        matches!(
            self,
            EtlError::ApiError(_) | EtlError::MissingDataError { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "Check network connectivity and the API base URL",
            EtlError::AuthError { .. } => {
                "Verify OSU_API_KEY and OSU_API_SECRET and that the token URL is reachable"
            }
            EtlError::CsvError(_) => "Make sure the input is a valid CSV file",
            EtlError::IoError(_) => "Check that the file exists and the path is writable",
            EtlError::SerializationError(_) | EtlError::ParseError { .. } => {
                "Make sure the input file is valid JSON with the expected list field"
            }
            EtlError::MissingDataError { .. } => {
                "The student has no current-term record; nothing to do"
            }
            EtlError::DataStoreError { .. } => {
                "Check FIREBASE_PROJECT_ID, FIREBASE_ACCESS_TOKEN or the usage directory"
            }
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => {
                "Review the command-line flags, .env file and TOML configuration"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) => match e.status() {
                Some(status) => format!("The student API returned HTTP {}", status),
                None => "Could not reach the student API".to_string(),
            },
            EtlError::AuthError { .. } => "Could not obtain an API access token".to_string(),
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
