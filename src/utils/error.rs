use thiserror::Error;

#[derive(Error, Debug)]
pub enum DesignError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Inference service returned HTTP {status}: {body}")]
    HttpStatusError { status: u16, body: String },

    #[error("Stream error: {message}")]
    StreamError { message: String },

    #[error("Extraction error: {message}")]
    ExtractionError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
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
    Io,
    Parsing,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DesignError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DesignError::ApiError(_) | DesignError::HttpStatusError { .. } => ErrorCategory::Network,
            DesignError::IoError(_) => ErrorCategory::Io,
            DesignError::SerializationError(_)
            | DesignError::StreamError { .. }
            | DesignError::ExtractionError { .. } => ErrorCategory::Parsing,
            DesignError::ConfigError { .. }
            | DesignError::MissingConfigError { .. }
            | DesignError::InvalidConfigValueError { .. }
            | DesignError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // Remote and parsing failures are absorbed by the closed-form fallback.
            ErrorCategory::Network | ErrorCategory::Parsing => ErrorSeverity::Medium,
            ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// Whether the design pipeline should stop on this error rather than
    /// fall back to the analytic design.
    pub fn is_fatal(&self) -> bool {
        self.severity() >= ErrorSeverity::High
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DesignError::MissingConfigError { field } if field == "api_key" => {
                "Set the DASHSCOPE_API_KEY environment variable or pass --api-key".to_string()
            }
            DesignError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            DesignError::InvalidConfigValueError { field, .. }
            | DesignError::ConfigValidationError { field, .. } => {
                format!("Check the value of '{}' on the command line or in the config file", field)
            }
            DesignError::ConfigError { .. } => {
                "Check the config file exists and is valid TOML".to_string()
            }
            DesignError::ApiError(_) => {
                "Check network connectivity and the inference service base URL".to_string()
            }
            DesignError::HttpStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check that the API key is valid for this service".to_string()
            }
            DesignError::HttpStatusError { .. } => {
                "Check the model name and the service status".to_string()
            }
            DesignError::StreamError { .. } | DesignError::SerializationError(_) => {
                "The service sent an unexpected stream; try again or use another model".to_string()
            }
            DesignError::ExtractionError { .. } => {
                "The model answer held no component values; the analytic design was used".to_string()
            }
            DesignError::IoError(_) => {
                "Check that the output directory is writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DesignError::MissingConfigError { field } if field == "api_key" => {
                "No API key found for the inference service".to_string()
            }
            DesignError::MissingConfigError { field } => format!("Missing setting: {}", field),
            DesignError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid {}: {}", field, reason)
            }
            DesignError::ConfigValidationError { field, message } => {
                format!("Invalid {}: {}", field, message)
            }
            DesignError::ConfigError { message } => format!("Configuration problem: {}", message),
            DesignError::IoError(e) => format!("Could not write the netlist: {}", e),
            other => format!("Filter design failed: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DesignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err = DesignError::MissingConfigError {
            field: "api_key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.is_fatal());
        assert!(err.recovery_suggestion().contains("DASHSCOPE_API_KEY"));
    }

    #[test]
    fn test_remote_errors_are_recoverable() {
        let err = DesignError::HttpStatusError {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(!err.is_fatal());

        let err = DesignError::StreamError {
            message: "bad chunk".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Parsing);
        assert!(!err.is_fatal());
    }
}
