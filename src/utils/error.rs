use crate::provider::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {message}")]
    ClientInput { field: String, message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{message}: {source}")]
    Upstream {
        message: String,
        #[source]
        source: ProviderError,
    },

    #[error("Persistence warning: {message}")]
    Persistence { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed at {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

/// Errors reported by a durable store. "Not found" is not an error: finders
/// return `Option`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated on {field} = {value}")]
    Conflict { field: String, value: String },

    #[error("record {id} does not exist")]
    MissingRecord { id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store migration failed: {0}")]
    Migration(String),

    #[error("store query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientInput,
    NotFound,
    UpstreamFailure,
    PersistenceWarning,
    Configuration,
    Internal,
}

impl GatewayError {
    pub fn client_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>, source: ProviderError) -> Self {
        Self::Upstream {
            message: message.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ClientInput { .. } => ErrorCategory::ClientInput,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Provider(e) if e.is_empty_result() => ErrorCategory::NotFound,
            Self::Provider(_) | Self::Upstream { .. } | Self::ApiError(_) => {
                ErrorCategory::UpstreamFailure
            }
            Self::Persistence { .. } | Self::Store(_) => ErrorCategory::PersistenceWarning,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP-equivalent status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ClientInput { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Provider(e) => e.http_status(),
            Self::ApiError(_) => 502,
            _ => 500,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ClientInput { message, .. } => message.clone(),
            Self::NotFound { message } => message.clone(),
            Self::Provider(e) => e.classification().message.to_string(),
            Self::Upstream { message, .. } => message.clone(),
            Self::ApiError(_) => "Failed to reach Provider".to_string(),
            Self::Persistence { .. } | Self::Store(_) => "Storage is unavailable".to_string(),
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => format!("Invalid configuration: {}", self),
            Self::IoError(_) | Self::SerializationError(_) => "Internal server error".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::codes;

    #[test]
    fn test_client_input_maps_to_bad_request() {
        let err = GatewayError::client_input("origin", "Origin postal code is required");
        assert_eq!(err.category(), ErrorCategory::ClientInput);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.user_friendly_message(), "Origin postal code is required");
    }

    #[test]
    fn test_provider_empty_result_is_not_found() {
        let err = GatewayError::from(ProviderError::new(
            codes::ERR_RATE_NO_COURIER_AVAILABLE,
            "no courier",
        ));
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_provider_auth_failure_is_upstream() {
        let err = GatewayError::from(ProviderError::new(
            codes::ERR_INVALID_AUTHENTICATION,
            "bad key",
        ));
        assert_eq!(err.category(), ErrorCategory::UpstreamFailure);
        assert_eq!(err.status_code(), 401);
        assert_eq!(
            err.user_friendly_message(),
            "Invalid third party authentication credentials"
        );
    }

    #[test]
    fn test_upstream_wraps_provider_detail() {
        let err = GatewayError::upstream(
            "Failed to get courier rates",
            ProviderError::new(codes::ERR_RATE_INVALID_PARAMETER, "weight must be positive"),
        );
        assert_eq!(err.category(), ErrorCategory::UpstreamFailure);
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.user_friendly_message(), "Failed to get courier rates");
        assert!(err.to_string().contains("weight must be positive"));
    }

    #[test]
    fn test_store_failure_is_persistence_warning() {
        let err = GatewayError::from(StoreError::Unavailable("disk full".to_string()));
        assert_eq!(err.category(), ErrorCategory::PersistenceWarning);
        assert_eq!(err.status_code(), 500);
    }
}
