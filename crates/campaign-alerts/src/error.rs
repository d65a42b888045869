//! Error types for the campaign-alerts crate.
//!
//! Detection itself never fails. These errors only surface when campaign
//! records or engine configuration are built, validated or loaded.

use thiserror::Error;

/// Errors raised while constructing or loading engine input.
#[derive(Debug, Error)]
pub enum AlertError {
    /// A campaign record violates the data model.
    #[error("invalid campaign '{id}': {reason}")]
    InvalidCampaign {
        /// The offending campaign id (may be empty).
        id: String,
        /// What is wrong with the record.
        reason: String,
    },

    /// Engine configuration is unusable.
    #[error("invalid engine config: {reason}")]
    InvalidConfig {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl AlertError {
    pub(crate) fn invalid_campaign(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCampaign {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for fallible campaign-alerts operations.
pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_campaign() {
        let err = AlertError::invalid_campaign("cmp-7", "readiness above 100");
        assert_eq!(
            err.to_string(),
            "invalid campaign 'cmp-7': readiness above 100"
        );
    }

    #[test]
    fn error_display_invalid_config() {
        let err = AlertError::InvalidConfig {
            reason: "max_alerts must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid engine config: max_alerts must be positive"
        );
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not json");
        assert!(json_err.is_err());
        let alert_err: AlertError = json_err.unwrap_err().into();
        assert!(matches!(alert_err, AlertError::SerializationError(_)));
    }
}
