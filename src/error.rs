//! Error types for the Pipedrive connector actions

use thiserror::Error;

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;

#[derive(Error, Debug)]
pub enum ConnectorError {

    // =============================
    // Configuration Errors
    // =============================

    #[error("Configuration error: cfg is undefined")]
    MissingConfig,

    #[error("Configuration error: API token is undefined")]
    MissingToken,

    #[error("Configuration error: company domain is undefined")]
    MissingCompanyDomain,

    // =============================
    // Pipeline Errors
    // =============================

    #[error("{0}")]
    Upstream(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConnectorError {
    /// Failure raised before any request is sent
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ConnectorError::MissingConfig
                | ConnectorError::MissingToken
                | ConnectorError::MissingCompanyDomain
        )
    }

    pub(crate) fn upstream(what: &str) -> Self {
        ConnectorError::Upstream(format!("could not create {}", what))
    }
}

// The request URL carries the api_token query parameter.
impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        ConnectorError::HttpError(err.without_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_names_resource() {
        let err = ConnectorError::upstream("company");
        assert_eq!(err.to_string(), "could not create company");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_variants() {
        assert!(ConnectorError::MissingConfig.is_configuration());
        assert!(ConnectorError::MissingToken.is_configuration());
        assert!(ConnectorError::MissingCompanyDomain.is_configuration());
        assert_ne!(
            ConnectorError::MissingToken.to_string(),
            ConnectorError::MissingCompanyDomain.to_string()
        );
    }
}
