//! Authentication error types.
//!
//! This module defines every error a login attempt or a username
//! normalization can end with. None of them are retried automatically.

use std::fmt;

use reqwest::StatusCode;

/// The broker exchange an [`AuthError::UpstreamExchange`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeStage {
    /// Authorization code for access token.
    Token,
    /// Access token for userinfo claims.
    UserInfo,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token exchange"),
            Self::UserInfo => write!(f, "userinfo fetch"),
        }
    }
}

/// Errors that can occur while authenticating against the identity broker.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Talking to the broker failed: transport error, non-2xx status or an
    /// unparseable response body.
    #[error("Upstream {stage} failed: {message}")]
    UpstreamExchange {
        /// Which exchange failed.
        stage: ExchangeStage,
        /// Description of the failure.
        message: String,
    },

    /// None of the configured claims yielded a username.
    #[error("No username claim from {tried:?} in response; available claims: {available:?}")]
    IdentityResolution {
        /// Claim names tried, in priority order.
        tried: Vec<String>,
        /// Claim names present in the userinfo response, sorted.
        available: Vec<String>,
    },

    /// The identity provider suffix of the username is not allow-listed.
    #[error("Trying to login from not allowed identity provider: {idp}")]
    IdentityProviderRejected {
        /// The rejected identity provider suffix.
        idp: String,
    },

    /// The allow-list is enabled but the username is not `local@provider`.
    #[error("Malformed username: expected exactly one '@' separating local part and provider")]
    MalformedUsername {
        /// The offending username.
        username: String,
    },

    /// The inbound request is missing required input.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The username mapping file could not be read.
    #[error("Username mapping failed for {path}: {message}")]
    Mapping {
        /// Path of the mapping file.
        path: String,
        /// Description of the I/O failure.
        message: String,
    },

    /// The runtime configuration is unusable.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `UpstreamExchange` error.
    #[must_use]
    pub fn upstream(stage: ExchangeStage, message: impl Into<String>) -> Self {
        Self::UpstreamExchange {
            stage,
            message: message.into(),
        }
    }

    /// Creates a new `IdentityProviderRejected` error.
    #[must_use]
    pub fn idp_rejected(idp: impl Into<String>) -> Self {
        Self::IdentityProviderRejected { idp: idp.into() }
    }

    /// Creates a new `MalformedUsername` error.
    #[must_use]
    pub fn malformed_username(username: impl Into<String>) -> Self {
        Self::MalformedUsername {
            username: username.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Mapping` error.
    #[must_use]
    pub fn mapping(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a policy rejection rather than a fault.
    #[must_use]
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, Self::IdentityProviderRejected { .. })
    }

    /// Returns `true` if the broker could not be talked to successfully.
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, Self::UpstreamExchange { .. })
    }

    /// Returns `true` if this maps to a 4xx status.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns `true` if this maps to a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// HTTP status the hosting framework should answer with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::IdentityProviderRejected { .. } => StatusCode::FORBIDDEN,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamExchange { .. }
            | Self::IdentityResolution { .. }
            | Self::MalformedUsername { .. }
            | Self::Mapping { .. }
            | Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UpstreamExchange { .. } => ErrorCategory::Upstream,
            Self::IdentityResolution { .. } | Self::MalformedUsername { .. } => {
                ErrorCategory::Identity
            }
            Self::IdentityProviderRejected { .. } => ErrorCategory::Policy,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Mapping { .. } => ErrorCategory::Mapping,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Broker exchange failures.
    Upstream,
    /// Username could not be derived from the broker's claims.
    Identity,
    /// Allow-list rejections.
    Policy,
    /// Request validation errors.
    Validation,
    /// Username mapping file errors.
    Mapping,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => write!(f, "upstream"),
            Self::Identity => write!(f, "identity"),
            Self::Policy => write!(f, "policy"),
            Self::Validation => write!(f, "validation"),
            Self::Mapping => write!(f, "mapping"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::upstream(ExchangeStage::Token, "HTTP 502");
        assert_eq!(err.to_string(), "Upstream token exchange failed: HTTP 502");

        let err = AuthError::idp_rejected("other.com");
        assert_eq!(
            err.to_string(),
            "Trying to login from not allowed identity provider: other.com"
        );

        let err = AuthError::IdentityResolution {
            tried: vec!["eppn".to_string(), "email".to_string()],
            available: vec!["sub".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("eppn"));
        assert!(msg.contains("sub"));
    }

    #[test]
    fn test_malformed_username_display_omits_name() {
        let err = AuthError::malformed_username("someone");
        assert!(!err.to_string().contains("someone"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::idp_rejected("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::invalid_request("missing code").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::upstream(ExchangeStage::UserInfo, "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::malformed_username("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::idp_rejected("x");
        assert!(err.is_policy_rejection());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = AuthError::upstream(ExchangeStage::Token, "x");
        assert!(err.is_upstream_error());
        assert!(err.is_server_error());
        assert!(!err.is_policy_rejection());

        assert!(AuthError::mapping("/etc/map", "gone").is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::upstream(ExchangeStage::Token, "x").category(),
            ErrorCategory::Upstream
        );
        assert_eq!(
            AuthError::malformed_username("x").category(),
            ErrorCategory::Identity
        );
        assert_eq!(
            AuthError::idp_rejected("x").category(),
            ErrorCategory::Policy
        );
        assert_eq!(
            AuthError::configuration("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(ErrorCategory::Mapping.to_string(), "mapping");
        assert_eq!(ExchangeStage::UserInfo.to_string(), "userinfo fetch");
    }
}
