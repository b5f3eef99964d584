//! # cilogon-auth
//!
//! Federated login against the CILogon identity broker.
//!
//! This crate provides:
//! - Authorization redirect URLs for the broker login page
//! - Authorization code exchange and userinfo retrieval
//! - Username resolution from configurable claims
//! - Identity provider allow-listing with optional domain stripping
//! - Local username mapping from a file that is reloaded when it changes
//!
//! ## Example
//!
//! ```no_run
//! use cilogon_auth::prelude::*;
//!
//! # async fn run() -> AuthResult<()> {
//! let mut config = CilogonConfig::default();
//! config.client.client_id = "cilogon:/client_id/1234".to_string();
//! config.client.client_secret = "secret".to_string();
//! config.client.callback_url = "https://hub.example.org/hub/oauth_callback".to_string();
//! let authenticator = Authenticator::from_config(&config)?;
//!
//! let result = authenticator.authenticate("code-from-callback").await?;
//! let local = authenticator.normalize_username(&result.name).await?;
//! # let _ = local;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Client, endpoint, identity and mapping configuration
//! - [`error`] - Error types
//! - [`federation`] - Broker exchanges and the login pipeline
//! - [`mapping`] - Local username mapping

pub mod config;
pub mod error;
pub mod federation;
pub mod mapping;

pub use config::{CilogonConfig, ConfigError};
pub use error::{AuthError, ErrorCategory, ExchangeStage};
pub use federation::{
    AuthState, AuthenticationResult, Authenticator, AuthorizeRedirect, ClaimList, ClaimResolver,
    HttpBroker, IdentityBroker, IdpAllowList, LoginStage, TokenResponse, UserInfo,
};
pub use mapping::{
    FileMappingSource, MappingCache, MappingCacheStats, MappingSource, MappingTable,
    NameShortener, UsernameMap, UsernameMapper,
};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use cilogon_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{CilogonConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::federation::{
        AuthenticationResult, Authenticator, AuthorizeRedirect, IdentityBroker,
    };
    pub use crate::mapping::{UsernameMap, UsernameMapper};
}
