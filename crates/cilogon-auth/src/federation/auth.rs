//! Login orchestration.
//!
//! An attempt walks a fixed sequence of stages:
//!
//! ```text
//! Start -> CodeReceived -> TokenAcquired -> IdentityFetched
//!       -> UsernameResolved -> Filtered -> Done
//! ```
//!
//! Any failure ends the attempt at the stage it occurred in; the stage is
//! logged alongside the error.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::allowlist::IdpAllowList;
use super::broker::{HttpBroker, IdentityBroker};
use super::claims::{ClaimList, ClaimResolver};
use crate::AuthResult;
use crate::config::CilogonConfig;
use crate::error::AuthError;
use crate::mapping::{UsernameMap, UsernameMapper};

/// Stage of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginStage {
    /// Nothing checked yet.
    Start,
    /// A non-empty authorization code was supplied.
    CodeReceived,
    /// The code was exchanged for an access token.
    TokenAcquired,
    /// Userinfo claims were fetched with the access token.
    IdentityFetched,
    /// A username was taken from the configured claims.
    UsernameResolved,
    /// The username passed the identity provider allow-list.
    Filtered,
    /// The result was assembled.
    Done,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::CodeReceived => "code_received",
            Self::TokenAcquired => "token_acquired",
            Self::IdentityFetched => "identity_fetched",
            Self::UsernameResolved => "username_resolved",
            Self::Filtered => "filtered",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Data retained from the broker for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthState {
    /// The full token response, unchanged.
    pub token_response: Value,
    /// Access token from the token response.
    pub access_token: String,
    /// The full userinfo response, unchanged.
    pub raw_user_info: Value,
}

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationResult {
    /// Username after claim resolution and allow-list filtering.
    pub name: String,
    /// Broker responses backing this login.
    pub auth_state: AuthState,
}

/// Runs the authorization code flow against an identity broker.
pub struct Authenticator {
    broker: Arc<dyn IdentityBroker>,
    claims: ClaimResolver,
    allow_list: IdpAllowList,
    mapper: Option<Arc<dyn UsernameMap>>,
}

impl Authenticator {
    /// Creates an authenticator without a username mapper.
    #[must_use]
    pub fn new(
        broker: Arc<dyn IdentityBroker>,
        claims: ClaimResolver,
        allow_list: IdpAllowList,
    ) -> Self {
        Self {
            broker,
            claims,
            allow_list,
            mapper: None,
        }
    }

    /// Builds the HTTP broker, claim resolver, allow-list and, when a
    /// `[mapping]` section is present, the file-backed mapper.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the configuration does not
    /// validate, e.g. when the client id, secret or callback URL is empty.
    pub fn from_config(config: &CilogonConfig) -> AuthResult<Self> {
        let broker = HttpBroker::from_config(config)?;
        let authenticator = Self::new(
            Arc::new(broker),
            ClaimResolver::new(ClaimList::from_config(&config.identity)),
            IdpAllowList::from_config(&config.identity),
        );

        match &config.mapping {
            Some(mapping) => {
                let mapper = UsernameMapper::from_config(mapping)?;
                Ok(authenticator.with_mapper(Arc::new(mapper)))
            }
            None => Ok(authenticator),
        }
    }

    /// Sets the mapper used by [`normalize_username`](Self::normalize_username).
    #[must_use]
    pub fn with_mapper(mut self, mapper: Arc<dyn UsernameMap>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Returns `true` if a username mapper is configured.
    #[must_use]
    pub fn has_mapper(&self) -> bool {
        self.mapper.is_some()
    }

    /// Completes a login from an authorization code.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] for an empty code
    /// - [`AuthError::UpstreamExchange`] if either broker exchange fails
    /// - [`AuthError::IdentityResolution`] if no claim yields a username
    /// - [`AuthError::MalformedUsername`] or [`AuthError::IdentityProviderRejected`]
    ///   if the allow-list refuses the username
    pub async fn authenticate(&self, code: &str) -> AuthResult<AuthenticationResult> {
        let mut stage = LoginStage::Start;
        let result = self.run(code, &mut stage).await;
        if let Err(error) = &result {
            tracing::warn!(
                stage = %stage,
                category = %error.category(),
                error = %error,
                "Login attempt failed"
            );
        }
        result
    }

    async fn run(&self, code: &str, stage: &mut LoginStage) -> AuthResult<AuthenticationResult> {
        if code.is_empty() {
            return Err(AuthError::invalid_request("authorization code is empty"));
        }
        advance(stage, LoginStage::CodeReceived);

        let token_response = self.broker.exchange_code(code).await?;
        tracing::info!("Access token acquired.");
        advance(stage, LoginStage::TokenAcquired);

        let user_info = self
            .broker
            .fetch_userinfo(&token_response.access_token)
            .await?;
        advance(stage, LoginStage::IdentityFetched);

        let username = self.claims.resolve(&user_info)?;
        advance(stage, LoginStage::UsernameResolved);

        let name = self.allow_list.filter(&username)?;
        advance(stage, LoginStage::Filtered);

        let result = AuthenticationResult {
            name,
            auth_state: AuthState {
                token_response: token_response.to_value(),
                access_token: token_response.access_token,
                raw_user_info: Value::Object(user_info),
            },
        };
        advance(stage, LoginStage::Done);
        tracing::info!("User authenticated");

        Ok(result)
    }

    /// Translates an authenticated name to the local account name.
    ///
    /// Without a mapper the name is returned unchanged.
    pub async fn normalize_username(&self, username: &str) -> AuthResult<String> {
        match &self.mapper {
            Some(mapper) => mapper.resolve(username).await,
            None => Ok(username.to_string()),
        }
    }
}

fn advance(stage: &mut LoginStage, next: LoginStage) {
    tracing::debug!(from = %stage, to = %next, "Login stage");
    *stage = next;
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("claims", &self.claims)
            .field("allow_list", &self.allow_list)
            .field("has_mapper", &self.mapper.is_some())
            .finish_non_exhaustive()
    }
}
