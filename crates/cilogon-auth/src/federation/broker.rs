//! The identity broker seam used by the [`Authenticator`](super::Authenticator).

use async_trait::async_trait;

use super::token::{TokenExchangeClient, TokenResponse, broker_headers};
use super::userinfo::{UserInfo, UserInfoClient};
use crate::AuthResult;
use crate::config::CilogonConfig;
use crate::error::AuthError;

/// The two network exchanges of a login.
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Exchanges an authorization code for a token response.
    async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse>;

    /// Fetches the userinfo claims for an access token.
    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<UserInfo>;
}

/// [`IdentityBroker`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBroker {
    token: TokenExchangeClient,
    userinfo: UserInfoClient,
}

impl HttpBroker {
    /// Creates a broker from its two exchange clients.
    #[must_use]
    pub fn new(token: TokenExchangeClient, userinfo: UserInfoClient) -> Self {
        Self { token, userinfo }
    }

    /// Builds the broker clients from configuration, sharing one connection pool.
    ///
    /// The configuration is validated first, so a client without credentials
    /// or a callback URL is never built.
    pub fn from_config(config: &CilogonConfig) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .default_headers(broker_headers(&config.http.user_agent)?)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;

        let token_endpoint = config
            .token_endpoint()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let userinfo_endpoint = config
            .userinfo_endpoint()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        Ok(Self::new(
            TokenExchangeClient::new(
                http_client.clone(),
                token_endpoint,
                &config.client.client_id,
                &config.client.client_secret,
                &config.client.callback_url,
            ),
            UserInfoClient::new(http_client, userinfo_endpoint),
        ))
    }

    /// Returns the token exchange client.
    #[must_use]
    pub fn token_client(&self) -> &TokenExchangeClient {
        &self.token
    }

    /// Returns the userinfo client.
    #[must_use]
    pub fn userinfo_client(&self) -> &UserInfoClient {
        &self.userinfo
    }
}

#[async_trait]
impl IdentityBroker for HttpBroker {
    async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse> {
        self.token.exchange_code(code).await
    }

    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<UserInfo> {
        self.userinfo.fetch(access_token).await
    }
}
