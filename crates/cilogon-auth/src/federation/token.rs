//! Authorization code exchange against the broker's token endpoint.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AuthResult;
use crate::error::{AuthError, ExchangeStage};

/// Token endpoint response.
///
/// Only `access_token` is interpreted; every other field is kept verbatim in
/// `extra` so downstream provisioning sees exactly what the broker sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    /// The access token used for the userinfo request.
    pub access_token: String,

    /// All remaining fields (`token_type`, `id_token`, `expires_in`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenResponse {
    /// Returns the full response as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        let mut object = self.extra.clone();
        object.insert(
            "access_token".to_string(),
            serde_json::Value::String(self.access_token.clone()),
        );
        serde_json::Value::Object(object)
    }
}

/// OAuth error document returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorResponse {
    pub(crate) error: String,
    pub(crate) error_description: Option<String>,
}

/// Describes a non-2xx body, preferring the OAuth error fields when present.
pub(crate) fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(oauth) => match oauth.error_description {
            Some(desc) if !desc.is_empty() => format!("HTTP {status} - {}: {desc}", oauth.error),
            _ => format!("HTTP {status} - {}", oauth.error),
        },
        Err(_) => format!("HTTP {status}"),
    }
}

/// Headers sent with every broker request.
pub(crate) fn broker_headers(user_agent: &str) -> AuthResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let agent = HeaderValue::from_str(user_agent)
        .map_err(|e| AuthError::configuration(format!("invalid user agent: {e}")))?;
    headers.insert(USER_AGENT, agent);
    Ok(headers)
}

/// Client for the authorization-code grant.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http_client: reqwest::Client,
    token_endpoint: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl TokenExchangeClient {
    /// Creates a token exchange client.
    ///
    /// The HTTP client is expected to carry the broker headers as defaults.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        token_endpoint: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token_endpoint,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Exchanges a single-use authorization code for a token response.
    ///
    /// There are no retries: the code cannot be replayed safely, so any
    /// failure ends the login attempt.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];

        tracing::debug!(endpoint = %self.token_endpoint, "Exchanging authorization code");

        let response = self
            .http_client
            .post(self.token_endpoint.as_str())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::upstream(ExchangeStage::Token, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::upstream(
                ExchangeStage::Token,
                describe_failure(status, &body),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::upstream(ExchangeStage::Token, e.to_string()))?;

        let token_response: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            AuthError::upstream(
                ExchangeStage::Token,
                format!("Failed to parse token response: {e}"),
            )
        })?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::upstream(
                ExchangeStage::Token,
                "token response contains an empty access_token",
            ));
        }

        Ok(token_response)
    }
}
