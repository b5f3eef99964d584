//! Userinfo retrieval for an acquired access token.

use url::Url;

use super::token::describe_failure;
use crate::AuthResult;
use crate::error::{AuthError, ExchangeStage};

/// Claims returned by the userinfo endpoint, keyed by claim name.
pub type UserInfo = serde_json::Map<String, serde_json::Value>;

/// Client for the broker's userinfo endpoint.
#[derive(Debug, Clone)]
pub struct UserInfoClient {
    http_client: reqwest::Client,
    userinfo_endpoint: Url,
}

impl UserInfoClient {
    /// Creates a userinfo client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, userinfo_endpoint: Url) -> Self {
        Self {
            http_client,
            userinfo_endpoint,
        }
    }

    /// Returns the userinfo endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.userinfo_endpoint
    }

    /// Fetches the claims of the user the access token was issued to.
    ///
    /// The token travels as the `access_token` query parameter.
    pub async fn fetch(&self, access_token: &str) -> AuthResult<UserInfo> {
        let mut url = self.userinfo_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("access_token", access_token);

        tracing::debug!(endpoint = %self.userinfo_endpoint, "Fetching userinfo");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                // reqwest includes the URL, and with it the token, in its errors
                AuthError::upstream(ExchangeStage::UserInfo, e.without_url().to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::upstream(
                ExchangeStage::UserInfo,
                describe_failure(status, &body),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            AuthError::upstream(ExchangeStage::UserInfo, e.without_url().to_string())
        })?;

        let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            AuthError::upstream(
                ExchangeStage::UserInfo,
                format!("Failed to parse userinfo response: {e}"),
            )
        })?;

        match value {
            serde_json::Value::Object(claims) => Ok(claims),
            _ => Err(AuthError::upstream(
                ExchangeStage::UserInfo,
                "userinfo response is not a JSON object",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::token::broker_headers;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> UserInfoClient {
        let http_client = reqwest::Client::builder()
            .default_headers(broker_headers("test-agent").unwrap())
            .build()
            .unwrap();
        UserInfoClient::new(
            http_client,
            Url::parse(&format!("{}/oauth2/userinfo", server.uri())).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_passes_token_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/userinfo"))
            .and(query_param("access_token", "at-123"))
            .and(header("accept", "application/json"))
            .and(header("user-agent", "test-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "eppn": "jdoe@example.edu",
                "email": "jdoe@example.edu",
                "idp": "urn:mace:incommon:example.edu"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let claims = client_for(&server).fetch("at-123").await.unwrap();
        assert_eq!(claims["eppn"], "jdoe@example.edu");
        assert_eq!(claims.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch("expired").await.unwrap_err();
        match err {
            AuthError::UpstreamExchange { stage, message } => {
                assert_eq!(stage, ExchangeStage::UserInfo);
                assert!(message.contains("401"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["a"])))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch("t").await.unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[tokio::test]
    async fn test_fetch_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{broken"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch("t").await.unwrap_err();
        assert!(err.is_upstream_error());
    }

    /// Endpoint on a port nothing listens on.
    fn closed_endpoint(path: &str) -> Url {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Url::parse(&format!("http://127.0.0.1:{port}{path}")).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_hides_token() {
        let client =
            UserInfoClient::new(reqwest::Client::new(), closed_endpoint("/oauth2/userinfo"));

        let err = client.fetch("at-secret-123").await.unwrap_err();
        match err {
            AuthError::UpstreamExchange { stage, message } => {
                assert_eq!(stage, ExchangeStage::UserInfo);
                assert!(!message.contains("at-secret-123"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
