//! Authorization redirect URL for the broker's login page.

use url::Url;

use crate::AuthResult;
use crate::config::CilogonConfig;
use crate::error::AuthError;

/// Builds the URL the browser is sent to when a login starts.
#[derive(Debug, Clone)]
pub struct AuthorizeRedirect {
    authorize_endpoint: Url,
    client_id: String,
    redirect_uri: String,
    scope: Vec<String>,
    selected_idp: Option<String>,
    skin: Option<String>,
}

impl AuthorizeRedirect {
    /// Creates a redirect builder for the given endpoint and client.
    #[must_use]
    pub fn new(
        authorize_endpoint: Url,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: Vec<String>,
    ) -> Self {
        Self {
            authorize_endpoint,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope,
            selected_idp: None,
            skin: None,
        }
    }

    /// Builds the redirect from a validated configuration.
    pub fn from_config(config: &CilogonConfig) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let endpoint = config
            .authorize_endpoint()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        Ok(Self::new(
            endpoint,
            &config.client.client_id,
            &config.client.callback_url,
            config.client.scope.clone(),
        )
        .with_selected_idp(&config.login.idp)
        .with_skin(&config.login.skin))
    }

    /// Preselects an identity provider by SAML entity id. Empty clears it.
    #[must_use]
    pub fn with_selected_idp(mut self, idp: impl Into<String>) -> Self {
        self.selected_idp = Some(idp.into()).filter(|s: &String| !s.is_empty());
        self
    }

    /// Uses a custom login page skin. Empty clears it.
    #[must_use]
    pub fn with_skin(mut self, skin: impl Into<String>) -> Self {
        self.skin = Some(skin.into()).filter(|s: &String| !s.is_empty());
        self
    }

    /// Returns the authorization URL for a login carrying `state`.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.authorize_endpoint.clone();
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", &self.redirect_uri);
            params.append_pair("scope", &self.scope.join(" "));
            params.append_pair("state", state);
            if let Some(idp) = &self.selected_idp {
                params.append_pair("selected_idp", idp);
            }
            if let Some(skin) = &self.skin {
                params.append_pair("skin", skin);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn redirect() -> AuthorizeRedirect {
        AuthorizeRedirect::new(
            Url::parse("https://cilogon.org/authorize").unwrap(),
            "client-1",
            "https://hub.example.org/callback",
            vec!["openid".to_string(), "email".to_string()],
        )
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_basic_url() {
        let url = redirect().authorize_url("st-1");
        let params = query(&url);
        assert_eq!(url.path(), "/authorize");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["redirect_uri"], "https://hub.example.org/callback");
        assert_eq!(params["scope"], "openid email");
        assert_eq!(params["state"], "st-1");
        assert!(!params.contains_key("selected_idp"));
        assert!(!params.contains_key("skin"));
    }

    #[test]
    fn test_idp_and_skin() {
        let url = redirect()
            .with_selected_idp("urn:mace:incommon:uiuc.edu")
            .with_skin("xsede")
            .authorize_url("st");
        let params = query(&url);
        assert_eq!(params["selected_idp"], "urn:mace:incommon:uiuc.edu");
        assert_eq!(params["skin"], "xsede");
    }

    #[test]
    fn test_empty_values_are_omitted() {
        let url = redirect().with_selected_idp("").with_skin("").authorize_url("st");
        let params = query(&url);
        assert!(!params.contains_key("selected_idp"));
        assert!(!params.contains_key("skin"));
    }

    #[test]
    fn test_from_config() {
        let mut config = CilogonConfig {
            host: "test.cilogon.org".to_string(),
            ..Default::default()
        };
        config.client.client_id = "id".to_string();
        config.client.client_secret = "secret".to_string();
        config.client.callback_url = "https://hub/cb".to_string();
        config.login.skin = "custom".to_string();

        let url = AuthorizeRedirect::from_config(&config)
            .unwrap()
            .authorize_url("s");
        assert_eq!(url.host_str(), Some("test.cilogon.org"));
        let params = query(&url);
        assert_eq!(params["skin"], "custom");
        assert_eq!(params["scope"], "openid email org.cilogon.userinfo");
    }

    #[test]
    fn test_from_config_rejects_missing_client_id() {
        let mut config = CilogonConfig::default();
        config.client.client_secret = "secret".to_string();
        config.client.callback_url = "https://hub/cb".to_string();

        let err = AuthorizeRedirect::from_config(&config).unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }
}
