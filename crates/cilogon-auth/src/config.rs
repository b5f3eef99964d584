//! Authenticator configuration.
//!
//! The configuration is split into sections for the OAuth client itself,
//! broker endpoints, username resolution policy, login-page parameters and the
//! optional local username mapping.
//!
//! # Example (TOML)
//!
//! ```toml
//! host = "cilogon.org"
//!
//! [client]
//! client_id = "cilogon:/client_id/1234"
//! client_secret = "secret"
//! callback_url = "https://hub.example.org/hub/oauth_callback"
//!
//! [identity]
//! username_claim = "eppn"
//! additional_username_claims = ["email"]
//! allowed_idps = ["example.edu"]
//! strip_idp_domain = true
//!
//! [mapping]
//! map_file = "/etc/cilogon/mapfile"
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Broker host used when neither the config nor `CILOGON_HOST` names one.
pub const DEFAULT_HOST: &str = "cilogon.org";

/// Environment variable overriding the default broker host.
pub const HOST_ENV: &str = "CILOGON_HOST";

/// Fallback environment variable for the OAuth client id.
pub const CLIENT_ID_ENV: &str = "CILOGON_CLIENT_ID";

/// Fallback environment variable for the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "CILOGON_CLIENT_SECRET";

/// Scope the broker requires on every authorization request.
pub const OPENID_SCOPE: &str = "openid";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CilogonConfig {
    /// Broker host name; endpoints default to `https://<host>/...`.
    pub host: String,

    /// OAuth client registration.
    pub client: ClientConfig,

    /// Optional endpoint overrides.
    pub endpoints: EndpointsConfig,

    /// Username resolution and identity provider policy.
    pub identity: IdentityConfig,

    /// Extra parameters for the broker's login page.
    pub login: LoginConfig,

    /// Local username mapping. Disabled when absent.
    pub mapping: Option<MappingConfig>,

    /// Outbound HTTP settings.
    pub http: HttpConfig,
}

impl Default for CilogonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            client: ClientConfig::default(),
            endpoints: EndpointsConfig::default(),
            identity: IdentityConfig::default(),
            login: LoginConfig::default(),
            mapping: None,
            http: HttpConfig::default(),
        }
    }
}

fn default_host() -> String {
    std::env::var(HOST_ENV)
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// OAuth client registration at the broker.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Redirect URI registered with the broker.
    pub callback_url: String,

    /// Scopes to request. `openid` is always included.
    pub scope: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            scope: vec![
                OPENID_SCOPE.to_string(),
                "email".to_string(),
                "org.cilogon.userinfo".to_string(),
            ],
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Endpoint overrides. Unset endpoints are derived from [`CilogonConfig::host`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Authorization endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize: Option<String>,

    /// Token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Userinfo endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo: Option<String>,
}

/// How the application username is derived from the broker's claims.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Primary userinfo claim holding the username (e.g. `eppn`, `email`).
    pub username_claim: String,

    /// Claims tried in order when the primary claim is absent.
    /// Useful for linked identities that do not all release the primary claim.
    pub additional_username_claims: Vec<String>,

    /// Identity provider suffixes allowed after the `@` of the username.
    /// Empty means no restriction.
    pub allowed_idps: Vec<String>,

    /// Strip the provider suffix from the username. Only applies when
    /// exactly one provider is allowed.
    pub strip_idp_domain: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            username_claim: "eppn".to_string(),
            additional_username_claims: Vec::new(),
            allowed_idps: Vec::new(),
            strip_idp_domain: false,
        }
    }
}

/// Parameters appended to the authorization redirect.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginConfig {
    /// SAML entity id of the identity provider to preselect (`selected_idp`).
    pub idp: String,

    /// Name of a custom broker interface skin.
    pub skin: String,
}

/// Local username mapping from an external file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingConfig {
    /// File with `external_name local_name` pairs, one per line.
    pub map_file: PathBuf,

    /// Look up the full resolved username instead of the shortened one.
    pub full_names: bool,

    /// Text matching this regular expression is removed from the username
    /// before lookup unless `full_names` is set.
    pub name_regex: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            map_file: PathBuf::from("mapfile"),
            full_names: false,
            name_regex: "@.*$".to_string(),
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for each broker request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// `User-Agent` header sent to the broker.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("cilogon-auth/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl CilogonConfig {
    /// Ensures `openid` is the first requested scope when it is missing.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.client.scope.iter().any(|s| s == OPENID_SCOPE) {
            self.client.scope.insert(0, OPENID_SCOPE.to_string());
        }
        self
    }

    /// Authorization endpoint, explicit or derived from the host.
    pub fn authorize_endpoint(&self) -> Result<Url, ConfigError> {
        self.endpoint(self.endpoints.authorize.as_deref(), "authorize", "/authorize")
    }

    /// Token endpoint, explicit or derived from the host.
    pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
        self.endpoint(self.endpoints.token.as_deref(), "token", "/oauth2/token")
    }

    /// Userinfo endpoint, explicit or derived from the host.
    pub fn userinfo_endpoint(&self) -> Result<Url, ConfigError> {
        self.endpoint(
            self.endpoints.userinfo.as_deref(),
            "userinfo",
            "/oauth2/userinfo",
        )
    }

    fn endpoint(
        &self,
        explicit: Option<&str>,
        name: &str,
        path: &str,
    ) -> Result<Url, ConfigError> {
        let raw = match explicit {
            Some(url) => url.to_string(),
            None => format!("https://{}{}", self.host, path),
        };
        Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidValue(format!("{name} endpoint '{raw}' is not a valid URL: {e}"))
        })
    }

    /// Copy of this configuration with the client secret masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.client.client_secret.is_empty() {
            copy.client.client_secret = "********".to_string();
        }
        copy
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when the client id, secret, callback URL
    /// or username claim is empty, and `ConfigError::InvalidValue` when a URL
    /// does not parse, the mapping regex does not compile or the request
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host".to_string()));
        }
        if self.client.client_id.is_empty() {
            return Err(ConfigError::Missing("client.client_id".to_string()));
        }
        if self.client.client_secret.is_empty() {
            return Err(ConfigError::Missing("client.client_secret".to_string()));
        }
        if self.client.callback_url.is_empty() {
            return Err(ConfigError::Missing("client.callback_url".to_string()));
        }
        Url::parse(&self.client.callback_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "client.callback_url '{}' is not a valid URL: {e}",
                self.client.callback_url
            ))
        })?;

        if self.identity.username_claim.trim().is_empty() {
            return Err(ConfigError::Missing("identity.username_claim".to_string()));
        }

        self.authorize_endpoint()?;
        self.token_endpoint()?;
        self.userinfo_endpoint()?;

        if let Some(mapping) = &self.mapping {
            regex::Regex::new(&mapping.name_regex).map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "mapping.name_regex '{}' does not compile: {e}",
                    mapping.name_regex
                ))
            })?;
            if mapping.map_file.as_os_str().is_empty() {
                return Err(ConfigError::Missing("mapping.map_file".to_string()));
            }
        }

        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "http.request_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Layered configuration loading: TOML file, then environment overrides.
pub mod loader {
    use std::path::PathBuf;

    use ::config::{Config, Environment, File};

    use super::{CLIENT_ID_ENV, CLIENT_SECRET_ENV, CilogonConfig, ConfigError};

    /// File tried when no explicit path is given.
    pub const DEFAULT_CONFIG_PATH: &str = "cilogon.toml";

    /// Prefix of environment overrides, e.g. `CILOGON__CLIENT__CLIENT_ID`.
    pub const ENV_PREFIX: &str = "CILOGON";

    /// Loads, normalizes and validates the configuration.
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    pub fn load_config(path: Option<&str>) -> Result<CilogonConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );

        let merged: CilogonConfig = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;

        let mut cfg = merged.normalized();
        apply_legacy_env(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fills empty client credentials from the legacy single-underscore variables.
    fn apply_legacy_env(cfg: &mut CilogonConfig) {
        if cfg.client.client_id.is_empty()
            && let Ok(id) = std::env::var(CLIENT_ID_ENV)
        {
            cfg.client.client_id = id;
        }
        if cfg.client.client_secret.is_empty()
            && let Ok(secret) = std::env::var(CLIENT_SECRET_ENV)
        {
            cfg.client.client_secret = secret;
        }
    }
}
