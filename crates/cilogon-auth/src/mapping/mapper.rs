//! Username normalization against the mapping table.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::UsernameMap;
use super::cache::MappingCache;
use super::source::{FileMappingSource, MappingSource};
use crate::AuthResult;
use crate::config::MappingConfig;
use crate::error::AuthError;

/// Lower-cases usernames and optionally strips the text matching a pattern.
#[derive(Debug, Clone)]
pub struct NameShortener {
    full_names: bool,
    pattern: Regex,
}

impl NameShortener {
    /// Pattern removing everything from the first `@` on.
    pub const DEFAULT_PATTERN: &'static str = "@.*$";

    /// Creates a shortener.
    ///
    /// With `full_names` set the pattern is never applied.
    pub fn new(full_names: bool, pattern: &str) -> AuthResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            AuthError::configuration(format!("invalid name pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            full_names,
            pattern,
        })
    }

    /// Lower-cases `username` and, unless full names are kept, removes every
    /// match of the pattern.
    #[must_use]
    pub fn shorten(&self, username: &str) -> String {
        let lowered = username.to_lowercase();
        if self.full_names {
            lowered
        } else {
            self.pattern.replace_all(&lowered, "").into_owned()
        }
    }
}

/// Maps resolved identities to local account names through a cached file.
#[derive(Debug)]
pub struct UsernameMapper {
    cache: MappingCache,
    shortener: NameShortener,
}

impl UsernameMapper {
    /// Creates a mapper over an arbitrary source.
    #[must_use]
    pub fn new(source: Arc<dyn MappingSource>, shortener: NameShortener) -> Self {
        Self {
            cache: MappingCache::new(source),
            shortener,
        }
    }

    /// Creates a file-backed mapper from configuration.
    pub fn from_config(config: &MappingConfig) -> AuthResult<Self> {
        let shortener = NameShortener::new(config.full_names, &config.name_regex)?;
        Ok(Self::new(
            Arc::new(FileMappingSource::new(&config.map_file)),
            shortener,
        ))
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }
}

#[async_trait]
impl UsernameMap for UsernameMapper {
    async fn resolve(&self, username: &str) -> AuthResult<String> {
        let table = self.cache.table().await?;
        let normalized = self.shortener.shorten(username);
        match table.get(&normalized) {
            Some(local) => {
                tracing::debug!(local = %local, "Mapped username to local account");
                Ok(local.to_string())
            }
            None => Ok(normalized),
        }
    }
}
