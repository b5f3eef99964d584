//! Username resolution from userinfo claims.

use serde_json::Value;

use super::userinfo::UserInfo;
use crate::AuthResult;
use crate::config::IdentityConfig;
use crate::error::AuthError;

/// Ordered, non-empty list of claim names to take the username from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimList {
    claims: Vec<String>,
}

impl ClaimList {
    /// Creates a claim list with the primary claim first, then fallbacks.
    ///
    /// Repeated names keep their first position only.
    #[must_use]
    pub fn new<I, S>(primary: impl Into<String>, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut claims = vec![primary.into()];
        for claim in fallbacks {
            let claim = claim.into();
            if !claims.contains(&claim) {
                claims.push(claim);
            }
        }
        Self { claims }
    }

    /// Builds the list from the identity configuration.
    #[must_use]
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(
            config.username_claim.clone(),
            config.additional_username_claims.iter().cloned(),
        )
    }

    /// The primary claim.
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.claims[0]
    }

    /// All claims in priority order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.claims
    }

    /// Number of claims, always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Always `false`; a claim list holds at least the primary claim.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Picks the username from the first claim in the list that carries one.
#[derive(Debug, Clone)]
pub struct ClaimResolver {
    claims: ClaimList,
}

impl ClaimResolver {
    /// Creates a resolver over the given claim list.
    #[must_use]
    pub fn new(claims: ClaimList) -> Self {
        Self { claims }
    }

    /// Returns the claim list.
    #[must_use]
    pub fn claims(&self) -> &ClaimList {
        &self.claims
    }

    /// Resolves the username.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::IdentityResolution`] with the claims tried and the
    /// claim names present when no listed claim yields a username. Claim
    /// values are never logged.
    pub fn resolve(&self, user_info: &UserInfo) -> AuthResult<String> {
        for claim in self.claims.as_slice() {
            if let Some(username) = user_info.get(claim).and_then(username_from_value) {
                tracing::debug!(claim = %claim, "Resolved username from claim");
                return Ok(username);
            }
        }

        let mut available: Vec<String> = user_info.keys().cloned().collect();
        available.sort();

        if self.claims.len() < 2 {
            tracing::error!(
                claim = %self.claims.primary(),
                available = ?available,
                "Username claim not found in response"
            );
        } else {
            tracing::error!(
                claims = ?self.claims.as_slice(),
                available = ?available,
                "No username claim found in response"
            );
        }

        Err(AuthError::IdentityResolution {
            tried: self.claims.as_slice().to_vec(),
            available,
        })
    }
}

/// A non-empty string, or the first non-empty string of a multi-valued claim.
fn username_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: Value) -> UserInfo {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_claim_list_order_and_dedup() {
        let list = ClaimList::new("eppn", ["email", "eppn", "sub", "email"]);
        assert_eq!(list.as_slice(), ["eppn", "email", "sub"]);
        assert_eq!(list.primary(), "eppn");
        assert!(!list.is_empty());
    }

    #[test]
    fn test_claim_list_without_fallbacks() {
        let list = ClaimList::new("eppn", Vec::<String>::new());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_claim_list_from_config() {
        let config = IdentityConfig {
            username_claim: "email".to_string(),
            additional_username_claims: vec!["eppn".to_string()],
            ..Default::default()
        };
        assert_eq!(ClaimList::from_config(&config).as_slice(), ["email", "eppn"]);
    }

    #[test]
    fn test_primary_claim_wins() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", ["email"]));
        let name = resolver
            .resolve(&info(json!({"eppn": "jdoe@example.edu", "email": "j@x.com"})))
            .unwrap();
        assert_eq!(name, "jdoe@example.edu");
    }

    #[test]
    fn test_fallback_claim() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", ["email"]));
        let name = resolver.resolve(&info(json!({"email": "a@b.com"}))).unwrap();
        assert_eq!(name, "a@b.com");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", ["oidc", "email"]));
        let name = resolver
            .resolve(&info(json!({"eppn": "", "oidc": null, "email": "c@d.org"})))
            .unwrap();
        assert_eq!(name, "c@d.org");
    }

    #[test]
    fn test_multi_valued_claim() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", Vec::<String>::new()));
        let name = resolver
            .resolve(&info(json!({"eppn": ["", "first@example.edu", "second@example.edu"]})))
            .unwrap();
        assert_eq!(name, "first@example.edu");
    }

    #[test]
    fn test_non_string_values_are_skipped() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", ["email"]));
        let err = resolver
            .resolve(&info(json!({"eppn": {"nested": "x"}, "email": 42})))
            .unwrap_err();
        assert!(matches!(err, AuthError::IdentityResolution { .. }));
    }

    #[test]
    fn test_no_claim_present() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", ["email"]));
        let err = resolver
            .resolve(&info(json!({"sub": "http://cilogon.org/serverA/users/1", "name": "J"})))
            .unwrap_err();

        match err {
            AuthError::IdentityResolution { tried, available } => {
                assert_eq!(tried, vec!["eppn", "email"]);
                assert_eq!(available, vec!["name", "sub"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_does_not_carry_values() {
        let resolver = ClaimResolver::new(ClaimList::new("eppn", Vec::<String>::new()));
        let err = resolver
            .resolve(&info(json!({"email": "private@example.org"})))
            .unwrap_err();
        assert!(!err.to_string().contains("private@example.org"));
    }
}
