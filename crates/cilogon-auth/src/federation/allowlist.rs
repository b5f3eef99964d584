//! Identity provider allow-listing on `local@provider` usernames.

use crate::AuthResult;
use crate::config::IdentityConfig;
use crate::error::AuthError;

/// Restricts usernames to allow-listed identity provider suffixes.
#[derive(Debug, Clone, Default)]
pub struct IdpAllowList {
    allowed: Vec<String>,
    strip_domain: bool,
}

impl IdpAllowList {
    /// Creates an allow-list. An empty list disables the restriction.
    ///
    /// Entries are kept as given, duplicates included; domain stripping
    /// requires exactly one entry.
    #[must_use]
    pub fn new<I, S>(allowed: I, strip_domain: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            strip_domain,
        }
    }

    /// Builds the allow-list from the identity configuration.
    #[must_use]
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.allowed_idps.iter().cloned(), config.strip_idp_domain)
    }

    /// Returns `true` when usernames are restricted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.allowed.is_empty()
    }

    /// Returns `true` when a filtered username loses its provider suffix.
    #[must_use]
    pub fn strips_domain(&self) -> bool {
        self.strip_domain && self.allowed.len() == 1
    }

    /// Allowed provider suffixes.
    #[must_use]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Applies the allow-list to a resolved username.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedUsername`] if the list is enabled and the
    ///   username does not contain exactly one `@` between a non-empty local
    ///   part and provider.
    /// - [`AuthError::IdentityProviderRejected`] if the provider is not listed.
    pub fn filter(&self, username: &str) -> AuthResult<String> {
        if !self.is_enabled() {
            return Ok(username.to_string());
        }

        let (local, idp) = split_username(username)
            .ok_or_else(|| AuthError::malformed_username(username))?;

        if !self.allowed.iter().any(|allowed| allowed == idp) {
            tracing::warn!(idp = %idp, "Trying to login from not allowed identity provider");
            return Err(AuthError::idp_rejected(idp));
        }

        if self.strips_domain() {
            Ok(local.to_string())
        } else {
            Ok(username.to_string())
        }
    }
}

fn split_username(username: &str) -> Option<(&str, &str)> {
    let (local, idp) = username.split_once('@')?;
    if local.is_empty() || idp.is_empty() || idp.contains('@') {
        return None;
    }
    Some((local, idp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_passes_everything() {
        let list = IdpAllowList::new(Vec::<String>::new(), true);
        assert!(!list.is_enabled());
        assert_eq!(list.filter("no-at-sign").unwrap(), "no-at-sign");
        assert_eq!(list.filter("a@b@c").unwrap(), "a@b@c");
    }

    #[test]
    fn test_single_entry_strips_domain() {
        let list = IdpAllowList::new(["email.com"], true);
        assert_eq!(list.filter("fake@email.com").unwrap(), "fake");
    }

    #[test]
    fn test_single_entry_without_strip_flag() {
        let list = IdpAllowList::new(["email.com"], false);
        assert_eq!(list.filter("fake@email.com").unwrap(), "fake@email.com");
    }

    #[test]
    fn test_rejects_unlisted_provider() {
        let list = IdpAllowList::new(["email.com"], true);
        let err = list.filter("x@other.com").unwrap_err();
        assert!(matches!(&err, AuthError::IdentityProviderRejected { idp } if idp == "other.com"));
        assert!(err.is_policy_rejection());
    }

    #[test]
    fn test_multiple_entries_never_strip() {
        let list = IdpAllowList::new(["email.com", "mycollege.edu"], true);
        assert!(!list.strips_domain());
        assert_eq!(list.filter("fake@email.com").unwrap(), "fake@email.com");
        assert_eq!(
            list.filter("fake2@mycollege.edu").unwrap(),
            "fake2@mycollege.edu"
        );
        assert!(list.filter("notallowed@notemail.com").is_err());
    }

    #[test]
    fn test_duplicate_entries_disable_stripping() {
        let list = IdpAllowList::new(["email.com", "email.com"], true);
        assert_eq!(list.allowed().len(), 2);
        assert!(!list.strips_domain());
        assert_eq!(list.filter("fake@email.com").unwrap(), "fake@email.com");
    }

    #[test]
    fn test_malformed_usernames() {
        let list = IdpAllowList::new(["email.com"], false);
        for bad in ["fake", "a@b@email.com", "@email.com", "fake@"] {
            let err = list.filter(bad).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedUsername { .. }),
                "expected malformed for {bad}"
            );
        }
    }

    #[test]
    fn test_suffix_match_is_exact() {
        let list = IdpAllowList::new(["email.com"], false);
        assert!(list.filter("fake@EMAIL.COM").is_err());
        assert!(list.filter("fake@sub.email.com").is_err());
    }
}
