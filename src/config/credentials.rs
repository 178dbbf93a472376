//! Service credentials, read once at process start.
//!
//! Nothing here is ever written to `settings.toml`.  [`Credentials`] is built
//! from the environment in `main` and handed to each service client's
//! constructor.

use std::fmt;

/// Environment variable holding the OpenAI-compatible API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable holding the GeoNames account name.
pub const GEONAMES_USERNAME_VAR: &str = "GEONAMES_USERNAME";

/// Secrets injected into the HTTP clients.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    /// Bearer token for the chat-completion and speech endpoints.
    pub openai_api_key: Option<String>,
    /// GeoNames `username` query parameter.
    pub geonames_username: Option<String>,
}

impl Credentials {
    /// Read both credentials from the process environment.
    ///
    /// Empty values are treated as absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary lookup function (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: non_empty(OPENAI_API_KEY_VAR),
            geonames_username: non_empty(GEONAMES_USERNAME_VAR),
        }
    }

    /// Names of the variables that are still missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key.is_none() {
            missing.push(OPENAI_API_KEY_VAR);
        }
        if self.geonames_username.is_none() {
            missing.push(GEONAMES_USERNAME_VAR);
        }
        missing
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("geonames_username", &redact(&self.geonames_username))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_values() {
        let creds = Credentials::from_lookup(|name| match name {
            OPENAI_API_KEY_VAR => Some("sk-test".into()),
            GEONAMES_USERNAME_VAR => Some("alice".into()),
            _ => None,
        });
        assert_eq!(creds.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(creds.geonames_username.as_deref(), Some("alice"));
        assert!(creds.missing().is_empty());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let creds = Credentials::from_lookup(|_| Some("   ".into()));
        assert_eq!(
            creds.missing(),
            vec![OPENAI_API_KEY_VAR, GEONAMES_USERNAME_VAR]
        );
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let creds = Credentials {
            openai_api_key: Some("sk-very-secret".into()),
            geonames_username: None,
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("<set>"));
        assert!(printed.contains("<unset>"));
    }
}
