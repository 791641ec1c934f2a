//! API key discovery.
//!
//! The key is looked up in `GEMINI_API_KEY`, then `API_KEY`, then the
//! `api.api_key` entry of the config file.

use thiserror::Error;

use crate::gemini::{API_KEY_ENV, GEMINI_API_KEY_ENV};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error(
        "No API key found. Set {} or {} (a .env file works too), or api.api_key in the config file",
        GEMINI_API_KEY_ENV,
        API_KEY_ENV
    )]
    NotFound,
}

/// Source of the access key used for video generation.
pub trait CredentialProvider {
    /// Whether a key is currently available without prompting.
    fn has_key(&self) -> bool;

    /// Select (or re-select) a key and return it.
    fn select_key(&mut self) -> Result<String, CredentialError>;
}

/// Reads the key from the process environment with an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    fallback: Option<String>,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `key` when neither environment variable is set.
    pub fn with_fallback(key: Option<String>) -> Self {
        Self {
            fallback: key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Current key, if any.
    pub fn current(&self) -> Option<String> {
        resolve(|name| std::env::var(name).ok(), self.fallback.as_deref())
    }
}

impl CredentialProvider for EnvCredentials {
    fn has_key(&self) -> bool {
        self.current().is_some()
    }

    fn select_key(&mut self) -> Result<String, CredentialError> {
        // Keys in .env replace the ones loaded at startup.
        if let Ok(entries) = dotenv::dotenv_iter() {
            for (name, value) in key_entries(entries.flatten()) {
                std::env::set_var(name, value);
            }
        }
        let key = self.current().ok_or(CredentialError::NotFound)?;
        log::info!("API key selected");
        Ok(key)
    }
}

/// The key variables among `entries`, with blank values dropped.
fn key_entries(
    entries: impl IntoIterator<Item = (String, String)>,
) -> Vec<(String, String)> {
    entries
        .into_iter()
        .filter(|(name, value)| {
            (name == GEMINI_API_KEY_ENV || name == API_KEY_ENV) && !value.trim().is_empty()
        })
        .collect()
}

fn resolve(lookup: impl Fn(&str) -> Option<String>, fallback: Option<&str>) -> Option<String> {
    [GEMINI_API_KEY_ENV, API_KEY_ENV]
        .into_iter()
        .filter_map(lookup)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| fallback.map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_gemini_key_wins() {
        let lookup = env(&[("GEMINI_API_KEY", "g-key"), ("API_KEY", "plain")]);
        assert_eq!(resolve(lookup, Some("cfg")), Some("g-key".to_string()));
    }

    #[test]
    fn test_falls_back_to_api_key() {
        let lookup = env(&[("API_KEY", "plain")]);
        assert_eq!(resolve(lookup, None), Some("plain".to_string()));
    }

    #[test]
    fn test_blank_env_value_is_skipped() {
        let lookup = env(&[("GEMINI_API_KEY", "  "), ("API_KEY", "plain")]);
        assert_eq!(resolve(lookup, None), Some("plain".to_string()));
    }

    #[test]
    fn test_config_fallback_last() {
        assert_eq!(resolve(env(&[]), Some("cfg")), Some("cfg".to_string()));
        assert_eq!(resolve(env(&[]), None), None);
    }

    #[test]
    fn test_blank_fallback_ignored() {
        let creds = EnvCredentials::with_fallback(Some("   ".to_string()));
        assert!(creds.fallback.is_none());
    }

    #[test]
    fn test_env_file_keys_are_collected() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(
            &path,
            "OTHER=1\nGEMINI_API_KEY=corrected-key\nAPI_KEY=\n",
        )
        .unwrap();

        let entries = dotenv::from_path_iter(&path).unwrap().flatten();
        assert_eq!(
            key_entries(entries),
            vec![("GEMINI_API_KEY".to_string(), "corrected-key".to_string())]
        );
    }

    #[test]
    fn test_collected_key_overrides_stale_lookup() {
        let stale = env(&[("GEMINI_API_KEY", "rejected-key")]);
        let fresh: HashMap<String, String> =
            key_entries(vec![("GEMINI_API_KEY".to_string(), "corrected-key".to_string())])
                .into_iter()
                .collect();
        let lookup = |name: &str| fresh.get(name).cloned().or_else(|| stale(name));
        assert_eq!(resolve(lookup, None), Some("corrected-key".to_string()));
    }

    #[test]
    fn test_error_names_variables() {
        let msg = CredentialError::NotFound.to_string();
        assert!(msg.contains("GEMINI_API_KEY"));
        assert!(msg.contains("API_KEY"));
    }
}
