//! API configuration parsed from environment variables.

use crate::error::AiError;

pub const DEFAULT_API_ROOT: &str = "http://localhost:3000";
pub const DEFAULT_CHAT_PATH: &str = "/groq/chat";
pub const DEFAULT_GENERATE_PATH: &str = "/ai/generate-design";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash.
    pub api_root: String,
    pub chat_path: String,
    pub generate_path: String,
    pub timeouts: Timeouts,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            generate_path: DEFAULT_GENERATE_PATH.to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ApiConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `FIZZLE_API_ROOT`: default `http://localhost:3000`
    /// - `FIZZLE_REQUEST_TIMEOUT_SECS`: default 120
    /// - `FIZZLE_CONNECT_TIMEOUT_SECS`: default 10
    pub fn from_env() -> Result<Self, AiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AiError> {
        let mut config = Self::default();
        if let Some(root) = lookup("FIZZLE_API_ROOT") {
            config = config.with_api_root(&root)?;
        }
        config.timeouts = Timeouts {
            request_secs: parse_secs(&lookup, "FIZZLE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_secs(&lookup, "FIZZLE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(config)
    }

    /// Replace the API root (e.g. from a CLI flag).
    pub fn with_api_root(mut self, root: &str) -> Result<Self, AiError> {
        let root = root.trim().trim_end_matches('/');
        if !(root.starts_with("http://") || root.starts_with("https://")) {
            return Err(AiError::Config(format!(
                "API root must be an http(s) URL, got '{root}'"
            )));
        }
        self.api_root = root.to_string();
        Ok(self)
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.api_root, self.chat_path)
    }

    pub fn generate_url(&self) -> String {
        format!("{}{}", self.api_root, self.generate_path)
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, AiError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(AiError::Config(format!("{key} must be a positive integer, got '{raw}'"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ApiConfig::default());
        assert_eq!(cfg.chat_url(), "http://localhost:3000/groq/chat");
        assert_eq!(cfg.generate_url(), "http://localhost:3000/ai/generate-design");
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("FIZZLE_API_ROOT", "https://api.example.test/"),
            ("FIZZLE_REQUEST_TIMEOUT_SECS", "42"),
            ("FIZZLE_CONNECT_TIMEOUT_SECS", " 7 "),
        ]))
        .unwrap();
        assert_eq!(cfg.api_root, "https://api.example.test");
        assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
    }

    #[test]
    fn bad_values_are_rejected() {
        for pairs in [
            [("FIZZLE_API_ROOT", "localhost:3000")],
            [("FIZZLE_REQUEST_TIMEOUT_SECS", "soon")],
            [("FIZZLE_CONNECT_TIMEOUT_SECS", "0")],
        ] {
            let err = ApiConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, AiError::Config(_)), "{pairs:?} gave {err:?}");
        }
    }
}
