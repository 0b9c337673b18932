use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "re_register/0.2";
pub const DEFAULT_PAGE_PREFIX: &str =
    "Paulys Realencyclopädie der classischen Altertumswissenschaft/Register";
pub const DEFAULT_EDIT_SUMMARY: &str = "Register aktualisiert";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RegisterConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub register: RegisterSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RegisterSection {
    pub page_prefix: Option<String>,
    pub edit_summary: Option<String>,
    pub scan_budget_seconds: Option<u64>,
}

/// Bot login read from `WIKI_BOT_USER` / `WIKI_BOT_PASS`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RegisterConfig {
    /// Resolve the wiki API URL: env WIKI_API_URL > config > None.
    pub fn api_url(&self) -> Option<String> {
        self.api_url_with_lookup(|key| env::var(key).ok())
    }

    fn api_url_with_lookup<F>(&self, lookup_env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        non_empty(lookup_env("WIKI_API_URL")).or_else(|| self.wiki.api_url.clone())
    }

    /// Resolve user agent: env WIKI_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        self.user_agent_with_lookup(|key| env::var(key).ok())
    }

    fn user_agent_with_lookup<F>(&self, lookup_env: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        non_empty(lookup_env("WIKI_USER_AGENT"))
            .or_else(|| self.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        credentials_with_lookup(|key| env::var(key).ok())
    }

    pub fn page_prefix(&self) -> &str {
        self.register
            .page_prefix
            .as_deref()
            .map(|prefix| prefix.trim_end_matches('/'))
            .unwrap_or(DEFAULT_PAGE_PREFIX)
    }

    pub fn edit_summary(&self) -> &str {
        self.register
            .edit_summary
            .as_deref()
            .unwrap_or(DEFAULT_EDIT_SUMMARY)
    }

    /// Wall-clock limit for one scan run; unset or zero means no limit.
    pub fn scan_budget(&self) -> Option<Duration> {
        self.register
            .scan_budget_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
    }
}

fn credentials_with_lookup<F>(lookup_env: F) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let username = non_empty(lookup_env("WIKI_BOT_USER"))?;
    let password = non_empty(lookup_env("WIKI_BOT_PASS"))?;
    Some(Credentials { username, password })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Load and parse a RegisterConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<RegisterConfig> {
    if !config_path.exists() {
        return Ok(RegisterConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: RegisterConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/config.toml")).expect("load config");
        assert_eq!(config, RegisterConfig::default());
        assert_eq!(config.page_prefix(), DEFAULT_PAGE_PREFIX);
        assert_eq!(config.edit_summary(), DEFAULT_EDIT_SUMMARY);
        assert_eq!(config.scan_budget(), None);
    }

    #[test]
    fn load_config_parses_both_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[wiki]
api_url = "https://de.wikisource.org/w/api.php"
user_agent = "test-agent/1.0"

[register]
page_prefix = "RE/Register/"
edit_summary = "Test"
scan_budget_seconds = 600
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(
            config.api_url_with_lookup(|_| None).as_deref(),
            Some("https://de.wikisource.org/w/api.php")
        );
        assert_eq!(config.user_agent_with_lookup(|_| None), "test-agent/1.0");
        assert_eq!(config.page_prefix(), "RE/Register");
        assert_eq!(config.edit_summary(), "Test");
        assert_eq!(config.scan_budget(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[register]\nscan_budget_seconds = 0\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(config.wiki.api_url.is_none());
        assert_eq!(config.scan_budget(), None);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[wiki\napi_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_overrides_config_values() {
        let config = RegisterConfig {
            wiki: WikiSection {
                api_url: Some("https://config.example/api.php".to_string()),
                user_agent: None,
            },
            ..RegisterConfig::default()
        };
        let env = HashMap::from([
            ("WIKI_API_URL".to_string(), " https://env.example/api.php ".to_string()),
            ("WIKI_USER_AGENT".to_string(), "   ".to_string()),
        ]);
        assert_eq!(
            config
                .api_url_with_lookup(|key| env.get(key).cloned())
                .as_deref(),
            Some("https://env.example/api.php")
        );
        assert_eq!(
            config.user_agent_with_lookup(|key| env.get(key).cloned()),
            DEFAULT_USER_AGENT
        );
    }

    #[test]
    fn credentials_need_user_and_password() {
        let env = HashMap::from([("WIKI_BOT_USER".to_string(), "Bot".to_string())]);
        assert!(credentials_with_lookup(|key| env.get(key).cloned()).is_none());

        let env = HashMap::from([
            ("WIKI_BOT_USER".to_string(), "Bot".to_string()),
            ("WIKI_BOT_PASS".to_string(), "secret".to_string()),
        ]);
        let credentials = credentials_with_lookup(|key| env.get(key).cloned()).expect("credentials");
        assert_eq!(credentials.username, "Bot");
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
