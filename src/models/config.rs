use std::time::Duration;

use serde::Deserialize;

/// Application configuration, as read from one or more TOML files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Search client settings. Unset values fall back to defaults when the
/// config is resolved into `Settings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_completions: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub debounce_ms: Option<u64>,
    #[serde(default)]
    pub exact_cap: String,
    #[serde(default)]
    pub exists_color: String,
    #[serde(default)]
    pub not_exists_color: String,
    #[serde(default)]
    pub wiki_url: String,
}

/// Development index server settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub max_completions: Option<usize>,
}

/// How exact-match entries count toward the completion cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapPolicy {
    /// Every rendered exact-match entry takes one slot.
    #[default]
    Each,
    /// The exact-match block takes a single slot, however many indexes it has.
    Once,
}

/// Resolved and validated client settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: reqwest::Url,
    pub min_length: usize,
    pub max_completions: usize,
    pub timeout: Duration,
    pub debounce: Duration,
    pub exact_cap: CapPolicy,
    pub exists_color: String,
    pub not_exists_color: String,
    /// Target URL template with `{index}` and `{word}` placeholders.
    pub wiki_url: String,
}

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:53172/api/word";
pub const DEFAULT_MAX_COMPLETIONS: usize = 50;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_EXISTS_COLOR: &str = "#000000";
pub const DEFAULT_NOT_EXISTS_COLOR: &str = "#CC0000";
pub const DEFAULT_WIKI_URL: &str = "https://{index}.wikipedia.org/wiki/{word}";

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: reqwest::Url::parse(DEFAULT_ENDPOINT).expect("valid default endpoint"),
            min_length: 0,
            max_completions: DEFAULT_MAX_COMPLETIONS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            debounce: Duration::ZERO,
            exact_cap: CapPolicy::Each,
            exists_color: DEFAULT_EXISTS_COLOR.to_string(),
            not_exists_color: DEFAULT_NOT_EXISTS_COLOR.to_string(),
            wiki_url: DEFAULT_WIKI_URL.to_string(),
        }
    }
}
