use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rust_embed::Embed;

use crate::models::{
    CapPolicy, Config, Settings, DEFAULT_ENDPOINT, DEFAULT_EXISTS_COLOR, DEFAULT_MAX_COMPLETIONS,
    DEFAULT_NOT_EXISTS_COLOR, DEFAULT_TIMEOUT_MS, DEFAULT_WIKI_URL,
};

const SAMPLE_CONFIG: &str = include_str!("../config.sample.toml");
pub const DEFAULT_CONFIG: &str = "config.toml";

// Embedded result surface templates.
#[derive(Embed)]
#[folder = "templates/"]
struct Templates;

/// Fatal startup problems. The controller never runs with a config that fails here.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading config {path}: {err}", path = .0.display(), err = .1)]
    Read(PathBuf, std::io::Error),
    #[error("error parsing config {path}: {err}", path = .0.display(), err = .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("invalid endpoint '{0}': {1}")]
    Endpoint(String, String),
    #[error("invalid `{0}`: {1}")]
    Invalid(&'static str, String),
    #[error("error loading templates: {0}")]
    Templates(#[from] tera::Error),
}

/// Initialize logger.
pub fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            use std::io::Write;
            let level = if record.level() != log::Level::Info {
                format!("[{}] ", record.level())
            } else {
                String::new()
            };
            writeln!(
                buf,
                "{} {}:{} {}{}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                level,
                record.args()
            )
        })
        .init();
}

/// Config files to load. Paths given on the command line are used as they are;
/// without any, the default `config.toml` is used if it exists.
pub fn config_paths(given: &[PathBuf]) -> Vec<PathBuf> {
    if !given.is_empty() {
        return given.to_vec();
    }

    let default = PathBuf::from(DEFAULT_CONFIG);
    if default.exists() {
        vec![default]
    } else {
        log::info!("no {} found, using defaults", DEFAULT_CONFIG);
        Vec::new()
    }
}

/// Load and merge one or more config files.
pub fn init_config(paths: &[PathBuf]) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    for path in paths {
        log::info!("loading config: {}", path.display());
        let c = read_config(path)?;
        merge_config(&mut config, c);
    }

    Ok(config)
}

/// Load configuration from a given TOML file.
fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Merge the given src config into the dest config struct.
fn merge_config(dest: &mut Config, src: Config) {
    // Merge app config.
    if !src.app.endpoint.is_empty() {
        dest.app.endpoint = src.app.endpoint;
    }
    if src.app.min_length.is_some() {
        dest.app.min_length = src.app.min_length;
    }
    if src.app.max_completions.is_some() {
        dest.app.max_completions = src.app.max_completions;
    }
    if src.app.timeout_ms.is_some() {
        dest.app.timeout_ms = src.app.timeout_ms;
    }
    if src.app.debounce_ms.is_some() {
        dest.app.debounce_ms = src.app.debounce_ms;
    }
    if !src.app.exact_cap.is_empty() {
        dest.app.exact_cap = src.app.exact_cap;
    }
    if !src.app.exists_color.is_empty() {
        dest.app.exists_color = src.app.exists_color;
    }
    if !src.app.not_exists_color.is_empty() {
        dest.app.not_exists_color = src.app.not_exists_color;
    }
    if !src.app.wiki_url.is_empty() {
        dest.app.wiki_url = src.app.wiki_url;
    }

    // Merge server config.
    if !src.server.address.is_empty() {
        dest.server.address = src.server.address;
    }
    if src.server.max_completions.is_some() {
        dest.server.max_completions = src.server.max_completions;
    }
}

/// Resolve a loaded config into validated client settings.
pub fn init_settings(config: &Config) -> Result<Settings, ConfigError> {
    let app = &config.app;

    let endpoint = or_default(&app.endpoint, DEFAULT_ENDPOINT);
    let endpoint = reqwest::Url::parse(endpoint)
        .map_err(|e| ConfigError::Endpoint(endpoint.to_string(), e.to_string()))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::Endpoint(
            endpoint.to_string(),
            "scheme must be http or https".to_string(),
        ));
    }

    let max_completions = app.max_completions.unwrap_or(DEFAULT_MAX_COMPLETIONS);
    if max_completions == 0 {
        return Err(ConfigError::Invalid(
            "max_completions",
            "must be greater than 0".to_string(),
        ));
    }

    let exact_cap = match app.exact_cap.as_str() {
        "" | "each" => CapPolicy::Each,
        "once" => CapPolicy::Once,
        other => {
            return Err(ConfigError::Invalid(
                "exact_cap",
                format!("unknown policy '{}' (expected 'each' or 'once')", other),
            ))
        }
    };

    let wiki_url = or_default(&app.wiki_url, DEFAULT_WIKI_URL);
    if !wiki_url.contains("{index}") || !wiki_url.contains("{word}") {
        return Err(ConfigError::Invalid(
            "wiki_url",
            "template needs both {index} and {word}".to_string(),
        ));
    }

    let timeout_ms = app.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "timeout_ms",
            "must be greater than 0".to_string(),
        ));
    }

    Ok(Settings {
        endpoint,
        min_length: app.min_length.unwrap_or(0),
        max_completions,
        timeout: Duration::from_millis(timeout_ms),
        debounce: Duration::from_millis(app.debounce_ms.unwrap_or(0)),
        exact_cap,
        exists_color: or_default(&app.exists_color, DEFAULT_EXISTS_COLOR).to_string(),
        not_exists_color: or_default(&app.not_exists_color, DEFAULT_NOT_EXISTS_COLOR).to_string(),
        wiki_url: wiki_url.to_string(),
    })
}

fn or_default<'a>(v: &'a str, default: &'a str) -> &'a str {
    if v.is_empty() {
        default
    } else {
        v
    }
}

/// Initialize the result surface templates (embedded in the binary).
pub fn init_templates() -> Result<tera::Tera, ConfigError> {
    let mut tera = tera::Tera::default();
    tera.autoescape_on(vec![".html"]);

    for file in Templates::iter() {
        let path = file.as_ref();
        if !path.ends_with(".html") {
            continue;
        }
        if let Some(content) = Templates::get(path) {
            if let Ok(s) = std::str::from_utf8(&content.data) {
                tera.add_raw_template(path, s)?;
            }
        }
    }

    Ok(tera)
}

/// Generate sample config file.
pub fn generate_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err("config file already exists".into());
    }
    std::fs::write(path, SAMPLE_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(s: &str) -> Result<Settings, ConfigError> {
        let config: Config = toml::from_str(s).unwrap();
        init_settings(&config)
    }

    #[test]
    fn test_defaults() {
        let s = settings("").unwrap();
        assert_eq!(s.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(s.min_length, 0);
        assert_eq!(s.max_completions, 50);
        assert_eq!(s.timeout, Duration::from_millis(5000));
        assert_eq!(s.debounce, Duration::ZERO);
        assert_eq!(s.exact_cap, CapPolicy::Each);
        assert_eq!(s.exists_color, "#000000");
        assert_eq!(s.not_exists_color, "#CC0000");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).unwrap();
        let s = init_settings(&config).unwrap();
        assert_eq!(s.max_completions, 50);
        assert_eq!(config.server.max_completions, Some(25));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            settings("[app]\nendpoint = \"not a url\""),
            Err(ConfigError::Endpoint(..))
        ));
        assert!(matches!(
            settings("[app]\nendpoint = \"ftp://example.org/api/word\""),
            Err(ConfigError::Endpoint(..))
        ));
        assert!(matches!(
            settings("[app]\nmax_completions = 0"),
            Err(ConfigError::Invalid("max_completions", _))
        ));
        assert!(matches!(
            settings("[app]\nwiki_url = \"https://en.wikipedia.org/wiki/{word}\""),
            Err(ConfigError::Invalid("wiki_url", _))
        ));
        assert!(matches!(
            settings("[app]\nexact_cap = \"sometimes\""),
            Err(ConfigError::Invalid("exact_cap", _))
        ));
    }

    #[test]
    fn test_merge_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        std::fs::write(&a, "[app]\nmin_length = 2\nmax_completions = 10\n").unwrap();
        std::fs::write(&b, "[app]\nmax_completions = 5\nexact_cap = \"once\"\n").unwrap();

        let config = init_config(&[a, b]).unwrap();
        let s = init_settings(&config).unwrap();

        assert_eq!(s.min_length, 2);
        assert_eq!(s.max_completions, 5);
        assert_eq!(s.exact_cap, CapPolicy::Once);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confg.toml");

        let err = init_config(&[path.clone()]).unwrap_err();
        assert!(matches!(&err, ConfigError::Read(p, _) if *p == path));
        assert!(err.to_string().starts_with(&format!(
            "error reading config {}: ",
            path.display()
        )));
    }

    #[test]
    fn test_given_config_paths_are_kept() {
        let given = vec![PathBuf::from("a.toml"), PathBuf::from("missing.toml")];
        assert_eq!(config_paths(&given), given);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[app\n").unwrap();

        match init_config(&[path.clone()]) {
            Err(ConfigError::Parse(p, _)) => assert_eq!(p, path),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_generate_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        generate_config(&path).unwrap();
        assert!(generate_config(&path).is_err());
    }

    #[test]
    fn test_templates_load() {
        let tera = init_templates().unwrap();
        assert!(tera.get_template_names().any(|n| n == "results.html"));
    }
}
