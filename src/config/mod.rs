//! Configuration system (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, StockbotError};

/// Default model served by the local completion endpoint.
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";
/// Default market data host.
pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com";
/// Default location of the plotting artifact.
pub const DEFAULT_PLOT_PATH: &str = "assets/stock.svg";
/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "stockbot.toml";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// Process configuration for the assistant.
///
/// Only `base_url` and `api_key` are needed to talk to the completion
/// service; everything else has a default. Neither is required to build the
/// tool registry.
#[derive(Clone)]
pub struct StockbotConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
    pub tool_timeout: Duration,
    pub plot_path: PathBuf,
    pub market_data_url: String,
    pub stream: bool,
    pub system_prompt: Option<String>,
}

impl fmt::Debug for StockbotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockbotConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("tool_timeout", &self.tool_timeout)
            .field("plot_path", &self.plot_path)
            .field("market_data_url", &self.market_data_url)
            .field("stream", &self.stream)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl Default for StockbotConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            plot_path: PathBuf::from(DEFAULT_PLOT_PATH),
            market_data_url: DEFAULT_MARKET_DATA_URL.to_string(),
            stream: true,
            system_prompt: None,
        }
    }
}

/// On-disk shape of `stockbot.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    request_timeout_secs: Option<u64>,
    tool_timeout_secs: Option<u64>,
    plot_path: Option<PathBuf>,
    market_data_url: Option<String>,
    stream: Option<bool>,
    system_prompt: Option<String>,
}

impl StockbotConfig {
    /// Empty config with defaults and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (`BASE_URL`, `API_KEY`, ...).
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Full layered load: defaults, then the TOML file, then the environment.
    ///
    /// An explicit `path` must exist; without one, `stockbot.toml` is read
    /// only if it is present in the working directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::new();

        match path {
            Some(path) => config.apply_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config.apply_file(default_path)?;
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a TOML file.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StockbotError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        self.apply_toml(&raw)
            .map_err(|e| StockbotError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Overlay values from TOML text.
    pub fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file: FileConfig =
            toml::from_str(raw).map_err(|e| StockbotError::Configuration(e.to_string()))?;

        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.tool_timeout_secs {
            self.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = file.plot_path {
            self.plot_path = path;
        }
        if let Some(url) = file.market_data_url {
            self.market_data_url = url;
        }
        if let Some(stream) = file.stream {
            self.stream = stream;
        }
        if file.system_prompt.is_some() {
            self.system_prompt = file.system_prompt;
        }
        Ok(())
    }

    /// Overlay values from an environment lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(key) = get("API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = get("MODEL") {
            self.model = model;
        }
        if let Some(raw) = get("REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("TOOL_TIMEOUT_SECS") {
            self.tool_timeout = Duration::from_secs(parse_env("TOOL_TIMEOUT_SECS", &raw)?);
        }
        if let Some(path) = get("PLOT_PATH") {
            self.plot_path = PathBuf::from(path);
        }
        if let Some(url) = get("MARKET_DATA_URL") {
            self.market_data_url = url;
        }
        if let Some(raw) = get("STREAM") {
            self.stream = parse_env("STREAM", &raw)?;
        }
        if let Some(prompt) = get("SYSTEM_PROMPT") {
            self.system_prompt = Some(prompt);
        }
        Ok(())
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Check if both completion-service inputs are present.
    pub fn has_credentials(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| StockbotError::Configuration(format!("invalid value for {key}: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_have_no_credentials() {
        let config = StockbotConfig::new();
        assert!(!config.has_credentials());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.stream);
        assert_eq!(config.plot_path, PathBuf::from(DEFAULT_PLOT_PATH));
    }

    #[test]
    fn env_supplies_endpoint_and_credential() {
        let mut config = StockbotConfig::new();
        config
            .apply_env(lookup(&[
                ("BASE_URL", "http://localhost:11434/v1"),
                ("API_KEY", "ollama"),
            ]))
            .unwrap();

        assert_eq!(config.base_url(), Some("http://localhost:11434/v1"));
        assert_eq!(config.api_key(), Some("ollama"));
        assert!(config.has_credentials());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = StockbotConfig::new();
        config
            .apply_toml(
                r#"
                model = "llama3"
                tool_timeout_secs = 5
                stream = false
                "#,
            )
            .unwrap();
        config
            .apply_env(lookup(&[("MODEL", "qwen2.5:14b"), ("STREAM", "true")]))
            .unwrap();

        assert_eq!(config.model, "qwen2.5:14b");
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert!(config.stream);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = StockbotConfig::new().with_api_key("from-code");
        config.apply_env(lookup(&[("API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_key(), Some("from-code"));
    }

    #[test]
    fn malformed_numeric_env_is_a_configuration_error() {
        let mut config = StockbotConfig::new();
        let err = config
            .apply_env(lookup(&[("TOOL_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, StockbotError::Configuration(_)));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut config = StockbotConfig::new();
        let err = config.apply_toml("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, StockbotError::Configuration(_)));
    }

    #[test]
    fn apply_file_reads_toml_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stockbot.toml");
        std::fs::write(&path, "plot_path = \"out/chart.svg\"\n").unwrap();

        let mut config = StockbotConfig::new();
        config.apply_file(&path).unwrap();
        assert_eq!(config.plot_path, PathBuf::from("out/chart.svg"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = StockbotConfig::new().with_api_key("sk-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
