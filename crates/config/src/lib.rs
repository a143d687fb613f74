//! Configuration loading, validation, and management for TutorBridge.
//!
//! Settings are resolved once at startup in this order (later wins):
//! built-in defaults, an optional `tutorbridge.toml` file, a `.env` file in
//! the working directory, then process environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tutorbridge_core::resources::{ResourceEntry, ResourceTable, builtin_entries};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "TUTORBRIDGE_CONFIG";
/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tutorbridge.toml";

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API key. Without it the model gateway starts unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// Model and generation settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Conversation context settings
    #[serde(default)]
    pub context: ContextConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Keyword → study resource table, in match order
    #[serde(default = "builtin_entries")]
    pub resources: Vec<ResourceEntry>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("debug", &self.debug)
            .field("model", &self.model)
            .field("context", &self.context)
            .field("server", &self.server)
            .field("resources", &self.resources.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Send a one-shot probe to the model at startup
    #[serde(default = "default_true")]
    pub startup_probe: bool,

    /// HTTP client timeout for model calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model_name() -> String {
    "gemini-1.5-flash-latest".into()
}
fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_max_output_tokens() -> u32 {
    300
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            api_url: default_api_url(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            startup_probe: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Exchanges (user + bot pairs) kept in the context window
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5001
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration the way the server does at startup.
    ///
    /// Reads `.env` if present, then the config file named by
    /// `TUTORBRIDGE_CONFIG` (or `./tutorbridge.toml`), then applies
    /// environment overrides:
    /// - `GEMINI_API_KEY` (fallback `GOOGLE_API_KEY`)
    /// - `GEMINI_MODEL`, `GEMINI_API_URL`
    /// - `MAX_OUTPUT_TOKENS`, `TEMPERATURE`, `MAX_CONTEXT_DEPTH`
    /// - `HOST`, `PORT`, `CORS_ORIGINS` (comma-separated)
    /// - `DEBUG`, `STARTUP_PROBE`
    ///
    /// Nothing is logged here since this runs before the subscriber is
    /// installed; call [`ConfigSources::log`] afterwards.
    pub fn load() -> (Result<Self, ConfigError>, ConfigSources) {
        let env_file = dotenvy::dotenv().ok();
        let sources = ConfigSources::new(Self::config_path(), env_file);
        let config = Self::resolve(&sources.config_file, |key| std::env::var(key).ok());
        (config, sources)
    }

    /// File (or defaults), then environment overrides, then validation.
    pub fn resolve<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Path of the config file consulted by [`AppConfig::load`].
    pub fn config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a function so tests never touch the real process
    /// environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(name) = get("GEMINI_MODEL") {
            self.model.name = name;
        }
        if let Some(url) = get("GEMINI_API_URL") {
            self.model.api_url = url;
        }
        if let Some(v) = get("MAX_OUTPUT_TOKENS") {
            self.model.max_output_tokens = parse_env("MAX_OUTPUT_TOKENS", &v)?;
        }
        if let Some(v) = get("TEMPERATURE") {
            self.model.temperature = parse_env("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("MAX_CONTEXT_DEPTH") {
            self.context.max_depth = parse_env("MAX_CONTEXT_DEPTH", &v)?;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = get("CORS_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("DEBUG") {
            self.debug = parse_flag("DEBUG", &v)?;
        }
        if let Some(v) = get("STARTUP_PROBE") {
            self.model.startup_probe = parse_flag("STARTUP_PROBE", &v)?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_output_tokens must be > 0".into(),
            ));
        }

        if self.context.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_depth must be > 0".into(),
            ));
        }

        if self.server.allowed_origins.is_empty() {
            return Err(ConfigError::ValidationError(
                "server.allowed_origins must not be empty (use \"*\" to allow any origin)".into(),
            ));
        }

        if self.model.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("model.name must not be empty".into()));
        }

        if let Some(entry) = self.resources.iter().find(|e| e.keyword.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "resource keyword must not be empty ({} resources attached)",
                entry.resources.len()
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the read-only resource table used by the pipeline.
    pub fn resource_table(&self) -> ResourceTable {
        ResourceTable::new(self.resources.clone())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a default config TOML string (for `config show`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            debug: false,
            model: ModelConfig::default(),
            context: ContextConfig::default(),
            server: ServerConfig::default(),
            resources: builtin_entries(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Where [`AppConfig::load`] looked, kept so it can be reported once
/// logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSources {
    /// Config file consulted
    pub config_file: PathBuf,
    /// Whether that file existed
    pub config_file_found: bool,
    /// `.env` file that was loaded, if any
    pub env_file: Option<PathBuf>,
}

impl ConfigSources {
    pub fn new(config_file: PathBuf, env_file: Option<PathBuf>) -> Self {
        Self {
            config_file_found: config_file.exists(),
            config_file,
            env_file,
        }
    }

    pub fn log(&self) {
        if let Some(path) = &self.env_file {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        if self.config_file_found {
            tracing::info!("Loaded config file {}", self.config_file.display());
        } else {
            tracing::info!(
                "No config file found at {}, using defaults",
                self.config_file.display()
            );
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.context.max_depth, 5);
        assert_eq!(config.model.max_output_tokens, 300);
        assert_eq!(config.resources.len(), 6);
        assert!(!config.has_api_key());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.name, config.model.name);
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.resources, config.resources);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.model.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_depth_rejected() {
        let mut config = AppConfig::default();
        config.context.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/tutorbridge.toml"));
        let config = result.unwrap();
        assert_eq!(config.model.name, "gemini-1.5-flash-latest");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorbridge.toml");
        std::fs::write(
            &path,
            r#"
[context]
max_depth = 3

[server]
port = 8080
allowed_origins = ["https://study.example.com"]

[[resources]]
keyword = "chemistry"
resources = ["Chem LibreTexts (https://chem.libretexts.org/)"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.context.max_depth, 3);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.allowed_origins, vec!["https://study.example.com"]);
        assert_eq!(config.resources.len(), 1);
        assert_eq!(config.model.max_output_tokens, 300);
        assert_eq!(config.resource_table().lookup("CHEMISTRY").len(), 1);
    }

    #[test]
    fn sources_record_missing_and_present_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorbridge.toml");

        let missing = ConfigSources::new(path.clone(), None);
        assert!(!missing.config_file_found);

        std::fs::write(&path, "debug = true\n").unwrap();
        let env_file = dir.path().join(".env");
        let present = ConfigSources::new(path.clone(), Some(env_file.clone()));
        assert!(present.config_file_found);
        assert_eq!(present.env_file, Some(env_file));
        assert!(AppConfig::resolve(&present.config_file, env(&[])).unwrap().debug);
    }

    #[test]
    fn resolve_applies_env_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorbridge.toml");
        std::fs::write(&path, "[server]\nport = 8080\n").unwrap();

        let config = AppConfig::resolve(&path, env(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.server.port, 9000);

        assert!(matches!(
            AppConfig::resolve(&path, env(&[("TEMPERATURE", "9")])),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn blank_cors_list_is_rejected() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[("CORS_ORIGINS", " , ,")])).unwrap();
        assert!(config.server.allowed_origins.is_empty());
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorbridge.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("GEMINI_API_KEY", "secret-key"),
                ("PORT", "9000"),
                ("MAX_OUTPUT_TOKENS", "512"),
                ("TEMPERATURE", "0.2"),
                ("MAX_CONTEXT_DEPTH", "3"),
                ("CORS_ORIGINS", "https://a.example, https://b.example ,"),
                ("DEBUG", "True"),
                ("STARTUP_PROBE", "0"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.model.max_output_tokens, 512);
        assert!((config.model.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.context.max_depth, 3);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config.debug);
        assert!(!config.model.startup_probe);
    }

    #[test]
    fn google_api_key_is_fallback() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[("GOOGLE_API_KEY", "g-key")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("g-key"));

        config
            .apply_env_overrides(env(&[("GEMINI_API_KEY", "gem"), ("GOOGLE_API_KEY", "g")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gem"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[("GEMINI_API_KEY", "  "), ("PORT", "")]))
            .unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn invalid_env_number_is_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[("PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn invalid_flag_is_error() {
        let mut config = AppConfig::default();
        assert!(config.apply_env_overrides(env(&[("DEBUG", "maybe")])).is_err());
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-1.5-flash-latest"));
        assert!(toml_str.contains("5001"));
        assert!(toml_str.contains("photosynthesis"));
    }
}
