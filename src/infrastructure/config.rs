use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_DIR: &str = "config";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    Env { key: &'static str, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Reads `app.yaml` and `prompts.yaml` from `APP_CONFIG_DIR` (default
    /// `config/`), then applies environment overrides. Missing files fall
    /// back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = std::env::var("APP_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.into());
        let mut config = Self::from_dir(dir)?;
        config.config.apply_env(|key| std::env::var(key).ok())?;
        config.config.validate()?;
        Ok(config)
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        Ok(Self {
            config: read_yaml(&dir.join("app.yaml"))?.unwrap_or_default(),
            prompts: read_yaml(&dir.join("prompts.yaml"))?.unwrap_or_default(),
        })
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub extraction: ExtractionConfig,
    pub source: SourceConfig,
    pub index: IndexConfig,
    pub worker: WorkerConfig,
    pub retry: RetryPolicy,
    pub auth: AuthConfig,
    pub redis_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            rag: RagConfig::default(),
            extraction: ExtractionConfig::default(),
            source: SourceConfig::default(),
            index: IndexConfig::default(),
            worker: WorkerConfig::default(),
            retry: RetryPolicy::default(),
            auth: AuthConfig::default(),
            redis_url: "redis://localhost:6379".to_string(),
        }
    }
}

impl Config {
    /// Overrides file values with environment variables looked up by `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = var("REDIS_URL") {
            self.redis_url = url;
        }
        if let Some(url) = var("QDRANT_URL") {
            self.index.qdrant_url = url;
        }
        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::Env {
                key: "SERVER_PORT",
                value: port,
            })?;
        }
        if let Some(folder) = var("GOOGLE_DRIVE_FOLDER_ID") {
            self.source.folder_id = Some(folder);
        }
        if let Some(token) = var("GOOGLE_DRIVE_ACCESS_TOKEN") {
            self.source.access_token = Some(token);
        }
        if let Some(dir) = var("DATA_DIR") {
            self.source.data_dir = dir;
        }
        if let Some(tokens) = var("API_TOKENS") {
            self.auth.tokens = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            if !self.auth.tokens.is_empty() {
                self.auth.enabled = true;
            }
        }
        Ok(())
    }

    /// Checks settings that only make sense together, after env overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.enabled && self.auth.tokens.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.enabled is set but API_TOKENS holds no tokens".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro".to_string(),
            timeout_seconds: 60,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
    /// Segments embedded in parallel per document.
    pub concurrency: usize,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-004".to_string(),
            dimension: 768,
            timeout_seconds: 30,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub chunk_size: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { chunk_size: 1000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Drive,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub folder_id: Option<String>,
    #[serde(skip)]
    pub access_token: Option<String>,
    pub base_url: String,
    pub data_dir: String,
    pub timeout_seconds: u64,
    /// Queue a full folder sync when the server starts.
    pub sync_on_startup: bool,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Local,
            folder_id: None,
            access_token: None,
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            data_dir: "./data".to_string(),
            timeout_seconds: 30,
            sync_on_startup: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorKind {
    None,
    Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub mirror: MirrorKind,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            mirror: MirrorKind::None,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "knowledge_base".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Ingestion jobs processed at once.
    pub concurrency: usize,
    /// Documents ingested at once within one job.
    pub document_concurrency: usize,
    pub result_ttl_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            document_concurrency: 4,
            result_ttl_seconds: 3600,
        }
    }
}

/// Retry policy applied by callers of the pipeline; the pipeline itself
/// never retries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Delay before `attempt` (1-based; the first attempt has no delay),
    /// doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64 << (attempt - 2).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    #[serde(skip)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub agent: AgentPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: "You are a presale assistant. Answer using the company information provided; \
                     say so when it does not cover the question."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_dir(dir.path()).unwrap();

        assert_eq!(config.config.rag.top_k, 3);
        assert_eq!(config.config.source.kind, SourceKind::Local);
        assert_eq!(config.config.index.mirror, MirrorKind::None);
        assert!(!config.prompts.agent.system.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.yaml"),
            "rag:\n  top_k: 7\nsource:\n  kind: drive\n  folder_id: abc\nretry:\n  max_attempts: 5\n",
        )
        .unwrap();

        let config = AppConfig::from_dir(dir.path()).unwrap().config;

        assert_eq!(config.rag.top_k, 7);
        assert_eq!(config.source.kind, SourceKind::Drive);
        assert_eq!(config.source.folder_id.as_deref(), Some("abc"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_ms, 500);
        assert_eq!(config.embedding.dimension, 768);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.yaml"), "rag: [not, a, map").unwrap();

        let err = AppConfig::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "9000"),
            ("API_TOKENS", "alpha, beta,"),
            ("GOOGLE_DRIVE_FOLDER_ID", "folder-1"),
        ]);
        let mut config = Config::default();

        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(config.auth.enabled);
        assert_eq!(config.auth.tokens, vec!["alpha", "beta"]);
        assert_eq!(config.source.folder_id.as_deref(), Some("folder-1"));
    }

    #[test]
    fn test_auth_enabled_without_tokens_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.yaml"), "auth:\n  enabled: true\n").unwrap();
        let mut config = AppConfig::from_dir(dir.path()).unwrap().config;

        config.apply_env(|key| (key == "API_TOKENS").then(|| " , ".to_string())).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(config.auth.enabled);

        config.apply_env(|key| (key == "API_TOKENS").then(|| "alpha".to_string())).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_is_valid_with_tokens() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let mut config = AppConfig::from_dir(&dir).unwrap().config;
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert!(config.validate().is_err());

        config.apply_env(|key| (key == "API_TOKENS").then(|| "alpha".to_string())).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == "SERVER_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "SERVER_PORT", .. }));
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff_ms: 100,
        };
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(400));
    }
}
