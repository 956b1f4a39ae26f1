use config::{Config, Environment, File, FileFormat, FileSourceFile};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Service configuration, loaded once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_llm")]
    pub llm: LlmConfig,

    #[serde(default = "default_cache")]
    pub cache: CacheConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Chat-completion API configuration (OpenAI-compatible)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    /// Bearer token. Falls back to `OPENAI_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,

    /// Model used by the full report pipeline
    #[serde(default = "default_report_model")]
    pub report_model: String,

    /// Model used by the quick summary pipeline
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Result cache configuration (applies to each route's cache)
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Share one pipeline run between concurrent uploads of the same file
    #[serde(default = "default_coalesce_requests")]
    pub coalesce_requests: bool,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Size limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            llm: default_llm(),
            cache: default_cache(),
            limits: default_limits(),
        }
    }
}

impl AppConfig {
    /// Load config from `config.*` in the working directory (optional) and
    /// `PAPERLENS__*` environment variables.
    pub fn load() -> ServiceResult<Self> {
        Self::load_with_file(File::with_name("config").required(false))
    }

    fn load_with_file(file: File<FileSourceFile, FileFormat>) -> ServiceResult<Self> {
        let mut config: AppConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("PAPERLENS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })?;

        if config.llm.api_key.is_empty()
            && let Ok(key) = std::env::var("OPENAI_API_KEY")
        {
            config.llm.api_key = key;
        }

        Ok(config)
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_llm() -> LlmConfig {
    LlmConfig {
        base_url: default_llm_url(),
        api_key: String::new(),
        report_model: default_report_model(),
        summary_model: default_summary_model(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_report_model() -> String {
    "gpt-4o".to_string()
}

fn default_summary_model() -> String {
    "gpt-3.5-turbo-16k".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_cache() -> CacheConfig {
    CacheConfig {
        max_entries: default_max_entries(),
        ttl_secs: default_ttl_secs(),
        coalesce_requests: default_coalesce_requests(),
    }
}

fn default_max_entries() -> usize {
    100
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60 // 24 hours
}

fn default_coalesce_requests() -> bool {
    true
}

fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_upload_bytes: default_max_upload_bytes(),
    }
}

fn default_max_upload_bytes() -> u64 {
    20 * 1024 * 1024 // 20MB
}
