//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Credential for the model provider. Required: the assistant cannot run
    /// without a completion backend, so absence fails startup loudly.
    pub api_key: String,
    /// OpenAI-compatible API root. Defaults to the ZhipuAI open platform.
    pub api_base: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    /// UTF-8 source document the knowledge index is built from.
    pub knowledge_path: PathBuf,
    /// Directory the embedding index is persisted to and reloaded from.
    pub index_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Model Provider Settings ---
        let api_key = std::env::var("ZHIPUAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("ZHIPUAI_API_KEY".to_string()))?;

        let api_base = std::env::var("CHAT_API_BASE")
            .unwrap_or_else(|_| "https://open.bigmodel.cn/api/paas/v4".to_string());
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "GLM-4.5V".to_string());
        let embedding_model =
            std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "embedding-3".to_string());

        let temperature_str =
            std::env::var("CHAT_TEMPERATURE").unwrap_or_else(|_| "0.2".to_string());
        let temperature = temperature_str.parse::<f32>().map_err(|e| {
            ConfigError::InvalidValue("CHAT_TEMPERATURE".to_string(), e.to_string())
        })?;

        // --- Load Knowledge Base Settings ---
        let knowledge_path = std::env::var("KNOWLEDGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./knowledge/knowledge.txt"));
        let index_dir = std::env::var("INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./knowledge_index"));

        Ok(Self {
            bind_address,
            log_level,
            api_key,
            api_base,
            chat_model,
            embedding_model,
            temperature,
            knowledge_path,
            index_dir,
        })
    }
}
