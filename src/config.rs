use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// 配置文件结构
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub network: NetworkConfig,
    pub database: DatabaseConfig,
    pub history: HistoryConfig,
    pub pronunciation: PronunciationConfig,
    pub tts: Option<TtsConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dictionaryapi.dev/api/v2/entries/en/".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 10,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub db_file: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_file: "lexicruxx.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PronunciationConfig {
    pub audio_load_timeout_ms: u64,
    pub output_dir: String,
}

impl Default for PronunciationConfig {
    fn default() -> Self {
        Self {
            audio_load_timeout_ms: 3000,
            output_dir: "audio".to_string(),
        }
    }
}

/// Azure 语音合成凭据（仅在单词没有录音时使用）
#[derive(Debug, Deserialize, Clone)]
pub struct TtsConfig {
    pub azure_speech_key: String,
    pub azure_speech_region: String,
}

impl Config {
    /// 文件不存在时使用默认配置，文件无法读取或解析失败时报错
    pub fn load_from(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Config::default());
        }

        let config_content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
        Self::parse(&config_content)
    }

    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("failed to parse config: {}", e))?;
        Ok(config)
    }
}
