use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub remote: RemoteSettings,
    pub queue: QueueSettings,
    pub game: GameSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        println!("Loading configuration for RUN_MODE: {}", &run_mode);

        let s = Config::builder()
            // 기본값은 바이너리에 포함
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            // 환경별 파일 (e.g., config/production.toml), 없어도 된다
            .add_source(
                File::with_name(&format!("config/{}", run_mode))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            // 환경 변수 (e.g., APP__REMOTE__ENDPOINT=https://...)
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub directory: String,
    pub filename: String,
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    pub auto_sync: bool,
    pub poll_interval_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl RemoteSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueSettings {
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameSettings {
    pub title: String,
    pub subtitle: String,
    pub data_dir: String,
}
