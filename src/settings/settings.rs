use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub session: Session,
    pub mysql: Mysql,
    pub redis: Redis,
    pub auth: Auth,
    pub kafka: Kafka,
    #[serde(default)]
    pub consumer: Consumer,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "redis"
}

#[derive(Debug, Deserialize)]
pub struct Mysql {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    pub issuer: String,
    pub access_ttl_secs: u64,
}

impl Auth {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Kafka {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub auto_offset_reset: String,
    pub user_registered_topic: String,
}

/// Zero means "use the engine default".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Consumer {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub max_execute_ms: u64,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Load the TOML file, then apply `TODO_`-prefixed environment overrides,
/// e.g. `TODO_AUTH__JWT_SECRET`.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("TODO")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
