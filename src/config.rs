use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, time::Duration};
use thiserror::Error;

use crate::domain::PolicyTariffs;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("collector.interval_secs must be at least 1")]
    ZeroInterval,
    #[error("collector.max_delta_kwh must be a positive finite number, got {0}")]
    InvalidCeiling(f64),
    #[error("collector.queue_capacity must be at least 1")]
    ZeroQueue,
    #[error("tariffs.{0} must be finite")]
    NonFiniteTariff(&'static str),
    #[error("no houses configured")]
    NoHouses,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub collector: CollectorConfig,
    pub tariffs: PolicyTariffs,
    pub houses: HashMap<String, HouseConfig>,
    #[serde(default)]
    pub influx: InfluxConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

fn default_request_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Settlement interval length in seconds.
    pub interval_secs: u64,
    /// Largest plausible import/export delta between two telegrams (kWh).
    #[serde(default = "default_max_delta")]
    pub max_delta_kwh: f64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Optional JSON file overriding the policy tariffs, re-read every cycle.
    #[serde(default)]
    pub tariffs_file: Option<PathBuf>,
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_max_delta() -> f64 { 0.1 }
fn default_queue_capacity() -> usize { 1024 }

#[derive(Debug, Clone, Deserialize)]
pub struct HouseConfig { pub id: String }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfluxConfig {
    /// Empty url disables the Influx sink; records are only logged.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_influx_timeout")]
    pub timeout_secs: u64,
}

fn default_influx_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

fn default_log_level() -> String { "info".to_string() }

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("LEG__").split("__"));
        Ok(figment.extract()?)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(Figment::new().merge(Toml::string(toml)).extract()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let ceiling = self.collector.max_delta_kwh;
        if !ceiling.is_finite() || ceiling <= 0.0 {
            return Err(ConfigError::InvalidCeiling(ceiling));
        }
        if self.collector.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueue);
        }
        for (name, value) in [
            ("pv_payout_rate", self.tariffs.pv_payout_rate),
            ("grid_import_rate", self.tariffs.grid_import_rate),
            ("grid_export_rate", self.tariffs.grid_export_rate),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteTariff(name));
            }
        }
        if self.houses.is_empty() {
            return Err(ConfigError::NoHouses);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8090

        [collector]
        interval_secs = 60

        [tariffs]
        pv_payout_rate = 20.0
        grid_import_rate = 30.0
        grid_export_rate = 6.0

        [houses.A4CF12F0E1B2]
        id = "1"
        [houses.A4CF12F0E1B3]
        id = "2"
    "#;

    #[test]
    fn test_defaults_applied() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.collector.max_delta_kwh, 0.1);
        assert_eq!(cfg.collector.queue_capacity, 1024);
        assert!(cfg.collector.tariffs_file.is_none());
        assert!(cfg.influx.url.is_empty());
        assert_eq!(cfg.server.request_timeout_secs, 10);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.logging.file.is_none());
        assert_eq!(cfg.houses["A4CF12F0E1B3"].id, "2");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.socket_addr().unwrap().port(), 8090);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::from_toml_str(SAMPLE).unwrap();
        cfg.collector.interval_secs = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroInterval));

        let mut cfg = Config::from_toml_str(SAMPLE).unwrap();
        cfg.collector.max_delta_kwh = -0.1;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidCeiling(-0.1)));

        let mut cfg = Config::from_toml_str(SAMPLE).unwrap();
        cfg.tariffs.grid_export_rate = f64::NAN;
        assert_eq!(cfg.validate(), Err(ConfigError::NonFiniteTariff("grid_export_rate")));

        let mut cfg = Config::from_toml_str(SAMPLE).unwrap();
        cfg.houses.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoHouses));
    }
}
