use crate::api::{Error, API_URL};
use crate::model::Credentials;
use crate::mqtt::MqttConfig;
use config::Config;

use std::time::Duration;

pub const DEFAULT_INTERVAL: u64 = 60;
pub const DEFAULT_TIMEOUT: u64 = 10;

/// Raw settings as read from `hypon.toml` and `HYPON_*` environment variables.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub username: String,
    pub password: String,
    pub plant_id: String,
    /// Refresh interval in seconds
    pub interval: u64,
    /// Per request timeout in seconds
    pub timeout: u64,
    pub mqtt: Option<MqttConfig>,
}

/// Validated configuration of one installation.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub api_url: String,
    pub credentials: Credentials,
    pub interval: Duration,
    pub timeout: Duration,
}

fn config_error(e: config::ConfigError) -> Error {
    Error::ConfigError(e.to_string())
}

pub fn read_settings() -> Result<Settings, Error> {
    let mut settings = Config::default();
    settings
        .set_default("api_url", API_URL)
        .and_then(|s| s.set_default("interval", DEFAULT_INTERVAL as i64))
        .and_then(|s| s.set_default("timeout", DEFAULT_TIMEOUT as i64))
        .map_err(config_error)?;

    settings
        .merge(config::File::with_name("hypon").required(false))
        .and_then(|s| s.merge(config::Environment::with_prefix("HYPON").separator("__")))
        .map_err(config_error)?;

    settings.try_into().map_err(config_error)
}

impl Settings {
    pub fn validate(&self) -> Result<CoordinatorConfig, Error> {
        if self.interval == 0 {
            return Err(Error::ConfigError(String::from(
                "`interval` must be at least one second",
            )));
        }
        if self.timeout == 0 {
            return Err(Error::ConfigError(String::from(
                "`timeout` must be at least one second",
            )));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(Error::ConfigError(format!(
                "`api_url` is not an http(s) URL: {}",
                self.api_url
            )));
        }

        Ok(CoordinatorConfig {
            api_url: self.api_url.to_owned(),
            credentials: Credentials::new(&self.username, &self.password, &self.plant_id)?,
            interval: Duration::from_secs(self.interval),
            timeout: Duration::from_secs(self.timeout),
        })
    }
}
