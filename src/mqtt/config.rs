use serde::Deserialize;

pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
pub const DEFAULT_DEVICE_NAME: &str = "hypontech";

#[derive(Clone, Debug, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub tls: Option<bool>,
    pub discovery_prefix: Option<String>,
    pub device_name: Option<String>,
}

impl MqttConfig {
    pub fn use_tls(&self) -> bool {
        self.tls.unwrap_or(false)
    }

    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| if self.use_tls() { 8883 } else { 1883 })
    }

    pub fn discovery_prefix(&self) -> &str {
        self.discovery_prefix
            .as_deref()
            .unwrap_or(DEFAULT_DISCOVERY_PREFIX)
    }

    pub fn device_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME)
    }

    /// Username/password pair, if a username is configured.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (None, _) => None,
            (Some(username), None) => Some((username.clone(), "".into())),
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
        }
    }
}
