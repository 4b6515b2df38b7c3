pub mod config;
pub mod home_assistant;
pub mod mqtt_wrapper;
pub mod rumqttc_wrapper;

pub use self::config::MqttConfig;
pub use home_assistant::HomeAssistant;
pub use mqtt_wrapper::{MqttWrapper, QoS};
pub use rumqttc_wrapper::RumqttcWrapper;
