use crate::api::Error;
use crate::coordinator::{CycleState, Status};
use crate::metric_collector::MetricCollector;
use crate::model::Snapshot;
use crate::mqtt::{MqttConfig, MqttWrapper, QoS};
use crate::sensor::{DeviceClass, SensorDescriptor, StateClass};

use log::{debug, error};
use serde::Serialize;

/// `DeviceConfig` groups all sensors of one installation under a single
/// Home Assistant device.
#[derive(Serialize, Clone, Debug)]
pub struct DeviceConfig {
    identifiers: Vec<String>,
    name: String,
    manufacturer: String,
    model: String,
    sw_version: String,
    configuration_url: String,
}

impl DeviceConfig {
    pub fn new(device_name: &str) -> Self {
        Self {
            identifiers: vec![device_name.to_string()],
            name: "Hypontech Solar".to_string(),
            manufacturer: "Hypontech".to_string(),
            model: "Solar Inverter".to_string(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
            configuration_url: "https://hypon.cloud".to_string(),
        }
    }
}

/// Discovery payload of one sensor entity.
///
/// See https://www.home-assistant.io/integrations/mqtt/#mqtt-discovery
#[derive(Serialize, Debug)]
pub struct SensorConfig {
    unique_id: String,
    name: String,
    state_topic: String,
    availability_topic: String,
    value_template: String,
    icon: String,
    device: DeviceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<DeviceClass>,
    state_class: StateClass,
}

impl SensorConfig {
    pub fn new(
        state_topic: &str,
        availability_topic: &str,
        device: &DeviceConfig,
        descriptor: &SensorDescriptor,
    ) -> Self {
        let key = descriptor.field.key();
        SensorConfig {
            unique_id: format!("{}_{}", device.identifiers[0], key),
            name: descriptor.name.to_string(),
            state_topic: state_topic.to_string(),
            availability_topic: availability_topic.to_string(),
            value_template: format!("{{{{ value_json.{} }}}}", key),
            icon: descriptor.icon.to_string(),
            device: device.clone(),
            unit_of_measurement: descriptor.unit.map(str::to_string),
            device_class: descriptor.device_class,
            state_class: descriptor.state_class,
        }
    }
}

/// Republishes snapshots over MQTT using Home Assistant discovery.
///
/// Discovery configs are sent (retained) before the first state message and
/// re-sent only if publishing them failed. Availability goes to its own
/// retained topic so entities turn unavailable after a failed cycle.
pub struct HomeAssistant<MQTT: MqttWrapper> {
    client: MQTT,
    discovery_prefix: String,
    device: DeviceConfig,
    announced: bool,
}

impl<MQTT: MqttWrapper> HomeAssistant<MQTT> {
    pub fn new(config: &MqttConfig) -> Self {
        let client = MQTT::new(config, "-ha");
        Self {
            client,
            discovery_prefix: config.discovery_prefix().to_string(),
            device: DeviceConfig::new(config.device_name()),
            announced: false,
        }
    }

    pub fn client(&self) -> &MQTT {
        &self.client
    }

    fn device_name(&self) -> &str {
        &self.device.identifiers[0]
    }

    pub fn state_topic(&self) -> String {
        format!("{}/state", self.device_name())
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/availability", self.device_name())
    }

    pub fn config_topic(&self, descriptor: &SensorDescriptor) -> String {
        format!(
            "{}/sensor/{}/{}/config",
            self.discovery_prefix,
            self.device_name(),
            descriptor.field.key()
        )
    }

    fn publish_retained(&mut self, topic: &str, payload: String) -> Result<(), Error> {
        debug!("Publishing to {topic} with payload {payload}");

        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .map_err(|e| Error::PublishError(format!("{}: {:?}", topic, e)))
    }

    fn publish_json(&mut self, topic: &str, payload: serde_json::Value) -> Result<(), Error> {
        let payload = serde_json::to_string(&payload).or(Err(Error::FormatError))?;
        self.publish_retained(topic, payload)
    }

    /// Publish one retained discovery config per descriptor.
    pub fn publish_discovery(&mut self, descriptors: &[SensorDescriptor]) -> Result<(), Error> {
        let state_topic = self.state_topic();
        let availability_topic = self.availability_topic();
        for descriptor in descriptors {
            let topic = self.config_topic(descriptor);
            let config =
                SensorConfig::new(&state_topic, &availability_topic, &self.device, descriptor);
            let payload = serde_json::to_value(&config).or(Err(Error::FormatError))?;
            self.publish_json(&topic, payload)?;
        }
        self.announced = true;
        Ok(())
    }

    /// Publish the whole snapshot as one retained message, announcing the
    /// sensors first if that has not happened yet.
    pub fn publish_state(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        if !self.announced {
            self.publish_discovery(crate::sensor::descriptors())?;
        }
        let state_topic = self.state_topic();
        self.publish_json(&state_topic, snapshot.to_json())
    }

    /// Publish `online` or `offline` to the availability topic.
    pub fn publish_availability(&mut self, available: bool) -> Result<(), Error> {
        let topic = self.availability_topic();
        let payload = if available { "online" } else { "offline" };
        self.publish_retained(&topic, payload.to_string())
    }
}

impl<MQTT: MqttWrapper + Send> MetricCollector for HomeAssistant<MQTT> {
    fn publish(&mut self, status: &Status) {
        match (&status.state, &status.snapshot) {
            (CycleState::Published, Some(snapshot)) => {
                let result = self
                    .publish_state(snapshot)
                    .and_then(|_| self.publish_availability(true));
                if let Err(e) = result {
                    error!("Failed to publish to MQTT: {e}");
                }
            }
            (CycleState::Failed, _) => {
                if let Err(e) = self.publish_availability(false) {
                    error!("Failed to publish availability to MQTT: {e}");
                }
            }
            _ => debug!("Nothing to publish to MQTT ({:?})", status.state),
        }
    }
}
