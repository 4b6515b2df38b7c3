use std::time::Duration;

use crate::mqtt::{mqtt_wrapper, MqttConfig};
use log::{debug, warn};
use rumqttc::{
    tokio_rustls::rustls::{ClientConfig, RootCertStore},
    AsyncClient, MqttOptions, Transport,
};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// `MqttWrapper` backed by a persistent rumqttc connection.
///
/// The event loop runs on its own tokio task and reconnects on failure, so
/// `new` must be called from within a tokio runtime.
pub struct RumqttcWrapper {
    client: AsyncClient,
}

fn match_qos(qos: mqtt_wrapper::QoS) -> rumqttc::QoS {
    match qos {
        mqtt_wrapper::QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        mqtt_wrapper::QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        mqtt_wrapper::QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn tls_transport() -> Transport {
    // Use rustls-native-certs to load root certificates from the operating system.
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in native.errors {
        warn!("could not load platform certificate: {e}");
    }
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!("skipping platform certificate: {e}");
        }
    }

    let client_config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Transport::tls_with_config(client_config.into())
}

impl mqtt_wrapper::MqttWrapper for RumqttcWrapper {
    fn publish<S, V>(
        &mut self,
        topic: S,
        qos: mqtt_wrapper::QoS,
        retain: bool,
        payload: V,
    ) -> anyhow::Result<()>
    where
        S: Clone + Into<String>,
        V: Clone + Into<Vec<u8>>,
    {
        // requests are queued in order; a full queue is the only failure here
        Ok(self
            .client
            .try_publish(topic, match_qos(qos), retain, payload)?)
    }

    fn new(config: &MqttConfig, suffix: &str) -> Self {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| "hypon-rs".to_string())
            + suffix;

        let mut mqttoptions = MqttOptions::new(client_id, &config.host, config.port());
        mqttoptions.set_keep_alive(Duration::from_secs(5));
        if config.use_tls() {
            mqttoptions.set_transport(tls_transport());
        }
        if let Some((username, password)) = config.credentials() {
            mqttoptions.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, 512);

        let host = config.host.clone();
        tokio::spawn(async move {
            // keep polling so that queued publishes get sent; a failed poll
            // drops the connection and the next one reconnects
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!("mqtt event: {event:?}"),
                    Err(e) => {
                        warn!("mqtt connection to {host} failed: {e}");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Self { client }
    }
}
