use crate::api::Error;
use crate::coordinator::{CycleState, Status};
use crate::metric_collector::MetricCollector;
use crate::sensor::descriptor;
use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGaugeVec, TextEncoder};

lazy_static! {
    static ref SENSOR_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "hypon_sensor_value",
            "last value reported for a plant field, in its unit",
        ),
        &["plant", "field", "unit"],
    )
    .unwrap();
    static ref AVAILABLE_GAUGE: IntGaugeVec = register_int_gauge_vec!(
        opts!(
            "hypon_available",
            "1 when the last refresh of the plant succeeded",
        ),
        &["plant"],
    )
    .unwrap();
    static ref FAILURES_GAUGE: IntGaugeVec = register_int_gauge_vec!(
        opts!(
            "hypon_consecutive_failures",
            "number of refresh cycles failed in a row",
        ),
        &["plant"],
    )
    .unwrap();
    static ref REFRESH_COUNTER: IntCounterVec = register_int_counter_vec!(
        opts!("hypon_refresh_total", "refresh cycles by outcome"),
        &["plant", "outcome"],
    )
    .unwrap();
}

/// Feeds refresh results of one plant into the Prometheus registry.
pub struct PrometheusExporter {
    plant: String,
}

impl PrometheusExporter {
    pub fn new(plant: &str) -> Self {
        PrometheusExporter {
            plant: plant.to_owned(),
        }
    }
}

impl MetricCollector for PrometheusExporter {
    fn publish(&mut self, status: &Status) {
        let outcome = match status.state {
            CycleState::Published => "success",
            _ => "failure",
        };
        REFRESH_COUNTER
            .with_label_values(&[&self.plant, outcome])
            .inc();
        AVAILABLE_GAUGE
            .with_label_values(&[&self.plant])
            .set(status.available as i64);
        FAILURES_GAUGE
            .with_label_values(&[&self.plant])
            .set(status.consecutive_failures as i64);

        /* gauges keep the last good values while unavailable */
        if let (true, Some(snapshot)) = (status.available, &status.snapshot) {
            for (field, value) in snapshot.iter() {
                let unit = descriptor(field).unit.unwrap_or("");
                SENSOR_GAUGE
                    .with_label_values(&[&self.plant, field.key(), unit])
                    .set(value);
            }
        }
    }
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(Error::FormatError))?;
    String::from_utf8(buffer).or(Err(Error::FormatError))
}
