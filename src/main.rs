#[macro_use]
extern crate rocket;

use hypon_rs::coordinator::{Coordinator, Status};
use hypon_rs::metric_collector::MetricCollector;
use hypon_rs::metrics::{self, PrometheusExporter};
use hypon_rs::mqtt::{HomeAssistant, RumqttcWrapper};
use hypon_rs::{sensor, settings, Error};
use rocket::http::ContentType;
use rocket::State;
use serde_json::json;
use tokio::sync::{oneshot, watch};

/// Structure containing state for API handlers.
pub struct StateData {
    status: watch::Receiver<Status>,
}

#[get("/metrics")]
fn metrics_route() -> Result<String, Error> {
    metrics::read()
}

/// Last good snapshot plus availability. 503 until the first snapshot exists.
#[get("/state")]
fn state_route(state: &State<StateData>) -> Result<(ContentType, String), Error> {
    let status = state.status.borrow().clone();
    let snapshot = status.snapshot.ok_or(Error::NoData)?;

    let body = json!({
        "available": status.available,
        "state": status.state,
        "consecutive_failures": status.consecutive_failures,
        "last_error": status.last_error,
        "values": snapshot.to_json(),
    });
    Ok((ContentType::JSON, body.to_string()))
}

#[get("/sensors")]
fn sensors_route() -> Result<(ContentType, String), Error> {
    serde_json::to_string(sensor::descriptors())
        .map(|body| (ContentType::JSON, body))
        .or(Err(Error::FormatError))
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let settings = settings::read_settings()?;
    let config = settings.validate()?;
    let coordinator = Coordinator::setup(&config).await?;
    log::info!(
        "Polling plant {} every {}s",
        config.credentials.selector(),
        coordinator.interval().as_secs()
    );

    let mut collectors: Vec<Box<dyn MetricCollector>> = vec![Box::new(PrometheusExporter::new(
        config.credentials.selector(),
    ))];
    if let Some(mqtt) = &settings.mqtt {
        log::info!("Publishing to MQTT broker {}:{}", mqtt.host, mqtt.port());
        collectors.push(Box::new(HomeAssistant::<RumqttcWrapper>::new(mqtt)));
    }

    let state = StateData {
        status: coordinator.subscribe(),
    };

    let (stop, stopped) = oneshot::channel::<()>();
    let worker = tokio::spawn(coordinator.run(collectors, async move {
        let _ = stopped.await;
    }));

    let result = rocket::build()
        .manage(state)
        .mount("/", routes![metrics_route, state_route, sensors_route])
        .launch()
        .await;

    let _ = stop.send(());
    if let Err(e) = worker.await {
        log::warn!("Refresh loop ended abnormally: {}", e);
    }
    if let Err(e) = result {
        log::error!("HTTP server failed: {}", e);
        return Err(anyhow::anyhow!("HTTP server failed"));
    }

    Ok(())
}
