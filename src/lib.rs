//! Polls the Hypontech cloud API for solar plant telemetry and republishes it
//! as typed sensor readings.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;

pub mod api;
pub mod coordinator;
pub mod metric_collector;
pub mod metrics;
pub mod model;
pub mod mqtt;
pub mod normalize;
pub mod sensor;
pub mod settings;

pub use api::Error;
pub use coordinator::{Coordinator, CycleState, Status};
