#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod alert;
pub mod drivers;
pub mod node;
pub mod reading;
pub mod record;
pub mod sensor_bank;
pub mod storage_sink;
pub mod telemetry_loop;
pub mod uplink;

#[cfg(test)]
mod test_support;

pub use alert::{AlertSignal, Tone};
pub use node::settings::{ConfigFault, NodeSettings};
pub use reading::{FaultCause, SensorFault, SensorId, SensorReading};
pub use record::{AirQuality, TelemetryRecord, Vector3};
pub use sensor_bank::{SensorBank, TemperatureSource};
pub use storage_sink::{StorageFault, StorageSink};
pub use telemetry_loop::{BootError, CycleReport, LoopState, LoopStats, TelemetryLoop};
pub use uplink::{DeliveryOutcome, NetworkFault, UplinkClient};
