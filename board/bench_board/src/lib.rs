//! Host board for running the telemetry node on a workstation.
//!
//! Storage is a directory, the uplink is a real HTTP client and the sensors
//! are emulated at register level behind the same bus traits the flight
//! board implements.

mod file_storage;
mod host;
mod http_network;
mod sensor_bus;

use std::path::PathBuf;

pub use file_storage::FileStorage;
pub use host::{HostSystem, LogIndicator, RESET_EXIT_CODE};
pub use http_network::HttpNetwork;
pub use sensor_bus::{
    SimulatedBus, AHT20_ADDRESS, BMP280_ADDRESS, ENS160_ADDRESS, MPU6050_ADDRESS,
};

pub struct BenchBoard {
    pub bus: SimulatedBus,
    pub storage: FileStorage,
    pub network: HttpNetwork,
    pub indicator: LogIndicator,
    pub system: HostSystem,
}

pub struct BoardBuilder {
    pub mount_path: Option<PathBuf>,
    pub bus_disconnected: bool,
    pub battery_raw: Option<u16>,
}

impl BoardBuilder {
    pub fn new() -> Self {
        BoardBuilder {
            mount_path: None,
            bus_disconnected: false,
            battery_raw: None,
        }
    }

    pub fn mount_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_path = Some(path.into());
        self
    }

    pub fn bus_disconnected(mut self, disconnected: bool) -> Self {
        self.bus_disconnected = disconnected;
        self
    }

    pub fn battery_raw(mut self, raw: u16) -> Self {
        self.battery_raw = Some(raw);
        self
    }

    pub fn build(self) -> BenchBoard {
        let mut bus = SimulatedBus::new();
        if self.bus_disconnected {
            log::warn!("sensor bus starts disconnected");
            bus.disconnect();
        }
        if let Some(raw) = self.battery_raw {
            bus.set_battery_raw(raw);
        }

        let mount_path = self.mount_path.unwrap_or_else(|| PathBuf::from("sd"));
        BenchBoard {
            bus,
            storage: FileStorage::new(mount_path),
            network: HttpNetwork::new(),
            indicator: LogIndicator::new(),
            system: HostSystem::new(),
        }
    }
}

impl Default for BoardBuilder {
    fn default() -> Self {
        Self::new()
    }
}
