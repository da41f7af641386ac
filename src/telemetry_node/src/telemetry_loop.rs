use cubesat_board::{
    IndicatorServices, NetworkServices, SensorBusServices, StorageServices, SystemServices,
};

use crate::alert::AlertSignal;
use crate::node::settings::{ConfigFault, NodeSettings};
use crate::reading::SensorReading;
use crate::record::{TelemetryRecord, Vector3};
use crate::sensor_bank::{pressure_altitude, tilt_from_reading, SensorBank, TemperatureSource};
use crate::storage_sink::{StorageFault, StorageSink};
use crate::uplink::{DeliveryOutcome, UplinkClient};

/// Upper bound on a single idle step while waiting for the next cycle.
const IDLE_POLL_MS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Booting,
    Ready,
    Capturing,
    Persisting,
    Delivering,
}

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigFault),
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageFault),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u32,
    pub sensor_faults: u32,
    pub storage_faults: u32,
    pub deliveries: u32,
    pub delivery_failures: u32,
}

/// What happened during one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub sequence_number: u32,
    /// Monotonic milliseconds at the start of capture.
    pub started_at_ms: u64,
    pub record: TelemetryRecord,
    pub sensor_faults: u32,
    pub storage_fault: Option<StorageFault>,
    /// `None` when link mode is off.
    pub delivery: Option<DeliveryOutcome>,
}

impl CycleReport {
    pub fn persisted(&self) -> bool {
        self.storage_fault.is_none()
    }
}

pub struct TelemetryLoop<B, S, N, I, Y>
where
    B: SensorBusServices,
    S: StorageServices,
    N: NetworkServices,
    I: IndicatorServices,
    Y: SystemServices,
{
    settings: NodeSettings,
    sensors: SensorBank<B>,
    storage: StorageSink<S>,
    uplink: UplinkClient<N>,
    alert: AlertSignal<I>,
    system: Y,
    state: LoopState,
    sequence_number: u32,
    last_cycle_start: Option<u64>,
    stats: LoopStats,
}

impl<B, S, N, I, Y> TelemetryLoop<B, S, N, I, Y>
where
    B: SensorBusServices,
    S: StorageServices,
    N: NetworkServices,
    I: IndicatorServices,
    Y: SystemServices,
{
    pub fn new(settings: NodeSettings, bus: B, storage: S, network: N, indicator: I, system: Y) -> Self {
        let storage = StorageSink::new(storage, &settings.log_file_name);
        let uplink = UplinkClient::new(network, &settings.endpoint, settings.send_timeout_ms);
        let alert = AlertSignal::new(indicator, settings.alerts_enabled());
        TelemetryLoop {
            settings,
            sensors: SensorBank::new(bus),
            storage,
            uplink,
            alert,
            system,
            state: LoopState::Booting,
            sequence_number: 0,
            last_cycle_start: None,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn sensors(&mut self) -> &mut SensorBank<B> {
        &mut self.sensors
    }

    pub fn storage(&mut self) -> &mut StorageSink<S> {
        &mut self.storage
    }

    pub fn uplink(&mut self) -> &mut UplinkClient<N> {
        &mut self.uplink
    }

    pub fn system(&mut self) -> &mut Y {
        &mut self.system
    }

    fn transition(&mut self, state: LoopState) {
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Associates the link when link mode is on and mounts storage. The node
    /// is Ready only once both are done; a config or mount fault is fatal.
    pub fn boot(&mut self) -> Result<(), BootError> {
        self.transition(LoopState::Booting);
        info!("turning on...");

        if let Err(fault) = self.settings.validate() {
            error!("settings rejected: {}", fault);
            return Err(fault.into());
        }
        self.alert.startup(&mut self.system);

        if self.settings.link_enabled() {
            let ssid = self.settings.ssid.clone();
            let secret = self.settings.secret.clone();
            self.uplink.establish_link(&ssid, &secret, &mut self.system);
            self.alert.startup(&mut self.system);
        }

        if let Err(fault) = self.storage.mount() {
            error!("storage fault during boot: {}", fault);
            return Err(fault.into());
        }
        self.alert.startup(&mut self.system);

        self.last_cycle_start = Some(self.system.get_millis());
        self.transition(LoopState::Ready);
        Ok(())
    }

    // Idles until one interval has passed since the previous cycle started.
    // An overrun cycle leaves nothing to wait for.
    fn wait_for_next_cycle(&mut self) -> u64 {
        let interval = self.settings.min_interval_ms();
        if let Some(previous) = self.last_cycle_start {
            debug!("waiting execution...");
            loop {
                let elapsed = self.system.get_millis().saturating_sub(previous);
                if elapsed >= interval {
                    break;
                }
                let remaining = (interval - elapsed).min(IDLE_POLL_MS as u64);
                self.system.delay_ms(remaining as u32);
            }
        }
        let start = self.system.get_millis();
        self.last_cycle_start = Some(start);
        start
    }

    fn capture(&mut self) -> (TelemetryRecord, u32) {
        self.transition(LoopState::Capturing);
        self.alert.acquisition(&mut self.system);

        self.sequence_number += 1;
        info!("execution number {}", self.sequence_number);
        let timestamp = self.system.epoch_timestamp();

        let mut faults = 0;
        let mut scalar = |reading: SensorReading<f64>| {
            if reading.is_fault() {
                faults += 1;
            }
            reading.value()
        };

        let battery_pct = scalar(self.sensors.read_battery());
        let source = TemperatureSource::from(self.settings.temperature_source);
        let temperature_c = scalar(self.sensors.read_temperature(source));
        let pressure_pa = scalar(self.sensors.read_pressure());
        let humidity_pct = scalar(self.sensors.read_humidity());

        let gyroscope = self.sensors.read_gyroscope();
        let accelerometer = self.sensors.read_acceleration();
        // tilt comes from the same sample that lands in the record
        let tilt_rad = scalar(tilt_from_reading(&accelerometer));
        let air_quality = self.sensors.read_air_quality();
        faults += [gyroscope.is_fault(), accelerometer.is_fault(), air_quality.is_fault()]
            .iter()
            .filter(|fault| **fault)
            .count() as u32;

        let altitude_m = pressure_pa.and_then(|pressure| pressure_altitude(pressure).ok());

        let record = TelemetryRecord {
            team_id: self.settings.team_id,
            sequence_number: self.sequence_number,
            timestamp,
            battery_pct,
            temperature_c,
            pressure_pa,
            altitude_m,
            humidity_pct,
            gyroscope: gyroscope.value().unwrap_or(Vector3::UNAVAILABLE),
            accelerometer: accelerometer.value().unwrap_or(Vector3::UNAVAILABLE),
            tilt_rad,
            air_quality: air_quality.value(),
        };
        (record, faults)
    }

    fn persist(&mut self, record: &TelemetryRecord) -> Option<StorageFault> {
        self.transition(LoopState::Persisting);
        match self.storage.append(record) {
            Ok(()) => {
                info!("saved on storage");
                None
            }
            Err(fault) => {
                error!("storage fault: {}", fault);
                self.stats.storage_faults += 1;
                Some(fault)
            }
        }
    }

    fn deliver(&mut self, record: &TelemetryRecord) -> Option<DeliveryOutcome> {
        if !self.settings.link_enabled() {
            debug!("link mode disabled, skipping delivery");
            return None;
        }

        self.transition(LoopState::Delivering);
        info!("sending packet...");
        let outcome = self.uplink.send(record);
        match &outcome {
            DeliveryOutcome::Delivered { status } => {
                info!("{} packet sent to {}", status, self.uplink.endpoint());
                self.stats.deliveries += 1;
            }
            DeliveryOutcome::Failed(fault) => {
                error!("delivery failed: {}", fault);
                let connected = self.uplink.is_connected();
                warn!("link connected: {}", connected);
                self.stats.delivery_failures += 1;
                self.alert.fault_pattern(&mut self.system);
            }
        }
        Some(outcome)
    }

    /// Waits for the cycle slot, then captures, persists and delivers one
    /// record. Never fails; every fault is reported in the returned report.
    pub fn run_cycle(&mut self) -> CycleReport {
        let started_at_ms = self.wait_for_next_cycle();

        let (record, sensor_faults) = self.capture();
        if sensor_faults > 0 {
            warn!("{} sensor reading(s) unavailable this cycle", sensor_faults);
        }
        if self.settings.echo_records() {
            match record.to_json() {
                Ok(json) => info!("json_telemetry: {}", json),
                Err(err) => warn!("{}", err),
            }
        }

        let storage_fault = self.persist(&record);
        let delivery = self.deliver(&record);

        self.alert.cycle_end(&mut self.system);
        self.stats.cycles += 1;
        self.stats.sensor_faults += sensor_faults;
        self.transition(LoopState::Ready);

        CycleReport {
            sequence_number: record.sequence_number,
            started_at_ms,
            record,
            sensor_faults,
            storage_fault,
            delivery,
        }
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.run_cycle();
        }
    }

    /// Operator action: removes every file on the medium.
    pub fn clear_storage(&mut self) -> Result<usize, StorageFault> {
        warn!("clearing storage");
        self.storage.clear()
    }

    pub fn hard_reset(&mut self) -> ! {
        warn!("hard reset requested");
        self.system.reset()
    }
}
