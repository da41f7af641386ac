use cubesat_board::SensorBusServices;

use crate::reading::{FaultCause, SensorId};

/// A chip behind the sensor bus. Values are produced by `take_measurement`
/// and read back by parameter index, one index per measured quantity.
pub trait SensorDriver<B: SensorBusServices> {
    fn sensor_id(&self) -> SensorId;
    fn is_initialized(&self) -> bool;
    /// Forget the chip state so the next read runs `setup` again.
    fn invalidate(&mut self);
    fn setup(&mut self, bus: &mut B) -> Result<(), FaultCause>;
    fn take_measurement(&mut self, bus: &mut B) -> Result<(), FaultCause>;
    fn get_measured_parameter_count(&self) -> usize;
    fn get_measured_parameter_value(&self, index: usize) -> Result<f64, FaultCause>;
    fn get_measured_parameter_identifier(&self, index: usize) -> &'static str;
}

macro_rules! getters {
    () => {
        fn sensor_id(&self) -> SensorId {
            self.sensor_id
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        fn invalidate(&mut self) {
            self.initialized = false;
            self.measured_parameter_values = [Err(FaultCause::NotReady); PARAMETER_COUNT];
        }

        fn get_measured_parameter_count(&self) -> usize {
            PARAMETER_COUNT
        }

        fn get_measured_parameter_value(&self, index: usize) -> Result<f64, FaultCause> {
            match self.measured_parameter_values.get(index) {
                Some(value) => *value,
                None => Err(FaultCause::OutOfRange),
            }
        }

        fn get_measured_parameter_identifier(&self, index: usize) -> &'static str {
            IDENTIFIERS.get(index).copied().unwrap_or("invalid")
        }
    };
}

pub(crate) use getters;

pub(crate) fn read_registers<B: SensorBusServices>(
    bus: &mut B,
    address: u8,
    register: u8,
    buffer: &mut [u8],
) -> Result<(), FaultCause> {
    bus.write_read(address, &[register], buffer)
        .map_err(FaultCause::from)
}

pub(crate) fn write_register<B: SensorBusServices>(
    bus: &mut B,
    address: u8,
    register: u8,
    value: u8,
) -> Result<(), FaultCause> {
    bus.write(address, &[register, value]).map_err(FaultCause::from)
}

/// Two decimal places, the precision the ground segment expects.
pub fn round2(value: f64) -> f64 {
    libm::round(value * 100.0) / 100.0
}

pub(crate) fn finite(value: f64) -> Result<f64, FaultCause> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FaultCause::MalformedResponse)
    }
}
