use cubesat_board::{SensorBusServices, BATTERY_ADC_FULL_SCALE, BATTERY_ADC_PORT};

use super::types::*;
use crate::reading::{FaultCause, SensorId};

/// Divider ratio between the cell and the ADC input at 11 dB attenuation.
pub const DIVIDER_GAIN: f64 = 1.09;

const PARAMETER_COUNT: usize = 1;
const IDENTIFIERS: [&str; PARAMETER_COUNT] = ["battery_pct"];

pub const CHARGE: usize = 0;

pub struct BatteryMonitor {
    sensor_id: SensorId,
    initialized: bool,
    measured_parameter_values: [Result<f64, FaultCause>; PARAMETER_COUNT],
}

impl BatteryMonitor {
    pub fn new() -> Self {
        BatteryMonitor {
            sensor_id: SensorId::Battery,
            initialized: false,
            measured_parameter_values: [Err(FaultCause::NotReady); PARAMETER_COUNT],
        }
    }

    pub fn charge_from_raw(raw: u16) -> Result<f64, FaultCause> {
        if raw > BATTERY_ADC_FULL_SCALE {
            return Err(FaultCause::MalformedResponse);
        }
        let pct = round2(raw as f64 / BATTERY_ADC_FULL_SCALE as f64 * DIVIDER_GAIN * 100.0);
        Ok(pct.clamp(0.0, 100.0))
    }
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SensorBusServices> SensorDriver<B> for BatteryMonitor {
    getters!();

    fn setup(&mut self, _bus: &mut B) -> Result<(), FaultCause> {
        self.initialized = true;
        Ok(())
    }

    fn take_measurement(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        let raw = bus.query_internal_adc(BATTERY_ADC_PORT)?;
        self.measured_parameter_values[CHARGE] = BatteryMonitor::charge_from_raw(raw);
        self.measured_parameter_values[CHARGE].map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_and_clamps() {
        assert_eq!(BatteryMonitor::charge_from_raw(0), Ok(0.0));
        assert_eq!(BatteryMonitor::charge_from_raw(2048), Ok(54.51));
        // the divider gain pushes the top of the range past 100
        assert_eq!(BatteryMonitor::charge_from_raw(4095), Ok(100.0));
        assert_eq!(BatteryMonitor::charge_from_raw(3800), Ok(100.0));
    }

    #[test]
    fn rejects_values_above_full_scale() {
        assert_eq!(
            BatteryMonitor::charge_from_raw(5000),
            Err(FaultCause::MalformedResponse)
        );
    }
}
