use cubesat_board::SensorBusServices;

use super::types::*;
use crate::reading::{FaultCause, SensorId};

pub const AHTX0_I2CADDR_DEFAULT: u8 = 0x38;
pub const AHTX0_CMD_CALIBRATE: u8 = 0xE1;
pub const AHTX0_CMD_TRIGGER: u8 = 0xAC;
pub const AHTX0_CMD_SOFTRESET: u8 = 0xBA;
pub const AHTX0_STATUS_BUSY: u8 = 0x80;
pub const AHTX0_STATUS_CALIBRATED: u8 = 0x08;

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

const BUSY_RETRIES: u32 = 10;
const BUSY_POLL_MS: u32 = 10;

const PARAMETER_COUNT: usize = 2;
const IDENTIFIERS: [&str; PARAMETER_COUNT] = ["humidity", "temperature"];

pub const HUMIDITY: usize = 0;
pub const TEMPERATURE: usize = 1;

pub struct AHT20 {
    sensor_id: SensorId,
    initialized: bool,
    measured_parameter_values: [Result<f64, FaultCause>; PARAMETER_COUNT],
}

impl AHT20 {
    pub fn new() -> Self {
        AHT20 {
            sensor_id: SensorId::Hygrometer,
            initialized: false,
            measured_parameter_values: [Err(FaultCause::NotReady); PARAMETER_COUNT],
        }
    }

    fn get_status<B: SensorBusServices>(bus: &mut B) -> Result<u8, FaultCause> {
        let mut buffer: [u8; 1] = [0; 1];
        bus.read(AHTX0_I2CADDR_DEFAULT, &mut buffer)?;
        Ok(buffer[0])
    }

    // The chip holds the busy bit for ~80ms per conversion. A chip that never
    // clears it is reported as not ready instead of stalling the cycle.
    fn wait_until_ready<B: SensorBusServices>(bus: &mut B) -> Result<u8, FaultCause> {
        for _ in 0..BUSY_RETRIES {
            let status = AHT20::get_status(bus)?;
            if status & AHTX0_STATUS_BUSY == 0 {
                return Ok(status);
            }
            debug!("AHT20 is busy");
            bus.delay_ms(BUSY_POLL_MS);
        }
        Err(FaultCause::NotReady)
    }

    fn self_calibrate<B: SensorBusServices>(bus: &mut B) -> Result<u8, FaultCause> {
        bus.write(AHTX0_I2CADDR_DEFAULT, &[AHTX0_CMD_CALIBRATE, 0x08, 0x00])?;
        AHT20::wait_until_ready(bus)
    }

    /// CRC-8 over the status and data bytes, as appended by the chip.
    pub fn crc8(data: &[u8]) -> u8 {
        let mut crc = CRC8_INIT;
        for byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ CRC8_POLYNOMIAL
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    pub fn decode(data: &[u8; 6]) -> (f64, f64) {
        let mut h: u32 = data[1] as u32;
        h = (h << 8) | data[2] as u32;
        h = (h << 4) | (data[3] as u32 >> 4);
        let humidity = (h as f64 * 100.0) / 0x100000 as f64;

        let mut t: u32 = (data[3] & 0x0F) as u32;
        t = (t << 8) | data[4] as u32;
        t = (t << 8) | data[5] as u32;
        let temperature = t as f64 * 200.0 / 0x100000 as f64 - 50.0;

        (humidity, temperature)
    }
}

impl Default for AHT20 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SensorBusServices> SensorDriver<B> for AHT20 {
    getters!();

    fn setup(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        // 20ms startup time after power cycle is covered by board bring-up.
        if let Err(err) = bus.write(AHTX0_I2CADDR_DEFAULT, &[AHTX0_CMD_SOFTRESET]) {
            warn!("Failed to setup AHTX0 {}", err);
            return Err(err.into());
        }
        bus.delay_ms(20);

        let status = AHT20::wait_until_ready(bus)?;
        if status & AHTX0_STATUS_CALIBRATED == 0 {
            let status = AHT20::self_calibrate(bus)?;
            if status & AHTX0_STATUS_CALIBRATED == 0 {
                warn!("Failed to calibrate AHTX0");
                return Err(FaultCause::NotReady);
            }
        }

        self.initialized = true;
        Ok(())
    }

    fn take_measurement(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        self.measured_parameter_values = [Err(FaultCause::NotReady); PARAMETER_COUNT];

        bus.write(AHTX0_I2CADDR_DEFAULT, &[AHTX0_CMD_TRIGGER, 0x33, 0])?;
        AHT20::wait_until_ready(bus)?;

        let mut frame = [0_u8; 7];
        bus.read(AHTX0_I2CADDR_DEFAULT, &mut frame)?;
        if frame[0] & AHTX0_STATUS_BUSY != 0 {
            return Err(FaultCause::NotReady);
        }
        let mut data = [0_u8; 6];
        data.copy_from_slice(&frame[..6]);
        if AHT20::crc8(&data) != frame[6] {
            warn!("AHT20 frame failed CRC check");
            return Err(FaultCause::MalformedResponse);
        }

        let (humidity, temperature) = AHT20::decode(&data);
        self.measured_parameter_values[HUMIDITY] =
            finite(humidity).map(|v| round2(v.clamp(0.0, 100.0)));
        self.measured_parameter_values[TEMPERATURE] = finite(temperature).map(round2);
        Ok(())
    }
}
