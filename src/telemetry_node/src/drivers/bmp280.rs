use cubesat_board::SensorBusServices;

use super::types::*;
use crate::reading::{FaultCause, SensorId};

pub const BMP280_I2CADDR_DEFAULT: u8 = 0x76;
pub const BMP280_REG_CALIBRATION: u8 = 0x88;
pub const BMP280_REG_CHIP_ID: u8 = 0xD0;
pub const BMP280_REG_STATUS: u8 = 0xF3;
pub const BMP280_REG_CTRL_MEAS: u8 = 0xF4;
pub const BMP280_REG_PRESS_MSB: u8 = 0xF7;
pub const BMP280_CHIP_ID: u8 = 0x58;
pub const BMP280_STATUS_MEASURING: u8 = 0x08;

// osrs_t x1, osrs_p x1, forced mode
const CTRL_MEAS_FORCED: u8 = (0b001 << 5) | (0b001 << 2) | 0b01;
// reset value of the data registers when a channel was skipped
const ADC_SKIPPED: i32 = 0x80000;

const CONVERSION_RETRIES: u32 = 10;
const CONVERSION_POLL_MS: u32 = 2;

const PARAMETER_COUNT: usize = 2;
const IDENTIFIERS: [&str; PARAMETER_COUNT] = ["temperature", "pressure"];

pub const TEMPERATURE: usize = 0;
pub const PRESSURE: usize = 1;

/// Factory trimming parameters, read once at setup.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl Calibration {
    pub fn from_bytes(bytes: &[u8; 24]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Calibration {
            dig_t1: unsigned(0),
            dig_t2: signed(2),
            dig_t3: signed(4),
            dig_p1: unsigned(6),
            dig_p2: signed(8),
            dig_p3: signed(10),
            dig_p4: signed(12),
            dig_p5: signed(14),
            dig_p6: signed(16),
            dig_p7: signed(18),
            dig_p8: signed(20),
            dig_p9: signed(22),
        }
    }

    /// Returns (t_fine, °C).
    pub fn compensate_temperature(&self, adc_t: i32) -> (f64, f64) {
        let adc_t = adc_t as f64;
        let t1 = self.dig_t1 as f64;
        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * self.dig_t2 as f64;
        let delta = adc_t / 131072.0 - t1 / 8192.0;
        let var2 = delta * delta * self.dig_t3 as f64;
        let t_fine = var1 + var2;
        (t_fine, t_fine / 5120.0)
    }

    /// Pa, or `None` when the trimming parameters would divide by zero.
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: f64) -> Option<f64> {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * self.dig_p6 as f64 / 32768.0;
        var2 += var1 * self.dig_p5 as f64 * 2.0;
        var2 = var2 / 4.0 + self.dig_p4 as f64 * 65536.0;
        var1 = (self.dig_p3 as f64 * var1 * var1 / 524288.0 + self.dig_p2 as f64 * var1)
            / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.dig_p1 as f64;
        if var1 == 0.0 {
            return None;
        }
        let mut p = 1048576.0 - adc_p as f64;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        var1 = self.dig_p9 as f64 * p * p / 2147483648.0;
        var2 = p * self.dig_p8 as f64 / 32768.0;
        Some(p + (var1 + var2 + self.dig_p7 as f64) / 16.0)
    }
}

pub struct BMP280 {
    sensor_id: SensorId,
    initialized: bool,
    calibration: Calibration,
    measured_parameter_values: [Result<f64, FaultCause>; PARAMETER_COUNT],
}

impl BMP280 {
    pub fn new() -> Self {
        BMP280 {
            sensor_id: SensorId::Barometer,
            initialized: false,
            calibration: Calibration::default(),
            measured_parameter_values: [Err(FaultCause::NotReady); PARAMETER_COUNT],
        }
    }

    fn raw20(msb: u8, lsb: u8, xlsb: u8) -> i32 {
        ((msb as i32) << 12) | ((lsb as i32) << 4) | ((xlsb as i32) >> 4)
    }
}

impl Default for BMP280 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SensorBusServices> SensorDriver<B> for BMP280 {
    getters!();

    fn setup(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        let mut chip_id = [0_u8; 1];
        read_registers(bus, BMP280_I2CADDR_DEFAULT, BMP280_REG_CHIP_ID, &mut chip_id)?;
        if chip_id[0] != BMP280_CHIP_ID {
            warn!("BMP280 answered chip id {:#04x}", chip_id[0]);
            return Err(FaultCause::MalformedResponse);
        }

        let mut trimming = [0_u8; 24];
        read_registers(bus, BMP280_I2CADDR_DEFAULT, BMP280_REG_CALIBRATION, &mut trimming)?;
        let calibration = Calibration::from_bytes(&trimming);
        if calibration.dig_p1 == 0 {
            warn!("BMP280 calibration block is blank");
            return Err(FaultCause::MalformedResponse);
        }

        self.calibration = calibration;
        self.initialized = true;
        Ok(())
    }

    fn take_measurement(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        self.measured_parameter_values = [Err(FaultCause::NotReady); PARAMETER_COUNT];

        write_register(bus, BMP280_I2CADDR_DEFAULT, BMP280_REG_CTRL_MEAS, CTRL_MEAS_FORCED)?;

        let mut converted = false;
        let mut status = [0_u8; 1];
        for _ in 0..CONVERSION_RETRIES {
            bus.delay_ms(CONVERSION_POLL_MS);
            read_registers(bus, BMP280_I2CADDR_DEFAULT, BMP280_REG_STATUS, &mut status)?;
            if status[0] & BMP280_STATUS_MEASURING == 0 {
                converted = true;
                break;
            }
        }
        if !converted {
            return Err(FaultCause::NotReady);
        }

        let mut data = [0_u8; 6];
        read_registers(bus, BMP280_I2CADDR_DEFAULT, BMP280_REG_PRESS_MSB, &mut data)?;
        let adc_p = BMP280::raw20(data[0], data[1], data[2]);
        let adc_t = BMP280::raw20(data[3], data[4], data[5]);
        if adc_t == ADC_SKIPPED {
            return Err(FaultCause::NotReady);
        }

        let (t_fine, temperature) = self.calibration.compensate_temperature(adc_t);
        self.measured_parameter_values[TEMPERATURE] = finite(temperature).map(round2);
        self.measured_parameter_values[PRESSURE] = if adc_p == ADC_SKIPPED {
            Err(FaultCause::NotReady)
        } else {
            match self.calibration.compensate_pressure(adc_p, t_fine) {
                Some(pressure) => finite(pressure).map(round2),
                None => Err(FaultCause::MalformedResponse),
            }
        };
        Ok(())
    }
}
