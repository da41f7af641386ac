use cubesat_board::SensorBusServices;

use super::types::*;
use crate::reading::{FaultCause, SensorId};

pub const MPU6050_I2CADDR_DEFAULT: u8 = 0x68;
pub const MPU6050_REG_GYRO_CONFIG: u8 = 0x1B;
pub const MPU6050_REG_ACCEL_CONFIG: u8 = 0x1C;
pub const MPU6050_REG_ACCEL_XOUT_H: u8 = 0x3B;
pub const MPU6050_REG_PWR_MGMT_1: u8 = 0x6B;
pub const MPU6050_REG_WHO_AM_I: u8 = 0x75;
pub const MPU6050_WHO_AM_I_VALUE: u8 = 0x68;

/// LSB per g at ±2 g.
pub const ACCEL_SCALE: f64 = 16384.0;
/// LSB per °/s at ±250 °/s.
pub const GYRO_SCALE: f64 = 131.0;
pub const STANDARD_GRAVITY: f64 = 9.80665;

const PARAMETER_COUNT: usize = 7;
const IDENTIFIERS: [&str; PARAMETER_COUNT] = [
    "accel_x", "accel_y", "accel_z", "temperature", "gyro_x", "gyro_y", "gyro_z",
];

pub const ACCEL_X: usize = 0;
pub const TEMPERATURE: usize = 3;
pub const GYRO_X: usize = 4;

pub struct MPU6050 {
    sensor_id: SensorId,
    initialized: bool,
    measured_parameter_values: [Result<f64, FaultCause>; PARAMETER_COUNT],
}

impl MPU6050 {
    pub fn new() -> Self {
        MPU6050 {
            sensor_id: SensorId::Inertial,
            initialized: false,
            measured_parameter_values: [Err(FaultCause::NotReady); PARAMETER_COUNT],
        }
    }

    fn axis(raw: i16, scale: f64) -> Result<f64, FaultCause> {
        if raw == i16::MIN || raw == i16::MAX {
            return Err(FaultCause::OutOfRange);
        }
        Ok(round2(raw as f64 * scale))
    }
}

impl Default for MPU6050 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SensorBusServices> SensorDriver<B> for MPU6050 {
    getters!();

    fn setup(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        let mut who_am_i = [0_u8; 1];
        read_registers(bus, MPU6050_I2CADDR_DEFAULT, MPU6050_REG_WHO_AM_I, &mut who_am_i)?;
        if who_am_i[0] != MPU6050_WHO_AM_I_VALUE {
            warn!("MPU6050 answered WHO_AM_I with {:#04x}", who_am_i[0]);
            return Err(FaultCause::MalformedResponse);
        }

        // wake from sleep, internal oscillator
        write_register(bus, MPU6050_I2CADDR_DEFAULT, MPU6050_REG_PWR_MGMT_1, 0x00)?;
        write_register(bus, MPU6050_I2CADDR_DEFAULT, MPU6050_REG_GYRO_CONFIG, 0x00)?;
        write_register(bus, MPU6050_I2CADDR_DEFAULT, MPU6050_REG_ACCEL_CONFIG, 0x00)?;

        self.initialized = true;
        Ok(())
    }

    fn take_measurement(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        self.measured_parameter_values = [Err(FaultCause::NotReady); PARAMETER_COUNT];

        // accel xyz, temperature, gyro xyz as big-endian words
        let mut data = [0_u8; 14];
        read_registers(bus, MPU6050_I2CADDR_DEFAULT, MPU6050_REG_ACCEL_XOUT_H, &mut data)?;

        let mut words = [0_i16; PARAMETER_COUNT];
        for (index, word) in words.iter_mut().enumerate() {
            *word = i16::from_be_bytes([data[index * 2], data[index * 2 + 1]]);
        }

        for axis in 0..3 {
            self.measured_parameter_values[ACCEL_X + axis] =
                MPU6050::axis(words[ACCEL_X + axis], STANDARD_GRAVITY / ACCEL_SCALE);
            self.measured_parameter_values[GYRO_X + axis] =
                MPU6050::axis(words[GYRO_X + axis], 1.0 / GYRO_SCALE);
        }
        self.measured_parameter_values[TEMPERATURE] =
            Ok(round2(words[TEMPERATURE] as f64 / 340.0 + 36.53));

        Ok(())
    }
}
