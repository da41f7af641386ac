use cubesat_board::SensorBusServices;

use super::types::*;
use crate::reading::{FaultCause, SensorId};

pub const ENS160_I2CADDR_DEFAULT: u8 = 0x53;
pub const ENS160_REG_PART_ID: u8 = 0x00;
pub const ENS160_REG_OPMODE: u8 = 0x10;
pub const ENS160_REG_DEVICE_STATUS: u8 = 0x20;
pub const ENS160_REG_DATA_AQI: u8 = 0x21;
pub const ENS160_PART_ID: u16 = 0x0160;
pub const ENS160_OPMODE_STANDARD: u8 = 0x02;

pub const ENS160_STATUS_STATER: u8 = 0x40;
pub const ENS160_STATUS_VALIDITY_MASK: u8 = 0x0C;
pub const ENS160_VALIDITY_INVALID: u8 = 0x0C;

const PARAMETER_COUNT: usize = 3;
const IDENTIFIERS: [&str; PARAMETER_COUNT] = ["TVOC", "AQI", "eCO2"];

pub const TVOC: usize = 0;
pub const AQI: usize = 1;
pub const ECO2: usize = 2;

pub struct ENS160 {
    sensor_id: SensorId,
    initialized: bool,
    measured_parameter_values: [Result<f64, FaultCause>; PARAMETER_COUNT],
}

impl ENS160 {
    pub fn new() -> Self {
        ENS160 {
            sensor_id: SensorId::AirQuality,
            initialized: false,
            measured_parameter_values: [Err(FaultCause::NotReady); PARAMETER_COUNT],
        }
    }
}

impl Default for ENS160 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SensorBusServices> SensorDriver<B> for ENS160 {
    getters!();

    fn setup(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        let mut part_id = [0_u8; 2];
        read_registers(bus, ENS160_I2CADDR_DEFAULT, ENS160_REG_PART_ID, &mut part_id)?;
        let part_id = u16::from_le_bytes(part_id);
        if part_id != ENS160_PART_ID {
            warn!("ENS160 answered part id {:#06x}", part_id);
            return Err(FaultCause::MalformedResponse);
        }

        write_register(bus, ENS160_I2CADDR_DEFAULT, ENS160_REG_OPMODE, ENS160_OPMODE_STANDARD)?;

        self.initialized = true;
        Ok(())
    }

    fn take_measurement(&mut self, bus: &mut B) -> Result<(), FaultCause> {
        self.measured_parameter_values = [Err(FaultCause::NotReady); PARAMETER_COUNT];

        let mut status = [0_u8; 1];
        read_registers(bus, ENS160_I2CADDR_DEFAULT, ENS160_REG_DEVICE_STATUS, &mut status)?;
        if status[0] & ENS160_STATUS_STATER != 0 {
            return Err(FaultCause::MalformedResponse);
        }
        if status[0] & ENS160_STATUS_VALIDITY_MASK == ENS160_VALIDITY_INVALID {
            return Err(FaultCause::NotReady);
        }

        // AQI, TVOC (LE), eCO2 (LE)
        let mut data = [0_u8; 5];
        read_registers(bus, ENS160_I2CADDR_DEFAULT, ENS160_REG_DATA_AQI, &mut data)?;
        let aqi = data[0] & 0x07;
        if !(1..=5).contains(&aqi) {
            return Err(FaultCause::OutOfRange);
        }
        let tvoc = u16::from_le_bytes([data[1], data[2]]);
        let eco2 = u16::from_le_bytes([data[3], data[4]]);

        self.measured_parameter_values[TVOC] = Ok(tvoc as f64);
        self.measured_parameter_values[AQI] = Ok(aqi as f64);
        self.measured_parameter_values[ECO2] = Ok(eco2 as f64);
        Ok(())
    }
}
