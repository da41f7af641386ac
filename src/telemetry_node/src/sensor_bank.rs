use cubesat_board::SensorBusServices;

use crate::drivers::{self, SensorDriver, AHT20, BMP280, ENS160, MPU6050};
use crate::drivers::{mpu6050::STANDARD_GRAVITY, BatteryMonitor};
use crate::reading::{FaultCause, SensorFault, SensorId, SensorReading};
use crate::record::{AirQuality, Vector3};

pub const SEA_LEVEL_PRESSURE_PA: f64 = 101325.0;

/// Which chip supplies `temperature_c`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemperatureSource {
    Barometer,
    Inertial,
    Hygrometer,
}

impl From<u8> for TemperatureSource {
    fn from(selector: u8) -> Self {
        match selector {
            0 => TemperatureSource::Barometer,
            1 => TemperatureSource::Inertial,
            _ => TemperatureSource::Hygrometer,
        }
    }
}

/// International barometric formula against the standard sea level pressure.
pub fn pressure_altitude(pressure_pa: f64) -> Result<f64, FaultCause> {
    if pressure_pa.is_nan() || pressure_pa <= 0.0 {
        return Err(FaultCause::DomainError);
    }
    let altitude = 44330.0 * (1.0 - libm::pow(pressure_pa / SEA_LEVEL_PRESSURE_PA, 1.0 / 5.255));
    Ok(drivers::round2(altitude))
}

pub struct SensorBank<B: SensorBusServices> {
    bus: B,
    battery: BatteryMonitor,
    inertial: MPU6050,
    barometer: BMP280,
    hygrometer: AHT20,
    air_quality: ENS160,
}

impl<B: SensorBusServices> SensorBank<B> {
    pub fn new(bus: B) -> Self {
        SensorBank {
            bus,
            battery: BatteryMonitor::new(),
            inertial: MPU6050::new(),
            barometer: BMP280::new(),
            hygrometer: AHT20::new(),
            air_quality: ENS160::new(),
        }
    }

    pub fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    // Sets the chip up when needed and takes one measurement. A failure
    // drops the driver back to uninitialized so the next read starts over.
    fn measure(driver: &mut dyn SensorDriver<B>, bus: &mut B) -> Result<(), SensorFault> {
        let result = if driver.is_initialized() {
            Ok(())
        } else {
            debug!("setting up {}", driver.sensor_id());
            driver.setup(bus)
        };

        match result.and_then(|_| driver.take_measurement(bus)) {
            Ok(()) => Ok(()),
            Err(cause) => {
                driver.invalidate();
                let fault = SensorFault::new(driver.sensor_id(), cause);
                warn!("sensor read failed: {}", fault);
                Err(fault)
            }
        }
    }

    fn scalar(driver: &mut dyn SensorDriver<B>, bus: &mut B, index: usize) -> SensorReading<f64> {
        if let Err(fault) = SensorBank::measure(driver, bus) {
            return SensorReading::Fault(fault);
        }
        let result = driver.get_measured_parameter_value(index);
        if let Err(cause) = result {
            warn!(
                "{} {} unavailable: {}",
                driver.sensor_id(),
                driver.get_measured_parameter_identifier(index),
                cause
            );
        }
        SensorReading::from_result(driver.sensor_id(), result)
    }

    fn vector(driver: &mut dyn SensorDriver<B>, bus: &mut B, first: usize) -> SensorReading<Vector3> {
        if let Err(fault) = SensorBank::measure(driver, bus) {
            return SensorReading::Fault(fault);
        }
        let mut components = [None; 3];
        for (axis, component) in components.iter_mut().enumerate() {
            match driver.get_measured_parameter_value(first + axis) {
                Ok(value) => *component = Some(value),
                Err(cause) => warn!(
                    "{} {} unavailable: {}",
                    driver.sensor_id(),
                    driver.get_measured_parameter_identifier(first + axis),
                    cause
                ),
            }
        }
        SensorReading::Value(Vector3(components))
    }

    pub fn read_battery(&mut self) -> SensorReading<f64> {
        SensorBank::scalar(&mut self.battery, &mut self.bus, drivers::battery::CHARGE)
    }

    /// Angular rate in °/s.
    pub fn read_gyroscope(&mut self) -> SensorReading<Vector3> {
        SensorBank::vector(&mut self.inertial, &mut self.bus, drivers::mpu6050::GYRO_X)
    }

    /// Acceleration in m/s².
    pub fn read_acceleration(&mut self) -> SensorReading<Vector3> {
        SensorBank::vector(&mut self.inertial, &mut self.bus, drivers::mpu6050::ACCEL_X)
    }

    pub fn read_temperature(&mut self, source: TemperatureSource) -> SensorReading<f64> {
        match source {
            TemperatureSource::Barometer => SensorBank::scalar(
                &mut self.barometer,
                &mut self.bus,
                drivers::bmp280::TEMPERATURE,
            ),
            TemperatureSource::Inertial => SensorBank::scalar(
                &mut self.inertial,
                &mut self.bus,
                drivers::mpu6050::TEMPERATURE,
            ),
            TemperatureSource::Hygrometer => SensorBank::scalar(
                &mut self.hygrometer,
                &mut self.bus,
                drivers::aht20::TEMPERATURE,
            ),
        }
    }

    /// Pa.
    pub fn read_pressure(&mut self) -> SensorReading<f64> {
        SensorBank::scalar(&mut self.barometer, &mut self.bus, drivers::bmp280::PRESSURE)
    }

    /// Relative humidity in %.
    pub fn read_humidity(&mut self) -> SensorReading<f64> {
        SensorBank::scalar(&mut self.hygrometer, &mut self.bus, drivers::aht20::HUMIDITY)
    }

    pub fn read_air_quality(&mut self) -> SensorReading<AirQuality> {
        if let Err(fault) = SensorBank::measure(&mut self.air_quality, &mut self.bus) {
            return SensorReading::Fault(fault);
        }
        let metrics = Self::air_quality_metrics(&self.air_quality);
        if let Err(cause) = metrics {
            warn!("air quality unavailable: {}", cause);
        }
        SensorReading::from_result(SensorId::AirQuality, metrics)
    }

    fn air_quality_metrics(driver: &dyn SensorDriver<B>) -> Result<AirQuality, FaultCause> {
        Ok(AirQuality {
            tvoc_ppb: driver.get_measured_parameter_value(drivers::ens160::TVOC)? as u16,
            aqi: driver.get_measured_parameter_value(drivers::ens160::AQI)? as u8,
            eco2_ppm: driver.get_measured_parameter_value(drivers::ens160::ECO2)? as u16,
        })
    }

    /// Radians from a fresh acceleration reading, `asin(accel_y / g)`.
    pub fn derive_tilt_angle(&mut self) -> SensorReading<f64> {
        let acceleration = self.read_acceleration();
        tilt_from_reading(&acceleration)
    }
}

/// Tilt in radians from an acceleration reading that was already taken.
pub fn tilt_from_reading(acceleration: &SensorReading<Vector3>) -> SensorReading<f64> {
    let accel_y = match acceleration {
        SensorReading::Value(acceleration) => acceleration.y(),
        SensorReading::Fault(fault) => return SensorReading::Fault(*fault),
    };
    let result = match accel_y {
        None => Err(FaultCause::Unavailable),
        Some(accel_y) => tilt_from_acceleration(accel_y),
    };
    if let Err(cause) = result {
        warn!("tilt angle unavailable: {}", cause);
    }
    SensorReading::from_result(SensorId::Inertial, result)
}

pub fn tilt_from_acceleration(accel_y: f64) -> Result<f64, FaultCause> {
    let ratio = accel_y / STANDARD_GRAVITY;
    if !(-1.0..=1.0).contains(&ratio) {
        return Err(FaultCause::DomainError);
    }
    Ok(libm::asin(ratio))
}
