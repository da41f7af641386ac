//! Per-call sensor results.
//!
//! Every SensorBank operation hands back a [`SensorReading`]: either the
//! measured value or a [`SensorFault`] naming the sensor and the cause. A
//! fault stays inside the reading that produced it.

use core::fmt;

use cubesat_board::BusError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorId {
    Battery,
    Inertial,
    Barometer,
    Hygrometer,
    AirQuality,
}

impl SensorId {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SensorId::Battery => "battery",
            SensorId::Inertial => "mpu6050",
            SensorId::Barometer => "bmp280",
            SensorId::Hygrometer => "aht20",
            SensorId::AirQuality => "ens160",
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FaultCause {
    #[error("bus timeout")]
    BusTimeout,
    #[error("sensor absent")]
    SensorAbsent,
    #[error("bus fault")]
    BusFault,
    #[error("malformed response")]
    MalformedResponse,
    #[error("sensor not ready")]
    NotReady,
    #[error("value out of range")]
    OutOfRange,
    #[error("domain error")]
    DomainError,
    #[error("input reading unavailable")]
    Unavailable,
}

impl From<BusError> for FaultCause {
    fn from(error: BusError) -> Self {
        match error {
            BusError::Timeout => FaultCause::BusTimeout,
            BusError::NoAcknowledge => FaultCause::SensorAbsent,
            BusError::ArbitrationLoss | BusError::Bus => FaultCause::BusFault,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{sensor}: {cause}")]
pub struct SensorFault {
    pub sensor: SensorId,
    pub cause: FaultCause,
}

impl SensorFault {
    pub const fn new(sensor: SensorId, cause: FaultCause) -> Self {
        Self { sensor, cause }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SensorReading<T> {
    Value(T),
    Fault(SensorFault),
}

impl<T> SensorReading<T> {
    pub fn from_result(sensor: SensorId, result: Result<T, FaultCause>) -> Self {
        match result {
            Ok(value) => SensorReading::Value(value),
            Err(cause) => SensorReading::Fault(SensorFault::new(sensor, cause)),
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            SensorReading::Value(value) => Some(value),
            SensorReading::Fault(_) => None,
        }
    }

    pub fn fault(&self) -> Option<&SensorFault> {
        match self {
            SensorReading::Value(_) => None,
            SensorReading::Fault(fault) => Some(fault),
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, SensorReading::Fault(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> SensorReading<U> {
        match self {
            SensorReading::Value(value) => SensorReading::Value(f(value)),
            SensorReading::Fault(fault) => SensorReading::Fault(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn bus_errors_become_causes() {
        assert_eq!(FaultCause::from(BusError::Timeout), FaultCause::BusTimeout);
        assert_eq!(FaultCause::from(BusError::NoAcknowledge), FaultCause::SensorAbsent);
        assert_eq!(FaultCause::from(BusError::ArbitrationLoss), FaultCause::BusFault);
    }

    #[test]
    fn fault_carries_sensor_and_cause() {
        let reading: SensorReading<f64> =
            SensorReading::from_result(SensorId::Barometer, Err(FaultCause::BusTimeout));
        assert!(reading.is_fault());
        let fault = reading.fault().copied().unwrap();
        assert_eq!(fault.cause.to_string(), "bus timeout");
        assert_eq!(fault.to_string(), "bmp280: bus timeout");
        assert_eq!(reading.value(), None);
    }

    #[test]
    fn map_keeps_fault() {
        let reading: SensorReading<f64> = SensorReading::Value(2.0);
        assert_eq!(reading.map(|v| v * 2.0), SensorReading::Value(4.0));

        let fault = SensorFault::new(SensorId::Inertial, FaultCause::SensorAbsent);
        let reading: SensorReading<f64> = SensorReading::Fault(fault);
        assert_eq!(reading.map(|v| v * 2.0), SensorReading::Fault(fault));
    }
}
