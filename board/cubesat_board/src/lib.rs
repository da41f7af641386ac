#![cfg_attr(not(test), no_std)]
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c, NoAcknowledgeSource};

pub const BATTERY_ADC_PORT: u8 = 35;
pub const BATTERY_ADC_FULL_SCALE: u16 = 4095;

/// Faults reported by a sensor bus transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("bus timeout")]
    Timeout,
    #[error("no acknowledge from device")]
    NoAcknowledge,
    #[error("arbitration lost")]
    ArbitrationLoss,
    #[error("bus fault")]
    Bus,
}

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::Timeout => ErrorKind::Other,
            BusError::NoAcknowledge => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            BusError::ArbitrationLoss => ErrorKind::ArbitrationLoss,
            BusError::Bus => ErrorKind::Bus,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("medium could not be mounted")]
    MountFailed,
    #[error("medium not mounted")]
    NotMounted,
    #[error("file not found")]
    NotFound,
    #[error("medium full")]
    Full,
    #[error("i/o failure on medium")]
    Io,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("timeout")]
    Timeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("name resolution or association failure")]
    Unresolved,
    #[error("link not associated")]
    NotAssociated,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// The I2C bus plus the battery ADC. Owned by the sensor bank; the control
/// thread is the only caller.
pub trait SensorBusServices: I2c<Error = BusError> + DelayNs {
    fn query_internal_adc(&mut self, port: u8) -> Result<u16, BusError>;
}

/// Removable medium holding a flat directory of files.
pub trait StorageServices {
    fn mount(&mut self) -> Result<(), StorageError>;
    fn is_mounted(&self) -> bool;
    /// Appends to the end of `file_name`, creating it when missing. Existing
    /// bytes are never rewritten.
    fn append(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn last_byte(&mut self, file_name: &str) -> Result<Option<u8>, StorageError>;
    fn read(&mut self, file_name: &str) -> Result<Vec<u8>, StorageError>;
    fn list_files(&mut self) -> Result<Vec<String>, StorageError>;
    fn remove(&mut self, file_name: &str) -> Result<(), StorageError>;
}

/// Wireless station interface.
pub trait NetworkServices {
    /// Starts association with an access point. Returns once the request is
    /// issued; `is_connected` reports completion.
    fn begin_association(&mut self, ssid: &str, secret: &str) -> Result<(), NetworkError>;
    fn is_connected(&mut self) -> bool;
    /// Issues one POST and returns the response status code, whatever it is.
    fn post(
        &mut self,
        url: &str,
        content_type: &str,
        body: &[u8],
        timeout_ms: u32,
    ) -> Result<u16, NetworkError>;
}

/// Buzzer or lamp driven by a PWM tone.
pub trait IndicatorServices {
    fn tone_on(&mut self, freq_hz: u32, duty: u16);
    fn tone_off(&mut self);
}

pub trait SystemServices {
    /// Monotonic milliseconds since boot.
    fn get_millis(&mut self) -> u64;
    fn epoch_timestamp(&mut self) -> i64;
    fn delay_ms(&mut self, ms: u32);
    fn reset(&mut self) -> !;
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::Error;

    #[test]
    fn bus_error_kinds() {
        assert_eq!(
            BusError::NoAcknowledge.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(BusError::Bus.kind(), ErrorKind::Bus);
        assert_eq!(BusError::Timeout.kind(), ErrorKind::Other);
    }

    #[test]
    fn error_descriptions() {
        use alloc::string::ToString;
        assert_eq!(BusError::Timeout.to_string(), "bus timeout");
        assert_eq!(NetworkError::Timeout.to_string(), "timeout");
        assert_eq!(NetworkError::ConnectionRefused.to_string(), "connection refused");
    }
}
