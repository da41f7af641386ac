pub mod types;

pub mod aht20;
pub mod battery;
pub mod bmp280;
pub mod ens160;
pub mod mpu6050;

pub use aht20::AHT20;
pub use battery::BatteryMonitor;
pub use bmp280::BMP280;
pub use ens160::ENS160;
pub use mpu6050::MPU6050;
pub use types::{round2, SensorDriver};
