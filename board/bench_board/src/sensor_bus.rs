//! Register-level emulation of the sensor bus.
//!
//! Each chip answers at its usual address with values a bench operator can
//! set. Register chips (MPU6050, BMP280, ENS160) keep a 256 byte file and an
//! auto-incrementing pointer. The AHT20 is command driven and is emulated
//! separately.

use std::collections::BTreeMap;

use cubesat_board::{BusError, SensorBusServices, BATTERY_ADC_PORT};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation};

pub const MPU6050_ADDRESS: u8 = 0x68;
pub const BMP280_ADDRESS: u8 = 0x76;
pub const AHT20_ADDRESS: u8 = 0x38;
pub const ENS160_ADDRESS: u8 = 0x53;

const STANDARD_GRAVITY: f64 = 9.80665;

// BMP280 datasheet worked example: 25.08 °C, 100653.27 Pa
const BMP280_TRIMMING: [(u8, u16); 12] = [
    (0x88, 27504),
    (0x8A, 26435),
    (0x8C, -1000_i16 as u16),
    (0x8E, 36477),
    (0x90, -10685_i16 as u16),
    (0x92, 3024),
    (0x94, 2855),
    (0x96, 140),
    (0x98, -7_i16 as u16),
    (0x9A, 15500),
    (0x9C, -14600_i16 as u16),
    (0x9E, 6000),
];
const BMP280_ADC_P: u32 = 415148;
const BMP280_ADC_T: u32 = 519888;

struct RegisterFile {
    registers: [u8; 256],
    pointer: u8,
}

impl RegisterFile {
    fn new() -> Self {
        RegisterFile {
            registers: [0; 256],
            pointer: 0,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if let Some((register, data)) = bytes.split_first() {
            self.pointer = *register;
            for byte in data {
                self.registers[self.pointer as usize] = *byte;
                self.pointer = self.pointer.wrapping_add(1);
            }
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.registers[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    fn set(&mut self, register: u8, bytes: &[u8]) {
        let start = register as usize;
        self.registers[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

struct HumidityChip {
    calibrated: bool,
    busy_reads_left: u32,
    busy_reads_per_measurement: u32,
    humidity_raw: u32,
    temperature_raw: u32,
    corrupt_crc: bool,
}

fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0xFF_u8, |crc, byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            }
        })
    })
}

impl HumidityChip {
    fn status(&self) -> u8 {
        let mut status = 0x10;
        if self.calibrated {
            status |= 0x08;
        }
        if self.busy_reads_left > 0 {
            status |= 0x80;
        }
        status
    }

    fn write(&mut self, bytes: &[u8]) {
        match bytes.first() {
            Some(0xBA) => self.busy_reads_left = 0,
            Some(0xE1) => self.calibrated = true,
            Some(0xAC) => self.busy_reads_left = self.busy_reads_per_measurement,
            _ => {}
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        let h = self.humidity_raw & 0xFFFFF;
        let t = self.temperature_raw & 0xFFFFF;
        let mut frame = [
            self.status(),
            (h >> 12) as u8,
            (h >> 4) as u8,
            (((h & 0x0F) << 4) as u8) | ((t >> 16) as u8 & 0x0F),
            (t >> 8) as u8,
            t as u8,
            0,
        ];
        frame[6] = crc8(&frame[..6]);
        if self.corrupt_crc {
            frame[6] ^= 0xFF;
        }
        for (byte, value) in buffer.iter_mut().zip(frame.iter()) {
            *byte = *value;
        }
        if self.busy_reads_left > 0 {
            self.busy_reads_left -= 1;
        }
    }
}

enum Chip {
    Registers(RegisterFile),
    Humidity(HumidityChip),
}

impl Chip {
    fn write(&mut self, bytes: &[u8]) {
        match self {
            Chip::Registers(file) => file.write(bytes),
            Chip::Humidity(chip) => chip.write(bytes),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        match self {
            Chip::Registers(file) => file.read(buffer),
            Chip::Humidity(chip) => chip.read(buffer),
        }
    }
}

/// The node's I2C bus and battery ADC with every chip populated.
pub struct SimulatedBus {
    chips: BTreeMap<u8, Chip>,
    connected: bool,
    battery_raw: u16,
    delayed_ns: u64,
}

impl SimulatedBus {
    pub fn new() -> Self {
        let mut bus = SimulatedBus {
            chips: BTreeMap::new(),
            connected: true,
            battery_raw: 2048,
            delayed_ns: 0,
        };

        let mut inertial = RegisterFile::new();
        inertial.set(0x75, &[0x68]);
        inertial.set(0x6B, &[0x40]);
        bus.chips.insert(MPU6050_ADDRESS, Chip::Registers(inertial));
        bus.set_acceleration([0.0, 0.0, STANDARD_GRAVITY]);
        bus.set_rotation([1.0, 0.0, 0.0]);

        let mut barometer = RegisterFile::new();
        barometer.set(0xD0, &[0x58]);
        for (register, value) in BMP280_TRIMMING {
            barometer.set(register, &value.to_le_bytes());
        }
        barometer.set(0xF7, &raw20(BMP280_ADC_P));
        barometer.set(0xFA, &raw20(BMP280_ADC_T));
        bus.chips.insert(BMP280_ADDRESS, Chip::Registers(barometer));

        bus.chips.insert(
            AHT20_ADDRESS,
            Chip::Humidity(HumidityChip {
                calibrated: true,
                busy_reads_left: 0,
                busy_reads_per_measurement: 1,
                // 50 %RH, 25 °C
                humidity_raw: 0x80000,
                temperature_raw: 0x60000,
                corrupt_crc: false,
            }),
        );

        let mut air_quality = RegisterFile::new();
        air_quality.set(0x00, &0x0160_u16.to_le_bytes());
        bus.chips.insert(ENS160_ADDRESS, Chip::Registers(air_quality));
        bus.set_air_quality(2, 120, 600);

        bus
    }

    /// Every transaction times out until `reconnect`.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The chip stops acknowledging its address.
    pub fn remove_device(&mut self, address: u8) {
        self.chips.remove(&address);
    }

    pub fn set_battery_raw(&mut self, raw: u16) {
        self.battery_raw = raw;
    }

    /// m/s² per axis at the ±2 g range. Values beyond the range saturate.
    pub fn set_acceleration(&mut self, acceleration: [f64; 3]) {
        let mut bytes = [0_u8; 6];
        for (axis, value) in acceleration.iter().enumerate() {
            let raw = saturate(value / STANDARD_GRAVITY * 16384.0);
            bytes[axis * 2..axis * 2 + 2].copy_from_slice(&raw.to_be_bytes());
        }
        self.set_registers(MPU6050_ADDRESS, 0x3B, &bytes);
    }

    /// °/s per axis at the ±250 °/s range.
    pub fn set_rotation(&mut self, rotation: [f64; 3]) {
        let mut bytes = [0_u8; 6];
        for (axis, value) in rotation.iter().enumerate() {
            let raw = saturate(value * 131.0);
            bytes[axis * 2..axis * 2 + 2].copy_from_slice(&raw.to_be_bytes());
        }
        self.set_registers(MPU6050_ADDRESS, 0x43, &bytes);
    }

    pub fn set_air_quality(&mut self, aqi: u8, tvoc_ppb: u16, eco2_ppm: u16) {
        let tvoc = tvoc_ppb.to_le_bytes();
        let eco2 = eco2_ppm.to_le_bytes();
        self.set_registers(ENS160_ADDRESS, 0x20, &[0x02, aqi, tvoc[0], tvoc[1], eco2[0], eco2[1]]);
    }

    pub fn set_air_quality_status(&mut self, status: u8) {
        self.set_registers(ENS160_ADDRESS, 0x20, &[status]);
    }

    /// Each triggered humidity measurement reports busy for `reads` status reads.
    pub fn set_humidity_busy_reads(&mut self, reads: u32) {
        if let Some(Chip::Humidity(chip)) = self.chips.get_mut(&AHT20_ADDRESS) {
            chip.busy_reads_per_measurement = reads;
        }
    }

    /// Flip the CRC byte of every humidity frame.
    pub fn corrupt_humidity_crc(&mut self, corrupt: bool) {
        if let Some(Chip::Humidity(chip)) = self.chips.get_mut(&AHT20_ADDRESS) {
            chip.corrupt_crc = corrupt;
        }
    }

    pub fn register(&self, address: u8, register: u8) -> Option<u8> {
        match self.chips.get(&address) {
            Some(Chip::Registers(file)) => Some(file.registers[register as usize]),
            _ => None,
        }
    }

    pub fn delayed_ns(&self) -> u64 {
        self.delayed_ns
    }

    fn set_registers(&mut self, address: u8, register: u8, bytes: &[u8]) {
        if let Some(Chip::Registers(file)) = self.chips.get_mut(&address) {
            file.set(register, bytes);
        }
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

fn saturate(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn raw20(value: u32) -> [u8; 3] {
    [(value >> 12) as u8, (value >> 4) as u8, ((value & 0x0F) << 4) as u8]
}

impl ErrorType for SimulatedBus {
    type Error = BusError;
}

impl I2c for SimulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(BusError::Timeout);
        }
        let chip = self.chips.get_mut(&address).ok_or(BusError::NoAcknowledge)?;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => chip.write(bytes),
                Operation::Read(buffer) => chip.read(buffer),
            }
        }
        Ok(())
    }
}

impl DelayNs for SimulatedBus {
    fn delay_ns(&mut self, ns: u32) {
        self.delayed_ns += ns as u64;
    }
}

impl SensorBusServices for SimulatedBus {
    fn query_internal_adc(&mut self, port: u8) -> Result<u16, BusError> {
        if !self.connected {
            return Err(BusError::Timeout);
        }
        if port != BATTERY_ADC_PORT {
            return Err(BusError::Bus);
        }
        Ok(self.battery_raw)
    }
}
