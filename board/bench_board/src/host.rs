use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use cubesat_board::{IndicatorServices, SystemServices};

/// Exit status of a hard reset, so a supervisor knows to start the node again.
pub const RESET_EXIT_CODE: i32 = 75;

/// Logs tone changes where the flight board drives a buzzer.
#[derive(Default)]
pub struct LogIndicator {
    tone: Option<(u32, u16)>,
    pulses: u32,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.tone.is_some()
    }

    pub fn pulses(&self) -> u32 {
        self.pulses
    }
}

impl IndicatorServices for LogIndicator {
    fn tone_on(&mut self, freq_hz: u32, duty: u16) {
        log::trace!("beep {} Hz duty {}", freq_hz, duty);
        self.tone = Some((freq_hz, duty));
        self.pulses += 1;
    }

    fn tone_off(&mut self) {
        self.tone = None;
    }
}

pub struct HostSystem {
    boot: Instant,
}

impl HostSystem {
    pub fn new() -> Self {
        HostSystem {
            boot: Instant::now(),
        }
    }
}

impl Default for HostSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemServices for HostSystem {
    fn get_millis(&mut self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }

    fn epoch_timestamp(&mut self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(_) => 0,
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }

    fn reset(&mut self) -> ! {
        log::warn!("resetting");
        std::process::exit(RESET_EXIT_CODE)
    }
}
