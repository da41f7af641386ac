use cubesat_board::{IndicatorServices, SystemServices};

pub const DEFAULT_DUTY: u16 = 512;
pub const PULSE_MS: u32 = 100;
pub const FAULT_PULSES: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    pub freq_hz: u32,
    pub duty: u16,
}

impl Tone {
    pub const STARTUP: Tone = Tone::new(5000);
    pub const ACQUISITION: Tone = Tone::new(4000);
    pub const CYCLE_END: Tone = Tone::new(2000);
    pub const FAULT: Tone = Tone::new(4000);

    pub const fn new(freq_hz: u32) -> Self {
        Tone {
            freq_hz,
            duty: DEFAULT_DUTY,
        }
    }
}

// Silences the indicator when dropped, including during unwinding.
struct ToneGuard<'a, I: IndicatorServices> {
    indicator: &'a mut I,
}

impl<'a, I: IndicatorServices> ToneGuard<'a, I> {
    fn start(indicator: &'a mut I, tone: Tone) -> Self {
        indicator.tone_on(tone.freq_hz, tone.duty);
        ToneGuard { indicator }
    }
}

impl<I: IndicatorServices> Drop for ToneGuard<'_, I> {
    fn drop(&mut self) {
        self.indicator.tone_off();
    }
}

/// Audible feedback for loop transitions. Cues never affect the loop itself;
/// a disabled signal only skips the indicator.
pub struct AlertSignal<I: IndicatorServices> {
    indicator: I,
    enabled: bool,
}

impl<I: IndicatorServices> AlertSignal<I> {
    pub fn new(indicator: I, enabled: bool) -> Self {
        AlertSignal { indicator, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn indicator(&mut self) -> &mut I {
        &mut self.indicator
    }

    /// Sounds `tone` for `duration_ms`. The indicator is off again on return.
    pub fn pulse(&mut self, duration_ms: u32, tone: Tone, system: &mut impl SystemServices) {
        if !self.enabled {
            return;
        }
        let _guard = ToneGuard::start(&mut self.indicator, tone);
        system.delay_ms(duration_ms);
    }

    pub fn startup(&mut self, system: &mut impl SystemServices) {
        self.pulse(PULSE_MS, Tone::STARTUP, system);
    }

    pub fn acquisition(&mut self, system: &mut impl SystemServices) {
        self.pulse(PULSE_MS, Tone::ACQUISITION, system);
    }

    pub fn cycle_end(&mut self, system: &mut impl SystemServices) {
        self.pulse(PULSE_MS, Tone::CYCLE_END, system);
    }

    pub fn fault_pattern(&mut self, system: &mut impl SystemServices) {
        if !self.enabled {
            return;
        }
        for _ in 0..FAULT_PULSES {
            self.pulse(PULSE_MS, Tone::FAULT, system);
            system.delay_ms(PULSE_MS);
        }
    }
}
