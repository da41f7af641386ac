// Every line goes to the RTT channel for a probe on the flight board and to
// the `log` facade for hosted runs.

macro_rules! info {
    ($($arg:tt)*) => {{
        ::rtt_target::rprintln!($($arg)*);
        ::log::info!($($arg)*);
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        ::rtt_target::rprintln!($($arg)*);
        ::log::warn!($($arg)*);
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        ::rtt_target::rprintln!($($arg)*);
        ::log::error!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        ::rtt_target::rprintln!($($arg)*);
        ::log::debug!($($arg)*);
    }};
}
