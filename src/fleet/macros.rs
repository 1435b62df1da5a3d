//! log macro's for fleet view logging

/// Writes a debug! message to the app::fleet logger
#[macro_export]
macro_rules! fleet_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::fleet", $($arg)+)
    };
}

/// Writes an info! message to the app::fleet logger
#[macro_export]
macro_rules! fleet_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::fleet", $($arg)+)
    };
}

/// Writes an warn! message to the app::fleet logger
#[macro_export]
macro_rules! fleet_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::fleet", $($arg)+)
    };
}

/// Writes an error! message to the app::fleet logger
#[macro_export]
macro_rules! fleet_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::fleet", $($arg)+)
    };
}
