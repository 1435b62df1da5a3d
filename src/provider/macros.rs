//! log macro's for provider adapter logging

/// Writes a debug! message to the app::provider logger
#[macro_export]
macro_rules! provider_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::provider", $($arg)+)
    };
}

/// Writes an info! message to the app::provider logger
#[macro_export]
macro_rules! provider_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::provider", $($arg)+)
    };
}

/// Writes an warn! message to the app::provider logger
#[macro_export]
macro_rules! provider_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::provider", $($arg)+)
    };
}

/// Writes an error! message to the app::provider logger
#[macro_export]
macro_rules! provider_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::provider", $($arg)+)
    };
}
