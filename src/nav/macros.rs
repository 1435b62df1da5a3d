//! log macro's for navigation engine logging

/// Writes a debug! message to the app::nav logger
#[macro_export]
macro_rules! nav_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::nav", $($arg)+)
    };
}

/// Writes an info! message to the app::nav logger
#[macro_export]
macro_rules! nav_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::nav", $($arg)+)
    };
}

/// Writes an warn! message to the app::nav logger
#[macro_export]
macro_rules! nav_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::nav", $($arg)+)
    };
}

/// Writes an error! message to the app::nav logger
#[macro_export]
macro_rules! nav_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::nav", $($arg)+)
    };
}
