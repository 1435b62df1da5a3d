//! # Config
//!
//! Define and implement config options for the navigation engine

use anyhow::Result;
use config::{ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;

/// struct holding configuration options
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// maximum distance (meters) between a fix and a step's polyline for the
    /// fix to count as on-edge
    pub on_edge_tolerance_meters: f64,

    /// a matched step may only move backward when it is more than this many
    /// steps behind the previous index and the fix is on that step's path
    pub backward_jump_min_steps: usize,

    /// wall-clock window (milliseconds) over which a displayed position
    /// glides from its previous position to a new fix
    pub interpolation_window_ms: u64,

    /// sampling interval (milliseconds) of the animation driver
    pub animation_tick_ms: u64,

    /// seconds without an update before a tracked entity is flagged stale
    pub fleet_stale_after_seconds: i64,

    /// cadence (seconds) at which drivers are asked for a location update
    pub fix_poll_interval_seconds: u64,

    /// path to log configuration YAML file
    pub log_config: String,
}

impl Default for Config {
    fn default() -> Self {
        log::warn!("(default) Creating Config object with default values.");
        Self::new()
    }
}

impl Config {
    /// Default values for Config
    pub fn new() -> Self {
        Config {
            on_edge_tolerance_meters: 50.0,
            backward_jump_min_steps: 1,
            interpolation_window_ms: 1000,
            animation_tick_ms: 100,
            fleet_stale_after_seconds: 30,
            fix_poll_interval_seconds: 4,
            log_config: String::from("log4rs.yaml"),
        }
    }

    /// Create a new `Config` object using environment variables
    pub fn try_from_env() -> Result<Self, ConfigError> {
        // read .env file if present
        dotenv().ok();
        let default_config = Config::default();

        config::Config::builder()
            .set_default(
                "on_edge_tolerance_meters",
                default_config.on_edge_tolerance_meters,
            )?
            .set_default(
                "backward_jump_min_steps",
                default_config.backward_jump_min_steps as u64,
            )?
            .set_default(
                "interpolation_window_ms",
                default_config.interpolation_window_ms,
            )?
            .set_default("animation_tick_ms", default_config.animation_tick_ms)?
            .set_default(
                "fleet_stale_after_seconds",
                default_config.fleet_stale_after_seconds,
            )?
            .set_default(
                "fix_poll_interval_seconds",
                default_config.fix_poll_interval_seconds,
            )?
            .set_default("log_config", default_config.log_config)?
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_from_default() {
        crate::get_log_handle().await;
        ut_info!("Start.");

        let config = Config::default();
        assert_eq!(config.on_edge_tolerance_meters, 50.0);
        assert_eq!(config.backward_jump_min_steps, 1);
        assert_eq!(config.interpolation_window_ms, 1000);
        assert_eq!(config.animation_tick_ms, 100);
        assert_eq!(config.fleet_stale_after_seconds, 30);
        assert_eq!(config.fix_poll_interval_seconds, 4);
        assert_eq!(config.log_config, String::from("log4rs.yaml"));

        ut_info!("Success.");
    }

    #[tokio::test]
    async fn test_config_from_env() {
        crate::get_log_handle().await;
        ut_info!("Start.");

        std::env::set_var("ON_EDGE_TOLERANCE_METERS", "25.0");
        std::env::set_var("FLEET_STALE_AFTER_SECONDS", "60");

        let config = Config::try_from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.on_edge_tolerance_meters, 25.0);
        assert_eq!(config.fleet_stale_after_seconds, 60);
        assert_eq!(config.interpolation_window_ms, 1000);

        std::env::remove_var("ON_EDGE_TOLERANCE_METERS");
        std::env::remove_var("FLEET_STALE_AFTER_SECONDS");

        ut_info!("Success.");
    }
}
