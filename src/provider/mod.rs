//! External directions, geocoding and location collaborators.
//!
//! The engine never talks to a concrete mapping vendor. The surrounding
//! application injects implementations of these traits; sessions stay
//! deterministic under test by injecting the mock implementations
//! instead.

#[macro_use]
pub mod macros;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::types::location::{LocationFix, Position};
use crate::types::route::RouteModel;

cfg_if::cfg_if! {
    if #[cfg(any(test, feature = "mock"))] {
        pub mod mock;
    }
}

/// Failures reported by the directions/geocoding provider.
///
/// All of these are transient from the engine's point of view: the
/// last-known state is retained and the operation is retried on the next
/// trigger.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ProviderError {
    /// The provider could not be reached or timed out.
    ClientError,
    /// No route exists between the requested points.
    NoRouteFound,
    /// No address is known for the requested point.
    AddressNotFound,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProviderError::ClientError => write!(f, "Directions client error"),
            ProviderError::NoRouteFound => write!(f, "No route found"),
            ProviderError::AddressNotFound => write!(f, "No address found for location"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// A route computation request.
///
/// Waypoints are stopovers the vehicle must visit between origin and
/// destination; the provider may reorder them when `optimize_waypoints`
/// is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Where the vehicle currently is.
    pub origin: Position,

    /// The final stop of the trip.
    pub destination: Position,

    /// Intermediate stops, in preferred visiting order.
    pub waypoints: Vec<Position>,

    /// Allow the provider to reorder the waypoints.
    pub optimize_waypoints: bool,

    /// Ask for more than one candidate route.
    pub provide_alternatives: bool,
}

/// Computes routes and humanizes coordinates.
///
/// Implementations wrap a mapping vendor's directions and geocoding
/// APIs. Injected into each session as an `Arc<dyn DirectionsProvider>`
/// rather than reached through a module-global singleton.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Compute one or more candidate routes for `request`.
    ///
    /// The returned routes are ordered by provider preference; the first
    /// one is the default selection.
    async fn compute_route(&self, request: RouteRequest) -> Result<Vec<RouteModel>, ProviderError>;

    /// Resolve a human readable address for `position`.
    async fn reverse_geocode(&self, position: Position) -> Result<String, ProviderError>;
}

/// A device location stream.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Single-shot current position, used for initial map centering.
    async fn current_position(&self) -> Result<LocationFix, ProviderError>;

    /// Subscribe to a stream of fixes.
    ///
    /// Dropping the stream, or cancelling the pump that consumes it, is
    /// the unsubscribe operation.
    fn subscribe(&self) -> BoxStream<'static, LocationFix>;
}

/// Turn the single-shot position of a [`LocationSource`] into a periodic
/// fix stream at the configured poll cadence.
///
/// This is the dispatcher-side fallback for devices without a push
/// stream. Failed polls are skipped, not surfaced; cancelling the token
/// ends the stream.
pub fn poll_positions(
    source: Arc<dyn LocationSource>,
    config: &Config,
    cancel: CancellationToken,
) -> BoxStream<'static, LocationFix> {
    let interval = std::time::Duration::from_secs(config.fix_poll_interval_seconds);
    futures::stream::unfold((source, cancel), move |(source, cancel)| async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = tokio::time::sleep(interval) => {
                let item = match source.current_position().await {
                    Ok(fix) => Some(fix),
                    Err(e) => {
                        provider_debug!("(poll_positions) poll failed: {}. Skipping.", e);
                        None
                    }
                };
                Some((item, (source, cancel)))
            }
        }
    })
    .filter_map(|item| async move { item })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockLocationSource;
    use crate::test_util::equator_fix;

    #[tokio::test(start_paused = true)]
    async fn test_poll_positions_emits_then_cancels() {
        crate::get_log_handle().await;
        ut_info!("Start.");

        let source = Arc::new(MockLocationSource::new(vec![equator_fix(0.0, 0)]));
        let cancel = CancellationToken::new();
        let mut config = Config::new();
        config.fix_poll_interval_seconds = 1;

        let mut fixes = poll_positions(source, &config, cancel.clone());
        assert_eq!(fixes.next().await, Some(equator_fix(0.0, 0)));
        assert_eq!(fixes.next().await, Some(equator_fix(0.0, 0)));

        cancel.cancel();
        assert_eq!(fixes.next().await, None);

        ut_info!("Success.");
    }
}
