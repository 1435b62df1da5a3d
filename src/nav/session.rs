//! Orchestrates live navigation for one actively-guided trip.
//!
//! A [`RouteSession`] owns the active route model, the progress state and
//! the announcement ledger for a single trip. Incoming fixes run through
//! the step matcher, the progress accumulator and the announcement
//! scheduler in that order; stop fulfillments supersede the active route
//! and trigger a fresh request against the injected directions provider.
//!
//! Provider calls are spawned on the Tokio runtime and deliver their
//! results back over an internal channel, tagged with a generation
//! counter. A response is applied only if its generation matches the
//! session's current generation (last-writer-wins); anything else is a
//! stale reply from before a supersession and is silently dropped.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::nav::announce::{AnnouncementScheduler, SpeechSink};
use crate::nav::interpolator::{DisplayedPosition, PositionInterpolator};
use crate::nav::progress;
use crate::nav::step_matcher::StepMatcher;
use crate::provider::{DirectionsProvider, ProviderError, RouteRequest};
use crate::types::location::{LocationFix, Position};
use crate::types::progress::ProgressState;
use crate::types::route::RouteModel;
use crate::types::stop::Stop;

/// Lifecycle of a route session.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SessionState {
    /// No fix seen yet.
    Uninitialized,
    /// A route request is outstanding; the last good route, if any, stays
    /// available for display.
    AwaitingRoute,
    /// Steady state: fixes advance progress along the selected route.
    Navigating,
    /// The active route was invalidated; a fresh request is issued
    /// immediately.
    RouteSuperseded,
    /// All stops fulfilled and the final step reached. No further route
    /// requests are issued.
    Completed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::AwaitingRoute => write!(f, "awaiting route"),
            SessionState::Navigating => write!(f, "navigating"),
            SessionState::RouteSuperseded => write!(f, "route superseded"),
            SessionState::Completed => write!(f, "completed"),
        }
    }
}

/// Errors raised by session operations.
///
/// These indicate programmer errors in the calling layer; every
/// environmental failure (provider, speech, geometry) is handled
/// internally and never surfaces here.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SessionError {
    /// The requested route alternative does not exist.
    InvalidAlternative(usize),
    /// The stop id is not part of this trip.
    UnknownStop(Uuid),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionError::InvalidAlternative(index) => {
                write!(f, "Route alternative {} does not exist", index)
            }
            SessionError::UnknownStop(id) => write!(f, "Stop {} is not part of this trip", id),
        }
    }
}

impl std::error::Error for SessionError {}

/// Tagged results of spawned provider calls.
#[derive(Debug)]
enum ProviderEvent {
    Routes {
        generation: u64,
        result: Result<Vec<RouteModel>, ProviderError>,
    },
    Address {
        generation: u64,
        result: Result<String, ProviderError>,
    },
}

/// Live navigation state for one trip.
///
/// Owns the progress state and announcement ledger exclusively; no other
/// component mutates them. Must be driven from within a Tokio runtime,
/// since provider calls are spawned as tasks.
pub struct RouteSession {
    trip_id: String,
    provider: Arc<dyn DirectionsProvider>,
    matcher: StepMatcher,
    announcer: AnnouncementScheduler,
    interpolator: PositionInterpolator,
    stops: Vec<Stop>,
    state: SessionState,
    alternatives: Vec<RouteModel>,
    selected_alternative: usize,
    progress: ProgressState,
    pending_announcement: Option<String>,
    on_route: bool,
    generation: u64,
    route_request_in_flight: bool,
    geocode_in_flight: bool,
    last_fix: Option<LocationFix>,
    current_address: Option<String>,
    events_tx: mpsc::UnboundedSender<ProviderEvent>,
    events_rx: mpsc::UnboundedReceiver<ProviderEvent>,
}

impl RouteSession {
    /// Create a session for `trip_id` serving `stops`, navigating against
    /// the injected directions provider.
    pub fn new(
        trip_id: impl Into<String>,
        stops: Vec<Stop>,
        provider: Arc<dyn DirectionsProvider>,
        speech: Option<Arc<dyn SpeechSink>>,
        config: &Config,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        RouteSession {
            trip_id: trip_id.into(),
            provider,
            matcher: StepMatcher::from_config(config),
            announcer: AnnouncementScheduler::new(speech),
            interpolator: PositionInterpolator::from_config(config),
            stops,
            state: SessionState::Uninitialized,
            alternatives: Vec::new(),
            selected_alternative: 0,
            progress: ProgressState::default(),
            pending_announcement: None,
            on_route: false,
            generation: 0,
            route_request_in_flight: false,
            geocode_in_flight: false,
            last_fix: None,
            current_address: None,
            events_tx,
            events_rx,
        }
    }

    /// Feed one location fix through the navigation pipeline.
    ///
    /// Fixes are processed strictly in arrival order; a fix whose
    /// timestamp is not newer than the last applied one is a no-op.
    pub fn handle_fix(&mut self, fix: LocationFix) {
        self.drain_responses();

        if let Some(last) = &self.last_fix {
            if fix.timestamp <= last.timestamp {
                nav_debug!(
                    "(handle_fix) [{}] fix at {} not newer than last, ignored.",
                    self.trip_id,
                    fix.timestamp
                );
                return;
            }
        }
        self.last_fix = Some(fix);

        self.interpolator.on_fix(&self.trip_id, &fix);

        match self.state {
            SessionState::Uninitialized => {
                if self.stops.iter().all(|s| s.fulfilled) {
                    nav_info!(
                        "(handle_fix) [{}] no unfulfilled stops, completing.",
                        self.trip_id
                    );
                    self.state = SessionState::Completed;
                    return;
                }
                self.state = SessionState::AwaitingRoute;
                self.request_route(fix.position);
            }
            SessionState::AwaitingRoute => {
                // retry a failed request; keep matching against the stale
                // route meanwhile
                if !self.route_request_in_flight {
                    self.request_route(fix.position);
                }
                self.match_and_update(&fix);
                self.check_completion();
            }
            SessionState::Navigating => {
                self.match_and_update(&fix);
                self.check_completion();
            }
            SessionState::RouteSuperseded => {
                self.state = SessionState::AwaitingRoute;
                self.request_route(fix.position);
            }
            SessionState::Completed => return,
        }

        // after any generation bump above, so the reply is not born stale
        self.request_address(fix.position);
    }

    /// Mark a stop as confirmed by the driver.
    ///
    /// Fulfillment invalidates the active route: unless it was the final
    /// stop, a fresh route excluding fulfilled stops is requested
    /// immediately.
    pub fn notify_stop_fulfilled(&mut self, stop_id: Uuid) -> Result<(), SessionError> {
        self.drain_responses();

        let Some(stop) = self.stops.iter_mut().find(|s| s.id == stop_id) else {
            nav_error!(
                "(notify_stop_fulfilled) [{}] unknown stop {}.",
                self.trip_id,
                stop_id
            );
            return Err(SessionError::UnknownStop(stop_id));
        };
        if stop.fulfilled {
            nav_debug!(
                "(notify_stop_fulfilled) [{}] stop {} already fulfilled, no-op.",
                self.trip_id,
                stop_id
            );
            return Ok(());
        }
        let kind = stop.kind;
        stop.fulfill();
        nav_info!(
            "(notify_stop_fulfilled) [{}] {} stop {} fulfilled.",
            self.trip_id,
            kind,
            stop_id
        );

        if self.state == SessionState::Completed {
            return Ok(());
        }

        if self.stops.iter().all(|s| s.fulfilled) {
            // final stop: no further route requests, completion happens
            // once its step is matched
            self.check_completion();
            return Ok(());
        }

        self.supersede();
        Ok(())
    }

    /// Switch to a different route alternative.
    ///
    /// Clears the announcement ledger, resets progress against the newly
    /// selected model and supersedes the route selection.
    pub fn select_alternative(&mut self, index: usize) -> Result<(), SessionError> {
        self.drain_responses();

        if index >= self.alternatives.len() {
            nav_error!(
                "(select_alternative) [{}] invalid alternative {} of {}.",
                self.trip_id,
                index,
                self.alternatives.len()
            );
            return Err(SessionError::InvalidAlternative(index));
        }
        if index == self.selected_alternative {
            return Ok(());
        }

        self.selected_alternative = index;
        self.announcer.clear();
        self.pending_announcement = None;
        self.progress = progress::update(&self.alternatives[index], 0);
        nav_info!(
            "(select_alternative) [{}] switched to alternative {} ({}).",
            self.trip_id,
            index,
            self.alternatives[index].summary
        );

        if self.state == SessionState::Navigating {
            self.supersede();
        }
        Ok(())
    }

    /// Apply provider responses that have arrived since the last call.
    ///
    /// Invoked automatically by [`handle_fix`](Self::handle_fix) and the
    /// other mutating operations; exposed for event loops that want to
    /// refresh between fixes.
    pub fn apply_pending(&mut self) {
        self.drain_responses();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Trip identifier this session navigates for.
    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    /// Snapshot of the current progress.
    pub fn current_progress(&self) -> ProgressState {
        self.progress
    }

    /// The announcement produced by the latest step change, consumed once.
    pub fn pending_announcement(&mut self) -> Option<String> {
        self.pending_announcement.take()
    }

    /// `false` while the route has no usable geometry; the UI shows a
    /// generic proceed-to-route message instead of step guidance.
    pub fn on_route(&self) -> bool {
        self.on_route
    }

    /// The currently selected route model, if any has arrived.
    pub fn active_route(&self) -> Option<&RouteModel> {
        self.alternatives.get(self.selected_alternative)
    }

    /// All route alternatives of the current generation.
    pub fn alternatives(&self) -> &[RouteModel] {
        &self.alternatives
    }

    /// Index of the selected alternative.
    pub fn selected_alternative(&self) -> usize {
        self.selected_alternative
    }

    /// Humanized address of the last accepted fix, when resolved.
    pub fn current_address(&self) -> Option<&str> {
        self.current_address.as_deref()
    }

    /// Smoothed renderable position of the vehicle.
    pub fn displayed_position(&self) -> Option<DisplayedPosition> {
        self.interpolator.sample(&self.trip_id)
    }

    /// The trip's stops with their fulfillment state.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Pump a location subscription into the session until the stream
    /// ends or `cancel` fires. Cancelling is the unsubscribe operation.
    pub async fn drive(
        &mut self,
        mut fixes: BoxStream<'_, LocationFix>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    nav_info!("(drive) [{}] location subscription cancelled.", self.trip_id);
                    break;
                }
                next = fixes.next() => match next {
                    Some(fix) => self.handle_fix(fix),
                    None => {
                        nav_info!("(drive) [{}] location stream ended.", self.trip_id);
                        break;
                    }
                }
            }
        }
    }

    /// Invalidate the active route and request a replacement.
    ///
    /// The generation bump makes any in-flight reply stale immediately,
    /// even when the new request can only be issued on the next fix.
    fn supersede(&mut self) {
        self.state = SessionState::RouteSuperseded;
        self.generation += 1;
        self.route_request_in_flight = false;

        match self.last_fix {
            Some(fix) => {
                self.state = SessionState::AwaitingRoute;
                self.request_route(fix.position);
            }
            None => {
                nav_warn!(
                    "(supersede) [{}] no fix seen yet; requesting on next fix.",
                    self.trip_id
                );
            }
        }
    }

    /// Spawn a generation-tagged route request for the unfulfilled stops.
    fn request_route(&mut self, origin: Position) {
        let pending: Vec<Position> = self
            .stops
            .iter()
            .filter(|s| !s.fulfilled)
            .map(|s| s.position)
            .collect();
        let Some((&destination, waypoints)) = pending.split_last() else {
            nav_warn!(
                "(request_route) [{}] no unfulfilled stops, nothing to request.",
                self.trip_id
            );
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        self.route_request_in_flight = true;

        let request = RouteRequest {
            origin,
            destination,
            waypoints: waypoints.to_vec(),
            optimize_waypoints: true,
            provide_alternatives: true,
        };
        nav_info!(
            "(request_route) [{}] generation {} with {} waypoint(s).",
            self.trip_id,
            generation,
            request.waypoints.len()
        );

        let provider = Arc::clone(&self.provider);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = provider.compute_route(request).await;
            // a closed channel means the session is gone; nothing to do
            let _ = events_tx.send(ProviderEvent::Routes { generation, result });
        });
    }

    /// Spawn a reverse-geocode lookup for the latest fix, at most one in
    /// flight.
    fn request_address(&mut self, position: Position) {
        if self.geocode_in_flight {
            return;
        }
        self.geocode_in_flight = true;
        let generation = self.generation;

        let provider = Arc::clone(&self.provider);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = provider.reverse_geocode(position).await;
            let _ = events_tx.send(ProviderEvent::Address { generation, result });
        });
    }

    /// Apply every provider response waiting in the channel.
    fn drain_responses(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                ProviderEvent::Routes { generation, result } => {
                    if generation != self.generation {
                        nav_debug!(
                            "(drain_responses) [{}] stale route response (generation {} != {}), dropped.",
                            self.trip_id,
                            generation,
                            self.generation
                        );
                        continue;
                    }
                    self.route_request_in_flight = false;
                    match result {
                        Ok(routes) => self.apply_routes(routes),
                        Err(e) => {
                            nav_warn!(
                                "(drain_responses) [{}] route request failed: {}. Retrying on next fix.",
                                self.trip_id,
                                e
                            );
                        }
                    }
                }
                ProviderEvent::Address { generation, result } => {
                    self.geocode_in_flight = false;
                    if generation != self.generation {
                        nav_debug!(
                            "(drain_responses) [{}] stale geocode response dropped.",
                            self.trip_id
                        );
                        continue;
                    }
                    match result {
                        Ok(address) => self.current_address = Some(address),
                        Err(e) => {
                            nav_debug!(
                                "(drain_responses) [{}] reverse geocode failed: {}.",
                                self.trip_id,
                                e
                            );
                        }
                    }
                }
            }
        }
    }

    /// Adopt a fresh set of route alternatives.
    fn apply_routes(&mut self, routes: Vec<RouteModel>) {
        if routes.is_empty() {
            nav_warn!(
                "(apply_routes) [{}] provider returned no routes, retrying on next fix.",
                self.trip_id
            );
            return;
        }

        // keep the previously selected alternative where the new set
        // still carries it
        if self.selected_alternative >= routes.len() {
            self.selected_alternative = 0;
        }
        self.alternatives = routes;

        let route = &self.alternatives[self.selected_alternative];
        self.progress = progress::update(route, 0);
        self.on_route = !route.is_empty();
        self.announcer.clear();
        self.pending_announcement = None;
        self.state = SessionState::Navigating;

        nav_info!(
            "(apply_routes) [{}] navigating generation {}: {} alternative(s), selected {}, {:.0} m total.",
            self.trip_id,
            self.generation,
            self.alternatives.len(),
            self.selected_alternative,
            self.active_route().map(|r| r.total_distance_meters()).unwrap_or(0.0)
        );
    }

    /// Run one fix through matcher, accumulator and scheduler.
    fn match_and_update(&mut self, fix: &LocationFix) {
        if self.alternatives.is_empty() {
            return;
        }
        let selected = self.selected_alternative;
        let outcome = self.matcher.match_step(
            &self.alternatives[selected],
            fix,
            self.progress.current_step_index,
        );
        self.on_route = outcome.on_route;
        if !outcome.on_route {
            // "no-route" guidance state; progress keeps its last value
            return;
        }

        self.progress = progress::update(&self.alternatives[selected], outcome.step_index);

        if let Some(text) = self
            .announcer
            .on_step_changed(&self.alternatives[selected], outcome.step_index)
        {
            nav_info!(
                "(match_and_update) [{}] step {}: {}",
                self.trip_id,
                outcome.step_index,
                text
            );
            self.pending_announcement = Some(text);
        }
    }

    /// Complete once every stop is fulfilled and the final step reached.
    fn check_completion(&mut self) {
        if self.stops.iter().any(|s| !s.fulfilled) {
            return;
        }
        let Some(route) = self.active_route() else {
            return;
        };
        if !self.on_route {
            return;
        }
        if route.last_step_index() == Some(self.progress.current_step_index) {
            nav_info!(
                "(check_completion) [{}] all stops fulfilled and final step reached, completing.",
                self.trip_id
            );
            self.state = SessionState::Completed;
        }
    }
}
