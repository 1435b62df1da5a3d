//! Dispatcher-side aggregation of live vehicle positions.
//!
//! One [`FleetAggregator`] holds the positions of every actively
//! broadcasting trip for the multi-vehicle live view. It runs no
//! per-entity guidance; it only merges, smooths and frames positions.

#[macro_use]
pub mod macros;

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use geo::{Coord, Rect};

use crate::config::Config;
use crate::nav::interpolator::{DisplayedPosition, PositionInterpolator};
use crate::types::location::LocationFix;

/// Live view of one tracked vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    /// Identifier of the broadcasting trip.
    pub entity_id: String,

    /// The latest accepted fix.
    pub last_fix: LocationFix,

    /// Smoothed renderable position.
    pub displayed_position: DisplayedPosition,

    /// When the latest fix was received.
    pub last_update: DateTime<Utc>,

    /// `true` once no fix arrived within the staleness timeout. Stale
    /// entities stay listed until their trip completes and evicts them.
    pub stale: bool,
}

#[derive(Debug, Clone, Copy)]
struct EntityRecord {
    last_fix: LocationFix,
    last_update: DateTime<Utc>,
}

/// Merges concurrently-updating vehicle positions into one operational
/// view.
///
/// Single-writer type: `upsert`/`evict` are called from the dispatcher
/// refresh loop only. Wrap the aggregator in an `Arc<Mutex<…>>` when it
/// must be reached from more than one execution context.
pub struct FleetAggregator {
    entities: HashMap<String, EntityRecord>,
    interpolator: PositionInterpolator,
    stale_after: Duration,
}

impl FleetAggregator {
    /// Create an aggregator with an explicit staleness timeout and
    /// interpolation window.
    pub fn new(stale_after: Duration, interpolation_window: std::time::Duration) -> Self {
        FleetAggregator {
            entities: HashMap::new(),
            interpolator: PositionInterpolator::new(interpolation_window),
            stale_after,
        }
    }

    /// Create an aggregator from engine configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::seconds(config.fleet_stale_after_seconds),
            std::time::Duration::from_millis(config.interpolation_window_ms),
        )
    }

    /// Merge one fix for `entity_id`, creating the entity when unseen.
    ///
    /// Idempotent: a fix not newer than the entity's latest is ignored.
    pub fn upsert(&mut self, entity_id: &str, fix: LocationFix) {
        self.upsert_at(entity_id, fix, Utc::now(), Instant::now());
    }

    /// [`upsert`](Self::upsert) with explicit clocks, for deterministic
    /// tests.
    pub fn upsert_at(
        &mut self,
        entity_id: &str,
        fix: LocationFix,
        now: DateTime<Utc>,
        now_instant: Instant,
    ) {
        if let Some(existing) = self.entities.get(entity_id) {
            if fix.timestamp <= existing.last_fix.timestamp {
                fleet_debug!(
                    "(upsert) [{}] fix at {} not newer, ignored.",
                    entity_id,
                    fix.timestamp
                );
                return;
            }
        }

        self.interpolator.on_fix_at(entity_id, &fix, now_instant);
        self.entities.insert(
            entity_id.to_string(),
            EntityRecord {
                last_fix: fix,
                last_update: now,
            },
        );
        fleet_debug!(
            "(upsert) [{}] updated, {} entities tracked.",
            entity_id,
            self.entities.len()
        );
    }

    /// Every tracked entity with its smoothed position and staleness
    /// flag, ordered by entity id.
    pub fn snapshot(&self) -> Vec<TrackedEntity> {
        self.snapshot_at(Utc::now(), Instant::now())
    }

    /// [`snapshot`](Self::snapshot) with explicit clocks, for
    /// deterministic tests.
    pub fn snapshot_at(&self, now: DateTime<Utc>, now_instant: Instant) -> Vec<TrackedEntity> {
        let mut entities: Vec<TrackedEntity> = self
            .entities
            .iter()
            .map(|(entity_id, record)| TrackedEntity {
                entity_id: entity_id.clone(),
                last_fix: record.last_fix,
                displayed_position: self
                    .interpolator
                    .sample_at(entity_id, now_instant)
                    .unwrap_or(DisplayedPosition {
                        position: record.last_fix.position,
                        rotation_degrees: record.last_fix.heading_degrees.unwrap_or(0.0),
                    }),
                last_update: record.last_update,
                stale: now - record.last_update > self.stale_after,
            })
            .collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    /// Drop an entity whose trip completed.
    pub fn evict(&mut self, entity_id: &str) {
        if self.entities.remove(entity_id).is_none() {
            fleet_warn!("(evict) [{}] unknown entity.", entity_id);
            return;
        }
        self.interpolator.remove(entity_id);
        fleet_info!(
            "(evict) [{}] evicted, {} entities tracked.",
            entity_id,
            self.entities.len()
        );
    }

    /// Bounding region covering every fresh entity, for map framing.
    ///
    /// Stale entities are excluded; `None` when nothing fresh is
    /// tracked.
    pub fn bounding_region(&self) -> Option<Rect<f64>> {
        self.bounding_region_at(Utc::now())
    }

    /// [`bounding_region`](Self::bounding_region) with an explicit clock,
    /// for deterministic tests.
    pub fn bounding_region_at(&self, now: DateTime<Utc>) -> Option<Rect<f64>> {
        let mut fresh = self
            .entities
            .values()
            .filter(|record| now - record.last_update <= self.stale_after)
            .map(|record| record.last_fix.position);

        let first = fresh.next()?;
        let mut min_latitude = first.latitude();
        let mut max_latitude = first.latitude();
        let mut min_longitude = first.longitude();
        let mut max_longitude = first.longitude();
        for position in fresh {
            min_latitude = min_latitude.min(position.latitude());
            max_latitude = max_latitude.max(position.latitude());
            min_longitude = min_longitude.min(position.longitude());
            max_longitude = max_longitude.max(position.longitude());
        }

        Some(Rect::new(
            Coord {
                x: min_longitude,
                y: min_latitude,
            },
            Coord {
                x: max_longitude,
                y: max_latitude,
            },
        ))
    }

    /// Number of tracked entities, stale ones included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity is tracked.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
