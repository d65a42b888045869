//! Memoized evaluation keyed on the campaign snapshot.
//!
//! Dashboards re-render far more often than the portfolio changes. The
//! cache keeps the last result together with a fingerprint of every field
//! the detectors read, and recomputes only when the snapshot changes.
//! The evaluation clock is not part of the key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::campaign::Campaign;
use crate::engine::AlertEngine;
use crate::types::CategorizedAlert;

/// Hash of everything the detectors read from a snapshot.
///
/// Only comparable within this process: the underlying hasher is not
/// guaranteed to produce the same digest across builds. Order matters, as
/// it decides the order of affected campaign ids.
#[must_use]
pub fn snapshot_fingerprint(campaigns: &[Campaign]) -> u64 {
    let mut hasher = DefaultHasher::new();
    campaigns.len().hash(&mut hasher);

    for c in campaigns {
        c.id.hash(&mut hasher);
        c.name.hash(&mut hasher);
        c.channel.hash(&mut hasher);
        c.funnel_stage.as_str().hash(&mut hasher);
        c.lifecycle_stage.as_str().hash(&mut hasher);
        c.status.as_str().hash(&mut hasher);
        c.budget.to_bits().hash(&mut hasher);
        c.spent.to_bits().hash(&mut hasher);
        c.roas.to_bits().hash(&mut hasher);
        c.readiness_percent.hash(&mut hasher);
        date_key(c.created_date).hash(&mut hasher);
        date_key(c.target_launch_date).hash(&mut hasher);
    }

    hasher.finish()
}

fn date_key(date: Option<DateTime<Utc>>) -> Option<(i64, u32)> {
    date.map(|d| (d.timestamp(), d.timestamp_subsec_nanos()))
}

#[derive(Debug)]
struct CachedAlerts {
    fingerprint: u64,
    campaign_ids: Vec<String>,
    alerts: Vec<CategorizedAlert>,
}

impl CachedAlerts {
    /// A digest match alone could be a collision; the id list must agree too.
    fn matches(&self, fingerprint: u64, campaigns: &[Campaign]) -> bool {
        self.fingerprint == fingerprint
            && self.campaign_ids.len() == campaigns.len()
            && self.campaign_ids.iter().zip(campaigns).all(|(id, c)| *id == c.id)
    }
}

/// An [`AlertEngine`] that remembers its last result.
///
/// Cloning shares the cached entry.
#[derive(Debug, Clone)]
pub struct AlertCache {
    engine: Arc<AlertEngine>,
    entry: Arc<RwLock<Option<CachedAlerts>>>,
}

impl Default for AlertCache {
    fn default() -> Self {
        Self::new(AlertEngine::new())
    }
}

impl AlertCache {
    /// Wraps an engine with an empty cache.
    #[must_use]
    pub fn new(engine: AlertEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            entry: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Returns cached alerts for this snapshot, evaluating against the wall
    /// clock on a miss.
    #[must_use]
    pub fn get_or_compute(&self, campaigns: &[Campaign]) -> Vec<CategorizedAlert> {
        self.get_or_compute_at(campaigns, Utc::now())
    }

    /// Returns cached alerts for this snapshot, evaluating as of `now` on a
    /// miss.
    #[must_use]
    pub fn get_or_compute_at(
        &self,
        campaigns: &[Campaign],
        now: DateTime<Utc>,
    ) -> Vec<CategorizedAlert> {
        let fingerprint = snapshot_fingerprint(campaigns);

        if let Some(cached) = self.entry.read().as_ref() {
            if cached.matches(fingerprint, campaigns) {
                debug!(fingerprint, "alert cache hit");
                return cached.alerts.clone();
            }
        }

        let alerts = self.engine.evaluate_at(campaigns, now);
        debug!(fingerprint, alerts = alerts.len(), "alert cache refreshed");

        *self.entry.write() = Some(CachedAlerts {
            fingerprint,
            campaign_ids: campaigns.iter().map(|c| c.id.clone()).collect(),
            alerts: alerts.clone(),
        });

        alerts
    }

    /// Fingerprint of the cached snapshot, if any.
    #[must_use]
    pub fn cached_fingerprint(&self) -> Option<u64> {
        self.entry.read().as_ref().map(|c| c.fingerprint)
    }

    /// Drops the cached result.
    pub fn invalidate(&self) {
        if self.entry.write().take().is_some() {
            debug!("alert cache invalidated");
        }
    }
}
