//! Alert detectors.
//!
//! Each detector scans the whole campaign snapshot and emits zero or more
//! aggregate alerts for its [`AlertCategory`]. Detectors hold no state and
//! never fail: every division and date difference is guarded so that bad
//! or missing values suppress an alert instead of raising one.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::campaign::Campaign;
use crate::types::{AlertCategory, AlertMetric, AlertSeverity, CategorizedAlert};

pub mod attribution_leak;
pub mod audience_overlap;
pub mod budget_pacing;
pub mod lifecycle_stall;
pub mod roas_misalignment;

pub use attribution_leak::AttributionLeakDetector;
pub use audience_overlap::AudienceOverlapDetector;
pub use budget_pacing::BudgetPacingDetector;
pub use lifecycle_stall::LifecycleStallDetector;
pub use roas_misalignment::RoasMisalignmentDetector;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Input shared by every detector in one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    /// The full campaign snapshot.
    pub campaigns: &'a [Campaign],
    /// Evaluation instant, also stamped on every alert.
    pub now: DateTime<Utc>,
}

impl<'a> DetectionContext<'a> {
    /// Creates a new context.
    #[must_use]
    pub const fn new(campaigns: &'a [Campaign], now: DateTime<Utc>) -> Self {
        Self { campaigns, now }
    }

    /// Fractional days from `now` until `date` (negative if in the past).
    #[must_use]
    pub fn days_until(&self, date: DateTime<Utc>) -> f64 {
        date.signed_duration_since(self.now).num_seconds() as f64 / SECONDS_PER_DAY
    }

    /// Fractional days elapsed since `date`.
    #[must_use]
    pub fn days_since(&self, date: DateTime<Utc>) -> f64 {
        -self.days_until(date)
    }
}

/// A rule-based analyzer for one alert category.
pub trait Detector: Send + Sync + fmt::Debug {
    /// The category of every alert this detector emits.
    fn category(&self) -> AlertCategory;

    /// Scans the snapshot and returns this detector's alerts.
    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<CategorizedAlert>;
}

/// Returns one instance of every detector, in category order.
#[must_use]
pub fn all_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(AudienceOverlapDetector),
        Box::new(LifecycleStallDetector),
        Box::new(BudgetPacingDetector),
        Box::new(RoasMisalignmentDetector),
        Box::new(AttributionLeakDetector),
    ]
}

/// Accumulates the text of an alert before it is stamped.
#[derive(Debug)]
pub(crate) struct AlertDraft {
    id: String,
    category: AlertCategory,
    severity: AlertSeverity,
    title: String,
    description: String,
    impact: String,
    recommendation: String,
    affected: Vec<String>,
    metrics: Vec<AlertMetric>,
}

impl AlertDraft {
    pub(crate) fn new(
        id: impl Into<String>,
        category: AlertCategory,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            title: String::new(),
            description: String::new(),
            impact: String::new(),
            recommendation: String::new(),
            affected: Vec::new(),
            metrics: Vec::new(),
        }
    }

    pub(crate) fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub(crate) fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    pub(crate) fn recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    pub(crate) fn affected<'c>(
        mut self,
        campaigns: impl IntoIterator<Item = &'c Campaign>,
    ) -> Self {
        for campaign in campaigns {
            if !self.affected.contains(&campaign.id) {
                self.affected.push(campaign.id.clone());
            }
        }
        self
    }

    pub(crate) fn metric(mut self, label: &str, value: impl Into<String>) -> Self {
        self.metrics.push(AlertMetric::new(label, value));
        self
    }

    /// Stamps the draft. Returns `None` when no campaign is affected.
    pub(crate) fn finish(self, now: DateTime<Utc>) -> Option<CategorizedAlert> {
        if self.affected.is_empty() {
            return None;
        }

        Some(CategorizedAlert {
            id: self.id,
            category: self.category,
            title: self.title,
            description: self.description,
            impact: self.impact,
            recommendation: self.recommendation,
            severity: self.severity,
            affected_campaign_ids: self.affected,
            metrics: self.metrics,
            timestamp: now,
        })
    }
}

/// Sum of `spent` over the campaigns.
pub(crate) fn total_spent<'c>(campaigns: impl IntoIterator<Item = &'c Campaign>) -> f64 {
    campaigns.into_iter().map(|c| c.spent).sum()
}

/// Arithmetic mean, zero for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Formats a money amount as whole dollars with thousands separators.
pub(crate) fn format_currency(amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() } else { 0.0 };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Formats a fraction (0.42) as a whole percentage ("42%").
pub(crate) fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Formats a ROAS multiplier with one decimal ("2.4x").
pub(crate) fn format_roas(roas: f64) -> String {
    format!("{roas:.1}x")
}
