//! Roll-ups over an alert list for badges, panel headers and per-campaign
//! views. None of these reorder the input.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Counts derived from one engine result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    /// Total number of alerts.
    pub total: usize,
    /// Number of critical alerts.
    pub critical: usize,
    /// Number of warning alerts.
    pub warning: usize,
    /// Number of info alerts.
    pub info: usize,
    /// Alerts per category. Every category is present, possibly with zero.
    pub by_category: BTreeMap<AlertCategory, usize>,
    /// Distinct campaigns named by at least one alert.
    pub affected_campaigns: usize,
}

impl AlertSummary {
    /// Summarizes an alert list.
    #[must_use]
    pub fn from_alerts(alerts: &[CategorizedAlert]) -> Self {
        let mut summary = Self {
            total: alerts.len(),
            by_category: AlertCategory::ALL.iter().map(|c| (*c, 0)).collect(),
            ..Self::default()
        };
        let mut campaigns: HashSet<&str> = HashSet::new();

        for alert in alerts {
            match alert.severity {
                AlertSeverity::Critical => summary.critical += 1,
                AlertSeverity::Warning => summary.warning += 1,
                AlertSeverity::Info => summary.info += 1,
            }
            *summary.by_category.entry(alert.category).or_default() += 1;
            campaigns.extend(alert.affected_campaign_ids.iter().map(String::as_str));
        }

        summary.affected_campaigns = campaigns.len();
        summary
    }

    /// Returns the count for one severity.
    #[must_use]
    pub const fn count(&self, severity: AlertSeverity) -> usize {
        match severity {
            AlertSeverity::Critical => self.critical,
            AlertSeverity::Warning => self.warning,
            AlertSeverity::Info => self.info,
        }
    }

    /// Most urgent severity present, if any.
    #[must_use]
    pub fn highest_severity(&self) -> Option<AlertSeverity> {
        AlertSeverity::ALL.into_iter().find(|s| self.count(*s) > 0)
    }
}

/// Alerts naming `campaign_id`, in their original order.
#[must_use]
pub fn alerts_for_campaign<'a>(
    alerts: &'a [CategorizedAlert],
    campaign_id: &str,
) -> Vec<&'a CategorizedAlert> {
    alerts.iter().filter(|a| a.affects(campaign_id)).collect()
}

/// Alerts of one category, in their original order.
#[must_use]
pub fn alerts_in_category(
    alerts: &[CategorizedAlert],
    category: AlertCategory,
) -> Vec<&CategorizedAlert> {
    alerts.iter().filter(|a| a.category == category).collect()
}
