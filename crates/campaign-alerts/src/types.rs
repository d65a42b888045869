//! Core alert types.
//!
//! - [`AlertSeverity`]: urgency of an alert, with an explicit sort rank
//! - [`AlertCategory`]: the five cross-campaign anomaly families
//! - [`CategoryInfo`] / [`ALERT_CATEGORY_INFO`]: display metadata per category
//! - [`CategorizedAlert`]: a single engine finding

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The severity level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Needs action now.
    Critical,
    /// Should be investigated.
    Warning,
    /// Worth knowing, no action required.
    Info,
}

impl AlertSeverity {
    /// All severities, most urgent first.
    pub const ALL: [Self; 3] = [Self::Critical, Self::Warning, Self::Info];

    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Sort rank, lower sorts first.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The family of cross-campaign anomaly an alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// Campaigns competing for the same audience.
    AudienceOverlap,
    /// Campaigns stuck in pre-launch stages.
    LifecycleStall,
    /// Campaigns spending too fast or too slow.
    BudgetPacing,
    /// ROAS outside the funnel-stage benchmark.
    RoasMisalignment,
    /// Channel revenue share out of line with spend share.
    AttributionLeak,
}

impl AlertCategory {
    /// All categories in display order.
    pub const ALL: [Self; 5] = [
        Self::AudienceOverlap,
        Self::LifecycleStall,
        Self::BudgetPacing,
        Self::RoasMisalignment,
        Self::AttributionLeak,
    ];

    /// Returns the category identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AudienceOverlap => "audience_overlap",
            Self::LifecycleStall => "lifecycle_stall",
            Self::BudgetPacing => "budget_pacing",
            Self::RoasMisalignment => "roas_misalignment",
            Self::AttributionLeak => "attribution_leak",
        }
    }

    /// Returns the display metadata for this category.
    #[must_use]
    pub fn info(&self) -> &'static CategoryInfo {
        match self {
            Self::AudienceOverlap => &ALERT_CATEGORY_INFO[0],
            Self::LifecycleStall => &ALERT_CATEGORY_INFO[1],
            Self::BudgetPacing => &ALERT_CATEGORY_INFO[2],
            Self::RoasMisalignment => &ALERT_CATEGORY_INFO[3],
            Self::AttributionLeak => &ALERT_CATEGORY_INFO[4],
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display metadata for an alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    /// The category described.
    pub category: AlertCategory,
    /// Human-readable label.
    pub label: &'static str,
    /// Hex color token.
    pub color: &'static str,
    /// Icon identifier.
    pub icon: &'static str,
}

/// Display metadata for every category, in [`AlertCategory::ALL`] order.
pub static ALERT_CATEGORY_INFO: [CategoryInfo; 5] = [
    CategoryInfo {
        category: AlertCategory::AudienceOverlap,
        label: "Audience Overlap",
        color: "#8B5CF6",
        icon: "users",
    },
    CategoryInfo {
        category: AlertCategory::LifecycleStall,
        label: "Lifecycle Stall",
        color: "#F59E0B",
        icon: "clock",
    },
    CategoryInfo {
        category: AlertCategory::BudgetPacing,
        label: "Budget Pacing",
        color: "#EF4444",
        icon: "dollar-sign",
    },
    CategoryInfo {
        category: AlertCategory::RoasMisalignment,
        label: "ROAS Misalignment",
        color: "#3B82F6",
        icon: "trending-down",
    },
    CategoryInfo {
        category: AlertCategory::AttributionLeak,
        label: "Attribution Leak",
        color: "#10B981",
        icon: "git-branch",
    },
];

/// A presentation-ready label/value pair attached to an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMetric {
    /// Metric label.
    pub label: String,
    /// Formatted metric value.
    pub value: String,
}

impl AlertMetric {
    /// Creates a new metric.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A single cross-campaign finding produced by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedAlert {
    /// Deterministic id derived from category and grouping key.
    pub id: String,
    /// Anomaly family.
    pub category: AlertCategory,
    /// Short headline.
    pub title: String,
    /// What was detected.
    pub description: String,
    /// Estimated business impact.
    pub impact: String,
    /// Suggested next step.
    pub recommendation: String,
    /// Urgency.
    pub severity: AlertSeverity,
    /// Campaigns contributing to the alert. Never empty.
    pub affected_campaign_ids: Vec<String>,
    /// Supporting figures for display.
    pub metrics: Vec<AlertMetric>,
    /// When the alert was generated.
    pub timestamp: DateTime<Utc>,
}

impl CategorizedAlert {
    /// Returns true if `campaign_id` contributed to this alert.
    #[must_use]
    pub fn affects(&self, campaign_id: &str) -> bool {
        self.affected_campaign_ids.iter().any(|id| id == campaign_id)
    }

    /// Compares every field except `timestamp`.
    #[must_use]
    pub fn same_finding(&self, other: &Self) -> bool {
        self.id == other.id
            && self.category == other.category
            && self.title == other.title
            && self.description == other.description
            && self.impact == other.impact
            && self.recommendation == other.recommendation
            && self.severity == other.severity
            && self.affected_campaign_ids == other.affected_campaign_ids
            && self.metrics == other.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod severity_tests {
        use super::*;

        #[test]
        fn severity_rank_is_urgency_order() {
            assert!(AlertSeverity::Critical.rank() < AlertSeverity::Warning.rank());
            assert!(AlertSeverity::Warning.rank() < AlertSeverity::Info.rank());
        }

        #[test]
        fn rank_differs_from_alphabetic_order() {
            let mut by_name = AlertSeverity::ALL;
            by_name.sort_by_key(AlertSeverity::as_str);
            let mut by_rank = AlertSeverity::ALL;
            by_rank.sort_by_key(AlertSeverity::rank);
            assert_ne!(by_name, by_rank);
            assert_eq!(by_rank, AlertSeverity::ALL);
        }

        #[test]
        fn severity_display() {
            assert_eq!(format!("{}", AlertSeverity::Critical), "critical");
            assert_eq!(format!("{}", AlertSeverity::Info), "info");
        }

        #[test]
        fn severity_serialization_roundtrip() {
            for sev in AlertSeverity::ALL {
                let json = serde_json::to_string(&sev).unwrap();
                assert_eq!(json, format!("\"{}\"", sev.as_str()));
                let parsed: AlertSeverity = serde_json::from_str(&json).unwrap();
                assert_eq!(parsed, sev);
            }
        }
    }

    mod category_tests {
        use super::*;

        #[test]
        fn info_table_matches_category_order() {
            for (info, category) in ALERT_CATEGORY_INFO.iter().zip(AlertCategory::ALL) {
                assert_eq!(info.category, category);
                assert_eq!(category.info(), info);
            }
        }

        #[test]
        fn info_colors_are_hex() {
            for info in &ALERT_CATEGORY_INFO {
                assert!(info.color.starts_with('#'));
                assert_eq!(info.color.len(), 7);
                assert!(info.color[1..].chars().all(|c| c.is_ascii_hexdigit()));
                assert!(!info.label.is_empty());
                assert!(!info.icon.is_empty());
            }
        }

        #[test]
        fn category_serializes_snake_case() {
            let json = serde_json::to_string(&AlertCategory::RoasMisalignment).unwrap();
            assert_eq!(json, "\"roas_misalignment\"");
        }
    }

    mod alert_tests {
        use super::*;

        fn sample_alert() -> CategorizedAlert {
            CategorizedAlert {
                id: "bp-underspend".to_string(),
                category: AlertCategory::BudgetPacing,
                title: "t".to_string(),
                description: "d".to_string(),
                impact: "i".to_string(),
                recommendation: "r".to_string(),
                severity: AlertSeverity::Info,
                affected_campaign_ids: vec!["a".to_string(), "b".to_string()],
                metrics: vec![AlertMetric::new("Campaigns", "2")],
                timestamp: Utc::now(),
            }
        }

        #[test]
        fn affects_campaign() {
            let alert = sample_alert();
            assert!(alert.affects("a"));
            assert!(!alert.affects("c"));
        }

        #[test]
        fn same_finding_ignores_timestamp() {
            let a = sample_alert();
            let mut b = a.clone();
            b.timestamp = a.timestamp + chrono::Duration::seconds(30);
            assert!(a.same_finding(&b));
            b.severity = AlertSeverity::Warning;
            assert!(!a.same_finding(&b));
        }

        #[test]
        fn alert_serializes_camel_case() {
            let json = serde_json::to_value(sample_alert()).unwrap();
            assert!(json.get("affectedCampaignIds").is_some());
            assert_eq!(json["category"], "budget_pacing");
            assert_eq!(json["metrics"][0]["label"], "Campaigns");
        }
    }
}
