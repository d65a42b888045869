//! Alert engine: runs every detector and merges their output.
//!
//! [`AlertEngine`] is the main entry point. One evaluation runs each enabled
//! detector over the same snapshot and instant, concatenates the results and
//! applies the global ordering (severity rank, then breadth of impact).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::campaign::Campaign;
use crate::detectors::{all_detectors, DetectionContext, Detector};
use crate::error::{AlertError, Result};
use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Configuration for the alert engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Categories whose detectors run.
    pub enabled_categories: Vec<AlertCategory>,
    /// Maximum number of alerts returned after sorting.
    pub max_alerts: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled_categories: AlertCategory::ALL.to_vec(),
            max_alerts: None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SerializationError` for malformed JSON and
    /// `AlertError::InvalidConfig` if validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if `max_alerts` is zero or a
    /// category is listed twice.
    pub fn validate(&self) -> Result<()> {
        if self.max_alerts == Some(0) {
            return Err(AlertError::InvalidConfig {
                reason: "max_alerts must be positive when set".to_string(),
            });
        }

        for (i, category) in self.enabled_categories.iter().enumerate() {
            if self.enabled_categories[..i].contains(category) {
                return Err(AlertError::InvalidConfig {
                    reason: format!("category '{category}' listed more than once"),
                });
            }
        }

        Ok(())
    }

    /// Returns true if the category's detector should run.
    #[must_use]
    pub fn is_enabled(&self, category: AlertCategory) -> bool {
        self.enabled_categories.contains(&category)
    }
}

/// Runs the detectors over a campaign snapshot.
///
/// The engine holds no per-run state; evaluating the same snapshot at the
/// same instant always yields the same alerts in the same order.
#[derive(Debug)]
pub struct AlertEngine {
    config: EngineConfig,
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEngine {
    /// Creates an engine with every detector enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with custom configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let detectors = all_detectors()
            .into_iter()
            .filter(|d| config.is_enabled(d.category()))
            .collect();
        Self { config, detectors }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of detectors that will run.
    #[must_use]
    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Evaluates the snapshot against the wall clock.
    #[must_use]
    pub fn evaluate(&self, campaigns: &[Campaign]) -> Vec<CategorizedAlert> {
        self.evaluate_at(campaigns, Utc::now())
    }

    /// Evaluates the snapshot as of `now`.
    #[must_use]
    pub fn evaluate_at(&self, campaigns: &[Campaign], now: DateTime<Utc>) -> Vec<CategorizedAlert> {
        let ctx = DetectionContext::new(campaigns, now);
        let mut alerts = Vec::new();

        for detector in &self.detectors {
            let found = detector.detect(&ctx);
            debug!(
                category = %detector.category(),
                alerts = found.len(),
                "detector finished"
            );
            alerts.extend(found);
        }

        sort_alerts(&mut alerts);

        if let Some(max) = self.config.max_alerts {
            alerts.truncate(max);
        }

        info!(
            campaigns = campaigns.len(),
            alerts = alerts.len(),
            critical = count_severity(&alerts, AlertSeverity::Critical),
            warning = count_severity(&alerts, AlertSeverity::Warning),
            info = count_severity(&alerts, AlertSeverity::Info),
            "alert evaluation complete"
        );

        alerts
    }
}

/// Orders two alerts: more urgent first, then more campaigns affected first.
#[must_use]
pub fn compare_alerts(a: &CategorizedAlert, b: &CategorizedAlert) -> Ordering {
    a.severity
        .rank()
        .cmp(&b.severity.rank())
        .then_with(|| b.affected_campaign_ids.len().cmp(&a.affected_campaign_ids.len()))
}

/// Sorts alerts in place by [`compare_alerts`]. The sort is stable, so
/// ties keep detector order.
pub fn sort_alerts(alerts: &mut [CategorizedAlert]) {
    alerts.sort_by(compare_alerts);
}

fn count_severity(alerts: &[CategorizedAlert], severity: AlertSeverity) -> usize {
    alerts.iter().filter(|a| a.severity == severity).count()
}

/// Computes the categorized alerts for a campaign snapshot using the
/// default engine and the wall clock.
///
/// Never fails; an empty snapshot yields an empty list.
#[must_use]
pub fn calculate_categorized_alerts(campaigns: &[Campaign]) -> Vec<CategorizedAlert> {
    AlertEngine::new().evaluate(campaigns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{FunnelStage, LifecycleStage};
    use crate::detectors::test_support::{campaign, now, spender};
    use crate::types::AlertMetric;

    fn alert(id: &str, severity: AlertSeverity, affected: usize) -> CategorizedAlert {
        CategorizedAlert {
            id: id.to_string(),
            category: AlertCategory::BudgetPacing,
            title: String::new(),
            description: String::new(),
            impact: String::new(),
            recommendation: String::new(),
            severity,
            affected_campaign_ids: (0..affected).map(|i| format!("c{i}")).collect(),
            metrics: vec![AlertMetric::new("Campaigns", affected.to_string())],
            timestamp: now(),
        }
    }

    fn mixed_portfolio() -> Vec<Campaign> {
        vec![
            spender("hot", "search", LifecycleStage::Active, 10_000.0, 9_800.0),
            spender("idle-1", "search", LifecycleStage::Active, 10_000.0, 100.0),
            spender("idle-2", "search", LifecycleStage::Active, 10_000.0, 200.0),
            campaign("weak", "Weak converter", "search")
                .funnel_stage(FunnelStage::Conversion)
                .lifecycle_stage(LifecycleStage::Active)
                .budget(60_000.0)
                .spent(12_000.0)
                .roas(0.8)
                .build()
                .unwrap(),
        ]
    }

    mod config_tests {
        use super::*;

        #[test]
        fn default_config() {
            let config = EngineConfig::default();
            assert_eq!(config.enabled_categories, AlertCategory::ALL.to_vec());
            assert!(config.max_alerts.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn config_from_json_fills_defaults() {
            let config = EngineConfig::from_json(r#"{"max_alerts": 5}"#).unwrap();
            assert_eq!(config.max_alerts, Some(5));
            assert_eq!(config.enabled_categories.len(), 5);
        }

        #[test]
        fn config_from_json_reads_categories() {
            let config =
                EngineConfig::from_json(r#"{"enabled_categories": ["budget_pacing"]}"#).unwrap();
            assert!(config.is_enabled(AlertCategory::BudgetPacing));
            assert!(!config.is_enabled(AlertCategory::AudienceOverlap));
        }

        #[test]
        fn zero_max_alerts_is_invalid() {
            let result = EngineConfig::from_json(r#"{"max_alerts": 0}"#);
            assert!(matches!(result, Err(AlertError::InvalidConfig { .. })));
        }

        #[test]
        fn duplicate_category_is_invalid() {
            let config = EngineConfig {
                enabled_categories: vec![
                    AlertCategory::LifecycleStall,
                    AlertCategory::LifecycleStall,
                ],
                max_alerts: None,
            };
            match config.validate() {
                Err(AlertError::InvalidConfig { reason }) => {
                    assert!(reason.contains("lifecycle_stall"));
                }
                other => panic!("expected InvalidConfig, got {other:?}"),
            }
        }

        #[test]
        fn unknown_category_is_a_serialization_error() {
            let result = EngineConfig::from_json(r#"{"enabled_categories": ["fraud"]}"#);
            assert!(matches!(result, Err(AlertError::SerializationError(_))));
        }
    }

    mod sort_tests {
        use super::*;

        #[test]
        fn severity_rank_then_breadth() {
            let mut alerts = vec![
                alert("info-wide", AlertSeverity::Info, 9),
                alert("warn-narrow", AlertSeverity::Warning, 1),
                alert("crit-narrow", AlertSeverity::Critical, 1),
                alert("warn-wide", AlertSeverity::Warning, 4),
                alert("crit-wide", AlertSeverity::Critical, 3),
            ];
            sort_alerts(&mut alerts);
            let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(
                ids,
                vec!["crit-wide", "crit-narrow", "warn-wide", "warn-narrow", "info-wide"]
            );
        }

        #[test]
        fn ties_keep_original_order() {
            let mut alerts = vec![
                alert("first", AlertSeverity::Warning, 2),
                alert("second", AlertSeverity::Warning, 2),
            ];
            sort_alerts(&mut alerts);
            assert_eq!(alerts[0].id, "first");
            assert_eq!(alerts[1].id, "second");
        }
    }

    mod engine_tests {
        use super::*;

        #[test]
        fn empty_snapshot_yields_no_alerts() {
            assert!(AlertEngine::new().evaluate(&[]).is_empty());
            assert!(calculate_categorized_alerts(&[]).is_empty());
        }

        #[test]
        fn merges_and_sorts_detector_output() {
            let alerts = AlertEngine::new().evaluate_at(&mixed_portfolio(), now());
            let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(
                ids,
                vec!["bp-overspend-critical", "rm-under-conversion", "bp-underspend"]
            );
            assert!(alerts.iter().all(|a| a.timestamp == now()));
        }

        #[test]
        fn disabled_categories_do_not_run() {
            let engine = AlertEngine::with_config(EngineConfig {
                enabled_categories: vec![AlertCategory::RoasMisalignment],
                max_alerts: None,
            });
            assert_eq!(engine.detector_count(), 1);

            let alerts = engine.evaluate_at(&mixed_portfolio(), now());
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].category, AlertCategory::RoasMisalignment);
        }

        #[test]
        fn max_alerts_truncates_after_sorting() {
            let engine = AlertEngine::with_config(EngineConfig {
                max_alerts: Some(1),
                ..Default::default()
            });
            let alerts = engine.evaluate_at(&mixed_portfolio(), now());
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].id, "bp-overspend-critical");
        }

        #[test]
        fn repeated_runs_are_identical() {
            let engine = AlertEngine::new();
            let campaigns = mixed_portfolio();
            let first = engine.evaluate_at(&campaigns, now());
            let second = engine.evaluate_at(&campaigns, now());
            assert_eq!(first, second);
        }
    }
}
