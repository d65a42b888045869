//! Categorized alerting for marketing campaign portfolios.
//!
//! `campaign-alerts` scans a snapshot of campaigns with a fixed set of
//! rule-based detectors and produces a deduplicated, prioritized list of
//! aggregate alerts for an operations dashboard.
//!
//! # Features
//!
//! - **Audience Overlap**: Campaigns on one channel competing for the same audience
//! - **Lifecycle Stall**: Campaigns stuck in a pre-launch stage past its expected duration
//! - **Budget Pacing**: Live campaigns spending far ahead of or behind plan
//! - **ROAS Misalignment**: Return on ad spend outside the funnel-stage benchmark
//! - **Attribution Leak**: Channels whose revenue share is out of line with spend
//!
//! # Example
//!
//! ```rust
//! use campaign_alerts::{
//!     calculate_categorized_alerts, AlertSeverity, Campaign, LifecycleStage,
//! };
//!
//! let campaign = Campaign::builder("c1", "Spring Sale Search", "search")
//!     .lifecycle_stage(LifecycleStage::Active)
//!     .budget(10_000.0)
//!     .spent(9_800.0)
//!     .roas(3.0)
//!     .build()
//!     .unwrap();
//!
//! let alerts = calculate_categorized_alerts(&[campaign]);
//! assert_eq!(alerts[0].id, "bp-overspend-critical");
//! assert_eq!(alerts[0].severity, AlertSeverity::Critical);
//! ```
//!
//! # Configuration
//!
//! The engine can be restricted to a subset of categories and capped:
//!
//! ```rust
//! use campaign_alerts::{AlertEngine, EngineConfig};
//!
//! let json = r#"{"enabled_categories": ["budget_pacing"], "max_alerts": 10}"#;
//! let config = EngineConfig::from_json(json).unwrap();
//! let engine = AlertEngine::with_config(config);
//! assert_eq!(engine.detector_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod campaign;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod summary;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main types at crate root
pub use cache::{snapshot_fingerprint, AlertCache};
pub use campaign::{
    campaigns_from_json, Campaign, CampaignBuilder, CampaignStatus, FunnelStage, LifecycleStage,
    RoasBenchmark,
};
pub use detectors::{DetectionContext, Detector};
pub use engine::{
    calculate_categorized_alerts, compare_alerts, sort_alerts, AlertEngine, EngineConfig,
};
pub use error::{AlertError, Result};
pub use summary::{alerts_for_campaign, alerts_in_category, AlertSummary};
pub use types::{
    AlertCategory, AlertMetric, AlertSeverity, CategorizedAlert, CategoryInfo, ALERT_CATEGORY_INFO,
};
