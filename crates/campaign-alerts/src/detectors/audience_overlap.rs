//! Audience overlap: campaigns competing for the same people.
//!
//! Two independent passes over in-market campaigns:
//!
//! 1. Pattern clustering. Campaigns sharing a channel and funnel stage are
//!    tested against a fixed vocabulary of naming patterns. A cluster of
//!    two or more matching campaigns alerts when it is expensive or makes up
//!    a large share of its group.
//! 2. Pairwise similarity. Any two campaigns on the same channel whose names
//!    share at least two significant keywords alert when their combined
//!    spend is high, unless an earlier alert already covers both.
//!
//! A campaign may appear in several overlap alerts.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{
    format_currency, format_percent, total_spent, AlertDraft, DetectionContext, Detector,
};
use crate::campaign::{Campaign, CampaignStatus, FunnelStage, LifecycleStage};
use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Naming patterns that indicate a shared audience strategy.
pub const NAME_PATTERNS: [&str; 7] = [
    "brand",
    "retarget",
    "prospect",
    "awareness",
    "conversion",
    "sale",
    "promo",
];

/// Combined spend above which a pattern cluster alerts regardless of share.
const CLUSTER_SPEND_THRESHOLD: f64 = 30_000.0;
/// Fraction of the channel/funnel group above which a cluster alerts.
const CLUSTER_SHARE_THRESHOLD: f64 = 0.4;
/// Combined spend above which a cluster is critical.
const CLUSTER_CRITICAL_SPEND: f64 = 50_000.0;
/// Minimum shared keywords for two names to count as similar.
const MIN_SHARED_TOKENS: usize = 2;
/// Keywords must be longer than this many characters.
const MIN_TOKEN_LEN: usize = 3;
/// Combined spend above which a similar pair alerts.
const PAIR_SPEND_THRESHOLD: f64 = 40_000.0;

const CLUSTER_RECOMMENDATION: &str =
    "Consolidate the overlapping campaigns or add mutual audience exclusions so they stop bidding against each other.";
const PAIR_RECOMMENDATION: &str =
    "Review targeting for both campaigns and merge them if they address the same audience.";

/// Grouping key for pattern clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OverlapKey<'a> {
    channel: &'a str,
    funnel_stage: FunnelStage,
}

/// Detects campaigns competing for the same audience.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudienceOverlapDetector;

impl AudienceOverlapDetector {
    fn in_scope(campaign: &Campaign) -> bool {
        campaign.lifecycle_stage != LifecycleStage::Closing
            && campaign.status != CampaignStatus::Paused
    }

    fn pattern_clusters(
        campaigns: &[&Campaign],
        ctx: &DetectionContext<'_>,
    ) -> Vec<CategorizedAlert> {
        let mut groups: BTreeMap<OverlapKey<'_>, Vec<&Campaign>> = BTreeMap::new();
        for &campaign in campaigns {
            groups
                .entry(OverlapKey {
                    channel: &campaign.channel,
                    funnel_stage: campaign.funnel_stage,
                })
                .or_default()
                .push(campaign);
        }

        let mut alerts = Vec::new();

        for (key, group) in &groups {
            if group.len() < 2 {
                continue;
            }

            let lowered: Vec<String> = group.iter().map(|c| c.name.to_lowercase()).collect();

            for pattern in NAME_PATTERNS {
                let matching: Vec<&Campaign> = group
                    .iter()
                    .zip(&lowered)
                    .filter(|(_, name)| name.contains(pattern))
                    .map(|(c, _)| *c)
                    .collect();

                if matching.len() < 2 {
                    continue;
                }

                let spend = total_spent(matching.iter().copied());
                let share = matching.len() as f64 / group.len() as f64;

                if spend <= CLUSTER_SPEND_THRESHOLD && share <= CLUSTER_SHARE_THRESHOLD {
                    continue;
                }

                let severity = if spend > CLUSTER_CRITICAL_SPEND {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };

                let draft = AlertDraft::new(
                    format!("ao-{}-{}-{pattern}", key.channel, key.funnel_stage),
                    AlertCategory::AudienceOverlap,
                    severity,
                )
                .title(format!(
                    "\"{pattern}\" campaigns overlap on {} ({})",
                    key.channel, key.funnel_stage
                ))
                .description(format!(
                    "{} {} campaigns in the {} stage share the \"{pattern}\" naming pattern and are likely targeting the same audience.",
                    matching.len(),
                    key.channel,
                    key.funnel_stage
                ))
                .impact(format!(
                    "{} in combined spend is competing for the same impressions, driving up costs.",
                    format_currency(spend)
                ))
                .recommendation(CLUSTER_RECOMMENDATION)
                .affected(matching.iter().copied())
                .metric("Overlapping campaigns", matching.len().to_string())
                .metric("Share of group", format_percent(share))
                .metric("Combined spend", format_currency(spend));

                alerts.extend(draft.finish(ctx.now));
            }
        }

        alerts
    }

    fn similar_pairs(
        campaigns: &[&Campaign],
        existing: &[CategorizedAlert],
        ctx: &DetectionContext<'_>,
    ) -> Vec<CategorizedAlert> {
        let tokens: Vec<BTreeSet<String>> =
            campaigns.iter().map(|c| significant_tokens(&c.name)).collect();
        let mut alerts: Vec<CategorizedAlert> = Vec::new();

        for (i, a) in campaigns.iter().enumerate() {
            for (j, b) in campaigns.iter().enumerate().skip(i + 1) {
                if a.channel != b.channel {
                    continue;
                }

                let shared: Vec<&String> = tokens[i].intersection(&tokens[j]).collect();
                if shared.len() < MIN_SHARED_TOKENS {
                    continue;
                }

                let spend = a.spent + b.spent;
                if spend <= PAIR_SPEND_THRESHOLD {
                    continue;
                }

                let covered = existing
                    .iter()
                    .chain(alerts.iter())
                    .any(|alert| alert.affects(&a.id) && alert.affects(&b.id));
                if covered {
                    continue;
                }

                let keywords = shared
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");

                let draft = AlertDraft::new(
                    format!("ao-pair-{}-{}", a.id, b.id),
                    AlertCategory::AudienceOverlap,
                    AlertSeverity::Warning,
                )
                .title(format!("Similar {} campaigns: {} / {}", a.channel, a.name, b.name))
                .description(format!(
                    "\"{}\" and \"{}\" share {} name keywords ({keywords}) on the same channel.",
                    a.name,
                    b.name,
                    shared.len()
                ))
                .impact(format!(
                    "{} in combined spend may be reaching the same users twice.",
                    format_currency(spend)
                ))
                .recommendation(PAIR_RECOMMENDATION)
                .affected([*a, *b])
                .metric("Shared keywords", shared.len().to_string())
                .metric("Combined spend", format_currency(spend));

                alerts.extend(draft.finish(ctx.now));
            }
        }

        alerts
    }
}

impl Detector for AudienceOverlapDetector {
    fn category(&self) -> AlertCategory {
        AlertCategory::AudienceOverlap
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<CategorizedAlert> {
        let in_scope: Vec<&Campaign> = ctx
            .campaigns
            .iter()
            .filter(|c| Self::in_scope(c))
            .collect();

        let mut alerts = Self::pattern_clusters(&in_scope, ctx);
        let pattern_count = alerts.len();
        let pairs = Self::similar_pairs(&in_scope, &alerts, ctx);
        alerts.extend(pairs);

        debug!(
            campaigns = in_scope.len(),
            pattern_alerts = pattern_count,
            pair_alerts = alerts.len() - pattern_count,
            "audience overlap scan complete"
        );

        alerts
    }
}

/// Lowercased name keywords longer than three characters.
fn significant_tokens(name: &str) -> BTreeSet<String> {
    name.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|token| token.chars().count() > MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}
