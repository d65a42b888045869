//! ROAS/funnel misalignment: return on ad spend outside the stage benchmark.
//!
//! Underperformers are alerted per funnel stage. Overperformance is only
//! treated as a risk at the awareness stage, where a high ROAS usually means
//! the top of funnel is harvesting existing demand instead of building it.

use std::collections::BTreeMap;

use tracing::debug;

use super::{format_roas, mean, AlertDraft, DetectionContext, Detector};
use crate::campaign::{Campaign, FunnelStage, LifecycleStage};
use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Budget above which a single underperformer makes its stage critical.
const HIGH_BUDGET: f64 = 30_000.0;

/// Detects campaigns whose ROAS misses the funnel-stage benchmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoasMisalignmentDetector;

impl RoasMisalignmentDetector {
    fn in_scope(campaign: &Campaign) -> bool {
        !matches!(
            campaign.lifecycle_stage,
            LifecycleStage::Closing | LifecycleStage::Ideation
        )
    }

    fn underperformer_alert(
        stage: FunnelStage,
        group: &[&Campaign],
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let benchmark = stage.roas_benchmark();
        let severity = if group.iter().any(|c| c.budget > HIGH_BUDGET) {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        let avg_roas = mean(group.iter().map(|c| c.roas));

        AlertDraft::new(
            format!("rm-under-{stage}"),
            AlertCategory::RoasMisalignment,
            severity,
        )
        .title(format!("{} {stage} campaigns below ROAS benchmark", group.len()))
        .description(format!(
            "Average ROAS of {} is under the {} minimum expected for {stage} campaigns.",
            format_roas(avg_roas),
            format_roas(benchmark.min)
        ))
        .impact(
            "Spend in this stage is returning less than it should and drags down portfolio ROAS.",
        )
        .recommendation(
            "Audit targeting and creative for these campaigns, and shift budget toward stage peers that meet the benchmark.",
        )
        .affected(group.iter().copied())
        .metric("Campaigns", group.len().to_string())
        .metric("Avg ROAS", format_roas(avg_roas))
        .metric("Benchmark min", format_roas(benchmark.min))
        .finish(ctx.now)
    }

    fn awareness_overperformer_alert(
        group: &[&Campaign],
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let benchmark = FunnelStage::Awareness.roas_benchmark();
        let avg_roas = mean(group.iter().map(|c| c.roas));

        AlertDraft::new(
            "rm-over-awareness",
            AlertCategory::RoasMisalignment,
            AlertSeverity::Warning,
        )
        .title(format!("{} awareness campaigns above ROAS ceiling", group.len()))
        .description(format!(
            "Average ROAS of {} exceeds the {} ceiling for awareness campaigns.",
            format_roas(avg_roas),
            format_roas(benchmark.max)
        ))
        .impact(
            "Top-of-funnel spend may be converting existing customers instead of reaching new audiences.",
        )
        .recommendation(
            "Check audience definitions for retargeting leakage and broaden reach targeting.",
        )
        .affected(group.iter().copied())
        .metric("Campaigns", group.len().to_string())
        .metric("Avg ROAS", format_roas(avg_roas))
        .metric("Benchmark max", format_roas(benchmark.max))
        .finish(ctx.now)
    }
}

impl Detector for RoasMisalignmentDetector {
    fn category(&self) -> AlertCategory {
        AlertCategory::RoasMisalignment
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<CategorizedAlert> {
        let mut under: BTreeMap<FunnelStage, Vec<&Campaign>> = BTreeMap::new();
        let mut over_awareness: Vec<&Campaign> = Vec::new();

        for campaign in ctx.campaigns.iter().filter(|c| Self::in_scope(c)) {
            let benchmark = campaign.funnel_stage.roas_benchmark();
            if campaign.roas < benchmark.min {
                under.entry(campaign.funnel_stage).or_default().push(campaign);
            } else if campaign.roas > benchmark.max
                && campaign.funnel_stage == FunnelStage::Awareness
            {
                over_awareness.push(campaign);
            }
        }

        let mut alerts: Vec<CategorizedAlert> = under
            .iter()
            .filter_map(|(stage, group)| Self::underperformer_alert(*stage, group, ctx))
            .collect();

        if !over_awareness.is_empty() {
            alerts.extend(Self::awareness_overperformer_alert(&over_awareness, ctx));
        }

        debug!(
            underperforming = under.values().map(Vec::len).sum::<usize>(),
            overperforming = over_awareness.len(),
            alerts = alerts.len(),
            "roas misalignment scan complete"
        );

        alerts
    }
}
