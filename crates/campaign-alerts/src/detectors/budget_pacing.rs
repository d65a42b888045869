//! Budget pacing: live campaigns spending faster or slower than planned.
//!
//! Time in stage is estimated (four weeks for active campaigns, two
//! otherwise), so the expected spent ratio is `weekly_pace * weeks`. The
//! actual pace is the spent ratio divided by that expectation. Overspenders
//! and underspenders are reported as aggregate alerts, never one per
//! campaign.

use tracing::debug;

use super::{format_currency, mean, total_spent, AlertDraft, DetectionContext, Detector};
use crate::campaign::{Campaign, LifecycleStage};
use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Floor on the expected spent ratio, keeps the pace finite.
const MIN_EXPECTED_RATIO: f64 = 0.01;
/// Pace above which a campaign is overspending.
const OVERSPEND_PACE: f64 = 1.3;
/// Spent ratio an overspender must exceed.
const OVERSPEND_MIN_RATIO: f64 = 0.5;
/// Spent ratio above which overspending is critical.
const OVERSPEND_CRITICAL_RATIO: f64 = 0.9;
/// Pace below which an active campaign is underspending.
const UNDERSPEND_PACE: f64 = 0.4;
/// Spent ratio an underspender must stay below.
const UNDERSPEND_MAX_RATIO: f64 = 0.3;

/// How a campaign's spend compares to its expected pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingClass {
    /// Spending well ahead of plan.
    Overspending,
    /// Active but spending well behind plan.
    Underspending,
    /// Within tolerance, or not in a spending stage.
    OnPace,
}

/// Pacing figures for one campaign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    /// Fraction of budget spent.
    pub spent_ratio: f64,
    /// Spent ratio relative to what the stage should have spent by now.
    pub pace_ratio: f64,
    /// Resulting classification.
    pub class: PacingClass,
}

/// Computes pacing for a campaign, `None` outside spending stages.
#[must_use]
pub fn pacing(campaign: &Campaign) -> Option<Pacing> {
    let stage = campaign.lifecycle_stage;
    let weekly_pace = stage.weekly_pace()?;
    let weeks_in_stage = if stage == LifecycleStage::Active { 4.0 } else { 2.0 };
    let expected_ratio = weekly_pace * weeks_in_stage;

    let spent_ratio = campaign.spend_ratio();
    let pace_ratio = spent_ratio / expected_ratio.max(MIN_EXPECTED_RATIO);

    let class = if pace_ratio > OVERSPEND_PACE && spent_ratio > OVERSPEND_MIN_RATIO {
        PacingClass::Overspending
    } else if pace_ratio < UNDERSPEND_PACE
        && stage == LifecycleStage::Active
        && spent_ratio < UNDERSPEND_MAX_RATIO
    {
        PacingClass::Underspending
    } else {
        PacingClass::OnPace
    };

    Some(Pacing {
        spent_ratio,
        pace_ratio,
        class,
    })
}

/// Detects campaigns whose spend is off pace for their lifecycle stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetPacingDetector;

impl BudgetPacingDetector {
    fn overspend_alert(
        critical: bool,
        group: &[(&Campaign, Pacing)],
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let (id, severity, title, recommendation) = if critical {
            (
                "bp-overspend-critical",
                AlertSeverity::Critical,
                format!("{} campaigns nearly out of budget", group.len()),
                "Pause or cap these campaigns immediately and decide whether to extend budget.",
            )
        } else {
            (
                "bp-overspend-warning",
                AlertSeverity::Warning,
                format!("{} campaigns spending ahead of pace", group.len()),
                "Lower daily caps or bids to bring spend back in line with the flight plan.",
            )
        };

        let spend = total_spent(group.iter().map(|(c, _)| *c));
        let budget: f64 = group.iter().map(|(c, _)| c.budget).sum();
        let avg_pace = mean(group.iter().map(|(_, p)| p.pace_ratio));

        AlertDraft::new(id, AlertCategory::BudgetPacing, severity)
            .title(title)
            .description(format!(
                "These campaigns are spending {avg_pace:.1}x faster than expected for their stage."
            ))
            .impact(format!(
                "{} of {} allocated is already spent; budgets will run out before the flight ends.",
                format_currency(spend),
                format_currency(budget)
            ))
            .recommendation(recommendation)
            .affected(group.iter().map(|(c, _)| *c))
            .metric("Campaigns", group.len().to_string())
            .metric("Total spent", format_currency(spend))
            .metric("Avg pace", format!("{avg_pace:.1}x"))
            .finish(ctx.now)
    }

    fn underspend_alert(
        group: &[(&Campaign, Pacing)],
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let unused: f64 = group.iter().map(|(c, _)| c.budget - c.spent).sum();
        let avg_pace = mean(group.iter().map(|(_, p)| p.pace_ratio));

        AlertDraft::new("bp-underspend", AlertCategory::BudgetPacing, AlertSeverity::Info)
            .title(format!("{} active campaigns underspending", group.len()))
            .description(format!(
                "These active campaigns are spending at {avg_pace:.1}x of the expected pace."
            ))
            .impact(format!(
                "{} of budget is unused and may be lost at period end.",
                format_currency(unused)
            ))
            .recommendation(
                "Check delivery limits, audience size and bids, or reallocate budget to stronger performers.",
            )
            .affected(group.iter().map(|(c, _)| *c))
            .metric("Campaigns", group.len().to_string())
            .metric("Unused budget", format_currency(unused))
            .metric("Avg pace", format!("{avg_pace:.1}x"))
            .finish(ctx.now)
    }
}

impl Detector for BudgetPacingDetector {
    fn category(&self) -> AlertCategory {
        AlertCategory::BudgetPacing
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<CategorizedAlert> {
        let mut over_critical = Vec::new();
        let mut over_warning = Vec::new();
        let mut under = Vec::new();

        for campaign in ctx.campaigns {
            let Some(p) = pacing(campaign) else {
                continue;
            };
            match p.class {
                PacingClass::Overspending if p.spent_ratio > OVERSPEND_CRITICAL_RATIO => {
                    over_critical.push((campaign, p));
                }
                PacingClass::Overspending => over_warning.push((campaign, p)),
                PacingClass::Underspending => under.push((campaign, p)),
                PacingClass::OnPace => {}
            }
        }

        let mut alerts = Vec::with_capacity(3);
        if !over_critical.is_empty() {
            alerts.extend(Self::overspend_alert(true, &over_critical, ctx));
        }
        if !over_warning.is_empty() {
            alerts.extend(Self::overspend_alert(false, &over_warning, ctx));
        }
        if !under.is_empty() {
            alerts.extend(Self::underspend_alert(&under, ctx));
        }

        debug!(
            overspending = over_critical.len() + over_warning.len(),
            underspending = under.len(),
            alerts = alerts.len(),
            "budget pacing scan complete"
        );

        alerts
    }
}
