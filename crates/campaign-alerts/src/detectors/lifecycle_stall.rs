//! Lifecycle stall: pre-launch campaigns sitting too long in one stage.
//!
//! A campaign is stalled once its age exceeds the stage's expected duration
//! plus a grace week while readiness stays low. Stalled campaigns whose
//! launch date is imminent (or only just missed) raise a critical alert per
//! stage; the rest raise a warning per stage.

use std::collections::BTreeMap;

use tracing::debug;

use super::{mean, AlertDraft, DetectionContext, Detector};
use crate::campaign::{Campaign, LifecycleStage};
use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Days past the expected stage duration before a campaign counts as stalled.
const GRACE_DAYS: f64 = 7.0;
/// Readiness at or above this is never considered stalled.
const READINESS_THRESHOLD: u8 = 70;
/// Launch dates within this window (exclusive) make a stall urgent.
const URGENT_WINDOW_DAYS: (f64, f64) = (-7.0, 14.0);

/// A stalled campaign and how far past its expected stage duration it is.
#[derive(Debug)]
struct Stalled<'a> {
    campaign: &'a Campaign,
    days_over: f64,
    days_until_launch: Option<f64>,
}

impl Stalled<'_> {
    fn is_urgent(&self) -> bool {
        let (lower, upper) = URGENT_WINDOW_DAYS;
        self.days_until_launch
            .is_some_and(|days| days > lower && days < upper)
    }
}

/// Detects campaigns stuck in early lifecycle stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleStallDetector;

impl LifecycleStallDetector {
    fn stalled<'a>(campaign: &'a Campaign, ctx: &DetectionContext<'_>) -> Option<Stalled<'a>> {
        let stage = campaign.lifecycle_stage;
        if !stage.is_pre_launch() || campaign.readiness_percent >= READINESS_THRESHOLD {
            return None;
        }

        let age = ctx.days_since(campaign.created_date?);
        let expected = f64::from(stage.expected_days());
        if age <= expected + GRACE_DAYS {
            return None;
        }

        Some(Stalled {
            campaign,
            days_over: age - expected,
            days_until_launch: campaign.target_launch_date.map(|d| ctx.days_until(d)),
        })
    }

    fn urgent_alert(
        stage: LifecycleStage,
        urgent: &[&Stalled<'_>],
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let avg_readiness = mean(urgent.iter().map(|s| f64::from(s.campaign.readiness_percent)));
        let nearest_launch = urgent
            .iter()
            .filter_map(|s| s.days_until_launch)
            .fold(f64::INFINITY, f64::min);

        AlertDraft::new(
            format!("ls-urgent-{stage}"),
            AlertCategory::LifecycleStall,
            AlertSeverity::Critical,
        )
        .title(format!("{} campaigns stalled in {stage} near launch", urgent.len()))
        .description(format!(
            "These campaigns have been in {stage} longer than the expected {} days and are launching within two weeks with readiness below {READINESS_THRESHOLD}%.",
            stage.expected_days()
        ))
        .impact("Launch dates are at risk of slipping or going live unprepared.")
        .recommendation(
            "Escalate to campaign owners now: unblock outstanding tasks or move the launch date.",
        )
        .affected(urgent.iter().map(|s| s.campaign))
        .metric("Campaigns", urgent.len().to_string())
        .metric("Avg readiness", format!("{avg_readiness:.0}%"))
        .metric("Nearest launch", format_launch_offset(nearest_launch))
        .finish(ctx.now)
    }

    fn stall_alert(
        stage: LifecycleStage,
        stalled: &[&Stalled<'_>],
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let avg_over = mean(stalled.iter().map(|s| s.days_over));

        AlertDraft::new(
            format!("ls-stall-{stage}"),
            AlertCategory::LifecycleStall,
            AlertSeverity::Warning,
        )
        .title(format!("{} campaigns stalled in {stage}", stalled.len()))
        .description(format!(
            "These campaigns have exceeded the expected {} days in {stage} and readiness is still below {READINESS_THRESHOLD}%.",
            stage.expected_days()
        ))
        .impact("Pipeline velocity is dropping and planned budget is sitting idle.")
        .recommendation(
            "Review blockers in the next planning sync and reassign or retire stalled work.",
        )
        .affected(stalled.iter().map(|s| s.campaign))
        .metric("Campaigns", stalled.len().to_string())
        .metric("Avg days over expected", format!("{avg_over:.0}"))
        .finish(ctx.now)
    }
}

impl Detector for LifecycleStallDetector {
    fn category(&self) -> AlertCategory {
        AlertCategory::LifecycleStall
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<CategorizedAlert> {
        let mut by_stage: BTreeMap<LifecycleStage, Vec<Stalled<'_>>> = BTreeMap::new();
        for campaign in ctx.campaigns {
            if let Some(stalled) = Self::stalled(campaign, ctx) {
                by_stage
                    .entry(campaign.lifecycle_stage)
                    .or_default()
                    .push(stalled);
            }
        }

        let mut alerts = Vec::new();
        for (stage, stalled) in &by_stage {
            let (urgent, remaining): (Vec<&Stalled<'_>>, Vec<&Stalled<'_>>) =
                stalled.iter().partition(|s| s.is_urgent());

            if !urgent.is_empty() {
                alerts.extend(Self::urgent_alert(*stage, &urgent, ctx));
            }
            if !remaining.is_empty() {
                alerts.extend(Self::stall_alert(*stage, &remaining, ctx));
            }
        }

        debug!(
            stalled = by_stage.values().map(Vec::len).sum::<usize>(),
            alerts = alerts.len(),
            "lifecycle stall scan complete"
        );

        alerts
    }
}

fn format_launch_offset(days: f64) -> String {
    if !days.is_finite() {
        return "unknown".to_string();
    }
    let rounded = days.round();
    if rounded < 0.0 {
        format!("{:.0} days ago", -rounded)
    } else {
        format!("in {:.0} days", rounded.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{campaign, days_ago, days_ahead, now};

    fn pre_launch(
        id: &str,
        stage: LifecycleStage,
        age_days: i64,
        readiness: u8,
        launch_in: Option<i64>,
    ) -> Campaign {
        let mut builder = campaign(id, format!("Campaign {id}").as_str(), "search")
            .lifecycle_stage(stage)
            .readiness_percent(readiness)
            .created_date(days_ago(age_days));
        if let Some(days) = launch_in {
            builder = builder.target_launch_date(days_ahead(days));
        }
        builder.build().unwrap()
    }

    fn run(campaigns: &[Campaign]) -> Vec<CategorizedAlert> {
        LifecycleStallDetector.detect(&DetectionContext::new(campaigns, now()))
    }

    #[test]
    fn urgent_development_stall_is_critical() {
        let campaigns = vec![pre_launch("d1", LifecycleStage::Development, 40, 40, Some(5))];
        let alerts = run(&campaigns);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "ls-urgent-development");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].affected_campaign_ids, vec!["d1"]);
        assert_eq!(alerts[0].metrics[1].value, "40%");
        assert_eq!(alerts[0].metrics[2].value, "in 5 days");
    }

    #[test]
    fn distant_launch_is_a_warning() {
        let campaigns = vec![pre_launch("p1", LifecycleStage::Planning, 40, 20, Some(60))];
        let alerts = run(&campaigns);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "ls-stall-planning");
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        // 40 days old against 21 expected.
        assert_eq!(alerts[0].metrics[1].value, "19");
    }

    #[test]
    fn missing_launch_date_is_never_urgent() {
        let campaigns = vec![pre_launch("i1", LifecycleStage::Ideation, 30, 10, None)];
        let alerts = run(&campaigns);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "ls-stall-ideation");
    }

    #[test]
    fn missing_created_date_is_never_stalled() {
        let mut c = pre_launch("i1", LifecycleStage::Ideation, 30, 10, Some(3));
        c.created_date = None;
        assert!(run(&[c]).is_empty());
    }

    #[test]
    fn within_grace_period_is_not_stalled() {
        // Development expects 28 days, plus 7 of grace.
        let campaigns = vec![pre_launch("d1", LifecycleStage::Development, 35, 10, Some(5))];
        assert!(run(&campaigns).is_empty());
    }

    #[test]
    fn ready_campaigns_are_not_stalled() {
        let campaigns = vec![pre_launch("q1", LifecycleStage::QaReady, 60, 70, Some(2))];
        assert!(run(&campaigns).is_empty());
    }

    #[test]
    fn launched_stages_are_ignored() {
        let campaigns = vec![pre_launch("a1", LifecycleStage::Launching, 200, 0, Some(2))];
        assert!(run(&campaigns).is_empty());
    }

    #[test]
    fn recently_missed_launch_is_still_urgent() {
        let campaigns = vec![pre_launch("q1", LifecycleStage::QaReady, 30, 50, Some(-3))];
        let alerts = run(&campaigns);
        assert_eq!(alerts[0].id, "ls-urgent-qa_ready");
        assert_eq!(alerts[0].metrics[2].value, "3 days ago");
    }

    #[test]
    fn long_missed_launch_is_not_urgent() {
        let campaigns = vec![pre_launch("q1", LifecycleStage::QaReady, 30, 50, Some(-7))];
        let alerts = run(&campaigns);
        assert_eq!(alerts[0].id, "ls-stall-qa_ready");
    }

    #[test]
    fn launch_two_weeks_out_is_not_urgent() {
        let campaigns = vec![pre_launch("d1", LifecycleStage::Development, 40, 40, Some(14))];
        let alerts = run(&campaigns);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "ls-stall-development");
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn launch_just_inside_two_weeks_is_urgent() {
        let campaigns = vec![pre_launch("d1", LifecycleStage::Development, 40, 40, Some(13))];
        assert_eq!(run(&campaigns)[0].id, "ls-urgent-development");
    }

    #[test]
    fn stage_splits_into_urgent_and_remaining() {
        let campaigns = vec![
            pre_launch("d1", LifecycleStage::Development, 40, 40, Some(5)),
            pre_launch("d2", LifecycleStage::Development, 50, 30, Some(90)),
            pre_launch("p1", LifecycleStage::Planning, 45, 20, None),
        ];
        let ids: Vec<_> = run(&campaigns).into_iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec!["ls-stall-planning", "ls-urgent-development", "ls-stall-development"]
        );
    }

    #[test]
    fn format_launch_offset_handles_unknown() {
        assert_eq!(format_launch_offset(f64::INFINITY), "unknown");
        assert_eq!(format_launch_offset(0.2), "in 0 days");
    }
}
