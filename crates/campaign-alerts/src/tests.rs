//! Property-based tests over generated portfolios.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::*;

fn eval_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn funnel_stage() -> impl Strategy<Value = FunnelStage> {
    prop::sample::select(FunnelStage::ALL.to_vec())
}

fn lifecycle_stage() -> impl Strategy<Value = LifecycleStage> {
    prop::sample::select(LifecycleStage::ALL.to_vec())
}

fn status() -> impl Strategy<Value = CampaignStatus> {
    prop::sample::select(vec![
        CampaignStatus::Active,
        CampaignStatus::Paused,
        CampaignStatus::AtRisk,
    ])
}

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Brand Search Always On",
        "Retargeting Summer Promo",
        "Prospecting Lookalike",
        "Summer Sale Launch",
        "Holiday Promo Video",
        "Newsletter Loyalty",
        "Spring Awareness Push",
        "Conversion Boost",
    ])
    .prop_map(str::to_string)
}

fn channel() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["search", "social", "display", "email"]).prop_map(str::to_string)
}

fn day_offset() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(-120_i64..60)
}

prop_compose! {
    fn arb_campaign(index: usize)(
        name in name(),
        channel in channel(),
        funnel in funnel_stage(),
        lifecycle in lifecycle_stage(),
        status in status(),
        budget in 0.0_f64..120_000.0,
        spend_fraction in 0.0_f64..1.3,
        roas in 0.0_f64..8.0,
        readiness in 0_u8..=100,
        created in day_offset(),
        launch in day_offset(),
    ) -> Campaign {
        let now = eval_instant();
        Campaign {
            id: format!("c{index}"),
            name,
            channel,
            funnel_stage: funnel,
            lifecycle_stage: lifecycle,
            status,
            budget,
            spent: budget * spend_fraction,
            roas,
            readiness_percent: readiness,
            created_date: created.map(|d| now - Duration::days(d.abs())),
            target_launch_date: launch.map(|d| now + Duration::days(d)),
        }
    }
}

fn portfolio() -> impl Strategy<Value = Vec<Campaign>> {
    (0_usize..24).prop_flat_map(|len| {
        (0..len).map(arb_campaign).collect::<Vec<_>>()
    })
}

fn ids_with_prefix<'a>(alerts: &'a [CategorizedAlert], prefix: &str) -> HashSet<&'a str> {
    alerts
        .iter()
        .filter(|a| a.id.starts_with(prefix))
        .flat_map(|a| a.affected_campaign_ids.iter().map(String::as_str))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_evaluation_is_idempotent(campaigns in portfolio()) {
        let engine = AlertEngine::new();
        let first = engine.evaluate_at(&campaigns, eval_instant());
        let second = engine.evaluate_at(&campaigns, eval_instant());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_output_is_sorted(campaigns in portfolio()) {
        let alerts = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        for pair in alerts.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.severity.rank() <= b.severity.rank());
            if a.severity == b.severity {
                prop_assert!(a.affected_campaign_ids.len() >= b.affected_campaign_ids.len());
            }
        }
    }

    #[test]
    fn prop_every_alert_names_known_campaigns(campaigns in portfolio()) {
        let known: HashSet<&str> = campaigns.iter().map(|c| c.id.as_str()).collect();
        let alerts = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        for alert in &alerts {
            prop_assert!(!alert.affected_campaign_ids.is_empty());
            prop_assert_eq!(alert.timestamp, eval_instant());
            for id in &alert.affected_campaign_ids {
                prop_assert!(known.contains(id.as_str()));
            }
        }
    }

    #[test]
    fn prop_no_campaign_both_over_and_under_spending(campaigns in portfolio()) {
        let alerts = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        let over = ids_with_prefix(&alerts, "bp-overspend-");
        let under = ids_with_prefix(&alerts, "bp-underspend");
        prop_assert!(over.is_disjoint(&under));
    }

    #[test]
    fn prop_no_channel_both_dominant_and_undervalued(campaigns in portfolio()) {
        let alerts = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        let dominant: HashSet<&str> = alerts
            .iter()
            .filter_map(|a| a.id.strip_prefix("al-dominant-"))
            .collect();
        let undervalued: HashSet<&str> = alerts
            .iter()
            .filter_map(|a| a.id.strip_prefix("al-undervalued-"))
            .collect();
        prop_assert!(dominant.is_disjoint(&undervalued));
    }

    #[test]
    fn prop_alert_ids_are_unique(campaigns in portfolio()) {
        let alerts = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        let ids: HashSet<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        prop_assert_eq!(ids.len(), alerts.len());
    }

    #[test]
    fn prop_summary_matches_alerts(campaigns in portfolio()) {
        let alerts = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        let summary = AlertSummary::from_alerts(&alerts);
        prop_assert_eq!(summary.total, alerts.len());
        prop_assert_eq!(summary.critical + summary.warning + summary.info, alerts.len());
        prop_assert_eq!(summary.by_category.values().sum::<usize>(), alerts.len());
    }

    #[test]
    fn prop_cache_agrees_with_engine(campaigns in portfolio()) {
        let cache = AlertCache::default();
        let cached = cache.get_or_compute_at(&campaigns, eval_instant());
        let direct = AlertEngine::new().evaluate_at(&campaigns, eval_instant());
        prop_assert_eq!(cached, direct);
    }
}
