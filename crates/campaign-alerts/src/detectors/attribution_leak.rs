//! Attribution leak: channels whose revenue share is out of line with spend.
//!
//! Revenue is modelled as `spent * roas`. For each channel the disparity is
//! `revenue_share / spend_share`. A channel either looks dominant (it is
//! credited with far more revenue than its spend suggests) or undervalued
//! (far less), never both.

use std::collections::BTreeMap;

use tracing::debug;

use super::{format_currency, format_percent, AlertDraft, DetectionContext, Detector};
use crate::campaign::{Campaign, LifecycleStage};
use crate::types::{AlertCategory, AlertSeverity, CategorizedAlert};

/// Disparity above which a channel is over-credited.
const DOMINANT_DISPARITY: f64 = 1.5;
/// Disparity above which an over-credited channel is a warning, not info.
const DOMINANT_WARNING_DISPARITY: f64 = 2.0;
/// Disparity below which a channel is under-credited.
const UNDERVALUED_DISPARITY: f64 = 0.5;
/// Minimum spend for an under-credited channel to be worth flagging.
const UNDERVALUED_MIN_SPEND: f64 = 50_000.0;
/// Channels with fewer campaigns are too small to judge.
const MIN_CHANNEL_CAMPAIGNS: usize = 3;

/// Spend and revenue totals for one channel.
#[derive(Debug, Default)]
struct ChannelTotals<'a> {
    spend: f64,
    revenue: f64,
    campaigns: Vec<&'a Campaign>,
}

/// Share figures for one channel relative to the whole portfolio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelShare {
    /// Channel spend divided by total spend.
    pub spend_share: f64,
    /// Channel revenue divided by total revenue.
    pub revenue_share: f64,
    /// `revenue_share / spend_share`.
    pub disparity: f64,
}

/// Detects channels with disproportionate revenue attribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionLeakDetector;

impl AttributionLeakDetector {
    fn dominant_alert(
        channel: &str,
        totals: &ChannelTotals<'_>,
        share: ChannelShare,
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        let severity = if share.disparity > DOMINANT_WARNING_DISPARITY {
            AlertSeverity::Warning
        } else {
            AlertSeverity::Info
        };

        AlertDraft::new(
            format!("al-dominant-{channel}"),
            AlertCategory::AttributionLeak,
            severity,
        )
        .title(format!("{channel} is credited with outsized revenue"))
        .description(format!(
            "{channel} receives {} of attributed revenue on {} of spend ({:.1}x disparity).",
            format_percent(share.revenue_share),
            format_percent(share.spend_share),
            share.disparity
        ))
        .impact(
            "The attribution model may be over-crediting this channel and hiding the contribution of others.",
        )
        .recommendation(
            "Compare last-touch against data-driven or incrementality results before moving more budget here.",
        )
        .affected(totals.campaigns.iter().copied())
        .metric("Spend share", format_percent(share.spend_share))
        .metric("Revenue share", format_percent(share.revenue_share))
        .metric("Disparity", format!("{:.1}x", share.disparity))
        .finish(ctx.now)
    }

    fn undervalued_alert(
        channel: &str,
        totals: &ChannelTotals<'_>,
        share: ChannelShare,
        ctx: &DetectionContext<'_>,
    ) -> Option<CategorizedAlert> {
        AlertDraft::new(
            format!("al-undervalued-{channel}"),
            AlertCategory::AttributionLeak,
            AlertSeverity::Warning,
        )
        .title(format!("{channel} shows an attribution gap"))
        .description(format!(
            "{channel} accounts for {} of spend but only {} of attributed revenue.",
            format_percent(share.spend_share),
            format_percent(share.revenue_share)
        ))
        .impact(format!(
            "{} of spend may be driving conversions credited to other channels.",
            format_currency(totals.spend)
        ))
        .recommendation(
            "Review assisted conversions and view-through data for this channel before cutting its budget.",
        )
        .affected(totals.campaigns.iter().copied())
        .metric("Spend share", format_percent(share.spend_share))
        .metric("Revenue share", format_percent(share.revenue_share))
        .metric("Channel spend", format_currency(totals.spend))
        .finish(ctx.now)
    }
}

impl Detector for AttributionLeakDetector {
    fn category(&self) -> AlertCategory {
        AlertCategory::AttributionLeak
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<CategorizedAlert> {
        let mut channels: BTreeMap<&str, ChannelTotals<'_>> = BTreeMap::new();
        let mut total_spend = 0.0;
        let mut total_revenue = 0.0;

        for campaign in ctx
            .campaigns
            .iter()
            .filter(|c| c.lifecycle_stage != LifecycleStage::Closing)
        {
            let revenue = campaign.revenue();
            total_spend += campaign.spent;
            total_revenue += revenue;

            let totals = channels.entry(campaign.channel.as_str()).or_default();
            totals.spend += campaign.spent;
            totals.revenue += revenue;
            totals.campaigns.push(campaign);
        }

        if total_spend <= 0.0 || total_revenue <= 0.0 {
            return Vec::new();
        }

        let mut alerts = Vec::new();
        for (channel, totals) in &channels {
            if totals.campaigns.len() < MIN_CHANNEL_CAMPAIGNS {
                continue;
            }
            let Some(share) =
                channel_share(totals.spend, totals.revenue, total_spend, total_revenue)
            else {
                continue;
            };

            if share.disparity > DOMINANT_DISPARITY {
                alerts.extend(Self::dominant_alert(channel, totals, share, ctx));
            } else if share.disparity < UNDERVALUED_DISPARITY
                && totals.spend > UNDERVALUED_MIN_SPEND
            {
                alerts.extend(Self::undervalued_alert(channel, totals, share, ctx));
            }
        }

        debug!(
            channels = channels.len(),
            alerts = alerts.len(),
            "attribution leak scan complete"
        );

        alerts
    }
}

/// Computes a channel's share figures, `None` when any share is undefined.
#[must_use]
pub fn channel_share(
    channel_spend: f64,
    channel_revenue: f64,
    total_spend: f64,
    total_revenue: f64,
) -> Option<ChannelShare> {
    if total_spend <= 0.0 || total_revenue <= 0.0 {
        return None;
    }

    let spend_share = channel_spend / total_spend;
    if spend_share <= 0.0 {
        return None;
    }

    let revenue_share = channel_revenue / total_revenue;
    let disparity = revenue_share / spend_share;
    disparity.is_finite().then_some(ChannelShare {
        spend_share,
        revenue_share,
        disparity,
    })
}
