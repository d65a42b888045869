//! Campaign records consumed by the alert engine.
//!
//! Campaigns are owned by the caller and only ever read by the detectors.
//! The stage enums carry the fixed benchmark tables the detectors use:
//! - [`LifecycleStage::expected_days`]: expected time spent in each stage
//! - [`LifecycleStage::weekly_pace`]: expected budget fraction spent per week
//! - [`FunnelStage::roas_benchmark`]: healthy ROAS range per funnel stage

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{AlertError, Result};

/// Position of a campaign's audience in the marketing funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    /// Top of funnel, reach and recall.
    Awareness,
    /// Prospects evaluating the offer.
    Consideration,
    /// Bottom of funnel, purchase intent.
    Conversion,
    /// Existing customers.
    Retention,
}

impl FunnelStage {
    /// All funnel stages, top to bottom.
    pub const ALL: [Self; 4] = [
        Self::Awareness,
        Self::Consideration,
        Self::Conversion,
        Self::Retention,
    ];

    /// Returns the stage identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Awareness => "awareness",
            Self::Consideration => "consideration",
            Self::Conversion => "conversion",
            Self::Retention => "retention",
        }
    }

    /// Returns the healthy ROAS range for campaigns in this stage.
    #[must_use]
    pub const fn roas_benchmark(&self) -> RoasBenchmark {
        match self {
            Self::Awareness => RoasBenchmark::new(0.5, 2.5),
            Self::Consideration => RoasBenchmark::new(1.0, 3.5),
            Self::Conversion => RoasBenchmark::new(2.0, 5.0),
            Self::Retention => RoasBenchmark::new(3.0, 7.0),
        }
    }
}

impl std::fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive ROAS range considered healthy for a funnel stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoasBenchmark {
    /// Lowest acceptable ROAS.
    pub min: f64,
    /// Highest ROAS before the stage looks over-optimized.
    pub max: f64,
}

impl RoasBenchmark {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// A campaign's production/operational phase.
///
/// Variants are declared in lifecycle order, so `Ord` follows the
/// progression from ideation to closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Concept being explored.
    Ideation,
    /// Plan and budget being drafted.
    Planning,
    /// Creative and targeting under construction.
    Development,
    /// Built and waiting on QA sign-off.
    QaReady,
    /// Going live.
    Launching,
    /// Running in market.
    Active,
    /// Winding down.
    Closing,
}

impl LifecycleStage {
    /// All lifecycle stages in progression order.
    pub const ALL: [Self; 7] = [
        Self::Ideation,
        Self::Planning,
        Self::Development,
        Self::QaReady,
        Self::Launching,
        Self::Active,
        Self::Closing,
    ];

    /// Returns the stage identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ideation => "ideation",
            Self::Planning => "planning",
            Self::Development => "development",
            Self::QaReady => "qa_ready",
            Self::Launching => "launching",
            Self::Active => "active",
            Self::Closing => "closing",
        }
    }

    /// Number of days a campaign is expected to spend in this stage.
    #[must_use]
    pub const fn expected_days(&self) -> u32 {
        match self {
            Self::Ideation => 14,
            Self::Planning => 21,
            Self::Development => 28,
            Self::QaReady => 7,
            Self::Launching => 14,
            Self::Active => 90,
            Self::Closing => 14,
        }
    }

    /// Expected fraction of budget spent per week, for stages that spend.
    #[must_use]
    pub const fn weekly_pace(&self) -> Option<f64> {
        match self {
            Self::Launching => Some(0.15),
            Self::Active => Some(0.04),
            Self::Closing => Some(0.20),
            Self::Ideation | Self::Planning | Self::Development | Self::QaReady => None,
        }
    }

    /// Returns true for stages before launch work starts.
    #[must_use]
    pub const fn is_pre_launch(&self) -> bool {
        matches!(
            self,
            Self::Ideation | Self::Planning | Self::Development | Self::QaReady
        )
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery status of a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Delivering normally.
    #[default]
    Active,
    /// Delivery paused by the owner.
    Paused,
    /// Delivering but flagged by its owner.
    AtRisk,
}

impl CampaignStatus {
    /// Returns the status identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::AtRisk => "at_risk",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One marketing campaign in the portfolio snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// Stable unique identifier.
    pub id: String,
    /// Free-text label, used for lexical clustering.
    pub name: String,
    /// Channel identifier (search, social, display, email, ...).
    pub channel: String,
    /// Funnel stage the campaign targets.
    pub funnel_stage: FunnelStage,
    /// Current lifecycle stage.
    pub lifecycle_stage: LifecycleStage,
    /// Delivery status.
    pub status: CampaignStatus,
    /// Allocated budget.
    #[serde(default)]
    pub budget: f64,
    /// Amount spent so far. May exceed `budget`.
    #[serde(default)]
    pub spent: f64,
    /// Return on ad spend multiplier.
    #[serde(default)]
    pub roas: f64,
    /// Launch readiness score, 0-100.
    #[serde(default)]
    pub readiness_percent: u8,
    /// When the campaign was created.
    #[serde(default, deserialize_with = "lenient_date")]
    pub created_date: Option<DateTime<Utc>>,
    /// Planned launch date; may lie in the past.
    #[serde(default, deserialize_with = "lenient_date")]
    pub target_launch_date: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Maximum readiness score.
    pub const MAX_READINESS: u8 = 100;

    /// Creates a new campaign builder.
    pub fn builder(
        id: impl Into<String>,
        name: impl Into<String>,
        channel: impl Into<String>,
    ) -> CampaignBuilder {
        CampaignBuilder::new(id, name, channel)
    }

    /// Fraction of budget spent, zero when there is no budget.
    #[must_use]
    pub fn spend_ratio(&self) -> f64 {
        if self.budget > 0.0 {
            self.spent / self.budget
        } else {
            0.0
        }
    }

    /// Revenue attributed to this campaign (`spent * roas`).
    #[must_use]
    pub fn revenue(&self) -> f64 {
        self.spent * self.roas
    }

    /// Checks the record against the data model.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidCampaign` if the id is empty, readiness
    /// exceeds 100, or a monetary field is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(AlertError::invalid_campaign(&self.id, "id cannot be empty"));
        }

        if self.readiness_percent > Self::MAX_READINESS {
            return Err(AlertError::invalid_campaign(
                &self.id,
                format!(
                    "readiness {} exceeds {}",
                    self.readiness_percent,
                    Self::MAX_READINESS
                ),
            ));
        }

        for (field, value) in [
            ("budget", self.budget),
            ("spent", self.spent),
            ("roas", self.roas),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AlertError::invalid_campaign(
                    &self.id,
                    format!("{field} must be a finite non-negative number, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for [`Campaign`] records.
#[derive(Debug)]
pub struct CampaignBuilder {
    campaign: Campaign,
}

impl CampaignBuilder {
    fn new(id: impl Into<String>, name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            campaign: Campaign {
                id: id.into(),
                name: name.into(),
                channel: channel.into(),
                funnel_stage: FunnelStage::Awareness,
                lifecycle_stage: LifecycleStage::Active,
                status: CampaignStatus::Active,
                budget: 0.0,
                spent: 0.0,
                roas: 0.0,
                readiness_percent: 0,
                created_date: None,
                target_launch_date: None,
            },
        }
    }

    /// Sets the funnel stage.
    #[must_use]
    pub const fn funnel_stage(mut self, stage: FunnelStage) -> Self {
        self.campaign.funnel_stage = stage;
        self
    }

    /// Sets the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(mut self, stage: LifecycleStage) -> Self {
        self.campaign.lifecycle_stage = stage;
        self
    }

    /// Sets the delivery status.
    #[must_use]
    pub const fn status(mut self, status: CampaignStatus) -> Self {
        self.campaign.status = status;
        self
    }

    /// Sets the allocated budget.
    #[must_use]
    pub const fn budget(mut self, budget: f64) -> Self {
        self.campaign.budget = budget;
        self
    }

    /// Sets the amount spent.
    #[must_use]
    pub const fn spent(mut self, spent: f64) -> Self {
        self.campaign.spent = spent;
        self
    }

    /// Sets the ROAS multiplier.
    #[must_use]
    pub const fn roas(mut self, roas: f64) -> Self {
        self.campaign.roas = roas;
        self
    }

    /// Sets the readiness score.
    #[must_use]
    pub const fn readiness_percent(mut self, readiness: u8) -> Self {
        self.campaign.readiness_percent = readiness;
        self
    }

    /// Sets the creation date.
    #[must_use]
    pub fn created_date(mut self, date: DateTime<Utc>) -> Self {
        self.campaign.created_date = Some(date);
        self
    }

    /// Sets the target launch date.
    #[must_use]
    pub fn target_launch_date(mut self, date: DateTime<Utc>) -> Self {
        self.campaign.target_launch_date = Some(date);
        self
    }

    /// Builds the [`Campaign`].
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidCampaign` if the record fails
    /// [`Campaign::validate`].
    pub fn build(self) -> Result<Campaign> {
        self.campaign.validate()?;
        Ok(self.campaign)
    }
}

/// Reads an RFC 3339 timestamp or a `YYYY-MM-DD` calendar date (midnight
/// UTC). Anything else, including non-string values, becomes `None`.
fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match &raw {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => parse_date(s),
        Some(_) => None,
    };

    if parsed.is_none() {
        if let Some(value) = &raw {
            warn!(value = %value, "ignoring unparseable campaign date");
        }
    }

    Ok(parsed)
}

/// Parses a campaign date string, `None` if it is neither RFC 3339 nor a
/// calendar date.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = day.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Parses a JSON array of campaign records and validates each one.
///
/// Missing monetary fields default to zero and unreadable dates to `None`,
/// so the detectors treat them as "no signal".
///
/// # Errors
///
/// Returns `AlertError::SerializationError` for malformed JSON or unknown
/// stage/status values, and `AlertError::InvalidCampaign` for the first
/// record that fails validation.
pub fn campaigns_from_json(json: &str) -> Result<Vec<Campaign>> {
    let campaigns: Vec<Campaign> = serde_json::from_str(json)?;

    for campaign in &campaigns {
        if let Err(e) = campaign.validate() {
            warn!(campaign_id = %campaign.id, error = %e, "rejected campaign snapshot");
            return Err(e);
        }
    }

    Ok(campaigns)
}
