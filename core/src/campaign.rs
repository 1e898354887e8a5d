//! Campaign and prize evaluation.
//!
//! Three record kinds, each evaluated against the transaction table:
//!   * point campaign: points inside an inclusive date range, plus a bonus
//!     percentage, against a flat goal. Grouped by consolidated key.
//!   * season prize: points inside one season against a flat goal.
//!   * store growth campaign: store points in a date range against the
//!     store's points in a base season over the same calendar months,
//!     grown by a percentage. Stores with no base use a minimum guarantee.
//!
//! Evaluation is pure. The records themselves are persisted by
//! `store::CampaignStore`.

use crate::{
    error::{ReportError, ReportResult},
    evolution::{growth_ratio, signed_percent},
    transaction::{months_spanned, Scope, TransactionRow, TransactionTable},
    types::{EntityKey, Points, Season},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Finished,
}

impl CampaignStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Finished,
            Self::Finished => Self::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> ReportResult<Self> {
        match value {
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            other => Err(ReportError::InvalidStoredValue {
                column: "status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeStatus {
    Active,
    Paused,
}

impl PrizeStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Paused,
            Self::Paused => Self::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }

    pub fn parse(value: &str) -> ReportResult<Self> {
        match value {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            other => Err(ReportError::InvalidStoredValue {
                column: "status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCampaign {
    pub id: String,
    pub title: String,
    /// Free-form prize label ("Trip", "Voucher").
    pub kind: String,
    pub goal: Points,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bonus_pct: f64,
    pub description: String,
    pub status: CampaignStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonPrize {
    pub id: String,
    pub title: String,
    pub season: Season,
    pub goal: Points,
    pub description: String,
    pub status: PrizeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreGrowthCampaign {
    pub id: String,
    pub title: String,
    /// Required growth in percent (10.0 = +10%).
    pub growth_pct: f64,
    /// Base used for stores with no points in the base season.
    pub min_guarantee: Points,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub current_season: Season,
    pub prior_season: Season,
    pub description: String,
    pub status: CampaignStatus,
}

/// Reject ranges that end before they start.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> ReportResult<()> {
    if end < start {
        return Err(ReportError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

// ── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignWinner {
    pub key: EntityKey,
    pub names: Vec<String>,
    pub documents: Vec<String>,
    pub realized: Points,
    pub bonus: Points,
    pub total: Points,
    pub goal_met: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampaignProgress {
    pub realized: Points,
    pub bonus_adjusted: Points,
    pub goal_met: bool,
    /// bonus_adjusted / goal clamped to [0, 1]; 1.0 for a zero goal.
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthRule {
    /// Base is the store's own base-season points.
    PriorSeason,
    /// Store had nothing in the base season; base is the minimum guarantee.
    MinimumGuarantee,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCampaignResult {
    pub store: String,
    pub segment: String,
    pub current: Points,
    pub prior: Points,
    /// prior, or the minimum guarantee under `GrowthRule::MinimumGuarantee`.
    pub base: Points,
    pub target: Points,
    pub rule: GrowthRule,
    /// "new" for minimum-guarantee stores, otherwise "+12.5%" style.
    pub growth_label: String,
    /// Distinct consolidated keys with rows in the campaign window.
    pub active_entities: usize,
    pub goal_met: bool,
}

// ── Evaluation ───────────────────────────────────────────────────────────────

fn in_range(row: &TransactionRow, start: NaiveDate, end: NaiveDate) -> bool {
    row.date >= start && row.date <= end
}

#[derive(Default)]
struct Tally<'a> {
    points: Points,
    names: BTreeSet<&'a str>,
    documents: BTreeSet<&'a str>,
}

fn tally_by_consolidated<'a, I>(rows: I) -> BTreeMap<&'a str, Tally<'a>>
where
    I: IntoIterator<Item = &'a TransactionRow>,
{
    let mut groups: BTreeMap<&str, Tally> = BTreeMap::new();
    for row in rows {
        let tally = groups.entry(row.consolidated_key.as_str()).or_default();
        tally.points += row.points;
        tally.names.insert(&row.entity_name);
        tally.documents.insert(&row.entity_id);
    }
    groups
}

fn bonus_of(points: Points, bonus_pct: f64) -> Points {
    points * (bonus_pct / 100.0)
}

/// Every consolidated key with rows in the campaign window whose
/// bonus-adjusted total reaches the goal, highest total first.
pub fn evaluate_point_campaign(
    table: &TransactionTable,
    scope: &Scope,
    campaign: &PointCampaign,
) -> Vec<CampaignWinner> {
    let rows = table
        .scoped(scope)
        .filter(|r| in_range(r, campaign.start, campaign.end));

    let mut winners: Vec<CampaignWinner> = tally_by_consolidated(rows)
        .into_iter()
        .map(|(key, tally)| {
            let bonus = bonus_of(tally.points, campaign.bonus_pct);
            let total = tally.points + bonus;
            CampaignWinner {
                key: key.to_string(),
                names: tally.names.iter().map(|n| n.to_string()).collect(),
                documents: tally.documents.iter().map(|d| d.to_string()).collect(),
                realized: tally.points,
                bonus,
                total,
                goal_met: total >= campaign.goal,
            }
        })
        .filter(|w| w.goal_met)
        .collect();
    winners.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));

    log::info!(
        "campaign={} winners={} window={}..={}",
        campaign.title,
        winners.len(),
        campaign.start,
        campaign.end
    );
    winners
}

/// Progress of one row subset (typically one entity) in a point campaign.
pub fn campaign_progress<'a, I>(rows: I, campaign: &PointCampaign) -> CampaignProgress
where
    I: IntoIterator<Item = &'a TransactionRow>,
{
    let realized: Points = rows
        .into_iter()
        .filter(|r| in_range(r, campaign.start, campaign.end))
        .map(|r| r.points)
        .sum();
    let bonus_adjusted = realized + bonus_of(realized, campaign.bonus_pct);
    CampaignProgress {
        realized,
        bonus_adjusted,
        goal_met: bonus_adjusted >= campaign.goal,
        progress: if campaign.goal > 0.0 {
            (bonus_adjusted / campaign.goal).clamp(0.0, 1.0)
        } else {
            1.0
        },
    }
}

/// Consolidated keys whose points in the prize season reach the goal,
/// highest first. Prizes carry no bonus, so realized == total.
pub fn evaluate_prize(
    table: &TransactionTable,
    scope: &Scope,
    prize: &SeasonPrize,
) -> Vec<CampaignWinner> {
    let mut winners: Vec<CampaignWinner> = tally_by_consolidated(table.season_rows(prize.season, scope))
        .into_iter()
        .filter(|(_, tally)| tally.points >= prize.goal)
        .map(|(key, tally)| CampaignWinner {
            key: key.to_string(),
            names: tally.names.iter().map(|n| n.to_string()).collect(),
            documents: tally.documents.iter().map(|d| d.to_string()).collect(),
            realized: tally.points,
            bonus: 0.0,
            total: tally.points,
            goal_met: true,
        })
        .collect();
    winners.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    winners
}

/// Progress of one row subset toward a season prize.
pub fn prize_progress<'a, I>(rows: I, prize: &SeasonPrize) -> CampaignProgress
where
    I: IntoIterator<Item = &'a TransactionRow>,
{
    let realized: Points = rows
        .into_iter()
        .filter(|r| r.season == prize.season && r.has_season())
        .map(|r| r.points)
        .sum();
    CampaignProgress {
        realized,
        bonus_adjusted: realized,
        goal_met: realized >= prize.goal,
        progress: if prize.goal > 0.0 {
            (realized / prize.goal).clamp(0.0, 1.0)
        } else {
            1.0
        },
    }
}

/// Every store with rows in the campaign window of the current season,
/// with its base, target and outcome. Sorted by segment, then by active
/// entities descending, then store.
pub fn evaluate_store_campaign(
    table: &TransactionTable,
    scope: &Scope,
    campaign: &StoreGrowthCampaign,
) -> Vec<StoreCampaignResult> {
    let growth = campaign.growth_pct / 100.0;
    let months = months_spanned(campaign.start, campaign.end);
    let segments = table.store_segments();

    let mut current: BTreeMap<&str, (Points, BTreeSet<&str>)> = BTreeMap::new();
    for row in table
        .season_rows(campaign.current_season, scope)
        .filter(|r| in_range(r, campaign.start, campaign.end))
    {
        let entry = current.entry(row.store.as_str()).or_default();
        entry.0 += row.points;
        entry.1.insert(&row.consolidated_key);
    }

    let mut prior: BTreeMap<&str, Points> = BTreeMap::new();
    for row in table
        .season_rows(campaign.prior_season, scope)
        .filter(|r| months.contains(&r.month))
    {
        *prior.entry(row.store.as_str()).or_default() += row.points;
    }

    let mut results: Vec<StoreCampaignResult> = current
        .into_iter()
        .map(|(store, (points, entities))| {
            let prior_points = prior.get(store).copied().unwrap_or(0.0);
            let (base, rule, label) = if prior_points == 0.0 {
                (campaign.min_guarantee, GrowthRule::MinimumGuarantee, "new".to_string())
            } else {
                (
                    prior_points,
                    GrowthRule::PriorSeason,
                    signed_percent(growth_ratio(points, prior_points)),
                )
            };
            let target = base * (1.0 + growth);
            StoreCampaignResult {
                store: store.to_string(),
                segment: segments.get(store).cloned().unwrap_or_default(),
                current: points,
                prior: prior_points,
                base,
                target,
                rule,
                growth_label: label,
                active_entities: entities.len(),
                goal_met: points >= target,
            }
        })
        .collect();
    results.sort_by(|a, b| {
        a.segment
            .cmp(&b.segment)
            .then_with(|| b.active_entities.cmp(&a.active_entities))
            .then_with(|| a.store.cmp(&b.store))
    });

    log::info!(
        "store campaign={} stores={} met={}",
        campaign.title,
        results.len(),
        results.iter().filter(|r| r.goal_met).count()
    );
    results
}

/// Stores that met the growth target.
pub fn store_campaign_winners(
    table: &TransactionTable,
    scope: &Scope,
    campaign: &StoreGrowthCampaign,
) -> Vec<StoreCampaignResult> {
    evaluate_store_campaign(table, scope, campaign)
        .into_iter()
        .filter(|r| r.goal_met)
        .collect()
}
