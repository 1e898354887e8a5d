//! Role reports: admin, store and architect views assembled from the
//! analytics components.
//!
//! Reports are plain serde records. Everything is recomputed from the table
//! on each call; caching is the engine's job.
//!
//! Rankings inside reports are like-for-like: both seasons are ranked over
//! the months present in the current season of the report's scope.

use crate::{
    aggregate::{
        entity_performance, monthly_pivots, season_history, segment_analysis, MonthlyPivots,
        SeasonSummary, SegmentActivity,
    },
    campaign::{
        campaign_progress, evaluate_point_campaign, evaluate_prize, evaluate_store_campaign,
        prize_progress, CampaignProgress, CampaignStatus, CampaignWinner, PointCampaign,
        PrizeStatus, SeasonPrize, StoreCampaignResult, StoreGrowthCampaign,
    },
    config::ReportConfig,
    error::ReportResult,
    like_for_like::{
        compare, compare_by_segment, compare_entities, compare_stores, compare_tiers,
        current_months, store_kpis, Comparison, EntityComparison, Metric, SegmentBreakdown,
        StoreComparison, StoreKpis, TierComparison,
    },
    rank::{compare_ranks, RankComparison, RankRow},
    retention::{
        active_inactive, registration_status, retention_detail, ActivityStatus, RegistrationStatus,
        RetentionDetail, SeasonRetention,
    },
    store::CampaignStore,
    tier::{Tier, TierStatus},
    transaction::{GroupKey, Scope, TransactionTable},
    types::{previous_season, season_label, EntityKey, Points, Season},
};
use serde::{Deserialize, Serialize};

/// Campaign and prize records for one report call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignBook {
    pub point_campaigns: Vec<PointCampaign>,
    pub prizes: Vec<SeasonPrize>,
    pub store_campaigns: Vec<StoreGrowthCampaign>,
}

impl CampaignBook {
    pub fn from_store(store: &CampaignStore) -> ReportResult<Self> {
        Ok(Self {
            point_campaigns: store.list_point_campaigns()?,
            prizes: store.list_prizes()?,
            store_campaigns: store.list_store_campaigns()?,
        })
    }

    fn active_point_campaigns(&self) -> impl Iterator<Item = &PointCampaign> {
        self.point_campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Active)
    }

    fn active_prizes(&self, season: Season) -> impl Iterator<Item = &SeasonPrize> {
        self.prizes
            .iter()
            .filter(move |p| p.status == PrizeStatus::Active && p.season == season)
    }

    fn active_store_campaigns(&self) -> impl Iterator<Item = &StoreGrowthCampaign> {
        self.store_campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Active)
    }
}

// ── Shared blocks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiLine {
    pub metric: Metric,
    pub comparison: Comparison,
    /// "12.5% ↑↑", "0.0% ≈" or "N/A".
    pub display: String,
}

fn kpi_lines(
    table: &TransactionTable,
    season: Season,
    scope: &Scope,
    dead_band: f64,
) -> Vec<KpiLine> {
    let prior = previous_season(season).unwrap_or(0);
    [
        Metric::Points,
        Metric::Orders,
        Metric::NewRegistrations,
        Metric::ActiveEntities,
    ]
    .into_iter()
    .map(|metric| {
        let comparison = compare(table, season, prior, scope, metric);
        KpiLine {
            metric,
            display: comparison.display(dead_band),
            comparison,
        }
    })
    .collect()
}

/// Rank comparison where both seasons cover the current season's months.
fn like_for_like_ranking(
    table: &TransactionTable,
    season: Season,
    scope: &Scope,
    group_key: GroupKey,
) -> RankComparison {
    let months = current_months(table, season, scope);
    let scope = Scope {
        months: Some(months),
        ..scope.clone()
    };
    compare_ranks(table, season, previous_season(season).unwrap_or(0), &scope, group_key)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCampaignOutcome {
    pub campaign: PointCampaign,
    pub winners: Vec<CampaignWinner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeOutcome {
    pub prize: SeasonPrize,
    pub winners: Vec<CampaignWinner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCampaignOutcome {
    pub campaign: StoreGrowthCampaign,
    pub results: Vec<StoreCampaignResult>,
}

impl StoreCampaignOutcome {
    pub fn winners(&self) -> impl Iterator<Item = &StoreCampaignResult> {
        self.results.iter().filter(|r| r.goal_met)
    }
}

// ── Admin ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminReport {
    pub program_name: String,
    pub season: Season,
    pub season_label: String,
    pub kpis: Vec<KpiLine>,
    pub segments: Option<SegmentBreakdown>,
    pub tiers: Vec<TierComparison>,
    pub history: Vec<SeasonSummary>,
    pub monthly: MonthlyPivots,
    pub retention: Vec<SeasonRetention>,
    pub ranking: RankComparison,
    pub top_entities: Vec<EntityComparison>,
    /// Every store, current season against the restricted prior.
    pub stores: Vec<StoreComparison>,
    pub registrations: Vec<RegistrationStatus>,
    pub point_campaigns: Vec<PointCampaignOutcome>,
    pub prizes: Vec<PrizeOutcome>,
    pub store_campaigns: Vec<StoreCampaignOutcome>,
}

pub fn admin_report(
    table: &TransactionTable,
    config: &ReportConfig,
    book: &CampaignBook,
    season: Season,
    top: usize,
) -> AdminReport {
    let scope = Scope::all();
    let ladder = config.ladder();
    let group_key = config.group_key();
    let prior = previous_season(season).unwrap_or(0);

    let mut top_entities = compare_entities(table, season, prior, &scope, group_key, &ladder);
    top_entities.truncate(top);

    let report = AdminReport {
        program_name: config.settings.program_name.clone(),
        season,
        season_label: season_label(season),
        kpis: kpi_lines(table, season, &scope, config.dead_band()),
        segments: compare_by_segment(table, season, prior, &scope),
        tiers: compare_tiers(table, season, prior, &scope, group_key, &ladder),
        history: season_history(table, &scope),
        monthly: monthly_pivots(table, &scope, &recent_seasons(season)),
        retention: active_inactive(table, &scope, group_key).seasons,
        ranking: like_for_like_ranking(table, season, &scope, group_key),
        top_entities,
        stores: compare_stores(table, season, prior, &scope),
        registrations: registration_status(table),
        point_campaigns: book
            .active_point_campaigns()
            .map(|c| PointCampaignOutcome {
                winners: evaluate_point_campaign(table, &scope, c),
                campaign: c.clone(),
            })
            .collect(),
        prizes: book
            .active_prizes(season)
            .map(|p| PrizeOutcome {
                winners: evaluate_prize(table, &scope, p),
                prize: p.clone(),
            })
            .collect(),
        store_campaigns: book
            .active_store_campaigns()
            .map(|c| StoreCampaignOutcome {
                results: evaluate_store_campaign(table, &scope, c),
                campaign: c.clone(),
            })
            .collect(),
    };
    log::info!(
        "season={season} admin report: {} kpis, {} ranked, {} campaigns",
        report.kpis.len(),
        report.ranking.rows.len(),
        report.point_campaigns.len() + report.store_campaigns.len()
    );
    report
}

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReport {
    pub stores: Vec<String>,
    pub season: Season,
    pub season_label: String,
    pub kpis: StoreKpis,
    pub evolution: Vec<KpiLine>,
    pub segments: Option<SegmentBreakdown>,
    pub tiers: Vec<TierComparison>,
    pub entities: Vec<EntityComparison>,
    pub ranking: RankComparison,
    pub monthly: MonthlyPivots,
    pub retention: Vec<SeasonRetention>,
    /// Entities that scored before but not in `season`.
    pub inactive: Vec<RetentionDetail>,
    pub store_campaigns: Vec<StoreCampaignOutcome>,
}

pub fn store_report(
    table: &TransactionTable,
    config: &ReportConfig,
    book: &CampaignBook,
    stores: &[String],
    season: Season,
) -> StoreReport {
    let scope = Scope::all().with_stores(stores.iter().cloned());
    let ladder = config.ladder();
    let group_key = config.group_key();
    let prior = previous_season(season).unwrap_or(0);

    let inactive = retention_detail(table, &scope, season, group_key)
        .into_iter()
        .filter(|d| d.status == ActivityStatus::Inactive)
        .collect();

    let store_campaigns = book
        .active_store_campaigns()
        .map(|c| StoreCampaignOutcome {
            results: evaluate_store_campaign(table, &scope, c),
            campaign: c.clone(),
        })
        .collect();

    StoreReport {
        stores: stores.to_vec(),
        season,
        season_label: season_label(season),
        kpis: store_kpis(table, &scope, season),
        evolution: kpi_lines(table, season, &scope, config.dead_band()),
        segments: compare_by_segment(table, season, prior, &scope),
        tiers: compare_tiers(table, season, prior, &scope, group_key, &ladder),
        entities: compare_entities(table, season, prior, &scope, group_key, &ladder),
        ranking: like_for_like_ranking(table, season, &scope, group_key),
        monthly: monthly_pivots(table, &scope, &recent_seasons(season)),
        retention: active_inactive(table, &scope, group_key).seasons,
        inactive,
        store_campaigns,
    }
}

// ── Architect ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCard {
    pub status: TierStatus,
    pub label: String,
    pub next_label: Option<String>,
    pub progress: f64,
    pub points_to_next: Option<Points>,
}

impl TierCard {
    fn from_status(status: TierStatus) -> Self {
        Self {
            label: status.tier.display_name().to_string(),
            next_label: status.next_tier.map(|t: Tier| t.display_name().to_string()),
            progress: status.progress(),
            points_to_next: status.points_to_next(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignCard {
    pub campaign: PointCampaign,
    pub progress: CampaignProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeCard {
    pub prize: SeasonPrize,
    pub progress: CampaignProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectReport {
    pub key: EntityKey,
    pub name: String,
    pub documents: Vec<String>,
    pub season: Season,
    pub season_label: String,
    pub tier: TierCard,
    pub evolution: KpiLine,
    pub history: Vec<SeasonSummary>,
    pub monthly: MonthlyPivots,
    /// Segments of `season` with their stores.
    pub segments: Vec<SegmentActivity>,
    /// `None` when the entity is not in either ranked season.
    pub rank: Option<RankRow>,
    pub prizes: Vec<PrizeCard>,
    pub campaigns: Vec<CampaignCard>,
}

/// Report for one architect. `key` may be a document or a consolidated key;
/// `None` when no row belongs to it.
pub fn architect_report(
    table: &TransactionTable,
    config: &ReportConfig,
    book: &CampaignBook,
    key: &str,
    season: Season,
) -> Option<ArchitectReport> {
    let group_key = config.group_key();
    let group = resolve_key(table, group_key, key)?;
    let scope = Scope::all().with_entities_by(group_key, [group.clone()]);
    let ladder = config.ladder();
    let prior = previous_season(season).unwrap_or(0);

    let performance = entity_performance(table, &scope, Some(season), group_key, &ladder)
        .into_iter()
        .find(|p| p.key == group);
    let points = performance.as_ref().map_or(0.0, |p| p.points);
    let documents = performance
        .as_ref()
        .map(|p| p.documents.clone())
        .unwrap_or_else(|| vec![key.to_string()]);
    let name = table.display_name(group_key, &group).unwrap_or(key).to_string();

    let comparison = compare(table, season, prior, &scope, Metric::Points);
    let evolution = KpiLine {
        metric: Metric::Points,
        display: comparison.display(config.dead_band()),
        comparison,
    };

    let rank = like_for_like_ranking(table, season, &Scope::all(), group_key)
        .rows
        .into_iter()
        .find(|r| r.key == group);

    let entity_rows: Vec<_> = table.scoped(&scope).collect();
    let prizes = book
        .active_prizes(season)
        .map(|p| PrizeCard {
            progress: prize_progress(entity_rows.iter().copied(), p),
            prize: p.clone(),
        })
        .collect();
    let campaigns = book
        .active_point_campaigns()
        .map(|c| CampaignCard {
            progress: campaign_progress(entity_rows.iter().copied(), c),
            campaign: c.clone(),
        })
        .collect();

    Some(ArchitectReport {
        tier: TierCard::from_status(ladder.classify(points)),
        history: season_history(table, &scope),
        monthly: monthly_pivots(table, &scope, &recent_seasons(season)),
        segments: segment_analysis(table, season, &scope),
        key: group,
        name,
        documents,
        season,
        season_label: season_label(season),
        evolution,
        rank,
        prizes,
        campaigns,
    })
}

/// Group key of the rows identified by `key`. An exact match on the
/// grouping column wins over a match on the other identity column.
pub fn resolve_key(table: &TransactionTable, group_key: GroupKey, key: &str) -> Option<String> {
    let rows = table.rows();
    rows.iter()
        .find(|r| group_key.key_of(r) == key)
        .or_else(|| {
            rows.iter()
                .find(|r| r.entity_id == key || r.consolidated_key == key)
        })
        .map(|r| group_key.key_of(r).to_string())
}

fn recent_seasons(season: Season) -> Vec<Season> {
    match previous_season(season) {
        Some(prior) => vec![prior, season],
        None => vec![season],
    }
}
