//! Like-for-like season comparison.
//!
//! RULE: a season is never compared with the full previous season. The
//! previous season is restricted to the calendar months present in the
//! current season (within the same scope) before anything is summed. A
//! current season four months in is compared with the same four months of
//! the previous one.
//!
//! A prior season number of 0 means "no such season": the comparison is
//! `Undefined` and renders "N/A", which is not the same as a prior of 0.

use crate::{
    aggregate::{entity_performance, kpi_metrics, KpiMetrics},
    evolution::{growth_label, growth_ratio, indicator_for, GrowthIndicator, NOT_AVAILABLE},
    rank::{rank_stores, RankMovement, StoreRank},
    tier::{Tier, TierLadder},
    transaction::{GroupKey, Scope, TransactionRow, TransactionTable},
    types::{EntityKey, Points, Season},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Points,
    /// Distinct order ids.
    Orders,
    /// Distinct entities with a flagged first purchase.
    NewRegistrations,
    /// Distinct entities with positive points.
    ActiveEntities,
    /// Points per distinct order, 0 without orders.
    AverageOrderValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Comparison {
    Defined {
        current: f64,
        prior: f64,
        growth: f64,
        /// Months the prior season was restricted to.
        months: Vec<u32>,
    },
    Undefined {
        current: f64,
    },
}

impl Comparison {
    pub fn current(&self) -> f64 {
        match self {
            Self::Defined { current, .. } | Self::Undefined { current } => *current,
        }
    }

    pub fn prior(&self) -> Option<f64> {
        match self {
            Self::Defined { prior, .. } => Some(*prior),
            Self::Undefined { .. } => None,
        }
    }

    pub fn growth(&self) -> Option<f64> {
        match self {
            Self::Defined { growth, .. } => Some(*growth),
            Self::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined { .. })
    }

    /// Growth from a zero base with something now: callers show "new".
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Defined { current, prior, .. } if *prior == 0.0 && *current > 0.0)
    }

    pub fn indicator(&self, dead_band: f64) -> Option<GrowthIndicator> {
        self.growth().map(|g| indicator_for(g, dead_band))
    }

    pub fn display(&self, dead_band: f64) -> String {
        match self.indicator(dead_band) {
            Some(indicator) => indicator.display,
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentComparison {
    pub segment: String,
    pub current: Points,
    pub prior: Points,
    pub growth: f64,
    /// Share of the current total.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakdown {
    pub current_season: Season,
    pub prior_season: Season,
    pub rows: Vec<SegmentComparison>,
    pub total: SegmentComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityComparison {
    pub key: EntityKey,
    pub name: String,
    pub tier: Tier,
    pub current: Points,
    pub prior: Points,
    pub growth: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreComparison {
    pub store: String,
    pub segment: String,
    pub current: Points,
    /// Prior season points over the current season's months.
    pub prior: Points,
    pub growth: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierComparison {
    /// `None` on the total row.
    pub tier: Option<Tier>,
    pub count: usize,
    pub points: Points,
    /// Prior season points of entities classified into this tier on their
    /// own restricted prior totals. `None` when no prior season exists.
    pub prior_points: Option<Points>,
    pub growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreKpis {
    pub current_season: Season,
    pub current: KpiMetrics,
    /// `None` when there is no prior season.
    pub prior: Option<KpiMetrics>,
    pub current_rank: Option<usize>,
    pub prior_rank: Option<usize>,
    pub movement: RankMovement,
    pub months: Vec<u32>,
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Distinct months present in `season` within `scope`.
pub fn current_months(table: &TransactionTable, season: Season, scope: &Scope) -> BTreeSet<u32> {
    table.season_rows(season, scope).map(|r| r.month).collect()
}

/// Rows of `prior` within `scope`, restricted to `months`.
pub fn restricted_rows<'a>(
    table: &'a TransactionTable,
    prior: Season,
    scope: &'a Scope,
    months: &'a BTreeSet<u32>,
) -> impl Iterator<Item = &'a TransactionRow> + 'a {
    table
        .season_rows(prior, scope)
        .filter(move |r| months.contains(&r.month))
}

pub fn metric_value<'a, I>(rows: I, metric: Metric) -> f64
where
    I: IntoIterator<Item = &'a TransactionRow>,
{
    match metric {
        Metric::Points => rows.into_iter().map(|r| r.points).sum(),
        Metric::Orders => {
            let set: HashSet<&str> = rows.into_iter().map(|r| r.order_id.as_str()).collect();
            set.len() as f64
        }
        Metric::NewRegistrations => {
            let set: HashSet<&str> = rows
                .into_iter()
                .filter(|r| r.new_registration)
                .map(|r| r.entity_id.as_str())
                .collect();
            set.len() as f64
        }
        Metric::ActiveEntities => {
            let mut totals: BTreeMap<&str, Points> = BTreeMap::new();
            for row in rows {
                *totals.entry(row.entity_id.as_str()).or_default() += row.points;
            }
            totals.values().filter(|p| **p > 0.0).count() as f64
        }
        Metric::AverageOrderValue => {
            let mut points = 0.0;
            let mut orders: HashSet<&str> = HashSet::new();
            for row in rows {
                points += row.points;
                orders.insert(row.order_id.as_str());
            }
            if orders.is_empty() {
                0.0
            } else {
                points / orders.len() as f64
            }
        }
    }
}

/// Compare `metric` of `current` against `prior` restricted to the months
/// of `current`. `prior == 0` yields `Comparison::Undefined`.
pub fn compare(
    table: &TransactionTable,
    current: Season,
    prior: Season,
    scope: &Scope,
    metric: Metric,
) -> Comparison {
    let current_value = metric_value(table.season_rows(current, scope), metric);
    if prior == 0 {
        return Comparison::Undefined {
            current: current_value,
        };
    }

    let months = current_months(table, current, scope);
    let prior_value = metric_value(restricted_rows(table, prior, scope, &months), metric);
    log::debug!(
        "season={current} like-for-like {metric:?}: current={current_value} prior(S{prior}, {} months)={prior_value}",
        months.len(),
    );

    Comparison::Defined {
        current: current_value,
        prior: prior_value,
        growth: growth_ratio(current_value, prior_value),
        months: months.into_iter().collect(),
    }
}

/// Compare a season with the one immediately before it.
pub fn compare_with_previous(
    table: &TransactionTable,
    current: Season,
    scope: &Scope,
    metric: Metric,
) -> Comparison {
    compare(table, current, current.saturating_sub(1), scope, metric)
}

/// Point totals per segment, current vs restricted prior.
/// `None` when there is no prior season.
pub fn compare_by_segment(
    table: &TransactionTable,
    current: Season,
    prior: Season,
    scope: &Scope,
) -> Option<SegmentBreakdown> {
    if prior == 0 {
        return None;
    }
    let months = current_months(table, current, scope);

    let mut cells: BTreeMap<&str, (Points, Points)> = BTreeMap::new();
    for row in table.season_rows(current, scope) {
        cells.entry(row.segment.as_str()).or_default().0 += row.points;
    }
    for row in restricted_rows(table, prior, scope, &months) {
        cells.entry(row.segment.as_str()).or_default().1 += row.points;
    }

    let total_current: Points = cells.values().map(|(c, _)| c).sum();
    let total_prior: Points = cells.values().map(|(_, p)| p).sum();
    let share = |value: Points| {
        if total_current > 0.0 {
            value / total_current
        } else {
            0.0
        }
    };

    let rows = cells
        .into_iter()
        .map(|(segment, (cur, pri))| SegmentComparison {
            segment: segment.to_string(),
            current: cur,
            prior: pri,
            growth: growth_ratio(cur, pri),
            share: share(cur),
        })
        .collect();

    Some(SegmentBreakdown {
        current_season: current,
        prior_season: prior,
        rows,
        total: SegmentComparison {
            segment: "Total".to_string(),
            current: total_current,
            prior: total_prior,
            growth: growth_ratio(total_current, total_prior),
            share: if total_current > 0.0 { 1.0 } else { 0.0 },
        },
    })
}

/// Per-entity current season points against the restricted prior season.
/// Entities are those present in the current season; sorted by current
/// points descending.
pub fn compare_entities(
    table: &TransactionTable,
    current: Season,
    prior: Season,
    scope: &Scope,
    group_key: GroupKey,
    ladder: &TierLadder,
) -> Vec<EntityComparison> {
    let performance = entity_performance(table, scope, Some(current), group_key, ladder);
    let months = current_months(table, current, scope);

    let mut prior_points: BTreeMap<&str, Points> = BTreeMap::new();
    if prior > 0 {
        for row in restricted_rows(table, prior, scope, &months) {
            *prior_points.entry(group_key.key_of(row)).or_default() += row.points;
        }
    }

    performance
        .into_iter()
        .map(|p| {
            let pri = prior_points.get(p.key.as_str()).copied().unwrap_or(0.0);
            EntityComparison {
                growth: growth_ratio(p.points, pri),
                label: growth_label(p.points, pri),
                key: p.key,
                name: p.name,
                tier: p.tier,
                current: p.points,
                prior: pri,
            }
        })
        .collect()
}

/// Per-store current season points against the restricted prior season.
/// Stores with rows in either side are listed, current points descending.
pub fn compare_stores(
    table: &TransactionTable,
    current: Season,
    prior: Season,
    scope: &Scope,
) -> Vec<StoreComparison> {
    let months = current_months(table, current, scope);
    let segments = table.store_segments();

    let mut cells: BTreeMap<&str, (Points, Points)> = BTreeMap::new();
    for row in table.season_rows(current, scope) {
        cells.entry(row.store.as_str()).or_default().0 += row.points;
    }
    if prior > 0 {
        for row in restricted_rows(table, prior, scope, &months) {
            cells.entry(row.store.as_str()).or_default().1 += row.points;
        }
    }

    let mut stores: Vec<StoreComparison> = cells
        .into_iter()
        .map(|(store, (cur, pri))| StoreComparison {
            store: store.to_string(),
            segment: segments.get(store).cloned().unwrap_or_default(),
            current: cur,
            prior: pri,
            growth: growth_ratio(cur, pri),
            label: growth_label(cur, pri),
        })
        .collect();
    stores.sort_by(|a, b| b.current.total_cmp(&a.current).then_with(|| a.store.cmp(&b.store)));

    log::debug!(
        "season={current} store comparison: {} stores vs S{prior} over {} months",
        stores.len(),
        months.len()
    );
    stores
}

/// Tier counts and points for the current season, with like-for-like prior
/// points per tier. One row per tier (top tier first) plus a total row.
pub fn compare_tiers(
    table: &TransactionTable,
    current: Season,
    prior: Season,
    scope: &Scope,
    group_key: GroupKey,
    ladder: &TierLadder,
) -> Vec<TierComparison> {
    let performance = entity_performance(table, scope, Some(current), group_key, ladder);

    let prior_by_tier: Option<BTreeMap<Tier, Points>> = (prior > 0).then(|| {
        let months = current_months(table, current, scope);
        let mut totals: BTreeMap<&str, Points> = BTreeMap::new();
        for row in restricted_rows(table, prior, scope, &months) {
            *totals.entry(group_key.key_of(row)).or_default() += row.points;
        }
        let mut by_tier: BTreeMap<Tier, Points> = BTreeMap::new();
        for points in totals.values() {
            *by_tier.entry(ladder.tier_of(*points)).or_default() += *points;
        }
        by_tier
    });

    let mut rows: Vec<TierComparison> = Tier::ALL
        .iter()
        .rev()
        .map(|tier| {
            let members = performance.iter().filter(|p| p.tier == *tier);
            let (count, points) = members.fold((0, 0.0), |(c, s), p| (c + 1, s + p.points));
            let prior_points = prior_by_tier
                .as_ref()
                .map(|m| m.get(tier).copied().unwrap_or(0.0));
            TierComparison {
                tier: Some(*tier),
                count,
                points,
                growth: prior_points.map(|pri| growth_ratio(points, pri)),
                prior_points,
            }
        })
        .collect();

    let count = rows.iter().map(|r| r.count).sum();
    let points: Points = rows.iter().map(|r| r.points).sum();
    let prior_points = prior_by_tier.as_ref().map(|m| m.values().sum::<Points>());
    rows.push(TierComparison {
        tier: None,
        count,
        points,
        growth: prior_points.map(|pri| growth_ratio(points, pri)),
        prior_points,
    });
    rows
}

/// Store-scope KPIs for `current` against the restricted previous season,
/// plus the scope's rank among all stores in both seasons.
pub fn store_kpis(table: &TransactionTable, scope: &Scope, current: Season) -> StoreKpis {
    let prior = current.saturating_sub(1);
    let months = current_months(table, current, scope);
    let current_metrics = kpi_metrics(table.season_rows(current, scope));

    let selected: BTreeSet<String> = scope
        .stores
        .clone()
        .unwrap_or_else(|| table.season_rows(current, scope).map(|r| r.store.clone()).collect());

    let all_stores = Scope {
        months: Some(months.clone()),
        ..Scope::all()
    };
    let current_rank = best_rank(&rank_stores(table, current, &Scope::all()), &selected);

    let (prior_metrics, prior_rank) = if prior > 0 {
        let metrics = kpi_metrics(restricted_rows(table, prior, scope, &months));
        let rank = best_rank(&rank_stores(table, prior, &all_stores), &selected);
        (Some(metrics), rank)
    } else {
        (None, None)
    };

    StoreKpis {
        current_season: current,
        current: current_metrics,
        prior: prior_metrics,
        movement: RankMovement::between(current_rank, prior_rank),
        current_rank,
        prior_rank,
        months: months.into_iter().collect(),
    }
}

fn best_rank(ranks: &[StoreRank], selected: &BTreeSet<String>) -> Option<usize> {
    ranks
        .iter()
        .filter(|r| selected.contains(&r.store))
        .map(|r| r.rank)
        .min()
}
