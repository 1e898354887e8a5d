//! Seasonal aggregation: transaction rows → per-entity, per-season totals.
//!
//! Season 0 rows are dropped before grouping. Output is sorted by
//! (key, season) so results never depend on input row order.

use crate::{
    evolution::growth_ratio,
    like_for_like::{metric_value, Metric},
    tier::{Tier, TierLadder},
    transaction::{fiscal_order, month_label, GroupKey, Scope, TransactionRow, TransactionTable},
    types::{EntityKey, Points, Season},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalPerformance {
    pub key: EntityKey,
    pub season: Season,
    pub points_total: Points,
    pub order_count: usize,
    pub store_count: usize,
    pub segment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPerformance {
    pub key: EntityKey,
    pub name: String,
    /// Documents rolled up into this key, sorted.
    pub documents: Vec<String>,
    /// Display names observed for this key, sorted.
    pub names: Vec<String>,
    pub points: Points,
    pub order_count: usize,
    pub store_count: usize,
    pub segment_count: usize,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season: Season,
    pub points: Points,
    pub orders: usize,
    pub stores: usize,
    pub segments: usize,
    pub avg_points_per_order: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KpiMetrics {
    pub points: Points,
    pub orders: usize,
    pub new_registrations: usize,
    pub avg_points_per_order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub month: u32,
    pub label: String,
    /// One value per entry of `MonthlyPivot::seasons`.
    pub values: Vec<f64>,
    /// Growth of the last season over the one before it.
    pub growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPivot {
    pub metric: Metric,
    pub seasons: Vec<Season>,
    pub rows: Vec<MonthlyRow>,
    /// The metric over each whole season column, not a sum of the cells
    /// for distinct counts and averages.
    pub totals: Vec<f64>,
}

impl MonthlyPivot {
    fn empty(metric: Metric) -> Self {
        Self {
            metric,
            seasons: Vec::new(),
            rows: Vec::new(),
            totals: Vec::new(),
        }
    }
}

/// The month × season pivots every report shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPivots {
    pub points: MonthlyPivot,
    pub orders: MonthlyPivot,
    pub new_registrations: MonthlyPivot,
    pub average_order_value: MonthlyPivot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreActivity {
    pub store: String,
    pub points: Points,
    pub orders: usize,
}

/// One segment of a season: points, distinct orders, share of the
/// season's points and the stores behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentActivity {
    pub segment: String,
    pub points: Points,
    pub orders: usize,
    pub share: f64,
    /// Points descending.
    pub stores: Vec<StoreActivity>,
}

// ── Accumulator ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Accumulator<'a> {
    points: Points,
    orders: HashSet<&'a str>,
    stores: HashSet<&'a str>,
    segments: HashSet<&'a str>,
    documents: BTreeSet<&'a str>,
    names: BTreeSet<&'a str>,
}

impl<'a> Accumulator<'a> {
    fn push(&mut self, row: &'a TransactionRow) {
        self.points += row.points;
        self.orders.insert(&row.order_id);
        self.stores.insert(&row.store);
        self.segments.insert(&row.segment);
        self.documents.insert(&row.entity_id);
        self.names.insert(&row.entity_name);
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// One record per observed (key, season) pair within `scope`.
pub fn aggregate(
    table: &TransactionTable,
    scope: &Scope,
    group_key: GroupKey,
) -> Vec<SeasonalPerformance> {
    let mut groups: BTreeMap<(&str, Season), Accumulator> = BTreeMap::new();
    for row in table.scoped(scope).filter(|r| r.has_season()) {
        groups
            .entry((group_key.key_of(row), row.season))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((key, season), acc)| SeasonalPerformance {
            key: key.to_string(),
            season,
            points_total: acc.points,
            order_count: acc.orders.len(),
            store_count: acc.stores.len(),
            segment_count: acc.segments.len(),
        })
        .collect()
}

/// Like `aggregate`, but emits every key × season pair of the scope,
/// zero-filled where a key has no rows in a season.
pub fn aggregate_dense(
    table: &TransactionTable,
    scope: &Scope,
    group_key: GroupKey,
) -> Vec<SeasonalPerformance> {
    let sparse = aggregate(table, scope, group_key);
    let keys: BTreeSet<&str> = sparse.iter().map(|p| p.key.as_str()).collect();
    let seasons: BTreeSet<Season> = sparse.iter().map(|p| p.season).collect();
    let observed: BTreeMap<(&str, Season), &SeasonalPerformance> = sparse
        .iter()
        .map(|p| ((p.key.as_str(), p.season), p))
        .collect();

    let mut dense = Vec::with_capacity(keys.len() * seasons.len());
    for key in &keys {
        for season in &seasons {
            match observed.get(&(*key, *season)) {
                Some(p) => dense.push((*p).clone()),
                None => dense.push(SeasonalPerformance {
                    key: key.to_string(),
                    season: *season,
                    points_total: 0.0,
                    order_count: 0,
                    store_count: 0,
                    segment_count: 0,
                }),
            }
        }
    }
    dense
}

/// Per-entity totals with tier, for one season or (`None`) every valid
/// season together. Sorted by points descending, then key.
pub fn entity_performance(
    table: &TransactionTable,
    scope: &Scope,
    season: Option<Season>,
    group_key: GroupKey,
    ladder: &TierLadder,
) -> Vec<EntityPerformance> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let rows = table
        .scoped(scope)
        .filter(|r| r.has_season() && season.map_or(true, |s| s == r.season));
    for row in rows {
        groups.entry(group_key.key_of(row)).or_default().push(row);
    }

    let mut records: Vec<EntityPerformance> = groups
        .into_iter()
        .map(|(key, acc)| EntityPerformance {
            key: key.to_string(),
            name: acc.names.iter().next().map(|n| n.to_string()).unwrap_or_default(),
            documents: acc.documents.iter().map(|d| d.to_string()).collect(),
            names: acc.names.iter().map(|n| n.to_string()).collect(),
            points: acc.points,
            order_count: acc.orders.len(),
            store_count: acc.stores.len(),
            segment_count: acc.segments.len(),
            tier: ladder.tier_of(acc.points),
        })
        .collect();
    records.sort_by(|a, b| b.points.total_cmp(&a.points).then_with(|| a.key.cmp(&b.key)));
    records
}

/// Per-season summary of the scope, seasons ascending.
pub fn season_history(table: &TransactionTable, scope: &Scope) -> Vec<SeasonSummary> {
    let mut groups: BTreeMap<Season, Accumulator> = BTreeMap::new();
    for row in table.scoped(scope).filter(|r| r.has_season()) {
        groups.entry(row.season).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(season, acc)| {
            let orders = acc.orders.len();
            SeasonSummary {
                season,
                points: acc.points,
                orders,
                stores: acc.stores.len(),
                segments: acc.segments.len(),
                avg_points_per_order: average(acc.points, orders),
            }
        })
        .collect()
}

/// Headline KPIs of an arbitrary row subset.
pub fn kpi_metrics<'a, I>(rows: I) -> KpiMetrics
where
    I: IntoIterator<Item = &'a TransactionRow>,
{
    let mut points = 0.0;
    let mut orders: HashSet<&str> = HashSet::new();
    let mut new_entities: HashSet<&str> = HashSet::new();
    for row in rows {
        points += row.points;
        orders.insert(&row.order_id);
        if row.new_registration {
            new_entities.insert(&row.entity_id);
        }
    }
    KpiMetrics {
        points,
        orders: orders.len(),
        new_registrations: new_entities.len(),
        avg_points_per_order: average(points, orders.len()),
    }
}

/// Month × season values of `metric` in fiscal order (Jul first).
pub fn monthly_pivot(
    table: &TransactionTable,
    scope: &Scope,
    seasons: &[Season],
    metric: Metric,
) -> MonthlyPivot {
    let mut seasons: Vec<Season> = seasons.iter().copied().filter(|s| *s > 0).collect();
    seasons.sort_unstable();
    seasons.dedup();
    if seasons.is_empty() {
        return MonthlyPivot::empty(metric);
    }

    let mut cells: BTreeMap<(u32, Season), Vec<&TransactionRow>> = BTreeMap::new();
    let mut columns: BTreeMap<Season, Vec<&TransactionRow>> = BTreeMap::new();
    for row in table.scoped(scope).filter(|r| seasons.contains(&r.season)) {
        cells.entry((fiscal_order(row.month), row.season)).or_default().push(row);
        columns.entry(row.season).or_default().push(row);
    }

    let months: BTreeSet<u32> = cells.keys().map(|(order, _)| *order).collect();
    let rows = months
        .into_iter()
        .map(|order| {
            let month = if order <= 6 { order + 6 } else { order - 6 };
            let values: Vec<f64> = seasons
                .iter()
                .map(|s| {
                    cells
                        .get(&(order, *s))
                        .map_or(0.0, |rows| metric_value(rows.iter().copied(), metric))
                })
                .collect();
            MonthlyRow {
                month,
                label: month_label(month),
                growth: last_two_growth(&values),
                values,
            }
        })
        .collect();
    let totals = seasons
        .iter()
        .map(|s| {
            columns
                .get(s)
                .map_or(0.0, |rows| metric_value(rows.iter().copied(), metric))
        })
        .collect();

    MonthlyPivot {
        metric,
        seasons,
        rows,
        totals,
    }
}

/// Points, orders, new registrations and average order value pivots over
/// the same seasons.
pub fn monthly_pivots(table: &TransactionTable, scope: &Scope, seasons: &[Season]) -> MonthlyPivots {
    MonthlyPivots {
        points: monthly_pivot(table, scope, seasons, Metric::Points),
        orders: monthly_pivot(table, scope, seasons, Metric::Orders),
        new_registrations: monthly_pivot(table, scope, seasons, Metric::NewRegistrations),
        average_order_value: monthly_pivot(table, scope, seasons, Metric::AverageOrderValue),
    }
}

/// Segments of `season` within `scope`, points descending, each with its
/// stores.
pub fn segment_analysis(
    table: &TransactionTable,
    season: Season,
    scope: &Scope,
) -> Vec<SegmentActivity> {
    let mut segments: BTreeMap<&str, (Accumulator, BTreeMap<&str, Accumulator>)> = BTreeMap::new();
    for row in table.season_rows(season, scope) {
        let (segment, stores) = segments.entry(row.segment.as_str()).or_default();
        segment.push(row);
        stores.entry(row.store.as_str()).or_default().push(row);
    }

    let season_points: Points = segments.values().map(|(acc, _)| acc.points).sum();
    let mut result: Vec<SegmentActivity> = segments
        .into_iter()
        .map(|(segment, (acc, stores))| {
            let mut stores: Vec<StoreActivity> = stores
                .into_iter()
                .map(|(store, s)| StoreActivity {
                    store: store.to_string(),
                    points: s.points,
                    orders: s.orders.len(),
                })
                .collect();
            stores.sort_by(|a, b| b.points.total_cmp(&a.points).then_with(|| a.store.cmp(&b.store)));
            SegmentActivity {
                segment: segment.to_string(),
                points: acc.points,
                orders: acc.orders.len(),
                share: if season_points != 0.0 {
                    acc.points / season_points
                } else {
                    0.0
                },
                stores,
            }
        })
        .collect();
    result.sort_by(|a, b| b.points.total_cmp(&a.points).then_with(|| a.segment.cmp(&b.segment)));
    result
}

fn last_two_growth(values: &[f64]) -> Option<f64> {
    match values {
        [.., prior, current] => Some(growth_ratio(*current, *prior)),
        _ => None,
    }
}

fn average(points: Points, orders: usize) -> f64 {
    if orders > 0 {
        points / orders as f64
    } else {
        0.0
    }
}
