//! Season rankings and season-over-season rank comparison.
//!
//! Ranking is competition style: ties share the lowest rank of the tie and
//! the next distinct total skips ahead ([300, 300, 100] → [1, 1, 3]).
//! Entities with zero points in a season are not ranked in it.
//!
//! Gap fill: when comparing two seasons, an entity with points in one season
//! and none in the other receives the other season's gap rank, which is the
//! highest rank assigned in that season plus one (1 when nobody ranked).
//! Every missing entity shares the same gap rank.

use crate::{
    transaction::{GroupKey, Scope, TransactionTable},
    types::{EntityKey, Points, Season},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub key: EntityKey,
    pub name: String,
    pub points: Points,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRow {
    pub key: EntityKey,
    pub name: String,
    pub current_points: Points,
    pub prior_points: Points,
    /// Adjusted ranks: the real rank, or the season's gap rank.
    pub current_rank: usize,
    pub prior_rank: usize,
    /// prior_rank − current_rank; positive means the entity climbed.
    pub variation: i64,
    pub movement: RankMovement,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankComparison {
    pub current_season: Season,
    pub prior_season: Season,
    pub current_max: usize,
    pub prior_max: usize,
    pub current_gap: usize,
    pub prior_gap: usize,
    pub rows: Vec<RankRow>,
}

impl RankComparison {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &str) -> Option<&RankRow> {
        self.rows.iter().find(|r| r.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRank {
    pub store: String,
    pub points: Points,
    pub rank: usize,
}

/// Movement between two raw ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "places", rename_all = "snake_case")]
pub enum RankMovement {
    Up(usize),
    Down(usize),
    Held,
    /// Ranked now, not ranked before.
    New,
    /// Not ranked now.
    Left,
}

impl RankMovement {
    pub fn between(current: Option<usize>, prior: Option<usize>) -> Self {
        match (current, prior) {
            (None, _) => Self::Left,
            (Some(_), None) => Self::New,
            (Some(c), Some(p)) if c < p => Self::Up(p - c),
            (Some(c), Some(p)) if c > p => Self::Down(c - p),
            (Some(_), Some(_)) => Self::Held,
        }
    }

    /// Raw rank pair where 0 means "not ranked".
    pub fn from_ranks(current: usize, prior: usize) -> Self {
        let ranked = |r: usize| (r > 0).then_some(r);
        Self::between(ranked(current), ranked(prior))
    }

    pub fn label(&self) -> String {
        match self {
            Self::Up(n) => format!("↑ {n}"),
            Self::Down(n) => format!("↓ {n}"),
            Self::Held => "=".to_string(),
            Self::New => "new".to_string(),
            Self::Left => "out".to_string(),
        }
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Competition ranks for totals already sorted descending.
pub fn competition_ranks(sorted_desc: &[Points]) -> Vec<usize> {
    let mut ranks = Vec::with_capacity(sorted_desc.len());
    for (i, points) in sorted_desc.iter().enumerate() {
        let rank = match (i, ranks.last()) {
            (0, _) | (_, None) => 1,
            (_, Some(prev)) if sorted_desc[i - 1] == *points => *prev,
            _ => i + 1,
        };
        ranks.push(rank);
    }
    ranks
}

/// Rank entities with positive points in `season`. Sorted by points
/// descending, ties by key.
pub fn rank_within_season(
    table: &TransactionTable,
    season: Season,
    scope: &Scope,
    group_key: GroupKey,
) -> Vec<RankEntry> {
    let totals = season_totals(table, season, scope, group_key);
    let mut ranked: Vec<(&str, Points)> = totals.into_iter().filter(|(_, p)| *p > 0.0).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let points: Vec<Points> = ranked.iter().map(|(_, p)| *p).collect();
    ranked
        .into_iter()
        .zip(competition_ranks(&points))
        .map(|((key, points), rank)| RankEntry {
            key: key.to_string(),
            name: table.display_name(group_key, key).unwrap_or(key).to_string(),
            points,
            rank,
        })
        .collect()
}

/// Rank both seasons independently, join them and gap-fill missing ranks.
/// Returns an empty comparison when `prior` is 0 or the scope selects
/// nothing.
pub fn compare_ranks(
    table: &TransactionTable,
    current: Season,
    prior: Season,
    scope: &Scope,
    group_key: GroupKey,
) -> RankComparison {
    if prior == 0 || current == 0 || scope.is_empty_selection() {
        return RankComparison {
            current_season: current,
            prior_season: prior,
            ..RankComparison::default()
        };
    }

    let current_ranks = rank_within_season(table, current, scope, group_key);
    let prior_ranks = rank_within_season(table, prior, scope, group_key);
    let current_max = current_ranks.iter().map(|e| e.rank).max().unwrap_or(0);
    let prior_max = prior_ranks.iter().map(|e| e.rank).max().unwrap_or(0);
    let current_gap = current_max + 1;
    let prior_gap = prior_max + 1;

    let current_by_key: BTreeMap<&str, &RankEntry> =
        current_ranks.iter().map(|e| (e.key.as_str(), e)).collect();
    let prior_by_key: BTreeMap<&str, &RankEntry> =
        prior_ranks.iter().map(|e| (e.key.as_str(), e)).collect();
    let keys: BTreeSet<&str> = current_by_key
        .keys()
        .chain(prior_by_key.keys())
        .copied()
        .collect();

    let mut rows: Vec<RankRow> = keys
        .into_iter()
        .map(|key| {
            let cur = current_by_key.get(key);
            let pri = prior_by_key.get(key);
            let current_rank = cur.map_or(current_gap, |e| e.rank);
            let prior_rank = pri.map_or(prior_gap, |e| e.rank);
            let name = cur.or(pri).map_or(key, |e| e.name.as_str());
            RankRow {
                key: key.to_string(),
                name: name.to_string(),
                current_points: cur.map_or(0.0, |e| e.points),
                prior_points: pri.map_or(0.0, |e| e.points),
                current_rank,
                prior_rank,
                variation: prior_rank as i64 - current_rank as i64,
                movement: RankMovement::between(cur.map(|e| e.rank), pri.map(|e| e.rank)),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.current_rank
            .cmp(&b.current_rank)
            .then_with(|| a.key.cmp(&b.key))
    });

    log::debug!(
        "season={current} rank: {} rows vs S{prior} (gaps {current_gap}/{prior_gap})",
        rows.len()
    );

    RankComparison {
        current_season: current,
        prior_season: prior,
        current_max,
        prior_max,
        current_gap,
        prior_gap,
        rows,
    }
}

/// Rank every store with rows in `season` by points (competition style).
pub fn rank_stores(table: &TransactionTable, season: Season, scope: &Scope) -> Vec<StoreRank> {
    let mut totals: BTreeMap<&str, Points> = BTreeMap::new();
    for row in table.season_rows(season, scope) {
        *totals.entry(row.store.as_str()).or_default() += row.points;
    }
    let mut stores: Vec<(&str, Points)> = totals.into_iter().collect();
    stores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let points: Vec<Points> = stores.iter().map(|(_, p)| *p).collect();
    stores
        .into_iter()
        .zip(competition_ranks(&points))
        .map(|((store, points), rank)| StoreRank {
            store: store.to_string(),
            points,
            rank,
        })
        .collect()
}

fn season_totals<'a>(
    table: &'a TransactionTable,
    season: Season,
    scope: &'a Scope,
    group_key: GroupKey,
) -> BTreeMap<&'a str, Points> {
    let mut totals: BTreeMap<&str, Points> = BTreeMap::new();
    for row in table.season_rows(season, scope) {
        *totals.entry(group_key.key_of(row)).or_default() += row.points;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competition_ties_skip() {
        assert_eq!(competition_ranks(&[300.0, 300.0, 100.0]), vec![1, 1, 3]);
        assert_eq!(competition_ranks(&[5.0, 4.0, 4.0, 4.0, 1.0]), vec![1, 2, 2, 2, 5]);
        assert!(competition_ranks(&[]).is_empty());
    }

    #[test]
    fn movement_from_raw_ranks() {
        assert_eq!(RankMovement::from_ranks(2, 5), RankMovement::Up(3));
        assert_eq!(RankMovement::from_ranks(4, 1), RankMovement::Down(3));
        assert_eq!(RankMovement::from_ranks(3, 3), RankMovement::Held);
        assert_eq!(RankMovement::from_ranks(1, 0), RankMovement::New);
        assert_eq!(RankMovement::from_ranks(0, 2), RankMovement::Left);
    }
}
