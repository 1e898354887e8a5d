//! Active/inactive segmentation over the full season history.
//!
//! Seasons are walked in ascending order with a running "ever scored" set:
//!   active   = entities with nonzero points this season (within scope)
//!   inactive = ever_scored − active
//!   ever_scored ← ever_scored ∪ active
//! The set only grows. An entity that returns after a gap moves from
//! inactive back to active without being re-added.

use crate::{
    transaction::{GroupKey, Scope, TransactionTable},
    types::{EntityKey, Points, Season},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRetention {
    pub season: Season,
    pub active_count: usize,
    pub inactive_count: usize,
    pub total_points: Points,
    /// active / (active + inactive); 0 when both are empty.
    pub active_share: f64,
    pub active: BTreeSet<EntityKey>,
    pub inactive: BTreeSet<EntityKey>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetentionReport {
    pub seasons: Vec<SeasonRetention>,
    pub ever_scored: BTreeSet<EntityKey>,
}

impl RetentionReport {
    pub fn season(&self, season: Season) -> Option<&SeasonRetention> {
        self.seasons.iter().find(|s| s.season == season)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionDetail {
    pub key: EntityKey,
    pub name: String,
    pub status: ActivityStatus,
    /// Distinct orders in the requested season.
    pub orders: usize,
    pub points: Points,
    /// Last purchase within scope, any season.
    pub last_purchase: Option<NaiveDate>,
}

/// One registered professional checked against the purchase history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub entity_id: String,
    pub name: String,
    /// Season the registration was made in.
    pub season: Season,
    pub has_purchased: bool,
    pub first_purchase: Option<NaiveDate>,
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn active_inactive(
    table: &TransactionTable,
    scope: &Scope,
    group_key: GroupKey,
) -> RetentionReport {
    // season → (entity → points)
    let mut by_season: BTreeMap<Season, BTreeMap<&str, Points>> = BTreeMap::new();
    for row in table.scoped(scope).filter(|r| r.has_season()) {
        *by_season
            .entry(row.season)
            .or_default()
            .entry(group_key.key_of(row))
            .or_default() += row.points;
    }

    let mut ever_scored: BTreeSet<EntityKey> = BTreeSet::new();
    let mut seasons = Vec::with_capacity(by_season.len());
    for (season, totals) in by_season {
        let active: BTreeSet<EntityKey> = totals
            .iter()
            .filter(|(_, p)| **p != 0.0)
            .map(|(k, _)| k.to_string())
            .collect();
        let inactive: BTreeSet<EntityKey> = ever_scored.difference(&active).cloned().collect();
        let total_points: Points = totals.values().sum();
        let considered = active.len() + inactive.len();

        log::debug!(
            "season={season} retention: active={} inactive={} points={total_points}",
            active.len(),
            inactive.len()
        );

        ever_scored.extend(active.iter().cloned());
        seasons.push(SeasonRetention {
            season,
            active_count: active.len(),
            inactive_count: inactive.len(),
            total_points,
            active_share: if considered > 0 {
                active.len() as f64 / considered as f64
            } else {
                0.0
            },
            active,
            inactive,
        });
    }

    RetentionReport {
        seasons,
        ever_scored,
    }
}

/// Drill-down of every entity that has ever scored up to and including
/// `season`: whether it is active in `season`, its orders there and its last
/// purchase. Active entities first, then most recent purchase first.
pub fn retention_detail(
    table: &TransactionTable,
    scope: &Scope,
    season: Season,
    group_key: GroupKey,
) -> Vec<RetentionDetail> {
    let report = active_inactive(table, scope, group_key);
    let Some(current) = report.season(season) else {
        return Vec::new();
    };

    let mut orders: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut points: BTreeMap<&str, Points> = BTreeMap::new();
    for row in table.season_rows(season, scope) {
        let key = group_key.key_of(row);
        orders.entry(key).or_default().insert(&row.order_id);
        *points.entry(key).or_default() += row.points;
    }
    let mut last_purchase: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for row in table.scoped(scope).filter(|r| r.has_season() && r.season <= season) {
        let entry = last_purchase.entry(group_key.key_of(row)).or_insert(row.date);
        if row.date > *entry {
            *entry = row.date;
        }
    }

    let members = current
        .active
        .iter()
        .map(|k| (k, ActivityStatus::Active))
        .chain(current.inactive.iter().map(|k| (k, ActivityStatus::Inactive)));

    let mut details: Vec<RetentionDetail> = members
        .map(|(key, status)| RetentionDetail {
            key: key.clone(),
            name: table
                .display_name(group_key, key)
                .unwrap_or(key)
                .to_string(),
            status,
            orders: orders.get(key.as_str()).map_or(0, BTreeSet::len),
            points: points.get(key.as_str()).copied().unwrap_or(0.0),
            last_purchase: last_purchase.get(key.as_str()).copied(),
        })
        .collect();
    details.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| b.last_purchase.cmp(&a.last_purchase))
            .then_with(|| a.key.cmp(&b.key))
    });
    details
}

/// Every registration with a "has already bought" flag, checked against
/// the whole table regardless of scope. Newest registration season first,
/// then entity id.
pub fn registration_status(table: &TransactionTable) -> Vec<RegistrationStatus> {
    let mut first_purchase: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for row in table.rows() {
        let entry = first_purchase.entry(row.entity_id.as_str()).or_insert(row.date);
        if row.date < *entry {
            *entry = row.date;
        }
    }

    let mut statuses: Vec<RegistrationStatus> = table
        .registrations()
        .iter()
        .map(|reg| {
            let first = first_purchase.get(reg.entity_id.as_str()).copied();
            RegistrationStatus {
                entity_id: reg.entity_id.clone(),
                name: reg.name.clone(),
                season: reg.season,
                has_purchased: first.is_some(),
                first_purchase: first,
            }
        })
        .collect();
    statuses.sort_by(|a, b| {
        b.season
            .cmp(&a.season)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    log::debug!(
        "registrations: {} listed, {} already bought",
        statuses.len(),
        statuses.iter().filter(|s| s.has_purchased).count()
    );
    statuses
}
