//! Synthetic transaction tables for the runner and tests.
//!
//! Seasons are fiscal years (July to June). The latest season is partially
//! elapsed so like-for-like restriction has something to do. Same seed and
//! params always produce an identical table.

use crate::{
    name_generator::NameGenerator,
    rng::{DemoRng, DemoStream},
    transaction::{Registration, TransactionRow, TransactionTable},
    types::Season,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoParams {
    pub stores: usize,
    pub segments: Vec<String>,
    pub architects: usize,
    pub seasons: u32,
    /// Number of the oldest generated season.
    pub first_season: Season,
    /// Calendar year in which the oldest season's July falls.
    pub first_year: i32,
    /// Months elapsed in the latest season (1..=12).
    pub current_season_months: u32,
    /// Chance an architect buys in a given month while active.
    pub monthly_purchase_chance: f64,
    /// Chance an architect sits out a whole season.
    pub season_skip_chance: f64,
    /// Share of rows left without a season.
    pub unassigned_share: f64,
}

impl Default for DemoParams {
    fn default() -> Self {
        Self {
            stores: 6,
            segments: vec!["Casa".into(), "Corporativo".into(), "Revenda".into()],
            architects: 60,
            seasons: 3,
            first_season: 8,
            first_year: 2022,
            current_season_months: 4,
            monthly_purchase_chance: 0.35,
            season_skip_chance: 0.15,
            unassigned_share: 0.01,
        }
    }
}

struct DemoStore {
    name: String,
    segment: String,
}

struct DemoArchitect {
    document: String,
    name: String,
    consolidated_key: String,
    store: usize,
    /// Index of the first season the architect buys in.
    joins: u32,
}

pub fn generate(seed: u64, params: &DemoParams) -> TransactionTable {
    let stores = build_stores(seed, params);
    let architects = build_architects(seed, params, stores.len());
    let mut rng = DemoRng::new(seed, DemoStream::Purchases);

    let mut rows = Vec::new();
    let mut order_seq: u64 = 0;
    for idx in 0..params.seasons {
        let season = params.first_season + idx;
        let year = params.first_year + idx as i32;
        let months = if idx + 1 == params.seasons {
            params.current_season_months.clamp(1, 12)
        } else {
            12
        };

        for architect in architects.iter().filter(|a| a.joins <= idx) {
            if idx > architect.joins && rng.chance(params.season_skip_chance) {
                continue;
            }
            let Some(store) = stores.get(architect.store) else {
                continue;
            };
            for offset in 0..months {
                if !rng.chance(params.monthly_purchase_chance) {
                    continue;
                }
                let (y, m) = fiscal_month(year, offset);
                let Some(date) = NaiveDate::from_ymd_opt(y, m, rng.between(1, 28)) else {
                    continue;
                };
                order_seq += 1;
                let assigned = if rng.chance(params.unassigned_share) { 0 } else { season };
                let points = rng.pareto(2_000.0, 1.6).round();
                rows.push(
                    TransactionRow::new(&architect.document, assigned, date, points)
                        .named(&architect.name)
                        .consolidated(&architect.consolidated_key)
                        .at_store(&store.name, &store.segment)
                        .order(&format!("PED-{order_seq:07}")),
                );
            }
        }
    }

    let registrations = architects
        .iter()
        .filter(|a| a.joins > 0)
        .map(|a| Registration {
            entity_id: a.document.clone(),
            name: a.name.clone(),
            season: params.first_season + a.joins,
        })
        .collect();

    log::info!(
        "demo: seed={seed} seasons={} stores={} architects={} rows={}",
        params.seasons,
        stores.len(),
        architects.len(),
        rows.len()
    );
    TransactionTable::new(rows, registrations)
}

fn build_stores(seed: u64, params: &DemoParams) -> Vec<DemoStore> {
    let mut rng = DemoRng::new(seed, DemoStream::Stores);
    (0..params.stores)
        .map(|n| DemoStore {
            name: NameGenerator::store_name(&mut rng, n),
            segment: params
                .segments
                .get(n % params.segments.len().max(1))
                .cloned()
                .unwrap_or_default(),
        })
        .collect()
}

fn build_architects(seed: u64, params: &DemoParams, store_count: usize) -> Vec<DemoArchitect> {
    let mut rng = DemoRng::new(seed, DemoStream::Architects);
    let mut joins_rng = DemoRng::new(seed, DemoStream::Registrations);
    let mut architects: Vec<DemoArchitect> = Vec::with_capacity(params.architects);

    for _ in 0..params.architects {
        let company = rng.chance(0.2);
        let document = NameGenerator::document(&mut rng, company);
        let name = if company {
            NameGenerator::studio_name(&mut rng)
        } else {
            NameGenerator::architect_name(&mut rng)
        };
        // A studio document sometimes rolls up to an architect already seen.
        let consolidated_key = match architects.last() {
            Some(prev) if company && rng.chance(0.3) => prev.consolidated_key.clone(),
            _ => document.clone(),
        };
        let joins = if joins_rng.chance(0.6) {
            0
        } else {
            joins_rng.between(0, params.seasons.saturating_sub(1))
        };
        architects.push(DemoArchitect {
            document,
            name,
            consolidated_key,
            store: rng.below(store_count),
            joins,
        });
    }
    architects
}

/// Calendar (year, month) of the `offset`-th month of a fiscal year whose
/// July falls in `july_year`.
fn fiscal_month(july_year: i32, offset: u32) -> (i32, u32) {
    let month = 7 + offset;
    if month > 12 {
        (july_year + 1, month - 12)
    } else {
        (july_year, month)
    }
}
