//! The transaction snapshot every report is computed from.
//!
//! RULE: the table is immutable once built. Every derived record
//! (performance, rank, retention) is recomputed from it per request.
//!
//! The only derivation done at construction time is the new-registration
//! flag, because it needs the whole history of an entity:
//!   a row is a "new registration" purchase iff the entity is listed in the
//!   registrations table, the row's date is the entity's first purchase date,
//!   and the row's season is the season of that first purchase.

use crate::{
    error::ReportResult,
    types::{EntityKey, Points, Season},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

// ── Rows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRow {
    /// Cleaned document number (digits only).
    pub entity_id: String,
    pub entity_name: String,
    /// Reporting identity several documents roll up to.
    pub consolidated_key: String,
    pub store: String,
    pub segment: String,
    /// 0 = unassigned.
    pub season: Season,
    /// Calendar month 1..=12. 0 in input means "derive from date".
    #[serde(default)]
    pub month: u32,
    pub date: NaiveDate,
    pub points: Points,
    pub order_id: String,
    #[serde(default)]
    pub new_registration: bool,
}

impl TransactionRow {
    /// Minimal row. Name and consolidated key default to the document,
    /// store/segment/order default to empty labels.
    pub fn new(entity_id: &str, season: Season, date: NaiveDate, points: Points) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            entity_name: entity_id.to_string(),
            consolidated_key: entity_id.to_string(),
            store: String::new(),
            segment: String::new(),
            season,
            month: date.month(),
            date,
            points,
            order_id: String::new(),
            new_registration: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.entity_name = name.to_string();
        self
    }

    pub fn consolidated(mut self, key: &str) -> Self {
        self.consolidated_key = key.to_string();
        self
    }

    pub fn at_store(mut self, store: &str, segment: &str) -> Self {
        self.store = store.to_string();
        self.segment = segment.to_string();
        self
    }

    pub fn order(mut self, order_id: &str) -> Self {
        self.order_id = order_id.to_string();
        self
    }

    /// Override the month label independently of the date.
    pub fn in_month(mut self, month: u32) -> Self {
        self.month = month;
        self
    }

    pub fn has_season(&self) -> bool {
        self.season > 0
    }
}

/// One line of the "new registrations" sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub entity_id: String,
    #[serde(default)]
    pub name: String,
    pub season: Season,
}

// ── Grouping and scope ───────────────────────────────────────────────────────

/// Which identity column rows are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Document,
    #[default]
    Consolidated,
}

impl GroupKey {
    pub fn key_of<'a>(&self, row: &'a TransactionRow) -> &'a str {
        match self {
            Self::Document => &row.entity_id,
            Self::Consolidated => &row.consolidated_key,
        }
    }
}

/// Row filter shared by every component. `None` means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub stores: Option<BTreeSet<String>>,
    pub segments: Option<BTreeSet<String>>,
    /// Matches either the document or the consolidated key, unless
    /// `entity_key` pins the column.
    pub entities: Option<BTreeSet<EntityKey>>,
    #[serde(default)]
    pub entity_key: Option<GroupKey>,
    pub months: Option<BTreeSet<u32>>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_stores<I, S>(mut self, stores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stores = Some(stores.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = Some(entities.into_iter().map(Into::into).collect());
        self
    }

    /// Entity filter compared against one identity column only.
    pub fn with_entities_by<I, S>(mut self, group_key: GroupKey, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_key = Some(group_key);
        self.with_entities(entities)
    }

    pub fn with_months<I>(mut self, months: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.months = Some(months.into_iter().collect());
        self
    }

    /// True when an explicit selection is empty, so nothing can match.
    pub fn is_empty_selection(&self) -> bool {
        [&self.stores, &self.segments, &self.entities]
            .iter()
            .any(|s| s.as_ref().is_some_and(|set| set.is_empty()))
            || self.months.as_ref().is_some_and(|m| m.is_empty())
    }

    pub fn matches(&self, row: &TransactionRow) -> bool {
        if let Some(stores) = &self.stores {
            if !stores.contains(&row.store) {
                return false;
            }
        }
        if let Some(segments) = &self.segments {
            if !segments.contains(&row.segment) {
                return false;
            }
        }
        if let Some(entities) = &self.entities {
            let matched = match self.entity_key {
                Some(group_key) => entities.contains(group_key.key_of(row)),
                None => entities.contains(&row.entity_id) || entities.contains(&row.consolidated_key),
            };
            if !matched {
                return false;
            }
        }
        if let Some(months) = &self.months {
            if !months.contains(&row.month) {
                return false;
            }
        }
        true
    }
}

// ── Table ────────────────────────────────────────────────────────────────────

/// On-disk JSON shape of a table handed over by the ingestion side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableFile {
    pub rows: Vec<TransactionRow>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    rows: Vec<TransactionRow>,
    registrations: Vec<Registration>,
}

impl TransactionTable {
    pub fn new(rows: Vec<TransactionRow>, registrations: Vec<Registration>) -> Self {
        let mut rows = rows;
        for row in &mut rows {
            if row.month == 0 {
                row.month = row.date.month();
            }
        }
        mark_new_registrations(&mut rows, &registrations);

        let flagged = rows.iter().filter(|r| r.new_registration).count();
        log::debug!(
            "table: {} rows, {} registrations, {flagged} first purchases flagged",
            rows.len(),
            registrations.len(),
        );
        Self {
            rows,
            registrations,
        }
    }

    pub fn from_json(content: &str) -> ReportResult<Self> {
        let file: TableFile = serde_json::from_str(content)?;
        Ok(Self::new(file.rows, file.registrations))
    }

    pub fn to_json(&self) -> ReportResult<String> {
        let file = TableFile {
            rows: self.rows.clone(),
            registrations: self.registrations.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn rows(&self) -> &[TransactionRow] {
        &self.rows
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching `scope`, season 0 included.
    pub fn scoped<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a TransactionRow> + 'a {
        self.rows.iter().filter(move |r| scope.matches(r))
    }

    /// Rows of one season (never season 0) matching `scope`.
    pub fn season_rows<'a>(
        &'a self,
        season: Season,
        scope: &'a Scope,
    ) -> impl Iterator<Item = &'a TransactionRow> + 'a {
        self.rows
            .iter()
            .filter(move |r| season > 0 && r.season == season && scope.matches(r))
    }

    /// Distinct valid seasons, ascending.
    pub fn seasons(&self) -> Vec<Season> {
        let set: BTreeSet<Season> = self
            .rows
            .iter()
            .filter(|r| r.has_season())
            .map(|r| r.season)
            .collect();
        set.into_iter().collect()
    }

    pub fn latest_season(&self) -> Option<Season> {
        self.rows.iter().filter(|r| r.has_season()).map(|r| r.season).max()
    }

    pub fn stores(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.store.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn segments(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.segment.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// First segment observed for each store, in table order.
    pub fn store_segments(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for row in &self.rows {
            map.entry(row.store.clone())
                .or_insert_with(|| row.segment.clone());
        }
        map
    }

    /// Display name for a group key: the first name observed for it.
    pub fn display_name(&self, group_key: GroupKey, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| group_key.key_of(r) == key)
            .map(|r| r.entity_name.as_str())
    }

    /// True when any row belongs to `key` (document or consolidated).
    pub fn knows_entity(&self, key: &str) -> bool {
        self.rows
            .iter()
            .any(|r| r.entity_id == key || r.consolidated_key == key)
    }

    /// Content fingerprint. Callers key their caches on it.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.rows.len().hash(&mut hasher);
        for row in &self.rows {
            row.entity_id.hash(&mut hasher);
            row.consolidated_key.hash(&mut hasher);
            row.store.hash(&mut hasher);
            row.segment.hash(&mut hasher);
            row.season.hash(&mut hasher);
            row.month.hash(&mut hasher);
            row.date.hash(&mut hasher);
            row.points.to_bits().hash(&mut hasher);
            row.order_id.hash(&mut hasher);
        }
        for reg in &self.registrations {
            reg.entity_id.hash(&mut hasher);
            reg.season.hash(&mut hasher);
        }
        hasher.finish()
    }
}

fn mark_new_registrations(rows: &mut [TransactionRow], registrations: &[Registration]) {
    let registered: HashSet<&str> = registrations.iter().map(|r| r.entity_id.as_str()).collect();

    // Earliest date per document, and the season of the first row carrying it.
    let mut first: HashMap<String, (NaiveDate, Season)> = HashMap::new();
    for row in rows.iter() {
        match first.get_mut(&row.entity_id) {
            Some(entry) if row.date < entry.0 => *entry = (row.date, row.season),
            Some(_) => {}
            None => {
                first.insert(row.entity_id.clone(), (row.date, row.season));
            }
        }
    }

    for row in rows.iter_mut() {
        row.new_registration = registered.contains(row.entity_id.as_str())
            && first
                .get(&row.entity_id)
                .is_some_and(|(date, season)| row.date == *date && row.season == *season);
    }
}

// ── Calendar helpers ─────────────────────────────────────────────────────────

/// Position of a calendar month in the July–June fiscal year (Jul = 1).
pub fn fiscal_order(month: u32) -> u32 {
    if month >= 7 {
        month - 6
    } else {
        month + 6
    }
}

/// Display label, e.g. "Jul (07)". Presentation only.
pub fn month_label(month: u32) -> String {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    match month {
        1..=12 => format!("{} ({month:02})", NAMES[(month - 1) as usize]),
        _ => format!("? ({month:02})"),
    }
}

/// Calendar months spanned by an inclusive date range, wrapping across
/// year end (Nov..Feb = 11, 12, 1, 2). Only month numbers are considered.
pub fn months_spanned(start: NaiveDate, end: NaiveDate) -> BTreeSet<u32> {
    let (m_start, m_end) = (start.month(), end.month());
    if m_end >= m_start {
        (m_start..=m_end).collect()
    } else {
        (m_start..=12).chain(1..=m_end).collect()
    }
}
