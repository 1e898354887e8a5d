//! The report engine: owns the loaded table and the configuration, builds
//! role reports on request and caches them.
//!
//! RULES:
//!   - The table is immutable while loaded. Replacing it drops the cache.
//!   - The cache only holds reports for the current table and the current
//!     campaign book. A request with a different book drops it.
//!   - Analytics functions never see the cache.

use crate::{
    config::ReportConfig,
    error::ReportResult,
    report::{
        admin_report, architect_report, store_report, AdminReport, ArchitectReport, CampaignBook,
        StoreReport,
    },
    store::CampaignStore,
    transaction::TransactionTable,
    types::Season,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Entities listed in the admin report's top table.
pub const ADMIN_TOP_ENTITIES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ReportRequest {
    Admin { season: Option<Season> },
    Store { stores: Vec<String>, season: Option<Season> },
    Architect { key: String, season: Option<Season> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Report {
    Admin(AdminReport),
    Store(StoreReport),
    Architect(ArchitectReport),
    /// Nothing to report: empty table or unknown entity.
    Empty { reason: String },
}

pub struct ReportEngine {
    pub config: ReportConfig,
    table: TransactionTable,
    fingerprint: u64,
    /// Hash of the campaign book the cached reports were built with.
    book_hash: Option<u64>,
    cache: HashMap<ReportRequest, Report>,
}

impl ReportEngine {
    pub fn new(config: ReportConfig, table: TransactionTable) -> Self {
        let fingerprint = table.fingerprint();
        log::info!(
            "engine: loaded {} rows, seasons {:?}, fingerprint {fingerprint:016x}",
            table.len(),
            table.seasons()
        );
        Self {
            config,
            table,
            fingerprint,
            book_hash: None,
            cache: HashMap::new(),
        }
    }

    pub fn table(&self) -> &TransactionTable {
        &self.table
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn cached_reports(&self) -> usize {
        self.cache.len()
    }

    /// Swap in a new table. Returns false (and keeps the cache) when the
    /// content is unchanged.
    pub fn replace_table(&mut self, table: TransactionTable) -> bool {
        let fingerprint = table.fingerprint();
        if fingerprint == self.fingerprint {
            return false;
        }
        log::info!(
            "engine: table changed {:016x} -> {fingerprint:016x}, dropping {} cached reports",
            self.fingerprint,
            self.cache.len()
        );
        self.table = table;
        self.fingerprint = fingerprint;
        self.cache.clear();
        true
    }

    /// Build (or fetch from cache) the report for `request`.
    pub fn report(&mut self, request: &ReportRequest, book: &CampaignBook) -> ReportResult<Report> {
        let book_hash = book_fingerprint(book)?;
        if self.book_hash != Some(book_hash) {
            if !self.cache.is_empty() {
                log::info!(
                    "engine: campaign book changed, dropping {} cached reports",
                    self.cache.len()
                );
                self.cache.clear();
            }
            self.book_hash = Some(book_hash);
        }
        if let Some(report) = self.cache.get(request) {
            log::debug!("engine: cache hit for {request:?}");
            return Ok(report.clone());
        }
        let report = self.build(request, book);
        self.cache.insert(request.clone(), report.clone());
        Ok(report)
    }

    /// Load the campaign book from `store` and build the report.
    pub fn report_with_store(
        &mut self,
        request: &ReportRequest,
        store: &CampaignStore,
    ) -> ReportResult<Report> {
        let book = CampaignBook::from_store(store)?;
        self.report(request, &book)
    }

    fn build(&self, request: &ReportRequest, book: &CampaignBook) -> Report {
        let season = match request_season(request).or_else(|| self.table.latest_season()) {
            Some(season) => season,
            None => {
                return Report::Empty {
                    reason: "no seasons in table".to_string(),
                }
            }
        };

        match request {
            ReportRequest::Admin { .. } => Report::Admin(admin_report(
                &self.table,
                &self.config,
                book,
                season,
                ADMIN_TOP_ENTITIES,
            )),
            ReportRequest::Store { stores, .. } => {
                if stores.is_empty() {
                    return Report::Empty {
                        reason: "no stores selected".to_string(),
                    };
                }
                Report::Store(store_report(&self.table, &self.config, book, stores, season))
            }
            ReportRequest::Architect { key, .. } => {
                match architect_report(&self.table, &self.config, book, key, season) {
                    Some(report) => Report::Architect(report),
                    None => Report::Empty {
                        reason: format!("no rows for entity {key}"),
                    },
                }
            }
        }
    }
}

fn request_season(request: &ReportRequest) -> Option<Season> {
    match request {
        ReportRequest::Admin { season }
        | ReportRequest::Store { season, .. }
        | ReportRequest::Architect { season, .. } => *season,
    }
}

fn book_fingerprint(book: &CampaignBook) -> ReportResult<u64> {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(book)?.hash(&mut hasher);
    Ok(hasher.finish())
}
