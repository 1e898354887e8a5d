use chrono::NaiveDate;
use loyalty_core::{
    retention::{active_inactive, registration_status, retention_detail, ActivityStatus},
    transaction::{GroupKey, Registration, Scope, TransactionRow, TransactionTable},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn row(entity: &str, season: u32, day: u32, points: f64) -> TransactionRow {
    TransactionRow::new(entity, season, d(2020 + season as i32, 8, day), points)
        .at_store("Loja", "Casa")
        .order(&format!("{entity}-{season}-{day}"))
}

/// E: active in 1, absent in 2, back in 3. F: active in 2 only.
fn comeback_table() -> TransactionTable {
    TransactionTable::new(
        vec![
            row("E", 1, 1, 100.0),
            row("F", 2, 1, 50.0),
            row("E", 3, 1, 70.0),
            row("E", 3, 9, 30.0),
            row("X", 0, 1, 999.0),
        ],
        Vec::new(),
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Active in 1, inactive in 2, active again in 3; always in ever_scored.
#[test]
fn comeback_entity_moves_between_sets() {
    let report = active_inactive(&comeback_table(), &Scope::all(), GroupKey::Document);
    assert_eq!(report.seasons.iter().map(|s| s.season).collect::<Vec<_>>(), vec![1, 2, 3]);

    let s1 = report.season(1).unwrap();
    let s2 = report.season(2).unwrap();
    let s3 = report.season(3).unwrap();
    assert!(s1.active.contains("E"));
    assert!(s2.inactive.contains("E"));
    assert!(!s2.active.contains("E"));
    assert!(s3.active.contains("E"));
    assert!(!s3.inactive.contains("E"));

    assert!(s3.inactive.contains("F"));
    assert_eq!((s3.active_count, s3.inactive_count), (1, 1));
    assert_eq!(s3.total_points, 100.0);
    assert_eq!(s3.active_share, 0.5);

    assert_eq!(report.ever_scored.len(), 2);
    assert!(!report.ever_scored.contains("X"));
}

/// ever_scored never shrinks from one season to the next.
#[test]
fn ever_scored_is_monotonic() {
    let report = active_inactive(&comeback_table(), &Scope::all(), GroupKey::Document);
    let mut seen = std::collections::BTreeSet::new();
    for season in &report.seasons {
        assert!(season.inactive.iter().all(|k| seen.contains(k)));
        seen.extend(season.active.iter().cloned());
    }
    assert_eq!(seen, report.ever_scored);
}

/// Zero-point rows do not make an entity active.
#[test]
fn zero_points_are_not_activity() {
    let table = TransactionTable::new(vec![row("Z", 1, 1, 0.0)], Vec::new());
    let report = active_inactive(&table, &Scope::all(), GroupKey::Document);
    assert_eq!(report.seasons[0].active_count, 0);
    assert!(report.ever_scored.is_empty());
}

#[test]
fn empty_scope_gives_empty_report() {
    let scope = Scope::all().with_stores(["Nowhere"]);
    let report = active_inactive(&comeback_table(), &scope, GroupKey::Document);
    assert!(report.seasons.is_empty());
    assert!(report.ever_scored.is_empty());
}

/// Active first, then most recent purchase.
#[test]
fn detail_lists_active_then_inactive() {
    let details = retention_detail(&comeback_table(), &Scope::all(), 3, GroupKey::Document);
    assert_eq!(details.len(), 2);
    assert_eq!(details[0].key, "E");
    assert_eq!(details[0].status, ActivityStatus::Active);
    assert_eq!(details[0].orders, 2);
    assert_eq!(details[0].last_purchase, Some(d(2023, 8, 9)));

    assert_eq!(details[1].key, "F");
    assert_eq!(details[1].status, ActivityStatus::Inactive);
    assert_eq!(details[1].orders, 0);
    assert_eq!(details[1].last_purchase, Some(d(2022, 8, 1)));

    assert!(retention_detail(&comeback_table(), &Scope::all(), 7, GroupKey::Document).is_empty());
}

/// Registered professionals are checked against every row, any season.
#[test]
fn registration_status_flags_buyers() {
    let reg = |id: &str, season: u32| Registration {
        entity_id: id.into(),
        name: format!("Pro {id}"),
        season,
    };
    let table = TransactionTable::new(
        vec![row("E", 1, 1, 100.0), row("E", 3, 1, 70.0), row("X", 0, 4, 5.0)],
        vec![reg("E", 1), reg("N", 3), reg("X", 2)],
    );
    let statuses = registration_status(&table);

    assert_eq!(
        statuses.iter().map(|s| s.entity_id.as_str()).collect::<Vec<_>>(),
        vec!["N", "X", "E"]
    );
    assert!(!statuses[0].has_purchased);
    assert_eq!(statuses[0].first_purchase, None);
    assert_eq!(statuses[0].name, "Pro N");
    // Unassigned-season purchases still count as buying.
    assert!(statuses[1].has_purchased);
    assert!(statuses[2].has_purchased);
    assert_eq!(statuses[2].first_purchase, Some(d(2021, 8, 1)));
}
