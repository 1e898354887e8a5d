use chrono::NaiveDate;
use loyalty_core::{
    rank::{compare_ranks, rank_stores, rank_within_season, RankMovement},
    transaction::{GroupKey, Scope, TransactionRow, TransactionTable},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn row(entity: &str, season: u32, points: f64) -> TransactionRow {
    let year = 2014 + season as i32;
    TransactionRow::new(entity, season, d(year, 7, 15), points).at_store("Loja", "Casa")
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// [300, 300, 100] ranks as [1, 1, 3].
#[test]
fn competition_ranking() {
    let table = TransactionTable::new(
        vec![row("x", 5, 300.0), row("y", 5, 300.0), row("z", 5, 100.0)],
        Vec::new(),
    );
    let ranks = rank_within_season(&table, 5, &Scope::all(), GroupKey::Document);
    let pairs: Vec<(&str, usize)> = ranks.iter().map(|e| (e.key.as_str(), e.rank)).collect();
    assert_eq!(pairs, vec![("x", 1), ("y", 1), ("z", 3)]);
}

/// Zero-point entities are not ranked.
#[test]
fn zero_points_are_excluded() {
    let table = TransactionTable::new(
        vec![row("x", 5, 10.0), row("zero", 5, 0.0)],
        Vec::new(),
    );
    let ranks = rank_within_season(&table, 5, &Scope::all(), GroupKey::Document);
    assert_eq!(ranks.len(), 1);
    assert_eq!(ranks[0].key, "x");
}

/// One entity only in season 10, another only in season 9: each gets the
/// other season's gap rank of 2 and a variation of +1.
#[test]
fn gap_fill_single_entities() {
    let table = TransactionTable::new(
        vec![row("new", 10, 1000.0), row("old", 9, 500.0)],
        Vec::new(),
    );
    let cmp = compare_ranks(&table, 10, 9, &Scope::all(), GroupKey::Document);
    assert_eq!(cmp.current_gap, 2);
    assert_eq!(cmp.prior_gap, 2);

    let new = cmp.row("new").unwrap();
    assert_eq!((new.current_rank, new.prior_rank, new.variation), (1, 2, 1));
    assert_eq!(new.movement, RankMovement::New);

    let old = cmp.row("old").unwrap();
    assert_eq!((old.current_rank, old.prior_rank), (2, 1));
    assert_eq!(old.variation, -1);
    assert_eq!(old.movement, RankMovement::Left);
}

/// Every missing entity shares the same gap rank.
#[test]
fn missing_entities_share_gap_rank() {
    let table = TransactionTable::new(
        vec![
            row("a", 9, 300.0),
            row("b", 9, 200.0),
            row("c", 9, 100.0),
            row("a", 10, 50.0),
        ],
        Vec::new(),
    );
    let cmp = compare_ranks(&table, 10, 9, &Scope::all(), GroupKey::Document);
    assert_eq!(cmp.current_gap, 2);
    assert_eq!(cmp.row("b").unwrap().current_rank, 2);
    assert_eq!(cmp.row("c").unwrap().current_rank, 2);
    assert_eq!(cmp.row("c").unwrap().variation, 1);
    assert_eq!(cmp.row("b").unwrap().variation, 0);
}

/// Output sorted by current adjusted rank, ties by key.
#[test]
fn rows_sorted_by_current_rank() {
    let table = TransactionTable::new(
        vec![
            row("z", 9, 10.0),
            row("m", 10, 50.0),
            row("b", 10, 80.0),
            row("a", 9, 20.0),
        ],
        Vec::new(),
    );
    let cmp = compare_ranks(&table, 10, 9, &Scope::all(), GroupKey::Document);
    let order: Vec<(&str, usize)> = cmp.rows.iter().map(|r| (r.key.as_str(), r.current_rank)).collect();
    assert_eq!(order, vec![("b", 1), ("m", 2), ("a", 3), ("z", 3)]);
}

/// Entities with zero points in both seasons are dropped.
#[test]
fn zero_in_both_dropped() {
    let table = TransactionTable::new(
        vec![row("ghost", 9, 0.0), row("ghost", 10, 0.0), row("x", 10, 5.0)],
        Vec::new(),
    );
    let cmp = compare_ranks(&table, 10, 9, &Scope::all(), GroupKey::Document);
    assert!(cmp.row("ghost").is_none());
    assert_eq!(cmp.rows.len(), 1);
    // Nobody ranked in season 9: gap is 0 + 1.
    assert_eq!(cmp.prior_gap, 1);
}

#[test]
fn undefined_prior_or_empty_scope_is_empty() {
    let table = TransactionTable::new(vec![row("x", 1, 5.0)], Vec::new());
    assert!(compare_ranks(&table, 1, 0, &Scope::all(), GroupKey::Document).is_empty());

    let nothing = Scope::all().with_stores(Vec::<String>::new());
    assert!(compare_ranks(&table, 2, 1, &nothing, GroupKey::Document).is_empty());
}

#[test]
fn stores_ranked_by_points() {
    let rows = vec![
        row("a", 10, 100.0).at_store("Loja 1", "Casa"),
        row("b", 10, 300.0).at_store("Loja 2", "Casa"),
        row("c", 10, 300.0).at_store("Loja 3", "Revenda"),
    ];
    let table = TransactionTable::new(rows, Vec::new());
    let ranks = rank_stores(&table, 10, &Scope::all());
    let pairs: Vec<(&str, usize)> = ranks.iter().map(|r| (r.store.as_str(), r.rank)).collect();
    assert_eq!(pairs, vec![("Loja 2", 1), ("Loja 3", 1), ("Loja 1", 3)]);
}
