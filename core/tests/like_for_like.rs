use chrono::NaiveDate;
use loyalty_core::{
    evolution::DEFAULT_DEAD_BAND,
    like_for_like::{
        compare, compare_by_segment, compare_entities, compare_stores, compare_tiers,
        compare_with_previous,
        current_months, store_kpis, Comparison, Metric,
    },
    rank::RankMovement,
    tier::{Tier, TierLadder},
    transaction::{GroupKey, Registration, Scope, TransactionRow, TransactionTable},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Season 10 has Jul and Aug only; season 9 has Jul through Dec.
fn partial_season_table() -> TransactionTable {
    let mut rows = Vec::new();
    for (i, month) in (7..=12).enumerate() {
        rows.push(
            TransactionRow::new("A", 9, d(2023, month, 10), 100.0 * (i as f64 + 1.0))
                .at_store("Loja 1", "Casa")
                .order(&format!("S9-{month}")),
        );
    }
    rows.push(
        TransactionRow::new("A", 10, d(2024, 7, 10), 250.0)
            .at_store("Loja 1", "Casa")
            .order("S10-7"),
    );
    rows.push(
        TransactionRow::new("B", 10, d(2024, 8, 10), 200.0)
            .at_store("Loja 2", "Revenda")
            .order("S10-8"),
    );
    TransactionTable::new(rows, Vec::new())
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The prior total only includes the months present in the current season.
#[test]
fn prior_is_restricted_to_current_months() {
    let table = partial_season_table();
    let months = current_months(&table, 10, &Scope::all());
    assert_eq!(months.into_iter().collect::<Vec<_>>(), vec![7, 8]);

    let cmp = compare(&table, 10, 9, &Scope::all(), Metric::Points);
    assert_eq!(cmp.current(), 450.0);
    // Jul (100) + Aug (200); Sep..Dec (300..600) excluded.
    assert_eq!(cmp.prior(), Some(300.0));
    assert_eq!(cmp.growth(), Some(0.5));
}

/// The month set follows the scope, not the whole table.
#[test]
fn restriction_is_scoped() {
    let table = partial_season_table();
    let scope = Scope::all().with_stores(["Loja 1"]);
    let cmp = compare(&table, 10, 9, &scope, Metric::Points);
    // Loja 1 only has Jul in season 10.
    assert_eq!(cmp.current(), 250.0);
    assert_eq!(cmp.prior(), Some(100.0));
}

/// No prior season is undefined, which is not the same as a zero prior.
#[test]
fn missing_prior_season_is_undefined() {
    let table = partial_season_table();
    let undefined = compare(&table, 1, 0, &Scope::all(), Metric::Points);
    assert!(!undefined.is_defined());
    assert_eq!(undefined.display(DEFAULT_DEAD_BAND), "N/A");

    let zero_prior = compare(&table, 10, 3, &Scope::all(), Metric::Points);
    assert_eq!(zero_prior.prior(), Some(0.0));
    assert!(zero_prior.is_new());
    assert_eq!(zero_prior.growth(), Some(1.0));
    assert_eq!(zero_prior.display(DEFAULT_DEAD_BAND), "100.0% ↑↑");

    assert!(matches!(
        compare_with_previous(&table, 1, &Scope::all(), Metric::Points),
        Comparison::Undefined { .. }
    ));
}

#[test]
fn order_and_entity_metrics_are_restricted_too() {
    let table = partial_season_table();
    let orders = compare(&table, 10, 9, &Scope::all(), Metric::Orders);
    assert_eq!(orders.current(), 2.0);
    assert_eq!(orders.prior(), Some(2.0));

    let active = compare(&table, 10, 9, &Scope::all(), Metric::ActiveEntities);
    assert_eq!(active.current(), 2.0);
    assert_eq!(active.prior(), Some(1.0));
}

#[test]
fn new_registrations_metric() {
    let rows = vec![
        TransactionRow::new("N", 10, d(2024, 7, 2), 10.0).order("X1"),
        TransactionRow::new("N", 10, d(2024, 7, 9), 10.0).order("X2"),
        TransactionRow::new("O", 9, d(2023, 7, 2), 10.0).order("X3"),
    ];
    let registrations = vec![Registration {
        entity_id: "N".into(),
        name: "Novo".into(),
        season: 10,
    }];
    let table = TransactionTable::new(rows, registrations);
    let cmp = compare(&table, 10, 9, &Scope::all(), Metric::NewRegistrations);
    assert_eq!(cmp.current(), 1.0);
    assert_eq!(cmp.prior(), Some(0.0));
}

#[test]
fn segment_breakdown_has_total_and_shares() {
    let table = partial_season_table();
    let breakdown = compare_by_segment(&table, 10, 9, &Scope::all()).unwrap();
    assert_eq!(breakdown.rows.len(), 2);

    let casa = breakdown.rows.iter().find(|r| r.segment == "Casa").unwrap();
    assert_eq!(casa.current, 250.0);
    assert_eq!(casa.prior, 300.0);

    let revenda = breakdown.rows.iter().find(|r| r.segment == "Revenda").unwrap();
    assert_eq!(revenda.prior, 0.0);
    assert_eq!(revenda.growth, 1.0);

    assert_eq!(breakdown.total.current, 450.0);
    assert_eq!(breakdown.total.prior, 300.0);
    assert!((casa.share + revenda.share - 1.0).abs() < 1e-9);

    assert!(compare_by_segment(&table, 10, 0, &Scope::all()).is_none());
}

#[test]
fn entity_comparison_labels() {
    let table = partial_season_table();
    let ladder = TierLadder::standard();
    let rows = compare_entities(&table, 10, 9, &Scope::all(), GroupKey::Document, &ladder);
    assert_eq!(rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(rows[0].prior, 300.0);
    assert_eq!(rows[0].label, "-16.7%");
    assert_eq!(rows[1].label, "new");
}

/// Prior points per tier come from each entity's own restricted prior total.
#[test]
fn tier_breakdown_classifies_prior_on_restricted_totals() {
    let rows = vec![
        TransactionRow::new("big", 9, d(2023, 7, 1), 160_000.0),
        TransactionRow::new("big", 9, d(2023, 9, 1), 400_000.0),
        TransactionRow::new("big", 10, d(2024, 7, 1), 10_000.0),
    ];
    let table = TransactionTable::new(rows, Vec::new());
    let tiers = compare_tiers(&table, 10, 9, &Scope::all(), GroupKey::Document, &TierLadder::standard());

    assert_eq!(tiers.len(), Tier::ALL.len() + 1);
    // Restricted to Jul the prior total is 160k: Topázio, not Ruby.
    let topazio = tiers.iter().find(|t| t.tier == Some(Tier::Topazio)).unwrap();
    assert_eq!(topazio.prior_points, Some(160_000.0));
    let ruby = tiers.iter().find(|t| t.tier == Some(Tier::Ruby)).unwrap();
    assert_eq!(ruby.prior_points, Some(0.0));

    let pro = tiers.iter().find(|t| t.tier == Some(Tier::Pro)).unwrap();
    assert_eq!(pro.count, 1);
    assert_eq!(pro.points, 10_000.0);

    let total = tiers.last().unwrap();
    assert_eq!(total.tier, None);
    assert_eq!(total.count, 1);
    assert_eq!(total.prior_points, Some(160_000.0));
}

#[test]
fn store_kpis_with_rank_movement() {
    let table = partial_season_table();
    let kpis = store_kpis(&table, &Scope::all().with_stores(["Loja 2"]), 10);
    assert_eq!(kpis.current.points, 200.0);
    assert_eq!(kpis.prior.map(|p| p.points), Some(0.0));
    // Loja 1 (250) outranks Loja 2 (200) in season 10; Loja 2 absent in 9.
    assert_eq!(kpis.current_rank, Some(2));
    assert_eq!(kpis.prior_rank, None);
    assert_eq!(kpis.movement, RankMovement::New);

    let first = store_kpis(&table, &Scope::all().with_stores(["Loja 1"]), 10);
    assert_eq!(first.current_rank, Some(1));
    assert_eq!(first.prior_rank, Some(1));
    assert_eq!(first.movement, RankMovement::Held);
}

/// Each store against its own restricted prior; stores that only sold in
/// the prior months still appear.
#[test]
fn store_comparison_is_like_for_like() {
    let mut rows = partial_season_table().rows().to_vec();
    rows.push(
        TransactionRow::new("C", 9, d(2023, 7, 20), 80.0)
            .at_store("Loja 3", "Casa")
            .order("S9-C"),
    );
    rows.push(
        TransactionRow::new("C", 9, d(2023, 11, 20), 500.0)
            .at_store("Loja 3", "Casa")
            .order("S9-C2"),
    );
    let table = TransactionTable::new(rows, Vec::new());
    let stores = compare_stores(&table, 10, 9, &Scope::all());

    assert_eq!(
        stores.iter().map(|s| s.store.as_str()).collect::<Vec<_>>(),
        vec!["Loja 1", "Loja 2", "Loja 3"]
    );
    assert_eq!((stores[0].current, stores[0].prior), (250.0, 300.0));
    assert_eq!(stores[0].segment, "Casa");
    assert_eq!(stores[0].label, "-16.7%");
    assert_eq!((stores[1].current, stores[1].prior), (200.0, 0.0));
    assert_eq!(stores[1].label, "new");
    // November is outside the current months.
    assert_eq!((stores[2].current, stores[2].prior), (0.0, 80.0));
    assert_eq!(stores[2].growth, -1.0);
}

#[test]
fn store_comparison_without_prior_season() {
    let table = partial_season_table();
    let stores = compare_stores(&table, 10, 0, &Scope::all());
    assert_eq!(stores.len(), 2);
    assert!(stores.iter().all(|s| s.prior == 0.0 && s.label == "new"));
}

#[test]
fn average_order_value_metric() {
    let table = partial_season_table();
    let cmp = compare(&table, 10, 9, &Scope::all(), Metric::AverageOrderValue);
    // 450 over two orders against 300 over two orders.
    assert_eq!(cmp.current(), 225.0);
    assert_eq!(cmp.prior(), Some(150.0));
    assert_eq!(cmp.growth(), Some(0.5));
}
