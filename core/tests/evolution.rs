use loyalty_core::evolution::{
    direction_of, format_growth, format_growth_with, growth_ratio, Direction, DEFAULT_DEAD_BAND,
};

// ── Tests ────────────────────────────────────────────────────────────────────

/// Growth from a zero base is never an error.
#[test]
fn zero_prior_convention() {
    assert_eq!(growth_ratio(500.0, 0.0), 1.0);
    assert_eq!(growth_ratio(0.0, 0.0), 0.0);
    assert_eq!(growth_ratio(150.0, 100.0), 0.5);
    assert_eq!(growth_ratio(80.0, 100.0), -0.2);
}

/// Floating point noise below the dead band is flat.
#[test]
fn dead_band_hides_noise() {
    let g = format_growth(100.00001, 100.0);
    assert_eq!(g.direction, Direction::Flat);
    assert_eq!(g.display, "0.0% ≈");

    assert_eq!(direction_of(0.0002, DEFAULT_DEAD_BAND), Direction::Up);
    assert_eq!(direction_of(-0.0002, DEFAULT_DEAD_BAND), Direction::Down);
    assert_eq!(direction_of(0.0001, DEFAULT_DEAD_BAND), Direction::Flat);
}

#[test]
fn display_strings() {
    assert_eq!(format_growth(150.0, 100.0).display, "50.0% ↑↑");
    assert_eq!(format_growth(80.0, 100.0).display, "-20.0% ↓↓");
    assert_eq!(format_growth(10.0, 0.0).display, "100.0% ↑↑");
}

/// A wider configured dead band swallows small moves.
#[test]
fn custom_dead_band() {
    let g = format_growth_with(101.0, 100.0, 0.05);
    assert_eq!(g.direction, Direction::Flat);
    assert!((g.ratio - 0.01).abs() < 1e-12);
}
