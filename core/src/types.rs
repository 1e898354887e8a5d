//! Shared primitive types used across the entire report engine.

/// A season number. Season 0 means "unassigned" and never takes part in
/// season-indexed computations.
pub type Season = u32;

/// A stable reporting identifier: a cleaned document number or a
/// consolidated key, depending on the caller's grouping choice.
pub type EntityKey = String;

/// Loyalty points. Fractional values are allowed.
pub type Points = f64;

/// One-way display formatter. Never parsed back.
pub fn season_label(season: Season) -> String {
    format!("Season {season}")
}

/// Short form used in column headers ("S10").
pub fn season_short(season: Season) -> String {
    format!("S{season}")
}

/// Previous season number, or `None` when `season` has no predecessor.
pub fn previous_season(season: Season) -> Option<Season> {
    if season > 1 {
        Some(season - 1)
    } else {
        None
    }
}
