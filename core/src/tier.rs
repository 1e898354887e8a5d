//! Tier classification from a season point total.
//!
//! Tiers are ordered bands with ascending minimums. The lowest band starts
//! at 0 so every non-negative total lands in exactly one tier.

use crate::types::Points;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pro,
    Topazio,
    Ruby,
    Esmeralda,
    Diamante,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Pro,
        Tier::Topazio,
        Tier::Ruby,
        Tier::Esmeralda,
        Tier::Diamante,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pro => "Pro",
            Self::Topazio => "Topázio",
            Self::Ruby => "Ruby",
            Self::Esmeralda => "Esmeralda",
            Self::Diamante => "Diamante",
        }
    }

    /// Label shown on the salesperson dashboard ("Rubi" instead of "Ruby").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ruby => "Rubi",
            other => other.name(),
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub tier: Tier,
    pub min: Points,
}

/// Result of classifying one point total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierStatus {
    pub points: Points,
    pub tier: Tier,
    pub tier_min: Points,
    pub next_tier: Option<Tier>,
    pub next_min: Option<Points>,
}

impl TierStatus {
    /// Progress toward the next tier in [0, 1]; 1.0 at the top tier.
    pub fn progress(&self) -> f64 {
        match self.next_min {
            Some(next_min) if next_min > self.tier_min => {
                ((self.points - self.tier_min) / (next_min - self.tier_min)).clamp(0.0, 1.0)
            }
            Some(_) => 0.0,
            None => 1.0,
        }
    }

    /// Points still missing for the next tier, `None` at the top tier.
    pub fn points_to_next(&self) -> Option<Points> {
        self.next_min.map(|next| (next - self.points).max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierLadder {
    bands: Vec<TierBand>,
}

impl Default for TierLadder {
    fn default() -> Self {
        Self::standard()
    }
}

impl TierLadder {
    /// The program's fixed thresholds.
    pub fn standard() -> Self {
        Self {
            bands: vec![
                TierBand { tier: Tier::Pro, min: 0.0 },
                TierBand { tier: Tier::Topazio, min: 150_000.0 },
                TierBand { tier: Tier::Ruby, min: 500_000.0 },
                TierBand { tier: Tier::Esmeralda, min: 2_000_000.0 },
                TierBand { tier: Tier::Diamante, min: 5_000_000.0 },
            ],
        }
    }

    /// Build a ladder from configured bands. Bands are sorted ascending and
    /// the lowest band is pinned to 0 so classification stays exhaustive.
    pub fn from_bands(mut bands: Vec<TierBand>) -> Self {
        if bands.is_empty() {
            return Self::standard();
        }
        bands.sort_by(|a, b| a.min.total_cmp(&b.min));
        if bands[0].min != 0.0 {
            log::warn!(
                "tier ladder: lowest band {} starts at {}, pinning to 0",
                bands[0].tier.name(),
                bands[0].min
            );
            bands[0].min = 0.0;
        }
        Self { bands }
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    pub fn classify(&self, points: Points) -> TierStatus {
        let points = if points.is_nan() || points < 0.0 { 0.0 } else { points };

        let idx = self
            .bands
            .iter()
            .rposition(|band| points >= band.min)
            .unwrap_or(0);
        let current = self.bands[idx];
        let next = self.bands.get(idx + 1);

        TierStatus {
            points,
            tier: current.tier,
            tier_min: current.min,
            next_tier: next.map(|b| b.tier),
            next_min: next.map(|b| b.min),
        }
    }

    pub fn tier_of(&self, points: Points) -> Tier {
        self.classify(points).tier
    }
}

/// Classify against the standard ladder.
pub fn classify(points: Points) -> TierStatus {
    TierLadder::standard().classify(points)
}
