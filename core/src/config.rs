use crate::{
    demo::DemoParams,
    evolution::DEFAULT_DEAD_BAND,
    tier::{Tier, TierBand, TierLadder},
    transaction::GroupKey,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
struct TierLadderFile {
    tiers: Vec<TierBand>,
}

/// Contents of `report/report_config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    pub program_name: String,
    /// Growth ratios within ± this value display as flat.
    #[serde(default = "default_dead_band")]
    pub growth_dead_band: f64,
    #[serde(default)]
    pub group_key: GroupKey,
    #[serde(default)]
    pub demo: DemoParams,
}

fn default_dead_band() -> f64 {
    DEFAULT_DEAD_BAND
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub tiers: Vec<TierBand>,
    pub settings: ReportSettings,
}

impl ReportConfig {
    /// Load from the data/ directory.
    /// In tests, use ReportConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let tier_path = format!("{data_dir}/tiers/tier_ladder.json");
        let tier_content = std::fs::read_to_string(&tier_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {tier_path}: {e}"))?;
        let tier_file: TierLadderFile = serde_json::from_str(&tier_content)?;
        validate_tiers(&tier_file.tiers).map_err(|e| anyhow::anyhow!("{tier_path}: {e}"))?;

        let settings_path = format!("{data_dir}/report/report_config.json");
        let settings_content = std::fs::read_to_string(&settings_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {settings_path}: {e}"))?;
        let settings: ReportSettings = serde_json::from_str(&settings_content)?;

        if settings.growth_dead_band.is_nan() || settings.growth_dead_band < 0.0 {
            anyhow::bail!(
                "{settings_path}: growth_dead_band must be >= 0, got {}",
                settings.growth_dead_band
            );
        }

        log::info!(
            "config: {} tier bands, dead band {}, program '{}'",
            tier_file.tiers.len(),
            settings.growth_dead_band,
            settings.program_name
        );

        Ok(Self {
            tiers: tier_file.tiers,
            settings,
        })
    }

    /// Hardcoded defaults for unit tests (no file I/O).
    pub fn default_test() -> Self {
        Self {
            tiers: TierLadder::standard().bands().to_vec(),
            settings: ReportSettings {
                program_name: "Loyalty Program".into(),
                growth_dead_band: DEFAULT_DEAD_BAND,
                group_key: GroupKey::Consolidated,
                demo: DemoParams::default(),
            },
        }
    }

    pub fn ladder(&self) -> TierLadder {
        TierLadder::from_bands(self.tiers.clone())
    }

    pub fn dead_band(&self) -> f64 {
        self.settings.growth_dead_band
    }

    pub fn group_key(&self) -> GroupKey {
        self.settings.group_key
    }
}

/// A ladder must name each tier at most once, and ascending minimums must
/// follow the tier order so a higher tier always needs more points.
pub fn validate_tiers(bands: &[TierBand]) -> anyhow::Result<()> {
    if bands.is_empty() {
        anyhow::bail!("tier ladder is empty");
    }
    let mut seen: Vec<Tier> = Vec::with_capacity(bands.len());
    for band in bands {
        if seen.contains(&band.tier) {
            anyhow::bail!("tier {} listed twice", band.tier.name());
        }
        if band.min.is_nan() {
            anyhow::bail!("tier {} has no numeric minimum", band.tier.name());
        }
        seen.push(band.tier);
    }

    let mut sorted = bands.to_vec();
    sorted.sort_by(|a, b| a.min.total_cmp(&b.min));
    for pair in sorted.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if lower.min == upper.min {
            anyhow::bail!(
                "tiers {} and {} share the minimum {}",
                lower.tier.name(),
                upper.tier.name(),
                lower.min
            );
        }
        if lower.tier > upper.tier {
            anyhow::bail!(
                "tier {} (min {}) ranks above {} (min {}) but needs fewer points",
                lower.tier.name(),
                lower.min,
                upper.tier.name(),
                upper.min
            );
        }
    }
    Ok(())
}
