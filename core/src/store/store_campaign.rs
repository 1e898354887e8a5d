use super::{new_id, not_found, parse_date, CampaignStore};
use crate::{
    campaign::{validate_range, CampaignStatus, StoreGrowthCampaign},
    error::ReportResult,
    types::Season,
};
use rusqlite::{params, OptionalExtension};

struct RawStoreCampaign {
    id: String,
    title: String,
    growth_pct: f64,
    min_guarantee: f64,
    start: String,
    end: String,
    current_season: i64,
    prior_season: i64,
    description: String,
    status: String,
}

impl RawStoreCampaign {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            growth_pct: row.get(2)?,
            min_guarantee: row.get(3)?,
            start: row.get(4)?,
            end: row.get(5)?,
            current_season: row.get(6)?,
            prior_season: row.get(7)?,
            description: row.get(8)?,
            status: row.get(9)?,
        })
    }

    fn decode(self) -> ReportResult<StoreGrowthCampaign> {
        Ok(StoreGrowthCampaign {
            start: parse_date("start_date", &self.start)?,
            end: parse_date("end_date", &self.end)?,
            status: CampaignStatus::parse(&self.status)?,
            id: self.id,
            title: self.title,
            growth_pct: self.growth_pct,
            min_guarantee: self.min_guarantee,
            current_season: self.current_season as Season,
            prior_season: self.prior_season as Season,
            description: self.description,
        })
    }
}

const SELECT_STORE_CAMPAIGN: &str = "SELECT campaign_id, title, growth_pct, min_guarantee,
        start_date, end_date, current_season, prior_season, description, status
 FROM store_campaign";

impl CampaignStore {
    pub fn insert_store_campaign(&self, campaign: &StoreGrowthCampaign) -> ReportResult<String> {
        validate_range(campaign.start, campaign.end)?;
        let id = if campaign.id.is_empty() {
            new_id()
        } else {
            campaign.id.clone()
        };
        self.conn.execute(
            "INSERT INTO store_campaign (
                campaign_id, title, growth_pct, min_guarantee, start_date, end_date,
                current_season, prior_season, description, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                campaign.title,
                campaign.growth_pct,
                campaign.min_guarantee,
                campaign.start.to_string(),
                campaign.end.to_string(),
                campaign.current_season as i64,
                campaign.prior_season as i64,
                campaign.description,
                campaign.status.as_str(),
            ],
        )?;
        log::info!("campaign store: inserted store campaign {id} '{}'", campaign.title);
        Ok(id)
    }

    pub fn update_store_campaign(&self, campaign: &StoreGrowthCampaign) -> ReportResult<()> {
        validate_range(campaign.start, campaign.end)?;
        let changed = self.conn.execute(
            "UPDATE store_campaign
             SET title = ?1, growth_pct = ?2, min_guarantee = ?3, start_date = ?4,
                 end_date = ?5, current_season = ?6, prior_season = ?7,
                 description = ?8, status = ?9
             WHERE campaign_id = ?10",
            params![
                campaign.title,
                campaign.growth_pct,
                campaign.min_guarantee,
                campaign.start.to_string(),
                campaign.end.to_string(),
                campaign.current_season as i64,
                campaign.prior_season as i64,
                campaign.description,
                campaign.status.as_str(),
                campaign.id,
            ],
        )?;
        if changed == 0 {
            return Err(not_found(&campaign.id));
        }
        Ok(())
    }

    pub fn get_store_campaign(&self, id: &str) -> ReportResult<StoreGrowthCampaign> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_STORE_CAMPAIGN} WHERE campaign_id = ?1"),
                params![id],
                RawStoreCampaign::from_row,
            )
            .optional()?;
        raw.ok_or_else(|| not_found(id))?.decode()
    }

    /// Active campaigns first, then most recent start date.
    pub fn list_store_campaigns(&self) -> ReportResult<Vec<StoreGrowthCampaign>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_STORE_CAMPAIGN}
             ORDER BY CASE status WHEN 'active' THEN 0 ELSE 1 END, start_date DESC, title ASC"
        ))?;
        let raws = stmt
            .query_map([], RawStoreCampaign::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawStoreCampaign::decode).collect()
    }

    pub fn delete_store_campaign(&self, id: &str) -> ReportResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM store_campaign WHERE campaign_id = ?1", params![id])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub fn toggle_store_campaign(&self, id: &str) -> ReportResult<CampaignStatus> {
        let status = self.get_store_campaign(id)?.status.toggled();
        self.conn.execute(
            "UPDATE store_campaign SET status = ?1 WHERE campaign_id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(status)
    }
}
