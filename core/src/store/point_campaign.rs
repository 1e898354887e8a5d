use super::{new_id, not_found, parse_date, CampaignStore};
use crate::{
    campaign::{validate_range, CampaignStatus, PointCampaign},
    error::ReportResult,
};
use rusqlite::{params, OptionalExtension};

/// Row as stored; dates and status still text.
struct RawPointCampaign {
    id: String,
    title: String,
    kind: String,
    goal: f64,
    start: String,
    end: String,
    bonus_pct: f64,
    description: String,
    status: String,
}

impl RawPointCampaign {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            kind: row.get(2)?,
            goal: row.get(3)?,
            start: row.get(4)?,
            end: row.get(5)?,
            bonus_pct: row.get(6)?,
            description: row.get(7)?,
            status: row.get(8)?,
        })
    }

    fn decode(self) -> ReportResult<PointCampaign> {
        Ok(PointCampaign {
            start: parse_date("start_date", &self.start)?,
            end: parse_date("end_date", &self.end)?,
            status: CampaignStatus::parse(&self.status)?,
            id: self.id,
            title: self.title,
            kind: self.kind,
            goal: self.goal,
            bonus_pct: self.bonus_pct,
            description: self.description,
        })
    }
}

const SELECT_POINT_CAMPAIGN: &str = "SELECT campaign_id, title, kind, goal, start_date, end_date,
        bonus_pct, description, status
 FROM point_campaign";

impl CampaignStore {
    /// Insert a point campaign. An empty id is replaced by a fresh uuid;
    /// the stored id is returned.
    pub fn insert_point_campaign(&self, campaign: &PointCampaign) -> ReportResult<String> {
        validate_range(campaign.start, campaign.end)?;
        let id = if campaign.id.is_empty() {
            new_id()
        } else {
            campaign.id.clone()
        };
        self.conn.execute(
            "INSERT INTO point_campaign (
                campaign_id, title, kind, goal, start_date, end_date,
                bonus_pct, description, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                campaign.title,
                campaign.kind,
                campaign.goal,
                campaign.start.to_string(),
                campaign.end.to_string(),
                campaign.bonus_pct,
                campaign.description,
                campaign.status.as_str(),
            ],
        )?;
        log::info!("campaign store: inserted point campaign {id} '{}'", campaign.title);
        Ok(id)
    }

    pub fn update_point_campaign(&self, campaign: &PointCampaign) -> ReportResult<()> {
        validate_range(campaign.start, campaign.end)?;
        let changed = self.conn.execute(
            "UPDATE point_campaign
             SET title = ?1, kind = ?2, goal = ?3, start_date = ?4, end_date = ?5,
                 bonus_pct = ?6, description = ?7, status = ?8
             WHERE campaign_id = ?9",
            params![
                campaign.title,
                campaign.kind,
                campaign.goal,
                campaign.start.to_string(),
                campaign.end.to_string(),
                campaign.bonus_pct,
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

    pub fn get_point_campaign(&self, id: &str) -> ReportResult<PointCampaign> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_POINT_CAMPAIGN} WHERE campaign_id = ?1"),
                params![id],
                RawPointCampaign::from_row,
            )
            .optional()?;
        raw.ok_or_else(|| not_found(id))?.decode()
    }

    /// Active campaigns first, then most recent start date.
    pub fn list_point_campaigns(&self) -> ReportResult<Vec<PointCampaign>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_POINT_CAMPAIGN}
             ORDER BY CASE status WHEN 'active' THEN 0 ELSE 1 END, start_date DESC, title ASC"
        ))?;
        let raws = stmt
            .query_map([], RawPointCampaign::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawPointCampaign::decode).collect()
    }

    pub fn delete_point_campaign(&self, id: &str) -> ReportResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM point_campaign WHERE campaign_id = ?1", params![id])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Flip Active ↔ Finished and return the new status.
    pub fn toggle_point_campaign(&self, id: &str) -> ReportResult<CampaignStatus> {
        let campaign = self.get_point_campaign(id)?;
        let status = campaign.status.toggled();
        self.conn.execute(
            "UPDATE point_campaign SET status = ?1 WHERE campaign_id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(status)
    }
}
