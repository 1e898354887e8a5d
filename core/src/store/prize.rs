use super::{new_id, not_found, CampaignStore};
use crate::{
    campaign::{PrizeStatus, SeasonPrize},
    error::ReportResult,
    types::Season,
};
use rusqlite::{params, OptionalExtension};

const SELECT_PRIZE: &str =
    "SELECT prize_id, title, season, goal, description, status FROM season_prize";

fn prize_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(SeasonPrize, String)> {
    let status: String = row.get(5)?;
    Ok((
        SeasonPrize {
            id: row.get(0)?,
            title: row.get(1)?,
            season: row.get::<_, i64>(2)? as Season,
            goal: row.get(3)?,
            description: row.get(4)?,
            status: PrizeStatus::Active,
        },
        status,
    ))
}

fn decode((mut prize, status): (SeasonPrize, String)) -> ReportResult<SeasonPrize> {
    prize.status = PrizeStatus::parse(&status)?;
    Ok(prize)
}

impl CampaignStore {
    pub fn insert_prize(&self, prize: &SeasonPrize) -> ReportResult<String> {
        let id = if prize.id.is_empty() {
            new_id()
        } else {
            prize.id.clone()
        };
        self.conn.execute(
            "INSERT INTO season_prize (prize_id, title, season, goal, description, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                prize.title,
                prize.season as i64,
                prize.goal,
                prize.description,
                prize.status.as_str(),
            ],
        )?;
        log::info!("campaign store: inserted prize {id} '{}' season={}", prize.title, prize.season);
        Ok(id)
    }

    pub fn update_prize(&self, prize: &SeasonPrize) -> ReportResult<()> {
        let changed = self.conn.execute(
            "UPDATE season_prize
             SET title = ?1, season = ?2, goal = ?3, description = ?4, status = ?5
             WHERE prize_id = ?6",
            params![
                prize.title,
                prize.season as i64,
                prize.goal,
                prize.description,
                prize.status.as_str(),
                prize.id,
            ],
        )?;
        if changed == 0 {
            return Err(not_found(&prize.id));
        }
        Ok(())
    }

    pub fn get_prize(&self, id: &str) -> ReportResult<SeasonPrize> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_PRIZE} WHERE prize_id = ?1"),
                params![id],
                prize_from_row,
            )
            .optional()?;
        decode(raw.ok_or_else(|| not_found(id))?)
    }

    /// Ordered by season, then goal ascending.
    pub fn list_prizes(&self) -> ReportResult<Vec<SeasonPrize>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_PRIZE} ORDER BY season ASC, goal ASC, title ASC"))?;
        let raws = stmt
            .query_map([], prize_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(decode).collect()
    }

    /// Active prizes of one season, goal ascending.
    pub fn active_prizes_for(&self, season: Season) -> ReportResult<Vec<SeasonPrize>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_PRIZE} WHERE season = ?1 AND status = 'active' ORDER BY goal ASC, title ASC"
        ))?;
        let raws = stmt
            .query_map(params![season as i64], prize_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(decode).collect()
    }

    pub fn delete_prize(&self, id: &str) -> ReportResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM season_prize WHERE prize_id = ?1", params![id])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Flip Active ↔ Paused and return the new status.
    pub fn toggle_prize(&self, id: &str) -> ReportResult<PrizeStatus> {
        let status = self.get_prize(id)?.status.toggled();
        self.conn.execute(
            "UPDATE season_prize SET status = ?1 WHERE prize_id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(status)
    }
}
