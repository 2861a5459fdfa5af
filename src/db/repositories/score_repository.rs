use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::score::ScoreSnapshotRecord;

const SELECT_COLUMNS: &str = r#"
    user_id,
    snapshot_date,
    current_score,
    completion_rate,
    on_time_rate,
    velocity_score,
    quality_score,
    overdue_penalty,
    focus_total,
    focus_completed,
    streak_current,
    streak_best,
    created_at
"#;

#[derive(Debug, Clone)]
pub struct ScoreSnapshotRow {
    pub user_id: String,
    pub snapshot_date: String,
    pub current_score: f64,
    pub completion_rate: f64,
    pub on_time_rate: f64,
    pub velocity_score: f64,
    pub quality_score: f64,
    pub overdue_penalty: f64,
    pub focus_total: i64,
    pub focus_completed: i64,
    pub streak_current: i64,
    pub streak_best: i64,
    pub created_at: String,
}

impl ScoreSnapshotRow {
    pub fn from_record(record: &ScoreSnapshotRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            snapshot_date: record.snapshot_date.clone(),
            current_score: record.current,
            completion_rate: record.completion_rate,
            on_time_rate: record.on_time_rate,
            velocity_score: record.velocity_score,
            quality_score: record.quality_score,
            overdue_penalty: record.overdue_penalty,
            focus_total: record.focus_total,
            focus_completed: record.focus_completed,
            streak_current: record.streak_current,
            streak_best: record.streak_best,
            created_at: record.created_at.clone(),
        }
    }

    pub fn into_record(self) -> ScoreSnapshotRecord {
        ScoreSnapshotRecord {
            user_id: self.user_id,
            snapshot_date: self.snapshot_date,
            current: self.current_score,
            completion_rate: self.completion_rate,
            on_time_rate: self.on_time_rate,
            velocity_score: self.velocity_score,
            quality_score: self.quality_score,
            overdue_penalty: self.overdue_penalty,
            focus_total: self.focus_total,
            focus_completed: self.focus_completed,
            streak_current: self.streak_current,
            streak_best: self.streak_best,
            created_at: self.created_at,
        }
    }
}

impl TryFrom<&Row<'_>> for ScoreSnapshotRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            snapshot_date: row.get("snapshot_date")?,
            current_score: row.get("current_score")?,
            completion_rate: row.get("completion_rate")?,
            on_time_rate: row.get("on_time_rate")?,
            velocity_score: row.get("velocity_score")?,
            quality_score: row.get("quality_score")?,
            overdue_penalty: row.get("overdue_penalty")?,
            focus_total: row.get("focus_total")?,
            focus_completed: row.get("focus_completed")?,
            streak_current: row.get("streak_current")?,
            streak_best: row.get("streak_best")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct ScoreRepository;

impl ScoreRepository {
    pub fn upsert_snapshot(conn: &Connection, row: &ScoreSnapshotRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO score_snapshots (
                    user_id,
                    snapshot_date,
                    current_score,
                    completion_rate,
                    on_time_rate,
                    velocity_score,
                    quality_score,
                    overdue_penalty,
                    focus_total,
                    focus_completed,
                    streak_current,
                    streak_best,
                    created_at
                ) VALUES (
                    :user_id,
                    :snapshot_date,
                    :current_score,
                    :completion_rate,
                    :on_time_rate,
                    :velocity_score,
                    :quality_score,
                    :overdue_penalty,
                    :focus_total,
                    :focus_completed,
                    :streak_current,
                    :streak_best,
                    :created_at
                )
                ON CONFLICT(user_id, snapshot_date) DO UPDATE SET
                    current_score = excluded.current_score,
                    completion_rate = excluded.completion_rate,
                    on_time_rate = excluded.on_time_rate,
                    velocity_score = excluded.velocity_score,
                    quality_score = excluded.quality_score,
                    overdue_penalty = excluded.overdue_penalty,
                    focus_total = excluded.focus_total,
                    focus_completed = excluded.focus_completed,
                    streak_current = excluded.streak_current,
                    streak_best = excluded.streak_best,
                    created_at = excluded.created_at
            "#,
            named_params! {
                ":user_id": &row.user_id,
                ":snapshot_date": &row.snapshot_date,
                ":current_score": &row.current_score,
                ":completion_rate": &row.completion_rate,
                ":on_time_rate": &row.on_time_rate,
                ":velocity_score": &row.velocity_score,
                ":quality_score": &row.quality_score,
                ":overdue_penalty": &row.overdue_penalty,
                ":focus_total": &row.focus_total,
                ":focus_completed": &row.focus_completed,
                ":streak_current": &row.streak_current,
                ":streak_best": &row.streak_best,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_date(
        conn: &Connection,
        user_id: &str,
        snapshot_date: &NaiveDate,
    ) -> AppResult<Option<ScoreSnapshotRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM score_snapshots
             WHERE user_id = ?1 AND snapshot_date = ?2"
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(
                rusqlite::params![user_id, snapshot_date.to_string()],
                |row| ScoreSnapshotRow::try_from(row),
            )
            .optional()?;

        Ok(row)
    }

    pub fn latest_for_user(
        conn: &Connection,
        user_id: &str,
    ) -> AppResult<Option<ScoreSnapshotRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM score_snapshots
             WHERE user_id = ?1
             ORDER BY snapshot_date DESC
             LIMIT 1"
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row([user_id], |row| ScoreSnapshotRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    /// Most recent snapshots first.
    pub fn list_recent(
        conn: &Connection,
        user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ScoreSnapshotRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM score_snapshots
             WHERE user_id = ?1
             ORDER BY snapshot_date DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(rusqlite::params![user_id, limit as i64], |row| {
                ScoreSnapshotRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Ascending date order within the inclusive range.
    pub fn list_range(
        conn: &Connection,
        user_id: &str,
        start: &NaiveDate,
        end: &NaiveDate,
    ) -> AppResult<Vec<ScoreSnapshotRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM score_snapshots
             WHERE user_id = ?1 AND snapshot_date >= ?2 AND snapshot_date <= ?3
             ORDER BY snapshot_date ASC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(
                rusqlite::params![user_id, start.to_string(), end.to_string()],
                |row| ScoreSnapshotRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn best_streak(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let best: Option<i64> = conn.query_row(
            "SELECT MAX(streak_best) FROM score_snapshots WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(best.unwrap_or(0))
    }

    pub fn delete_before(conn: &Connection, cutoff: &NaiveDate) -> AppResult<usize> {
        let deleted = conn.execute(
            "DELETE FROM score_snapshots WHERE snapshot_date < ?1",
            [cutoff.to_string()],
        )?;
        Ok(deleted)
    }
}
