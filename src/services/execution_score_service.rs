use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::info;

use crate::db::repositories::score_repository::{ScoreRepository, ScoreSnapshotRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::bottleneck::Bottleneck;
use crate::models::config::AnalyticsConfig;
use crate::models::score::{
    ExecutionScore, ScoreBreakdown, ScoreHistoryResponse, ScoreSnapshotRecord, StreakSummary,
};
use crate::models::task::{TaskSnapshot, TaskStatus};
use crate::models::velocity::{Trend, VelocityMetrics};
use crate::services::bottleneck_service;
use crate::services::velocity_service;
use crate::utils::time;

/// History rows loaded for trend/streak inputs. Bounds the backward streak
/// walk as well.
const HISTORY_LOOKBACK_ROWS: usize = 90;

/// Scoring engine. Owns the history store; the arithmetic itself lives in
/// the pure functions below and never touches I/O.
pub struct ExecutionScoreService {
    db: DbPool,
    config: AnalyticsConfig,
}

impl ExecutionScoreService {
    pub fn new(db: DbPool, config: AnalyticsConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Computes the score for one user's snapshot, persists today's history
    /// row, and returns the result. The caller must have filtered the task
    /// set to the user's ownership already.
    pub fn score_for_user(
        &self,
        user_id: &str,
        tasks: &[TaskSnapshot],
        now: DateTime<Utc>,
    ) -> AppResult<ExecutionScore> {
        if user_id.trim().is_empty() {
            return Err(AppError::input("user id must not be empty"));
        }

        let today = now.date_naive();
        let history = self.load_history(user_id, today)?;

        // cross-calculator inputs: velocity trend and bottleneck severity
        let velocity = velocity_service::compute_velocity(
            tasks,
            tasks,
            1,
            self.config.velocity_window_days,
            now,
        );
        let bottlenecks = bottleneck_service::detect_bottlenecks(tasks, &self.config, now);

        let score = execution_score(tasks, &history, &velocity, &bottlenecks, &self.config, now);
        self.persist_snapshot(user_id, tasks, &score, now)?;

        info!(
            target: "analytics::score",
            user_id,
            current = score.current,
            trend = %score.trend,
            "execution score computed"
        );

        Ok(score)
    }

    pub fn latest_score(&self, user_id: &str) -> AppResult<Option<ScoreSnapshotRecord>> {
        let conn = self.db.get_connection()?;
        let row = ScoreRepository::latest_for_user(&conn, user_id)?;
        Ok(row.map(ScoreSnapshotRow::into_record))
    }

    pub fn score_history(
        &self,
        user_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<ScoreHistoryResponse> {
        let start = parse_history_date(start_date)?;
        let end = parse_history_date(end_date)?;
        if start > end {
            return Err(AppError::input("start date must not be after end date"));
        }

        let conn = self.db.get_connection()?;
        let rows = ScoreRepository::list_range(&conn, user_id, &start, &end)?;
        let scores: Vec<ScoreSnapshotRecord> =
            rows.into_iter().map(ScoreSnapshotRow::into_record).collect();
        let total_scores = scores.len();

        Ok(ScoreHistoryResponse {
            user_id: user_id.to_string(),
            scores,
            start_date: start.to_string(),
            end_date: end.to_string(),
            total_scores,
        })
    }

    /// History strictly before `today`, most recent first, so a recompute
    /// later the same day never trends against itself.
    fn load_history(&self, user_id: &str, today: NaiveDate) -> AppResult<Vec<ScoreSnapshotRecord>> {
        let conn = self.db.get_connection()?;
        let rows = ScoreRepository::list_recent(&conn, user_id, HISTORY_LOOKBACK_ROWS + 1)?;
        let today = today.to_string();

        Ok(rows
            .into_iter()
            .map(ScoreSnapshotRow::into_record)
            .filter(|record| record.snapshot_date != today)
            .take(HISTORY_LOOKBACK_ROWS)
            .collect())
    }

    fn persist_snapshot(
        &self,
        user_id: &str,
        tasks: &[TaskSnapshot],
        score: &ExecutionScore,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let today = now.date_naive();
        let (focus_total, focus_completed) = focus_counts(tasks, today);
        let overdue = overdue_open_count(tasks, now);

        let record = ScoreSnapshotRecord {
            user_id: user_id.to_string(),
            snapshot_date: today.to_string(),
            current: score.current,
            completion_rate: score.breakdown.completion_rate,
            on_time_rate: score.breakdown.on_time_rate,
            velocity_score: score.breakdown.velocity_score,
            quality_score: score.breakdown.quality_score,
            overdue_penalty: overdue as f64 * self.config.weights.overdue_penalty_points,
            focus_total,
            focus_completed,
            streak_current: score.streak.current,
            streak_best: score.streak.best,
            created_at: now.to_rfc3339(),
        };

        let conn = self.db.get_connection()?;
        ScoreRepository::upsert_snapshot(&conn, &ScoreSnapshotRow::from_record(&record))?;
        Ok(())
    }
}

fn parse_history_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::input(format!("invalid date: {value}")))
}

/// Pure scoring contract. `history` is ordered most recent first and must
/// not contain a row for `now`'s own date.
pub fn execution_score(
    tasks: &[TaskSnapshot],
    history: &[ScoreSnapshotRecord],
    velocity: &VelocityMetrics,
    bottlenecks: &[Bottleneck],
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> ExecutionScore {
    let streak = compute_streaks(tasks, history, now);

    // An empty snapshot scores zero outright; the quality sub-score would
    // otherwise report a spotless 100 for doing nothing.
    if tasks.is_empty() {
        return ExecutionScore {
            current: 0.0,
            trend: trend_vs_history(0.0, history),
            vs_last_week: pct_vs_last_week(0.0, history, now),
            breakdown: ScoreBreakdown::default(),
            streak,
        };
    }

    let breakdown = ScoreBreakdown {
        completion_rate: completion_rate(tasks),
        on_time_rate: on_time_rate(tasks),
        velocity_score: velocity_service::velocity_score(velocity),
        quality_score: bottleneck_service::quality_score(bottlenecks),
    };

    let weights = &config.weights;
    let blended = weights.completion * breakdown.completion_rate
        + weights.on_time * breakdown.on_time_rate
        + weights.velocity * breakdown.velocity_score
        + weights.quality * breakdown.quality_score;

    let penalty = overdue_open_count(tasks, now) as f64 * weights.overdue_penalty_points;
    let current = (blended - penalty).clamp(0.0, 100.0);

    ExecutionScore {
        current,
        trend: trend_vs_history(current, history),
        vs_last_week: pct_vs_last_week(current, history, now),
        breakdown,
        streak,
    }
}

pub fn completion_rate(tasks: &[TaskSnapshot]) -> f64 {
    let completed = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Done)
        .count();
    completed as f64 / tasks.len().max(1) as f64 * 100.0
}

/// Share of completed tasks that finished by their due date. Tasks without
/// a due date are excluded from the denominator, not penalized.
pub fn on_time_rate(tasks: &[TaskSnapshot]) -> f64 {
    let mut with_due = 0usize;
    let mut on_time = 0usize;

    for task in tasks {
        if task.status != TaskStatus::Done {
            continue;
        }
        let Some(due) = time::parse_opt_datetime(&task.due_at) else {
            continue;
        };
        with_due += 1;
        if let Some(completed) = time::parse_opt_datetime(&task.completed_at) {
            if completed <= due {
                on_time += 1;
            }
        }
    }

    on_time as f64 / with_due.max(1) as f64 * 100.0
}

pub fn overdue_open_count(tasks: &[TaskSnapshot], now: DateTime<Utc>) -> i64 {
    tasks
        .iter()
        .filter(|task| {
            task.status.is_open()
                && time::parse_opt_datetime(&task.due_at)
                    .map(|due| due < now)
                    .unwrap_or(false)
        })
        .count() as i64
}

fn trend_vs_history(current: f64, history: &[ScoreSnapshotRecord]) -> Trend {
    match history.first() {
        Some(last) if current > last.current => Trend::Up,
        Some(last) if current < last.current => Trend::Down,
        Some(_) => Trend::Stable,
        None => Trend::Stable,
    }
}

/// Signed percent difference against the row exactly 7 days back; 0 when
/// that row is absent or scored zero.
fn pct_vs_last_week(current: f64, history: &[ScoreSnapshotRecord], now: DateTime<Utc>) -> f64 {
    let target = (now.date_naive() - Duration::days(7)).to_string();
    history
        .iter()
        .find(|record| record.snapshot_date == target)
        .filter(|record| record.current > 0.0)
        .map(|record| (current - record.current) / record.current * 100.0)
        .unwrap_or(0.0)
}

fn focus_counts(tasks: &[TaskSnapshot], date: NaiveDate) -> (i64, i64) {
    let mut total = 0i64;
    let mut completed = 0i64;
    for task in tasks {
        if task.is_focus_task_for(date) {
            total += 1;
            if task.status == TaskStatus::Done {
                completed += 1;
            }
        }
    }
    (total, completed)
}

/// Walks backward from `now`. Today's focus result comes from the live
/// snapshot, earlier days from history rows. Days without focus tasks are
/// skipped; a day with an incomplete focus task ends the streak.
fn compute_streaks(
    tasks: &[TaskSnapshot],
    history: &[ScoreSnapshotRecord],
    now: DateTime<Utc>,
) -> StreakSummary {
    let today = now.date_naive();
    let by_date: HashMap<&str, &ScoreSnapshotRecord> = history
        .iter()
        .map(|record| (record.snapshot_date.as_str(), record))
        .collect();

    let mut current = 0i64;
    for offset in 0..HISTORY_LOOKBACK_ROWS as i64 {
        let day = today - Duration::days(offset);
        let (total, completed) = if offset == 0 {
            focus_counts(tasks, day)
        } else {
            by_date
                .get(day.to_string().as_str())
                .map(|record| (record.focus_total, record.focus_completed))
                .unwrap_or((0, 0))
        };

        if total == 0 {
            continue;
        }
        if completed == total {
            current += 1;
        } else {
            break;
        }
    }

    let best_recorded = history
        .iter()
        .map(|record| record.streak_best)
        .max()
        .unwrap_or(0);

    StreakSummary {
        current,
        best: best_recorded.max(current),
    }
}
