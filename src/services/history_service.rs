use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tracing::{debug, error, info};

use crate::db::repositories::score_repository::ScoreRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::score::ScoreSnapshotRecord;
use crate::models::task::TaskSnapshot;
use crate::services::execution_score_service::ExecutionScoreService;
use crate::utils::time;

const CAPTURE_JOB_HOUR: u32 = 0;
const CAPTURE_JOB_MINUTE: u32 = 20;
const CAPTURE_MIN_SLEEP_SECS: u64 = 60;
const CAPTURE_FALLBACK_SLEEP_SECS: u64 = 3600;

/// Seam to the external task store. Fetching is the only I/O in the
/// subsystem and happens strictly before any computation; a failing
/// provider aborts the request, it never degrades a result.
pub trait TaskProvider: Send + Sync {
    fn list_users(&self) -> AppResult<Vec<String>>;
    fn tasks_for_user(&self, user_id: &str) -> AppResult<Vec<TaskSnapshot>>;
}

/// Captures one score-history row per user per day and prunes old rows,
/// so trend, vs-last-week and streak inputs accumulate without the host
/// doing anything.
pub struct HistoryService {
    db: DbPool,
    provider: Arc<dyn TaskProvider>,
    scores: Arc<ExecutionScoreService>,
    job_started: AtomicBool,
}

impl HistoryService {
    pub fn new(
        db: DbPool,
        provider: Arc<dyn TaskProvider>,
        scores: Arc<ExecutionScoreService>,
    ) -> Self {
        Self {
            db,
            provider,
            scores,
            job_started: AtomicBool::new(false),
        }
    }

    /// Recomputes and stores the score for one user as of the end of
    /// `date`. Fetch failures propagate before anything is computed.
    pub fn capture_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<ScoreSnapshotRecord> {
        let tasks = self.provider.tasks_for_user(user_id)?;
        let reference = time::day_end(date);
        self.scores.score_for_user(user_id, &tasks, reference)?;

        let conn = self.db.get_connection()?;
        let row = ScoreRepository::find_by_date(&conn, user_id, &date)?
            .ok_or_else(|| AppError::other("captured snapshot missing after upsert"))?;

        self.prune(date)?;
        Ok(row.into_record())
    }

    /// Capture for every tracked user; per-user failures are logged and
    /// the batch continues, matching the nightly-job contract.
    pub fn capture_previous_day(&self) -> AppResult<usize> {
        let today = Utc::now().date_naive();
        let target = today.pred_opt().unwrap_or(today);
        let users = self.provider.list_users()?;

        let mut captured = 0usize;
        for user_id in users {
            match self.capture_for_date(&user_id, target) {
                Ok(_) => captured += 1,
                Err(err) => {
                    error!(
                        target: "analytics::history",
                        user_id = %user_id,
                        error = %err,
                        "history capture failed for user"
                    );
                }
            }
        }

        info!(
            target: "analytics::history",
            date = %target,
            captured,
            "history capture finished"
        );
        Ok(captured)
    }

    /// Starts the nightly capture thread once. Subsequent calls are
    /// no-ops.
    pub fn ensure_nightly_job(self: &Arc<Self>) -> AppResult<()> {
        if self
            .job_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let runner = Arc::clone(self);
            if let Err(err) = thread::Builder::new()
                .name("score-history-capture".to_string())
                .spawn(move || runner.run_capture_loop())
            {
                self.job_started.store(false, Ordering::SeqCst);
                error!(
                    target: "analytics::history",
                    error = %err,
                    "failed to start history capture thread"
                );
                return Err(AppError::other(format!(
                    "failed to start history capture job: {err}"
                )));
            }
            info!(target: "analytics::history", "nightly history capture started");
        }
        Ok(())
    }

    fn run_capture_loop(self: Arc<Self>) {
        loop {
            let now = Utc::now();
            let next_run = Self::next_capture_run(now);
            let sleep_duration = duration_until(next_run, now);
            debug!(
                target: "analytics::history",
                seconds = sleep_duration.as_secs(),
                "sleeping until next history capture"
            );
            thread::sleep(sleep_duration);

            if let Err(err) = self.capture_previous_day() {
                error!(
                    target: "analytics::history",
                    error = %err,
                    "scheduled history capture failed"
                );
            }
        }
    }

    fn next_capture_run(now: DateTime<Utc>) -> DateTime<Utc> {
        let today_target = now
            .date_naive()
            .and_hms_opt(CAPTURE_JOB_HOUR, CAPTURE_JOB_MINUTE, 0)
            .unwrap();
        let candidate = Utc.from_utc_datetime(&today_target);
        if candidate > now {
            candidate
        } else {
            let next_date = now.date_naive().succ_opt().unwrap_or_else(|| now.date_naive());
            let next_target = next_date
                .and_hms_opt(CAPTURE_JOB_HOUR, CAPTURE_JOB_MINUTE, 0)
                .unwrap();
            Utc.from_utc_datetime(&next_target)
        }
    }

    fn prune(&self, reference: NaiveDate) -> AppResult<()> {
        let retention = self.scores.config().history_retention_days;
        if retention <= 0 {
            return Ok(());
        }
        if let Some(cutoff) = reference.checked_sub_signed(Duration::days(retention)) {
            let conn = self.db.get_connection()?;
            let deleted = ScoreRepository::delete_before(&conn, &cutoff)?;
            if deleted > 0 {
                debug!(
                    target: "analytics::history",
                    deleted,
                    cutoff = %cutoff,
                    "pruned old history rows"
                );
            }
        }
        Ok(())
    }
}

fn duration_until(target: DateTime<Utc>, now: DateTime<Utc>) -> StdDuration {
    match (target - now).to_std() {
        Ok(duration) if duration >= StdDuration::from_secs(CAPTURE_MIN_SLEEP_SECS) => duration,
        Ok(_) => StdDuration::from_secs(CAPTURE_MIN_SLEEP_SECS),
        Err(_) => StdDuration::from_secs(CAPTURE_FALLBACK_SLEEP_SECS),
    }
}
