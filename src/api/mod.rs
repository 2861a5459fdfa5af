use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::bottleneck::Bottleneck;
use crate::models::config::AnalyticsConfig;
use crate::models::report::{ExecutionOverview, ReportExportResult, ReportFormat};
use crate::models::score::{ExecutionScore, ScoreHistoryResponse, ScoreSnapshotRecord};
use crate::models::velocity::VelocityMetrics;
use crate::models::workload::{TeamMember, TeamWorkload};
use crate::services::bottleneck_service;
use crate::services::execution_score_service::ExecutionScoreService;
use crate::services::history_service::{HistoryService, TaskProvider};
use crate::services::report_service::ReportService;
use crate::services::velocity_service;
use crate::services::workload_service;

/// Facade the host's REST endpoints call: fetch the snapshot through the
/// provider, run the pure calculators, hand back plain data structures.
#[derive(Clone)]
pub struct AnalyticsState {
    db_pool: DbPool,
    config: AnalyticsConfig,
    provider: Arc<dyn TaskProvider>,
    score_service: Arc<ExecutionScoreService>,
    history_service: Arc<HistoryService>,
    report_service: Arc<ReportService>,
}

impl AnalyticsState {
    pub fn new(
        db_pool: DbPool,
        provider: Arc<dyn TaskProvider>,
        config: AnalyticsConfig,
    ) -> AppResult<Self> {
        let score_service = Arc::new(ExecutionScoreService::new(db_pool.clone(), config.clone()));
        let history_service = Arc::new(HistoryService::new(
            db_pool.clone(),
            Arc::clone(&provider),
            Arc::clone(&score_service),
        ));
        let report_service = Arc::new(ReportService::new(ReportService::default_reports_dir(
            db_pool.path(),
        ))?);

        history_service.ensure_nightly_job()?;

        Ok(Self {
            db_pool,
            config,
            provider,
            score_service,
            history_service,
            report_service,
        })
    }

    pub fn scores(&self) -> Arc<ExecutionScoreService> {
        Arc::clone(&self.score_service)
    }

    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history_service)
    }

    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.report_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// GET /my-work/execution-score
    pub fn execution_score(&self, user_id: &str) -> ApiResult<ExecutionScore> {
        let tasks = self.provider.tasks_for_user(user_id)?;
        Ok(self
            .score_service
            .score_for_user(user_id, &tasks, Utc::now())?)
    }

    /// GET /my-work/velocity
    pub fn velocity(&self, user_id: &str, window_days: Option<i64>) -> ApiResult<VelocityMetrics> {
        let tasks = self.provider.tasks_for_user(user_id)?;
        let (team_tasks, team_size) = self.team_snapshot()?;
        let window = window_days.unwrap_or(self.config.velocity_window_days);

        Ok(velocity_service::compute_velocity(
            &tasks,
            &team_tasks,
            team_size,
            window,
            Utc::now(),
        ))
    }

    /// GET /my-work/bottlenecks
    pub fn bottlenecks(&self, user_id: &str) -> ApiResult<Vec<Bottleneck>> {
        let tasks = self.provider.tasks_for_user(user_id)?;
        Ok(bottleneck_service::detect_bottlenecks(
            &tasks,
            &self.config,
            Utc::now(),
        ))
    }

    /// GET /my-work/workload
    pub fn workload(&self, members: &[TeamMember], period_days: i64) -> ApiResult<TeamWorkload> {
        if members.is_empty() {
            return Err(ApiError::from(AppError::input(
                "workload requires at least one team member",
            )));
        }

        let mut team_tasks = Vec::new();
        for member in members {
            team_tasks.extend(self.provider.tasks_for_user(&member.id)?);
        }

        Ok(workload_service::compute_workload(
            &team_tasks,
            members,
            period_days,
            &self.config,
            Utc::now(),
        ))
    }

    pub fn score_history(
        &self,
        user_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> ApiResult<ScoreHistoryResponse> {
        Ok(self
            .score_service
            .score_history(user_id, start_date, end_date)?)
    }

    pub fn latest_score(&self, user_id: &str) -> ApiResult<Option<ScoreSnapshotRecord>> {
        Ok(self.score_service.latest_score(user_id)?)
    }

    /// Everything at once, for the dashboard and for report export.
    pub fn overview(
        &self,
        user_id: &str,
        members: Option<&[TeamMember]>,
        period_days: i64,
    ) -> ApiResult<ExecutionOverview> {
        let now = Utc::now();
        let tasks = self.provider.tasks_for_user(user_id)?;
        let (team_tasks, team_size) = self.team_snapshot()?;

        let score = self.score_service.score_for_user(user_id, &tasks, now)?;
        let velocity = velocity_service::compute_velocity(
            &tasks,
            &team_tasks,
            team_size,
            self.config.velocity_window_days,
            now,
        );
        let bottlenecks = bottleneck_service::detect_bottlenecks(&tasks, &self.config, now);
        let workload = members.map(|members| {
            workload_service::compute_workload(&team_tasks, members, period_days, &self.config, now)
        });

        Ok(ExecutionOverview {
            user_id: user_id.to_string(),
            generated_at: now.to_rfc3339(),
            score,
            velocity,
            bottlenecks,
            workload,
        })
    }

    pub fn export_report(
        &self,
        user_id: &str,
        members: Option<&[TeamMember]>,
        period_days: i64,
        format: ReportFormat,
    ) -> ApiResult<ReportExportResult> {
        let overview = self.overview(user_id, members, period_days)?;
        Ok(self.report_service.export(&overview, format)?)
    }

    fn team_snapshot(&self) -> AppResult<(Vec<crate::models::task::TaskSnapshot>, usize)> {
        let users = self.provider.list_users()?;
        let team_size = users.len();
        let mut team_tasks = Vec::new();
        for user in users {
            team_tasks.extend(self.provider.tasks_for_user(&user)?);
        }
        Ok((team_tasks, team_size))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON-safe error payload for the host's response layer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl ApiError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Input { message, details } => {
                ApiError::new("INPUT_ERROR", message, details)
            }
            AppError::Fetch { message } => {
                warn!(target: "analytics::api", %message, "fetch failure surfaced to caller");
                ApiError::new("FETCH_FAILED", message, None)
            }
            AppError::NotFound => ApiError::new("NOT_FOUND", "requested record does not exist", None),
            AppError::Conflict { message } => ApiError::new("CONFLICT", message, None),
            AppError::Database { message } => {
                error!(target: "analytics::api", %message, "database error in api");
                ApiError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "analytics::api", error = %error, "serialization error in api");
                ApiError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "analytics::api", error = %error, "io error in api");
                ApiError::new("UNKNOWN", "filesystem read/write failed", None)
            }
            AppError::Other(message) => {
                error!(target: "analytics::api", %message, "unexpected error in api");
                ApiError::new("UNKNOWN", message, None)
            }
        }
    }
}
