use serde::{Deserialize, Serialize};

use crate::models::velocity::Trend;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub completion_rate: f64,
    pub on_time_rate: f64,
    pub velocity_score: f64,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current: i64,
    pub best: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionScore {
    pub current: f64,
    pub trend: Trend,
    pub vs_last_week: f64,
    pub breakdown: ScoreBreakdown,
    pub streak: StreakSummary,
}

/// One persisted score row per user per day. Feeds trend, vs-last-week and
/// streak inputs on later computations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshotRecord {
    pub user_id: String,
    pub snapshot_date: String,
    pub current: f64,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryResponse {
    pub user_id: String,
    pub scores: Vec<ScoreSnapshotRecord>,
    pub start_date: String,
    pub end_date: String,
    pub total_scores: usize,
}
