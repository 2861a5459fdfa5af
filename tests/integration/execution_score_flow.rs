use std::sync::Arc;

use chrono::{Duration, Utc};
use consultify_analytics::api::AnalyticsState;
use consultify_analytics::db::DbPool;
use consultify_analytics::error::AppResult;
use consultify_analytics::models::config::AnalyticsConfig;
use consultify_analytics::models::report::ReportFormat;
use consultify_analytics::models::task::{RawTask, TaskSnapshot};
use consultify_analytics::services::history_service::TaskProvider;
use tempfile::NamedTempFile;

struct StubProvider {
    tasks: Vec<TaskSnapshot>,
}

impl TaskProvider for StubProvider {
    fn list_users(&self) -> AppResult<Vec<String>> {
        Ok(vec!["user-1".to_string()])
    }

    fn tasks_for_user(&self, _user_id: &str) -> AppResult<Vec<TaskSnapshot>> {
        Ok(self.tasks.clone())
    }
}

fn raw_task(id: &str, status: &str) -> RawTask {
    let now = Utc::now();
    RawTask {
        id: id.to_string(),
        title: format!("Task {id}"),
        status: status.to_string(),
        priority: "medium".to_string(),
        assignee_id: Some("user-1".to_string()),
        created_at: Some((now - Duration::days(10)).to_rfc3339()),
        updated_at: Some((now - Duration::days(1)).to_rfc3339()),
        ..RawTask::default()
    }
}

fn snapshot_fixture() -> Vec<TaskSnapshot> {
    let now = Utc::now();
    let mut tasks = Vec::new();

    // completed on time yesterday
    for i in 0..3 {
        let mut raw = raw_task(&format!("done-{i}"), "completed");
        raw.due_at = Some(now.to_rfc3339());
        raw.completed_at = Some((now - Duration::days(1)).to_rfc3339());
        tasks.push(raw.into_snapshot());
    }
    // still open, due next week
    for i in 0..2 {
        let mut raw = raw_task(&format!("open-{i}"), "in-progress");
        raw.due_at = Some((now + Duration::days(7)).to_rfc3339());
        tasks.push(raw.into_snapshot());
    }

    tasks
}

fn state_with(tasks: Vec<TaskSnapshot>) -> (AnalyticsState, NamedTempFile) {
    let temp = NamedTempFile::new().unwrap();
    let pool = DbPool::new(temp.path()).unwrap();
    let provider = Arc::new(StubProvider { tasks });
    let state = AnalyticsState::new(pool, provider, AnalyticsConfig::default()).unwrap();
    (state, temp)
}

#[test]
fn score_endpoint_returns_bounded_score_and_persists() {
    let (state, _temp) = state_with(snapshot_fixture());

    let score = state.execution_score("user-1").unwrap();
    assert!(score.current >= 0.0 && score.current <= 100.0);
    assert!((score.breakdown.completion_rate - 60.0).abs() < 1e-9);
    assert!((score.breakdown.on_time_rate - 100.0).abs() < 1e-9);

    let latest = state.latest_score("user-1").unwrap().unwrap();
    assert_eq!(latest.snapshot_date, Utc::now().date_naive().to_string());
    assert!((latest.current - score.current).abs() < 1e-9);
}

#[test]
fn empty_snapshot_scores_zero_through_the_api() {
    let (state, _temp) = state_with(Vec::new());

    let score = state.execution_score("user-1").unwrap();
    assert_eq!(score.current, 0.0);
    assert_eq!(score.streak.current, 0);
}

#[test]
fn recomputing_the_same_day_does_not_trend_against_itself() {
    let (state, _temp) = state_with(snapshot_fixture());

    let first = state.execution_score("user-1").unwrap();
    let second = state.execution_score("user-1").unwrap();
    assert_eq!(second.trend, first.trend);
    assert!((second.current - first.current).abs() < 1e-9);
}

#[test]
fn velocity_endpoint_counts_recent_completions() {
    let (state, _temp) = state_with(snapshot_fixture());

    let metrics = state.velocity("user-1", Some(7)).unwrap();
    assert_eq!(metrics.window_days, 7);
    assert_eq!(metrics.points.len(), 7);

    let completed_total: i64 = metrics.points.iter().map(|p| p.completed).sum();
    assert_eq!(completed_total, 3);
    assert!(metrics.team_average_velocity > 0.0);
}

#[test]
fn score_history_covers_captured_days() {
    let (state, _temp) = state_with(snapshot_fixture());
    state.execution_score("user-1").unwrap();

    let today = Utc::now().date_naive();
    let start = (today - Duration::days(30)).to_string();
    let end = today.to_string();

    let history = state.score_history("user-1", &start, &end).unwrap();
    assert_eq!(history.total_scores, 1);
    assert_eq!(history.scores[0].snapshot_date, today.to_string());
}

#[test]
fn overview_export_produces_readable_report() {
    let (state, _temp) = state_with(snapshot_fixture());

    let overview = state.overview("user-1", None, 7).unwrap();
    assert_eq!(overview.user_id, "user-1");
    assert!(overview.workload.is_none());

    let result = state
        .export_report("user-1", None, 7, ReportFormat::Markdown)
        .unwrap();
    let content = std::fs::read_to_string(&result.file_path).unwrap();
    assert!(content.contains("# Execution Analytics Report"));
    assert!(content.contains("user-1"));
}
