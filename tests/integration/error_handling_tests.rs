use std::sync::Arc;

use consultify_analytics::api::AnalyticsState;
use consultify_analytics::db::DbPool;
use consultify_analytics::error::{AppError, AppResult};
use consultify_analytics::models::config::AnalyticsConfig;
use consultify_analytics::models::task::TaskSnapshot;
use consultify_analytics::models::workload::TeamMember;
use consultify_analytics::services::history_service::TaskProvider;
use tempfile::NamedTempFile;

struct UnreachableStore;

impl TaskProvider for UnreachableStore {
    fn list_users(&self) -> AppResult<Vec<String>> {
        Err(AppError::fetch("task store timed out"))
    }

    fn tasks_for_user(&self, _user_id: &str) -> AppResult<Vec<TaskSnapshot>> {
        Err(AppError::fetch("task store timed out"))
    }
}

struct EmptyStore;

impl TaskProvider for EmptyStore {
    fn list_users(&self) -> AppResult<Vec<String>> {
        Ok(vec!["user-1".to_string()])
    }

    fn tasks_for_user(&self, _user_id: &str) -> AppResult<Vec<TaskSnapshot>> {
        Ok(Vec::new())
    }
}

fn state_with(provider: Arc<dyn TaskProvider>) -> (AnalyticsState, NamedTempFile) {
    let temp = NamedTempFile::new().unwrap();
    let pool = DbPool::new(temp.path()).unwrap();
    let state = AnalyticsState::new(pool, provider, AnalyticsConfig::default()).unwrap();
    (state, temp)
}

#[test]
fn fetch_failures_surface_with_a_retryable_code() {
    let (state, _temp) = state_with(Arc::new(UnreachableStore));

    let error = state.execution_score("user-1").unwrap_err();
    assert_eq!(error.code, "FETCH_FAILED");
    assert!(error.message.contains("timed out"));

    let error = state.bottlenecks("user-1").unwrap_err();
    assert_eq!(error.code, "FETCH_FAILED");

    let error = state.velocity("user-1", None).unwrap_err();
    assert_eq!(error.code, "FETCH_FAILED");
}

#[test]
fn fetch_failures_never_persist_partial_results() {
    let (state, _temp) = state_with(Arc::new(UnreachableStore));

    let _ = state.execution_score("user-1");
    // nothing was computed, so nothing may have been stored
    assert!(state.latest_score("user-1").unwrap().is_none());
}

#[test]
fn empty_input_is_a_zero_state_not_an_error() {
    let (state, _temp) = state_with(Arc::new(EmptyStore));

    let score = state.execution_score("user-1").unwrap();
    assert_eq!(score.current, 0.0);

    let bottlenecks = state.bottlenecks("user-1").unwrap();
    assert!(bottlenecks.is_empty());
}

#[test]
fn invalid_arguments_map_to_input_error() {
    let (state, _temp) = state_with(Arc::new(EmptyStore));

    let error = state
        .score_history("user-1", "next tuesday", "2026-08-31")
        .unwrap_err();
    assert_eq!(error.code, "INPUT_ERROR");

    let error = state.workload(&[], 7).unwrap_err();
    assert_eq!(error.code, "INPUT_ERROR");
}

#[test]
fn api_error_payload_serializes_cleanly() {
    let (state, _temp) = state_with(Arc::new(UnreachableStore));

    let error = state.execution_score("user-1").unwrap_err();
    let json = serde_json::to_value(&error).unwrap();

    assert_eq!(json["code"], "FETCH_FAILED");
    assert!(json["message"].as_str().unwrap().contains("timed out"));
    assert!(json.get("details").is_none());
}

#[test]
fn zero_capacity_member_falls_back_to_default_capacity() {
    let (state, _temp) = state_with(Arc::new(EmptyStore));

    let members = vec![TeamMember {
        id: "user-1".to_string(),
        name: "Zero".to_string(),
        daily_capacity_hours: 0.0,
    }];

    let workload = state.workload(&members, 1).unwrap();
    assert_eq!(workload.members[0].hours_capacity, 8.0);
    assert_eq!(workload.members[0].allocation, 0.0);
}
