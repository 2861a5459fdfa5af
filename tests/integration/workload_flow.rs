use std::sync::Arc;

use chrono::{Duration, Utc};
use consultify_analytics::api::AnalyticsState;
use consultify_analytics::db::DbPool;
use consultify_analytics::error::AppResult;
use consultify_analytics::models::config::AnalyticsConfig;
use consultify_analytics::models::task::{RawTask, TaskSnapshot};
use consultify_analytics::models::workload::{TeamMember, WorkloadStatus};
use consultify_analytics::services::history_service::TaskProvider;
use tempfile::NamedTempFile;

/// Serves each member their own task list, as a host backed by a real
/// store would.
struct TeamProvider {
    tasks_by_user: Vec<(String, Vec<TaskSnapshot>)>,
}

impl TaskProvider for TeamProvider {
    fn list_users(&self) -> AppResult<Vec<String>> {
        Ok(self
            .tasks_by_user
            .iter()
            .map(|(user, _)| user.clone())
            .collect())
    }

    fn tasks_for_user(&self, user_id: &str) -> AppResult<Vec<TaskSnapshot>> {
        Ok(self
            .tasks_by_user
            .iter()
            .find(|(user, _)| user == user_id)
            .map(|(_, tasks)| tasks.clone())
            .unwrap_or_default())
    }
}

fn member(id: &str) -> TeamMember {
    TeamMember {
        id: id.to_string(),
        name: format!("Member {id}"),
        daily_capacity_hours: 8.0,
    }
}

fn task_due_today(id: &str, assignee: &str, hours: f64) -> TaskSnapshot {
    let now = Utc::now();
    RawTask {
        id: id.to_string(),
        title: format!("Task {id}"),
        status: "todo".to_string(),
        priority: "medium".to_string(),
        assignee_id: Some(assignee.to_string()),
        due_at: Some(now.to_rfc3339()),
        created_at: Some((now - Duration::days(3)).to_rfc3339()),
        updated_at: Some(now.to_rfc3339()),
        estimated_hours: Some(hours),
        ..RawTask::default()
    }
    .into_snapshot()
}

fn state_with(provider: TeamProvider) -> (AnalyticsState, NamedTempFile) {
    let temp = NamedTempFile::new().unwrap();
    let pool = DbPool::new(temp.path()).unwrap();
    let state =
        AnalyticsState::new(pool, Arc::new(provider), AnalyticsConfig::default()).unwrap();
    (state, temp)
}

#[test]
fn overloaded_member_is_flagged_at_150_percent() {
    // 3 tasks of 4 hours due today against an 8 hour day
    let provider = TeamProvider {
        tasks_by_user: vec![(
            "u-1".to_string(),
            (0..3)
                .map(|i| task_due_today(&format!("t-{i}"), "u-1", 4.0))
                .collect(),
        )],
    };
    let (state, _temp) = state_with(provider);

    let workload = state.workload(&[member("u-1")], 1).unwrap();
    let user = &workload.members[0];

    assert!((user.allocation - 150.0).abs() < 1e-9);
    assert_eq!(user.status, WorkloadStatus::Overloaded);
    assert_eq!(workload.overloaded_count, 1);
}

#[test]
fn idle_member_reads_zero_allocation() {
    let provider = TeamProvider {
        tasks_by_user: vec![
            (
                "u-1".to_string(),
                vec![task_due_today("busy-1", "u-1", 6.0)],
            ),
            ("u-2".to_string(), Vec::new()),
        ],
    };
    let (state, _temp) = state_with(provider);

    let workload = state.workload(&[member("u-1"), member("u-2")], 7).unwrap();

    let idle = workload
        .members
        .iter()
        .find(|m| m.user_id == "u-2")
        .unwrap();
    assert_eq!(idle.allocation, 0.0);
    assert_eq!(idle.status, WorkloadStatus::Available);
    assert_eq!(idle.daily_breakdown.len(), 7);
    assert!(idle
        .daily_breakdown
        .iter()
        .all(|day| day.allocation >= 0.0 && day.hours == 0.0));
    assert_eq!(workload.underutilized_count, 2);
}

#[test]
fn allocation_never_goes_negative() {
    let provider = TeamProvider {
        tasks_by_user: vec![(
            "u-1".to_string(),
            vec![
                task_due_today("t-1", "u-1", 12.0),
                task_due_today("t-2", "u-1", 0.5),
            ],
        )],
    };
    let (state, _temp) = state_with(provider);

    let workload = state.workload(&[member("u-1")], 14).unwrap();
    for member_load in &workload.members {
        assert!(member_load.allocation >= 0.0);
        for day in &member_load.daily_breakdown {
            assert!(day.allocation >= 0.0);
        }
    }
}

#[test]
fn workload_serializes_for_the_presentation_layer() {
    let provider = TeamProvider {
        tasks_by_user: vec![(
            "u-1".to_string(),
            vec![task_due_today("t-1", "u-1", 4.0)],
        )],
    };
    let (state, _temp) = state_with(provider);

    let workload = state.workload(&[member("u-1")], 3).unwrap();
    let json = serde_json::to_string(&workload).unwrap();

    assert!(json.contains("\"userId\":\"u-1\""));
    assert!(json.contains("\"dailyBreakdown\""));
    assert!(json.contains("\"teamAverage\""));
}
