use std::sync::Arc;

use chrono::{Duration, Utc};
use consultify_analytics::api::AnalyticsState;
use consultify_analytics::db::DbPool;
use consultify_analytics::error::AppResult;
use consultify_analytics::models::bottleneck::{BottleneckKind, Impact};
use consultify_analytics::models::config::AnalyticsConfig;
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
        priority: "high".to_string(),
        assignee_id: Some("user-1".to_string()),
        created_at: Some((now - Duration::days(20)).to_rfc3339()),
        updated_at: Some((now - Duration::days(1)).to_rfc3339()),
        ..RawTask::default()
    }
}

fn state_with(tasks: Vec<TaskSnapshot>) -> (AnalyticsState, NamedTempFile) {
    let temp = NamedTempFile::new().unwrap();
    let pool = DbPool::new(temp.path()).unwrap();
    let provider = Arc::new(StubProvider { tasks });
    let state = AnalyticsState::new(pool, provider, AnalyticsConfig::default()).unwrap();
    (state, temp)
}

#[test]
fn clean_board_reports_no_bottlenecks() {
    let tasks = vec![
        raw_task("a", "todo").into_snapshot(),
        raw_task("b", "in-progress").into_snapshot(),
    ];
    let (state, _temp) = state_with(tasks);

    assert!(state.bottlenecks("user-1").unwrap().is_empty());
}

#[test]
fn mixed_board_ranks_by_impact_then_count() {
    let now = Utc::now();
    let mut tasks = Vec::new();

    // five stalled in-progress tasks: high impact
    for i in 0..5 {
        let mut raw = raw_task(&format!("stalled-{i}"), "in-progress");
        raw.updated_at = Some((now - Duration::days(12)).to_rfc3339());
        tasks.push(raw.into_snapshot());
    }
    // two overdue tasks in one initiative: medium
    for i in 0..2 {
        let mut raw = raw_task(&format!("late-{i}"), "todo");
        raw.due_at = Some((now - Duration::days(3)).to_rfc3339());
        raw.initiative_id = Some("init-1".to_string());
        tasks.push(raw.into_snapshot());
    }
    // one unassigned open task: medium
    let mut orphan = raw_task("orphan", "todo");
    orphan.assignee_id = None;
    tasks.push(orphan.into_snapshot());

    let (state, _temp) = state_with(tasks);
    let bottlenecks = state.bottlenecks("user-1").unwrap();

    assert_eq!(bottlenecks.len(), 3);
    assert_eq!(bottlenecks[0].kind, BottleneckKind::StalledTasks);
    assert_eq!(bottlenecks[0].impact, Impact::High);
    assert_eq!(bottlenecks[1].kind, BottleneckKind::OverdueCluster);
    assert_eq!(bottlenecks[2].kind, BottleneckKind::MissingAssignment);

    for bottleneck in &bottlenecks {
        assert_eq!(bottleneck.count as usize, bottleneck.affected_task_ids.len());
        assert!(!bottleneck.suggestion.is_empty());
    }
}

#[test]
fn blocked_chain_surfaces_through_the_api() {
    let mut a = raw_task("a", "blocked");
    a.blocking_task_ids = Vec::new();
    let mut b = raw_task("b", "blocked");
    b.blocking_task_ids = vec!["a".to_string()];
    let mut c = raw_task("c", "blocked");
    c.blocking_task_ids = vec!["b".to_string()];

    let tasks = vec![a.into_snapshot(), b.into_snapshot(), c.into_snapshot()];
    let (state, _temp) = state_with(tasks);

    let bottlenecks = state.bottlenecks("user-1").unwrap();
    let chain = bottlenecks
        .iter()
        .find(|b| b.kind == BottleneckKind::BlockedChain)
        .expect("blocked chain detected");

    assert_eq!(chain.count, 3);
    assert_eq!(chain.impact, Impact::High);
    assert_eq!(chain.affected_task_ids.len(), 3);
}

#[test]
fn dependency_cycle_does_not_hang_the_detector() {
    let mut a = raw_task("a", "blocked");
    a.blocking_task_ids = vec!["b".to_string()];
    let mut b = raw_task("b", "blocked");
    b.blocking_task_ids = vec!["a".to_string()];

    let tasks = vec![a.into_snapshot(), b.into_snapshot()];
    let (state, _temp) = state_with(tasks);

    let bottlenecks = state.bottlenecks("user-1").unwrap();
    let chain = bottlenecks
        .iter()
        .find(|b| b.kind == BottleneckKind::BlockedChain)
        .expect("cycle still reported as a chain");
    assert_eq!(chain.count, 2);
}

#[test]
fn delayed_decision_blocking_work_is_high_impact() {
    let now = Utc::now();

    let mut decision = raw_task("decide-vendor", "todo");
    decision.task_type = Some("decision".to_string());
    decision.created_at = Some((now - Duration::days(10)).to_rfc3339());

    let mut waiting = raw_task("implement", "blocked");
    waiting.blocking_task_ids = vec!["decide-vendor".to_string()];

    let tasks = vec![decision.into_snapshot(), waiting.into_snapshot()];
    let (state, _temp) = state_with(tasks);

    let bottlenecks = state.bottlenecks("user-1").unwrap();
    let delay = bottlenecks
        .iter()
        .find(|b| b.kind == BottleneckKind::DecisionDelay)
        .expect("decision delay detected");

    assert_eq!(delay.impact, Impact::High);
    assert_eq!(delay.affected_task_ids, vec!["decide-vendor"]);
}

#[test]
fn legacy_status_strings_are_normalized_before_detection() {
    let now = Utc::now();

    // "on-hold" collapses to blocked, "Completed" to done
    let mut held = raw_task("held", "on-hold");
    held.blocking_task_ids = vec!["finished".to_string()];
    let mut finished = raw_task("finished", "Completed");
    finished.completed_at = Some((now - Duration::days(2)).to_rfc3339());

    let tasks = vec![held.into_snapshot(), finished.into_snapshot()];
    let (state, _temp) = state_with(tasks);

    let bottlenecks = state.bottlenecks("user-1").unwrap();
    let chain = bottlenecks
        .iter()
        .find(|b| b.kind == BottleneckKind::BlockedChain)
        .expect("held task chains into its finished blocker");
    assert_eq!(chain.count, 2);
    assert_eq!(chain.impact, Impact::Medium);
}
