use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::bottleneck::{Bottleneck, BottleneckKind, Impact};
use crate::models::config::AnalyticsConfig;
use crate::models::task::{TaskKind, TaskSnapshot, TaskStatus};
use crate::utils::time;

/// Deduction per bottleneck when folding severity into the quality
/// sub-score of the execution score.
const HIGH_IMPACT_PENALTY: f64 = 15.0;
const MEDIUM_IMPACT_PENALTY: f64 = 7.0;
const LOW_IMPACT_PENALTY: f64 = 3.0;

/// Runs the five detection rules over the snapshot and returns alerts
/// ranked by impact, then count, then rule order. Rules that match
/// nothing emit nothing.
pub fn detect_bottlenecks(
    tasks: &[TaskSnapshot],
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Vec<Bottleneck> {
    let mut bottlenecks = Vec::new();

    bottlenecks.extend(detect_stalled(tasks, config, now));
    bottlenecks.extend(detect_overdue_clusters(tasks, config, now));
    bottlenecks.extend(detect_blocked_chains(tasks, config));
    bottlenecks.extend(detect_missing_assignment(tasks));
    bottlenecks.extend(detect_decision_delay(tasks, config, now));

    bottlenecks.sort_by(|a, b| {
        b.impact
            .rank()
            .cmp(&a.impact.rank())
            .then(b.count.cmp(&a.count))
            .then(a.kind.rule_order().cmp(&b.kind.rule_order()))
    });

    debug!(
        target: "analytics::bottleneck",
        total = bottlenecks.len(),
        "bottleneck detection finished"
    );

    bottlenecks
}

/// Folds detected severity into a 0-100 quality sub-score.
pub fn quality_score(bottlenecks: &[Bottleneck]) -> f64 {
    let deductions: f64 = bottlenecks
        .iter()
        .map(|bottleneck| match bottleneck.impact {
            Impact::High => HIGH_IMPACT_PENALTY,
            Impact::Medium => MEDIUM_IMPACT_PENALTY,
            Impact::Low => LOW_IMPACT_PENALTY,
        })
        .sum();

    (100.0 - deductions).clamp(0.0, 100.0)
}

fn detect_stalled(
    tasks: &[TaskSnapshot],
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Option<Bottleneck> {
    let cutoff = now - Duration::days(config.staleness_threshold_days);

    let affected: Vec<String> = tasks
        .iter()
        .filter(|task| {
            task.status == TaskStatus::InProgress
                && time::parse_opt_datetime(&task.updated_at)
                    .map(|updated| updated < cutoff)
                    .unwrap_or(false)
        })
        .map(|task| task.id.clone())
        .collect();

    if affected.is_empty() {
        return None;
    }

    let impact = if affected.len() >= config.stalled_high_threshold {
        Impact::High
    } else {
        Impact::Medium
    };

    Some(Bottleneck {
        kind: BottleneckKind::StalledTasks,
        impact,
        count: affected.len() as i64,
        suggestion: format!(
            "Review in-progress tasks with no activity in {}+ days",
            config.staleness_threshold_days
        ),
        affected_task_ids: affected,
    })
}

fn detect_overdue_clusters(
    tasks: &[TaskSnapshot],
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Vec<Bottleneck> {
    // Tasks without an initiative form one catch-all cluster.
    let mut clusters: HashMap<Option<String>, Vec<String>> = HashMap::new();

    for task in tasks {
        if task.status.is_open() {
            if let Some(due) = time::parse_opt_datetime(&task.due_at) {
                if due < now {
                    clusters
                        .entry(task.initiative_id.clone())
                        .or_default()
                        .push(task.id.clone());
                }
            }
        }
    }

    let mut entries: Vec<(Option<String>, Vec<String>)> = clusters.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    entries
        .into_iter()
        .map(|(initiative, affected)| {
            let impact = if affected.len() >= config.overdue_cluster_high_threshold {
                Impact::High
            } else {
                Impact::Medium
            };
            let suggestion = match &initiative {
                Some(id) => format!(
                    "Re-plan the {} overdue tasks in initiative {}",
                    affected.len(),
                    id
                ),
                None => format!(
                    "Re-plan the {} overdue tasks outside any initiative",
                    affected.len()
                ),
            };
            Bottleneck {
                kind: BottleneckKind::OverdueCluster,
                impact,
                count: affected.len() as i64,
                suggestion,
                affected_task_ids: affected,
            }
        })
        .collect()
}

fn detect_blocked_chains(tasks: &[TaskSnapshot], config: &AnalyticsConfig) -> Vec<Bottleneck> {
    let by_id: HashMap<&str, &TaskSnapshot> = tasks
        .iter()
        .map(|task| (task.id.as_str(), task))
        .collect();

    let mut candidates: Vec<Vec<String>> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Blocked && !task.blocking_task_ids.is_empty())
        .map(|task| longest_chain_from(task, &by_id))
        .filter(|chain| chain.len() >= 2)
        .collect();

    // Longest chains win; shorter candidates that are suffixes of an
    // already-kept chain are dropped so each task appears in one alert.
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut claimed: HashSet<String> = HashSet::new();
    let mut bottlenecks = Vec::new();

    for chain in candidates {
        if chain.iter().any(|id| claimed.contains(id)) {
            continue;
        }
        claimed.extend(chain.iter().cloned());

        let impact = if chain.len() >= config.chain_high_threshold {
            Impact::High
        } else {
            Impact::Medium
        };

        bottlenecks.push(Bottleneck {
            kind: BottleneckKind::BlockedChain,
            impact,
            count: chain.len() as i64,
            suggestion: format!(
                "Unblock the chain starting at task {} ({} tasks waiting)",
                chain[0],
                chain.len()
            ),
            affected_task_ids: chain,
        });
    }

    bottlenecks
}

/// Longest simple path from `start` following blocker edges. Iterative
/// with an explicit frame stack; a revisited node is a chain terminator
/// (cycle boundary), and a non-blocked blocker ends the walk after being
/// included.
fn longest_chain_from(start: &TaskSnapshot, by_id: &HashMap<&str, &TaskSnapshot>) -> Vec<String> {
    struct Frame<'a> {
        task: &'a TaskSnapshot,
        next_blocker: usize,
    }

    let mut best: Vec<String> = Vec::new();
    let mut path: Vec<String> = vec![start.id.clone()];
    let mut on_path: HashSet<String> = HashSet::new();
    on_path.insert(start.id.clone());
    let mut frames = vec![Frame {
        task: start,
        next_blocker: 0,
    }];

    while !frames.is_empty() {
        let (blocker_id, exhausted) = {
            let frame = frames.last_mut().unwrap();
            if frame.next_blocker < frame.task.blocking_task_ids.len() {
                let id = frame.task.blocking_task_ids[frame.next_blocker].clone();
                frame.next_blocker += 1;
                (Some(id), false)
            } else {
                (None, true)
            }
        };

        if exhausted {
            if path.len() > best.len() {
                best = path.clone();
            }
            let frame = frames.pop().unwrap();
            on_path.remove(&frame.task.id);
            path.pop();
            continue;
        }

        let blocker_id = blocker_id.unwrap();
        if on_path.contains(&blocker_id) {
            // cycle boundary: the current path is a complete candidate
            if path.len() > best.len() {
                best = path.clone();
            }
            continue;
        }

        match by_id.get(blocker_id.as_str()).copied() {
            Some(blocker) if blocker.status == TaskStatus::Blocked => {
                path.push(blocker.id.clone());
                on_path.insert(blocker.id.clone());
                frames.push(Frame {
                    task: blocker,
                    next_blocker: 0,
                });
            }
            Some(blocker) => {
                // a non-blocked task terminates the chain and counts in it
                path.push(blocker.id.clone());
                if path.len() > best.len() {
                    best = path.clone();
                }
                path.pop();
            }
            None => {
                // unknown blocker id: the path so far is the candidate
                if path.len() > best.len() {
                    best = path.clone();
                }
            }
        }
    }

    best
}

fn detect_missing_assignment(tasks: &[TaskSnapshot]) -> Option<Bottleneck> {
    let affected: Vec<String> = tasks
        .iter()
        .filter(|task| task.assignee_id.is_none() && task.status.is_open())
        .map(|task| task.id.clone())
        .collect();

    if affected.is_empty() {
        return None;
    }

    Some(Bottleneck {
        kind: BottleneckKind::MissingAssignment,
        impact: Impact::Medium,
        count: affected.len() as i64,
        suggestion: "Assign an owner to every open task so work cannot silently stall".to_string(),
        affected_task_ids: affected,
    })
}

fn detect_decision_delay(
    tasks: &[TaskSnapshot],
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Option<Bottleneck> {
    let cutoff = now - Duration::days(config.decision_delay_days);

    let delayed: Vec<&TaskSnapshot> = tasks
        .iter()
        .filter(|task| {
            task.kind == TaskKind::Decision
                && task.status.is_open()
                && time::parse_opt_datetime(&task.created_at)
                    .map(|created| created < cutoff)
                    .unwrap_or(false)
        })
        .collect();

    if delayed.is_empty() {
        return None;
    }

    let blocks_other_work = tasks.iter().any(|task| {
        task.blocking_task_ids
            .iter()
            .any(|blocker| delayed.iter().any(|decision| decision.id == *blocker))
    });

    let impact = if blocks_other_work {
        Impact::High
    } else {
        Impact::Medium
    };

    Some(Bottleneck {
        kind: BottleneckKind::DecisionDelay,
        impact,
        count: delayed.len() as i64,
        suggestion: format!(
            "Escalate decisions pending for {}+ days",
            config.decision_delay_days
        ),
        affected_task_ids: delayed.iter().map(|task| task.id.clone()).collect(),
    })
}
