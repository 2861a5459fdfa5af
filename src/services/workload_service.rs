use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::config::AnalyticsConfig;
use crate::models::task::TaskSnapshot;
use crate::models::workload::{
    DailyLoad, TeamMember, TeamWorkload, UserWorkload, WorkloadStatus,
};

/// Distributes the team's open-task effort across members and days of the
/// forward-looking period (today inclusive) to produce the capacity
/// heatmap.
pub fn compute_workload(
    team_tasks: &[TaskSnapshot],
    members: &[TeamMember],
    period_days: i64,
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> TeamWorkload {
    let period_days = period_days.max(1);
    let start = now.date_naive();

    let member_workloads: Vec<UserWorkload> = members
        .iter()
        .map(|member| member_workload(team_tasks, member, start, period_days, config))
        .collect();

    let daily_allocations: Vec<f64> = member_workloads
        .iter()
        .flat_map(|workload| workload.daily_breakdown.iter().map(|day| day.allocation))
        .collect();
    let team_average = if daily_allocations.is_empty() {
        0.0
    } else {
        daily_allocations.iter().sum::<f64>() / daily_allocations.len() as f64
    };

    let overloaded_count = member_workloads
        .iter()
        .filter(|workload| workload.status == WorkloadStatus::Overloaded)
        .count() as i64;
    let underutilized_count = member_workloads
        .iter()
        .filter(|workload| workload.allocation < config.underutilized_pct)
        .count() as i64;

    TeamWorkload {
        period_days,
        generated_at: now.to_rfc3339(),
        members: member_workloads,
        team_average,
        overloaded_count,
        underutilized_count,
    }
}

fn member_workload(
    team_tasks: &[TaskSnapshot],
    member: &TeamMember,
    start: NaiveDate,
    period_days: i64,
    config: &AnalyticsConfig,
) -> UserWorkload {
    let capacity = if member.daily_capacity_hours > 0.0 {
        member.daily_capacity_hours
    } else {
        config.default_capacity_hours
    };

    let mut daily_breakdown = Vec::with_capacity(period_days as usize);
    let mut hours_allocated = 0.0;
    let mut task_count = 0i64;
    let mut peak_allocation: f64 = 0.0;

    for offset in 0..period_days {
        let date = start + Duration::days(offset);
        let mut hours = 0.0;

        for task in team_tasks {
            if task.assignee_id.as_deref() == Some(member.id.as_str())
                && task.status.is_open()
                && crate::utils::time::date_of(&task.due_at) == Some(date)
            {
                hours += effort_hours(task, config);
                task_count += 1;
            }
        }

        let allocation = hours / capacity * 100.0;
        peak_allocation = peak_allocation.max(allocation);
        hours_allocated += hours;
        daily_breakdown.push(DailyLoad {
            date,
            hours,
            allocation,
        });
    }

    let hours_capacity = capacity * period_days as f64;
    let allocation = if hours_capacity > 0.0 {
        hours_allocated / hours_capacity * 100.0
    } else {
        0.0
    };

    let status = if peak_allocation >= config.overloaded_pct {
        WorkloadStatus::Overloaded
    } else if peak_allocation >= config.at_capacity_pct {
        WorkloadStatus::AtCapacity
    } else {
        WorkloadStatus::Available
    };

    UserWorkload {
        user_id: member.id.clone(),
        allocation,
        task_count,
        hours_allocated,
        hours_capacity,
        status,
        daily_breakdown,
    }
}

/// Estimated hours with a fallback chain: explicit hours, minutes, then a
/// one-hour default so unestimated work still weighs something.
fn effort_hours(task: &TaskSnapshot, config: &AnalyticsConfig) -> f64 {
    task.estimated_hours
        .filter(|hours| hours.is_finite() && *hours > 0.0)
        .or_else(|| {
            task.estimated_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| minutes as f64 / 60.0)
        })
        .unwrap_or(config.default_estimated_hours)
}
