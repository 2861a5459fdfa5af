use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::task::TaskSnapshot;
use crate::models::velocity::{Trend, VelocityMetrics, VelocityPoint};
use crate::utils::time;

/// Relative change treated as "no movement" when comparing half-windows.
const STABLE_BAND: f64 = 0.05;

/// Daily completed/created counts over the trailing window, with personal
/// and per-head team averages. The window covers `window_days` calendar
/// days ending today (inclusive).
pub fn compute_velocity(
    tasks: &[TaskSnapshot],
    team_tasks: &[TaskSnapshot],
    team_size: usize,
    window_days: i64,
    now: DateTime<Utc>,
) -> VelocityMetrics {
    if window_days <= 0 {
        return VelocityMetrics::empty(window_days.max(0));
    }

    let end = now.date_naive();
    let start = end - Duration::days(window_days - 1);

    let points = build_points(tasks, start, end);
    let total_completed: i64 = points.iter().map(|point| point.completed).sum();
    let average_velocity = total_completed as f64 / window_days as f64;

    let team_points = build_points(team_tasks, start, end);
    let team_completed: i64 = team_points.iter().map(|point| point.completed).sum();
    let team_average_velocity =
        team_completed as f64 / window_days as f64 / team_size.max(1) as f64;

    VelocityMetrics {
        window_days,
        trend: velocity_trend(&points),
        points,
        average_velocity,
        team_average_velocity,
    }
}

fn build_points(tasks: &[TaskSnapshot], start: NaiveDate, end: NaiveDate) -> Vec<VelocityPoint> {
    let mut completed_by_day: HashMap<NaiveDate, i64> = HashMap::new();
    let mut created_by_day: HashMap<NaiveDate, i64> = HashMap::new();

    for task in tasks {
        if let Some(day) = time::date_of(&task.completed_at) {
            if day >= start && day <= end {
                *completed_by_day.entry(day).or_insert(0) += 1;
            }
        }
        if let Some(day) = time::date_of(&task.created_at) {
            if day >= start && day <= end {
                *created_by_day.entry(day).or_insert(0) += 1;
            }
        }
    }

    let mut points = Vec::new();
    let mut date = start;
    while date <= end {
        points.push(VelocityPoint {
            date,
            completed: completed_by_day.get(&date).copied().unwrap_or(0),
            created: created_by_day.get(&date).copied().unwrap_or(0),
        });
        date = date.succ_opt().unwrap();
    }

    points
}

/// First half of the window against the second half; a simple linear
/// split, not a regression. A window under 2 days cannot establish a
/// trend and reports stable.
fn velocity_trend(points: &[VelocityPoint]) -> Trend {
    if points.len() < 2 {
        return Trend::Stable;
    }

    let (first_avg, second_avg) = half_averages(points);

    if first_avg <= 0.0 {
        return if second_avg > 0.0 { Trend::Up } else { Trend::Stable };
    }

    let change = (second_avg - first_avg) / first_avg;
    if change > STABLE_BAND {
        Trend::Up
    } else if change < -STABLE_BAND {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn half_averages(points: &[VelocityPoint]) -> (f64, f64) {
    let midpoint = points.len() / 2;
    let (first, second) = points.split_at(midpoint);

    let mean = |slice: &[VelocityPoint]| {
        if slice.is_empty() {
            0.0
        } else {
            slice.iter().map(|point| point.completed as f64).sum::<f64>() / slice.len() as f64
        }
    };

    (mean(first), mean(second))
}

/// Maps the half-window movement onto [0, 100] for the execution score.
/// A window with no completions scores 0; otherwise 50 is "flat" and the
/// percent change shifts it by up to ±50. A tunable mapping, not a fact
/// about the data.
pub fn velocity_score(metrics: &VelocityMetrics) -> f64 {
    let total_completed: i64 = metrics.points.iter().map(|point| point.completed).sum();
    if total_completed == 0 {
        return 0.0;
    }

    let (first_avg, second_avg) = half_averages(&metrics.points);
    let change_pct = if first_avg <= 0.0 {
        100.0
    } else {
        (second_avg - first_avg) / first_avg * 100.0
    };

    (50.0 + change_pct.clamp(-100.0, 100.0) / 2.0).clamp(0.0, 100.0)
}
