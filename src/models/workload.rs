use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Available,
    AtCapacity,
    Overloaded,
}

impl WorkloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadStatus::Available => "available",
            WorkloadStatus::AtCapacity => "at_capacity",
            WorkloadStatus::Overloaded => "overloaded",
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkloadStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "available" => Ok(WorkloadStatus::Available),
            "at_capacity" => Ok(WorkloadStatus::AtCapacity),
            "overloaded" => Ok(WorkloadStatus::Overloaded),
            other => Err(format!("unsupported workload status: {other}")),
        }
    }
}

fn default_capacity_hours() -> f64 {
    8.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_capacity_hours")]
    pub daily_capacity_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLoad {
    pub date: NaiveDate,
    pub hours: f64,
    pub allocation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkload {
    pub user_id: String,
    /// Whole-period allocation percentage; may exceed 100, never negative.
    pub allocation: f64,
    pub task_count: i64,
    pub hours_allocated: f64,
    pub hours_capacity: f64,
    pub status: WorkloadStatus,
    pub daily_breakdown: Vec<DailyLoad>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamWorkload {
    pub period_days: i64,
    pub generated_at: String,
    pub members: Vec<UserWorkload>,
    pub team_average: f64,
    pub overloaded_count: i64,
    pub underutilized_count: i64,
}
