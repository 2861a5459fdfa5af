use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::time;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }

    /// Collapses the status vocabularies the host applications use onto the
    /// canonical set. Unknown values fall back to `todo` rather than failing.
    pub fn from_legacy(value: &str) -> Self {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "in_progress" | "active" | "doing" | "started" | "inprogress" => TaskStatus::InProgress,
            "blocked" | "on_hold" | "waiting" | "stuck" => TaskStatus::Blocked,
            "done" | "completed" | "complete" | "closed" | "archived" => TaskStatus::Done,
            _ => TaskStatus::Todo,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unsupported task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn from_legacy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" | "minor" => TaskPriority::Low,
            "high" | "important" => TaskPriority::High,
            "urgent" | "critical" | "blocker" => TaskPriority::Urgent,
            _ => TaskPriority::Medium,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Work,
    Decision,
    Milestone,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Work => "work",
            TaskKind::Decision => "decision",
            TaskKind::Milestone => "milestone",
        }
    }

    pub fn from_legacy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "decision" => TaskKind::Decision,
            "milestone" => TaskKind::Milestone,
            _ => TaskKind::Work,
        }
    }
}

/// Canonical task shape every calculator reads. Timestamps stay RFC 3339
/// strings and are parsed leniently at use sites; a malformed value counts
/// as absent, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub initiative_id: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub blocking_task_ids: Vec<String>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    /// Day the task is time-blocked for ("focus task" marker).
    #[serde(default)]
    pub planned_for: Option<NaiveDate>,
}

impl TaskSnapshot {
    pub fn is_focus_task_for(&self, date: NaiveDate) -> bool {
        self.planned_for == Some(date)
    }
}

/// Loose task shape as produced by the host applications. Status, priority
/// and kind are free-form strings; the conversion collapses them onto the
/// canonical enums and repairs the `completed_at ⟺ done` invariant.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub initiative_id: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub blocking_task_ids: Vec<String>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub planned_for: Option<String>,
}

impl RawTask {
    pub fn into_snapshot(self) -> TaskSnapshot {
        let status = TaskStatus::from_legacy(&self.status);

        // completed_at is meaningful only on done tasks; a done task missing
        // its completion stamp borrows the last-mutation timestamp.
        let completed_at = match status {
            TaskStatus::Done => self.completed_at.or_else(|| self.updated_at.clone()),
            _ => None,
        };

        TaskSnapshot {
            id: self.id,
            title: self.title,
            status,
            priority: TaskPriority::from_legacy(&self.priority),
            kind: self
                .task_type
                .as_deref()
                .map(TaskKind::from_legacy)
                .unwrap_or_default(),
            assignee_id: self.assignee_id,
            initiative_id: self.initiative_id,
            due_at: self.due_at,
            created_at: self.created_at,
            completed_at,
            updated_at: self.updated_at,
            blocking_task_ids: self.blocking_task_ids,
            estimated_minutes: self.estimated_minutes,
            estimated_hours: self.estimated_hours,
            planned_for: self.planned_for.as_deref().and_then(time::parse_date),
        }
    }
}
