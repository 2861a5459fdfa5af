use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    StalledTasks,
    OverdueCluster,
    BlockedChain,
    MissingAssignment,
    DecisionDelay,
}

impl BottleneckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BottleneckKind::StalledTasks => "stalled_tasks",
            BottleneckKind::OverdueCluster => "overdue_cluster",
            BottleneckKind::BlockedChain => "blocked_chain",
            BottleneckKind::MissingAssignment => "missing_assignment",
            BottleneckKind::DecisionDelay => "decision_delay",
        }
    }

    /// Tie-break position for equal impact and count: the detection table
    /// order is the required stable output order.
    pub fn rule_order(&self) -> u8 {
        match self {
            BottleneckKind::StalledTasks => 0,
            BottleneckKind::OverdueCluster => 1,
            BottleneckKind::BlockedChain => 2,
            BottleneckKind::MissingAssignment => 3,
            BottleneckKind::DecisionDelay => 4,
        }
    }
}

impl fmt::Display for BottleneckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BottleneckKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "stalled_tasks" => Ok(BottleneckKind::StalledTasks),
            "overdue_cluster" => Ok(BottleneckKind::OverdueCluster),
            "blocked_chain" => Ok(BottleneckKind::BlockedChain),
            "missing_assignment" => Ok(BottleneckKind::MissingAssignment),
            "decision_delay" => Ok(BottleneckKind::DecisionDelay),
            other => Err(format!("unsupported bottleneck kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Impact::Low => 0,
            Impact::Medium => 1,
            Impact::High => 2,
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    pub impact: Impact,
    pub count: i64,
    pub suggestion: String,
    pub affected_task_ids: Vec<String>,
}
