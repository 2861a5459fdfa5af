use serde::{Deserialize, Serialize};

use crate::models::bottleneck::Bottleneck;
use crate::models::score::ExecutionScore;
use crate::models::velocity::VelocityMetrics;
use crate::models::workload::TeamWorkload;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

/// Everything the four calculators produced for one user/team, assembled
/// for the presentation layer or report export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOverview {
    pub user_id: String,
    pub generated_at: String,
    pub score: ExecutionScore,
    pub velocity: VelocityMetrics,
    pub bottlenecks: Vec<Bottleneck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<TeamWorkload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExportResult {
    pub file_path: String,
    pub format: ReportFormat,
    pub generated_at: String,
}
