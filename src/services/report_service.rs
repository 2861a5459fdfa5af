use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::AppResult;
use crate::models::report::{ExecutionOverview, ReportExportResult, ReportFormat};

const REPORT_PREFIX: &str = "execution-report";

/// Writes assembled overviews to disk for sharing outside the dashboard.
pub struct ReportService {
    reports_dir: PathBuf,
}

impl ReportService {
    pub fn new(reports_dir: PathBuf) -> AppResult<Self> {
        std::fs::create_dir_all(&reports_dir)?;
        Ok(Self { reports_dir })
    }

    pub fn default_reports_dir(db_path: &Path) -> PathBuf {
        db_path
            .parent()
            .map(|dir| dir.join("reports"))
            .unwrap_or_else(|| std::env::temp_dir().join("consultify-analytics"))
    }

    pub fn export(
        &self,
        overview: &ExecutionOverview,
        format: ReportFormat,
    ) -> AppResult<ReportExportResult> {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let filename = format!("{REPORT_PREFIX}-{}.{}", timestamp, format.file_extension());
        let path = self.reports_dir.join(filename);

        match format {
            ReportFormat::Markdown => {
                std::fs::write(&path, render_markdown_report(overview))?;
            }
            ReportFormat::Json => {
                let json = serde_json::to_string_pretty(overview)?;
                std::fs::write(&path, json)?;
            }
        }

        info!(
            target: "analytics::report",
            path = %path.display(),
            format = ?format,
            "execution report exported"
        );

        Ok(ReportExportResult {
            file_path: path.to_string_lossy().to_string(),
            format,
            generated_at: Utc::now().to_rfc3339(),
        })
    }
}

fn render_markdown_report(overview: &ExecutionOverview) -> String {
    let score = &overview.score;
    let mut content = String::new();

    content.push_str("# Execution Analytics Report\n\n");
    content.push_str(&format!("Generated: {}\n\n", overview.generated_at));
    content.push_str(&format!("User: {}\n\n", overview.user_id));

    content.push_str("## Execution Score\n");
    content.push_str(&format!(
        "- Score: {:.1} ({}, {:+.1}% vs last week)\n- Completion rate: {:.1}%\n- On-time rate: {:.1}%\n- Velocity: {:.1}\n- Quality: {:.1}\n- Streak: {} days (best {})\n\n",
        score.current,
        score.trend,
        score.vs_last_week,
        score.breakdown.completion_rate,
        score.breakdown.on_time_rate,
        score.breakdown.velocity_score,
        score.breakdown.quality_score,
        score.streak.current,
        score.streak.best
    ));

    content.push_str("## Velocity\n");
    content.push_str(&format!(
        "- Average: {:.2} tasks/day over {} days (team {:.2})\n- Trend: {}\n\n",
        overview.velocity.average_velocity,
        overview.velocity.window_days,
        overview.velocity.team_average_velocity,
        overview.velocity.trend
    ));

    content.push_str("## Bottlenecks\n");
    if overview.bottlenecks.is_empty() {
        content.push_str("- None detected\n");
    } else {
        for bottleneck in &overview.bottlenecks {
            content.push_str(&format!(
                "- [{} - {}] {} ({} tasks)\n",
                bottleneck.kind, bottleneck.impact, bottleneck.suggestion, bottleneck.count
            ));
        }
    }
    content.push('\n');

    if let Some(workload) = &overview.workload {
        content.push_str("## Team Workload\n");
        content.push_str(&format!(
            "- Team average allocation: {:.1}% over {} days\n- Overloaded members: {}\n- Underutilized members: {}\n",
            workload.team_average,
            workload.period_days,
            workload.overloaded_count,
            workload.underutilized_count
        ));
        for member in &workload.members {
            content.push_str(&format!(
                "  - {}: {:.1}% ({:.1}h of {:.1}h, {})\n",
                member.user_id,
                member.allocation,
                member.hours_allocated,
                member.hours_capacity,
                member.status
            ));
        }
    }

    content
}
