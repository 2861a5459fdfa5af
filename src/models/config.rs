use serde::{Deserialize, Serialize};

const DEFAULT_STALENESS_DAYS: i64 = 7;
const DEFAULT_DECISION_DELAY_DAYS: i64 = 7;
const DEFAULT_STALLED_HIGH: usize = 5;
const DEFAULT_CLUSTER_HIGH: usize = 3;
const DEFAULT_CHAIN_HIGH: usize = 3;
const DEFAULT_AT_CAPACITY_PCT: f64 = 80.0;
const DEFAULT_OVERLOADED_PCT: f64 = 100.0;
const DEFAULT_UNDERUTILIZED_PCT: f64 = 50.0;
const DEFAULT_CAPACITY_HOURS: f64 = 8.0;
const DEFAULT_ESTIMATED_HOURS: f64 = 1.0;
const DEFAULT_VELOCITY_WINDOW_DAYS: i64 = 14;
const DEFAULT_HISTORY_RETENTION_DAYS: i64 = 120;

/// Blending weights for the composite execution score. Fixed, documented
/// tunables: completion dominates, every overdue open task subtracts a flat
/// penalty, and the result is clamped to [0, 100] after blending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub completion: f64,
    pub on_time: f64,
    pub velocity: f64,
    pub quality: f64,
    pub overdue_penalty_points: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            completion: 0.4,
            on_time: 0.2,
            velocity: 0.2,
            quality: 0.2,
            overdue_penalty_points: 5.0,
        }
    }
}

/// Explicit configuration passed into every calculator invocation. No
/// ambient state: a caller that wants different thresholds builds a
/// different config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    /// Days without mutation before an in-progress task counts as stalled.
    pub staleness_threshold_days: i64,
    /// Age after which an unresolved decision task counts as delayed.
    pub decision_delay_days: i64,
    pub stalled_high_threshold: usize,
    pub overdue_cluster_high_threshold: usize,
    pub chain_high_threshold: usize,
    pub at_capacity_pct: f64,
    pub overloaded_pct: f64,
    pub underutilized_pct: f64,
    pub default_capacity_hours: f64,
    /// Effort assumed for tasks without an estimate.
    pub default_estimated_hours: f64,
    pub velocity_window_days: i64,
    pub history_retention_days: i64,
    pub weights: ScoreWeights,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_days: DEFAULT_STALENESS_DAYS,
            decision_delay_days: DEFAULT_DECISION_DELAY_DAYS,
            stalled_high_threshold: DEFAULT_STALLED_HIGH,
            overdue_cluster_high_threshold: DEFAULT_CLUSTER_HIGH,
            chain_high_threshold: DEFAULT_CHAIN_HIGH,
            at_capacity_pct: DEFAULT_AT_CAPACITY_PCT,
            overloaded_pct: DEFAULT_OVERLOADED_PCT,
            underutilized_pct: DEFAULT_UNDERUTILIZED_PCT,
            default_capacity_hours: DEFAULT_CAPACITY_HOURS,
            default_estimated_hours: DEFAULT_ESTIMATED_HOURS,
            velocity_window_days: DEFAULT_VELOCITY_WINDOW_DAYS,
            history_retention_days: DEFAULT_HISTORY_RETENTION_DAYS,
            weights: ScoreWeights::default(),
        }
    }
}
