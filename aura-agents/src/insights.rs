//! Heuristics over the activity trail.

use aura_core::{ActivityLogEntry, ActivityResult};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Impact a task is expected to have on average.
pub const BASELINE_IMPACT: f64 = 5.0;

/// Entries considered for patterns and efficiency.
pub const INSIGHT_WINDOW: usize = 100;

/// Entries considered for next-task prediction.
pub const PREDICTION_WINDOW: usize = 5;

pub const PATTERN_MORNING: &str = "Prefers morning quantum runs";
pub const PATTERN_OPTIMIZATION: &str = "Focuses on circuit optimization";
pub const PATTERN_HIGH_ACCURACY: &str = "High accuracy requirements";

pub const PREDICT_OPTIMIZATION: &str = "Circuit optimization batch processing";
pub const PREDICT_EXECUTION: &str = "Quantum job execution on IBM hardware";
pub const PREDICT_DEFAULT: &str = "Data analysis and visualization";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInsights {
    pub entries_considered: usize,
    pub success_rate: f64,
    /// Percentage in [0, 100].
    pub efficiency_gain: f64,
    pub patterns: Vec<String>,
    pub predicted_next_task: String,
}

/// Summarize `entries` (any order; newest are picked by timestamp).
pub fn analyze(entries: &[ActivityLogEntry]) -> ActivityInsights {
    let mut newest_first: Vec<&ActivityLogEntry> = entries.iter().collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    newest_first.truncate(INSIGHT_WINDOW);

    ActivityInsights {
        entries_considered: newest_first.len(),
        success_rate: success_rate(&newest_first),
        efficiency_gain: efficiency_gain(&newest_first),
        patterns: patterns(&newest_first),
        predicted_next_task: predict_next_task(&newest_first).to_string(),
    }
}

fn success_rate(entries: &[&ActivityLogEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let successes = entries
        .iter()
        .filter(|e| e.result == ActivityResult::Success)
        .count();
    successes as f64 / entries.len() as f64
}

/// `clamp(((avg_impact · success_rate − 5) / 5) · 100, 0, 100)`.
fn efficiency_gain(entries: &[&ActivityLogEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let avg_impact = entries.iter().map(|e| e.impact_score).sum::<f64>() / entries.len() as f64;
    let gain = ((avg_impact * success_rate(entries) - BASELINE_IMPACT) / BASELINE_IMPACT) * 100.0;
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, 100.0)
    }
}

fn patterns(entries: &[&ActivityLogEntry]) -> Vec<String> {
    let mut found = Vec::new();
    if entries.is_empty() {
        return found;
    }
    let total = entries.len() as f64;

    // Hours are UTC.
    let morning = entries
        .iter()
        .filter(|e| (6..12).contains(&e.timestamp.hour()))
        .count() as f64;
    if morning > total * 0.6 {
        found.push(PATTERN_MORNING.to_string());
    }

    let actions: Vec<String> = entries.iter().map(|e| e.action.to_lowercase()).collect();
    let optimizations = actions.iter().filter(|a| a.contains("optimi")).count() as f64;
    let executions = actions.iter().filter(|a| a.contains("execut")).count() as f64;
    if optimizations > executions * 1.5 {
        found.push(PATTERN_OPTIMIZATION.to_string());
    }

    if success_rate(entries) > 0.9 {
        found.push(PATTERN_HIGH_ACCURACY.to_string());
    }
    found
}

fn predict_next_task(newest_first: &[&ActivityLogEntry]) -> &'static str {
    let recent: Vec<String> = newest_first
        .iter()
        .take(PREDICTION_WINDOW)
        .map(|e| e.action.to_lowercase())
        .collect();
    if recent.iter().filter(|a| a.contains("optimize")).count() >= 3 {
        PREDICT_OPTIMIZATION
    } else if recent.iter().filter(|a| a.contains("execut")).count() >= 3 {
        PREDICT_EXECUTION
    } else {
        PREDICT_DEFAULT
    }
}
