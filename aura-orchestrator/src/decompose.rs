//! Goal decomposition strategies.

/// Splits a goal into ordered, independent subtasks.
pub trait TaskDecomposer: Send + Sync {
    /// Subtasks in order. May be empty if the goal holds nothing to do.
    fn decompose(&self, goal: &str) -> Vec<String>;
}

/// Treats every goal as one indivisible subtask.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleTask;

impl TaskDecomposer for SingleTask {
    fn decompose(&self, goal: &str) -> Vec<String> {
        let goal = goal.trim();
        if goal.is_empty() {
            Vec::new()
        } else {
            vec![goal.to_string()]
        }
    }
}

/// Splits on `;` and newlines, dropping blank pieces.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delimited;

impl TaskDecomposer for Delimited {
    fn decompose(&self, goal: &str) -> Vec<String> {
        goal.split(|c| c == ';' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
