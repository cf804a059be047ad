//! Trust update rule.
//!
//! Success moves trust toward 1 in proportion to the remaining headroom and
//! the task's impact (roughly 0..10). Failure decays trust by a fixed share,
//! independent of impact. The result is always within [0, 1].

use aura_core::{clamp_trust, Agent, Outcome, DEFAULT_IMPACT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Learning rate α.
pub const LEARNING_RATE: f64 = 0.1;

/// `trust + α(1 − trust)(impact/10)` on success, `trust − α·trust` on failure.
///
/// A non-finite impact is treated as [`DEFAULT_IMPACT`].
pub fn updated_trust(trust: f64, outcome: Outcome, impact: f64) -> f64 {
    let trust = clamp_trust(trust);
    let impact = if impact.is_finite() { impact } else { DEFAULT_IMPACT };
    let next = match outcome {
        Outcome::Success => trust + LEARNING_RATE * (1.0 - trust) * (impact / 10.0),
        Outcome::Failure => trust - LEARNING_RATE * trust,
    };
    clamp_trust(next)
}

/// Trust before and after one update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustChange {
    pub previous: f64,
    pub current: f64,
}

impl TrustChange {
    pub fn delta(&self) -> f64 {
        self.current - self.previous
    }
}

/// Apply one completed task to `agent`: trust, task count, success ratio and
/// mean execution time.
pub fn apply(agent: &mut Agent, outcome: Outcome, impact: f64, elapsed: Option<Duration>) -> TrustChange {
    let previous = agent.trust;
    agent.trust = updated_trust(previous, outcome, impact);
    agent
        .performance
        .record(outcome, elapsed.map(|d| d.as_secs_f64()));
    TrustChange {
        previous,
        current: agent.trust,
    }
}
