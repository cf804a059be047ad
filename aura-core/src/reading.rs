//! Four-channel consciousness readings and the derived health score.

use crate::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PLACEHOLDER METRICS
// ============================================================================

/// Reported when the metrics backend is unreachable.
pub const PLACEHOLDER_PHI: f64 = 0.856;
pub const PLACEHOLDER_LAMBDA: f64 = 2.176435e-8;
pub const PLACEHOLDER_GAMMA: f64 = 0.0042;
pub const PLACEHOLDER_W2: f64 = 0.12;

/// Smallest change that registers as a trend, as a fraction of the larger of
/// the two magnitudes.
pub const TREND_EPSILON: f64 = 0.001;

// ============================================================================
// READING
// ============================================================================

/// A single reading of the four metric channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessReading {
    pub phi: f64,
    pub lambda: f64,
    pub gamma: f64,
    pub w2: f64,
    pub timestamp: Timestamp,
}

impl ConsciousnessReading {
    pub fn new(phi: f64, lambda: f64, gamma: f64, w2: f64) -> Self {
        Self {
            phi,
            lambda,
            gamma,
            w2,
            timestamp: Utc::now(),
        }
    }

    /// The documented placeholder reading, stamped now.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_PHI, PLACEHOLDER_LAMBDA, PLACEHOLDER_GAMMA, PLACEHOLDER_W2)
    }

    /// `0.5·phi + 0.3·(1 − min(gamma/0.1, 1)) + 0.2·(1 − min(w2/0.3, 1))`, within [0, 1].
    pub fn health(&self) -> f64 {
        health(self.phi, self.gamma, self.w2)
    }

    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Phi => self.phi,
            Channel::Lambda => self.lambda,
            Channel::Gamma => self.gamma,
            Channel::W2 => self.w2,
        }
    }
}

/// Health score from the three channels that contribute to it.
pub fn health(phi: f64, gamma: f64, w2: f64) -> f64 {
    let coherence = 1.0 - (gamma / 0.1).min(1.0);
    let stability = 1.0 - (w2 / 0.3).min(1.0);
    let score = 0.5 * phi + 0.3 * coherence + 0.2 * stability;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Reading as reported by a remote source; any channel may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialReading {
    #[serde(default)]
    pub phi: Option<f64>,
    #[serde(default)]
    pub lambda: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub w2: Option<f64>,
}

impl PartialReading {
    /// Fill missing channels with the placeholder constants.
    pub fn or_placeholder(self) -> ConsciousnessReading {
        ConsciousnessReading::new(
            self.phi.unwrap_or(PLACEHOLDER_PHI),
            self.lambda.unwrap_or(PLACEHOLDER_LAMBDA),
            self.gamma.unwrap_or(PLACEHOLDER_GAMMA),
            self.w2.unwrap_or(PLACEHOLDER_W2),
        )
    }

    /// Numeric channels present in a JSON payload. Anything missing,
    /// non-numeric or non-finite is left unset.
    pub fn from_value(payload: &serde_json::Value) -> Self {
        let channel = |key: &str| {
            payload
                .get(key)
                .and_then(serde_json::Value::as_f64)
                .filter(|v| v.is_finite())
        };
        Self {
            phi: channel("phi"),
            lambda: channel("lambda"),
            gamma: channel("gamma"),
            w2: channel("w2"),
        }
    }

    /// True when at least one channel was reported.
    pub fn has_any(&self) -> bool {
        self.phi.is_some() || self.lambda.is_some() || self.gamma.is_some() || self.w2.is_some()
    }
}

// ============================================================================
// DISPLAY HELPERS
// ============================================================================

/// One of the four metric channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Phi,
    Lambda,
    Gamma,
    W2,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Phi, Channel::Lambda, Channel::Gamma, Channel::W2];

    pub fn higher_is_better(&self) -> bool {
        matches!(self, Channel::Phi | Channel::Lambda)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Phi => "phi",
            Channel::Lambda => "lambda",
            Channel::Gamma => "gamma",
            Channel::W2 => "w2",
        }
    }

    /// Display band for a single channel value.
    pub fn band(&self, value: f64) -> HealthBand {
        match self {
            Channel::Phi => HealthBand::from_score(value),
            Channel::Lambda => HealthBand::Good,
            Channel::Gamma if value < 0.01 => HealthBand::Good,
            Channel::Gamma if value < 0.05 => HealthBand::Fair,
            Channel::W2 if value < 0.15 => HealthBand::Good,
            Channel::W2 if value < 0.3 => HealthBand::Fair,
            _ => HealthBand::Poor,
        }
    }
}

/// Coarse rating used to colour values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    /// `>= 0.8` good, `>= 0.5` fair, otherwise poor.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            HealthBand::Good
        } else if score >= 0.5 {
            HealthBand::Fair
        } else {
            HealthBand::Poor
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthBand::Good => "good",
            HealthBand::Fair => "fair",
            HealthBand::Poor => "poor",
        };
        write!(f, "{}", s)
    }
}

/// Change of a channel between two consecutive readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Improving,
    Worsening,
    Steady,
}

impl Trend {
    pub fn between(channel: Channel, previous: &ConsciousnessReading, current: &ConsciousnessReading) -> Self {
        let (before, after) = (previous.value(channel), current.value(channel));
        let delta = after - before;
        let scale = before.abs().max(after.abs());
        if delta.is_nan() || delta.abs() <= TREND_EPSILON * scale {
            return Trend::Steady;
        }
        if (delta > 0.0) == channel.higher_is_better() {
            Trend::Improving
        } else {
            Trend::Worsening
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Improving => "↑",
            Trend::Worsening => "↓",
            Trend::Steady => "→",
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_health_within_unit_interval(
            phi in 0.0f64..=1.0,
            gamma in 0.0f64..10.0,
            w2 in 0.0f64..10.0,
        ) {
            let h = health(phi, gamma, w2);
            prop_assert!((0.0..=1.0).contains(&h));
        }

        #[test]
        fn prop_lower_gamma_never_hurts(phi in 0.0f64..=1.0, g in 0.0f64..1.0, w2 in 0.0f64..1.0) {
            prop_assert!(health(phi, g / 2.0, w2) >= health(phi, g, w2));
        }
    }
}
