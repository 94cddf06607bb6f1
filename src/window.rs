use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lowest legal actuation threshold. A zero threshold would fire on sensor
/// noise, so every settings update clamps up to this floor.
pub const MIN_THRESHOLD: f64 = 0.01;

/// Minimum gap kept between a bracket's min and max after clamping.
pub const BRACKET_EPSILON: f64 = 0.01;

/// The actuation policy for a keypress.
///
/// `Point` fires once the pressure crosses a single threshold and never
/// retracts. `Bracket` fires inside `[min, max]` and retracts the keystroke
/// if the press overshoots `max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActuationWindow {
    Point { threshold: f64 },
    Bracket { min: f64, max: f64 },
}

impl ActuationWindow {
    /// The fire threshold, whichever variant.
    pub fn min(&self) -> f64 {
        match self {
            ActuationWindow::Point { threshold } => *threshold,
            ActuationWindow::Bracket { min, .. } => *min,
        }
    }

    pub fn is_bracket(&self) -> bool {
        matches!(self, ActuationWindow::Bracket { .. })
    }

    /// Enforce the window invariants: thresholds at least `MIN_THRESHOLD`,
    /// and `min < max` for brackets. Applied at the settings boundary so the
    /// actuation engine can assume a valid window.
    pub fn clamped(self) -> Self {
        match self {
            ActuationWindow::Point { threshold } => ActuationWindow::Point {
                threshold: threshold.max(MIN_THRESHOLD).min(1.0),
            },
            ActuationWindow::Bracket { min, max } => {
                let min = min.max(MIN_THRESHOLD).min(1.0);
                // max may exceed 1.0 after clamping a degenerate config;
                // pressure never reaches it, so overshoot simply cannot occur.
                ActuationWindow::Bracket {
                    min,
                    max: max.max(min + BRACKET_EPSILON),
                }
            }
        }
    }

    /// A pressure value guaranteed to fire without overshooting; used by the
    /// digital-keyboard fallback to synthesize presses.
    pub fn fire_probe(&self) -> f64 {
        match self {
            ActuationWindow::Point { threshold } => (threshold + 0.1).min(1.0),
            ActuationWindow::Bracket { min, max } => (min + max) / 2.0,
        }
    }

    /// Layer a running override on top of this window without mutating it.
    /// Override fields win when present; a point window only honors `min`.
    pub fn with_override(&self, over: &WindowOverride) -> Self {
        match *self {
            ActuationWindow::Point { threshold } => ActuationWindow::Point {
                threshold: over.min.unwrap_or(threshold),
            },
            ActuationWindow::Bracket { min, max } => ActuationWindow::Bracket {
                min: over.min.unwrap_or(min),
                max: over.max.unwrap_or(max),
            },
        }
        .clamped()
    }
}

/// Transient settings layered over the committed window, used for live
/// preview drags and challenge randomization. Never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowOverride {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl WindowOverride {
    pub fn from_window(window: &ActuationWindow) -> Self {
        match *window {
            ActuationWindow::Point { threshold } => Self {
                min: Some(threshold),
                max: None,
            },
            ActuationWindow::Bracket { min, max } => Self {
                min: Some(min),
                max: Some(max),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChallengeType {
    Static,
    Challenge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Agony,
}

/// How a test ends: a fixed countdown or a fixed amount of words.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    Time { seconds: u64 },
    Words { count: usize },
}

/// Committed settings. Changing any of these resets the running test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialSettings {
    pub mode: TestMode,
    pub window: ActuationWindow,
    pub challenge: ChallengeType,
    pub difficulty: Difficulty,
}

impl Default for InitialSettings {
    fn default() -> Self {
        Self {
            mode: TestMode::Time { seconds: 30 },
            window: ActuationWindow::Point { threshold: 0.4 },
            challenge: ChallengeType::Static,
            difficulty: Difficulty::Normal,
        }
    }
}

impl InitialSettings {
    /// Normalize at the boundary so invalid windows never reach the engine.
    pub fn clamped(mut self) -> Self {
        self.window = self.window.clamped();
        self
    }
}
