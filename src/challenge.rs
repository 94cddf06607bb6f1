use rand::Rng;

use crate::window::{ActuationWindow, Difficulty};

/// Inclusive range of values a tier picks from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Per-tier randomization amplitudes. Harder tiers shrink the bracket and
/// widen the actuation-point jumps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyProfile {
    pub actuation_change: ValueRange,
    pub bracket_size: ValueRange,
}

const fn range(min: f64, max: f64) -> ValueRange {
    ValueRange { min, max }
}

/// The tier table. Configuration data, not per-call constants.
pub fn profile(difficulty: Difficulty) -> DifficultyProfile {
    match difficulty {
        Difficulty::Easy => DifficultyProfile {
            actuation_change: range(0.1, 0.2),
            bracket_size: range(0.8, 0.9),
        },
        Difficulty::Normal => DifficultyProfile {
            actuation_change: range(0.2, 0.4),
            bracket_size: range(0.7, 0.8),
        },
        Difficulty::Hard => DifficultyProfile {
            actuation_change: range(0.4, 0.7),
            bracket_size: range(0.5, 0.6),
        },
        Difficulty::Agony => DifficultyProfile {
            actuation_change: range(0.8, 0.9),
            bracket_size: range(0.2, 0.4),
        },
    }
}

/// Produce the next window for a challenge round.
///
/// Brackets get a fresh size and position; point windows get a perturbed
/// threshold biased back toward the middle of the range. Pure given the rng,
/// so tests can drive it with a seeded generator.
pub fn randomize_window(
    current: &ActuationWindow,
    difficulty: Difficulty,
    rng: &mut impl Rng,
) -> ActuationWindow {
    let profile = profile(difficulty);

    match *current {
        ActuationWindow::Bracket { .. } => {
            let size = rng.gen_range(profile.bracket_size.min..=profile.bracket_size.max);
            // Keep the whole bracket inside [0.1, 0.9].
            let min = rng.gen_range(0.1..=(0.9 - size).max(0.1));
            ActuationWindow::Bracket {
                min,
                max: min + size,
            }
        }
        ActuationWindow::Point { threshold } => {
            // Resample until the point visibly moves.
            let mut next = perturb_point(threshold, profile.actuation_change, rng);
            while next == threshold {
                next = perturb_point(threshold, profile.actuation_change, rng);
            }
            ActuationWindow::Point { threshold: next }
        }
    }
}

fn perturb_point(current: f64, change: ValueRange, rng: &mut impl Rng) -> f64 {
    let direction = if current > 0.5 { -1.0 } else { 1.0 };
    let amount = rng.gen_range(change.min..=change.max);
    (current + amount * direction).clamp(0.01, 1.0)
}
