use std::collections::{HashMap, HashSet};

use crate::sample::{KeySample, NOISE_FLOOR};
use crate::window::ActuationWindow;

/// Once a key has overshot a bracket, its state only resets after the
/// pressure falls back below this value. The 0.01..0.05 band between the
/// noise floor and this threshold absorbs release chatter.
pub const RELEASE_THRESHOLD: f64 = 0.05;

/// Discrete output of one processed report, in sample order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuationEvent {
    /// The key crossed into the window and produced its character.
    Fire(u16),
    /// The last keystroke overshot the bracket and must be undone.
    Retract,
}

#[derive(Clone, Copy, Debug, Default)]
struct KeyState {
    is_actuated: bool,
    was_above_max: bool,
    last_value: f64,
}

/// Per-key state machine turning continuous pressure samples into fire and
/// retract events. Owns all per-key actuation state exclusively; callers gate
/// reports on focus/completion before they reach this engine.
#[derive(Debug, Default)]
pub struct ActuationEngine {
    states: HashMap<u16, KeyState>,
    actuated: HashSet<u16>,
}

impl ActuationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all per-key state, e.g. on test reset. Keys held down across a
    /// reset will fire again on their next report.
    pub fn reset(&mut self) {
        self.states.clear();
        self.actuated.clear();
    }

    /// True while the given key has fired and not yet re-armed.
    pub fn is_actuated(&self, code: u16) -> bool {
        self.actuated.contains(&code)
    }

    /// Process one tick's samples against the current window.
    ///
    /// A window change between ticks takes effect here immediately; in-flight
    /// `was_above_max`/actuated states are only ever cleared by key release.
    pub fn process_report(
        &mut self,
        samples: &[KeySample],
        window: &ActuationWindow,
    ) -> Vec<ActuationEvent> {
        let mut events = Vec::new();

        for sample in samples {
            // Below the noise floor: no state transition at all.
            if sample.value < NOISE_FLOOR {
                continue;
            }

            match *window {
                ActuationWindow::Bracket { min, max } => {
                    let state = self.states.entry(sample.code).or_default();

                    if state.was_above_max {
                        if sample.value < RELEASE_THRESHOLD {
                            // Released past the hysteresis band: back to neutral.
                            *state = KeyState::default();
                        }
                        state.last_value = sample.value;
                    } else {
                        if sample.value >= min && !self.actuated.contains(&sample.code) {
                            state.is_actuated = true;
                            self.actuated.insert(sample.code);
                            events.push(ActuationEvent::Fire(sample.code));
                        }

                        if sample.value > max && state.is_actuated {
                            // Overshoot: undo the keystroke once, then keep the
                            // key inert until it fully releases.
                            state.is_actuated = false;
                            state.was_above_max = true;
                            self.actuated.remove(&sample.code);
                            events.push(ActuationEvent::Retract);
                        }
                        state.last_value = sample.value;
                    }
                }
                ActuationWindow::Point { threshold } => {
                    if sample.value >= threshold && !self.actuated.contains(&sample.code) {
                        self.actuated.insert(sample.code);
                        events.push(ActuationEvent::Fire(sample.code));
                    }
                    self.states.entry(sample.code).or_default().last_value = sample.value;
                }
            }
        }

        self.rearm_released(samples, window);

        events
    }

    /// Step 5 of the tick: keys that dropped below the fire threshold (and
    /// never overshot) re-arm, and keys absent from the report are treated as
    /// fully released.
    fn rearm_released(&mut self, samples: &[KeySample], window: &ActuationWindow) {
        let min = window.min();

        for sample in samples {
            if sample.value < min
                && self.actuated.contains(&sample.code)
                && !self
                    .states
                    .get(&sample.code)
                    .is_some_and(|s| s.was_above_max)
            {
                self.actuated.remove(&sample.code);
            }
        }

        let present: HashSet<u16> = samples
            .iter()
            .filter(|s| s.value >= NOISE_FLOOR)
            .map(|s| s.code)
            .collect();
        self.actuated.retain(|code| present.contains(code));
        self.states.retain(|code, _| present.contains(code));
    }
}
