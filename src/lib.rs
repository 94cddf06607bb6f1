pub mod actuation;
pub mod app;
pub mod challenge;
pub mod config;
pub mod metrics;
pub mod runtime;
pub mod sample;
pub mod session;
pub mod ui;
pub mod window;
pub mod words;

pub use app::{App, TICK_RATE_MS};
pub use sample::{AnalogReport, KeySample};
pub use window::{ActuationWindow, ChallengeType, Difficulty, InitialSettings, TestMode};
