use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::Local;

use crate::actuation::{ActuationEngine, ActuationEvent};
use crate::challenge;
use crate::metrics::{self, Metrics};
use crate::sample::{
    output_for_code, synthetic_press, AnalogReport, KeyOutput, NOISE_FLOOR,
};
use crate::session::{SessionState, TypingSession};
use crate::window::{
    ActuationWindow, ChallengeType, InitialSettings, TestMode, WindowOverride,
};
use crate::words::WordSource;

/// Cadence of the runner loop; metrics recompute at this rate and the
/// countdown decrements once per accumulated second of ticks.
pub const TICK_RATE_MS: u64 = 100;

/// Initial word-set size for time mode; growth tops it up afterwards.
const TIME_MODE_WORDS: usize = 100;
const GROWTH_CHUNK: usize = 50;

/// Wires the engines together: gates incoming reports on focus and
/// completion, routes fire/retract events into the session, drives the
/// countdown and metrics timers, and triggers challenge randomization.
/// Presentation only ever reads snapshots from here.
pub struct App {
    settings: InitialSettings,
    running: WindowOverride,
    session: TypingSession,
    engine: ActuationEngine,
    words: Box<dyn WordSource>,
    metrics: Metrics,
    focused: bool,
    countdown_armed: bool,
    countdown_ms: u64,
    pressures: HashMap<u16, f64>,
    results_log: Option<PathBuf>,
}

impl App {
    pub fn new(settings: InitialSettings, mut words: Box<dyn WordSource>) -> Self {
        let settings = settings.clamped();
        let target = words.generate_word_set(initial_word_count(settings.mode));
        Self {
            session: TypingSession::new(target, settings.mode),
            settings,
            running: WindowOverride::default(),
            engine: ActuationEngine::new(),
            words,
            metrics: Metrics::default(),
            focused: true,
            countdown_armed: false,
            countdown_ms: 0,
            pressures: HashMap::new(),
            results_log: None,
        }
    }

    /// Enable the CSV results log at the given path. Off by default so
    /// library users and tests never touch the user's config dir.
    pub fn with_results_log(mut self, path: PathBuf) -> Self {
        self.results_log = Some(path);
        self
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn settings(&self) -> &InitialSettings {
        &self.settings
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Initial window with the running override layered on top.
    pub fn effective_window(&self) -> ActuationWindow {
        self.settings.window.with_override(&self.running)
    }

    /// Live pressure of one key, for the presentation gauges.
    pub fn pressure(&self, code: u16) -> f64 {
        self.pressures.get(&code).copied().unwrap_or(0.0)
    }

    /// The key currently pressed deepest, if any.
    pub fn most_pressed_key(&self) -> Option<(u16, f64)> {
        self.pressures
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&code, &value)| (code, value))
    }

    /// One tick's worth of analog samples. Whole reports are dropped while
    /// unfocused or once the test is complete; key state is left as-is so
    /// nothing fires on refocus until the keys actually release.
    pub fn handle_report(&mut self, report: AnalogReport) {
        if !self.focused || self.session.is_complete() {
            return;
        }

        let samples = report.sanitize();

        self.pressures.clear();
        for sample in &samples {
            if sample.value >= NOISE_FLOOR {
                self.pressures.insert(sample.code, sample.value);
            }
        }

        let window = self.effective_window();
        for event in self.engine.process_report(&samples, &window) {
            match event {
                ActuationEvent::Fire(code) => match output_for_code(code) {
                    Some(KeyOutput::Char(c)) => self.apply_char(c),
                    Some(KeyOutput::Backspace) => {
                        self.session.backspace();
                    }
                    None => {}
                },
                ActuationEvent::Retract => {
                    self.session.backspace();
                }
            }
        }
    }

    /// Digital-keyboard fallback: run a canned press/release envelope through
    /// the same pipeline, peaking safely inside the effective window.
    pub fn press_digital(&mut self, code: u16) {
        let peak = self.effective_window().fire_probe();
        for report in synthetic_press(code, peak) {
            self.handle_report(report);
        }
    }

    fn apply_char(&mut self, c: char) {
        let outcome = self.session.append_char(c);

        if outcome.started {
            self.countdown_armed = matches!(self.settings.mode, TestMode::Time { .. });
            self.countdown_ms = 0;
        }

        if outcome.crossed_line && self.settings.challenge == ChallengeType::Challenge {
            self.randomize_bracket();
        }

        if self.session.needs_more_words() {
            let more = self.words.append_more_words(GROWTH_CHUNK);
            self.session.extend_target(&more);
        }

        if outcome.completed {
            self.finish();
        }
    }

    /// Runner tick: recompute metrics while active, and advance the countdown
    /// once per accumulated second.
    pub fn on_tick(&mut self) {
        if !self.session.is_active() {
            return;
        }

        self.metrics = self.compute_metrics();

        if self.countdown_armed {
            self.countdown_ms += TICK_RATE_MS;
            while self.countdown_ms >= 1000 {
                self.countdown_ms -= 1000;
                self.session.on_countdown_tick();
                if self.session.is_complete() {
                    self.finish();
                    break;
                }
            }
        }
    }

    fn compute_metrics(&self) -> Metrics {
        metrics::compute(
            self.session.typed(),
            self.session.target(),
            self.session.cursor(),
            self.session.elapsed_minutes(SystemTime::now()),
        )
    }

    fn finish(&mut self) {
        self.cancel_timers();
        self.metrics = self.compute_metrics();
        if let Err(e) = self.save_results() {
            log::warn!("could not append results log: {e}");
        }
    }

    /// Disarm the countdown and metrics timers. Idempotent.
    fn cancel_timers(&mut self) {
        self.countdown_armed = false;
        self.countdown_ms = 0;
    }

    /// Commit new settings; clamps at the boundary and resets the test.
    pub fn update_initial_settings(&mut self, settings: InitialSettings) {
        self.settings = settings.clamped();
        self.reset_test();
    }

    /// Layer a transient override over the committed window. Does not reset
    /// the running test.
    pub fn update_running_settings(&mut self, over: WindowOverride) {
        self.running = over;
    }

    /// Abandon the running test: fresh text, re-armed keys, cleared override
    /// and timers.
    pub fn reset_test(&mut self) {
        self.running = WindowOverride::default();
        self.engine.reset();
        self.metrics = Metrics::default();
        self.cancel_timers();
        self.pressures.clear();
        let target = self
            .words
            .generate_word_set(initial_word_count(self.settings.mode));
        self.session.reset(target);
    }

    /// Pick the next challenge window. No-op in static mode. Mid-test the new
    /// window lands in the running override; before the test starts it also
    /// becomes the committed window.
    pub fn randomize_bracket(&mut self) {
        if self.settings.challenge != ChallengeType::Challenge {
            return;
        }
        let next = challenge::randomize_window(
            &self.effective_window(),
            self.settings.difficulty,
            &mut rand::thread_rng(),
        );
        self.running = WindowOverride::from_window(&next);
        if self.session.state() == SessionState::Idle {
            self.settings.window = next;
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.pressures.clear();
        }
    }

    fn save_results(&self) -> io::Result<()> {
        let Some(path) = &self.results_log else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let needs_header = !path.exists();
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;
        if needs_header {
            writeln!(file, "date,mode,wpm,raw_wpm,cpm,accuracy,score")?;
        }

        let mode = match self.settings.mode {
            TestMode::Time { seconds } => format!("time:{seconds}"),
            TestMode::Words { count } => format!("words:{count}"),
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            Local::now().format("%c"),
            mode,
            self.metrics.wpm,
            self.metrics.raw_wpm,
            self.metrics.cpm,
            self.metrics.accuracy,
            self.metrics.score,
        )
    }
}

fn initial_word_count(mode: TestMode) -> usize {
    match mode {
        TestMode::Time { .. } => TIME_MODE_WORDS,
        TestMode::Words { count } => count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{backspace_code, code_for_char, KeySample};
    use crate::window::Difficulty;
    use crate::words::FixedPrompt;

    fn words_app(prompt: &str) -> App {
        let count = prompt.split_whitespace().count();
        App::new(
            InitialSettings {
                mode: TestMode::Words { count },
                ..InitialSettings::default()
            },
            Box::new(FixedPrompt::new(prompt)),
        )
    }

    fn report(code: u16, value: f64) -> AnalogReport {
        AnalogReport::new(vec![KeySample::new(code, value)])
    }

    #[test]
    fn test_fire_appends_char() {
        let mut app = words_app("hi");
        let code = code_for_char('h').unwrap();
        app.handle_report(report(code, 0.5));
        assert_eq!(app.session().typed(), &['h']);
        assert!(app.session().is_active());
    }

    #[test]
    fn test_unfocused_reports_are_dropped() {
        let mut app = words_app("hi");
        app.set_focused(false);
        app.handle_report(report(code_for_char('h').unwrap(), 0.9));
        assert_eq!(app.session().cursor(), 0);
        assert_eq!(app.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_reports_after_completion_are_dropped() {
        let mut app = words_app("a");
        app.press_digital(code_for_char('a').unwrap());
        assert!(app.session().is_complete());
        app.press_digital(code_for_char('b').unwrap());
        assert_eq!(app.session().cursor(), 1);
    }

    #[test]
    fn test_retract_undoes_keystroke() {
        let mut app = words_app("hi");
        let mut settings = *app.settings();
        settings.window = ActuationWindow::Bracket { min: 0.2, max: 0.8 };
        app.update_initial_settings(settings);

        let code = code_for_char('h').unwrap();
        app.handle_report(report(code, 0.5));
        assert_eq!(app.session().typed(), &['h']);
        app.handle_report(report(code, 0.95));
        assert!(app.session().typed().is_empty());
    }

    #[test]
    fn test_backspace_key_fires_session_backspace() {
        let mut app = words_app("hi");
        app.press_digital(code_for_char('h').unwrap());
        app.press_digital(code_for_char('h').unwrap());
        assert_eq!(app.session().typed(), &['h', 'h']);
        app.press_digital(backspace_code());
        assert_eq!(app.session().typed(), &['h']);
    }

    #[test]
    fn test_countdown_completes_after_enough_ticks() {
        let mut app = App::new(
            InitialSettings {
                mode: TestMode::Time { seconds: 1 },
                ..InitialSettings::default()
            },
            Box::new(FixedPrompt::new("some words here")),
        );
        app.press_digital(code_for_char('s').unwrap());
        assert!(app.session().is_active());

        for _ in 0..10 {
            app.on_tick();
        }
        assert!(app.session().is_complete());
    }

    #[test]
    fn test_reset_disarms_countdown() {
        let mut app = App::new(
            InitialSettings {
                mode: TestMode::Time { seconds: 1 },
                ..InitialSettings::default()
            },
            Box::new(FixedPrompt::new("some words here")),
        );
        app.press_digital(code_for_char('s').unwrap());
        app.reset_test();
        // Ticks after a reset must never complete the fresh test.
        for _ in 0..50 {
            app.on_tick();
        }
        assert_eq!(app.session().state(), SessionState::Idle);
        assert_eq!(app.session().seconds_remaining, None);

        // Cancellation is idempotent.
        app.reset_test();
        assert_eq!(app.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_words_completion_cancels_timers() {
        let mut app = words_app("a");
        app.press_digital(code_for_char('a').unwrap());
        assert!(app.session().is_complete());
        assert!(!app.countdown_armed);
        assert_eq!(app.countdown_ms, 0);
    }

    #[test]
    fn test_time_mode_grows_target() {
        let mut app = App::new(
            InitialSettings {
                mode: TestMode::Time { seconds: 30 },
                ..InitialSettings::default()
            },
            Box::new(FixedPrompt::new("ab cd")),
        );
        let before = app.session().target().len();
        for c in "ab c".chars() {
            app.apply_char(c);
        }
        assert!(app.session().target().len() > before);
    }

    #[test]
    fn test_challenge_randomizes_on_line_crossing() {
        let mut app = App::new(
            InitialSettings {
                mode: TestMode::Time { seconds: 30 },
                window: ActuationWindow::Bracket { min: 0.2, max: 0.8 },
                challenge: ChallengeType::Challenge,
                difficulty: Difficulty::Normal,
            },
            Box::new(FixedPrompt::new(
                "aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddd eeeeeeeeee ffffffffff",
            )),
        );
        assert!(app.running.is_empty());
        // Type through the first wrap at the default 60-column width.
        for c in "aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddd eeeeeeeeee ".chars() {
            app.apply_char(c);
        }
        assert!(!app.running.is_empty());
    }

    #[test]
    fn test_static_mode_never_randomizes() {
        let mut app = words_app("hello world");
        let window = app.effective_window();
        app.randomize_bracket();
        assert_eq!(app.effective_window(), window);
        assert!(app.running.is_empty());
    }

    #[test]
    fn test_randomize_while_idle_commits_window() {
        let mut app = App::new(
            InitialSettings {
                challenge: ChallengeType::Challenge,
                window: ActuationWindow::Bracket { min: 0.2, max: 0.8 },
                ..InitialSettings::default()
            },
            Box::new(FixedPrompt::new("hello world")),
        );
        app.randomize_bracket();
        assert_eq!(app.settings().window, app.effective_window());
        assert_ne!(
            app.settings().window,
            ActuationWindow::Bracket { min: 0.2, max: 0.8 }
        );
    }

    #[test]
    fn test_running_override_applies_without_reset() {
        let mut app = words_app("hello");
        app.press_digital(code_for_char('h').unwrap());
        let cursor = app.session().cursor();

        app.update_running_settings(WindowOverride {
            min: Some(0.7),
            max: None,
        });
        assert_eq!(
            app.effective_window(),
            ActuationWindow::Point { threshold: 0.7 }
        );
        assert_eq!(app.session().cursor(), cursor);
    }

    #[test]
    fn test_pressure_snapshot_and_most_pressed() {
        let mut app = words_app("hello");
        app.handle_report(AnalogReport::new(vec![
            KeySample::new(code_for_char('h').unwrap(), 0.3),
            KeySample::new(code_for_char('e').unwrap(), 0.7),
        ]));
        assert_eq!(app.pressure(code_for_char('e').unwrap()), 0.7);
        assert_eq!(
            app.most_pressed_key(),
            Some((code_for_char('e').unwrap(), 0.7))
        );

        app.set_focused(false);
        assert_eq!(app.most_pressed_key(), None);
    }

    #[test]
    fn test_results_log_written_on_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut app = words_app("ab").with_results_log(path.clone());

        app.press_digital(code_for_char('a').unwrap());
        app.press_digital(code_for_char('b').unwrap());
        assert!(app.session().is_complete());

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,mode,wpm,raw_wpm,cpm,accuracy,score"
        );
        assert!(lines.next().unwrap().contains("words:2"));
    }
}
