use std::error::Error;
use std::io::{self, stdin};
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use directories::ProjectDirs;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use analok::app::{App, TICK_RATE_MS};
use analok::config::{ConfigStore, FileConfigStore};
use analok::runtime::{CrosstermEventSource, EngineEvent, EventSource, FixedTicker, Runner};
use analok::sample::{backspace_code, code_for_char};
use analok::window::{
    ActuationWindow, ChallengeType, Difficulty, InitialSettings, TestMode,
};
use analok::words::{FixedPrompt, RandomWords, WordSource};

/// typing test for analog keyboards, with actuation brackets and moving windows
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing test built around analog key pressure: fire inside a configurable actuation window, get keystrokes retracted when you bottom out, and let challenge mode move the window under your fingers."
)]
pub struct Cli {
    /// number of seconds to run the test
    #[clap(short = 's', long)]
    seconds: Option<u64>,

    /// number of words to type (switches to words mode)
    #[clap(short = 'w', long)]
    words: Option<usize>,

    /// custom prompt to use instead of random words
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// bracket actuation: keys fire inside [min, max] and retract past max
    #[clap(short = 'b', long)]
    bracket: bool,

    /// fire threshold (point mode) or bracket lower bound
    #[clap(long)]
    min: Option<f64>,

    /// bracket upper bound; pressing past it undoes the keystroke
    #[clap(long)]
    max: Option<f64>,

    /// challenge behaviour: static window or one that moves every line
    #[clap(short = 'c', long, value_enum)]
    challenge: Option<ChallengeType>,

    /// challenge tier
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,
}

impl Cli {
    /// Config-file settings with CLI overrides layered on top.
    fn settings(&self, base: InitialSettings) -> InitialSettings {
        let mode = match (self.words, self.seconds) {
            (Some(count), _) => TestMode::Words { count },
            (None, Some(seconds)) => TestMode::Time { seconds },
            (None, None) => base.mode,
        };

        let window = if self.bracket || self.min.is_some() || self.max.is_some() {
            let (base_min, base_max) = match base.window {
                ActuationWindow::Point { threshold } => (threshold, 0.8),
                ActuationWindow::Bracket { min, max } => (min, max),
            };
            let min = self.min.unwrap_or(base_min);
            if self.bracket || self.max.is_some() {
                ActuationWindow::Bracket {
                    min,
                    max: self.max.unwrap_or(base_max),
                }
            } else {
                ActuationWindow::Point { threshold: min }
            }
        } else {
            base.window
        };

        InitialSettings {
            mode,
            window,
            challenge: self.challenge.unwrap_or(base.challenge),
            difficulty: self.difficulty.unwrap_or(base.difficulty),
        }
        .clamped()
    }

    fn word_source(&self) -> Box<dyn WordSource> {
        match &self.prompt {
            Some(prompt) => Box::new(FixedPrompt::new(prompt.clone())),
            None => Box::new(RandomWords::english()),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let settings = cli.settings(FileConfigStore::new().load().initial_settings());
    let mut app = App::new(settings, cli.word_source());
    if let Some(proj_dirs) = ProjectDirs::from("", "", "analok") {
        app = app.with_results_log(proj_dirs.config_dir().join("log.csv"));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            EngineEvent::Tick => {
                app.on_tick();
            }
            EngineEvent::Resize => {}
            EngineEvent::Focus(focused) => {
                app.set_focused(focused);
            }
            EngineEvent::Report(report) => {
                app.handle_report(report);
            }
            EngineEvent::Key(key) => {
                if !handle_key(app, key) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Returns false when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => return false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return false;
        }
        KeyCode::Left => {
            app.reset_test();
        }
        KeyCode::Right => {
            // Manual window shuffle, only meaningful in challenge mode.
            app.randomize_bracket();
        }
        KeyCode::Backspace => {
            app.press_digital(backspace_code());
        }
        KeyCode::Char(c) => {
            // Digital fallback: synthesize a press that lands in the window.
            if let Some(code) = code_for_char(c) {
                app.press_digital(code);
            }
        }
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["analok"]);
        let base = InitialSettings::default();
        assert_eq!(cli.settings(base), base);
    }

    #[test]
    fn test_cli_words_mode() {
        let cli = Cli::parse_from(["analok", "-w", "50"]);
        let settings = cli.settings(InitialSettings::default());
        assert_eq!(settings.mode, TestMode::Words { count: 50 });
    }

    #[test]
    fn test_cli_seconds_mode() {
        let cli = Cli::parse_from(["analok", "--seconds", "60"]);
        let settings = cli.settings(InitialSettings::default());
        assert_eq!(settings.mode, TestMode::Time { seconds: 60 });
    }

    #[test]
    fn test_cli_words_wins_over_seconds() {
        let cli = Cli::parse_from(["analok", "-w", "25", "-s", "60"]);
        let settings = cli.settings(InitialSettings::default());
        assert_eq!(settings.mode, TestMode::Words { count: 25 });
    }

    #[test]
    fn test_cli_bracket_window() {
        let cli = Cli::parse_from(["analok", "--bracket", "--min", "0.2", "--max", "0.8"]);
        let settings = cli.settings(InitialSettings::default());
        assert_eq!(
            settings.window,
            ActuationWindow::Bracket { min: 0.2, max: 0.8 }
        );
    }

    #[test]
    fn test_cli_min_alone_moves_point_threshold() {
        let cli = Cli::parse_from(["analok", "--min", "0.6"]);
        let settings = cli.settings(InitialSettings::default());
        assert_eq!(settings.window, ActuationWindow::Point { threshold: 0.6 });
    }

    #[test]
    fn test_cli_max_implies_bracket() {
        let cli = Cli::parse_from(["analok", "--max", "0.9"]);
        let settings = cli.settings(InitialSettings::default());
        assert!(settings.window.is_bracket());
    }

    #[test]
    fn test_cli_window_values_are_clamped() {
        let cli = Cli::parse_from(["analok", "--bracket", "--min", "0.0", "--max", "0.0"]);
        let settings = cli.settings(InitialSettings::default());
        match settings.window {
            ActuationWindow::Bracket { min, max } => {
                assert!(min >= 0.01);
                assert!(min < max);
            }
            _ => panic!("expected bracket"),
        }
    }

    #[test]
    fn test_cli_challenge_and_difficulty() {
        let cli = Cli::parse_from(["analok", "-c", "challenge", "-d", "agony"]);
        let settings = cli.settings(InitialSettings::default());
        assert_eq!(settings.challenge, ChallengeType::Challenge);
        assert_eq!(settings.difficulty, Difficulty::Agony);
    }

    #[test]
    fn test_cli_prompt_selects_fixed_source() {
        let cli = Cli::parse_from(["analok", "-p", "hello world"]);
        let mut source = cli.word_source();
        assert_eq!(source.generate_word_set(10), "hello world");
    }

    #[test]
    fn test_handle_key_esc_quits() {
        let cli = Cli::parse_from(["analok", "-p", "hi", "-w", "1"]);
        let mut app = App::new(cli.settings(InitialSettings::default()), cli.word_source());
        assert!(!handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)
        ));
    }

    #[test]
    fn test_handle_key_types_through_fallback() {
        let cli = Cli::parse_from(["analok", "-p", "hi", "-w", "1"]);
        let mut app = App::new(cli.settings(InitialSettings::default()), cli.word_source());
        assert!(handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE)
        ));
        assert_eq!(app.session().typed(), &['h']);
    }

    #[test]
    fn test_handle_key_left_restarts() {
        let cli = Cli::parse_from(["analok", "-p", "hi", "-w", "1"]);
        let mut app = App::new(cli.settings(InitialSettings::default()), cli.word_source());
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE));
        assert!(handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Left, KeyModifiers::NONE)
        ));
        assert_eq!(app.session().cursor(), 0);
    }
}
