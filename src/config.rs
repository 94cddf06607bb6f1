use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::window::{
    ActuationWindow, ChallengeType, Difficulty, InitialSettings, TestMode,
};

/// Persisted configuration. The window is stored in its raw enabled/min/max
/// shape for the settings UI; it is converted (and clamped) into the tagged
/// `ActuationWindow` at load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub mode: String,
    pub time_seconds: u64,
    pub word_count: usize,
    pub bracket_enabled: bool,
    pub actuation_min: f64,
    pub actuation_max: f64,
    pub challenge: ChallengeType,
    pub difficulty: Difficulty,
    // Owned by the onboarding/styling collaborators; consumed read-only here.
    pub onboarding_completed: bool,
    pub accent_color: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: "time".to_string(),
            time_seconds: 30,
            word_count: 25,
            bracket_enabled: false,
            actuation_min: 0.4,
            actuation_max: 0.8,
            challenge: ChallengeType::Static,
            difficulty: Difficulty::Normal,
            onboarding_completed: false,
            accent_color: "#5865f2".to_string(),
        }
    }
}

impl Config {
    /// Raw stored window, clamped to the engine invariants.
    pub fn window(&self) -> ActuationWindow {
        let window = if self.bracket_enabled {
            ActuationWindow::Bracket {
                min: self.actuation_min,
                max: self.actuation_max,
            }
        } else {
            ActuationWindow::Point {
                threshold: self.actuation_min,
            }
        };
        window.clamped()
    }

    pub fn test_mode(&self) -> TestMode {
        if self.mode == "words" {
            TestMode::Words {
                count: self.word_count,
            }
        } else {
            TestMode::Time {
                seconds: self.time_seconds,
            }
        }
    }

    pub fn initial_settings(&self) -> InitialSettings {
        InitialSettings {
            mode: self.test_mode(),
            window: self.window(),
            challenge: self.challenge,
            difficulty: self.difficulty,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "analok") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("analok_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
            log::warn!("unreadable config at {:?}, using defaults", self.path);
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
