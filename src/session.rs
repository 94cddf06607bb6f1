use std::time::SystemTime;

use crate::window::TestMode;

/// Visual columns used for word-wrap analysis. Challenge randomization keys
/// off completed display lines, so the wrap width is part of core behavior
/// even though rendering itself is not.
pub const DEFAULT_LINE_WIDTH: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Complete,
}

/// What one appended character did to the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// First character of the test: the session just went Active.
    pub started: bool,
    /// The appended whitespace pushed the cursor onto a new visual line.
    pub crossed_line: bool,
    /// The session transitioned to Complete on this character.
    pub completed: bool,
}

/// Owns the target text and the typed-so-far buffer. Only the narrow
/// `append_char`/`backspace` surface mutates the buffer; the cursor always
/// equals the buffer length.
#[derive(Debug)]
pub struct TypingSession {
    target: Vec<char>,
    typed: Vec<char>,
    cursor: usize,
    state: SessionState,
    mode: TestMode,
    pub started_at: Option<SystemTime>,
    pub seconds_remaining: Option<f64>,
    line_width: usize,
    next_growth_at: usize,
}

impl TypingSession {
    pub fn new(target: String, mode: TestMode) -> Self {
        Self::with_line_width(target, mode, DEFAULT_LINE_WIDTH)
    }

    pub fn with_line_width(target: String, mode: TestMode, line_width: usize) -> Self {
        let target: Vec<char> = target.chars().collect();
        let next_growth_at = target.len() * 3 / 4;
        Self {
            target,
            typed: Vec::new(),
            cursor: 0,
            state: SessionState::Idle,
            mode,
            started_at: None,
            seconds_remaining: None,
            line_width: line_width.max(1),
            next_growth_at,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn elapsed_minutes(&self, now: SystemTime) -> f64 {
        match self.started_at {
            Some(start) => now
                .duration_since(start)
                .map(|d| d.as_secs_f64() / 60.0)
                .unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Append one character. No-op once Complete.
    pub fn append_char(&mut self, c: char) -> AppendOutcome {
        if self.state == SessionState::Complete {
            return AppendOutcome::default();
        }

        let mut outcome = AppendOutcome::default();

        if self.state == SessionState::Idle {
            self.state = SessionState::Active;
            self.started_at = Some(SystemTime::now());
            if let TestMode::Time { seconds } = self.mode {
                self.seconds_remaining = Some(seconds as f64);
            }
            outcome.started = true;
        }

        let line_before = self.line_of(self.cursor);
        self.typed.push(c);
        self.cursor += 1;

        if (c == ' ' || c == '\n') && self.line_of(self.cursor) > line_before {
            outcome.crossed_line = true;
        }

        if matches!(self.mode, TestMode::Words { .. }) && self.cursor >= self.target.len() {
            self.state = SessionState::Complete;
            outcome.completed = true;
        }

        outcome
    }

    /// Remove the character before the cursor. Rejected (returning false)
    /// when the test is over, the buffer is empty, or the previous character
    /// closed out a correctly-typed word; none of these are errors.
    pub fn backspace(&mut self) -> bool {
        if self.state == SessionState::Complete || self.cursor == 0 {
            return false;
        }
        if self.is_word_complete(self.cursor - 1) {
            return false;
        }
        self.typed.pop();
        self.cursor -= 1;
        true
    }

    /// True when everything from the start of the word containing `index` up
    /// to `index` was typed correctly and `index` sits on a word boundary.
    pub fn is_word_complete(&self, index: usize) -> bool {
        let mut word_start = index;
        while word_start > 0 && self.target.get(word_start - 1) != Some(&' ') {
            word_start -= 1;
        }

        for i in word_start..index {
            if self.typed.get(i) != self.target.get(i) {
                return false;
            }
        }

        index == self.target.len() || self.target.get(index) == Some(&' ')
    }

    /// One second of countdown. Only meaningful while Active in time mode.
    pub fn on_countdown_tick(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        if !matches!(self.mode, TestMode::Time { .. }) {
            return;
        }
        if let Some(remaining) = self.seconds_remaining {
            let next = remaining - 1.0;
            if next <= 0.0 {
                self.seconds_remaining = Some(0.0);
                self.state = SessionState::Complete;
            } else {
                self.seconds_remaining = Some(next);
            }
        }
    }

    /// Time mode grows its text once the cursor passes 75% of it.
    pub fn needs_more_words(&self) -> bool {
        matches!(self.mode, TestMode::Time { .. }) && self.cursor > self.next_growth_at
    }

    pub fn extend_target(&mut self, more: &str) {
        if more.is_empty() {
            return;
        }
        self.target.push(' ');
        self.target.extend(more.chars());
        self.next_growth_at = self.target.len() * 3 / 4;
    }

    /// Back to Idle with fresh target text.
    pub fn reset(&mut self, target: String) {
        self.target = target.chars().collect();
        self.typed.clear();
        self.cursor = 0;
        self.state = SessionState::Idle;
        self.started_at = None;
        self.seconds_remaining = None;
        self.next_growth_at = self.target.len() * 3 / 4;
    }

    /// Greedy word-wrap of the target at the configured width; returns the
    /// index of the first character of each visual line.
    pub fn line_starts(&self) -> Vec<usize> {
        let mut starts = vec![0];
        let mut col = 0usize;
        let mut i = 0;
        let n = self.target.len();

        while i < n {
            if self.target[i] == '\n' {
                starts.push(i + 1);
                col = 0;
                i += 1;
                continue;
            }

            let mut j = i;
            while j < n && self.target[j] != ' ' && self.target[j] != '\n' {
                j += 1;
            }
            let word_len = j - i;

            if col > 0 && col + word_len > self.line_width {
                starts.push(i);
                col = 0;
            }
            col += word_len;

            if j < n && self.target[j] == ' ' {
                col += 1;
                j += 1;
            }
            i = j.max(i + 1);
        }

        starts
    }

    fn line_of(&self, pos: usize) -> usize {
        let starts = self.line_starts();
        starts.partition_point(|&s| s <= pos).saturating_sub(1)
    }
}
