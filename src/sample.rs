use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest pressure value treated as a real key movement.
/// Anything below this is sensor noise and is skipped without a state change.
pub const NOISE_FLOOR: f64 = 0.01;

/// One reading for a physically-active key. `value` is already normalized to
/// `[0, 1]` by the transport (raw byte / 255); the core trusts that.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySample {
    pub code: u16,
    pub value: f64,
}

impl KeySample {
    pub fn new(code: u16, value: f64) -> Self {
        Self { code, value }
    }
}

/// One polling tick's worth of samples. Keys absent from a report are fully
/// released; an empty report is a legitimate "all keys up" signal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalogReport {
    pub data: Vec<KeySample>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("malformed analog report: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl AnalogReport {
    pub fn new(data: Vec<KeySample>) -> Self {
        Self { data }
    }

    /// Decode a report at the transport boundary. Malformed payloads are the
    /// caller's cue to warn and drop; engine state must stay untouched.
    pub fn from_json(raw: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Drop samples the engines must never see: unknown key codes and
    /// non-finite values. The rest of the report is still processed.
    pub fn sanitize(self) -> Vec<KeySample> {
        self.data
            .into_iter()
            .filter(|s| {
                if !s.value.is_finite() {
                    log::warn!("dropping sample with non-finite value for key {:#04x}", s.code);
                    return false;
                }
                if output_for_code(s.code).is_none() {
                    log::warn!("unknown key code: {:#04x} ({})", s.code, s.code);
                    return false;
                }
                true
            })
            .map(|s| KeySample::new(s.code, s.value.clamp(0.0, 1.0)))
            .collect()
    }
}

/// What a fired key contributes to the typed buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutput {
    Char(char),
    Backspace,
}

const BACKSPACE_USAGE: u16 = 0x2a;
const SPACE_USAGE: u16 = 0x2c;

/// Map an HID usage code to its typed output. No modifier handling; only the
/// unshifted Latin layout this core supports.
pub fn output_for_code(code: u16) -> Option<KeyOutput> {
    match code {
        0x04..=0x1d => Some(KeyOutput::Char((b'a' + (code as u8 - 0x04)) as char)),
        0x1e..=0x26 => Some(KeyOutput::Char((b'1' + (code as u8 - 0x1e)) as char)),
        0x27 => Some(KeyOutput::Char('0')),
        SPACE_USAGE => Some(KeyOutput::Char(' ')),
        BACKSPACE_USAGE => Some(KeyOutput::Backspace),
        _ => None,
    }
}

/// Inverse mapping used by the digital-keyboard fallback.
pub fn code_for_char(c: char) -> Option<u16> {
    match c {
        'a'..='z' => Some(0x04 + (c as u16 - 'a' as u16)),
        '1'..='9' => Some(0x1e + (c as u16 - '1' as u16)),
        '0' => Some(0x27),
        ' ' => Some(SPACE_USAGE),
        _ => None,
    }
}

pub fn backspace_code() -> u16 {
    BACKSPACE_USAGE
}

/// Synthesize the press/release envelope of a digital keystroke so the whole
/// analog pipeline can be driven from a plain keyboard. `peak` should sit
/// inside the active window or the press will not fire (or will overshoot).
pub fn synthetic_press(code: u16, peak: f64) -> [AnalogReport; 2] {
    [
        AnalogReport::new(vec![KeySample::new(code, peak)]),
        AnalogReport::new(vec![KeySample::new(code, 0.0)]),
    ]
}
