use serde::Serialize;

/// Derived performance numbers for a session. Never mutated independently;
/// always recomputed from the typed buffer and elapsed time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub wpm: u32,
    pub raw_wpm: u32,
    pub cpm: u32,
    pub accuracy: u32,
    /// Count of fully-correct words up to and including the word under the
    /// cursor.
    pub score: u32,
}

/// Pure recomputation from the typed buffer versus the target text.
///
/// `cursor` is the number of typed chars; `elapsed_minutes <= 0` yields all
/// zeroes. Identical inputs always produce identical output.
pub fn compute(typed: &[char], target: &[char], cursor: usize, elapsed_minutes: f64) -> Metrics {
    if elapsed_minutes <= 0.0 {
        return Metrics::default();
    }

    let cursor = cursor.min(typed.len());
    let correct_chars = (0..cursor)
        .filter(|&i| target.get(i) == Some(&typed[i]))
        .count();

    let wpm = (correct_chars as f64 / 5.0 / elapsed_minutes).round() as u32;
    let raw_wpm = (cursor as f64 / 5.0 / elapsed_minutes).round() as u32;
    let cpm = (cursor as f64 / elapsed_minutes).round() as u32;
    let accuracy = if cursor > 0 {
        (correct_chars as f64 / cursor as f64 * 100.0).round() as u32
    } else {
        0
    };

    Metrics {
        wpm,
        raw_wpm,
        cpm,
        accuracy,
        score: score(typed, target, cursor),
    }
}

/// Walk the target word by word up to the cursor; a word counts when every
/// typed char in it matches and at least one char was typed before the
/// boundary.
fn score(typed: &[char], target: &[char], cursor: usize) -> u32 {
    let mut score = 0;
    let mut word_start = 0;

    for i in 0..=cursor {
        let at_boundary =
            i == cursor || matches!(target.get(i), Some(&' ') | Some(&'\n') | None);
        if !at_boundary {
            continue;
        }

        if i > word_start {
            let word_correct =
                (word_start..i).all(|j| typed.get(j).copied() == target.get(j).copied());
            if word_correct {
                score += 1;
            }
        }
        word_start = i + 1;
    }

    score
}
