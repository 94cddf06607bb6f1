use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::seq::SliceRandom;
use serde::Deserialize;

static WORDS_DIR: Dir = include_dir!("src/words");

/// Embedded word list. The file format mirrors the usual typing-test
/// language files: a name, a size, and the words themselves.
#[derive(Clone, Debug, Deserialize)]
pub struct Lexicon {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Lexicon {
    pub fn new(file_name: &str) -> Self {
        let file = WORDS_DIR
            .get_file(format!("{file_name}.json"))
            .unwrap_or_else(|| panic!("embedded word list {file_name}.json is missing"));
        let raw: Lexicon = serde_json::from_str(file.contents_utf8().expect("word list not utf-8"))
            .expect("word list json is invalid");
        // Guard against duplicate entries in the word file.
        let words: Vec<String> = raw.words.into_iter().unique().collect();
        Self {
            name: raw.name,
            size: words.len() as u32,
            words,
        }
    }

    pub fn english() -> Self {
        Self::new("english")
    }
}

/// Black-box word supplier for the session engine. Time mode keeps asking
/// for more words as the cursor advances.
pub trait WordSource {
    /// A fresh space-joined, de-duplicated word set of roughly `count` words.
    fn generate_word_set(&mut self, count: usize) -> String;
    /// More words for a growing test; returns only the new words.
    fn append_more_words(&mut self, count: usize) -> String;
}

/// Uniform random selection from a lexicon. Words within one draw batch are
/// unique; requests larger than the lexicon repeat in fresh batches.
pub struct RandomWords {
    lexicon: Lexicon,
    current: Vec<String>,
}

impl RandomWords {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            lexicon,
            current: Vec::new(),
        }
    }

    pub fn english() -> Self {
        Self::new(Lexicon::english())
    }

    pub fn current_word_set(&self) -> String {
        self.current.join(" ")
    }

    fn pick(&self, count: usize) -> Vec<String> {
        let rng = &mut rand::thread_rng();
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let batch = (count - out.len()).min(self.lexicon.words.len());
            out.extend(self.lexicon.words.choose_multiple(rng, batch).cloned());
        }
        out
    }
}

impl WordSource for RandomWords {
    fn generate_word_set(&mut self, count: usize) -> String {
        if count == 0 {
            self.current.clear();
            return String::new();
        }
        self.current = self.pick(count);
        self.current.join(" ")
    }

    fn append_more_words(&mut self, count: usize) -> String {
        if count == 0 {
            return String::new();
        }
        let more = self.pick(count);
        let joined = more.join(" ");
        self.current.extend(more);
        joined
    }
}

/// A fixed prompt, used for `--prompt` runs and for scripted tests. Repeats
/// itself when asked for more words.
pub struct FixedPrompt {
    prompt: String,
}

impl FixedPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl WordSource for FixedPrompt {
    fn generate_word_set(&mut self, _count: usize) -> String {
        self.prompt.clone()
    }

    fn append_more_words(&mut self, _count: usize) -> String {
        self.prompt.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lexicon_loads_embedded_english() {
        let lexicon = Lexicon::english();
        assert_eq!(lexicon.name, "english");
        assert!(lexicon.words.len() > 100);
        assert_eq!(lexicon.size as usize, lexicon.words.len());
    }

    #[test]
    fn test_lexicon_has_no_duplicates() {
        let lexicon = Lexicon::english();
        let unique: HashSet<&String> = lexicon.words.iter().collect();
        assert_eq!(unique.len(), lexicon.words.len());
    }

    #[test]
    fn test_generate_word_set_count_and_uniqueness() {
        let mut source = RandomWords::english();
        let set = source.generate_word_set(25);
        let words: Vec<&str> = set.split(' ').collect();
        assert_eq!(words.len(), 25);

        let unique: HashSet<&&str> = words.iter().collect();
        assert_eq!(unique.len(), 25);
    }

    #[test]
    fn test_generate_more_than_lexicon_size() {
        let mut source = RandomWords::english();
        let size = source.lexicon.words.len();
        let set = source.generate_word_set(size + 10);
        assert_eq!(set.split(' ').count(), size + 10);
    }

    #[test]
    fn test_append_more_words_returns_only_new() {
        let mut source = RandomWords::english();
        source.generate_word_set(10);
        let more = source.append_more_words(5);
        assert_eq!(more.split(' ').count(), 5);
        assert_eq!(source.current_word_set().split(' ').count(), 15);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let mut source = RandomWords::english();
        assert_eq!(source.generate_word_set(0), "");
        assert_eq!(source.append_more_words(0), "");
    }

    #[test]
    fn test_fixed_prompt_round_trips() {
        let mut source = FixedPrompt::new("hello world");
        assert_eq!(source.generate_word_set(99), "hello world");
        assert_eq!(source.append_more_words(1), "hello world");
    }
}
