//! Builds ngram frequency tables from plain text.
//!
//! The output is the sorted `text\tfreq\n` format that [`crate::ngram`]
//! searches: feeding a corpus through [`NgramCounter`] and writing the
//! result produces a ready-to-probe resource file.

use std::collections::BTreeMap;
use std::io::{self, Write};

/// Highest ngram order emitted.
pub const MAX_ORDER: usize = 5;

/// Punctuation that ends a phrase: ngrams never span it.
fn breaks_phrase(c: u8) -> bool {
    matches!(
        c,
        b'\\' | b'`' | b'"' | b'\n' | b'\r' | b',' | b'.' | b'!' | b'[' | b']' | b'^' | b'(' | b')'
            | b'?' | b'_'
    )
}

/// Punctuation that may appear within a word as well as outside one.
fn ambiguous(c: u8) -> bool {
    c == b'\'' || c == b'-'
}

/// Accumulates ngram counts from a byte stream.
///
/// Words are runs of ASCII letters (plus embedded apostrophes),
/// lowercased. A sliding window of the last [`MAX_ORDER`] words emits,
/// for each completed word, every ngram ending at it; phrase punctuation
/// clears the window so ngrams never cross sentence boundaries.
#[derive(Debug, Default)]
pub struct NgramCounter {
    /// When set, only ngrams of exactly this order are counted.
    filter: Option<usize>,
    counts: BTreeMap<String, u64>,
    window: Vec<String>,
    word: String,
}

impl NgramCounter {
    pub fn new(filter: Option<usize>) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Feeds a chunk of corpus bytes. Chunks may split words; state
    /// carries across calls.
    pub fn feed(&mut self, chunk: &[u8]) {
        for &c in chunk {
            if breaks_phrase(c) || (ambiguous(c) && self.word.is_empty()) {
                self.break_phrase();
            } else if c == b' ' || c == b'\t' {
                self.end_word();
            } else if c.is_ascii_alphabetic() || c == b'\'' {
                self.word.push(c.to_ascii_lowercase() as char);
            }
            // Digits, intra-word hyphens and other bytes are dropped.
        }
    }

    /// Flushes any pending word, for input without a trailing newline.
    pub fn finish(&mut self) {
        self.break_phrase();
    }

    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Writes the sorted `text\tfreq\n` table.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        for (text, freq) in &self.counts {
            writeln!(w, "{text}\t{freq}")?;
        }
        Ok(())
    }

    fn end_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        self.window.push(std::mem::take(&mut self.word));
        if self.window.len() > MAX_ORDER {
            self.window.remove(0);
        }

        // Every ngram ending at the word just completed.
        for order in 1..=self.window.len() {
            if self.filter.is_some_and(|f| f != order) {
                continue;
            }
            let gram = self.window[self.window.len() - order..].join(" ");
            *self.counts.entry(gram).or_insert(0) += 1;
        }
    }

    fn break_phrase(&mut self) {
        self.end_word();
        self.window.clear();
    }
}
