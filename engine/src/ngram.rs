//! Prefix lookups over plain-text ngram flat files.
//!
//! A file holds `text\tfrequency\n` records sorted bytewise by text. The
//! file itself is the index: lookups bisect it through [`crate::bsearch`]
//! and never load more than a handful of chunks.

use std::cmp::Ordering;
use std::fs::File;
use std::path::Path;

use anyhow::Result;

use crate::bsearch::{self, Config};

/// Matches kept per file probe.
pub const TOP_MATCHES: usize = 5;

const CHUNK_SIZE: usize = 1024;

/// One completion candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match {
    /// The matched text; after suffix extraction, only the completion.
    pub text: String,
    /// Popularity taken from the ngram file.
    pub freq: i64,
    /// The ngram order this match came from, 1..=5.
    pub len: usize,
}

impl Match {
    /// Result order: longer ngram context beats shorter; within an order,
    /// higher frequency wins.
    pub fn ranking(a: &Match, b: &Match) -> Ordering {
        b.len.cmp(&a.len).then_with(|| b.freq.cmp(&a.freq))
    }
}

/// Borrowed view of one record's payload.
struct Entry<'a> {
    text: &'a [u8],
    freq: &'a [u8],
}

/// Splits `text\tfreq\n` record bytes. A record without a tab keeps all
/// its bytes as text and parses to frequency zero.
fn parse_entry(data: &[u8]) -> Entry<'_> {
    for i in 0..data.len() {
        if data[i] == b'\t' {
            return Entry {
                text: &data[..i],
                freq: &data[i + 1..data.len() - 1],
            };
        }
    }
    Entry {
        text: data,
        freq: &[],
    }
}

impl Entry<'_> {
    fn freq(&self) -> i64 {
        std::str::from_utf8(self.freq)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

/// Returns the top [`TOP_MATCHES`] entries whose text starts with
/// `prefix`, ranked. `order` is recorded on each match so callers can
/// rank across files of different orders.
pub fn find(filename: &Path, prefix: &str, order: usize) -> Result<Vec<Match>> {
    let file = File::open(filename)?;
    let size = file.metadata()?.len();

    let cfg = Config {
        chunk_size: CHUNK_SIZE,
        delimiter: b'\n',
    };
    let sought = prefix.as_bytes();
    let less = |rec: &[u8], target: &[u8]| parse_entry(rec).text < target;

    // Position on the last record earlier than the request; the next
    // record is the first at or after it.
    let mut next = match bsearch::lower_bound(&cfg, &file, size, sought, less) {
        Ok(Some(rec)) => rec.end,
        Ok(None) => 0,
        Err(bsearch::Error::UnexpectedEof(_)) => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut top = TopMatches::default();
    loop {
        let rec = match bsearch::read(&cfg, &file, next) {
            Ok(rec) => rec,
            Err(bsearch::Error::UnexpectedEof(_)) => break,
            Err(err) => return Err(err.into()),
        };
        next = rec.end;

        let entry = parse_entry(&rec.data);
        if !entry.text.starts_with(sought) {
            break;
        }
        top.insert(Match {
            text: String::from_utf8_lossy(entry.text).into_owned(),
            freq: entry.freq(),
            len: order,
        });
    }
    Ok(top.into_ranked())
}

/// Fixed-capacity store for the highest-frequency matches seen, with the
/// current minimum slot cached so inserts stay O(1) in the common case.
#[derive(Debug, Default)]
struct TopMatches {
    slots: [Match; TOP_MATCHES],
    lowest: usize,
    lowest_freq: i64,
}

impl TopMatches {
    fn insert(&mut self, m: Match) {
        if m.freq <= self.lowest_freq {
            return;
        }
        self.slots[self.lowest] = m;

        self.lowest = 0;
        self.lowest_freq = i64::MAX;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.freq < self.lowest_freq {
                self.lowest = i;
                self.lowest_freq = slot.freq;
            }
        }
    }

    /// Unused slots still carry frequency zero and are dropped here.
    fn into_ranked(self) -> Vec<Match> {
        let mut ms: Vec<Match> = self.slots.into_iter().filter(|m| m.freq > 0).collect();
        ms.sort_by(Match::ranking);
        ms
    }
}
