//! Completion predictions for the text left of the cursor.
//!
//! Up to six ngram files are probed concurrently, one per context order,
//! and their top matches merged in a fixed order so results stay
//! deterministic across runs.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ngram::{self, Match};

/// Lines shorter than this only consult the short-fragment vocabulary.
const SHORT_FRAGMENT: usize = 5;

struct QueryFile {
    filename: &'static str,
    order: usize,
    /// Whether this file is still consulted for short fragments.
    short: bool,
}

const QUERY_FILES: [QueryFile; 6] = [
    QueryFile { filename: "ngrams.5.txt", order: 5, short: false },
    QueryFile { filename: "ngrams.4.txt", order: 4, short: false },
    QueryFile { filename: "ngrams.3.txt", order: 3, short: false },
    QueryFile { filename: "ngrams.2.txt", order: 2, short: false },
    QueryFile { filename: "ngrams.1.txt", order: 1, short: true },
    QueryFile { filename: "ngrams.1.all.txt", order: 1, short: false },
];

/// Probes the ngram files under one resource directory.
pub struct Predictor {
    resources: PathBuf,
}

impl Predictor {
    pub fn new(resources: impl Into<PathBuf>) -> Self {
        Self {
            resources: resources.into(),
        }
    }

    /// Ranked, deduplicated completions for the text left of the cursor.
    /// Each match's text is reduced to the bytes that would actually be
    /// inserted; matches that add nothing are dropped.
    pub async fn predictions(&self, text: &str) -> Result<Vec<Match>> {
        let line = text.to_lowercase();
        let mut matches = self.all_matches(&line).await?;
        for m in &mut matches {
            m.text = completion_suffix(&line, &m.text);
        }
        debug!(count = matches.len(), "matches with suffix removed");

        let mut seen = HashSet::new();
        let mut res = Vec::new();
        for m in matches {
            if m.text.is_empty() || !seen.insert(m.text.clone()) {
                continue;
            }
            res.push(m);
        }
        Ok(res)
    }

    /// Probes every applicable ngram file in parallel and concatenates the
    /// per-file results in declaration order, never completion order.
    async fn all_matches(&self, line: &str) -> Result<Vec<Match>> {
        let short = line.len() < SHORT_FRAGMENT;

        let mut tasks: Vec<Option<JoinHandle<Result<Vec<Match>>>>> =
            Vec::with_capacity(QUERY_FILES.len());
        for qf in &QUERY_FILES {
            if short && !qf.short {
                tasks.push(None);
                continue;
            }
            let Some(query) = last_words(line, qf.order) else {
                tasks.push(None);
                continue;
            };
            let path = self.resources.join(qf.filename);
            let order = qf.order;
            tasks.push(Some(tokio::task::spawn_blocking(move || {
                ngram::find(&path, &query, order)
            })));
        }

        let mut all = Vec::new();
        for (task, qf) in tasks.into_iter().zip(&QUERY_FILES) {
            let Some(task) = task else { continue };
            let ms = task
                .await?
                .with_context(|| format!("{}: lookup failed", qf.filename))?;
            all.extend(ms);
        }
        debug!(line, count = all.len(), "combined matches");
        Ok(all)
    }
}

/// The last `n` space-separated words of `line`, or `None` when the
/// query would be blank (blank queries match the whole file).
fn last_words(line: &str, n: usize) -> Option<String> {
    let words: Vec<&str> = line.split(' ').collect();
    let tail = if words.len() > n {
        &words[words.len() - n..]
    } else {
        &words[..]
    };
    let joined = tail.join(" ");
    if joined.trim_matches(' ').is_empty() {
        return None;
    }
    Some(joined)
}

/// Reduces a matched ngram to the completion it offers at the end of
/// `line`: the first suffix of `line` (scanning left to right) that
/// prefixes `patch` is stripped, and the remainder is cut at the next
/// word boundary, keeping a leading space when one is present.
fn completion_suffix(line: &str, patch: &str) -> String {
    for (e, _) in line.char_indices() {
        let Some(mut rest) = patch.strip_prefix(&line[e..]) else {
            continue;
        };
        if rest.len() > 2 {
            if let Some(i) = rest.get(1..).and_then(|t| t.find(' ')) {
                rest = &rest[..i + 1];
            }
        }
        return rest.to_string();
    }
    String::new()
}
