//! Bridges the async prediction engine into the synchronous event loop,
//! and widens each query with the next-word branch.

use std::path::PathBuf;

use anyhow::Result;
use quill_engine::{Match, Predictor};
use tokio::runtime::Runtime;

pub struct Suggestions {
    predictor: Predictor,
    runtime: Runtime,
}

impl Suggestions {
    pub fn new(resources: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            predictor: Predictor::new(resources),
            runtime: tokio::runtime::Builder::new_multi_thread().build()?,
        })
    }

    /// Candidates for the text left of the cursor: completions of the
    /// current word, plus likely next words from the trailing-space
    /// variant of the query (prefixed with the space they would insert),
    /// ranked together.
    pub fn fetch(&self, line: &str) -> Result<Vec<Match>> {
        self.runtime.block_on(async {
            let mut res = self.predictor.predictions(line).await?;
            let trailing = self.predictor.predictions(&format!("{line} ")).await?;
            for mut m in trailing {
                m.text.insert(0, ' ');
                res.push(m);
            }
            res.sort_by(Match::ranking);
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resources(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in [
            "ngrams.5.txt",
            "ngrams.4.txt",
            "ngrams.3.txt",
            "ngrams.2.txt",
            "ngrams.1.txt",
            "ngrams.1.all.txt",
        ] {
            let content = files
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, c)| *c)
                .unwrap_or("");
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn merges_in_word_and_next_word_branches() {
        let dir = resources(&[
            ("ngrams.2.txt", "hello world\t10\n"),
            ("ngrams.1.all.txt", "hellos\t4\n"),
        ]);
        let s = Suggestions::new(dir.path()).unwrap();

        let got = s.fetch("hello").unwrap();
        // Both branches surface the bigram completion; the two copies are
        // kept and the in-word unigram ranks below them.
        assert_eq!(got[0].text, " world");
        assert_eq!(got[1].text, " world");
        assert!(!got.iter().any(|m| m.text.is_empty()));
    }

    #[test]
    fn short_fragment_still_completes_in_word() {
        let dir = resources(&[("ngrams.1.txt", "hello\t10\nhere\t50\n")]);
        let s = Suggestions::new(dir.path()).unwrap();

        let got = s.fetch("he").unwrap();
        assert_eq!(got[0].text, "re");
    }
}
