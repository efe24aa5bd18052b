//! quill-ngrams: builds the sorted ngram frequency tables the editor
//! searches, from plain text corpus files.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use quill_engine::corpus::{NgramCounter, MAX_ORDER};

#[derive(Debug, Parser)]
#[command(
    name = "quill-ngrams",
    about = "Count ngrams in plain text and print a sorted frequency table"
)]
struct Args {
    /// Emit only ngrams of exactly this order (1-5).
    #[arg(long)]
    filter: Option<usize>,

    /// Plain text corpus files.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(filter) = args.filter {
        if !(1..=MAX_ORDER).contains(&filter) {
            bail!("--filter must be between 1 and {MAX_ORDER}");
        }
    }

    let mut counter = NgramCounter::new(args.filter);
    let mut chunk = [0u8; 4096];
    for path in &args.files {
        let mut file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        loop {
            let n = file
                .read(&mut chunk)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if n == 0 {
                break;
            }
            counter.feed(&chunk[..n]);
        }
        eprint!(".");
    }
    counter.finish();
    eprintln!();

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    counter.write_to(&mut out)?;
    out.flush()?;
    Ok(())
}
