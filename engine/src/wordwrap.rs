//! The paragraph codec between on-disk text and the editor's line buffer.
//!
//! [`fold`] breaks paragraphs into display lines; [`unfold`] joins them
//! back. The pair preserves paragraph structure and preformatted blocks
//! but not exact spacing: runs of spaces collapse at break points.

use std::mem;

/// A line whose first byte is a space or tab is preformatted: it is never
/// reflowed or merged with its neighbors.
pub fn preformatted(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

/// Breaks `input` into lines no longer than `lim` bytes, except for lines
/// holding a single unbreakable token. A blank string separates
/// paragraphs; one is also inserted when a preformatted run is followed
/// by normal text.
pub fn fold(input: &str, lim: usize) -> Vec<String> {
    let mut f = Folder {
        lim,
        out: Vec::new(),
        line: String::new(),
        last_space: 0,
        in_par: false,
        last_pre: false,
    };
    for c in input.chars() {
        f.push(c);
    }
    if !f.line.is_empty() {
        f.emit(false);
    }

    let mut out = f.out;
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}

struct Folder {
    lim: usize,
    out: Vec<String>,
    line: String,
    /// Byte length of `line` just after its most recent space.
    last_space: usize,
    in_par: bool,
    last_pre: bool,
}

impl Folder {
    fn push(&mut self, c: char) {
        if !self.in_par {
            // A line begins lazily on the first non-newline rune.
            if c != '\n' {
                self.line.push(c);
                self.in_par = true;
            }
            return;
        }

        match c {
            ' ' => {
                self.line.push(c);
                self.last_space = self.line.len();
            }
            '\n' => {
                self.emit(true);
                return;
            }
            _ => self.line.push(c),
        }

        if self.line.len() > self.lim {
            if self.last_space == 0 {
                self.last_space = self.line.len();
            }
            let head = self.line[..self.last_space]
                .trim_end_matches([' ', '\t'])
                .to_string();
            let tail = self.line[self.last_space..].to_string();
            self.line = head;
            self.emit(false);
            self.line = tail;
            self.last_space = 0;
        }
    }

    fn emit(&mut self, end_par: bool) {
        let s = mem::take(&mut self.line);
        let pre = preformatted(&s);
        if !pre && self.last_pre {
            self.out.push(String::new());
        }
        self.out.push(s);
        if !pre && end_par {
            self.out.push(String::new());
        }
        self.last_pre = pre;
        self.in_par = false;
        self.last_space = 0;
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ParState {
    Out,
    Norm,
    Pre,
}

/// Joins folded lines back into paragraph-per-line text: normal lines of
/// a paragraph are joined with single spaces, preformatted blocks keep
/// their internal newlines, and paragraphs are separated by one blank
/// line. The output ends with a newline unless it is empty.
pub fn unfold(lines: &[String]) -> String {
    use ParState::*;

    let mut pars: Vec<String> = Vec::new();
    let mut par = String::new();
    let mut st = Out;

    fn flush(pars: &mut Vec<String>, par: &mut String) {
        if !par.is_empty() {
            pars.push(mem::take(par));
        }
    }

    for line in lines {
        let next = if line.is_empty() {
            Out
        } else if preformatted(line) {
            Pre
        } else {
            Norm
        };

        match (st, next) {
            (Norm, Norm) => {
                par.push(' ');
                par.push_str(line);
            }
            (Pre, Pre) => {
                par.push('\n');
                par.push_str(line);
            }
            (Norm, Pre) | (Pre, Norm) => {
                flush(&mut pars, &mut par);
                par.push_str(line);
            }
            (Out, Norm) | (Out, Pre) => par.push_str(line),
            (Norm, Out) | (Pre, Out) => flush(&mut pars, &mut par),
            (Out, Out) => {}
        }
        st = next;
    }
    flush(&mut pars, &mut par);

    let mut buf = String::new();
    for (i, p) in pars.iter().enumerate() {
        buf.push_str(p);
        buf.push('\n');
        if i + 1 < pars.len() {
            buf.push('\n');
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(ls: &[&str]) -> Vec<String> {
        ls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fold_wraps_and_separates_paragraphs() {
        let cases: &[(&str, &str, &[&str])] = &[
            ("empty", "", &[]),
            ("single word", "hello", &["hello"]),
            (
                "splitting a long line",
                "the quick brown fox jumped over the lazy dog",
                &["the quick", "brown fox", "jumped", "over the", "lazy dog"],
            ),
            (
                "handling newlines",
                "the fox.\nthe quick.",
                &["the fox.", "", "the quick."],
            ),
            (
                "preformatted blocks followed by paragraphs",
                " * foo\n * bar\nla rutrum",
                &[" * foo", " * bar", "", "la rutrum"],
            ),
            (
                "preformatted blocks followed by long paragraphs",
                " * foo\n * bar\nla rutrum more text more",
                &[" * foo", " * bar", "", "la rutrum", "more text", "more"],
            ),
            (
                "leading and duplicate newlines are ignored",
                "\n\nthe fox.\n\n\n\nthe quick.",
                &["the fox.", "", "the quick."],
            ),
            (
                "embedded spaces are preserved",
                "  hello\n  world\n",
                &["  hello", "  world"],
            ),
            ("line exactly at the limit", "0123456789\n", &["0123456789"]),
            (
                "paragraph break at the limit",
                "012345678\n01234",
                &["012345678", "", "01234"],
            ),
        ];
        for (desc, input, want) in cases {
            assert_eq!(fold(input, 10), lines(want), "{desc}");
        }
    }

    #[test]
    fn fold_hard_splits_unbreakable_tokens() {
        assert_eq!(
            fold("antidisestablishmentarianism is long", 10),
            lines(&["antidisesta", "blishmentar", "ianism is", "long"]),
        );
    }

    #[test]
    fn unfold_joins_paragraphs() {
        let cases: &[(&str, &[&str], &str)] = &[
            ("empty", &[], ""),
            ("single line", &["hello"], "hello\n"),
            (
                "paragraphs",
                &["Hello", "world.", "", "The end."],
                "Hello world.\n\nThe end.\n",
            ),
            (
                "preformatted blocks",
                &["A few notes:", "  Hello", "  Things.", "", "The end."],
                "A few notes:\n\n  Hello\n  Things.\n\nThe end.\n",
            ),
        ];
        for (desc, input, want) in cases {
            assert_eq!(unfold(&lines(input)), *want, "{desc}");
        }
    }

    #[test]
    fn round_trip_preserves_structure() {
        let text = "A few notes:\n\n  Hello\n  Things.\n\nThe end.\n";
        let folded = fold(text, 20);
        assert_eq!(unfold(&folded), text);
    }

    #[test]
    fn folded_lines_respect_the_limit() {
        let text = "one two three four five six seven eight nine ten";
        for line in fold(text, 12) {
            assert!(line.len() <= 12, "{line:?} exceeds limit");
        }
    }
}
