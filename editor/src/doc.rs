//! The in-memory document: a folded line buffer plus cursor, viewport and
//! edit operations. Rendering lives in [`crate::screen`]; nothing here
//! touches the terminal, which keeps every operation testable.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use quill_engine::wordwrap;
use quill_engine::Match;

use crate::config::EditorConfig;

pub struct Doc {
    pub path: PathBuf,
    /// Folded lines; a blank string separates paragraphs.
    pub lines: Vec<String>,
    /// Cursor position within `lines`.
    pub cx: usize,
    pub cy: usize,
    /// Top-left corner of the viewport.
    pub view_x: usize,
    pub view_y: usize,
    pub width: usize,
    pub height: usize,
    pub dirty: bool,
    /// Whether completion is active.
    pub auto: bool,
    /// Current completion candidates, best first.
    pub matches: Vec<Match>,
    panel_rows: usize,
}

impl Doc {
    pub fn open(
        path: impl Into<PathBuf>,
        width: usize,
        height: usize,
        config: &EditorConfig,
    ) -> Result<Doc> {
        let path = path.into();
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::with_text(path, &data, width, height, config))
    }

    fn with_text(
        path: PathBuf,
        text: &str,
        width: usize,
        height: usize,
        config: &EditorConfig,
    ) -> Doc {
        let mut doc = Doc {
            path,
            lines: Vec::new(),
            cx: 0,
            cy: 0,
            view_x: 0,
            view_y: 0,
            width,
            height,
            dirty: false,
            auto: config.predict.enable,
            matches: Vec::new(),
            panel_rows: config.predict.rows,
        };
        doc.lines = wordwrap::fold(text, doc.text_width());
        if doc.lines.is_empty() {
            doc.lines.push(String::new());
        }
        doc
    }

    /// Writes the unfolded text to `<path>.tmp`, then renames it over the
    /// original so a crash never leaves a half-written file.
    pub fn save(&mut self) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, wordwrap::unfold(&self.lines))
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        self.dirty = false;
        Ok(())
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    // Screen geometry. The last row is the status bar; the candidate
    // panel sits directly above it when completion is active.

    pub fn text_width(&self) -> usize {
        self.width.saturating_sub(1)
    }

    pub fn text_height(&self) -> usize {
        self.height.saturating_sub(1 + self.panel_height())
    }

    pub fn panel_height(&self) -> usize {
        if self.auto {
            self.panel_rows
        } else {
            0
        }
    }

    pub fn panel_row(&self) -> usize {
        self.height.saturating_sub(1 + self.panel_rows)
    }

    pub fn status_row(&self) -> usize {
        self.height.saturating_sub(1)
    }

    /// The text left of the cursor on the current line, which is what the
    /// predictor sees.
    pub fn cursor_prefix(&self) -> &str {
        &self.lines[self.cy][..self.cx]
    }

    pub fn status_line(&self) -> String {
        let mut s = format!("{:5}:{:3} ", self.cy + 1, self.cx + 1);
        s.push_str(" | [Ctl-S]ave [Ctl-D]one [Ctl-A]uto [Ctl-O]ff | ");
        if self.dirty {
            s.push('*');
        }
        if let Some(name) = self.path.file_name() {
            s.push_str(&name.to_string_lossy());
        }
        s
    }

    /// Moves the cursor, skipping over blank separator lines and bouncing
    /// off the buffer edges.
    pub fn move_by(&mut self, dy: i64, dx: i64) {
        let mut y = self.cy as i64;
        let mut x = self.cx as i64;
        let mut bounce = false;
        for _ in 0..10 {
            y += dy;
            x += dx;
            if y < 0 {
                y = 0;
                bounce = true;
            }
            let count = self.lines.len() as i64;
            if y >= count {
                y = count - 1;
                if y < 0 {
                    y = 0;
                    bounce = true;
                }
            }
            if x < 0 {
                x = 0;
            }
            let line_len = self.lines[y as usize].len() as i64;
            if x > line_len {
                x = line_len;
            }
            if bounce || !self.lines[y as usize].is_empty() {
                break;
            }
        }
        self.cy = y as usize;
        self.cx = x as usize;
        self.trim_view();
    }

    /// Keeps the cursor inside the viewport.
    pub fn trim_view(&mut self) {
        let th = self.text_height();
        if self.cy >= self.view_y + th {
            self.view_y = self.cy + 1 - th;
        }
        if self.cy < self.view_y {
            self.view_y = self.cy;
        }
        let tw = self.text_width();
        if self.cx > self.view_x + tw {
            self.view_x = self.cx + 1 - tw;
        }
        if self.cx < self.view_x {
            self.view_x = self.cx;
        }
        if self.lines[self.cy].len() < tw {
            self.view_x = 0;
        }
    }

    /// Inserts a printable byte at the cursor. In auto mode, Tab, `;` and
    /// the digit keys accept candidates instead, and sentence punctuation
    /// swallows the spaces typed before it.
    pub fn edit(&mut self, b: u8) {
        self.dirty = true;
        match b {
            b'\t' | b';' if self.auto => self.accept_match(0),
            b'1'..=b'7' if self.auto => self.accept_match((b - b'0') as usize),
            b',' | b'?' | b'.' if self.auto => {
                let before = &self.lines[self.cy][..self.cx];
                let kept = before.trim_end_matches(' ').len();
                if kept < self.cx {
                    self.lines[self.cy].replace_range(kept..self.cx, "");
                    self.cx = kept;
                }
                self.insert_byte(b);
            }
            _ => self.insert_byte(b),
        }
        self.reflow();
    }

    fn insert_byte(&mut self, b: u8) {
        self.lines[self.cy].insert(self.cx, b as char);
        self.cx += 1;
    }

    /// Inserts candidate `i` plus a trailing space at the cursor.
    pub fn accept_match(&mut self, i: usize) {
        if i >= self.matches.len() {
            return;
        }
        let word = format!("{} ", self.matches[i].text);
        self.lines[self.cy].insert_str(self.cx, &word);
        self.cx += word.len();
    }

    /// Splits the current line at the cursor, twice for normal text so a
    /// blank separator opens a new paragraph, once inside preformatted
    /// blocks.
    pub fn enter(&mut self) {
        self.dirty = true;
        let count = if self.lines[self.cy].starts_with(' ') {
            1
        } else {
            2
        };
        for _ in 0..count {
            let here = self.lines[self.cy].clone();
            let (before, after) = here.split_at(self.cx);
            self.lines[self.cy] = before.to_string();
            self.lines.insert(self.cy + 1, after.to_string());
            self.cy += 1;
            self.cx = 0;
        }
        self.delete_reflow();
    }

    /// Deletes the byte under the cursor; at end of line, joins the next
    /// line up.
    pub fn delete(&mut self) {
        self.dirty = true;
        let here = self.lines[self.cy].clone();
        if self.cx == here.len() {
            if self.cy == self.lines.len() - 1 {
                return;
            }
            let next = self.lines.remove(self.cy + 1);
            self.lines[self.cy] = here + &next;
            return;
        }
        self.lines[self.cy].remove(self.cx);
        self.delete_reflow();
    }

    pub fn backspace(&mut self) {
        self.backspace_once();
        self.delete_reflow();
    }

    /// Deletes back to the previous word boundary.
    pub fn word_backspace(&mut self) {
        loop {
            self.backspace_once();
            if self.cx == 0 || self.char_under() == b' ' {
                break;
            }
        }
        self.delete_reflow();
    }

    fn backspace_once(&mut self) {
        self.dirty = true;
        if self.cx == 0 && self.cy == 0 {
            return;
        }
        if self.cx == 0 {
            let moved = self.lines.remove(self.cy);
            self.cy -= 1;
            let prev_len = self.lines[self.cy].len();
            self.lines[self.cy].push_str(&moved);
            self.cx = prev_len;
        } else {
            self.lines[self.cy].remove(self.cx - 1);
            self.cx -= 1;
        }
    }

    fn char_under(&self) -> u8 {
        if self.cy >= self.lines.len() {
            return 0;
        }
        let line = self.lines[self.cy].as_bytes();
        let mut x = self.cx as i64;
        if x >= line.len() as i64 {
            x = line.len() as i64 - 1;
        }
        if x <= 0 {
            return 0;
        }
        line[x as usize]
    }

    /// Joins the next line into the current one, then reflows. Blank
    /// separators stop the join so paragraphs keep their shape.
    fn delete_reflow(&mut self) {
        if self.cy + 1 >= self.lines.len() {
            return;
        }
        if self.lines[self.cy + 1].is_empty() {
            return;
        }
        let next = self.lines.remove(self.cy + 1);
        let joined = format!("{} {next}", self.lines[self.cy]);
        self.lines[self.cy] = joined;
        self.reflow();
    }

    /// Rewraps from the cursor line down, carrying overflow forward until
    /// every touched line fits, then repositions the cursor on the text
    /// it was attached to.
    fn reflow(&mut self) {
        let tw = self.text_width();
        let mut carry = String::new();
        let mut y = self.cy;
        loop {
            if y >= self.lines.len() {
                if !carry.is_empty() {
                    self.lines.push(std::mem::take(&mut carry));
                }
                break;
            }
            if !carry.is_empty() {
                // Keep an existing paragraph separator by pushing it down.
                if self.lines[y].is_empty() {
                    self.lines.insert(y, String::new());
                }
                let joined = format!("{carry} {}", self.lines[y]);
                self.lines[y] = joined.strip_suffix(' ').unwrap_or(&joined).to_string();
                carry.clear();
            }
            if self.lines[y].len() < tw {
                break;
            }
            match self.lines[y][..tw].rfind(' ') {
                Some(x) => {
                    carry = self.lines[y][x + 1..].to_string();
                    self.lines[y].truncate(x);
                    y += 1;
                }
                None => break,
            }
        }

        let diff = self.cx as i64 - self.lines[self.cy].len() as i64;
        if diff > 0 {
            self.cy += 1;
            self.cx = (diff - 1) as usize;
        }
        if self.cy >= self.lines.len() {
            self.lines.push(String::new());
        }
        let len = self.lines[self.cy].len();
        if self.cx > len {
            self.cx = len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str, width: usize) -> Doc {
        Doc::with_text(
            PathBuf::from("/tmp/test.txt"),
            text,
            width,
            24,
            &EditorConfig::default(),
        )
    }

    fn type_str(d: &mut Doc, s: &str) {
        for b in s.bytes() {
            d.edit(b);
        }
    }

    #[test]
    fn typing_wraps_at_the_text_width() {
        let mut d = doc("", 11);
        type_str(&mut d, "the quick brown");
        assert_eq!(d.lines, vec!["the quick", "brown"]);
        assert_eq!((d.cy, d.cx), (1, 5));
        assert!(d.dirty);
    }

    #[test]
    fn punctuation_swallows_preceding_spaces() {
        let mut d = doc("", 40);
        type_str(&mut d, "hello  ");
        d.edit(b'.');
        assert_eq!(d.lines, vec!["hello."]);
        assert_eq!(d.cx, 6);
    }

    #[test]
    fn punctuation_inserts_plainly_without_auto() {
        let mut d = doc("", 40);
        d.auto = false;
        type_str(&mut d, "hello ");
        d.edit(b'.');
        assert_eq!(d.lines, vec!["hello ."]);
    }

    #[test]
    fn enter_opens_a_paragraph() {
        let mut d = doc("hello", 40);
        d.cx = 5;
        d.enter();
        assert_eq!(d.lines, vec!["hello", "", ""]);
        assert_eq!((d.cy, d.cx), (2, 0));
    }

    #[test]
    fn enter_in_preformatted_splits_once() {
        let mut d = doc("  item one", 40);
        d.cx = 6;
        d.enter();
        assert_eq!(d.lines, vec!["  item", " one"]);
        assert_eq!((d.cy, d.cx), (1, 0));
    }

    #[test]
    fn backspace_joins_lines() {
        let mut d = doc("hello\n\nworld", 40);
        // Folded: ["hello", "", "world"]; join "world" up through the
        // separator.
        d.cy = 2;
        d.cx = 0;
        d.backspace();
        assert_eq!(d.lines, vec!["hello", "world"]);
        d.backspace();
        assert_eq!(d.lines, vec!["helloworld"]);
        assert_eq!((d.cy, d.cx), (0, 5));
    }

    #[test]
    fn word_backspace_stops_at_a_space() {
        let mut d = doc("foo bar", 40);
        d.cx = 7;
        d.word_backspace();
        assert_eq!(d.lines, vec!["foo "]);
        assert_eq!(d.cx, 4);
    }

    #[test]
    fn delete_at_end_of_line_joins_the_next() {
        let mut d = doc("ab\n\ncd", 40);
        d.lines = vec!["ab".into(), "cd".into()];
        d.cx = 2;
        d.delete();
        assert_eq!(d.lines, vec!["abcd"]);
    }

    #[test]
    fn delete_mid_line_removes_one_byte() {
        let mut d = doc("abc", 40);
        d.cx = 1;
        d.delete();
        assert_eq!(d.lines, vec!["ac"]);
    }

    #[test]
    fn cursor_skips_blank_separators() {
        let mut d = doc("one\n\ntwo", 40);
        assert_eq!(d.lines, vec!["one", "", "two"]);
        d.move_by(1, 0);
        assert_eq!(d.cy, 2);
        d.move_by(-1, 0);
        assert_eq!(d.cy, 0);
    }

    #[test]
    fn cursor_bounces_off_the_edges() {
        let mut d = doc("one", 40);
        d.move_by(-1, 0);
        assert_eq!((d.cy, d.cx), (0, 0));
        d.move_by(0, 900);
        assert_eq!(d.cx, 3);
        d.move_by(0, -900);
        assert_eq!(d.cx, 0);
    }

    #[test]
    fn accept_match_inserts_the_candidate_and_a_space() {
        let mut d = doc("", 40);
        type_str(&mut d, "he");
        d.matches = vec![Match {
            text: "llo".into(),
            freq: 10,
            len: 1,
        }];
        d.edit(b'\t');
        assert_eq!(d.lines, vec!["hello "]);
        assert_eq!(d.cx, 6);
    }

    #[test]
    fn accept_match_out_of_range_is_ignored() {
        let mut d = doc("", 40);
        type_str(&mut d, "he");
        d.edit(b'3');
        assert_eq!(d.lines, vec!["he"]);
    }

    #[test]
    fn save_round_trips_through_the_codec() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("draft.txt");
        std::fs::write(&path, "Hello world.\n\nThe end.\n").unwrap();

        let config = EditorConfig::default();
        let mut d = Doc::open(&path, 40, 24, &config).unwrap();
        assert_eq!(d.lines, vec!["Hello world.", "", "The end."]);

        d.cy = 0;
        d.cx = 12;
        type_str(&mut d, " again");
        d.save().unwrap();
        assert!(!d.dirty);

        let reloaded = std::fs::read_to_string(&path).unwrap();
        assert_eq!(reloaded, "Hello world. again\n\nThe end.\n");
    }

    #[test]
    fn viewport_follows_the_cursor() {
        let mut d = doc("", 11);
        type_str(&mut d, "aaa bbb ccc ddd eee");
        assert!(d.cy >= 1);
        d.height = 2; // one text row plus the status bar
        d.auto = false;
        d.trim_view();
        assert_eq!(d.view_y, d.cy);
    }

    #[test]
    fn status_line_marks_dirty_buffers() {
        let mut d = doc("hi", 40);
        assert!(!d.status_line().contains('*'));
        d.edit(b'!');
        assert!(d.status_line().contains("*test.txt"));
    }
}
