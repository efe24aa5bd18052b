//! Terminal output: raw mode lifecycle and damage-tracked row drawing.
//!
//! Rows are cached by content so a redraw only touches lines that
//! actually changed, which keeps per-keystroke output small on slow
//! terminals.

use std::collections::HashMap;
use std::io::{self, Stdout, Write};

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};

use crate::doc::Doc;

/// Keys that accept the corresponding candidate row.
const SHORTCUTS: &str = ";123456789";

pub struct Screen {
    out: Stdout,
    last: HashMap<usize, String>,
}

impl Screen {
    /// Enters raw mode and clears the screen. Dropping the screen
    /// restores the terminal.
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(Self {
            out,
            last: HashMap::new(),
        })
    }

    /// Forgets what is on screen, forcing the next render to repaint.
    pub fn invalidate(&mut self) {
        self.last.clear();
    }

    /// Draws the text rows and the status bar, then parks the cursor.
    pub fn render(&mut self, doc: &Doc) -> Result<()> {
        for y in 0..doc.text_height() {
            let row = self.visible_line(doc, y);
            self.draw_row(y, &row)?;
        }
        self.draw_status(doc, &doc.status_line())?;
        self.park_cursor(doc)
    }

    /// The portion of buffer line `view_y + y` that fits the viewport,
    /// with `<` and `>` marking text scrolled off either edge.
    fn visible_line(&self, doc: &Doc, y: usize) -> String {
        let p = doc.view_y + y;
        if p >= doc.lines.len() {
            return String::new();
        }
        let mut l = doc.lines[p].clone();
        if p == doc.cy {
            l = l[doc.view_x.min(l.len())..].to_string();
            if doc.view_x > 0 && !l.is_empty() {
                l.replace_range(..1, "<");
            }
        }
        let tw = doc.text_width();
        if l.len() > tw {
            l.truncate(tw);
            l.push('>');
        }
        l
    }

    /// Draws the candidate panel: each row shows its shortcut key and the
    /// word as it would read once completed.
    pub fn draw_panel(&mut self, doc: &Doc) -> Result<()> {
        let line = doc.cursor_prefix();
        let last_word = line.rsplit(' ').next().unwrap_or("");
        for i in 0..doc.panel_height() {
            let row = match doc.matches.get(i) {
                Some(m) => {
                    let key = SHORTCUTS.chars().nth(i).unwrap_or(' ');
                    format!("{key} {last_word}{}", m.text)
                }
                None => String::new(),
            };
            self.draw_row(doc.panel_row() + i, &row)?;
        }
        self.park_cursor(doc)
    }

    pub fn hide_panel(&mut self, doc: &Doc) -> Result<()> {
        for i in 0..doc.panel_height() {
            self.draw_row(doc.panel_row() + i, "")?;
        }
        self.park_cursor(doc)
    }

    /// Writes a reverse-video message across the status row.
    pub fn status(&mut self, doc: &Doc, msg: &str) -> Result<()> {
        self.draw_status(doc, msg)?;
        self.park_cursor(doc)
    }

    fn draw_status(&mut self, doc: &Doc, msg: &str) -> Result<()> {
        let row = doc.status_row() as u16;
        let msg = &msg[..msg.len().min(doc.text_width())];
        queue!(
            self.out,
            MoveTo(0, row),
            SetForegroundColor(Color::White),
            SetBackgroundColor(Color::DarkGrey),
            Print(" ".repeat(doc.width)),
            MoveTo(0, row),
            Print(msg),
            ResetColor,
        )?;
        Ok(())
    }

    fn draw_row(&mut self, y: usize, text: &str) -> Result<()> {
        if self.last.get(&y).is_some_and(|prev| prev == text) {
            return Ok(());
        }
        self.last.insert(y, text.to_string());
        queue!(
            self.out,
            MoveTo(0, y as u16),
            Clear(ClearType::CurrentLine),
            Print(text),
        )?;
        Ok(())
    }

    fn park_cursor(&mut self, doc: &Doc) -> Result<()> {
        let col = doc.cx.saturating_sub(doc.view_x) as u16;
        let row = doc.cy.saturating_sub(doc.view_y) as u16;
        queue!(self.out, MoveTo(col, row))?;
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, Clear(ClearType::All), MoveTo(0, 0));
        let _ = terminal::disable_raw_mode();
    }
}
