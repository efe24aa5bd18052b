mod config;
mod doc;
mod screen;
mod suggest;

use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::EditorConfig;
use doc::Doc;
use screen::Screen;
use suggest::Suggestions;

#[derive(Debug, Parser)]
#[command(name = "quill", about = "A prose editor with offline word completion")]
struct Args {
    /// The file to edit. It must already exist.
    file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let config = EditorConfig::load()?;
    info!(
        resources = %config.resources.dir.display(),
        predict = config.predict.enable,
        "loaded quill config"
    );

    let suggest = Suggestions::new(&config.resources.dir)?;
    let (width, height) = terminal::size()?;
    let mut doc = Doc::open(&args.file, width as usize, height as usize, &config)?;

    let mut screen = Screen::new()?;
    let result = run(&mut doc, &mut screen, &suggest);
    // Leave raw mode before any error gets printed.
    drop(screen);
    result
}

/// Logs go to the file named by QUILL_LOG; writing to the terminal would
/// scribble over the editor.
fn init_logging() -> Result<()> {
    let Ok(path) = env::var("QUILL_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Exit,
}

fn run(doc: &mut Doc, screen: &mut Screen, suggest: &Suggestions) -> Result<()> {
    redraw(doc, screen)?;
    show_predictions(doc, screen, suggest)?;

    loop {
        match event::read()? {
            Event::Resize(width, height) => {
                doc.resize(width as usize, height as usize);
                screen.invalidate();
                redraw(doc, screen)?;
                screen.hide_panel(doc)?;
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(key, doc, screen, suggest)? == Flow::Exit {
                    break;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn redraw(doc: &mut Doc, screen: &mut Screen) -> Result<()> {
    doc.trim_view();
    screen.render(doc)
}

fn handle_key(
    key: KeyEvent,
    doc: &mut Doc,
    screen: &mut Screen,
    suggest: &Suggestions,
) -> Result<Flow> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('a') if ctrl => {
            doc.auto = true;
            screen.invalidate();
            redraw(doc, screen)?;
            show_predictions(doc, screen, suggest)?;
        }
        KeyCode::Char('o') if ctrl => {
            doc.auto = false;
            screen.invalidate();
            redraw(doc, screen)?;
            show_predictions(doc, screen, suggest)?;
        }
        KeyCode::Char('s') if ctrl => {
            doc.save()?;
            redraw(doc, screen)?;
        }
        KeyCode::Char('d') | KeyCode::Char('c') if ctrl => {
            if confirm_exit(doc, screen)? {
                return Ok(Flow::Exit);
            }
        }
        KeyCode::Up => move_cursor(doc, screen, -1, 0)?,
        KeyCode::Down => move_cursor(doc, screen, 1, 0)?,
        KeyCode::Right => move_cursor(doc, screen, 0, 1)?,
        KeyCode::Left => move_cursor(doc, screen, 0, -1)?,
        KeyCode::Home => move_cursor(doc, screen, 0, -900)?,
        KeyCode::End => move_cursor(doc, screen, 0, 900)?,
        KeyCode::PageUp => move_cursor(doc, screen, -((doc.height * 3 / 2) as i64), 0)?,
        KeyCode::PageDown => move_cursor(doc, screen, (doc.height * 3 / 2) as i64, 0)?,
        KeyCode::Tab => {
            doc.edit(b'\t');
            redraw(doc, screen)?;
            show_predictions(doc, screen, suggest)?;
        }
        KeyCode::Enter => {
            doc.enter();
            redraw(doc, screen)?;
            show_predictions(doc, screen, suggest)?;
        }
        KeyCode::Backspace if ctrl => {
            doc.word_backspace();
            redraw(doc, screen)?;
        }
        KeyCode::Backspace => {
            doc.backspace();
            redraw(doc, screen)?;
            screen.hide_panel(doc)?;
        }
        KeyCode::Delete => {
            doc.delete();
            redraw(doc, screen)?;
        }
        KeyCode::Char(c) if !ctrl && (' '..='~').contains(&c) => {
            doc.edit(c as u8);
            redraw(doc, screen)?;
            show_predictions(doc, screen, suggest)?;
        }
        _ => {}
    }
    Ok(Flow::Continue)
}

fn move_cursor(doc: &mut Doc, screen: &mut Screen, dy: i64, dx: i64) -> Result<()> {
    doc.move_by(dy, dx);
    redraw(doc, screen)?;
    screen.hide_panel(doc)
}

/// Refreshes the candidate panel for the text left of the cursor. A
/// failed lookup is reported on the status line and logged; the editor
/// keeps running without candidates for this keystroke.
fn show_predictions(doc: &mut Doc, screen: &mut Screen, suggest: &Suggestions) -> Result<()> {
    if !doc.auto {
        doc.matches.clear();
        return screen.hide_panel(doc);
    }
    match suggest.fetch(doc.cursor_prefix()) {
        Ok(matches) => doc.matches = matches,
        Err(error) => {
            warn!("prediction failed: {error:#}");
            doc.matches.clear();
            screen.status(doc, &format!("predictions: {error:#}"))?;
        }
    }
    screen.draw_panel(doc)
}

/// On a dirty buffer, asks for confirmation on the status line and waits
/// for the answering keypress.
fn confirm_exit(doc: &mut Doc, screen: &mut Screen) -> Result<bool> {
    if !doc.dirty {
        return Ok(true);
    }
    screen.status(doc, "Changes not saved, exit anyway? (y/N)")?;
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if matches!(key.code, KeyCode::Char('y')) {
                return Ok(true);
            }
            redraw(doc, screen)?;
            return Ok(false);
        }
    }
}
