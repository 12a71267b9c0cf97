//! Line input with history navigation

use colored::*;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, IsTerminal, Write};

use docqa_core::Result;

/// What a key press did to the line being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Submit,
    Cancel,
    Eof,
}

/// Editable line with a cursor and a position in the history
#[derive(Debug, Default)]
pub struct LineState {
    buffer: Vec<char>,
    cursor: usize,
    history_index: Option<usize>,
}

impl LineState {
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn replace(&mut self, text: &str) {
        self.buffer = text.chars().collect();
        self.cursor = self.buffer.len();
    }

    /// Apply one key press
    pub fn apply(&mut self, key: KeyEvent, history: &[String]) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return KeyOutcome::Eof,
            KeyCode::Enter => return KeyOutcome::Submit,
            KeyCode::Esc => return KeyOutcome::Cancel,
            KeyCode::Char(c) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.buffer.remove(self.cursor);
            }
            KeyCode::Delete if self.cursor < self.buffer.len() => {
                self.buffer.remove(self.cursor);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::Up if !history.is_empty() => {
                let index = match self.history_index {
                    None => history.len() - 1,
                    Some(i) => i.saturating_sub(1),
                };
                self.history_index = Some(index);
                self.replace(&history[index]);
            }
            KeyCode::Down => match self.history_index {
                Some(i) if i + 1 < history.len() => {
                    self.history_index = Some(i + 1);
                    self.replace(&history[i + 1]);
                }
                Some(_) => {
                    self.history_index = None;
                    self.replace("");
                }
                None => {}
            },
            _ => {}
        }
        KeyOutcome::Continue
    }
}

/// Prompted line reader that remembers submitted lines
pub struct LineEditor {
    prompt: String,
    history: Vec<String>,
}

impl LineEditor {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Read one line; `None` once input is exhausted
    ///
    /// Piped input is read line by line without echo or history keys.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        if !io::stdin().is_terminal() {
            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                return Ok(None);
            }
            return Ok(Some(self.remember(input.trim())));
        }

        let _raw = RawMode::enable()?;
        let mut state = LineState::default();
        self.redraw(&state)?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.apply(key, &self.history) {
                KeyOutcome::Continue => self.redraw(&state)?,
                KeyOutcome::Submit => {
                    print!("\r\n");
                    return Ok(Some(self.remember(&state.text())));
                }
                KeyOutcome::Cancel => {
                    print!("\r\n");
                    return Ok(Some(String::new()));
                }
                KeyOutcome::Eof => {
                    print!("\r\n");
                    return Ok(None);
                }
            }
        }
    }

    fn remember(&mut self, line: &str) -> String {
        let line = line.trim().to_string();
        if !line.is_empty() && self.history.last() != Some(&line) {
            self.history.push(line.clone());
        }
        line
    }

    fn redraw(&self, state: &LineState) -> Result<()> {
        let text = state.text();
        let back = state.buffer.len() - state.cursor;
        let mut stdout = io::stdout();
        // clear the line, reprint, then step back to the cursor
        write!(stdout, "\r\x1b[2K{} {}", self.prompt.green().bold(), text)?;
        if back > 0 {
            write!(stdout, "\x1b[{}D", back)?;
        }
        stdout.flush()?;
        Ok(())
    }
}

/// Leaves raw mode when dropped, including on error paths
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut LineState, text: &str) {
        for c in text.chars() {
            state.apply(key(KeyCode::Char(c)), &[]);
        }
    }

    #[test]
    fn test_editing_multibyte_text() {
        let mut state = LineState::default();
        type_text(&mut state, "héllo");
        state.apply(key(KeyCode::Left), &[]);
        state.apply(key(KeyCode::Backspace), &[]);
        assert_eq!(state.text(), "hélo");
        assert_eq!(state.cursor(), 3);

        state.apply(key(KeyCode::Home), &[]);
        state.apply(key(KeyCode::Delete), &[]);
        assert_eq!(state.text(), "élo");
        assert_eq!(state.apply(key(KeyCode::Enter), &[]), KeyOutcome::Submit);
    }

    #[test]
    fn test_history_navigation() {
        let history = vec!["first".to_string(), "second".to_string()];
        let mut state = LineState::default();

        state.apply(key(KeyCode::Up), &history);
        assert_eq!(state.text(), "second");
        state.apply(key(KeyCode::Up), &history);
        state.apply(key(KeyCode::Up), &history);
        assert_eq!(state.text(), "first");

        state.apply(key(KeyCode::Down), &history);
        assert_eq!(state.text(), "second");
        state.apply(key(KeyCode::Down), &history);
        assert_eq!(state.text(), "");
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn test_control_keys() {
        let mut state = LineState::default();
        assert_eq!(state.apply(key(KeyCode::Esc), &[]), KeyOutcome::Cancel);
        assert_eq!(
            state.apply(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &[]),
            KeyOutcome::Eof
        );
        assert_eq!(state.text(), "");
    }

    #[test]
    fn test_remember_skips_blank_and_repeated_lines() {
        let mut editor = LineEditor::new("docqa>");
        editor.remember("  what is covered?  ");
        editor.remember("what is covered?");
        editor.remember("   ");
        assert_eq!(editor.history(), ["what is covered?".to_string()]);
    }
}
