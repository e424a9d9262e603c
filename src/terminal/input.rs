//! Keyboard input: the command line at the bottom of the screen and the
//! translation of crossterm key presses into app-level [`KeyEvent`]s.

use crossterm::event::{KeyCode, KeyEvent as TermKeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::app::{Key, KeyEvent};
use crate::chat::{Language, QUICK_QUESTIONS};

impl From<&TermKeyEvent> for KeyEvent {
    fn from(event: &TermKeyEvent) -> Self {
        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Esc => Key::Escape,
            KeyCode::Enter => Key::Enter,
            _ => Key::Other,
        };
        Self {
            key,
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            // Terminals only report Cmd with the kitty keyboard protocol
            meta: event.modifiers.contains(KeyModifiers::SUPER),
        }
    }
}

/// What a key press did to the input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Enter pressed; the line was taken
    Submit(String),
    Edited,
    /// Escape on the input line
    Cancelled,
    Ignored,
}

/// Single-line text input
#[derive(Debug, Clone, Default)]
pub struct InputLine {
    text: String,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Apply a key press. Control and alt chords are left to the caller.
    pub fn handle_key(&mut self, event: &TermKeyEvent) -> InputAction {
        if event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return InputAction::Ignored;
        }

        match event.code {
            KeyCode::Enter => InputAction::Submit(std::mem::take(&mut self.text)),
            KeyCode::Esc => {
                self.text.clear();
                InputAction::Cancelled
            }
            KeyCode::Backspace => {
                if self.text.pop().is_some() {
                    InputAction::Edited
                } else {
                    InputAction::Ignored
                }
            }
            KeyCode::Char(c) => {
                self.text.push(c);
                InputAction::Edited
            }
            _ => InputAction::Ignored,
        }
    }
}

/// A submitted input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    Quit,
    Help,
    Retry,
    Refresh,
    /// `None` shows every state
    Filter(Option<String>),
    Ask(String),
    /// Zero-based quick question index
    Quick(usize),
    Language(Language),
    ToggleChat,
    CloseChat,
    ClearChat,
    Export(PathBuf),
    /// Unusable input, with the message to show
    Invalid(String),
}

impl Command {
    /// Parse a submitted line.
    ///
    /// With the chat panel open, plain text is a question and commands
    /// need a leading `/`. A leading `/` is accepted everywhere.
    pub fn parse(line: &str, chat_open: bool) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }

        match line.strip_prefix('/') {
            Some(command) => Self::parse_command(command.trim()),
            None if chat_open => Command::Ask(line.to_string()),
            None => Self::parse_command(line),
        }
    }

    fn parse_command(line: &str) -> Self {
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match name {
            "" => Command::Empty,
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            "retry" => Command::Retry,
            "refresh" => Command::Refresh,
            "filter" => Command::Filter((!arg.is_empty()).then(|| arg.to_string())),
            "ask" if arg.is_empty() => Command::Invalid("Usage: ask <question>".to_string()),
            "ask" => Command::Ask(arg.to_string()),
            "quick" => match arg.parse::<usize>() {
                Ok(n) if (1..=QUICK_QUESTIONS.len()).contains(&n) => Command::Quick(n - 1),
                _ => Command::Invalid(format!("Usage: quick <1-{}>", QUICK_QUESTIONS.len())),
            },
            "lang" => match arg.parse::<Language>() {
                Ok(language) => Command::Language(language),
                Err(e) => Command::Invalid(e.to_string()),
            },
            "chat" => Command::ToggleChat,
            "close" => Command::CloseChat,
            "clear" => Command::ClearChat,
            "export" if arg.is_empty() => Command::Invalid("Usage: export <path>".to_string()),
            "export" => Command::Export(PathBuf::from(arg)),
            other => Command::Invalid(format!("Unknown command '{}'. Type 'help'.", other)),
        }
    }
}
