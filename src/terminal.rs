//! Terminal input/output used by the session and the shell.

use crate::error::{Result, VaultError};
use crate::utils;
use dialoguer::Password;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::VecDeque;
use std::io::{self, Write};
use zeroize::Zeroizing;

/// One read from the line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// End of input.
    Eof,
}

/// Everything the core needs from the user's terminal.
pub trait Terminal {
    /// Read one line of input after showing `prompt`.
    fn read_line(&mut self, prompt: &str) -> Result<Input>;

    /// Read a secret without echoing it.
    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Record a command line in the editor history.
    fn remember(&mut self, _line: &str) {}

    fn clear_screen(&mut self) -> Result<()>;

    /// Sink for regular output.
    fn out(&mut self) -> &mut dyn Write;
}

/// Interactive terminal backed by rustyline and dialoguer.
pub struct Console {
    editor: DefaultEditor,
    stdout: io::Stdout,
}

impl Console {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| VaultError::Terminal(format!("failed to create editor: {e}")))?;
        Ok(Self {
            editor,
            stdout: io::stdout(),
        })
    }
}

impl Terminal for Console {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        self.stdout.flush()?;
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Input::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(ReadlineError::Io(e)) => Err(VaultError::Io(e)),
            Err(e) => Err(VaultError::Terminal(e.to_string())),
        }
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        self.stdout.flush()?;
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| VaultError::Terminal(e.to_string()))
    }

    fn remember(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    fn clear_screen(&mut self) -> Result<()> {
        utils::clear_screen(&mut self.stdout)?;
        Ok(())
    }

    fn out(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }
}

/// Terminal fed from queued input, capturing everything written to it.
///
/// Drives the shell without a TTY.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    lines: VecDeque<String>,
    secrets: VecDeque<String>,
    output: Vec<u8>,
    history: Vec<String>,
    clears: usize,
}

impl ScriptedTerminal {
    pub fn new<L, S>(lines: L, secrets: S) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            secrets: secrets.into_iter().map(Into::into).collect(),
            output: Vec::new(),
            history: Vec::new(),
            clears: 0,
        }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
    }

    pub fn push_secret(&mut self, secret: impl Into<String>) {
        self.secrets.push_back(secret.into());
    }

    /// Everything written so far.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Drain captured output.
    pub fn take_output(&mut self) -> String {
        let text = self.output();
        self.output.clear();
        text
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    /// Lines handed to `remember`, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Terminal for ScriptedTerminal {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        self.output.extend_from_slice(prompt.as_bytes());
        Ok(match self.lines.pop_front() {
            Some(line) => {
                self.output.extend_from_slice(line.as_bytes());
                self.output.push(b'\n');
                Input::Line(line)
            }
            None => Input::Eof,
        })
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        self.secrets
            .pop_front()
            .map(Zeroizing::new)
            .ok_or_else(|| VaultError::Terminal(format!("no input for prompt '{prompt}'")))
    }

    fn remember(&mut self, line: &str) {
        self.history.push(line.to_string());
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.clears += 1;
        Ok(())
    }

    fn out(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_terminal_replays_input() {
        let mut term = ScriptedTerminal::new(["first", "second"], ["secret"]);

        assert_eq!(term.read_line("> ").unwrap(), Input::Line("first".to_string()));
        assert_eq!(term.read_line("> ").unwrap(), Input::Line("second".to_string()));
        assert_eq!(term.read_line("> ").unwrap(), Input::Eof);

        assert_eq!(term.read_secret("Passphrase").unwrap().as_str(), "secret");
        assert!(term.read_secret("Passphrase").is_err());
    }

    #[test]
    fn test_scripted_terminal_captures_output() {
        let mut term = ScriptedTerminal::default();
        writeln!(term.out(), "0:alpha").unwrap();
        term.clear_screen().unwrap();

        assert_eq!(term.take_output(), "0:alpha\n");
        assert!(term.output().is_empty());
        assert_eq!(term.clears(), 1);
    }
}
