//! Interactive command shell over an open session.

use crate::error::{Result, VaultError};
use crate::generator::{self, DEFAULT_LENGTH, MAX_LENGTH};
use crate::session::Session;
use crate::terminal::{Input, Terminal};
use crate::utils::{failure, success, warning};
use colored::*;

const PROMPT: &str = "> ";

/// Shell state after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Exiting,
}

/// How a quit alias handles unsaved content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitMode {
    /// `q`: ask whether to save.
    Ask,
    /// `q!`: leave without saving.
    Force,
    /// `wq` / `sq`: save, then leave.
    Save,
}

/// A recognised command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit(QuitMode),
    Read,
    Write,
    DeleteAll,
    Delete,
    Find,
    Generate,
    Clear,
    Save,
    Change,
    Help,
}

/// Alias group as listed by `help`.
pub struct CommandGroup {
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

pub const COMMAND_GROUPS: &[CommandGroup] = &[
    CommandGroup {
        aliases: &["q", "q!", "wq", "sq"],
        description: "quit (q asks to save, q! discards, wq/sq save first)",
    },
    CommandGroup {
        aliases: &["r", "read"],
        description: "read content. e.g. `read 10 12`: read lines 10 and 11",
    },
    CommandGroup {
        aliases: &["w", "write"],
        description: "write new row",
    },
    CommandGroup {
        aliases: &["D", "DELETE"],
        description: "delete all rows",
    },
    CommandGroup {
        aliases: &["d", "delete"],
        description: "delete row. e.g. `d 0` to delete 0th row",
    },
    CommandGroup {
        aliases: &["f", "find"],
        description: "find rows by case-insensitive regexp, e.g. `f a.-?`",
    },
    CommandGroup {
        aliases: &["gen", "generate"],
        description: "generate a password, e.g. `gen 12` for 12 characters",
    },
    CommandGroup {
        aliases: &["c", "clear"],
        description: "clear the screen",
    },
    CommandGroup {
        aliases: &["s", "save"],
        description: "save the current contents",
    },
    CommandGroup {
        aliases: &["change"],
        description: "change the passphrase and save",
    },
    CommandGroup {
        aliases: &["h", "help"],
        description: "show this help message",
    },
];

impl Command {
    /// Exact, case-sensitive alias lookup.
    pub fn from_alias(word: &str) -> Option<Self> {
        let command = match word {
            "q" => Command::Quit(QuitMode::Ask),
            "q!" => Command::Quit(QuitMode::Force),
            "wq" | "sq" => Command::Quit(QuitMode::Save),
            "r" | "read" => Command::Read,
            "w" | "write" => Command::Write,
            "D" | "DELETE" => Command::DeleteAll,
            "d" | "delete" => Command::Delete,
            "f" | "find" => Command::Find,
            "gen" | "generate" => Command::Generate,
            "c" | "clear" => Command::Clear,
            "s" | "save" => Command::Save,
            "change" => Command::Change,
            "h" | "help" => Command::Help,
            _ => return None,
        };
        Some(command)
    }
}

/// Line-oriented shell. Borrows the session for as long as it runs.
pub struct Shell<'a, T: Terminal + ?Sized> {
    session: &'a mut Session,
    term: &'a mut T,
}

impl<'a, T: Terminal + ?Sized> Shell<'a, T> {
    pub fn new(session: &'a mut Session, term: &'a mut T) -> Self {
        Self { session, term }
    }

    /// Run until a quit command or end of input.
    ///
    /// Per-command errors are printed and the loop continues; only errors
    /// that make the session untrustworthy are returned.
    pub fn run(&mut self) -> Result<()> {
        self.print_welcome()?;

        loop {
            match self.term.read_line(PROMPT)? {
                Input::Line(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if !holds_record_text(line) {
                        self.term.remember(line);
                    }

                    match self.execute(line) {
                        Ok(State::Running) => {}
                        Ok(State::Exiting) => break,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => failure(self.term.out(), &e.to_string())?,
                    }
                }
                Input::Interrupted => {
                    writeln!(self.term.out(), "Use 'q' to quit")?;
                }
                Input::Eof => {
                    if self.session.is_dirty() {
                        warning(self.term.out(), "end of input - unsaved changes discarded")?;
                    }
                    break;
                }
            }
        }

        tracing::debug!("shell exited");
        Ok(())
    }

    /// Execute one command line.
    pub fn execute(&mut self, line: &str) -> Result<State> {
        let mut tokens = line.split_whitespace();
        let Some(word) = tokens.next() else {
            return Ok(State::Running);
        };
        let args: Vec<&str> = tokens.collect();

        let Some(command) = Command::from_alias(word) else {
            let out = self.term.out();
            writeln!(out, "invalid command: {word}")?;
            writeln!(out, "enter h or help for list of commands!")?;
            return Ok(State::Running);
        };

        tracing::debug!(?command, args = args.len(), "dispatch");

        match command {
            Command::Quit(mode) => return self.quit(mode),
            Command::Read => self.read(&args)?,
            Command::Write => self.write(&args)?,
            Command::DeleteAll => self.delete_all()?,
            Command::Delete => self.delete(&args)?,
            Command::Find => self.find(&args)?,
            Command::Generate => self.generate(&args)?,
            Command::Clear => self.term.clear_screen()?,
            Command::Save => self.save()?,
            Command::Change => self.change()?,
            Command::Help => self.show_help()?,
        }
        Ok(State::Running)
    }

    fn quit(&mut self, mode: QuitMode) -> Result<State> {
        match mode {
            QuitMode::Force => {
                writeln!(self.term.out(), "not saving changes")?;
                Ok(State::Exiting)
            }
            QuitMode::Save => {
                self.save()?;
                Ok(State::Exiting)
            }
            QuitMode::Ask => match self.ask("save changes (y/n)?: ")? {
                Some(true) => self.quit(QuitMode::Save),
                Some(false) => self.quit(QuitMode::Force),
                None => {
                    writeln!(self.term.out(), "please enter either y or n!")?;
                    Ok(State::Running)
                }
            },
        }
    }

    fn read(&mut self, args: &[&str]) -> Result<()> {
        let len = self.session.store().len();
        let start = match args.first() {
            Some(arg) => clamp_bound(parse_int(arg)?),
            None => 0,
        };
        let end = match args.get(1) {
            Some(arg) => clamp_bound(parse_int(arg)?),
            None => len,
        };

        let out = self.term.out();
        for (index, record) in self.session.store().read_range(start, end) {
            writeln!(out, "{index}:{record}")?;
        }
        Ok(())
    }

    fn write(&mut self, args: &[&str]) -> Result<()> {
        let index = self.session.insert(&args.join(" "))?;
        success(self.term.out(), &format!("added row {index}"))?;
        Ok(())
    }

    fn delete(&mut self, args: &[&str]) -> Result<()> {
        let arg = args
            .first()
            .ok_or_else(|| VaultError::Validation("usage: delete <index>".to_string()))?;
        let index = parse_int(arg)?;
        let index = usize::try_from(index).map_err(|_| VaultError::Range {
            index,
            len: self.session.store().len(),
        })?;

        let removed = self.session.delete(index)?;
        writeln!(self.term.out(), "deleted:{}", removed.as_str())?;
        Ok(())
    }

    fn delete_all(&mut self) -> Result<()> {
        match self.ask("delete all rows? (y/n) ")? {
            Some(true) => {
                self.session.delete_all();
                writeln!(self.term.out(), "deleted all rows.")?;
            }
            Some(false) => writeln!(self.term.out(), "not deleting all rows.")?,
            None => writeln!(self.term.out(), "enter either y or n.")?,
        }
        Ok(())
    }

    fn find(&mut self, args: &[&str]) -> Result<()> {
        if args.is_empty() {
            return Err(VaultError::Validation("usage: find <pattern>".to_string()));
        }
        let pattern = args.join(" ");

        let matches = self.session.store().find(&pattern)?;
        let out = self.term.out();
        if matches.is_empty() {
            writeln!(out, "no matches")?;
        }
        for (index, record) in matches {
            writeln!(out, "{index}:{record}")?;
        }
        Ok(())
    }

    fn generate(&mut self, args: &[&str]) -> Result<()> {
        let length = match args.first() {
            Some(arg) => {
                let requested = parse_int(arg)?;
                if requested > MAX_LENGTH as i64 {
                    return Err(VaultError::Validation(format!(
                        "password length must be at most {MAX_LENGTH}"
                    )));
                }
                usize::try_from(requested).unwrap_or(0)
            }
            None => DEFAULT_LENGTH,
        };

        let password = generator::generate_password(length, &mut rand::thread_rng());
        writeln!(self.term.out(), "{password}")?;
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.session.save()?;
        let message = format!("saved {}", self.session.path().display());
        success(self.term.out(), &message)?;
        Ok(())
    }

    fn change(&mut self) -> Result<()> {
        self.session.change_key(&mut *self.term)?;
        let message = format!(
            "passphrase changed, saved {}",
            self.session.path().display()
        );
        success(self.term.out(), &message)?;
        Ok(())
    }

    fn show_help(&mut self) -> Result<()> {
        let out = self.term.out();
        for group in COMMAND_GROUPS {
            writeln!(
                out,
                "{}: {}",
                group.aliases.join(" or ").cyan(),
                group.description
            )?;
        }
        Ok(())
    }

    /// y/n question: `Some(true)` for y, `Some(false)` for n, `None` otherwise.
    fn ask(&mut self, prompt: &str) -> Result<Option<bool>> {
        let answer = match self.term.read_line(prompt)? {
            Input::Line(line) => line,
            Input::Interrupted | Input::Eof => return Ok(None),
        };
        Ok(match answer.trim() {
            "y" => Some(true),
            "n" => Some(false),
            _ => None,
        })
    }

    fn print_welcome(&mut self) -> Result<()> {
        let records = self.session.store().len();
        let path = self.session.path().display().to_string();
        let out = self.term.out();
        writeln!(out, "\n{}", "linevault".bold().cyan())?;
        writeln!(out, "Store: {path} ({records} records)")?;
        writeln!(out, "Type 'h' or 'help' for available commands\n")?;
        Ok(())
    }
}

fn parse_int(arg: &str) -> Result<i64> {
    arg.parse()
        .map_err(|_| VaultError::Validation(format!("please enter a valid integer, got '{arg}'")))
}

/// `write` lines carry record text and stay out of line-editor history.
fn holds_record_text(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .and_then(Command::from_alias)
        == Some(Command::Write)
}

/// Negative bounds clamp to zero; the store clamps the upper end.
fn clamp_bound(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
