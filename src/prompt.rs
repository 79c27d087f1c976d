use is_terminal::IsTerminal;
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

use crate::error::PromptError;

/// Environment variable that supplies the archive passphrase non-interactively.
pub const PASSPHRASE_ENV: &str = "DOTFILES_PASSPHRASE";

pub trait Prompt {
    /// Ask a yes/no question until the answer is one of `y`, `yes`, `n`, `no`.
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError>;

    /// Ask for a free-text value; the empty string is a valid answer.
    fn input(&mut self, name: &str) -> Result<String, PromptError>;

    /// Ask for an archive passphrase. `confirm` asks twice and requires a match.
    fn passphrase(&mut self, label: &str, confirm: bool) -> Result<String, PromptError>;
}

/// Interpret one line of user input, case-insensitively.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Line-oriented prompt over any reader/writer pair.
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
    passphrase: Option<String>,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W, passphrase: Option<String>) -> Self {
        Self {
            reader,
            writer,
            passphrase,
        }
    }

    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        write!(self.writer, "{question}")?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed {
                question: question.trim_end().to_string(),
            });
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        let question = format!("{question} (y/n): ");
        loop {
            let answer = self.ask(&question)?;
            match parse_answer(&answer) {
                Some(yes) => return Ok(yes),
                None => writeln!(self.writer, "Please answer with 'y' or 'n'")?,
            }
        }
    }

    fn input(&mut self, name: &str) -> Result<String, PromptError> {
        self.ask(&format!("Enter information for {name}: "))
    }

    fn passphrase(&mut self, _label: &str, _confirm: bool) -> Result<String, PromptError> {
        self.passphrase.clone().ok_or(PromptError::NoPassphrase)
    }
}

/// Prompt bound to the process's stdin/stdout.
///
/// Passphrases come from `DOTFILES_PASSPHRASE` when set, otherwise from a
/// hidden terminal prompt; piped stdin without the variable is an error.
/// The stdin lock is only held while one line is read, since the hidden
/// prompt reads through `io::stdin()` as well.
pub struct TerminalPrompt {
    stdin: Stdin,
    passphrase: Option<String>,
    interactive: bool,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        Self {
            stdin,
            passphrase: std::env::var(PASSPHRASE_ENV).ok(),
            interactive,
        }
    }

    fn lines(&self) -> LinePrompt<StdinLock<'static>, Stdout> {
        LinePrompt::new(self.stdin.lock(), io::stdout(), self.passphrase.clone())
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        self.lines().confirm(question)
    }

    fn input(&mut self, name: &str) -> Result<String, PromptError> {
        self.lines().input(name)
    }

    fn passphrase(&mut self, label: &str, confirm: bool) -> Result<String, PromptError> {
        if let Some(passphrase) = &self.passphrase {
            return Ok(passphrase.clone());
        }
        if !self.interactive {
            return Err(PromptError::NoPassphrase);
        }

        let mut password = dialoguer::Password::new().with_prompt(label);
        if confirm {
            password = password.with_confirmation(
                format!("Verifying - {label}"),
                "Passphrases do not match",
            );
        }
        Ok(password.interact()?)
    }
}
