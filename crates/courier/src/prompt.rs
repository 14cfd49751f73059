//! Line-oriented operator prompts.
//!
//! Every question re-asks until its parser accepts the answer. A closed
//! input stream is reported as [`io::ErrorKind::UnexpectedEof`].

use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Shown instead of a stored secret.
const SAVED_MARKER: &str = "[saved]";

/// Asks questions on `output` and reads answers from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompts on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Creates a prompter over arbitrary streams.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes a line of text for the operator.
    pub fn say(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Asks until `parse` accepts the answer. An empty answer means
    /// `default` when one is given.
    pub fn ask<T, E: Display>(
        &mut self,
        label: &str,
        default: Option<&str>,
        mut parse: impl FnMut(&str) -> Result<T, E>,
    ) -> io::Result<T> {
        let shown = default.filter(|d| !d.is_empty());
        loop {
            let answer = self.read_answer(label, shown)?;
            let answer = if answer.is_empty() {
                shown.unwrap_or_default()
            } else {
                answer.as_str()
            };
            match parse(answer) {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "  {e}")?,
            }
        }
    }

    /// Asks for non-empty text.
    pub fn ask_text(&mut self, label: &str, default: Option<&str>) -> io::Result<String> {
        self.ask(label, default, non_empty)
    }

    /// Asks for text that may be left empty.
    pub fn ask_optional(&mut self, label: &str, default: &str) -> io::Result<String> {
        let answer = self.read_answer(label, Some(default).filter(|d| !d.is_empty()))?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Asks for a secret. A stored value is shown as `[saved]` and kept
    /// when the answer is empty.
    pub fn ask_secret(&mut self, label: &str, saved: &str) -> io::Result<String> {
        let marker = (!saved.is_empty()).then_some(SAVED_MARKER);
        loop {
            let answer = self.read_answer(label, marker)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            if !saved.is_empty() {
                return Ok(saved.to_string());
            }
            writeln!(self.output, "  A value is required")?;
        }
    }

    /// Lists `options` and returns the index of the chosen one.
    pub fn choose(&mut self, label: &str, options: &[&str]) -> io::Result<usize> {
        writeln!(self.output, "{label}")?;
        for (n, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {option}", n + 1)?;
        }
        let count = options.len();
        self.ask("Choice", None, |answer| match answer.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
            _ => Err(format!("Please enter a number between 1 and {count}")),
        })
    }

    /// Asks a yes/no question.
    pub fn confirm(&mut self, label: &str) -> io::Result<bool> {
        self.ask(&format!("{label} (y/n)"), None, |answer| {
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                _ => Err("Please answer y or n"),
            }
        })
    }

    fn read_answer(&mut self, label: &str, shown: Option<&str>) -> io::Result<String> {
        match shown {
            Some(default) => write!(self.output, "{label} [{default}]: ")?,
            None => write!(self.output, "{label}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim().to_string())
    }
}

fn non_empty(answer: &str) -> Result<String, &'static str> {
    if answer.is_empty() {
        Err("A value is required")
    } else {
        Ok(answer.to_string())
    }
}
