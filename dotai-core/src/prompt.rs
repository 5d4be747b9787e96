//! Request/response prompts over an explicit reader and writer

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::error::{AssetError, Result};
use crate::selection::parse_selection_or_name;

/// Attempts allowed before an invalid selection is returned as an error
const MAX_ATTEMPTS: usize = 3;

/// Interactive prompts driven by any reader/writer pair
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
    interactive: bool,
}

fn terminal_io(source: std::io::Error) -> AssetError {
    AssetError::Io {
        path: PathBuf::from("<terminal>"),
        source,
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// `interactive` should be false when stdin is not a terminal
    pub fn new(reader: R, writer: W, interactive: bool) -> Self {
        Self {
            reader,
            writer,
            interactive,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn require_terminal(&self) -> Result<()> {
        if self.interactive {
            Ok(())
        } else {
            Err(AssetError::TerminalRequired)
        }
    }

    /// Read one line; end of input reads as an empty line
    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(terminal_io)?;
        Ok(line.trim().to_string())
    }

    /// Show a numbered list and read a selection. An empty answer cancels
    /// and yields no indices.
    pub fn select(&mut self, kind: &str, labels: &[String], names: &[String]) -> Result<Vec<usize>> {
        self.require_terminal()?;

        writeln!(self.writer, "Multiple {kind} matches:").map_err(terminal_io)?;
        for (i, label) in labels.iter().enumerate() {
            writeln!(self.writer, "  {:>2}. {}", i + 1, label).map_err(terminal_io)?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            write!(
                self.writer,
                "Select {kind} (1-{}, ranges, 'all' or a name; empty to cancel): ",
                labels.len()
            )
            .map_err(terminal_io)?;
            self.writer.flush().map_err(terminal_io)?;

            let answer = self.read_line()?;
            match parse_selection_or_name(&answer, names, kind) {
                Ok(indices) => return Ok(indices),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    writeln!(self.writer, "{e}").map_err(terminal_io)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Ask a yes/no question; an empty answer takes `default`
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        self.require_terminal()?;

        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            write!(self.writer, "{question} {hint} ").map_err(terminal_io)?;
            self.writer.flush().map_err(terminal_io)?;

            let answer = self.read_line()?.to_ascii_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.writer, "Please answer y or n.").map_err(terminal_io)?,
            }
        }
    }
}
