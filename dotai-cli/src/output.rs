//! Terminal output passed explicitly to every command

use anyhow::Result;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Results go to `out`; warnings and progress go to `err`
pub struct Output<O: Write, E: Write> {
    out: O,
    err: E,
}

impl Output<std::io::Stdout, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write, E: Write> Output<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn line(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<()> {
        writeln!(self.out)?;
        Ok(())
    }

    pub fn status(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.err, "{text}")?;
        Ok(())
    }

    pub fn warn(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.err, "Warning: {text}")?;
        Ok(())
    }

    pub fn table<T: Tabled>(&mut self, rows: &[T]) -> Result<()> {
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string();
        self.line(table)
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        self.line(text)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

/// Cut a description to `max` characters for table cells
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}
