//! The byte tape a session owns, and its terminal rendering.

use std::io::{self, Write};

use colored::Colorize;

/// Default number of cells on the tape.
pub const DEFAULT_TAPE_SIZE: usize = 30_000;

/// A fixed-size byte tape and its cursor. The tape lives for a whole
/// session; each run borrows it mutably and leaves its state behind.
#[derive(Debug, Clone)]
pub struct Tape {
    pub(crate) cells: Vec<u8>,
    pub(crate) cursor: usize,
}

impl Tape {
    pub fn new(size: usize) -> Self {
        Tape { cells: vec![0; size], cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    /// Zero every cell and move the cursor back to the start.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.cursor = 0;
    }

    /// Render rows of ten cells up to the last non-zero cell, or the cursor
    /// if it sits further right. The cursor cell prints green.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let last = self.cells.iter().rposition(|&cell| cell != 0).unwrap_or(0);
        let end = last.max(self.cursor);
        writeln!(out, "         000 001 002 003 004 005 006 007 008 009")?;
        for (index, &cell) in self.cells.iter().take(end + 1).enumerate() {
            if index % 10 == 0 {
                if index != 0 {
                    writeln!(out)?;
                }
                let label = index.to_string();
                write!(out, "{}{}", label, " ".repeat(9usize.saturating_sub(label.len())))?;
            }
            let value = cell.to_string();
            let pad = " ".repeat(4 - value.len());
            if index == self.cursor {
                write!(out, "{}{}", value.green(), pad)?;
            } else {
                write!(out, "{}{}", value, pad)?;
            }
        }
        writeln!(out)
    }
}
