//! Linearises rewritten program text into a flat instruction vector with
//! fused repetition counts, per-op tape offsets and pre-linked branch
//! targets.

use thiserror::Error;
use tracing::debug;

use crate::optimizer::Rewritten;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    #[error("unmatched close bracket")]
    UnmatchedClose,
    #[error("unmatched open bracket")]
    UnmatchedOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind {
    /// Add `data` to the cell at `offset`, wrapping mod 256.
    Add,
    /// Move the cursor by `data` cells.
    Move,
    /// Jump to `data` when the cell at the cursor is zero.
    Jz,
    /// Jump to `data` when the cell at the cursor is nonzero.
    Jnz,
    /// Write the cell at `offset` to the byte sink `data` times.
    Put,
    /// Read one byte from the byte source into the cell at `offset`. At end
    /// of input the cell is set to 0.
    Get,
    /// Set the cell at `offset` to zero.
    Clear,
    /// Add `aux` times the cell at `offset` into the cell at
    /// `offset + data`, when the cell at `offset` is nonzero. The source
    /// cell is left untouched; the clear that follows a copy run zeroes it.
    Mul,
    /// Advance the cursor by `data` cells at a time until it lands on a
    /// zero cell.
    ScanR,
    /// Retreat the cursor by `data` cells at a time until it lands on a
    /// zero cell.
    ScanL,
}

/// One linked instruction. `data` is the kind-dependent payload (additive
/// delta, pointer delta, branch target, repeat count, scan stride or copy
/// target offset), `aux` carries the multiplier for `Mul`, and `offset` is
/// the tape offset every cell access of the instruction applies relative to
/// the cursor. Pointer moves and branches never carry an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inst {
    pub kind: InstKind,
    pub data: i32,
    pub aux: i32,
    pub offset: i32,
}

/// Link a rewritten program into an executable instruction vector.
pub fn link(rewritten: &Rewritten) -> Result<Vec<Inst>, CompileError> {
    link_with(rewritten, true)
}

fn link_with(rewritten: &Rewritten, fold_offsets: bool) -> Result<Vec<Inst>, CompileError> {
    let code = rewritten.code.as_bytes();
    let mut instrs: Vec<Inst> = Vec::with_capacity(code.len());
    let mut braces: Vec<usize> = Vec::new();
    let mut pending: i32 = 0;
    let mut copies = 0usize;
    let mut scans = 0usize;
    let mut i = 0usize;
    while i < code.len() {
        let op = code[i];
        // Data ops outside any loop body carry the pending pointer delta as
        // their offset. Inside a loop the branch guards read the cell at the
        // cursor, so motion stays explicit and offsets are zero.
        let offset = if braces.is_empty() { pending } else { 0 };
        match op {
            b'+' | b'-' => {
                let run = run_len(code, i, op);
                i += run;
                let mut net = (run % 256) as i32;
                if op == b'-' {
                    net = -net;
                }
                if net != 0 {
                    instrs.push(Inst { kind: InstKind::Add, data: net, aux: 0, offset });
                }
            }
            b'>' | b'<' => {
                let run = run_len(code, i, op);
                i += run;
                let delta = if op == b'>' { run as i32 } else { -(run as i32) };
                if braces.is_empty() && fold_offsets {
                    pending += delta;
                } else {
                    instrs.push(Inst { kind: InstKind::Move, data: delta, aux: 0, offset: 0 });
                }
            }
            b'[' => {
                if pending != 0 {
                    instrs.push(Inst { kind: InstKind::Move, data: pending, aux: 0, offset: 0 });
                    pending = 0;
                }
                braces.push(instrs.len());
                instrs.push(Inst { kind: InstKind::Jz, data: 0, aux: 0, offset: 0 });
                i += 1;
            }
            b']' => {
                let open = braces.pop().ok_or(CompileError::UnmatchedClose)?;
                instrs[open].data = instrs.len() as i32;
                instrs.push(Inst { kind: InstKind::Jnz, data: open as i32, aux: 0, offset: 0 });
                i += 1;
            }
            b'.' => {
                let run = run_len(code, i, op);
                i += run;
                instrs.push(Inst { kind: InstKind::Put, data: run as i32, aux: 0, offset });
            }
            b',' => {
                instrs.push(Inst { kind: InstKind::Get, data: 0, aux: 0, offset });
                i += 1;
            }
            b'C' => {
                instrs.push(Inst { kind: InstKind::Clear, data: 0, aux: 0, offset });
                i += 1;
            }
            b'P' => {
                let data = rewritten.copy_offsets[copies];
                let aux = rewritten.copy_multipliers[copies];
                copies += 1;
                instrs.push(Inst { kind: InstKind::Mul, data, aux, offset });
                i += 1;
            }
            b'R' | b'L' => {
                if pending != 0 {
                    instrs.push(Inst { kind: InstKind::Move, data: pending, aux: 0, offset: 0 });
                    pending = 0;
                }
                let kind = if op == b'R' { InstKind::ScanR } else { InstKind::ScanL };
                let stride = rewritten.scan_strides[scans];
                scans += 1;
                instrs.push(Inst { kind, data: stride, aux: 0, offset: 0 });
                i += 1;
            }
            _ => i += 1,
        }
    }
    if !braces.is_empty() {
        return Err(CompileError::UnmatchedOpen);
    }
    if pending != 0 {
        instrs.push(Inst { kind: InstKind::Move, data: pending, aux: 0, offset: 0 });
    }
    debug!(instructions = instrs.len(), "linked program");
    Ok(instrs)
}

fn run_len(code: &[u8], start: usize, op: u8) -> usize {
    let mut len = 1;
    while start + len < code.len() && code[start + len] == op {
        len += 1;
    }
    len
}
