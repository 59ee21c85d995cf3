//! The dispatch loop: executes a linked instruction vector against a tape.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::compiler::{Inst, InstKind};
use crate::tape::Tape;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("tape index {index} out of range (tape size {size})")]
    TapeRange { index: i64, size: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Counters reported after a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    /// Instructions dispatched, counting every loop iteration.
    pub executed: u64,
    /// Fused opcodes dispatched (clears, copies, scans).
    pub fused: u64,
    /// Time spent blocked on the byte source.
    pub input_wait: Duration,
}

/// Execute a linked program against `tape`, reading from `input` and
/// writing to `output`.
///
/// Output is flushed before every blocking read and once at program end, so
/// prompts land before the reads they precede. A read that hits end of
/// input stores 0 into the target cell. Addressing a cell outside the tape
/// is fatal for the run; the tape keeps whatever state it reached. A scan
/// whose next step would leave the tape stops on the last in-range cell it
/// reached.
pub fn execute<R: Read, W: Write>(
    program: &[Inst],
    tape: &mut Tape,
    input: &mut R,
    output: &mut W,
) -> Result<Stats, RuntimeError> {
    let size = tape.cells.len();
    let mut stats = Stats::default();
    let mut ip = 0usize;
    while ip < program.len() {
        let Inst { kind, data, aux, offset } = program[ip];
        match kind {
            InstKind::Add => {
                let at = cell_at(tape.cursor, offset as i64, size)?;
                tape.cells[at] = tape.cells[at].wrapping_add(data as u8);
            }
            InstKind::Move => {
                let to = tape.cursor as i64 + data as i64;
                if to < 0 || to >= size as i64 {
                    return Err(RuntimeError::TapeRange { index: to, size });
                }
                tape.cursor = to as usize;
            }
            InstKind::Jz => {
                if tape.cells[tape.cursor] == 0 {
                    ip = data as usize;
                }
            }
            InstKind::Jnz => {
                if tape.cells[tape.cursor] != 0 {
                    ip = data as usize;
                }
            }
            InstKind::Put => {
                let at = cell_at(tape.cursor, offset as i64, size)?;
                output.write_all(&[tape.cells[at]].repeat(data as usize))?;
            }
            InstKind::Get => {
                let at = cell_at(tape.cursor, offset as i64, size)?;
                output.flush()?;
                let blocked = Instant::now();
                let mut byte = [0u8; 1];
                match input.read_exact(&mut byte) {
                    Ok(()) => tape.cells[at] = byte[0],
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => tape.cells[at] = 0,
                    Err(e) => return Err(RuntimeError::Io(e)),
                }
                stats.input_wait += blocked.elapsed();
            }
            InstKind::Clear => {
                stats.fused += 1;
                let at = cell_at(tape.cursor, offset as i64, size)?;
                tape.cells[at] = 0;
            }
            InstKind::Mul => {
                stats.fused += 1;
                let source = cell_at(tape.cursor, offset as i64, size)?;
                if tape.cells[source] != 0 {
                    let target = cell_at(tape.cursor, offset as i64 + data as i64, size)?;
                    let carry = tape.cells[source].wrapping_mul(aux as u8);
                    tape.cells[target] = tape.cells[target].wrapping_add(carry);
                }
            }
            InstKind::ScanR => {
                stats.fused += 1;
                let stride = data as usize;
                while tape.cells[tape.cursor] != 0 {
                    let next = tape.cursor + stride;
                    if next >= size {
                        break;
                    }
                    tape.cursor = next;
                }
            }
            InstKind::ScanL => {
                stats.fused += 1;
                let stride = data as usize;
                while tape.cells[tape.cursor] != 0 {
                    let Some(next) = tape.cursor.checked_sub(stride) else {
                        break;
                    };
                    tape.cursor = next;
                }
            }
        }
        ip += 1;
        stats.executed += 1;
    }
    output.flush()?;
    Ok(stats)
}

fn cell_at(cursor: usize, offset: i64, size: usize) -> Result<usize, RuntimeError> {
    let at = cursor as i64 + offset;
    if at < 0 || at >= size as i64 {
        return Err(RuntimeError::TapeRange { index: at, size });
    }
    Ok(at as usize)
}
