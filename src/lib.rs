//! An optimizing virtual machine for brainfuck.
//!
//! Program text is rewritten by a peephole optimizer that fuses recognized
//! loop idioms (clear loops, scan loops, copy/multiply loops, offsetted
//! runs) into dedicated opcodes, linearised into a flat instruction vector
//! with pre-linked branch targets and per-op tape offsets, and run by a
//! single dispatch loop over a fixed-size byte tape.

pub mod compiler;
pub mod interpreter;
pub mod optimizer;
pub mod shell;
pub mod tape;

pub use compiler::{CompileError, Inst, InstKind};
pub use interpreter::{RuntimeError, Stats, execute};
pub use optimizer::{Rewritten, normalize, optimize, recognize};
pub use tape::{DEFAULT_TAPE_SIZE, Tape};

/// Optimize and link a raw source string into an executable program.
/// `passes` is the number of idiom-recognizer rounds; 0 leaves the program
/// as written, comment stripping and run cancellation aside.
pub fn compile(source: &str, passes: usize) -> Result<Vec<Inst>, CompileError> {
    compiler::link(&optimizer::optimize(source, passes))
}
