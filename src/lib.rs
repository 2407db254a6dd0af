//! Two-pass assembler for VM16, a 16-bit word-addressed virtual machine.
//!
//! `assemble_file` drives the whole pipeline: a [`loader`] recursively
//! expands `$include` directives into a tagged line stream, [`pass1`]
//! scans every line to size instructions and fill the symbol/alias
//! tables, [`pass2`] encodes each line into its final 16-bit words,
//! [`locater`] lays those words out into a sparse memory image, and
//! [`emit`] writes the listing/hex-dump/H16 output files.
//!
//! # VM16 Assembly Language
//!
//! A source line is one of: a comment (`;` to end of line), a segment
//! directive (`.code`, `.data`, `.text`, `.btext`, `.org <literal>`), an
//! include (`$include "path"`), an alias (`IDENT = token`), a label
//! (`IDENT:`), or an instruction (`mnemonic [op1[, op2]]`).
//!
//! ## Registers
//!
//! `A B C D X Y PC SP` — general purpose plus program counter and stack
//! pointer, encoded as operand indices 0-7.
//!
//! ## Operand Syntax
//!
//! Syntax | Mode
//! -------|-----
//! `A`, `[X]`, `[X]+`, ... | register / register-indirect
//! `#0`, `#1` | short constant
//! `#<literal>`, `#<label>` | immediate
//! `<literal>`, `<label>` | indirect address
//! `+<literal>`, `-<literal>` | PC-relative literal offset
//! `+<label>`, `-<label>` | PC-relative to a label
//! `[SP+<literal>]` | stack-relative
//!
//! ## Mnemonics
//!
//! See [`isa::MNEMONICS`] for the full 39-entry opcode table with each
//! mnemonic's declared operand groups.
//!
//! ## Local Labels
//!
//! A label containing any upper-case character is global and unique for
//! the whole program. An all-lower-case label is local: it is scoped to
//! the run of code between the global label before it and the next one,
//! so the same local name (e.g. `loop`) may be reused under each global
//! label without colliding.

pub mod emit;
pub mod error;
pub mod isa;
pub mod literal;
pub mod loader;
pub mod locater;
pub mod pass1;
pub mod pass2;
pub mod symbols;
pub mod token;

use std::path::Path;

pub use error::{AsmError, AsmErrorKind, Result};
use locater::MemoryImage;
use symbols::SymbolTable;
use token::EncodedLine;

/// The full, in-memory result of assembling one root source file.
pub struct Assembly {
    pub lines: Vec<EncodedLine>,
    pub memory: MemoryImage,
    pub warnings: Vec<String>,
    /// Final symbol table, kept around so callers can print the
    /// console symbol-table dump without re-running pass 1.
    pub symbols: SymbolTable,
}

/// Runs the full pipeline — load, pass 1, pass 2, locate — against a
/// root source file on disk. Does not write any output files; callers
/// use [`emit`] to do that.
pub fn assemble_file(path: &Path) -> Result<Assembly> {
    log::debug!("loading {}", path.display());
    let (raw_lines, files) = loader::load(path)?;

    log::debug!("pass 1: {} raw lines", raw_lines.len());
    let p1 = pass1::run(&raw_lines, &files)?;

    log::debug!("pass 2: {} lines sized by pass 1", p1.lines.len());
    let mut symbols = p1.symbols;
    let lines = pass2::run(p1.lines, &mut symbols, &p1.aliases, &files)?;

    let (memory, warnings) = locater::locate(&lines);
    for w in &warnings {
        log::warn!("{}", w);
    }

    Ok(Assembly { lines, memory, warnings, symbols })
}
