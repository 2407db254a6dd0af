//! The line-level data model carried from the loader through both
//! passes, as a tagged enum rather than a positional tuple.

use std::path::PathBuf;

/// A raw line handed off by the loader, before any classification.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub file_ref: u32,
    pub line_no: u32,
    pub line_str: String,
}

/// The per-line payload, tagged by the segment it was scanned under.
#[derive(Debug, Clone)]
pub enum LineBody {
    /// Blank line, directive, alias or label-only line: contributes
    /// nothing to the memory image.
    Comment,
    /// Code-segment instruction: mnemonic followed by 0-2 operand
    /// strings, already jump-target-corrected.
    Code(Vec<String>),
    /// `.text` segment: one word per character.
    WordText(Vec<u16>),
    /// `.btext` segment: two characters packed per word.
    ByteText(Vec<u16>),
    /// `.data` segment: one word per literal.
    Data(Vec<u16>),
}

/// A line after pass 1: sized and addressed, symbol table up to date.
#[derive(Debug, Clone)]
pub struct Line {
    pub file_ref: u32,
    pub line_no: u32,
    pub line_str: String,
    /// Epoch frozen at the point this line was scanned, reused by pass 2
    /// so local-label resolution doesn't have to re-walk definition order.
    pub label_prefix: u32,
    pub address: u16,
    pub size: u16,
    pub body: LineBody,
}

impl Line {
    pub fn is_comment(&self) -> bool {
        matches!(self.body, LineBody::Comment)
    }
}

/// A line after pass 2: the body's words have been fully encoded.
#[derive(Debug, Clone)]
pub struct EncodedLine {
    pub line: Line,
    pub code: Vec<u16>,
}

impl EncodedLine {
    /// Whether this line's words belong in the memory image. The locater
    /// copies `Code`/`*Text` lines only — `Data` reserves address space
    /// (and can be referenced by label) but its words are never written
    /// into memory, matching the original locater exactly.
    pub fn occupies_memory(&self) -> bool {
        matches!(
            self.line.body,
            LineBody::Code(_) | LineBody::WordText(_) | LineBody::ByteText(_)
        )
    }
}

/// Ordered list of absolute file paths, one entry per distinct file ever
/// included, indexed by `file_ref`.
#[derive(Debug, Default)]
pub struct FileTable(pub Vec<PathBuf>);

impl FileTable {
    pub fn new() -> Self {
        FileTable(Vec::new())
    }

    pub fn intern(&mut self, path: PathBuf) -> u32 {
        if let Some(idx) = self.0.iter().position(|p| p == &path) {
            idx as u32
        } else {
            self.0.push(path);
            (self.0.len() - 1) as u32
        }
    }

    pub fn path(&self, file_ref: u32) -> &std::path::Path {
        &self.0[file_ref as usize]
    }
}
