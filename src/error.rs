use std::fmt;
use std::path::PathBuf;

/// The kind of failure that aborted assembly, independent of *where* it
/// happened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AsmErrorKind {
    FileNotFound,
    InvalidLiteral(String),
    UnknownInstruction(String),
    WrongOperandCount { mnemonic: String, expected: usize, found: usize },
    InvalidOperandType,
    UnknownSymbol(String),
    DuplicateLabel(String),
    InternalSizeMismatch,
    Io(String),
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmErrorKind::FileNotFound => write!(f, "File does not exist"),
            AsmErrorKind::InvalidLiteral(s) => write!(f, "Invalid operand '{}'", s),
            AsmErrorKind::UnknownInstruction(s) => write!(f, "Invalid syntax '{}'", s),
            AsmErrorKind::WrongOperandCount { mnemonic, expected, found } => write!(
                f,
                "Instruction '{}' should have {} operand(s), {} given",
                mnemonic, expected, found
            ),
            AsmErrorKind::InvalidOperandType => write!(f, "Invalid operand type"),
            AsmErrorKind::UnknownSymbol(s) => write!(f, "Invalid/unknown operand '{}'", s),
            AsmErrorKind::DuplicateLabel(s) => write!(f, "Label '{}' used twice", s),
            AsmErrorKind::InternalSizeMismatch => write!(f, "Internal error: encoded size mismatch"),
            AsmErrorKind::Io(s) => write!(f, "{}", s),
        }
    }
}

/// A fatal assembly error, always tied to the file and 1-based line it was
/// raised from so the reported message can point straight back at the
/// offending source line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AsmError {
    pub file: PathBuf,
    pub line: u32,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn new(file: impl Into<PathBuf>, line: u32, kind: AsmErrorKind) -> AsmError {
        AsmError { file: file.into(), line, kind }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error in file '{}', line {}:\n{}",
            self.file.display(),
            self.line,
            self.kind
        )
    }
}

impl std::error::Error for AsmError {}

pub type Result<T> = std::result::Result<T, AsmError>;
