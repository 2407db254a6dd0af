//! Static instruction-set tables: opcodes, operand-mode encoding and the
//! operand-group constraints used to validate an instruction's operands.
//!
//! Table order matters: a mnemonic's position in [`MNEMONICS`] is
//! directly its opcode index.

/// The operand-group a mnemonic declares for one of its two operand slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperandGroup {
    /// No operand accepted in this slot.
    None,
    /// Register or indirect destination: `REG ∪ MEM`.
    Dst,
    /// Destination plus constant sources: `DST ∪ CNST`.
    Src,
    /// Branch/jump target: `{IMM, REL, #0, #1}`.
    Adr,
    /// Immediate source: `{#0, #1, IMM}`.
    Cnst,
    /// Inline 10-bit immediate baked into the opcode word.
    Num,
}

/// One row of the opcode table.
pub struct Mnemonic {
    pub name: &'static str,
    pub group1: OperandGroup,
    pub group2: OperandGroup,
}

impl Mnemonic {
    /// Number of operands this mnemonic's signature declares (0, 1 or 2).
    pub fn operand_count(&self) -> usize {
        let mut n = 0;
        if !matches!(self.group1, OperandGroup::None) {
            n += 1;
        }
        if !matches!(self.group2, OperandGroup::None) {
            n += 1;
        }
        n
    }
}

use OperandGroup::{Adr, Cnst, Dst as D, None as N, Num, Src as S};

/// The 39-entry opcode table. Position = opcode index.
pub static MNEMONICS: &[Mnemonic] = &[
    Mnemonic { name: "nop", group1: N, group2: N },
    Mnemonic { name: "dly", group1: N, group2: N },
    Mnemonic { name: "sys", group1: Num, group2: N },
    Mnemonic { name: "int", group1: Num, group2: N },
    Mnemonic { name: "jump", group1: Adr, group2: N },
    Mnemonic { name: "call", group1: Adr, group2: N },
    Mnemonic { name: "ret", group1: N, group2: N },
    Mnemonic { name: "halt", group1: N, group2: N },
    Mnemonic { name: "move", group1: D, group2: S },
    Mnemonic { name: "xchg", group1: D, group2: D },
    Mnemonic { name: "inc", group1: D, group2: N },
    Mnemonic { name: "dec", group1: D, group2: N },
    Mnemonic { name: "add", group1: D, group2: S },
    Mnemonic { name: "sub", group1: D, group2: S },
    Mnemonic { name: "mul", group1: D, group2: S },
    Mnemonic { name: "div", group1: D, group2: S },
    Mnemonic { name: "and", group1: D, group2: S },
    Mnemonic { name: "or", group1: D, group2: S },
    Mnemonic { name: "xor", group1: D, group2: S },
    Mnemonic { name: "not", group1: D, group2: N },
    Mnemonic { name: "bnze", group1: D, group2: Adr },
    Mnemonic { name: "bze", group1: D, group2: Adr },
    Mnemonic { name: "bpos", group1: D, group2: Adr },
    Mnemonic { name: "bneg", group1: D, group2: Adr },
    Mnemonic { name: "in", group1: D, group2: Cnst },
    Mnemonic { name: "out", group1: Cnst, group2: S },
    Mnemonic { name: "push", group1: S, group2: N },
    Mnemonic { name: "pop", group1: D, group2: N },
    Mnemonic { name: "swap", group1: D, group2: N },
    Mnemonic { name: "dbnz", group1: D, group2: Adr },
    Mnemonic { name: "mod", group1: D, group2: S },
    Mnemonic { name: "shl", group1: D, group2: S },
    Mnemonic { name: "shr", group1: D, group2: S },
    Mnemonic { name: "addc", group1: D, group2: S },
    Mnemonic { name: "mulc", group1: D, group2: S },
    Mnemonic { name: "skne", group1: S, group2: S },
    Mnemonic { name: "skeq", group1: S, group2: S },
    Mnemonic { name: "sklt", group1: S, group2: S },
    Mnemonic { name: "skgt", group1: S, group2: S },
];

/// Mnemonics whose opcode index is below this pack their single operand
/// as a 10-bit immediate baked into the opcode word instead of a normal
/// operand-mode encoding (`nop`, `dly`, `sys`, `int`).
pub const SHORT_IMMEDIATE_COUNT: u8 = 4;

/// Auto-apply the `#` immediate prefix to a bare jump/branch target.
pub static JUMP_INSTRUCTIONS: &[&str] =
    &["jump", "call", "bnze", "bze", "bpos", "bneg", "dbnz"];

pub static REGISTERS: &[&str] = &["A", "B", "C", "D", "X", "Y", "PC", "SP"];

/// Operand codes 0..15: a bare name recognised directly from source text
/// (registers, register-indirect forms and the two short constants).
/// `None` marks the two reserved slots (14, 15) that carry no name.
pub static BARE_OPERANDS: &[Option<&'static str>] = &[
    Some("A"),
    Some("B"),
    Some("C"),
    Some("D"),
    Some("X"),
    Some("Y"),
    Some("PC"),
    Some("SP"),
    Some("[X]"),
    Some("[Y]"),
    Some("[X]+"),
    Some("[Y]+"),
    Some("#0"),
    Some("#1"),
    None,
    None,
];

/// Computed modes: an immediate/address word follows the opcode word.
pub const IMM: u8 = 16;
pub const IND: u8 = 17;
pub const REL: u8 = 18;
pub const STACK_REL: u8 = 19;

/// Canonical mode name for a mode index, used for operand-group checks.
pub fn mode_name(index: u8) -> &'static str {
    match index {
        0..=13 => BARE_OPERANDS[index as usize].unwrap_or("-"),
        IMM => "IMM",
        IND => "IND",
        REL => "REL",
        STACK_REL => "[SP+n]",
        _ => "-",
    }
}

const REG: &[&str] = &["A", "B", "C", "D", "X", "Y", "PC", "SP"];
const MEM: &[&str] = &["[X]", "[Y]", "[X]+", "[Y]+", "IND", "[SP+n]"];
const ADR: &[&str] = &["IMM", "REL", "#0", "#1"];
const CNST: &[&str] = &["#0", "#1", "IMM"];

/// Whether `mode` satisfies the constraint declared by `group`. `Num` and
/// `None` are never checked here — `Num` operands go through the
/// short-immediate encoding path, and `None` means no operand is expected
/// (checked separately via [`Mnemonic::operand_count`]).
pub fn group_allows(group: OperandGroup, mode: &str) -> bool {
    match group {
        OperandGroup::None | OperandGroup::Num => false,
        OperandGroup::Dst => REG.contains(&mode) || MEM.contains(&mode),
        OperandGroup::Src => {
            REG.contains(&mode) || MEM.contains(&mode) || CNST.contains(&mode)
        }
        OperandGroup::Adr => ADR.contains(&mode),
        OperandGroup::Cnst => CNST.contains(&mode),
    }
}

/// Look up a mnemonic's table row and opcode index.
pub fn find(mnemonic: &str) -> Option<(u8, &'static Mnemonic)> {
    MNEMONICS
        .iter()
        .position(|m| m.name == mnemonic)
        .map(|idx| (idx as u8, &MNEMONICS[idx]))
}

/// Mode index of a bare register/indirect/short-constant operand name, if
/// `name` names one.
pub fn bare_mode(name: &str) -> Option<u8> {
    BARE_OPERANDS
        .iter()
        .position(|slot| *slot == Some(name))
        .map(|idx| idx as u8)
}
