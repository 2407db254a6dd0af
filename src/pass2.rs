//! Pass 2: operand classification and opcode-word encoding.
//!
//! Each operand is classified from its source text once into an
//! [`OperandSyntax`], then resolved against the symbol table into a
//! `(mode, immediate)` pair, rather than re-inspecting the operand
//! string on every access.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AsmError, AsmErrorKind, Result};
use crate::isa::{self, OperandGroup};
use crate::literal;
use crate::symbols::{AliasTable, SymbolTable};
use crate::token::{EncodedLine, FileTable, Line, LineBody};

static CONST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#(\$?[0-9A-Fa-fx]+)$").unwrap());
static ADDR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\$?[0-9A-Fa-fx]+)$").unwrap());
static REL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([+\-])(\$?[0-9A-Fa-fx]+)$").unwrap());
static STACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[SP\+(\$?[0-9A-Fa-fx]+)\]$").unwrap());

/// An operand classified from its source text, before label resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OperandSyntax {
    /// Bare register/indirect-register/short-constant name, already an
    /// operand-table index (0..13).
    Bare(u8),
    ImmediateLit(u16),
    ImmediateLabel(String),
    IndirectLit(u16),
    IndirectLabel(String),
    /// PC-relative with the literal offset already sign-resolved.
    RelLit(u16),
    /// PC-relative to a label; the sign character is ignored for label
    /// targets — the offset is always computed from the resolved address.
    RelLabel(String),
    StackRel(u16),
}

fn classify(s: &str, err_at: &dyn Fn(AsmErrorKind) -> AsmError) -> Result<OperandSyntax> {
    if let Some(idx) = isa::bare_mode(s) {
        return Ok(OperandSyntax::Bare(idx));
    }
    if s == "#$0" {
        return Ok(OperandSyntax::Bare(isa::bare_mode("#0").unwrap()));
    }
    if s == "#$1" {
        return Ok(OperandSyntax::Bare(isa::bare_mode("#1").unwrap()));
    }
    if let Some(caps) = CONST_RE.captures(s) {
        let v = literal::parse_u16(&caps[1]).map_err(|t| err_at(AsmErrorKind::InvalidLiteral(t)))?;
        return Ok(OperandSyntax::ImmediateLit(v));
    }
    if let Some(caps) = ADDR_RE.captures(s) {
        let v = literal::parse_u16(&caps[1]).map_err(|t| err_at(AsmErrorKind::InvalidLiteral(t)))?;
        return Ok(OperandSyntax::IndirectLit(v));
    }
    if let Some(caps) = REL_RE.captures(s) {
        let v = literal::parse_value(&caps[2]).map_err(|t| err_at(AsmErrorKind::InvalidLiteral(t)))?;
        let offset = if &caps[1] == "-" {
            literal::wrap_u16(0x10000 - v)
        } else {
            literal::wrap_u16(v)
        };
        return Ok(OperandSyntax::RelLit(offset));
    }
    if let Some(caps) = STACK_RE.captures(s) {
        let v = literal::parse_u16(&caps[1]).map_err(|t| err_at(AsmErrorKind::InvalidLiteral(t)))?;
        return Ok(OperandSyntax::StackRel(v));
    }
    if let Some(name) = s.strip_prefix('#') {
        return Ok(OperandSyntax::ImmediateLabel(name.to_string()));
    }
    if s.starts_with('+') || s.starts_with('-') {
        return Ok(OperandSyntax::RelLabel(s[1..].to_string()));
    }
    Ok(OperandSyntax::IndirectLabel(s.to_string()))
}

/// Resolves a classified operand against the symbol table, returning the
/// 5-bit mode index and the optional trailing immediate/address word.
fn resolve(
    syntax: &OperandSyntax,
    symbols: &mut SymbolTable,
    current_addr: u16,
    err_at: &dyn Fn(AsmErrorKind) -> AsmError,
) -> Result<(u8, Option<u16>)> {
    Ok(match syntax {
        OperandSyntax::Bare(idx) => (*idx, None),
        OperandSyntax::ImmediateLit(v) => (isa::IMM, Some(*v)),
        OperandSyntax::IndirectLit(v) => (isa::IND, Some(*v)),
        OperandSyntax::RelLit(v) => (isa::REL, Some(*v)),
        OperandSyntax::StackRel(v) => (isa::STACK_REL, Some(*v)),
        OperandSyntax::ImmediateLabel(name) => {
            let addr = symbols
                .resolve(name)
                .ok_or_else(|| err_at(AsmErrorKind::UnknownSymbol(name.clone())))?;
            (isa::IMM, Some(addr))
        }
        OperandSyntax::IndirectLabel(name) => {
            let addr = symbols
                .resolve(name)
                .ok_or_else(|| err_at(AsmErrorKind::UnknownSymbol(name.clone())))?;
            (isa::IND, Some(addr))
        }
        OperandSyntax::RelLabel(name) => {
            let dst = symbols
                .resolve(name)
                .ok_or_else(|| err_at(AsmErrorKind::UnknownSymbol(name.clone())))?;
            let offset = literal::wrap_u16(0x10000 + dst as i32 - current_addr as i32 - 2);
            (isa::REL, Some(offset))
        }
    })
}

pub fn run(lines: Vec<Line>, symbols: &mut SymbolTable, aliases: &AliasTable, files: &FileTable) -> Result<Vec<EncodedLine>> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let err_at = |kind: AsmErrorKind| AsmError::new(files.path(line.file_ref), line.line_no, kind);
        let code = match &line.body {
            LineBody::Comment => Vec::new(),
            LineBody::WordText(words) | LineBody::ByteText(words) | LineBody::Data(words) => words.clone(),
            LineBody::Code(words) => {
                symbols.set_epoch(line.label_prefix);
                encode_instruction(&line, words, symbols, aliases, &err_at)?
            }
        };
        if code.len() != line.size as usize {
            return Err(err_at(AsmErrorKind::InternalSizeMismatch));
        }
        out.push(EncodedLine { line, code });
    }
    Ok(out)
}

fn encode_instruction(
    line: &Line,
    words: &[String],
    symbols: &mut SymbolTable,
    aliases: &AliasTable,
    err_at: &dyn Fn(AsmErrorKind) -> AsmError,
) -> Result<Vec<u16>> {
    let mnemonic = &words[0];
    let (opcode_idx, entry) = isa::find(mnemonic)
        .ok_or_else(|| err_at(AsmErrorKind::UnknownInstruction(mnemonic.clone())))?;

    let expected = entry.operand_count();
    let found = words.len() - 1;
    if expected != found {
        return Err(err_at(AsmErrorKind::WrongOperandCount {
            mnemonic: mnemonic.clone(),
            expected,
            found,
        }));
    }

    if found == 1 && opcode_idx < isa::SHORT_IMMEDIATE_COUNT {
        let v = literal::parse_value(&words[1]).map_err(|t| err_at(AsmErrorKind::InvalidLiteral(t)))?;
        let num = (v.rem_euclid(1024)) as u16;
        return Ok(vec![(opcode_idx as u16) << 10 | num]);
    }

    let op1 = words.get(1).map(|s| aliases.expand(s).into_owned());
    let op2 = words.get(2).map(|s| aliases.expand(s).into_owned());

    let (mode1, val1) = match &op1 {
        Some(s) => {
            let syn = classify(s, err_at)?;
            let (mode, val) = resolve(&syn, symbols, line.address, err_at)?;
            check_group(entry.group1, mode, err_at)?;
            (mode, val)
        }
        None => (0, None),
    };
    let (mode2, val2) = match &op2 {
        Some(s) => {
            let syn = classify(s, err_at)?;
            let (mode, val) = resolve(&syn, symbols, line.address, err_at)?;
            check_group(entry.group2, mode, err_at)?;
            (mode, val)
        }
        None => (0, None),
    };

    let opcode_word = (opcode_idx as u16) << 10 | (mode1 as u16) << 5 | mode2 as u16;
    let mut code = vec![opcode_word];
    if let Some(v) = val1 {
        code.push(v);
    }
    if let Some(v) = val2 {
        code.push(v);
    }
    Ok(code)
}

fn check_group(group: OperandGroup, mode: u8, err_at: &dyn Fn(AsmErrorKind) -> AsmError) -> Result<()> {
    if matches!(group, OperandGroup::None) {
        return Ok(());
    }
    if isa::group_allows(group, isa::mode_name(mode)) {
        Ok(())
    } else {
        Err(err_at(AsmErrorKind::InvalidOperandType))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;
    use crate::pass1;

    fn assemble(contents: &str) -> Vec<EncodedLine> {
        let dir = std::env::temp_dir().join(format!("vm16asm-pass2-{}-{}", std::process::id(), contents.len()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("t.asm");
        std::fs::write(&path, contents).unwrap();
        let (raw, files) = loader::load(&path).unwrap();
        let p1 = pass1::run(&raw, &files).unwrap();
        let mut symbols = p1.symbols;
        let out = run(p1.lines, &mut symbols, &p1.aliases, &files).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
        out
    }

    fn only_code(lines: &[EncodedLine]) -> &EncodedLine {
        lines.iter().find(|l| matches!(l.line.body, LineBody::Code(_))).unwrap()
    }

    #[test]
    fn nop_encodes_to_zero() {
        let lines = assemble(".code\nnop\n");
        assert_eq!(only_code(&lines).code, vec![0x0000]);
    }

    #[test]
    fn move_register_to_register() {
        let lines = assemble(".code\nmove A, B\n");
        assert_eq!(only_code(&lines).code, vec![0x2001]);
    }

    #[test]
    fn move_with_hex_immediate() {
        let lines = assemble(".code\nmove A, #$1234\n");
        assert_eq!(only_code(&lines).code, vec![0x2010, 0x1234]);
    }

    #[test]
    fn jump_to_label_encodes_immediate_address() {
        let lines = assemble(".code\n.org $0100\nstart: jump start\n");
        assert_eq!(only_code(&lines).code, vec![0x1200, 0x0100]);
    }

    #[test]
    fn local_labels_resolve_to_their_own_epoch() {
        let lines = assemble(
            ".code\nA: loop: jump +loop\nB: loop: jump +loop\n",
        );
        let codes: Vec<&EncodedLine> = lines
            .iter()
            .filter(|l| matches!(l.line.body, LineBody::Code(_)))
            .collect();
        assert_eq!(codes.len(), 2);
        // Each `jump +loop` targets its own line's own address, so both
        // encode the same zero-distance REL offset despite different
        // absolute addresses.
        assert_eq!(codes[0].code[1], codes[1].code[1]);
    }

    #[test]
    fn undefined_symbol_is_fatal() {
        let dir = std::env::temp_dir().join(format!("vm16asm-pass2-undef-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("t.asm");
        std::fs::write(&path, ".code\njump missing\n").unwrap();
        let (raw, files) = loader::load(&path).unwrap();
        let p1 = pass1::run(&raw, &files).unwrap();
        let mut symbols = p1.symbols;
        let err = run(p1.lines, &mut symbols, &p1.aliases, &files).unwrap_err();
        assert!(matches!(err.kind, AsmErrorKind::UnknownSymbol(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_operand_type_is_fatal() {
        let dir = std::env::temp_dir().join(format!("vm16asm-pass2-badop-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("t.asm");
        // `inc` only accepts a DST operand; `[SP+n]` is not in DST.
        std::fs::write(&path, ".code\ninc [SP+1]\n").unwrap();
        let (raw, files) = loader::load(&path).unwrap();
        let p1 = pass1::run(&raw, &files).unwrap();
        let mut symbols = p1.symbols;
        let err = run(p1.lines, &mut symbols, &p1.aliases, &files).unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::InvalidOperandType);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn alias_expansion_preserves_hash_before_classification() {
        let lines = assemble(".code\nCOUNTER = 42\nmove A, #COUNTER\n");
        assert_eq!(only_code(&lines).code, vec![0x2010, 42]);
    }
}
