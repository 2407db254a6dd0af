//! Pass 1: lexical scan, symbol collection and instruction sizing.
//!
//! Label parsing loops, stripping every `IDENT:` prefix a line starts
//! with, so more than one label (global or local) may share a line —
//! e.g. `A: loop: jump +loop`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AsmError, AsmErrorKind, Result};
use crate::isa;
use crate::literal;
use crate::symbols::{AliasTable, SymbolTable};
use crate::token::{FileTable, Line, LineBody, RawLine};

static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z_0-9]*):").unwrap());
static ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z_0-9]*)\s*=\s*(\S+)").unwrap());

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Segment {
    Code,
    WordText,
    ByteText,
    Data,
}

/// Result of a full pass-1 scan: sized, addressed lines plus the symbol
/// and alias tables they were scanned against.
pub struct Pass1Output {
    pub lines: Vec<Line>,
    pub symbols: SymbolTable,
    pub aliases: AliasTable,
}

pub fn run(raw_lines: &[RawLine], files: &FileTable) -> Result<Pass1Output> {
    let mut segment = Segment::Code;
    let mut addr: u16 = 0;
    let mut symbols = SymbolTable::new();
    let mut aliases = AliasTable::new();
    let mut lines = Vec::with_capacity(raw_lines.len());

    for raw in raw_lines {
        let err_at = |kind: AsmErrorKind| AsmError::new(files.path(raw.file_ref), raw.line_no, kind);

        let without_comment = match raw.line_str.find(';') {
            Some(idx) => &raw.line_str[..idx],
            None => raw.line_str.as_str(),
        };
        let normalized = without_comment.replace(',', " ").replace('\t', " ");
        let normalized = normalized.trim_end().to_string();

        if normalized.trim().is_empty() {
            lines.push(comment_line(raw, &symbols));
            continue;
        }

        if parse_directive(&normalized, &mut segment, &mut addr, &err_at)? {
            continue;
        }

        if let Some(caps) = ALIAS_RE.captures(&normalized) {
            aliases.define(&caps[1], &caps[2]);
            continue;
        }

        let mut rest = normalized.as_str();
        let mut had_label = false;
        while let Some(caps) = LABEL_RE.captures(rest) {
            let name = caps.get(1).unwrap().as_str().to_string();
            symbols.define(&name, addr).map_err(&err_at)?;
            rest = &rest[caps.get(0).unwrap().end()..];
            had_label = true;
        }
        let rest = rest.trim();
        if had_label && rest.is_empty() {
            lines.push(comment_line(raw, &symbols));
            continue;
        }

        let label_prefix = symbols.epoch();

        let (body, size) = match segment {
            Segment::WordText => {
                let words = decode_word_text(rest);
                let size = words.len() as u16;
                (LineBody::WordText(words), size)
            }
            Segment::ByteText => {
                let words = decode_byte_text(rest);
                let size = words.len() as u16;
                (LineBody::ByteText(words), size)
            }
            Segment::Data => {
                let mut words = Vec::new();
                for lit in rest.split_whitespace() {
                    let v = literal::parse_value(lit).map_err(|s| err_at(AsmErrorKind::InvalidLiteral(s)))?;
                    words.push(literal::wrap_u16(v));
                }
                let size = words.len() as u16;
                (LineBody::Data(words), size)
            }
            Segment::Code => {
                let mut words: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                let mnemonic = words.first().cloned().unwrap_or_default();
                let (opcode_idx, _) = isa::find(&mnemonic)
                    .ok_or_else(|| err_at(AsmErrorKind::UnknownInstruction(rest.to_string())))?;

                let size = if words.len() == 2 && opcode_idx < isa::SHORT_IMMEDIATE_COUNT {
                    1
                } else {
                    jump_target_correction(&mut words);
                    let op1 = words.get(1).map(String::as_str);
                    let op2 = words.get(2).map(String::as_str);
                    1 + operand_size(op1, &aliases) + operand_size(op2, &aliases)
                };
                (LineBody::Code(words), size)
            }
        };

        let line = Line {
            file_ref: raw.file_ref,
            line_no: raw.line_no,
            line_str: raw.line_str.clone(),
            label_prefix,
            address: addr,
            size,
            body,
        };
        addr = addr.wrapping_add(size);
        lines.push(line);
    }

    Ok(Pass1Output { lines, symbols, aliases })
}

fn comment_line(raw: &RawLine, symbols: &SymbolTable) -> Line {
    Line {
        file_ref: raw.file_ref,
        line_no: raw.line_no,
        line_str: raw.line_str.clone(),
        label_prefix: symbols.epoch(),
        address: 0,
        size: 0,
        body: LineBody::Comment,
    }
}

fn parse_directive(
    normalized: &str,
    segment: &mut Segment,
    addr: &mut u16,
    err_at: &dyn Fn(AsmErrorKind) -> AsmError,
) -> Result<bool> {
    let mut words = normalized.split_whitespace();
    let first = match words.next() {
        Some(w) => w,
        None => return Ok(false),
    };
    match first {
        ".code" => {
            *segment = Segment::Code;
            Ok(true)
        }
        ".data" => {
            *segment = Segment::Data;
            Ok(true)
        }
        ".text" => {
            *segment = Segment::WordText;
            Ok(true)
        }
        ".btext" => {
            *segment = Segment::ByteText;
            Ok(true)
        }
        ".org" => {
            let arg = words
                .next()
                .ok_or_else(|| err_at(AsmErrorKind::InvalidLiteral(normalized.to_string())))?;
            let value = literal::parse_value(arg).map_err(|s| err_at(AsmErrorKind::InvalidLiteral(s)))?;
            *addr = literal::wrap_u16(value);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Auto-applies the `#` immediate prefix to a bare jump/branch target, the
/// way `operand_correction` does in the original.
fn jump_target_correction(words: &mut [String]) {
    if words.is_empty() || !isa::JUMP_INSTRUCTIONS.contains(&words[0].as_str()) {
        return;
    }
    let last = words.len() - 1;
    if last >= 1 {
        let starts_prefixed = words[last].starts_with(|c: char| matches!(c, '#' | '+' | '-'));
        if !starts_prefixed {
            words[last] = format!("#{}", words[last]);
        }
    }
}

/// 0 for an absent operand, a register/indirect/short-constant name (after
/// alias expansion), else 1 — matching `AsmPass1.operand_size` exactly,
/// including its alias lookup on the raw (un-`#`-stripped) text.
fn operand_size(op: Option<&str>, aliases: &AliasTable) -> u16 {
    let op = match op {
        None => return 0,
        Some(s) => s,
    };
    let resolved = aliases.get(op).unwrap_or(op);
    if matches!(resolved, "#0" | "#1" | "#$0" | "#$1") {
        return 0;
    }
    if resolved.starts_with(|c: char| matches!(c, '#' | '+' | '-')) {
        return 1;
    }
    if isa::bare_mode(resolved).is_some() {
        return 0;
    }
    1
}

fn expand_escapes(s: &str) -> String {
    s.replace("\\0", "\0").replace("\\n", "\n")
}

fn decode_word_text(raw: &str) -> Vec<u16> {
    let s = expand_escapes(raw);
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].chars().map(|c| c as u16).collect()
    } else {
        log::warn!("malformed quoted string '{}', treated as empty", raw);
        Vec::new()
    }
}

fn decode_byte_text(raw: &str) -> Vec<u16> {
    let s = expand_escapes(raw);
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let inner: Vec<char> = s[1..s.len() - 1].chars().collect();
        let mut out = Vec::with_capacity((inner.len() + 1) / 2);
        let mut i = 0;
        while i < inner.len() {
            let lo = inner[i] as u16;
            let hi = inner.get(i + 1).copied().unwrap_or(' ') as u16;
            out.push(lo | (hi << 8));
            i += 2;
        }
        out
    } else {
        log::warn!("malformed quoted string '{}', treated as empty", raw);
        Vec::new()
    }
}
