//! Output emitters: listing, hex-word dump and the H16 sparse record
//! file. Each takes a generic [`std::io::Write`] plus a `_file`
//! convenience wrapper for writing straight to disk.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::locater::{MemoryImage, EMPTY};
use crate::token::{EncodedLine, LineBody};

/// Writes the human-readable listing: comments reproduce the source line
/// verbatim; code/text lines print `<addr>: <words>` padded to an
/// 18-column code field, followed by the original source line.
pub fn write_listing<W: Write>(w: &mut W, lines: &[EncodedLine]) -> io::Result<()> {
    for line in lines {
        match &line.line.body {
            LineBody::Comment => {
                writeln!(w, "{}", line.line.line_str.trim_end())?;
            }
            LineBody::Code(_) => {
                let code = hex_word_list(&line.code);
                writeln!(w, "{:04X}: {:<18} {}", line.line.address, code, line.line.line_str.trim_end())?;
            }
            LineBody::WordText(_) | LineBody::ByteText(_) => {
                let code = hex_word_list(&line.code);
                writeln!(w, "{}", line.line.line_str.trim_end())?;
                writeln!(w, "{:04X}: {}", line.line.address, code)?;
            }
            // `.data` lines contribute no listing output.
            LineBody::Data(_) => {}
        }
    }
    Ok(())
}

fn hex_word_list(words: &[u16]) -> String {
    words.iter().map(|w| format!("{:04X}", w)).collect::<Vec<_>>().join(", ")
}

pub fn write_listing_file<P: AsRef<Path>>(path: P, lines: &[EncodedLine]) -> io::Result<()> {
    write_listing(&mut BufWriter::new(File::create(path)?), lines)
}

/// Writes every memory cell from `start` to `end` as an uppercase 4-digit
/// hex word, space-separated. Sentinel cells print as `0000`.
pub fn write_hex_dump<W: Write>(w: &mut W, mem: &MemoryImage) -> io::Result<()> {
    let words: Vec<String> = mem
        .cells
        .iter()
        .map(|&v| format!("{:04X}", if v == EMPTY { 0 } else { v as u16 }))
        .collect();
    write!(w, "{}", words.join(" "))
}

pub fn write_hex_dump_file<P: AsRef<Path>>(path: P, mem: &MemoryImage) -> io::Result<()> {
    write_hex_dump(&mut BufWriter::new(File::create(path)?), mem)
}

const ROW_SIZE: usize = 8;

/// Writes the H16 record file: memory is scanned in 8-word rows, each row
/// split at runs of sentinel cells so records only ever contain populated
/// words and never cross a row boundary, terminated by `:0000001`.
pub fn write_h16<W: Write>(w: &mut W, mem: &MemoryImage) -> io::Result<()> {
    let mut idx = 0usize;
    while idx < mem.cells.len() {
        let row_end = (idx + ROW_SIZE).min(mem.cells.len());
        let row = &mem.cells[idx..row_end];

        let mut i1 = 0usize;
        while i1 < row.len() {
            let valid_start = match row[i1..].iter().position(|&v| v != EMPTY) {
                Some(p) => i1 + p,
                None => break,
            };
            let run_len = row[valid_start..].iter().take_while(|&&v| v != EMPTY).count();
            let run = &row[valid_start..valid_start + run_len];
            write_record(w, mem.start as u32 + idx as u32 + valid_start as u32, run)?;
            i1 = valid_start + run_len;
        }
        idx += ROW_SIZE;
    }
    writeln!(w, ":0000001")
}

fn write_record<W: Write>(w: &mut W, addr: u32, words: &[i32]) -> io::Result<()> {
    write!(w, ":{:X}{:04X}00", words.len(), addr & 0xFFFF)?;
    for &v in words {
        write!(w, "{:04X}", v as u16)?;
    }
    writeln!(w)
}

pub fn write_h16_file<P: AsRef<Path>>(path: P, mem: &MemoryImage) -> io::Result<()> {
    write_h16(&mut BufWriter::new(File::create(path)?), mem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(start: u16, cells: Vec<i32>) -> MemoryImage {
        MemoryImage { start, cells }
    }

    fn code_line(addr: u16, code: Vec<u16>, line_str: &str) -> EncodedLine {
        use crate::token::Line;
        EncodedLine {
            line: Line {
                file_ref: 0,
                line_no: 1,
                line_str: line_str.to_string(),
                label_prefix: 0,
                address: addr,
                size: code.len() as u16,
                body: LineBody::Code(vec!["move".to_string()]),
            },
            code,
        }
    }

    #[test]
    fn listing_pads_code_column_to_18_and_keeps_source() {
        let lines = vec![code_line(0, vec![0x2001], "    move A, B")];
        let mut out = Vec::new();
        write_listing(&mut out, &lines).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{:04X}: {:<18} {}\n", 0, "2001", "    move A, B")
        );
    }

    #[test]
    fn data_lines_produce_no_listing_output() {
        use crate::token::Line;
        let lines = vec![EncodedLine {
            line: Line {
                file_ref: 0,
                line_no: 1,
                line_str: "1 2 3".to_string(),
                label_prefix: 0,
                address: 0,
                size: 3,
                body: LineBody::Data(vec![1, 2, 3]),
            },
            code: vec![1, 2, 3],
        }];
        let mut out = Vec::new();
        write_listing(&mut out, &lines).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn hex_dump_replaces_sentinel_with_zero() {
        let mem = image(0, vec![1, EMPTY, 3]);
        let mut out = Vec::new();
        write_hex_dump(&mut out, &mem).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0001 0000 0003");
    }

    #[test]
    fn h16_splits_runs_and_terminates() {
        // populated at 0,1,4,5,6 and sentinels at 2,3 -> two records
        let mem = image(0, vec![0xAAAA, 0xBBBB, EMPTY, EMPTY, 0xCCCC, 0xDDDD, 0xEEEE]);
        let mut out = Vec::new();
        write_h16(&mut out, &mem).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut records = text.lines();
        assert_eq!(records.next().unwrap(), ":2000000AAAABBBB");
        assert_eq!(records.next().unwrap(), ":3000400CCCCDDDDEEEE");
        assert_eq!(records.next().unwrap(), ":0000001");
        assert_eq!(records.next(), None);
    }

    #[test]
    fn h16_never_crosses_a_row_boundary() {
        // 9 contiguous populated words: row 0 (8 words) then row 1 (1 word).
        let mem = image(0, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let mut out = Vec::new();
        write_h16(&mut out, &mem).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut records = text.lines();
        assert_eq!(records.next().unwrap(), ":800000000010002000300040005000600070008");
        assert_eq!(records.next().unwrap(), ":10008000009");
        assert_eq!(records.next().unwrap(), ":0000001");
        assert_eq!(records.next(), None);
    }
}
