//! Recursive `$include` loader. Reads the root source file and splices
//! in included files in place, producing one linear token stream tagged
//! with file-of-origin and line number. File identity is interned
//! properly on repeat includes, so the same file included twice reuses
//! one `file_ref` rather than acquiring a second.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AsmError, AsmErrorKind, Result};
use crate::token::{FileTable, RawLine};

static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*\$include\s+"(.+?)""#).unwrap());

/// Loads `path` and every file it (recursively) includes, returning the
/// linear, tagged line stream and the file table built up along the way.
pub fn load(path: &Path) -> Result<(Vec<RawLine>, FileTable)> {
    let mut files = FileTable::new();
    let lines = load_file(path, &mut files)?;
    Ok((lines, files))
}

fn load_file(path: &Path, files: &mut FileTable) -> Result<Vec<RawLine>> {
    if !path.exists() {
        return Err(AsmError::new(path, 0, AsmErrorKind::FileNotFound));
    }
    let file_ref = files.intern(path.to_path_buf());
    let contents = fs::read_to_string(path)
        .map_err(|e| AsmError::new(path, 0, AsmErrorKind::Io(e.to_string())))?;

    let mut lines = Vec::new();
    lines.push(RawLine { file_ref, line_no: 0, line_str: String::new() });
    lines.push(RawLine {
        file_ref,
        line_no: 0,
        line_str: format!(";################ File: {} ################", path.display()),
    });

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for (idx, raw) in contents.lines().enumerate() {
        if let Some(caps) = INCLUDE_RE.captures(raw) {
            let rel = &caps[1];
            println!(" - import {}...", rel);
            let inc_path = base_dir.join(rel);
            lines.extend(load_file(&inc_path, files)?);
        } else {
            lines.push(RawLine { file_ref, line_no: (idx + 1) as u32, line_str: raw.to_string() });
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_root_file_is_fatal() {
        let err = load(Path::new("/nonexistent/path/to/file.asm")).unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::FileNotFound);
    }

    #[test]
    fn single_file_gets_banner_and_lines() {
        let mut f = tempfile_with(".code\nnop\n");
        let (lines, files) = load(f.path()).unwrap();
        assert_eq!(files.0.len(), 1);
        // two banner lines + two content lines
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2].line_str, ".code");
        assert_eq!(lines[3].line_str, "nop");
        let _ = f.flush();
    }

    #[test]
    fn include_is_spliced_and_reported() {
        let dir = std::env::temp_dir().join(format!("vm16asm-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let inc_path = dir.join("inc.asm");
        std::fs::write(&inc_path, "nop\n").unwrap();
        let root_path = dir.join("root.asm");
        std::fs::write(&root_path, "$include \"inc.asm\"\nhalt\n").unwrap();

        let (lines, files) = load(&root_path).unwrap();
        assert_eq!(files.0.len(), 2);
        let strings: Vec<&str> = lines.iter().map(|l| l.line_str.as_str()).collect();
        assert!(strings.contains(&"nop"));
        assert!(strings.contains(&"halt"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn tempfile_with(contents: &str) -> tempfile_shim::NamedTempFile {
        tempfile_shim::NamedTempFile::new(contents)
    }

    /// Minimal stand-in so loader tests don't need a `tempfile` dev
    /// dependency for a single-file fixture.
    mod tempfile_shim {
        use std::fs;
        use std::path::{Path, PathBuf};

        pub struct NamedTempFile {
            path: PathBuf,
        }

        impl NamedTempFile {
            pub fn new(contents: &str) -> Self {
                let path = std::env::temp_dir().join(format!(
                    "vm16asm-test-{}-{}.asm",
                    std::process::id(),
                    contents.len()
                ));
                fs::write(&path, contents).unwrap();
                NamedTempFile { path }
            }

            pub fn path(&self) -> &Path {
                &self.path
            }

            pub fn flush(&self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl Drop for NamedTempFile {
            fn drop(&mut self) {
                let _ = fs::remove_file(&self.path);
            }
        }
    }
}
