//! Symbol table with epoch-scoped local labels, and the textual alias
//! table.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::AsmErrorKind;

/// Label namespace shared by pass 1 (which fills it) and pass 2 (which
/// resolves against it). Global labels are unique process-wide; local
/// labels are scoped to the *epoch* active when they were defined, and
/// that epoch bumps every time a global label is defined or referenced.
#[derive(Debug, Default)]
pub struct SymbolTable {
    epoch: u32,
    addrs: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { epoch: 0, addrs: HashMap::new() }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Pass 2 resyncs its running epoch to the value a token froze during
    /// pass 1 before resolving that token's operands.
    pub fn set_epoch(&mut self, epoch: u32) {
        self.epoch = epoch;
    }

    /// A label is local only if it has at least one lower-case letter and
    /// no upper-case letter (mirrors Python's `str.islower()`, which is
    /// `false` for a name with no cased characters at all — so `_1` or
    /// `__` are global, not local).
    pub fn is_local(name: &str) -> bool {
        let has_lower = name.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
        has_lower && !has_upper
    }

    fn local_key(&self, name: &str) -> String {
        format!("{}_{}", self.epoch, name)
    }

    /// Defines `name` at `addr`. Global definitions bump the epoch before
    /// storing, so any local labels that follow attach to a fresh scope.
    pub fn define(&mut self, name: &str, addr: u16) -> Result<(), AsmErrorKind> {
        if Self::is_local(name) {
            let key = self.local_key(name);
            if self.addrs.contains_key(&key) {
                return Err(AsmErrorKind::DuplicateLabel(name.to_string()));
            }
            self.addrs.insert(key, addr);
        } else {
            self.epoch += 1;
            if self.addrs.contains_key(name) {
                return Err(AsmErrorKind::DuplicateLabel(name.to_string()));
            }
            self.addrs.insert(name.to_string(), addr);
        }
        Ok(())
    }

    /// Resolves a reference. A global lookup bumps the epoch first,
    /// mirroring definition order even when the name turns out unknown —
    /// this is what keeps pass 1 and pass 2 walking the same epoch
    /// sequence. Returns `None` if the symbol is undefined; pass 1 treats
    /// that as size-estimation noise, pass 2 turns it into a fatal error.
    pub fn resolve(&mut self, name: &str) -> Option<u16> {
        if Self::is_local(name) {
            let key = self.local_key(name);
            self.addrs.get(&key).copied()
        } else {
            self.epoch += 1;
            self.addrs.get(name).copied()
        }
    }

    /// Global labels, sorted by address, for the console symbol-table
    /// dump.
    pub fn globals_by_address(&self) -> Vec<(&str, u16)> {
        let mut items: Vec<(&str, u16)> = self
            .addrs
            .iter()
            .filter(|(name, _)| !Self::is_local(name))
            .map(|(name, addr)| (name.as_str(), *addr))
            .collect();
        items.sort_by_key(|(_, addr)| *addr);
        items
    }
}

/// Textual substitution table fed by `IDENT = VALUE` lines. Redefinition
/// silently replaces; there is no scoping.
#[derive(Debug, Default)]
pub struct AliasTable(HashMap<String, String>);

impl AliasTable {
    pub fn new() -> Self {
        AliasTable(HashMap::new())
    }

    pub fn define(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }

    /// Plain lookup of the full operand text, used by pass 1's
    /// `operand_size` (which does not special-case a leading `#`).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Pass 2's alias expansion: a `#name` operand expands the part after
    /// the `#` and keeps the `#`, everything else expands directly.
    pub fn expand<'a>(&self, s: &'a str) -> Cow<'a, str> {
        if let Some(rest) = s.strip_prefix('#') {
            if let Some(v) = self.0.get(rest) {
                return Cow::Owned(format!("#{}", v));
            }
        } else if let Some(v) = self.0.get(s) {
            return Cow::Owned(v.clone());
        }
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_no_cased_letters_are_global() {
        assert!(!SymbolTable::is_local("_1"));
        assert!(!SymbolTable::is_local("__"));
        assert!(!SymbolTable::is_local("123"));
    }

    #[test]
    fn names_with_only_lowercase_letters_are_local() {
        assert!(SymbolTable::is_local("loop"));
        assert!(SymbolTable::is_local("l_1"));
    }

    #[test]
    fn global_definition_bumps_epoch() {
        let mut t = SymbolTable::new();
        assert_eq!(t.epoch(), 0);
        t.define("START", 0x100).unwrap();
        assert_eq!(t.epoch(), 1);
    }

    #[test]
    fn duplicate_global_is_an_error() {
        let mut t = SymbolTable::new();
        t.define("START", 0x100).unwrap();
        assert!(t.define("START", 0x200).is_err());
    }

    #[test]
    fn local_labels_scope_by_epoch() {
        let mut t = SymbolTable::new();
        t.define("A", 0x000).unwrap();
        t.define("loop", 0x001).unwrap();
        t.define("B", 0x010).unwrap();
        t.define("loop", 0x011).unwrap();

        t.set_epoch(1);
        assert_eq!(t.resolve("loop"), Some(0x001));
        t.set_epoch(2);
        assert_eq!(t.resolve("loop"), Some(0x011));
    }

    #[test]
    fn unknown_symbol_resolves_to_none() {
        let mut t = SymbolTable::new();
        assert_eq!(t.resolve("MISSING"), None);
    }

    #[test]
    fn alias_expand_preserves_hash_prefix() {
        let mut a = AliasTable::new();
        a.define("COUNTER", "42");
        assert_eq!(a.expand("#COUNTER"), "#42");
        assert_eq!(a.expand("COUNTER"), "42");
        assert_eq!(a.expand("OTHER"), "OTHER");
    }
}
