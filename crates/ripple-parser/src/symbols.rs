//! Scoped symbol table with identifier categories.
//!
//! The parser needs to know, while parsing, whether an identifier names a
//! function, a tuple-typed binding, or a generic parameter: those categories
//! drive the disambiguation of `f(x)` vs `t(0)`, `t.elem`, and generic
//! calls. Scopes nest; lookup returns the innermost binding.
//!
//! Productions that open scopes record [`SymbolTable::depth`] on entry and
//! call [`SymbolTable::truncate`] on every exit path, so the table is
//! balanced even when a production bails out during error recovery.

use rustc_hash::FxHashMap;

/// What kind of thing an identifier was declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Function,
    Tuple,
    GenericParam,
    RangeGenericParam,
    Other,
}

/// A stack of scope frames mapping names to categories.
#[derive(Debug, Default)]
pub struct SymbolTable {
    frames: Vec<FxHashMap<String, IdentKind>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a nested scope.
    pub fn scope(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Close the innermost scope.
    pub fn unscope(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the root scope");
        self.frames.pop();
    }

    /// Pop frames until `depth` frames remain. No-op if already at or below.
    pub fn truncate(&mut self, depth: usize) {
        while self.frames.len() > depth.max(1) {
            self.frames.pop();
        }
    }

    /// Bind `name` in the innermost scope.
    pub fn insert(&mut self, name: &str, kind: IdentKind) {
        self.frames
            .last_mut()
            .expect("symbol table always has a root frame")
            .insert(name.to_string(), kind);
    }

    /// Innermost binding for `name`, if any.
    pub fn get(&self, name: &str) -> Option<IdentKind> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_wins() {
        let mut table = SymbolTable::new();
        table.insert("x", IdentKind::Function);
        table.scope();
        table.insert("x", IdentKind::Tuple);
        assert_eq!(table.get("x"), Some(IdentKind::Tuple));
        table.unscope();
        assert_eq!(table.get("x"), Some(IdentKind::Function));
    }

    #[test]
    fn truncate_restores_depth() {
        let mut table = SymbolTable::new();
        let depth = table.depth();
        table.scope();
        table.scope();
        table.scope();
        table.truncate(depth);
        assert_eq!(table.depth(), depth);
        // Truncate never removes the root frame.
        table.truncate(0);
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn lookup_misses() {
        let table = SymbolTable::new();
        assert_eq!(table.get("nope"), None);
        assert!(!table.contains("nope"));
    }
}
