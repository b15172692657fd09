//! Symbol table for labels and equates
//!
//! Labels and equates share one case-insensitive namespace: a name may be defined once,
//! as one or the other. Each kind has its own fixed capacity.

use crate::assembler::{Symbol, SymbolKind};

/// Why a definition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineError {
    /// The name is already taken; carries the existing entry.
    Duplicate(Symbol),
    /// The table for this kind is at capacity.
    Full(SymbolKind),
}

/// Labels and equates collected during pass 1.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    max_labels: usize,
    max_equates: usize,
}

impl SymbolTable {
    /// Creates an empty table with the given capacities.
    pub fn new(max_labels: usize, max_equates: usize) -> Self {
        Self {
            symbols: Vec::new(),
            max_labels,
            max_equates,
        }
    }

    /// Adds a symbol.
    ///
    /// Returns `Err(DefineError::Duplicate(existing))` if the name is already defined
    /// as either kind, or `Err(DefineError::Full(kind))` at capacity.
    pub fn add_symbol(
        &mut self,
        name: String,
        kind: SymbolKind,
        value: i64,
        defined_at: usize,
    ) -> Result<(), DefineError> {
        if let Some(existing) = self.lookup_symbol(&name) {
            return Err(DefineError::Duplicate(existing.clone()));
        }

        let (count, max) = match kind {
            SymbolKind::Label => (self.label_count(), self.max_labels),
            SymbolKind::Equate => (self.equate_count(), self.max_equates),
        };
        if count >= max {
            return Err(DefineError::Full(kind));
        }

        self.symbols.push(Symbol {
            name,
            kind,
            value,
            defined_at,
        });
        Ok(())
    }

    /// Looks up a symbol by name, ignoring case.
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// All symbols in definition order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of labels defined.
    pub fn label_count(&self) -> usize {
        self.count(SymbolKind::Label)
    }

    /// Number of equates defined.
    pub fn equate_count(&self) -> usize {
        self.count(SymbolKind::Equate)
    }

    fn count(&self, kind: SymbolKind) -> usize {
        self.symbols.iter().filter(|s| s.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table_add_lookup() {
        let mut table = SymbolTable::new(8, 8);

        assert!(table
            .add_symbol("START".to_string(), SymbolKind::Label, 0x0200, 1)
            .is_ok());
        assert!(table
            .add_symbol("Count".to_string(), SymbolKind::Equate, -1, 2)
            .is_ok());

        let start = table.lookup_symbol("start").unwrap();
        assert_eq!(start.name, "START");
        assert_eq!(start.value, 0x0200);

        assert_eq!(table.lookup_symbol("COUNT").unwrap().value, -1);
        assert!(table.lookup_symbol("UNDEFINED").is_none());
        assert_eq!(table.label_count(), 1);
        assert_eq!(table.equate_count(), 1);
    }

    #[test]
    fn test_symbol_table_duplicate_across_kinds() {
        let mut table = SymbolTable::new(8, 8);

        table
            .add_symbol("LOOP".to_string(), SymbolKind::Label, 0x10, 1)
            .unwrap();
        let result = table.add_symbol("loop".to_string(), SymbolKind::Equate, 5, 9);
        match result {
            Err(DefineError::Duplicate(existing)) => assert_eq!(existing.defined_at, 1),
            other => panic!("expected duplicate, got {:?}", other),
        }

        // Original symbol should still be there
        assert_eq!(table.lookup_symbol("LOOP").unwrap().value, 0x10);
    }

    #[test]
    fn test_capacity_is_per_kind() {
        let mut table = SymbolTable::new(1, 1);
        table
            .add_symbol("A1".to_string(), SymbolKind::Label, 0, 1)
            .unwrap();
        assert_eq!(
            table.add_symbol("A2".to_string(), SymbolKind::Label, 0, 2),
            Err(DefineError::Full(SymbolKind::Label))
        );
        assert!(table
            .add_symbol("E1".to_string(), SymbolKind::Equate, 0, 3)
            .is_ok());
    }
}
