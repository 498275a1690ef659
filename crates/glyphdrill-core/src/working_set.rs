//! Working set derivation from the active code set.

use crate::catalog::{Symbol, SymbolCatalog};
use crate::types::OrderMode;
use std::collections::{BTreeSet, HashSet};

/// Ordered, deduplicated symbols currently in play.
///
/// No two entries share a code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    symbols: Vec<Symbol>,
}

impl WorkingSet {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn find(&self, code: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    /// Codes in working-set order.
    pub fn codes(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.code.to_string()).collect()
    }

    pub fn code_set(&self) -> BTreeSet<String> {
        self.symbols.iter().map(|s| s.code.to_string()).collect()
    }
}

/// Builds a [`WorkingSet`] from a set of active codes.
#[derive(Debug, Clone, Copy)]
pub struct WorkingSetBuilder<'a> {
    catalog: &'a SymbolCatalog,
}

impl<'a> WorkingSetBuilder<'a> {
    pub fn new(catalog: &'a SymbolCatalog) -> Self {
        Self { catalog }
    }

    /// Walk the catalog once and keep the first entry of each active code.
    ///
    /// Sequential mode keeps catalog order. Random mode sorts by code, which
    /// is only a stable baseline; on-screen order is shuffled per round.
    pub fn build(&self, active_codes: &BTreeSet<String>, order: OrderMode) -> WorkingSet {
        let mut added: HashSet<&str> = HashSet::with_capacity(active_codes.len());
        let mut symbols: Vec<Symbol> = self
            .catalog
            .iter()
            .filter(|s| active_codes.contains(s.code) && added.insert(s.code))
            .copied()
            .collect();

        if order.is_random() {
            symbols.sort_by(|a, b| a.code.cmp(b.code));
        }

        tracing::debug!(
            active = active_codes.len(),
            built = symbols.len(),
            order = %order,
            "Built working set"
        );
        WorkingSet { symbols }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PackChoice;

    fn codes(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sequential_keeps_catalog_order() {
        let builder = WorkingSetBuilder::new(SymbolCatalog::builtin());
        let set = builder.build(&codes(&["03C0", "03B1", "222B"]), OrderMode::Sequential);
        assert_eq!(set.codes(), vec!["03B1", "03C0", "222B"]);
    }

    #[test]
    fn test_random_sorts_by_code() {
        let builder = WorkingSetBuilder::new(SymbolCatalog::builtin());
        let set = builder.build(&codes(&["222B", "03C0", "00B1"]), OrderMode::Random);
        assert_eq!(set.codes(), vec!["00B1", "03C0", "222B"]);
    }

    #[test]
    fn test_duplicate_codes_collapse() {
        let catalog = SymbolCatalog::builtin();
        let all: BTreeSet<String> = catalog
            .pack(PackChoice::All)
            .unwrap()
            .iter()
            .map(|s| s.code.to_string())
            .collect();
        let set = WorkingSetBuilder::new(catalog).build(&all, OrderMode::Sequential);
        assert_eq!(set.len(), 45);
        assert_eq!(set.find("03BC").unwrap().name, "Mu");
    }

    #[test]
    fn test_unknown_codes_skipped() {
        let builder = WorkingSetBuilder::new(SymbolCatalog::builtin());
        let set = builder.build(&codes(&["FFFF", "03B1"]), OrderMode::Sequential);
        assert_eq!(set.len(), 1);
        assert!(set.contains("03B1"));
    }
}
