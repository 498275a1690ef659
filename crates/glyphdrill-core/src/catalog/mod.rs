//! Static symbol registry.
//!
//! A symbol's 4-digit hex code is its identity. The same code may appear in
//! several packs (μ is both "Mu" and "Mu (Mean)"); anything derived from the
//! catalog collapses duplicates by code.

mod packs;

use crate::error::{GlyphError, GlyphResult};
use crate::types::OrderMode;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

static BUILTIN: Lazy<SymbolCatalog> = Lazy::new(|| SymbolCatalog::new(packs::builtin_packs()));

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{4}$").expect("valid code regex"));

/// A typeable symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol {
    pub glyph: &'static str,
    pub name: &'static str,
    /// Canonical uppercase 4-digit hex input code.
    pub code: &'static str,
}

impl Symbol {
    pub const fn new(glyph: &'static str, name: &'static str, code: &'static str) -> Self {
        Self { glyph, name, code }
    }
}

/// Pack selection, including the aggregate of every pack.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PackChoice {
    #[default]
    BasicGreek,
    AdvancedCalculus,
    Statistics,
    LogicAndSets,
    /// Every pack concatenated in catalog order.
    All,
}

/// A named list of symbols.
#[derive(Debug, Clone)]
pub struct SymbolPack {
    pub id: PackChoice,
    pub title: &'static str,
    pub symbols: &'static [Symbol],
}

impl SymbolPack {
    pub fn new(id: PackChoice, title: &'static str, symbols: &'static [Symbol]) -> Self {
        Self { id, title, symbols }
    }
}

/// Read-only registry of symbol packs.
#[derive(Debug, Clone)]
pub struct SymbolCatalog {
    packs: Vec<SymbolPack>,
}

impl SymbolCatalog {
    /// Build a catalog from explicit packs, kept in the given order.
    pub fn new(packs: Vec<SymbolPack>) -> Self {
        Self { packs }
    }

    /// The built-in catalog.
    pub fn builtin() -> &'static SymbolCatalog {
        &BUILTIN
    }

    pub fn packs(&self) -> &[SymbolPack] {
        &self.packs
    }

    /// Every symbol in pack order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.packs.iter().flat_map(|p| p.symbols.iter())
    }

    /// Symbols of one pack, or of every pack for [`PackChoice::All`].
    pub fn pack(&self, choice: PackChoice) -> GlyphResult<Vec<Symbol>> {
        if choice == PackChoice::All {
            return Ok(self.iter().copied().collect());
        }
        self.packs
            .iter()
            .find(|p| p.id == choice)
            .map(|p| p.symbols.to_vec())
            .ok_or_else(|| GlyphError::unknown_pack(choice.to_string()))
    }

    /// Number of distinct codes in a pack.
    pub fn distinct_len(&self, choice: PackChoice) -> GlyphResult<usize> {
        let mut seen = HashSet::new();
        Ok(self
            .pack(choice)?
            .iter()
            .filter(|s| seen.insert(s.code))
            .count())
    }

    /// First catalog entry for a code.
    pub fn lookup(&self, code: &str) -> GlyphResult<Symbol> {
        let code = normalize_code(code)?;
        self.iter()
            .find(|s| s.code == code)
            .copied()
            .ok_or_else(|| GlyphError::not_found(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.iter().any(|s| s.code.eq_ignore_ascii_case(code))
    }

    /// Choose the initial active codes for a new session.
    ///
    /// Sequential mode takes the first `size` distinct codes of the pack;
    /// random mode samples `size` of them uniformly. `size` is clamped to
    /// `[minimum, distinct pack size]`.
    pub fn initial_active_codes<R: Rng + ?Sized>(
        &self,
        choice: PackChoice,
        size: usize,
        minimum: usize,
        order: OrderMode,
        rng: &mut R,
    ) -> GlyphResult<BTreeSet<String>> {
        let mut seen = HashSet::new();
        let mut distinct: Vec<&'static str> = self
            .pack(choice)?
            .iter()
            .map(|s| s.code)
            .filter(|c| seen.insert(*c))
            .collect();

        if distinct.len() < minimum {
            return Err(GlyphError::set_too_small(distinct.len(), minimum));
        }
        let size = size.clamp(minimum, distinct.len());

        if order.is_random() {
            distinct.shuffle(rng);
        }
        Ok(distinct
            .into_iter()
            .take(size)
            .map(str::to_string)
            .collect())
    }

    /// All pack choices a UI can offer.
    pub fn choices() -> impl Iterator<Item = PackChoice> {
        PackChoice::iter()
    }
}

/// Canonicalize a user-supplied code to 4 uppercase hex digits.
pub fn normalize_code(raw: &str) -> GlyphResult<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("U+")
        .or_else(|| trimmed.strip_prefix("u+"))
        .unwrap_or(trimmed);
    if CODE_PATTERN.is_match(trimmed) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(GlyphError::invalid_code(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::str::FromStr;

    #[test]
    fn test_builtin_pack_sizes() {
        let catalog = SymbolCatalog::builtin();
        assert_eq!(catalog.pack(PackChoice::BasicGreek).unwrap().len(), 21);
        assert_eq!(catalog.pack(PackChoice::AdvancedCalculus).unwrap().len(), 10);
        assert_eq!(catalog.pack(PackChoice::Statistics).unwrap().len(), 9);
        assert_eq!(catalog.pack(PackChoice::LogicAndSets).unwrap().len(), 8);
        assert_eq!(catalog.pack(PackChoice::All).unwrap().len(), 48);
    }

    #[test]
    fn test_all_pack_distinct_codes() {
        // μ, σ and λ appear in both Greek and Statistics.
        let catalog = SymbolCatalog::builtin();
        assert_eq!(catalog.distinct_len(PackChoice::All).unwrap(), 45);
    }

    #[test]
    fn test_codes_are_canonical() {
        for symbol in SymbolCatalog::builtin().iter() {
            assert_eq!(normalize_code(symbol.code).unwrap(), symbol.code);
        }
    }

    #[test]
    fn test_lookup_prefers_first_pack() {
        let mu = SymbolCatalog::builtin().lookup("03bc").unwrap();
        assert_eq!(mu.name, "Mu");
        assert!(SymbolCatalog::builtin().lookup("FFFF").is_err());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("u+03b1").unwrap(), "03B1");
        assert!(normalize_code("03G1").is_err());
        assert!(normalize_code("3B1").is_err());
    }

    #[test]
    fn test_initial_codes_sequential() {
        let mut rng = StdRng::seed_from_u64(7);
        let codes = SymbolCatalog::builtin()
            .initial_active_codes(PackChoice::BasicGreek, 3, 3, OrderMode::Sequential, &mut rng)
            .unwrap();
        let expected: BTreeSet<String> = ["03B1", "03B2", "03B3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn test_initial_codes_clamped() {
        let mut rng = StdRng::seed_from_u64(7);
        let catalog = SymbolCatalog::builtin();
        let codes = catalog
            .initial_active_codes(PackChoice::LogicAndSets, 50, 3, OrderMode::Random, &mut rng)
            .unwrap();
        assert_eq!(codes.len(), 8);
        let codes = catalog
            .initial_active_codes(PackChoice::LogicAndSets, 1, 3, OrderMode::Random, &mut rng)
            .unwrap();
        assert_eq!(codes.len(), 3);
    }

    #[test]
    fn test_pack_choice_names() {
        assert_eq!(PackChoice::LogicAndSets.to_string(), "logic-and-sets");
        assert_eq!(PackChoice::from_str("all").unwrap(), PackChoice::All);
        assert_eq!(SymbolCatalog::choices().count(), 5);
    }
}
