//! Built-in symbol packs.

use super::{PackChoice, Symbol, SymbolPack};

const BASIC_GREEK: &[Symbol] = &[
    Symbol::new("α", "Alpha", "03B1"),
    Symbol::new("β", "Beta", "03B2"),
    Symbol::new("γ", "Gamma", "03B3"),
    Symbol::new("Δ", "Delta (uppercase)", "0394"),
    Symbol::new("λ", "Lambda", "03BB"),
    Symbol::new("π", "Pi", "03C0"),
    Symbol::new("Φ", "Phi (uppercase)", "03A6"),
    Symbol::new("σ", "Sigma", "03C3"),
    Symbol::new("Ω", "Omega (uppercase)", "03A9"),
    Symbol::new("μ", "Mu", "03BC"),
    Symbol::new("Γ", "Gamma (uppercase)", "0393"),
    Symbol::new("Θ", "Theta (uppercase)", "0398"),
    Symbol::new("Λ", "Lambda (uppercase)", "039B"),
    Symbol::new("Σ", "Sigma (uppercase)", "03A3"),
    Symbol::new("Ψ", "Psi (uppercase)", "03A8"),
    Symbol::new("δ", "Delta", "03B4"),
    Symbol::new("θ", "Theta", "03B8"),
    Symbol::new("ψ", "Psi", "03C8"),
    Symbol::new("ω", "Omega", "03C9"),
    Symbol::new("ε", "Epsilon", "03B5"),
    Symbol::new("ϕ", "Phi (loopy)", "03D5"),
];

const ADVANCED_CALCULUS: &[Symbol] = &[
    Symbol::new("∫", "Integral", "222B"),
    Symbol::new("∬", "Double Integral", "222C"),
    Symbol::new("∭", "Triple Integral", "222D"),
    Symbol::new("∂", "Partial Differential", "2202"),
    Symbol::new("∞", "Infinity", "221E"),
    Symbol::new("∑", "Summation", "2211"),
    Symbol::new("∏", "Product", "220F"),
    Symbol::new("√", "Square Root", "221A"),
    Symbol::new("≈", "Approximately Equal", "2248"),
    Symbol::new("≤", "Less Or Equal", "2264"),
];

const STATISTICS: &[Symbol] = &[
    Symbol::new("μ", "Mu (Mean)", "03BC"),
    Symbol::new("σ", "Sigma (Std Dev)", "03C3"),
    Symbol::new("ρ", "Rho (Correlation)", "03C1"),
    Symbol::new("ν", "Nu", "03BD"),
    Symbol::new("τ", "Tau", "03C4"),
    Symbol::new("χ", "Chi", "03C7"),
    Symbol::new("λ", "Lambda", "03BB"),
    Symbol::new("±", "Plus Minus", "00B1"),
    Symbol::new("≠", "Not Equal", "2260"),
];

const LOGIC_AND_SETS: &[Symbol] = &[
    Symbol::new("∈", "Element Of", "2208"),
    Symbol::new("∃", "There Exists", "2203"),
    Symbol::new("∀", "For All", "2200"),
    Symbol::new("⊨", "Entails (semantic consequence)", "22A8"),
    Symbol::new("ℝ", "Real Numbers (double-struck R)", "211D"),
    Symbol::new("∪", "Union", "222A"),
    Symbol::new("∩", "Intersection", "2229"),
    Symbol::new("‾", "Combining Overline (type after base)", "0305"),
];

pub(super) fn builtin_packs() -> Vec<SymbolPack> {
    vec![
        SymbolPack::new(PackChoice::BasicGreek, "Basic Greek", BASIC_GREEK),
        SymbolPack::new(PackChoice::AdvancedCalculus, "Advanced Calculus", ADVANCED_CALCULUS),
        SymbolPack::new(PackChoice::Statistics, "Statistics", STATISTICS),
        SymbolPack::new(PackChoice::LogicAndSets, "Logic & Sets", LOGIC_AND_SETS),
    ]
}
