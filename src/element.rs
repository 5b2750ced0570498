//! Periodic-table symbol lookup.
//!
//! Only what SMARTS and Molfile text need: symbol ↔ atomic number, the
//! organic subset that may be written without brackets, and the symbols
//! that have an aromatic (lowercase) spelling.

static SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Lowercase spellings accepted inside brackets, two-letter forms first so a
/// greedy scan picks `se` before `s`.
pub(crate) static AROMATIC_BRACKET: [(&str, u8); 9] = [
    ("se", 34),
    ("as", 33),
    ("te", 52),
    ("b", 5),
    ("c", 6),
    ("n", 7),
    ("o", 8),
    ("p", 15),
    ("s", 16),
];

pub const MAX_ATOMIC_NUM: u8 = 118;

/// Returns the atomic number for a case-sensitive symbol (`"Cl"` → 17).
pub fn atomic_num_from_symbol(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as u8 + 1)
}

/// Returns the capitalized symbol for an atomic number in `1..=118`.
pub fn symbol(atomic_num: u8) -> Option<&'static str> {
    if atomic_num == 0 {
        return None;
    }
    SYMBOLS.get(atomic_num as usize - 1).copied()
}

/// Elements that SMARTS allows outside brackets in their aliphatic form.
pub fn is_organic_subset(atomic_num: u8) -> bool {
    matches!(atomic_num, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
}

/// Elements that SMARTS allows outside brackets in their aromatic form.
pub fn is_bare_aromatic(atomic_num: u8) -> bool {
    matches!(atomic_num, 5 | 6 | 7 | 8 | 15 | 16)
}

/// Elements with a lowercase spelling inside brackets.
pub fn has_aromatic_symbol(atomic_num: u8) -> bool {
    AROMATIC_BRACKET.iter().any(|&(_, n)| n == atomic_num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_lookup_round_trips() {
        for n in 1..=MAX_ATOMIC_NUM {
            let sym = symbol(n).unwrap();
            assert_eq!(atomic_num_from_symbol(sym), Some(n), "{sym}");
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(atomic_num_from_symbol("Cl"), Some(17));
        assert_eq!(atomic_num_from_symbol("cl"), None);
        assert_eq!(atomic_num_from_symbol("CL"), None);
    }

    #[test]
    fn out_of_range() {
        assert_eq!(symbol(0), None);
        assert_eq!(symbol(119), None);
    }

    #[test]
    fn organic_subset() {
        assert!(is_organic_subset(6));
        assert!(is_organic_subset(35));
        assert!(!is_organic_subset(1));
        assert!(!is_organic_subset(26));
    }

    #[test]
    fn aromatic_spellings() {
        assert!(is_bare_aromatic(5));
        assert!(!is_bare_aromatic(34));
        assert!(has_aromatic_symbol(34));
        assert!(!has_aromatic_symbol(9));
    }
}
