/// Target atom for SMARTS matching.
///
/// `Atom` carries the properties a SMARTS primitive can ask about. Ring and
/// hydrogen perception are not done here: the caller that builds the target
/// molecule (a SMILES or Molfile reader, or a toolkit binding) fills these
/// fields in.
///
/// # Examples
///
/// ```
/// use smartscrab::Atom;
///
/// let methyl = Atom {
///     atomic_num: 6,
///     total_h_count: 3,
///     implicit_h_count: 3,
///     degree: 1,
///     valence: 4,
///     ..Atom::default()
/// };
/// assert!(!methyl.is_in_ring());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, …).
    pub atomic_num: u8,
    pub is_aromatic: bool,
    pub formal_charge: i8,
    /// Mass number. `0` means natural abundance.
    pub isotope: u16,
    /// Implicit plus explicit hydrogens (`H`).
    pub total_h_count: u8,
    /// Implicit hydrogens only (`h`).
    pub implicit_h_count: u8,
    /// Explicit connections in the graph (`D`).
    pub degree: u8,
    /// Sum of bond orders including hydrogens (`v`).
    pub valence: u8,
    /// Number of SSSR rings containing the atom (`R`).
    pub ring_membership: u8,
    /// Size of the smallest SSSR ring containing the atom (`r`).
    pub smallest_ring_size: Option<u8>,
    /// Number of ring bonds on the atom (`x`).
    pub ring_bond_count: u8,
}

impl Atom {
    pub fn is_in_ring(&self) -> bool {
        self.ring_membership > 0 || self.smallest_ring_size.is_some()
    }

    /// Degree plus implicit hydrogens (`X`).
    pub fn connectivity(&self) -> u8 {
        self.degree.saturating_add(self.implicit_h_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_saturates() {
        let atom = Atom {
            degree: 200,
            implicit_h_count: 100,
            ..Atom::default()
        };
        assert_eq!(atom.connectivity(), u8::MAX);
    }
}
