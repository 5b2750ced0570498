use std::collections::{HashMap, HashSet};

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;

use super::error::{SmartsError, StructuralErrorKind};

/// Which spelling of logical AND joined the operands.
///
/// All three mean AND; they differ in precedence (`Low` binds loosest) and
/// in how the expression is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AndOp {
    /// Juxtaposition, as in `[CH2]`.
    Implicit,
    /// `&`
    High,
    /// `;`
    Low,
}

impl AndOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AndOp::Implicit => "",
            AndOp::High => "&",
            AndOp::Low => ";",
        }
    }
}

/// How a charge primitive was spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargeNotation {
    /// Sign followed by a magnitude: `+2`, `-1`, `+0`.
    Signed,
    /// Repeated sign without a magnitude: `+`, `--`.
    Repeated,
}

/// AST node for a SMARTS atom query expression.
///
/// The tree keeps the exact shape the parser saw: operator spelling, missing
/// counts and charge notation are all recorded so the writer can reproduce
/// the input text. [`AtomExpr::matches`] evaluates it against a target atom.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    /// Any atom (`*`).
    True,
    /// Matches by element. `aromatic` is `None` for `#n` (either), `Some(true)`
    /// for lowercase (`c`), `Some(false)` for uppercase (`C`).
    Element {
        atomic_num: u8,
        aromatic: Option<bool>,
    },
    /// Any aromatic atom (`a`).
    Aromatic,
    /// Any aliphatic atom (`A`).
    Aliphatic,
    /// Mass number (`13` in `[13C]`).
    Isotope(u16),
    /// Explicit connections (`D`, `Dn`).
    Degree(Option<u8>),
    /// Total connections including implicit hydrogens (`X`, `Xn`).
    Connectivity(Option<u8>),
    /// Total bond order (`v`, `vn`).
    Valence(Option<u8>),
    /// Total hydrogen count (`H`, `Hn`).
    TotalHCount(Option<u8>),
    /// Implicit hydrogen count (`h`, `hn`).
    ImplicitHCount(Option<u8>),
    /// Number of SSSR rings containing the atom (`R`, `Rn`; `R0` = not in a ring).
    RingMembership(Option<u8>),
    /// Smallest ring size (`r`, `rn`; `r0` = not in a ring).
    SmallestRingSize(Option<u8>),
    /// Number of ring bonds (`x`, `xn`).
    RingBondCount(Option<u8>),
    /// Formal charge.
    Charge { value: i8, notation: ChargeNotation },
    /// Atom map class (`:n`). Always matches.
    AtomMapClass(u16),
    /// Recursive SMARTS (`$(...)`), anchored at its first atom.
    Recursive(Box<QueryMol>),
    And(AndOp, Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

/// AST node for a SMARTS bond query expression.
///
/// [`BondExpr::Implicit`] is the bond between two adjacent atoms with no
/// symbol written; it is kept distinct from an explicit `-`.
#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    /// No symbol: single or aromatic.
    Implicit,
    /// `~`
    Any,
    /// `-`
    Single,
    /// `=`
    Double,
    /// `#`
    Triple,
    /// `:`
    Aromatic,
    /// `@`
    Ring,
    /// `/`
    Up,
    /// `\`
    Down,
    And(AndOp, Vec<BondExpr>),
    Or(Vec<BondExpr>),
    Not(Box<BondExpr>),
}

/// A query atom: the expression plus whether it was written in brackets.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAtom {
    pub expr: AtomExpr,
    pub bracketed: bool,
}

impl QueryAtom {
    pub fn bracket(expr: AtomExpr) -> Self {
        Self {
            expr,
            bracketed: true,
        }
    }

    pub fn bare(expr: AtomExpr) -> Self {
        Self {
            expr,
            bracketed: false,
        }
    }
}

/// A top-level unit of a query.
///
/// A `grouped` component was written as `( ... )` (component-level grouping)
/// and may hold several `.`-separated fragments; an ungrouped component is a
/// single connected fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub atoms: Vec<NodeIndex>,
    pub grouped: bool,
}

impl Component {
    pub fn new(atoms: Vec<NodeIndex>, grouped: bool) -> Self {
        Self { atoms, grouped }
    }
}

/// A parsed SMARTS query: atoms, bonds and the component partition.
///
/// Immutable once built; the only constructors are the parser,
/// [`QueryMol::from_parts`] and [`QueryMol::from_atom_bond_list`], all of
/// which validate the structure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryMol {
    mol: Mol<QueryAtom, BondExpr>,
    components: Vec<Component>,
}

impl QueryMol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from atoms, `(a, b, expr)` bonds and an explicit
    /// component partition.
    ///
    /// Errors report the index of the offending bond (bond checks) or atom
    /// (partition checks) as `pos`.
    pub fn from_parts(
        atoms: Vec<QueryAtom>,
        bonds: Vec<(usize, usize, BondExpr)>,
        components: Vec<Component>,
    ) -> Result<Self, SmartsError> {
        let mol = build_graph(atoms, bonds)?;
        Self::from_graph(mol, components)
    }

    /// Builds a query from atoms and bonds, taking each connected fragment as
    /// an ungrouped component.
    ///
    /// This is the entry point for readers of other formats such as Molfile.
    pub fn from_atom_bond_list(
        atoms: Vec<QueryAtom>,
        bonds: Vec<(usize, usize, BondExpr)>,
    ) -> Result<Self, SmartsError> {
        let mol = build_graph(atoms, bonds)?;
        let components = mol
            .fragments()
            .into_iter()
            .map(|atoms| Component::new(atoms, false))
            .collect();
        Self::from_graph(mol, components)
    }

    pub(crate) fn from_graph(
        mol: Mol<QueryAtom, BondExpr>,
        components: Vec<Component>,
    ) -> Result<Self, SmartsError> {
        let query = Self { mol, components };
        query.validate()?;
        Ok(query)
    }

    fn validate(&self) -> Result<(), SmartsError> {
        let n = self.mol.atom_count();
        let mut owner = vec![usize::MAX; n];
        for (ci, component) in self.components.iter().enumerate() {
            for &atom in &component.atoms {
                let i = atom.index();
                if i >= n || owner[i] != usize::MAX {
                    return Err(SmartsError::structural(
                        i,
                        StructuralErrorKind::ComponentPartition(i),
                    ));
                }
                owner[i] = ci;
            }
        }
        if let Some(i) = owner.iter().position(|&c| c == usize::MAX) {
            return Err(SmartsError::structural(
                i,
                StructuralErrorKind::ComponentPartition(i),
            ));
        }

        for edge in self.mol.bonds() {
            if let Some((a, b)) = self.mol.bond_endpoints(edge) {
                if owner[a.index()] != owner[b.index()] {
                    return Err(SmartsError::structural(
                        edge.index(),
                        StructuralErrorKind::BondCrossesComponent(a.index(), b.index()),
                    ));
                }
            }
        }

        let labels = self.mol.fragment_labels();
        for (ci, component) in self.components.iter().enumerate() {
            if component.grouped {
                continue;
            }
            if let Some((first, rest)) = component.atoms.split_first() {
                let label = labels[first.index()];
                if rest.iter().any(|a| labels[a.index()] != label) {
                    return Err(SmartsError::structural(
                        first.index(),
                        StructuralErrorKind::DisconnectedComponent(ci),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn as_mol(&self) -> &Mol<QueryAtom, BondExpr> {
        &self.mol
    }

    pub fn is_empty(&self) -> bool {
        self.mol.atom_count() == 0
    }

    pub fn atom_count(&self) -> usize {
        self.mol.atom_count()
    }

    pub fn bond_count(&self) -> usize {
        self.mol.bond_count()
    }

    pub fn atom(&self, idx: NodeIndex) -> &QueryAtom {
        self.mol.atom(idx)
    }

    pub fn bond(&self, idx: EdgeIndex) -> &BondExpr {
        self.mol.bond(idx)
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.mol.atoms()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.mol.bonds()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.mol.neighbors(idx)
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.mol.bond_between(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.mol.bond_endpoints(idx)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component_of(&self, idx: NodeIndex) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.atoms.contains(&idx))
    }
}

fn build_graph(
    atoms: Vec<QueryAtom>,
    bonds: Vec<(usize, usize, BondExpr)>,
) -> Result<Mol<QueryAtom, BondExpr>, SmartsError> {
    let n = atoms.len();
    let mut seen = HashSet::new();
    for (bi, &(a, b, _)) in bonds.iter().enumerate() {
        for atom in [a, b] {
            if atom >= n {
                return Err(SmartsError::structural(
                    bi,
                    StructuralErrorKind::OrphanBond {
                        atom,
                        atom_count: n,
                    },
                ));
            }
        }
        if a == b {
            return Err(SmartsError::structural(bi, StructuralErrorKind::SelfLoop(a)));
        }
        if !seen.insert((a.min(b), a.max(b))) {
            return Err(SmartsError::structural(
                bi,
                StructuralErrorKind::DuplicateBond(a, b),
            ));
        }
    }

    let mut mol = Mol::with_capacity(n, bonds.len());
    for atom in atoms {
        mol.add_atom(atom);
    }
    for (a, b, expr) in bonds {
        mol.add_bond(NodeIndex::new(a), NodeIndex::new(b), expr);
    }
    Ok(mol)
}

/// Context passed to [`AtomExpr::matches`] during SMARTS evaluation.
///
/// `recursive_matches` maps the address of each `$(...)` sub-query to the
/// target atoms it matched at its first atom.
pub struct MatchContext {
    pub recursive_matches: HashMap<usize, HashSet<NodeIndex>>,
}

pub(crate) fn recursive_key(inner: &QueryMol) -> usize {
    inner as *const QueryMol as usize
}

fn count_eq(value: u8, query: Option<u8>, default: u8) -> bool {
    value == query.unwrap_or(default)
}

impl AtomExpr {
    pub fn matches(&self, atom: &Atom, ctx: &MatchContext, idx: NodeIndex) -> bool {
        match self {
            AtomExpr::True => true,
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => atom.atomic_num == *atomic_num && aromatic.is_none_or(|a| atom.is_aromatic == a),
            AtomExpr::Aromatic => atom.is_aromatic,
            AtomExpr::Aliphatic => !atom.is_aromatic,
            AtomExpr::Isotope(iso) => atom.isotope == *iso,
            AtomExpr::Degree(d) => count_eq(atom.degree, *d, 1),
            AtomExpr::Connectivity(x) => count_eq(atom.connectivity(), *x, 1),
            AtomExpr::Valence(v) => count_eq(atom.valence, *v, 1),
            AtomExpr::TotalHCount(h) => count_eq(atom.total_h_count, *h, 1),
            AtomExpr::ImplicitHCount(h) => match h {
                Some(h) => atom.implicit_h_count == *h,
                None => atom.implicit_h_count > 0,
            },
            AtomExpr::RingMembership(n) => match n {
                None => atom.is_in_ring(),
                Some(0) => !atom.is_in_ring(),
                Some(n) => atom.ring_membership == *n,
            },
            AtomExpr::SmallestRingSize(r) => match r {
                None => atom.is_in_ring(),
                Some(0) => !atom.is_in_ring(),
                Some(r) => atom.smallest_ring_size == Some(*r),
            },
            AtomExpr::RingBondCount(x) => match x {
                Some(x) => atom.ring_bond_count == *x,
                None => atom.ring_bond_count > 0,
            },
            AtomExpr::Charge { value, .. } => atom.formal_charge == *value,
            AtomExpr::AtomMapClass(_) => true,
            AtomExpr::Recursive(inner) => ctx
                .recursive_matches
                .get(&recursive_key(inner))
                .is_some_and(|set| set.contains(&idx)),
            AtomExpr::And(_, exprs) => exprs.iter().all(|e| e.matches(atom, ctx, idx)),
            AtomExpr::Or(exprs) => exprs.iter().any(|e| e.matches(atom, ctx, idx)),
            AtomExpr::Not(expr) => !expr.matches(atom, ctx, idx),
        }
    }
}

impl BondExpr {
    pub fn matches(&self, bond: &Bond) -> bool {
        match self {
            BondExpr::Implicit => matches!(bond.order, BondOrder::Single | BondOrder::Aromatic),
            BondExpr::Any => true,
            BondExpr::Single | BondExpr::Up | BondExpr::Down => bond.order == BondOrder::Single,
            BondExpr::Double => bond.order == BondOrder::Double,
            BondExpr::Triple => bond.order == BondOrder::Triple,
            BondExpr::Aromatic => bond.order == BondOrder::Aromatic,
            BondExpr::Ring => bond.in_ring,
            BondExpr::And(_, exprs) => exprs.iter().all(|e| e.matches(bond)),
            BondExpr::Or(exprs) => exprs.iter().any(|e| e.matches(bond)),
            BondExpr::Not(expr) => !expr.matches(bond),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbon() -> QueryAtom {
        QueryAtom::bracket(AtomExpr::Element {
            atomic_num: 6,
            aromatic: None,
        })
    }

    fn no_recursion() -> MatchContext {
        MatchContext {
            recursive_matches: HashMap::new(),
        }
    }

    #[test]
    fn atom_bond_list_derives_ungrouped_components() {
        let q = QueryMol::from_atom_bond_list(
            vec![carbon(), carbon(), carbon()],
            vec![(0, 1, BondExpr::Single)],
        )
        .unwrap();
        assert_eq!(q.components().len(), 2);
        assert!(q.components().iter().all(|c| !c.grouped));
        assert_eq!(q.components()[0].atoms, vec![NodeIndex::new(0), NodeIndex::new(1)]);
        assert_eq!(q.component_of(NodeIndex::new(2)), Some(1));
    }

    #[test]
    fn orphan_bond_is_structural() {
        let err = QueryMol::from_atom_bond_list(vec![carbon()], vec![(0, 3, BondExpr::Single)])
            .unwrap_err();
        assert_eq!(
            err,
            SmartsError::structural(
                0,
                StructuralErrorKind::OrphanBond {
                    atom: 3,
                    atom_count: 1
                }
            )
        );
    }

    #[test]
    fn self_loop_and_duplicate_bonds_rejected() {
        let err = QueryMol::from_atom_bond_list(vec![carbon()], vec![(0, 0, BondExpr::Single)])
            .unwrap_err();
        assert!(matches!(
            err,
            SmartsError::Structural {
                kind: StructuralErrorKind::SelfLoop(0),
                ..
            }
        ));

        let err = QueryMol::from_atom_bond_list(
            vec![carbon(), carbon()],
            vec![(0, 1, BondExpr::Single), (1, 0, BondExpr::Double)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SmartsError::Structural {
                pos: 1,
                kind: StructuralErrorKind::DuplicateBond(1, 0)
            }
        ));
    }

    #[test]
    fn partition_must_cover_every_atom_once() {
        let missing = QueryMol::from_parts(
            vec![carbon(), carbon()],
            vec![],
            vec![Component::new(vec![NodeIndex::new(0)], false)],
        )
        .unwrap_err();
        assert!(matches!(
            missing,
            SmartsError::Structural {
                kind: StructuralErrorKind::ComponentPartition(1),
                ..
            }
        ));

        let twice = QueryMol::from_parts(
            vec![carbon()],
            vec![],
            vec![
                Component::new(vec![NodeIndex::new(0)], false),
                Component::new(vec![NodeIndex::new(0)], false),
            ],
        )
        .unwrap_err();
        assert!(twice.is_structural());
    }

    #[test]
    fn bonds_cannot_cross_components() {
        let err = QueryMol::from_parts(
            vec![carbon(), carbon()],
            vec![(0, 1, BondExpr::Implicit)],
            vec![
                Component::new(vec![NodeIndex::new(0)], true),
                Component::new(vec![NodeIndex::new(1)], true),
            ],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SmartsError::Structural {
                kind: StructuralErrorKind::BondCrossesComponent(0, 1),
                ..
            }
        ));
    }

    #[test]
    fn only_grouped_components_may_be_disconnected() {
        let atoms = vec![carbon(), carbon()];
        let grouped = QueryMol::from_parts(
            atoms.clone(),
            vec![],
            vec![Component::new(vec![NodeIndex::new(0), NodeIndex::new(1)], true)],
        );
        assert!(grouped.is_ok());

        let err = QueryMol::from_parts(
            atoms,
            vec![],
            vec![Component::new(vec![NodeIndex::new(0), NodeIndex::new(1)], false)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SmartsError::Structural {
                kind: StructuralErrorKind::DisconnectedComponent(0),
                ..
            }
        ));
    }

    #[test]
    fn counted_primitives_use_defaults() {
        let ctx = no_recursion();
        let idx = NodeIndex::new(0);
        let water_o = Atom {
            atomic_num: 8,
            total_h_count: 2,
            implicit_h_count: 2,
            valence: 2,
            ..Atom::default()
        };
        assert!(!AtomExpr::TotalHCount(None).matches(&water_o, &ctx, idx));
        assert!(AtomExpr::TotalHCount(Some(2)).matches(&water_o, &ctx, idx));
        assert!(AtomExpr::ImplicitHCount(None).matches(&water_o, &ctx, idx));
        assert!(AtomExpr::Valence(Some(2)).matches(&water_o, &ctx, idx));
        assert!(!AtomExpr::Valence(None).matches(&water_o, &ctx, idx));
    }

    #[test]
    fn ring_primitives() {
        let ctx = no_recursion();
        let idx = NodeIndex::new(0);
        let chain = Atom {
            atomic_num: 6,
            ..Atom::default()
        };
        let ring = Atom {
            atomic_num: 6,
            ring_membership: 1,
            smallest_ring_size: Some(6),
            ring_bond_count: 2,
            ..Atom::default()
        };
        assert!(AtomExpr::SmallestRingSize(Some(0)).matches(&chain, &ctx, idx));
        assert!(!AtomExpr::SmallestRingSize(Some(0)).matches(&ring, &ctx, idx));
        assert!(AtomExpr::SmallestRingSize(None).matches(&ring, &ctx, idx));
        assert!(AtomExpr::SmallestRingSize(Some(6)).matches(&ring, &ctx, idx));
        assert!(AtomExpr::RingMembership(Some(1)).matches(&ring, &ctx, idx));
        assert!(!AtomExpr::RingMembership(None).matches(&chain, &ctx, idx));
        assert!(AtomExpr::RingBondCount(None).matches(&ring, &ctx, idx));
        assert!(!AtomExpr::RingBondCount(None).matches(&chain, &ctx, idx));
    }

    #[test]
    fn negation_binds_to_its_operand_only() {
        let ctx = no_recursion();
        let idx = NodeIndex::new(0);
        let hydroxyl_o = Atom {
            atomic_num: 8,
            total_h_count: 1,
            ..Atom::default()
        };
        let amine_n = Atom {
            atomic_num: 7,
            total_h_count: 1,
            ..Atom::default()
        };
        let o = AtomExpr::Element {
            atomic_num: 8,
            aromatic: Some(false),
        };
        let oh = AtomExpr::And(AndOp::Low, vec![o.clone(), AtomExpr::TotalHCount(None)]);
        let not_o_h = AtomExpr::And(
            AndOp::Low,
            vec![AtomExpr::Not(Box::new(o)), AtomExpr::TotalHCount(None)],
        );
        assert!(oh.matches(&hydroxyl_o, &ctx, idx));
        assert!(!oh.matches(&amine_n, &ctx, idx));
        assert!(!not_o_h.matches(&hydroxyl_o, &ctx, idx));
        assert!(not_o_h.matches(&amine_n, &ctx, idx));
    }

    #[test]
    fn bond_expressions() {
        let aromatic_ring = Bond::ring(BondOrder::Aromatic);
        let chain_double = Bond::new(BondOrder::Double);
        assert!(BondExpr::Implicit.matches(&aromatic_ring));
        assert!(!BondExpr::Implicit.matches(&chain_double));
        assert!(BondExpr::Ring.matches(&aromatic_ring));
        assert!(!BondExpr::Ring.matches(&chain_double));
        assert!(BondExpr::Up.matches(&Bond::new(BondOrder::Single)));
        let not_ring_double = BondExpr::And(
            AndOp::High,
            vec![BondExpr::Double, BondExpr::Not(Box::new(BondExpr::Ring))],
        );
        assert!(not_ring_double.matches(&chain_double));
    }
}
