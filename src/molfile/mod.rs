//! Molfile connection tables as SMARTS queries.
//!
//! Only the parts of a V2000 or V3000 CTAB that constrain a query are read:
//! element symbols, atom lists, charges, bond types and V2000 ring/chain
//! topology. Coordinates, stereo, S-groups and data items are ignored.
//!
//! Every atom becomes a bracket atom over atomic numbers, so the written
//! SMARTS never depends on aromaticity perception:
//!
//! | CTAB | SMARTS |
//! |---|---|
//! | `C` | `[#6]` |
//! | `C` with charge +5 | `[#6&+5]` |
//! | list `[B,C,N]` | `[#5,#6,#7]` |
//! | list `NOT[B,C,N]` | `[!#5&!#6&!#7]` |
//! | bond types 1 to 8 | `-` `=` `#` `:` `-,=` `-,:` `=,:` `~` |
//! | ring / chain topology | `&@` / `&!@` (`;` after a bond list) |

mod error;
mod v2000;
mod v3000;

pub use error::{MolfileError, MolfileResult};

use log::debug;

use crate::element;
use crate::smarts::{AndOp, AtomExpr, BondExpr, ChargeNotation, QueryAtom, QueryMol};

/// Reads a V2000 or V3000 Molfile into a query molecule.
///
/// Components are the connected fragments of the table.
///
/// ```
/// use smartscrab::{read_query_molfile, to_smarts};
///
/// let text = concat!(
///     "ethane\n\n\n",
///     "  2  1  0  0  0  0            999 V2000\n",
///     "    0.0000    0.0000    0.0000 C   0  0\n",
///     "    1.0000    0.0000    0.0000 C   0  0\n",
///     "  1  2  1  0\n",
///     "M  END\n",
/// );
/// let query = read_query_molfile(text).unwrap();
/// assert_eq!(to_smarts(&query), "[#6]-[#6]");
/// ```
pub fn read_query_molfile(text: &str) -> MolfileResult<QueryMol> {
    let mut lines = Lines::new(text);
    for _ in 0..3 {
        lines.require("header line")?;
    }
    let counts = lines.require("counts line")?;
    let ctab = if counts.contains("V3000") {
        v3000::read_ctab(&mut lines)?
    } else {
        v2000::read_ctab(counts, &mut lines)?
    };
    debug!(
        "read Molfile CTAB: {} atoms, {} bonds",
        ctab.atoms.len(),
        ctab.bonds.len()
    );
    ctab.into_query()
}

/// Line cursor with 1-based line numbers for error reporting.
pub(crate) struct Lines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    pub(crate) fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied()?;
        self.pos += 1;
        Some(line)
    }

    /// Number of the line most recently returned.
    pub(crate) fn line_number(&self) -> usize {
        self.pos
    }

    pub(crate) fn require(&mut self, what: &str) -> MolfileResult<&'a str> {
        let line_number = self.pos;
        self.next_line().ok_or_else(|| {
            log::trace!("missing {what}");
            MolfileError::UnexpectedEnd { line: line_number }
        })
    }
}

/// Fixed-width field, trimmed; empty when the line is too short.
pub(crate) fn column(line: &str, start: usize, len: usize) -> &str {
    let end = (start + len).min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

pub(crate) fn parse_number<T: std::str::FromStr>(field: &str, line: usize, what: &str) -> MolfileResult<T> {
    field
        .trim()
        .parse()
        .map_err(|_| MolfileError::parse(line, format!("invalid {what}: {field:?}")))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AtomKind {
    Element(u8),
    /// `*`
    Any,
    /// `A`: anything but hydrogen.
    NotHydrogen,
    /// `Q`: anything but carbon or hydrogen.
    Hetero,
    List { elements: Vec<u8>, negated: bool },
}

impl AtomKind {
    /// Element symbol or generic atom letter from an atom block.
    pub(crate) fn from_symbol(symbol: &str, line: usize) -> MolfileResult<Self> {
        match symbol {
            "*" => Ok(AtomKind::Any),
            "A" => Ok(AtomKind::NotHydrogen),
            "Q" => Ok(AtomKind::Hetero),
            "D" | "T" => Ok(AtomKind::Element(1)),
            _ => element::atomic_num_from_symbol(symbol)
                .map(AtomKind::Element)
                .ok_or_else(|| MolfileError::parse(line, format!("unknown element symbol {symbol:?}"))),
        }
    }

    pub(crate) fn list(symbols: &[&str], negated: bool, line: usize) -> MolfileResult<Self> {
        let elements = symbols
            .iter()
            .map(|s| {
                element::atomic_num_from_symbol(s)
                    .ok_or_else(|| MolfileError::parse(line, format!("unknown element {s:?} in atom list")))
            })
            .collect::<MolfileResult<Vec<u8>>>()?;
        if elements.is_empty() {
            return Err(MolfileError::parse(line, "empty atom list"));
        }
        Ok(AtomKind::List { elements, negated })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Topology {
    Either,
    Ring,
    Chain,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CtabAtom {
    pub kind: AtomKind,
    pub charge: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CtabBond {
    pub a: usize,
    pub b: usize,
    pub bond_type: u8,
    pub topology: Topology,
    pub line: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Ctab {
    pub atoms: Vec<CtabAtom>,
    pub bonds: Vec<CtabBond>,
}

fn any_of(atomic_num: u8) -> AtomExpr {
    AtomExpr::Element {
        atomic_num,
        aromatic: None,
    }
}

fn none_of(atomic_nums: &[u8]) -> AtomExpr {
    let nots: Vec<AtomExpr> = atomic_nums
        .iter()
        .map(|&n| AtomExpr::Not(Box::new(any_of(n))))
        .collect();
    if nots.len() == 1 {
        nots.into_iter().next().unwrap_or(AtomExpr::True)
    } else {
        AtomExpr::And(AndOp::High, nots)
    }
}

/// Appends `extra` to `base` with the loosest AND that keeps `base` intact.
fn and_with<T>(
    base: T,
    extra: T,
    tight: impl Fn(&T) -> bool,
    and: fn(AndOp, Vec<T>) -> T,
) -> T {
    let op = if tight(&base) { AndOp::High } else { AndOp::Low };
    and(op, vec![base, extra])
}

impl CtabAtom {
    fn to_query(&self) -> QueryAtom {
        let base = match &self.kind {
            AtomKind::Element(n) => any_of(*n),
            AtomKind::Any => AtomExpr::True,
            AtomKind::NotHydrogen => none_of(&[1]),
            AtomKind::Hetero => none_of(&[6, 1]),
            AtomKind::List {
                elements,
                negated: true,
            } => none_of(elements),
            AtomKind::List {
                elements,
                negated: false,
            } if elements.len() == 1 => any_of(elements[0]),
            AtomKind::List { elements, .. } => AtomExpr::Or(elements.iter().map(|&n| any_of(n)).collect()),
        };
        if self.charge == 0 {
            return QueryAtom::bracket(base);
        }
        let charge = AtomExpr::Charge {
            value: self.charge,
            notation: ChargeNotation::Signed,
        };
        let expr = match base {
            AtomExpr::True => charge,
            AtomExpr::And(AndOp::High, mut parts) => {
                parts.push(charge);
                AtomExpr::And(AndOp::High, parts)
            }
            other => and_with(other, charge, |e| !matches!(e, AtomExpr::Or(_)), AtomExpr::And),
        };
        QueryAtom::bracket(expr)
    }
}

impl CtabBond {
    fn to_query(&self) -> MolfileResult<BondExpr> {
        let base = match self.bond_type {
            1 => BondExpr::Single,
            2 => BondExpr::Double,
            3 => BondExpr::Triple,
            4 => BondExpr::Aromatic,
            5 => BondExpr::Or(vec![BondExpr::Single, BondExpr::Double]),
            6 => BondExpr::Or(vec![BondExpr::Single, BondExpr::Aromatic]),
            7 => BondExpr::Or(vec![BondExpr::Double, BondExpr::Aromatic]),
            8 => BondExpr::Any,
            other => {
                return Err(MolfileError::parse(
                    self.line,
                    format!("unsupported bond type {other}"),
                ))
            }
        };
        let topology = match self.topology {
            Topology::Either => return Ok(base),
            Topology::Ring => BondExpr::Ring,
            Topology::Chain => BondExpr::Not(Box::new(BondExpr::Ring)),
        };
        Ok(and_with(base, topology, |e| !matches!(e, BondExpr::Or(_)), BondExpr::And))
    }
}

impl Ctab {
    fn into_query(self) -> MolfileResult<QueryMol> {
        let n = self.atoms.len();
        let atoms = self.atoms.iter().map(CtabAtom::to_query).collect();
        let mut bonds = Vec::with_capacity(self.bonds.len());
        for bond in &self.bonds {
            for atom in [bond.a, bond.b] {
                if atom >= n {
                    return Err(MolfileError::parse(
                        bond.line,
                        format!("bond references atom {} but only {n} atoms are defined", atom + 1),
                    ));
                }
            }
            bonds.push((bond.a, bond.b, bond.to_query()?));
        }
        Ok(QueryMol::from_atom_bond_list(atoms, bonds)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smarts::to_smarts;

    fn atom(kind: AtomKind, charge: i8) -> String {
        let query = QueryMol::from_atom_bond_list(vec![CtabAtom { kind, charge }.to_query()], vec![]).unwrap();
        to_smarts(&query)
    }

    fn bond(bond_type: u8, topology: Topology) -> String {
        let ctab = Ctab {
            atoms: vec![
                CtabAtom {
                    kind: AtomKind::Element(6),
                    charge: 0,
                };
                2
            ],
            bonds: vec![CtabBond {
                a: 0,
                b: 1,
                bond_type,
                topology,
                line: 1,
            }],
        };
        to_smarts(&ctab.into_query().unwrap())
    }

    #[test]
    fn atom_canonical_forms() {
        assert_eq!(atom(AtomKind::Element(6), 0), "[#6]");
        assert_eq!(atom(AtomKind::Element(6), 5), "[#6&+5]");
        assert_eq!(atom(AtomKind::Element(8), -1), "[#8&-1]");
        assert_eq!(atom(AtomKind::Any, 0), "[*]");
        assert_eq!(atom(AtomKind::NotHydrogen, 0), "[!#1]");
        assert_eq!(atom(AtomKind::Hetero, 0), "[!#6&!#1]");
        let list = |negated| AtomKind::List {
            elements: vec![5, 6, 7],
            negated,
        };
        assert_eq!(atom(list(false), 0), "[#5,#6,#7]");
        assert_eq!(atom(list(true), 0), "[!#5&!#6&!#7]");
        assert_eq!(atom(list(false), 1), "[#5,#6,#7;+1]");
        assert_eq!(atom(list(true), 1), "[!#5&!#6&!#7&+1]");
    }

    #[test]
    fn bond_canonical_forms() {
        assert_eq!(bond(1, Topology::Either), "[#6]-[#6]");
        assert_eq!(bond(4, Topology::Either), "[#6]:[#6]");
        assert_eq!(bond(6, Topology::Either), "[#6]-,:[#6]");
        assert_eq!(bond(8, Topology::Either), "[#6]~[#6]");
        assert_eq!(bond(2, Topology::Ring), "[#6]=&@[#6]");
        assert_eq!(bond(1, Topology::Chain), "[#6]-&!@[#6]");
        assert_eq!(bond(5, Topology::Ring), "[#6]-,=;@[#6]");
    }

    #[test]
    fn unknown_bond_type_reports_line() {
        let ctab = Ctab {
            atoms: vec![
                CtabAtom {
                    kind: AtomKind::Element(6),
                    charge: 0,
                };
                2
            ],
            bonds: vec![CtabBond {
                a: 0,
                b: 1,
                bond_type: 9,
                topology: Topology::Either,
                line: 7,
            }],
        };
        assert!(matches!(ctab.into_query(), Err(MolfileError::Parse { line: 7, .. })));
    }

    #[test]
    fn truncated_header_is_unexpected_end() {
        assert_eq!(
            read_query_molfile("name\n\n"),
            Err(MolfileError::UnexpectedEnd { line: 2 })
        );
    }

    #[test]
    fn column_tolerates_short_lines() {
        assert_eq!(column("  1  2", 3, 3), "2");
        assert_eq!(column("  1", 3, 3), "");
    }
}
