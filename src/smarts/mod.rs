mod error;
mod limits;
mod parser;
pub mod query;
mod writer;

pub use error::{ResourceLimitKind, SmartsError, StructuralErrorKind, SyntaxErrorKind};
pub use limits::ParseLimits;
pub use query::{AndOp, AtomExpr, BondExpr, ChargeNotation, Component, QueryAtom, QueryMol};
pub use writer::to_smarts;

use std::collections::{HashMap, HashSet};

use log::debug;
use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::substruct::{get_substruct_match_with_filter, get_substruct_matches_with_filter, AtomMapping};

use query::{recursive_key, MatchContext};

/// Parses a SMARTS string with the default [`ParseLimits`].
pub fn from_smarts(s: &str) -> Result<QueryMol, SmartsError> {
    parser::parse(s, &ParseLimits::default())
}

pub fn from_smarts_with_limits(s: &str, limits: &ParseLimits) -> Result<QueryMol, SmartsError> {
    parser::parse(s, limits)
}

pub fn has_smarts_match(target: &Mol<Atom, Bond>, query: &QueryMol) -> bool {
    get_smarts_match(target, query).is_some()
}

pub fn get_smarts_match(target: &Mol<Atom, Bond>, query: &QueryMol) -> Option<AtomMapping> {
    search(target, query, true).into_iter().next()
}

/// All embeddings of `query` in `target`, each listing `(query atom,
/// target atom)` pairs by query atom index.
///
/// Atoms of one grouped component must land in the same target fragment,
/// and different grouped components in different fragments.
pub fn get_smarts_matches(target: &Mol<Atom, Bond>, query: &QueryMol) -> Vec<AtomMapping> {
    let matches = search(target, query, false);
    debug!("{} SMARTS matches", matches.len());
    matches
}

fn search(target: &Mol<Atom, Bond>, query: &QueryMol, first_only: bool) -> Vec<AtomMapping> {
    let ctx = MatchContext {
        recursive_matches: pre_evaluate_recursive(target, query),
    };
    let grouping = ComponentGrouping::new(target, query);

    let atom_match = |t: NodeIndex, q: NodeIndex| query.atom(q).expr.matches(target.atom(t), &ctx, t);
    let bond_match = |t, q| query.bond(q).matches(target.bond(t));
    let filter = |mapping: &AtomMapping| grouping.accepts(mapping);

    if first_only {
        get_substruct_match_with_filter(target, query.as_mol(), atom_match, bond_match, filter)
            .into_iter()
            .collect()
    } else {
        get_substruct_matches_with_filter(target, query.as_mol(), atom_match, bond_match, filter)
    }
}

struct ComponentGrouping {
    target_fragments: Vec<usize>,
    groups: Vec<Vec<NodeIndex>>,
}

impl ComponentGrouping {
    fn new(target: &Mol<Atom, Bond>, query: &QueryMol) -> Self {
        let groups: Vec<Vec<NodeIndex>> = query
            .components()
            .iter()
            .filter(|c| c.grouped)
            .map(|c| c.atoms.clone())
            .collect();
        let target_fragments = if groups.is_empty() {
            Vec::new()
        } else {
            target.fragment_labels()
        };
        Self {
            target_fragments,
            groups,
        }
    }

    fn accepts(&self, mapping: &AtomMapping) -> bool {
        if self.groups.is_empty() {
            return true;
        }
        let target_of: HashMap<NodeIndex, NodeIndex> = mapping.iter().copied().collect();
        let mut used = HashSet::new();
        for group in &self.groups {
            let mut fragment = None;
            for q in group {
                let Some(t) = target_of.get(q) else {
                    return false;
                };
                let label = self.target_fragments[t.index()];
                match fragment {
                    None => fragment = Some(label),
                    Some(f) if f != label => return false,
                    Some(_) => {}
                }
            }
            if let Some(f) = fragment {
                if !used.insert(f) {
                    return false;
                }
            }
        }
        true
    }
}

/// Target atoms matched by the first atom of every `$(...)` in `query`,
/// keyed by [`recursive_key`].
fn pre_evaluate_recursive(
    target: &Mol<Atom, Bond>,
    query: &QueryMol,
) -> HashMap<usize, HashSet<NodeIndex>> {
    let mut refs: Vec<&QueryMol> = Vec::new();
    for atom_idx in query.atoms() {
        collect_recursive_refs(&query.atom(atom_idx).expr, &mut refs);
    }

    let mut results = HashMap::new();
    for inner in refs {
        let key = recursive_key(inner);
        if results.contains_key(&key) {
            continue;
        }
        let anchor = NodeIndex::new(0);
        let matching_atoms: HashSet<NodeIndex> = search(target, inner, false)
            .iter()
            .filter_map(|mapping| mapping.iter().find(|&&(q, _)| q == anchor).map(|&(_, t)| t))
            .collect();
        results.insert(key, matching_atoms);
    }
    results
}

fn collect_recursive_refs<'a>(expr: &'a AtomExpr, refs: &mut Vec<&'a QueryMol>) {
    match expr {
        AtomExpr::Recursive(inner) => refs.push(&**inner),
        AtomExpr::And(_, exprs) | AtomExpr::Or(exprs) => {
            for e in exprs {
                collect_recursive_refs(e, refs);
            }
        }
        AtomExpr::Not(inner) => collect_recursive_refs(inner, refs),
        _ => {}
    }
}
