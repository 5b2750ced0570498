use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mol::Mol;

/// `(query atom, target atom)` pairs, ordered by query atom index.
pub type AtomMapping = Vec<(NodeIndex, NodeIndex)>;

pub fn has_substruct_match_with<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
) -> bool {
    get_substruct_match_with(target, query, atom_match, bond_match).is_some()
}

/// First embedding of `query` in `target`.
///
/// `atom_match(target_atom, query_atom)` and
/// `bond_match(target_bond, query_bond)` decide compatibility of single
/// atoms and bonds.
pub fn get_substruct_match_with<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
) -> Option<AtomMapping> {
    Vf2::new(target, query, atom_match, bond_match, |_: &AtomMapping| true).find_first()
}

pub fn get_substruct_matches_with<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
) -> Vec<AtomMapping> {
    Vf2::new(target, query, atom_match, bond_match, |_: &AtomMapping| true).find_all()
}

/// Like [`get_substruct_match_with`], additionally rejecting complete
/// mappings for which `filter` returns false.
pub fn get_substruct_match_with_filter<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
    filter: impl Fn(&AtomMapping) -> bool,
) -> Option<AtomMapping> {
    Vf2::new(target, query, atom_match, bond_match, filter).find_first()
}

pub fn get_substruct_matches_with_filter<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
    filter: impl Fn(&AtomMapping) -> bool,
) -> Vec<AtomMapping> {
    Vf2::new(target, query, atom_match, bond_match, filter).find_all()
}

struct Vf2<'a, A1, B1, A2, B2, FA, FB, FM> {
    target: &'a Mol<A1, B1>,
    query: &'a Mol<A2, B2>,
    atom_match: FA,
    bond_match: FB,
    filter: FM,
    query_order: Vec<NodeIndex>,
    query_map: Vec<Option<NodeIndex>>,
    target_used: Vec<bool>,
}

impl<'a, A1, B1, A2, B2, FA, FB, FM> Vf2<'a, A1, B1, A2, B2, FA, FB, FM>
where
    FA: Fn(NodeIndex, NodeIndex) -> bool,
    FB: Fn(EdgeIndex, EdgeIndex) -> bool,
    FM: Fn(&AtomMapping) -> bool,
{
    fn new(
        target: &'a Mol<A1, B1>,
        query: &'a Mol<A2, B2>,
        atom_match: FA,
        bond_match: FB,
        filter: FM,
    ) -> Self {
        let query_order = search_order(query);
        Self {
            target,
            query,
            atom_match,
            bond_match,
            filter,
            query_order,
            query_map: vec![None; query.atom_count()],
            target_used: vec![false; target.atom_count()],
        }
    }

    fn find_first(&mut self) -> Option<AtomMapping> {
        self.run(true).into_iter().next()
    }

    fn find_all(&mut self) -> Vec<AtomMapping> {
        self.run(false)
    }

    fn mapping(&self) -> AtomMapping {
        self.query_map
            .iter()
            .enumerate()
            .filter_map(|(q, t)| t.map(|t| (NodeIndex::new(q), t)))
            .collect()
    }

    /// Target atoms worth trying for `query_node`: the neighbours of a
    /// mapped neighbour's image, or every target atom (`None`) when no
    /// neighbour is mapped yet.
    fn candidates(&self, query_node: NodeIndex) -> Option<Vec<NodeIndex>> {
        self.query
            .neighbors(query_node)
            .find_map(|nb| self.query_map[nb.index()])
            .map(|t| self.target.sorted_neighbors(t))
    }

    /// Depth-first search over `query_order` with an explicit cursor per
    /// depth, so query size does not bound the call stack.
    fn run(&mut self, first_only: bool) -> Vec<AtomMapping> {
        let mut results = Vec::new();
        let n = self.query_order.len();
        if n == 0 {
            let mapping = AtomMapping::new();
            if (self.filter)(&mapping) {
                results.push(mapping);
            }
            return results;
        }

        let target_count = self.target_used.len();
        let mut candidates: Vec<Option<Vec<NodeIndex>>> = vec![None; n];
        let mut cursor = vec![0usize; n];
        candidates[0] = self.candidates(self.query_order[0]);
        let mut depth = 0;

        loop {
            let query_node = self.query_order[depth];
            if let Some(prev) = self.query_map[query_node.index()].take() {
                self.target_used[prev.index()] = false;
            }

            let mut next = None;
            loop {
                let c = cursor[depth];
                let candidate = match &candidates[depth] {
                    Some(list) => list.get(c).copied(),
                    None => (c < target_count).then(|| NodeIndex::new(c)),
                };
                let Some(target_node) = candidate else {
                    break;
                };
                cursor[depth] += 1;
                if !self.target_used[target_node.index()] && self.is_feasible(query_node, target_node) {
                    next = Some(target_node);
                    break;
                }
            }

            let Some(target_node) = next else {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                continue;
            };
            self.query_map[query_node.index()] = Some(target_node);
            self.target_used[target_node.index()] = true;

            if depth + 1 == n {
                let mapping = self.mapping();
                if (self.filter)(&mapping) {
                    results.push(mapping);
                    if first_only {
                        break;
                    }
                }
            } else {
                depth += 1;
                candidates[depth] = self.candidates(self.query_order[depth]);
                cursor[depth] = 0;
            }
        }

        self.query_map.iter_mut().for_each(|m| *m = None);
        self.target_used.iter_mut().for_each(|u| *u = false);
        results
    }

    fn is_feasible(&self, query_node: NodeIndex, target_node: NodeIndex) -> bool {
        if !(self.atom_match)(target_node, query_node) {
            return false;
        }

        for q_neighbor in self.query.neighbors(query_node) {
            let Some(t_mapped) = self.query_map[q_neighbor.index()] else {
                continue;
            };
            let Some(q_bond) = self.query.bond_between(query_node, q_neighbor) else {
                continue;
            };
            match self.target.bond_between(target_node, t_mapped) {
                Some(t_bond) if (self.bond_match)(t_bond, q_bond) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Visit order for query atoms: start from the highest-degree unvisited atom
/// and grow breadth-first, so every atom after the first of its fragment has
/// an already-mapped neighbour to prune against.
fn search_order<A, B>(query: &Mol<A, B>) -> Vec<NodeIndex> {
    let mut by_degree: Vec<NodeIndex> = query.atoms().collect();
    by_degree.sort_by_key(|&a| std::cmp::Reverse(query.neighbors(a).count()));

    let mut placed = vec![false; query.atom_count()];
    let mut order = Vec::with_capacity(query.atom_count());
    for seed in by_degree {
        if placed[seed.index()] {
            continue;
        }
        placed[seed.index()] = true;
        let start = order.len();
        order.push(seed);
        let mut i = start;
        while i < order.len() {
            for nb in query.sorted_neighbors(order[i]) {
                if !placed[nb.index()] {
                    placed[nb.index()] = true;
                    order.push(nb);
                }
            }
            i += 1;
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Molecule whose atoms are element numbers and bonds are orders.
    fn mol(atoms: &[u8], bonds: &[(usize, usize, u8)]) -> Mol<u8, u8> {
        let mut m = Mol::new();
        let idx: Vec<NodeIndex> = atoms.iter().map(|&a| m.add_atom(a)).collect();
        for &(a, b, order) in bonds {
            m.add_bond(idx[a], idx[b], order);
        }
        m
    }

    fn matches(target: &Mol<u8, u8>, query: &Mol<u8, u8>) -> Vec<AtomMapping> {
        get_substruct_matches_with(
            target,
            query,
            |t, q| target.atom(t) == query.atom(q),
            |t, q| target.bond(t) == query.bond(q),
        )
    }

    fn cyclohexane() -> Mol<u8, u8> {
        mol(
            &[6; 6],
            &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 5, 1), (5, 0, 1)],
        )
    }

    #[test]
    fn ethanol_contains_cc() {
        let ethanol = mol(&[6, 6, 8], &[(0, 1, 1), (1, 2, 1)]);
        let cc = mol(&[6, 6], &[(0, 1, 1)]);
        assert_eq!(matches(&ethanol, &cc).len(), 2);
    }

    #[test]
    fn methane_does_not_contain_cc() {
        let methane = mol(&[6], &[]);
        let cc = mol(&[6, 6], &[(0, 1, 1)]);
        assert!(matches(&methane, &cc).is_empty());
    }

    #[test]
    fn bond_order_must_agree() {
        let ethene = mol(&[6, 6], &[(0, 1, 2)]);
        let single = mol(&[6, 6], &[(0, 1, 1)]);
        assert!(matches(&ethene, &single).is_empty());
        assert_eq!(matches(&ethene, &ethene).len(), 2);
    }

    #[test]
    fn cyclohexane_automorphisms() {
        let ring = cyclohexane();
        assert_eq!(matches(&ring, &ring).len(), 12);
    }

    #[test]
    fn mapping_is_ordered_by_query_atom() {
        let ethanol = mol(&[6, 6, 8], &[(0, 1, 1), (1, 2, 1)]);
        let co = mol(&[8, 6], &[(0, 1, 1)]);
        let found = get_substruct_match_with(
            &ethanol,
            &co,
            |t, q| ethanol.atom(t) == co.atom(q),
            |t, q| ethanol.bond(t) == co.bond(q),
        )
        .unwrap();
        assert_eq!(
            found,
            vec![
                (NodeIndex::new(0), NodeIndex::new(2)),
                (NodeIndex::new(1), NodeIndex::new(1))
            ]
        );
    }

    #[test]
    fn every_mapping_preserves_bonds() {
        let ring = cyclohexane();
        let path = mol(&[6, 6, 6], &[(0, 1, 1), (1, 2, 1)]);
        let all = matches(&ring, &path);
        assert_eq!(all.len(), 12);
        for mapping in &all {
            for e in path.bonds() {
                let (a, b) = path.bond_endpoints(e).unwrap();
                let ta = mapping[a.index()].1;
                let tb = mapping[b.index()].1;
                assert!(ring.bond_between(ta, tb).is_some());
            }
        }
    }

    #[test]
    fn filter_rejects_complete_mappings() {
        let ethanol = mol(&[6, 6, 8], &[(0, 1, 1), (1, 2, 1)]);
        let cc = mol(&[6, 6], &[(0, 1, 1)]);
        let all = get_substruct_matches_with_filter(
            &ethanol,
            &cc,
            |t, q| ethanol.atom(t) == cc.atom(q),
            |t, q| ethanol.bond(t) == cc.bond(q),
            |m| m[0].1 == NodeIndex::new(0),
        );
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn disconnected_query_atoms_map_to_distinct_targets() {
        let ethane = mol(&[6, 6], &[(0, 1, 1)]);
        let two_carbons = mol(&[6, 6], &[]);
        assert_eq!(matches(&ethane, &two_carbons).len(), 2);
        let methane = mol(&[6], &[]);
        assert!(matches(&methane, &two_carbons).is_empty());
    }

    #[test]
    fn empty_query_has_one_empty_match() {
        let ethane = mol(&[6, 6], &[(0, 1, 1)]);
        let empty: Mol<u8, u8> = Mol::new();
        assert_eq!(matches(&ethane, &empty), vec![Vec::new()]);
    }

    #[test]
    fn has_match_agrees_with_first_match() {
        let ethanol = mol(&[6, 6, 8], &[(0, 1, 1), (1, 2, 1)]);
        let co = mol(&[6, 8], &[(0, 1, 1)]);
        let oo = mol(&[8, 8], &[(0, 1, 1)]);
        let found = |query: &Mol<u8, u8>| {
            has_substruct_match_with(
                &ethanol,
                query,
                |t, q| ethanol.atom(t) == query.atom(q),
                |t, q| ethanol.bond(t) == query.bond(q),
            )
        };
        assert!(found(&co));
        assert!(!found(&oo));
    }

    #[test]
    fn long_chain_matches_without_deep_recursion() {
        let n = 20_000;
        let bonds: Vec<(usize, usize, u8)> = (1..n).map(|i| (i - 1, i, 1)).collect();
        let chain = mol(&vec![6; n], &bonds);
        let found = get_substruct_match_with(
            &chain,
            &chain,
            |t, q| chain.atom(t) == chain.atom(q),
            |t, q| chain.bond(t) == chain.bond(q),
        )
        .unwrap();
        assert_eq!(found.len(), n);
        for pair in found.windows(2) {
            assert!(chain.bond_between(pair[0].1, pair[1].1).is_some());
        }
    }

    #[test]
    fn search_order_keeps_fragments_contiguous() {
        let query = mol(&[6, 6, 6, 8], &[(0, 1, 1), (1, 2, 1)]);
        let order = search_order(&query);
        assert_eq!(order[0], NodeIndex::new(1));
        assert_eq!(order.len(), 4);
        assert_eq!(order[3], NodeIndex::new(3));
    }
}
