use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

/// Undirected molecular graph, generic over the atom and bond payloads.
///
/// The same container holds query molecules (`Mol<QueryAtom, BondExpr>`) and
/// target molecules (`Mol<Atom, Bond>`). Indices are stable: nothing in this
/// crate removes nodes or edges, so `NodeIndex` order is insertion order.
pub struct Mol<A, B> {
    graph: UnGraph<A, B>,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
        }
    }

    pub fn with_capacity(atoms: usize, bonds: usize) -> Self {
        Self {
            graph: UnGraph::with_capacity(atoms, bonds),
        }
    }

    pub fn graph(&self) -> &UnGraph<A, B> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &A {
        &self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &B {
        &self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: A) -> NodeIndex {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: B) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// Neighbors sorted by atom index.
    ///
    /// petgraph yields neighbors newest-edge-first; walks that must be
    /// reproducible use this instead.
    pub fn sorted_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut nbs: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        nbs.sort_unstable();
        nbs.dedup();
        nbs
    }

    /// Labels every atom with the index of its connected fragment.
    ///
    /// Fragment ids are dense and numbered in order of each fragment's lowest
    /// atom index.
    pub fn fragment_labels(&self) -> Vec<usize> {
        let n = self.atom_count();
        let mut uf = UnionFind::<usize>::new(n);
        for edge in self.graph.edge_references() {
            uf.union(edge.source().index(), edge.target().index());
        }
        let mut dense = vec![usize::MAX; n];
        let mut labels = Vec::with_capacity(n);
        let mut next = 0;
        for i in 0..n {
            let root = uf.find(i);
            if dense[root] == usize::MAX {
                dense[root] = next;
                next += 1;
            }
            labels.push(dense[root]);
        }
        labels
    }

    /// Connected fragments, each sorted by atom index, in order of their
    /// lowest atom.
    pub fn fragments(&self) -> Vec<Vec<NodeIndex>> {
        let labels = self.fragment_labels();
        let count = labels.iter().copied().max().map_or(0, |m| m + 1);
        let mut out = vec![Vec::new(); count];
        for (i, &label) in labels.iter().enumerate() {
            out[label].push(NodeIndex::new(i));
        }
        out
    }
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        if self.atoms().any(|idx| self.atom(idx) != other.atom(idx)) {
            return false;
        }
        self.bonds().all(|idx| {
            self.bond(idx) == other.bond(idx)
                && self.bond_endpoints(idx) == other.bond_endpoints(idx)
        })
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let atoms: Vec<&A> = self.atoms().map(|i| self.atom(i)).collect();
        let bonds: Vec<(usize, usize, &B)> = self
            .bonds()
            .filter_map(|e| {
                let (a, b) = self.bond_endpoints(e)?;
                Some((a.index(), b.index(), self.bond(e)))
            })
            .collect();
        f.debug_struct("Mol")
            .field("atoms", &atoms)
            .field("bonds", &bonds)
            .finish()
    }
}
