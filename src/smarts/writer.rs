use std::collections::{BTreeSet, HashSet};

use log::trace;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::element::{self, AROMATIC_BRACKET};

use super::query::{AndOp, AtomExpr, BondExpr, ChargeNotation, Component, QueryAtom, QueryMol};

/// Serializes a query molecule to SMARTS.
///
/// Components are written in order and joined with `.`; grouped components
/// are wrapped in parentheses. A query produced by the parser is written so
/// that parsing the output gives the same atoms and bonds in the same order.
/// Other queries are walked depth-first from the lowest atom of each
/// fragment, visiting neighbours in increasing index order.
/// Expression trees that SMARTS precedence cannot spell directly are
/// rewritten into an equivalent form (`$([...])` for atoms, disjunctive
/// normal form for bonds).
pub fn to_smarts(query: &QueryMol) -> String {
    if query.is_empty() {
        return String::new();
    }
    let labels = query.as_mol().fragment_labels();
    let mut walk = Walk::new(query);
    let parts: Vec<String> = query
        .components()
        .iter()
        .map(|component| write_component(query, component, &labels, &mut walk))
        .collect();
    let out = parts.join(".");
    trace!("wrote SMARTS {out:?}");
    out
}

fn write_component(query: &QueryMol, component: &Component, labels: &[usize], walk: &mut Walk) -> String {
    let mut atoms = component.atoms.clone();
    atoms.sort();
    let roots = match walk.text_order_roots(&atoms, component.grouped) {
        Some(roots) => roots,
        None => walk.rebuild_by_dfs(query, &atoms, labels),
    };
    let mut writer = ComponentWriter {
        query,
        walk: &*walk,
        digits: vec![None; query.bond_count()],
        in_use: BTreeSet::new(),
        out: String::new(),
    };
    for (i, &root) in roots.iter().enumerate() {
        if i > 0 {
            writer.out.push('.');
        }
        writer.write_tree(root);
    }
    if component.grouped {
        format!("({})", writer.out)
    } else {
        writer.out
    }
}

/// Spanning forest the writer walks, plus the ring closures hanging off it.
///
/// A chain bond made by the parser runs from the earlier atom to the later
/// one and is the first bond the later atom received; every other bond
/// came from a ring-closure digit. Keeping that split, and walking the
/// forest in atom order, writes text that parses back to the same atoms
/// and bonds in the same order.
struct Walk {
    parent: Vec<Option<(NodeIndex, EdgeIndex)>>,
    children: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    ring_opens: Vec<Vec<EdgeIndex>>,
    ring_closes: Vec<Vec<EdgeIndex>>,
}

impl Walk {
    fn new(query: &QueryMol) -> Self {
        let n = query.atom_count();
        let mut first_bond: Vec<Option<EdgeIndex>> = vec![None; n];
        let mut parent = vec![None; n];
        let mut closures = Vec::new();
        for edge in query.bonds() {
            let Some((a, b)) = query.bond_endpoints(edge) else {
                continue;
            };
            let b_is_new = first_bond[b.index()].is_none();
            for atom in [a, b] {
                first_bond[atom.index()].get_or_insert(edge);
            }
            if a < b && b_is_new {
                parent[b.index()] = Some((a, edge));
            } else {
                closures.push((a.min(b), a.max(b), edge));
            }
        }

        let mut children = vec![Vec::new(); n];
        for (child, link) in parent.iter().enumerate() {
            if let Some((p, edge)) = *link {
                children[p.index()].push((NodeIndex::new(child), edge));
            }
        }
        let mut ring_opens = vec![Vec::new(); n];
        let mut ring_closes = vec![Vec::new(); n];
        for (opener, closer, edge) in closures {
            ring_opens[opener.index()].push(edge);
            ring_closes[closer.index()].push(edge);
        }
        Self {
            parent,
            children,
            ring_opens,
            ring_closes,
        }
    }

    /// Roots of the component's forest when a preorder walk visits `atoms`
    /// (sorted) in index order. An ungrouped component must also be a
    /// single tree, since it cannot contain `.`.
    fn text_order_roots(&self, atoms: &[NodeIndex], grouped: bool) -> Option<Vec<NodeIndex>> {
        let roots: Vec<NodeIndex> = atoms
            .iter()
            .copied()
            .filter(|a| self.parent[a.index()].is_none())
            .collect();
        if !grouped && roots.len() != 1 {
            return None;
        }
        let mut expected = atoms.iter();
        for &root in &roots {
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                if expected.next() != Some(&node) {
                    return None;
                }
                stack.extend(self.children[node.index()].iter().rev().map(|&(c, _)| c));
            }
        }
        expected.next().is_none().then_some(roots)
    }

    /// Replaces the component's forest with a depth-first spanning forest
    /// over sorted neighbours, one tree per connected fragment. Used for
    /// queries built outside the parser whose bond layout has no text
    /// order.
    fn rebuild_by_dfs(&mut self, query: &QueryMol, atoms: &[NodeIndex], labels: &[usize]) -> Vec<NodeIndex> {
        for &atom in atoms {
            let i = atom.index();
            self.children[i].clear();
            self.ring_opens[i].clear();
            self.ring_closes[i].clear();
        }
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut seen_edges: HashSet<EdgeIndex> = HashSet::new();
        let mut seen_fragments = BTreeSet::new();
        let mut roots = Vec::new();
        for &start in atoms {
            if !seen_fragments.insert(labels[start.index()]) {
                continue;
            }
            roots.push(start);
            visited.insert(start);
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> =
                vec![(start, query.as_mol().sorted_neighbors(start), 0)];
            while let Some((node, neighbors, next)) = stack.last_mut() {
                let node = *node;
                let Some(&neighbor) = neighbors.get(*next) else {
                    stack.pop();
                    continue;
                };
                *next += 1;
                let Some(edge) = query.bond_between(node, neighbor) else {
                    continue;
                };
                if !seen_edges.insert(edge) {
                    continue;
                }
                if visited.insert(neighbor) {
                    self.children[node.index()].push((neighbor, edge));
                    stack.push((neighbor, query.as_mol().sorted_neighbors(neighbor), 0));
                } else {
                    self.ring_opens[neighbor.index()].push(edge);
                    self.ring_closes[node.index()].push(edge);
                }
            }
        }
        for &atom in atoms {
            self.ring_closes[atom.index()].sort();
        }
        roots
    }
}

enum Step {
    Atom(NodeIndex),
    Bond(EdgeIndex),
    Text(char),
}

struct ComponentWriter<'a> {
    query: &'a QueryMol,
    walk: &'a Walk,
    digits: Vec<Option<u32>>,
    in_use: BTreeSet<u32>,
    out: String,
}

impl ComponentWriter<'_> {
    fn write_tree(&mut self, root: NodeIndex) {
        let mut stack = vec![Step::Atom(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(c) => self.out.push(c),
                Step::Bond(edge) => self.out.push_str(&write_bond(self.query.bond(edge))),
                Step::Atom(node) => {
                    self.write_atom_and_rings(node);
                    let kids = &self.walk.children[node.index()];
                    let last = kids.len().saturating_sub(1);
                    for (i, &(child, edge)) in kids.iter().enumerate().rev() {
                        let is_branch = i < last;
                        if is_branch {
                            stack.push(Step::Text(')'));
                        }
                        stack.push(Step::Atom(child));
                        stack.push(Step::Bond(edge));
                        if is_branch {
                            stack.push(Step::Text('('));
                        }
                    }
                }
            }
        }
    }

    /// Closures are written before openings so a freed digit can be reused
    /// at the same atom.
    fn write_atom_and_rings(&mut self, node: NodeIndex) {
        let walk = self.walk;
        write_atom(self.query.atom(node), &mut self.out);

        for &edge in &walk.ring_closes[node.index()] {
            if let Some(digit) = self.digits[edge.index()].take() {
                self.in_use.remove(&digit);
                write_ring_digit(digit, &mut self.out);
            }
        }

        for &edge in &walk.ring_opens[node.index()] {
            let digit = (1..).find(|d| !self.in_use.contains(d)).unwrap_or(1);
            self.in_use.insert(digit);
            self.digits[edge.index()] = Some(digit);
            self.out.push_str(&write_bond(self.query.bond(edge)));
            write_ring_digit(digit, &mut self.out);
        }
    }
}

fn write_ring_digit(digit: u32, out: &mut String) {
    if digit <= 9 {
        out.push_str(&digit.to_string());
    } else if digit <= 99 {
        out.push_str(&format!("%{digit:02}"));
    } else {
        out.push_str(&format!("%({digit})"));
    }
}

// ---- atoms ----

fn write_atom(atom: &QueryAtom, out: &mut String) {
    if !atom.bracketed {
        if let Some(symbol) = bare_symbol(&atom.expr) {
            out.push_str(symbol);
            return;
        }
    }
    out.push('[');
    out.push_str(&write_expr(&atom.expr, Slot::WHOLE));
    out.push(']');
}

fn bare_symbol(expr: &AtomExpr) -> Option<&'static str> {
    match expr {
        AtomExpr::True => Some("*"),
        AtomExpr::Aromatic => Some("a"),
        AtomExpr::Aliphatic => Some("A"),
        AtomExpr::Element {
            atomic_num,
            aromatic: Some(false),
        } if *atomic_num == 1 || element::is_organic_subset(*atomic_num) => {
            element::symbol(*atomic_num)
        }
        AtomExpr::Element {
            atomic_num,
            aromatic: Some(true),
        } if element::is_bare_aromatic(*atomic_num) => aromatic_symbol(*atomic_num),
        _ => None,
    }
}

fn aromatic_symbol(atomic_num: u8) -> Option<&'static str> {
    AROMATIC_BRACKET
        .iter()
        .find(|&&(_, n)| n == atomic_num)
        .map(|&(sym, _)| sym)
}

/// Where a sub-expression sits inside its bracket.
///
/// `lead`: nothing but isotope digits precede it. `follow`: the next
/// character is `]`, a charge or a map class. Both must hold for `H` to be
/// read back as hydrogen rather than as a hydrogen count.
#[derive(Debug, Clone, Copy)]
struct Slot {
    lead: bool,
    follow: bool,
}

impl Slot {
    const WHOLE: Slot = Slot {
        lead: true,
        follow: true,
    };
}

/// Binding strength of the operator at the root of `expr`: 0 `;`, 1 `,`,
/// 2 `&` or juxtaposition, 3 `!`, 4 a primitive.
fn atom_level(expr: &AtomExpr) -> u8 {
    match expr {
        AtomExpr::And(_, parts) | AtomExpr::Or(parts) if parts.len() == 1 => atom_level(&parts[0]),
        AtomExpr::And(_, parts) if parts.is_empty() => 4,
        AtomExpr::Or(parts) if parts.is_empty() => 3,
        AtomExpr::And(AndOp::Low, _) => 0,
        AtomExpr::Or(_) => 1,
        AtomExpr::And(_, _) => 2,
        AtomExpr::Not(_) => 3,
        _ => 4,
    }
}

fn write_child(expr: &AtomExpr, min_level: u8, slot: Slot) -> String {
    if atom_level(expr) < min_level {
        format!("$([{}])", write_expr(expr, Slot::WHOLE))
    } else {
        write_expr(expr, slot)
    }
}

fn write_expr(expr: &AtomExpr, slot: Slot) -> String {
    match expr {
        AtomExpr::And(_, parts) if parts.is_empty() => "*".to_string(),
        AtomExpr::Or(parts) if parts.is_empty() => "!*".to_string(),
        AtomExpr::And(_, parts) | AtomExpr::Or(parts) if parts.len() == 1 => {
            write_expr(&parts[0], slot)
        }
        AtomExpr::And(AndOp::Low, parts) => write_list(parts, ";", 0, slot),
        AtomExpr::Or(parts) => write_list(parts, ",", 1, slot),
        AtomExpr::And(op, parts) => write_chain(*op, parts, slot),
        AtomExpr::Not(inner) => {
            let slot = Slot {
                lead: false,
                follow: slot.follow,
            };
            format!("!{}", write_child(inner, 3, slot))
        }
        prim => write_primitive(prim, slot),
    }
}

fn write_list(parts: &[AtomExpr], sep: &str, min_level: u8, slot: Slot) -> String {
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let slot = Slot {
                lead: slot.lead && i == 0,
                follow: slot.follow && i == last,
            };
            write_child(part, min_level, slot)
        })
        .collect::<Vec<_>>()
        .join(sep)
}

fn write_chain(op: AndOp, parts: &[AtomExpr], slot: Slot) -> String {
    let mut out = String::new();
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        let lead = slot.lead
            && (i == 0 || (op == AndOp::Implicit && i == 1 && matches!(parts[0], AtomExpr::Isotope(_))));
        let follow = if i == last {
            slot.follow
        } else {
            op == AndOp::Implicit
                && matches!(
                    first_primitive(&parts[i + 1]),
                    AtomExpr::Charge { .. } | AtomExpr::AtomMapClass(_)
                )
        };
        let text = write_child(part, 2, Slot { lead, follow });
        if i > 0 {
            if op == AndOp::Implicit && needs_separator(&parts[i - 1], &out, &text) {
                out.push('&');
            } else {
                out.push_str(op.symbol());
            }
        }
        out.push_str(&text);
    }
    out
}

fn first_primitive(expr: &AtomExpr) -> &AtomExpr {
    match expr {
        AtomExpr::And(_, parts) | AtomExpr::Or(parts) if parts.len() == 1 => first_primitive(&parts[0]),
        AtomExpr::And(AndOp::Implicit | AndOp::High, parts) if !parts.is_empty() => {
            first_primitive(&parts[0])
        }
        other => other,
    }
}

fn last_primitive(expr: &AtomExpr) -> &AtomExpr {
    match expr {
        AtomExpr::And(_, parts) | AtomExpr::Or(parts) if parts.len() == 1 => last_primitive(&parts[0]),
        AtomExpr::And(AndOp::Implicit | AndOp::High, parts) if !parts.is_empty() => {
            last_primitive(&parts[parts.len() - 1])
        }
        AtomExpr::Not(inner) if atom_level(inner) >= 3 => last_primitive(inner),
        other => other,
    }
}

/// Whether writing `next` directly after `prev` would read back as a
/// different token sequence.
fn needs_separator(prev: &AtomExpr, prev_text: &str, next_text: &str) -> bool {
    let Some(c) = next_text.chars().next() else {
        return false;
    };
    let last = last_primitive(prev);
    if c.is_ascii_digit() {
        return absorbs_digits(last);
    }
    if c == '+' || c == '-' {
        return matches!(
            last,
            AtomExpr::Charge { value, notation: ChargeNotation::Repeated }
                if (*value > 0 && c == '+') || (*value < 0 && c == '-')
        );
    }
    if c.is_ascii_lowercase() {
        if matches!(last, AtomExpr::Aromatic) && c == 's' {
            return true;
        }
        if let Some(p) = prev_text.chars().last().filter(|p| p.is_ascii_uppercase()) {
            let pair: String = [p, c].iter().collect();
            return element::atomic_num_from_symbol(&pair).is_some();
        }
    }
    false
}

fn absorbs_digits(expr: &AtomExpr) -> bool {
    match expr {
        AtomExpr::Degree(_)
        | AtomExpr::Connectivity(_)
        | AtomExpr::Valence(_)
        | AtomExpr::TotalHCount(_)
        | AtomExpr::ImplicitHCount(_)
        | AtomExpr::RingMembership(_)
        | AtomExpr::SmallestRingSize(_)
        | AtomExpr::RingBondCount(_)
        | AtomExpr::Isotope(_)
        | AtomExpr::AtomMapClass(_) => true,
        AtomExpr::Element { aromatic: None, .. } => true,
        AtomExpr::Element {
            atomic_num: 1,
            aromatic: Some(false),
        } => true,
        AtomExpr::Charge {
            notation: ChargeNotation::Signed,
            ..
        } => true,
        AtomExpr::Charge {
            value,
            notation: ChargeNotation::Repeated,
        } => value.unsigned_abs() <= 1,
        _ => false,
    }
}

fn count(letter: char, n: Option<u8>) -> String {
    match n {
        Some(n) => format!("{letter}{n}"),
        None => letter.to_string(),
    }
}

fn write_primitive(expr: &AtomExpr, slot: Slot) -> String {
    match expr {
        AtomExpr::True => "*".to_string(),
        AtomExpr::Aromatic => "a".to_string(),
        AtomExpr::Aliphatic => "A".to_string(),
        AtomExpr::Element {
            atomic_num: 1,
            aromatic: Some(false),
        } => {
            if slot.lead && slot.follow {
                "H".to_string()
            } else {
                "$([H])".to_string()
            }
        }
        AtomExpr::Element {
            atomic_num,
            aromatic: Some(false),
        } => match element::symbol(*atomic_num) {
            Some(sym) => sym.to_string(),
            None => format!("$([#{atomic_num}&A])"),
        },
        AtomExpr::Element {
            atomic_num,
            aromatic: Some(true),
        } => match aromatic_symbol(*atomic_num) {
            Some(sym) => sym.to_string(),
            None => format!("$([#{atomic_num}&a])"),
        },
        AtomExpr::Element {
            atomic_num,
            aromatic: None,
        } => format!("#{atomic_num}"),
        AtomExpr::Isotope(n) => n.to_string(),
        AtomExpr::Degree(n) => count('D', *n),
        AtomExpr::Connectivity(n) => count('X', *n),
        AtomExpr::Valence(n) => count('v', *n),
        AtomExpr::TotalHCount(None) if slot.lead && slot.follow => "H1".to_string(),
        AtomExpr::TotalHCount(n) => count('H', *n),
        AtomExpr::ImplicitHCount(n) => count('h', *n),
        AtomExpr::RingMembership(n) => count('R', *n),
        AtomExpr::SmallestRingSize(n) => count('r', *n),
        AtomExpr::RingBondCount(n) => count('x', *n),
        AtomExpr::Charge { value, notation } => write_charge(*value, *notation),
        AtomExpr::AtomMapClass(n) => format!(":{n}"),
        AtomExpr::Recursive(inner) => format!("$({})", to_smarts(inner)),
        AtomExpr::And(..) | AtomExpr::Or(_) | AtomExpr::Not(_) => write_expr(expr, slot),
    }
}

fn write_charge(value: i8, notation: ChargeNotation) -> String {
    let sign = if value < 0 { '-' } else { '+' };
    let magnitude = value.unsigned_abs();
    match notation {
        ChargeNotation::Repeated if magnitude > 0 => sign.to_string().repeat(magnitude as usize),
        _ => format!("{sign}{magnitude}"),
    }
}

// ---- bonds ----

fn write_bond(expr: &BondExpr) -> String {
    if matches!(expr, BondExpr::Implicit) {
        return String::new();
    }
    if bond_expressible(expr, 0) {
        write_bond_expr(expr)
    } else {
        write_bond_dnf(expr)
    }
}

fn bond_symbol(expr: &BondExpr) -> Option<char> {
    Some(match expr {
        BondExpr::Any => '~',
        BondExpr::Single => '-',
        BondExpr::Double => '=',
        BondExpr::Triple => '#',
        BondExpr::Aromatic => ':',
        BondExpr::Ring => '@',
        BondExpr::Up => '/',
        BondExpr::Down => '\\',
        _ => return None,
    })
}

/// Whether `expr` can be written with plain operators at a position that
/// needs binding strength `min_level` or tighter.
fn bond_expressible(expr: &BondExpr, min_level: u8) -> bool {
    match expr {
        BondExpr::Implicit => false,
        BondExpr::Not(inner) => min_level <= 3 && bond_expressible(inner, 3),
        BondExpr::And(_, parts) | BondExpr::Or(parts) if parts.len() == 1 => {
            bond_expressible(&parts[0], min_level)
        }
        BondExpr::And(_, parts) | BondExpr::Or(parts) if parts.is_empty() => false,
        BondExpr::And(AndOp::Low, parts) => parts.iter().all(|p| bond_expressible(p, 0)),
        BondExpr::Or(parts) => min_level <= 1 && parts.iter().all(|p| bond_expressible(p, 1)),
        BondExpr::And(_, parts) => min_level <= 2 && parts.iter().all(|p| bond_expressible(p, 2)),
        _ => true,
    }
}

fn write_bond_expr(expr: &BondExpr) -> String {
    match expr {
        BondExpr::Not(inner) => format!("!{}", write_bond_expr(inner)),
        BondExpr::And(_, parts) | BondExpr::Or(parts) if parts.len() == 1 => write_bond_expr(&parts[0]),
        BondExpr::And(op, parts) => parts
            .iter()
            .map(write_bond_expr)
            .collect::<Vec<_>>()
            .join(op.symbol()),
        BondExpr::Or(parts) => parts
            .iter()
            .map(write_bond_expr)
            .collect::<Vec<_>>()
            .join(","),
        prim => bond_symbol(prim).map(String::from).unwrap_or_default(),
    }
}

type Clause<'a> = Vec<(bool, &'a BondExpr)>;

static IMPLICIT_BOND: [BondExpr; 2] = [BondExpr::Single, BondExpr::Aromatic];

/// Disjunctive normal form of `expr` (negated when `negate` is set).
/// Each clause is a conjunction of possibly negated primitives.
fn bond_dnf(expr: &BondExpr, negate: bool) -> Vec<Clause<'_>> {
    match expr {
        BondExpr::Implicit => {
            let literals = IMPLICIT_BOND.iter().map(|p| vec![(negate, p)]).collect::<Vec<_>>();
            if negate {
                vec![literals.into_iter().flatten().collect()]
            } else {
                literals
            }
        }
        BondExpr::Not(inner) => bond_dnf(inner, !negate),
        BondExpr::And(_, parts) if !negate => product(parts.iter().map(|p| bond_dnf(p, false))),
        BondExpr::And(_, parts) => parts.iter().flat_map(|p| bond_dnf(p, true)).collect(),
        BondExpr::Or(parts) if !negate => parts.iter().flat_map(|p| bond_dnf(p, false)).collect(),
        BondExpr::Or(parts) => product(parts.iter().map(|p| bond_dnf(p, true))),
        prim => vec![vec![(negate, prim)]],
    }
}

fn product<'a>(factors: impl Iterator<Item = Vec<Clause<'a>>>) -> Vec<Clause<'a>> {
    let mut acc: Vec<Clause<'a>> = vec![Vec::new()];
    for factor in factors {
        let mut next = Vec::with_capacity(acc.len() * factor.len());
        for left in &acc {
            for right in &factor {
                let mut clause = left.clone();
                clause.extend(right.iter().copied());
                next.push(clause);
            }
        }
        acc = next;
    }
    acc
}

fn write_bond_dnf(expr: &BondExpr) -> String {
    let clauses = bond_dnf(expr, false);
    if clauses.is_empty() {
        return "!~".to_string();
    }
    clauses
        .iter()
        .map(|clause| {
            if clause.is_empty() {
                return "~".to_string();
            }
            clause
                .iter()
                .map(|&(negated, prim)| {
                    let symbol = bond_symbol(prim).unwrap_or('~');
                    if negated {
                        format!("!{symbol}")
                    } else {
                        symbol.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("&")
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(atomic_num: u8, aromatic: Option<bool>) -> AtomExpr {
        AtomExpr::Element {
            atomic_num,
            aromatic,
        }
    }

    fn single_atom(expr: AtomExpr) -> String {
        let query = QueryMol::from_atom_bond_list(vec![QueryAtom::bracket(expr)], vec![]).unwrap();
        to_smarts(&query)
    }

    #[test]
    fn writes_bare_atoms_without_brackets() {
        let query = QueryMol::from_atom_bond_list(
            vec![
                QueryAtom::bare(element(6, Some(false))),
                QueryAtom::bare(element(7, Some(true))),
                QueryAtom::bare(element(17, Some(false))),
            ],
            vec![(0, 1, BondExpr::Implicit), (1, 2, BondExpr::Double)],
        )
        .unwrap();
        assert_eq!(to_smarts(&query), "Cn=Cl");
    }

    #[test]
    fn bare_flag_falls_back_to_brackets() {
        let query =
            QueryMol::from_atom_bond_list(vec![QueryAtom::bare(element(26, Some(false)))], vec![])
                .unwrap();
        assert_eq!(to_smarts(&query), "[Fe]");
    }

    #[test]
    fn inserts_separator_where_juxtaposition_would_merge() {
        let expr = AtomExpr::And(AndOp::Implicit, vec![AtomExpr::Degree(None), AtomExpr::Isotope(2)]);
        assert_eq!(single_atom(expr), "[D&2]");

        let expr = AtomExpr::And(AndOp::Implicit, vec![element(6, Some(false)), AtomExpr::Aromatic]);
        assert_eq!(single_atom(expr), "[C&a]");

        let expr = AtomExpr::And(AndOp::Implicit, vec![element(6, Some(false)), AtomExpr::Degree(Some(2))]);
        assert_eq!(single_atom(expr), "[CD2]");
    }

    #[test]
    fn hydrogen_element_outside_lead_position() {
        let expr = AtomExpr::And(AndOp::High, vec![AtomExpr::Degree(Some(1)), element(1, Some(false))]);
        assert_eq!(single_atom(expr), "[D1&$([H])]");
        assert_eq!(single_atom(AtomExpr::TotalHCount(None)), "[H1]");
    }

    #[test]
    fn precedence_violations_use_recursive_wrapper() {
        let or = AtomExpr::Or(vec![element(6, Some(false)), element(7, Some(false))]);
        let expr = AtomExpr::And(AndOp::High, vec![or, AtomExpr::Degree(Some(2))]);
        assert_eq!(single_atom(expr), "[$([C,N])&D2]");
    }

    #[test]
    fn nested_bond_expressions_use_dnf() {
        let bond = BondExpr::And(
            AndOp::High,
            vec![BondExpr::Or(vec![BondExpr::Single, BondExpr::Double]), BondExpr::Ring],
        );
        assert_eq!(write_bond(&bond), "-&@,=&@");
        let bond = BondExpr::Not(Box::new(BondExpr::Implicit));
        assert_eq!(write_bond(&bond), "!-&!:");
    }

    #[test]
    fn ring_digits_reuse_lowest_free() {
        let atoms = (0..6).map(|_| QueryAtom::bare(element(6, Some(false)))).collect();
        let bonds = vec![
            (0, 1, BondExpr::Implicit),
            (1, 2, BondExpr::Implicit),
            (2, 0, BondExpr::Double),
            (2, 3, BondExpr::Implicit),
            (3, 4, BondExpr::Implicit),
            (4, 5, BondExpr::Implicit),
            (5, 3, BondExpr::Implicit),
        ];
        let query = QueryMol::from_atom_bond_list(atoms, bonds).unwrap();
        assert_eq!(to_smarts(&query), "C=1CC1C1CC1");
    }

    #[test]
    fn bonds_without_text_order_use_depth_first_walk() {
        let atoms = (0..3).map(|_| QueryAtom::bare(element(6, Some(false)))).collect();
        let bonds = vec![(2, 0, BondExpr::Single), (1, 2, BondExpr::Double)];
        let query = QueryMol::from_atom_bond_list(atoms, bonds).unwrap();
        assert_eq!(to_smarts(&query), "C-C=C");
    }

    #[test]
    fn long_chains_are_written_without_deep_recursion() {
        let n = 20_000;
        let atoms = (0..n).map(|_| QueryAtom::bare(element(6, Some(false)))).collect();
        let bonds = (1..n).map(|i| (i - 1, i, BondExpr::Implicit)).collect();
        let query = QueryMol::from_atom_bond_list(atoms, bonds).unwrap();
        assert_eq!(to_smarts(&query), "C".repeat(n));
    }
}
