use std::collections::HashMap;

use log::{debug, trace};
use petgraph::graph::NodeIndex;

use crate::element::{self, AROMATIC_BRACKET, MAX_ATOMIC_NUM};
use crate::mol::Mol;

use super::error::{ResourceLimitKind, SmartsError, StructuralErrorKind, SyntaxErrorKind};
use super::limits::ParseLimits;
use super::query::{AndOp, AtomExpr, BondExpr, ChargeNotation, Component, QueryAtom, QueryMol};

const BOND_CHARS: &str = "-=#~:/\\@!";

struct RingOpen {
    atom: NodeIndex,
    bond: Option<BondExpr>,
    pos: usize,
}

struct Branch {
    atom: NodeIndex,
    pos: usize,
}

/// Single left-to-right scan over `chars[start..end]`.
///
/// Positions are always offsets into the full input, so errors raised inside
/// a `$(...)` sub-query point at the right character.
struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
    end: usize,
    limits: &'a ParseLimits,
    depth: usize,
    atoms_total: usize,
    bracket_start: usize,
}

impl<'a> Parser<'a> {
    fn new(chars: &'a [char], start: usize, end: usize, limits: &'a ParseLimits, depth: usize) -> Self {
        Self {
            chars,
            pos: start,
            end,
            limits,
            depth,
            atoms_total: 0,
            bracket_start: start,
        }
    }

    fn peek(&self) -> Option<char> {
        if self.pos < self.end {
            Some(self.chars[self.pos])
        } else {
            None
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        let i = self.pos + offset;
        if i < self.end {
            Some(self.chars[i])
        } else {
            None
        }
    }

    fn syntax(&self, kind: SyntaxErrorKind) -> SmartsError {
        SmartsError::syntax(self.pos, kind)
    }

    fn unexpected(&self) -> SmartsError {
        match self.peek() {
            Some(ch) => self.syntax(SyntaxErrorKind::UnexpectedChar(ch)),
            None => self.syntax(SyntaxErrorKind::UnexpectedEnd),
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(d);
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn parse_count(&mut self) -> Result<Option<u8>, SmartsError> {
        let start = self.pos;
        match self.parse_number() {
            Some(n) => u8::try_from(n)
                .map(Some)
                .map_err(|_| SmartsError::syntax(start, SyntaxErrorKind::NumberOutOfRange)),
            None => Ok(None),
        }
    }

    fn add_atom(
        &mut self,
        mol: &mut Mol<QueryAtom, BondExpr>,
        atom: QueryAtom,
        pos: usize,
    ) -> Result<NodeIndex, SmartsError> {
        self.atoms_total += 1;
        if self.atoms_total > self.limits.max_atoms {
            return Err(SmartsError::limit(
                pos,
                ResourceLimitKind::TooManyAtoms {
                    max: self.limits.max_atoms,
                },
            ));
        }
        Ok(mol.add_atom(atom))
    }

    fn parse_query(&mut self) -> Result<QueryMol, SmartsError> {
        let mut mol = Mol::new();
        let mut components: Vec<Component> = Vec::new();
        let mut atom_component: Vec<usize> = Vec::new();
        let mut open_component: Option<usize> = None;
        let mut group_open: Option<usize> = None;
        let mut after_group = false;
        let mut branches: Vec<Branch> = Vec::new();
        let mut current: Option<NodeIndex> = None;
        let mut pending_bond: Option<(BondExpr, usize)> = None;
        let mut rings: HashMap<u16, RingOpen> = HashMap::new();

        while let Some(ch) = self.peek() {
            let start = self.pos;
            if after_group && ch != '.' {
                return Err(self.syntax(SyntaxErrorKind::TrailingAfterGroup));
            }

            match ch {
                '(' => {
                    if let Some((_, bond_pos)) = pending_bond {
                        return Err(SmartsError::syntax(bond_pos, SyntaxErrorKind::DanglingBond));
                    }
                    self.pos += 1;
                    if self.peek() == Some(')') {
                        return Err(SmartsError::syntax(start, SyntaxErrorKind::EmptyGroup));
                    }
                    if let Some(atom) = current {
                        branches.push(Branch { atom, pos: start });
                    } else if group_open.is_some() {
                        return Err(SmartsError::syntax(start, SyntaxErrorKind::NestedGroup));
                    } else {
                        trace!("opening component group at {start}");
                        group_open = Some(start);
                        components.push(Component::new(Vec::new(), true));
                        open_component = Some(components.len() - 1);
                    }
                }
                ')' => {
                    if let Some((_, bond_pos)) = pending_bond {
                        return Err(SmartsError::syntax(bond_pos, SyntaxErrorKind::DanglingBond));
                    }
                    if let Some(branch) = branches.pop() {
                        current = Some(branch.atom);
                    } else if group_open.is_some() {
                        if current.is_none() {
                            return Err(self.syntax(SyntaxErrorKind::EmptyFragment));
                        }
                        group_open = None;
                        open_component = None;
                        current = None;
                        after_group = true;
                    } else {
                        return Err(self.syntax(SyntaxErrorKind::UnmatchedParen));
                    }
                    self.pos += 1;
                }
                '.' => {
                    if !branches.is_empty() {
                        return Err(self.syntax(SyntaxErrorKind::UnexpectedChar('.')));
                    }
                    if let Some((_, bond_pos)) = pending_bond {
                        return Err(SmartsError::syntax(bond_pos, SyntaxErrorKind::DanglingBond));
                    }
                    if current.is_none() && !after_group {
                        return Err(self.syntax(SyntaxErrorKind::EmptyFragment));
                    }
                    current = None;
                    after_group = false;
                    if group_open.is_none() {
                        open_component = None;
                    }
                    self.pos += 1;
                }
                '0'..='9' | '%' => {
                    let digit = self.parse_ring_number()?;
                    let Some(atom) = current else {
                        return Err(SmartsError::syntax(
                            start,
                            SyntaxErrorKind::RingClosureWithoutAtom,
                        ));
                    };
                    let bond = pending_bond.take().map(|(b, _)| b);
                    if let Some(open) = rings.remove(&digit) {
                        if open.atom == atom {
                            return Err(SmartsError::structural(
                                start,
                                StructuralErrorKind::SelfBond(digit),
                            ));
                        }
                        if mol.bond_between(atom, open.atom).is_some() {
                            return Err(SmartsError::structural(
                                start,
                                StructuralErrorKind::DuplicateRingBond(digit),
                            ));
                        }
                        if atom_component[atom.index()] != atom_component[open.atom.index()] {
                            return Err(SmartsError::structural(
                                start,
                                StructuralErrorKind::BondCrossesComponent(
                                    open.atom.index(),
                                    atom.index(),
                                ),
                            ));
                        }
                        let expr = match (open.bond, bond) {
                            (Some(a), Some(b)) if a != b => {
                                return Err(SmartsError::structural(
                                    start,
                                    StructuralErrorKind::ConflictingRingBond(digit),
                                ));
                            }
                            (Some(a), _) => a,
                            (None, Some(b)) => b,
                            (None, None) => BondExpr::Implicit,
                        };
                        trace!("ring closure {digit}: {} - {}", open.atom.index(), atom.index());
                        mol.add_bond(atom, open.atom, expr);
                    } else {
                        if rings.len() >= self.limits.max_open_ring_closures {
                            return Err(SmartsError::limit(
                                start,
                                ResourceLimitKind::TooManyOpenRings {
                                    max: self.limits.max_open_ring_closures,
                                },
                            ));
                        }
                        rings.insert(
                            digit,
                            RingOpen {
                                atom,
                                bond,
                                pos: start,
                            },
                        );
                    }
                }
                c if BOND_CHARS.contains(c) => {
                    if current.is_none() || pending_bond.is_some() {
                        return Err(SmartsError::syntax(start, SyntaxErrorKind::DanglingBond));
                    }
                    let bond = self.parse_bond_expr()?;
                    pending_bond = Some((bond, start));
                }
                _ => {
                    let atom = if ch == '[' {
                        QueryAtom::bracket(self.parse_bracket_atom()?)
                    } else {
                        QueryAtom::bare(self.parse_bare_atom()?)
                    };
                    if current.is_none() {
                        if let Some((_, bond_pos)) = pending_bond {
                            return Err(SmartsError::syntax(bond_pos, SyntaxErrorKind::DanglingBond));
                        }
                    }
                    let idx = self.add_atom(&mut mol, atom, start)?;
                    let component = match open_component {
                        Some(c) => c,
                        None => {
                            components.push(Component::new(Vec::new(), false));
                            let c = components.len() - 1;
                            open_component = Some(c);
                            c
                        }
                    };
                    components[component].atoms.push(idx);
                    atom_component.push(component);
                    if let Some(prev) = current {
                        let bond = pending_bond.take().map_or(BondExpr::Implicit, |(b, _)| b);
                        mol.add_bond(prev, idx, bond);
                    }
                    current = Some(idx);
                }
            }
        }

        if let Some((_, bond_pos)) = pending_bond {
            return Err(SmartsError::syntax(bond_pos, SyntaxErrorKind::DanglingBond));
        }
        if let Some(branch) = branches.last() {
            return Err(SmartsError::syntax(branch.pos, SyntaxErrorKind::UnmatchedParen));
        }
        if let Some(pos) = group_open {
            return Err(SmartsError::syntax(pos, SyntaxErrorKind::UnmatchedParen));
        }
        if current.is_none() && !after_group {
            return Err(self.syntax(SyntaxErrorKind::EmptyFragment));
        }
        if let Some((&digit, open)) = rings.iter().min_by_key(|(_, open)| open.pos) {
            return Err(SmartsError::structural(
                open.pos,
                StructuralErrorKind::UnclosedRing(digit),
            ));
        }

        QueryMol::from_graph(mol, components)
    }

    fn parse_ring_number(&mut self) -> Result<u16, SmartsError> {
        let start = self.pos;
        let invalid = SmartsError::syntax(start, SyntaxErrorKind::InvalidRingNumber);
        if self.peek() != Some('%') {
            let digit = self.peek().and_then(|c| c.to_digit(10)).ok_or(invalid)?;
            self.pos += 1;
            return Ok(digit as u16);
        }
        self.pos += 1;
        if self.peek() == Some('(') {
            self.pos += 1;
            let n = self.parse_number().ok_or_else(|| invalid.clone())?;
            if self.peek() != Some(')') {
                return Err(invalid);
            }
            self.pos += 1;
            return u16::try_from(n).map_err(|_| invalid);
        }
        match (
            self.peek().and_then(|c| c.to_digit(10)),
            self.peek_at(1).and_then(|c| c.to_digit(10)),
        ) {
            (Some(d1), Some(d2)) => {
                self.pos += 2;
                Ok((d1 * 10 + d2) as u16)
            }
            _ => Err(invalid),
        }
    }

    // ---- bond expressions ----

    fn at_bond_operand_end(&self) -> bool {
        !self.peek().is_some_and(|c| BOND_CHARS.contains(c))
    }

    fn parse_bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = vec![self.parse_bond_or()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            if self.at_bond_operand_end() {
                return Err(self.syntax(SyntaxErrorKind::MissingOperand(';')));
            }
            parts.push(self.parse_bond_or()?);
        }
        Ok(join_and(AndOp::Low, parts, BondExpr::And))
    }

    fn parse_bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = vec![self.parse_bond_high()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            if self.at_bond_operand_end() {
                return Err(self.syntax(SyntaxErrorKind::MissingOperand(',')));
            }
            parts.push(self.parse_bond_high()?);
        }
        Ok(join_or(parts, BondExpr::Or))
    }

    fn parse_bond_high(&mut self) -> Result<BondExpr, SmartsError> {
        let mut expr = self.parse_bond_not(0)?;
        loop {
            let op = match self.peek() {
                Some('&') => {
                    self.pos += 1;
                    if self.at_bond_operand_end() {
                        return Err(self.syntax(SyntaxErrorKind::MissingOperand('&')));
                    }
                    AndOp::High
                }
                Some(c) if BOND_CHARS.contains(c) => AndOp::Implicit,
                _ => break,
            };
            let next = self.parse_bond_not(0)?;
            expr = match expr {
                BondExpr::And(existing, mut parts) if existing == op => {
                    parts.push(next);
                    BondExpr::And(existing, parts)
                }
                other => BondExpr::And(op, vec![other, next]),
            };
        }
        Ok(expr)
    }

    fn parse_bond_not(&mut self, depth: usize) -> Result<BondExpr, SmartsError> {
        if self.peek() != Some('!') {
            return self.parse_bond_primitive();
        }
        self.check_depth(depth)?;
        self.pos += 1;
        if self.at_bond_operand_end() {
            return Err(self.syntax(SyntaxErrorKind::MissingOperand('!')));
        }
        Ok(BondExpr::Not(Box::new(self.parse_bond_not(depth + 1)?)))
    }

    fn parse_bond_primitive(&mut self) -> Result<BondExpr, SmartsError> {
        let expr = match self.peek() {
            Some('-') => BondExpr::Single,
            Some('=') => BondExpr::Double,
            Some('#') => BondExpr::Triple,
            Some('~') => BondExpr::Any,
            Some(':') => BondExpr::Aromatic,
            Some('@') => BondExpr::Ring,
            Some('/') => BondExpr::Up,
            Some('\\') => BondExpr::Down,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(expr)
    }

    fn check_depth(&self, extra: usize) -> Result<(), SmartsError> {
        let max = self.limits.max_recursion_depth;
        if self.depth.saturating_add(extra) >= max {
            return Err(self.limit_depth());
        }
        Ok(())
    }

    fn limit_depth(&self) -> SmartsError {
        SmartsError::limit(
            self.pos,
            ResourceLimitKind::NestingTooDeep {
                max: self.limits.max_recursion_depth,
            },
        )
    }

    // ---- atoms ----

    fn parse_bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let ch = self.peek().ok_or_else(|| self.unexpected())?;
        let expr = match ch {
            '*' => AtomExpr::True,
            'a' => AtomExpr::Aromatic,
            'A' => AtomExpr::Aliphatic,
            'H' => AtomExpr::Element {
                atomic_num: 1,
                aromatic: Some(false),
            },
            'C' if self.peek_at(1) == Some('l') => {
                self.pos += 2;
                return Ok(AtomExpr::Element {
                    atomic_num: 17,
                    aromatic: Some(false),
                });
            }
            'B' if self.peek_at(1) == Some('r') => {
                self.pos += 2;
                return Ok(AtomExpr::Element {
                    atomic_num: 35,
                    aromatic: Some(false),
                });
            }
            c if c.is_ascii_uppercase() => {
                let num = element::atomic_num_from_symbol(c.encode_utf8(&mut [0; 4]))
                    .filter(|&n| element::is_organic_subset(n))
                    .ok_or_else(|| self.unexpected())?;
                AtomExpr::Element {
                    atomic_num: num,
                    aromatic: Some(false),
                }
            }
            c if c.is_ascii_lowercase() => {
                let num = AROMATIC_BRACKET
                    .iter()
                    .find(|&&(sym, n)| sym.len() == 1 && sym.starts_with(c) && element::is_bare_aromatic(n))
                    .map(|&(_, n)| n)
                    .ok_or_else(|| self.unexpected())?;
                AtomExpr::Element {
                    atomic_num: num,
                    aromatic: Some(true),
                }
            }
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(expr)
    }

    fn parse_bracket_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let saved = self.bracket_start;
        self.bracket_start = self.pos;
        self.pos += 1;
        if self.peek() == Some(']') {
            return Err(SmartsError::syntax(
                self.bracket_start,
                SyntaxErrorKind::EmptyBracket,
            ));
        }
        if self.peek().is_none() {
            return Err(SmartsError::syntax(
                self.bracket_start,
                SyntaxErrorKind::UnclosedBracket,
            ));
        }

        let expr = self.parse_low_and()?;

        match self.peek() {
            Some(']') => self.pos += 1,
            Some(_) => return Err(self.unexpected()),
            None => {
                return Err(SmartsError::syntax(
                    self.bracket_start,
                    SyntaxErrorKind::UnclosedBracket,
                ));
            }
        }
        self.bracket_start = saved;
        Ok(expr)
    }

    fn at_operand_end(&self) -> bool {
        matches!(self.peek(), None | Some(']') | Some(',') | Some(';') | Some('&'))
    }

    fn missing_operand(&self, op: char) -> SmartsError {
        if self.peek().is_none() {
            SmartsError::syntax(self.bracket_start, SyntaxErrorKind::UnclosedBracket)
        } else {
            self.syntax(SyntaxErrorKind::MissingOperand(op))
        }
    }

    fn parse_low_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_or()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            if self.at_operand_end() {
                return Err(self.missing_operand(';'));
            }
            parts.push(self.parse_or()?);
        }
        Ok(join_and(AndOp::Low, parts, AtomExpr::And))
    }

    fn parse_or(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_high_and()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            if self.at_operand_end() {
                return Err(self.missing_operand(','));
            }
            parts.push(self.parse_high_and()?);
        }
        Ok(join_or(parts, AtomExpr::Or))
    }

    fn parse_high_and(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.at_operand_end() {
            return Err(self.unexpected());
        }
        let mut expr = self.parse_not(0)?;
        loop {
            let op = match self.peek() {
                None | Some(']') | Some(',') | Some(';') => break,
                Some('&') => {
                    self.pos += 1;
                    if self.at_operand_end() {
                        return Err(self.missing_operand('&'));
                    }
                    AndOp::High
                }
                Some(_) => AndOp::Implicit,
            };
            let next = self.parse_not(0)?;
            expr = match expr {
                AtomExpr::And(existing, mut parts) if existing == op => {
                    parts.push(next);
                    AtomExpr::And(existing, parts)
                }
                other => AtomExpr::And(op, vec![other, next]),
            };
        }
        Ok(expr)
    }

    fn parse_not(&mut self, depth: usize) -> Result<AtomExpr, SmartsError> {
        if self.peek() != Some('!') {
            return self.parse_primitive();
        }
        self.check_depth(depth)?;
        self.pos += 1;
        if self.at_operand_end() {
            return Err(self.missing_operand('!'));
        }
        Ok(AtomExpr::Not(Box::new(self.parse_not(depth + 1)?)))
    }

    /// `H` names the element only as the first primitive of the bracket
    /// (isotope digits aside) when followed by `]`, a charge or a map class.
    fn is_hydrogen_element(&self) -> bool {
        let lead = self.chars[self.bracket_start + 1..self.pos]
            .iter()
            .all(|c| c.is_ascii_digit());
        lead && matches!(self.peek_at(1), Some(']') | Some('+') | Some('-') | Some(':'))
    }

    fn two_letter_element(&self) -> Option<u8> {
        let first = self.peek()?;
        let second = self.peek_at(1).filter(|c| c.is_ascii_lowercase())?;
        let symbol: String = [first, second].iter().collect();
        element::atomic_num_from_symbol(&symbol)
    }

    fn parse_primitive(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let ch = self.peek().ok_or_else(|| self.unexpected())?;

        if ch.is_ascii_uppercase() {
            if let Some(num) = self.two_letter_element() {
                self.pos += 2;
                return Ok(AtomExpr::Element {
                    atomic_num: num,
                    aromatic: Some(false),
                });
            }
        }
        if ch.is_ascii_lowercase() {
            for &(sym, num) in AROMATIC_BRACKET.iter() {
                if sym.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c)) {
                    self.pos += sym.len();
                    return Ok(AtomExpr::Element {
                        atomic_num: num,
                        aromatic: Some(true),
                    });
                }
            }
        }

        match ch {
            '*' => {
                self.pos += 1;
                Ok(AtomExpr::True)
            }
            'a' => {
                self.pos += 1;
                Ok(AtomExpr::Aromatic)
            }
            'A' => {
                self.pos += 1;
                Ok(AtomExpr::Aliphatic)
            }
            '#' => {
                self.pos += 1;
                let num = self.parse_number().ok_or_else(|| {
                    SmartsError::syntax(start, SyntaxErrorKind::InvalidAtomicNum)
                })?;
                if num == 0 || num > MAX_ATOMIC_NUM as u32 {
                    return Err(SmartsError::syntax(start, SyntaxErrorKind::InvalidAtomicNum));
                }
                Ok(AtomExpr::Element {
                    atomic_num: num as u8,
                    aromatic: None,
                })
            }
            'H' if self.is_hydrogen_element() => {
                self.pos += 1;
                Ok(AtomExpr::Element {
                    atomic_num: 1,
                    aromatic: Some(false),
                })
            }
            'H' | 'D' | 'X' | 'R' | 'v' | 'h' | 'r' | 'x' => {
                self.pos += 1;
                let n = self.parse_count()?;
                Ok(match ch {
                    'H' => AtomExpr::TotalHCount(n),
                    'D' => AtomExpr::Degree(n),
                    'X' => AtomExpr::Connectivity(n),
                    'R' => AtomExpr::RingMembership(n),
                    'v' => AtomExpr::Valence(n),
                    'h' => AtomExpr::ImplicitHCount(n),
                    'r' => AtomExpr::SmallestRingSize(n),
                    _ => AtomExpr::RingBondCount(n),
                })
            }
            '+' | '-' => self.parse_charge(ch),
            ':' => {
                self.pos += 1;
                let n = self
                    .parse_number()
                    .ok_or_else(|| SmartsError::syntax(start, SyntaxErrorKind::UnexpectedChar(':')))?;
                u16::try_from(n)
                    .map(AtomExpr::AtomMapClass)
                    .map_err(|_| SmartsError::syntax(start, SyntaxErrorKind::NumberOutOfRange))
            }
            '$' => self.parse_recursive(),
            c if c.is_ascii_digit() => {
                let n = self.parse_number().unwrap_or(0);
                u16::try_from(n)
                    .map(AtomExpr::Isotope)
                    .map_err(|_| SmartsError::syntax(start, SyntaxErrorKind::NumberOutOfRange))
            }
            c if c.is_ascii_uppercase() => {
                let num = element::atomic_num_from_symbol(c.encode_utf8(&mut [0; 4]))
                    .ok_or_else(|| SmartsError::syntax(start, SyntaxErrorKind::UnknownElement))?;
                self.pos += 1;
                Ok(AtomExpr::Element {
                    atomic_num: num,
                    aromatic: Some(false),
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_charge(&mut self, sign: char) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        self.pos += 1;
        let factor: i32 = if sign == '+' { 1 } else { -1 };
        let (magnitude, notation) = match self.parse_number() {
            Some(n) => (n, ChargeNotation::Signed),
            None => {
                let mut count = 1u32;
                while self.peek() == Some(sign) {
                    self.pos += 1;
                    count += 1;
                }
                (count, ChargeNotation::Repeated)
            }
        };
        let value = i8::try_from(factor * magnitude.min(i32::MAX as u32) as i32)
            .map_err(|_| SmartsError::syntax(start, SyntaxErrorKind::NumberOutOfRange))?;
        Ok(AtomExpr::Charge { value, notation })
    }

    fn parse_recursive(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        self.pos += 1;
        if self.peek() != Some('(') {
            return Err(SmartsError::syntax(start, SyntaxErrorKind::UnclosedRecursive));
        }
        self.pos += 1;
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(ch) = self.peek() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        if depth != 0 {
            return Err(SmartsError::syntax(start, SyntaxErrorKind::UnclosedRecursive));
        }
        let inner_end = self.pos;
        self.pos += 1;

        if inner_start == inner_end {
            return Err(SmartsError::syntax(inner_start, SyntaxErrorKind::EmptyGroup));
        }
        if self.depth + 1 >= self.limits.max_recursion_depth {
            return Err(SmartsError::limit(
                start,
                ResourceLimitKind::NestingTooDeep {
                    max: self.limits.max_recursion_depth,
                },
            ));
        }

        let mut sub = Parser::new(self.chars, inner_start, inner_end, self.limits, self.depth + 1);
        sub.atoms_total = self.atoms_total;
        let inner = sub.parse_query()?;
        self.atoms_total = sub.atoms_total;
        Ok(AtomExpr::Recursive(Box::new(inner)))
    }
}

fn join_and<T>(op: AndOp, mut parts: Vec<T>, and: fn(AndOp, Vec<T>) -> T) -> T {
    if parts.len() == 1 {
        if let Some(only) = parts.pop() {
            return only;
        }
    }
    and(op, parts)
}

fn join_or<T>(mut parts: Vec<T>, or: fn(Vec<T>) -> T) -> T {
    if parts.len() == 1 {
        if let Some(only) = parts.pop() {
            return only;
        }
    }
    or(parts)
}

pub fn parse(input: &str, limits: &ParseLimits) -> Result<QueryMol, SmartsError> {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() > limits.max_input_len {
        return Err(SmartsError::limit(
            limits.max_input_len,
            ResourceLimitKind::InputTooLong {
                len: chars.len(),
                max: limits.max_input_len,
            },
        ));
    }
    let start = chars.iter().take_while(|c| c.is_whitespace()).count();
    let end = chars.len() - chars[start..].iter().rev().take_while(|c| c.is_whitespace()).count();
    if start == end {
        return Err(SmartsError::syntax(0, SyntaxErrorKind::EmptyInput));
    }

    let mut parser = Parser::new(&chars, start, end, limits, 0);
    let query = parser.parse_query()?;
    debug!(
        "parsed SMARTS {:?}: {} atoms, {} bonds, {} components",
        input.trim(),
        query.atom_count(),
        query.bond_count(),
        query.components().len()
    );
    Ok(query)
}
