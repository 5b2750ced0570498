use thiserror::Error;

/// Errors produced when building a query molecule from SMARTS text or from an
/// atom/bond list.
///
/// The three variants separate text that could not be tokenized
/// ([`Syntax`](Self::Syntax)) from text that tokenized into an inconsistent
/// graph ([`Structural`](Self::Structural)) and from input rejected by
/// [`ParseLimits`](super::ParseLimits) ([`ResourceLimit`](Self::ResourceLimit)).
/// `pos` is a character offset into the SMARTS string; for errors raised by
/// [`QueryMol::from_parts`](super::QueryMol::from_parts) it is the index of the
/// offending bond or atom.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmartsError {
    #[error("SMARTS syntax error at position {pos}: {kind}")]
    Syntax { pos: usize, kind: SyntaxErrorKind },
    #[error("inconsistent query structure at position {pos}: {kind}")]
    Structural { pos: usize, kind: StructuralErrorKind },
    #[error("SMARTS resource limit exceeded at position {pos}: {kind}")]
    ResourceLimit { pos: usize, kind: ResourceLimitKind },
}

impl SmartsError {
    pub fn pos(&self) -> usize {
        match self {
            Self::Syntax { pos, .. } | Self::Structural { pos, .. } | Self::ResourceLimit { pos, .. } => {
                *pos
            }
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }

    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Self::ResourceLimit { .. })
    }

    pub(crate) fn syntax(pos: usize, kind: SyntaxErrorKind) -> Self {
        Self::Syntax { pos, kind }
    }

    pub(crate) fn structural(pos: usize, kind: StructuralErrorKind) -> Self {
        Self::Structural { pos, kind }
    }

    pub(crate) fn limit(pos: usize, kind: ResourceLimitKind) -> Self {
        Self::ResourceLimit { pos, kind }
    }
}

/// Malformed SMARTS text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("empty SMARTS string")]
    EmptyInput,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unclosed bracket atom")]
    UnclosedBracket,
    #[error("empty bracket atom")]
    EmptyBracket,
    #[error("missing operand for '{0}'")]
    MissingOperand(char),
    #[error("unmatched parenthesis")]
    UnmatchedParen,
    #[error("empty branch or group")]
    EmptyGroup,
    #[error("component groups cannot be nested")]
    NestedGroup,
    #[error("expected '.' or end of input after a component group")]
    TrailingAfterGroup,
    #[error("empty fragment between '.' separators")]
    EmptyFragment,
    #[error("bond without a following atom")]
    DanglingBond,
    #[error("ring closure without a preceding atom")]
    RingClosureWithoutAtom,
    #[error("invalid ring-closure number")]
    InvalidRingNumber,
    #[error("invalid atomic number")]
    InvalidAtomicNum,
    #[error("unknown element symbol")]
    UnknownElement,
    #[error("number out of range")]
    NumberOutOfRange,
    #[error("unclosed recursive SMARTS")]
    UnclosedRecursive,
}

/// Well-formed text, or a caller-built atom/bond list, that describes an
/// inconsistent graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralErrorKind {
    #[error("ring closure {0} is never closed")]
    UnclosedRing(u16),
    #[error("ring closure {0} bonds an atom to itself")]
    SelfBond(u16),
    #[error("ring closure {0} duplicates an existing bond")]
    DuplicateRingBond(u16),
    #[error("ring closure {0} has conflicting bond expressions")]
    ConflictingRingBond(u16),
    #[error("bond references atom {atom} but the molecule has {atom_count} atoms")]
    OrphanBond { atom: usize, atom_count: usize },
    #[error("bond connects atom {0} to itself")]
    SelfLoop(usize),
    #[error("duplicate bond between atoms {0} and {1}")]
    DuplicateBond(usize, usize),
    #[error("atom {0} is not covered exactly once by the component partition")]
    ComponentPartition(usize),
    #[error("bond between atoms {0} and {1} crosses a component boundary")]
    BondCrossesComponent(usize, usize),
    #[error("ungrouped component {0} is not connected")]
    DisconnectedComponent(usize),
}

/// Input rejected by [`ParseLimits`](super::ParseLimits).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceLimitKind {
    #[error("input is {len} characters, limit is {max}")]
    InputTooLong { len: usize, max: usize },
    #[error("more than {max} atoms")]
    TooManyAtoms { max: usize },
    #[error("more than {max} simultaneously open ring closures")]
    TooManyOpenRings { max: usize },
    #[error("expression nesting deeper than {max}")]
    NestingTooDeep { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offset_and_kind() {
        let err = SmartsError::syntax(3, SyntaxErrorKind::UnexpectedChar('?'));
        assert_eq!(
            err.to_string(),
            "SMARTS syntax error at position 3: unexpected character '?'"
        );
    }

    #[test]
    fn category_predicates() {
        let err = SmartsError::structural(4, StructuralErrorKind::UnclosedRing(1));
        assert!(err.is_structural());
        assert!(!err.is_syntax());
        assert_eq!(err.pos(), 4);

        let err = SmartsError::limit(0, ResourceLimitKind::InputTooLong { len: 10, max: 5 });
        assert!(err.is_resource_limit());
        assert_eq!(err.to_string(), "SMARTS resource limit exceeded at position 0: input is 10 characters, limit is 5");
    }
}
