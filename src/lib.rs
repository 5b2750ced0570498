//! SMARTS query parsing, serialization and matching.
//!
//! [`from_smarts`] turns a SMARTS string into a [`QueryMol`] that keeps
//! enough of the original spelling for [`to_smarts`] to write it back
//! unchanged. [`molfile::read_query_molfile`] builds the same query model from
//! Molfile connection tables. Matching runs against a [`Mol<Atom, Bond>`]
//! whose atoms carry precomputed properties.

pub mod atom;
pub mod bond;
pub mod element;
pub mod mol;
pub mod molfile;
pub mod smarts;
pub mod substruct;

pub use atom::Atom;
pub use bond::{Bond, BondOrder};
pub use mol::Mol;
pub use molfile::{read_query_molfile, MolfileError};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use smarts::{
    from_smarts, from_smarts_with_limits, get_smarts_match, get_smarts_matches,
    has_smarts_match, to_smarts, AndOp, AtomExpr, BondExpr, ChargeNotation, Component,
    ParseLimits, QueryAtom, QueryMol, SmartsError,
};
pub use substruct::AtomMapping;
