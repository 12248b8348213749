//! Certified translation of pseudo-Boolean constraints into CNF.
//!
//! This crate turns integer linear inequalities over Boolean variables —
//! cardinality constraints and general pseudo-Boolean constraints — into
//! equisatisfiable clause sets, and can emit a cutting-planes proof log
//! (`pseudo-Boolean proof version 1.2`) showing that every produced
//! clause follows from the input constraints.
//!
//! ## Invariants
//!
//! - **Attribution.** Every hard clause and every proof expression
//!   produced while encoding a constraint is recorded on that constraint,
//!   and the proof writer replays them in input order: derivations first,
//!   then the clauses as propagation lemmas, bracketed by scope markers.
//! - **Proof-line ids.** The [`Formula`] owns a strictly monotone
//!   counter; a line's id is allocated immediately before the line is
//!   stored, and the counter is advanced past the ids the checker assigns
//!   implicitly to clause lemmas. An equality occupies two consecutive
//!   ids, one per inequality half.
//! - **Normalization.** Coefficients are nonnegative after parsing;
//!   constraints that collapse to a single clause are emitted directly;
//!   general constraints are saturated and clamped before a scheme sees
//!   them.
//!
//! Encoding schemes live in their own modules ([`sequential`],
//! [`totalizer`], [`gte`], [`adder`]), each in a CNF-only and a
//! proof-logging variant; [`encode::Encoder`] routes constraints by
//! configuration.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod adder;
pub mod constraints;
pub mod encode;
pub mod formula;
pub mod gte;
pub mod literal;
pub mod parser;
pub mod proof;
pub mod sequential;
pub mod totalizer;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::constraints::{Card, Constraint, Pb, PbObjective, Sign};
pub use crate::encode::{CardEncoding, EncodeError, Encoder, PbEncoding};
pub use crate::formula::Formula;
pub use crate::literal::{Clause, Lit, Var};
pub use crate::parser::{parse_opb, ParseError};
