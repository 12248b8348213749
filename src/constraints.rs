//! Cardinality and pseudo-Boolean constraints.
//!
//! Both constraint kinds carry two attribution lists that the proof writer
//! relies on: `clause_ids` (indices of the hard clauses a scheme emitted
//! for this constraint) and `proof_ids` (indices of the proof expressions
//! it emitted). The serializer walks constraints in input order and prints
//! each one's proof block followed by its clauses, so every emission made
//! while encoding a constraint must be attributed to it.
//!
//! Coefficients are kept nonnegative: [`Pb::add_term`] normalizes a
//! negative source coefficient by complementing the literal and shifting
//! the right-hand side.

use crate::encode::EncodeError;
use crate::literal::Lit;

/// Relational sign of a constraint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Sign {
    Geq,
    #[default]
    Leq,
    Eq,
}

/// Emission attribution shared by all constraint kinds.
///
/// The encoders take a `&mut dyn Constraint` so the formula can record
/// which hard clauses and proof lines belong to which input constraint
/// without the constraint owning back-references.
pub trait Constraint {
    /// Proof-line identifier reserved for this constraint (the LEQ half of
    /// an equality sits at `id + 1`).
    fn id(&self) -> u64;
    /// Indices into the formula's hard-clause list.
    fn clause_ids(&mut self) -> &mut Vec<usize>;
    /// Indices into the formula's proof-expression list.
    fn proof_ids(&mut self) -> &mut Vec<usize>;
}

/// Cardinality constraint `Σ lᵢ ⋈ rhs`.
#[derive(Clone, Debug, Default)]
pub struct Card {
    pub lits: Vec<Lit>,
    pub rhs: i64,
    pub sign: Sign,
    pub id: u64,
    pub clause_ids: Vec<usize>,
    pub proof_ids: Vec<usize>,
}

impl Card {
    pub fn new(lits: Vec<Lit>, rhs: i64, sign: Sign, id: u64) -> Card {
        Card { lits, rhs, sign, id, clause_ids: Vec::new(), proof_ids: Vec::new() }
    }
}

impl Constraint for Card {
    fn id(&self) -> u64 {
        self.id
    }
    fn clause_ids(&mut self) -> &mut Vec<usize> {
        &mut self.clause_ids
    }
    fn proof_ids(&mut self) -> &mut Vec<usize> {
        &mut self.proof_ids
    }
}

/// Pseudo-Boolean constraint `Σ cᵢ·lᵢ ⋈ rhs` with nonnegative `cᵢ`.
#[derive(Clone, Debug, Default)]
pub struct Pb {
    pub lits: Vec<Lit>,
    pub coeffs: Vec<u64>,
    pub rhs: i64,
    pub sign: Sign,
    pub id: u64,
    pub clause_ids: Vec<usize>,
    pub proof_ids: Vec<usize>,
}

impl Pb {
    pub fn new(lits: Vec<Lit>, coeffs: Vec<u64>, rhs: i64, sign: Sign) -> Pb {
        debug_assert_eq!(lits.len(), coeffs.len());
        Pb { lits, coeffs, rhs, sign, id: 0, clause_ids: Vec::new(), proof_ids: Vec::new() }
    }

    /// Append `coeff·lit`, normalizing a negative coefficient by
    /// complementing the literal and raising the right-hand side.
    pub fn add_term(&mut self, lit: Lit, coeff: i64) -> Result<(), EncodeError> {
        if coeff >= 0 {
            self.lits.push(lit);
            self.coeffs.push(coeff as u64);
        } else {
            let c = coeff.checked_neg().ok_or(EncodeError::Overflow)?;
            self.lits.push(!lit);
            self.coeffs.push(c as u64);
            self.rhs = self.rhs.checked_add(c).ok_or(EncodeError::Overflow)?;
        }
        Ok(())
    }

    /// Shift the right-hand side (used while folding parsed terms).
    pub fn add_rhs(&mut self, rhs: i64) -> Result<(), EncodeError> {
        self.rhs = self.rhs.checked_add(rhs).ok_or(EncodeError::Overflow)?;
        Ok(())
    }

    /// Sum of all coefficients, or an overflow error.
    pub fn coeff_sum(&self) -> Result<u64, EncodeError> {
        let mut sum = 0u64;
        for &c in &self.coeffs {
            sum = sum.checked_add(c).ok_or(EncodeError::Overflow)?;
        }
        Ok(sum)
    }

    /// Whether the (normalized) constraint is a single CNF clause: a unit
    /// equality, `Σ lᵢ ≥ 1`, or `Σ lᵢ ≤ n−1` (the complemented clause).
    pub fn is_clause(&self) -> bool {
        match self.sign {
            Sign::Eq => {
                self.lits.len() == 1 && self.coeffs[0] == 1 && (self.rhs == 0 || self.rhs == 1)
            }
            Sign::Geq => self.coeffs.iter().all(|&c| c == 1) && self.rhs == 1,
            Sign::Leq => {
                self.coeffs.iter().all(|&c| c == 1) && self.rhs == self.lits.len() as i64 - 1
            }
        }
    }

    /// Whether every coefficient equals one.
    pub fn is_cardinality(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 1)
    }
}

impl Constraint for Pb {
    fn id(&self) -> u64 {
        self.id
    }
    fn clause_ids(&mut self) -> &mut Vec<usize> {
        &mut self.clause_ids
    }
    fn proof_ids(&mut self) -> &mut Vec<usize> {
        &mut self.proof_ids
    }
}

/// Objective function of an optimization instance (kept for reporting; the
/// encoder itself only translates constraints).
#[derive(Clone, Debug, Default)]
pub struct PbObjective {
    pub lits: Vec<Lit>,
    pub coeffs: Vec<u64>,
    pub constant: i64,
}

impl PbObjective {
    /// Append `coeff·lit`, normalizing negatives as [`Pb::add_term`] does
    /// (the constant absorbs the shift).
    pub fn add_term(&mut self, lit: Lit, coeff: i64) -> Result<(), EncodeError> {
        if coeff >= 0 {
            self.lits.push(lit);
            self.coeffs.push(coeff as u64);
        } else {
            let c = coeff.checked_neg().ok_or(EncodeError::Overflow)?;
            self.lits.push(!lit);
            self.coeffs.push(c as u64);
            self.constant = self.constant.checked_add(coeff).ok_or(EncodeError::Overflow)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Var;

    fn lit(v: u32) -> Lit {
        Lit::positive(Var(v))
    }

    #[test]
    fn negative_terms_are_normalized() {
        let mut pb = Pb::new(vec![], vec![], 2, Sign::Geq);
        pb.add_term(lit(0), 3).unwrap();
        pb.add_term(lit(1), -2).unwrap();
        assert_eq!(pb.coeffs, vec![3, 2]);
        assert_eq!(pb.lits, vec![lit(0), !lit(1)]);
        // -2·x2 ≥ … became +2·~x2 with the rhs shifted by 2.
        assert_eq!(pb.rhs, 4);
    }

    #[test]
    fn clause_detection() {
        let c = Pb::new(vec![lit(0), lit(1)], vec![1, 1], 1, Sign::Geq);
        assert!(c.is_clause());

        let c = Pb::new(vec![lit(0), lit(1), lit(2)], vec![1, 1, 1], 2, Sign::Leq);
        assert!(c.is_clause()); // ~x1 ∨ ~x2 ∨ ~x3

        let c = Pb::new(vec![lit(0)], vec![1], 1, Sign::Eq);
        assert!(c.is_clause());

        let c = Pb::new(vec![lit(0), lit(1)], vec![2, 1], 2, Sign::Geq);
        assert!(!c.is_clause());
        assert!(!c.is_cardinality());

        let c = Pb::new(vec![lit(0), lit(1)], vec![1, 1], 2, Sign::Geq);
        assert!(!c.is_clause());
        assert!(c.is_cardinality());
    }

    #[test]
    fn coeff_sum_checks_overflow() {
        let c = Pb::new(vec![lit(0), lit(1)], vec![u64::MAX, 1], 1, Sign::Geq);
        assert!(c.coeff_sum().is_err());
    }
}
