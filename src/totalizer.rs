//! Totalizer encoding of cardinality constraints.
//!
//! A balanced binary tree of unary adders: each internal node merges the
//! sorted unary counts of its children into fresh output variables. Both
//! variants work on the at-most side (an at-least constraint is
//! complemented first) and force every output at position `rhs` and above
//! to zero. The verified variant certifies each node with a unary-sum
//! derivation and concludes with a `p` line that adds the per-node chains
//! onto the constraint's own id; it also drops output positions above
//! `rhs + 1`, which the plain variant keeps.

use crate::constraints::{Card, Sign};
use crate::encode::{
    apply_trivial, derive_unary_sum, eq_half_id, trivial_case, Emitter, EncodeError,
};
use crate::formula::Formula;
use crate::literal::Lit;
use crate::proof::{PolOps, ProofExpr};

/// CNF-only totalizer.
#[derive(Debug, Default)]
pub struct Plain {
    em: Emitter,
    inlits: Vec<Lit>,
}

impl Plain {
    pub fn new() -> Plain {
        Plain::default()
    }

    pub fn encode(&mut self, f: &mut Formula, card: &mut Card) -> Result<(), EncodeError> {
        match card.sign {
            Sign::Eq => {
                self.half(f, card, Sign::Geq)?;
                self.half(f, card, Sign::Leq)
            }
            sign => self.half(f, card, sign),
        }
    }

    fn half(&mut self, f: &mut Formula, card: &mut Card, sign: Sign) -> Result<(), EncodeError> {
        let mut lits = card.lits.clone();
        let n = lits.len();
        let sum = n as u64;

        let t = trivial_case(card.rhs, sum, sign);
        if apply_trivial(&mut self.em, f, card, &lits, t) {
            return Ok(());
        }

        let mut rhs = card.rhs as u64;
        if sign == Sign::Geq {
            for l in &mut lits {
                *l = !*l;
            }
            rhs = sum - rhs;
        }

        let mut outlits: Vec<Lit> = (0..n).map(|_| f.new_lit(false)).collect();
        self.inlits = lits;
        self.to_cnf(f, card, &mut outlits, rhs);
        debug_assert!(self.inlits.is_empty());

        for i in rhs as usize..outlits.len() {
            self.em.unit(f, card, !outlits[i]);
        }
        Ok(())
    }

    fn to_cnf(&mut self, f: &mut Formula, card: &mut Card, lits_out: &mut Vec<Lit>, rhs: u64) {
        assert!(lits_out.len() > 1);
        let split = lits_out.len() / 2;

        let mut left = Vec::with_capacity(split);
        let mut right = Vec::with_capacity(lits_out.len() - split);
        for i in 0..lits_out.len() {
            if i < split {
                if split == 1 {
                    left.push(self.inlits.pop().expect("leaf without input literal"));
                } else {
                    left.push(f.new_lit(false));
                }
            } else if lits_out.len() - split == 1 {
                right.push(self.inlits.pop().expect("leaf without input literal"));
            } else {
                right.push(f.new_lit(false));
            }
        }

        if left.len() > 1 {
            self.to_cnf(f, card, &mut left, rhs);
        }
        if right.len() > 1 {
            self.to_cnf(f, card, &mut right, rhs);
        }
        self.merge(f, card, &left, &right, lits_out, rhs);
    }

    fn merge(
        &mut self,
        f: &mut Formula,
        card: &mut Card,
        left: &[Lit],
        right: &[Lit],
        output: &[Lit],
        rhs: u64,
    ) {
        assert_eq!(output.len(), left.len() + right.len());
        // Sums above rhs + 1 can never matter for an at-most bound.
        for i in 0..=left.len() {
            for j in 0..=right.len() {
                if i == 0 && j == 0 {
                    continue;
                }
                if (i + j) as u64 > rhs + 1 {
                    continue;
                }
                if i == 0 {
                    self.em.binary(f, card, !right[j - 1], output[j - 1]);
                } else if j == 0 {
                    self.em.binary(f, card, !left[i - 1], output[i - 1]);
                } else {
                    self.em.ternary(f, card, !left[i - 1], !right[j - 1], output[i + j - 1]);
                }
            }
        }
    }
}

/// Totalizer with proof logging.
#[derive(Debug, Default)]
pub struct Verified {
    em: Emitter,
    inlits: Vec<Lit>,
}

impl Verified {
    pub fn new() -> Verified {
        Verified::default()
    }

    pub fn encode(&mut self, f: &mut Formula, card: &mut Card) -> Result<(), EncodeError> {
        match card.sign {
            Sign::Eq => {
                self.half(f, card, Sign::Geq)?;
                self.half(f, card, Sign::Leq)
            }
            sign => self.half(f, card, sign),
        }
    }

    fn half(&mut self, f: &mut Formula, card: &mut Card, sign: Sign) -> Result<(), EncodeError> {
        let mut lits = card.lits.clone();
        let n = lits.len();
        let sum = n as u64;

        let t = trivial_case(card.rhs, sum, sign);
        if apply_trivial(&mut self.em, f, card, &lits, t) {
            return Ok(());
        }

        let mut rhs = card.rhs as u64;
        if sign == Sign::Geq {
            for l in &mut lits {
                *l = !*l;
            }
            rhs = sum - rhs;
        }
        let k = rhs + 1;

        let mut outlits: Vec<Lit> = (0..n).map(|_| f.new_lit(false)).collect();
        self.inlits = lits;

        let mut geq_ids = Vec::new();
        let mut leq_ids = Vec::new();
        self.to_cnf(f, card, &mut outlits, rhs, k, &mut geq_ids, &mut leq_ids)?;
        debug_assert!(self.inlits.is_empty());

        for i in rhs as usize..outlits.len() {
            self.em.unit(f, card, !outlits[i]);
        }

        let id = f.next_proof_id();
        let mut ops = PolOps::new();
        ops.push(eq_half_id(card.id, card.sign, Sign::Leq, sign == Sign::Geq) as i64);
        ops.push(geq_ids[0] as i64).add();
        for &x in &geq_ids[1..] {
            ops.push(x as i64).add();
        }
        f.add_proof_expr(card, ProofExpr::Pol { id, ops });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn to_cnf(
        &mut self,
        f: &mut Formula,
        card: &mut Card,
        lits_out: &mut Vec<Lit>,
        rhs: u64,
        k: u64,
        geq_ids: &mut Vec<u64>,
        leq_ids: &mut Vec<u64>,
    ) -> Result<(), EncodeError> {
        assert!(lits_out.len() > 1);
        let split = lits_out.len() / 2;

        let mut left = Vec::with_capacity(split);
        let mut right = Vec::with_capacity(lits_out.len() - split);
        for i in 0..lits_out.len() {
            if i < split {
                if split == 1 {
                    left.push(self.inlits.pop().expect("leaf without input literal"));
                } else {
                    left.push(f.new_lit(false));
                }
            } else if lits_out.len() - split == 1 {
                right.push(self.inlits.pop().expect("leaf without input literal"));
            } else {
                right.push(f.new_lit(false));
            }
        }

        if left.len() > 1 {
            self.to_cnf(f, card, &mut left, rhs, k, geq_ids, leq_ids)?;
        }
        if right.len() > 1 {
            self.to_cnf(f, card, &mut right, rhs, k, geq_ids, leq_ids)?;
        }
        lits_out.truncate(left.len() + right.len());
        self.merge(f, card, &left, &right, lits_out, rhs);

        let mut lits_in = left;
        lits_in.extend_from_slice(&right);
        debug_assert_eq!(lits_in.len(), lits_out.len());
        let (g, l) = derive_unary_sum(f, card, &lits_in, lits_out)?;
        geq_ids.push(g);
        leq_ids.push(l);

        if lits_out.len() as u64 > k {
            lits_out.truncate(k as usize);
        }
        Ok(())
    }

    fn merge(
        &mut self,
        f: &mut Formula,
        card: &mut Card,
        left: &[Lit],
        right: &[Lit],
        output: &[Lit],
        rhs: u64,
    ) {
        assert_eq!(output.len(), left.len() + right.len());
        for i in 0..=left.len() {
            for j in 0..=right.len() {
                if i == 0 && j == 0 {
                    continue;
                }
                if (i + j) as u64 > rhs + 1 {
                    continue;
                }
                if i == 0 {
                    self.em.binary(f, card, !right[j - 1], output[j - 1]);
                } else if j == 0 {
                    self.em.binary(f, card, !left[i - 1], output[i - 1]);
                } else {
                    self.em.ternary(f, card, !left[i - 1], !right[j - 1], output[i + j - 1]);
                }
            }
        }
    }
}
