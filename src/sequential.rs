//! Sequential-counter encoding of cardinality constraints.
//!
//! Auxiliary variables form a running counter: `s[i][j]` holds exactly
//! when at least `j+1` of the first `i+1` literals are true. [`Plain`]
//! emits CNF only; [`Verified`] additionally certifies, row by row, that
//! the fresh variables are the sorted unary sum of the previous row plus
//! the next input literal, and concludes with one `p` line per inequality
//! direction that adds the per-row chains onto the constraint's own id —
//! together with the final unit clauses this makes every attributed
//! clause propagate.

use crate::constraints::{Card, Sign};
use crate::encode::{
    apply_trivial, derive_unary_sum, eq_half_id, trivial_case, Emitter, EncodeError,
};
use crate::formula::Formula;
use crate::literal::Lit;
use crate::proof::{PolOps, ProofExpr};

/// CNF-only sequential counter. Equalities are encoded as two passes.
#[derive(Debug, Default)]
pub struct Plain {
    em: Emitter,
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

        // Count complements instead of encoding an at-least circuit.
        let mut rhs = card.rhs as u64;
        if sign == Sign::Geq {
            for l in &mut lits {
                *l = !*l;
            }
            rhs = sum - rhs;
        }

        // The counter must be able to reach rhs + 1 to detect violation.
        let rhs = (rhs + 1) as usize;

        let mut rows: Vec<Vec<Lit>> = Vec::with_capacity(n);
        for _ in 0..n {
            rows.push((0..rhs).map(|_| f.new_lit(false)).collect());
        }

        for i in 1..=n {
            let w = 1usize; // unit weights; the circuit itself generalizes to weighted sums
            for j in 1..=rhs {
                if i >= 2 {
                    self.em.binary(f, card, !rows[i - 2][j - 1], rows[i - 1][j - 1]);
                }
                if j <= w {
                    self.em.binary(f, card, !lits[i - 1], rows[i - 1][j - 1]);
                }
                if i >= 2 && j <= rhs - w {
                    self.em.ternary(
                        f,
                        card,
                        !rows[i - 2][j - 1],
                        !lits[i - 1],
                        rows[i - 1][j - 1 + w],
                    );
                }
            }
            if i >= 2 {
                self.em.binary(f, card, !rows[i - 2][rhs - w], !lits[i - 1]);
            }
        }

        self.em.unit(f, card, !rows[n - 1][rhs - 1]);
        Ok(())
    }
}

/// Sequential counter with proof logging. Handles all three signs in a
/// single pass over one counter.
#[derive(Debug, Default)]
pub struct Verified {
    em: Emitter,
}

impl Verified {
    pub fn new() -> Verified {
        Verified::default()
    }

    pub fn encode(&mut self, f: &mut Formula, card: &mut Card) -> Result<(), EncodeError> {
        let mut lits = card.lits.clone();
        let n = lits.len();
        let sum = n as u64;

        let t = trivial_case(card.rhs, sum, card.sign);
        if apply_trivial(&mut self.em, f, card, &lits, t) {
            return Ok(());
        }

        // Work on the side with the smaller bound.
        let mut rhs = card.rhs as u64;
        let mut current = card.sign;
        let mut flipped = false;
        if sum - rhs < rhs {
            for l in &mut lits {
                *l = !*l;
            }
            rhs = sum - rhs;
            if current != Sign::Eq {
                current = if current == Sign::Geq { Sign::Leq } else { Sign::Geq };
            }
            flipped = true;
        }

        let k = rhs + 1;

        // Row i carries the unary counts of the first i+1 literals, capped
        // at k+1 so the proof can talk about the overflow position.
        let mut rows: Vec<Vec<Lit>> = Vec::with_capacity(n);
        for i in 0..n {
            let len = ((i as u64) + 1).min(k + 1) as usize;
            rows.push((0..len).map(|_| f.new_lit(false)).collect());
        }

        let mut geq_ids = Vec::with_capacity(n);
        let mut leq_ids = Vec::with_capacity(n);
        for i in 1..=n {
            let m = (i as u64).min(k + 1) as usize;
            let mut left = vec![lits[i - 1]];
            let mut right = Vec::with_capacity(m);
            for j in 1..=m {
                right.push(rows[i - 1][j - 1]);
                if j != m {
                    left.push(rows[i - 2][j - 1]);
                }
            }
            debug_assert_eq!(left.len(), right.len());
            let (g, l) = derive_unary_sum(f, card, &left, &right)?;
            geq_ids.push(g);
            leq_ids.push(l);
        }

        if current == Sign::Geq || current == Sign::Eq {
            let id = f.next_proof_id();
            let mut ops = PolOps::new();
            ops.push(eq_half_id(card.id, card.sign, Sign::Geq, flipped) as i64);
            ops.push(leq_ids[0] as i64).add();
            for &x in &leq_ids[1..] {
                ops.push(x as i64).add();
            }
            f.add_proof_expr(card, ProofExpr::Pol { id, ops });
        }
        if current == Sign::Leq || current == Sign::Eq {
            let id = f.next_proof_id();
            let mut ops = PolOps::new();
            ops.push(eq_half_id(card.id, card.sign, Sign::Leq, flipped) as i64);
            ops.push(geq_ids[0] as i64).add();
            for &x in &geq_ids[1..] {
                ops.push(x as i64).add();
            }
            f.add_proof_expr(card, ProofExpr::Pol { id, ops });
        }

        let kk = (if current == Sign::Geq { k - 1 } else { k }) as usize;

        self.em.binary(f, card, !lits[0], rows[0][0]);
        self.em.binary(f, card, lits[0], !rows[0][0]);

        for i in 1..n {
            self.em.binary(f, card, !lits[i], rows[i][0]);
            if i + 1 == rows[i].len() {
                self.em.binary(f, card, lits[i], !rows[i][i]);
            }
            for j in 0..=kk {
                if j < rows[i - 1].len() {
                    self.em.ternary(f, card, lits[i], rows[i - 1][j], !rows[i][j]);
                    self.em.binary(f, card, !rows[i - 1][j], rows[i][j]);
                }
                if j > 0 && j < rows[i].len() {
                    self.em.ternary(f, card, !lits[i], !rows[i - 1][j - 1], rows[i][j]);
                    self.em.binary(f, card, rows[i - 1][j - 1], !rows[i][j]);
                }
            }
        }

        if current == Sign::Geq || current == Sign::Eq {
            self.em.unit(f, card, rows[n - 1][(rhs - 1) as usize]);
        }
        if current == Sign::Leq || current == Sign::Eq {
            self.em.unit(f, card, !rows[n - 1][rhs as usize]);
        }
        Ok(())
    }
}
