//! Encoder dispatch, clause emission, and the proof-helper library.
//!
//! The dispatcher routes each stored constraint to the configured scheme.
//! Pseudo-Boolean constraints are saturated first: a `p … s` line is
//! logged for the GEQ side (and a second one for the LEQ side of an
//! equality), the constraint id is rebound to the saturated line, and the
//! coefficients are clamped in place so the scheme sees the saturated
//! form. After a constraint is encoded, the proof-line counter is bumped
//! by the number of clauses attributed to it, because the checker assigns
//! one implicit id to every `u` line printed for a clause.
//!
//! The helper library at the bottom is shared by all verified schemes:
//! `reify` introduces a fresh variable equivalent to a PB constraint as a
//! pair of `red` lines, `derive_ordering` relates two adjacent
//! reifications, and `derive_sum` / `derive_unary_sum` chain reified
//! lines into the per-node sum certificates the schemes combine at their
//! roots.

use tracing::debug;

use crate::constraints::{Card, Constraint, Pb, Sign};
use crate::formula::Formula;
use crate::literal::Lit;
use crate::proof::{PolOps, ProofExpr};
use crate::{adder, gte, sequential, totalizer};

/// Failures the encoding pipeline can hit. Internal invariant violations
/// are bugs and assert instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A coefficient or right-hand side left the representable range.
    #[error("overflow in the encoding")]
    Overflow,
}

/// Scheme used for cardinality constraints.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardEncoding {
    Sequential,
    Totalizer,
}

/// Scheme used for general pseudo-Boolean constraints.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PbEncoding {
    Gte,
    Adder,
}

/// Routes constraints to their configured scheme.
#[derive(Copy, Clone, Debug)]
pub struct Encoder {
    pub card: CardEncoding,
    pub pb: PbEncoding,
    pub verified: bool,
}

impl Encoder {
    pub fn new(card: CardEncoding, pb: PbEncoding, verified: bool) -> Encoder {
        Encoder { card, pb, verified }
    }

    /// Encode every stored constraint, cardinalities first. The pipeline
    /// is all-or-nothing: on error the half-encoded formula is abandoned.
    pub fn encode_all(&self, f: &mut Formula) -> Result<(), EncodeError> {
        let mut cards = f.take_cards();
        for card in &mut cards {
            self.encode_card(f, card)?;
            f.bump_proof_ids(card.clause_ids.len() as u64);
        }
        f.restore_cards(cards);

        let mut pbs = f.take_pbs();
        for pb in &mut pbs {
            self.encode_pb(f, pb)?;
            f.bump_proof_ids(pb.clause_ids.len() as u64);
        }
        f.restore_pbs(pbs);
        Ok(())
    }

    /// Encode one cardinality constraint with the configured scheme.
    pub fn encode_card(&self, f: &mut Formula, card: &mut Card) -> Result<(), EncodeError> {
        debug!(n = card.lits.len(), rhs = card.rhs, "encoding cardinality constraint");
        match (self.card, self.verified) {
            (CardEncoding::Sequential, false) => sequential::Plain::new().encode(f, card),
            (CardEncoding::Sequential, true) => sequential::Verified::new().encode(f, card),
            (CardEncoding::Totalizer, false) => totalizer::Plain::new().encode(f, card),
            (CardEncoding::Totalizer, true) => totalizer::Verified::new().encode(f, card),
        }
    }

    /// Saturate, clamp, and encode one pseudo-Boolean constraint.
    pub fn encode_pb(&self, f: &mut Formula, pb: &mut Pb) -> Result<(), EncodeError> {
        debug!(n = pb.lits.len(), rhs = pb.rhs, "encoding pseudo-Boolean constraint");

        let sat_id = f.next_proof_id();
        let mut ops = PolOps::new();
        ops.push(pb.id as i64).sat();
        f.add_proof_expr(pb, ProofExpr::Pol { id: sat_id, ops });
        if pb.sign == Sign::Eq {
            let id = f.next_proof_id();
            let mut ops = PolOps::new();
            ops.push(pb.id as i64 + 1).sat();
            f.add_proof_expr(pb, ProofExpr::Pol { id, ops });
        }
        pb.id = sat_id;

        match pb.sign {
            Sign::Geq => {
                let bound = pb.rhs.max(0) as u64;
                for c in &mut pb.coeffs {
                    *c = (*c).min(bound);
                }
            }
            Sign::Leq | Sign::Eq => {
                let bound = (pb.rhs.max(-1) + 1) as u64;
                for c in &mut pb.coeffs {
                    *c = (*c).min(bound);
                }
            }
        }

        match (self.pb, self.verified) {
            (PbEncoding::Gte, false) => gte::Plain::new().encode(f, pb),
            (PbEncoding::Gte, true) => gte::Verified::new().encode(f, pb),
            (PbEncoding::Adder, false) => adder::Plain::new().encode(f, pb),
            (PbEncoding::Adder, true) => adder::Verified::new().encode(f, pb),
        }
    }
}

/// Clause emitter with a reusable scratch buffer.
///
/// Every helper asserts the scratch is empty on entry and clears it before
/// returning, so a scheme that bails mid-emission cannot leak literals
/// into the next clause.
#[derive(Debug, Default)]
pub struct Emitter {
    clause: Vec<Lit>,
}

impl Emitter {
    pub fn new() -> Emitter {
        Emitter::default()
    }

    pub fn unit(&mut self, f: &mut Formula, ctr: &mut dyn Constraint, a: Lit) {
        assert!(self.clause.is_empty());
        debug_assert!(a.var().as_usize() < f.n_vars());
        self.clause.push(a);
        f.add_hard_clause(ctr, &self.clause);
        self.clause.clear();
    }

    pub fn binary(&mut self, f: &mut Formula, ctr: &mut dyn Constraint, a: Lit, b: Lit) {
        assert!(self.clause.is_empty());
        debug_assert!(a.var().as_usize() < f.n_vars() && b.var().as_usize() < f.n_vars());
        self.clause.push(a);
        self.clause.push(b);
        f.add_hard_clause(ctr, &self.clause);
        self.clause.clear();
    }

    pub fn ternary(&mut self, f: &mut Formula, ctr: &mut dyn Constraint, a: Lit, b: Lit, c: Lit) {
        assert!(self.clause.is_empty());
        debug_assert!(
            a.var().as_usize() < f.n_vars()
                && b.var().as_usize() < f.n_vars()
                && c.var().as_usize() < f.n_vars()
        );
        self.clause.push(a);
        self.clause.push(b);
        self.clause.push(c);
        f.add_hard_clause(ctr, &self.clause);
        self.clause.clear();
    }

    pub fn quaternary(
        &mut self,
        f: &mut Formula,
        ctr: &mut dyn Constraint,
        a: Lit,
        b: Lit,
        c: Lit,
        d: Lit,
    ) {
        assert!(self.clause.is_empty());
        debug_assert!(
            a.var().as_usize() < f.n_vars()
                && b.var().as_usize() < f.n_vars()
                && c.var().as_usize() < f.n_vars()
                && d.var().as_usize() < f.n_vars()
        );
        self.clause.push(a);
        self.clause.push(b);
        self.clause.push(c);
        self.clause.push(d);
        f.add_hard_clause(ctr, &self.clause);
        self.clause.clear();
    }

    pub fn clause(&mut self, f: &mut Formula, ctr: &mut dyn Constraint, lits: &[Lit]) {
        assert!(self.clause.is_empty());
        f.add_hard_clause(ctr, lits);
    }
}

/// Outcome of the trivial-simplification rule every scheme applies first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trivial {
    /// Infeasible: emit the empty clause.
    EmptyClause,
    /// Every literal must be false.
    UnitsNegated,
    /// Every literal must be true.
    UnitsAsserted,
    /// The constraint restricts nothing.
    Noop,
    /// A real encoding is required.
    Encode,
}

/// Classify `Σ c·l ⋈ rhs` against the coefficient total `sum`.
pub fn trivial_case(rhs: i64, sum: u64, sign: Sign) -> Trivial {
    match sign {
        Sign::Leq => {
            if rhs < 0 {
                Trivial::EmptyClause
            } else if rhs == 0 && sum > 0 {
                Trivial::UnitsNegated
            } else if rhs as u64 >= sum {
                Trivial::Noop
            } else {
                Trivial::Encode
            }
        }
        Sign::Geq => {
            if rhs <= 0 {
                Trivial::Noop
            } else if rhs as u64 == sum {
                Trivial::UnitsAsserted
            } else if rhs as u64 > sum {
                Trivial::EmptyClause
            } else {
                Trivial::Encode
            }
        }
        Sign::Eq => {
            if rhs < 0 || rhs as u64 > sum {
                Trivial::EmptyClause
            } else if rhs == 0 && sum > 0 {
                Trivial::UnitsNegated
            } else if rhs as u64 == sum && sum > 0 {
                Trivial::UnitsAsserted
            } else if sum == 0 {
                Trivial::Noop
            } else {
                Trivial::Encode
            }
        }
    }
}

/// Apply a trivial classification; returns `true` when the constraint was
/// fully handled and the scheme should emit nothing further.
pub fn apply_trivial(
    em: &mut Emitter,
    f: &mut Formula,
    ctr: &mut dyn Constraint,
    lits: &[Lit],
    t: Trivial,
) -> bool {
    match t {
        Trivial::EmptyClause => {
            em.clause(f, ctr, &[]);
            true
        }
        Trivial::UnitsNegated => {
            for &l in lits {
                em.unit(f, ctr, !l);
            }
            true
        }
        Trivial::UnitsAsserted => {
            for &l in lits {
                em.unit(f, ctr, l);
            }
            true
        }
        Trivial::Noop => true,
        Trivial::Encode => false,
    }
}

/// Proof-line id of the inequality half a derivation certifies.
///
/// `side` is the working direction after any polarity flip; `flipped`
/// records whether the flip happened. An equality occupies two
/// consecutive ids, the GEQ half at `id` and the LEQ half at `id + 1`.
pub fn eq_half_id(id: u64, sign: Sign, side: Sign, flipped: bool) -> u64 {
    debug_assert!(side != Sign::Eq);
    let original = if flipped {
        match side {
            Sign::Geq => Sign::Leq,
            Sign::Leq => Sign::Geq,
            Sign::Eq => unreachable!(),
        }
    } else {
        side
    };
    if sign == Sign::Eq && original == Sign::Leq {
        id + 1
    } else {
        id
    }
}

/// Handle onto one half of a reification, carrying what later derivation
/// steps need: its proof-line id and the reified constraint's coefficient
/// total (the division constant of ordering steps).
#[derive(Copy, Clone, Debug)]
pub struct Reified {
    pub id: u64,
    pub coeff_sum: u64,
}

/// Introduce `z ↔ pb` (with `pb` a GEQ constraint and `z` a fresh positive
/// literal) as a pair of `red` lines.
///
/// The first half derives `pb + rhs·¬z ≥ rhs` under the witness `z ↦ 0`
/// (so `z` implies the constraint); the second derives
/// `Σc·¬l + (Σ−rhs+1)·z ≥ Σ−rhs+1` under `z ↦ 1` (the constraint implies
/// `z`). Returns the two handles in that order.
pub fn reify(
    f: &mut Formula,
    ctr: &mut dyn Constraint,
    z: Lit,
    pb: &Pb,
) -> Result<(Reified, Reified), EncodeError> {
    debug_assert!(!z.is_negated());
    debug_assert_eq!(pb.sign, Sign::Geq);
    debug_assert!(pb.rhs > 0);
    let sum = pb.coeff_sum()?;
    debug_assert!(pb.rhs as u64 <= sum);

    let mut pb_geq = pb.clone();
    pb_geq.lits.push(!z);
    pb_geq.coeffs.push(pb.rhs as u64);
    let id_geq = f.next_proof_id();
    f.add_proof_expr(ctr, ProofExpr::Red { id: id_geq, pb: pb_geq, var: z.var(), value: false });

    let slack = sum - pb.rhs as u64 + 1;
    let leq_rhs = i64::try_from(slack).map_err(|_| EncodeError::Overflow)?;
    let neg_lits: Vec<Lit> = pb.lits.iter().map(|&l| !l).collect();
    let mut pb_leq = Pb::new(neg_lits, pb.coeffs.clone(), leq_rhs, Sign::Geq);
    pb_leq.lits.push(z);
    pb_leq.coeffs.push(slack);
    let id_leq = f.next_proof_id();
    f.add_proof_expr(ctr, ProofExpr::Red { id: id_leq, pb: pb_leq, var: z.var(), value: true });

    Ok((Reified { id: id_geq, coeff_sum: sum }, Reified { id: id_leq, coeff_sum: sum }))
}

/// Relate two adjacent reifications: `(p₁ + p₂) ÷ d` with `d` the
/// coefficient total of `p₁`'s constraint without its reified variable.
pub fn derive_ordering(
    f: &mut Formula,
    ctr: &mut dyn Constraint,
    p1: &Reified,
    p2: &Reified,
) -> u64 {
    let id = f.next_proof_id();
    let mut ops = PolOps::new();
    ops.push(p1.id as i64).push(p2.id as i64).add().div(p1.coeff_sum);
    f.add_proof_expr(ctr, ProofExpr::Pol { id, ops });
    id
}

/// Chain a list of unary reification halves into one line with the
/// recurrence `cⱼ = ((j−1)·cⱼ₋₁ + lineⱼ) ÷ j`. Intermediate steps refer
/// to the previous line as `-1`.
pub fn derive_sum(f: &mut Formula, ctr: &mut dyn Constraint, sum: &[Reified]) -> u64 {
    if sum.len() < 2 {
        assert_eq!(sum.len(), 1);
        return sum[0].id;
    }

    let mut c = sum[0].id as i64;
    let mut last = 0;
    for j in 2..=sum.len() {
        let id = f.next_proof_id();
        let mut ops = PolOps::new();
        ops.push(c);
        if j - 1 > 1 {
            ops.mul((j - 1) as u64);
        }
        ops.push(sum[j - 1].id as i64).add().div(j as u64);
        f.add_proof_expr(ctr, ProofExpr::Pol { id, ops });

        c = if j != sum.len() { -1 } else { id as i64 };
        last = id;
    }
    last
}

/// Weighted analogue of [`derive_sum`] for sparse chains: entry `j` is a
/// line id paired with its weight delta, and step `j` multiplies the
/// accumulator by the cumulative delta so far, adds `Δⱼ ×` the entry, and
/// divides by the new cumulative total. Collapses to the unary recurrence
/// when every delta is one.
pub fn derive_weighted_sum(
    f: &mut Formula,
    ctr: &mut dyn Constraint,
    entries: &[(u64, u64)],
) -> u64 {
    if entries.len() < 2 {
        assert_eq!(entries.len(), 1);
        return entries[0].0;
    }

    let mut c = entries[0].0 as i64;
    let mut cum = entries[0].1;
    let mut last = 0;
    for (j, &(line, delta)) in entries.iter().enumerate().skip(1) {
        let id = f.next_proof_id();
        let mut ops = PolOps::new();
        ops.push(c);
        if cum > 1 {
            ops.mul(cum);
        }
        ops.push(line as i64);
        if delta > 1 {
            ops.mul(delta);
        }
        ops.add();
        cum += delta;
        ops.div(cum);
        f.add_proof_expr(ctr, ProofExpr::Pol { id, ops });

        c = if j + 1 != entries.len() { -1 } else { id as i64 };
        last = id;
    }
    last
}

/// Certify that `right` is the sorted unary sum of `left`: reify each
/// `right[j] ↔ (Σ left ≥ j+1)`, chain both directions, and order adjacent
/// positions. Returns the (GEQ, LEQ) chain ids.
pub fn derive_unary_sum(
    f: &mut Formula,
    ctr: &mut dyn Constraint,
    left: &[Lit],
    right: &[Lit],
) -> Result<(u64, u64), EncodeError> {
    let mut sum_geq = Vec::with_capacity(right.len());
    let mut sum_leq = Vec::with_capacity(right.len());

    for (j, &r) in right.iter().enumerate() {
        let pb = Pb::new(left.to_vec(), vec![1; left.len()], (j + 1) as i64, Sign::Geq);
        let (g, l) = reify(f, ctr, r, &pb)?;
        sum_geq.push(g);
        sum_leq.push(l);
    }

    let leq_rev: Vec<Reified> = sum_leq.iter().rev().copied().collect();
    let c_geq = derive_sum(f, ctr, &sum_geq);
    let c_leq = derive_sum(f, ctr, &leq_rev);

    for i in 0..right.len().saturating_sub(1) {
        if i + 1 < sum_geq.len() {
            derive_ordering(f, ctr, &sum_leq[i], &sum_geq[i + 1]);
        }
    }

    Ok((c_geq, c_leq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_last(f: &Formula) -> String {
        let mut out = Vec::new();
        f.proof_exprs().last().unwrap().write(&mut out, f.var_names()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn trivial_rule_is_idempotent_and_total() {
        // A handled constraint leaves nothing to classify; re-classifying
        // the same shape yields the same outcome.
        for &(rhs, sum, sign) in &[
            (0i64, 3u64, Sign::Leq),
            (3, 3, Sign::Geq),
            (3, 3, Sign::Leq),
            (0, 3, Sign::Geq),
            (-1, 3, Sign::Leq),
            (4, 3, Sign::Geq),
            (2, 3, Sign::Leq),
        ] {
            assert_eq!(trivial_case(rhs, sum, sign), trivial_case(rhs, sum, sign));
        }
        assert_eq!(trivial_case(0, 3, Sign::Leq), Trivial::UnitsNegated);
        assert_eq!(trivial_case(3, 3, Sign::Geq), Trivial::UnitsAsserted);
        assert_eq!(trivial_case(3, 3, Sign::Leq), Trivial::Noop);
        assert_eq!(trivial_case(0, 3, Sign::Geq), Trivial::Noop);
        assert_eq!(trivial_case(4, 3, Sign::Geq), Trivial::EmptyClause);
        assert_eq!(trivial_case(2, 3, Sign::Leq), Trivial::Encode);
        assert_eq!(trivial_case(0, 2, Sign::Eq), Trivial::UnitsNegated);
        assert_eq!(trivial_case(2, 2, Sign::Eq), Trivial::UnitsAsserted);
        assert_eq!(trivial_case(3, 2, Sign::Eq), Trivial::EmptyClause);
        assert_eq!(trivial_case(1, 2, Sign::Eq), Trivial::Encode);
    }

    #[test]
    fn eq_half_id_picks_the_right_half() {
        // Plain inequalities always certify their own id.
        assert_eq!(eq_half_id(5, Sign::Geq, Sign::Geq, false), 5);
        assert_eq!(eq_half_id(5, Sign::Leq, Sign::Leq, false), 5);
        assert_eq!(eq_half_id(5, Sign::Leq, Sign::Geq, true), 5);
        // Equality: LEQ half lives one id above, flip swaps which half the
        // working direction certifies.
        assert_eq!(eq_half_id(5, Sign::Eq, Sign::Geq, false), 5);
        assert_eq!(eq_half_id(5, Sign::Eq, Sign::Leq, false), 6);
        assert_eq!(eq_half_id(5, Sign::Eq, Sign::Geq, true), 6);
        assert_eq!(eq_half_id(5, Sign::Eq, Sign::Leq, true), 5);
    }

    #[test]
    fn reify_emits_both_halves_with_witnesses() {
        let mut f = Formula::new();
        let a = Lit::positive(f.new_var());
        let b = Lit::positive(f.new_var());
        let z = Lit::positive(f.new_var());
        let mut ctr = Card::default();

        let pb = Pb::new(vec![a, b], vec![1, 1], 1, Sign::Geq);
        let (g, l) = reify(&mut f, &mut ctr, z, &pb).unwrap();
        assert_eq!((g.id, l.id), (1, 2));
        assert_eq!(g.coeff_sum, 2);

        let mut out = Vec::new();
        for e in f.proof_exprs() {
            e.write(&mut out, f.var_names()).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "red 1 x1 1 x2 1 ~x3 >= 1 ; x3 -> 0\n\
             red 1 ~x1 1 ~x2 2 x3 >= 2 ; x3 -> 1\n"
        );
        assert_eq!(ctr.proof_ids.len(), 2);
    }

    #[test]
    fn derive_sum_uses_relative_references_mid_chain() {
        let mut f = Formula::new();
        f.bump_proof_ids(10);
        let mut ctr = Card::default();
        let entries = [
            Reified { id: 3, coeff_sum: 4 },
            Reified { id: 5, coeff_sum: 4 },
            Reified { id: 7, coeff_sum: 4 },
        ];
        let last = derive_sum(&mut f, &mut ctr, &entries);
        assert_eq!(last, 12);

        let mut out = Vec::new();
        for e in f.proof_exprs() {
            e.write(&mut out, f.var_names()).unwrap();
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "p 3 5 + 2 d\n\
             p -1 2 * 7 + 3 d\n"
        );
    }

    #[test]
    fn weighted_sum_collapses_to_unary_on_unit_deltas() {
        let mut a = Formula::new();
        let mut b = Formula::new();
        let mut ca = Card::default();
        let mut cb = Card::default();
        let entries = [Reified { id: 1, coeff_sum: 3 }, Reified { id: 2, coeff_sum: 3 }];
        derive_sum(&mut a, &mut ca, &entries);
        derive_weighted_sum(&mut b, &mut cb, &[(1, 1), (2, 1)]);

        let mut ta = Vec::new();
        let mut tb = Vec::new();
        a.proof_exprs()[0].write(&mut ta, a.var_names()).unwrap();
        b.proof_exprs()[0].write(&mut tb, b.var_names()).unwrap();
        assert_eq!(ta, tb);
    }

    #[test]
    fn ordering_divides_by_the_left_coefficient_sum() {
        let mut f = Formula::new();
        let mut ctr = Card::default();
        let p1 = Reified { id: 4, coeff_sum: 7 };
        let p2 = Reified { id: 6, coeff_sum: 7 };
        derive_ordering(&mut f, &mut ctr, &p1, &p2);
        assert_eq!(render_last(&f), "p 4 6 + 7 d\n");
    }

    #[test]
    fn full_pipeline_round_trip() {
        let text = "\
* #variable= 4 #constraint= 3
1 x1 1 x2 1 x3 1 x4 >= 2 ;
3 x1 2 x2 1 x3 <= 4 ;
1 x1 1 x2 >= 1 ;
";
        let mut f = Formula::new();
        crate::parser::parse_opb(text, &mut f).unwrap();
        let enc = Encoder::new(CardEncoding::Sequential, PbEncoding::Adder, true);
        enc.encode_all(&mut f).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cnf_path = dir.path().join("out.cnf");
        let pbp_path = dir.path().join("out.pbp");
        let mut w = std::fs::File::create(&cnf_path).unwrap();
        f.write_cnf(&mut w).unwrap();
        let mut w = std::fs::File::create(&pbp_path).unwrap();
        f.write_pbp(&mut w).unwrap();

        let cnf = std::fs::read_to_string(&cnf_path).unwrap();
        let header = cnf.lines().next().unwrap();
        assert_eq!(header, format!("p cnf {} {}", f.n_vars(), f.n_hard()));
        assert_eq!(cnf.lines().count(), 1 + f.n_hard());

        let pbp = std::fs::read_to_string(&pbp_path).unwrap();
        assert!(pbp.starts_with("pseudo-Boolean proof version 1.2\nf\n# 1\n"));
        assert!(pbp.contains("\nw 1\n"));
        // The clause-shaped constraint closes the log.
        assert!(pbp.ends_with("u 1 x1 1 x2 >= 1 ;\n"));
    }

    #[test]
    fn saturation_rebinds_the_constraint_id() {
        let mut f = Formula::new();
        let lits: Vec<Lit> = (0..2).map(|_| Lit::positive(f.new_var())).collect();
        f.add_pb(Pb::new(lits, vec![3, 9], 4, Sign::Leq));
        let enc = Encoder::new(CardEncoding::Sequential, PbEncoding::Adder, false);
        let mut pbs = f.take_pbs();
        enc.encode_pb(&mut f, &mut pbs[0]).unwrap();
        // Constraint id 1, saturation line 2; the coefficient 9 clamps to
        // rhs + 1 = 5.
        assert_eq!(pbs[0].id, 2);
        assert_eq!(pbs[0].coeffs, vec![3, 5]);
        f.restore_pbs(pbs);

        let mut out = Vec::new();
        f.proof_exprs()[0].write(&mut out, f.var_names()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "p 1 s\n");
    }
}
