//! Generalized totalizer encoding of pseudo-Boolean constraints.
//!
//! The weighted analogue of the totalizer: each tree node carries a
//! sparse unary output, a map from reachable partial-sum weight to one
//! literal meaning "the subtree sum is at least this weight". Children
//! are bound into the parent pointwise and pairwise, and `succ`-ordering
//! clauses force the map to stay monotone between adjacent weights.
//! Weights above the bound collapse to a single representative entry.
//!
//! The verified variant certifies each node by reifying every output
//! literal against the delta-weighted child outputs (the sparse-unary
//! value of a child is `Σ (wᵢ − wᵢ₋₁)·ℓᵢ`), ordering adjacent weights,
//! and chaining both directions with the weighted sum recurrence; the
//! root sums the per-node chains onto the constraint's id.
//!
//! Output fixing scans the sorted entries downward and stops at the first
//! weight at or below the bound.

use std::collections::BTreeMap;

use crate::constraints::{Pb, Sign};
use crate::encode::{
    apply_trivial, derive_ordering, derive_weighted_sum, eq_half_id, reify, trivial_case, Emitter,
    EncodeError, Reified,
};
use crate::formula::Formula;
use crate::literal::Lit;
use crate::proof::{PolOps, ProofExpr};

/// Sparse unary output of a tree node, ordered by weight.
type WeightMap = BTreeMap<u64, Lit>;

fn get_var(f: &mut Formula, out: &mut WeightMap, weight: u64) -> Lit {
    *out.entry(weight).or_insert_with(|| f.new_lit(false))
}

/// Smallest key of `map` strictly greater than `w`.
fn succ(map: &WeightMap, w: u64) -> Lit {
    let (_, &lit) = map.range(w + 1..).next().expect("successor weight must exist");
    lit
}

/// Split the literal/weight pairs, cap each half's bound, and recurse.
fn split_bounds(ilits: &[(u64, Lit)], k: u64) -> (usize, u64, u64) {
    let lsize = ilits.len() >> 1;
    let lsum: u64 = ilits[..lsize].iter().map(|e| e.0).sum();
    let rsum: u64 = ilits[lsize..].iter().map(|e| e.0).sum();
    (lsize, lsum.min(k), rsum.min(k))
}

/// CNF-only generalized totalizer. Equalities are encoded as two passes.
#[derive(Debug, Default)]
pub struct Plain {
    em: Emitter,
}

impl Plain {
    pub fn new() -> Plain {
        Plain::default()
    }

    pub fn encode(&mut self, f: &mut Formula, pb: &mut Pb) -> Result<(), EncodeError> {
        match pb.sign {
            Sign::Eq => {
                self.half(f, pb, Sign::Geq)?;
                self.half(f, pb, Sign::Leq)
            }
            sign => self.half(f, pb, sign),
        }
    }

    fn half(&mut self, f: &mut Formula, pb: &mut Pb, sign: Sign) -> Result<(), EncodeError> {
        let prep = match prepare(&mut self.em, f, pb, sign)? {
            Some(p) => p,
            None => return Ok(()),
        };

        let mut out = WeightMap::new();
        self.encode_leq(f, pb, prep.k, &prep.ilits, &mut out);
        fix_outputs(&mut self.em, f, pb, &out, prep.current, prep.rhs);
        Ok(())
    }

    fn encode_leq(
        &mut self,
        f: &mut Formula,
        pb: &mut Pb,
        k: u64,
        ilits: &[(u64, Lit)],
        out: &mut WeightMap,
    ) -> bool {
        if ilits.is_empty() || k == 0 {
            return false;
        }
        if ilits.len() == 1 {
            out.insert(ilits[0].0, ilits[0].1);
            return true;
        }

        let (lsize, lk, rk) = split_bounds(ilits, k);
        let mut lout = WeightMap::new();
        let mut rout = WeightMap::new();
        if !self.encode_leq(f, pb, lk, &ilits[..lsize], &mut lout) {
            return false;
        }
        if !self.encode_leq(f, pb, rk, &ilits[lsize..], &mut rout) {
            return false;
        }

        emit_node(&mut self.em, f, pb, &lout, &rout, out);
        simplify(out, k);
        true
    }
}

/// Generalized totalizer with proof logging.
#[derive(Debug, Default)]
pub struct Verified {
    em: Emitter,
}

impl Verified {
    pub fn new() -> Verified {
        Verified::default()
    }

    pub fn encode(&mut self, f: &mut Formula, pb: &mut Pb) -> Result<(), EncodeError> {
        match pb.sign {
            Sign::Eq => {
                self.half(f, pb, Sign::Geq)?;
                self.half(f, pb, Sign::Leq)
            }
            sign => self.half(f, pb, sign),
        }
    }

    fn half(&mut self, f: &mut Formula, pb: &mut Pb, sign: Sign) -> Result<(), EncodeError> {
        let prep = match prepare(&mut self.em, f, pb, sign)? {
            Some(p) => p,
            None => return Ok(()),
        };

        let mut out = WeightMap::new();
        let mut geq_ids = Vec::new();
        let mut leq_ids = Vec::new();
        self.encode_leq(f, pb, prep.k, &prep.ilits, &mut out, &mut geq_ids, &mut leq_ids)?;
        fix_outputs(&mut self.em, f, pb, &out, prep.current, prep.rhs);

        // The at-most direction propagates through the implication halves,
        // the at-least direction through the converse chains.
        let chain = if prep.current == Sign::Leq { &geq_ids } else { &leq_ids };
        if !chain.is_empty() {
            let id = f.next_proof_id();
            let mut ops = PolOps::new();
            ops.push(eq_half_id(pb.id, pb.sign, prep.current, prep.flipped) as i64);
            ops.push(chain[0] as i64).add();
            for &x in &chain[1..] {
                ops.push(x as i64).add();
            }
            f.add_proof_expr(pb, ProofExpr::Pol { id, ops });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_leq(
        &mut self,
        f: &mut Formula,
        pb: &mut Pb,
        k: u64,
        ilits: &[(u64, Lit)],
        out: &mut WeightMap,
        geq_ids: &mut Vec<u64>,
        leq_ids: &mut Vec<u64>,
    ) -> Result<bool, EncodeError> {
        if ilits.is_empty() || k == 0 {
            return Ok(false);
        }
        if ilits.len() == 1 {
            out.insert(ilits[0].0, ilits[0].1);
            return Ok(true);
        }

        let (lsize, lk, rk) = split_bounds(ilits, k);
        let mut lout = WeightMap::new();
        let mut rout = WeightMap::new();
        if !self.encode_leq(f, pb, lk, &ilits[..lsize], &mut lout, geq_ids, leq_ids)? {
            return Ok(false);
        }
        if !self.encode_leq(f, pb, rk, &ilits[lsize..], &mut rout, geq_ids, leq_ids)? {
            return Ok(false);
        }

        emit_node(&mut self.em, f, pb, &lout, &rout, out);

        let (g, l) = self.derive_sparse_unary_sum(f, pb, &lout, &rout, out)?;
        geq_ids.push(g);
        leq_ids.push(l);

        simplify(out, k);
        Ok(true)
    }

    /// Certify one node: every output weight is reified against the
    /// delta-weighted child outputs, adjacent weights are ordered, and the
    /// halves are chained in both directions.
    fn derive_sparse_unary_sum(
        &mut self,
        f: &mut Formula,
        pb: &mut Pb,
        left: &WeightMap,
        right: &WeightMap,
        out: &WeightMap,
    ) -> Result<(u64, u64), EncodeError> {
        let mut in_lits = Vec::new();
        let mut in_coeffs = Vec::new();
        for map in [left, right] {
            let mut prev = 0;
            for (&w, &l) in map.iter() {
                in_lits.push(l);
                in_coeffs.push(w - prev);
                prev = w;
            }
        }

        let mut sum_geq: Vec<(Reified, u64)> = Vec::with_capacity(out.len());
        let mut sum_leq: Vec<(Reified, u64)> = Vec::with_capacity(out.len());
        let mut prev = 0;
        for (&w, &o) in out.iter() {
            let rhs = i64::try_from(w).map_err(|_| EncodeError::Overflow)?;
            let rpb = Pb::new(in_lits.clone(), in_coeffs.clone(), rhs, Sign::Geq);
            let (g, l) = reify(f, pb, o, &rpb)?;
            sum_geq.push((g, w - prev));
            sum_leq.push((l, w - prev));
            prev = w;
        }

        let geq_entries: Vec<(u64, u64)> = sum_geq.iter().map(|(r, d)| (r.id, *d)).collect();
        let leq_entries: Vec<(u64, u64)> =
            sum_leq.iter().rev().map(|(r, d)| (r.id, *d)).collect();
        let c_geq = derive_weighted_sum(f, pb, &geq_entries);
        let c_leq = derive_weighted_sum(f, pb, &leq_entries);

        for i in 0..sum_geq.len().saturating_sub(1) {
            derive_ordering(f, pb, &sum_leq[i].0, &sum_geq[i + 1].0);
        }

        Ok((c_geq, c_leq))
    }
}

struct Prepared {
    ilits: Vec<(u64, Lit)>,
    rhs: u64,
    k: u64,
    current: Sign,
    flipped: bool,
}

/// Shared preprocessing: trivial simplification, polarity flip toward the
/// smaller bound, overflow guards, fixing of oversized coefficients, and
/// the weight-sorted input list.
fn prepare(
    em: &mut Emitter,
    f: &mut Formula,
    pb: &mut Pb,
    sign: Sign,
) -> Result<Option<Prepared>, EncodeError> {
    let mut lits = pb.lits.clone();
    let coeffs = pb.coeffs.clone();
    let sum = pb.coeff_sum()?;

    let t = trivial_case(pb.rhs, sum, sign);
    if apply_trivial(em, f, pb, &lits, t) {
        return Ok(None);
    }

    let mut rhs = pb.rhs as u64;
    let mut current = sign;
    let mut flipped = false;
    if sum - rhs < rhs {
        for l in &mut lits {
            *l = !*l;
        }
        rhs = sum - rhs;
        current = if current == Sign::Geq { Sign::Leq } else { Sign::Geq };
        flipped = true;
    }

    let mut ilits: Vec<(u64, Lit)> = Vec::with_capacity(lits.len());
    for (&l, &c) in lits.iter().zip(&coeffs) {
        if c == 0 {
            continue;
        }
        if c == u64::MAX {
            return Err(EncodeError::Overflow);
        }
        if current == Sign::Leq && c > rhs {
            em.unit(f, pb, !l);
        } else {
            ilits.push((c, l));
        }
    }
    if ilits.is_empty() {
        return Ok(None);
    }
    ilits.sort_by_key(|e| e.0);

    let k = if current == Sign::Geq { rhs } else { rhs + 1 };
    Ok(Some(Prepared { ilits, rhs, k, current, flipped }))
}

/// Binding, pairwise, and `succ`-ordering clauses of one node.
fn emit_node(
    em: &mut Emitter,
    f: &mut Formula,
    pb: &mut Pb,
    lout: &WeightMap,
    rout: &WeightMap,
    out: &mut WeightMap,
) {
    assert!(!lout.is_empty() && !rout.is_empty());

    for (&w, &l) in lout.iter() {
        let o = get_var(f, out, w);
        em.binary(f, pb, !l, o);
    }
    for (&w, &l) in rout.iter() {
        let o = get_var(f, out, w);
        em.binary(f, pb, !l, o);
    }
    for (&wl, &ll) in lout.iter() {
        for (&wr, &lr) in rout.iter() {
            let o = get_var(f, out, wl + wr);
            em.ternary(f, pb, !ll, !lr, o);
        }
    }

    let left_max = *lout.keys().next_back().expect("nonempty");
    let right_max = *rout.keys().next_back().expect("nonempty");

    let mut prev = 0;
    for (&w, &l) in lout.iter() {
        em.binary(f, pb, l, !succ(out, prev + right_max));
        prev = w;
    }
    let mut prev = 0;
    for (&w, &l) in rout.iter() {
        em.binary(f, pb, l, !succ(out, prev + left_max));
        prev = w;
    }
    let mut prev_l = 0;
    for (&wl, &ll) in lout.iter() {
        let mut prev_r = 0;
        for (&wr, &lr) in rout.iter() {
            em.ternary(f, pb, ll, lr, !succ(out, prev_l + prev_r));
            prev_r = wr;
        }
        prev_l = wl;
    }

    // Adjacent outputs stay monotone: a weight can only be reached
    // through every weight below it.
    let keys: Vec<u64> = out.keys().copied().collect();
    for pair in keys.windows(2) {
        let lo = out[&pair[0]];
        let hi = out[&pair[1]];
        em.binary(f, pb, lo, !hi);
    }
}

/// Keep the smallest entry at or above `k`; delete everything above it.
fn simplify(out: &mut WeightMap, k: u64) {
    if let Some((&keep, _)) = out.range(k..).next() {
        let drop: Vec<u64> = out.range(keep + 1..).map(|(&w, _)| w).collect();
        for w in drop {
            out.remove(&w);
        }
    }
}

/// Scan the outputs downward and unit-fix them against the bound,
/// stopping at the first weight on the feasible side.
fn fix_outputs(
    em: &mut Emitter,
    f: &mut Formula,
    pb: &mut Pb,
    out: &WeightMap,
    current: Sign,
    rhs: u64,
) {
    match current {
        Sign::Leq => {
            for (&w, &l) in out.iter().rev() {
                if w > rhs {
                    em.unit(f, pb, !l);
                } else {
                    break;
                }
            }
        }
        Sign::Geq => {
            for (&w, &l) in out.iter().rev() {
                if w >= rhs {
                    em.unit(f, pb, l);
                } else {
                    break;
                }
            }
        }
        Sign::Eq => unreachable!("equalities are dispatched as two passes"),
    }
}
