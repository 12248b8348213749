//! Binary adder network encoding of pseudo-Boolean constraints.
//!
//! Input literals are spread into per-bit buckets by the set bits of
//! their coefficients, the buckets are reduced with full and half adder
//! cells (carries overflowing into the next bucket, extending the bucket
//! array when the top one fills), and the resulting one-bit-per-position
//! output vector is compared bitwise against the bound's bit pattern.
//! Full adders get six extra clauses beyond the standard fourteen so the
//! per-clause propagation checks go through.
//!
//! [`Plain`] flips toward the smaller bound, handles equalities natively,
//! and emits both comparator directions. [`Verified`] normalizes each
//! pass to the at-most side (at-least by complementation, equalities as
//! two passes); every adder cell is certified by reifying its carry
//! (`a+b+c ≥ 2`) and sum (`a+b+c+2·¬carry ≥ 3`) and combining the halves
//! into `2·carry + sum ≥ a+b+c`, which is lifted by `2^bit` and folded
//! into one trailing accumulator line that starts from the constraint id.
//!
//! A position with no literal and no carry stays empty; the comparators
//! treat it as a constant zero bit.

use std::collections::VecDeque;

use crate::constraints::{Pb, Sign};
use crate::encode::{apply_trivial, eq_half_id, reify, trivial_case, Emitter, EncodeError};
use crate::formula::Formula;
use crate::literal::Lit;
use crate::proof::{PolOps, ProofExpr};

/// Position of the highest set bit, plus one.
fn ld64(x: u64) -> u32 {
    debug_assert!(x > 0);
    u64::BITS - x.leading_zeros()
}

/// Little-endian bit pattern of `number`, padded to `n` positions.
fn num_to_bits(n: usize, number: u64) -> Vec<u64> {
    (0..n).map(|i| if i < 64 { number >> i & 1 } else { 0 }).collect()
}

fn fa_carry(em: &mut Emitter, f: &mut Formula, pb: &mut Pb, a: Lit, b: Lit, c: Lit) -> Lit {
    let x = f.new_lit(false);
    em.ternary(f, pb, b, c, !x);
    em.ternary(f, pb, a, c, !x);
    em.ternary(f, pb, a, b, !x);
    em.ternary(f, pb, !b, !c, x);
    em.ternary(f, pb, !a, !c, x);
    em.ternary(f, pb, !a, !b, x);
    x
}

fn fa_sum(em: &mut Emitter, f: &mut Formula, pb: &mut Pb, a: Lit, b: Lit, c: Lit) -> Lit {
    let x = f.new_lit(false);
    em.quaternary(f, pb, a, b, c, !x);
    em.quaternary(f, pb, a, !b, !c, !x);
    em.quaternary(f, pb, !a, b, !c, !x);
    em.quaternary(f, pb, !a, !b, c, !x);
    em.quaternary(f, pb, !a, !b, !c, x);
    em.quaternary(f, pb, !a, b, c, x);
    em.quaternary(f, pb, a, !b, c, x);
    em.quaternary(f, pb, a, b, !c, x);
    x
}

fn fa_extra(em: &mut Emitter, f: &mut Formula, pb: &mut Pb, xc: Lit, xs: Lit, a: Lit, b: Lit, c: Lit) {
    em.ternary(f, pb, !xc, !xs, a);
    em.ternary(f, pb, !xc, !xs, b);
    em.ternary(f, pb, !xc, !xs, c);
    em.ternary(f, pb, xc, xs, !a);
    em.ternary(f, pb, xc, xs, !b);
    em.ternary(f, pb, xc, xs, !c);
}

fn ha_carry(em: &mut Emitter, f: &mut Formula, pb: &mut Pb, a: Lit, b: Lit) -> Lit {
    let x = f.new_lit(false);
    em.binary(f, pb, a, !x);
    em.binary(f, pb, b, !x);
    em.ternary(f, pb, !a, !b, x);
    x
}

fn ha_sum(em: &mut Emitter, f: &mut Formula, pb: &mut Pb, a: Lit, b: Lit) -> Lit {
    let x = f.new_lit(false);
    em.ternary(f, pb, !a, !b, !x);
    em.ternary(f, pb, a, b, !x);
    em.ternary(f, pb, !a, b, x);
    em.ternary(f, pb, a, !b, x);
    x
}

/// Clauses for `xs ≤ ys` with `ys` a constant bit vector. An undefined
/// position of `xs` is a constant zero: under a one of `ys` it satisfies
/// the whole clause, under a zero it contributes nothing.
fn less_than_or_equal(
    em: &mut Emitter,
    f: &mut Formula,
    pb: &mut Pb,
    xs: &[Option<Lit>],
    ys: &[u64],
) {
    assert_eq!(xs.len(), ys.len());
    for i in 0..xs.len() {
        let xi = match xs[i] {
            Some(l) if ys[i] == 0 => l,
            _ => continue,
        };
        let mut clause = Vec::new();
        let mut skip = false;
        for j in i + 1..xs.len() {
            if ys[j] == 1 {
                match xs[j] {
                    None => {
                        skip = true;
                        break;
                    }
                    Some(l) => clause.push(!l),
                }
            } else if let Some(l) = xs[j] {
                clause.push(l);
            }
        }
        if skip {
            continue;
        }
        clause.push(!xi);
        em.clause(f, pb, &clause);
    }
}

/// Clauses for `xs ≥ ys`. A constant-zero position below a one of `ys`
/// forces a strict difference higher up, so the clause is emitted without
/// its own literal rather than dropped.
fn greater_than_or_equal(
    em: &mut Emitter,
    f: &mut Formula,
    pb: &mut Pb,
    xs: &[Option<Lit>],
    ys: &[u64],
) {
    assert_eq!(xs.len(), ys.len());
    for i in 0..xs.len() {
        if ys[i] == 0 {
            continue;
        }
        let mut clause = Vec::new();
        let mut skip = false;
        for j in i + 1..xs.len() {
            if ys[j] == 1 {
                match xs[j] {
                    None => {
                        skip = true;
                        break;
                    }
                    Some(l) => clause.push(!l),
                }
            } else if let Some(l) = xs[j] {
                clause.push(l);
            }
        }
        if skip {
            continue;
        }
        if let Some(l) = xs[i] {
            clause.push(l);
        }
        em.clause(f, pb, &clause);
    }
}

/// CNF-only adder network.
#[derive(Debug, Default)]
pub struct Plain {
    em: Emitter,
}

impl Plain {
    pub fn new() -> Plain {
        Plain::default()
    }

    pub fn encode(&mut self, f: &mut Formula, pb: &mut Pb) -> Result<(), EncodeError> {
        let mut lits = pb.lits.clone();
        let coeffs = pb.coeffs.clone();
        let sum = pb.coeff_sum()?;

        let t = trivial_case(pb.rhs, sum, pb.sign);
        if apply_trivial(&mut self.em, f, pb, &lits, t) {
            return Ok(());
        }

        let mut rhs = pb.rhs as u64;
        let mut current = pb.sign;
        if sum - rhs < rhs {
            for l in &mut lits {
                *l = !*l;
            }
            rhs = sum - rhs;
            if current != Sign::Eq {
                current = if current == Sign::Geq { Sign::Leq } else { Sign::Geq };
            }
        }

        // Keep every coefficient inside the comparator range; positions
        // outside it cannot be represented by the bucket array.
        let mut kept_lits = Vec::with_capacity(lits.len());
        let mut kept_coeffs = Vec::with_capacity(coeffs.len());
        for (&l, &c) in lits.iter().zip(&coeffs) {
            if c == 0 {
                continue;
            }
            match current {
                Sign::Geq => {
                    kept_lits.push(l);
                    kept_coeffs.push(c.min(rhs));
                }
                Sign::Leq | Sign::Eq if c > rhs + 1 => self.em.unit(f, pb, !l),
                _ => {
                    kept_lits.push(l);
                    kept_coeffs.push(c);
                }
            }
        }
        if kept_lits.is_empty() {
            return Ok(());
        }

        let nb = ld64(rhs);
        let mut buckets: Vec<VecDeque<Lit>> = Vec::new();
        let mut output: Vec<Option<Lit>> = Vec::new();
        for bit in 0..=nb {
            buckets.push(VecDeque::new());
            output.push(None);
            for (&l, &c) in kept_lits.iter().zip(&kept_coeffs) {
                if c >> bit & 1 == 1 {
                    buckets[bit as usize].push_back(l);
                }
            }
        }

        adder_tree(&mut self.em, f, pb, &mut buckets, &mut output, &mut None)?;

        let kbits = num_to_bits(buckets.len(), rhs);
        if current == Sign::Geq || current == Sign::Eq {
            greater_than_or_equal(&mut self.em, f, pb, &output, &kbits);
        }
        if current == Sign::Leq || current == Sign::Eq {
            less_than_or_equal(&mut self.em, f, pb, &output, &kbits);
        }
        Ok(())
    }
}

/// Proof state threaded through the bucket reduction of a verified pass.
struct CellLog {
    /// Accumulator under construction (starts at the constraint's id).
    acc: PolOps,
    cells: usize,
}

/// Reduce the buckets to one literal per position. When `log` is present,
/// each cell is reified and its `2·carry + sum ≥ inputs` line is folded
/// into the accumulator, scaled by the bucket's bit weight.
fn adder_tree(
    em: &mut Emitter,
    f: &mut Formula,
    pb: &mut Pb,
    buckets: &mut Vec<VecDeque<Lit>>,
    output: &mut Vec<Option<Lit>>,
    log: &mut Option<CellLog>,
) -> Result<(), EncodeError> {
    let mut i = 0;
    while i < buckets.len() {
        if buckets[i].is_empty() {
            i += 1;
            continue;
        }

        if i == buckets.len() - 1 && buckets[i].len() >= 2 {
            buckets.push(VecDeque::new());
            output.push(None);
        }

        while buckets[i].len() >= 3 {
            let x = buckets[i].pop_front().expect("three inputs");
            let y = buckets[i].pop_front().expect("three inputs");
            let z = buckets[i].pop_front().expect("three inputs");
            let xc = fa_carry(em, f, pb, x, y, z);
            let xs = fa_sum(em, f, pb, x, y, z);
            buckets[i].push_back(xs);
            buckets[i + 1].push_back(xc);
            fa_extra(em, f, pb, xc, xs, x, y, z);
            if let Some(log) = log.as_mut() {
                log_cell(f, pb, &[x, y, z], xc, xs, i, log)?;
            }
        }

        if buckets[i].len() == 2 {
            let x = buckets[i].pop_front().expect("two inputs");
            let y = buckets[i].pop_front().expect("two inputs");
            let xc = ha_carry(em, f, pb, x, y);
            let xs = ha_sum(em, f, pb, x, y);
            buckets[i + 1].push_back(xc);
            buckets[i].push_back(xs);
            if let Some(log) = log.as_mut() {
                log_cell(f, pb, &[x, y], xc, xs, i, log)?;
            }
        }

        output[i] = buckets[i].pop_front();
        i += 1;
    }
    Ok(())
}

/// Certify one adder cell and fold it into the accumulator.
fn log_cell(
    f: &mut Formula,
    pb: &mut Pb,
    inputs: &[Lit],
    carry: Lit,
    sum: Lit,
    bit: usize,
    log: &mut CellLog,
) -> Result<(), EncodeError> {
    let carry_pb = Pb::new(inputs.to_vec(), vec![1; inputs.len()], 2, Sign::Geq);
    let (_, carry_leq) = reify(f, pb, carry, &carry_pb)?;

    let mut sum_pb = Pb::new(inputs.to_vec(), vec![1; inputs.len()], 3, Sign::Geq);
    sum_pb.lits.push(!carry);
    sum_pb.coeffs.push(2);
    let (_, sum_leq) = reify(f, pb, sum, &sum_pb)?;

    // 2·carry + sum dominates the cell inputs.
    let id = f.next_proof_id();
    let mut ops = PolOps::new();
    ops.push(carry_leq.id as i64).mul(2).push(sum_leq.id as i64).add().div(3);
    f.add_proof_expr(pb, ProofExpr::Pol { id, ops });

    let weight = 1u64.checked_shl(bit as u32).ok_or(EncodeError::Overflow)?;
    log.acc.push(id as i64);
    if weight > 1 {
        log.acc.mul(weight);
    }
    log.acc.add();
    log.cells += 1;
    Ok(())
}

/// Adder network with proof logging.
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
                self.pass(f, pb, Sign::Geq)?;
                self.pass(f, pb, Sign::Leq)
            }
            sign => self.pass(f, pb, sign),
        }
    }

    fn pass(&mut self, f: &mut Formula, pb: &mut Pb, side: Sign) -> Result<(), EncodeError> {
        let mut lits = pb.lits.clone();
        let coeffs = pb.coeffs.clone();
        let sum = pb.coeff_sum()?;

        let t = trivial_case(pb.rhs, sum, side);
        if apply_trivial(&mut self.em, f, pb, &lits, t) {
            return Ok(());
        }

        // Normalize to the at-most side.
        let mut rhs = pb.rhs as u64;
        let flipped = side == Sign::Geq;
        if flipped {
            for l in &mut lits {
                *l = !*l;
            }
            rhs = sum - rhs;
        }

        // A coefficient above the bound fixes its literal outright and
        // stays out of the network.
        let mut kept_lits = Vec::with_capacity(lits.len());
        let mut kept_coeffs = Vec::with_capacity(coeffs.len());
        for (&l, &c) in lits.iter().zip(&coeffs) {
            if c == 0 {
                continue;
            }
            if c > rhs {
                self.em.unit(f, pb, !l);
            } else {
                kept_lits.push(l);
                kept_coeffs.push(c);
            }
        }
        if kept_lits.is_empty() {
            return Ok(());
        }

        let nb = ld64(rhs);
        let mut buckets: Vec<VecDeque<Lit>> = Vec::new();
        let mut output: Vec<Option<Lit>> = Vec::new();
        for bit in 0..nb {
            buckets.push(VecDeque::new());
            output.push(None);
            for (&l, &c) in kept_lits.iter().zip(&kept_coeffs) {
                if c >> bit & 1 == 1 {
                    buckets[bit as usize].push_back(l);
                }
            }
        }

        let base = eq_half_id(pb.id, pb.sign, Sign::Leq, flipped);
        let mut acc = PolOps::new();
        acc.push(base as i64);
        let mut log = Some(CellLog { acc, cells: 0 });
        adder_tree(&mut self.em, f, pb, &mut buckets, &mut output, &mut log)?;

        let kbits = num_to_bits(buckets.len(), rhs);
        less_than_or_equal(&mut self.em, f, pb, &output, &kbits);

        let log = log.expect("cell log present");
        if log.cells > 0 {
            let id = f.next_proof_id();
            f.add_proof_expr(pb, ProofExpr::Pol { id, ops: log.acc });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{CardEncoding, Encoder, PbEncoding};
    use crate::proof::ProofExpr;
    use crate::testutil::{assert_pb_equisat, named_lits, proof_ids_strictly_increase};

    fn setup(coeffs: &[u64], rhs: i64, sign: Sign) -> (Formula, Pb) {
        let mut f = Formula::new();
        let lits = named_lits(&mut f, coeffs.len() as u64);
        f.add_pb(Pb::new(lits, coeffs.to_vec(), rhs, sign));
        let pb = f.take_pbs().remove(0);
        (f, pb)
    }

    #[test]
    fn bit_helpers() {
        assert_eq!(ld64(1), 1);
        assert_eq!(ld64(4), 3);
        assert_eq!(ld64(7), 3);
        assert_eq!(num_to_bits(4, 4), vec![0, 0, 1, 0]);
        assert_eq!(num_to_bits(3, 5), vec![1, 0, 1]);
    }

    #[test]
    fn weighted_at_most_verified_layout() {
        // 3·x1 + 2·x2 + x3 ≤ 4 through the dispatcher.
        let mut f = Formula::new();
        let lits = named_lits(&mut f, 3);
        f.add_pb(Pb::new(lits, vec![3, 2, 1], 4, Sign::Leq));
        let mut pbs = f.take_pbs();
        let enc = Encoder::new(CardEncoding::Sequential, PbEncoding::Adder, true);
        enc.encode_pb(&mut f, &mut pbs[0]).unwrap();
        let pb = pbs.remove(0);

        // One half adder (bit 0) and one full adder (bit 1): four fresh
        // variables, 7 + 20 cell clauses, two comparator clauses.
        assert_eq!(f.n_vars(), 3 + 4);
        assert_eq!(pb.clause_ids.len(), 29);

        let reds = f
            .proof_exprs()
            .iter()
            .filter(|e| matches!(e, ProofExpr::Red { .. }))
            .count();
        assert_eq!(reds, 8);

        // Trailing accumulator: saturated id, plus the half-adder cell,
        // plus the full-adder cell lifted by its bit weight.
        let mut out = Vec::new();
        f.proof_exprs().last().unwrap().write(&mut out, f.var_names()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "p 2 7 + 12 2 * +\n");
        proof_ids_strictly_increase(&f);
    }

    #[test]
    fn plain_network_is_equisatisfiable() {
        for (coeffs, rhs, sign) in [
            (vec![3u64, 2, 1], 4i64, Sign::Leq),
            (vec![3, 2, 1], 4, Sign::Geq),
            (vec![2, 2], 3, Sign::Geq),
            (vec![1, 1, 1, 1], 2, Sign::Leq),
            (vec![3, 2, 1], 3, Sign::Eq),
            (vec![2, 1], 2, Sign::Eq),
            // Unreachable equality: the at-least comparator must still
            // fire on the constant-zero low bit.
            (vec![2, 2], 3, Sign::Eq),
            (vec![5, 3, 1], 4, Sign::Leq),
        ] {
            let (mut f, mut pb) = setup(&coeffs, rhs, sign);
            Plain::new().encode(&mut f, &mut pb).unwrap();
            assert_pb_equisat(&f, &coeffs, rhs, sign);
        }
    }

    #[test]
    fn verified_network_is_equisatisfiable() {
        for (coeffs, rhs, sign) in [
            (vec![3u64, 2, 1], 4i64, Sign::Leq),
            (vec![3, 2, 1], 4, Sign::Geq),
            (vec![2, 2], 3, Sign::Geq),
            (vec![3, 2, 1], 3, Sign::Eq),
            (vec![5, 3, 1], 4, Sign::Leq),
        ] {
            let (mut f, mut pb) = setup(&coeffs, rhs, sign);
            Verified::new().encode(&mut f, &mut pb).unwrap();
            assert_pb_equisat(&f, &coeffs, rhs, sign);
        }
    }

    #[test]
    fn flip_keeps_large_coefficients_sound() {
        // 10·x1 + x2 ≥ 10 flips to an at-most-one form where the big
        // coefficient leaves the network as a forced unit.
        let (mut f, mut pb) = setup(&[10, 1], 10, Sign::Geq);
        Plain::new().encode(&mut f, &mut pb).unwrap();
        assert_pb_equisat(&f, &[10, 1], 10, Sign::Geq);

        let (mut f, mut pb) = setup(&[10, 1], 10, Sign::Geq);
        Verified::new().encode(&mut f, &mut pb).unwrap();
        assert_pb_equisat(&f, &[10, 1], 10, Sign::Geq);
    }

    #[test]
    fn randomized_instances_stay_equisatisfiable() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0xadd3);
        for _ in 0..25 {
            let n = rng.gen_range(2..=3);
            // First coefficient above one keeps the instance out of the
            // clause and cardinality fast paths.
            let mut coeffs: Vec<u64> = (0..n).map(|_| rng.gen_range(1..=4)).collect();
            coeffs[0] = rng.gen_range(2..=4);
            let sum: u64 = coeffs.iter().sum();
            let rhs = rng.gen_range(1..sum) as i64;
            let sign = if rng.gen_bool(0.5) { Sign::Leq } else { Sign::Geq };

            let (mut f, mut pb) = setup(&coeffs, rhs, sign);
            Plain::new().encode(&mut f, &mut pb).unwrap();
            assert_pb_equisat(&f, &coeffs, rhs, sign);

            let (mut f, mut pb) = setup(&coeffs, rhs, sign);
            Verified::new().encode(&mut f, &mut pb).unwrap();
            assert_pb_equisat(&f, &coeffs, rhs, sign);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let render = |verified: bool| {
            let (mut f, mut pb) = setup(&[4, 3, 2, 1], 5, Sign::Leq);
            if verified {
                Verified::new().encode(&mut f, &mut pb).unwrap();
            } else {
                Plain::new().encode(&mut f, &mut pb).unwrap();
            }
            f.restore_pbs(vec![pb]);
            let mut cnf = Vec::new();
            let mut pbp = Vec::new();
            f.write_cnf(&mut cnf).unwrap();
            f.write_pbp(&mut pbp).unwrap();
            (cnf, pbp)
        };
        assert_eq!(render(true), render(true));
        assert_eq!(render(false), render(false));
    }
}
