//! Shared helpers for encoder tests: brute-force equisatisfiability
//! checks over small instances, and common fixture builders.

use crate::constraints::Sign;
use crate::formula::Formula;
use crate::literal::Lit;

/// Register `x1..xn` and return their positive literals.
pub fn named_lits(f: &mut Formula, n: u64) -> Vec<Lit> {
    (1..=n).map(|i| Lit::positive(f.named_var(&format!("x{}", i), i))).collect()
}

fn lit_true(assign: &[bool], l: Lit) -> bool {
    assign[l.var().as_usize()] != l.is_negated()
}

/// Whether some extension of `orig` over the fresh variables satisfies
/// every hard clause. Exponential; keep instances tiny.
pub fn cnf_satisfiable_with(f: &Formula, orig: &[bool]) -> bool {
    let fresh = f.n_vars() - orig.len();
    assert!(fresh <= 22, "instance too large for brute force");
    for b in 0..(1u64 << fresh) {
        let mut assign = orig.to_vec();
        assign.extend((0..fresh).map(|i| b >> i & 1 == 1));
        if f.hard_clauses().iter().all(|cl| cl.iter().any(|&l| lit_true(&assign, l))) {
            return true;
        }
    }
    false
}

/// The encoded CNF, restricted to the first `n_orig` variables, must have
/// exactly the models `check` accepts.
pub fn assert_equisat(f: &Formula, n_orig: usize, check: &dyn Fn(&[bool]) -> bool) {
    for a in 0..(1u32 << n_orig) {
        let orig: Vec<bool> = (0..n_orig).map(|i| a >> i & 1 == 1).collect();
        let want = check(&orig);
        let can = cnf_satisfiable_with(f, &orig);
        assert_eq!(want, can, "model mismatch on original assignment {:?}", orig);
    }
}

/// Equisatisfiability against `Σ xᵢ ⋈ rhs` over `n` positive literals.
pub fn assert_card_equisat(f: &Formula, n: usize, rhs: i64, sign: Sign) {
    assert_equisat(f, n, &|a: &[bool]| {
        let count = a.iter().filter(|&&b| b).count() as i64;
        match sign {
            Sign::Geq => count >= rhs,
            Sign::Leq => count <= rhs,
            Sign::Eq => count == rhs,
        }
    });
}

/// Equisatisfiability against `Σ cᵢ·xᵢ ⋈ rhs` over positive literals.
pub fn assert_pb_equisat(f: &Formula, coeffs: &[u64], rhs: i64, sign: Sign) {
    assert_equisat(f, coeffs.len(), &|a: &[bool]| {
        let sum: i64 = a
            .iter()
            .zip(coeffs)
            .filter(|(&on, _)| on)
            .map(|(_, &c)| c as i64)
            .sum();
        match sign {
            Sign::Geq => sum >= rhs,
            Sign::Leq => sum <= rhs,
            Sign::Eq => sum == rhs,
        }
    });
}

/// Every stored proof expression must carry a strictly larger id than the
/// one before it.
pub fn proof_ids_strictly_increase(f: &Formula) {
    let mut prev = 0;
    for e in f.proof_exprs() {
        assert!(e.id() > prev, "proof id {} not above {}", e.id(), prev);
        prev = e.id();
    }
}
