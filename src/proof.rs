//! Cutting-planes proof expressions.
//!
//! One value of [`ProofExpr`] is one line of the emitted proof:
//!
//! - `Rup` — a reverse-unit-propagation lemma (`u …`),
//! - `Red` — a redundance/reification introduction with its witness
//!   (`red … ; x -> v`),
//! - `Eq` — an explicit equality check against an earlier line (`e …`),
//! - `Pol` — a reverse-Polish expression over previously derived line
//!   identifiers (`p …`) built from addition, multiplication by a positive
//!   integer, division with rounding up, and saturation.
//!
//! Every expression carries the proof-line identifier it receives when
//! emitted; identifiers are handed out by the formula's monotone counter
//! immediately before the expression is stored, so the stored order is
//! also the identifier order. Inside a `Pol`, `-1` refers to the line
//! immediately above, which keeps long sum chains readable.

use std::io::{self, Write};

use crate::constraints::{Pb, Sign};
use crate::formula::VarNames;
use crate::literal::{Lit, Var};

/// One token of a `p` reverse-Polish expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PolTok {
    /// Push a constraint id (negative values are relative, `-1` = previous line).
    Id(i64),
    /// Add the top two stack entries.
    Add,
    /// Multiply the top entry by a positive integer.
    Mul(u64),
    /// Divide the top entry by a positive integer, rounding up.
    Div(u64),
    /// Saturate the top entry.
    Sat,
}

/// Builder for `p` expressions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolOps {
    toks: Vec<PolTok>,
}

impl PolOps {
    pub fn new() -> PolOps {
        PolOps::default()
    }

    /// Push a constraint identifier.
    pub fn push(&mut self, id: i64) -> &mut Self {
        self.toks.push(PolTok::Id(id));
        self
    }

    /// Add the two topmost entries.
    pub fn add(&mut self) -> &mut Self {
        self.toks.push(PolTok::Add);
        self
    }

    /// Multiply the top entry by `k > 0`.
    pub fn mul(&mut self, k: u64) -> &mut Self {
        assert!(k > 0);
        self.toks.push(PolTok::Mul(k));
        self
    }

    /// Divide the top entry by `k > 0`, rounding up.
    pub fn div(&mut self, k: u64) -> &mut Self {
        assert!(k > 0);
        self.toks.push(PolTok::Div(k));
        self
    }

    /// Saturate the top entry.
    pub fn sat(&mut self) -> &mut Self {
        self.toks.push(PolTok::Sat);
        self
    }

    pub fn tokens(&self) -> &[PolTok] {
        &self.toks
    }
}

/// One line of the proof log.
#[derive(Clone, Debug)]
pub enum ProofExpr {
    Rup { id: u64, clause: Vec<Lit> },
    Red { id: u64, pb: Pb, var: Var, value: bool },
    Eq { id: u64, target: u64, pb: Pb },
    Pol { id: u64, ops: PolOps },
}

impl ProofExpr {
    /// The proof-line identifier this expression was allocated.
    pub fn id(&self) -> u64 {
        match self {
            ProofExpr::Rup { id, .. }
            | ProofExpr::Red { id, .. }
            | ProofExpr::Eq { id, .. }
            | ProofExpr::Pol { id, .. } => *id,
        }
    }

    /// Print the canonical form, one line including the trailing newline.
    pub fn write(&self, w: &mut dyn Write, names: &VarNames) -> io::Result<()> {
        match self {
            ProofExpr::Rup { clause, .. } => write_rup(w, clause, names),
            ProofExpr::Red { pb, var, value, .. } => {
                write!(w, "red ")?;
                write_pb(w, pb, names)?;
                writeln!(w, " x{} -> {}", names.display(*var), *value as u8)
            }
            ProofExpr::Eq { target, pb, .. } => {
                write!(w, "e {} ", target)?;
                write_pb(w, pb, names)?;
                writeln!(w)
            }
            ProofExpr::Pol { ops, .. } => {
                write!(w, "p")?;
                for tok in ops.tokens() {
                    match tok {
                        PolTok::Id(c) => write!(w, " {}", c)?,
                        PolTok::Add => write!(w, " +")?,
                        PolTok::Mul(k) => write!(w, " {} *", k)?,
                        PolTok::Div(k) => write!(w, " {} d", k)?,
                        PolTok::Sat => write!(w, " s")?,
                    }
                }
                writeln!(w)
            }
        }
    }
}

/// `u 1 x3 1 ~x5 >= 1 ;` — shared by [`ProofExpr::Rup`] and the per-clause
/// lines the serializer prints for attributed hard clauses.
pub fn write_rup(w: &mut dyn Write, clause: &[Lit], names: &VarNames) -> io::Result<()> {
    if clause.is_empty() {
        return writeln!(w, "u >= 1 ;");
    }
    write!(w, "u ")?;
    for &lit in clause {
        write_lit(w, lit, names)?;
        write!(w, " ")?;
    }
    writeln!(w, ">= 1 ;")
}

fn write_lit(w: &mut dyn Write, lit: Lit, names: &VarNames) -> io::Result<()> {
    if lit.is_negated() {
        write!(w, "1 ~x{}", names.display(lit.var()))
    } else {
        write!(w, "1 x{}", names.display(lit.var()))
    }
}

/// `c₁ [~]xV₁ c₂ [~]xV₂ … (>=|<=|=) rhs ;`
pub fn write_pb(w: &mut dyn Write, pb: &Pb, names: &VarNames) -> io::Result<()> {
    for (&lit, &c) in pb.lits.iter().zip(&pb.coeffs) {
        let neg = if lit.is_negated() { "~" } else { "" };
        write!(w, "{} {}x{} ", c, neg, names.display(lit.var()))?;
    }
    let sign = match pb.sign {
        Sign::Geq => ">=",
        Sign::Leq => "<=",
        Sign::Eq => "=",
    };
    write!(w, "{} {} ;", sign, pb.rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &ProofExpr) -> String {
        let names = VarNames::default();
        let mut out = Vec::new();
        expr.write(&mut out, &names).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn lit(v: u32) -> Lit {
        Lit::positive(Var(v))
    }

    #[test]
    fn rup_prints_unit_coefficients_and_fixed_rhs() {
        let e = ProofExpr::Rup { id: 7, clause: vec![lit(0), !lit(2)] };
        assert_eq!(render(&e), "u 1 x1 1 ~x3 >= 1 ;\n");

        let falsum = ProofExpr::Rup { id: 8, clause: vec![] };
        assert_eq!(render(&falsum), "u >= 1 ;\n");
    }

    #[test]
    fn red_prints_constraint_then_witness() {
        let pb = Pb::new(vec![lit(0), !lit(1)], vec![1, 2], 2, Sign::Geq);
        let e = ProofExpr::Red { id: 3, pb, var: Var(1), value: false };
        assert_eq!(render(&e), "red 1 x1 2 ~x2 >= 2 ; x2 -> 0\n");
    }

    #[test]
    fn pol_tokens_render_in_reverse_polish() {
        let mut ops = PolOps::new();
        ops.push(4).mul(2).push(5).add().div(3);
        let e = ProofExpr::Pol { id: 9, ops };
        assert_eq!(render(&e), "p 4 2 * 5 + 3 d\n");

        let mut sat = PolOps::new();
        sat.push(1).sat();
        let e = ProofExpr::Pol { id: 10, ops: sat };
        assert_eq!(render(&e), "p 1 s\n");
    }

    #[test]
    fn equality_check_names_its_target() {
        let pb = Pb::new(vec![lit(4)], vec![1], 1, Sign::Geq);
        let e = ProofExpr::Eq { id: 11, target: 6, pb };
        assert_eq!(render(&e), "e 6 1 x5 >= 1 ;\n");
    }
}
