//! The constraint store.
//!
//! A [`Formula`] owns everything the pipeline produces: variables, hard
//! clauses, cardinality and pseudo-Boolean constraints, and the ordered
//! list of proof expressions. It also owns the proof-line counter; every
//! emitted proof line calls [`Formula::next_proof_id`] exactly once, and
//! the serializer relies on the stored order matching the id order.
//!
//! ## Lifecycle
//!
//! Created empty, populated by the OPB parser, enriched by the encoders,
//! then serialized to `.cnf` and `.pbp`. Constraints are moved out with
//! [`Formula::take_cards`] / [`Formula::take_pbs`] while their encoder
//! runs (so the encoder can mutate both the formula and the constraint
//! without aliasing) and must be restored before serialization.
//!
//! ## Variable identities
//!
//! Parsed variables keep their original `xN` number in a side map; fresh
//! encoder variables have none and print as `index + 1`. Both serializers
//! print through this remapping.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::constraints::{Card, Constraint, Pb, Sign};
use crate::literal::{Clause, Lit, Var};
use crate::proof::{write_rup, ProofExpr};

/// Map from internal variable index to the original `xN` identifier.
#[derive(Clone, Debug, Default)]
pub struct VarNames {
    to_original: HashMap<u32, u64>,
}

impl VarNames {
    /// Identifier to print for `var`: its original number if it came from
    /// the input, otherwise `index + 1`.
    pub fn display(&self, var: Var) -> u64 {
        self.to_original.get(&var.0).copied().unwrap_or(var.0 as u64 + 1)
    }
}

/// Constraint store and proof-line allocator.
#[derive(Debug, Default)]
pub struct Formula {
    n_vars: u32,
    hard: Vec<Clause>,
    proof_exprs: Vec<ProofExpr>,
    cards: Vec<Card>,
    pbs: Vec<Pb>,
    /// Hard-clause indices of constraints that reduced to a single clause;
    /// their `u` lines are printed after all constraint blocks.
    clause_constraints: Vec<usize>,
    name_to_index: HashMap<String, u32>,
    names: VarNames,
    proof_id: u64,
    objective: Option<crate::constraints::PbObjective>,
}

impl Formula {
    pub fn new() -> Formula {
        Formula::default()
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars as usize
    }

    pub fn n_hard(&self) -> usize {
        self.hard.len()
    }

    pub fn hard_clauses(&self) -> &[Clause] {
        &self.hard
    }

    pub fn proof_exprs(&self) -> &[ProofExpr] {
        &self.proof_exprs
    }

    pub fn var_names(&self) -> &VarNames {
        &self.names
    }

    /// Allocate a fresh (unnamed) variable.
    pub fn new_var(&mut self) -> Var {
        let v = Var(self.n_vars);
        self.n_vars += 1;
        v
    }

    /// Allocate a fresh variable and return it as a literal.
    pub fn new_lit(&mut self, negated: bool) -> Lit {
        Lit::new(self.new_var(), negated)
    }

    /// Look up or create the variable for a parsed name, remembering its
    /// original number for printing.
    pub fn named_var(&mut self, name: &str, original: u64) -> Var {
        if let Some(&idx) = self.name_to_index.get(name) {
            return Var(idx);
        }
        let v = self.new_var();
        self.name_to_index.insert(name.to_owned(), v.0);
        self.names.to_original.insert(v.0, original);
        v
    }

    /// Current value of the proof-line counter (the id of the most recently
    /// allocated line).
    pub fn proof_id(&self) -> u64 {
        self.proof_id
    }

    /// Allocate the next proof-line identifier. Must be called exactly once
    /// per emitted proof line.
    pub fn next_proof_id(&mut self) -> u64 {
        self.proof_id += 1;
        self.proof_id
    }

    /// Advance the counter past lines the checker assigns implicitly (one
    /// per attributed clause printed as a `u` line).
    pub fn bump_proof_ids(&mut self, n: u64) {
        self.proof_id += n;
    }

    /// Append a hard clause attributed to `ctr`.
    pub fn add_hard_clause(&mut self, ctr: &mut dyn Constraint, lits: &[Lit]) {
        ctr.clause_ids().push(self.hard.len());
        self.hard.push(lits.to_vec());
    }

    /// Append a proof expression attributed to `ctr`.
    pub fn add_proof_expr(&mut self, ctr: &mut dyn Constraint, expr: ProofExpr) {
        debug_assert!(
            self.proof_exprs.last().map_or(true, |prev| prev.id() < expr.id()),
            "proof-line ids must be emitted in increasing order"
        );
        ctr.proof_ids().push(self.proof_exprs.len());
        self.proof_exprs.push(expr);
    }

    /// Store a parsed constraint, normalizing per its shape.
    ///
    /// Reserves one proof-line id for the constraint itself (two for an
    /// equality: the GEQ half at `id`, the LEQ half at `id + 1`), then
    /// either emits it directly as a hard clause or queues it for an
    /// encoder.
    pub fn add_pb(&mut self, mut pb: Pb) {
        let id = self.next_proof_id();
        let sign = pb.sign;
        pb.id = id;

        if pb.lits.is_empty() {
            self.clause_constraints.push(self.hard.len());
            self.hard.push(Vec::new());
            return;
        }

        if pb.is_clause() {
            let clause: Clause = match pb.sign {
                Sign::Eq => {
                    debug_assert_eq!(pb.lits.len(), 1);
                    if pb.rhs == 0 {
                        vec![!pb.lits[0]]
                    } else {
                        vec![pb.lits[0]]
                    }
                }
                Sign::Geq => pb.lits.clone(),
                Sign::Leq => pb.lits.iter().map(|&l| !l).collect(),
            };
            self.clause_constraints.push(self.hard.len());
            self.hard.push(clause);
        } else if pb.is_cardinality() {
            self.cards.push(Card::new(pb.lits, pb.rhs, pb.sign, id));
        } else {
            self.pbs.push(pb);
        }

        if sign == Sign::Eq {
            self.next_proof_id();
        }
    }

    /// Store a cardinality constraint directly, reserving its proof id
    /// (two for an equality).
    pub fn add_card(&mut self, lits: Vec<Lit>, rhs: i64, sign: Sign) {
        let id = self.next_proof_id();
        self.cards.push(Card::new(lits, rhs, sign, id));
        if sign == Sign::Eq {
            self.next_proof_id();
        }
    }

    pub fn n_cards(&self) -> usize {
        self.cards.len()
    }

    pub fn n_pbs(&self) -> usize {
        self.pbs.len()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn pbs(&self) -> &[Pb] {
        &self.pbs
    }

    pub fn set_objective(&mut self, obj: crate::constraints::PbObjective) {
        self.objective = Some(obj);
    }

    pub fn objective(&self) -> Option<&crate::constraints::PbObjective> {
        self.objective.as_ref()
    }

    /// Move the cardinality constraints out for encoding.
    pub fn take_cards(&mut self) -> Vec<Card> {
        std::mem::take(&mut self.cards)
    }

    /// Restore constraints taken with [`Formula::take_cards`].
    pub fn restore_cards(&mut self, cards: Vec<Card>) {
        debug_assert!(self.cards.is_empty());
        self.cards = cards;
    }

    /// Move the pseudo-Boolean constraints out for encoding.
    pub fn take_pbs(&mut self) -> Vec<Pb> {
        std::mem::take(&mut self.pbs)
    }

    /// Restore constraints taken with [`Formula::take_pbs`].
    pub fn restore_pbs(&mut self, pbs: Vec<Pb>) {
        debug_assert!(self.pbs.is_empty());
        self.pbs = pbs;
    }

    /// `p cnf V H` header plus one line per clause, literals remapped to
    /// original variable numbers, `0`-terminated.
    pub fn write_cnf(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "p cnf {} {}", self.n_vars, self.hard.len())?;
        for clause in &self.hard {
            for &lit in clause {
                let neg = if lit.is_negated() { "-" } else { "" };
                write!(w, "{}{} ", neg, self.names.display(lit.var()))?;
            }
            writeln!(w, "0")?;
        }
        Ok(())
    }

    /// Proof log: header, then one block per stored constraint in input
    /// order (`# 1`, its proof expressions, `# 0`, its clauses as RUP
    /// lines, `w 1`), then the clauses of clause-only constraints.
    pub fn write_pbp(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "pseudo-Boolean proof version 1.2")?;
        writeln!(w, "f")?;

        for card in &self.cards {
            self.write_block(w, &card.proof_ids, &card.clause_ids)?;
        }
        for pb in &self.pbs {
            self.write_block(w, &pb.proof_ids, &pb.clause_ids)?;
        }
        for &idx in &self.clause_constraints {
            write_rup(w, &self.hard[idx], &self.names)?;
        }
        Ok(())
    }

    fn write_block(
        &self,
        w: &mut dyn Write,
        proof_ids: &[usize],
        clause_ids: &[usize],
    ) -> io::Result<()> {
        writeln!(w, "# 1")?;
        for &idx in proof_ids {
            self.proof_exprs[idx].write(w, &self.names)?;
        }
        writeln!(w, "# 0")?;
        for &idx in clause_ids {
            write_rup(w, &self.hard[idx], &self.names)?;
        }
        writeln!(w, "w 1")
    }
}
