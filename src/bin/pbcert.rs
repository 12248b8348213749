//! Command-line driver.
//!
//! `pbcert [options] <input.opb>` reads a pseudo-Boolean instance,
//! encodes every constraint with the selected schemes, and writes
//! `<input>.cnf` (plus `<input>.pbp` when proof logging is on) next to
//! the input file.
//!
//! Options (all `0|1`):
//!   --card      0 = sequential counter (default), 1 = totalizer
//!   --pb        0 = generalized totalizer (default), 1 = adder network
//!   --verified  1 = emit proof derivations alongside the clauses
//!   --proof     1 = write the proof log file
//!   --stats     1 = skip encoding, report instance shape only
//!
//! Diagnostics go to stderr (`RUST_LOG` controls verbosity); stdout
//! carries only the `c`/`s` status lines, so it stays scriptable.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pbcert::{parse_opb, CardEncoding, EncodeError, Encoder, Formula, PbEncoding};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_switch(args: &[String], key: &str, default: bool) -> Result<bool> {
    match parse_flag(args, key).as_deref() {
        None => Ok(default),
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(v) => bail!("invalid value `{}` for {} (expected 0 or 1)", v, key),
    }
}

fn input_path(args: &[String]) -> Option<PathBuf> {
    let mut skip_next = false;
    let mut input = None;
    for a in &args[1..] {
        if skip_next {
            skip_next = false;
            continue;
        }
        if a.starts_with("--") {
            skip_next = true;
            continue;
        }
        input = Some(PathBuf::from(a));
    }
    input
}

#[derive(Serialize)]
struct InstanceStats {
    variables: usize,
    clause_constraints: usize,
    cardinality_constraints: usize,
    pseudo_boolean_constraints: usize,
    has_objective: bool,
    cardinality_sizes: BTreeMap<usize, usize>,
    pseudo_boolean_sizes: BTreeMap<usize, usize>,
}

fn print_stats(f: &Formula) -> Result<()> {
    let mut card_sizes = BTreeMap::new();
    for c in f.cards() {
        *card_sizes.entry(c.lits.len()).or_insert(0usize) += 1;
    }
    let mut pb_sizes = BTreeMap::new();
    for p in f.pbs() {
        *pb_sizes.entry(p.lits.len()).or_insert(0usize) += 1;
    }
    let stats = InstanceStats {
        variables: f.n_vars(),
        clause_constraints: f.n_hard(),
        cardinality_constraints: f.n_cards(),
        pseudo_boolean_constraints: f.n_pbs(),
        has_objective: f.objective().is_some(),
        cardinality_sizes: card_sizes,
        pseudo_boolean_sizes: pb_sizes,
    };

    println!("c variables: {}", stats.variables);
    println!("c clause constraints: {}", stats.clause_constraints);
    println!("c cardinality constraints: {}", stats.cardinality_constraints);
    println!("c pseudo-Boolean constraints: {}", stats.pseudo_boolean_constraints);
    for (size, count) in &stats.cardinality_sizes {
        println!("c   cardinality size {}: {}", size, count);
    }
    for (size, count) in &stats.pseudo_boolean_sizes {
        println!("c   pseudo-Boolean size {}: {}", size, count);
    }
    println!("c stats {}", serde_json::to_string(&stats)?);
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    let card = if parse_switch(args, "--card", false)? {
        CardEncoding::Totalizer
    } else {
        CardEncoding::Sequential
    };
    let pb = if parse_switch(args, "--pb", false)? { PbEncoding::Adder } else { PbEncoding::Gte };
    let verified = parse_switch(args, "--verified", false)?;
    let proof = parse_switch(args, "--proof", false)?;
    let stats = parse_switch(args, "--stats", false)?;

    let input = match input_path(args) {
        Some(p) => p,
        None => bail!("usage: pbcert [options] <input.opb>"),
    };

    let text = fs::read_to_string(&input)
        .with_context(|| format!("Could not open file {}", input.display()))?;
    let mut formula = Formula::new();
    parse_opb(&text, &mut formula)?;
    info!(
        variables = formula.n_vars(),
        clauses = formula.n_hard(),
        cardinality = formula.n_cards(),
        pseudo_boolean = formula.n_pbs(),
        "parsed instance"
    );

    if stats {
        return print_stats(&formula);
    }

    let encoder = Encoder::new(card, pb, verified);
    encoder.encode_all(&mut formula)?;
    info!(
        variables = formula.n_vars(),
        clauses = formula.n_hard(),
        proof_lines = formula.proof_exprs().len(),
        "encoded instance"
    );

    write_out(&formula, &input.with_extension("cnf"), |f, w| f.write_cnf(w))?;
    if proof {
        write_out(&formula, &input.with_extension("pbp"), |f, w| f.write_pbp(w))?;
    }
    Ok(())
}

fn write_out(
    formula: &Formula,
    path: &Path,
    emit: impl Fn(&Formula, &mut dyn Write) -> std::io::Result<()>,
) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Could not create file {}", path.display()))?;
    let mut w = BufWriter::new(file);
    emit(formula, &mut w).with_context(|| format!("writing {}", path.display()))?;
    w.flush()?;
    info!(path = %path.display(), "wrote output");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => {}
        Err(err) => {
            if err.downcast_ref::<EncodeError>().is_some() {
                println!("c Overflow in the Encoding");
            } else {
                println!("c ERROR! {:#}", err);
            }
            println!("s UNKNOWN");
            process::exit(50);
        }
    }
}
