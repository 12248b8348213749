//! OPB input reader.
//!
//! Accepts the common pseudo-Boolean shape: an optional
//! `* #variable= V #constraint= C` header, comment lines starting with
//! `*`, an optional `min:` objective, and `;`-terminated constraints of
//! the form `c₁ [~]xN … (>=|<=|=) rhs ;`. Statements may span lines.
//!
//! Variable names must match `x<digits>`: the numeric suffix is the
//! identity both serializers print, so other name shapes are rejected
//! up front instead of being silently renumbered.

use tracing::{debug, warn};

use crate::constraints::{Pb, PbObjective, Sign};
use crate::formula::Formula;
use crate::literal::Lit;

/// Failures while reading an OPB instance.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },
    #[error("line {line}: variable name `{name}` is not of the form x<digits>")]
    BadVarName { line: usize, name: String },
    #[error("line {line}: overflow while normalizing constraint")]
    Overflow { line: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn syntax(line: usize, msg: impl Into<String>) -> ParseError {
    ParseError::Syntax { line, msg: msg.into() }
}

/// Parse an OPB document into `f`.
pub fn parse_opb(input: &str, f: &mut Formula) -> Result<(), ParseError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut stmt_line = 0;

    for (idx, raw) in input.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('*') {
            if tokens.is_empty() {
                read_header(lineno, line);
                continue;
            }
            return Err(syntax(stmt_line, "comment inside an unterminated statement"));
        }

        for tok in line.split_whitespace() {
            if tokens.is_empty() {
                stmt_line = lineno;
            }
            // A terminator may arrive glued to the last token.
            if tok != ";" && tok.ends_with(';') {
                tokens.push(tok[..tok.len() - 1].to_owned());
                tokens.push(";".to_owned());
            } else {
                tokens.push(tok.to_owned());
            }
            if tokens.last().map(String::as_str) == Some(";") {
                let stmt = std::mem::take(&mut tokens);
                read_statement(f, stmt_line, &stmt)?;
            }
        }
    }

    if !tokens.is_empty() {
        return Err(syntax(stmt_line, "unterminated statement at end of input"));
    }
    Ok(())
}

/// `* #variable= V #constraint= C` — advisory only.
fn read_header(lineno: usize, line: &str) {
    let toks: Vec<&str> = line.split_whitespace().collect();
    let mut vars = None;
    let mut ctrs = None;
    for w in toks.windows(2) {
        match w[0] {
            "#variable=" => vars = w[1].parse::<u64>().ok(),
            "#constraint=" => ctrs = w[1].parse::<u64>().ok(),
            _ => {}
        }
    }
    if let (Some(v), Some(c)) = (vars, ctrs) {
        debug!(line = lineno, variables = v, constraints = c, "instance header");
    }
}

fn read_statement(f: &mut Formula, line: usize, toks: &[String]) -> Result<(), ParseError> {
    debug_assert_eq!(toks.last().map(String::as_str), Some(";"));
    let body = &toks[..toks.len() - 1];
    if body.is_empty() {
        return Err(syntax(line, "empty statement"));
    }

    if body[0] == "min:" {
        let mut obj = PbObjective::default();
        for (lit, coeff) in read_terms(f, line, &body[1..])? {
            obj.add_term(lit, coeff).map_err(|_| ParseError::Overflow { line })?;
        }
        f.set_objective(obj);
        return Ok(());
    }

    // Terms, then a relational operator, then the right-hand side.
    let rel = body
        .iter()
        .position(|t| t == ">=" || t == "<=" || t == "=")
        .ok_or_else(|| syntax(line, "missing relational operator"))?;
    if rel + 2 != body.len() {
        return Err(syntax(line, "expected a single right-hand side after the operator"));
    }

    let mut pb = Pb::default();
    for (lit, coeff) in read_terms(f, line, &body[..rel])? {
        pb.add_term(lit, coeff).map_err(|_| ParseError::Overflow { line })?;
    }
    pb.sign = match body[rel].as_str() {
        ">=" => Sign::Geq,
        "<=" => Sign::Leq,
        _ => Sign::Eq,
    };
    let rhs: i64 = body[rel + 1]
        .parse()
        .map_err(|_| syntax(line, format!("invalid right-hand side `{}`", body[rel + 1])))?;
    pb.add_rhs(rhs).map_err(|_| ParseError::Overflow { line })?;

    if pb.lits.is_empty() {
        warn!(line, "constraint without terms");
    }
    f.add_pb(pb);
    Ok(())
}

/// Read `coeff [~]xN` pairs.
fn read_terms(
    f: &mut Formula,
    line: usize,
    toks: &[String],
) -> Result<Vec<(Lit, i64)>, ParseError> {
    if toks.len() % 2 != 0 {
        return Err(syntax(line, "terms must come as coefficient/variable pairs"));
    }
    let mut out = Vec::with_capacity(toks.len() / 2);
    for pair in toks.chunks(2) {
        let coeff: i64 = pair[0]
            .trim_start_matches('+')
            .parse()
            .map_err(|_| syntax(line, format!("invalid coefficient `{}`", pair[0])))?;

        let (negated, name) = match pair[1].strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, pair[1].as_str()),
        };
        let digits = name.strip_prefix('x').unwrap_or("");
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::BadVarName { line, name: pair[1].clone() });
        }
        let original: u64 = digits
            .parse()
            .map_err(|_| ParseError::BadVarName { line, name: pair[1].clone() })?;

        let var = f.named_var(name, original);
        out.push((Lit::new(var, negated), coeff));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_small_instance() {
        let text = "\
* #variable= 3 #constraint= 3
* a comment
+1 x1 +1 x2 >= 1 ;
3 x1 2 x2 1 x3 <= 4 ;
1 x1 1 x2 1 x3 >= 2 ;
";
        let mut f = Formula::new();
        parse_opb(text, &mut f).unwrap();
        assert_eq!(f.n_vars(), 3);
        // First constraint is a clause, second general, third cardinality.
        assert_eq!(f.n_hard(), 1);
        assert_eq!(f.n_pbs(), 1);
        assert_eq!(f.n_cards(), 1);
        assert_eq!(f.pbs()[0].rhs, 4);
        assert_eq!(f.cards()[0].rhs, 2);
    }

    #[test]
    fn normalizes_negative_coefficients() {
        let mut f = Formula::new();
        parse_opb("-2 x1 +1 x2 >= -1 ;\n", &mut f).unwrap();
        let pb = &f.pbs()[0];
        assert_eq!(pb.coeffs, vec![2, 1]);
        assert!(pb.lits[0].is_negated());
        // -2·x1 + x2 ≥ -1 became 2·~x1 + x2 ≥ 1.
        assert_eq!(pb.rhs, 1);
    }

    #[test]
    fn reads_objective_and_glued_terminator() {
        let text = "min: 2 x1 1 x2 ;\n1 x1 1 x2 = 1;\n";
        let mut f = Formula::new();
        parse_opb(text, &mut f).unwrap();
        let obj = f.objective().unwrap();
        assert_eq!(obj.coeffs, vec![2, 1]);
        assert_eq!(f.n_cards(), 1);
        assert_eq!(f.cards()[0].sign, Sign::Eq);
    }

    #[test]
    fn statements_may_span_lines() {
        let text = "1 x1 1 x2\n1 x3 >= 2\n;\n";
        let mut f = Formula::new();
        parse_opb(text, &mut f).unwrap();
        assert_eq!(f.n_cards(), 1);
        assert_eq!(f.cards()[0].lits.len(), 3);
    }

    #[test]
    fn rejects_foreign_variable_names() {
        let mut f = Formula::new();
        let err = parse_opb("1 y1 >= 1 ;\n", &mut f).unwrap_err();
        assert!(matches!(err, ParseError::BadVarName { .. }));

        let mut f = Formula::new();
        let err = parse_opb("1 xa >= 1 ;\n", &mut f).unwrap_err();
        assert!(matches!(err, ParseError::BadVarName { .. }));
    }

    #[test]
    fn rejects_malformed_statements() {
        let mut f = Formula::new();
        assert!(parse_opb("1 x1 >= ;\n", &mut f).is_err());
        let mut f = Formula::new();
        assert!(parse_opb("1 x1 1 ;\n", &mut f).is_err());
        let mut f = Formula::new();
        assert!(parse_opb("1 x1 >= 1\n", &mut f).is_err());
    }

    #[test]
    fn rejects_unrepresentable_bounds() {
        let mut f = Formula::new();
        let text = "1 x1 >= 18446744073709551615 ;\n";
        assert!(parse_opb(text, &mut f).is_err());
    }

    #[test]
    fn tilde_negates_a_literal() {
        let mut f = Formula::new();
        parse_opb("1 x1 1 ~x2 1 x3 >= 2 ;\n", &mut f).unwrap();
        let card = &f.cards()[0];
        assert!(!card.lits[0].is_negated());
        assert!(card.lits[1].is_negated());
    }
}
