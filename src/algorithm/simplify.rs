//! # Presolve substitution
//!
//! Eliminates variables that zero-balance constraints pin down before the
//! tableau is built. Two patterns are recognized on rows with a zero right
//! hand side: rows that force all their variables to zero (single-signed
//! rows), and equality rows with exactly one positive coefficient, which
//! define that variable in terms of the others. Substitutions are applied to
//! fixed point; the eliminated variables are restored by back-substitution
//! once the tableau has been solved.
use log::debug;
use num_traits::Zero;

use crate::data::equation::{EqSystem, EqTag, LinearEq, RelOp, Terms, VarId};
use crate::data::rational::{ArithmeticError, Rational};

/// The reduced system a [`simplify`] pass produces.
#[derive(Debug, Clone)]
pub struct Simplified {
    /// Surviving constraints, including re-entered upper bounds for
    /// substituted variables.
    pub eqs: Vec<LinearEq>,
    /// Eliminated variables with their replacement combinations, in
    /// elimination order. Replacements reference surviving variables only.
    pub subs: Vec<(VarId, Terms)>,
    /// Constraints that reduced to a false constant relation; the system is
    /// only partially satisfiable.
    pub invalid: Vec<EqTag>,
}

enum Rhs {
    Const(Rational),
    Subst(VarId),
}

struct WorkRow {
    tag: Option<EqTag>,
    terms: Terms,
    op: RelOp,
    rhs: Rhs,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Candidate {
    Zero,
    Row(usize),
    Conflict,
}

/// Reduce a system by substituting out pinned variables.
///
/// # Errors
///
/// When evaluating a replacement at the variable maxima is indeterminate,
/// which happens with opposed unbounded variables.
pub fn simplify(system: &EqSystem) -> Result<Simplified, ArithmeticError> {
    let mut rows: Vec<WorkRow> = system
        .eqs()
        .iter()
        .map(|eq| WorkRow {
            tag: Some(eq.tag.clone()),
            terms: eq.terms.clone(),
            op: eq.op,
            rhs: Rhs::Const(eq.rhs.clone()),
        })
        .collect();

    loop {
        let candidates = collect_candidates(&rows);
        if candidates.is_empty() {
            break;
        }
        for (var, candidate) in candidates {
            let replacement = match candidate {
                Candidate::Zero => {
                    debug!("pinning {var} to zero");
                    rows.push(WorkRow {
                        tag: None,
                        terms: Terms::new(),
                        op: RelOp::Eq,
                        rhs: Rhs::Subst(var),
                    });
                    Terms::new()
                }
                Candidate::Row(idx) => {
                    let row = &mut rows[idx];
                    match row.terms.remove(var) {
                        Some(coefficient) => {
                            let factor = -coefficient;
                            row.terms.scale_div(&factor);
                            row.rhs = Rhs::Subst(var);
                            debug!("substituting {var}");
                            row.terms.clone()
                        }
                        None if row.terms.is_empty() => {
                            // an earlier substitution this round collapsed the
                            // defining row to 0 = 0, leaving the variable free
                            row.rhs = Rhs::Subst(var);
                            Terms::new()
                        }
                        // the defining row changed under us; retry next round
                        None => continue,
                    }
                }
                Candidate::Conflict => unreachable!(),
            };
            for row in &mut rows {
                row.terms.substitute(var, &replacement);
            }
        }
    }

    partition(system, rows)
}

fn collect_candidates(rows: &[WorkRow]) -> Vec<(VarId, Candidate)> {
    let mut candidates: Vec<(VarId, Candidate)> = Vec::new();
    let position = |candidates: &[(VarId, Candidate)], var: VarId| {
        candidates.iter().position(|(v, _)| *v == var)
    };
    for (idx, row) in rows.iter().enumerate() {
        let Rhs::Const(rhs) = &row.rhs else { continue };
        if !rhs.is_zero() || row.terms.is_empty() {
            continue;
        }
        let positive = row.terms.iter().filter(|(_, r)| r.is_positive()).count();
        let all_positive =
            positive == row.terms.len() && matches!(row.op, RelOp::Eq | RelOp::Le);
        let all_negative = positive == 0 && matches!(row.op, RelOp::Eq | RelOp::Ge);
        if all_positive || all_negative {
            // a single-signed zero balance forces every variable in it to zero
            for (var, _) in row.terms.iter() {
                match position(&candidates, var) {
                    Some(i) => candidates[i].1 = Candidate::Zero,
                    None => candidates.push((var, Candidate::Zero)),
                }
            }
        } else if row.op == RelOp::Eq && positive == 1 {
            let Some((var, _)) = row.terms.iter().find(|(_, r)| r.is_positive()) else {
                continue;
            };
            match position(&candidates, var) {
                None => candidates.push((var, Candidate::Row(idx))),
                Some(i) if candidates[i].1 == Candidate::Zero => {}
                Some(i) => candidates[i].1 = Candidate::Conflict,
            }
        }
    }
    candidates.retain(|(_, c)| *c != Candidate::Conflict);
    candidates
}

fn partition(system: &EqSystem, rows: Vec<WorkRow>) -> Result<Simplified, ArithmeticError> {
    let mut result = Simplified {
        eqs: Vec::new(),
        subs: Vec::new(),
        invalid: Vec::new(),
    };
    for row in rows {
        let tag = row
            .tag
            .clone()
            .unwrap_or_else(|| EqTag::new(name_of(system, fallback_var(&row))));
        match &row.rhs {
            Rhs::Const(rhs) => {
                if !row.terms.is_empty() {
                    let trivial = row.op == RelOp::Ge
                        && rhs.is_zero()
                        && row.terms.iter().all(|(_, r)| !r.is_negative());
                    if !trivial {
                        result
                            .eqs
                            .push(LinearEq::new(tag, row.terms, row.op, rhs.clone()));
                    }
                } else if row.op.holds(&Rational::zero(), rhs) != Some(true) {
                    debug!("constraint {tag} reduced to 0 {} {rhs}", row.op);
                    result.invalid.push(tag);
                }
            }
            Rhs::Subst(var) => {
                let var = *var;
                let max = max_of(system, var);
                if max.is_finite() {
                    // the bound on the eliminated variable still applies to
                    // its replacement; re-enter it unless it cannot bind
                    let estimate = row.terms.evaluate(|v| max_of(system, v));
                    if estimate.is_nan() {
                        return Err(ArithmeticError::NotANumber);
                    }
                    if estimate > max {
                        result
                            .eqs
                            .push(LinearEq::new(tag, row.terms.clone(), RelOp::Le, max));
                    }
                }
                result.subs.push((var, row.terms));
            }
        }
    }
    Ok(result)
}

fn max_of(system: &EqSystem, var: VarId) -> Rational {
    system
        .var(var)
        .map_or_else(Rational::infinity, |v| v.max.clone())
}

fn fallback_var(row: &WorkRow) -> VarId {
    match row.rhs {
        Rhs::Subst(var) => var,
        Rhs::Const(_) => VarId(u32::MAX),
    }
}

fn name_of(system: &EqSystem, var: VarId) -> String {
    system
        .var(var)
        .map_or_else(|| var.to_string(), |v| v.name.clone())
}
