//! # Solve orchestration
//!
//! [`Solver`] drives a full solve: validate the input, run the presolve
//! substitution, translate flow declarations and priorities into objective
//! tiers, solve the tableau tier by tier, and finally restore the eliminated
//! variables by back-substitution. The outcome is a [`SolveRes`] verdict next
//! to the per-variable rates; applying those rates to machines goes through
//! the [`ThrottleSink`] seam so the solver never touches the network model
//! itself.
use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use num_traits::{One, Zero};

use crate::algorithm::simplify::simplify;
use crate::algorithm::tableau::{Objective, Tableau, Tier};
use crate::algorithm::SolveRes;
use crate::config::SolverConfig;
use crate::data::equation::{EqSystem, EqTag, Priority, Terms, Var, VarId, IGNORE};
use crate::data::rational::{ArithmeticError, Rational};

/// Receives the computed throttle of each variable after a successful solve.
pub trait ThrottleSink {
    /// Called once per registered variable, in variable id order.
    fn set_throttle(&mut self, var: &Var, rate: &Rational);
}

/// Variable rates of a completed solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Every variable of the system with its computed rate, eliminated
    /// variables included.
    pub rates: BTreeMap<VarId, Rational>,
    /// Labeled residues of constraints that could not be met exactly.
    pub residues: Vec<(String, Rational)>,
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "solution:")?;
        for (var, rate) in &self.rates {
            writeln!(f, "  {var} = {rate}")?;
        }
        for (label, value) in &self.residues {
            writeln!(f, "  residue {label} = {value}")?;
        }
        Ok(())
    }
}

struct Prepared {
    tableau: Tableau,
    subs: Vec<(VarId, Terms)>,
    invalid: Vec<EqTag>,
}

/// Solves an [`EqSystem`] under an explicit [`SolverConfig`].
pub struct Solver {
    system: EqSystem,
    config: SolverConfig,
    result: SolveRes,
    prepared: Option<Prepared>,
}

impl Solver {
    /// Create a solver for a system. Nothing is computed yet.
    #[must_use]
    pub fn new(system: EqSystem, config: SolverConfig) -> Self {
        Self {
            system,
            config,
            result: SolveRes::Unsolved,
            prepared: None,
        }
    }

    /// The system being solved.
    #[must_use]
    pub fn system(&self) -> &EqSystem {
        &self.system
    }

    /// The configuration the solver was created with.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The verdict so far.
    #[must_use]
    pub fn result(&self) -> SolveRes {
        self.result
    }

    /// Rebuild the tableau from the system, discarding any previous solve.
    ///
    /// Runs validation, presolve and objective construction; the verdict is
    /// [`SolveRes::Unsolved`], or [`SolveRes::Partial`] when presolve proved
    /// some constraints unsatisfiable.
    ///
    /// # Errors
    ///
    /// When the input contains NaN rates (rejected under every numeric
    /// policy, the pivot arithmetic cannot compare NaN), or presolve
    /// arithmetic turns indeterminate.
    pub fn reset(&mut self) -> Result<SolveRes, ArithmeticError> {
        self.validate()?;
        let simplified = simplify(&self.system)?;
        let mut res = SolveRes::Unsolved;
        if !simplified.invalid.is_empty() {
            for tag in &simplified.invalid {
                warn!("constraint {tag} cannot be satisfied");
            }
            res = res | SolveRes::Partial;
        }
        let tiers = self.build_tiers(&simplified.subs);
        let tableau = Tableau::new(&simplified.eqs, tiers, self.system.var_table());
        self.prepared = Some(Prepared {
            tableau,
            subs: simplified.subs,
            invalid: simplified.invalid,
        });
        self.result = res;
        Ok(res)
    }

    /// Reject rates the pivot arithmetic cannot handle. NaN is refused no
    /// matter what [`NumericPolicy`](crate::NumericPolicy) the configuration
    /// carries; that policy governs value intake, not the tableau.
    fn validate(&self) -> Result<(), ArithmeticError> {
        let flows = self
            .system
            .outputs()
            .iter()
            .chain(self.system.inputs())
            .chain(self.system.other())
            .map(|(_, terms)| terms);
        for terms in self.system.eqs().iter().map(|eq| &eq.terms).chain(flows) {
            if terms.iter().any(|(_, rate)| rate.is_nan()) {
                return Err(ArithmeticError::NotANumber);
            }
        }
        if self.system.eqs().iter().any(|eq| eq.rhs.is_nan()) {
            return Err(ArithmeticError::NotANumber);
        }
        Ok(())
    }

    /// Solve the system, preparing it first when needed.
    ///
    /// Returns the outcome of this call; an already-solved system reports
    /// [`SolveRes::Noop`]. The accumulated verdict is [`Solver::result`].
    ///
    /// # Errors
    ///
    /// See [`Solver::reset`].
    pub fn solve(&mut self) -> Result<SolveRes, ArithmeticError> {
        if self.prepared.is_none() {
            self.reset()?;
        }
        let mut res = SolveRes::Noop;
        if let Some(prepared) = self.prepared.as_mut() {
            res = prepared.tableau.solve_all();
            self.result = self.result | res;
        }
        Ok(res)
    }

    /// Read the solution out of a solved tableau, restoring eliminated
    /// variables by back-substitution. `None` before the first
    /// [`Solver::solve`] or [`Solver::reset`].
    ///
    /// A replacement referencing a variable the tableau dropped falls back to
    /// that variable's finite bound; without one, the rate is unknown and the
    /// verdict degrades to [`SolveRes::Unbounded`].
    #[must_use]
    pub fn solution(&self) -> Option<(SolveRes, Solution)> {
        let prepared = self.prepared.as_ref()?;
        let raw = prepared.tableau.solution();
        let mut res = self.result;
        if raw.residues.iter().any(|(_, value)| !value.is_zero()) {
            res = res | SolveRes::Partial;
        }
        let mut rates = raw.values;
        for (var, replacement) in &prepared.subs {
            let mut rate = Rational::zero();
            for (v, r) in replacement.iter() {
                match rates.get(&v) {
                    Some(value) => rate += r * value,
                    None => {
                        let max = self
                            .system
                            .var(v)
                            .map_or_else(Rational::infinity, |def| def.max.clone());
                        if max.is_finite() {
                            rate += r * &max;
                        } else {
                            res = res | SolveRes::Unbounded;
                        }
                    }
                }
            }
            rates.insert(*var, rate);
        }
        Some((
            res,
            Solution {
                rates,
                residues: raw.residues,
            },
        ))
    }

    /// Push the computed throttles into `sink`.
    ///
    /// Skipped entirely when the solve failed; variables the solution does
    /// not mention get a throttle of 1. Writing the same solution twice is
    /// idempotent.
    pub fn apply<S: ThrottleSink>(&self, sink: &mut S) -> Option<(SolveRes, Solution)> {
        let (res, solution) = self.solution()?;
        if !res.failed() {
            let full = Rational::one();
            for var in self.system.vars() {
                let rate = solution.rates.get(&var.id).unwrap_or(&full);
                sink.set_throttle(var, rate);
            }
        }
        Some((res, solution))
    }

    /// Tags of constraints presolve proved unsatisfiable.
    #[must_use]
    pub fn invalid_eqs(&self) -> &[EqTag] {
        self.prepared.as_ref().map_or(&[], |p| &p.invalid)
    }

    /// Turn declarations and priorities into the lexicographic objective
    /// queue.
    ///
    /// Tier order: prioritized flows from highest to lowest priority
    /// (maximizations before minimizations at equal priority), then ignored
    /// outputs, then producers feeding ignored inputs, then total external
    /// input flow.
    fn build_tiers(&self, subs: &[(VarId, Terms)]) -> Vec<Tier> {
        fn record(
            levels: &mut Vec<(Priority, Vec<(VarId, i8)>)>,
            priority: Priority,
            var: VarId,
            dir: i8,
            overwrite: bool,
        ) {
            let index = match levels.iter().position(|(p, _)| *p == priority) {
                Some(i) => i,
                None => {
                    levels.push((priority, Vec::new()));
                    levels.len() - 1
                }
            };
            let level = &mut levels[index].1;
            match level.iter().position(|(v, _)| *v == var) {
                Some(i) if overwrite => level[i].1 = dir,
                Some(_) => {}
                None => level.push((var, dir)),
            }
        }

        let mut levels: Vec<(Priority, Vec<(VarId, i8)>)> = Vec::new();
        for (item, terms) in self.system.outputs() {
            let Some(priority) = self.system.output_priority(item) else {
                continue;
            };
            if priority <= IGNORE {
                continue;
            }
            for (var, rate) in terms.iter() {
                if rate.is_positive() {
                    record(&mut levels, priority, var, 1, true);
                } else if rate.is_negative() {
                    record(&mut levels, priority, var, -1, false);
                }
            }
        }
        for (var, priority) in self.system.priorities() {
            if priority > IGNORE {
                record(&mut levels, priority, var, 1, true);
            }
        }
        levels.sort_by_key(|(priority, _)| std::cmp::Reverse(*priority));

        let mut tiers = Vec::new();
        for (priority, entries) in levels {
            for (dir, suffix) in [(1i8, "max"), (-1, "min")] {
                let group: Vec<VarId> = entries
                    .iter()
                    .filter(|(_, d)| *d == dir)
                    .map(|(v, _)| *v)
                    .collect();
                if group.is_empty() {
                    continue;
                }
                let coefficient = Rational::from(i64::from(dir));
                let main: Terms = group
                    .iter()
                    .map(|v| (*v, coefficient.clone()))
                    .collect();
                let aux = group
                    .iter()
                    .map(|v| {
                        let terms: Terms =
                            std::iter::once((*v, coefficient.clone())).collect();
                        Objective::new(terms, self.var_name(*v))
                    })
                    .collect();
                tiers.push(Tier {
                    main: Objective::new(main, format!("p{priority}_{suffix}")),
                    aux,
                });
            }
        }

        // outputs demoted to IGNORE still get balanced, after everything else
        let mut also_main = Terms::new();
        let mut also_aux = Vec::new();
        for item in self.system.ignored_outputs() {
            let terms = self.flows_of(item, self.system.outputs());
            if terms.is_empty() {
                continue;
            }
            let negated = terms.negated();
            also_main.merge(&negated, &Rational::one());
            also_aux.push(Objective::new(negated, item));
        }
        if !also_aux.is_empty() {
            tiers.push(Tier {
                main: Objective::new(also_main, "also-output"),
                aux: also_aux,
            });
        }

        let mut ignored_inputs: Vec<(&String, &Terms)> = Vec::new();
        let mut regular_inputs: Vec<(&String, &Terms)> = Vec::new();
        for (item, terms) in self.system.inputs() {
            match self.system.input_priority(item) {
                Some(priority) if priority <= IGNORE => ignored_inputs.push((item, terms)),
                _ => regular_inputs.push((item, terms)),
            }
        }

        // producers feeding ignored inputs run as hard as they can
        if !ignored_inputs.is_empty() {
            let mut main = Terms::new();
            let mut aux = Vec::new();
            for (item, terms) in &ignored_inputs {
                aux.push(Objective::new((*terms).clone(), item.as_str()));
                for (var, rate) in terms.iter() {
                    if rate.is_positive() && main.get(var).is_none() {
                        main.add(var, Rational::one());
                    }
                }
            }
            tiers.push(Tier {
                main: Objective::new(main, "ignored-inputs"),
                aux,
            });
        }

        // input rates are negative flows, so maximizing the total minimizes
        // external consumption
        if !regular_inputs.is_empty() {
            let mut main = Terms::new();
            let mut aux = Vec::new();
            for (item, terms) in &regular_inputs {
                main.merge(terms, &Rational::one());
                aux.push(Objective::new((*terms).clone(), item.as_str()));
            }
            tiers.push(Tier {
                main: Objective::new(main, "inputs"),
                aux,
            });
        }

        for tier in &mut tiers {
            tier.main.terms.substitute_all(subs);
            for aux in &mut tier.aux {
                aux.terms.substitute_all(subs);
            }
        }
        tiers
    }

    fn flows_of(&self, item: &str, declarations: &[(String, Terms)]) -> Terms {
        let mut merged = Terms::new();
        for (name, terms) in declarations {
            if name == item {
                merged.merge(terms, &Rational::one());
            }
        }
        merged
    }

    fn var_name(&self, var: VarId) -> String {
        self.system
            .var(var)
            .map_or_else(|| var.to_string(), |v| v.name.clone())
    }
}

/// Renders the system, the substitutions presolve recorded, and the tableau
/// with its remaining objective queue. Before the first [`Solver::reset`]
/// only the system is shown.
impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.system)?;
        if let Some(prepared) = &self.prepared {
            for (var, replacement) in &prepared.subs {
                write!(f, "subst {} := ", self.var_name(*var))?;
                replacement.fmt_with(f, &|v| self.var_name(v))?;
                writeln!(f)?;
            }
            write!(f, "{}", prepared.tableau)?;
        }
        Ok(())
    }
}
