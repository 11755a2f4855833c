//! # Exact two-phase simplex tableau
//!
//! A dense tableau over [`Rational`] values. Constraints arrive as interval
//! rows, get normalized and deduplicated, and are then solved against a queue
//! of objective tiers in lexicographic order: each tier is maximized, its
//! auxiliary objectives are probed for uniqueness, and the tier's verdict is
//! locked in by zeroing every column whose reduced cost shows it must stay at
//! zero. Later tiers can then no longer degrade an earlier one.
//!
//! Pivot selection is deterministic: the leftmost most-negative reduced cost
//! enters, the lowest row wins ratio ties. Identical input therefore pivots
//! identically, which exact arithmetic turns into identical output.
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use itertools::Itertools;
use log::{debug, warn};
use num_traits::{One, Zero};

use crate::algorithm::SolveRes;
use crate::data::equation::{EqTag, LinearEq, RelOp, Terms, Var, VarId};
use crate::data::rational::Rational;

/// A single objective: a linear combination to maximize, with a note for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct Objective {
    /// What to maximize.
    pub terms: Terms,
    /// Where the objective came from, for logs and rendered tableaus.
    pub note: String,
}

impl Objective {
    /// Create an objective.
    #[must_use]
    pub fn new(terms: Terms, note: impl Into<String>) -> Self {
        Self {
            terms,
            note: note.into(),
        }
    }
}

/// One lexicographic tier: a main objective plus the auxiliary objectives
/// that probe whether each of its parts is individually at its optimum.
#[derive(Debug, Clone)]
pub struct Tier {
    /// The objective the tier commits to.
    pub main: Objective,
    /// Per-part objectives checked against the rate they reach alone.
    pub aux: Vec<Objective>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum ColumnKind {
    Structural(VarId),
    Slack { row: usize },
    Artificial { row: usize, partial: bool },
}

#[derive(Debug, Clone)]
struct Column {
    kind: ColumnKind,
    label: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ObjKind {
    Max,
    Aux,
}

#[derive(Debug, Clone)]
struct ObjInfo {
    kind: ObjKind,
    note: String,
    ceiling: Option<Rational>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ColState {
    AllZero,
    Uncleared,
    Basic(usize),
}

/// Variable rates read off a solved tableau.
#[derive(Debug, Clone)]
pub struct TableauSolution {
    /// Every structural variable with its rate; non-basic variables are zero.
    pub values: BTreeMap<VarId, Rational>,
    /// Basic slack or artificial columns whose value shows a constraint is
    /// violated, labeled by column.
    pub residues: Vec<(String, Rational)>,
}

/// The dense simplex tableau.
///
/// Rows `0..n_rows` are constraints; objective rows follow, first tier first.
/// The last entry of every row is the right hand side.
pub struct Tableau {
    columns: Vec<Column>,
    col_of_var: HashMap<VarId, usize>,
    rows: Vec<Vec<Rational>>,
    /// Basic column per constraint row.
    basic: Vec<usize>,
    zeroed: Vec<bool>,
    n_rows: usize,
    obj_info: Vec<ObjInfo>,
    pending: VecDeque<Tier>,
}

struct Interval {
    key: Vec<(VarId, Rational)>,
    min: Rational,
    max: Rational,
    tags: Vec<EqTag>,
}

struct StdRow {
    terms: Vec<(VarId, Rational)>,
    eq: bool,
    rhs: Rational,
    tags: Vec<EqTag>,
}

impl Tableau {
    /// Build a tableau from constraints and a queue of objective tiers.
    ///
    /// Coefficient-proportional duplicate constraints are merged by
    /// intersecting their intervals, finite variable bounds enter as rows,
    /// and the phase-one feasibility objectives are queued first.
    #[must_use]
    pub fn new(eqs: &[LinearEq], tiers: Vec<Tier>, vars: &BTreeMap<VarId, Var>) -> Self {
        let mut var_order: Vec<VarId> = Vec::new();
        let mut intervals: Vec<Interval> = Vec::new();
        for eq in eqs {
            let (min, max) = match eq.op {
                RelOp::Eq => (eq.rhs.clone(), eq.rhs.clone()),
                RelOp::Le => (Rational::neg_infinity(), eq.rhs.clone()),
                RelOp::Ge => (eq.rhs.clone(), Rational::infinity()),
            };
            add_interval(&mut intervals, &mut var_order, &eq.terms, min, max, &eq.tag);
        }
        // finite upper bounds become rows of their own
        for var in var_order.clone() {
            let Some(v) = vars.get(&var) else { continue };
            if v.max.is_finite() {
                let terms: Terms = std::iter::once((var, Rational::one())).collect();
                add_interval(
                    &mut intervals,
                    &mut var_order,
                    &terms,
                    Rational::neg_infinity(),
                    v.max.clone(),
                    &EqTag::new(v.name.clone()),
                );
            }
        }

        let mut std_rows: Vec<StdRow> = Vec::new();
        for interval in intervals {
            if interval.min == interval.max {
                std_rows.push(StdRow {
                    terms: interval.key,
                    eq: true,
                    rhs: interval.min,
                    tags: interval.tags,
                });
            } else {
                if interval.min > Rational::neg_infinity() {
                    std_rows.push(StdRow {
                        terms: interval
                            .key
                            .iter()
                            .map(|(v, r)| (*v, -r))
                            .collect(),
                        eq: false,
                        rhs: -&interval.min,
                        tags: interval.tags.clone(),
                    });
                }
                if interval.max < Rational::infinity() {
                    std_rows.push(StdRow {
                        terms: interval.key,
                        eq: false,
                        rhs: interval.max,
                        tags: interval.tags,
                    });
                }
            }
        }

        let mut columns: Vec<Column> = var_order
            .iter()
            .map(|v| Column {
                kind: ColumnKind::Structural(*v),
                label: vars.get(v).map_or_else(|| v.to_string(), |var| var.name.clone()),
            })
            .collect();
        let col_of_var: HashMap<VarId, usize> = var_order
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, i))
            .collect();
        let mut slack_of: Vec<Option<usize>> = vec![None; std_rows.len()];
        let mut artificial_of: Vec<Option<usize>> = vec![None; std_rows.len()];
        for (i, row) in std_rows.iter().enumerate() {
            if !row.eq {
                slack_of[i] = Some(columns.len());
                columns.push(Column {
                    kind: ColumnKind::Slack { row: i },
                    label: format!("s{i}"),
                });
            }
        }
        for (i, row) in std_rows.iter().enumerate() {
            if row.eq || row.rhs.is_negative() {
                let partial = !row.rhs.is_zero();
                artificial_of[i] = Some(columns.len());
                columns.push(Column {
                    kind: ColumnKind::Artificial { row: i, partial },
                    label: format!("{}{i}", if partial { "p" } else { "a" }),
                });
            }
        }

        let width = columns.len() + 1;
        let mut rows = Vec::with_capacity(std_rows.len());
        let mut basic = Vec::with_capacity(std_rows.len());
        for (i, srow) in std_rows.iter().enumerate() {
            // a negative right hand side flips the whole row so phase one
            // starts from a nonnegative basis
            let flip = srow.rhs.is_negative();
            let mut row = vec![Rational::zero(); width];
            for (var, rate) in &srow.terms {
                row[col_of_var[var]] = if flip { -rate } else { rate.clone() };
            }
            if let Some(s) = slack_of[i] {
                row[s] = if flip { -Rational::one() } else { Rational::one() };
            }
            if let Some(a) = artificial_of[i] {
                row[a] = Rational::one();
            }
            row[width - 1] = if flip { -&srow.rhs } else { srow.rhs.clone() };
            let basic_col = artificial_of[i]
                .or(slack_of[i])
                .unwrap_or_else(|| unreachable!("row {i} has no slack or artificial column"));
            basic.push(basic_col);
            debug!("row {i} [{}]", srow.tags.iter().join(", "));
            rows.push(row);
        }

        let n_rows = rows.len();
        let n_cols = columns.len();
        let mut tableau = Self {
            columns,
            col_of_var,
            rows,
            basic,
            zeroed: vec![false; n_cols],
            n_rows,
            obj_info: Vec::new(),
            pending: tiers.into(),
        };
        let minus_one = -Rational::one();
        let select = |partial: bool| {
            tableau
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| matches!(c.kind, ColumnKind::Artificial { partial: p, .. } if p == partial))
                .map(|(i, _)| (i, minus_one.clone()))
                .collect::<Vec<_>>()
        };
        let full = select(false);
        let partial = select(true);
        if !full.is_empty() {
            tableau.push_objective_cols(&full, ObjKind::Max, "feasibility".to_string());
        }
        if !partial.is_empty() {
            tableau.push_objective_cols(&partial, ObjKind::Max, "partial".to_string());
        }
        tableau
    }

    /// Number of constraint rows.
    #[must_use]
    pub fn n_constraint_rows(&self) -> usize {
        self.n_rows
    }

    /// Whether objective rows remain to be solved.
    #[must_use]
    pub fn has_objectives(&self) -> bool {
        self.rows.len() > self.n_rows
    }

    fn rhs(&self, row: usize) -> &Rational {
        let last = self.rows[row].len() - 1;
        &self.rows[row][last]
    }

    fn obj_kind(&self, row: usize) -> ObjKind {
        self.obj_info[row - self.n_rows].kind
    }

    fn push_objective_cols(
        &mut self,
        entries: &[(usize, Rational)],
        kind: ObjKind,
        note: String,
    ) {
        let states = self.column_states();
        let mut row = vec![Rational::zero(); self.columns.len() + 1];
        let mut to_fix = Vec::new();
        for (col, rate) in entries {
            if self.zeroed[*col] {
                continue;
            }
            row[*col] = -rate;
            if let ColState::Basic(basic_row) = states[*col] {
                to_fix.push(basic_row);
            }
        }
        self.rows.push(row);
        self.obj_info.push(ObjInfo {
            kind,
            note,
            ceiling: None,
        });
        let target = self.rows.len() - 1;
        for basic_row in to_fix {
            self.fix_cleared(basic_row, target);
        }
    }

    fn add_objective(&mut self, objective: &Objective, kind: ObjKind) {
        let entries: Vec<(usize, Rational)> = objective
            .terms
            .iter()
            .filter_map(|(var, rate)| self.col_of_var.get(&var).map(|c| (*c, rate.clone())))
            .collect();
        self.push_objective_cols(&entries, kind, objective.note.clone());
    }

    /// Move the next queued tier into the tableau. Returns whether there was
    /// one.
    pub fn add_pending_tier(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(tier) => {
                debug!("adding objective tier '{}'", tier.main.note);
                self.add_objective(&tier.main, ObjKind::Max);
                for aux in &tier.aux {
                    self.add_objective(aux, ObjKind::Aux);
                }
                true
            }
            None => false,
        }
    }

    /// Subtract out the basic row of an already-cleared column from a freshly
    /// added objective row.
    fn fix_cleared(&mut self, basic_row: usize, target: usize) {
        let col = self.basic[basic_row];
        let factor = self.rows[target][col].clone();
        if factor.is_zero() {
            return;
        }
        let source = self.rows[basic_row].clone();
        for (t, s) in self.rows[target].iter_mut().zip(&source) {
            *t -= &(&factor * s);
        }
    }

    fn normalize(&mut self, row: usize, col: usize) {
        let pivot = self.rows[row][col].clone();
        assert!(!pivot.is_zero(), "zero pivot in row {row}");
        for value in &mut self.rows[row] {
            *value = value.div_by(&pivot);
        }
    }

    /// Pivot: make `col` basic in `row`.
    fn clear(&mut self, row: usize, col: usize) {
        self.normalize(row, col);
        let pivot = self.rows[row].clone();
        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col].clone();
            if factor.is_zero() {
                continue;
            }
            for (t, p) in other.iter_mut().zip(&pivot) {
                *t -= &(&factor * p);
            }
        }
        self.basic[row] = col;
    }

    /// The leaving row for an entering column: lowest nonnegative ratio,
    /// lowest row index on ties. `None` when the column is unbounded.
    fn best_row(&self, col: usize) -> Option<usize> {
        let mut best: Option<(usize, Rational)> = None;
        for row in 0..self.n_rows {
            let coeff = &self.rows[row][col];
            if !coeff.is_positive() {
                continue;
            }
            let ratio = self.rhs(row).div_by(coeff);
            if ratio.is_negative() {
                continue;
            }
            match &best {
                Some((_, current)) if &ratio >= current => {}
                _ => best = Some((row, ratio)),
            }
        }
        best.map(|(row, _)| row)
    }

    /// Permanently clamp a column to zero.
    fn zero_column(&mut self, col: usize) {
        for row in &mut self.rows {
            row[col] = Rational::zero();
        }
        self.zeroed[col] = true;
    }

    fn column_states(&self) -> Vec<ColState> {
        let mut states = vec![ColState::AllZero; self.columns.len()];
        for (row, col) in self.basic.iter().enumerate() {
            states[*col] = ColState::Basic(row);
        }
        for (col, state) in states.iter_mut().enumerate() {
            if *state == ColState::AllZero
                && (0..self.n_rows).any(|r| !self.rows[r][col].is_zero())
            {
                *state = ColState::Uncleared;
            }
        }
        states
    }

    /// Maximize one objective row to optimality.
    ///
    /// An entering column with no leaving row is unbounded; it gets zeroed so
    /// the solve can continue, and the verdict records the failure.
    fn maximize(&mut self, obj: usize) -> SolveRes {
        let mut res = SolveRes::Noop;
        loop {
            let mut enter: Option<usize> = None;
            for col in 0..self.columns.len() {
                let value = &self.rows[obj][col];
                if value.is_negative() && enter.map_or(true, |e| value < &self.rows[obj][e]) {
                    enter = Some(col);
                }
            }
            let Some(col) = enter else { break };
            res = res | SolveRes::Optimal;
            match self.best_row(col) {
                Some(row) => {
                    debug!("pivot: {} enters in row {row}", self.columns[col].label);
                    self.clear(row, col);
                }
                None => {
                    debug!("column {} is unbounded", self.columns[col].label);
                    self.zero_column(col);
                    res = res | SolveRes::Unbounded;
                }
            }
        }
        res
    }

    /// Solve the first remaining objective tier.
    ///
    /// With `zero` set the tier is committed afterwards: its objective rows
    /// are removed, structural columns with a nonzero reduced cost are clamped
    /// to zero and spent slack or artificial columns are deleted.
    pub fn solve_tier(&mut self, zero: bool) -> SolveRes {
        if !self.has_objectives() {
            return SolveRes::Noop;
        }
        let idx = self.n_rows;
        let mut res = SolveRes::Optimal;
        if self.rows[idx].iter().filter(|v| !v.is_zero()).count() == 1 {
            res = SolveRes::Unique;
        }
        res = res | self.maximize(idx);

        // maximize each auxiliary alone and remember the rate it reaches
        let mut aux_end = idx + 1;
        while aux_end < self.rows.len() && self.obj_kind(aux_end) == ObjKind::Aux {
            let aux_res = self.maximize(aux_end);
            debug_assert!(aux_res.ok());
            res = res | aux_res;
            let ceiling = self.rhs(aux_end).clone();
            self.obj_info[aux_end - self.n_rows].ceiling = Some(ceiling);
            aux_end += 1;
        }

        let mut unique: Option<bool> = None;
        if aux_end > idx + 1 {
            // restore the main optimum, then see which auxiliaries kept theirs
            let back = self.maximize(idx);
            debug_assert!(back.ok());
            res = res | back;
            for aux in idx + 1..aux_end {
                let info = aux - self.n_rows;
                let Some(ceiling) = self.obj_info[info].ceiling.clone() else {
                    continue;
                };
                if &ceiling > self.rhs(aux) {
                    warn!(
                        "non optimal: '{}' reaches {} alone but {} here",
                        self.obj_info[info].note,
                        ceiling,
                        self.rhs(aux)
                    );
                    unique = Some(false);
                } else if unique.is_none() {
                    unique = Some(true);
                }
            }
        }
        match unique {
            Some(true) => res = res | SolveRes::Unique,
            Some(false) => res = res | SolveRes::Ok,
            None => {}
        }

        if zero {
            self.commit(idx, aux_end);
        }
        res
    }

    /// Lock in the optimum of the tier occupying rows `idx..aux_end`.
    fn commit(&mut self, idx: usize, aux_end: usize) {
        let mut delete = Vec::new();
        for col in 0..self.columns.len() {
            let nonzero = !self.rows[idx][col].is_zero();
            match self.columns[col].kind {
                ColumnKind::Structural(_) => {
                    if nonzero {
                        // raising this variable would degrade the committed
                        // objective; it stays at zero from here on
                        debug!("clamping column {}", self.columns[col].label);
                        self.zero_column(col);
                    }
                }
                ColumnKind::Slack { .. } | ColumnKind::Artificial { .. } => {
                    if nonzero || self.zeroed[col] {
                        delete.push(col);
                    }
                }
            }
        }
        self.rows.drain(idx..aux_end);
        self.obj_info.drain(0..aux_end - idx);
        self.delete_columns(&delete);
    }

    fn delete_columns(&mut self, delete: &[usize]) {
        if delete.is_empty() {
            return;
        }
        let mut keep = vec![true; self.columns.len()];
        for &col in delete {
            keep[col] = false;
        }
        let mut remap = vec![usize::MAX; self.columns.len()];
        let mut next = 0;
        for (old, &kept) in keep.iter().enumerate() {
            if kept {
                remap[old] = next;
                next += 1;
            }
        }
        let mut index = 0;
        self.columns.retain(|_| {
            index += 1;
            keep[index - 1]
        });
        index = 0;
        self.zeroed.retain(|_| {
            index += 1;
            keep[index - 1]
        });
        for row in &mut self.rows {
            index = 0;
            row.retain(|_| {
                index += 1;
                index - 1 >= keep.len() || keep[index - 1]
            });
        }
        for basic in &mut self.basic {
            debug_assert!(remap[*basic] != usize::MAX, "deleted a basic column");
            *basic = remap[*basic];
        }
        self.col_of_var = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c.kind {
                ColumnKind::Structural(var) => Some((var, i)),
                _ => None,
            })
            .collect();
    }

    /// Solve every remaining tier in order, committing each, and report the
    /// joined verdict. Structural columns left free to vary degrade the
    /// verdict to [`SolveRes::Multi`]. With nothing left to solve this is a
    /// [`SolveRes::Noop`].
    pub fn solve_all(&mut self) -> SolveRes {
        let mut res = SolveRes::Noop;
        let mut solved_any = false;
        while self.has_objectives() {
            solved_any = true;
            res = res | self.solve_tier(true);
        }
        while self.add_pending_tier() {
            solved_any = true;
            res = res | self.solve_tier(true);
        }
        if solved_any
            && self
                .column_states()
                .iter()
                .any(|s| *s == ColState::Uncleared)
        {
            res = res | SolveRes::Multi;
        }
        res
    }

    /// Read off the current basic solution.
    #[must_use]
    pub fn solution(&self) -> TableauSolution {
        let mut values: BTreeMap<VarId, Rational> = self
            .columns
            .iter()
            .filter_map(|c| match c.kind {
                ColumnKind::Structural(var) => Some((var, Rational::zero())),
                _ => None,
            })
            .collect();
        let mut residues = Vec::new();
        for (row, &col) in self.basic.iter().enumerate() {
            debug_assert!(self.rows[row][col].is_one());
            let value = self.rhs(row).clone();
            match &self.columns[col].kind {
                ColumnKind::Structural(var) => {
                    values.insert(*var, value);
                }
                ColumnKind::Slack { .. } => {
                    if value.is_negative() {
                        residues.push((self.columns[col].label.clone(), value));
                    }
                }
                ColumnKind::Artificial { .. } => {
                    residues.push((self.columns[col].label.clone(), value));
                }
            }
        }
        TableauSolution { values, residues }
    }
}

fn add_interval(
    intervals: &mut Vec<Interval>,
    var_order: &mut Vec<VarId>,
    terms: &Terms,
    min: Rational,
    max: Rational,
    tag: &EqTag,
) {
    let mut factor = Rational::zero();
    for (var, rate) in terms.iter() {
        factor += rate.abs();
        if !var_order.contains(&var) {
            var_order.push(var);
        }
    }
    debug_assert!(factor.is_positive(), "constraint {tag} has no terms");
    // rows only bounded above normalize with a negative factor, so that
    // proportional rows land on the same key regardless of orientation
    if !min.is_positive() && max == Rational::infinity() {
        factor = -factor;
    }
    let mut key: Vec<(VarId, Rational)> = terms
        .iter()
        .map(|(var, rate)| (var, rate.div_by(&factor)))
        .collect();
    key.sort_by_key(|(var, _)| *var);
    let mut min = min.div_by(&factor);
    let mut max = max.div_by(&factor);
    if factor.is_negative() {
        std::mem::swap(&mut min, &mut max);
    }
    match intervals.iter_mut().find(|i| i.key == key) {
        Some(interval) => {
            if min > interval.min {
                interval.min = min;
            }
            if max < interval.max {
                interval.max = max;
            }
            interval.tags.push(tag.clone());
        }
        None => intervals.push(Interval {
            key,
            min,
            max,
            tags: vec![tag.clone()],
        }),
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut labels: Vec<String> = self.columns.iter().map(|c| c.label.clone()).collect();
        labels.push("rhs".to_string());
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Rational::to_string).collect())
            .collect();
        let widths: Vec<usize> = labels
            .iter()
            .enumerate()
            .map(|(col, label)| {
                cells
                    .iter()
                    .map(|row| row[col].len())
                    .chain(std::iter::once(label.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        for (label, width) in labels.iter().zip(&widths) {
            write!(f, " {label:>width$}")?;
        }
        writeln!(f)?;
        for (i, row) in cells.iter().enumerate() {
            for (col, (cell, width)) in row.iter().zip(&widths).enumerate() {
                let marker = if i < self.n_rows && self.basic[i] == col {
                    '*'
                } else {
                    ' '
                };
                write!(f, "{marker}{cell:>width$}")?;
            }
            if i < self.n_rows {
                writeln!(f)?;
            } else {
                let info = &self.obj_info[i - self.n_rows];
                let kind = match info.kind {
                    ObjKind::Max => "max",
                    ObjKind::Aux => "aux",
                };
                writeln!(f, "  {kind} {}", info.note)?;
            }
        }
        if !self.pending.is_empty() {
            let queued = self.pending.iter().map(|tier| tier.main.note.as_str()).join(", ");
            writeln!(f, " queued: {queued}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use num_traits::Zero;

    use super::{Objective, Tableau, Tier};
    use crate::algorithm::SolveRes;
    use crate::data::equation::{EqTag, LinearEq, RelOp, Terms, Var, VarId};
    use crate::data::rational::Rational;
    use crate::rat;

    fn terms(pairs: &[(u32, i64)]) -> Terms {
        pairs.iter().map(|&(v, r)| (VarId(v), rat!(r))).collect()
    }

    fn vars(maxes: &[Option<i64>]) -> BTreeMap<VarId, Var> {
        maxes
            .iter()
            .enumerate()
            .map(|(i, max)| {
                let id = VarId(i as u32);
                let max = max.map_or_else(Rational::infinity, |m| rat!(m));
                (id, Var::new(id, format!("m{i}"), max))
            })
            .collect()
    }

    fn eq(tag: &str, t: Terms, op: RelOp, rhs: Rational) -> LinearEq {
        LinearEq::new(EqTag::new(tag), t, op, rhs)
    }

    fn tier(pairs: &[(u32, i64)], note: &str) -> Tier {
        Tier {
            main: Objective::new(terms(pairs), note),
            aux: vec![],
        }
    }

    #[test]
    fn single_bounded_maximization() {
        // maximize x0 subject to 2 x0 <= 6
        let vars = vars(&[None]);
        let eqs = vec![eq("cap", terms(&[(0, 2)]), RelOp::Le, rat!(6))];
        let mut tableau = Tableau::new(&eqs, vec![tier(&[(0, 1)], "x0")], &vars);
        let res = tableau.solve_all();
        assert!(res.ok());
        let solution = tableau.solution();
        assert_eq!(solution.values[&VarId(0)], rat!(3));
        assert!(solution.residues.is_empty());
    }

    #[test]
    fn variable_bound_rows_apply() {
        // maximize x0 with x0 <= 1 from the variable bound alone
        let vars = vars(&[Some(1), None]);
        let eqs = vec![eq(
            "join",
            terms(&[(0, 1), (1, -1)]),
            RelOp::Le,
            Rational::zero(),
        )];
        let mut tableau = Tableau::new(
            &eqs,
            vec![tier(&[(0, 1)], "x0"), tier(&[(1, -1)], "min x1")],
            &vars,
        );
        let res = tableau.solve_all();
        assert!(res.ok());
        let solution = tableau.solution();
        assert_eq!(solution.values[&VarId(0)], rat!(1));
        assert_eq!(solution.values[&VarId(1)], rat!(1));
    }

    #[test]
    fn duplicate_rows_intersect() {
        // x0 <= 5 and 2 x0 <= 4 are proportional; the tighter bound wins
        let vars = vars(&[None]);
        let eqs = vec![
            eq("a", terms(&[(0, 1)]), RelOp::Le, rat!(5)),
            eq("b", terms(&[(0, 2)]), RelOp::Le, rat!(4)),
        ];
        let mut tableau = Tableau::new(&eqs, vec![tier(&[(0, 1)], "x0")], &vars);
        assert_eq!(tableau.n_constraint_rows(), 1);
        tableau.solve_all();
        assert_eq!(tableau.solution().values[&VarId(0)], rat!(2));
    }

    #[test]
    fn equality_interval_becomes_one_row() {
        // x0 >= 3 and x0 <= 3 collapse to x0 = 3
        let vars = vars(&[None]);
        let eqs = vec![
            eq("a", terms(&[(0, 1)]), RelOp::Ge, rat!(3)),
            eq("b", terms(&[(0, 1)]), RelOp::Le, rat!(3)),
        ];
        let mut tableau = Tableau::new(&eqs, vec![], &vars);
        assert_eq!(tableau.n_constraint_rows(), 1);
        let res = tableau.solve_all();
        assert!(res.ok());
        assert_eq!(tableau.solution().values[&VarId(0)], rat!(3));
        assert!(tableau.solution().residues.is_empty());
    }

    #[test]
    fn unbounded_objective_is_reported_and_contained() {
        // x0 >= x1 leaves x0 free to grow; maximizing it fails, the column
        // is clamped to zero and the rest of the solve continues
        let vars = vars(&[None, None]);
        let eqs = vec![
            eq("floor", terms(&[(0, 1), (1, -1)]), RelOp::Ge, Rational::zero()),
            eq("cap", terms(&[(1, 1)]), RelOp::Le, rat!(2)),
        ];
        let mut tableau = Tableau::new(
            &eqs,
            vec![tier(&[(0, 1)], "x0"), tier(&[(1, 1)], "x1")],
            &vars,
        );
        let res = tableau.solve_all();
        assert!(res.failed());
        assert_eq!(res, SolveRes::Unbounded);
        // with x0 clamped to zero, x1 <= x0 pins x1 as well
        let solution = tableau.solution();
        assert_eq!(solution.values[&VarId(0)], Rational::zero());
        assert_eq!(solution.values[&VarId(1)], Rational::zero());
    }

    #[test]
    fn infeasible_equality_leaves_a_residue() {
        // x0 = 5 with x0 <= 2 cannot be met; phase one leaves an artificial
        let vars = vars(&[Some(2)]);
        let eqs = vec![eq("demand", terms(&[(0, 1)]), RelOp::Eq, rat!(5))];
        let mut tableau = Tableau::new(&eqs, vec![], &vars);
        tableau.solve_all();
        let solution = tableau.solution();
        let residue: Rational = solution
            .residues
            .iter()
            .map(|(_, v)| v.clone())
            .fold(Rational::zero(), |a, b| a + b);
        assert!(!residue.is_zero());
        assert_eq!(solution.values[&VarId(0)], rat!(2));
    }

    #[test]
    fn committed_tier_is_not_degraded() {
        // sharing a budget: tier one maximizes x0, tier two maximizes x1;
        // x1 must not eat into the committed x0 rate
        let vars = vars(&[None, None]);
        let eqs = vec![eq(
            "budget",
            terms(&[(0, 1), (1, 1)]),
            RelOp::Le,
            rat!(10),
        )];
        let mut tableau = Tableau::new(
            &eqs,
            vec![tier(&[(0, 1)], "x0"), tier(&[(1, 1)], "x1")],
            &vars,
        );
        let res = tableau.solve_all();
        assert!(res.ok());
        let solution = tableau.solution();
        assert_eq!(solution.values[&VarId(0)], rat!(10));
        assert_eq!(solution.values[&VarId(1)], Rational::zero());
    }

    #[test]
    fn auxiliary_probe_detects_shared_optimum() {
        // maximize x0 + x1 under x0 + x1 <= 4: the sum is unique but the
        // split is not, so the tier reports Ok rather than Unique
        let vars = vars(&[None, None]);
        let eqs = vec![eq(
            "budget",
            terms(&[(0, 1), (1, 1)]),
            RelOp::Le,
            rat!(4),
        )];
        let tier = Tier {
            main: Objective::new(terms(&[(0, 1), (1, 1)]), "sum"),
            aux: vec![
                Objective::new(terms(&[(0, 1)]), "x0"),
                Objective::new(terms(&[(1, 1)]), "x1"),
            ],
        };
        let mut tableau = Tableau::new(&eqs, vec![tier], &vars);
        let res = tableau.solve_all();
        assert!(res.ok());
        assert!(res >= SolveRes::Ok);
    }

    #[test]
    fn auxiliary_probe_confirms_uniqueness() {
        // independent caps make each variable's rate unique
        let vars = vars(&[None, None]);
        let eqs = vec![
            eq("cap0", terms(&[(0, 1)]), RelOp::Le, rat!(2)),
            eq("cap1", terms(&[(1, 1)]), RelOp::Le, rat!(3)),
        ];
        let tier = Tier {
            main: Objective::new(terms(&[(0, 1), (1, 1)]), "sum"),
            aux: vec![
                Objective::new(terms(&[(0, 1)]), "x0"),
                Objective::new(terms(&[(1, 1)]), "x1"),
            ],
        };
        let mut tableau = Tableau::new(&eqs, vec![tier], &vars);
        let res = tableau.solve_all();
        assert_eq!(res, SolveRes::Unique);
        let solution = tableau.solution();
        assert_eq!(solution.values[&VarId(0)], rat!(2));
        assert_eq!(solution.values[&VarId(1)], rat!(3));
    }

    #[test]
    fn free_columns_mean_multiple_solutions() {
        // x0 + x1 = 2 with nothing optimized over x0/x1 individually: after
        // phase one a structural column stays free
        let vars = vars(&[None, None]);
        let eqs = vec![eq("split", terms(&[(0, 1), (1, 1)]), RelOp::Eq, rat!(2))];
        let mut tableau = Tableau::new(&eqs, vec![], &vars);
        let res = tableau.solve_all();
        assert_eq!(res, SolveRes::Multi);
    }

    #[test]
    fn fractional_pivoting_is_exact() {
        // 1/3 x0 + 1/7 x1 <= 1 with x1 = 7/2: x0 = (1 - 1/2) * 3 = 3/2
        let vars = vars(&[None, None]);
        let eqs = vec![
            eq(
                "mix",
                [(VarId(0), rat!(1, 3)), (VarId(1), rat!(1, 7))]
                    .into_iter()
                    .collect(),
                RelOp::Le,
                Rational::from(1),
            ),
            eq("pin", terms(&[(1, 1)]), RelOp::Eq, rat!(7, 2)),
        ];
        let mut tableau = Tableau::new(&eqs, vec![tier(&[(0, 1)], "x0")], &vars);
        let res = tableau.solve_all();
        assert!(res.ok());
        let solution = tableau.solution();
        assert_eq!(solution.values[&VarId(0)], rat!(3, 2));
        assert_eq!(solution.values[&VarId(1)], rat!(7, 2));
    }

    #[test]
    fn display_renders_every_row() {
        let vars = vars(&[Some(1)]);
        let eqs = vec![eq("cap", terms(&[(0, 1)]), RelOp::Le, rat!(1))];
        let tableau = Tableau::new(&eqs, vec![], &vars);
        let rendered = tableau.to_string();
        assert!(rendered.contains("m0"));
        assert!(rendered.contains("rhs"));
    }
}
