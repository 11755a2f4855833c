//! # Linear equation model
//!
//! The symbolic layer between a production network and the tableau. A network
//! is described by [`LinearEq`] constraints over throttle variables, plus
//! per-item flow declarations ([`EqSystem::declare_output`] and friends) that
//! the solver later turns into objective tiers.
use std::collections::BTreeMap;
use std::fmt;

use num_traits::Zero;

use crate::data::rational::Rational;

/// Identifies a variable within one [`EqSystem`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A decision variable: typically the throttle of one machine group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Var {
    /// The variable's identifier.
    pub id: VarId,
    /// Name used in diagnostics and rendered systems.
    pub name: String,
    /// Upper bound; [`Rational::infinity`] leaves the variable unbounded.
    pub max: Rational,
}

impl Var {
    /// A variable bounded above by `max`.
    #[must_use]
    pub fn new(id: VarId, name: impl Into<String>, max: Rational) -> Self {
        Self {
            id,
            name: name.into(),
            max,
        }
    }

    /// A throttle variable, bounded to at most 1.
    #[must_use]
    pub fn throttle(id: VarId, name: impl Into<String>) -> Self {
        Self::new(id, name, Rational::from(1))
    }

    /// A variable with no upper bound.
    #[must_use]
    pub fn unbounded(id: VarId, name: impl Into<String>) -> Self {
        Self::new(id, name, Rational::infinity())
    }
}

/// A single `rate * var` product, or a bare constant when `var` is `None`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Term {
    /// The variable, absent for a constant term.
    pub var: Option<VarId>,
    /// The coefficient, or the constant itself.
    pub rate: Rational,
}

impl Term {
    /// A constant term.
    #[must_use]
    pub fn constant(rate: Rational) -> Self {
        Self { var: None, rate }
    }

    /// A `rate * var` term.
    #[must_use]
    pub fn of(var: VarId, rate: Rational) -> Self {
        Self {
            var: Some(var),
            rate,
        }
    }
}

/// A linear combination of variables with nonzero rational coefficients.
///
/// Insertion order is preserved and determines column order in the tableau,
/// so building the same system twice pivots identically. Coefficients that
/// cancel to zero are removed. Equality disregards insertion order.
#[derive(Clone, Debug, Default)]
pub struct Terms(Vec<(VarId, Rational)>);

impl PartialEq for Terms {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|(v, r)| other.get(*v) == Some(r))
    }
}

impl Eq for Terms {}

impl Terms {
    /// No terms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables with a nonzero coefficient.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The coefficient of `var`, if nonzero.
    #[must_use]
    pub fn get(&self, var: VarId) -> Option<&Rational> {
        self.0.iter().find(|(v, _)| *v == var).map(|(_, r)| r)
    }

    /// Iterate over `(variable, coefficient)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Rational)> {
        self.0.iter().map(|(v, r)| (*v, r))
    }

    /// Add `rate * var`, coalescing with an existing coefficient.
    pub fn add(&mut self, var: VarId, rate: Rational) {
        if rate.is_zero() {
            return;
        }
        match self.0.iter().position(|(v, _)| *v == var) {
            Some(i) => {
                let sum = &self.0[i].1 + &rate;
                if sum.is_zero() {
                    self.0.remove(i);
                } else {
                    self.0[i].1 = sum;
                }
            }
            None => self.0.push((var, rate)),
        }
    }

    /// Remove `var` and return its coefficient.
    pub fn remove(&mut self, var: VarId) -> Option<Rational> {
        self.0
            .iter()
            .position(|(v, _)| *v == var)
            .map(|i| self.0.remove(i).1)
    }

    /// Add `factor` times every term of `other`.
    pub fn merge(&mut self, other: &Terms, factor: &Rational) {
        for (var, rate) in other.iter() {
            self.add(var, rate * factor);
        }
    }

    /// Replace `var` by `replacement` scaled with `var`'s coefficient.
    pub fn substitute(&mut self, var: VarId, replacement: &Terms) {
        if let Some(factor) = self.remove(var) {
            self.merge(replacement, &factor);
        }
    }

    /// Apply a list of substitutions in order.
    pub fn substitute_all(&mut self, subs: &[(VarId, Terms)]) {
        for (var, replacement) in subs {
            self.substitute(*var, replacement);
        }
    }

    /// Multiply every coefficient by a nonzero `factor`.
    pub fn scale(&mut self, factor: &Rational) {
        debug_assert!(!factor.is_zero());
        for (_, rate) in &mut self.0 {
            *rate *= factor;
        }
    }

    /// Divide every coefficient by a finite nonzero `factor`.
    pub(crate) fn scale_div(&mut self, factor: &Rational) {
        for (_, rate) in &mut self.0 {
            *rate = rate.div_by(factor);
        }
    }

    /// Negate every coefficient.
    pub fn negate(&mut self) {
        for (_, rate) in &mut self.0 {
            *rate = -&*rate;
        }
    }

    /// Negated copy.
    #[must_use]
    pub fn negated(&self) -> Self {
        let mut copy = self.clone();
        copy.negate();
        copy
    }

    /// Evaluate the combination, reading each variable through `value_of`.
    ///
    /// The result can be infinite or NaN when unbounded values are involved;
    /// the caller decides what that means.
    pub fn evaluate<F>(&self, mut value_of: F) -> Rational
    where
        F: FnMut(VarId) -> Rational,
    {
        let mut total = Rational::zero();
        for (var, rate) in self.iter() {
            total += rate * value_of(var);
        }
        total
    }

    pub(crate) fn fmt_with(
        &self,
        f: &mut fmt::Formatter,
        name_of: &dyn Fn(VarId) -> String,
    ) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        for (i, (var, rate)) in self.iter().enumerate() {
            if rate.is_negative() {
                write!(f, "{}{} ", if i == 0 { "-" } else { "- " }, rate.abs())?;
            } else {
                write!(f, "{}{} ", if i == 0 { "" } else { "+ " }, rate)?;
            }
            write!(f, "{} ", name_of(var))?;
        }
        Ok(())
    }
}

impl FromIterator<(VarId, Rational)> for Terms {
    fn from_iter<T: IntoIterator<Item = (VarId, Rational)>>(iter: T) -> Self {
        let mut terms = Self::new();
        for (var, rate) in iter {
            terms.add(var, rate);
        }
        terms
    }
}

/// The relation between a linear combination and its right hand side.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum RelOp {
    Eq,
    Ge,
    Le,
}

impl RelOp {
    /// Whether `lhs op rhs` holds; `None` when a NaN makes it undecidable.
    #[must_use]
    pub fn holds(&self, lhs: &Rational, rhs: &Rational) -> Option<bool> {
        let ordering = lhs.partial_cmp(rhs)?;
        Some(match self {
            Self::Eq => ordering.is_eq(),
            Self::Ge => ordering.is_ge(),
            Self::Le => ordering.is_le(),
        })
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Le => "<=",
        })
    }
}

/// Identifies where a constraint came from.
///
/// `scope` numbers the nesting level, `item` names the conserved item or
/// variable and `qualifier` disambiguates constraints absorbed from nested
/// systems. Rendered as `scope_item` or `scope_item_qualifier`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EqTag {
    /// Nesting level the constraint belongs to.
    pub scope: u32,
    /// The conserved item or variable name.
    pub item: String,
    /// Disambiguator, empty at the level the constraint was written.
    pub qualifier: String,
}

impl EqTag {
    /// A tag at the outermost scope with no qualifier.
    #[must_use]
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            scope: 0,
            item: item.into(),
            qualifier: String::new(),
        }
    }

    /// A tag at an explicit scope.
    #[must_use]
    pub fn scoped(scope: u32, item: impl Into<String>) -> Self {
        Self {
            scope,
            item: item.into(),
            qualifier: String::new(),
        }
    }
}

impl fmt::Display for EqTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.qualifier.is_empty() {
            write!(f, "{}_{}", self.scope, self.item)
        } else {
            write!(f, "{}_{}_{}", self.scope, self.item, self.qualifier)
        }
    }
}

/// One linear constraint: `terms op rhs`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinearEq {
    /// Origin of the constraint.
    pub tag: EqTag,
    /// The left hand side.
    pub terms: Terms,
    /// The relation.
    pub op: RelOp,
    /// The constant right hand side, always finite.
    pub rhs: Rational,
}

impl LinearEq {
    /// Create a constraint.
    #[must_use]
    pub fn new(tag: EqTag, terms: Terms, op: RelOp, rhs: Rational) -> Self {
        Self {
            tag,
            terms,
            op,
            rhs,
        }
    }

    /// Whether the constraint holds at the given variable values.
    ///
    /// `None` when NaN arithmetic makes it undecidable.
    pub fn satisfied_by<F>(&self, value_of: F) -> Option<bool>
    where
        F: FnMut(VarId) -> Rational,
    {
        self.op.holds(&self.terms.evaluate(value_of), &self.rhs)
    }
}

/// Priority of an objective, in `-100..=100`. Higher solves first.
pub type Priority = i32;

/// The lowest priority; flows at this level are not optimized for, only
/// balanced after everything else.
pub const IGNORE: Priority = -100;

/// Largest meaningful priority.
pub const MAX_PRIORITY: Priority = 100;

/// A full constraint system plus the flow declarations the solver optimizes.
#[derive(Clone, Debug, Default)]
pub struct EqSystem {
    vars: BTreeMap<VarId, Var>,
    eqs: Vec<LinearEq>,
    outputs: Vec<(String, Terms)>,
    inputs: Vec<(String, Terms)>,
    other: Vec<(String, Terms)>,
    priorities: BTreeMap<VarId, Priority>,
    output_priorities: BTreeMap<String, Priority>,
    input_priorities: BTreeMap<String, Priority>,
}

impl EqSystem {
    /// An empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable.
    ///
    /// # Panics
    ///
    /// If a variable with the same id was already registered.
    pub fn add_var(&mut self, var: Var) -> VarId {
        let id = var.id;
        let previous = self.vars.insert(id, var);
        assert!(previous.is_none(), "duplicate variable {id}");
        id
    }

    /// Look up a variable.
    #[must_use]
    pub fn var(&self, id: VarId) -> Option<&Var> {
        self.vars.get(&id)
    }

    /// All registered variables, ordered by id.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.vars.values()
    }

    pub(crate) fn var_table(&self) -> &BTreeMap<VarId, Var> {
        &self.vars
    }

    /// Add a constraint.
    pub fn push_eq(&mut self, eq: LinearEq) {
        debug_assert!(
            self.eqs.iter().all(|e| e.tag != eq.tag),
            "duplicate constraint tag {}",
            eq.tag
        );
        self.eqs.push(eq);
    }

    /// The constraints, in insertion order.
    #[must_use]
    pub fn eqs(&self) -> &[LinearEq] {
        &self.eqs
    }

    /// Declare `terms` as the net flow of a desired output item.
    pub fn declare_output(&mut self, item: impl Into<String>, terms: Terms) {
        self.outputs.push((item.into(), terms));
    }

    /// Declare `terms` as the net flow of an externally supplied input item.
    pub fn declare_input(&mut self, item: impl Into<String>, terms: Terms) {
        self.inputs.push((item.into(), terms));
    }

    /// Declare an internal flow to report on but not optimize.
    pub fn declare_other(&mut self, item: impl Into<String>, terms: Terms) {
        self.other.push((item.into(), terms));
    }

    /// Declared outputs in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[(String, Terms)] {
        &self.outputs
    }

    /// Declared inputs in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[(String, Terms)] {
        &self.inputs
    }

    /// Declared unoptimized flows in declaration order.
    #[must_use]
    pub fn other(&self) -> &[(String, Terms)] {
        &self.other
    }

    /// Set the priority of a variable.
    ///
    /// # Panics
    ///
    /// If `priority` is outside `-100..=100`.
    pub fn set_priority(&mut self, var: VarId, priority: Priority) {
        assert!(
            (IGNORE..=MAX_PRIORITY).contains(&priority),
            "priority {priority} out of range"
        );
        self.priorities.insert(var, priority);
    }

    /// Set the priority of a declared output item.
    ///
    /// [`IGNORE`] demotes the output to the also-output tier.
    ///
    /// # Panics
    ///
    /// If `priority` is outside `-100..=100`.
    pub fn set_output_priority(&mut self, item: impl Into<String>, priority: Priority) {
        assert!(
            (IGNORE..=MAX_PRIORITY).contains(&priority),
            "priority {priority} out of range"
        );
        self.output_priorities.insert(item.into(), priority);
    }

    /// Set the priority of a declared input item.
    ///
    /// [`IGNORE`] excludes the input from consumption minimization.
    ///
    /// # Panics
    ///
    /// If `priority` is outside `-100..=100`.
    pub fn set_input_priority(&mut self, item: impl Into<String>, priority: Priority) {
        assert!(
            (IGNORE..=MAX_PRIORITY).contains(&priority),
            "priority {priority} out of range"
        );
        self.input_priorities.insert(item.into(), priority);
    }

    /// Variable priorities, ordered by variable id.
    pub(crate) fn priorities(&self) -> impl Iterator<Item = (VarId, Priority)> + '_ {
        self.priorities.iter().map(|(v, p)| (*v, *p))
    }

    pub(crate) fn output_priority(&self, item: &str) -> Option<Priority> {
        self.output_priorities.get(item).copied()
    }

    pub(crate) fn input_priority(&self, item: &str) -> Option<Priority> {
        self.input_priorities.get(item).copied()
    }

    pub(crate) fn ignored_outputs(&self) -> impl Iterator<Item = &str> {
        self.output_priorities
            .iter()
            .filter(|(_, p)| **p <= IGNORE)
            .map(|(item, _)| item.as_str())
    }

    /// Scale every constraint and flow declaration by a nonzero factor.
    pub fn scale(&mut self, factor: &Rational) {
        use num_traits::One;
        if factor.is_one() {
            return;
        }
        for eq in &mut self.eqs {
            eq.terms.scale(factor);
            eq.rhs *= factor;
        }
        let flows = self
            .outputs
            .iter_mut()
            .chain(self.inputs.iter_mut())
            .chain(self.other.iter_mut());
        for (_, terms) in flows {
            terms.scale(factor);
        }
    }

    /// Merge a nested system into this one.
    ///
    /// The child's constraint tags get qualifier `b{index}` so they cannot
    /// collide with constraints absorbed from siblings. Returns the child's
    /// flow declarations so the caller can fold them into its own item
    /// balances.
    ///
    /// # Panics
    ///
    /// If the child shares a variable id with this system.
    pub fn absorb(&mut self, child: EqSystem, index: u32) -> Vec<(String, Terms)> {
        let qualifier = format!("b{index}");
        for var in child.vars.into_values() {
            self.add_var(var);
        }
        for mut eq in child.eqs {
            if eq.tag.qualifier.is_empty() {
                eq.tag.qualifier = qualifier.clone();
            } else {
                eq.tag.qualifier = format!("{}_{}", qualifier, eq.tag.qualifier);
            }
            self.eqs.push(eq);
        }
        self.priorities.extend(child.priorities);
        let mut flows = child.outputs;
        flows.extend(child.inputs);
        flows.extend(child.other);
        flows
    }

    fn name_of(&self, var: VarId) -> String {
        match self.vars.get(&var) {
            Some(v) => v.name.clone(),
            None => var.to_string(),
        }
    }
}

impl fmt::Display for EqSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name_of = |var| self.name_of(var);
        for eq in &self.eqs {
            write!(f, "{}: ", eq.tag)?;
            eq.terms.fmt_with(f, &name_of)?;
            writeln!(f, "{} {}", eq.op, eq.rhs)?;
        }
        for (label, flows) in [
            ("outputs", &self.outputs),
            ("inputs", &self.inputs),
            ("other", &self.other),
        ] {
            for (item, terms) in flows {
                write!(f, "{label} {item}: ")?;
                terms.fmt_with(f, &name_of)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use num_traits::Zero;

    use super::{EqSystem, EqTag, LinearEq, RelOp, Terms, Var, VarId};
    use crate::data::rational::Rational;
    use crate::rat;

    fn terms(pairs: &[(u32, i64)]) -> Terms {
        pairs
            .iter()
            .map(|&(v, r)| (VarId(v), rat!(r)))
            .collect()
    }

    #[test]
    fn coalescing() {
        let mut t = Terms::new();
        t.add(VarId(0), rat!(2));
        t.add(VarId(1), rat!(3));
        t.add(VarId(0), rat!(1, 2));
        assert_eq!(t.get(VarId(0)), Some(&rat!(5, 2)));
        assert_eq!(t.len(), 2);
        t.add(VarId(1), rat!(-3));
        assert_eq!(t.get(VarId(1)), None);
        assert_eq!(t.len(), 1);
        t.add(VarId(2), Rational::zero());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn term_constructors() {
        let t = super::Term::of(VarId(3), rat!(2, 5));
        assert_eq!(t.var, Some(VarId(3)));
        assert_eq!(t.rate, rat!(2, 5));
        let c = super::Term::constant(rat!(4));
        assert_eq!(c.var, None);
    }

    #[test]
    fn insertion_order_is_stable() {
        let t = terms(&[(5, 1), (2, 1), (9, 1)]);
        let order: Vec<_> = t.iter().map(|(v, _)| v.0).collect();
        assert_eq!(order, vec![5, 2, 9]);
    }

    #[test]
    fn substitution() {
        // 2 x0 + x1, with x0 := 3 x2 - x1
        let mut t = terms(&[(0, 2), (1, 1)]);
        t.substitute(VarId(0), &terms(&[(2, 3), (1, -1)]));
        assert_eq!(t, terms(&[(1, -1), (2, 6)]));
        // absent variable is a no-op
        let mut u = terms(&[(1, 1)]);
        u.substitute(VarId(0), &terms(&[(2, 3)]));
        assert_eq!(u, terms(&[(1, 1)]));
    }

    #[test]
    fn evaluation() {
        let t = terms(&[(0, 2), (1, -3)]);
        let value = t.evaluate(|v| if v == VarId(0) { rat!(5) } else { rat!(1) });
        assert_eq!(value, rat!(7));
        let unbounded = t.evaluate(|_| Rational::infinity());
        assert!(unbounded.is_nan());
    }

    #[test]
    fn relation_holds() {
        assert_eq!(RelOp::Ge.holds(&rat!(1), &rat!(0)), Some(true));
        assert_eq!(RelOp::Le.holds(&rat!(1), &rat!(0)), Some(false));
        assert_eq!(RelOp::Eq.holds(&rat!(1, 2), &rat!(2, 4)), Some(true));
        assert_eq!(RelOp::Ge.holds(&Rational::nan(), &rat!(0)), None);
    }

    #[test]
    fn satisfied_by() {
        let eq = LinearEq::new(
            EqTag::new("iron"),
            terms(&[(0, 2), (1, -1)]),
            RelOp::Eq,
            rat!(3),
        );
        assert_eq!(eq.satisfied_by(|_| rat!(3)), Some(true));
        assert_eq!(eq.satisfied_by(|_| rat!(1)), Some(false));
    }

    #[test]
    fn absorb_qualifies_tags() {
        let mut parent = EqSystem::new();
        parent.add_var(Var::throttle(VarId(0), "a"));
        parent.push_eq(LinearEq::new(
            EqTag::new("iron"),
            terms(&[(0, 1)]),
            RelOp::Eq,
            Rational::zero(),
        ));
        let mut child = EqSystem::new();
        child.add_var(Var::throttle(VarId(1), "b"));
        child.push_eq(LinearEq::new(
            EqTag::scoped(1, "iron"),
            terms(&[(1, 1)]),
            RelOp::Eq,
            Rational::zero(),
        ));
        child.declare_output("iron", terms(&[(1, 1)]));
        let flows = parent.absorb(child, 2);
        assert_eq!(parent.eqs().len(), 2);
        assert_eq!(parent.eqs()[1].tag.to_string(), "1_iron_b2");
        assert_eq!(flows, vec![("iron".to_string(), terms(&[(1, 1)]))]);
        assert!(parent.var(VarId(1)).is_some());
    }

    #[test]
    fn scaling() {
        let mut sys = EqSystem::new();
        sys.add_var(Var::throttle(VarId(0), "a"));
        sys.push_eq(LinearEq::new(
            EqTag::new("iron"),
            terms(&[(0, 3)]),
            RelOp::Le,
            rat!(6),
        ));
        sys.declare_output("iron", terms(&[(0, 3)]));
        sys.scale(&rat!(1, 3));
        assert_eq!(sys.eqs()[0].terms, terms(&[(0, 1)]));
        assert_eq!(sys.eqs()[0].rhs, rat!(2));
        assert_eq!(sys.outputs()[0].1, terms(&[(0, 1)]));
    }

    #[test]
    #[should_panic]
    fn priority_out_of_range() {
        let mut sys = EqSystem::new();
        sys.add_var(Var::throttle(VarId(0), "a"));
        sys.set_priority(VarId(0), 101);
    }
}
