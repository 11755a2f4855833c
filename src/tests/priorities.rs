//! Lexicographic tiers over a shared budget.
//!
//! Once a tier has committed its optimum, later tiers may only move within
//! the remaining freedom; they must never trade away what an earlier tier
//! achieved.
use num_traits::Zero;

use crate::rat;
use crate::{
    EqSystem, EqTag, LinearEq, Rational, RelOp, SolveRes, Solver, SolverConfig, Terms, Var, VarId,
};

const HIGH: VarId = VarId(0);
const LOW: VarId = VarId(1);

#[test]
fn later_tier_cannot_degrade_an_earlier_one() {
    // both outputs draw on the same budget of 10; the high priority output
    // takes everything and the low priority one is left with zero
    let mut sys = EqSystem::new();
    sys.add_var(Var::unbounded(HIGH, "refinery"));
    sys.add_var(Var::unbounded(LOW, "flare"));
    let budget: Terms = [(HIGH, rat!(1)), (LOW, rat!(1))].into_iter().collect();
    sys.push_eq(LinearEq::new(EqTag::new("budget"), budget, RelOp::Le, rat!(10)));
    sys.declare_output("fuel", std::iter::once((HIGH, rat!(1))).collect());
    sys.declare_output("exhaust", std::iter::once((LOW, rat!(1))).collect());
    sys.set_output_priority("fuel", 5);
    sys.set_output_priority("exhaust", 0);
    let mut solver = Solver::new(sys, SolverConfig::new());
    let res = solver.solve().unwrap();
    assert!(res.ok(), "{res:?}");
    let (_, solution) = solver.solution().unwrap();
    assert_eq!(solution.rates[&HIGH], rat!(10));
    assert_eq!(solution.rates[&LOW], Rational::zero());

    // dropping the lower tier leaves the higher tier's optimum untouched
    let mut without_low = EqSystem::new();
    without_low.add_var(Var::unbounded(HIGH, "refinery"));
    without_low.add_var(Var::unbounded(LOW, "flare"));
    let budget: Terms = [(HIGH, rat!(1)), (LOW, rat!(1))].into_iter().collect();
    without_low.push_eq(LinearEq::new(
        EqTag::new("budget"),
        budget,
        RelOp::Le,
        rat!(10),
    ));
    without_low.declare_output("fuel", std::iter::once((HIGH, rat!(1))).collect());
    without_low.set_output_priority("fuel", 5);
    let mut solver = Solver::new(without_low, SolverConfig::new());
    solver.solve().unwrap();
    let (_, alone) = solver.solution().unwrap();
    assert_eq!(alone.rates[&HIGH], solution.rates[&HIGH]);
}

#[test]
fn input_minimization_keeps_the_committed_output() {
    // the output tier drives the smelter to the miner's cap of 3; the later
    // input tier minimizes coal consumption but may not pull it back down
    let mut sys = EqSystem::new();
    sys.add_var(Var::new(VarId(0), "miner", rat!(3)));
    sys.add_var(Var::unbounded(VarId(1), "smelter"));
    sys.push_eq(LinearEq::new(
        EqTag::new("ore"),
        [(VarId(0), rat!(2)), (VarId(1), rat!(-2))].into_iter().collect(),
        RelOp::Eq,
        Rational::zero(),
    ));
    sys.declare_output("plate", std::iter::once((VarId(1), rat!(1))).collect());
    sys.declare_input("coal", std::iter::once((VarId(0), rat!(-1))).collect());
    sys.set_output_priority("plate", 0);
    let mut solver = Solver::new(sys, SolverConfig::new());
    let res = solver.solve().unwrap();
    assert_eq!(res, SolveRes::Unique);
    let (_, solution) = solver.solution().unwrap();
    assert_eq!(solution.rates[&VarId(1)], rat!(3));
    assert_eq!(solution.rates[&VarId(0)], rat!(3));
    assert!(solution.residues.is_empty());
}

#[test]
fn equal_priorities_share_one_tier() {
    // at the same priority neither output dominates; the budget splits and
    // the verdict reflects the shared optimum
    let mut sys = EqSystem::new();
    sys.add_var(Var::unbounded(HIGH, "a"));
    sys.add_var(Var::unbounded(LOW, "b"));
    let budget: Terms = [(HIGH, rat!(1)), (LOW, rat!(1))].into_iter().collect();
    sys.push_eq(LinearEq::new(EqTag::new("budget"), budget, RelOp::Le, rat!(10)));
    sys.declare_output("left", std::iter::once((HIGH, rat!(1))).collect());
    sys.declare_output("right", std::iter::once((LOW, rat!(1))).collect());
    sys.set_output_priority("left", 0);
    sys.set_output_priority("right", 0);
    let mut solver = Solver::new(sys, SolverConfig::new());
    let res = solver.solve().unwrap();
    assert!(res.ok());
    assert!(res >= SolveRes::Ok, "{res:?}");
    let (_, solution) = solver.solution().unwrap();
    let total = &solution.rates[&HIGH] + &solution.rates[&LOW];
    assert_eq!(total, rat!(10));
}
