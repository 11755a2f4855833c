//! Demand that the producers cannot meet.
//!
//! Throttled producers supply one unit each against a demand of five. With
//! too few of them the solve must degrade to a partial verdict with every
//! producer at full throttle, never average the shortfall into the rates.
use num_traits::Zero;

use crate::rat;
use crate::{
    EqSystem, EqTag, LinearEq, Rational, RelOp, SolveRes, Solver, SolverConfig, Terms, Var, VarId,
};

fn network(n_producers: u32) -> EqSystem {
    let mut sys = EqSystem::new();
    for i in 0..n_producers {
        sys.add_var(Var::throttle(VarId(i), format!("producer_{i}")));
    }
    let supply: Terms = (0..n_producers).map(|i| (VarId(i), rat!(1))).collect();
    sys.push_eq(LinearEq::new(
        EqTag::new("demand"),
        supply.clone(),
        RelOp::Eq,
        rat!(5),
    ));
    sys.declare_output("widget", supply);
    sys.set_output_priority("widget", 0);
    sys
}

#[test]
fn unmeetable_demand_is_partial_at_full_throttle() {
    let mut solver = Solver::new(network(3), SolverConfig::new());
    let res = solver.solve().unwrap();
    assert!(res.ok(), "{res:?}");
    let (res, solution) = solver.solution().unwrap();
    assert_eq!(res, SolveRes::Partial);
    for i in 0..3 {
        assert_eq!(solution.rates[&VarId(i)], rat!(1), "producer_{i}");
    }
    let shortfall: Rational = solution
        .residues
        .iter()
        .map(|(_, v)| v.clone())
        .fold(Rational::zero(), |a, b| a + b);
    assert_eq!(shortfall, rat!(2));
}

#[test]
fn exactly_meetable_demand_leaves_no_residue() {
    let mut solver = Solver::new(network(5), SolverConfig::new());
    let res = solver.solve().unwrap();
    assert!(res.ok());
    let (res, solution) = solver.solution().unwrap();
    assert_ne!(res, SolveRes::Partial);
    assert!(res.ok());
    for i in 0..5 {
        assert_eq!(solution.rates[&VarId(i)], rat!(1));
    }
    assert!(solution.residues.iter().all(|(_, v)| v.is_zero()));
}
