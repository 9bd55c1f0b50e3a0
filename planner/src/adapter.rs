//! The boundary between the model builder and any MILP engine.

use std::marker::PhantomData;

use log::info;

use crate::{
    config::PlannerConfig,
    error::SolverError,
    extsolvers::{LPSolver, LpStatus},
    model::{Assignment, Model, VarKind},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveLimits {
    /// Seconds.
    pub time_limit: f64,
    pub optimality_gap: f64,
}

impl From<&PlannerConfig> for SolveLimits {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            time_limit: config.time_limit,
            optimality_gap: config.optimality_gap,
        }
    }
}

/// A feasible assignment reported by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent {
    pub assignment: Assignment,
    pub objective: f64,
    /// Relative distance to the best bound, when the solver has one.
    pub gap: Option<f64>,
}

impl Incumbent {
    pub fn new(assignment: Assignment, objective: f64, bound: f64) -> Self {
        let gap = bound
            .is_finite()
            .then(|| (objective - bound).abs() / objective.abs().max(1e-10));
        Self {
            assignment,
            objective,
            gap,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Optimal within the requested gap.
    Optimal(Incumbent),
    ProvenInfeasible,
    Unbounded,
    TimeLimitReached(Option<Incumbent>),
}

pub trait SolverAdapter {
    fn solve(&mut self, model: &Model, limits: &SolveLimits) -> Result<Outcome, SolverError>;
}

/// Adapter loading the model into a fresh `LPSolver` instance on every call.
pub struct MilpAdapter<LP> {
    _solver: PhantomData<LP>,
}

impl<LP> Default for MilpAdapter<LP> {
    fn default() -> Self {
        Self { _solver: PhantomData }
    }
}

impl<LP> MilpAdapter<LP> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "highs")]
pub type HighsAdapter = MilpAdapter<crate::extsolvers::highs::HighsSolver>;
#[cfg(feature = "gurobi")]
pub type GurobiAdapter = MilpAdapter<crate::extsolvers::gurobi::GurobiSolver>;

impl<LP: LPSolver> SolverAdapter for MilpAdapter<LP> {
    fn solve(&mut self, model: &Model, limits: &SolveLimits) -> Result<Outcome, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("solve");

        let mut lp = LP::new()?;
        lp.set_time_limit(limits.time_limit)?;
        lp.set_mip_gap(limits.optimality_gap)?;

        let inf = lp.inf();
        let clamp = |x: f64| if x.is_infinite() { x.signum() * inf } else { x };

        let mut vars = Vec::with_capacity(model.num_vars());
        for decl in model.vars() {
            let var = lp.add_var(decl.cost, clamp(decl.lb), clamp(decl.ub))?;
            if decl.kind == VarKind::Binary {
                lp.set_binary(var)?;
            }
            vars.push(var);
        }
        for c in model.constraints() {
            let idxs = c.terms.iter().map(|(v, _)| vars[v.idx()]).collect::<Vec<_>>();
            let coeffs = c.terms.iter().map(|(_, x)| *x).collect::<Vec<_>>();
            lp.add_constraint(clamp(c.lb), clamp(c.ub), &idxs, &coeffs)?;
        }
        assert!(lp.num_vars() == model.num_vars());

        let outcome = match lp.optimize()? {
            LpStatus::Optimal {
                objective,
                bound,
                values,
            } => Outcome::Optimal(Incumbent::new(values, objective, bound)),
            LpStatus::Limit { incumbent } => {
                Outcome::TimeLimitReached(incumbent.map(|(objective, bound, values)| Incumbent::new(values, objective, bound)))
            }
            LpStatus::Infeasible => Outcome::ProvenInfeasible,
            LpStatus::Unbounded => Outcome::Unbounded,
        };

        match &outcome {
            Outcome::Optimal(inc) => info!("Solver: optimal {:.4} (gap {:?})", inc.objective, inc.gap),
            Outcome::TimeLimitReached(Some(inc)) => {
                info!("Solver: limit reached with incumbent {:.4} (gap {:?})", inc.objective, inc.gap)
            }
            Outcome::TimeLimitReached(None) => info!("Solver: limit reached without incumbent"),
            Outcome::ProvenInfeasible => info!("Solver: infeasible"),
            Outcome::Unbounded => info!("Solver: unbounded"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what it is given and answers from a fixed status.
    struct Recorder {
        vars: Vec<(f64, f64, f64, bool)>,
        rows: Vec<(f64, f64, Vec<usize>, Vec<f64>)>,
        limits: (f64, f64),
    }

    thread_local! {
        static LAST: std::cell::RefCell<Option<(usize, usize, (f64, f64))>> = const { std::cell::RefCell::new(None) };
    }

    impl LPSolver for Recorder {
        type Var = usize;

        fn new() -> Result<Self, SolverError> {
            Ok(Self {
                vars: Vec::new(),
                rows: Vec::new(),
                limits: (0.0, 0.0),
            })
        }

        fn add_var(&mut self, cost: f64, lower: f64, upper: f64) -> Result<usize, SolverError> {
            self.vars.push((cost, lower, upper, false));
            Ok(self.vars.len() - 1)
        }

        fn set_binary(&mut self, var: usize) -> Result<(), SolverError> {
            self.vars[var].3 = true;
            Ok(())
        }

        fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[usize], coeffs: &[f64]) -> Result<(), SolverError> {
            self.rows.push((lb, ub, idxs.to_vec(), coeffs.to_vec()));
            Ok(())
        }

        fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
            self.limits.0 = seconds;
            Ok(())
        }

        fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError> {
            self.limits.1 = gap;
            Ok(())
        }

        fn optimize(&mut self) -> Result<LpStatus, SolverError> {
            LAST.with_borrow_mut(|l| *l = Some((self.vars.len(), self.rows.len(), self.limits)));
            if self.vars.iter().any(|v| v.1 > v.2) {
                return Ok(LpStatus::Infeasible);
            }
            let values = self.vars.iter().map(|v| v.1).collect::<Vec<_>>();
            let objective = self.vars.iter().map(|v| v.0 * v.1).sum();
            if self.rows.len() > 1 {
                return Ok(LpStatus::Limit {
                    incumbent: Some((objective, objective / 2.0, values)),
                });
            }
            Ok(LpStatus::Optimal {
                objective,
                bound: objective,
                values,
            })
        }

        fn inf(&self) -> f64 {
            1e30
        }

        fn num_vars(&self) -> usize {
            self.vars.len()
        }
    }

    #[test]
    pub fn loads_model_and_maps_status() {
        let mut m = Model::new();
        let x = m.binary("x".to_string(), 3.0);
        let y = m.add_var("y".to_string(), VarKind::Continuous, 2.0, f64::INFINITY, 1.0);
        m.add_le("r".to_string(), vec![(x, 1.0), (y, 1.0)], 10.0);

        let limits = SolveLimits {
            time_limit: 5.0,
            optimality_gap: 0.01,
        };
        let outcome = MilpAdapter::<Recorder>::new().solve(&m, &limits).unwrap();
        assert_eq!(
            outcome,
            Outcome::Optimal(Incumbent {
                assignment: vec![0.0, 2.0],
                objective: 2.0,
                gap: Some(0.0)
            })
        );
        assert_eq!(LAST.with_borrow(|l| *l), Some((2, 1, (5.0, 0.01))));

        m.add_eq("s".to_string(), vec![(y, 1.0)], 2.0);
        match MilpAdapter::<Recorder>::new().solve(&m, &limits).unwrap() {
            Outcome::TimeLimitReached(Some(inc)) => assert_eq!(inc.gap, Some(0.5)),
            other => panic!("unexpected {:?}", other),
        }

        let mut m = Model::new();
        m.continuous("z".to_string(), 1.0, 0.0);
        assert_eq!(
            MilpAdapter::<Recorder>::new().solve(&m, &limits).unwrap(),
            Outcome::ProvenInfeasible
        );
    }
}
