use crate::error::SolverError;

#[cfg(feature = "gurobi")]
pub mod gurobi;
#[cfg(feature = "highs")]
pub mod highs;

/// Result of one `optimize` call on a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LpStatus {
    Optimal { objective: f64, bound: f64, values: Vec<f64> },
    /// Stopped by a time or iteration limit, with `(objective, bound, values)`
    /// of the best solution found so far.
    Limit { incumbent: Option<(f64, f64, Vec<f64>)> },
    Infeasible,
    Unbounded,
}

pub trait LPSolver {
    type Var: Copy + Clone;
    fn new() -> Result<Self, SolverError>
    where
        Self: Sized;
    fn add_var(&mut self, cost: f64, lower: f64, upper: f64) -> Result<Self::Var, SolverError>;
    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError>;
    fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[Self::Var], coeffs: &[f64]) -> Result<(), SolverError>;
    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError>;
    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError>;
    fn optimize(&mut self) -> Result<LpStatus, SolverError>;
    fn inf(&self) -> f64;
    fn num_vars(&self) -> usize;
}

/// Splits a row range into its lower and upper side for backends that only
/// take one-sided rows. A side at the backend's infinity is dropped, and an
/// equality comes back as two equal sides.
#[cfg_attr(not(feature = "gurobi"), allow(dead_code))]
pub(crate) fn row_sides(lb: f64, ub: f64, inf: f64) -> (Option<f64>, Option<f64>) {
    ((lb > -inf).then_some(lb), (ub < inf).then_some(ub))
}
