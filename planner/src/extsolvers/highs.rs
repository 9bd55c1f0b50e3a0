use std::convert::TryFrom;
use std::ffi::{c_void, CStr};
use std::fmt::{Debug, Formatter};
use std::os::raw::c_int;

use highs_sys::*;
use log::debug;

use super::{LPSolver, LpStatus};
use crate::error::SolverError;

const PRIMAL_FEASIBLE: HighsInt = 2;

pub struct HighsSolver {
    ptr: *mut c_void,
    num_cols: usize,
    has_integers: bool,
}

impl Drop for HighsSolver {
    fn drop(&mut self) {
        unsafe {
            Highs_destroy(self.ptr);
        }
    }
}

fn check(retval: HighsInt, what: &str) -> Result<(), SolverError> {
    match HighsStatus::try_from(retval) {
        Ok(HighsStatus::OK) | Ok(HighsStatus::Warning) => Ok(()),
        Ok(HighsStatus::Error) => Err(SolverError::Backend(format!("HiGHS {} failed", what))),
        Err(e) => Err(SolverError::Backend(format!("HiGHS {}: {:?}", what, e))),
    }
}

impl HighsSolver {
    fn double_info(&self, name: &CStr) -> Result<f64, SolverError> {
        let mut value = 0.0f64;
        check(
            unsafe { Highs_getDoubleInfoValue(self.ptr, name.as_ptr(), &mut value) },
            "double info",
        )?;
        Ok(value)
    }

    fn int_info(&self, name: &CStr) -> Result<HighsInt, SolverError> {
        let mut value: HighsInt = 0;
        check(
            unsafe { Highs_getIntInfoValue(self.ptr, name.as_ptr(), &mut value) },
            "int info",
        )?;
        Ok(value)
    }

    fn solution(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.num_cols];
        if !values.is_empty() {
            let null = std::ptr::null_mut();
            unsafe { Highs_getSolution(self.ptr, values.as_mut_ptr(), null, null, null) };
        }
        values
    }

    fn incumbent(&self) -> Result<(f64, f64, Vec<f64>), SolverError> {
        if self.num_cols == 0 {
            return Ok((0.0, 0.0, Vec::new()));
        }
        let objective = self.double_info(c"objective_function_value")?;
        let bound = if self.has_integers {
            self.double_info(c"mip_dual_bound")?
        } else {
            objective
        };
        Ok((objective, bound, self.solution()))
    }
}

impl LPSolver for HighsSolver {
    type Var = HighsInt;

    fn new() -> Result<Self, SolverError> {
        let ptr = unsafe { Highs_create() };
        if ptr.is_null() {
            return Err(SolverError::Backend("could not create HiGHS instance".to_string()));
        }
        let solver = Self {
            ptr,
            num_cols: 0,
            has_integers: false,
        };
        check(
            unsafe { Highs_setStringOptionValue(ptr, c"presolve".as_ptr(), c"on".as_ptr()) },
            "presolve option",
        )?;
        check(
            unsafe { Highs_setBoolOptionValue(ptr, c"output_flag".as_ptr(), 0) },
            "output option",
        )?;
        Ok(solver)
    }

    fn add_var(&mut self, cost: f64, lower: f64, upper: f64) -> Result<Self::Var, SolverError> {
        let col = self.num_cols as HighsInt;
        check(
            unsafe { Highs_addCol(self.ptr, cost, lower, upper, 0, std::ptr::null(), std::ptr::null()) },
            "add column",
        )?;
        self.num_cols += 1;
        Ok(col)
    }

    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError> {
        check(unsafe { Highs_changeColBounds(self.ptr, var, 0.0, 1.0) }, "column bounds")?;
        check(
            unsafe { Highs_changeColIntegrality(self.ptr, var, kHighsVarTypeInteger) },
            "column integrality",
        )?;
        self.has_integers = true;
        Ok(())
    }

    fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[Self::Var], coeffs: &[f64]) -> Result<(), SolverError> {
        assert!(idxs.len() == coeffs.len());
        check(
            unsafe { Highs_addRow(self.ptr, lb, ub, idxs.len() as HighsInt, idxs.as_ptr(), coeffs.as_ptr()) },
            "add row",
        )
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        check(
            unsafe { Highs_setDoubleOptionValue(self.ptr, c"time_limit".as_ptr(), seconds) },
            "time limit option",
        )
    }

    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError> {
        check(
            unsafe { Highs_setDoubleOptionValue(self.ptr, c"mip_rel_gap".as_ptr(), gap) },
            "gap option",
        )
    }

    fn optimize(&mut self) -> Result<LpStatus, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("highs optimize");

        let retval = unsafe { Highs_run(self.ptr) };
        let status = HighsModelStatus::try_from(unsafe { Highs_getModelStatus(self.ptr) })
            .map_err(|e| SolverError::Status(format!("{:?}", e)))?;
        debug!("HiGHS run returned {} with model status {:?}", retval, status);

        match status {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => {
                let (objective, bound, values) = self.incumbent()?;
                Ok(LpStatus::Optimal {
                    objective,
                    bound,
                    values,
                })
            }
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => Ok(LpStatus::Infeasible),
            HighsModelStatus::Unbounded => Ok(LpStatus::Unbounded),
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                let incumbent = if self.int_info(c"primal_solution_status")? == PRIMAL_FEASIBLE {
                    Some(self.incumbent()?)
                } else {
                    None
                };
                Ok(LpStatus::Limit { incumbent })
            }
            other => Err(SolverError::Status(format!("HiGHS {:?}", other))),
        }
    }

    fn inf(&self) -> f64 {
        unsafe { Highs_getInfinity(self.ptr) }
    }

    fn num_vars(&self) -> usize {
        self.num_cols
    }
}

/// The kinds of results of an optimization
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    /// not initialized
    NotSet = MODEL_STATUS_NOTSET as isize,
    /// Unable to load model
    LoadError = MODEL_STATUS_LOAD_ERROR as isize,
    /// invalid model
    ModelError = MODEL_STATUS_MODEL_ERROR as isize,
    /// Unable to run the pre-solve phase
    PresolveError = MODEL_STATUS_PRESOLVE_ERROR as isize,
    /// Unable to solve
    SolveError = MODEL_STATUS_SOLVE_ERROR as isize,
    /// Unable to clean after solve
    PostsolveError = MODEL_STATUS_POSTSOLVE_ERROR as isize,
    /// No variables in the model: nothing to optimize
    ModelEmpty = MODEL_STATUS_MODEL_EMPTY as isize,
    /// There is no solution to the problem
    Infeasible = MODEL_STATUS_INFEASIBLE as isize,
    /// The problem in unbounded or infeasible
    UnboundedOrInfeasible = MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE as isize,
    /// The problem is unbounded: there is no single optimal value
    Unbounded = MODEL_STATUS_UNBOUNDED as isize,
    /// An optimal solution was found
    Optimal = MODEL_STATUS_OPTIMAL as isize,
    /// objective bound
    ObjectiveBound = MODEL_STATUS_OBJECTIVE_BOUND as isize,
    /// objective target
    ObjectiveTarget = MODEL_STATUS_OBJECTIVE_TARGET as isize,
    /// reached limit
    ReachedTimeLimit = MODEL_STATUS_REACHED_TIME_LIMIT as isize,
    /// reached limit
    ReachedIterationLimit = MODEL_STATUS_REACHED_ITERATION_LIMIT as isize,
    /// Unknown model status
    Unknown = MODEL_STATUS_UNKNOWN as isize,
}

/// An unexpected status was returned by the library.
#[derive(PartialEq, Clone, Copy)]
pub struct InvalidStatus(pub c_int);

impl Debug for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid HiGHS status", self.0)
    }
}

impl TryFrom<c_int> for HighsModelStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> Result<Self, Self::Error> {
        match value {
            MODEL_STATUS_NOTSET => Ok(Self::NotSet),
            MODEL_STATUS_LOAD_ERROR => Ok(Self::LoadError),
            MODEL_STATUS_MODEL_ERROR => Ok(Self::ModelError),
            MODEL_STATUS_PRESOLVE_ERROR => Ok(Self::PresolveError),
            MODEL_STATUS_SOLVE_ERROR => Ok(Self::SolveError),
            MODEL_STATUS_POSTSOLVE_ERROR => Ok(Self::PostsolveError),
            MODEL_STATUS_MODEL_EMPTY => Ok(Self::ModelEmpty),
            MODEL_STATUS_INFEASIBLE => Ok(Self::Infeasible),
            MODEL_STATUS_UNBOUNDED => Ok(Self::Unbounded),
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => Ok(Self::UnboundedOrInfeasible),
            MODEL_STATUS_OPTIMAL => Ok(Self::Optimal),
            MODEL_STATUS_OBJECTIVE_BOUND => Ok(Self::ObjectiveBound),
            MODEL_STATUS_OBJECTIVE_TARGET => Ok(Self::ObjectiveTarget),
            MODEL_STATUS_REACHED_TIME_LIMIT => Ok(Self::ReachedTimeLimit),
            MODEL_STATUS_REACHED_ITERATION_LIMIT => Ok(Self::ReachedIterationLimit),
            MODEL_STATUS_UNKNOWN => Ok(Self::Unknown),
            n => Err(InvalidStatus(n)),
        }
    }
}

/// The status of a highs operation
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    /// Success
    OK = 0,
    /// Done, with warning
    Warning = 1,
    /// An error occurred
    Error = 2,
}

impl TryFrom<c_int> for HighsStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> Result<Self, InvalidStatus> {
        match value {
            STATUS_OK => Ok(Self::OK),
            STATUS_WARNING => Ok(Self::Warning),
            STATUS_ERROR => Ok(Self::Error),
            n => Err(InvalidStatus(n)),
        }
    }
}
