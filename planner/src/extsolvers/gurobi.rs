use std::cell::RefCell;

use super::{row_sides, LPSolver, LpStatus};
use crate::error::SolverError;
use grb::{expr::LinExpr, prelude::*};
use log::debug;

thread_local! {
static GLOBAL_GUROBI_ENV :RefCell<Option<grb::Env>> = const { RefCell::new(None) };
}

pub struct GurobiSolver {
    grb: grb::Model,
    added_vars: Vec<grb::Var>,
}

fn finite(value: f64) -> f64 {
    value.clamp(-grb::INFINITY, grb::INFINITY)
}

impl GurobiSolver {
    fn incumbent(&self) -> Result<(f64, f64, Vec<f64>), SolverError> {
        let bound = self.grb.get_attr(attr::ObjBound)?;
        let obj = self.grb.get_attr(attr::ObjVal)?;
        let sol = self.grb.get_obj_attr_batch(attr::X, self.added_vars.iter().cloned())?;
        Ok((obj, bound, sol))
    }
}

impl LPSolver for GurobiSolver {
    type Var = grb::Var;

    fn new() -> Result<Self, SolverError> {
        let mut grb = GLOBAL_GUROBI_ENV.with_borrow_mut(|e| -> Result<grb::Model, grb::Error> {
            let env = match e.take() {
                Some(env) => env,
                None => grb::Env::new("")?,
            };
            let model = grb::Model::with_env("", &env);
            *e = Some(env);
            model
        })?;
        grb.set_param(param::OutputFlag, 0)?;
        Ok(Self {
            grb,
            added_vars: Vec::new(),
        })
    }

    fn add_var(&mut self, cost: f64, lower: f64, upper: f64) -> Result<Self::Var, SolverError> {
        let model = &mut self.grb;
        let var = add_ctsvar!(model, obj: cost, bounds: finite(lower)..finite(upper))?;
        self.added_vars.push(var);
        Ok(var)
    }

    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError> {
        self.grb.set_obj_attr(attr::VType, &var, VarType::Binary)?;
        Ok(())
    }

    fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[Self::Var], coeffs: &[f64]) -> Result<(), SolverError> {
        let mut expr = LinExpr::new();
        for (v, c) in idxs.iter().zip(coeffs.iter()) {
            expr.add_term(*c, *v);
        }
        if lb == ub {
            self.grb.add_constr("", c!(expr == lb))?;
            return Ok(());
        }
        let (lower, upper) = row_sides(lb, ub, self.inf());
        if let Some(lb) = lower {
            self.grb.add_constr("", c!(expr.clone() >= lb))?;
        }
        if let Some(ub) = upper {
            self.grb.add_constr("", c!(expr <= ub))?;
        }
        Ok(())
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        self.grb.set_param(param::TimeLimit, seconds)?;
        Ok(())
    }

    fn set_mip_gap(&mut self, gap: f64) -> Result<(), SolverError> {
        self.grb.set_param(param::MIPGap, gap)?;
        Ok(())
    }

    fn optimize(&mut self) -> Result<LpStatus, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("gurobi optimize");

        self.grb.optimize()?;
        let status = self.grb.status()?;
        debug!("Gurobi finished with status {:?}", status);
        match status {
            Status::Optimal => {
                let (objective, bound, values) = self.incumbent()?;
                Ok(LpStatus::Optimal {
                    objective,
                    bound,
                    values,
                })
            }
            Status::Infeasible | Status::InfOrUnbd => Ok(LpStatus::Infeasible),
            Status::Unbounded => Ok(LpStatus::Unbounded),
            Status::IterationLimit
            | Status::NodeLimit
            | Status::TimeLimit
            | Status::SolutionLimit
            | Status::Interrupted => {
                let incumbent = if self.grb.get_attr(attr::SolCount)? > 0 {
                    Some(self.incumbent()?)
                } else {
                    None
                };
                Ok(LpStatus::Limit { incumbent })
            }
            other => Err(SolverError::Status(format!("Gurobi {:?}", other))),
        }
    }

    fn inf(&self) -> f64 {
        grb::INFINITY
    }

    fn num_vars(&self) -> usize {
        self.added_vars.len()
    }
}
