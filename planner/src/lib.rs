use adapter::{Outcome, SolveLimits, SolverAdapter};
use config::PlannerConfig;
use error::Error;
use evrp_structs::{
    problem::Problem,
    solution::{Solution, SolutionStatus},
};
use graph::Graph;
use log::{info, warn};
use serde::Serialize;
use validate::Verdict;

pub mod adapter;
pub mod config;
pub mod error;
pub mod extract;
pub mod extsolvers;
pub mod graph;
pub mod instance;
pub mod milp;
pub mod model;
pub mod validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
    /// Time limit reached with an incumbent.
    TimeLimited,
    NoSolutionInTimeLimit,
    Infeasible,
    Unbounded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub solution: Option<Solution>,
    pub verdict: Option<Verdict>,
}

impl SolveReport {
    fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            solution: None,
            verdict: None,
        }
    }

    fn with_solution(status: SolveStatus, solution: Solution, verdict: Verdict) -> Self {
        Self {
            status,
            solution: Some(solution),
            verdict: Some(verdict),
        }
    }
}

/// Validates the instance, builds the model, solves it through `adapter` and
/// decodes and re-checks the result. Proven infeasibility and running out of
/// time are statuses of the report, not errors.
pub fn solve(problem: &Problem, config: &PlannerConfig, adapter: &mut dyn SolverAdapter) -> Result<SolveReport, Error> {
    let graph = Graph::new(problem, config.station_copies)?;
    solve_graph(&graph, config, adapter)
}

pub fn solve_graph(graph: &Graph, config: &PlannerConfig, adapter: &mut dyn SolverAdapter) -> Result<SolveReport, Error> {
    milp::precheck(graph)?;
    if graph.customers().is_empty() {
        info!("No customers to serve");
        let solution = Solution::empty();
        let verdict = validate::validate(graph, &solution, config.tolerance);
        return Ok(SolveReport::with_solution(SolveStatus::Optimal, solution, verdict));
    }

    let evrp = milp::build_model(graph, config)?;
    let (status, incumbent) = match adapter.solve(&evrp.model, &SolveLimits::from(config))? {
        Outcome::Optimal(incumbent) => (SolveStatus::Optimal, incumbent),
        Outcome::TimeLimitReached(Some(incumbent)) => (SolveStatus::TimeLimited, incumbent),
        Outcome::TimeLimitReached(None) => return Ok(SolveReport::without_solution(SolveStatus::NoSolutionInTimeLimit)),
        Outcome::ProvenInfeasible => return Ok(SolveReport::without_solution(SolveStatus::Infeasible)),
        Outcome::Unbounded => return Ok(SolveReport::without_solution(SolveStatus::Unbounded)),
    };

    let solution_status = match status {
        SolveStatus::Optimal => SolutionStatus::Optimal,
        _ => SolutionStatus::TimeLimited,
    };
    let solution = extract::extract(graph, &evrp, &incumbent, solution_status, config.tolerance)?;
    let verdict = validate::validate(graph, &solution, config.tolerance);
    match verdict.first_violation() {
        Some(v) => warn!("Solver solution fails validation: {}", v),
        None => info!("Solution with {} routes validated", solution.routes.len()),
    }
    Ok(SolveReport::with_solution(status, solution, verdict))
}
