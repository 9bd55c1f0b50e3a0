use std::{error::Error, fs::read_to_string, path::Path};

use evrp_planner::{adapter::HighsAdapter, config::PlannerConfig, instance::read_problem, solve};
use log::info;

const USAGE: &str = "usage: solve <instance.json|instance.txt> [config.json] [vehicles]";

pub fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let instance = args.first().ok_or(USAGE)?;
    let config: PlannerConfig = match args.get(1) {
        Some(path) => serde_json::from_str(&read_to_string(path)?)?,
        None => PlannerConfig::default(),
    };
    let vehicles = match args.get(2) {
        Some(n) => n.parse::<usize>()?,
        None => 4,
    };

    let problem = read_problem(Path::new(instance), vehicles)?;
    info!(
        "Instance {} with {} nodes and {} vehicles",
        problem.name,
        problem.nodes.len(),
        problem.vehicles.len()
    );

    let report = solve(&problem, &config, &mut HighsAdapter::new())?;
    eprintln!("{:?}", report.status);
    if let Some(solution) = &report.solution {
        eprint!("{}", solution);
    }
    if let Some(v) = report.verdict.as_ref().and_then(|v| v.first_violation()) {
        eprintln!("validation failed: {}", v);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
