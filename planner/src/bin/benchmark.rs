use std::{error::Error, fs::read_dir, path::PathBuf};

use evrp_planner::{
    config::{BigM, PlannerConfig},
    instance::read_problem,
};
use evrp_structs::problem::{NodeRole, Problem};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BenchResult {
    instance: String,
    formulation: &'static str,
    customers: usize,
    stations: usize,
    vehicles: usize,
    status: String,
    time: f64,
    objective: Option<f64>,
    gap: Option<f64>,
    routes: Option<usize>,
    feasible: Option<bool>,
}

fn instance_files(dir: &str) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut filenames = read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    filenames.retain(|f| f.extension().is_some_and(|e| e == "json" || e == "txt"));
    filenames.sort();
    Ok(filenames)
}

fn role_count(problem: &Problem, role: NodeRole) -> usize {
    problem.nodes.iter().filter(|n| n.role == role).count()
}

pub fn main() -> Result<(), Box<dyn Error>> {
    use evrp_planner::{adapter::HighsAdapter, solve};
    use std::{io::Write, time::Instant};

    env_logger::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let dir = args.first().map(|s| s.as_str()).unwrap_or("bench");
    let vehicles = args.get(1).map(|n| n.parse::<usize>()).transpose()?.unwrap_or(4);
    let time_limit = args.get(2).map(|t| t.parse::<f64>()).transpose()?.unwrap_or(60.0);

    let formulations = [("tight", BigM::Tight), ("global", BigM::Global)];

    println!("------------------------");
    println!("evrp-tw milp benchmarking");
    println!("------------------------");
    println!();
    println!(
        "  formulations: {}",
        formulations.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
    );
    println!();

    let files = instance_files(dir)?;
    let mut results: Vec<Vec<BenchResult>> = Vec::new();

    println!("# RUNNING {} INSTANCES", files.len());
    for filename in files.iter() {
        let _p = hprof::enter("instance");
        let problem = {
            let _p = hprof::enter("read");
            read_problem(filename, vehicles)?
        };
        let customers = role_count(&problem, NodeRole::Customer);
        let stations = role_count(&problem, NodeRole::ChargingStation);
        println!(
            " * instance {} with {} vehicles {} customers {} stations",
            filename.display(),
            problem.vehicles.len(),
            customers,
            stations
        );

        let mut row = Vec::new();
        for (name, big_m) in formulations {
            println!("   - solving with: \"{}\"", name);
            let config = PlannerConfig {
                big_m,
                time_limit,
                ..PlannerConfig::default()
            };
            let t0 = Instant::now();
            let outcome = solve(&problem, &config, &mut HighsAdapter::new());
            let time = t0.elapsed().as_secs_f64();
            let mut result = BenchResult {
                instance: problem.name.clone(),
                formulation: name,
                customers,
                stations,
                vehicles: problem.vehicles.len(),
                status: String::new(),
                time,
                objective: None,
                gap: None,
                routes: None,
                feasible: None,
            };
            match outcome {
                Ok(report) => {
                    result.status = format!("{:?}", report.status);
                    if let Some(s) = &report.solution {
                        result.objective = Some(s.objective);
                        result.gap = s.gap;
                        result.routes = Some(s.routes.len());
                    }
                    result.feasible = report.verdict.map(|v| v.is_feasible());
                }
                Err(e) => result.status = e.to_string(),
            }
            row.push(result);
        }
        results.push(row);
    }
    println!();
    println!("# PROFILER");
    hprof::profiler().print_timing();
    println!();

    println!("# RESULTS");

    let mut tablewriter = tabwriter::TabWriter::new(std::io::stdout());
    write!(&mut tablewriter, "instance\tcst\tstn\tvhs")?;
    for (name, _) in formulations.iter() {
        write!(&mut tablewriter, "\t|\t{}\t\t\t", name)?;
    }
    writeln!(&mut tablewriter)?;

    write!(&mut tablewriter, "\t\t\t")?;
    for _ in formulations.iter() {
        write!(&mut tablewriter, "\t|\ttime\tobj\tgap\tstatus")?;
    }
    writeln!(&mut tablewriter)?;

    write!(&mut tablewriter, "---\t---\t---\t---")?;
    for _ in formulations.iter() {
        write!(&mut tablewriter, "\t\t---\t---\t---\t---")?;
    }
    writeln!(&mut tablewriter)?;

    let fmt = |x: Option<f64>, digits: usize| x.map(|x| format!("{:.*}", digits, x)).unwrap_or_else(|| "-".to_string());
    for row in results.iter() {
        let first = &row[0];
        write!(
            &mut tablewriter,
            "{}\t{}\t{}\t{}",
            first.instance, first.customers, first.stations, first.vehicles
        )?;
        for r in row.iter() {
            write!(
                &mut tablewriter,
                "\t|\t{:.2}\t{}\t{}\t{}",
                r.time,
                fmt(r.objective, 2),
                fmt(r.gap, 4),
                r.status
            )?;
        }
        writeln!(&mut tablewriter)?;
    }

    tablewriter.flush()?;
    println!();

    let mut csv = csv::Writer::from_path("bench_results.csv")?;
    for r in results.iter().flatten() {
        csv.serialize(r)?;
    }
    csv.flush()?;
    println!("results written to bench_results.csv");
    Ok(())
}
