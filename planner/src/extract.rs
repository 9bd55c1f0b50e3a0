use evrp_structs::solution::{Route, Solution, SolutionStatus, Visit};
use log::{debug, warn};
use tinyvec::TinyVec;

use crate::{
    adapter::Incumbent, error::MalformedAssignmentError, graph::Graph, milp::EvrpModel,
};

/// Snaps solver noise: values within `tolerance` of zero or of an integer
/// become exact.
pub fn clean(value: f64, tolerance: f64) -> f64 {
    if value.abs() < tolerance {
        0.0
    } else if (value - value.round()).abs() < tolerance {
        value.round()
    } else {
        value
    }
}

/// Decodes the solver's assignment into one depot-anchored route per
/// dispatched vehicle.
pub fn extract(
    graph: &Graph,
    evrp: &EvrpModel,
    incumbent: &Incumbent,
    status: SolutionStatus,
    tolerance: f64,
) -> Result<Solution, MalformedAssignmentError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("extract");

    let values = &incumbent.assignment;
    if values.len() != evrp.model.num_vars() {
        return Err(MalformedAssignmentError::WrongLength {
            expected: evrp.model.num_vars(),
            got: values.len(),
        });
    }

    let mut routes = Vec::new();
    for v in 0..evrp.vehicles.len() {
        if let Some(path) = vehicle_path(graph, evrp, values, v, tolerance)? {
            let vars = &evrp.vehicles[v];
            let visits = path
                .iter()
                .map(|i| {
                    let node = graph.node(*i);
                    Visit {
                        node: node.physical,
                        id: graph.physical(node.physical).id.clone(),
                        service_start: clean(values[vars.time[*i].idx()], tolerance),
                        soc: clean(values[vars.soc[*i].idx()], tolerance),
                        charged: vars.charge[*i].map(|q| clean(values[q.idx()], tolerance)).unwrap_or(0.0),
                    }
                })
                .collect::<Vec<_>>();
            debug!(
                "Vehicle {}: {}",
                v,
                visits.iter().map(|x| x.id.as_str()).collect::<Vec<_>>().join(" -> ")
            );
            routes.push(Route { vehicle: v, visits });
        }
    }

    Ok(Solution {
        status,
        objective: incumbent.objective,
        gap: incumbent.gap,
        routes,
    })
}

/// Graph nodes visited by vehicle `v`, or `None` if it stays at the depot.
fn vehicle_path(
    graph: &Graph,
    evrp: &EvrpModel,
    values: &[f64],
    v: usize,
    tolerance: f64,
) -> Result<Option<Vec<usize>>, MalformedAssignmentError> {
    let n = graph.nodes().len();
    let mut succ: Vec<TinyVec<[usize; 2]>> = vec![TinyVec::new(); n];
    let mut pred_count = vec![0usize; n];
    let mut used = 0;

    for (i, j, x) in evrp.vehicles[v].arcs.iter().copied() {
        let value = values[x.idx()];
        if value > tolerance && value < 1.0 - tolerance {
            return Err(MalformedAssignmentError::Fractional {
                vehicle: v,
                from: graph.label(i).to_string(),
                to: graph.label(j).to_string(),
                value,
            });
        }
        if value >= 0.5 {
            succ[i].push(j);
            pred_count[j] += 1;
            used += 1;
        }
    }

    for i in 0..n {
        if succ[i].len() > 1 {
            return Err(MalformedAssignmentError::Branching {
                vehicle: v,
                node: graph.label(i).to_string(),
                count: succ[i].len(),
            });
        }
        if pred_count[i] > 1 {
            return Err(MalformedAssignmentError::Merging {
                vehicle: v,
                node: graph.label(i).to_string(),
                count: pred_count[i],
            });
        }
    }

    let (start, end) = (graph.start_depot(), graph.end_depot());
    let mut path = Vec::new();
    if !succ[start].is_empty() {
        // In- and out-degrees are at most one and nothing enters the start
        // depot, so the walk cannot loop.
        path.push(start);
        let mut current = start;
        while current != end {
            current = match succ[current].first() {
                Some(next) => *next,
                None => {
                    return Err(MalformedAssignmentError::DeadEnd {
                        vehicle: v,
                        node: graph.label(current).to_string(),
                    })
                }
            };
            path.push(current);
        }
    }

    let on_path = path.len().saturating_sub(1);
    if used > on_path {
        let mut detached = (0..n)
            .filter(|i| !succ[*i].is_empty() && !path.contains(i))
            .map(|i| graph.label(i).to_string())
            .collect::<Vec<_>>();
        detached.sort();
        warn!("Vehicle {} has {} arcs off its route", v, used - on_path);
        return Err(MalformedAssignmentError::DetachedCycle {
            vehicle: v,
            nodes: detached,
        });
    }

    Ok((!path.is_empty()).then_some(path))
}
