//! Independent replay of a solution against the instance data. Nothing here
//! reads solver variables or model constraints: times and states of charge
//! are recomputed from the routes and the charged amounts alone.

use evrp_structs::{
    problem::NodeRole,
    solution::{Route, Solution},
};
use log::{debug, warn};
use serde::Serialize;

use crate::{error::FeasibilityViolation, graph::Graph};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteMetrics {
    pub distance: f64,
    /// From leaving the depot to returning, including waiting and charging.
    pub duration: f64,
    pub energy: f64,
    pub charged: f64,
    pub load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteVerdict {
    pub vehicle: usize,
    pub result: Result<RouteMetrics, FeasibilityViolation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub routes: Vec<RouteVerdict>,
    /// First customer that is not served exactly once.
    pub coverage: Option<FeasibilityViolation>,
}

impl Verdict {
    pub fn is_feasible(&self) -> bool {
        self.first_violation().is_none()
    }

    pub fn first_violation(&self) -> Option<&FeasibilityViolation> {
        self.routes
            .iter()
            .find_map(|r| r.result.as_ref().err())
            .or(self.coverage.as_ref())
    }
}

pub fn validate(graph: &Graph, solution: &Solution, tolerance: f64) -> Verdict {
    let mut seen = vec![false; graph.vehicles().len()];
    let mut served = vec![0usize; graph.physical_nodes().len()];

    let routes = solution
        .routes
        .iter()
        .map(|route| {
            let vehicle = route.vehicle;
            let result = match seen.get_mut(vehicle) {
                Some(true) => Err(FeasibilityViolation::VehicleReused { vehicle }),
                Some(s) => {
                    *s = true;
                    replay(graph, route, tolerance)
                }
                None => Err(FeasibilityViolation::UnknownVehicle { vehicle }),
            };
            for node in route.nodes() {
                if let Some(count) = served.get_mut(node) {
                    *count += 1;
                }
            }
            if let Err(e) = &result {
                warn!("Route of vehicle {} is infeasible: {}", vehicle, e);
            }
            RouteVerdict { vehicle, result }
        })
        .collect::<Vec<_>>();

    let coverage = graph.customers().iter().find_map(|c| {
        let p = graph.node(*c).physical;
        let customer = graph.physical(p).id.clone();
        match served[p] {
            0 => Some(FeasibilityViolation::CustomerUnserved { customer }),
            1 => None,
            count => Some(FeasibilityViolation::CustomerServedTwice { customer, count }),
        }
    });

    let verdict = Verdict { routes, coverage };
    debug!("Validated {} routes, feasible: {}", verdict.routes.len(), verdict.is_feasible());
    verdict
}

fn replay(graph: &Graph, route: &Route, tol: f64) -> Result<RouteMetrics, FeasibilityViolation> {
    let vehicle = route.vehicle;
    let class = &graph.vehicles()[vehicle];
    let depot = graph.depot();

    if let Some(node) = route.nodes().find(|n| *n >= graph.physical_nodes().len()) {
        return Err(FeasibilityViolation::UnknownNode { vehicle, node });
    }
    let visits = &route.visits;
    let anchored = visits.len() >= 2 && visits[0].node == depot && visits[visits.len() - 1].node == depot;
    if !anchored {
        return Err(FeasibilityViolation::NotAnchored { vehicle });
    }
    if visits[1..visits.len() - 1].iter().any(|v| v.node == depot) {
        return Err(FeasibilityViolation::DepotRevisited { vehicle });
    }

    let departure = graph.physical(depot).window.earliest;
    let mut metrics = RouteMetrics::default();
    let mut time = departure;
    let mut soc = class.battery_capacity;

    for (k, visit) in visits.iter().enumerate() {
        let spec = graph.physical(visit.node);

        if k > 0 {
            let prev = &visits[k - 1];
            let arc = graph.physical_arc(prev.node, visit.node);
            let energy = arc.energy_for(class);
            time += graph.physical(prev.node).service_time + arc.travel_time + prev.charged / class.charging_rate;
            soc -= energy;
            metrics.distance += arc.distance;
            metrics.energy += energy;

            if soc < -tol {
                return Err(FeasibilityViolation::BatteryDepleted {
                    vehicle,
                    node: spec.id.clone(),
                    soc,
                });
            }
            time = time.max(spec.window.earliest);
            if !spec.window.contains(time, tol) {
                return Err(FeasibilityViolation::TimeWindowMissed {
                    vehicle,
                    node: spec.id.clone(),
                    arrival: time,
                    latest: spec.window.latest,
                });
            }
        }

        metrics.load += spec.demand;
        if metrics.load > class.load_capacity + tol {
            return Err(FeasibilityViolation::CapacityExceeded {
                vehicle,
                node: spec.id.clone(),
                load: metrics.load,
                capacity: class.load_capacity,
            });
        }

        if visit.charged < -tol {
            return Err(FeasibilityViolation::NegativeCharge {
                vehicle,
                node: spec.id.clone(),
                amount: visit.charged,
            });
        }
        if visit.charged > tol && spec.role != NodeRole::ChargingStation {
            return Err(FeasibilityViolation::ChargeAtNonStation {
                vehicle,
                node: spec.id.clone(),
                amount: visit.charged,
            });
        }
        soc += visit.charged;
        metrics.charged += visit.charged;
        if soc > class.battery_capacity + tol {
            return Err(FeasibilityViolation::BatteryOvercharged {
                vehicle,
                node: spec.id.clone(),
                soc,
                capacity: class.battery_capacity,
            });
        }
    }

    metrics.duration = time - departure;
    Ok(metrics)
}
