use std::collections::HashMap;

use evrp_structs::problem::{ArcSpec, NodeRole, NodeSpec, Problem, TimeWindow, VehicleClass};
use log::{debug, trace};

use crate::error::{InvalidInstanceError, UnknownNodeError};

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum NodeKind {
    StartDepot,
    Customer,
    Station { copy: usize },
    EndDepot,
}

impl NodeKind {
    pub fn is_station(&self) -> bool {
        matches!(self, NodeKind::Station { .. })
    }

    pub fn is_customer(&self) -> bool {
        matches!(self, NodeKind::Customer)
    }
}

/// A node of the routing graph. Physical nodes may appear more than once:
/// the depot as start and end copy, stations once per allowed visit.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Index into `Problem::nodes`.
    pub physical: usize,
    pub label: String,
    pub demand: f64,
    pub window: TimeWindow,
    pub service_time: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ArcCost {
    pub distance: f64,
    pub travel_time: f64,
    /// Fixed energy for this arc, overriding the vehicle's consumption rate.
    pub energy: Option<f64>,
}

impl ArcCost {
    pub fn energy_for(&self, vehicle: &VehicleClass) -> f64 {
        self.energy.unwrap_or(vehicle.consumption_rate * self.distance)
    }
}

/// Immutable routing graph built from a validated instance.
///
/// Graph nodes are ordered `[start depot, customers.., station copies.., end depot]`.
#[derive(Debug, Clone)]
pub struct Graph {
    physical: Vec<NodeSpec>,
    index: HashMap<String, usize>,
    depot: usize,
    nodes: Vec<Node>,
    customers: Vec<usize>,
    stations: Vec<usize>,
    arcs: Vec<Vec<ArcCost>>,
    vehicles: Vec<VehicleClass>,
}

fn check_cost(a: &str, b: &str, cost: &'static str, value: f64) -> Result<(), InvalidInstanceError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InvalidInstanceError::InvalidArcCost {
            from: a.to_string(),
            to: b.to_string(),
            cost,
            value,
        })
    }
}

fn validate_nodes(problem: &Problem) -> Result<(HashMap<String, usize>, usize), InvalidInstanceError> {
    let mut index = HashMap::new();
    let mut depots = Vec::new();
    for (i, n) in problem.nodes.iter().enumerate() {
        if index.insert(n.id.clone(), i).is_some() {
            return Err(InvalidInstanceError::DuplicateNode(n.id.clone()));
        }
        if !(n.window.earliest.is_finite() && n.window.earliest <= n.window.latest) {
            return Err(InvalidInstanceError::InvertedWindow {
                node: n.id.clone(),
                earliest: n.window.earliest,
                latest: n.window.latest,
            });
        }
        if !(n.demand.is_finite() && n.demand >= 0.0) {
            return Err(InvalidInstanceError::InvalidDemand {
                node: n.id.clone(),
                demand: n.demand,
            });
        }
        if n.role != NodeRole::Customer && n.demand != 0.0 {
            return Err(InvalidInstanceError::DemandAtNonCustomer {
                node: n.id.clone(),
                role: n.role,
                demand: n.demand,
            });
        }
        if !(n.service_time.is_finite() && n.service_time >= 0.0) {
            return Err(InvalidInstanceError::InvalidServiceTime {
                node: n.id.clone(),
                service_time: n.service_time,
            });
        }
        if n.role == NodeRole::Depot {
            depots.push(i);
        }
    }

    match depots.as_slice() {
        [] => Err(InvalidInstanceError::MissingDepot),
        [depot] => Ok((index, *depot)),
        _ => Err(InvalidInstanceError::MultipleDepots(
            depots.iter().map(|d| problem.nodes[*d].id.clone()).collect(),
        )),
    }
}

fn validate_vehicles(vehicles: &[VehicleClass]) -> Result<(), InvalidInstanceError> {
    for (v, class) in vehicles.iter().enumerate() {
        let fields = [
            ("battery capacity", class.battery_capacity, class.battery_capacity > 0.0),
            ("consumption rate", class.consumption_rate, class.consumption_rate >= 0.0),
            ("load capacity", class.load_capacity, class.load_capacity >= 0.0),
            ("charging rate", class.charging_rate, class.charging_rate > 0.0),
        ];
        for (field, value, ok) in fields {
            if !(ok && value.is_finite()) {
                return Err(InvalidInstanceError::InvalidVehicle { vehicle: v, field, value });
            }
        }
    }
    Ok(())
}

fn build_arc_matrix(
    problem: &Problem,
    index: &HashMap<String, usize>,
) -> Result<Vec<Vec<ArcCost>>, InvalidInstanceError> {
    let lookup = |id: &str| index.get(id).copied().ok_or_else(|| UnknownNodeError(id.to_string()));

    let mut explicit: HashMap<(usize, usize), &ArcSpec> = HashMap::new();
    for arc in problem.arcs.iter() {
        let (a, b) = (lookup(&arc.from)?, lookup(&arc.to)?);
        if a == b {
            return Err(InvalidInstanceError::SelfLoop(arc.from.clone()));
        }
        check_cost(&arc.from, &arc.to, "distance", arc.distance)?;
        if let Some(t) = arc.travel_time {
            check_cost(&arc.from, &arc.to, "travel time", t)?;
        }
        if let Some(e) = arc.energy {
            check_cost(&arc.from, &arc.to, "energy", e)?;
        }
        explicit.insert((a, b), arc);
    }

    let n = problem.nodes.len();
    let mut arcs = vec![vec![ArcCost::default(); n]; n];
    for (a, na) in problem.nodes.iter().enumerate() {
        for (b, nb) in problem.nodes.iter().enumerate() {
            if a == b {
                continue;
            }
            arcs[a][b] = if let Some(spec) = explicit.get(&(a, b)) {
                ArcCost {
                    distance: spec.distance,
                    travel_time: spec.travel_time.unwrap_or(spec.distance / problem.velocity),
                    energy: spec.energy,
                }
            } else if let (Some(pa), Some(pb)) = (na.loc, nb.loc) {
                let distance = pa.dist(&pb);
                ArcCost {
                    distance,
                    travel_time: distance / problem.velocity,
                    energy: None,
                }
            } else {
                return Err(InvalidInstanceError::MissingArc {
                    from: na.id.clone(),
                    to: nb.id.clone(),
                });
            };
            trace!("arc {} -> {} {:?}", na.id, nb.id, arcs[a][b]);
        }
    }
    Ok(arcs)
}

impl Graph {
    pub fn new(problem: &Problem, station_copies: usize) -> Result<Self, InvalidInstanceError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("graph");

        if !(problem.velocity.is_finite() && problem.velocity > 0.0) {
            return Err(InvalidInstanceError::InvalidVelocity(problem.velocity));
        }
        let (index, depot) = validate_nodes(problem)?;
        validate_vehicles(&problem.vehicles)?;
        let arcs = build_arc_matrix(problem, &index)?;

        let mk_node = |kind: NodeKind, p: usize, label: String| {
            let spec = &problem.nodes[p];
            Node {
                kind,
                physical: p,
                label,
                demand: spec.demand,
                window: spec.window,
                service_time: spec.service_time,
            }
        };

        let depot_id = &problem.nodes[depot].id;
        let mut nodes = vec![mk_node(NodeKind::StartDepot, depot, depot_id.clone())];
        let mut customers = Vec::new();
        for (p, spec) in problem.nodes.iter().enumerate() {
            if spec.role == NodeRole::Customer {
                customers.push(nodes.len());
                nodes.push(mk_node(NodeKind::Customer, p, spec.id.clone()));
            }
        }
        let mut stations = Vec::new();
        for copy in 0..station_copies {
            for (p, spec) in problem.nodes.iter().enumerate() {
                if spec.role == NodeRole::ChargingStation {
                    let label = if copy == 0 {
                        spec.id.clone()
                    } else {
                        format!("{}/{}", spec.id, copy)
                    };
                    stations.push(nodes.len());
                    nodes.push(mk_node(NodeKind::Station { copy }, p, label));
                }
            }
        }
        nodes.push(mk_node(NodeKind::EndDepot, depot, format!("{}/end", depot_id)));

        debug!(
            "Constructed graph with {} nodes ({} customers, {} station visits) for {} vehicles",
            nodes.len(),
            customers.len(),
            stations.len(),
            problem.vehicles.len()
        );

        Ok(Graph {
            physical: problem.nodes.clone(),
            index,
            depot,
            nodes,
            customers,
            stations,
            arcs,
            vehicles: problem.vehicles.clone(),
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, i: usize) -> &Node {
        &self.nodes[i]
    }

    pub fn label(&self, i: usize) -> &str {
        &self.nodes[i].label
    }

    pub fn start_depot(&self) -> usize {
        0
    }

    pub fn end_depot(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Graph indices of the customers.
    pub fn customers(&self) -> &[usize] {
        &self.customers
    }

    /// Graph indices of all station copies.
    pub fn stations(&self) -> &[usize] {
        &self.stations
    }

    pub fn vehicles(&self) -> &[VehicleClass] {
        &self.vehicles
    }

    pub fn window(&self, i: usize) -> TimeWindow {
        self.nodes[i].window
    }

    pub fn demand(&self, i: usize) -> f64 {
        self.nodes[i].demand
    }

    pub fn service_time(&self, i: usize) -> f64 {
        self.nodes[i].service_time
    }

    /// Physical depot index.
    pub fn depot(&self) -> usize {
        self.depot
    }

    pub fn physical_nodes(&self) -> &[NodeSpec] {
        &self.physical
    }

    pub fn physical(&self, p: usize) -> &NodeSpec {
        &self.physical[p]
    }

    pub fn node_index(&self, id: &str) -> Result<usize, UnknownNodeError> {
        self.index.get(id).copied().ok_or_else(|| UnknownNodeError(id.to_string()))
    }

    pub fn arc(&self, from: &str, to: &str) -> Result<ArcCost, UnknownNodeError> {
        let (a, b) = (self.node_index(from)?, self.node_index(to)?);
        Ok(self.arcs[a][b])
    }

    pub fn physical_arc(&self, a: usize, b: usize) -> &ArcCost {
        &self.arcs[a][b]
    }

    /// Arc between two graph nodes.
    pub fn arc_between(&self, i: usize, j: usize) -> &ArcCost {
        &self.arcs[self.nodes[i].physical][self.nodes[j].physical]
    }

    pub fn energy(&self, vehicle: usize, i: usize, j: usize) -> f64 {
        self.arc_between(i, j).energy_for(&self.vehicles[vehicle])
    }

    /// All-pairs shortest travel times between physical nodes, ignoring
    /// service and charging. A lower bound on any real trip duration.
    pub fn shortest_travel_times(&self) -> Vec<Vec<f64>> {
        let n = self.physical.len();
        let mut d = (0..n)
            .map(|a| (0..n).map(|b| self.arcs[a][b].travel_time).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        for k in 0..n {
            for a in 0..n {
                for b in 0..n {
                    let via = d[a][k] + d[k][b];
                    if via < d[a][b] {
                        d[a][b] = via;
                    }
                }
            }
        }
        d
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use evrp_structs::{problem::ArcSpec, Point};

    use super::*;

    pub fn pt(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    pub fn class(battery: f64, load: f64) -> VehicleClass {
        VehicleClass {
            battery_capacity: battery,
            consumption_rate: 1.0,
            load_capacity: load,
            charging_rate: 1.0,
        }
    }

    /// Depot at the origin, two customers with demand 5 and 7.
    pub fn two_customers(vehicles: usize, capacity: f64) -> Problem {
        Problem {
            name: "two".to_string(),
            nodes: vec![
                NodeSpec::depot("D0", pt(0.0, 0.0)),
                NodeSpec::customer("C1", pt(10.0, 0.0), 5.0),
                NodeSpec::customer("C2", pt(0.0, 10.0), 7.0),
            ],
            arcs: Vec::new(),
            vehicles: class(1000.0, capacity).fleet(vehicles),
            velocity: 1.0,
        }
    }

    /// Battery 50; the direct arc to the customer is 60 long, so the vehicle
    /// has to recharge at S1 on the way out. The way back is a 20 long road.
    pub fn charging_detour() -> Problem {
        let arcs = [
            ("D0", "S1", 30.0),
            ("S1", "D0", 30.0),
            ("S1", "C1", 30.0),
            ("C1", "S1", 30.0),
            ("D0", "C1", 60.0),
            ("C1", "D0", 20.0),
        ]
        .iter()
        .map(|(a, b, d)| ArcSpec::new(a, b, *d))
        .collect();
        Problem {
            name: "detour".to_string(),
            nodes: vec![
                NodeSpec::depot("D0", pt(0.0, 0.0)).without_loc(),
                NodeSpec::customer("C1", pt(0.0, 0.0), 4.0).without_loc(),
                NodeSpec::station("S1", pt(0.0, 0.0)).without_loc(),
            ],
            arcs,
            vehicles: class(50.0, 10.0).fleet(1),
            velocity: 1.0,
        }
    }

    #[test]
    pub fn node_layout_and_copies() {
        let mut p = charging_detour();
        p.nodes.push(NodeSpec::station("S2", pt(0.0, 0.0)).without_loc());
        for other in ["D0", "S1", "C1"] {
            p.arcs.push(ArcSpec::new("S2", other, 5.0));
            p.arcs.push(ArcSpec::new(other, "S2", 5.0));
        }
        let g = Graph::new(&p, 2).unwrap();
        let labels = g.nodes().iter().map(|n| n.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["D0", "C1", "S1", "S2", "S1/1", "S2/1", "D0/end"]);
        assert_eq!(g.customers(), &[1]);
        assert_eq!(g.stations(), &[2, 3, 4, 5]);
        assert_eq!(g.node(4).kind, NodeKind::Station { copy: 1 });
        assert_eq!(g.node(g.end_depot()).physical, g.depot());
        assert_eq!(g.node(g.start_depot()).kind, NodeKind::StartDepot);
    }

    #[test]
    pub fn derives_arcs_from_coordinates() {
        let mut p = two_customers(1, 10.0);
        p.velocity = 2.0;
        let g = Graph::new(&p, 1).unwrap();
        let arc = g.arc("C1", "C2").unwrap();
        assert!((arc.distance - 200f64.sqrt()).abs() < 1e-9);
        assert!((arc.travel_time - 200f64.sqrt() / 2.0).abs() < 1e-9);
        assert!((g.energy(0, 1, 2) - 200f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    pub fn explicit_arcs_override() {
        let mut p = charging_detour();
        p.arcs[0].energy = Some(12.0);
        p.arcs[0].travel_time = Some(7.0);
        let g = Graph::new(&p, 1).unwrap();
        let arc = g.arc("D0", "S1").unwrap();
        assert_eq!(arc, ArcCost { distance: 30.0, travel_time: 7.0, energy: Some(12.0) });
        assert_eq!(g.arc("C1", "D0").unwrap().distance, 20.0);
        assert_eq!(g.arc("D0", "C1").unwrap().distance, 60.0);
    }

    #[test]
    pub fn unknown_node_lookup_fails() {
        let g = Graph::new(&two_customers(1, 10.0), 1).unwrap();
        assert_eq!(g.arc("D0", "C9"), Err(UnknownNodeError("C9".to_string())));
        assert_eq!(g.node_index("X").unwrap_err(), UnknownNodeError("X".to_string()));
    }

    #[test]
    pub fn rejects_inverted_window() {
        let mut p = two_customers(1, 10.0);
        p.nodes[2].window = TimeWindow::new(10.0, 5.0);
        assert!(matches!(
            Graph::new(&p, 1),
            Err(InvalidInstanceError::InvertedWindow { node, .. }) if node == "C2"
        ));
    }

    #[test]
    pub fn rejects_negative_demand() {
        let mut p = two_customers(1, 10.0);
        p.nodes[1].demand = -1.0;
        assert!(matches!(Graph::new(&p, 1), Err(InvalidInstanceError::InvalidDemand { .. })));
    }

    #[test]
    pub fn rejects_negative_arc_cost() {
        let mut p = charging_detour();
        p.arcs[2].distance = -3.0;
        assert_eq!(
            Graph::new(&p, 1).unwrap_err(),
            InvalidInstanceError::InvalidArcCost {
                from: "S1".to_string(),
                to: "C1".to_string(),
                cost: "distance",
                value: -3.0
            }
        );
    }

    #[test]
    pub fn rejects_arc_to_unknown_node() {
        let mut p = charging_detour();
        p.arcs.push(ArcSpec::new("D0", "nowhere", 1.0));
        assert_eq!(
            Graph::new(&p, 1).unwrap_err(),
            InvalidInstanceError::UnknownArcEndpoint(UnknownNodeError("nowhere".to_string()))
        );
    }

    #[test]
    pub fn rejects_missing_arc_without_coordinates() {
        let mut p = charging_detour();
        p.arcs.retain(|a| !(a.from == "C1" && a.to == "D0"));
        assert!(matches!(Graph::new(&p, 1), Err(InvalidInstanceError::MissingArc { .. })));
    }

    #[test]
    pub fn rejects_depot_count() {
        let mut p = two_customers(1, 10.0);
        p.nodes[0].role = NodeRole::Customer;
        assert_eq!(Graph::new(&p, 1).unwrap_err(), InvalidInstanceError::MissingDepot);

        let mut p = two_customers(1, 10.0);
        p.nodes[1].role = NodeRole::Depot;
        p.nodes[1].demand = 0.0;
        assert!(matches!(Graph::new(&p, 1), Err(InvalidInstanceError::MultipleDepots(_))));
    }

    #[test]
    pub fn rejects_duplicate_ids_and_bad_vehicles() {
        let mut p = two_customers(1, 10.0);
        p.nodes[2].id = "C1".to_string();
        assert_eq!(Graph::new(&p, 1).unwrap_err(), InvalidInstanceError::DuplicateNode("C1".to_string()));

        let mut p = two_customers(1, 10.0);
        p.vehicles[0].charging_rate = 0.0;
        assert!(matches!(
            Graph::new(&p, 1),
            Err(InvalidInstanceError::InvalidVehicle { vehicle: 0, field: "charging rate", .. })
        ));
    }

    #[test]
    pub fn shortest_times_use_detours() {
        let mut p = charging_detour();
        p.arcs.iter_mut().find(|a| a.from == "D0" && a.to == "C1").unwrap().distance = 100.0;
        let g = Graph::new(&p, 1).unwrap();
        let sp = g.shortest_travel_times();
        let (d, c) = (g.node_index("D0").unwrap(), g.node_index("C1").unwrap());
        assert_eq!(sp[d][c], 60.0);
        assert_eq!(sp[c][d], 20.0);
    }
}
