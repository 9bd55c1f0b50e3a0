use log::{debug, trace};
use ordered_float::OrderedFloat;

use crate::{
    config::{BigM, PlannerConfig},
    error::ModelConstructionError,
    graph::Graph,
    model::{Model, Var},
};

const SLACK: f64 = 1e-9;

/// Variables of one vehicle, indexed by graph node.
#[derive(Debug, Clone)]
pub struct VehicleVars {
    /// `(from, to, x)` for every arc the vehicle may use.
    pub arcs: Vec<(usize, usize, Var)>,
    /// Service start time.
    pub time: Vec<Var>,
    /// State of charge on arrival.
    pub soc: Vec<Var>,
    /// Energy charged, for station copies only.
    pub charge: Vec<Option<Var>>,
}

impl VehicleVars {
    pub fn arc(&self, i: usize, j: usize) -> Option<Var> {
        self.arcs.iter().find(|(a, b, _)| *a == i && *b == j).map(|(_, _, x)| *x)
    }

    fn adjacency(&self, n: usize) -> (Vec<Vec<Var>>, Vec<Vec<Var>>) {
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];
        for (i, j, x) in self.arcs.iter() {
            outgoing[*i].push(*x);
            incoming[*j].push(*x);
        }
        (outgoing, incoming)
    }
}

/// The abstract program together with the meaning of its variables.
#[derive(Debug, Clone)]
pub struct EvrpModel {
    pub model: Model,
    pub vehicles: Vec<VehicleVars>,
    /// Latest service start any earliest-start schedule can need.
    pub horizon: f64,
}

/// Cheap structural checks, run before anything is handed to a solver.
pub fn precheck(graph: &Graph) -> Result<(), ModelConstructionError> {
    let vehicles = graph.vehicles();
    if vehicles.is_empty() {
        return Err(ModelConstructionError::NoVehicles);
    }

    let demand: f64 = graph.customers().iter().map(|c| graph.demand(*c)).sum();
    let capacity: f64 = vehicles.iter().map(|v| v.load_capacity).sum();
    if demand > capacity + SLACK {
        return Err(ModelConstructionError::InsufficientFleetCapacity { demand, capacity });
    }

    let largest = vehicles
        .iter()
        .map(|v| OrderedFloat(v.load_capacity))
        .max()
        .map(|c| c.0)
        .unwrap_or(0.0);
    if let Some(c) = graph.customers().iter().find(|c| graph.demand(**c) > largest + SLACK) {
        return Err(ModelConstructionError::CustomerExceedsCapacity {
            customer: graph.label(*c).to_string(),
            demand: graph.demand(*c),
            capacity: largest,
        });
    }

    let start = graph.start_depot();
    let depot = graph.depot();
    let depot_window = graph.window(start);
    let shortest = graph.shortest_travel_times();
    let leave_depot = depot_window.earliest + graph.service_time(start);
    for c in graph.customers().iter().copied() {
        let p = graph.node(c).physical;
        let window = graph.window(c);
        let earliest_arrival = leave_depot + shortest[depot][p];
        if earliest_arrival > window.latest + SLACK {
            return Err(ModelConstructionError::UnreachableCustomer {
                customer: graph.label(c).to_string(),
                earliest_arrival,
                latest: window.latest,
            });
        }
        let earliest_return = earliest_arrival.max(window.earliest) + graph.service_time(c) + shortest[p][depot];
        if earliest_return > depot_window.latest + SLACK {
            return Err(ModelConstructionError::NoReturn {
                customer: graph.label(c).to_string(),
                earliest_return,
                depot_closes: depot_window.latest,
            });
        }
    }
    Ok(())
}

fn max_dwell(graph: &Graph) -> f64 {
    graph
        .vehicles()
        .iter()
        .map(|v| OrderedFloat(v.battery_capacity / v.charging_rate))
        .max()
        .map(|d| d.0)
        .unwrap_or(0.0)
}

/// Bound on service start times: every node is visited at most once, so an
/// earliest-start schedule never needs more than the latest opening time plus
/// one service, one longest departing trip and one full recharge per node.
fn time_horizon(graph: &Graph, config: &PlannerConfig) -> f64 {
    let n = graph.nodes().len();
    let latest_opening = graph
        .nodes()
        .iter()
        .map(|node| OrderedFloat(node.window.earliest))
        .max()
        .map(|t| t.0)
        .unwrap_or(0.0);
    let travel: f64 = (0..graph.end_depot())
        .map(|i| {
            let longest = (0..n)
                .filter(|j| *j != i)
                .map(|j| OrderedFloat(graph.arc_between(i, j).travel_time))
                .max()
                .map(|t| t.0)
                .unwrap_or(0.0);
            graph.service_time(i) + longest.max(config.cycle_epsilon)
        })
        .sum();
    let dwell = graph.stations().len() as f64 * max_dwell(graph);
    (latest_opening + travel + dwell).min(graph.window(graph.end_depot()).latest)
}

fn arc_allowed(graph: &Graph, vehicle: usize, i: usize, j: usize) -> bool {
    let (start, end) = (graph.start_depot(), graph.end_depot());
    if i == j || i == end || j == start || (i == start && j == end) {
        return false;
    }
    let (ni, nj) = (graph.node(i), graph.node(j));
    if ni.kind.is_station() && nj.kind.is_station() && ni.physical == nj.physical {
        return false;
    }
    let arc = graph.arc_between(i, j);
    if ni.window.earliest + ni.service_time + arc.travel_time > nj.window.latest + SLACK {
        trace!("v{} drop {} -> {}: window closes", vehicle, ni.label, nj.label);
        return false;
    }
    if graph.energy(vehicle, i, j) > graph.vehicles()[vehicle].battery_capacity + SLACK {
        trace!("v{} drop {} -> {}: beyond battery range", vehicle, ni.label, nj.label);
        return false;
    }
    true
}

fn arc_duration(graph: &Graph, config: &PlannerConfig, i: usize, j: usize) -> f64 {
    (graph.service_time(i) + graph.arc_between(i, j).travel_time).max(config.cycle_epsilon)
}

/// Builds the three-index EVRP-TW formulation: one binary per vehicle and
/// arc, service start times and states of charge per vehicle and node, and
/// a charged amount per vehicle and station copy.
pub fn build_model(graph: &Graph, config: &PlannerConfig) -> Result<EvrpModel, ModelConstructionError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("build model");

    precheck(graph)?;

    let n = graph.nodes().len();
    let start = graph.start_depot();
    let horizon = time_horizon(graph, config);
    let w = &config.weights;
    let mut model = Model::new();

    let mut vehicles = Vec::new();
    for (v, class) in graph.vehicles().iter().enumerate() {
        let capacity = class.battery_capacity;

        let mut arcs = Vec::new();
        for i in 0..n {
            for j in (0..n).filter(|j| arc_allowed(graph, v, i, *j)) {
                let arc = graph.arc_between(i, j);
                let mut cost =
                    w.distance * arc.distance + w.time * arc.travel_time + w.energy * graph.energy(v, i, j);
                if i == start {
                    cost += w.vehicles;
                }
                let name = format!("x_{}_{}_{}", v, graph.label(i), graph.label(j));
                arcs.push((i, j, model.binary(name, cost)));
            }
        }

        let time = (0..n)
            .map(|i| {
                let tw = graph.window(i);
                let ub = tw.latest.min(horizon).max(tw.earliest);
                model.continuous(format!("t_{}_{}", v, graph.label(i)), tw.earliest, ub)
            })
            .collect();
        let soc = (0..n)
            .map(|i| {
                let lb = if i == start { capacity } else { 0.0 };
                model.continuous(format!("soc_{}_{}", v, graph.label(i)), lb, capacity)
            })
            .collect();
        let charge = (0..n)
            .map(|i| {
                graph
                    .node(i)
                    .kind
                    .is_station()
                    .then(|| model.continuous(format!("q_{}_{}", v, graph.label(i)), 0.0, capacity))
            })
            .collect();

        vehicles.push(VehicleVars { arcs, time, soc, charge });
    }

    let adjacency = vehicles.iter().map(|vars| vars.adjacency(n)).collect::<Vec<_>>();

    add_routing_constraints(&mut model, graph, config, &adjacency);
    add_time_constraints(&mut model, graph, config, &vehicles);
    add_soc_constraints(&mut model, graph, config, &vehicles);
    add_charging_constraints(&mut model, graph, &vehicles, &adjacency);
    add_load_constraints(&mut model, graph, &adjacency);

    debug!(
        "Built model with {} variables ({} arcs) and {} constraints, horizon {:.2}",
        model.num_vars(),
        vehicles.iter().map(|v| v.arcs.len()).sum::<usize>(),
        model.constraints().len(),
        horizon
    );

    Ok(EvrpModel {
        model,
        vehicles,
        horizon,
    })
}

type Adjacency = (Vec<Vec<Var>>, Vec<Vec<Var>>);

fn add_routing_constraints(model: &mut Model, graph: &Graph, config: &PlannerConfig, adjacency: &[Adjacency]) {
    let n = graph.nodes().len();
    let (start, end) = (graph.start_depot(), graph.end_depot());

    for (v, (outgoing, incoming)) in adjacency.iter().enumerate() {
        for j in (0..n).filter(|j| *j != start && *j != end) {
            let terms = incoming[j]
                .iter()
                .map(|x| (*x, 1.0))
                .chain(outgoing[j].iter().map(|x| (*x, -1.0)))
                .collect();
            model.add_eq(format!("flow_{}_{}", v, graph.label(j)), terms, 0.0);
        }

        let dispatch = outgoing[start].iter().map(|x| (*x, 1.0)).collect::<Vec<_>>();
        model.add_le(format!("dispatch_{}", v), dispatch.clone(), 1.0);
        let returns = incoming[end]
            .iter()
            .map(|x| (*x, 1.0))
            .chain(dispatch.iter().map(|(x, _)| (*x, -1.0)))
            .collect();
        model.add_eq(format!("return_{}", v), returns, 0.0);
    }

    let leaving = |i: usize, coeff: f64| {
        adjacency
            .iter()
            .flat_map(move |(outgoing, _)| outgoing[i].iter().map(move |x| (*x, coeff)))
            .collect::<Vec<_>>()
    };

    for c in graph.customers().iter().copied() {
        model.add_eq(format!("serve_{}", graph.label(c)), leaving(c, 1.0), 1.0);
    }

    // Each copy of a station is left at most once per route, and copy k+1 is
    // only used on a route that also uses copy k.
    let stations = graph.stations();
    for (v, (outgoing, _)) in adjacency.iter().enumerate() {
        let departures = move |i: usize, coeff: f64| outgoing[i].iter().map(move |x| (*x, coeff));
        for (k, f) in stations.iter().copied().enumerate() {
            let copy = graph.node(f);
            model.add_le(format!("station_{}_{}", v, copy.label), departures(f, 1.0).collect(), 1.0);
            let previous = stations[..k]
                .iter()
                .rev()
                .find(|g| graph.node(**g).physical == copy.physical);
            if let Some(g) = previous {
                let terms = departures(f, 1.0).chain(departures(*g, -1.0)).collect();
                model.add_le(format!("station_order_{}_{}", v, copy.label), terms, 0.0);
            }
        }
    }

    if config.symmetry_breaking {
        let classes = graph.vehicles();
        for v in 1..adjacency.len() {
            if classes[v] != classes[v - 1] {
                continue;
            }
            let terms = adjacency[v].0[start]
                .iter()
                .map(|x| (*x, 1.0))
                .chain(adjacency[v - 1].0[start].iter().map(|x| (*x, -1.0)))
                .collect();
            model.add_le(format!("symmetry_{}", v), terms, 0.0);
        }
    }
}

/// `t_j >= t_i + s_i + t_ij + q_i / r` when arc `(i, j)` is used.
///
/// Every arc lengthens the schedule by a positive amount, so no cycle that
/// avoids the depot can be timed consistently.
fn add_time_constraints(model: &mut Model, graph: &Graph, config: &PlannerConfig, vehicles: &[VehicleVars]) {
    let n = graph.nodes().len();
    let global = {
        let latest_start = vehicles
            .iter()
            .flat_map(|vars| vars.time.iter())
            .map(|t| OrderedFloat(model.var(*t).ub))
            .max()
            .map(|t| t.0)
            .unwrap_or(0.0);
        let first_opening = graph
            .nodes()
            .iter()
            .map(|node| OrderedFloat(node.window.earliest))
            .min()
            .map(|t| t.0)
            .unwrap_or(0.0);
        let longest = (0..n)
            .flat_map(|i| (0..n).filter(move |j| *j != i).map(move |j| (i, j)))
            .map(|(i, j)| OrderedFloat(arc_duration(graph, config, i, j)))
            .max()
            .map(|d| d.0)
            .unwrap_or(0.0);
        latest_start - first_opening + longest + max_dwell(graph)
    };

    for (v, vars) in vehicles.iter().enumerate() {
        let class = &graph.vehicles()[v];
        for (i, j, x) in vars.arcs.iter().copied() {
            let duration = arc_duration(graph, config, i, j);
            let dwell = if graph.node(i).kind.is_station() {
                class.battery_capacity / class.charging_rate
            } else {
                0.0
            };
            let m = match config.big_m {
                BigM::Tight => model.var(vars.time[i]).ub + duration + dwell - graph.window(j).earliest,
                BigM::Global => global,
            }
            .max(0.0);

            let mut terms = vec![(vars.time[i], 1.0), (vars.time[j], -1.0), (x, m)];
            if let Some(q) = vars.charge[i] {
                terms.push((q, 1.0 / class.charging_rate));
            }
            model.add_le(format!("time_{}_{}_{}", v, graph.label(i), graph.label(j)), terms, m - duration);
        }
    }
}

/// `soc_j = soc_i + q_i - e_ij` when arc `(i, j)` is used, as two inequalities.
fn add_soc_constraints(model: &mut Model, graph: &Graph, config: &PlannerConfig, vehicles: &[VehicleVars]) {
    for (v, vars) in vehicles.iter().enumerate() {
        let capacity = graph.vehicles()[v].battery_capacity;
        let max_energy = vars
            .arcs
            .iter()
            .map(|(i, j, _)| OrderedFloat(graph.energy(v, *i, *j)))
            .max()
            .map(|e| e.0)
            .unwrap_or(0.0);

        for (i, j, x) in vars.arcs.iter().copied() {
            let energy = graph.energy(v, i, j);
            let (m_up, m_down) = match config.big_m {
                BigM::Tight => (capacity + energy, capacity - energy),
                BigM::Global => (capacity + max_energy, capacity + max_energy),
            };
            let (li, lj) = (graph.label(i), graph.label(j));

            let mut up = vec![(vars.soc[j], 1.0), (vars.soc[i], -1.0), (x, m_up)];
            let mut down = vec![(vars.soc[i], 1.0), (vars.soc[j], -1.0), (x, m_down)];
            if let Some(q) = vars.charge[i] {
                up.push((q, -1.0));
                down.push((q, 1.0));
            }
            model.add_le(format!("soc_up_{}_{}_{}", v, li, lj), up, m_up - energy);
            model.add_le(format!("soc_down_{}_{}_{}", v, li, lj), down, m_down + energy);
        }
    }
}

/// Charging never overfills the battery and only happens at visited copies.
fn add_charging_constraints(model: &mut Model, graph: &Graph, vehicles: &[VehicleVars], adjacency: &[Adjacency]) {
    for (v, vars) in vehicles.iter().enumerate() {
        let capacity = graph.vehicles()[v].battery_capacity;
        for f in graph.stations().iter().copied() {
            let Some(q) = vars.charge[f] else { continue };
            let label = graph.label(f);
            model.add_le(
                format!("charge_cap_{}_{}", v, label),
                vec![(vars.soc[f], 1.0), (q, 1.0)],
                capacity,
            );
            let mut link = vec![(q, 1.0)];
            link.extend(adjacency[v].0[f].iter().map(|x| (*x, -capacity)));
            model.add_le(format!("charge_link_{}_{}", v, label), link, 0.0);
        }
    }
}

/// Aggregate demand of the customers a vehicle leaves is within its capacity.
fn add_load_constraints(model: &mut Model, graph: &Graph, adjacency: &[Adjacency]) {
    for (v, (outgoing, _)) in adjacency.iter().enumerate() {
        let terms = graph
            .customers()
            .iter()
            .flat_map(|c| outgoing[*c].iter().map(|x| (*x, graph.demand(*c))))
            .collect();
        model.add_le(format!("load_{}", v), terms, graph.vehicles()[v].load_capacity);
    }
}

/// Assignment that drives each listed vehicle along `path` with the given
/// per-visit charges, using earliest-start times. Everything else sits at
/// its lower bound.
#[cfg(test)]
pub(crate) fn route_assignment(
    graph: &Graph,
    evrp: &EvrpModel,
    config: &PlannerConfig,
    routes: &[(usize, Vec<usize>, Vec<f64>)],
) -> crate::model::Assignment {
    let mut values = evrp.model.vars().iter().map(|d| d.lb).collect::<Vec<_>>();
    for (v, path, charges) in routes {
        let vars = &evrp.vehicles[*v];
        let class = graph.vehicles()[*v];
        let mut t = graph.window(path[0]).earliest;
        let mut soc = class.battery_capacity;
        for (k, i) in path.iter().copied().enumerate() {
            if k > 0 {
                let p = path[k - 1];
                let x = vars.arc(p, i).expect("arc missing from model");
                values[x.idx()] = 1.0;
                t = (t + arc_duration(graph, config, p, i) + charges[k - 1] / class.charging_rate)
                    .max(graph.window(i).earliest);
                soc += charges[k - 1] - graph.energy(*v, p, i);
            }
            values[vars.time[i].idx()] = t;
            values[vars.soc[i].idx()] = soc;
            if let Some(q) = vars.charge[i] {
                values[q.idx()] = charges[k];
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use evrp_structs::problem::{ArcSpec, NodeSpec, Problem, TimeWindow};

    use super::*;
    use crate::graph::tests::{charging_detour, class, pt, two_customers};

    fn graph(p: &Problem) -> Graph {
        Graph::new(p, 1).unwrap()
    }

    fn single_customer(window: TimeWindow, distance: f64) -> Problem {
        Problem {
            name: "single".to_string(),
            nodes: vec![
                NodeSpec::depot("D0", pt(0.0, 0.0)),
                NodeSpec::customer("C1", pt(distance, 0.0), 1.0).with_window(window.earliest, window.latest),
            ],
            arcs: Vec::new(),
            vehicles: class(1000.0, 10.0).fleet(1),
            velocity: 1.0,
        }
    }

    fn at(g: &Graph, label: &str) -> usize {
        (0..g.nodes().len()).find(|i| g.label(*i) == label).unwrap()
    }

    /// Two customers behind the same station, too heavy to share a vehicle.
    fn shared_station() -> Problem {
        let mut p = charging_detour();
        p.nodes.push(NodeSpec::customer("C2", pt(0.0, 0.0), 4.0).without_loc());
        for (a, b, d) in [
            ("S1", "C2", 30.0),
            ("C2", "S1", 30.0),
            ("D0", "C2", 60.0),
            ("C2", "D0", 20.0),
            ("C1", "C2", 60.0),
            ("C2", "C1", 60.0),
        ] {
            p.arcs.push(ArcSpec::new(a, b, d));
        }
        p.vehicles = class(50.0, 6.0).fleet(2);
        p
    }

    #[test]
    pub fn rejects_empty_fleet() {
        let g = graph(&two_customers(0, 10.0));
        assert_eq!(precheck(&g), Err(ModelConstructionError::NoVehicles));
    }

    #[test]
    pub fn rejects_demand_above_fleet_capacity() {
        let g = graph(&two_customers(1, 10.0));
        assert_eq!(
            build_model(&g, &PlannerConfig::default()).unwrap_err(),
            ModelConstructionError::InsufficientFleetCapacity {
                demand: 12.0,
                capacity: 10.0
            }
        );
    }

    #[test]
    pub fn rejects_customer_above_every_capacity() {
        let g = graph(&two_customers(2, 6.0));
        assert!(matches!(
            precheck(&g),
            Err(ModelConstructionError::CustomerExceedsCapacity { customer, .. }) if customer == "C2"
        ));
    }

    #[test]
    pub fn rejects_unreachable_window() {
        let g = graph(&single_customer(TimeWindow::new(100.0, 100.0), 200.0));
        assert_eq!(
            precheck(&g),
            Err(ModelConstructionError::UnreachableCustomer {
                customer: "C1".to_string(),
                earliest_arrival: 200.0,
                latest: 100.0
            })
        );
    }

    #[test]
    pub fn rejects_customer_without_return() {
        let mut p = single_customer(TimeWindow::default(), 200.0);
        p.nodes[0].window = TimeWindow::new(0.0, 300.0);
        assert!(matches!(
            precheck(&graph(&p)),
            Err(ModelConstructionError::NoReturn { earliest_return, .. }) if earliest_return == 400.0
        ));
    }

    #[test]
    pub fn separate_routes_satisfy_model() {
        let _ = env_logger::try_init();
        let g = graph(&two_customers(2, 10.0));
        let config = PlannerConfig::default();
        for big_m in [BigM::Tight, BigM::Global] {
            let config = PlannerConfig { big_m, ..config.clone() };
            let m = build_model(&g, &config).unwrap();
            let end = g.end_depot();
            let values = route_assignment(
                &g,
                &m,
                &config,
                &[(0, vec![0, 1, end], vec![0.0; 3]), (1, vec![0, 2, end], vec![0.0; 3])],
            );
            assert_eq!(m.model.first_violation(&values, 1e-6), None);
            assert!((m.model.objective_value(&values) - 40.0).abs() < 1e-9);
        }
    }

    #[test]
    pub fn combined_route_breaks_load() {
        let g = graph(&two_customers(2, 10.0));
        let config = PlannerConfig::default();
        let m = build_model(&g, &config).unwrap();
        let values = route_assignment(&g, &m, &config, &[(0, vec![0, 1, 2, g.end_depot()], vec![0.0; 4])]);
        assert_eq!(m.model.first_violation(&values, 1e-6).as_deref(), Some("load_0"));
    }

    #[test]
    pub fn second_vehicle_alone_breaks_symmetry() {
        let g = graph(&two_customers(2, 20.0));
        let config = PlannerConfig::default();
        let m = build_model(&g, &config).unwrap();
        let values = route_assignment(&g, &m, &config, &[(1, vec![0, 1, 2, g.end_depot()], vec![0.0; 4])]);
        assert_eq!(m.model.first_violation(&values, 1e-6).as_deref(), Some("symmetry_1"));

        let config = PlannerConfig {
            symmetry_breaking: false,
            ..config
        };
        let m = build_model(&g, &config).unwrap();
        let values = route_assignment(&g, &m, &config, &[(1, vec![0, 1, 2, g.end_depot()], vec![0.0; 4])]);
        assert_eq!(m.model.first_violation(&values, 1e-6), None);
    }

    #[test]
    pub fn detached_cycle_breaks_time_propagation() {
        let mut p = two_customers(2, 20.0);
        p.nodes.push(NodeSpec::customer("C3", pt(10.0, 10.0), 1.0));
        let g = graph(&p);
        let config = PlannerConfig::default();
        let m = build_model(&g, &config).unwrap();
        let end = g.end_depot();
        let mut values = route_assignment(&g, &m, &config, &[(0, vec![0, 1, end], vec![0.0; 3])]);
        let vars = &m.vehicles[1];
        for (i, j) in [(2, 3), (3, 2)] {
            values[vars.arc(i, j).unwrap().idx()] = 1.0;
        }
        let violation = m.model.first_violation(&values, 1e-6).unwrap();
        assert!(violation.starts_with("time_1_"), "{}", violation);
    }

    #[test]
    pub fn charging_route_satisfies_model() {
        let g = graph(&charging_detour());
        let config = PlannerConfig::default();
        let m = build_model(&g, &config).unwrap();
        let (d, c, s, end) = (0, 1, 2, g.end_depot());
        assert_eq!(g.label(s), "S1");
        assert!(m.vehicles[0].arc(d, c).is_none());

        let values = route_assignment(&g, &m, &config, &[(0, vec![d, s, c, end], vec![0.0, 30.0, 0.0, 0.0])]);
        assert_eq!(m.model.first_violation(&values, 1e-6), None);
        assert_eq!(values[m.vehicles[0].soc[s].idx()], 20.0);
        assert_eq!(values[m.vehicles[0].soc[c].idx()], 20.0);
        assert_eq!(m.model.objective_value(&values), 80.0);

        let values = route_assignment(&g, &m, &config, &[(0, vec![d, s, c, end], vec![0.0, 20.0, 0.0, 0.0])]);
        assert_eq!(
            m.model.first_violation(&values, 1e-6).as_deref(),
            Some("bounds of soc_0_D0/end")
        );
    }

    #[test]
    pub fn overcharging_breaks_charge_cap() {
        let g = graph(&charging_detour());
        let config = PlannerConfig::default();
        let m = build_model(&g, &config).unwrap();
        let values = route_assignment(&g, &m, &config, &[(0, vec![0, 2, 1, 3], vec![0.0, 35.0, 0.0, 0.0])]);
        assert_eq!(m.model.first_violation(&values, 1e-6).as_deref(), Some("charge_cap_0_S1"));
    }

    #[test]
    pub fn prunes_arcs_closed_by_windows() {
        let mut p = two_customers(1, 20.0);
        p.nodes[1].window = TimeWindow::new(0.0, 15.0);
        p.nodes[2].window = TimeWindow::new(100.0, 200.0);
        let g = graph(&p);
        let m = build_model(&g, &PlannerConfig::default()).unwrap();
        assert!(m.vehicles[0].arc(2, 1).is_none());
        assert!(m.vehicles[0].arc(1, 2).is_some());
        assert!(m.vehicles[0].arc(0, g.end_depot()).is_none());
        assert!(m.horizon.is_finite());
    }

    #[test]
    pub fn zero_customers_build_empty_routing() {
        let mut p = two_customers(1, 10.0);
        p.nodes.truncate(1);
        let g = graph(&p);
        let m = build_model(&g, &PlannerConfig::default()).unwrap();
        assert!(m.vehicles[0].arcs.is_empty());
        let values = m.model.vars().iter().map(|d| d.lb).collect::<Vec<_>>();
        assert_eq!(m.model.first_violation(&values, 1e-9), None);
        assert_eq!(m.model.objective_value(&values), 0.0);
    }

    #[test]
    pub fn station_copies_are_ordered() {
        let g = Graph::new(&charging_detour(), 2).unwrap();
        let m = build_model(&g, &PlannerConfig::default()).unwrap();
        assert!(m.model.constraints().iter().any(|c| c.name == "station_order_0_S1/1"));
        assert!(m.vehicles[0].arc(2, 3).is_none());
        assert!(m.vehicles[0].charge[3].is_some());
    }

    #[test]
    pub fn vehicles_recharge_at_the_same_station() {
        let g = graph(&shared_station());
        let (d, c1, c2, s, end) = (0, at(&g, "C1"), at(&g, "C2"), at(&g, "S1"), g.end_depot());
        for big_m in [BigM::Tight, BigM::Global] {
            let config = PlannerConfig {
                big_m,
                ..PlannerConfig::default()
            };
            let m = build_model(&g, &config).unwrap();
            for name in ["station_0_S1", "station_1_S1"] {
                assert!(m.model.constraints().iter().any(|c| c.name == name));
            }
            let charges = vec![0.0, 30.0, 0.0, 0.0];
            let values = route_assignment(
                &g,
                &m,
                &config,
                &[(0, vec![d, s, c1, end], charges.clone()), (1, vec![d, s, c2, end], charges)],
            );
            assert_eq!(m.model.first_violation(&values, 1e-6), None);
            assert_eq!(m.model.objective_value(&values), 160.0);
        }
    }

    #[test]
    pub fn service_time_closes_arcs_and_return() {
        let mut p = two_customers(1, 20.0);
        p.nodes[2] = NodeSpec::customer("C2", pt(0.0, 10.0), 7.0).with_window(0.0, 20.0);
        let m = build_model(&graph(&p), &PlannerConfig::default()).unwrap();
        assert!(m.vehicles[0].arc(1, 2).is_some());

        p.nodes[1] = NodeSpec::customer("C1", pt(10.0, 0.0), 5.0).with_service_time(10.0);
        let m = build_model(&graph(&p), &PlannerConfig::default()).unwrap();
        assert!(m.vehicles[0].arc(1, 2).is_none());
        assert!(m.vehicles[0].arc(2, 1).is_some());

        let mut p = single_customer(TimeWindow::default(), 100.0);
        p.nodes[0].window = TimeWindow::new(0.0, 210.0);
        assert_eq!(precheck(&graph(&p)), Ok(()));
        p.nodes[1] = p.nodes[1].clone().with_service_time(20.0);
        assert!(matches!(
            precheck(&graph(&p)),
            Err(ModelConstructionError::NoReturn { earliest_return, .. }) if earliest_return == 220.0
        ));
    }

    #[test]
    pub fn service_time_delays_departure() {
        let mut p = single_customer(TimeWindow::default(), 10.0);
        p.nodes[1] = p.nodes[1].clone().with_service_time(5.0);
        let g = graph(&p);
        let end = g.end_depot();
        for big_m in [BigM::Tight, BigM::Global] {
            let config = PlannerConfig {
                big_m,
                ..PlannerConfig::default()
            };
            let m = build_model(&g, &config).unwrap();
            let mut values = route_assignment(&g, &m, &config, &[(0, vec![0, 1, end], vec![0.0; 3])]);
            assert_eq!(values[m.vehicles[0].time[end].idx()], 25.0);
            assert_eq!(m.model.first_violation(&values, 1e-6), None);

            values[m.vehicles[0].time[end].idx()] = 20.0;
            assert_eq!(
                m.model.first_violation(&values, 1e-6).as_deref(),
                Some("time_0_C1_D0/end")
            );
        }
    }
}
