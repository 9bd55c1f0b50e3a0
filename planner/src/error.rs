use evrp_structs::problem::NodeRole;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node `{0}`")]
pub struct UnknownNodeError(pub String);

/// Malformed instance data, rejected before any model is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInstanceError {
    #[error("node id `{0}` appears more than once")]
    DuplicateNode(String),
    #[error("instance has no depot")]
    MissingDepot,
    #[error("instance has more than one depot: {0:?}")]
    MultipleDepots(Vec<String>),
    #[error("node `{node}` has time window [{earliest}, {latest}]")]
    InvertedWindow { node: String, earliest: f64, latest: f64 },
    #[error("node `{node}` has invalid demand {demand}")]
    InvalidDemand { node: String, demand: f64 },
    #[error("{role:?} node `{node}` has non-zero demand {demand}")]
    DemandAtNonCustomer { node: String, role: NodeRole, demand: f64 },
    #[error("node `{node}` has invalid service time {service_time}")]
    InvalidServiceTime { node: String, service_time: f64 },
    #[error("arc `{from}` -> `{to}` has invalid {cost} {value}")]
    InvalidArcCost {
        from: String,
        to: String,
        cost: &'static str,
        value: f64,
    },
    #[error("arc from `{0}` to itself")]
    SelfLoop(String),
    #[error("arc endpoint: {0}")]
    UnknownArcEndpoint(#[from] UnknownNodeError),
    #[error("no arc `{from}` -> `{to}` and no coordinates to derive it from")]
    MissingArc { from: String, to: String },
    #[error("vehicle {vehicle} has invalid {field} {value}")]
    InvalidVehicle {
        vehicle: usize,
        field: &'static str,
        value: f64,
    },
    #[error("average velocity must be positive, got {0}")]
    InvalidVelocity(f64),
}

/// Structural infeasibility found by the cheap checks that run before the
/// solver is invoked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelConstructionError {
    #[error("fleet has no vehicles")]
    NoVehicles,
    #[error("total demand {demand} exceeds total fleet capacity {capacity}")]
    InsufficientFleetCapacity { demand: f64, capacity: f64 },
    #[error("customer `{customer}` demand {demand} exceeds the largest vehicle capacity {capacity}")]
    CustomerExceedsCapacity {
        customer: String,
        demand: f64,
        capacity: f64,
    },
    #[error("customer `{customer}` closes at {latest} but cannot be reached before {earliest_arrival}")]
    UnreachableCustomer {
        customer: String,
        earliest_arrival: f64,
        latest: f64,
    },
    #[error("customer `{customer}` cannot get back to the depot before {depot_closes}, earliest return is {earliest_return}")]
    NoReturn {
        customer: String,
        earliest_return: f64,
        depot_closes: f64,
    },
}

/// Failure inside a solver backend. Domain answers such as infeasibility
/// are reported through `Outcome`, not here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("solver backend: {0}")]
    Backend(String),
    #[error("solver finished with unexpected status {0}")]
    Status(String),
}

#[cfg(feature = "gurobi")]
impl From<grb::Error> for SolverError {
    fn from(e: grb::Error) -> Self {
        SolverError::Backend(e.to_string())
    }
}

/// The solver's assignment does not decode into depot-anchored routes. This
/// means the model or the solver is broken and must not be ignored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedAssignmentError {
    #[error("assignment has {got} values but the model has {expected} variables")]
    WrongLength { expected: usize, got: usize },
    #[error("vehicle {vehicle} arc `{from}` -> `{to}` has non-binary value {value}")]
    Fractional {
        vehicle: usize,
        from: String,
        to: String,
        value: f64,
    },
    #[error("vehicle {vehicle} leaves `{node}` on {count} arcs")]
    Branching {
        vehicle: usize,
        node: String,
        count: usize,
    },
    #[error("vehicle {vehicle} enters `{node}` on {count} arcs")]
    Merging {
        vehicle: usize,
        node: String,
        count: usize,
    },
    #[error("vehicle {vehicle} stops at `{node}` without returning to the depot")]
    DeadEnd { vehicle: usize, node: String },
    #[error("vehicle {vehicle} uses arcs that are not connected to the depot, at {nodes:?}")]
    DetachedCycle { vehicle: usize, nodes: Vec<String> },
}

/// First constraint a route breaks when it is replayed from scratch.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum FeasibilityViolation {
    #[error("route refers to vehicle {vehicle}, which does not exist")]
    UnknownVehicle { vehicle: usize },
    #[error("vehicle {vehicle} is used by more than one route")]
    VehicleReused { vehicle: usize },
    #[error("route refers to node index {node}, which does not exist")]
    UnknownNode { vehicle: usize, node: usize },
    #[error("vehicle {vehicle} route does not start and end at the depot")]
    NotAnchored { vehicle: usize },
    #[error("vehicle {vehicle} passes the depot in the middle of its route")]
    DepotRevisited { vehicle: usize },
    #[error("vehicle {vehicle} carries {load} after `{node}`, capacity is {capacity}")]
    CapacityExceeded {
        vehicle: usize,
        node: String,
        load: f64,
        capacity: f64,
    },
    #[error("vehicle {vehicle} arrives at `{node}` at {arrival}, window closes at {latest}")]
    TimeWindowMissed {
        vehicle: usize,
        node: String,
        arrival: f64,
        latest: f64,
    },
    #[error("vehicle {vehicle} arrives at `{node}` with state of charge {soc}")]
    BatteryDepleted { vehicle: usize, node: String, soc: f64 },
    #[error("vehicle {vehicle} charges to {soc} at `{node}`, battery capacity is {capacity}")]
    BatteryOvercharged {
        vehicle: usize,
        node: String,
        soc: f64,
        capacity: f64,
    },
    #[error("vehicle {vehicle} charges {amount} at `{node}`, which is not a charging station")]
    ChargeAtNonStation {
        vehicle: usize,
        node: String,
        amount: f64,
    },
    #[error("vehicle {vehicle} charges a negative amount {amount} at `{node}`")]
    NegativeCharge {
        vehicle: usize,
        node: String,
        amount: f64,
    },
    #[error("customer `{customer}` is not served")]
    CustomerUnserved { customer: String },
    #[error("customer `{customer}` is served {count} times")]
    CustomerServedTwice { customer: String, count: usize },
}

#[derive(Debug, Error)]
pub enum ReadInstanceError {
    #[error("cannot read `{path}`: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("bad JSON instance: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad instance file: {0}")]
    Schneider(#[from] evrp_structs::schneider::ParseError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid instance: {0}")]
    InvalidInstance(#[from] InvalidInstanceError),
    #[error("cannot build model: {0}")]
    ModelConstruction(#[from] ModelConstructionError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("malformed assignment: {0}")]
    MalformedAssignment(#[from] MalformedAssignmentError),
}
