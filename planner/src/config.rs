use serde::{Deserialize, Serialize};

/// Coefficients of the minimised objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub distance: f64,
    pub time: f64,
    /// Charged once per dispatched vehicle.
    pub vehicles: f64,
    /// Per unit of energy consumed on used arcs.
    pub energy: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            time: 0.0,
            vehicles: 0.0,
            energy: 0.0,
        }
    }
}

/// How the deactivation constants of the conditional constraints are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BigM {
    /// Smallest valid constant for each individual arc constraint.
    #[default]
    Tight,
    /// One constant per constraint family, valid for every arc.
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub weights: ObjectiveWeights,
    pub big_m: BigM,
    /// Values closer than this to zero or to an integer are snapped when
    /// read back from the solver; the validator allows the same slack.
    pub tolerance: f64,
    /// Seconds.
    pub time_limit: f64,
    /// Relative optimality gap at which the solver may stop.
    pub optimality_gap: f64,
    /// How many times a route may recharge at the same physical station.
    pub station_copies: usize,
    /// Vehicle k+1 is dispatched only if vehicle k is, when both share a class.
    pub symmetry_breaking: bool,
    /// Minimum duration given to zero-length arcs in the time propagation.
    pub cycle_epsilon: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            weights: ObjectiveWeights::default(),
            big_m: BigM::Tight,
            tolerance: 1e-6,
            time_limit: 60.0,
            optimality_gap: 1e-4,
            station_copies: 1,
            symmetry_breaking: true,
            cycle_epsilon: 1e-4,
        }
    }
}
