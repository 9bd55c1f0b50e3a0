use serde::{Deserialize, Serialize};

use crate::Point;

/// Parsed EVRP-TW instance: physical nodes, optional explicit arcs and the fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    /// Explicit arc costs. Pairs not listed here are derived from coordinates.
    #[serde(default)]
    pub arcs: Vec<ArcSpec>,
    pub vehicles: Vec<VehicleClass>,
    /// Average velocity used to derive travel times from distances.
    #[serde(default = "unit_velocity")]
    pub velocity: f64,
}

fn unit_velocity() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum NodeRole {
    Depot,
    Customer,
    ChargingStation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub role: NodeRole,
    #[serde(default)]
    pub loc: Option<Point>,
    #[serde(default)]
    pub demand: f64,
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub service_time: f64,
}

impl NodeSpec {
    pub fn depot(id: &str, loc: Point) -> Self {
        Self {
            id: id.to_string(),
            role: NodeRole::Depot,
            loc: Some(loc),
            demand: 0.0,
            window: TimeWindow::default(),
            service_time: 0.0,
        }
    }

    pub fn customer(id: &str, loc: Point, demand: f64) -> Self {
        Self {
            role: NodeRole::Customer,
            demand,
            ..Self::depot(id, loc)
        }
    }

    pub fn station(id: &str, loc: Point) -> Self {
        Self {
            role: NodeRole::ChargingStation,
            ..Self::depot(id, loc)
        }
    }

    pub fn with_window(mut self, earliest: f64, latest: f64) -> Self {
        self.window = TimeWindow { earliest, latest };
        self
    }

    pub fn with_service_time(mut self, service_time: f64) -> Self {
        self.service_time = service_time;
        self
    }

    pub fn without_loc(mut self) -> Self {
        self.loc = None;
        self
    }
}

/// Interval in which service at a node may start. An open end is stored as
/// `f64::INFINITY` and written as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default)]
    pub earliest: f64,
    #[serde(default = "open_end", with = "open_end_serde")]
    pub latest: f64,
}

fn open_end() -> f64 {
    f64::INFINITY
}

mod open_end_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_some(value)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            earliest: 0.0,
            latest: f64::INFINITY,
        }
    }
}

impl TimeWindow {
    pub fn new(earliest: f64, latest: f64) -> Self {
        Self { earliest, latest }
    }

    pub fn contains(&self, t: f64, tolerance: f64) -> bool {
        t >= self.earliest - tolerance && t <= self.latest + tolerance
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcSpec {
    pub from: String,
    pub to: String,
    pub distance: f64,
    /// Defaults to `distance / velocity`.
    #[serde(default)]
    pub travel_time: Option<f64>,
    /// Defaults to the vehicle's consumption rate times `distance`.
    #[serde(default)]
    pub energy: Option<f64>,
}

impl ArcSpec {
    pub fn new(from: &str, to: &str, distance: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            distance,
            travel_time: None,
            energy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleClass {
    pub battery_capacity: f64,
    /// Energy per unit distance.
    pub consumption_rate: f64,
    pub load_capacity: f64,
    /// Energy per unit time while charging.
    pub charging_rate: f64,
}

impl VehicleClass {
    pub fn fleet(&self, count: usize) -> Vec<VehicleClass> {
        vec![*self; count]
    }
}
