use serde::{Deserialize, Serialize};

pub mod problem;
pub mod schneider;
pub mod solution;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn dist(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn eq_xy(&self, other: &Point) -> bool {
        self.dist(other) < 1e-3
    }
}
