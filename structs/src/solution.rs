use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionStatus {
    /// Optimal within the configured optimality gap.
    Optimal,
    /// Best incumbent when the solver ran out of time.
    TimeLimited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolutionStatus,
    pub objective: f64,
    pub gap: Option<f64>,
    pub routes: Vec<Route>,
}

impl Solution {
    pub fn empty() -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective: 0.0,
            gap: Some(0.0),
            routes: Vec::new(),
        }
    }
}

/// One vehicle's tour. `visits` starts and ends at the depot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub vehicle: usize,
    pub visits: Vec<Visit>,
}

impl Route {
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.visits.iter().map(|v| v.node)
    }

    pub fn total_charged(&self) -> f64 {
        self.visits.iter().map(|v| v.charged).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Index into `Problem::nodes`.
    pub node: usize,
    pub id: String,
    /// Service start: arrival time plus any wait for the window to open.
    pub service_start: f64,
    /// State of charge on arrival, before charging.
    pub soc: f64,
    /// Energy added at this visit. Zero except at charging stations.
    pub charged: f64,
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} objective={:.3} gap={} routes={}",
            self.status,
            self.objective,
            self.gap.map(|g| format!("{:.4}", g)).unwrap_or_else(|| "-".to_string()),
            self.routes.len()
        )?;
        for route in self.routes.iter() {
            writeln!(f, "{}", route)?;
        }
        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.visits.iter().map(|v| v.id.as_str()).collect::<Vec<_>>();
        writeln!(f, "vehicle {}: {}", self.vehicle, path.join(" -> "))?;
        for v in self.visits.iter() {
            write!(f, "  - {:<8} t={:<10.3} soc={:<10.3}", v.id, v.service_start, v.soc)?;
            if v.charged > 0.0 {
                write!(f, " +{:.3}", v.charged)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
