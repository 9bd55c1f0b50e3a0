use std::{fs::read_to_string, path::Path};

use evrp_structs::{problem::Problem, schneider};

use crate::error::ReadInstanceError;

/// Reads a JSON instance (`.json`) or a Schneider text instance (anything
/// else). Instances without a name are named after the file stem.
pub fn read_problem(path: &Path, vehicles: usize) -> Result<Problem, ReadInstanceError> {
    let text = read_to_string(path).map_err(|source| ReadInstanceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_problem(&text, path, vehicles)
}

pub fn parse_problem(text: &str, path: &Path, vehicles: usize) -> Result<Problem, ReadInstanceError> {
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    if path.extension().is_some_and(|e| e == "json") {
        let mut problem: Problem = serde_json::from_str(text)?;
        if problem.name.is_empty() {
            problem.name = stem;
        }
        Ok(problem)
    } else {
        Ok(schneider::parse(text, &stem, vehicles)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "nodes": [
            {"id": "D0", "role": "Depot", "loc": {"x": 0.0, "y": 0.0}},
            {"id": "C1", "role": "Customer", "loc": {"x": 3.0, "y": 4.0}, "demand": 2.0}
        ],
        "vehicles": [{"battery_capacity": 100.0, "consumption_rate": 1.0, "load_capacity": 10.0, "charging_rate": 1.0}]
    }"#;

    const TEXT: &str = "StringID   Type   x       y      demand  ReadyTime  DueDate   ServiceTime
D0         d      40.0    50.0   0.0     0.0        1236.0    0.0
C30        c      20.0    55.0   10.0    355.0      407.0     90.0

Q Vehicle fuel tank capacity /77.75/
C Vehicle load capacity /200.0/
r fuel consumption rate /1.0/
g inverse refueling rate /3.47/
v average Velocity /1.0/
";

    #[test]
    pub fn unnamed_json_takes_file_stem() {
        let p = parse_problem(JSON, Path::new("bench/tiny.json"), 4).unwrap();
        assert_eq!(p.name, "tiny");
        assert_eq!(p.vehicles.len(), 1);

        let named = JSON.replacen('{', r#"{"name": "given","#, 1);
        let p = parse_problem(&named, Path::new("bench/tiny.json"), 4).unwrap();
        assert_eq!(p.name, "given");
    }

    #[test]
    pub fn text_instances_get_fleet_and_stem() {
        let p = parse_problem(TEXT, Path::new("bench/c101C5.txt"), 3).unwrap();
        assert_eq!(p.name, "c101C5");
        assert_eq!(p.vehicles.len(), 3);
        assert_eq!(p.nodes[1].service_time, 90.0);
    }

    #[test]
    pub fn missing_file_names_the_path() {
        let err = read_problem(Path::new("no/such/instance.json"), 1).unwrap_err();
        assert!(matches!(&err, ReadInstanceError::Io { path, .. } if path.ends_with("instance.json")));
    }
}
