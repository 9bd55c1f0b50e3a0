//! Reader for the EVRP-TW benchmark format of Schneider, Stenger and Goeke:
//!
//! ```text
//! StringID   Type   x       y      demand  ReadyTime  DueDate   ServiceTime
//! D0         d      40.0    50.0   0.0     0.0        1236.0    0.0
//! S0         f      40.0    50.0   0.0     0.0        1236.0    0.0
//! C30        c      20.0    55.0   10.0    355.0      407.0     90.0
//!
//! Q Vehicle fuel tank capacity /77.75/
//! C Vehicle load capacity /200.0/
//! r fuel consumption rate /1.0/
//! g inverse refueling rate /3.47/
//! v average Velocity /1.0/
//! ```

use thiserror::Error;

use crate::{
    problem::{NodeRole, NodeSpec, Problem, TimeWindow, VehicleClass},
    Point,
};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: cannot read {field} from `{text}`")]
    BadNumber {
        line: usize,
        field: &'static str,
        text: String,
    },
    #[error("missing vehicle parameter `{0}`")]
    MissingParameter(char),
}

fn number(line: usize, field: &'static str, text: &str) -> Result<f64, ParseError> {
    text.parse::<f64>().map_err(|_| ParseError::BadNumber {
        line,
        field,
        text: text.to_string(),
    })
}

/// Parses an instance. The format does not carry a fleet size, so all
/// `vehicles` share the class given by the `Q`, `C`, `r` and `g` lines.
pub fn parse(input: &str, name: &str, vehicles: usize) -> Result<Problem, ParseError> {
    const FIELDS: [&str; 6] = ["x", "y", "demand", "ReadyTime", "DueDate", "ServiceTime"];

    let mut nodes = Vec::new();
    let mut params: [Option<f64>; 5] = [None; 5];
    let param_names = ['Q', 'C', 'r', 'g', 'v'];

    for (line_idx, line) in input.lines().enumerate() {
        let line_no = line_idx + 1;
        let fields = line.split_whitespace().collect::<Vec<_>>();

        if let Some(value) = line.split('/').nth(1).filter(|_| line.matches('/').count() >= 2) {
            let key = fields.first().and_then(|f| f.chars().next());
            if let Some(p) = key.and_then(|k| param_names.iter().position(|n| *n == k)) {
                if fields[0].len() == 1 {
                    params[p] = Some(number(line_no, "parameter", value.trim())?);
                }
            }
            continue;
        }

        if fields.len() != 8 {
            continue;
        }
        let role = match fields[1] {
            "d" => NodeRole::Depot,
            "f" => NodeRole::ChargingStation,
            "c" => NodeRole::Customer,
            _ => continue,
        };
        let mut values = [0.0; 6];
        for (i, (value, field)) in values.iter_mut().zip(FIELDS).enumerate() {
            *value = number(line_no, field, fields[i + 2])?;
        }
        nodes.push(NodeSpec {
            id: fields[0].to_string(),
            role,
            loc: Some(Point {
                x: values[0],
                y: values[1],
            }),
            demand: values[2],
            window: TimeWindow::new(values[3], values[4]),
            service_time: values[5],
        });
    }

    let param = |i: usize| params[i].ok_or(ParseError::MissingParameter(param_names[i]));
    let class = VehicleClass {
        battery_capacity: param(0)?,
        load_capacity: param(1)?,
        consumption_rate: param(2)?,
        charging_rate: 1.0 / param(3)?,
    };

    Ok(Problem {
        name: name.to_string(),
        nodes,
        arcs: Vec::new(),
        vehicles: class.fleet(vehicles),
        velocity: param(4)?,
    })
}
