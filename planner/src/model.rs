//! Solver independent mixed-integer linear program.

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Var(pub u32);

impl Var {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Continuous,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub name: String,
    pub kind: VarKind,
    pub lb: f64,
    pub ub: f64,
    pub cost: f64,
}

/// `lb <= sum(coeff * var) <= ub`; either side may be infinite.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub name: String,
    pub lb: f64,
    pub ub: f64,
    pub terms: Vec<(Var, f64)>,
}

impl Constraint {
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(v, c)| c * values[v.idx()]).sum()
    }
}

/// Variable values indexed by `Var::idx`.
pub type Assignment = Vec<f64>;

/// Minimisation problem.
#[derive(Default, Clone, Debug)]
pub struct Model {
    vars: Vec<VarDecl>,
    constraints: Vec<Constraint>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: String, kind: VarKind, lb: f64, ub: f64, cost: f64) -> Var {
        let var = Var(self.vars.len() as u32);
        self.vars.push(VarDecl { name, kind, lb, ub, cost });
        var
    }

    pub fn binary(&mut self, name: String, cost: f64) -> Var {
        self.add_var(name, VarKind::Binary, 0.0, 1.0, cost)
    }

    pub fn continuous(&mut self, name: String, lb: f64, ub: f64) -> Var {
        self.add_var(name, VarKind::Continuous, lb, ub, 0.0)
    }

    pub fn add_constraint(&mut self, name: String, lb: f64, ub: f64, terms: Vec<(Var, f64)>) {
        self.constraints.push(Constraint { name, lb, ub, terms });
    }

    pub fn add_le(&mut self, name: String, terms: Vec<(Var, f64)>, rhs: f64) {
        self.add_constraint(name, f64::NEG_INFINITY, rhs, terms)
    }

    pub fn add_eq(&mut self, name: String, terms: Vec<(Var, f64)>, rhs: f64) {
        self.add_constraint(name, rhs, rhs, terms)
    }

    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    pub fn var(&self, var: Var) -> &VarDecl {
        &self.vars[var.idx()]
    }

    pub fn var_by_name(&self, name: &str) -> Option<Var> {
        self.vars.iter().position(|v| v.name == name).map(|i| Var(i as u32))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.vars.iter().zip(values).map(|(d, x)| d.cost * x).sum()
    }

    /// Name of the first bound, integrality requirement or constraint that
    /// `values` break by more than `tolerance`.
    pub fn first_violation(&self, values: &[f64], tolerance: f64) -> Option<String> {
        for (d, x) in self.vars.iter().zip(values) {
            if *x < d.lb - tolerance || *x > d.ub + tolerance {
                return Some(format!("bounds of {}", d.name));
            }
            if d.kind == VarKind::Binary && (x - x.round()).abs() > tolerance {
                return Some(format!("integrality of {}", d.name));
            }
        }
        self.constraints
            .iter()
            .find(|c| {
                let a = c.activity(values);
                a < c.lb - tolerance || a > c.ub + tolerance
            })
            .map(|c| c.name.clone())
    }
}
