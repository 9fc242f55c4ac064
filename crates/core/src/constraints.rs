/// A prescribed value for one degree-of-freedom type on a node group.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub node_group: String,
    pub dof: String,
    pub value: f64,
}

/// Prescribed values collected from models for the current step.
///
/// Setting a value for a `(node_group, dof)` pair that is already present
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    entries: Vec<Constraint>,
}

impl Constraints {
    /// Creates an empty set of constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prescribes `value` for `dof` on every node of `node_group`.
    pub fn set(&mut self, node_group: &str, dof: &str, value: f64) {
        match self
            .entries
            .iter_mut()
            .find(|c| c.node_group == node_group && c.dof == dof)
        {
            Some(existing) => existing.value = value,
            None => self.entries.push(Constraint {
                node_group: node_group.to_owned(),
                dof: dof.to_owned(),
                value,
            }),
        }
    }

    /// Returns the prescribed value for a `(node_group, dof)` pair.
    #[must_use]
    pub fn get(&self, node_group: &str, dof: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|c| c.node_group == node_group && c.dof == dof)
            .map(|c| c.value)
    }

    /// Returns the number of constrained pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }
}
