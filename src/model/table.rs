use std::collections::HashMap;

use itertools::Itertools;

use crate::Symbol;
use crate::lp_solver::VariableId;
use crate::schema::IndexTuple;

/// All instances of one declared variable.
pub struct VariableFamily<Brand> {
    arity: usize,
    instances: HashMap<IndexTuple, VariableId<Brand>>,
}

impl<Brand> VariableFamily<Brand> {
    /// Number of indices an instance is addressed by.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn get(&self, key: &[Symbol]) -> Option<VariableId<Brand>> {
        self.instances.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Decision-variable handles of one model, addressable by name then index tuple.
///
/// Instances are also kept in creation order, which is the order of the declared
/// variables and, within one variable, the order of its expanded index tuples.
pub struct VariableTable<Brand> {
    families: HashMap<Symbol, VariableFamily<Brand>>,
    entries: Vec<(String, VariableId<Brand>)>,
}

impl<Brand> VariableTable<Brand> {
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Register a family before its instances are inserted, so that a variable over
    /// an empty set still resolves.
    pub fn declare(&mut self, name: &Symbol, arity: usize) {
        self.families.entry(name.clone()).or_insert(VariableFamily {
            arity,
            instances: HashMap::new(),
        });
    }

    pub fn insert(&mut self, name: &Symbol, key: IndexTuple, variable: VariableId<Brand>) {
        self.entries.push((instance_key(name, &key), variable));
        self.families
            .entry(name.clone())
            .or_insert(VariableFamily {
                arity: key.len(),
                instances: HashMap::new(),
            })
            .instances
            .insert(key, variable);
    }

    pub fn family(&self, name: &str) -> Option<&VariableFamily<Brand>> {
        self.families.get(&Symbol::from(name))
    }

    pub fn get(&self, name: &str, key: &[Symbol]) -> Option<VariableId<Brand>> {
        self.family(name).and_then(|family| family.get(key))
    }

    /// Every instance with its report key, in creation order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, VariableId<Brand>)> {
        self.entries.iter().map(|(key, var)| (key.as_str(), *var))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Brand> Default for VariableTable<Brand> {
    fn default() -> Self {
        Self::new()
    }
}

/// Report key of a variable instance: `x` for a scalar, `x[a,b]` otherwise.
pub fn instance_key(name: &str, key: &[Symbol]) -> String {
    if key.is_empty() {
        name.to_string()
    } else {
        format!("{}[{}]", name, key.iter().join(","))
    }
}
