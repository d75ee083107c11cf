//! The ModelSpec data contract.
//!
//! A ModelSpec is the declarative JSON description of an optimisation problem that the
//! formulation agent hands to the builder:
//!
//! ```json
//! {
//!   "model_name": "ChipProduction",
//!   "sets": { "Chips": ["Logic", "Memory"] },
//!   "parameters": { "Profit": { "Logic": 12, "Memory": 9 } },
//!   "variables": {
//!     "x": { "indices": { "i": "Chips" }, "type": "Integer",
//!            "lower_bound": 0, "upper_bound": "unbounded" }
//!   },
//!   "objective": { "sense": "maximize",
//!                  "expression": "sum(x[i] * Profit[i] for i in Chips)" },
//!   "constraints": {}
//! }
//! ```
//!
//! Documents are only ever turned into a [`ModelSpec`] through [`validate`], so holding a
//! `ModelSpec` means every set reference resolves, every variable has a recognised type
//! and consistent bounds, and the objective sense is known. Expressions are kept as text
//! here; they are parsed by [`crate::expr`] when the model is built.

use std::{
    collections::{HashMap, HashSet},
    error::Error,
    fmt,
    str::FromStr,
};

use crate::Symbol;
use crate::lp_solver::{OptimizationSense, VariableType};

mod validate;

pub use validate::validate;

/// A concrete assignment of set members, one per declared index symbol.
pub type IndexTuple = Vec<Symbol>;

/// Render a number as a set-member label: integral values lose their fractional part,
/// so the JSON member `3`, the key `"3"` and the expression literal `x[3]` all agree.
pub fn number_label(value: f64) -> Symbol {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64).into()
    } else {
        format!("{}", value).into()
    }
}

/// Variable bound after sentinel interpretation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    NegInfinity,
    Finite(f64),
    PosInfinity,
}

impl Bound {
    pub fn value(self) -> f64 {
        match self {
            Bound::NegInfinity => f64::NEG_INFINITY,
            Bound::Finite(v) => v,
            Bound::PosInfinity => f64::INFINITY,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInfinity => write!(f, "-inf"),
            Bound::Finite(v) => write!(f, "{}", v),
            Bound::PosInfinity => write!(f, "inf"),
        }
    }
}

/// One `indices` entry: `symbol` ranges over the members of `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDecl {
    pub symbol: Symbol,
    pub set: Symbol,
}

/// Declared sets, in document order.
#[derive(Debug, Clone, Default)]
pub struct SetTable {
    order: Vec<Symbol>,
    members: HashMap<Symbol, Vec<Symbol>>,
    lookup: HashMap<Symbol, HashSet<Symbol>>,
}

impl SetTable {
    fn insert(&mut self, name: Symbol, members: Vec<Symbol>) {
        self.order.push(name.clone());
        self.lookup
            .insert(name.clone(), members.iter().cloned().collect());
        self.members.insert(name, members);
    }

    /// Members of a set, in declared order.
    pub fn members(&self, name: &str) -> Option<&[Symbol]> {
        self.members.get(&Symbol::from(name)).map(Vec::as_slice)
    }

    pub fn contains_set(&self, name: &str) -> bool {
        self.members.contains_key(&Symbol::from(name))
    }

    pub fn contains(&self, set: &Symbol, member: &Symbol) -> bool {
        self.lookup
            .get(set)
            .is_some_and(|members| members.contains(member))
    }

    /// True when `member` belongs to at least one declared set.
    pub fn is_member_of_any(&self, member: &Symbol) -> bool {
        self.lookup.values().any(|members| members.contains(member))
    }

    pub fn names(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A numeric table keyed by set-member tuples.
///
/// Scalar parameters have arity 0 and a single entry under the empty key.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Symbol,
    /// Number of keys needed to reach a value; `None` for an empty table.
    pub arity: Option<usize>,
    /// Sets the keys range over, when the document declared them.
    pub indices: Option<Vec<Symbol>>,
    /// Value used for entries absent from `values`.
    pub default: Option<f64>,
    values: HashMap<IndexTuple, f64>,
}

impl Parameter {
    /// Value stored under `key`, falling back to the declared default.
    pub fn get(&self, key: &[Symbol]) -> Option<f64> {
        self.values.get(key).copied().or(self.default)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    parameters: HashMap<Symbol, Parameter>,
}

impl ParameterTable {
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(&Symbol::from(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(&Symbol::from(name))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: Symbol,
    pub indices: Vec<IndexDecl>,
    pub var_type: VariableType,
    pub lower_bound: Bound,
    pub upper_bound: Bound,
}

#[derive(Debug, Clone)]
pub struct ObjectiveSpec {
    pub sense: OptimizationSense,
    pub expression: String,
}

#[derive(Debug, Clone)]
pub struct ConstraintSpec {
    pub name: Symbol,
    pub indices: Vec<IndexDecl>,
    pub expression: String,
}

/// A validated optimisation model description.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub model_name: String,
    pub sets: SetTable,
    pub parameters: ParameterTable,
    pub variables: Vec<VariableSpec>,
    pub objective: ObjectiveSpec,
    pub constraints: Vec<ConstraintSpec>,
}

impl ModelSpec {
    /// Validate an already parsed JSON document.
    pub fn from_json(document: &serde_json::Value) -> Result<Self, SchemaError> {
        validate(document)
    }
}

impl FromStr for ModelSpec {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let document: serde_json::Value =
            serde_json::from_str(text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        validate(&document)
    }
}

/// Reasons a document is not a well-formed ModelSpec.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// The text is not JSON at all.
    InvalidJson(String),
    /// The document root is not a JSON object.
    NotAnObject,
    /// A required top-level key is absent.
    MissingKey(&'static str),
    /// A value has the wrong JSON shape.
    Malformed { path: String, reason: String },
    /// A name that expressions must be able to reference is not an identifier.
    InvalidName { kind: &'static str, name: String },
    /// A variable and a parameter share a name.
    DuplicateName(String),
    /// A set lists the same member twice.
    DuplicateMember { set: String, member: String },
    /// `indices` (or a parameter declaration) names a set that was not declared.
    UndeclaredSet { owner: String, set: String },
    /// A parameter key is not a member of the set it should range over.
    UnknownMember { parameter: String, key: String },
    /// A parameter value is not numeric.
    InvalidParameter { parameter: String, reason: String },
    /// `type` is not Continuous, Integer or Binary.
    UnknownVariableType { variable: String, given: String },
    /// `objective.sense` is neither maximize nor minimize.
    UnknownSense(String),
    /// A bound value that is neither a number nor an infinity sentinel.
    InvalidBound { variable: String, given: String },
    /// `lower_bound` exceeds `upper_bound`.
    InvalidBounds {
        variable: String,
        lower: Bound,
        upper: Bound,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::InvalidJson(err) => write!(f, "document is not valid JSON: {}", err),
            SchemaError::NotAnObject => write!(f, "document root must be a JSON object"),
            SchemaError::MissingKey(key) => write!(f, "missing required key '{}'", key),
            SchemaError::Malformed { path, reason } => write!(f, "{}: {}", path, reason),
            SchemaError::InvalidName { kind, name } => write!(
                f,
                "{} name '{}' must start with a letter or '_' and contain only letters, digits and '_'",
                kind, name
            ),
            SchemaError::DuplicateName(name) => write!(
                f,
                "'{}' is declared both as a variable and as a parameter",
                name
            ),
            SchemaError::DuplicateMember { set, member } => {
                write!(f, "set '{}' lists member '{}' more than once", set, member)
            }
            SchemaError::UndeclaredSet { owner, set } => {
                write!(f, "{} refers to undeclared set '{}'", owner, set)
            }
            SchemaError::UnknownMember { parameter, key } => write!(
                f,
                "parameter '{}' has key '{}' which is not a member of a declared set",
                parameter, key
            ),
            SchemaError::InvalidParameter { parameter, reason } => {
                write!(f, "parameter '{}': {}", parameter, reason)
            }
            SchemaError::UnknownVariableType { variable, given } => write!(
                f,
                "variable '{}' has type '{}'; expected Continuous, Integer or Binary",
                variable, given
            ),
            SchemaError::UnknownSense(given) => write!(
                f,
                "objective sense '{}' is not recognised; expected maximize or minimize",
                given
            ),
            SchemaError::InvalidBound { variable, given } => write!(
                f,
                "variable '{}' has bound {}; expected a number or \"unbounded\"",
                variable, given
            ),
            SchemaError::InvalidBounds {
                variable,
                lower,
                upper,
            } => write!(
                f,
                "variable '{}' has lower_bound {} greater than upper_bound {}",
                variable, lower, upper
            ),
        }
    }
}

impl Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_labels_drop_integral_fraction() {
        assert_eq!(&*number_label(3.0), "3");
        assert_eq!(&*number_label(-2.0), "-2");
        assert_eq!(&*number_label(2.5), "2.5");
    }

    #[test]
    fn set_table_preserves_order() {
        let mut sets = SetTable::default();
        sets.insert("B".into(), vec!["b2".into(), "b1".into()]);
        sets.insert("A".into(), vec!["a1".into()]);

        let names: Vec<_> = sets.names().map(|s| s.to_string()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(
            sets.members("B").unwrap(),
            &[Symbol::from("b2"), Symbol::from("b1")]
        );
        assert!(sets.contains(&"A".into(), &"a1".into()));
        assert!(!sets.contains(&"A".into(), &"b1".into()));
        assert!(sets.is_member_of_any(&"b1".into()));
    }

    #[test]
    fn parameter_default_fills_gaps() {
        let parameter = Parameter {
            name: "Cost".into(),
            arity: Some(1),
            indices: Some(vec!["S".into()]),
            default: Some(0.5),
            values: [(vec![Symbol::from("a")], 2.0)].into_iter().collect(),
        };

        assert_eq!(parameter.get(&["a".into()]), Some(2.0));
        assert_eq!(parameter.get(&["b".into()]), Some(0.5));
    }

    #[test]
    fn parses_from_text() {
        let text = r#"{
            "sets": {}, "parameters": {}, "variables": {},
            "objective": {"sense": "minimize", "expression": "0"},
            "constraints": {}
        }"#;
        let spec: ModelSpec = text.parse().expect("minimal model should validate");
        assert_eq!(spec.model_name, "model");

        let err = "{ not json".parse::<ModelSpec>().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }
}
