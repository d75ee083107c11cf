use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use lazy_static::*;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::*;
use crate::Symbol;
use crate::lp_solver::{OptimizationSense, VariableType};

const REQUIRED_KEYS: [&str; 5] = ["sets", "parameters", "variables", "objective", "constraints"];

/// Names that expressions use for dictionary-style access.
const RESERVED_NAMES: [&str; 3] = ["sets", "parameters", "variables"];

const DEFAULT_MODEL_NAME: &str = "model";

#[derive(Deserialize)]
struct RawVariable {
    #[serde(default)]
    indices: Value,
    #[serde(default, rename = "type")]
    var_type: Option<String>,
    #[serde(default)]
    lower_bound: Value,
    #[serde(default)]
    upper_bound: Value,
}

#[derive(Deserialize)]
struct RawObjective {
    sense: String,
    expression: String,
}

#[derive(Deserialize)]
struct RawConstraint {
    #[serde(default)]
    indices: Value,
    expression: String,
}

/// Parameter as found in the document, before its keys are checked against the sets.
struct RawParameter {
    name: Symbol,
    indices: Option<Vec<Symbol>>,
    default: Option<f64>,
    arity: Option<usize>,
    values: HashMap<IndexTuple, f64>,
}

fn check_identifier(kind: &'static str, name: &str) -> Result<(), SchemaError> {
    lazy_static! {
        static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    }

    if IDENTIFIER_RE.is_match(name) && !RESERVED_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

fn malformed(path: impl Into<String>, reason: impl Into<String>) -> SchemaError {
    SchemaError::Malformed {
        path: path.into(),
        reason: reason.into(),
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| malformed(path, "expected an object"))
}

/// Turn a JSON set member (or parameter key) into a label.
fn member_label(value: &Value, path: &str) -> Result<Symbol, SchemaError> {
    match value {
        Value::String(s) => Ok(s.as_str().into()),
        Value::Number(n) => n
            .as_f64()
            .map(number_label)
            .ok_or_else(|| malformed(path, "member is not a representable number")),
        other => Err(malformed(
            path,
            format!("set members must be strings or numbers, found {}", other),
        )),
    }
}

fn parse_sets(value: &Value) -> Result<SetTable, SchemaError> {
    let mut sets = SetTable::default();

    for (name, members) in as_object(value, "sets")? {
        check_identifier("set", name)?;
        let path = format!("sets.{}", name);
        let members = members
            .as_array()
            .ok_or_else(|| malformed(&path, "expected an array of members"))?;

        let mut seen = HashSet::new();
        let mut labels = Vec::with_capacity(members.len());
        for member in members {
            let label = member_label(member, &path)?;
            if !seen.insert(label.clone()) {
                return Err(SchemaError::DuplicateMember {
                    set: name.clone(),
                    member: label.to_string(),
                });
            }
            labels.push(label);
        }

        sets.insert(name.as_str().into(), labels);
    }

    Ok(sets)
}

fn parse_number(value: &Value, parameter: &str) -> Result<Option<f64>, SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidParameter {
        parameter: parameter.to_string(),
        reason,
    };

    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(format!("{} is not representable", n))),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(format!("value \"{}\" is not a number", s))),
        },
        other => Err(invalid(format!("expected a number, found {}", other))),
    }
}

/// Flatten a nested parameter object into tuple-keyed entries, checking uniform depth.
fn flatten_values(
    parameter: &str,
    value: &Value,
    prefix: &mut Vec<Symbol>,
    depth: &mut Option<usize>,
    out: &mut HashMap<IndexTuple, f64>,
) -> Result<(), SchemaError> {
    if let Value::Object(entries) = value {
        for (key, inner) in entries {
            prefix.push(key.as_str().into());
            flatten_values(parameter, inner, prefix, depth, out)?;
            prefix.pop();
        }
        return Ok(());
    }

    match *depth {
        Some(d) if d != prefix.len() => {
            return Err(SchemaError::InvalidParameter {
                parameter: parameter.to_string(),
                reason: format!(
                    "entries are nested at different depths ({} and {})",
                    d,
                    prefix.len()
                ),
            });
        }
        _ => *depth = Some(prefix.len()),
    }

    if let Some(v) = parse_number(value, parameter)? {
        out.insert(prefix.clone(), v);
    }
    Ok(())
}

/// A declared parameter uses only the `indices`/`values`/`default` keys and has `values`.
fn is_declared_form(entries: &Map<String, Value>) -> bool {
    entries.contains_key("values")
        && entries
            .keys()
            .all(|k| matches!(k.as_str(), "indices" | "values" | "default"))
}

fn parse_parameter(name: &str, value: &Value) -> Result<RawParameter, SchemaError> {
    check_identifier("parameter", name)?;

    let mut parameter = RawParameter {
        name: name.into(),
        indices: None,
        default: None,
        arity: None,
        values: HashMap::new(),
    };

    let values = match value {
        Value::Object(entries) if is_declared_form(entries) => {
            let path = format!("parameters.{}.indices", name);
            let indices = match entries.get("indices") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(sets)) => sets
                    .iter()
                    .map(|set| {
                        set.as_str()
                            .map(Symbol::from)
                            .ok_or_else(|| malformed(&path, "expected an array of set names"))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(malformed(path, "expected an array of set names")),
            };
            parameter.default = match entries.get("default") {
                Some(default) => parse_number(default, name)?,
                None => None,
            };
            parameter.arity = Some(indices.len());
            parameter.indices = Some(indices);
            &entries["values"]
        }
        _ => value,
    };

    let mut depth = parameter.arity;
    flatten_values(name, values, &mut Vec::new(), &mut depth, &mut parameter.values)?;
    if parameter.arity.is_none() {
        parameter.arity = depth;
    }

    Ok(parameter)
}

fn parse_indices(value: &Value, path: &str) -> Result<Vec<IndexDecl>, SchemaError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) if items.is_empty() => Ok(Vec::new()),
        Value::Object(entries) => entries
            .iter()
            .map(|(symbol, set)| {
                check_identifier("index symbol", symbol)?;
                let set = set
                    .as_str()
                    .ok_or_else(|| malformed(path, format!("index '{}' must name a set", symbol)))?;
                Ok(IndexDecl {
                    symbol: symbol.as_str().into(),
                    set: set.into(),
                })
            })
            .collect(),
        _ => Err(malformed(path, "expected an object mapping index symbols to sets")),
    }
}

fn parse_variable_type(variable: &str, given: Option<&str>) -> Result<VariableType, SchemaError> {
    let Some(given) = given else {
        return Ok(VariableType::Continuous);
    };

    let lowered = given.trim().to_lowercase();
    let kind = lowered.strip_prefix("grb.").unwrap_or(&lowered);
    match kind {
        "continuous" | "cont" | "real" => Ok(VariableType::Continuous),
        "integer" | "int" => Ok(VariableType::Integer),
        "binary" | "bin" | "bool" => Ok(VariableType::Binary),
        _ => Err(SchemaError::UnknownVariableType {
            variable: variable.to_string(),
            given: given.to_string(),
        }),
    }
}

fn parse_sense(given: &str) -> Result<OptimizationSense, SchemaError> {
    let lowered = given.trim().to_lowercase();
    match lowered.strip_prefix("grb.").unwrap_or(&lowered) {
        "maximize" | "maximise" | "max" => Ok(OptimizationSense::Maximize),
        "minimize" | "minimise" | "min" => Ok(OptimizationSense::Minimize),
        _ => Err(SchemaError::UnknownSense(given.to_string())),
    }
}

/// Interpret a bound value. Absent bounds default to `[0, +inf)`; an unsigned
/// `"unbounded"` opens whichever side it is given for.
fn parse_bound(variable: &str, value: &Value, is_lower: bool) -> Result<Bound, SchemaError> {
    let invalid = || SchemaError::InvalidBound {
        variable: variable.to_string(),
        given: value.to_string(),
    };

    match value {
        Value::Null if is_lower => Ok(Bound::Finite(0.0)),
        Value::Null => Ok(Bound::PosInfinity),
        Value::Number(n) => n.as_f64().map(Bound::Finite).ok_or_else(invalid),
        Value::String(text) => {
            let lowered = text.trim().to_lowercase();
            let (sign, body) = match lowered.as_bytes().first() {
                Some(b'-') => (Some(false), lowered[1..].trim_start()),
                Some(b'+') => (Some(true), lowered[1..].trim_start()),
                _ => (None, lowered.as_str()),
            };

            match body {
                "unbounded" | "none" => Ok(match sign {
                    Some(false) => Bound::NegInfinity,
                    Some(true) => Bound::PosInfinity,
                    None if is_lower => Bound::NegInfinity,
                    None => Bound::PosInfinity,
                }),
                "inf" | "infinity" | "grb.infinity" => Ok(match sign {
                    Some(false) => Bound::NegInfinity,
                    _ => Bound::PosInfinity,
                }),
                _ => match lowered.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(Bound::Finite(v)),
                    _ => Err(invalid()),
                },
            }
        }
        _ => Err(invalid()),
    }
}

fn check_set(
    sets: &SetTable,
    owner: impl FnOnce() -> String,
    set: &str,
) -> Result<(), SchemaError> {
    if sets.contains_set(set) {
        Ok(())
    } else {
        Err(SchemaError::UndeclaredSet {
            owner: owner(),
            set: set.to_string(),
        })
    }
}

/// Match a parameter key against the members it may name.
///
/// Parameter keys are JSON object keys, so members declared as numbers arrive as text
/// (`"1"`, `"2.50"`). The key is taken as written when that is a member; otherwise its
/// numeric reading is tried.
fn resolve_member(member: &Symbol, known: impl Fn(&Symbol) -> bool) -> Option<Symbol> {
    if known(member) {
        return Some(member.clone());
    }
    match member.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(number_label(value)).filter(|label| known(label)),
        _ => None,
    }
}

/// Rewrite every parameter key to the members it names: members of the declared set
/// at each position, or of any set when the parameter does not declare its indices.
fn resolve_parameter_keys(
    parameter: &mut RawParameter,
    sets: &SetTable,
) -> Result<(), SchemaError> {
    if let Some(indices) = &parameter.indices {
        for set in indices {
            check_set(sets, || format!("parameter '{}'", parameter.name), set)?;
        }
    }

    let values = std::mem::take(&mut parameter.values);
    for (key, value) in values {
        let resolved = key
            .iter()
            .enumerate()
            .map(|(position, member)| {
                let found = match &parameter.indices {
                    Some(indices) => {
                        resolve_member(member, |m| sets.contains(&indices[position], m))
                    }
                    None => resolve_member(member, |m| sets.is_member_of_any(m)),
                };
                found.ok_or_else(|| SchemaError::UnknownMember {
                    parameter: parameter.name.to_string(),
                    key: member.to_string(),
                })
            })
            .collect::<Result<IndexTuple, _>>()?;

        if parameter.values.contains_key(&resolved) {
            return Err(SchemaError::InvalidParameter {
                parameter: parameter.name.to_string(),
                reason: format!("entry [{}] is given more than once", resolved.iter().join(",")),
            });
        }
        parameter.values.insert(resolved, value);
    }

    Ok(())
}

/// Validate a parsed JSON document and turn it into a [`ModelSpec`].
///
/// Structural problems (wrong JSON shapes, malformed names) are reported as soon as
/// they are met; the semantic checks then run in a fixed order: required keys, set
/// references, variable types, objective sense, variable bounds.
pub fn validate(document: &Value) -> Result<ModelSpec, SchemaError> {
    let root = document.as_object().ok_or(SchemaError::NotAnObject)?;

    for key in REQUIRED_KEYS {
        if root.get(key).is_none_or(Value::is_null) {
            return Err(SchemaError::MissingKey(key));
        }
    }

    let model_name = match root.get("model_name") {
        None | Some(Value::Null) => DEFAULT_MODEL_NAME.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
    };

    let sets = parse_sets(&root["sets"])?;

    let mut raw_parameters = as_object(&root["parameters"], "parameters")?
        .iter()
        .map(|(name, value)| parse_parameter(name, value))
        .collect::<Result<Vec<_>, _>>()?;

    let raw_variables = as_object(&root["variables"], "variables")?
        .iter()
        .map(|(name, value)| {
            check_identifier("variable", name)?;
            let path = format!("variables.{}", name);
            let raw = RawVariable::deserialize(value).map_err(|e| malformed(&path, e.to_string()))?;
            let indices = parse_indices(&raw.indices, &format!("{}.indices", path))?;
            Ok((name.as_str(), raw, indices))
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    let raw_objective = RawObjective::deserialize(&root["objective"])
        .map_err(|e| malformed("objective", e.to_string()))?;

    let constraints = as_object(&root["constraints"], "constraints")?
        .iter()
        .map(|(name, value)| {
            let path = format!("constraints.{}", name);
            let raw =
                RawConstraint::deserialize(value).map_err(|e| malformed(&path, e.to_string()))?;
            Ok(ConstraintSpec {
                name: name.as_str().into(),
                indices: parse_indices(&raw.indices, &format!("{}.indices", path))?,
                expression: raw.expression,
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    let parameter_names: HashSet<&Symbol> = raw_parameters.iter().map(|p| &p.name).collect();
    for (name, _, _) in &raw_variables {
        if parameter_names.contains(&Symbol::from(*name)) {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
    }

    // (b) set references
    for parameter in &mut raw_parameters {
        resolve_parameter_keys(parameter, &sets)?;
    }
    for (name, _, indices) in &raw_variables {
        for index in indices {
            check_set(&sets, || format!("variable '{}'", name), &index.set)?;
        }
    }
    for constraint in &constraints {
        for index in &constraint.indices {
            check_set(&sets, || format!("constraint '{}'", constraint.name), &index.set)?;
        }
    }

    // (c) variable types
    let var_types = raw_variables
        .iter()
        .map(|(name, raw, _)| parse_variable_type(name, raw.var_type.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;

    // (d) objective sense
    let sense = parse_sense(&raw_objective.sense)?;

    // (e) bounds
    let mut variables = Vec::with_capacity(raw_variables.len());
    for ((name, raw, indices), var_type) in raw_variables.into_iter().zip(var_types) {
        let lower_bound = parse_bound(name, &raw.lower_bound, true)?;
        let upper_bound = parse_bound(name, &raw.upper_bound, false)?;

        if upper_bound != Bound::PosInfinity && lower_bound.value() > upper_bound.value() {
            return Err(SchemaError::InvalidBounds {
                variable: name.to_string(),
                lower: lower_bound,
                upper: upper_bound,
            });
        }

        variables.push(VariableSpec {
            name: name.into(),
            indices,
            var_type,
            lower_bound,
            upper_bound,
        });
    }

    let parameters = ParameterTable {
        parameters: raw_parameters
            .into_iter()
            .map(|raw| {
                (
                    raw.name.clone(),
                    Parameter {
                        name: raw.name,
                        arity: raw.arity,
                        indices: raw.indices,
                        default: raw.default,
                        values: raw.values,
                    },
                )
            })
            .collect(),
    };

    tracing::debug!(
        model = %model_name,
        sets = sets.len(),
        parameters = parameters.len(),
        variables = variables.len(),
        constraints = constraints.len(),
        "validated model description"
    );

    Ok(ModelSpec {
        model_name,
        sets,
        parameters,
        variables,
        objective: ObjectiveSpec {
            sense,
            expression: raw_objective.expression,
        },
        constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chip_model() -> Value {
        json!({
            "model_name": "ChipProduction",
            "sets": { "Chips": ["Logic", "Memory"], "Materials": ["Silicon", "Germanium"] },
            "parameters": {
                "Profit": { "Logic": 12, "Memory": 9 },
                "Stock": { "Silicon": 1000, "Germanium": 1500 },
                "Usage": { "Silicon": { "Logic": 1, "Memory": 0 },
                           "Germanium": { "Logic": 1, "Memory": 1 } }
            },
            "variables": {
                "x": { "indices": { "i": "Chips" }, "type": "Integer",
                       "lower_bound": 0, "upper_bound": "unbounded" }
            },
            "objective": { "sense": "maximize",
                           "expression": "sum(x[i] * Profit[i] for i in Chips)" },
            "constraints": {
                "material": { "indices": { "m": "Materials" },
                              "expression": "sum(Usage[m][i] * x[i] for i in Chips) <= Stock[m]" }
            }
        })
    }

    #[test]
    fn accepts_chip_model() {
        let spec = validate(&chip_model()).expect("chip model should validate");

        assert_eq!(spec.model_name, "ChipProduction");
        assert_eq!(spec.sets.members("Chips").unwrap().len(), 2);
        assert_eq!(spec.variables.len(), 1);
        assert_eq!(spec.variables[0].var_type, VariableType::Integer);
        assert_eq!(spec.variables[0].lower_bound, Bound::Finite(0.0));
        assert_eq!(spec.variables[0].upper_bound, Bound::PosInfinity);
        assert_eq!(spec.objective.sense, OptimizationSense::Maximize);

        let usage = spec.parameters.get("Usage").unwrap();
        assert_eq!(usage.arity, Some(2));
        assert_eq!(usage.get(&["Germanium".into(), "Memory".into()]), Some(1.0));
    }

    #[test]
    fn missing_key_is_reported_first() {
        let mut doc = chip_model();
        doc.as_object_mut().unwrap().remove("constraints");
        // also break a later check, which must not be the one reported
        doc["variables"]["x"]["type"] = json!("Fractional");

        assert_eq!(validate(&doc).unwrap_err(), SchemaError::MissingKey("constraints"));
    }

    #[test]
    fn undeclared_set_in_variable() {
        let mut doc = chip_model();
        doc["variables"]["x"]["indices"] = json!({ "i": "Products" });

        assert_eq!(
            validate(&doc).unwrap_err(),
            SchemaError::UndeclaredSet {
                owner: "variable 'x'".to_string(),
                set: "Products".to_string()
            }
        );
    }

    #[test]
    fn undeclared_set_in_constraint() {
        let mut doc = chip_model();
        doc["constraints"]["material"]["indices"] = json!({ "m": "Metals" });

        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::UndeclaredSet { set, .. } if set == "Metals"
        ));
    }

    #[test]
    fn set_reference_checked_before_type() {
        let mut doc = chip_model();
        doc["variables"]["x"]["indices"] = json!({ "i": "Products" });
        doc["variables"]["x"]["type"] = json!("Fractional");

        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::UndeclaredSet { .. }
        ));
    }

    #[test]
    fn parameter_key_outside_sets() {
        let mut doc = chip_model();
        doc["parameters"]["Profit"] = json!({ "Logic": 12, "GPU": 30 });

        assert_eq!(
            validate(&doc).unwrap_err(),
            SchemaError::UnknownMember {
                parameter: "Profit".to_string(),
                key: "GPU".to_string()
            }
        );
    }

    #[test]
    fn declared_parameter_form() {
        let mut doc = chip_model();
        doc["parameters"]["Bonus"] = json!({
            "indices": ["Chips"], "values": { "Logic": 2 }, "default": 0.5
        });

        let spec = validate(&doc).unwrap();
        let bonus = spec.parameters.get("Bonus").unwrap();
        assert_eq!(bonus.arity, Some(1));
        assert_eq!(bonus.get(&["Logic".into()]), Some(2.0));
        assert_eq!(bonus.get(&["Memory".into()]), Some(0.5));

        doc["parameters"]["Bonus"]["values"] = json!({ "Silicon": 2 });
        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::UnknownMember { key, .. } if key == "Silicon"
        ));
    }

    #[test]
    fn uneven_parameter_depth() {
        let mut doc = chip_model();
        doc["parameters"]["Usage"]["Silicon"] = json!(3);

        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::InvalidParameter { parameter, .. } if parameter == "Usage"
        ));
    }

    #[test]
    fn numeric_members_match_keys() {
        let doc = json!({
            "sets": { "Weeks": [1, 2, 3] },
            "parameters": { "Demand": { "1": 10, "2": 20, "3": 5 } },
            "variables": {},
            "objective": { "sense": "min", "expression": "0" },
            "constraints": {}
        });

        let spec = validate(&doc).unwrap();
        assert_eq!(
            spec.sets.members("Weeks").unwrap(),
            &[Symbol::from("1"), Symbol::from("2"), Symbol::from("3")]
        );
        assert_eq!(
            spec.parameters.get("Demand").unwrap().get(&["2".into()]),
            Some(20.0)
        );
    }

    #[test]
    fn zero_padded_members_keep_their_spelling() {
        let doc = json!({
            "sets": { "Products": ["001", "002"], "Grades": ["1.0", "2.5"] },
            "parameters": {
                "Cost": { "001": 5, "002": 7 },
                "Markup": { "indices": ["Grades"], "values": { "1.0": 1.1, "2.5": 1.3 } }
            },
            "variables": {},
            "objective": { "sense": "min", "expression": "0" },
            "constraints": {}
        });

        let spec = validate(&doc).unwrap();
        let cost = spec.parameters.get("Cost").unwrap();
        assert_eq!(cost.get(&["001".into()]), Some(5.0));
        assert_eq!(cost.get(&["002".into()]), Some(7.0));
        assert_eq!(cost.get(&["1".into()]), None);
        let markup = spec.parameters.get("Markup").unwrap();
        assert_eq!(markup.get(&["1.0".into()]), Some(1.1));
    }

    #[test]
    fn numeric_keys_fall_back_to_number_form() {
        let doc = json!({
            "sets": { "Weeks": [1, 2] },
            "parameters": { "Demand": { "1.0": 10, "02": 20 } },
            "variables": {},
            "objective": { "sense": "min", "expression": "0" },
            "constraints": {}
        });

        let demand = validate(&doc).unwrap().parameters.get("Demand").unwrap().clone();
        assert_eq!(demand.get(&["1".into()]), Some(10.0));
        assert_eq!(demand.get(&["2".into()]), Some(20.0));

        let doc = json!({
            "sets": { "Weeks": [1] },
            "parameters": { "Demand": { "1": 10, "1.0": 20 } },
            "variables": {},
            "objective": { "sense": "min", "expression": "0" },
            "constraints": {}
        });
        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::InvalidParameter { parameter, .. } if parameter == "Demand"
        ));
    }

    #[test]
    fn duplicate_member() {
        let mut doc = chip_model();
        doc["sets"]["Chips"] = json!(["Logic", "Logic"]);

        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::DuplicateMember { .. }
        ));
    }

    #[test]
    fn variable_type_spellings() {
        assert_eq!(parse_variable_type("x", Some("GRB.BINARY")).unwrap(), VariableType::Binary);
        assert_eq!(parse_variable_type("x", Some("integer")).unwrap(), VariableType::Integer);
        assert_eq!(parse_variable_type("x", None).unwrap(), VariableType::Continuous);
        assert!(parse_variable_type("x", Some("Fractional")).is_err());
    }

    #[test]
    fn unknown_variable_type() {
        let mut doc = chip_model();
        doc["variables"]["x"]["type"] = json!("Fractional");

        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::UnknownVariableType { given, .. } if given == "Fractional"
        ));
    }

    #[test]
    fn unknown_sense() {
        let mut doc = chip_model();
        doc["objective"]["sense"] = json!("optimise");

        assert_eq!(
            validate(&doc).unwrap_err(),
            SchemaError::UnknownSense("optimise".to_string())
        );

        doc["objective"]["sense"] = json!("GRB.MINIMIZE");
        assert_eq!(
            validate(&doc).unwrap().objective.sense,
            OptimizationSense::Minimize
        );
    }

    #[test]
    fn bound_sentinels() {
        let bound = |v: Value, lower| parse_bound("x", &v, lower).unwrap();

        assert_eq!(bound(json!("unbounded"), false), Bound::PosInfinity);
        assert_eq!(bound(json!("unbounded"), true), Bound::NegInfinity);
        assert_eq!(bound(json!("-inf"), true), Bound::NegInfinity);
        assert_eq!(bound(json!("GRB.INFINITY"), false), Bound::PosInfinity);
        assert_eq!(bound(json!("- GRB.INFINITY"), true), Bound::NegInfinity);
        assert_eq!(bound(json!("12.5"), false), Bound::Finite(12.5));
        assert_eq!(bound(Value::Null, true), Bound::Finite(0.0));
        assert_eq!(bound(Value::Null, false), Bound::PosInfinity);
        assert!(parse_bound("x", &json!("lots"), false).is_err());
        assert!(parse_bound("x", &json!([1]), false).is_err());
    }

    #[test]
    fn inverted_bounds() {
        let mut doc = chip_model();
        doc["variables"]["x"]["lower_bound"] = json!(10);
        doc["variables"]["x"]["upper_bound"] = json!(5);

        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::InvalidBounds { variable, .. } if variable == "x"
        ));
    }

    #[test]
    fn invalid_names() {
        let mut doc = chip_model();
        doc["sets"]["Chip Types"] = json!(["a"]);
        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::InvalidName { kind: "set", .. }
        ));

        let mut doc = chip_model();
        doc["parameters"]["x"] = json!(3);
        assert_eq!(validate(&doc).unwrap_err(), SchemaError::DuplicateName("x".into()));

        let mut doc = chip_model();
        doc["variables"]["sets"] = json!({});
        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::InvalidName { kind: "variable", .. }
        ));
    }

    #[test]
    fn malformed_shapes() {
        assert_eq!(validate(&json!([1, 2])).unwrap_err(), SchemaError::NotAnObject);

        let mut doc = chip_model();
        doc["constraints"]["material"] = json!({ "indices": {} });
        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::Malformed { path, .. } if path == "constraints.material"
        ));

        let mut doc = chip_model();
        doc["sets"]["Chips"] = json!("Logic");
        assert!(matches!(
            validate(&doc).unwrap_err(),
            SchemaError::Malformed { .. }
        ));
    }
}
