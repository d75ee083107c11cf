//! Building and solving a validated [`ModelSpec`].
//!
//! Each call to [`solve`] owns everything it creates: a fresh LP builder, the
//! [`VariableTable`] of decision variables and the backend model. Nothing is shared
//! between calls, so independent models can be solved concurrently.
//!
//! # Example
//!
//! ```no_run
//! use daisy::model::{SolveOptions, SolveStatus, solve_str};
//!
//! let text = std::fs::read_to_string("chips.json").unwrap();
//! let result = solve_str(&text, &SolveOptions::default()).unwrap();
//! if result.status == SolveStatus::Optimal {
//!     println!("profit: {:?}", result.objective_value);
//! }
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use std::{error::Error, fmt};

use tracing::{debug, info, warn};

use crate::lp_model_builder;
use crate::lp_solver::SolverBackend;
use crate::schema::ModelSpec;
use crate::ModelError;

mod builder;
mod result;
mod table;

pub use builder::build;
pub use result::{SolveResult, SolveStatus, VariableValues};
pub use table::{VariableFamily, VariableTable, instance_key};

/// What to do when an expression reads a parameter entry that has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MissingParameterPolicy {
    /// Fail with `IndexOutOfRange`.
    #[default]
    Error,
    /// Read the entry as 0.
    Zero,
}

/// Per-invocation settings.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Stop the search after this much wall-clock time.
    pub time_limit: Option<Duration>,
    pub missing_parameters: MissingParameterPolicy,
    /// Let the backend print its own log.
    pub solver_log: bool,
    /// Backend to use; `None` consults `DAISY_LP_SOLVER`.
    pub solver: Option<SolverBackend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// An expression names a variable, parameter, set or function that does not exist.
    UnresolvedReference,
    /// An operand has the wrong kind, e.g. a decision variable where a number is needed.
    TypeMismatch,
    /// A bound the backend cannot represent, or an empty bound interval.
    DegenerateBound,
}

impl fmt::Display for BuildErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildErrorKind::UnresolvedReference => write!(f, "UnresolvedReference"),
            BuildErrorKind::TypeMismatch => write!(f, "TypeMismatch"),
            BuildErrorKind::DegenerateBound => write!(f, "DegenerateBound"),
        }
    }
}

/// The model could not be assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    pub kind: BuildErrorKind,
    /// The offending expression text or variable name.
    pub subject: String,
    pub detail: String,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BuildError({}): {} in `{}`",
            self.kind, self.detail, self.subject
        )
    }
}

impl Error for BuildError {}

/// Build and solve a validated model.
///
/// Model errors (unresolvable names, non-linear terms, bad bounds) are returned as
/// `Err`; every solver outcome, including backend failures, is an `Ok` result.
pub fn solve(spec: &ModelSpec, options: &SolveOptions) -> Result<SolveResult, ModelError> {
    let backend = match options.solver {
        Some(backend) => backend,
        None => match SolverBackend::from_env_or_default() {
            Ok(backend) => backend,
            Err(e) => return Ok(SolveResult::solver_error(format!("{:#}", e))),
        },
    };

    let started = Instant::now();
    let mut builder = lp_model_builder!(GenericModel);
    let table = build(spec, options, backend, &mut builder)?;

    let variables = builder.variable_count();
    let constraints = builder.constraint_count();
    info!(
        model = %spec.model_name,
        variables,
        constraints,
        %backend,
        "model built in {:.3}s",
        started.elapsed().as_secs_f64()
    );

    if let Some(limit) = options.time_limit {
        builder.set_time_limit(limit);
    }
    builder.set_solver_output(options.solver_log);

    let solving = Instant::now();
    let solution = match panic::catch_unwind(AssertUnwindSafe(|| builder.solve_with(backend))) {
        Ok(Ok(solution)) => solution,
        Ok(Err(e)) => {
            warn!(%backend, "solver failed: {:#}", e);
            return Ok(SolveResult::solver_error(format!(
                "{} failed: {:#}",
                backend, e
            )));
        }
        Err(_) => {
            warn!(%backend, "solver panicked");
            return Ok(SolveResult::solver_error(format!(
                "{} aborted while solving",
                backend
            )));
        }
    };
    let elapsed = solving.elapsed().as_secs_f64();
    debug!(status = ?solution.status, "solved in {:.3}s", elapsed);

    let summary = format!(
        "model '{}': {} variables, {} constraints, solved by {} in {:.3}s",
        spec.model_name, variables, constraints, backend, elapsed
    );

    Ok(SolveResult::from_solution(&solution, &table, summary))
}

/// Validate a parsed JSON document, then build and solve it.
pub fn solve_document(
    document: &serde_json::Value,
    options: &SolveOptions,
) -> Result<SolveResult, ModelError> {
    let spec = ModelSpec::from_json(document)?;
    solve(&spec, options)
}

/// Parse, validate, build and solve JSON text.
pub fn solve_str(text: &str, options: &SolveOptions) -> Result<SolveResult, ModelError> {
    let spec: ModelSpec = text.parse()?;
    solve(&spec, options)
}

/// Solve JSON text and render the outcome for a tool caller.
///
/// Returns the SolveResult JSON document, or the error description when the model
/// could not be built. This never fails.
pub fn solve_to_string(text: &str, options: &SolveOptions) -> String {
    match solve_str(text, options) {
        Ok(result) => result.to_json(),
        Err(e) => e.to_string(),
    }
}

#[cfg(all(test, feature = "coin_cbc"))]
mod tests {
    use super::*;
    use crate::expr::EvalErrorKind;
    use serde_json::json;

    fn options() -> SolveOptions {
        SolveOptions {
            solver: Some(SolverBackend::CoinCbc),
            ..SolveOptions::default()
        }
    }

    fn chip_model() -> serde_json::Value {
        json!({
            "model_name": "ChipProduction",
            "sets": {
                "Chips": ["Logic", "Memory"],
                "Materials": ["Silicon", "Germanium", "Plastic", "Copper"]
            },
            "parameters": {
                "Profit": { "Logic": 12, "Memory": 9 },
                "Usage": {
                    "Silicon": { "Logic": 1, "Memory": 0 },
                    "Germanium": { "Logic": 0, "Memory": 1 },
                    "Plastic": { "Logic": 1, "Memory": 1 },
                    "Copper": { "Logic": 4, "Memory": 2 }
                },
                "Stock": { "Silicon": 1000, "Germanium": 1500, "Plastic": 1750, "Copper": 4800 }
            },
            "variables": {
                "x": { "indices": { "i": "Chips" }, "type": "Integer",
                       "lower_bound": 0, "upper_bound": "GRB.INFINITY" }
            },
            "objective": {
                "sense": "maximize",
                "expression": "gp.quicksum(variables['x'][i] * parameters['Profit'][i] for i in sets['Chips'])"
            },
            "constraints": {
                "MaterialConstraint": {
                    "indices": { "m": "Materials" },
                    "expression": "gp.quicksum(variables['x'][i] * parameters['Usage'][m][i] for i in sets['Chips']) <= parameters['Stock'][m]"
                }
            }
        })
    }

    #[test]
    fn chip_production_optimum() {
        let result = solve_document(&chip_model(), &options()).unwrap();

        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.objective_value.unwrap() - 17700.0).abs() < 1e-6);
        assert_eq!(result.value("x[Logic]"), Some(650.0));
        assert_eq!(result.value("x[Memory]"), Some(1100.0));
        assert!(result.diagnostic.contains("ChipProduction"));
    }

    #[test]
    fn solving_twice_is_identical() {
        let first = solve_document(&chip_model(), &options()).unwrap();
        let second = solve_document(&chip_model(), &options()).unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.objective_value, second.objective_value);
        assert_eq!(first.variable_values, second.variable_values);
    }

    #[test]
    fn unconstrained_model_matches_enumeration() {
        // maximise 3a - 2b + c over a, b, c in {0..3} integers, c binary
        let doc = json!({
            "sets": {},
            "parameters": {},
            "variables": {
                "a": { "type": "Integer", "lower_bound": 0, "upper_bound": 3 },
                "b": { "type": "Integer", "lower_bound": 0, "upper_bound": 3 },
                "c": { "type": "Binary" }
            },
            "objective": { "sense": "maximize", "expression": "3*a - 2*b + c" },
            "constraints": {}
        });
        let result = solve_document(&doc, &options()).unwrap();

        let best = (0..=3)
            .flat_map(|a| (0..=3).flat_map(move |b| (0..=1).map(move |c| 3 * a - 2 * b + c)))
            .max()
            .unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective_value, Some(best as f64));
    }

    #[test]
    fn contradictory_constraints_are_infeasible() {
        let doc = json!({
            "sets": {}, "parameters": {},
            "variables": { "x": { "type": "Integer", "lower_bound": 0, "upper_bound": 10 } },
            "objective": { "sense": "maximize", "expression": "x" },
            "constraints": {
                "low": { "indices": {}, "expression": "x >= 5" },
                "high": { "indices": {}, "expression": "x <= 2" }
            }
        });
        let result = solve_document(&doc, &options()).unwrap();

        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.objective_value.is_none());
        assert!(result.variable_values.is_none());
        assert!(!result.diagnostic.is_empty());
    }

    #[test]
    fn open_objective_is_unbounded() {
        let doc = json!({
            "sets": {}, "parameters": {},
            "variables": { "x": { "type": "Continuous", "lower_bound": 0, "upper_bound": "unbounded" } },
            "objective": { "sense": "maximize", "expression": "x" },
            "constraints": {}
        });
        let result = solve_document(&doc, &options()).unwrap();

        assert_eq!(result.status, SolveStatus::Unbounded);
        assert!(result.objective_value.is_none());
    }

    #[test]
    fn product_of_variables_is_rejected() {
        let mut doc = chip_model();
        doc["objective"]["expression"] = json!("x['Logic'] * x['Memory']");

        let err = solve_document(&doc, &options()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Eval(ref e) if e.kind == EvalErrorKind::NonLinear
        ));
        assert!(err.to_string().contains("x['Logic'] * x['Memory']"));
    }

    #[test]
    fn schema_errors_stop_before_building() {
        let mut doc = chip_model();
        doc["variables"]["x"]["indices"] = json!({ "i": "Products" });

        assert!(matches!(
            solve_document(&doc, &options()),
            Err(ModelError::Schema(_))
        ));
    }

    /// A market split instance: binary items must split every row total in half, with
    /// penalised slack. Its relaxation bound is 0 and no exact split exists, so a proof of
    /// optimality needs a long branch-and-bound search.
    fn market_split(rows: usize, items: usize) -> serde_json::Value {
        let row_names = (0..rows).map(|r| format!("r{}", r)).collect::<Vec<_>>();
        let item_names = (0..items).map(|j| format!("i{}", j)).collect::<Vec<_>>();
        let weight = |r: usize, j: usize| (r * 37 + j * 91 + r * j * 13 + 7) % 100;

        let mut a = serde_json::Map::new();
        let mut d = serde_json::Map::new();
        for (r, row) in row_names.iter().enumerate() {
            let weights = item_names
                .iter()
                .enumerate()
                .map(|(j, item)| (item.clone(), json!(weight(r, j))))
                .collect::<serde_json::Map<_, _>>();
            let total = (0..items).map(|j| weight(r, j)).sum::<usize>();
            a.insert(row.clone(), serde_json::Value::Object(weights));
            d.insert(row.clone(), json!(total / 2));
        }

        json!({
            "model_name": "MarketSplit",
            "sets": { "Rows": row_names, "Items": item_names },
            "parameters": { "A": a, "D": d },
            "variables": {
                "x": { "indices": { "j": "Items" }, "type": "Binary" },
                "over": { "indices": { "r": "Rows" } },
                "under": { "indices": { "r": "Rows" } }
            },
            "objective": {
                "sense": "minimize",
                "expression": "sum(over[r] + under[r] for r in Rows)"
            },
            "constraints": {
                "split": {
                    "indices": { "r": "Rows" },
                    "expression": "sum(A[r][j] * x[j] for j in Items) + under[r] - over[r] == D[r]"
                }
            }
        })
    }

    #[test]
    fn time_limit_stops_a_hard_model() {
        let options = SolveOptions {
            time_limit: Some(Duration::from_millis(1)),
            ..options()
        };
        let result = solve_document(&market_split(6, 50), &options).unwrap();

        assert_eq!(result.status, SolveStatus::TimeLimitReached, "{}", result.diagnostic);
        assert!(result.objective_value.is_none());
        assert!(result.variable_values.is_none());
        assert!(result.diagnostic.contains("time limit"), "{}", result.diagnostic);
    }

    #[test]
    fn string_boundary_never_fails() {
        let out = solve_to_string("{ nope", &options());
        assert!(out.starts_with("SchemaError"), "{}", out);

        let out = solve_to_string(&chip_model().to_string(), &options());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["status"], "Optimal");
        assert_eq!(parsed["variable_values"]["x[Logic]"], 650.0);
    }
}
