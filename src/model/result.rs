use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::lp_solver::{LPSolution, OptimizationStatus};
use crate::model::VariableTable;

/// Terminal outcome of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimitReached,
    SolverError,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Unbounded => write!(f, "Unbounded"),
            SolveStatus::TimeLimitReached => write!(f, "TimeLimitReached"),
            SolveStatus::SolverError => write!(f, "SolverError"),
        }
    }
}

/// Variable values keyed by `name[index1,index2,...]`, in variable creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableValues(Vec<(String, f64)>);

impl VariableValues {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for VariableValues {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        VariableValues(iter.into_iter().collect())
    }
}

impl Serialize for VariableValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Normalised outcome of one invocation.
///
/// `objective_value` and `variable_values` are present only when the status is
/// [`SolveStatus::Optimal`]; `diagnostic` is always filled.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    pub status: SolveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_values: Option<VariableValues>,
    pub diagnostic: String,
}

/// `-0.0` reads badly in reports.
fn tidy(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

impl SolveResult {
    /// A non-optimal outcome.
    pub fn failed(status: SolveStatus, diagnostic: impl Into<String>) -> Self {
        Self {
            status,
            objective_value: None,
            variable_values: None,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn solver_error(diagnostic: impl Into<String>) -> Self {
        Self::failed(SolveStatus::SolverError, diagnostic)
    }

    /// Map a backend solution onto the normalised statuses, reading back every variable
    /// of `table` on optimality.
    pub fn from_solution<Brand>(
        solution: &LPSolution<Brand>,
        table: &VariableTable<Brand>,
        summary: String,
    ) -> Self {
        match &solution.status {
            OptimizationStatus::Optimal => {
                let values = table
                    .entries()
                    .map(|(key, var)| {
                        (key.to_string(), tidy(solution.get_value(var).unwrap_or(0.0)))
                    })
                    .collect();

                Self {
                    status: SolveStatus::Optimal,
                    objective_value: Some(tidy(solution.objective_value)),
                    variable_values: Some(VariableValues(values)),
                    diagnostic: summary,
                }
            }
            OptimizationStatus::Infeasible => Self::failed(
                SolveStatus::Infeasible,
                format!(
                    "{}: no assignment satisfies every constraint and bound",
                    summary
                ),
            ),
            OptimizationStatus::Unbounded => Self::failed(
                SolveStatus::Unbounded,
                format!(
                    "{}: the objective can improve without limit; a bound or constraint is missing",
                    summary
                ),
            ),
            OptimizationStatus::TimeLimitReached => Self::failed(
                SolveStatus::TimeLimitReached,
                format!(
                    "{}: time limit reached before optimality was proven",
                    summary
                ),
            ),
            OptimizationStatus::Feasible => Self::solver_error(format!(
                "{}: solver stopped with a feasible solution that is not proven optimal",
                summary
            )),
            OptimizationStatus::InfeasibleOrUnbounded => Self::solver_error(format!(
                "{}: solver reports the model is infeasible or unbounded",
                summary
            )),
            OptimizationStatus::Other(raw) => {
                Self::solver_error(format!("{}: {}", summary, raw))
            }
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Value of one variable instance, by its report key.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.variable_values.as_ref().and_then(|v| v.get(key))
    }

    /// Pretty JSON document of the result.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| format!("SolverError: could not encode result: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp_solver::{LPModelBuilder, VariableType};
    use crate::model::instance_key;
    use crate::Symbol;

    struct ResultModel;

    fn table_with(values: &[f64]) -> (VariableTable<ResultModel>, Vec<f64>) {
        let mut builder = LPModelBuilder::<ResultModel>::new();
        let mut table = VariableTable::new();
        let name = Symbol::from("x");
        for member in ["a", "b"] {
            let key = vec![Symbol::from(member)];
            let id = builder.add_variable(
                instance_key(&name, &key),
                VariableType::Continuous,
                0.0,
                1.0,
            );
            table.insert(&name, key, id);
        }
        (table, values.to_vec())
    }

    #[test]
    fn serialises_optimal_result_in_order() {
        let result = SolveResult {
            status: SolveStatus::Optimal,
            objective_value: Some(3.5),
            variable_values: Some(VariableValues(vec![
                ("x[b]".to_string(), 1.0),
                ("x[a]".to_string(), 2.5),
            ])),
            diagnostic: "ok".to_string(),
        };

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"status":"Optimal","objective_value":3.5,"variable_values":{"x[b]":1.0,"x[a]":2.5},"diagnostic":"ok"}"#
        );
    }

    #[test]
    fn failures_omit_values() {
        let result = SolveResult::failed(SolveStatus::Infeasible, "no");
        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();

        assert_eq!(json["status"], "Infeasible");
        assert!(json.get("objective_value").is_none());
        assert!(json.get("variable_values").is_none());
        assert_eq!(json["diagnostic"], "no");
    }

    #[test]
    fn every_backend_status_is_normalised() {
        let (table, values) = table_with(&[1.0, 0.0]);
        for (status, expected, wording) in [
            (OptimizationStatus::Infeasible, SolveStatus::Infeasible, "no assignment"),
            (OptimizationStatus::Unbounded, SolveStatus::Unbounded, "without limit"),
            (
                OptimizationStatus::TimeLimitReached,
                SolveStatus::TimeLimitReached,
                "time limit",
            ),
            (OptimizationStatus::Feasible, SolveStatus::SolverError, "not proven optimal"),
            (
                OptimizationStatus::InfeasibleOrUnbounded,
                SolveStatus::SolverError,
                "infeasible or unbounded",
            ),
            (
                OptimizationStatus::Other("CBC status Abandoned".to_string()),
                SolveStatus::SolverError,
                "CBC status Abandoned",
            ),
        ] {
            let solution = LPSolution::<ResultModel>::new(status, 7.0, values.clone());
            let result = SolveResult::from_solution(&solution, &table, "m".to_string());

            assert_eq!(result.status, expected);
            assert!(result.diagnostic.starts_with("m: "), "{}", result.diagnostic);
            assert!(result.diagnostic.contains(wording), "{}", result.diagnostic);
            // only proven optima carry values
            assert_eq!(result.objective_value, None);
            assert!(result.variable_values.is_none());
        }
    }

    #[test]
    fn optimal_reads_every_variable() {
        let (table, values) = table_with(&[1.0, -0.0]);
        let solution = LPSolution::<ResultModel>::new(OptimizationStatus::Optimal, 4.0, values);

        let result = SolveResult::from_solution(&solution, &table, "m".to_string());
        assert!(result.is_optimal());
        assert_eq!(result.objective_value, Some(4.0));
        assert_eq!(result.value("x[a]"), Some(1.0));
        assert_eq!(result.value("x[b]"), Some(0.0));
        assert!(result.value("x[b]").unwrap().is_sign_positive());
        assert_eq!(result.variable_values.as_ref().unwrap().len(), 2);
    }
}
