use itertools::Itertools;
use tracing::debug;

use crate::expr::{self, eval::Scope};
use crate::index;
use crate::lp_solver::{Constraint, LPModelBuilder, SolverBackend, VariableType};
use crate::model::{BuildError, BuildErrorKind, SolveOptions, VariableTable, instance_key};
use crate::schema::{Bound, IndexDecl, IndexTuple, ModelSpec, SetTable, VariableSpec};
use crate::{ModelError, Symbol};

fn degenerate(subject: &str, detail: String) -> ModelError {
    ModelError::Build(BuildError {
        kind: BuildErrorKind::DegenerateBound,
        subject: subject.to_string(),
        detail,
    })
}

/// Translate declared bounds into values the backend accepts.
///
/// Open bounds become the backend's own infinity. Binary variables are confined to
/// `[0, 1]`.
fn native_bounds(
    variable: &VariableSpec,
    backend: SolverBackend,
) -> Result<(f64, f64), ModelError> {
    let infinity = backend.infinity();

    let lower = match variable.lower_bound {
        Bound::NegInfinity => -infinity,
        Bound::Finite(v) => backend.native_bound(v),
        Bound::PosInfinity => infinity,
    };
    let upper = match variable.upper_bound {
        Bound::NegInfinity => -infinity,
        Bound::Finite(v) => backend.native_bound(v),
        Bound::PosInfinity => infinity,
    };

    if lower >= infinity || upper <= -infinity {
        return Err(degenerate(
            &variable.name,
            format!(
                "bounds [{}, {}] leave no finite value for the variable",
                variable.lower_bound, variable.upper_bound
            ),
        ));
    }

    if variable.var_type == VariableType::Binary {
        let (lower, upper) = (lower.max(0.0), upper.min(1.0));
        if lower > upper {
            return Err(degenerate(
                &variable.name,
                format!(
                    "bounds [{}, {}] do not intersect [0, 1] for a binary variable",
                    variable.lower_bound, variable.upper_bound
                ),
            ));
        }
        return Ok((lower, upper));
    }

    Ok((lower, upper))
}

fn expand(
    indices: &[IndexDecl],
    sets: &SetTable,
    owner: &str,
) -> Result<Vec<IndexTuple>, ModelError> {
    index::expand(indices, sets).ok_or_else(|| {
        ModelError::Build(BuildError {
            kind: BuildErrorKind::UnresolvedReference,
            subject: owner.to_string(),
            detail: "indices refer to an undeclared set".to_string(),
        })
    })
}

/// `family` for a scalar family, `family_a_b` for the tuple `(a, b)`.
fn constraint_name(family: &str, tuple: &[Symbol]) -> String {
    if tuple.is_empty() {
        family.to_string()
    } else {
        format!("{}_{}", family, tuple.iter().join("_"))
    }
}

fn binding_context(family: &str, indices: &[IndexDecl], tuple: &[Symbol]) -> String {
    if tuple.is_empty() {
        format!("constraint '{}'", family)
    } else {
        format!(
            "constraint '{}' with {}",
            family,
            index::bindings(indices, tuple)
                .map(|(symbol, member)| format!("{}={}", symbol, member))
                .join(", ")
        )
    }
}

/// Create the decision variables, objective and constraints of `spec` in `builder`.
///
/// Variables are created in declaration order, each over its expanded index tuples;
/// constraints likewise, one per tuple of their family. Returns the table mapping
/// every `(name, tuple)` to its handle.
pub fn build<Brand>(
    spec: &ModelSpec,
    options: &SolveOptions,
    backend: SolverBackend,
    builder: &mut LPModelBuilder<Brand>,
) -> Result<VariableTable<Brand>, ModelError> {
    let mut table = VariableTable::new();

    for variable in &spec.variables {
        let (lower, upper) = native_bounds(variable, backend)?;
        let tuples = expand(&variable.indices, &spec.sets, &variable.name)?;

        table.declare(&variable.name, variable.indices.len());
        for tuple in tuples {
            let id = builder.add_variable(
                instance_key(&variable.name, &tuple),
                variable.var_type,
                lower,
                upper,
            );
            table.insert(&variable.name, tuple, id);
        }
    }
    debug!(variables = table.len(), "created decision variables");

    let mut scope = Scope::new(
        &spec.sets,
        &spec.parameters,
        &table,
        options.missing_parameters,
    );

    let objective_text = &spec.objective.expression;
    let objective = scope
        .linear(&expr::parse(objective_text)?)
        .map_err(|fault| fault.into_error(objective_text, "objective"))?;
    builder.set_objective(objective, spec.objective.sense);

    for family in &spec.constraints {
        let parsed = expr::parse(&family.expression)?;
        let tuples = expand(&family.indices, &spec.sets, &family.name)?;
        let count = tuples.len();

        for tuple in tuples {
            scope.clear_bindings();
            for (symbol, member) in index::bindings(&family.indices, &tuple) {
                scope.bind(symbol, member);
            }

            let (lhs, sense, rhs) = scope.relation(&parsed).map_err(|fault| {
                fault.into_error(
                    &family.expression,
                    &binding_context(&family.name, &family.indices, &tuple),
                )
            })?;
            builder.add_constraint(
                Constraint::between(lhs, sense, rhs).named(constraint_name(&family.name, &tuple)),
            );
        }
        debug!(family = %family.name, count, "added constraints");
    }

    Ok(table)
}
