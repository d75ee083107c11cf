use crate::lp_solver::output_suppression::SolverOutputGuard;
use crate::lp_solver::*;
use ::coin_cbc::{Col, Model, Sense};

/// Snap integral columns to the nearest integer when CBC leaves them within tolerance.
fn clean_value(value: f64, var_type: VariableType) -> f64 {
    match var_type {
        VariableType::Continuous => value,
        VariableType::Integer | VariableType::Binary => {
            let rounded = value.round();
            if (value - rounded).abs() < 1e-6 {
                rounded
            } else {
                value
            }
        }
    }
}

/// Solve an LP model using Coin CBC
pub fn solve_coin_cbc<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    let _output_guard = SolverOutputGuard::new(!builder.solver_output);
    let backend = SolverBackend::CoinCbc;
    let mut model = Model::default();

    if !builder.solver_output {
        model.set_parameter("log", "0");
    }
    if let Some(limit) = builder.time_limit {
        model.set_parameter("sec", &format!("{}", limit.as_secs_f64()));
    }

    // Columns are created in variable-id order, so `cols[id]` is the column of variable `id`
    let cols: Vec<Col> = builder
        .variables
        .iter()
        .map(|var_info| {
            let col = match var_info.var_type {
                VariableType::Continuous => model.add_col(),
                VariableType::Integer => model.add_integer(),
                VariableType::Binary => model.add_binary(),
            };
            model.set_col_lower(col, backend.native_bound(var_info.lower_bound));
            model.set_col_upper(col, backend.native_bound(var_info.upper_bound));
            col
        })
        .collect();

    let column = |variable: &VariableId<Brand>| {
        cols.get(variable.id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Variable {:?} not found in model", variable))
    };

    for constraint in &builder.constraints {
        let row = model.add_row();

        for term in &constraint.expression.terms {
            model.set_weight(row, column(&term.variable)?, term.coefficient);
        }

        // Handle constant term
        let rhs_adjusted = constraint.rhs - constraint.expression.constant;

        match constraint.sense {
            ConstraintSense::LessEqual => model.set_row_upper(row, rhs_adjusted),
            ConstraintSense::Equal => model.set_row_equal(row, rhs_adjusted),
            ConstraintSense::GreaterEqual => model.set_row_lower(row, rhs_adjusted),
        }
    }

    if let Some(obj_info) = &builder.objective {
        for term in &obj_info.expression.terms {
            model.set_obj_coeff(column(&term.variable)?, term.coefficient);
        }

        model.set_obj_sense(match obj_info.sense {
            OptimizationSense::Minimize => Sense::Minimize,
            OptimizationSense::Maximize => Sense::Maximize,
        });
    }

    let solution = model.solve();
    let raw = solution.raw();

    let status = if raw.is_proven_optimal() {
        OptimizationStatus::Optimal
    } else if raw.is_continuous_unbounded() {
        OptimizationStatus::Unbounded
    } else if raw.is_initial_solve_proven_primal_infeasible() || raw.is_proven_infeasible() {
        OptimizationStatus::Infeasible
    } else if raw.is_initial_solve_proven_dual_infeasible() {
        OptimizationStatus::Unbounded
    } else if raw.is_seconds_limit_reached() {
        OptimizationStatus::TimeLimitReached
    } else if raw.is_abandoned() {
        OptimizationStatus::Other("CBC abandoned the search".to_string())
    } else {
        OptimizationStatus::Other(format!(
            "CBC status {:?}, secondary status {:?}",
            raw.status(),
            raw.secondary_status()
        ))
    };

    let variable_values: Vec<f64> = builder
        .variables
        .iter()
        .zip(cols.iter())
        .map(|(var_info, col)| clean_value(solution.col(*col), var_info.var_type))
        .collect();

    // CBC does not know about the objective constant
    let objective_value = builder
        .objective
        .as_ref()
        .map(|obj_info| raw.obj_value() + obj_info.expression.constant)
        .unwrap_or(0.0);

    Ok(LPSolution::new(status, objective_value, variable_values))
}
