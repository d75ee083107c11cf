use ::gurobi::{ConstrSense, Env, LinExpr, Model, ModelSense, Status, VarType, attr, param};

use crate::lp_solver::output_suppression::SolverOutputGuard;
use crate::lp_solver::*;

/// Gurobi treats any bound at or beyond this magnitude as infinite (`GRB.INFINITY`).
pub const GRB_INFINITY: f64 = 1e100;

fn linear_expr<Brand>(
    expression: &LinearExpression<Brand>,
    vars: &[::gurobi::Var],
) -> Result<LinExpr> {
    let mut gurobi_expr = LinExpr::new();

    for term in &expression.terms {
        let var = vars
            .get(term.variable.id)
            .ok_or_else(|| anyhow::anyhow!("Variable {:?} not found in model", term.variable))?;
        gurobi_expr = gurobi_expr.add_term(term.coefficient, var.clone());
    }

    Ok(gurobi_expr.add_constant(expression.constant))
}

fn map_status(status: Status) -> OptimizationStatus {
    match status {
        Status::Optimal => OptimizationStatus::Optimal,
        Status::SubOptimal => OptimizationStatus::Feasible,
        Status::Infeasible => OptimizationStatus::Infeasible,
        Status::Unbounded => OptimizationStatus::Unbounded,
        Status::InfOrUnbd => OptimizationStatus::InfeasibleOrUnbounded,
        Status::TimeLimit => OptimizationStatus::TimeLimitReached,
        other => OptimizationStatus::Other(format!("Gurobi status {:?}", other)),
    }
}

/// Solve an LP model using Gurobi
pub fn solve_gurobi<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    let _output_guard = SolverOutputGuard::new(!builder.solver_output);
    let backend = SolverBackend::Gurobi;

    let mut env = Env::new("")?;
    if !builder.solver_output {
        env.set(param::OutputFlag, 0)?;
    }
    if let Some(limit) = builder.time_limit {
        env.set(param::TimeLimit, limit.as_secs_f64())?;
    }
    let mut model = Model::new("daisy", &env)?;

    let vars = builder
        .variables
        .iter()
        .map(|var_info| {
            let vtype = match var_info.var_type {
                VariableType::Continuous => VarType::Continuous,
                VariableType::Integer => VarType::Integer,
                VariableType::Binary => VarType::Binary,
            };

            model.add_var(
                &var_info.name,
                vtype,
                0.0, // objective coefficient
                backend.native_bound(var_info.lower_bound),
                backend.native_bound(var_info.upper_bound),
                &[], // coefficients for existing constraints
                &[], // constraint indices
            )
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    model.update()?;

    for constraint in &builder.constraints {
        let sense = match constraint.sense {
            ConstraintSense::LessEqual => ConstrSense::Less,
            ConstraintSense::Equal => ConstrSense::Equal,
            ConstraintSense::GreaterEqual => ConstrSense::Greater,
        };

        model.add_constr(
            &constraint.name,
            linear_expr(&constraint.expression, &vars)?,
            sense,
            constraint.rhs,
        )?;
    }

    model.update()?;

    if let Some(obj_info) = &builder.objective {
        let sense = match obj_info.sense {
            OptimizationSense::Minimize => ModelSense::Minimize,
            OptimizationSense::Maximize => ModelSense::Maximize,
        };

        model.set_objective(linear_expr(&obj_info.expression, &vars)?, sense)?;
    }

    model.optimize()?;
    let mut optimization_status = map_status(model.status()?);

    // Presolve may stop at "infeasible or unbounded"; without dual reductions the
    // answer is definite.
    if optimization_status == OptimizationStatus::InfeasibleOrUnbounded {
        model.get_env_mut().set(param::DualReductions, 0)?;
        model.reset()?;
        model.optimize()?;
        optimization_status = map_status(model.status()?);
    }

    let mut variable_values = vec![0.0; vars.len()];
    let objective_value = match optimization_status {
        OptimizationStatus::Optimal => {
            for (value, var) in variable_values.iter_mut().zip(vars.iter()) {
                *value = var.get(&model, attr::X)?;
            }
            model.get(attr::ObjVal)?
        }
        _ => 0.0,
    };

    Ok(LPSolution::new(
        optimization_status,
        objective_value,
        variable_values,
    ))
}
