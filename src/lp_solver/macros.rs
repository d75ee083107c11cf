//! Macros for the LP solver module
//!
//! This module contains all the macros used by the LP solver, providing
//! convenient syntax for creating models and constraints.

/// Create a new LP model builder with a unique brand
///
/// This macro ensures that each model builder has a unique type-level brand,
/// preventing accidental mixing of variables between different models.
///
/// # Examples
///
/// ```rust
/// use daisy::lp_model_builder;
/// use daisy::lp_solver::VariableType;
///
/// // Anonymous brand (each call creates unique anonymous type)
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
///
/// // Named brand (easier to identify in type system and errors)
/// let mut production_model = lp_model_builder!(ProductionModel);
/// let mut scheduling_model = lp_model_builder!(SchedulingModel);
///
/// let prod_var = production_model.add_variable("p", VariableType::Continuous, 0.0, 100.0);
/// let sched_var = scheduling_model.add_variable("s", VariableType::Continuous, 0.0, 24.0);
/// ```
#[macro_export]
macro_rules! lp_model_builder {
    // Named brand - user provides the brand name
    ($brand_name:ident) => {{
        struct $brand_name;
        $crate::lp_solver::LPModelBuilder::<$brand_name>::new()
    }};

    // Anonymous brand - the `UniqueBrand` struct is defined locally within the `{{ ... }}` block,
    // so each macro invocation creates a fresh scope with its own distinct `UniqueBrand` type
    () => {{
        struct UniqueBrand;
        $crate::lp_solver::LPModelBuilder::<UniqueBrand>::new()
    }};
}

/// Create constraints using natural comparison syntax
///
/// The left-hand side must be in parentheses. An optional leading name is attached
/// to the constraint.
///
/// # Examples
///
/// ```rust
/// use daisy::constraint;
/// use daisy::lp_model_builder;
/// use daisy::lp_solver::VariableType;
///
/// let mut builder = lp_model_builder!(OptimisationModel);
/// let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
/// let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);
///
/// let c1 = constraint!((x + y) == 10.0);
/// let c2 = constraint!((2.0 * x) <= 5.0);
/// let c3 = constraint!("balance", (x - y) >= 0.0);
///
/// builder.add_constraint(constraint!((2.0 * x) <= 15.0));
/// ```
#[macro_export]
macro_rules! constraint {
    // Unnamed arms come first: a leading `$name:expr` would swallow `(lhs) == rhs`.
    (($lhs:expr) == $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::Equal,
            $rhs as f64,
        )
    };
    (($lhs:expr) <= $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::LessEqual,
            $rhs as f64,
        )
    };
    (($lhs:expr) >= $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::GreaterEqual,
            $rhs as f64,
        )
    };

    ($name:expr, ($lhs:expr) == $rhs:expr) => {
        $crate::constraint!(($lhs) == $rhs).named($name)
    };
    ($name:expr, ($lhs:expr) <= $rhs:expr) => {
        $crate::constraint!(($lhs) <= $rhs).named($name)
    };
    ($name:expr, ($lhs:expr) >= $rhs:expr) => {
        $crate::constraint!(($lhs) >= $rhs).named($name)
    };
}

#[cfg(test)]
mod tests {
    use crate::lp_solver::VariableType;

    #[test]
    fn test_named_brand_lp_model_builder() {
        let mut model1 = lp_model_builder!(TestModel1);
        let mut model2 = lp_model_builder!(TestModel2);

        let x1 = model1.add_variable("x1", VariableType::Continuous, 0.0, 10.0);
        let x2 = model2.add_variable("x2", VariableType::Continuous, 0.0, 10.0);

        let _expr1 = x1 + 5.0;
        let _expr2 = x2 + 5.0;

        // This would NOT compile if uncommented (different brands):
        // let _mixed = x1 + x2; // ERROR: different brands
    }

    #[test]
    fn test_branded_constraints_work() {
        use crate::constraint;

        let mut model = lp_model_builder!(ConstraintTestModel);
        let x = model.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = model.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        model.add_constraint(constraint!((x + y) == 10.0));
        model.add_constraint(constraint!("double", (x * 2.0) <= 20.0));

        assert_eq!(model.constraint_count(), 2);
        assert_eq!(model.constraints[1].name(), "double");
    }
}
