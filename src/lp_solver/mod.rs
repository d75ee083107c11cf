//! Linear Programming (LP) solver abstraction layer
//!
//! This module provides a trait-free, backend-independent model builder for mixed-integer
//! linear programs, keeping the rest of the crate independent of specific solver
//! implementations like Gurobi and coin_cbc.
//!
//! # Type Safety with Branded Types
//!
//! All core types (`VariableId`, `LinearExpression`, `Constraint`, `LPModelBuilder`)
//! use a generic `Brand` type parameter that provides compile-time guarantees:
//!
//! - Variables from one builder cannot be accidentally used with another builder
//! - Constraints are type-checked to ensure they only use variables from their builder
//! - No runtime overhead - the brand is a zero-sized phantom type
//!
//! Use the `lp_model_builder!()` macro to create builders with guaranteed unique brands:
//!
//! ```rust
//! use daisy::constraint;
//! use daisy::lp_model_builder;
//! use daisy::lp_solver::VariableType;
//!
//! let mut builder1 = lp_model_builder!();
//! let mut builder2 = lp_model_builder!();
//!
//! let x = builder1.add_variable("x", VariableType::Continuous, 0.0, 10.0);
//! let y = builder2.add_variable("y", VariableType::Continuous, 0.0, 10.0);
//!
//! // This compiles:
//! builder1.add_constraint(constraint!((x) <= 5.0));
//!
//! // This would NOT compile (type error):
//! // builder1.add_constraint(constraint!((y) <= 5.0));
//! ```
//!
//! # Building LP Models
//!
//! ```rust,no_run
//! use daisy::constraint;
//! use daisy::lp_model_builder;
//! use daisy::lp_solver::{OptimizationSense, SolverBackend, VariableType};
//!
//! let mut builder = lp_model_builder!();
//! let x = builder.add_variable("x", VariableType::Continuous, 0.0, f64::INFINITY);
//! let y = builder.add_variable("y", VariableType::Integer, 0.0, f64::INFINITY);
//!
//! builder.add_constraint(constraint!("capacity", (x + y) <= 10.0));
//! builder.add_constraint(constraint!((2.0 * x - y) >= 1.0));
//!
//! builder.set_objective(x + 2.0 * y, OptimizationSense::Maximize);
//! let _solution = builder.solve_with(SolverBackend::from_env_or_default().unwrap());
//! ```
//!
//! # Infinite bounds
//!
//! Bounds are plain `f64`, with `f64::INFINITY`/`f64::NEG_INFINITY` meaning "open".
//! Each backend advertises its native infinity through [`SolverBackend::infinity`]; any
//! bound at or beyond it is handed to the backend as that native value, never as a
//! literal IEEE infinity the backend would reject.
//!
//! # Solver Selection
//!
//! The solver backend can be selected via the `DAISY_LP_SOLVER` environment variable:
//! - `"gurobi"` - Use Gurobi (requires `gurobi` feature)
//! - `"coin_cbc"` or `"cbc"` - Use COIN-OR CBC (requires `coin_cbc` feature)
//!
//! If not set, the solver defaults to Gurobi if available, otherwise CBC.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

/// Environment variable used to pick a backend at runtime.
pub const SOLVER_ENV_VAR: &str = "DAISY_LP_SOLVER";

/// Variable types supported by LP solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Continuous variable (can take any real value)
    Continuous,
    /// Integer variable (can only take integer values)
    Integer,
    /// Binary variable (can only take values 0 or 1)
    Binary,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "Continuous"),
            VariableType::Integer => write!(f, "Integer"),
            VariableType::Binary => write!(f, "Binary"),
        }
    }
}

/// Constraint sense for linear constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// Less than or equal to (≤)
    LessEqual,
    /// Equal to (=)
    Equal,
    /// Greater than or equal to (≥)
    GreaterEqual,
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSense::LessEqual => write!(f, "<="),
            ConstraintSense::Equal => write!(f, "=="),
            ConstraintSense::GreaterEqual => write!(f, ">="),
        }
    }
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

impl fmt::Display for OptimizationSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationSense::Minimize => write!(f, "minimize"),
            OptimizationSense::Maximize => write!(f, "maximize"),
        }
    }
}

/// Status of the optimization process, as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Optimal solution found
    Optimal,
    /// Feasible solution found, but not necessarily optimal
    Feasible,
    /// Problem is infeasible (no solution exists)
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// Problem is infeasible or unbounded
    InfeasibleOrUnbounded,
    /// The configured time limit expired before the search finished
    TimeLimitReached,
    /// Other status (solver-specific), with the backend's own description
    Other(String),
}

/// Available LP solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    #[cfg(feature = "gurobi")]
    /// Gurobi commercial solver
    Gurobi,
    #[cfg(feature = "coin_cbc")]
    /// Coin CBC open-source solver
    CoinCbc,
}

impl SolverBackend {
    /// Get the solver backend from environment variable or use fallback logic
    pub fn from_env_or_default() -> Result<Self> {
        match env::var(SOLVER_ENV_VAR) {
            Ok(solver_name) => Self::from_name(&solver_name)
                .with_context(|| format!("{} is set to '{}'", SOLVER_ENV_VAR, solver_name)),
            Err(_) => Self::default_backend(),
        }
    }

    /// Resolve a backend by name (`gurobi`, `coin_cbc`, `coin-cbc` or `cbc`).
    pub fn from_name(solver_name: &str) -> Result<Self> {
        match solver_name.to_lowercase().as_str() {
            "gurobi" => {
                #[cfg(feature = "gurobi")]
                return Ok(SolverBackend::Gurobi);
                #[cfg(not(feature = "gurobi"))]
                return Err(anyhow::anyhow!(
                    "Gurobi solver requested but the gurobi feature is not enabled"
                ));
            }
            "coin_cbc" | "coin-cbc" | "cbc" => {
                #[cfg(feature = "coin_cbc")]
                return Ok(SolverBackend::CoinCbc);
                #[cfg(not(feature = "coin_cbc"))]
                return Err(anyhow::anyhow!(
                    "Coin CBC solver requested but the coin_cbc feature is not enabled"
                ));
            }
            _ => Err(anyhow::anyhow!(
                "Invalid solver '{}'. Valid options: gurobi, coin_cbc",
                solver_name
            )),
        }
    }

    fn default_backend() -> Result<Self> {
        // Fallback logic: prefer gurobi if available, then coin_cbc
        #[cfg(feature = "gurobi")]
        return Ok(SolverBackend::Gurobi);

        #[allow(unreachable_code)]
        #[cfg(feature = "coin_cbc")]
        return Ok(SolverBackend::CoinCbc);

        #[cfg(not(any(feature = "gurobi", feature = "coin_cbc")))]
        Err(anyhow::anyhow!(
            "No LP solver backend available. Please enable a solver feature (e.g., 'gurobi' or 'coin_cbc')"
        ))
    }

    /// The largest bound magnitude the backend accepts; anything at or beyond it is open.
    pub fn infinity(self) -> f64 {
        match self {
            #[cfg(feature = "gurobi")]
            SolverBackend::Gurobi => crate::lp_solver::gurobi::GRB_INFINITY,
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => f64::INFINITY,
        }
    }

    /// Clamp a bound to the backend's representable range.
    pub fn native_bound(self, value: f64) -> f64 {
        let infinity = self.infinity();
        if value >= infinity {
            infinity
        } else if value <= -infinity {
            -infinity
        } else {
            value
        }
    }
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            #[cfg(feature = "gurobi")]
            SolverBackend::Gurobi => write!(f, "gurobi"),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => write!(f, "coin_cbc"),
        }
    }
}

/// A linear expression term: coefficient * variable
pub struct LinearTerm<Brand> {
    pub coefficient: f64,
    pub variable: VariableId<Brand>,
}

impl<Brand> fmt::Debug for LinearTerm<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearTerm")
            .field("coefficient", &self.coefficient)
            .field("variable", &self.variable)
            .finish()
    }
}

impl<Brand> Clone for LinearTerm<Brand> {
    fn clone(&self) -> Self {
        Self {
            coefficient: self.coefficient,
            variable: self.variable,
        }
    }
}

/// A linear expression: sum of terms plus constant
pub struct LinearExpression<Brand> {
    pub terms: Vec<LinearTerm<Brand>>,
    pub constant: f64,
}

impl<Brand> fmt::Debug for LinearExpression<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearExpression")
            .field("terms", &self.terms)
            .field("constant", &self.constant)
            .finish()
    }
}

impl<Brand> Clone for LinearExpression<Brand> {
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: self.constant,
        }
    }
}

impl<Brand> LinearExpression<Brand> {
    /// Create a new linear expression with a constant term
    pub fn new(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Add a term to the expression
    pub fn add_term(&mut self, coefficient: f64, variable: VariableId<Brand>) {
        self.terms.push(LinearTerm {
            coefficient,
            variable,
        });
    }

    /// Create a linear expression from a single variable
    pub fn from_variable(variable: VariableId<Brand>) -> Self {
        Self {
            terms: vec![LinearTerm {
                coefficient: 1.0,
                variable,
            }],
            constant: 0.0,
        }
    }

    /// Merge repeated variables into a single term and drop zero coefficients.
    ///
    /// Backends set one coefficient per (row, column), so repeated terms must be
    /// summed before they reach them. First-occurrence order is kept.
    pub fn simplify(self) -> Self {
        let mut position: HashMap<VariableId<Brand>, usize> = HashMap::new();
        let mut terms: Vec<LinearTerm<Brand>> = Vec::with_capacity(self.terms.len());

        for term in self.terms {
            if let Some(&i) = position.get(&term.variable) {
                terms[i].coefficient += term.coefficient;
            } else {
                position.insert(term.variable, terms.len());
                terms.push(term);
            }
        }
        terms.retain(|t| t.coefficient != 0.0);

        Self {
            terms,
            constant: self.constant,
        }
    }

}

impl<Brand> From<VariableId<Brand>> for LinearExpression<Brand> {
    fn from(variable: VariableId<Brand>) -> Self {
        Self::from_variable(variable)
    }
}

impl<Brand> From<f64> for LinearExpression<Brand> {
    fn from(constant: f64) -> Self {
        Self::new(constant)
    }
}

/// Unique identifier for a variable in the LP model
///
/// The `Brand` type parameter ensures that variables can only be used with the
/// builder that created them. This is enforced at compile time.
pub struct VariableId<Brand> {
    id: usize,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> VariableId<Brand> {
    /// Position of the variable in its builder (and in solution vectors).
    pub fn index(&self) -> usize {
        self.id
    }
}

// Manual trait implementations that don't require Brand to implement anything
impl<Brand> fmt::Debug for VariableId<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableId").field("id", &self.id).finish()
    }
}

impl<Brand> Clone for VariableId<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for VariableId<Brand> {}

impl<Brand> PartialEq for VariableId<Brand> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Brand> Eq for VariableId<Brand> {}

impl<Brand> std::hash::Hash for VariableId<Brand> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Unique identifier for a constraint in the LP model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

/// A linear constraint representation
///
/// Constraints define relationships between linear expressions and constants.
/// The `Brand` type parameter ensures type safety - constraints can only use
/// variables from the builder that will consume them.
///
/// # Examples
///
/// ```rust,no_run
/// use daisy::constraint;
/// use daisy::lp_model_builder;
/// use daisy::lp_solver::{Constraint, ConstraintSense, VariableType};
///
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
/// let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);
///
/// // Using the constraint! macro (recommended)
/// let c = constraint!((x + y) == 10.0);
///
/// // Both sides may hold variables
/// let c = Constraint::between(x + 1.0, ConstraintSense::LessEqual, 2.0 * y).named("balance");
///
/// // Using the constructor directly
/// let c = Constraint::new(x + y, ConstraintSense::Equal, 10.0);
/// ```
pub struct Constraint<Brand> {
    name: String,
    expression: LinearExpression<Brand>,
    sense: ConstraintSense,
    rhs: f64,
}

impl<Brand> fmt::Debug for Constraint<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("sense", &self.sense)
            .field("rhs", &self.rhs)
            .finish()
    }
}

impl<Brand> Constraint<Brand> {
    /// Create a new constraint
    pub fn new(
        expression: impl Into<LinearExpression<Brand>>,
        sense: ConstraintSense,
        rhs: f64,
    ) -> Self {
        Self {
            name: String::new(),
            expression: expression.into(),
            sense,
            rhs,
        }
    }

    /// Build `lhs <sense> rhs` where both sides may hold variables.
    ///
    /// Everything is moved to the left; the constant part becomes the right-hand side.
    pub fn between(
        lhs: LinearExpression<Brand>,
        sense: ConstraintSense,
        rhs: LinearExpression<Brand>,
    ) -> Self {
        let difference = (lhs - rhs).simplify();
        let rhs = -difference.constant;
        Self::new(
            LinearExpression {
                terms: difference.terms,
                constant: 0.0,
            },
            sense,
            rhs,
        )
    }

    /// Attach a human-readable name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sense(&self) -> ConstraintSense {
        self.sense
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    pub fn expression(&self) -> &LinearExpression<Brand> {
        &self.expression
    }
}

/// Variable information stored in the model
#[derive(Debug, Clone)]
struct VariableInfo {
    name: String,
    var_type: VariableType,
    lower_bound: f64,
    upper_bound: f64,
}

/// Objective function information
struct ObjectiveInfo<Brand> {
    expression: LinearExpression<Brand>,
    sense: OptimizationSense,
}

/// Result of solving an LP model
#[derive(Debug, Clone)]
pub struct LPSolution<Brand> {
    pub status: OptimizationStatus,
    pub objective_value: f64,
    variable_values: Vec<f64>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPSolution<Brand> {
    /// Assemble a solution from per-variable values indexed by variable id
    pub fn new(
        status: OptimizationStatus,
        objective_value: f64,
        variable_values: Vec<f64>,
    ) -> Self {
        Self {
            status,
            objective_value,
            variable_values,
            _brand: PhantomData,
        }
    }

    /// Get the value of a variable from the solution
    pub fn get_value(&self, var_id: VariableId<Brand>) -> Option<f64> {
        self.variable_values.get(var_id.id).copied()
    }
}

/// Builder for LP models that can work with different backends
///
/// The `Brand` type parameter ensures type safety - variables from one builder
/// cannot be accidentally used with another builder. This is enforced at compile time.
pub struct LPModelBuilder<Brand> {
    variables: Vec<VariableInfo>,
    constraints: Vec<Constraint<Brand>>,
    objective: Option<ObjectiveInfo<Brand>>,
    time_limit: Option<Duration>,
    solver_output: bool,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPModelBuilder<Brand> {
    /// Create a new LP model builder
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            time_limit: None,
            solver_output: false,
            _brand: PhantomData,
        }
    }

    /// Add a variable to the model
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        var_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> VariableId<Brand> {
        let var_id = VariableId {
            id: self.variables.len(),
            _brand: PhantomData,
        };
        self.variables.push(VariableInfo {
            name: name.into(),
            var_type,
            lower_bound,
            upper_bound,
        });
        var_id
    }

    /// Add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint<Brand>) -> ConstraintId {
        let constr_id = ConstraintId(self.constraints.len());
        let Constraint {
            name,
            expression,
            sense,
            rhs,
        } = constraint;
        self.constraints.push(Constraint {
            name,
            expression: expression.simplify(),
            sense,
            rhs,
        });
        constr_id
    }

    /// Set the objective function
    pub fn set_objective(&mut self, expression: LinearExpression<Brand>, sense: OptimizationSense) {
        self.objective = Some(ObjectiveInfo {
            expression: expression.simplify(),
            sense,
        });
    }

    /// Stop the search after `limit` wall-clock time
    pub fn set_time_limit(&mut self, limit: Duration) {
        self.time_limit = Some(limit);
    }

    /// Let the backend print its own log instead of suppressing it
    pub fn set_solver_output(&mut self, enabled: bool) {
        self.solver_output = enabled;
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Constraints added so far, with their expressions simplified
    pub fn constraints(&self) -> &[Constraint<Brand>] {
        &self.constraints
    }

    /// Name given to a variable when it was added
    pub fn variable_name(&self, var_id: VariableId<Brand>) -> &str {
        &self.variables[var_id.id].name
    }

    /// Solve the model using the given backend
    pub fn solve_with(self, solver: SolverBackend) -> Result<LPSolution<Brand>> {
        match solver {
            #[cfg(feature = "gurobi")]
            SolverBackend::Gurobi => crate::lp_solver::gurobi::solve_gurobi(&self),

            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => crate::lp_solver::coin_cbc::solve_coin_cbc(&self),
        }
    }
}

impl<Brand> Default for LPModelBuilder<Brand> {
    fn default() -> Self {
        Self::new()
    }
}

// Macros for convenient syntax
pub mod macros;

// Operator overloading for linear expressions
pub mod ops;

pub mod output_suppression;

#[cfg(feature = "gurobi")]
pub mod gurobi;

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, lp_model_builder};

    #[test]
    fn test_constraint_macro() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        let c = constraint!((x + y) == 10.0);
        assert_eq!(c.sense, ConstraintSense::Equal);
        assert_eq!(c.rhs, 10.0);

        let c = constraint!((2.0 * x) <= 5.0);
        assert_eq!(c.sense, ConstraintSense::LessEqual);
        assert_eq!(c.rhs, 5.0);

        let c = constraint!("diff", (x - y) >= 0.0);
        assert_eq!(c.sense, ConstraintSense::GreaterEqual);
        assert_eq!(c.name(), "diff");
    }

    #[test]
    fn test_add_constraint_merges_terms() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        builder.add_constraint(constraint!((x + y + 2.0 * x - y) <= 6.0));

        let stored = &builder.constraints[0];
        assert_eq!(stored.expression.terms.len(), 1);
        assert_eq!(stored.expression.terms[0].variable, x);
        assert_eq!(stored.expression.terms[0].coefficient, 3.0);
    }

    #[test]
    fn test_between_moves_everything_left() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        // x + 3 <= 2y - 1  =>  x - 2y <= -4
        let c = Constraint::between(x + 3.0, ConstraintSense::LessEqual, 2.0 * y - 1.0);
        assert_eq!(c.rhs(), -4.0);
        assert_eq!(c.expression().constant, 0.0);
        assert_eq!(c.expression().terms.len(), 2);
        assert_eq!(c.expression().terms[1].coefficient, -2.0);
    }

    #[test]
    fn test_solver_from_name() {
        let err = SolverBackend::from_name("does-not-exist").unwrap_err().to_string();
        assert!(err.contains("does-not-exist"), "{}", err);
        assert!(!err.contains(SOLVER_ENV_VAR), "{}", err);
        #[cfg(feature = "coin_cbc")]
        assert_eq!(
            SolverBackend::from_name("CBC").unwrap(),
            SolverBackend::CoinCbc
        );
    }

    #[cfg(feature = "coin_cbc")]
    #[test]
    fn test_native_bound_clamps() {
        let backend = SolverBackend::CoinCbc;
        assert_eq!(backend.native_bound(5.0), 5.0);
        assert_eq!(backend.native_bound(f64::INFINITY), f64::INFINITY);
        assert_eq!(backend.native_bound(f64::NEG_INFINITY), f64::NEG_INFINITY);
    }
}
