//! Schema-driven mixed-integer linear programming.
//!
//! A model is described by a single JSON document, the *ModelSpec*: named index sets,
//! numeric parameters, decision variable families, one objective and any number of
//! constraint families. Objective and constraints are written as small arithmetic
//! expressions over those names (sums over generators, subscripts, comparisons).
//!
//! # Pipeline
//!
//! 1. **Validation** ([`schema`]): the document is checked and turned into a
//!    [`ModelSpec`]. Nothing is built for a document that fails here.
//! 2. **Expansion** ([`index`]): every indexed family is expanded over the cartesian
//!    product of its index sets, in declaration order.
//! 3. **Evaluation** ([`expr`]): each expression is parsed and evaluated into linear
//!    terms, with the current index bindings in scope.
//! 4. **Solving** ([`model`]): the assembled program is handed to an LP backend
//!    ([`lp_solver`]) and the outcome normalised into a [`SolveResult`].
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use daisy::{SolveOptions, read_model};
//! use std::path::Path;
//!
//! let spec = read_model(Path::new("chips.json"))?;
//! let result = daisy::model::solve(&spec, &SolveOptions::default())?;
//! println!("{}", result.to_json());
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Problems with the model itself surface as [`ModelError`]: a [`SchemaError`] for
//! invalid documents, an [`EvalError`] for expressions that cannot be evaluated into
//! linear form and a [`BuildError`] for models that cannot be assembled. Solver
//! outcomes, including backend failures, are always reported through [`SolveResult`].

use anyhow::Result;
use clap::Parser;
use std::{error::Error, fmt, fs, path::Path};

pub mod expr;
pub mod index;
pub mod lp_solver;
pub mod model;
pub mod schema;
pub mod solve;

pub use expr::{EvalError, EvalErrorKind};
pub use model::{
    BuildError, BuildErrorKind, MissingParameterPolicy, SolveOptions, SolveResult, SolveStatus,
};
pub use schema::{ModelSpec, SchemaError};
pub use solve::{SolveArgs, ValidateArgs, solve_main, validate_main};

/// Interned name used for sets, members, parameters and variables.
pub type Symbol = string_cache::DefaultAtom;

/// Everything that stops a model from reaching the solver.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Schema(SchemaError),
    Eval(EvalError),
    Build(BuildError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Schema(e) => write!(f, "SchemaError: {}", e),
            ModelError::Eval(e) => write!(f, "{}", e),
            ModelError::Build(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelError::Schema(e) => Some(e),
            ModelError::Eval(e) => Some(e),
            ModelError::Build(e) => Some(e),
        }
    }
}

impl From<SchemaError> for ModelError {
    fn from(e: SchemaError) -> Self {
        ModelError::Schema(e)
    }
}

impl From<EvalError> for ModelError {
    fn from(e: EvalError) -> Self {
        ModelError::Eval(e)
    }
}

impl From<BuildError> for ModelError {
    fn from(e: BuildError) -> Self {
        ModelError::Build(e)
    }
}

/// Reads and validates a ModelSpec document from a file.
///
/// I/O failures are reported as such; a document that is read but rejected yields the
/// [`SchemaError`] wrapped in a [`ModelError`].
pub fn read_model(file_name: &Path) -> Result<ModelSpec> {
    let text = fs::read_to_string(file_name)?;
    let spec: ModelSpec = text.parse().map_err(ModelError::from)?;
    Ok(spec)
}

/// Command-line interface of the `daisy` tool.
#[derive(Debug, Parser)]
#[clap(
    name = "daisy",
    version,
    about = "Build and solve mixed-integer linear programs described in JSON"
)]
pub struct CLIArguments {
    /// Log more (-v for progress, -vv for build details); RUST_LOG overrides
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Validate, build and solve one or more model documents.
    Solve(SolveArgs),
    /// Check model documents without solving them.
    Validate(ValidateArgs),
}
