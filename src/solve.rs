//! Command-line front end.
//!
//! - **[`solve_main`]**: validates, builds and solves every input document and writes
//!   either the SolveResult JSON or a readable report.
//! - **[`validate_main`]**: validates and builds every input document without solving,
//!   printing the size of the resulting program.
//!
//! Several inputs are processed in parallel; output always follows the order in which
//! the inputs were given.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use daisy::solve::{OutputFormat, SolveArgs, solve_main};
//!
//! let args = SolveArgs {
//!     inputs: vec!["chips.json".into()],
//!     time_limit: Some(30.0),
//!     missing_parameters: Default::default(),
//!     solver: None,
//!     output: OutputFormat::Report,
//!     out: None,
//!     sort_by_value: true,
//!     solver_log: false,
//! };
//!
//! solve_main(args)?;
//! # Ok(())
//! # }
//! ```

use std::{cmp, fs, io::Write, path::PathBuf, time::Duration};

use anyhow::*;
use clap::Parser;
use ordered_float::OrderedFloat;
use prettytable::*;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    lp_model_builder,
    lp_solver::SolverBackend,
    model::{self, MissingParameterPolicy, SolveOptions, SolveResult},
    read_model,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// SolveResult JSON document
    #[default]
    Json,
    /// Status line and a table of variable values
    Report,
}

/// Command-line arguments for the solve command.
#[derive(Parser, Debug)]
pub struct SolveArgs {
    /// ModelSpec JSON documents
    #[clap(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Stop each solve after this many seconds
    #[clap(long, value_name = "SECONDS")]
    pub time_limit: Option<f64>,

    /// How to read parameter entries that have no value
    #[clap(long, value_enum, default_value_t = MissingParameterPolicy::Error)]
    pub missing_parameters: MissingParameterPolicy,

    /// LP backend (gurobi or coin_cbc); defaults to DAISY_LP_SOLVER
    #[clap(long, value_parser = SolverBackend::from_name)]
    pub solver: Option<SolverBackend>,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Output file (default: stdout)
    #[clap(long, short)]
    pub out: Option<PathBuf>,

    /// List variables by decreasing value in reports
    #[clap(long)]
    pub sort_by_value: bool,

    /// Show the backend's own log on stdout
    #[clap(long)]
    pub solver_log: bool,
}

/// Command-line arguments for the validate command.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// ModelSpec JSON documents
    #[clap(required = true)]
    pub inputs: Vec<PathBuf>,

    /// How to read parameter entries that have no value
    #[clap(long, value_enum, default_value_t = MissingParameterPolicy::Error)]
    pub missing_parameters: MissingParameterPolicy,

    /// LP backend whose bound range is checked; defaults to DAISY_LP_SOLVER
    #[clap(long, value_parser = SolverBackend::from_name)]
    pub solver: Option<SolverBackend>,
}

fn time_limit(seconds: Option<f64>) -> Result<Option<Duration>> {
    seconds
        .map(|s| {
            if s > 0.0 {
                Duration::try_from_secs_f64(s).map_err(anyhow::Error::from)
            } else {
                Err(anyhow!("time limit must be positive, got {}", s))
            }
        })
        .transpose()
}

fn solve_file(input: &PathBuf, options: &SolveOptions) -> Result<SolveResult> {
    let spec = read_model(input).with_context(|| format!("{}", input.display()))?;
    let result =
        model::solve(&spec, options).with_context(|| format!("{}", input.display()))?;
    info!(input = %input.display(), status = %result.status, "done");
    Ok(result)
}

fn write_report<W: Write>(
    writer: &mut W,
    result: &SolveResult,
    sort_by_value: bool,
) -> Result<()> {
    writeln!(writer, "Status: {}", result.status)?;
    if let Some(objective) = result.objective_value {
        writeln!(writer, "Objective: {}", objective)?;
    }
    writeln!(writer, "{}", result.diagnostic)?;

    if let Some(values) = &result.variable_values {
        let mut rows = values.iter().collect::<Vec<_>>();
        if sort_by_value {
            rows.sort_by_key(|(_, value)| cmp::Reverse(OrderedFloat(*value)));
        }

        let mut table = Table::new();
        table.set_titles(row!["Variable", "Value"]);
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        for (key, value) in rows {
            table.add_row(row![key, r->format!("{}", value)]);
        }
        writeln!(writer)?;
        table.print(writer)?;
    }

    Ok(())
}

/// Solve every input and write the outcomes in input order.
///
/// Solver outcomes other than `Optimal` are regular results. Inputs that cannot be read,
/// validated or built are reported as `error: ...`, and make the command fail once all
/// other inputs have been written.
pub fn solve_main(args: SolveArgs) -> Result<()> {
    let SolveArgs {
        inputs,
        time_limit: seconds,
        missing_parameters,
        solver,
        output,
        out,
        sort_by_value,
        solver_log,
    } = args;

    let options = SolveOptions {
        time_limit: time_limit(seconds)?,
        missing_parameters,
        solver_log,
        solver,
    };

    let mut writer: Box<dyn Write> = match out {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    let outcomes = inputs
        .par_iter()
        .map(|input| (input, solve_file(input, &options)))
        .collect::<Vec<_>>();

    let batch = outcomes.len() > 1;
    let mut failures = 0;

    match output {
        OutputFormat::Json if batch => {
            let mut document = serde_json::Map::new();
            for (input, outcome) in &outcomes {
                let entry = match outcome {
                    Result::Ok(result) => serde_json::to_value(result)?,
                    Err(e) => {
                        failures += 1;
                        serde_json::json!({ "error": format!("{:#}", e) })
                    }
                };
                document.insert(input.display().to_string(), entry);
            }
            writeln!(writer, "{}", serde_json::to_string_pretty(&document)?)?;
        }
        OutputFormat::Json => {
            for (_, outcome) in &outcomes {
                match outcome {
                    Result::Ok(result) => writeln!(writer, "{}", result.to_json())?,
                    Err(e) => {
                        failures += 1;
                        writeln!(writer, "error: {:#}", e)?;
                    }
                }
            }
        }
        OutputFormat::Report => {
            for (i, (input, outcome)) in outcomes.iter().enumerate() {
                if batch {
                    if i > 0 {
                        writeln!(writer)?;
                    }
                    writeln!(writer, "== {} ==", input.display())?;
                }
                match outcome {
                    Result::Ok(result) => write_report(&mut writer, result, sort_by_value)?,
                    Err(e) => {
                        failures += 1;
                        writeln!(writer, "error: {:#}", e)?;
                    }
                }
            }
        }
    }
    writer.flush()?;

    if failures > 0 {
        warn!(failures, "some models could not be solved");
        bail!("{} of {} models could not be solved", failures, outcomes.len());
    }

    Ok(())
}

/// Validate and build every input without solving.
pub fn validate_main(args: ValidateArgs) -> Result<()> {
    let ValidateArgs {
        inputs,
        missing_parameters,
        solver,
    } = args;

    let backend = match solver {
        Some(backend) => backend,
        None => SolverBackend::from_env_or_default()?,
    };
    let options = SolveOptions {
        missing_parameters,
        solver: Some(backend),
        ..SolveOptions::default()
    };

    let outcomes = inputs
        .par_iter()
        .map(|input| {
            let spec = read_model(input)?;
            let mut builder = lp_model_builder!(CheckedModel);
            model::build(&spec, &options, backend, &mut builder)?;
            Ok(format!(
                "model '{}': {} sets, {} parameters, {} variables, {} constraints",
                spec.model_name,
                spec.sets.len(),
                spec.parameters.len(),
                builder.variable_count(),
                builder.constraint_count()
            ))
        })
        .collect::<Vec<Result<String>>>();

    let mut failures = 0;
    for (input, outcome) in inputs.iter().zip(outcomes) {
        match outcome {
            Result::Ok(summary) => println!("{}: ok, {}", input.display(), summary),
            Err(e) => {
                failures += 1;
                println!("{}: error: {:#}", input.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} models are invalid", failures, inputs.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SolveStatus, VariableValues};

    #[test]
    fn rejects_non_positive_time_limits() {
        assert!(time_limit(Some(0.0)).is_err());
        assert!(time_limit(Some(-3.0)).is_err());
        assert!(time_limit(Some(f64::NAN)).is_err());
        assert_eq!(time_limit(None).unwrap(), None);
        assert_eq!(
            time_limit(Some(1.5)).unwrap(),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn report_lists_values_largest_first() {
        let result = SolveResult {
            objective_value: Some(7.0),
            variable_values: Some(
                [("x[a]", 1.0), ("x[b]", 6.0)]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<VariableValues>(),
            ),
            ..SolveResult::failed(SolveStatus::Optimal, "model 'm'")
        };

        let mut out = Vec::new();
        write_report(&mut out, &result, true).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Status: Optimal\nObjective: 7\n"), "{}", text);
        let b = text.find("x[b]").unwrap();
        let a = text.find("x[a]").unwrap();
        assert!(b < a, "{}", text);
    }

    #[test]
    fn report_of_failure_has_no_table() {
        let result = SolveResult::failed(SolveStatus::Infeasible, "model 'm': no assignment");
        let mut out = Vec::new();
        write_report(&mut out, &result, false).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "Status: Infeasible\nmodel 'm': no assignment\n");
    }
}
