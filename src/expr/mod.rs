//! The expression mini-language used by objectives and constraints.
//!
//! Expressions are parsed into an [`ast::Expr`] and evaluated by [`eval::Scope`], which
//! only ever sees the bound index symbols, the declared sets, the parameters and the
//! decision variables of one model. There is no other state an expression can reach.
//!
//! ```text
//! sum(Usage[m][i] * x[i] for i in Chips) <= Stock[m]
//! gp.quicksum(variables['y'][j] for j in sets['Plants'] if j != 'Austin') >= 1
//! ```

use std::{error::Error, fmt};

use lalrpop_util::ParseError;

pub mod ast;
pub mod eval;

lalrpop_util::lalrpop_mod! {grammar, "/expr/grammar.rs"}

pub use ast::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A product (or quotient) of two decision-variable expressions.
    NonLinear,
    /// No parameter or variable entry exists for the given key.
    IndexOutOfRange,
    /// The text is not a valid expression.
    SyntaxError,
    /// Division by a constant that evaluates to zero.
    DivisionByZero,
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalErrorKind::NonLinear => write!(f, "NonLinear"),
            EvalErrorKind::IndexOutOfRange => write!(f, "IndexOutOfRange"),
            EvalErrorKind::SyntaxError => write!(f, "SyntaxError"),
            EvalErrorKind::DivisionByZero => write!(f, "DivisionByZero"),
        }
    }
}

/// An expression could not be turned into a linear expression or relation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// The offending expression text, as written in the document.
    pub expression: String,
    pub detail: String,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EvalError({}): {} in expression `{}`",
            self.kind, self.detail, self.expression
        )
    }
}

impl Error for EvalError {}

/// Parse expression text into its syntax tree.
///
/// # Example
///
/// ```
/// use daisy::expr::{parse, Expr};
///
/// let expr = parse("sum(x[i] * Profit[i] for i in Chips)").unwrap();
/// assert!(matches!(expr, Expr::Generator { .. }));
/// ```
pub fn parse(text: &str) -> Result<Expr, EvalError> {
    let syntax_error = |detail| EvalError {
        kind: EvalErrorKind::SyntaxError,
        expression: text.to_string(),
        detail,
    };

    let expr = grammar::RelationParser::new()
        .parse(text)
        .map_err(|e| syntax_error(describe_parse_error(text, e)))?;

    let nesting = expr.nesting();
    if nesting > ast::MAX_NESTING {
        return Err(syntax_error(format!(
            "expression nests {} levels deep, at most {} are allowed",
            nesting,
            ast::MAX_NESTING
        )));
    }

    Ok(expr)
}

fn describe_parse_error<T: fmt::Display>(
    text: &str,
    error: ParseError<usize, T, &'static str>,
) -> String {
    let column = |offset: usize| text[..offset.min(text.len())].chars().count() + 1;
    let expected = |expected: &[String]| {
        if expected.is_empty() {
            String::new()
        } else {
            format!(", expected one of {}", expected.join(" "))
        }
    };

    match error {
        ParseError::InvalidToken { location } => {
            format!("unrecognised character at column {}", column(location))
        }
        ParseError::UnrecognizedEOF { expected: e, .. } => {
            format!("unexpected end of expression{}", expected(&e))
        }
        ParseError::UnrecognizedToken {
            token: (start, token, _),
            expected: e,
        } => format!(
            "unexpected `{}` at column {}{}",
            token,
            column(start),
            expected(&e)
        ),
        ParseError::ExtraToken {
            token: (start, token, _),
        } => format!("unexpected trailing `{}` at column {}", token, column(start)),
        ParseError::User { error } => error.to_string(),
    }
}
