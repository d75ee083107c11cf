//! Sandboxed evaluation of expression trees.
//!
//! A [`Scope`] resolves names against exactly four things: the currently bound index
//! symbols (innermost first), the decision variables, the parameters and, inside
//! `for … in` and `len()`, the sets. Evaluation yields numbers, set-member labels or
//! linear expressions over the model's variables; anything that would leave the linear
//! world is a [`Fault`].

use std::cmp::Ordering;
use std::fmt;

use crate::Symbol;
use crate::expr::ast::{BinOp, CmpOp, Condition, Expr, Generator, RelOp};
use crate::expr::{EvalError, EvalErrorKind};
use crate::lp_solver::{ConstraintSense, LinearExpression};
use crate::model::{BuildError, BuildErrorKind, MissingParameterPolicy, VariableTable};
use crate::schema::{ParameterTable, SetTable, number_label};
use crate::ModelError;

const SUM_FUNCTIONS: [&str; 3] = ["sum", "quicksum", "gp.quicksum"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    NonLinear,
    IndexOutOfRange,
    DivisionByZero,
    UnresolvedReference,
    TypeMismatch,
}

/// Why an expression could not be evaluated, before it is tied to its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub detail: String,
}

impl Fault {
    fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    fn mismatch(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::TypeMismatch, detail)
    }

    fn non_linear(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::NonLinear, detail)
    }

    /// Attach the expression text and where it was being evaluated.
    pub fn into_error(self, expression: &str, context: &str) -> ModelError {
        let detail = if context.is_empty() {
            self.detail
        } else {
            format!("{} ({})", self.detail, context)
        };
        let expression = expression.to_string();

        let eval = |kind| {
            ModelError::Eval(EvalError {
                kind,
                expression: expression.clone(),
                detail: detail.clone(),
            })
        };
        let build = |kind| {
            ModelError::Build(BuildError {
                kind,
                subject: expression.clone(),
                detail: detail.clone(),
            })
        };

        match self.kind {
            FaultKind::NonLinear => eval(EvalErrorKind::NonLinear),
            FaultKind::IndexOutOfRange => eval(EvalErrorKind::IndexOutOfRange),
            FaultKind::DivisionByZero => eval(EvalErrorKind::DivisionByZero),
            FaultKind::UnresolvedReference => build(BuildErrorKind::UnresolvedReference),
            FaultKind::TypeMismatch => build(BuildErrorKind::TypeMismatch),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

/// Result of evaluating a sub-expression.
pub enum Value<Brand> {
    Number(f64),
    /// A set member, either bound by an index symbol or written as a quoted literal.
    Label(Symbol),
    Linear(LinearExpression<Brand>),
}

impl<Brand> fmt::Debug for Value<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Label(l) => f.debug_tuple("Label").field(l).finish(),
            Value::Linear(e) => f.debug_tuple("Linear").field(e).finish(),
        }
    }
}

/// Numeric labels (`"3"`, week numbers and the like) take part in arithmetic.
fn label_number(label: &Symbol) -> Option<f64> {
    label.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// An arithmetic operand: either a known constant or an expression over variables.
enum Operand<Brand> {
    Const(f64),
    Linear(LinearExpression<Brand>),
}

impl<Brand> Operand<Brand> {
    fn into_linear(self) -> LinearExpression<Brand> {
        match self {
            Operand::Const(c) => LinearExpression::new(c),
            Operand::Linear(e) => e,
        }
    }

    /// Merge repeated terms so that `z - z` is recognised as the constant it is.
    fn settle(self) -> Self {
        match self {
            Operand::Linear(e) => {
                let e = e.simplify();
                if e.terms.is_empty() {
                    Operand::Const(e.constant)
                } else {
                    Operand::Linear(e)
                }
            }
            constant => constant,
        }
    }
}

impl<Brand> Value<Brand> {
    fn operand(self, op: &str) -> Result<Operand<Brand>, Fault> {
        match self {
            Value::Number(n) => Ok(Operand::Const(n)),
            Value::Label(label) => label_number(&label).map(Operand::Const).ok_or_else(|| {
                Fault::mismatch(format!(
                    "set member '{}' cannot be used as an operand of '{}'",
                    label, op
                ))
            }),
            Value::Linear(e) if e.terms.is_empty() => Ok(Operand::Const(e.constant)),
            Value::Linear(e) => Ok(Operand::Linear(e)),
        }
    }

    /// Value of a constant; decision variables are rejected.
    fn into_number(self, what: &str) -> Result<f64, Fault> {
        match self.operand(what)?.settle() {
            Operand::Const(c) => Ok(c),
            Operand::Linear(_) => Err(Fault::mismatch(format!(
                "decision variable used where a plain number is required ({})",
                what
            ))),
        }
    }

    pub fn into_linear(self) -> Result<LinearExpression<Brand>, Fault> {
        Ok(self.operand("expression")?.into_linear())
    }

    fn into_key(self) -> Result<Symbol, Fault> {
        match self {
            Value::Label(label) => Ok(label),
            value => match value.operand("index")?.settle() {
                Operand::Const(c) => Ok(number_label(c)),
                Operand::Linear(_) => Err(Fault::mismatch("decision variable used as an index")),
            },
        }
    }
}

fn arithmetic<Brand>(
    lhs: Value<Brand>,
    op: BinOp,
    rhs: Value<Brand>,
) -> Result<Value<Brand>, Fault> {
    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
    };
    let mut lhs = lhs.operand(symbol)?;
    let mut rhs = rhs.operand(symbol)?;
    if matches!(op, BinOp::Mul | BinOp::Div) {
        lhs = lhs.settle();
        rhs = rhs.settle();
    }

    Ok(match (op, lhs, rhs) {
        (BinOp::Add, Operand::Const(a), Operand::Const(b)) => Value::Number(a + b),
        (BinOp::Sub, Operand::Const(a), Operand::Const(b)) => Value::Number(a - b),
        (BinOp::Add, a, b) => Value::Linear(a.into_linear() + b.into_linear()),
        (BinOp::Sub, a, b) => Value::Linear(a.into_linear() - b.into_linear()),

        (BinOp::Mul, Operand::Const(a), Operand::Const(b)) => Value::Number(a * b),
        (BinOp::Mul, Operand::Const(c), Operand::Linear(e))
        | (BinOp::Mul, Operand::Linear(e), Operand::Const(c)) => Value::Linear(e * c),
        (BinOp::Mul, Operand::Linear(_), Operand::Linear(_)) => {
            return Err(Fault::non_linear(
                "product of two decision-variable expressions",
            ));
        }

        (BinOp::Div, _, Operand::Const(b)) if b == 0.0 => {
            return Err(Fault::new(FaultKind::DivisionByZero, "division by zero"));
        }
        (BinOp::Div, Operand::Const(a), Operand::Const(b)) => Value::Number(a / b),
        (BinOp::Div, Operand::Linear(e), Operand::Const(c)) => Value::Linear(e / c),
        (BinOp::Div, _, Operand::Linear(_)) => {
            return Err(Fault::non_linear("division by a decision-variable expression"));
        }
    })
}

fn compare(lhs: &Comparable, op: CmpOp, rhs: &Comparable) -> Result<bool, Fault> {
    let ordering = match (lhs, rhs) {
        (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
        (Comparable::Text(a), Comparable::Text(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match (op, ordering) {
        (CmpOp::Eq, o) => Ok(o == Some(Ordering::Equal)),
        (CmpOp::Ne, o) => Ok(o != Some(Ordering::Equal)),
        (_, None) => Err(Fault::mismatch(format!(
            "cannot order {} against {}",
            lhs, rhs
        ))),
        (CmpOp::Lt, Some(o)) => Ok(o == Ordering::Less),
        (CmpOp::Le, Some(o)) => Ok(o != Ordering::Greater),
        (CmpOp::Gt, Some(o)) => Ok(o == Ordering::Greater),
        (CmpOp::Ge, Some(o)) => Ok(o != Ordering::Less),
    }
}

enum Comparable {
    Number(f64),
    Text(Symbol),
}

impl fmt::Display for Comparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparable::Number(n) => write!(f, "{}", n),
            Comparable::Text(t) => write!(f, "'{}'", t),
        }
    }
}

/// Split `base[k1][k2, k3]` into `base` and `[k1, k2, k3]`.
fn flatten_subscripts(expr: &Expr) -> (&Expr, Vec<&Expr>) {
    match expr {
        Expr::Subscript(inner, keys) => {
            let (base, mut all) = flatten_subscripts(inner);
            all.extend(keys.iter());
            (base, all)
        }
        other => (other, Vec::new()),
    }
}

/// Evaluation environment of one model.
pub struct Scope<'a, Brand> {
    sets: &'a SetTable,
    parameters: &'a ParameterTable,
    variables: &'a VariableTable<Brand>,
    policy: MissingParameterPolicy,
    bindings: Vec<(Symbol, Symbol)>,
}

impl<'a, Brand> Scope<'a, Brand> {
    pub fn new(
        sets: &'a SetTable,
        parameters: &'a ParameterTable,
        variables: &'a VariableTable<Brand>,
        policy: MissingParameterPolicy,
    ) -> Self {
        Self {
            sets,
            parameters,
            variables,
            policy,
            bindings: Vec::new(),
        }
    }

    /// Bind `symbol` to `member` until the matching [`Scope::unbind`].
    pub fn bind(&mut self, symbol: &Symbol, member: &Symbol) {
        self.bindings.push((symbol.clone(), member.clone()));
    }

    pub fn unbind(&mut self) {
        self.bindings.pop();
    }

    pub fn clear_bindings(&mut self) {
        self.bindings.clear();
    }

    fn binding(&self, name: &Symbol) -> Option<&Symbol> {
        self.bindings
            .iter()
            .rev()
            .find(|(symbol, _)| symbol == name)
            .map(|(_, member)| member)
    }

    /// Evaluate an objective body. Relations are not allowed here.
    pub fn linear(&mut self, expr: &Expr) -> Result<LinearExpression<Brand>, Fault> {
        if let Expr::Relation(..) = expr {
            return Err(Fault::mismatch(
                "objective must be a single expression, not a comparison",
            ));
        }
        self.eval(expr)?.into_linear()
    }

    /// Evaluate a constraint body into `lhs <sense> rhs`.
    pub fn relation(
        &mut self,
        expr: &Expr,
    ) -> Result<(LinearExpression<Brand>, ConstraintSense, LinearExpression<Brand>), Fault> {
        let Expr::Relation(lhs, op, rhs) = expr else {
            return Err(Fault::mismatch(
                "constraint must compare two sides with <=, >= or ==",
            ));
        };

        let sense = match op {
            RelOp::LessEqual => ConstraintSense::LessEqual,
            RelOp::Equal => ConstraintSense::Equal,
            RelOp::GreaterEqual => ConstraintSense::GreaterEqual,
        };
        let lhs = self.eval(lhs)?.into_linear()?;
        let rhs = self.eval(rhs)?.into_linear()?;

        Ok((lhs, sense, rhs))
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value<Brand>, Fault> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Label(label) => Ok(Value::Label(label.clone())),
            Expr::Name(_) | Expr::Subscript(..) => {
                let (base, keys) = flatten_subscripts(expr);
                self.reference(base, &keys)
            }
            Expr::Neg(inner) => match self.eval(inner)?.operand("-")? {
                Operand::Const(c) => Ok(Value::Number(-c)),
                Operand::Linear(e) => Ok(Value::Linear(-e)),
            },
            Expr::Binary(..) => {
                // walk the left spine instead of recursing into it
                let mut operands = Vec::new();
                let mut head = expr;
                while let Expr::Binary(lhs, op, rhs) = head {
                    operands.push((*op, &**rhs));
                    head = &**lhs;
                }

                let mut value = self.eval(head)?;
                for (op, rhs) in operands.into_iter().rev() {
                    let rhs = self.eval(rhs)?;
                    value = arithmetic(value, op, rhs)?;
                }
                Ok(value)
            }
            Expr::Call { function, args } => self.call(function, args),
            Expr::Generator {
                function,
                body,
                generators,
            } => self.aggregate(function, body, generators),
            Expr::Relation(..) => Err(Fault::mismatch(
                "comparison used inside an arithmetic expression",
            )),
        }
    }

    fn keys(&mut self, keys: &[&Expr]) -> Result<Vec<Symbol>, Fault> {
        keys.iter()
            .map(|key| self.eval(key)?.into_key())
            .collect()
    }

    fn reference(&mut self, base: &Expr, keys: &[&Expr]) -> Result<Value<Brand>, Fault> {
        let name = match base {
            Expr::Name(name) => name,
            Expr::Label(label) => {
                return Err(Fault::mismatch(format!("set member '{}' cannot be indexed", label)));
            }
            _ => return Err(Fault::mismatch("only variables and parameters can be indexed")),
        };

        if let Some(member) = self.binding(name) {
            if !keys.is_empty() {
                return Err(Fault::mismatch(format!(
                    "index symbol '{}' cannot be indexed",
                    name
                )));
            }
            return Ok(Value::Label(member.clone()));
        }

        match &**name {
            "variables" | "parameters" => {
                let Some((family, rest)) = keys.split_first() else {
                    return Err(Fault::mismatch(format!("'{}' cannot be used as a value", name)));
                };
                let family = self.eval(family)?.into_key()?;
                let rest = self.keys(rest)?;
                if &**name == "variables" {
                    self.variable(&family, &rest)
                } else {
                    self.parameter(&family, &rest)
                }
            }
            "sets" => Err(Fault::mismatch(
                "sets can only be iterated with 'for … in' or counted with len()",
            )),
            _ => {
                let keys = self.keys(keys)?;
                if self.variables.family(name).is_some() {
                    self.variable(name, &keys)
                } else if self.parameters.contains(name) {
                    self.parameter(name, &keys)
                } else if self.sets.contains_set(name) {
                    Err(Fault::mismatch(format!(
                        "set '{}' used as a value; iterate it with 'for … in'",
                        name
                    )))
                } else {
                    Err(Fault::new(
                        FaultKind::UnresolvedReference,
                        format!("unknown name '{}'", name),
                    ))
                }
            }
        }
    }

    fn variable(&self, name: &Symbol, keys: &[Symbol]) -> Result<Value<Brand>, Fault> {
        let family = self.variables.family(name).ok_or_else(|| {
            Fault::new(
                FaultKind::UnresolvedReference,
                format!("unknown variable '{}'", name),
            )
        })?;

        if family.arity() != keys.len() {
            return Err(Fault::new(
                FaultKind::IndexOutOfRange,
                format!(
                    "variable '{}' takes {} index(es), got {}",
                    name,
                    family.arity(),
                    keys.len()
                ),
            ));
        }

        family
            .get(keys)
            .map(|id| Value::Linear(LinearExpression::from_variable(id)))
            .ok_or_else(|| {
                Fault::new(
                    FaultKind::IndexOutOfRange,
                    format!("variable {} does not exist", describe_entry(name, keys)),
                )
            })
    }

    fn parameter(&self, name: &Symbol, keys: &[Symbol]) -> Result<Value<Brand>, Fault> {
        let parameter = self.parameters.get(name).ok_or_else(|| {
            Fault::new(
                FaultKind::UnresolvedReference,
                format!("unknown parameter '{}'", name),
            )
        })?;

        if let Some(arity) = parameter.arity {
            if arity != keys.len() {
                return Err(Fault::new(
                    FaultKind::IndexOutOfRange,
                    format!(
                        "parameter '{}' takes {} index(es), got {}",
                        name,
                        arity,
                        keys.len()
                    ),
                ));
            }
        }

        match (parameter.get(keys), self.policy) {
            (Some(value), _) => Ok(Value::Number(value)),
            (None, MissingParameterPolicy::Zero) => Ok(Value::Number(0.0)),
            (None, MissingParameterPolicy::Error) => Err(Fault::new(
                FaultKind::IndexOutOfRange,
                format!("parameter {} has no value", describe_entry(name, keys)),
            )),
        }
    }

    /// Members of the set an expression refers to, when it refers to one.
    fn set_members(&mut self, expr: &Expr) -> Result<&'a [Symbol], Fault> {
        let sets: &'a SetTable = self.sets;
        let (base, keys) = flatten_subscripts(expr);

        let set_name = match (base, keys.as_slice()) {
            (Expr::Name(name), []) if self.binding(name).is_none() => name.clone(),
            (Expr::Name(name), [key]) if &**name == "sets" => self.eval(key)?.into_key()?,
            _ => return Err(Fault::mismatch("'in' must be followed by a set name")),
        };

        match sets.members(&set_name) {
            Some(members) => Ok(members),
            None if self.parameters.contains(&set_name)
                || self.variables.family(&set_name).is_some() =>
            {
                Err(Fault::mismatch(format!("'{}' is not a set", set_name)))
            }
            None => Err(Fault::new(
                FaultKind::UnresolvedReference,
                format!("unknown set '{}'", set_name),
            )),
        }
    }

    fn call(&mut self, function: &Symbol, args: &[Expr]) -> Result<Value<Brand>, Fault> {
        match &**function {
            f if SUM_FUNCTIONS.contains(&f) => {
                let mut total = Value::Number(0.0);
                for arg in args {
                    let value = self.eval(arg)?;
                    total = arithmetic(total, BinOp::Add, value)?;
                }
                Ok(total)
            }
            "len" => match args {
                [set] => Ok(Value::Number(self.set_members(set)?.len() as f64)),
                _ => Err(Fault::mismatch("len() takes exactly one set")),
            },
            "abs" => match args {
                [arg] => Ok(Value::Number(
                    self.constant(arg, "abs() of a decision variable")?.abs(),
                )),
                _ => Err(Fault::mismatch("abs() takes exactly one argument")),
            },
            "min" | "max" => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.constant(arg, "min()/max() of a decision variable")?);
                }
                extremum(function, values)
            }
            _ => Err(Fault::new(
                FaultKind::UnresolvedReference,
                format!("unknown function '{}'", function),
            )),
        }
    }

    /// Evaluate to a constant; variables inside non-linear functions are rejected.
    fn constant(&mut self, expr: &Expr, what: &str) -> Result<f64, Fault> {
        match self.eval(expr)?.operand(what)?.settle() {
            Operand::Const(c) => Ok(c),
            Operand::Linear(_) => Err(Fault::non_linear(what)),
        }
    }

    fn aggregate(
        &mut self,
        function: &Symbol,
        body: &Expr,
        generators: &[Generator],
    ) -> Result<Value<Brand>, Fault> {
        let mut items = Vec::new();
        self.expand_generators(body, generators, &mut items)?;

        match &**function {
            f if SUM_FUNCTIONS.contains(&f) => items
                .into_iter()
                .try_fold(Value::Number(0.0), |total, item| {
                    arithmetic(total, BinOp::Add, item)
                }),
            "min" | "max" => {
                let values = items
                    .into_iter()
                    .map(|item| match item.operand(function)?.settle() {
                        Operand::Const(c) => Ok(c),
                        Operand::Linear(_) => {
                            Err(Fault::non_linear("min()/max() of a decision variable"))
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                extremum(function, values)
            }
            _ => Err(Fault::new(
                FaultKind::UnresolvedReference,
                format!("'{}' cannot aggregate a generator; use sum()", function),
            )),
        }
    }

    fn expand_generators(
        &mut self,
        body: &Expr,
        generators: &[Generator],
        items: &mut Vec<Value<Brand>>,
    ) -> Result<(), Fault> {
        let Some((generator, rest)) = generators.split_first() else {
            items.push(self.eval(body)?);
            return Ok(());
        };

        let members = self.set_members(&generator.source)?;
        for member in members {
            self.bind(&generator.variable, member);
            let result = match &generator.condition {
                Some(condition) => self.condition(condition),
                None => Ok(true),
            }
            .and_then(|keep| {
                if keep {
                    self.expand_generators(body, rest, items)
                } else {
                    Ok(())
                }
            });
            self.unbind();
            result?;
        }

        Ok(())
    }

    fn comparable(&mut self, expr: &Expr) -> Result<Comparable, Fault> {
        match self.eval(expr)? {
            Value::Label(label) => Ok(match label_number(&label) {
                Some(n) => Comparable::Number(n),
                None => Comparable::Text(label),
            }),
            value => Ok(Comparable::Number(
                value.into_number("condition").map_err(|_| {
                    Fault::mismatch("decision variable used in an 'if' condition")
                })?,
            )),
        }
    }

    fn condition(&mut self, condition: &Condition) -> Result<bool, Fault> {
        match condition {
            Condition::Compare(lhs, op, rhs) => {
                let lhs = self.comparable(lhs)?;
                let rhs = self.comparable(rhs)?;
                compare(&lhs, *op, &rhs)
            }
            Condition::And(lhs, rhs) => Ok(self.condition(lhs)? && self.condition(rhs)?),
            Condition::Or(lhs, rhs) => Ok(self.condition(lhs)? || self.condition(rhs)?),
            Condition::Not(inner) => Ok(!self.condition(inner)?),
        }
    }
}

fn extremum<Brand>(function: &str, values: Vec<f64>) -> Result<Value<Brand>, Fault> {
    let folded = if function == "min" {
        values.into_iter().reduce(f64::min)
    } else {
        values.into_iter().reduce(f64::max)
    };

    folded
        .map(Value::Number)
        .ok_or_else(|| Fault::mismatch(format!("{}() of an empty sequence", function)))
}

fn describe_entry(name: &str, keys: &[Symbol]) -> String {
    crate::model::instance_key(name, keys)
}
