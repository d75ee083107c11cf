use std::mem;

pub use crate::Symbol;

/// Deepest nesting [`crate::expr::parse`] accepts. The left operands of `+ - * /` chain
/// at the same level, so long sums stay flat.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Operators allowed between the two sides of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    LessEqual,
    Equal,
    GreaterEqual,
}

/// Operators allowed in generator filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Quoted text, always a set member label.
    Label(Symbol),
    Name(Symbol),
    Subscript(Box<Expr>, Vec<Expr>),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Call {
        function: Symbol,
        args: Vec<Expr>,
    },
    /// `function(body for v in S if cond ...)`
    Generator {
        function: Symbol,
        body: Box<Expr>,
        generators: Vec<Generator>,
    },
    Relation(Box<Expr>, RelOp, Box<Expr>),
}

impl Expr {
    pub fn binary(lhs: Expr, op: BinOp, rhs: Expr) -> Self {
        Expr::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    /// Nesting depth of the tree, where the left operand of a binary operator sits at
    /// the same level as the operator itself.
    pub fn nesting(&self) -> usize {
        let mut pending: Vec<(Node<&Expr, &Condition>, usize)> = vec![(Node::Expr(self), 1)];
        let mut deepest = 0;

        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            let inner = depth + 1;
            match node {
                Node::Expr(expr) => match expr {
                    Expr::Number(_) | Expr::Label(_) | Expr::Name(_) => {}
                    Expr::Subscript(base, keys) => {
                        pending.push((Node::Expr(&**base), inner));
                        pending.extend(keys.iter().map(|k| (Node::Expr(k), inner)));
                    }
                    Expr::Neg(e) => pending.push((Node::Expr(&**e), inner)),
                    Expr::Binary(lhs, _, rhs) => {
                        pending.push((Node::Expr(&**lhs), depth));
                        pending.push((Node::Expr(&**rhs), inner));
                    }
                    Expr::Relation(lhs, _, rhs) => {
                        pending.push((Node::Expr(&**lhs), inner));
                        pending.push((Node::Expr(&**rhs), inner));
                    }
                    Expr::Call { args, .. } => {
                        pending.extend(args.iter().map(|a| (Node::Expr(a), inner)));
                    }
                    Expr::Generator {
                        body, generators, ..
                    } => {
                        pending.push((Node::Expr(&**body), inner));
                        for generator in generators {
                            pending.push((Node::Expr(&generator.source), inner));
                            if let Some(condition) = &generator.condition {
                                pending.push((Node::Condition(condition), inner));
                            }
                        }
                    }
                },
                Node::Condition(condition) => match condition {
                    Condition::Compare(lhs, _, rhs) => {
                        pending.push((Node::Expr(lhs), inner));
                        pending.push((Node::Expr(rhs), inner));
                    }
                    Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => {
                        pending.push((Node::Condition(&**lhs), inner));
                        pending.push((Node::Condition(&**rhs), inner));
                    }
                    Condition::Not(c) => pending.push((Node::Condition(&**c), inner)),
                },
            }
        }

        deepest
    }

    fn detach_children(&mut self, pending: &mut Vec<Node<Expr, Condition>>) {
        match self {
            Expr::Number(_) | Expr::Label(_) | Expr::Name(_) => {}
            Expr::Subscript(base, keys) => {
                pending.push(Node::Expr(take_expr(base)));
                pending.extend(keys.drain(..).map(Node::Expr));
            }
            Expr::Neg(e) => pending.push(Node::Expr(take_expr(e))),
            Expr::Binary(lhs, _, rhs) | Expr::Relation(lhs, _, rhs) => {
                pending.push(Node::Expr(take_expr(lhs)));
                pending.push(Node::Expr(take_expr(rhs)));
            }
            Expr::Call { args, .. } => pending.extend(args.drain(..).map(Node::Expr)),
            Expr::Generator {
                body, generators, ..
            } => {
                pending.push(Node::Expr(take_expr(body)));
                for generator in generators.drain(..) {
                    pending.push(Node::Expr(generator.source));
                    pending.extend(generator.condition.map(Node::Condition));
                }
            }
        }
    }
}

/// Trees are torn down with an explicit stack; a sum of many thousand terms is a
/// left spine of the same length.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        dismantle(pending);
    }
}

/// Either kind of tree node, by reference while measuring and by value while dropping.
enum Node<E, C> {
    Expr(E),
    Condition(C),
}

fn take_expr(expr: &mut Expr) -> Expr {
    mem::replace(expr, Expr::Number(0.0))
}

fn take_condition(condition: &mut Condition) -> Condition {
    mem::replace(
        condition,
        Condition::Compare(Expr::Number(0.0), CmpOp::Eq, Expr::Number(0.0)),
    )
}

fn dismantle(mut pending: Vec<Node<Expr, Condition>>) {
    while let Some(mut node) = pending.pop() {
        match &mut node {
            Node::Expr(expr) => expr.detach_children(&mut pending),
            Node::Condition(condition) => condition.detach_children(&mut pending),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub variable: Symbol,
    pub source: Expr,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(Expr, CmpOp, Expr),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    fn detach_children(&mut self, pending: &mut Vec<Node<Expr, Condition>>) {
        match self {
            Condition::Compare(lhs, _, rhs) => {
                pending.push(Node::Expr(take_expr(lhs)));
                pending.push(Node::Expr(take_expr(rhs)));
            }
            Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => {
                pending.push(Node::Condition(take_condition(lhs)));
                pending.push(Node::Condition(take_condition(rhs)));
            }
            Condition::Not(c) => pending.push(Node::Condition(take_condition(c))),
        }
    }
}

impl Drop for Condition {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        dismantle(pending);
    }
}
