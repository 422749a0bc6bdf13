//! Syntax tree of a basis-function expression.

/// Byte range in the expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Expression node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Node kind.
    pub kind: ExprKind,
    /// Source range covered by the node.
    pub span: Span,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal.
    Number(f64),
    /// State variable reference.
    Var(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation.
    BinOp {
        /// Operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Parenthesised sub-expression; a sum inside parentheses stays one
    /// basis function.
    Group(Box<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `**` or `^`
    Pow,
}

impl Expr {
    /// Splits a top-level sum into its terms. Subtracted terms are negated.
    pub fn into_terms(self) -> Vec<Expr> {
        let mut terms = Vec::new();
        collect_terms(self, false, &mut terms);
        terms
    }
}

fn collect_terms(expr: Expr, negate: bool, out: &mut Vec<Expr>) {
    match expr.kind {
        ExprKind::BinOp {
            op: op @ (BinOp::Add | BinOp::Sub),
            lhs,
            rhs,
        } => {
            collect_terms(*lhs, negate, out);
            collect_terms(*rhs, negate ^ (op == BinOp::Sub), out);
        }
        kind => {
            let term = Expr {
                kind,
                span: expr.span,
            };
            if negate {
                out.push(Expr {
                    span: term.span,
                    kind: ExprKind::Neg(Box::new(term)),
                });
            } else {
                out.push(term);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, start: usize) -> Expr {
        Expr {
            kind: ExprKind::Var(name.to_string()),
            span: Span::new(start, start + name.len()),
        }
    }

    fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        let span = Span::new(lhs.span.start, rhs.span.end);
        Expr {
            kind: ExprKind::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        }
    }

    #[test]
    fn test_into_terms_flattens_sum() {
        // a + b - c
        let expr = bin(
            BinOp::Sub,
            bin(BinOp::Add, var("a", 0), var("b", 4)),
            var("c", 8),
        );
        let terms = expr.into_terms();
        assert_eq!(terms.len(), 3);
        assert!(matches!(terms[0].kind, ExprKind::Var(ref n) if n == "a"));
        assert!(matches!(terms[2].kind, ExprKind::Neg(_)));
    }

    #[test]
    fn test_group_is_single_term() {
        let inner = bin(BinOp::Add, var("a", 1), var("b", 5));
        let group = Expr {
            span: Span::new(0, 7),
            kind: ExprKind::Group(Box::new(inner)),
        };
        assert_eq!(group.into_terms().len(), 1);
    }
}
