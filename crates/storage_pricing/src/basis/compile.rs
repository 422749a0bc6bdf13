//! Compilation of parsed basis functions into closures.

use std::collections::HashMap;

use storage_core::types::ConfigurationError;

use super::ast::{BinOp, Expr, ExprKind};

/// Compiled scalar function of the state vector.
pub type CompiledFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Compiles `expr` with variables resolved against `variables` (name to
/// index in the state vector).
///
/// # Errors
///
/// `ConfigurationError::UnknownVariable` for a name not in `variables`.
pub fn compile(
    expr: &Expr,
    variables: &HashMap<String, usize>,
) -> Result<CompiledFn, ConfigurationError> {
    Ok(match &expr.kind {
        ExprKind::Number(c) => {
            let c = *c;
            boxed(move |_| c)
        }
        ExprKind::Var(name) => {
            let index = *variables
                .get(name)
                .ok_or_else(|| unknown_variable(name, variables))?;
            boxed(move |x| x[index])
        }
        ExprKind::Group(inner) => compile(inner, variables)?,
        ExprKind::Neg(inner) => {
            let f = compile(inner, variables)?;
            boxed(move |x| -f(x))
        }
        ExprKind::BinOp { op, lhs, rhs } => {
            let l = compile(lhs, variables)?;
            if let (BinOp::Pow, Some(n)) = (op, integer_exponent(rhs)) {
                return Ok(boxed(move |x| l(x).powi(n)));
            }
            let r = compile(rhs, variables)?;
            match op {
                BinOp::Add => boxed(move |x| l(x) + r(x)),
                BinOp::Sub => boxed(move |x| l(x) - r(x)),
                BinOp::Mul => boxed(move |x| l(x) * r(x)),
                BinOp::Div => boxed(move |x| l(x) / r(x)),
                BinOp::Pow => boxed(move |x| l(x).powf(r(x))),
            }
        }
    })
}

fn boxed(f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> CompiledFn {
    Box::new(f)
}

fn integer_exponent(expr: &Expr) -> Option<i32> {
    match &expr.kind {
        ExprKind::Number(n) if n.fract() == 0.0 && n.abs() <= 64.0 => Some(*n as i32),
        ExprKind::Group(inner) => integer_exponent(inner),
        _ => None,
    }
}

fn unknown_variable(name: &str, variables: &HashMap<String, usize>) -> ConfigurationError {
    let mut known: Vec<(&String, &usize)> = variables.iter().collect();
    known.sort_by_key(|(_, index)| **index);
    ConfigurationError::UnknownVariable {
        name: name.to_string(),
        available: known
            .into_iter()
            .map(|(n, _)| n.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}
