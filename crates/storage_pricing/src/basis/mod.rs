//! Basis functions for the continuation-value regression.
//!
//! A basis is written as a single sum, for example
//!
//! ```text
//! 1 + x_st + x_sw + x_lt + s + s**2 + s**3 + x_st*x_lt
//! ```
//!
//! Each top-level term becomes one regressor. Variables are the model's
//! factor names and `s`, the simulated spot price.
//!
//! - [`lexer`]: tokenisation
//! - [`parser`]: precedence-climbing parser producing an [`ast::Expr`]
//! - [`compile`]: closure compilation with resolved variable indices

pub mod ast;
pub mod compile;
pub mod lexer;
pub mod parser;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use storage_core::types::ConfigurationError;

use ast::ExprKind;
use compile::CompiledFn;

struct BasisTerm {
    source: String,
    eval: CompiledFn,
}

/// Compiled set of regression basis functions.
///
/// The state vector passed to [`evaluate_into`](Self::evaluate_into) holds
/// the variables in the order given to [`parse`](Self::parse).
///
/// # Examples
///
/// ```rust
/// use storage_pricing::basis::BasisFunctions;
///
/// let basis = BasisFunctions::parse("1 + x0 + s + s**2", &["x0", "s"]).unwrap();
/// assert_eq!(basis.len(), 4);
///
/// let mut row = [0.0; 4];
/// basis.evaluate_into(&[0.1, 3.0], &mut row);
/// assert_eq!(row, [1.0, 0.1, 3.0, 9.0]);
/// ```
#[derive(Clone)]
pub struct BasisFunctions {
    terms: Arc<[BasisTerm]>,
    variables: Vec<String>,
}

impl BasisFunctions {
    /// Parses and compiles `source` over the named state `variables`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::BasisExpression` for malformed input and
    /// `ConfigurationError::UnknownVariable` for a name not in `variables`.
    pub fn parse(source: &str, variables: &[&str]) -> Result<Self, ConfigurationError> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse(tokens, source.len())?;

        let index: HashMap<String, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        let terms = expr
            .into_terms()
            .into_iter()
            .map(|term| {
                let mut text = source
                    .get(term.span.start..term.span.end)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                // Subtracted terms carry the span of the operand only.
                if matches!(term.kind, ExprKind::Neg(_)) && !text.starts_with('-') {
                    text.insert(0, '-');
                }
                compile::compile(&term, &index).map(|eval| BasisTerm { source: text, eval })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            terms: terms.into(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
        })
    }

    /// Number of basis functions.
    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Always false for a parsed basis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// State variable names in state-vector order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Source text of each basis function.
    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.iter().map(|t| t.source.as_str())
    }

    /// Evaluates every basis function at `state`, writing into `out`.
    #[inline]
    pub fn evaluate_into(&self, state: &[f64], out: &mut [f64]) {
        for (slot, term) in out.iter_mut().zip(self.terms.iter()) {
            *slot = (term.eval)(state);
        }
    }
}

impl fmt::Debug for BasisFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasisFunctions")
            .field("terms", &self.terms().collect::<Vec<_>>())
            .field("variables", &self.variables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_factor_basis() {
        let basis = BasisFunctions::parse(
            "1 + x_st + x_sw + x_lt + s + s**2 + s**3 + x_st*x_lt",
            &["x_st", "x_lt", "x_sw", "s"],
        )
        .unwrap();
        assert_eq!(basis.len(), 8);

        let mut row = vec![0.0; basis.len()];
        basis.evaluate_into(&[0.1, 0.2, 0.3, 10.0], &mut row);
        let expected = [1.0, 0.1, 0.3, 0.2, 10.0, 100.0, 1000.0, 0.1 * 0.2];
        for (got, want) in row.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_term_sources() {
        let basis = BasisFunctions::parse("1 + s - (s + 1)**2", &["s"]).unwrap();
        let terms: Vec<&str> = basis.terms().collect();
        assert_eq!(terms, vec!["1", "s", "-(s + 1)**2"]);

        let mut row = [0.0; 3];
        basis.evaluate_into(&[2.0], &mut row);
        assert_eq!(row, [1.0, 2.0, -9.0]);
    }

    #[test]
    fn test_unknown_variable() {
        let err = BasisFunctions::parse("1 + x_st", &["x0", "s"]).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownVariable { .. }));
    }

    #[test]
    fn test_clone_shares_terms() {
        let basis = BasisFunctions::parse("1 + s", &["s"]).unwrap();
        let copy = basis.clone();
        assert_eq!(copy.len(), 2);
        assert!(format!("{:?}", copy).contains("\"s\""));
    }
}
