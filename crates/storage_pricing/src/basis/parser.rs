//! Recursive-descent parser for basis-function expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr     := additive
//! additive := term (('+' | '-') term)*
//! term     := unary (('*' | '/') unary)*
//! unary    := '-' unary | '+' unary | power
//! power    := primary (('**' | '^') unary)?
//! primary  := number | identifier | '(' expr ')'
//! ```
//!
//! Exponentiation binds tighter than unary minus and is right associative,
//! so `-s**2` is `-(s**2)` and `2**3**2` is `2**(3**2)`.

use storage_core::types::ConfigurationError;

use super::ast::{BinOp, Expr, ExprKind, Span};
use super::lexer::{error, Token, TokenKind};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<Token, ConfigurationError> {
        match self.peek() {
            Some(tok) if &tok.kind == expected => {
                let tok = tok.clone();
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(error(
                format!("expected {:?}, got {:?}", expected, tok.kind),
                tok.span.start,
            )),
            None => Err(error(
                format!("expected {:?}, got end of input", expected),
                self.source_len,
            )),
        }
    }
}

/// Parses a token stream into a single expression.
///
/// # Errors
///
/// `ConfigurationError::BasisExpression` on empty input, unbalanced
/// parentheses, a missing operand or trailing tokens.
pub fn parse(tokens: Vec<Token>, source_len: usize) -> Result<Expr, ConfigurationError> {
    if tokens.is_empty() {
        return Err(error("empty basis function expression", 0));
    }
    let mut p = Parser::new(tokens, source_len);
    let expr = parse_additive(&mut p)?;
    if let Some(tok) = p.peek() {
        return Err(error(
            format!("unexpected {:?} after expression", tok.kind),
            tok.span.start,
        ));
    }
    Ok(expr)
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
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

fn parse_additive(p: &mut Parser) -> Result<Expr, ConfigurationError> {
    let mut left = parse_term(p)?;
    loop {
        let op = match p.peek_kind() {
            Some(TokenKind::Plus) => BinOp::Add,
            Some(TokenKind::Minus) => BinOp::Sub,
            _ => break,
        };
        p.advance();
        let right = parse_term(p)?;
        left = binary(op, left, right);
    }
    Ok(left)
}

fn parse_term(p: &mut Parser) -> Result<Expr, ConfigurationError> {
    let mut left = parse_unary(p)?;
    loop {
        let op = match p.peek_kind() {
            Some(TokenKind::Star) => BinOp::Mul,
            Some(TokenKind::Slash) => BinOp::Div,
            _ => break,
        };
        p.advance();
        let right = parse_unary(p)?;
        left = binary(op, left, right);
    }
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> Result<Expr, ConfigurationError> {
    match p.peek_kind() {
        Some(TokenKind::Minus) => {
            let start = p.advance().map(|t| t.span.start).unwrap_or(0);
            let operand = parse_unary(p)?;
            let span = Span::new(start, operand.span.end);
            Ok(Expr {
                kind: ExprKind::Neg(Box::new(operand)),
                span,
            })
        }
        Some(TokenKind::Plus) => {
            p.advance();
            parse_unary(p)
        }
        _ => parse_power(p),
    }
}

fn parse_power(p: &mut Parser) -> Result<Expr, ConfigurationError> {
    let base = parse_primary(p)?;
    if let Some(TokenKind::Power) = p.peek_kind() {
        p.advance();
        let exponent = parse_unary(p)?;
        return Ok(binary(BinOp::Pow, base, exponent));
    }
    Ok(base)
}

fn parse_primary(p: &mut Parser) -> Result<Expr, ConfigurationError> {
    let source_len = p.source_len;
    let tok = p
        .advance()
        .ok_or_else(|| error("expected operand, got end of input", source_len))?;
    match tok.kind {
        TokenKind::Number(n) => Ok(Expr {
            kind: ExprKind::Number(n),
            span: tok.span,
        }),
        TokenKind::Ident(name) => Ok(Expr {
            kind: ExprKind::Var(name),
            span: tok.span,
        }),
        TokenKind::LParen => {
            let inner = parse_additive(p)?;
            let close = p.expect(&TokenKind::RParen)?;
            Ok(Expr {
                kind: ExprKind::Group(Box::new(inner)),
                span: Span::new(tok.span.start, close.span.end),
            })
        }
        other => Err(error(
            format!("expected operand, got {:?}", other),
            tok.span.start,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::lexer::tokenize;

    fn parse_str(source: &str) -> Result<Expr, ConfigurationError> {
        parse(tokenize(source)?, source.len())
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse_str("1 + 2 * 3").unwrap();
        match expr.kind {
            ExprKind::BinOp { op, rhs, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(rhs.kind, ExprKind::BinOp { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse_str("-s**2").unwrap();
        match expr.kind {
            ExprKind::Neg(inner) => {
                assert!(matches!(inner.kind, ExprKind::BinOp { op: BinOp::Pow, .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_str("2 ^ 3 ** 2").unwrap();
        match expr.kind {
            ExprKind::BinOp { op, lhs, rhs } => {
                assert_eq!(op, BinOp::Pow);
                assert!(matches!(lhs.kind, ExprKind::Number(_)));
                assert!(matches!(rhs.kind, ExprKind::BinOp { op: BinOp::Pow, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_make_group() {
        let expr = parse_str("(x0 + x1)").unwrap();
        assert!(matches!(expr.kind, ExprKind::Group(_)));
        assert_eq!(expr.span, Span::new(0, 9));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_str(""),
            Err(ConfigurationError::BasisExpression { .. })
        ));
        assert!(matches!(
            parse_str("(s + 1"),
            Err(ConfigurationError::BasisExpression { position: 6, .. })
        ));
        assert!(matches!(
            parse_str("s +"),
            Err(ConfigurationError::BasisExpression { position: 3, .. })
        ));
        assert!(matches!(
            parse_str("s s"),
            Err(ConfigurationError::BasisExpression { position: 2, .. })
        ));
        assert!(matches!(
            parse_str("* s"),
            Err(ConfigurationError::BasisExpression { position: 0, .. })
        ));
    }
}
