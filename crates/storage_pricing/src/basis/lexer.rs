//! Tokeniser for basis-function expressions.

use storage_core::types::ConfigurationError;

use super::ast::Span;

/// Token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Source range.
    pub span: Span,
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal, including exponent notation.
    Number(f64),
    /// Variable name.
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `**` or `^`
    Power,
    /// `(`
    LParen,
    /// `)`
    RParen,
}

pub(crate) fn error(message: impl Into<String>, position: usize) -> ConfigurationError {
    ConfigurationError::BasisExpression {
        message: message.into(),
        position,
    }
}

/// Tokenises `source`.
///
/// # Errors
///
/// `ConfigurationError::BasisExpression` for a character that starts no
/// token or a malformed number.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ConfigurationError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let kind = match c {
            b'+' => {
                pos += 1;
                TokenKind::Plus
            }
            b'-' => {
                pos += 1;
                TokenKind::Minus
            }
            b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                TokenKind::Power
            }
            b'*' => {
                pos += 1;
                TokenKind::Star
            }
            b'/' => {
                pos += 1;
                TokenKind::Slash
            }
            b'^' => {
                pos += 1;
                TokenKind::Power
            }
            b'(' => {
                pos += 1;
                TokenKind::LParen
            }
            b')' => {
                pos += 1;
                TokenKind::RParen
            }
            b'0'..=b'9' | b'.' => {
                let (value, end) = lex_number(source, start)?;
                pos = end;
                TokenKind::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                pos = lex_ident_end(bytes, start);
                TokenKind::Ident(source[start..pos].to_string())
            }
            _ => {
                let ch = source[start..].chars().next().unwrap_or('?');
                return Err(error(format!("unexpected character '{}'", ch), start));
            }
        };

        tokens.push(Token {
            kind,
            span: Span::new(start, pos),
        });
    }

    Ok(tokens)
}

fn lex_number(source: &str, start: usize) -> Result<(f64, usize), ConfigurationError> {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    // Exponent part only when followed by digits, e.g. 1e-5 or 2E3.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }

    let text = &source[start..end];
    text.parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| error(format!("invalid number '{}'", text), start))
}

fn lex_ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("s ** 2 ^ 3 * x_st / (1 - 2) + 4"),
            vec![
                TokenKind::Ident("s".into()),
                TokenKind::Power,
                TokenKind::Number(2.0),
                TokenKind::Power,
                TokenKind::Number(3.0),
                TokenKind::Star,
                TokenKind::Ident("x_st".into()),
                TokenKind::Slash,
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::Minus,
                TokenKind::Number(2.0),
                TokenKind::RParen,
                TokenKind::Plus,
                TokenKind::Number(4.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_scientific_numbers() {
        assert_eq!(kinds("1e-5"), vec![TokenKind::Number(1e-5)]);
        assert_eq!(kinds("2.5E3"), vec![TokenKind::Number(2500.0)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5)]);
    }

    #[test]
    fn test_exponent_without_digits_is_identifier() {
        // "2e" lexes as 2 followed by the variable e
        assert_eq!(
            kinds("2e"),
            vec![TokenKind::Number(2.0), TokenKind::Ident("e".into())]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("x0 ** 2").unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(3, 5));
        assert_eq!(tokens[2].span, Span::new(6, 7));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("s + $").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::BasisExpression { position: 4, .. }
        ));
    }

    #[test]
    fn test_invalid_number() {
        assert!(matches!(
            tokenize("1.2.3"),
            Err(ConfigurationError::BasisExpression { position: 0, .. })
        ));
    }
}
