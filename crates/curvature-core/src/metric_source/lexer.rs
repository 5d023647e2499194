//! Tokenizer for metric-definition sources.

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Number(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Assign,
    Semicolon,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Splits `source` into tokens. Newlines inside brackets or parentheses are
/// dropped so matrix literals may span several lines.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;
    let mut column = 1;
    let mut depth = 0usize;

    while let Some(&c) = chars.peek() {
        let (start_line, start_column) = (line, column);
        let push = |tokens: &mut Vec<Token>, kind| {
            tokens.push(Token {
                kind,
                line: start_line,
                column: start_column,
            })
        };

        match c {
            '\n' => {
                chars.next();
                if depth == 0 {
                    push(&mut tokens, TokenKind::Newline);
                }
                line += 1;
                column = 1;
                continue;
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = String::new();
                while let Some(&d) = chars.peek() {
                    let exponent_sign = (d == '+' || d == '-') && text.ends_with(['e', 'E']);
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                column += text.chars().count();
                push(&mut tokens, TokenKind::Number(text));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                column += text.chars().count();
                push(&mut tokens, TokenKind::Ident(text));
                continue;
            }
            _ => {
                chars.next();
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' if chars.peek() == Some(&'*') => {
                        chars.next();
                        column += 1;
                        TokenKind::Caret
                    }
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '^' => TokenKind::Caret,
                    '(' => {
                        depth += 1;
                        TokenKind::LParen
                    }
                    ')' => {
                        depth = depth.saturating_sub(1);
                        TokenKind::RParen
                    }
                    '[' => {
                        depth += 1;
                        TokenKind::LBracket
                    }
                    ']' => {
                        depth = depth.saturating_sub(1);
                        TokenKind::RBracket
                    }
                    ',' => TokenKind::Comma,
                    '=' => TokenKind::Assign,
                    ';' => TokenKind::Semicolon,
                    other => {
                        return Err(SyntaxError {
                            line: start_line,
                            column: start_column,
                            message: format!("unexpected character {other:?}"),
                        })
                    }
                };
                push(&mut tokens, kind);
            }
        }
        column += 1;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
        column,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_double_star_is_power() {
        assert_eq!(
            kinds("r**2"),
            vec![
                TokenKind::Ident("r".into()),
                TokenKind::Caret,
                TokenKind::Number("2".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_and_bracket_newlines() {
        let k = kinds("# header\nm = [1,\n 2]\n");
        assert_eq!(
            k,
            vec![
                TokenKind::Newline,
                TokenKind::Ident("m".into()),
                TokenKind::Assign,
                TokenKind::LBracket,
                TokenKind::Number("1".into()),
                TokenKind::Comma,
                TokenKind::Number("2".into()),
                TokenKind::RBracket,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_scientific_number() {
        assert_eq!(kinds("1.5e-3")[0], TokenKind::Number("1.5e-3".into()));
    }

    #[test]
    fn test_positions_and_bad_character() {
        let tokens = tokenize("a = 1\nb = $").unwrap_err();
        assert_eq!((tokens.line, tokens.column), (2, 5));
        let ok = tokenize("x\n  y").unwrap();
        assert_eq!((ok[2].line, ok[2].column), (2, 3));
    }
}
