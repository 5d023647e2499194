//! Recursive-descent parser producing statements.

use super::lexer::{Token, TokenKind};
use super::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(String),
    Ident { name: String, line: usize },
    Call { name: String, args: Vec<Node>, line: usize },
    Neg(Box<Node>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
        line: usize,
    },
    List { items: Vec<Node>, line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign { name: String, value: Node, line: usize },
    Func { name: String, params: Vec<String>, line: usize },
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, SyntaxError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let mut parser = Parser { tokens, pos: 0 };
    parser.program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &'a Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let token = self.peek();
        SyntaxError {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), SyntaxError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}, found {}", describe(&self.peek().kind))))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, SyntaxError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {what}, found {}", describe(other)))),
        }
    }

    fn program(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&TokenKind::Newline) || self.eat(&TokenKind::Semicolon) {}
            if self.at(&TokenKind::Eof) {
                return Ok(statements);
            }
            statements.push(self.statement()?);
            match self.peek().kind {
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => {}
                ref other => {
                    return Err(self.error(format!(
                        "expected end of statement, found {}",
                        describe(other)
                    )))
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        let line = self.peek().line;
        let name = self.ident("a binding name")?;
        if name == "func" {
            let name = self.ident("a function name")?;
            self.expect(TokenKind::LParen, "'('")?;
            let mut params = vec![self.ident("a parameter name")?];
            while self.eat(&TokenKind::Comma) {
                params.push(self.ident("a parameter name")?);
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(Statement::Func { name, params, line });
        }
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.expr()?;
        Ok(Statement::Assign { name, value, line })
    }

    fn expr(&mut self) -> Result<Node, SyntaxError> {
        let mut lhs = self.term()?;
        loop {
            let line = self.peek().line;
            let op = if self.eat(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
    }

    fn term(&mut self) -> Result<Node, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let line = self.peek().line;
            let op = if self.eat(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
    }

    fn unary(&mut self) -> Result<Node, SyntaxError> {
        if self.eat(&TokenKind::Minus) {
            return Ok(Node::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&TokenKind::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Node, SyntaxError> {
        let base = self.atom()?;
        let line = self.peek().line;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.unary()?;
            return Ok(Node::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
                line,
            });
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Node, SyntaxError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Number(text) => {
                self.advance();
                Ok(Node::Number(text.clone()))
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let args = self.items(&TokenKind::RParen, "')'")?;
                    Ok(Node::Call {
                        name,
                        args,
                        line: token.line,
                    })
                } else {
                    Ok(Node::Ident {
                        name,
                        line: token.line,
                    })
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.items(&TokenKind::RBracket, "']'")?;
                Ok(Node::List {
                    items,
                    line: token.line,
                })
            }
            other => Err(self.error(format!("expected an expression, found {}", describe(other)))),
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn items(&mut self, close: &TokenKind, what: &str) -> Result<Vec<Node>, SyntaxError> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(self.expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close.clone(), what)?;
        Ok(items)
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::Ident(name) => format!("identifier {name}"),
        TokenKind::Plus => "'+'".into(),
        TokenKind::Minus => "'-'".into(),
        TokenKind::Star => "'*'".into(),
        TokenKind::Slash => "'/'".into(),
        TokenKind::Caret => "'^'".into(),
        TokenKind::LParen => "'('".into(),
        TokenKind::RParen => "')'".into(),
        TokenKind::LBracket => "'['".into(),
        TokenKind::RBracket => "']'".into(),
        TokenKind::Comma => "','".into(),
        TokenKind::Assign => "'='".into(),
        TokenKind::Semicolon => "';'".into(),
        TokenKind::Newline => "end of line".into(),
        TokenKind::Eof => "end of input".into(),
    }
}
