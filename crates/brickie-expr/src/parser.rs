use serde_json::Value;

use crate::ast::{BinaryOp, Expr, Parsed, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{Lexer, Spanned, Token};

// ── Parser ────────────────────────────────────────────────────────────────

/// Deepest nesting of parentheses, brackets, conditionals and prefix
/// operators accepted before parsing gives up.
pub const MAX_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    fn current_offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.offset)
            .unwrap_or(0)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.current_offset())
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {:?}, got {:?}", expected, self.peek())))
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.err("expression nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ── Entry ─────────────────────────────────────────────────────────────

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse_complete(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == &Token::Eof {
            return Err(self.err("empty expression"));
        }
        let expr = self.parse_conditional()?;
        if self.peek() != &Token::Eof {
            return Err(self.err(format!("unexpected {:?} after expression", self.peek())));
        }
        Ok(expr)
    }

    // ── Conditional ───────────────────────────────────────────────────────

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        self.nested(|p| {
            let cond = p.parse_binary(0)?;
            if p.peek() != &Token::Question {
                return Ok(cond);
            }
            p.advance(); // consume `?`
            let then = p.parse_conditional()?;
            p.expect_token(&Token::Colon)?;
            let otherwise = p.parse_conditional()?;
            Ok(Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)))
        })
    }

    // ── Binary (precedence climbing) ──────────────────────────────────────

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = binary_op(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // ── Unary ─────────────────────────────────────────────────────────────

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Bang => {
                self.advance();
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)))
            }
            Token::Minus => {
                self.advance();
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)))
            }
            _ => self.parse_postfix(),
        }
    }

    // ── Postfix: member and index access ──────────────────────────────────

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let field = match self.advance() {
                        Token::Ident(name) => name,
                        // `items.0` reads the first element
                        Token::Number(n) if n.fract() == 0.0 && n >= 0.0 => format!("{}", n as u64),
                        Token::True => "true".to_string(),
                        Token::False => "false".to_string(),
                        Token::Null => "null".to_string(),
                        tok => return Err(self.err(format!("expected field name, got {:?}", tok))),
                    };
                    expr = Expr::Member(Box::new(expr), field);
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_conditional()?;
                    self.expect_token(&Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    // ── Primary ───────────────────────────────────────────────────────────

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(number(n))),
            Token::Str(s)    => Ok(Expr::Literal(Value::String(s))),
            Token::True      => Ok(Expr::Literal(Value::Bool(true))),
            Token::False     => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null      => Ok(Expr::Literal(Value::Null)),
            Token::Ident(s)  => Ok(Expr::Ident(s)),
            Token::LParen => {
                let inner = self.parse_conditional()?;
                self.expect_token(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() != &Token::RBracket {
                    loop {
                        items.push(self.parse_conditional()?);
                        if self.peek() == &Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect_token(&Token::RBracket)?;
                Ok(Expr::Array(items))
            }
            tok => {
                // Step back so the error offset points at the offending token.
                self.pos = self.pos.saturating_sub(1);
                Err(self.err(format!("expected a value, got {:?}", tok)))
            }
        }
    }
}

fn binary_op(token: &Token) -> Option<(BinaryOp, u8)> {
    Some(match token {
        Token::OrOr    => (BinaryOp::Or, 1),
        Token::AndAnd  => (BinaryOp::And, 2),
        Token::EqEq    => (BinaryOp::Eq, 3),
        Token::BangEq  => (BinaryOp::NotEq, 3),
        Token::Lt      => (BinaryOp::Lt, 4),
        Token::LtEq    => (BinaryOp::LtEq, 4),
        Token::Gt      => (BinaryOp::Gt, 4),
        Token::GtEq    => (BinaryOp::GtEq, 4),
        Token::Plus    => (BinaryOp::Add, 5),
        Token::Minus   => (BinaryOp::Sub, 5),
        Token::Star    => (BinaryOp::Mul, 6),
        Token::Slash   => (BinaryOp::Div, 6),
        Token::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    })
}

/// Integral literals stay integers so `{count}` and `{3}` compare equal in JSON.
pub(crate) fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

// ── Public parse entry point ──────────────────────────────────────────────

/// Parse expression text (without surrounding braces) into an AST and the
/// list of root identifiers it reads.
pub fn parse(src: &str) -> Result<Parsed, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let expr = Parser::new(tokens).parse_complete()?;
    let identifiers = expr.identifiers();
    Ok(Parsed { expr, identifiers })
}
