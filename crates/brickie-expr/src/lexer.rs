use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Ident(String),
    Str(String),
    Number(f64),
    // Keywords
    True,
    False,
    Null,
    // Punctuation
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    Colon,
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    // Sentinel
    Eof,
}

/// A token together with the byte offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let token = self.next_token()?;
            let eof = token == Token::Eof;
            tokens.push(Spanned { token, offset });
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume `next` if it is the upcoming character.
    fn eat(&mut self, next: char) -> bool {
        if self.peek() == Some(next) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.pos)
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let ch = match self.peek() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        match ch {
            '.' => { self.advance(); Ok(Token::Dot) }
            ',' => { self.advance(); Ok(Token::Comma) }
            '(' => { self.advance(); Ok(Token::LParen) }
            ')' => { self.advance(); Ok(Token::RParen) }
            '[' => { self.advance(); Ok(Token::LBracket) }
            ']' => { self.advance(); Ok(Token::RBracket) }
            '?' => { self.advance(); Ok(Token::Question) }
            ':' => { self.advance(); Ok(Token::Colon) }
            '+' => { self.advance(); Ok(Token::Plus) }
            '-' => { self.advance(); Ok(Token::Minus) }
            '*' => { self.advance(); Ok(Token::Star) }
            '/' => { self.advance(); Ok(Token::Slash) }
            '%' => { self.advance(); Ok(Token::Percent) }
            '!' => {
                self.advance();
                if self.eat('=') {
                    // `!==` is accepted as a synonym of `!=`
                    self.eat('=');
                    Ok(Token::BangEq)
                } else {
                    Ok(Token::Bang)
                }
            }
            '=' => {
                self.advance();
                if !self.eat('=') {
                    return Err(self.err("assignment is not allowed in expressions"));
                }
                self.eat('=');
                Ok(Token::EqEq)
            }
            '<' => {
                self.advance();
                Ok(if self.eat('=') { Token::LtEq } else { Token::Lt })
            }
            '>' => {
                self.advance();
                Ok(if self.eat('=') { Token::GtEq } else { Token::Gt })
            }
            '&' => {
                self.advance();
                if self.eat('&') { Ok(Token::AndAnd) } else { Err(self.err("expected '&&'")) }
            }
            '|' => {
                self.advance();
                if self.eat('|') { Ok(Token::OrOr) } else { Err(self.err("expected '||'")) }
            }
            '"' | '\'' => self.lex_string(ch),
            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_alphabetic() || c == '_' || c == '$' => Ok(self.lex_ident_or_keyword()),
            other => Err(self.err(format!("unexpected character {:?}", other))),
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, ParseError> {
        self.advance(); // consume opening quote
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err("unterminated string literal")),
                Some(c) if c == quote => break,
                Some('\\') => {
                    match self.advance() {
                        Some('n')  => s.push('\n'),
                        Some('t')  => s.push('\t'),
                        Some('\\') => s.push('\\'),
                        Some(c)    => s.push(c),
                        None => return Err(self.err("unterminated escape sequence")),
                    }
                }
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn lex_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        // Only treat `.` as a decimal point when a digit follows, so that
        // `items.0` style access never swallows the dot.
        if self.peek() == Some('.')
            && self.src[self.pos + 1..].chars().next().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let s = &self.src[start..self.pos];
        s.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ParseError::new(format!("invalid number {:?}", s), start))
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            self.advance();
        }
        match &self.src[start..self.pos] {
            "true"  => Token::True,
            "false" => Token::False,
            "null" | "undefined" => Token::Null,
            word    => Token::Ident(word.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn member_access_keeps_dot() {
        assert_eq!(
            tokens("user.name"),
            vec![Token::Ident("user".into()), Token::Dot, Token::Ident("name".into()), Token::Eof]
        );
    }

    #[test]
    fn decimal_number() {
        assert_eq!(tokens("1.25"), vec![Token::Number(1.25), Token::Eof]);
    }

    #[test]
    fn strict_equality_is_accepted() {
        assert_eq!(tokens("a === b")[1], Token::EqEq);
        assert_eq!(tokens("a !== b")[1], Token::BangEq);
    }

    #[test]
    fn offsets_point_at_token_start() {
        let spans = Lexer::new("a  + b").tokenize().unwrap();
        assert_eq!(spans[1].offset, 3);
    }

    #[test]
    fn single_equals_is_rejected() {
        assert!(Lexer::new("a = 1").tokenize().is_err());
    }
}
