use std::fmt;

/// A syntax error in a binding expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the expression source where the error was detected.
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(msg: impl Into<String>, offset: usize) -> Self {
        Self { message: msg.into(), offset }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression parse error at {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A runtime failure while evaluating a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError(pub String);

impl EvalError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression evaluation error: {}", self.0)
    }
}

impl std::error::Error for EvalError {}
