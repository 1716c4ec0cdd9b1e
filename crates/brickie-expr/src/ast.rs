use serde_json::Value;

// ── Operators ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

// ── Expr ──────────────────────────────────────────────────────────────────

/// A parsed binding expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `42`, `"text"`, `true`, `null`
    Literal(Value),
    /// A variable read from the scope: `user`
    Ident(String),
    /// `object.field`
    Member(Box<Expr>, String),
    /// `object[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : otherwise`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Collect the scope variables this expression reads, first-seen order.
    ///
    /// Only root names count: `user.name` depends on `user`.
    pub fn identifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Expr::Member(object, _) => object.collect_identifiers(out),
            Expr::Index(object, index) => {
                object.collect_identifiers(out);
                index.collect_identifiers(out);
            }
            Expr::Array(items) => {
                for item in items {
                    item.collect_identifiers(out);
                }
            }
            Expr::Unary(_, operand) => operand.collect_identifiers(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
            Expr::Conditional(cond, then, otherwise) => {
                cond.collect_identifiers(out);
                then.collect_identifiers(out);
                otherwise.collect_identifiers(out);
            }
        }
    }
}

// ── Parsed ────────────────────────────────────────────────────────────────

/// Result of [`crate::parse`]: the evaluable node plus its dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub expr: Expr,
    pub identifiers: Vec<String>,
}
