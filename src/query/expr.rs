//! Scalar expressions of the logical query tree.

use serde::{Deserialize, Serialize};

use crate::query::tree::LogicalQuery;

/// SQL type of a value or bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Unknown,
    Bool,
    Int8,
    Float8,
    Text,
}

impl SqlType {
    pub(crate) fn shape_code(&self) -> u8 {
        match self {
            SqlType::Unknown => 0,
            SqlType::Bool => 1,
            SqlType::Int8 => 2,
            SqlType::Float8 => 3,
            SqlType::Text => 4,
        }
    }
}

/// A scalar value, either inlined as a literal or bound as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Null => SqlType::Unknown,
            Value::Bool(_) => SqlType::Bool,
            Value::Int(_) => SqlType::Int8,
            Value::Float(_) => SqlType::Float8,
            Value::Text(_) => SqlType::Text,
        }
    }

    /// Render the value as an inline SQL literal.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(v) => v.to_string(),
            // `Debug` keeps the fractional part (`2.0`), so PostgreSQL reads
            // a numeric literal rather than an integer.
            Value::Float(v) if v.is_finite() => format!("{v:?}"),
            Value::Float(v) => format!("'{v}'::float8"),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Binary operators, with PostgreSQL precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Like => "LIKE",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => 5,
            BinaryOp::Like => 6,
            BinaryOp::Add | BinaryOp::Sub => 7,
            BinaryOp::Mul | BinaryOp::Div => 8,
        }
    }

    pub(crate) fn shape_code(&self) -> u8 {
        *self as u8
    }
}

/// Precedence of `NOT`.
pub(crate) const NOT_PRECEDENCE: u8 = 3;
/// Precedence of `IS [NOT] NULL`.
pub(crate) const IS_PRECEDENCE: u8 = 4;

/// A scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `qualifier.name` or `name`.
    Column {
        qualifier: Option<String>,
        name: String,
    },
    /// A value inlined into the SQL text. Part of the query shape.
    Literal(Value),
    /// A value bound as `$n`. Only its type is part of the query shape.
    Param(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Func {
        name: String,
        args: Vec<Expr>,
    },
    /// `*` or `qualifier.*`.
    Star { qualifier: Option<String> },
    /// `[NOT] EXISTS (subquery)`. Tags on the subquery are ignored.
    Exists {
        query: Box<LogicalQuery>,
        negated: bool,
    },
}

/// Unqualified column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        qualifier: None,
        name: name.to_string(),
    }
}

/// Qualified column reference.
pub fn qcol(qualifier: &str, name: &str) -> Expr {
    Expr::Column {
        qualifier: Some(qualifier.to_string()),
        name: name.to_string(),
    }
}

/// Inline literal.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Bound parameter.
pub fn param(value: impl Into<Value>) -> Expr {
    Expr::Param(value.into())
}

/// Function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Func {
        name: name.to_string(),
        args,
    }
}

/// `EXISTS (query)`.
pub fn exists(query: LogicalQuery) -> Expr {
    Expr::Exists {
        query: Box::new(query),
        negated: false,
    }
}

impl Expr {
    fn binary(self, op: BinaryOp, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn not_eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::NotEq, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn lt_eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::LtEq, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn gt_eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::GtEq, rhs)
    }

    pub fn like(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Like, rhs)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn add(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Mul, rhs)
    }

    pub fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Div, rhs)
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// Binding strength of the expression's outermost operator.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Not(_) => NOT_PRECEDENCE,
            Expr::IsNull { .. } => IS_PRECEDENCE,
            Expr::Exists { negated: true, .. } => NOT_PRECEDENCE,
            _ => u8::MAX,
        }
    }
}
