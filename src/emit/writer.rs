//! SQL text generation for query bodies.
//!
//! [`SqlWriter`] renders a [`QueryBody`] to PostgreSQL text with `$n`
//! placeholders for bound parameters. The same walk runs in
//! parameters-only mode on a plan-cache hit, so the parameter order always
//! matches the placeholders of the cached text.

use std::borrow::Cow;

use crate::emit::BoundParameter;
use crate::query::expr::{Expr, IS_PRECEDENCE, NOT_PRECEDENCE};
use crate::query::tree::{QueryBody, Source};

/// Keywords that cannot be used as bare identifiers.
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "intersect", "into", "is",
    "isnull", "join", "lateral", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "not", "notnull", "null", "offset", "on", "only", "or",
    "order", "outer", "overlaps", "placing", "primary", "references", "returning", "right",
    "select", "session_user", "similar", "some", "symmetric", "table", "tablesample",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "verbose", "when", "where", "window", "with",
];

/// Quote a SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render an identifier bare when PostgreSQL would read it back unchanged,
/// quoted otherwise.
pub fn ident(name: &str) -> Cow<'_, str> {
    if is_bare_ident(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(quote_ident(name))
    }
}

fn is_bare_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        && !RESERVED_KEYWORDS.contains(&name)
}

/// Writer for statement bodies.
#[derive(Debug, Default)]
pub struct SqlWriter {
    buf: String,
    skip_text: bool,
    params: Vec<BoundParameter>,
}

impl SqlWriter {
    /// A writer producing text and parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer that only collects parameters.
    pub fn params_only() -> Self {
        SqlWriter {
            skip_text: true,
            ..Self::default()
        }
    }

    /// Render `body` and return its text and parameters.
    pub fn render(body: &QueryBody) -> (String, Vec<BoundParameter>) {
        let mut w = SqlWriter::new();
        w.write_body(body);
        w.finish()
    }

    /// Collect the parameters of `body` in placeholder order.
    pub fn collect_params(body: &QueryBody) -> Vec<BoundParameter> {
        let mut w = SqlWriter::params_only();
        w.write_body(body);
        w.params
    }

    pub fn finish(self) -> (String, Vec<BoundParameter>) {
        (self.buf, self.params)
    }

    fn push(&mut self, s: &str) {
        if !self.skip_text {
            self.buf.push_str(s);
        }
    }

    fn push_ident(&mut self, name: &str) {
        if !self.skip_text {
            self.buf.push_str(&ident(name));
        }
    }

    pub fn write_body(&mut self, body: &QueryBody) {
        self.push("SELECT ");
        if body.distinct {
            self.push("DISTINCT ");
        }
        if body.projection.is_empty() {
            self.push("*");
        }
        for (i, item) in body.projection.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.write_expr(&item.expr);
            if let Some(alias) = &item.alias {
                self.push(" AS ");
                self.push_ident(alias);
            }
        }

        self.push(" FROM ");
        self.write_source(&body.from);

        for join in &body.joins {
            self.push(" ");
            self.push(join.kind.as_sql());
            self.push(" ");
            self.write_source(&join.source);
            self.push(" ON ");
            self.write_expr(&join.on);
        }

        if let Some(predicate) = &body.predicate {
            self.push(" WHERE ");
            self.write_expr(predicate);
        }

        for (i, sort) in body.order_by.iter().enumerate() {
            self.push(if i == 0 { " ORDER BY " } else { ", " });
            self.write_expr(&sort.expr);
            if !sort.ascending {
                self.push(" DESC");
            }
        }

        if let Some(limit) = body.limit {
            self.push(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = body.offset {
            self.push(&format!(" OFFSET {offset}"));
        }
    }

    fn write_source(&mut self, source: &Source) {
        match source {
            Source::Table {
                schema,
                name,
                alias,
            } => {
                if let Some(schema) = schema {
                    self.push_ident(schema);
                    self.push(".");
                }
                self.push_ident(name);
                if let Some(alias) = alias {
                    self.push(" AS ");
                    self.push_ident(alias);
                }
            }
            Source::Subquery { query, alias } => {
                // Tags on a derived table are not part of the outer statement.
                self.push("(");
                self.write_body(query.body());
                self.push(") AS ");
                self.push_ident(alias);
            }
        }
    }

    /// Write `expr`, parenthesized when it binds weaker than `min_prec`.
    fn write_operand(&mut self, expr: &Expr, min_prec: u8) {
        if expr.precedence() < min_prec {
            self.push("(");
            self.write_expr(expr);
            self.push(")");
        } else {
            self.write_expr(expr);
        }
    }

    pub fn write_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column { qualifier, name } => {
                if let Some(q) = qualifier {
                    self.push_ident(q);
                    self.push(".");
                }
                self.push_ident(name);
            }
            Expr::Literal(v) => {
                if !self.skip_text {
                    self.buf.push_str(&v.to_literal());
                }
            }
            Expr::Param(v) => {
                self.params.push(BoundParameter::new(v.clone()));
                let placeholder = format!("${}", self.params.len());
                self.push(&placeholder);
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                self.write_operand(left, prec);
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                // Left-associative: an equal-precedence right operand needs parens.
                self.write_operand(right, prec + 1);
            }
            Expr::Not(inner) => {
                self.push("NOT ");
                self.write_operand(inner, NOT_PRECEDENCE);
            }
            Expr::IsNull { expr, negated } => {
                self.write_operand(expr, IS_PRECEDENCE + 1);
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::Func { name, args } => {
                self.push(name);
                self.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.write_expr(arg);
                }
                self.push(")");
            }
            Expr::Star { qualifier } => {
                if let Some(q) = qualifier {
                    self.push_ident(q);
                    self.push(".");
                }
                self.push("*");
            }
            Expr::Exists { query, negated } => {
                self.push(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                self.write_body(query.body());
                self.push(")");
            }
        }
    }
}
