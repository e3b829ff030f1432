//! Canonical shape encoding of a query body.
//!
//! Two bodies with equal encodings render to the same SQL text with the same
//! parameter types. The encoding excludes every tag (root and nested) and
//! the values of bound parameters; inline literals are part of the shape.

use crate::query::expr::{Expr, Value};
use crate::query::tree::{QueryBody, SelectItem, Source};

/// Encode the shape of `body`.
pub fn encode(body: &QueryBody) -> Vec<u8> {
    let mut enc = ShapeEncoder::default();
    enc.body(body);
    enc.buf
}

#[derive(Default)]
struct ShapeEncoder {
    buf: Vec<u8>,
}

impl ShapeEncoder {
    fn tag(&mut self, t: u8) {
        self.buf.push(t);
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.u64(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.tag(1);
                self.str(s);
            }
            None => self.tag(0),
        }
    }

    fn opt_u64(&mut self, v: Option<u64>) {
        match v {
            Some(v) => {
                self.tag(1);
                self.u64(v);
            }
            None => self.tag(0),
        }
    }

    fn body(&mut self, body: &QueryBody) {
        self.tag(b'Q');
        self.tag(body.distinct as u8);
        self.u64(body.projection.len() as u64);
        for SelectItem { expr, alias } in &body.projection {
            self.expr(expr);
            self.opt_str(alias.as_deref());
        }
        self.source(&body.from);
        self.u64(body.joins.len() as u64);
        for join in &body.joins {
            self.tag(join.kind as u8);
            self.source(&join.source);
            self.expr(&join.on);
        }
        match &body.predicate {
            Some(p) => {
                self.tag(1);
                self.expr(p);
            }
            None => self.tag(0),
        }
        self.u64(body.order_by.len() as u64);
        for sort in &body.order_by {
            self.expr(&sort.expr);
            self.tag(sort.ascending as u8);
        }
        self.opt_u64(body.limit);
        self.opt_u64(body.offset);
    }

    fn source(&mut self, source: &Source) {
        match source {
            Source::Table {
                schema,
                name,
                alias,
            } => {
                self.tag(b'T');
                self.opt_str(schema.as_deref());
                self.str(name);
                self.opt_str(alias.as_deref());
            }
            Source::Subquery { query, alias } => {
                self.tag(b'S');
                self.body(query.body());
                self.str(alias);
            }
        }
    }

    fn value(&mut self, value: &Value) {
        match value {
            Value::Null => self.tag(0),
            Value::Bool(b) => {
                self.tag(1);
                self.tag(*b as u8);
            }
            Value::Int(i) => {
                self.tag(2);
                self.u64(*i as u64);
            }
            Value::Float(f) => {
                self.tag(3);
                self.u64(f.to_bits());
            }
            Value::Text(s) => {
                self.tag(4);
                self.str(s);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column { qualifier, name } => {
                self.tag(b'c');
                self.opt_str(qualifier.as_deref());
                self.str(name);
            }
            Expr::Literal(v) => {
                self.tag(b'l');
                self.value(v);
            }
            Expr::Param(v) => {
                self.tag(b'p');
                self.tag(v.sql_type().shape_code());
            }
            Expr::Binary { op, left, right } => {
                self.tag(b'b');
                self.tag(op.shape_code());
                self.expr(left);
                self.expr(right);
            }
            Expr::Not(inner) => {
                self.tag(b'n');
                self.expr(inner);
            }
            Expr::IsNull { expr, negated } => {
                self.tag(b'i');
                self.tag(*negated as u8);
                self.expr(expr);
            }
            Expr::Func { name, args } => {
                self.tag(b'f');
                self.str(name);
                self.u64(args.len() as u64);
                for a in args {
                    self.expr(a);
                }
            }
            Expr::Star { qualifier } => {
                self.tag(b'*');
                self.opt_str(qualifier.as_deref());
            }
            Expr::Exists { query, negated } => {
                self.tag(b'e');
                self.tag(*negated as u8);
                self.body(query.body());
            }
        }
    }
}
