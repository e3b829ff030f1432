//! The logical query tree and its fluent construction API.
//!
//! A [`LogicalQuery`] is immutable: every builder method returns a derived
//! copy that shares unchanged structure with its parent through `Arc`. Tags
//! live beside the body, so tagging a query never copies the tree.

use std::sync::Arc;

use crate::error::PgHintError;
use crate::hint::HINT_TAG_PREFIX;
use crate::query::expr::{Expr, col};
use crate::query::shape;
use crate::query::tags::TagSet;

/// An immutable logical query: a `SELECT` body plus its root annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalQuery {
    body: Arc<QueryBody>,
    tags: TagSet,
}

/// Body of a `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBody {
    /// Output expressions. Empty means `*`.
    pub projection: Vec<SelectItem>,
    pub distinct: bool,
    pub from: Source,
    pub joins: Vec<Join>,
    pub predicate: Option<Expr>,
    pub order_by: Vec<SortExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One projected expression with an optional output alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// A `FROM` item.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table {
        schema: Option<String>,
        name: String,
        alias: Option<String>,
    },
    /// A derived table. Tags attached to `query` are not honored.
    Subquery {
        query: Box<LogicalQuery>,
        alias: String,
    },
}

impl Source {
    pub fn table(name: &str) -> Source {
        Source::Table {
            schema: None,
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn qualified(schema: &str, name: &str) -> Source {
        Source::Table {
            schema: Some(schema.to_string()),
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn subquery(query: LogicalQuery, alias: &str) -> Source {
        Source::Subquery {
            query: Box::new(query),
            alias: alias.to_string(),
        }
    }

    /// Set the alias of this source.
    pub fn aliased(self, new_alias: &str) -> Source {
        match self {
            Source::Table { schema, name, .. } => Source::Table {
                schema,
                name,
                alias: Some(new_alias.to_string()),
            },
            Source::Subquery { query, .. } => Source::Subquery {
                query,
                alias: new_alias.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub source: Source,
    pub on: Expr,
}

/// Sort key for `ORDER BY`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub expr: Expr,
    pub ascending: bool,
}

impl QueryBody {
    /// A `SELECT *` over `from` with no other clauses.
    pub fn select_all(from: Source) -> Self {
        QueryBody {
            projection: Vec::new(),
            distinct: false,
            from,
            joins: Vec::new(),
            predicate: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl LogicalQuery {
    pub fn from_body(body: QueryBody) -> Self {
        LogicalQuery {
            body: Arc::new(body),
            tags: TagSet::new(),
        }
    }

    /// `SELECT * FROM name`.
    pub fn from_table(name: &str) -> Self {
        Self::from_body(QueryBody::select_all(Source::table(name)))
    }

    /// `SELECT * FROM schema.name`.
    pub fn from_qualified(schema: &str, name: &str) -> Self {
        Self::from_body(QueryBody::select_all(Source::qualified(schema, name)))
    }

    /// `SELECT * FROM (query) AS alias`.
    pub fn from_subquery(query: LogicalQuery, alias: &str) -> Self {
        Self::from_body(QueryBody::select_all(Source::subquery(query, alias)))
    }

    pub fn body(&self) -> &QueryBody {
        &self.body
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Whether two queries share the same body allocation.
    pub fn shares_body_with(&self, other: &LogicalQuery) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    fn map_body(&self, f: impl FnOnce(&mut QueryBody)) -> LogicalQuery {
        let mut body = Arc::clone(&self.body);
        f(Arc::make_mut(&mut body));
        LogicalQuery {
            body,
            tags: self.tags.clone(),
        }
    }

    /// Alias the `FROM` source.
    pub fn alias(&self, alias: &str) -> LogicalQuery {
        self.map_body(|b| {
            let from = std::mem::replace(&mut b.from, Source::table(""));
            b.from = from.aliased(alias);
        })
    }

    /// Replace the projection with plain column references.
    pub fn select(&self, columns: &[&str]) -> LogicalQuery {
        self.map_body(|b| {
            b.projection = columns
                .iter()
                .map(|c| SelectItem {
                    expr: col(c),
                    alias: None,
                })
                .collect();
        })
    }

    /// Append an unaliased projected expression.
    pub fn select_expr(&self, expr: Expr) -> LogicalQuery {
        self.map_body(|b| b.projection.push(SelectItem { expr, alias: None }))
    }

    /// Append a projected expression with an output alias.
    pub fn select_as(&self, expr: Expr, alias: &str) -> LogicalQuery {
        self.map_body(|b| {
            b.projection.push(SelectItem {
                expr,
                alias: Some(alias.to_string()),
            })
        })
    }

    /// Add a predicate, AND-ed with any existing one.
    pub fn filter(&self, predicate: Expr) -> LogicalQuery {
        self.map_body(|b| {
            b.predicate = Some(match b.predicate.take() {
                Some(existing) => existing.and(predicate),
                None => predicate,
            });
        })
    }

    pub fn join(&self, kind: JoinKind, source: Source, on: Expr) -> LogicalQuery {
        self.map_body(|b| b.joins.push(Join { kind, source, on }))
    }

    pub fn order_by(&self, expr: Expr, ascending: bool) -> LogicalQuery {
        self.map_body(|b| b.order_by.push(SortExpr { expr, ascending }))
    }

    pub fn limit(&self, n: u64) -> LogicalQuery {
        self.map_body(|b| b.limit = Some(n))
    }

    pub fn offset(&self, n: u64) -> LogicalQuery {
        self.map_body(|b| b.offset = Some(n))
    }

    pub fn distinct(&self) -> LogicalQuery {
        self.map_body(|b| b.distinct = true)
    }

    /// Attach a diagnostic comment, rendered as `-- text` header lines.
    ///
    /// Comments whose lines start with the reserved hint prefix are rejected
    /// so they can never be mistaken for a hint marker.
    pub fn with_comment(&self, text: &str) -> Result<LogicalQuery, PgHintError> {
        if text.lines().any(|line| line.starts_with(HINT_TAG_PREFIX)) {
            return Err(PgHintError::InvalidArgument(format!(
                "comment uses the reserved prefix {HINT_TAG_PREFIX}"
            )));
        }
        Ok(self.with_tag(text))
    }

    /// Attach a raw tag. The tagging API validates before calling this.
    pub(crate) fn with_tag(&self, tag: &str) -> LogicalQuery {
        LogicalQuery {
            body: Arc::clone(&self.body),
            tags: self.tags.with(tag),
        }
    }

    /// Canonical shape encoding of the body (tags and parameter values excluded).
    pub fn shape_encoding(&self) -> Vec<u8> {
        shape::encode(&self.body)
    }

    /// Whether both queries have the same structural shape.
    pub fn same_shape(&self, other: &LogicalQuery) -> bool {
        self.shares_body_with(other) || self.shape_encoding() == other.shape_encoding()
    }
}
