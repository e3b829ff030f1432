//! pg_query_hints: row-locking hints for generated PostgreSQL statements.
//!
//! A query is tagged with a hint such as `FOR UPDATE` independently of its
//! projection and predicate. The hint is carried as an opaque tag on the
//! immutable [`LogicalQuery`] and turned into a trailing locking clause,
//! exactly once, when the statement is emitted:
//!
//! ```
//! use std::sync::Arc;
//! use pg_query_hints::{HintKind, HintRegistry, LogicalQuery, SqlEmitter, StatementPipeline, col, lit};
//!
//! let registry = Arc::new(HintRegistry::with_all_hints());
//! let pipeline = StatementPipeline::new(SqlEmitter::tree_aware(Arc::clone(&registry)), Arc::clone(&registry));
//!
//! let query = LogicalQuery::from_table("t")
//!     .select(&["name"])
//!     .filter(col("id").eq(lit(1)));
//! let locked = registry.tag(&query, HintKind::ForUpdate)?;
//!
//! assert_eq!(
//!     pipeline.to_query_string(&locked)?,
//!     "SELECT name FROM t WHERE id = 1\nFOR UPDATE"
//! );
//! assert_eq!(pipeline.to_query_string(&query)?, "SELECT name FROM t WHERE id = 1");
//! # Ok::<(), pg_query_hints::PgHintError>(())
//! ```
//!
//! Hint tags are rendered by the generic annotation mechanism as
//! `-- PGQH-HINT-...` header lines when no emitter hook consumes them; the
//! statement patcher turns those markers into the same trailing clauses, so
//! both strategies produce identical text.
//!
//! # Modules
//! - [`query`]: the logical query tree, expressions and tag sets
//! - [`hint`]: hint kinds, tags and the registry
//! - [`emit`]: emitter, hooks, patcher, plan cache and pipeline
//! - [`config`]: TOML configuration
//! - [`error`]: the crate error type

pub mod config;
pub mod emit;
pub mod error;
mod hash;
pub mod hint;
pub mod query;

pub use config::{EmitStrategy, HintConfig};
pub use emit::{
    BoundParameter, PlanCache, PlanCacheStats, RenderBackend, RenderedStatement, SqlEmitter,
    StatementPatcher, StatementPipeline, StatementSink,
};
pub use error::{PgHintError, PgHintErrorKind};
pub use hint::{HintClass, HintKind, HintRegistry, QueryHintExt, Tag, global, install};
pub use query::{
    Expr, JoinKind, LogicalQuery, SqlType, Source, TagSet, Value, col, exists, func, lit, param,
    qcol,
};
