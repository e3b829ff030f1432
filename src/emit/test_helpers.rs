//! Shared test helpers for emission unit tests.
//!
//! Provides a private registry builder, the canonical sample query and
//! tagging shortcuts. None of them touch the process-wide registry.

use std::sync::Arc;

use crate::hint::{HintKind, HintRegistry};
use crate::query::expr::{col, lit};
use crate::query::tree::LogicalQuery;

// ── Registry builders ───────────────────────────────────────────────────

/// A fresh registry with every hint kind. Tags differ between calls.
pub fn registry() -> Arc<HintRegistry> {
    Arc::new(HintRegistry::with_all_hints())
}

// ── Query builders ──────────────────────────────────────────────────────

/// `SELECT name FROM t WHERE id = 1`
pub fn simple_select() -> LogicalQuery {
    LogicalQuery::from_table("t")
        .select(&["name"])
        .filter(col("id").eq(lit(1)))
}

/// Tag `query` with `kind` through `registry`, panicking on failure.
pub fn tagged(registry: &HintRegistry, query: &LogicalQuery, kind: HintKind) -> LogicalQuery {
    registry
        .tag(query, kind)
        .unwrap_or_else(|e| panic!("tagging with {kind} failed: {e}"))
}
