//! Shared helpers for integration tests.
//!
//! Builds pipelines for both emission strategies over one registry, so
//! tests can compare their output for the same logical query.

use std::sync::Arc;

use pg_query_hints::{
    HintKind, HintRegistry, LogicalQuery, PgHintError, PlanCache, RenderedStatement, SqlEmitter,
    StatementPipeline, col, lit,
};

/// Both strategies over the same registry.
#[allow(dead_code)]
pub struct Pipelines {
    pub registry: Arc<HintRegistry>,
    pub tree_aware: StatementPipeline,
    pub text_patch: StatementPipeline,
}

#[allow(dead_code)]
impl Pipelines {
    pub fn new(registry: Arc<HintRegistry>) -> Self {
        Self::build(registry, None, false)
    }

    pub fn with_plan_cache(registry: Arc<HintRegistry>, cache: Arc<PlanCache>) -> Self {
        Self::build(registry, Some(cache), false)
    }

    pub fn terminated(registry: Arc<HintRegistry>) -> Self {
        Self::build(registry, None, true)
    }

    fn build(registry: Arc<HintRegistry>, cache: Option<Arc<PlanCache>>, terminator: bool) -> Self {
        let mut tree = SqlEmitter::tree_aware(Arc::clone(&registry)).with_terminator(terminator);
        let mut opaque = SqlEmitter::opaque().with_terminator(terminator);
        if let Some(cache) = cache {
            tree = tree.with_plan_cache(Arc::clone(&cache));
            opaque = opaque.with_plan_cache(cache);
        }
        Pipelines {
            tree_aware: StatementPipeline::new(tree, Arc::clone(&registry)),
            text_patch: StatementPipeline::new(opaque, Arc::clone(&registry)),
            registry,
        }
    }

    /// Prepare `query` with both strategies and assert they agree.
    pub fn prepare_both(&self, query: &LogicalQuery) -> Result<RenderedStatement, PgHintError> {
        let a = self.tree_aware.prepare(query);
        let b = self.text_patch.prepare(query);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a, b, "strategies disagree");
                Ok(a)
            }
            (Err(a), Err(b)) => {
                assert_eq!(a.kind(), b.kind(), "strategies fail differently: {a} / {b}");
                Err(a)
            }
            (a, b) => panic!("strategies disagree: {a:?} / {b:?}"),
        }
    }

    pub fn tag(&self, query: &LogicalQuery, kind: HintKind) -> LogicalQuery {
        self.registry
            .tag(query, kind)
            .unwrap_or_else(|e| panic!("tagging with {kind} failed: {e}"))
    }
}

/// A fresh registry with every hint kind.
#[allow(dead_code)]
pub fn fresh_registry() -> Arc<HintRegistry> {
    Arc::new(HintRegistry::with_all_hints())
}

/// `SELECT name FROM t WHERE id = 1`
#[allow(dead_code)]
pub fn simple_select() -> LogicalQuery {
    LogicalQuery::from_table("t")
        .select(&["name"])
        .filter(col("id").eq(lit(1)))
}
