//! Statement emission.
//!
//! A [`StatementPipeline`] sits in front of the execution layer. It renders
//! a [`LogicalQuery`] through a [`RenderBackend`], always runs the
//! [`StatementPatcher`] over the result, and hands the finished
//! [`RenderedStatement`] to a [`StatementSink`].
//!
//! Two strategies produce byte-identical output:
//!
//! - **tree-aware**: [`SqlEmitter::tree_aware`] consumes hint tags through a
//!   [`RowLockHook`] while rendering; the patcher finds nothing to do.
//! - **text patch**: [`SqlEmitter::opaque`] renders hint tags as header
//!   comments, and the patcher rewrites them into trailing clauses.
//!
//! # Submodules
//! - `writer`: body text and parameter collection
//! - `hooks`: visit hooks and the row-lock hook
//! - `emitter`: the SQL emitter
//! - `patcher`: text-level marker patching
//! - `plan_cache`: shared compiled-plan cache

pub mod emitter;
pub mod hooks;
pub mod patcher;
pub mod plan_cache;
pub mod writer;

#[cfg(test)]
pub mod test_helpers;

pub use emitter::SqlEmitter;
pub use hooks::{EmitContext, EmitHook, RowLockHook};
pub use patcher::StatementPatcher;
pub use plan_cache::{CompiledPlan, PlanCache, PlanCacheStats};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::{EmitStrategy, HintConfig};
use crate::error::PgHintError;
use crate::hint::HintRegistry;
use crate::query::expr::{SqlType, Value};
use crate::query::tree::LogicalQuery;

/// A bound parameter value with its PostgreSQL type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    pub value: Value,
    pub sql_type: SqlType,
}

impl BoundParameter {
    pub fn new(value: Value) -> Self {
        let sql_type = value.sql_type();
        BoundParameter { value, sql_type }
    }
}

/// Final SQL text and its parameters, in `$n` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedStatement {
    pub text: String,
    pub parameters: Vec<BoundParameter>,
}

impl RenderedStatement {
    /// Serialize to JSON (for logging and wire hand-off).
    pub fn to_json(&self) -> Result<String, PgHintError> {
        serde_json::to_string(self).map_err(|e| PgHintError::InternalError(e.to_string()))
    }
}

/// Something that turns a logical query into statement text.
pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, query: &LogicalQuery) -> Result<RenderedStatement, PgHintError>;
}

/// The execution layer.
pub trait StatementSink {
    type Output;

    fn send(&mut self, statement: RenderedStatement) -> Result<Self::Output, PgHintError>;
}

/// Collects statements instead of executing them.
impl StatementSink for Vec<RenderedStatement> {
    type Output = ();

    fn send(&mut self, statement: RenderedStatement) -> Result<(), PgHintError> {
        self.push(statement);
        Ok(())
    }
}

/// Render, patch, execute.
pub struct StatementPipeline {
    backend: Box<dyn RenderBackend>,
    patcher: StatementPatcher,
    log_statements: bool,
}

impl StatementPipeline {
    /// A pipeline over `backend`, patching against `registry`.
    pub fn new(backend: impl RenderBackend + 'static, registry: Arc<HintRegistry>) -> Self {
        StatementPipeline {
            backend: Box::new(backend),
            patcher: StatementPatcher::new(registry),
            log_statements: false,
        }
    }

    /// Build the pipeline `config` describes on top of `registry`.
    pub fn from_config(
        config: &HintConfig,
        registry: Arc<HintRegistry>,
    ) -> Result<Self, PgHintError> {
        config.validate()?;

        let emitter = match config.strategy {
            EmitStrategy::TreeAware => SqlEmitter::tree_aware(Arc::clone(&registry)),
            EmitStrategy::TextPatch => SqlEmitter::opaque(),
        };
        let emitter = match config.plan_cache_capacity {
            0 => emitter,
            capacity => emitter.with_plan_cache(Arc::new(PlanCache::new(capacity))),
        };
        let emitter = emitter.with_terminator(config.statement_terminator);

        debug!(
            strategy = ?config.strategy,
            plan_cache_capacity = config.plan_cache_capacity,
            "pg_query_hints: statement pipeline configured"
        );

        Ok(Self::new(emitter, registry).with_statement_logging(config.log_statements))
    }

    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn registry(&self) -> &Arc<HintRegistry> {
        self.patcher.registry()
    }

    /// Render and patch `query` without executing it.
    pub fn prepare(&self, query: &LogicalQuery) -> Result<RenderedStatement, PgHintError> {
        let rendered = self.backend.render(query)?;
        let statement = self.patcher.patch_statement(rendered)?;

        if self.log_statements {
            let params = serde_json::to_string(&statement.parameters)
                .map_err(|e| PgHintError::InternalError(e.to_string()))?;
            debug!(
                backend = self.backend.name(),
                sql = %statement.text,
                params = %params,
                "pg_query_hints: statement prepared"
            );
        }
        Ok(statement)
    }

    /// The final SQL text for `query`.
    pub fn to_query_string(&self, query: &LogicalQuery) -> Result<String, PgHintError> {
        Ok(self.prepare(query)?.text)
    }

    /// Prepare `query` and hand it to `sink`. Nothing is sent if preparation
    /// fails.
    pub fn execute<S: StatementSink>(
        &self,
        query: &LogicalQuery,
        sink: &mut S,
    ) -> Result<S::Output, PgHintError> {
        let statement = self.prepare(query)?;
        sink.send(statement)
    }
}
