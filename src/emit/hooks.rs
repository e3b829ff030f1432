//! Visit hooks run by [`SqlEmitter`] around the outermost statement.
//!
//! Hooks see a per-render copy of the root tag set before the tag header is
//! written, and the finished body text afterwards. A hook can therefore
//! consume a tag (so it never reaches the header) and turn it into text at
//! the end of the statement.
//!
//! [`SqlEmitter`]: crate::emit::SqlEmitter

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::PgHintError;
use crate::hint::{HintRegistry, RegisteredHint, append_clauses, ordered_clauses};
use crate::query::tags::TagSet;

/// Per-render state shared by the hooks of one emission.
#[derive(Debug, Default)]
pub struct EmitContext {
    hints: Vec<RegisteredHint>,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a consumed hint; its clause is appended after the body.
    pub fn push_hint(&mut self, hint: RegisteredHint) {
        self.hints.push(hint);
    }

    pub fn hints(&self) -> &[RegisteredHint] {
        &self.hints
    }
}

/// A rendering hook. Both callbacks default to no-ops.
pub trait EmitHook: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Called with the per-render tag copy before the header is written.
    fn before_statement(
        &self,
        _tags: &mut TagSet,
        _cx: &mut EmitContext,
    ) -> Result<(), PgHintError> {
        Ok(())
    }

    /// Called with the statement text after the body is written.
    fn after_body(&self, _cx: &EmitContext, _sql: &mut String) -> Result<(), PgHintError> {
        Ok(())
    }
}

/// Consumes registered hint tags and appends their locking clauses.
#[derive(Debug, Clone)]
pub struct RowLockHook {
    registry: Arc<HintRegistry>,
}

impl RowLockHook {
    pub fn new(registry: Arc<HintRegistry>) -> Self {
        RowLockHook { registry }
    }
}

impl EmitHook for RowLockHook {
    fn name(&self) -> &'static str {
        "row_lock"
    }

    fn before_statement(&self, tags: &mut TagSet, cx: &mut EmitContext) -> Result<(), PgHintError> {
        let consumed = tags.take_matching(|tag| self.registry.resolve(tag).is_some());
        for tag in consumed {
            if let Some(hint) = self.registry.resolve(&tag) {
                trace!(hint = %hint.kind, "pg_query_hints: hint consumed");
                cx.push_hint(hint.clone());
            }
        }
        Ok(())
    }

    fn after_body(&self, cx: &EmitContext, sql: &mut String) -> Result<(), PgHintError> {
        let clauses = ordered_clauses(cx.hints().iter().collect())?;
        append_clauses(sql, &clauses);
        Ok(())
    }
}
