//! The SQL emitter.
//!
//! Renders a [`LogicalQuery`] as `<tag header><body>[<hook output>][;]`.
//! Every root tag left after the hooks ran is written as one `-- <tag>`
//! comment line per tag line; this generic annotation path is also how a
//! hint tag becomes a sentinel marker when no hook consumes it.

use std::sync::Arc;

use crate::emit::hooks::{EmitContext, EmitHook, RowLockHook};
use crate::emit::plan_cache::PlanCache;
use crate::emit::writer::SqlWriter;
use crate::emit::{RenderBackend, RenderedStatement};
use crate::error::PgHintError;
use crate::hint::{COMMENT_PREFIX, HintRegistry};
use crate::query::tags::TagSet;
use crate::query::tree::LogicalQuery;

#[derive(Debug, Default)]
pub struct SqlEmitter {
    hooks: Vec<Box<dyn EmitHook>>,
    cache: Option<Arc<PlanCache>>,
    terminator: bool,
}

impl SqlEmitter {
    /// An emitter without hooks. Hint tags are rendered like any other
    /// annotation and left for the statement patcher.
    pub fn opaque() -> Self {
        Self::default()
    }

    /// An emitter that consumes `registry`'s hint tags while rendering.
    pub fn tree_aware(registry: Arc<HintRegistry>) -> Self {
        Self::opaque().with_hook(RowLockHook::new(registry))
    }

    pub fn with_hook(mut self, hook: impl EmitHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn with_plan_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Terminate every statement with `;`.
    pub fn with_terminator(mut self, terminator: bool) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn plan_cache(&self) -> Option<&Arc<PlanCache>> {
        self.cache.as_ref()
    }

    pub fn is_opaque(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Render `query`. The query itself is never modified.
    pub fn emit(&self, query: &LogicalQuery) -> Result<RenderedStatement, PgHintError> {
        let mut tags = query.tags().clone();
        let mut cx = EmitContext::new();
        for hook in &self.hooks {
            hook.before_statement(&mut tags, &mut cx)?;
        }

        let mut text = String::new();
        write_tag_header(&mut text, &tags);

        let parameters = match &self.cache {
            Some(cache) => {
                let plan = cache.get_or_compile(query.body());
                text.push_str(&plan.body_sql);
                let params = SqlWriter::collect_params(query.body());
                if params.len() != plan.param_types.len() {
                    return Err(PgHintError::InternalError(format!(
                        "cached plan expects {} parameters, query binds {}",
                        plan.param_types.len(),
                        params.len()
                    )));
                }
                params
            }
            None => {
                let (body, params) = SqlWriter::render(query.body());
                text.push_str(&body);
                params
            }
        };

        for hook in &self.hooks {
            hook.after_body(&cx, &mut text)?;
        }
        if self.terminator {
            text.push(';');
        }

        Ok(RenderedStatement { text, parameters })
    }
}

impl RenderBackend for SqlEmitter {
    fn name(&self) -> &'static str {
        if self.is_opaque() { "opaque" } else { "tree_aware" }
    }

    fn render(&self, query: &LogicalQuery) -> Result<RenderedStatement, PgHintError> {
        self.emit(query)
    }
}

fn write_tag_header(out: &mut String, tags: &TagSet) {
    for tag in tags.iter() {
        for line in tag.lines() {
            out.push_str(COMMENT_PREFIX);
            out.push_str(line);
            out.push('\n');
        }
    }
}
