//! The tag registry and the query tagging API.
//!
//! A [`HintRegistry`] owns one freshly generated tag per registered hint
//! kind. It is built once and never mutated afterwards, so it can be read
//! concurrently without synchronization. The process-wide registry is
//! installed with [`install`] at startup or created lazily by [`global`].

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::error::PgHintError;
use crate::hint::{HINT_TAG_PREFIX, HintKind, Tag, check_conflict};
use crate::query::LogicalQuery;

/// A hint kind together with its tag and registration position.
#[derive(Debug, Clone)]
pub struct RegisteredHint {
    pub kind: HintKind,
    pub tag: Tag,
    /// Index in registration order.
    pub position: usize,
}

/// Immutable mapping between hint kinds and their tag values.
#[derive(Debug)]
pub struct HintRegistry {
    entries: Vec<RegisteredHint>,
}

impl HintRegistry {
    /// Register `kinds` in the given order, generating a tag for each.
    pub fn new(kinds: &[HintKind]) -> Result<Self, PgHintError> {
        let mut entries: Vec<RegisteredHint> = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            if entries.iter().any(|e| e.kind == kind) {
                return Err(PgHintError::InvalidArgument(format!(
                    "hint kind {kind} registered twice"
                )));
            }
            entries.push(RegisteredHint {
                kind,
                tag: Tag::generate(kind),
                position: entries.len(),
            });
        }
        Ok(HintRegistry { entries })
    }

    /// A registry with every [`HintKind`], in default order.
    pub fn with_all_hints() -> Self {
        HintRegistry {
            entries: HintKind::ALL
                .iter()
                .enumerate()
                .map(|(position, &kind)| RegisteredHint {
                    kind,
                    tag: Tag::generate(kind),
                    position,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[RegisteredHint] {
        &self.entries
    }

    pub fn kinds(&self) -> impl Iterator<Item = HintKind> + '_ {
        self.entries.iter().map(|e| e.kind)
    }

    pub fn is_registered(&self, kind: HintKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// The tag registered for `kind`.
    pub fn tag_of(&self, kind: HintKind) -> Result<&Tag, PgHintError> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| &e.tag)
            .ok_or_else(|| PgHintError::UnsupportedHintKind(kind.name().to_string()))
    }

    /// Resolve a tag value to its registered hint.
    ///
    /// Returns `None` for ordinary annotations and for hint-shaped tags this
    /// registry did not generate.
    pub fn resolve(&self, tag: &str) -> Option<&RegisteredHint> {
        if !tag.starts_with(HINT_TAG_PREFIX) {
            return None;
        }
        self.entries.iter().find(|e| e.tag.as_str() == tag)
    }

    /// Registered hints attached to the root of `query`.
    pub fn hints_on(&self, query: &LogicalQuery) -> Vec<HintKind> {
        query
            .tags()
            .iter()
            .filter_map(|t| self.resolve(t))
            .map(|e| e.kind)
            .collect()
    }

    /// Return a copy of `query` tagged with `kind`.
    ///
    /// The original query is unchanged. Fails with `UnsupportedHintKind` if
    /// `kind` is not registered, and with `InvalidHintCombination` if the
    /// query already carries a conflicting hint.
    pub fn tag(&self, query: &LogicalQuery, kind: HintKind) -> Result<LogicalQuery, PgHintError> {
        let tag = self.tag_of(kind)?;
        check_conflict(self.hints_on(query), kind)?;
        Ok(query.with_tag(tag.as_str()))
    }

    /// Tag `query` with a hint given by name (`"for_update"`, `"FOR UPDATE"`).
    pub fn tag_named(&self, query: &LogicalQuery, name: &str) -> Result<LogicalQuery, PgHintError> {
        self.tag(query, name.parse()?)
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<HintRegistry>> = OnceLock::new();

/// Install the process-wide registry. Must happen before the first call to
/// [`global`]; a second install fails.
pub fn install(registry: HintRegistry) -> Result<Arc<HintRegistry>, PgHintError> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY
        .set(Arc::clone(&registry))
        .map_err(|_| PgHintError::InvalidArgument("hint registry already installed".into()))?;
    info!(
        hints = ?registry.kinds().collect::<Vec<_>>(),
        "pg_query_hints: hint registry installed"
    );
    Ok(registry)
}

/// The process-wide registry. Registers every hint kind if nothing was
/// installed.
pub fn global() -> Arc<HintRegistry> {
    Arc::clone(GLOBAL_REGISTRY.get_or_init(|| {
        debug!("pg_query_hints: no registry installed, registering all hint kinds");
        Arc::new(HintRegistry::with_all_hints())
    }))
}

/// Hint tagging on [`LogicalQuery`] through the process-wide registry.
pub trait QueryHintExt {
    fn with_hint(&self, kind: HintKind) -> Result<LogicalQuery, PgHintError>;

    /// Lock the selected rows (`FOR UPDATE`).
    fn for_update(&self) -> Result<LogicalQuery, PgHintError> {
        self.with_hint(HintKind::ForUpdate)
    }

    fn for_share(&self) -> Result<LogicalQuery, PgHintError> {
        self.with_hint(HintKind::ForShare)
    }

    fn skip_locked(&self) -> Result<LogicalQuery, PgHintError> {
        self.with_hint(HintKind::SkipLocked)
    }

    fn no_wait(&self) -> Result<LogicalQuery, PgHintError> {
        self.with_hint(HintKind::NoWait)
    }
}

impl QueryHintExt for LogicalQuery {
    fn with_hint(&self, kind: HintKind) -> Result<LogicalQuery, PgHintError> {
        global().tag(self, kind)
    }
}
