//! Row-locking hints and their tags.
//!
//! A hint is an execution directive attached to a query independently of its
//! projection and predicate logic. Each registered [`HintKind`] owns one
//! process-unique [`Tag`]; attaching the tag to a query's root [`TagSet`]
//! requests the hint, and the emitter (or the statement patcher) turns it
//! into a trailing locking clause.
//!
//! Tag text has the form `PGQH-HINT-<KIND>-<uuid>`. Written through the
//! generic annotation mechanism it becomes the header line
//! `-- PGQH-HINT-<KIND>-<uuid>`, whose fixed prefix [`MARKER_PREFIX`] is the
//! sentinel the patcher looks for.
//!
//! [`TagSet`]: crate::query::TagSet

pub mod registry;

pub use registry::{HintRegistry, QueryHintExt, RegisteredHint, global, install};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PgHintError;

/// Reserved prefix of every hint tag value.
pub const HINT_TAG_PREFIX: &str = "PGQH-HINT-";

/// Reserved prefix of a hint tag rendered as a header comment line.
pub const MARKER_PREFIX: &str = "-- PGQH-HINT-";

/// Prefix the annotation mechanism writes in front of every tag line.
pub const COMMENT_PREFIX: &str = "-- ";

/// The supported hint kinds (PostgreSQL locking clause).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    ForUpdate,
    ForNoKeyUpdate,
    ForShare,
    ForKeyShare,
    NoWait,
    SkipLocked,
}

/// Clause class. At most one hint per class may apply to a statement, and
/// clauses are emitted class by class in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintClass {
    LockStrength,
    WaitPolicy,
}

impl HintKind {
    /// Every kind, in default registration order.
    pub const ALL: [HintKind; 6] = [
        HintKind::ForUpdate,
        HintKind::ForNoKeyUpdate,
        HintKind::ForShare,
        HintKind::ForKeyShare,
        HintKind::NoWait,
        HintKind::SkipLocked,
    ];

    /// Configuration name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            HintKind::ForUpdate => "for_update",
            HintKind::ForNoKeyUpdate => "for_no_key_update",
            HintKind::ForShare => "for_share",
            HintKind::ForKeyShare => "for_key_share",
            HintKind::NoWait => "no_wait",
            HintKind::SkipLocked => "skip_locked",
        }
    }

    /// The trailing clause this hint emits.
    pub fn clause(&self) -> &'static str {
        match self {
            HintKind::ForUpdate => "FOR UPDATE",
            HintKind::ForNoKeyUpdate => "FOR NO KEY UPDATE",
            HintKind::ForShare => "FOR SHARE",
            HintKind::ForKeyShare => "FOR KEY SHARE",
            HintKind::NoWait => "NOWAIT",
            HintKind::SkipLocked => "SKIP LOCKED",
        }
    }

    pub fn class(&self) -> HintClass {
        match self {
            HintKind::ForUpdate
            | HintKind::ForNoKeyUpdate
            | HintKind::ForShare
            | HintKind::ForKeyShare => HintClass::LockStrength,
            HintKind::NoWait | HintKind::SkipLocked => HintClass::WaitPolicy,
        }
    }

    /// Kind segment of the tag text, e.g. `FOR-UPDATE`.
    fn tag_slug(&self) -> &'static str {
        match self {
            HintKind::ForUpdate => "FOR-UPDATE",
            HintKind::ForNoKeyUpdate => "FOR-NO-KEY-UPDATE",
            HintKind::ForShare => "FOR-SHARE",
            HintKind::ForKeyShare => "FOR-KEY-SHARE",
            HintKind::NoWait => "NOWAIT",
            HintKind::SkipLocked => "SKIP-LOCKED",
        }
    }
}

impl fmt::Display for HintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HintKind {
    type Err = PgHintError;

    /// Accepts the configuration name (`for_update`) or the clause itself
    /// (`FOR UPDATE`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        HintKind::ALL
            .into_iter()
            .find(|k| {
                k.name() == normalized || k.name().replace('_', "") == normalized.replace('_', "")
            })
            .ok_or_else(|| PgHintError::UnsupportedHintKind(s.to_string()))
    }
}

/// An opaque, process-unique tag value standing for one hint kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Generate a fresh tag for `kind` from a 128-bit random identifier.
    pub(crate) fn generate(kind: HintKind) -> Tag {
        let text = format!(
            "{HINT_TAG_PREFIX}{}-{}",
            kind.tag_slug(),
            Uuid::new_v4().simple()
        );
        Tag(Arc::from(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The header line the annotation mechanism writes for this tag.
    pub fn marker_line(&self) -> String {
        format!("{COMMENT_PREFIX}{}", self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject a new hint that conflicts with hints already on a statement.
///
/// Two hints of the same class conflict unless they are the same kind.
pub fn check_conflict(
    existing: impl IntoIterator<Item = HintKind>,
    new: HintKind,
) -> Result<(), PgHintError> {
    match existing
        .into_iter()
        .find(|k| *k != new && k.class() == new.class())
    {
        Some(other) => Err(PgHintError::InvalidHintCombination(format!(
            "{new} cannot be combined with {other}"
        ))),
        None => Ok(()),
    }
}

/// Order consumed hints into their trailing clauses.
///
/// Clauses are ordered by class (lock strength before wait policy), then by
/// registration order. Duplicates collapse. Conflicting hints and a wait
/// policy without a lock strength are rejected, so the result never repeats
/// or orphans a keyword.
pub fn ordered_clauses(
    mut hints: Vec<&RegisteredHint>,
) -> Result<Vec<&'static str>, PgHintError> {
    hints.sort_by_key(|h| (h.kind.class(), h.position));
    hints.dedup_by_key(|h| h.kind);

    for pair in hints.windows(2) {
        if pair[0].kind.class() == pair[1].kind.class() {
            return Err(PgHintError::InvalidHintCombination(format!(
                "{} cannot be combined with {}",
                pair[1].kind, pair[0].kind
            )));
        }
    }

    if let Some(first) = hints
        .first()
        .filter(|h| h.kind.class() == HintClass::WaitPolicy)
    {
        return Err(PgHintError::InvalidHintCombination(format!(
            "{} requires a row-lock hint",
            first.kind
        )));
    }

    Ok(hints.iter().map(|h| h.kind.clause()).collect())
}

/// Append clauses to a statement body, each after a single line break.
pub fn append_clauses(sql: &mut String, clauses: &[&str]) {
    for clause in clauses {
        sql.push('\n');
        sql.push_str(clause);
    }
}
