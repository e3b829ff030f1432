//! Text-level hint patching.
//!
//! An opaque backend renders hint tags as ordinary header comments:
//!
//! ```text
//! -- PGQH-HINT-FOR-UPDATE-<uuid>
//! SELECT name FROM t WHERE id = 1
//! ```
//!
//! [`StatementPatcher`] runs on every statement before execution. It removes
//! each marker line from the leading comment header and appends the hint's
//! clause at the end of the body, producing the same text the tree-aware
//! emitter would have produced.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::emit::RenderedStatement;
use crate::error::PgHintError;
use crate::hint::{
    COMMENT_PREFIX, HintRegistry, MARKER_PREFIX, RegisteredHint, append_clauses, ordered_clauses,
};

/// Start of any SQL line comment.
const LINE_COMMENT: &str = "--";

#[derive(Debug, Clone)]
pub struct StatementPatcher {
    registry: Arc<HintRegistry>,
}

impl StatementPatcher {
    pub fn new(registry: Arc<HintRegistry>) -> Self {
        StatementPatcher { registry }
    }

    pub fn registry(&self) -> &Arc<HintRegistry> {
        &self.registry
    }

    /// Patch `text`, borrowing it unchanged when it carries no marker.
    ///
    /// Fails with `MalformedHintMarker` when a marker is not followed by a
    /// line break, names a tag this registry did not generate, or is not
    /// followed by a statement body.
    pub fn patch<'a>(&self, text: &'a str) -> Result<Cow<'a, str>, PgHintError> {
        let Some(first) = first_marker(text) else {
            return Ok(Cow::Borrowed(text));
        };

        // User comment lines above the first marker are copied as one slice.
        let mut out = String::with_capacity(text.len());
        out.push_str(&text[..first]);
        let mut hints: Vec<&RegisteredHint> = Vec::new();
        let mut rest = &text[first..];

        while rest.starts_with(LINE_COMMENT) {
            let Some(eol) = rest.find('\n') else {
                if rest.starts_with(MARKER_PREFIX) {
                    warn!("pg_query_hints: hint marker without line break");
                    return Err(PgHintError::MalformedHintMarker(
                        "marker is not followed by a line break".into(),
                    ));
                }
                break;
            };
            let line = &rest[..eol];
            let line = line.strip_suffix('\r').unwrap_or(line);

            if line.starts_with(MARKER_PREFIX) {
                let tag = &line[COMMENT_PREFIX.len()..];
                let Some(hint) = self.registry.resolve(tag) else {
                    warn!(tag, "pg_query_hints: unregistered hint marker");
                    return Err(PgHintError::MalformedHintMarker(format!(
                        "unregistered hint tag {tag}"
                    )));
                };
                hints.push(hint);
            } else {
                out.push_str(&rest[..=eol]);
            }
            rest = &rest[eol + 1..];
        }

        let body = rest.trim_end();
        let (body, terminated) = match body.strip_suffix(';') {
            Some(stripped) => (stripped.trim_end(), true),
            None => (body, false),
        };
        if !has_statement(body) {
            warn!("pg_query_hints: hint marker without statement body");
            return Err(PgHintError::MalformedHintMarker(
                "marker is not followed by a statement".into(),
            ));
        }

        let clauses = ordered_clauses(hints)?;
        out.push_str(body);
        append_clauses(&mut out, &clauses);
        if terminated {
            out.push(';');
        }

        debug!(clauses = ?clauses, "pg_query_hints: statement patched");
        Ok(Cow::Owned(out))
    }

    /// Patch a rendered statement's text, keeping its parameters.
    pub fn patch_statement(
        &self,
        statement: RenderedStatement,
    ) -> Result<RenderedStatement, PgHintError> {
        let patched = match self.patch(&statement.text)? {
            Cow::Borrowed(_) => None,
            Cow::Owned(text) => Some(text),
        };
        Ok(match patched {
            Some(text) => RenderedStatement { text, ..statement },
            None => statement,
        })
    }
}

/// Byte offset of the first marker line in the leading comment header.
fn first_marker(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut rest = text;
    while rest.starts_with(LINE_COMMENT) {
        if rest.starts_with(MARKER_PREFIX) {
            return Some(offset);
        }
        let eol = rest.find('\n')?;
        offset += eol + 1;
        rest = &rest[eol + 1..];
    }
    None
}

/// Whether `body` has at least one line that is neither blank nor a comment.
fn has_statement(body: &str) -> bool {
    body.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with(LINE_COMMENT)
    })
}
