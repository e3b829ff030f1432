//! Configuration for the hint pipeline.
//!
//! Settings are read from TOML. Every key is optional:
//!
//! ```toml
//! strategy = "tree_aware"          # or "text_patch"
//! hints = ["for_update", "skip_locked"]
//! plan_cache_capacity = 256        # 0 disables the plan cache
//! statement_terminator = false
//! log_statements = false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::emit::plan_cache::DEFAULT_PLAN_CACHE_CAPACITY;
use crate::error::PgHintError;
use crate::hint::{HintKind, HintRegistry};

/// How hint clauses reach the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitStrategy {
    /// Hooks consume hint tags while rendering.
    #[default]
    TreeAware,
    /// An opaque renderer writes markers; the patcher rewrites them.
    TextPatch,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HintConfig {
    pub strategy: EmitStrategy,
    /// Hint kinds to register, in registration order.
    pub hints: Vec<HintKind>,
    /// Maximum number of cached plans. `0` disables the cache.
    pub plan_cache_capacity: usize,
    /// Append `;` to every statement.
    pub statement_terminator: bool,
    /// Log every prepared statement at debug level.
    pub log_statements: bool,
}

impl Default for HintConfig {
    fn default() -> Self {
        HintConfig {
            strategy: EmitStrategy::default(),
            hints: HintKind::ALL.to_vec(),
            plan_cache_capacity: DEFAULT_PLAN_CACHE_CAPACITY,
            statement_terminator: false,
            log_statements: false,
        }
    }
}

impl HintConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, PgHintError> {
        let config: HintConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PgHintError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PgHintError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), PgHintError> {
        if self.hints.is_empty() {
            return Err(PgHintError::ConfigError(
                "at least one hint kind must be registered".into(),
            ));
        }
        for (i, kind) in self.hints.iter().enumerate() {
            if self.hints[..i].contains(kind) {
                return Err(PgHintError::ConfigError(format!(
                    "hint kind {kind} listed twice"
                )));
            }
        }
        Ok(())
    }

    /// A registry with the configured hint kinds.
    pub fn build_registry(&self) -> Result<HintRegistry, PgHintError> {
        self.validate()?;
        HintRegistry::new(&self.hints)
    }
}
