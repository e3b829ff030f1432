//! Fuzz target for the statement patcher.
//!
//! Feeds arbitrary text, optionally prefixed with a real marker line, and
//! checks that patching never panics and never leaves a registered marker
//! at the head of an accepted statement.

#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use pg_query_hints::hint::MARKER_PREFIX;
use pg_query_hints::{HintKind, HintRegistry, StatementPatcher};

fn patcher() -> &'static (StatementPatcher, String) {
    static PATCHER: OnceLock<(StatementPatcher, String)> = OnceLock::new();
    PATCHER.get_or_init(|| {
        let registry = Arc::new(HintRegistry::with_all_hints());
        let marker = registry
            .tag_of(HintKind::ForUpdate)
            .map(|t| t.marker_line())
            .unwrap_or_default();
        (StatementPatcher::new(registry), marker)
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (patcher, marker) = patcher();

    for input in [text.to_string(), format!("{marker}\n{text}")] {
        if let Ok(out) = patcher.patch(&input) {
            assert!(!out.starts_with(MARKER_PREFIX));
        }
    }
});
