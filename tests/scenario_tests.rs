//! End-to-end scenarios for hint propagation and emission.
//!
//! Every scenario runs through a full `StatementPipeline` (render, patch,
//! sink) and, where both apply, through both emission strategies:
//! - `FOR UPDATE` on a simple select
//! - A shared cached plan serving a tagged and an untagged caller
//! - Malformed markers never reaching the sink
//! - Combination rules, subquery scoping and user annotations
//! - Configuration-driven pipelines and the process-wide registry

mod common;

use std::sync::Arc;
use std::thread;

use common::{Pipelines, fresh_registry, simple_select};
use pg_query_hints::{
    HintConfig, HintKind, JoinKind, LogicalQuery, PgHintError, PgHintErrorKind, PlanCache,
    QueryHintExt, RenderBackend, RenderedStatement, Source, SqlEmitter, StatementPipeline,
    StatementSink, Value, col, exists, global, lit, param, qcol,
};

/// Sink that records what reaches the execution layer.
#[derive(Default)]
struct RecordingSink {
    executed: Vec<RenderedStatement>,
}

impl StatementSink for RecordingSink {
    type Output = usize;

    fn send(&mut self, statement: RenderedStatement) -> Result<usize, PgHintError> {
        self.executed.push(statement);
        Ok(self.executed.len())
    }
}

/// Backend that returns fixed text, standing in for a third-party renderer.
struct FixedBackend(String);

impl RenderBackend for FixedBackend {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn render(&self, _query: &LogicalQuery) -> Result<RenderedStatement, PgHintError> {
        Ok(RenderedStatement {
            text: self.0.clone(),
            parameters: Vec::new(),
        })
    }
}

// ── Scenario 1: FOR UPDATE ─────────────────────────────────────────────────

#[test]
fn test_scenario_for_update_simple_select() {
    let p = Pipelines::new(fresh_registry());
    let q = p.tag(&simple_select(), HintKind::ForUpdate);

    let out = p.prepare_both(&q).unwrap();

    assert_eq!(out.text, "SELECT name FROM t WHERE id = 1\nFOR UPDATE");
    assert!(!out.text.contains("PGQH-HINT"));
}

#[test]
fn test_scenario_untagged_is_unchanged() {
    let p = Pipelines::new(fresh_registry());
    let out = p.prepare_both(&simple_select()).unwrap();
    assert_eq!(out.text, "SELECT name FROM t WHERE id = 1");
}

#[test]
fn test_scenario_original_query_untouched_by_tagging() {
    let p = Pipelines::new(fresh_registry());
    let plain = simple_select();
    let _locked = p.tag(&plain, HintKind::ForUpdate);

    assert!(plain.tags().is_empty());
    assert_eq!(
        p.prepare_both(&plain).unwrap().text,
        "SELECT name FROM t WHERE id = 1"
    );
}

// ── Scenario 2: shared cached plan ─────────────────────────────────────────

#[test]
fn test_scenario_cached_plan_two_callers() {
    let registry = fresh_registry();
    let cache = Arc::new(PlanCache::new(64));
    let p = Pipelines::with_plan_cache(Arc::clone(&registry), Arc::clone(&cache));

    // Two structurally identical queries, built independently.
    let caller_a = LogicalQuery::from_table("accounts")
        .select(&["id", "balance"])
        .filter(col("owner").eq(param("alice")));
    let caller_b = LogicalQuery::from_table("accounts")
        .select(&["id", "balance"])
        .filter(col("owner").eq(param("bob")));
    let caller_a = p.tag(&caller_a, HintKind::ForUpdate);

    let a = p.prepare_both(&caller_a).unwrap();
    let b = p.prepare_both(&caller_b).unwrap();

    assert_eq!(
        a.text,
        "SELECT id, balance FROM accounts WHERE owner = $1\nFOR UPDATE"
    );
    assert_eq!(b.text, "SELECT id, balance FROM accounts WHERE owner = $1");
    assert_eq!(a.parameters[0].value, Value::from("alice"));
    assert_eq!(b.parameters[0].value, Value::from("bob"));

    // One compile, every other render served from the cache.
    let stats = cache.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 3);
}

#[test]
fn test_scenario_untagged_after_tagged_from_cache() {
    let registry = fresh_registry();
    let cache = Arc::new(PlanCache::new(64));
    let p = Pipelines::with_plan_cache(Arc::clone(&registry), cache);

    let plain = simple_select();
    let locked = p.tag(&plain, HintKind::ForNoKeyUpdate);

    for _ in 0..3 {
        assert_eq!(
            p.prepare_both(&locked).unwrap().text,
            "SELECT name FROM t WHERE id = 1\nFOR NO KEY UPDATE"
        );
        assert_eq!(
            p.prepare_both(&plain).unwrap().text,
            "SELECT name FROM t WHERE id = 1"
        );
    }
}

#[test]
fn test_scenario_concurrent_renders_of_shared_template() {
    let registry = fresh_registry();
    let cache = Arc::new(PlanCache::new(64));
    let p = Pipelines::with_plan_cache(Arc::clone(&registry), Arc::clone(&cache));

    let plain = simple_select();
    let locked = p.tag(&plain, HintKind::ForUpdate);

    thread::scope(|s| {
        for i in 0..8 {
            let (p, plain, locked) = (&p, &plain, &locked);
            s.spawn(move || {
                for _ in 0..50 {
                    let (q, expected) = if i % 2 == 0 {
                        (locked, "SELECT name FROM t WHERE id = 1\nFOR UPDATE")
                    } else {
                        (plain, "SELECT name FROM t WHERE id = 1")
                    };
                    assert_eq!(p.prepare_both(q).unwrap().text, expected);
                }
            });
        }
    });

    assert_eq!(cache.len(), 1);
    assert_eq!(locked.tags().len(), 1);
}

// ── Scenario 3: malformed markers ──────────────────────────────────────────

#[test]
fn test_scenario_marker_without_line_break_is_not_executed() {
    let registry = fresh_registry();
    let marker = registry.tag_of(HintKind::ForUpdate).unwrap().marker_line();
    let pipeline = StatementPipeline::new(FixedBackend(marker), Arc::clone(&registry));

    let mut sink = RecordingSink::default();
    let err = pipeline.execute(&simple_select(), &mut sink).unwrap_err();

    assert!(matches!(err, PgHintError::MalformedHintMarker(_)));
    assert_eq!(err.kind(), PgHintErrorKind::Internal);
    assert!(err.blocks_execution());
    assert!(sink.executed.is_empty());
}

#[test]
fn test_scenario_foreign_registry_tag_is_rejected() {
    let p = Pipelines::new(fresh_registry());
    let foreign = fresh_registry();
    let q = foreign.tag(&simple_select(), HintKind::ForUpdate).unwrap();

    let err = p.prepare_both(&q).unwrap_err();
    assert!(matches!(err, PgHintError::MalformedHintMarker(_)));
}

#[test]
fn test_scenario_custom_backend_is_patched() {
    let registry = fresh_registry();
    let marker = registry.tag_of(HintKind::ForKeyShare).unwrap().marker_line();
    let backend = FixedBackend(format!("-- nightly\n{marker}\nSELECT 1;"));
    let pipeline = StatementPipeline::new(backend, registry);

    let mut sink = RecordingSink::default();
    let n = pipeline.execute(&simple_select(), &mut sink).unwrap();

    assert_eq!(n, 1);
    assert_eq!(pipeline.backend_name(), "fixed");
    assert_eq!(sink.executed[0].text, "-- nightly\nSELECT 1\nFOR KEY SHARE;");
}

// ── Scenario 4: combination rules ──────────────────────────────────────────

#[test]
fn test_scenario_lock_strength_with_wait_policy() {
    let p = Pipelines::new(fresh_registry());
    let q = p.tag(&simple_select(), HintKind::SkipLocked);
    let q = p.tag(&q, HintKind::ForUpdate);
    assert_eq!(
        p.prepare_both(&q).unwrap().text,
        "SELECT name FROM t WHERE id = 1\nFOR UPDATE\nSKIP LOCKED"
    );
}

#[test]
fn test_scenario_wait_policy_alone_is_rejected() {
    let p = Pipelines::new(fresh_registry());
    let q = p.tag(&simple_select(), HintKind::NoWait);
    let err = p.prepare_both(&q).unwrap_err();
    assert!(matches!(err, PgHintError::InvalidHintCombination(_)));
}

#[test]
fn test_scenario_conflicting_hints_rejected_at_tagging() {
    let p = Pipelines::new(fresh_registry());
    let q = p.tag(&simple_select(), HintKind::ForShare);
    let err = p.registry.tag(&q, HintKind::ForUpdate).unwrap_err();
    assert!(matches!(err, PgHintError::InvalidHintCombination(_)));
    assert_eq!(err.kind(), PgHintErrorKind::User);
}

#[test]
fn test_scenario_tagging_twice_emits_once() {
    let p = Pipelines::new(fresh_registry());
    let q = p.tag(&simple_select(), HintKind::ForUpdate);
    let q = p.tag(&q, HintKind::ForUpdate);
    let text = p.prepare_both(&q).unwrap().text;
    assert_eq!(text.matches("FOR UPDATE").count(), 1);
}

#[test]
fn test_scenario_unregistered_kind_is_unsupported() {
    let registry = Arc::new(pg_query_hints::HintRegistry::new(&[HintKind::ForShare]).unwrap());
    let err = registry
        .tag(&simple_select(), HintKind::ForUpdate)
        .unwrap_err();
    assert!(matches!(err, PgHintError::UnsupportedHintKind(_)));
}

// ── Scenario 5: scoping and annotations ────────────────────────────────────

#[test]
fn test_scenario_subquery_hint_is_not_honored() {
    let p = Pipelines::new(fresh_registry());
    let inner = p.tag(
        &LogicalQuery::from_table("orders").select(&["id", "total"]),
        HintKind::ForUpdate,
    );
    let q = LogicalQuery::from_subquery(inner, "o").filter(col("total").gt(lit(100)));

    let out = p.prepare_both(&q).unwrap();
    assert_eq!(
        out.text,
        "SELECT * FROM (SELECT id, total FROM orders) AS o WHERE total > 100"
    );
}

#[test]
fn test_scenario_outer_hint_with_nested_queries() {
    let p = Pipelines::new(fresh_registry());
    let child = LogicalQuery::from_table("child")
        .select_expr(lit(1))
        .filter(qcol("child", "parent_id").eq(qcol("p", "id")));
    let q = LogicalQuery::from_table("parent")
        .alias("p")
        .join(
            JoinKind::Inner,
            Source::table("owner").aliased("w"),
            qcol("w", "id").eq(qcol("p", "owner_id")),
        )
        .select_expr(qcol("p", "id"))
        .filter(exists(child).not())
        .order_by(qcol("p", "id"), true)
        .limit(10);
    let q = p.tag(&q, HintKind::ForUpdate);

    let out = p.prepare_both(&q).unwrap();
    assert_eq!(
        out.text,
        "SELECT p.id FROM parent AS p INNER JOIN owner AS w ON w.id = p.owner_id \
         WHERE NOT EXISTS (SELECT 1 FROM child WHERE child.parent_id = p.id) \
         ORDER BY p.id LIMIT 10\nFOR UPDATE"
    );
}

#[test]
fn test_scenario_user_comments_survive_both_strategies() {
    let p = Pipelines::terminated(fresh_registry());
    let q = simple_select().with_comment("request: 42").unwrap();
    let q = p.tag(&q, HintKind::ForUpdate);
    let q = q.with_comment("retry: 1").unwrap();

    let out = p.prepare_both(&q).unwrap();
    assert_eq!(
        out.text,
        "-- request: 42\n-- retry: 1\nSELECT name FROM t WHERE id = 1\nFOR UPDATE;"
    );
}

#[test]
fn test_scenario_reserved_comment_prefix_rejected() {
    let err = simple_select()
        .with_comment("ok\nPGQH-HINT-FOR-UPDATE-0000")
        .unwrap_err();
    assert!(matches!(err, PgHintError::InvalidArgument(_)));
}

// ── Scenario 6: configuration and the process-wide registry ───────────────

#[test]
fn test_scenario_config_driven_pipeline() {
    let config = HintConfig::from_toml_str(
        r#"
        strategy = "text_patch"
        hints = ["for_update", "skip_locked"]
        plan_cache_capacity = 8
        statement_terminator = true
        "#,
    )
    .unwrap();
    let registry = Arc::new(config.build_registry().unwrap());
    let pipeline = StatementPipeline::from_config(&config, Arc::clone(&registry)).unwrap();

    let q = registry.tag(&simple_select(), HintKind::ForUpdate).unwrap();
    let q = registry.tag(&q, HintKind::SkipLocked).unwrap();
    assert_eq!(
        pipeline.to_query_string(&q).unwrap(),
        "SELECT name FROM t WHERE id = 1\nFOR UPDATE\nSKIP LOCKED;"
    );
    assert!(matches!(
        registry.tag(&simple_select(), HintKind::ForShare),
        Err(PgHintError::UnsupportedHintKind(_))
    ));
}

#[test]
fn test_scenario_global_registry_extension() {
    let pipeline = StatementPipeline::new(SqlEmitter::tree_aware(global()), global());
    let q = simple_select().for_update().unwrap().skip_locked().unwrap();

    let mut executed: Vec<RenderedStatement> = Vec::new();
    pipeline.execute(&q, &mut executed).unwrap();

    assert_eq!(
        executed[0].text,
        "SELECT name FROM t WHERE id = 1\nFOR UPDATE\nSKIP LOCKED"
    );
}
