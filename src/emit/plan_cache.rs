//! Shared cache of compiled statement bodies.
//!
//! Plans are keyed by the xxHash3 digest of a body's canonical shape
//! encoding, which excludes tags and parameter values. A [`CompiledPlan`]
//! therefore never contains a tag header or a hint clause, and one plan
//! serves tagged and untagged invocations alike. The full encoding is kept
//! in the plan so a digest collision is detected instead of served.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, trace};

use crate::emit::writer::SqlWriter;
use crate::hash::{format_shape_key, shape_key};
use crate::query::expr::SqlType;
use crate::query::shape;
use crate::query::tree::QueryBody;

/// Default maximum number of cached plans.
pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 256;

/// Rendering-ready body text with `$n` placeholders.
#[derive(Debug)]
pub struct CompiledPlan {
    pub shape_key: u64,
    shape: Box<[u8]>,
    pub body_sql: String,
    /// Types of the placeholders, in order.
    pub param_types: Vec<SqlType>,
}

impl CompiledPlan {
    /// Compile `body` from scratch.
    pub fn compile(body: &QueryBody) -> CompiledPlan {
        let shape = shape::encode(body);
        Self::compile_with_shape(body, shape)
    }

    fn compile_with_shape(body: &QueryBody, shape: Vec<u8>) -> CompiledPlan {
        let (body_sql, params) = SqlWriter::render(body);
        CompiledPlan {
            shape_key: shape_key(&shape),
            shape: shape.into_boxed_slice(),
            body_sql,
            param_types: params.into_iter().map(|p| p.sql_type).collect(),
        }
    }

    fn matches(&self, shape: &[u8]) -> bool {
        *self.shape == *shape
    }
}

/// Counters reported by [`PlanCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Thread-safe plan cache. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct PlanCache {
    plans: RwLock<HashMap<u64, Arc<CompiledPlan>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_CACHE_CAPACITY)
    }
}

impl PlanCache {
    /// A cache holding at most `capacity` plans. With a capacity of zero
    /// every lookup compiles and nothing is stored.
    pub fn new(capacity: usize) -> Self {
        PlanCache {
            plans: RwLock::new(HashMap::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The plan for `body`, compiling and storing it on a miss.
    pub fn get_or_compile(&self, body: &QueryBody) -> Arc<CompiledPlan> {
        let shape = shape::encode(body);
        let key = shape_key(&shape);

        let cached = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .filter(|plan| plan.matches(&shape))
            .cloned();

        if let Some(plan) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(shape_key = %format_shape_key(key), "pg_query_hints: plan cache hit");
            return plan;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let plan = Arc::new(CompiledPlan::compile_with_shape(body, shape));
        debug!(
            shape_key = %format_shape_key(key),
            params = plan.param_types.len(),
            "pg_query_hints: plan cache miss, compiled body"
        );

        if self.capacity == 0 {
            return plan;
        }

        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        if plans.len() >= self.capacity && !plans.contains_key(&key) {
            debug!(
                evicted = plans.len(),
                "pg_query_hints: plan cache full, clearing"
            );
            plans.clear();
        }
        // A concurrent miss may have stored the same plan already; either
        // copy renders identically.
        plans.insert(key, Arc::clone(&plan));
        plan
    }

    pub fn len(&self) -> usize {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn stats(&self) -> PlanCacheStats {
        PlanCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}
