//! Logical query representation.
//!
//! # Submodules
//! - `expr`: scalar expressions, values and parameter types
//! - `tree`: the immutable `LogicalQuery` tree and its fluent builder
//! - `tags`: root annotation sets
//! - `shape`: canonical shape encoding used as the plan-cache key

pub mod expr;
pub mod shape;
pub mod tags;
pub mod tree;

pub use expr::{BinaryOp, Expr, SqlType, Value, col, exists, func, lit, param, qcol};
pub use tags::TagSet;
pub use tree::{Join, JoinKind, LogicalQuery, QueryBody, SelectItem, SortExpr, Source};
