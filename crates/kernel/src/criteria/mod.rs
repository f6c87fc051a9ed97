//! Criteria query engine module.
//!
//! This module provides:
//! - Types: the criterion expression tree (field tests, AND/OR joins, category references)
//! - Validation: strict classification of untyped JSON trees into criterion trees
//! - Resolver: expansion of category references with cycle detection
//! - Compiler: SeaQuery predicate generation from expanded trees

mod compile;
mod options;
mod resolve;
pub mod types;

pub use compile::{compile_criterias, field_condition, is_valid_field_name};
pub use options::{OperatorTable, QueryOptions, ValueTemplates};
pub use resolve::{CategorySource, Resolver, MAX_RESOLVE_DEPTH};
pub use types::{validate_criterias, ComparisonOp, Criterion, CriterionValue, JoinOperator};

use thiserror::Error;

/// Errors produced by the criteria engine.
#[derive(Debug, Error)]
pub enum CriteriaError {
    /// The input tree does not match the criterion grammar. Carries no
    /// per-node detail; the whole tree is rejected as one unit.
    #[error("Invalid criterias")]
    Invalid,

    /// A referenced category does not exist.
    #[error("Category not found by field: {0}")]
    CategoryNotFound(String),

    /// A category reference chain revisits a category.
    #[error("cyclic category reference via '{0}'")]
    CyclicReference(String),

    /// Reference expansion exceeded [`MAX_RESOLVE_DEPTH`].
    #[error("criteria nesting exceeds the maximum resolution depth")]
    DepthExceeded,

    /// A field name is not a safe SQL identifier.
    #[error("invalid field name '{0}'")]
    InvalidField(String),

    /// A `field[operator]` query key used an operator outside the closed set.
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// An unexpanded category reference reached the compiler.
    #[error("unresolved category reference '{0}'")]
    Unresolved(String),

    /// The category lookup collaborator failed.
    #[error(transparent)]
    Lookup(#[from] anyhow::Error),
}
