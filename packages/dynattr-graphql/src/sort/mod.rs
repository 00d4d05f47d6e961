//! Structured multi-key sorting.
//!
//! A collection's `sort` argument is a list of `<Type>Sort` entries. Each entry
//! names exactly one sort key through `<Type>SortBy`, a direction and a null
//! placement. Every `SortBy` field is served by a [`SortKeyProducer`] that turns
//! the caller's value into a [`SortSpec`]; the engine then applies the specs in
//! order to a [`QueryBuilder`](crate::query::QueryBuilder).

mod engine;
mod nulls;
mod spec;
mod types;

pub use engine::*;
pub use nulls::*;
pub use spec::*;
pub use types::*;

use crate::coerce::CoercionError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("You must specify exactly one sortBy value")]
    ExactlyOneSortBy,
    #[error("The sortBy value you specify cannot be null")]
    NullSortBy,
    #[error("Unknown sortBy value '{0}'")]
    UnknownSortBy(String),
    #[error("Malformed sort entry: {0}")]
    MalformedEntry(String),
    #[error("Invalid dynamicAttribute match: {0}")]
    InvalidMatch(#[from] CoercionError),
    #[error("Failed to build this sort; internal error.")]
    Internal,
    #[error("Columns {1:?} and {2:?} both sort as {0}")]
    DuplicateSortableField(String, String, String),
}
