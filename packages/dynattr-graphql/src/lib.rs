pub mod coerce;
pub mod context;
pub mod cursor;
pub mod dynamic_attribute;
pub mod executor;
pub mod filter;
pub mod inflection;
pub mod query;
pub mod schema;
pub mod sort;
pub mod spec;
pub mod subquery;
pub mod util;

use thiserror::Error;
pub type GraphqlResult<T> = Result<T, GraphqlError>;

#[derive(Debug, Error)]
pub enum GraphqlError {
    #[error(transparent)]
    Spec(#[from] spec::SpecError),
    #[error(transparent)]
    Sort(#[from] sort::SortError),
    #[error(transparent)]
    Filter(#[from] filter::FilterError),
    #[error(transparent)]
    Coercion(#[from] coerce::CoercionError),
    #[error(transparent)]
    Cursor(#[from] cursor::CursorError),
    #[error(transparent)]
    ResolverContext(#[from] util::ResolverContextError),
    #[error("Error building dynamic schema: {0:?}")]
    DynamicSchemaBuildError(#[from] async_graphql::dynamic::SchemaError),
    #[error("Could not parse introspection result: {0:?}")]
    IntrospectionError(#[from] serde_json::Error),
    #[error("Unrecognized table: {0:?}")]
    UnrecognizedTable(String),
    #[error("Requested {0} rows; at most {1} may be requested at once")]
    PageSizeLimitExceeded(u64, u64),
    #[error("Requested page starts beyond row {0}")]
    PageOutOfRange(u64),
    #[error("{0:?}")]
    QueryError(String),
}
