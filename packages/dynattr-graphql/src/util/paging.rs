//! `async_graphql::dynamic` extensions for handling pagination.
//! See: https://graphql.org/learn/pagination/
use crate::{
    cursor::{Cursor, CursorError},
    util::ResolverContextExt,
    GraphqlError, GraphqlResult,
};
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, SchemaBuilder, TypeRef,
};
use extension_trait::extension_trait;

pub const FIRST_ARGUMENT: &str = "first";
pub const OFFSET_ARGUMENT: &str = "offset";
pub const AFTER_ARGUMENT: &str = "after";

/// Largest row position Postgres accepts as an `OFFSET`.
pub const MAX_POSITION: u64 = i64::MAX as u64;

/// Resolved value of a `PageInfo` object.
/// See: https://relay.dev/graphql/connections.htm#sec-PageInfo
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// The window of rows a collection field returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paging {
    /// Maximum number of rows in the page.
    pub first: u64,
    /// Position of the first row of the page.
    pub start: u64,
}

impl Paging {
    /// Resolve `first`, `offset` and `after`. An `after` cursor must carry
    /// `prefix`, the cursor prefix of the order in effect.
    pub fn new(
        first: Option<u64>,
        offset: Option<u64>,
        after: Option<&str>,
        prefix: &[String],
        page_size_limit: u64,
    ) -> GraphqlResult<Self> {
        let first = match first {
            Some(first) if first > page_size_limit => {
                return Err(GraphqlError::PageSizeLimitExceeded(first, page_size_limit))
            }
            Some(first) => first,
            None => page_size_limit,
        };
        let after = match after {
            Some(after) => {
                let cursor = Cursor::decode(after)?;
                cursor.check_prefix(prefix)?;
                cursor
                    .position
                    .checked_add(1)
                    .ok_or_else(|| CursorError::Invalid("position out of range".to_string()))?
            }
            None => 0,
        };
        let start = after
            .checked_add(offset.unwrap_or(0))
            .filter(|start| *start <= MAX_POSITION)
            .ok_or(GraphqlError::PageOutOfRange(MAX_POSITION))?;
        Ok(Self { first, start })
    }

    /// `LIMIT` to request; one row more than the page to detect a next page.
    pub fn limit(&self) -> u64 {
        self.first.saturating_add(1).min(MAX_POSITION)
    }

    pub fn offset(&self) -> Option<u64> {
        (self.start > 0).then_some(self.start)
    }
}

#[extension_trait]
pub impl TypeRefPagingExt for TypeRef {
    const PAGE_INFO: &'static str = "PageInfo";
}

#[extension_trait]
pub impl SchemaBuilderPagingExt for SchemaBuilder {
    fn register_paging_types(self) -> Self {
        let page_info_object = Object::new(TypeRef::PAGE_INFO)
            .field(Field::new(
                "hasNextPage",
                TypeRef::named_nn(TypeRef::BOOLEAN),
                |ctx| {
                    FieldFuture::new(async move {
                        let page_info = ctx.parent::<PageInfo>()?;
                        Ok(Some(FieldValue::value(page_info.has_next_page)))
                    })
                },
            ))
            .field(Field::new(
                "hasPreviousPage",
                TypeRef::named_nn(TypeRef::BOOLEAN),
                |ctx| {
                    FieldFuture::new(async move {
                        let page_info = ctx.parent::<PageInfo>()?;
                        Ok(Some(FieldValue::value(page_info.has_previous_page)))
                    })
                },
            ))
            .field(Field::new(
                "startCursor",
                TypeRef::named(TypeRef::STRING),
                |ctx| {
                    FieldFuture::new(async move {
                        let page_info = ctx.parent::<PageInfo>()?;
                        Ok(page_info.start_cursor.clone().map(FieldValue::value))
                    })
                },
            ))
            .field(Field::new(
                "endCursor",
                TypeRef::named(TypeRef::STRING),
                |ctx| {
                    FieldFuture::new(async move {
                        let page_info = ctx.parent::<PageInfo>()?;
                        Ok(page_info.end_cursor.clone().map(FieldValue::value))
                    })
                },
            ));
        self.register(page_info_object)
    }
}

#[extension_trait]
pub impl FieldPagingExt for Field {
    /// Add pagination arguments to a field.
    /// See: https://relay.dev/graphql/connections.htm#sec-Arguments
    fn paging_arguments(self) -> Self {
        self.argument(
            InputValue::new(FIRST_ARGUMENT, TypeRef::named(TypeRef::INT))
                .description("Only read the first `n` values of the set."),
        )
        .argument(
            InputValue::new(OFFSET_ARGUMENT, TypeRef::named(TypeRef::INT)).description(
                "Skip the first `n` values from our `after` cursor, an alternative to cursor based pagination.",
            ),
        )
        .argument(
            InputValue::new(AFTER_ARGUMENT, TypeRef::named(TypeRef::STRING))
                .description("Read all values in the set after (below) this cursor."),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::NATURAL_PREFIX;
    use assert_matches::assert_matches;

    fn natural() -> Vec<String> {
        vec![NATURAL_PREFIX.to_string()]
    }

    #[test]
    fn test_first_defaults_to_limit() {
        let paging = Paging::new(None, None, None, &natural(), 1000).unwrap();
        assert_eq!(paging, Paging { first: 1000, start: 0 });
        assert_eq!(paging.limit(), 1001);
        assert_eq!(paging.offset(), None);
    }

    #[test]
    fn test_first_is_capped() {
        assert_matches!(
            Paging::new(Some(1001), None, None, &natural(), 1000),
            Err(GraphqlError::PageSizeLimitExceeded(1001, 1000))
        );
    }

    #[test]
    fn test_after_and_offset_add_up() {
        let after = Cursor::new(natural(), 4).encode();
        let paging = Paging::new(Some(2), Some(3), Some(&after), &natural(), 1000).unwrap();
        assert_eq!(paging, Paging { first: 2, start: 8 });
        assert_eq!(paging.offset(), Some(8));
    }

    #[test]
    fn test_after_from_another_sort_is_rejected() {
        let after = Cursor::new(vec!["name".to_string()], 4).encode();
        assert_matches!(
            Paging::new(None, None, Some(&after), &natural(), 1000),
            Err(GraphqlError::Cursor(CursorError::PrefixMismatch { .. }))
        );
    }

    #[test]
    fn test_positions_past_the_last_row_are_rejected() {
        let after = Cursor::new(natural(), u64::MAX).encode();
        assert_matches!(
            Paging::new(Some(1), None, Some(&after), &natural(), 1000),
            Err(GraphqlError::Cursor(CursorError::Invalid(_)))
        );

        let after = Cursor::new(natural(), 4).encode();
        assert_matches!(
            Paging::new(Some(1), Some(u64::MAX), Some(&after), &natural(), 1000),
            Err(GraphqlError::PageOutOfRange(MAX_POSITION))
        );
        assert_matches!(
            Paging::new(Some(1), Some(u64::MAX), None, &natural(), 1000),
            Err(GraphqlError::PageOutOfRange(_))
        );

        let paging = Paging::new(Some(1), Some(MAX_POSITION), None, &natural(), 1000).unwrap();
        assert_eq!(paging.offset(), Some(MAX_POSITION));
    }

    #[test]
    fn test_limit_never_overflows() {
        let paging = Paging::new(None, None, None, &natural(), u64::MAX).unwrap();
        assert_eq!(paging.limit(), MAX_POSITION);
    }
}
