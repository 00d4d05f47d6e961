//! `async_graphql::dynamic` extensions for handling GraphQL connections.
//! See: https://graphql.org/learn/pagination/#end-of-list-counts-and-connections
//! See: https://relay.dev/graphql/connections.htm#sec-Connection-Types

pub use super::{edge::*, paging::*};
use crate::{cursor::Cursor, executor::Row, util::ResolverContextExt};
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use extension_trait::extension_trait;

/// Resolved value of a `<Type>Connection` object: one page of rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

impl Connection {
    /// Build the page from rows fetched with `paging.limit()`.
    pub fn new(mut rows: Vec<Row>, paging: &Paging, prefix: &[String]) -> Self {
        let has_next_page = rows.len() as u64 > paging.first;
        rows.truncate(paging.first as usize);

        let edges = rows
            .into_iter()
            .zip(paging.start..)
            .map(|(node, position)| Edge {
                cursor: Cursor::new(prefix.to_vec(), position).encode(),
                node,
            })
            .collect::<Vec<Edge>>();
        let page_info = PageInfo {
            has_next_page,
            has_previous_page: paging.start > 0,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        Self { edges, page_info }
    }
}

#[extension_trait]
pub impl TypeRefConnectionExt for TypeRef {
    fn connection(node_name: impl Into<String>) -> String {
        format!("{}Connection", node_name.into())
    }
}

#[extension_trait]
pub impl ObjectConnectionExt for Object {
    fn new_connection(node_name: impl Into<String>) -> Self {
        let node_name = node_name.into();
        Self::new(TypeRef::connection(node_name.clone()))
            .description(format!("A connection to a list of `{node_name}` values."))
            .field(Field::new(
                "nodes",
                TypeRef::named_nn_list_nn(node_name.clone()),
                |ctx| {
                    FieldFuture::new(async move {
                        let connection = ctx.parent::<Connection>()?;
                        Ok(Some(FieldValue::list(
                            connection
                                .edges
                                .iter()
                                .map(|e| FieldValue::owned_any(e.node.clone())),
                        )))
                    })
                },
            ))
            .field(Field::new(
                "edges",
                TypeRef::named_nn_list_nn(TypeRef::edge(node_name)),
                |ctx| {
                    FieldFuture::new(async move {
                        let connection = ctx.parent::<Connection>()?;
                        Ok(Some(FieldValue::list(
                            connection
                                .edges
                                .iter()
                                .map(|e| FieldValue::owned_any(e.clone())),
                        )))
                    })
                },
            ))
            .field(Field::new(
                "pageInfo",
                TypeRef::named_nn(TypeRef::PAGE_INFO),
                |ctx| {
                    FieldFuture::new(async move {
                        let connection = ctx.parent::<Connection>()?;
                        Ok(Some(FieldValue::owned_any(connection.page_info.clone())))
                    })
                },
            ))
    }
}
