//! `async_graphql::dynamic` extensions for handling GraphQL edges.
//! See: https://graphql.org/learn/pagination/#pagination-and-edges
//! See: https://relay.dev/graphql/connections.htm#sec-Edge-Types.Fields

use crate::{executor::Row, util::ResolverContextExt};
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use extension_trait::extension_trait;

/// Resolved value of a `<Type>Edge` object.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub cursor: String,
    pub node: Row,
}

#[extension_trait]
pub impl TypeRefEdgeExt for TypeRef {
    fn edge(node_name: impl Into<String>) -> String {
        format!("{}Edge", node_name.into())
    }
}

#[extension_trait]
pub impl ObjectEdgeExt for Object {
    fn new_edge(node_name: impl Into<String>) -> Self {
        let node_name = node_name.into();
        Self::new(TypeRef::edge(node_name.clone()))
            .description(format!("A `{node_name}` edge in the connection."))
            .field(Field::new(
                "cursor",
                TypeRef::named_nn(TypeRef::STRING),
                |ctx| {
                    FieldFuture::new(async move {
                        let edge = ctx.parent::<Edge>()?;
                        Ok(Some(FieldValue::value(edge.cursor.clone())))
                    })
                },
            ))
            .field(Field::new("node", TypeRef::named_nn(node_name), |ctx| {
                FieldFuture::new(async move {
                    let edge = ctx.parent::<Edge>()?;
                    Ok(Some(FieldValue::owned_any(edge.node.clone())))
                })
            }))
    }
}
