//! The `<Type>DynamicAttribute` input, the `dynamicAttribute` row field and
//! the look-ahead that selects requested attributes in the collection query.

use crate::{
    coerce::scalar_name,
    executor::Row,
    inflection::{self, DYNAMIC_ATTRIBUTE_FIELD, MATCH_ARGUMENT},
    query::QueryBuilder,
    spec::DynamicAttributeSpec,
    subquery::{compile, AttributeMatch},
    util::ResolverContextExt,
    GraphqlError, GraphqlResult,
};
use async_graphql::{
    context::SelectionField,
    dynamic::{Field, FieldFuture, FieldValue, InputObject, InputValue, Object, TypeRef},
};
use async_graphql_value::ConstValue;
use dynattr_database_types::Table;
use extension_trait::extension_trait;
use dynattr_lib::utils::sha256_digest;
use std::{collections::HashSet, sync::Arc};

const SELECT_ALIAS_PREFIX: &str = "__dynamic_attribute__";

/// Hex digits of the match digest kept in a select alias.
const SELECT_ALIAS_DIGEST_LEN: usize = 40;

/// Alias under which the collection query selects the attribute `matched`.
///
/// Derived from the match alone, so the row field finds the value no matter
/// where in the selection it was requested.
pub fn select_alias(matched: &AttributeMatch) -> String {
    let digest = sha256_digest(&matched.canonical_json());
    format!(
        "{SELECT_ALIAS_PREFIX}{}",
        &digest[..SELECT_ALIAS_DIGEST_LEN]
    )
}

#[extension_trait]
pub impl InputObjectDynamicAttributeExt for InputObject {
    /// `<Type>DynamicAttribute`: one nullable field per key column.
    fn new_dynamic_attribute(table: &Table, spec: &DynamicAttributeSpec) -> Self {
        spec.key_columns.iter().fold(
            Self::new(inflection::dynamic_attribute_type(table)).description(format!(
                "Identifies one dynamic attribute of a `{}`.",
                inflection::table_type(table)
            )),
            |input, column| {
                input.field(InputValue::new(
                    inflection::column(column),
                    TypeRef::named(scalar_name(column.column_type())),
                ))
            },
        )
    }
}

#[extension_trait]
pub impl ObjectDynamicAttributeExt for Object {
    /// Add `dynamicAttribute(match: <Type>DynamicAttribute!)` to a row type.
    fn dynamic_attribute_field(self, table: &Table, spec: Arc<DynamicAttributeSpec>) -> Self {
        let value_type = scalar_name(spec.value_column.column_type());
        let field = Field::new(DYNAMIC_ATTRIBUTE_FIELD, TypeRef::named(value_type), move |ctx| {
            let spec = spec.clone();
            FieldFuture::new(async move {
                let row = ctx.parent::<Row>()?;
                let input = ctx
                    .get_arg_value(MATCH_ARGUMENT)?
                    .unwrap_or(ConstValue::Null);
                let matched = AttributeMatch::from_input(&spec, &input)?;
                let value = match row.get(&select_alias(&matched)) {
                    None | Some(serde_json::Value::Null) => None,
                    Some(value) => Some(ConstValue::from_json(value.clone())?),
                };
                Ok(value.map(FieldValue::value))
            })
        });
        self.field(field.argument(InputValue::new(
            MATCH_ARGUMENT,
            TypeRef::named_nn(inflection::dynamic_attribute_type(table)),
        )))
    }
}

fn row_selections<'a>(field: SelectionField<'a>) -> Vec<SelectionField<'a>> {
    let mut rows = vec![];
    for child in field.selection_set() {
        match child.name() {
            "nodes" => rows.push(child),
            "edges" => rows.extend(child.selection_set().filter(|f| f.name() == "node")),
            _ => {}
        }
    }
    rows
}

/// Select every dynamic attribute requested through `nodes` or `edges.node`
/// of the connection field `field`.
pub fn select_requested(
    spec: &DynamicAttributeSpec,
    query: &mut dyn QueryBuilder,
    field: SelectionField<'_>,
) -> GraphqlResult<()> {
    let mut selected = HashSet::new();
    for row in row_selections(field) {
        for requested in row
            .selection_set()
            .filter(|f| f.name() == DYNAMIC_ATTRIBUTE_FIELD)
        {
            let arguments = requested
                .arguments()
                .map_err(|e| GraphqlError::QueryError(e.message))?;
            let input = arguments
                .into_iter()
                .find(|(name, _)| name.as_str() == MATCH_ARGUMENT)
                .map(|(_, value)| value)
                .unwrap_or(ConstValue::Null);
            let matched = AttributeMatch::from_input(spec, &input)?;
            let alias = select_alias(&matched);
            if selected.insert(alias.clone()) {
                let subquery = compile(spec, query.table_alias(), &matched);
                query.select(subquery.into(), alias);
            }
        }
    }
    Ok(())
}
