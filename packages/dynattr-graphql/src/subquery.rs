//! Correlated scalar subqueries reading one dynamic attribute value.

use crate::{
    coerce::{coerce, CoercionError},
    inflection,
    spec::DynamicAttributeSpec,
};
use async_graphql_value::ConstValue;
use sqlparser::ast::{Ident, Value};
use std::{collections::BTreeMap, fmt};

/// Alias of the side table inside the subquery.
pub const SIDE_ALIAS: &str = "da";

fn quoted(name: &str) -> Ident {
    Ident::with_quote('"', name)
}

/// One key column of a match, with the caller's value and its SQL literal.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchValue {
    pub column: String,
    pub input: ConstValue,
    pub literal: Value,
}

/// Values for the key columns of a dynamic attribute, in key column order.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeMatch {
    pub values: Vec<MatchValue>,
}

impl AttributeMatch {
    /// Read a `<Type>DynamicAttribute` input object.
    ///
    /// Fields are looked up by their GraphQL names; absent fields match `NULL`.
    pub fn from_input(
        spec: &DynamicAttributeSpec,
        input: &ConstValue,
    ) -> Result<Self, CoercionError> {
        let fields = match input {
            ConstValue::Object(fields) => Some(fields),
            _ => None,
        };
        let values = spec
            .key_columns
            .iter()
            .map(|column| {
                let name = inflection::column(column);
                let input = fields
                    .and_then(|fields| fields.get(name.as_str()))
                    .cloned()
                    .unwrap_or(ConstValue::Null);
                let literal = coerce(&input, column)?;
                Ok(MatchValue {
                    column: column.name.clone(),
                    input,
                    literal,
                })
            })
            .collect::<Result<Vec<_>, CoercionError>>()?;
        Ok(Self { values })
    }

    /// Canonical JSON of the match, keyed by column name.
    ///
    /// Object keys are sorted, so equal matches always render identically.
    pub fn canonical_json(&self) -> String {
        let map: BTreeMap<&str, serde_json::Value> = self
            .values
            .iter()
            .map(|v| {
                (
                    v.column.as_str(),
                    v.input.clone().into_json().unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();
        serde_json::to_string(&map).unwrap_or_default()
    }
}

/// `(SELECT da."value" FROM "ns"."side" AS da WHERE (...) AND (...))`
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicAttributeSubquery {
    pub side_namespace: String,
    pub side_name: String,
    pub value_column: String,
    pub owner_alias: String,
    pub owner_column: String,
    pub side_column: String,
    pub keys: Vec<(String, Value)>,
}

impl fmt::Display for DynamicAttributeSubquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut conditions = vec![format!(
            "{}.{} = {SIDE_ALIAS}.{}",
            self.owner_alias,
            quoted(&self.owner_column),
            quoted(&self.side_column)
        )];
        conditions.extend(
            self.keys
                .iter()
                .map(|(column, literal)| format!("{SIDE_ALIAS}.{} = {literal}", quoted(column))),
        );

        write!(
            f,
            "(SELECT {SIDE_ALIAS}.{} FROM {}.{} AS {SIDE_ALIAS} WHERE ({}))",
            quoted(&self.value_column),
            quoted(&self.side_namespace),
            quoted(&self.side_name),
            conditions.join(") AND (")
        )
    }
}

/// Build the subquery reading the attribute identified by `matched` for the
/// owner row aliased `owner_alias`.
pub fn compile(
    spec: &DynamicAttributeSpec,
    owner_alias: &str,
    matched: &AttributeMatch,
) -> DynamicAttributeSubquery {
    DynamicAttributeSubquery {
        side_namespace: spec.side_namespace.clone(),
        side_name: spec.side_name.clone(),
        value_column: spec.value_column.name.clone(),
        owner_alias: owner_alias.to_string(),
        owner_column: spec.correlation.owner_column.name.clone(),
        side_column: spec.correlation.side_column.name.clone(),
        keys: matched
            .values
            .iter()
            .map(|v| (v.column.clone(), v.literal.clone()))
            .collect(),
    }
}
