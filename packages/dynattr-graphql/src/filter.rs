//! Compilation of `<Type>Filter` arguments into `WHERE` predicates.

use crate::{
    coerce::{coerce, CoercionError},
    inflection::{self, DYNAMIC_ATTRIBUTE_FIELD, FILTER_ARGUMENT, MATCH_ARGUMENT},
    query::{Predicate, SqlExpr},
    spec::DynamicAttributeSpec,
    subquery::{compile, AttributeMatch},
};
use async_graphql_value::ConstValue;
use dynattr_database_types::{Column, OmitAction, Table};
use sqlparser::ast::BinaryOperator;
use std::{str::FromStr, sync::Arc};
use strum::{AsRefStr, EnumIter, EnumString};
use thiserror::Error;

pub const AND: &str = "and";
pub const OR: &str = "or";
pub const NOT: &str = "not";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Filters should have at least one predicate")]
    NoPredicates,
    #[error("Unsupported filter operation type: {0:?}")]
    UnsupportedOperation(String),
    #[error("Unrecognized field in {0:?}: {1:?}")]
    UnrecognizedField(String, String),
    #[error("Malformed filter: {0}")]
    Malformed(String),
    #[error(transparent)]
    InvalidOperand(#[from] CoercionError),
}

/// Operators of a `<Scalar>Filter`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum FilterOperator {
    IsNull,
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    In,
}

impl FilterOperator {
    fn binary(&self) -> Option<BinaryOperator> {
        match self {
            FilterOperator::EqualTo => Some(BinaryOperator::Eq),
            FilterOperator::NotEqualTo => Some(BinaryOperator::NotEq),
            FilterOperator::LessThan => Some(BinaryOperator::Lt),
            FilterOperator::LessThanOrEqualTo => Some(BinaryOperator::LtEq),
            FilterOperator::GreaterThan => Some(BinaryOperator::Gt),
            FilterOperator::GreaterThanOrEqualTo => Some(BinaryOperator::GtEq),
            FilterOperator::IsNull | FilterOperator::In => None,
        }
    }
}

/// Whether collections of `table` accept a `filter` argument.
pub fn is_filterable(table: &Table) -> bool {
    table.is_selectable && !table.tags.omits(OmitAction::Filter)
}

/// Columns a `<Type>Filter` may compare; hidden columns are never filterable.
pub fn filterable_columns(table: &Table) -> impl Iterator<Item = &Column> {
    table
        .columns
        .iter()
        .filter(|c| !c.tags.omits(OmitAction::Filter) && !c.tags.omits(OmitAction::Read))
}

fn fields<'a>(
    value: &'a ConstValue,
    type_name: &str,
) -> Result<impl Iterator<Item = (&'a str, &'a ConstValue)>, FilterError> {
    match value {
        ConstValue::Object(fields) => Ok(fields
            .iter()
            .filter(|(_, v)| !matches!(v, ConstValue::Null))
            .map(|(k, v)| (k.as_str(), v))),
        other => Err(FilterError::Malformed(format!(
            "expected a {type_name} object, received {other}"
        ))),
    }
}

fn all_of(mut predicates: Vec<Predicate>) -> Result<Predicate, FilterError> {
    match predicates.len() {
        0 => Err(FilterError::NoPredicates),
        1 => Ok(predicates.remove(0)),
        _ => Ok(Predicate::And(predicates)),
    }
}

/// Apply the operators of a `<Scalar>Filter` to `expr`, whose values are
/// coerced like `column`.
fn operators(expr: &SqlExpr, column: &Column, value: &ConstValue) -> Result<Predicate, FilterError> {
    let mut predicates = vec![];
    for (name, operand) in fields(value, "scalar filter")? {
        let op = FilterOperator::from_str(name)
            .map_err(|_| FilterError::UnsupportedOperation(name.to_string()))?;
        let predicate = match op {
            FilterOperator::IsNull => match operand {
                ConstValue::Boolean(is_null) => Predicate::IsNull {
                    expr: expr.clone(),
                    negated: !is_null,
                },
                other => {
                    return Err(FilterError::Malformed(format!(
                        "isNull expects a boolean, received {other}"
                    )))
                }
            },
            FilterOperator::In => {
                let items = match operand {
                    ConstValue::List(items) => items,
                    other => {
                        return Err(FilterError::Malformed(format!(
                            "in expects a list, received {other}"
                        )))
                    }
                };
                let list = items
                    .iter()
                    .map(|item| coerce(item, column).map(SqlExpr::Value))
                    .collect::<Result<Vec<SqlExpr>, CoercionError>>()?;
                Predicate::In {
                    expr: expr.clone(),
                    list,
                }
            }
            _ => match op.binary() {
                Some(binary) => Predicate::Compare {
                    left: expr.clone(),
                    op: binary,
                    right: SqlExpr::Value(coerce(operand, column)?),
                },
                None => return Err(FilterError::UnsupportedOperation(name.to_string())),
            },
        };
        predicates.push(predicate);
    }
    all_of(predicates)
}

/// Everything needed to compile the `<Type>Filter` of one table.
#[derive(Clone, Debug)]
pub struct TableFilter {
    type_name: String,
    columns: Vec<(String, Column)>,
    dynamic_attribute: Option<Arc<DynamicAttributeSpec>>,
}

impl TableFilter {
    pub fn new(table: &Table, dynamic_attribute: Option<Arc<DynamicAttributeSpec>>) -> Self {
        let columns = filterable_columns(table)
            .map(|c| (inflection::column(c), c.clone()))
            .collect();
        Self {
            type_name: inflection::filter_type(table),
            columns,
            dynamic_attribute,
        }
    }

    /// Compile `value` against the table aliased `alias`.
    pub fn predicate(&self, alias: &str, value: &ConstValue) -> Result<Predicate, FilterError> {
        let mut predicates = vec![];
        for (name, value) in fields(value, &self.type_name)? {
            let predicate = match name {
                AND | OR => {
                    let items = match value {
                        ConstValue::List(items) => items,
                        other => {
                            return Err(FilterError::Malformed(format!(
                                "{name} expects a list, received {other}"
                            )))
                        }
                    };
                    let children = items
                        .iter()
                        .map(|item| self.predicate(alias, item))
                        .collect::<Result<Vec<Predicate>, FilterError>>()?;
                    if children.is_empty() {
                        return Err(FilterError::NoPredicates);
                    }
                    if name == AND {
                        Predicate::And(children)
                    } else {
                        Predicate::Or(children)
                    }
                }
                NOT => Predicate::Not(Box::new(self.predicate(alias, value)?)),
                DYNAMIC_ATTRIBUTE_FIELD => self.dynamic_attribute(alias, value)?,
                _ => {
                    let (_, column) = self
                        .columns
                        .iter()
                        .find(|(field, _)| field == name)
                        .ok_or_else(|| {
                            FilterError::UnrecognizedField(
                                self.type_name.clone(),
                                name.to_string(),
                            )
                        })?;
                    operators(&SqlExpr::column(alias, &column.name), column, value)?
                }
            };
            predicates.push(predicate);
        }
        all_of(predicates)
    }

    fn dynamic_attribute(&self, alias: &str, value: &ConstValue) -> Result<Predicate, FilterError> {
        let spec = self.dynamic_attribute.as_ref().ok_or_else(|| {
            FilterError::UnrecognizedField(
                self.type_name.clone(),
                DYNAMIC_ATTRIBUTE_FIELD.to_string(),
            )
        })?;
        let (matched, filter) = match value {
            ConstValue::Object(fields) => (fields.get(MATCH_ARGUMENT), fields.get(FILTER_ARGUMENT)),
            _ => (None, None),
        };
        let (matched, filter) = match (matched, filter) {
            (Some(matched), Some(filter)) if !matches!(filter, ConstValue::Null) => {
                (matched, filter)
            }
            _ => {
                return Err(FilterError::Malformed(format!(
                    "{DYNAMIC_ATTRIBUTE_FIELD} requires both {MATCH_ARGUMENT} and {FILTER_ARGUMENT}"
                )))
            }
        };

        let matched = AttributeMatch::from_input(spec, matched)?;
        let expr = compile(spec, alias, &matched).into();
        operators(&expr, &spec.value_column, filter)
    }
}
