use super::SortError;
use crate::{
    query::SqlExpr,
    spec::DynamicAttributeSpec,
    subquery::{compile, AttributeMatch},
};
use async_graphql_value::ConstValue;
use std::{collections::HashMap, fmt, sync::Arc};

/// Cursor prefix marker of dynamic attribute sort keys.
pub const DYNAMIC_CURSOR_PREFIX: &str = "dynamic|";

/// One expression a sort entry orders by.
#[derive(Clone, Debug, PartialEq)]
pub enum SortExpr {
    /// A column of the sorted table, resolved against its alias.
    Column(String),
    DynamicAttribute {
        spec: Arc<DynamicAttributeSpec>,
        matched: AttributeMatch,
    },
}

impl SortExpr {
    pub fn to_sql(&self, table_alias: &str) -> SqlExpr {
        match self {
            SortExpr::Column(column) => SqlExpr::column(table_alias, column),
            SortExpr::DynamicAttribute { spec, matched } => {
                compile(spec, table_alias, matched).into()
            }
        }
    }
}

/// What a sort key produces: the expressions to order by, the string that
/// identifies this key inside cursors, and whether it orders rows uniquely.
#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
    pub specs: Vec<SortExpr>,
    pub cursor_prefix: String,
    pub unique: Option<bool>,
}

impl SortSpec {
    /// Structural check of a producer's output. A failure here is a bug in the
    /// producer, never in the request.
    pub fn validate(&self, producer: &str) -> Result<(), String> {
        if self.specs.is_empty() {
            return Err(format!(
                "Invalid value returned from {producer}: specs was not provided."
            ));
        }
        if self
            .specs
            .iter()
            .any(|s| matches!(s, SortExpr::Column(column) if column.is_empty()))
        {
            return Err(format!(
                "Invalid value returned from {producer}: the specs do not conform, received: {:?}",
                self.specs
            ));
        }
        Ok(())
    }
}

/// Payload of a `<Type>SortableField` enum value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortableField {
    pub column: String,
    pub unique: bool,
}

/// A decoded `<Type>SortBy` value: exactly one sort key.
#[derive(Clone, Debug, PartialEq)]
pub enum SortBy {
    Field(SortableField),
    DynamicAttribute {
        spec: Arc<DynamicAttributeSpec>,
        matched: AttributeMatch,
    },
}

impl SortBy {
    pub fn sort_spec(&self) -> SortSpec {
        match self {
            SortBy::Field(field) => SortSpec {
                specs: vec![SortExpr::Column(field.column.clone())],
                cursor_prefix: field.column.clone(),
                unique: Some(field.unique),
            },
            SortBy::DynamicAttribute { spec, matched } => SortSpec {
                specs: vec![SortExpr::DynamicAttribute {
                    spec: spec.clone(),
                    matched: matched.clone(),
                }],
                cursor_prefix: format!("{DYNAMIC_CURSOR_PREFIX}{}", matched.canonical_json()),
                unique: Some(false),
            },
        }
    }
}

/// Turns the value of one `<Type>SortBy` field into a sort key.
pub trait SortKeyProducer: fmt::Debug + Send + Sync {
    /// Name of the GraphQL input type the field carries.
    fn type_name(&self) -> &str;

    fn sort_by(&self, value: &ConstValue) -> Result<SortBy, SortError>;
}

/// Serves `field: <Type>SortableField`.
#[derive(Debug)]
pub struct FieldProducer {
    type_name: String,
    fields: HashMap<String, SortableField>,
}

impl FieldProducer {
    pub fn new(type_name: String, fields: HashMap<String, SortableField>) -> Self {
        Self { type_name, fields }
    }
}

impl SortKeyProducer for FieldProducer {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn sort_by(&self, value: &ConstValue) -> Result<SortBy, SortError> {
        let item = match value {
            ConstValue::Enum(name) => name.as_str(),
            ConstValue::String(name) => name.as_str(),
            other => {
                return Err(SortError::MalformedEntry(format!(
                    "expected a {} value, received {other}",
                    self.type_name
                )))
            }
        };
        self.fields
            .get(item)
            .cloned()
            .map(SortBy::Field)
            .ok_or_else(|| SortError::UnknownSortBy(item.to_string()))
    }
}

/// Serves `dynamicAttribute: <Type>DynamicAttribute`.
#[derive(Debug)]
pub struct DynamicAttributeProducer {
    type_name: String,
    spec: Arc<DynamicAttributeSpec>,
}

impl DynamicAttributeProducer {
    pub fn new(type_name: String, spec: Arc<DynamicAttributeSpec>) -> Self {
        Self { type_name, spec }
    }
}

impl SortKeyProducer for DynamicAttributeProducer {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn sort_by(&self, value: &ConstValue) -> Result<SortBy, SortError> {
        let matched = AttributeMatch::from_input(&self.spec, value)?;
        Ok(SortBy::DynamicAttribute {
            spec: self.spec.clone(),
            matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{parse_spec, tests::fixture};
    use async_graphql_value::Name;
    use assert_matches::assert_matches;
    use dynattr_database_types::TagValue;

    fn producer() -> FieldProducer {
        FieldProducer::new(
            "PersonSortableField".to_string(),
            HashMap::from([
                (
                    "ID".to_string(),
                    SortableField {
                        column: "id".to_string(),
                        unique: true,
                    },
                ),
                (
                    "NAME".to_string(),
                    SortableField {
                        column: "name".to_string(),
                        unique: false,
                    },
                ),
            ]),
        )
    }

    #[test]
    fn test_field_sort_spec() {
        let sort_by = producer()
            .sort_by(&ConstValue::Enum(Name::new("ID")))
            .unwrap();
        assert_eq!(
            sort_by.sort_spec(),
            SortSpec {
                specs: vec![SortExpr::Column("id".to_string())],
                cursor_prefix: "id".to_string(),
                unique: Some(true),
            }
        );
        assert_matches!(
            producer().sort_by(&ConstValue::Enum(Name::new("AGE"))),
            Err(SortError::UnknownSortBy(item)) if item == "AGE"
        );
    }

    #[test]
    fn test_dynamic_attribute_sort_spec() {
        let introspection = fixture(Some(TagValue::Text("person_attribute".to_string())));
        let spec = Arc::new(
            parse_spec(&introspection, &introspection.tables[0])
                .unwrap()
                .unwrap(),
        );
        let producer = DynamicAttributeProducer::new("PersonDynamicAttribute".to_string(), spec);
        let value =
            ConstValue::from_json(serde_json::json!({"locale": "en", "key": "height"})).unwrap();
        let sort_spec = producer.sort_by(&value).unwrap().sort_spec();

        assert_eq!(sort_spec.cursor_prefix, r#"dynamic|{"key":"height","locale":"en"}"#);
        assert_eq!(sort_spec.unique, Some(false));
        assert_eq!(
            sort_spec.specs[0].to_sql("__local_0__").to_string(),
            r#"(SELECT da."value" FROM "app"."person_attribute" AS da WHERE (__local_0__."id" = da."person_id") AND (da."key" = 'height') AND (da."locale" = 'en'))"#
        );
    }

    #[test]
    fn test_validate_rejects_empty_specs() {
        let spec = SortSpec {
            specs: vec![],
            cursor_prefix: "x".to_string(),
            unique: None,
        };
        assert!(spec.validate("PersonSortableField").is_err());

        let spec = SortSpec {
            specs: vec![SortExpr::Column(String::new())],
            cursor_prefix: "x".to_string(),
            unique: None,
        };
        assert!(spec.validate("PersonSortableField").is_err());
    }
}
