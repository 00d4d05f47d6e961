//! Parsing of the `@dynamicAttributes` smart tag.
//!
//! ```sql
//! COMMENT ON TABLE app.person IS E'@dynamicAttributes app.person_attribute value person_attribute_pkey';
//! ```
//!
//! The tag names a side table, optionally the column holding the attribute
//! value (default `value`) and optionally the unique constraint identifying an
//! attribute (default: the side table's primary key). The first column of that
//! constraint references the owner's primary key; the remaining columns are the
//! attribute's key.

use dynattr_database_types::{
    tags::DYNAMIC_ATTRIBUTES_TAG, Column, Constraint, Introspection, Table, TableId,
    TagValue,
};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_VALUE_COLUMN: &str = "value";

const MAX_PARAMETERS: usize = 3;

/// Link between the owner's primary key and the side table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Correlation {
    pub owner_column: Column,
    pub side_column: Column,
}

/// A validated `@dynamicAttributes` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicAttributeSpec {
    pub owner: TableId,
    pub side_table: TableId,
    pub side_namespace: String,
    pub side_name: String,
    pub correlation: Correlation,

    /// Remaining constraint columns, in declared order.
    pub key_columns: Vec<Column>,

    pub value_column: Column,
}

/// The specific rule a `@dynamicAttributes` tag breaks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecViolation {
    NotAString,
    Empty,
    MissingPrimaryKey { table: String },
    CompositePrimaryKey { table: String },
    TooManyParameters { trailing: Vec<String> },
    TooManyPeriods { reference: String },
    TableNotFound { reference: String },
    AmbiguousTable { reference: String, candidates: Vec<String> },
    ColumnNotFound { column: String, table: String },
    UnresolvedConstraintColumns {
        table: String,
        constraint: String,
        positions: Vec<i16>,
    },
    MissingUniqueConstraint { table: String, constraint: Option<String> },
    SingleColumnKey { table: String, constraint: Option<String> },
    CorrelationTypeMismatch {
        side_table: String,
        owner: String,
        constraint: Option<String>,
    },
}

fn constraint_label(constraint: &Option<String>) -> String {
    match constraint {
        Some(name) => format!("'{name}' constraint"),
        None => "primary key".to_string(),
    }
}

impl fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecViolation::NotAString => write!(f, "the tag value must be a string"),
            SpecViolation::Empty => write!(f, "the tag value must name a table"),
            SpecViolation::MissingPrimaryKey { table } => {
                write!(f, "{table} needs a primary key")
            }
            SpecViolation::CompositePrimaryKey { table } => {
                write!(f, "{table} must have a single column primary key")
            }
            SpecViolation::TooManyParameters { trailing } => write!(
                f,
                "too many parameters - received trailing '{}'",
                trailing.join("', '")
            ),
            SpecViolation::TooManyPeriods { reference } => write!(
                f,
                "table specification has too many periods - expected 'schema.table' but received '{reference}'"
            ),
            SpecViolation::TableNotFound { reference } => write!(
                f,
                "table specification could not be satisfied - could not find table '{reference}'"
            ),
            SpecViolation::AmbiguousTable {
                reference,
                candidates,
            } => write!(
                f,
                "table specification '{reference}' is ambiguous - it matches {}; qualify it with a schema",
                candidates.join(", ")
            ),
            SpecViolation::ColumnNotFound { column, table } => write!(
                f,
                "table specification could not be satisfied - could not find column '{column}' on {table}"
            ),
            SpecViolation::UnresolvedConstraintColumns {
                table,
                constraint,
                positions,
            } => write!(
                f,
                "constraint '{constraint}' on {table} refers to missing column position(s) {positions:?}"
            ),
            SpecViolation::MissingUniqueConstraint {
                table,
                constraint: Some(name),
            } => write!(f, "{table} does not have a unique constraint named '{name}'"),
            SpecViolation::MissingUniqueConstraint {
                table,
                constraint: None,
            } => write!(f, "{table} does not have a primary key"),
            SpecViolation::SingleColumnKey { table, constraint } => write!(
                f,
                "{table} has only one column in its {}",
                constraint_label(constraint)
            ),
            SpecViolation::CorrelationTypeMismatch {
                side_table,
                owner,
                constraint,
            } => write!(
                f,
                "the first entry in {side_table}'s {} must be a reference to {owner}",
                constraint_label(constraint)
            ),
        }
    }
}

/// A schema build failure caused by an invalid `@dynamicAttributes` tag.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Invalid smart tag value for '@dynamicAttributes' on {entity}; {violation}\n\n{hint}")]
pub struct SpecError {
    pub entity: String,
    pub violation: SpecViolation,
    pub hint: String,
}

impl SpecError {
    fn new(table: &Table, violation: SpecViolation) -> Self {
        let hint = format!(
            "You can declare dynamic attributes with a 'Smart Comment':\n\n  {}",
            table.comment_with_tag(
                DYNAMIC_ATTRIBUTES_TAG,
                "<schema>.<table> [<value column>] [<unique constraint>]"
            )
        );
        Self {
            entity: table.describe(),
            violation,
            hint,
        }
    }
}

fn unquote(part: &str) -> &str {
    let part = part.strip_prefix('"').unwrap_or(part);
    part.strip_suffix('"').unwrap_or(part)
}

fn constraint_columns<'a>(
    table: &'a Table,
    constraint: &Constraint,
) -> Result<Vec<&'a Column>, SpecViolation> {
    table
        .key_columns(constraint)
        .ok_or_else(|| SpecViolation::UnresolvedConstraintColumns {
            table: table.describe(),
            constraint: constraint.name.clone(),
            positions: table.unresolved_key_columns(constraint),
        })
}

fn resolve_side_table<'a>(
    introspection: &'a Introspection,
    reference: &str,
) -> Result<&'a Table, SpecViolation> {
    let parts: Vec<&str> = reference.split('.').map(unquote).collect();
    let candidates: Vec<&Table> = match parts.as_slice() {
        [name] => introspection
            .tables
            .iter()
            .filter(|t| t.name == *name)
            .collect(),
        [namespace, name] => introspection
            .tables
            .iter()
            .filter(|t| t.namespace == *namespace && t.name == *name)
            .collect(),
        _ => {
            return Err(SpecViolation::TooManyPeriods {
                reference: reference.to_string(),
            })
        }
    };

    match candidates.as_slice() {
        [] => Err(SpecViolation::TableNotFound {
            reference: reference.to_string(),
        }),
        [table] => Ok(*table),
        many => Err(SpecViolation::AmbiguousTable {
            reference: reference.to_string(),
            candidates: many.iter().map(|t| t.qualified_name()).collect(),
        }),
    }
}

/// Parse and validate the `@dynamicAttributes` tag of `table`.
///
/// Returns `Ok(None)` when the table carries no tag. Rules are checked in a
/// fixed order and the first violation is reported.
pub fn parse_spec(
    introspection: &Introspection,
    table: &Table,
) -> Result<Option<DynamicAttributeSpec>, SpecError> {
    let tag = match table.tags.get(DYNAMIC_ATTRIBUTES_TAG) {
        None => return Ok(None),
        Some(TagValue::Text(text)) => text.as_str(),
        Some(_) => return Err(SpecError::new(table, SpecViolation::NotAString)),
    };
    let fail = |violation| SpecError::new(table, violation);

    let owner_pk = table.primary_key().ok_or_else(|| {
        fail(SpecViolation::MissingPrimaryKey {
            table: table.name.clone(),
        })
    })?;
    let owner_columns = constraint_columns(table, owner_pk).map_err(fail)?;
    let owner_column = match owner_columns.as_slice() {
        [column] => (*column).clone(),
        _ => {
            return Err(fail(SpecViolation::CompositePrimaryKey {
                table: table.name.clone(),
            }))
        }
    };

    let parts: Vec<&str> = tag.split_whitespace().collect();
    if parts.len() > MAX_PARAMETERS {
        return Err(fail(SpecViolation::TooManyParameters {
            trailing: parts[MAX_PARAMETERS..]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }));
    }
    let reference = *parts.first().ok_or_else(|| fail(SpecViolation::Empty))?;
    let value_column_name = parts.get(1).map(|c| unquote(c)).unwrap_or(DEFAULT_VALUE_COLUMN);
    let constraint_name = parts.get(2).map(|c| c.to_string());

    let side = resolve_side_table(introspection, reference).map_err(fail)?;

    let value_column = side.column(value_column_name).ok_or_else(|| {
        fail(SpecViolation::ColumnNotFound {
            column: value_column_name.to_string(),
            table: side.describe(),
        })
    })?;

    let constraint: &Constraint = match &constraint_name {
        Some(name) => side.unique_constraint(name),
        None => side.primary_key(),
    }
    .ok_or_else(|| {
        fail(SpecViolation::MissingUniqueConstraint {
            table: side.name.clone(),
            constraint: constraint_name.clone(),
        })
    })?;

    let constrained = constraint_columns(side, constraint).map_err(fail)?;
    let (side_column, key_columns) = match constrained.split_first() {
        Some((first, rest)) if !rest.is_empty() => (*first, rest),
        _ => {
            return Err(fail(SpecViolation::SingleColumnKey {
                table: side.describe(),
                constraint: constraint_name,
            }))
        }
    };

    if side_column.type_id != owner_column.type_id {
        return Err(fail(SpecViolation::CorrelationTypeMismatch {
            side_table: side.name.clone(),
            owner: table.name.clone(),
            constraint: constraint_name,
        }));
    }

    Ok(Some(DynamicAttributeSpec {
        owner: table.id,
        side_table: side.id,
        side_namespace: side.namespace.clone(),
        side_name: side.name.clone(),
        correlation: Correlation {
            owner_column,
            side_column: side_column.clone(),
        },
        key_columns: key_columns.iter().map(|c| (*c).clone()).collect(),
        value_column: value_column.clone(),
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use dynattr_database_types::{ConstraintKind, SmartTags, TableKind};
    use pretty_assertions::assert_eq;

    pub(crate) fn column(name: &str, position: i16, type_id: u32) -> Column {
        Column {
            name: name.to_string(),
            position,
            type_id,
            type_modifier: None,
            is_unique: false,
            is_not_null: false,
            tags: SmartTags::default(),
        }
    }

    pub(crate) fn constraint(name: &str, kind: ConstraintKind, key_columns: Vec<i16>) -> Constraint {
        Constraint {
            name: name.to_string(),
            kind,
            key_columns,
        }
    }

    pub(crate) fn table(
        id: u32,
        namespace: &str,
        name: &str,
        columns: Vec<Column>,
        constraints: Vec<Constraint>,
    ) -> Table {
        Table {
            id: TableId(id),
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind: TableKind::Table,
            columns,
            constraints,
            tags: SmartTags::default(),
            is_selectable: true,
        }
    }

    /// `app.person(id int pk, name text)` tagged with `tag`, and
    /// `app.person_attribute(person_id int, locale text, key text, value text, note text)`
    /// with primary key `(person_id, locale, key)`.
    pub(crate) fn fixture(tag: Option<TagValue>) -> Introspection {
        let mut person = table(
            1,
            "app",
            "person",
            vec![column("id", 1, 23), column("name", 2, 25)],
            vec![constraint("person_pkey", ConstraintKind::PrimaryKey, vec![1])],
        );
        if let Some(tag) = tag {
            person.tags = SmartTags::new().with(DYNAMIC_ATTRIBUTES_TAG, tag);
        }
        let attribute = table(
            2,
            "app",
            "person_attribute",
            vec![
                column("person_id", 1, 23),
                column("locale", 2, 25),
                column("key", 3, 25),
                column("value", 4, 25),
                column("note", 5, 25),
            ],
            vec![
                constraint(
                    "person_attribute_pkey",
                    ConstraintKind::PrimaryKey,
                    vec![1, 3, 2],
                ),
                constraint(
                    "person_attribute_key_key",
                    ConstraintKind::Unique,
                    vec![3],
                ),
                constraint(
                    "person_attribute_locale_person_key",
                    ConstraintKind::Unique,
                    vec![2, 1],
                ),
            ],
        );
        Introspection {
            tables: vec![person, attribute],
            procedures: vec![],
        }
    }

    fn text(tag: &str) -> Option<TagValue> {
        Some(TagValue::Text(tag.to_string()))
    }

    fn parse(introspection: &Introspection) -> Result<Option<DynamicAttributeSpec>, SpecError> {
        parse_spec(introspection, &introspection.tables[0])
    }

    fn violation(introspection: &Introspection) -> SpecViolation {
        parse(introspection).unwrap_err().violation
    }

    #[test]
    fn test_untagged_table_has_no_spec() {
        assert_eq!(parse(&fixture(None)), Ok(None));
    }

    #[test]
    fn test_defaults_use_value_column_and_primary_key() {
        let spec = parse(&fixture(text("person_attribute"))).unwrap().unwrap();

        assert_eq!(spec.side_namespace, "app");
        assert_eq!(spec.side_name, "person_attribute");
        assert_eq!(spec.correlation.owner_column.name, "id");
        assert_eq!(spec.correlation.side_column.name, "person_id");
        assert_eq!(spec.value_column.name, "value");
        let keys: Vec<&str> = spec.key_columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(keys, vec!["key", "locale"]);
    }

    #[test]
    fn test_quoted_reference_and_value_column() {
        let spec = parse(&fixture(text(r#""app"."person_attribute" "note""#)))
            .unwrap()
            .unwrap();
        assert_eq!(spec.value_column.name, "note");
    }

    #[test]
    fn test_named_unique_constraint() {
        let spec = parse(&fixture(text(
            "app.person_attribute value person_attribute_pkey",
        )))
        .unwrap()
        .unwrap();
        assert_eq!(spec.key_columns.len(), 2);
    }

    #[test]
    fn test_owner_without_primary_key() {
        let mut introspection = fixture(text("person_attribute"));
        introspection.tables[0].constraints.clear();
        assert_eq!(
            violation(&introspection),
            SpecViolation::MissingPrimaryKey {
                table: "person".to_string()
            }
        );
    }

    #[test]
    fn test_owner_with_composite_primary_key() {
        let mut introspection = fixture(text("person_attribute"));
        introspection.tables[0].constraints[0].key_columns = vec![1, 2];
        assert_matches!(
            violation(&introspection),
            SpecViolation::CompositePrimaryKey { .. }
        );
    }

    #[test]
    fn test_flag_tag_is_rejected() {
        let introspection = fixture(Some(TagValue::Flag(true)));
        assert_eq!(violation(&introspection), SpecViolation::NotAString);
    }

    #[test]
    fn test_too_many_parameters() {
        let introspection = fixture(text("person_attribute value person_attribute_pkey extra more"));
        assert_eq!(
            violation(&introspection),
            SpecViolation::TooManyParameters {
                trailing: vec!["extra".to_string(), "more".to_string()]
            }
        );
    }

    #[test]
    fn test_too_many_periods() {
        let introspection = fixture(text("db.app.person_attribute"));
        assert_matches!(violation(&introspection), SpecViolation::TooManyPeriods { .. });
    }

    #[test]
    fn test_table_not_found() {
        let introspection = fixture(text("other.person_attribute"));
        assert_eq!(
            violation(&introspection),
            SpecViolation::TableNotFound {
                reference: "other.person_attribute".to_string()
            }
        );
    }

    #[test]
    fn test_unqualified_reference_is_ambiguous_across_schemas() {
        let mut introspection = fixture(text("person_attribute"));
        let mut copy = introspection.tables[1].clone();
        copy.id = TableId(3);
        copy.namespace = "archive".to_string();
        introspection.tables.push(copy);

        assert_matches!(
            violation(&introspection),
            SpecViolation::AmbiguousTable { candidates, .. } if candidates.len() == 2
        );
        introspection.tables[0].tags = SmartTags::new().with(
            DYNAMIC_ATTRIBUTES_TAG,
            TagValue::Text("archive.person_attribute".to_string()),
        );
        assert_eq!(parse(&introspection).unwrap().unwrap().side_table, TableId(3));
    }

    #[test]
    fn test_value_column_not_found() {
        let introspection = fixture(text("person_attribute payload"));
        assert_matches!(
            violation(&introspection),
            SpecViolation::ColumnNotFound { column, .. } if column == "payload"
        );
    }

    #[test]
    fn test_missing_constraint() {
        let introspection = fixture(text("person_attribute value no_such_key"));
        assert_eq!(
            violation(&introspection),
            SpecViolation::MissingUniqueConstraint {
                table: "person_attribute".to_string(),
                constraint: Some("no_such_key".to_string())
            }
        );

        let mut introspection = fixture(text("person_attribute"));
        introspection.tables[1]
            .constraints
            .retain(|c| c.kind != ConstraintKind::PrimaryKey);
        assert_eq!(
            violation(&introspection),
            SpecViolation::MissingUniqueConstraint {
                table: "person_attribute".to_string(),
                constraint: None
            }
        );
    }

    #[test]
    fn test_single_column_constraint() {
        let introspection = fixture(text("person_attribute value person_attribute_key_key"));
        assert_matches!(
            violation(&introspection),
            SpecViolation::SingleColumnKey { .. }
        );
    }

    #[test]
    fn test_first_constraint_column_must_match_owner_type() {
        let introspection = fixture(text(
            "person_attribute value person_attribute_locale_person_key",
        ));
        assert_matches!(
            violation(&introspection),
            SpecViolation::CorrelationTypeMismatch { .. }
        );
    }

    #[test]
    fn test_constraint_columns_must_all_exist() {
        let mut introspection = fixture(text("person_attribute"));
        introspection.tables[1].constraints[0].key_columns = vec![9, 1, 3];
        assert_eq!(
            violation(&introspection),
            SpecViolation::UnresolvedConstraintColumns {
                table: introspection.tables[1].describe(),
                constraint: "person_attribute_pkey".to_string(),
                positions: vec![9],
            }
        );
    }

    #[test]
    fn test_error_message_names_table_and_hint() {
        let introspection = fixture(text("missing"));
        let message = parse(&introspection).unwrap_err().to_string();
        assert_eq!(
            message,
            "Invalid smart tag value for '@dynamicAttributes' on table \"app\".\"person\"; \
             table specification could not be satisfied - could not find table 'missing'\n\n\
             You can declare dynamic attributes with a 'Smart Comment':\n\n  \
             COMMENT ON TABLE \"app\".\"person\" IS E'@dynamicAttributes <schema>.<table> [<value column>] [<unique constraint>]';"
        );
    }

    #[test]
    fn test_name_tag_does_not_change_spec() {
        let plain = fixture(text("person_attribute"));
        let mut renamed = plain.clone();
        renamed.tables[0].tags = renamed.tables[0]
            .tags
            .clone()
            .with("name", TagValue::Text("Human".to_string()));

        assert_eq!(parse(&plain), parse(&renamed));
    }
}
