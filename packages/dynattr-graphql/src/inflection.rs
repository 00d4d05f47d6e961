//! Naming of every generated GraphQL type and field.
//!
//! Names depend only on introspected metadata, so two builds over the same
//! database agree on all of them.

use convert_case::{Case, Casing};
use dynattr_database_types::{tags::NAME_TAG, Column, Procedure, Table};

pub const DYNAMIC_ATTRIBUTE_FIELD: &str = "dynamicAttribute";
pub const SORT_NULLS: &str = "SortNulls";
pub const SORT_ARGUMENT: &str = "sort";
pub const FILTER_ARGUMENT: &str = "filter";
pub const MATCH_ARGUMENT: &str = "match";

/// The GraphQL object type of a table's rows.
pub fn table_type(table: &Table) -> String {
    match table.tags.text(NAME_TAG) {
        Some(name) => name.to_string(),
        None => table.name.to_case(Case::Pascal),
    }
}

/// Field name of a column, on row types and inputs alike.
pub fn column(column: &Column) -> String {
    match column.tags.text(NAME_TAG) {
        Some(name) => name.to_string(),
        None => column.name.to_case(Case::Camel),
    }
}

/// Enum value naming a sortable column.
pub fn sortable_field(column: &Column) -> String {
    column.name.to_case(Case::UpperSnake)
}

pub fn sortable_field_type(table: &Table) -> String {
    format!("{}SortableField", table_type(table))
}

pub fn sort_by_type(table: &Table) -> String {
    format!("{}SortBy", table_type(table))
}

pub fn sort_type(table: &Table) -> String {
    format!("{}Sort", table_type(table))
}

pub fn dynamic_attribute_type(table: &Table) -> String {
    format!("{}DynamicAttribute", table_type(table))
}

pub fn dynamic_attribute_filter_type(table: &Table) -> String {
    format!("{}DynamicAttributeFilter", table_type(table))
}

pub fn filter_type(table: &Table) -> String {
    format!("{}Filter", table_type(table))
}

/// Root query field listing every row of a table.
pub fn all_rows(table: &Table) -> String {
    format!("all{}", table.name.to_case(Case::Pascal))
}

/// Root query field of a set-returning procedure.
pub fn procedure(procedure: &Procedure) -> String {
    match procedure.tags.text(NAME_TAG) {
        Some(name) => name.to_string(),
        None => procedure.name.to_case(Case::Camel),
    }
}

pub fn procedure_argument(name: &str) -> String {
    name.to_case(Case::Camel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynattr_database_types::{SmartTags, TableId, TableKind, TagValue};

    fn table(name: &str, tags: SmartTags) -> Table {
        Table {
            id: TableId(1),
            namespace: "app".to_string(),
            name: name.to_string(),
            kind: TableKind::Table,
            columns: vec![],
            constraints: vec![],
            tags,
            is_selectable: true,
        }
    }

    fn column_named(name: &str) -> Column {
        Column {
            name: name.to_string(),
            position: 1,
            type_id: 25,
            type_modifier: None,
            is_unique: false,
            is_not_null: false,
            tags: SmartTags::default(),
        }
    }

    #[test]
    fn test_table_names() {
        let t = table("user_account", SmartTags::default());
        assert_eq!(table_type(&t), "UserAccount");
        assert_eq!(sortable_field_type(&t), "UserAccountSortableField");
        assert_eq!(sort_by_type(&t), "UserAccountSortBy");
        assert_eq!(sort_type(&t), "UserAccountSort");
        assert_eq!(dynamic_attribute_type(&t), "UserAccountDynamicAttribute");
        assert_eq!(all_rows(&t), "allUserAccount");
    }

    #[test]
    fn test_name_tag_renames_type_but_not_collection() {
        let t = table(
            "user_account",
            SmartTags::new().with(NAME_TAG, TagValue::Text("Member".to_string())),
        );
        assert_eq!(table_type(&t), "Member");
        assert_eq!(sort_type(&t), "MemberSort");
        assert_eq!(all_rows(&t), "allUserAccount");
    }

    #[test]
    fn test_column_names() {
        let c = column_named("created_at");
        assert_eq!(column(&c), "createdAt");
        assert_eq!(sortable_field(&c), "CREATED_AT");
    }
}
