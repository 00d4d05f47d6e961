//! `async_graphql::dynamic` extensions for handling structured sorts.

use crate::{inflection, sort::SortNullsType};
use async_graphql::dynamic::{Field, InputObject, InputValue, SchemaBuilder, TypeRef};
use dynattr_database_types::Table;
use extension_trait::extension_trait;

#[extension_trait]
pub impl InputObjectSortingExt for InputObject {
    /// `<Type>SortBy`; fields are added per sort key.
    fn new_sort_by(table: &Table) -> Self {
        Self::new(inflection::sort_by_type(table)).description(
            "The specifier of what we should sort by. Exactly one of these values must be specified and non-null.",
        )
    }

    /// `<Type>Sort`: what to sort by, in which direction, and where nulls go.
    fn new_sort(table: &Table, nulls: &SortNullsType) -> Self {
        Self::new(inflection::sort_type(table))
            .description(format!(
                "Specifies a sort for the `{}` type - what should we sort by, should it be ascending or descending, and how should we handle nulls?",
                inflection::table_type(table)
            ))
            .field(InputValue::new(
                "sortBy",
                TypeRef::named_nn(inflection::sort_by_type(table)),
            ))
            .field(
                InputValue::new("ascending", TypeRef::named_nn(TypeRef::BOOLEAN))
                    .default_value(true),
            )
            .field(
                InputValue::new("nulls", TypeRef::named_nn(nulls.name()))
                    .default_value(nulls.default_value()),
            )
    }
}

#[extension_trait]
pub impl SchemaBuilderSortingExt for SchemaBuilder {
    fn register_sorting_types(self, nulls: &SortNullsType) -> Self {
        self.register(nulls.definition())
    }
}

#[extension_trait]
pub impl FieldSortingExt for Field {
    /// Add the `sort` argument to a collection field.
    fn sorting_arguments(self, table: &Table) -> Self {
        self.argument(
            InputValue::new(
                inflection::SORT_ARGUMENT,
                TypeRef::named_nn_list(inflection::sort_type(table)),
            )
            .description(format!(
                "The specification of how the `{}` records should be sorted.",
                inflection::table_type(table)
            )),
        )
    }
}
