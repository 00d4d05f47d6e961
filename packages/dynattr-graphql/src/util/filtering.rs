//! `async_graphql::dynamic` extensions for handling connection filtering.

use crate::{
    coerce::{scalar_name, CUSTOM_SCALARS},
    filter::{filterable_columns, is_filterable, FilterOperator, AND, NOT, OR},
    inflection::{self, DYNAMIC_ATTRIBUTE_FIELD, FILTER_ARGUMENT, MATCH_ARGUMENT},
};
use async_graphql::dynamic::{Field, InputObject, InputValue, SchemaBuilder, TypeRef};
use dynattr_database_types::Table;
use extension_trait::extension_trait;
use strum::IntoEnumIterator;

#[extension_trait]
pub impl TypeRefFilteringExt for TypeRef {
    fn filter_input(value_name: impl Into<String>) -> String {
        format!("{}Filter", value_name.into())
    }
}

#[extension_trait]
pub impl InputObjectFilteringExt for InputObject {
    /// `<Scalar>Filter`: the comparison operators over one scalar.
    fn new_operator_filter(value_name: impl Into<String>) -> Self {
        let value_name = value_name.into();
        FilterOperator::iter().fold(
            Self::new(TypeRef::filter_input(value_name.clone())).description(format!(
                "A filter to be used against {value_name} fields. All fields are combined with a logical 'and'."
            )),
            |input, op| {
                let type_ref = match op {
                    FilterOperator::IsNull => TypeRef::named(TypeRef::BOOLEAN),
                    FilterOperator::In => TypeRef::named_nn_list(value_name.clone()),
                    _ => TypeRef::named(value_name.clone()),
                };
                input.field(InputValue::new(op.as_ref(), type_ref))
            },
        )
    }

    /// `<Type>Filter` with one field per filterable column.
    fn new_table_filter(table: &Table, has_dynamic_attributes: bool) -> Self {
        let name = inflection::filter_type(table);
        let mut input = Self::new(&name).description(format!(
            "A filter to be used against `{}` object types. All fields are combined with a logical 'and'.",
            inflection::table_type(table)
        ));
        for column in filterable_columns(table) {
            input = input.field(InputValue::new(
                inflection::column(column),
                TypeRef::named(TypeRef::filter_input(scalar_name(column.column_type()))),
            ));
        }
        if has_dynamic_attributes {
            input = input.field(InputValue::new(
                DYNAMIC_ATTRIBUTE_FIELD,
                TypeRef::named(inflection::dynamic_attribute_filter_type(table)),
            ));
        }
        input.filter_combinators()
    }

    fn filter_combinators(self) -> Self {
        let name = self.type_name().to_string();
        self.field(InputValue::new(AND, TypeRef::named_nn_list(name.clone())))
            .field(InputValue::new(OR, TypeRef::named_nn_list(name.clone())))
            .field(InputValue::new(NOT, TypeRef::named(name)))
    }

    /// `<Type>DynamicAttributeFilter`: which attribute, and the operators to
    /// apply to its value.
    fn new_dynamic_attribute_filter(table: &Table, value_name: &str) -> Self {
        Self::new(inflection::dynamic_attribute_filter_type(table))
            .field(InputValue::new(
                MATCH_ARGUMENT,
                TypeRef::named_nn(inflection::dynamic_attribute_type(table)),
            ))
            .field(InputValue::new(
                FILTER_ARGUMENT,
                TypeRef::named_nn(TypeRef::filter_input(value_name)),
            ))
    }
}

#[extension_trait]
pub impl SchemaBuilderFilteringExt for SchemaBuilder {
    fn register_filtering_types(self) -> Self {
        [
            TypeRef::BOOLEAN,
            TypeRef::INT,
            TypeRef::FLOAT,
            TypeRef::STRING,
        ]
        .into_iter()
        .chain(CUSTOM_SCALARS)
        .fold(self, |schema, scalar| {
            schema.register(InputObject::new_operator_filter(scalar))
        })
    }
}

#[extension_trait]
pub impl FieldFilteringExt for Field {
    fn filtering_arguments(self, table: &Table) -> Self {
        if !is_filterable(table) {
            return self;
        }
        self.argument(
            InputValue::new(FILTER_ARGUMENT, TypeRef::named(inflection::filter_type(table)))
                .description(
                    "A filter to be used in determining which values should be returned by the collection.",
                ),
        )
    }
}
