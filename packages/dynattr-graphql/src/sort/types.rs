use super::{
    DynamicAttributeProducer, FieldProducer, SortError, SortKeyProducer, SortNullsType,
    SortableField,
};
use crate::{
    inflection::{self, DYNAMIC_ATTRIBUTE_FIELD},
    spec::DynamicAttributeSpec,
    util::InputObjectSortingExt,
};
use async_graphql::dynamic::{Enum, EnumItem, InputObject, InputValue, TypeRef};
use dynattr_database_types::{OmitAction, Table};
use std::{collections::HashMap, sync::Arc};

pub const FIELD_SORT_KEY: &str = "field";

/// The producers behind the fields of one `<Type>SortBy` input.
#[derive(Debug)]
pub struct TableSortKeys {
    pub sort_by_type: String,
    producers: Vec<(String, Box<dyn SortKeyProducer>)>,
}

impl TableSortKeys {
    pub fn new(sort_by_type: String) -> Self {
        Self {
            sort_by_type,
            producers: vec![],
        }
    }

    pub fn with(mut self, field: impl Into<String>, producer: Box<dyn SortKeyProducer>) -> Self {
        self.producers.push((field.into(), producer));
        self
    }

    pub fn producer(&self, field: &str) -> Option<&dyn SortKeyProducer> {
        self.producers
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, producer)| producer.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

/// GraphQL types and producers making one table sortable.
pub struct TableSortTypes {
    pub sortable_field: Option<Enum>,
    pub sort_by: InputObject,
    pub sort: InputObject,
    pub keys: Arc<TableSortKeys>,
}

/// Whether collections of `table` accept a `sort` argument.
pub fn is_sortable(table: &Table) -> bool {
    table.is_selectable && !table.tags.omits(OmitAction::Order)
}

/// Build the sort types of `table`.
///
/// Returns `None` when the table is not sortable or has nothing to sort by,
/// and an error when two columns inflect to the same sortable field.
/// The `dynamicAttribute` key requires `<Type>DynamicAttribute` to be
/// registered separately.
pub fn build_table_sort(
    table: &Table,
    spec: Option<Arc<DynamicAttributeSpec>>,
    nulls: &SortNullsType,
) -> Result<Option<TableSortTypes>, SortError> {
    if !is_sortable(table) {
        return Ok(None);
    }

    let mut sort_by = InputObject::new_sort_by(table);
    let mut keys = TableSortKeys::new(inflection::sort_by_type(table));

    let field_type = inflection::sortable_field_type(table);
    let mut sortable_field = Enum::new(&field_type).description(format!(
        "Sortable concrete fields for the `{}` type.",
        inflection::table_type(table)
    ));
    let mut fields: HashMap<String, SortableField> = HashMap::new();
    for column in table
        .columns
        .iter()
        .filter(|c| !c.tags.omits(OmitAction::Order) && !c.tags.omits(OmitAction::Read))
    {
        let item = inflection::sortable_field(column);
        if let Some(taken) = fields.get(&item) {
            return Err(SortError::DuplicateSortableField(
                item,
                taken.column.clone(),
                column.name.clone(),
            ));
        }
        sortable_field = sortable_field.item(EnumItem::new(&item));
        fields.insert(
            item,
            SortableField {
                column: column.name.clone(),
                unique: table.is_column_unique(column),
            },
        );
    }

    let sortable_field = if fields.is_empty() {
        None
    } else {
        sort_by = sort_by.field(InputValue::new(
            FIELD_SORT_KEY,
            TypeRef::named(&field_type),
        ));
        keys = keys.with(
            FIELD_SORT_KEY,
            Box::new(FieldProducer::new(field_type, fields)),
        );
        Some(sortable_field)
    };

    if let Some(spec) = spec {
        let type_name = inflection::dynamic_attribute_type(table);
        sort_by = sort_by.field(InputValue::new(
            DYNAMIC_ATTRIBUTE_FIELD,
            TypeRef::named(&type_name),
        ));
        keys = keys.with(
            DYNAMIC_ATTRIBUTE_FIELD,
            Box::new(DynamicAttributeProducer::new(type_name, spec)),
        );
    }

    if keys.is_empty() {
        return Ok(None);
    }

    Ok(Some(TableSortTypes {
        sortable_field,
        sort_by,
        sort: InputObject::new_sort(table, nulls),
        keys: Arc::new(keys),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{parse_spec, tests::fixture};
    use async_graphql_value::{ConstValue, Name};
    use dynattr_database_types::{tags::OMIT_TAG, SmartTags, TagValue};

    #[test]
    fn test_sort_keys_follow_columns_and_spec() {
        let introspection = fixture(Some(TagValue::Text("person_attribute".to_string())));
        let person = &introspection.tables[0];
        let spec = parse_spec(&introspection, person).unwrap().map(Arc::new);
        let types = build_table_sort(person, spec, &SortNullsType::default())
            .unwrap()
            .unwrap();

        assert!(types.sortable_field.is_some());
        assert_eq!(types.keys.sort_by_type, "PersonSortBy");
        assert_eq!(
            types.keys.producer(FIELD_SORT_KEY).unwrap().type_name(),
            "PersonSortableField"
        );
        assert_eq!(
            types.keys.producer(DYNAMIC_ATTRIBUTE_FIELD).unwrap().type_name(),
            "PersonDynamicAttribute"
        );
    }

    #[test]
    fn test_omitted_tables_are_not_sortable() {
        let mut introspection = fixture(None);
        introspection.tables[0].tags =
            SmartTags::new().with(OMIT_TAG, TagValue::Text("order".to_string()));
        assert!(build_table_sort(&introspection.tables[0], None, &SortNullsType::default())
            .unwrap()
            .is_none());

        let mut introspection = fixture(None);
        introspection.tables[0].is_selectable = false;
        assert!(build_table_sort(&introspection.tables[0], None, &SortNullsType::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_omitted_columns_are_not_sort_keys() {
        let mut introspection = fixture(None);
        for column in introspection.tables[0].columns.iter_mut() {
            column.tags = SmartTags::new().with(OMIT_TAG, TagValue::Text("order".to_string()));
        }
        assert!(build_table_sort(&introspection.tables[0], None, &SortNullsType::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_hidden_columns_are_not_sort_keys() {
        let mut introspection = fixture(None);
        introspection.tables[0].columns[1].tags =
            SmartTags::new().with(OMIT_TAG, TagValue::Text("read".to_string()));
        let types = build_table_sort(&introspection.tables[0], None, &SortNullsType::default())
            .unwrap()
            .unwrap();
        let producer = types.keys.producer(FIELD_SORT_KEY).unwrap();

        assert!(producer.sort_by(&ConstValue::Enum(Name::new("ID"))).is_ok());
        assert_eq!(
            producer.sort_by(&ConstValue::Enum(Name::new("NAME"))),
            Err(SortError::UnknownSortBy("NAME".to_string()))
        );
    }

    #[test]
    fn test_colliding_sortable_fields_fail() {
        let mut introspection = fixture(None);
        introspection.tables[0].columns[1].name = "foo_bar".to_string();
        let mut twin = introspection.tables[0].columns[1].clone();
        twin.name = "fooBar".to_string();
        twin.position = 3;
        introspection.tables[0].columns.push(twin);

        assert_eq!(
            build_table_sort(&introspection.tables[0], None, &SortNullsType::default()).err(),
            Some(SortError::DuplicateSortableField(
                "FOO_BAR".to_string(),
                "foo_bar".to_string(),
                "fooBar".to_string()
            ))
        );
    }
}
