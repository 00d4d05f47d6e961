use super::{SortError, SortNulls, SortNullsType, SortSpec, TableSortKeys};
use crate::query::QueryBuilder;
use async_graphql_value::ConstValue;
use tracing::{debug, error};

/// One validated sort entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSort {
    pub spec: SortSpec,
    pub ascending: bool,
    pub nulls: SortNulls,
}

/// A sort argument resolved against a table's sort keys.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledSort {
    pub entries: Vec<ResolvedSort>,
}

impl CompiledSort {
    /// Cursor prefix of every entry, in entry order.
    pub fn cursor_prefix(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.spec.cursor_prefix.clone())
            .collect()
    }

    /// Whether the sort as a whole identifies every row.
    pub fn is_unique(&self) -> bool {
        self.entries.iter().all(|e| e.spec.unique == Some(true))
    }

    /// Append the `ORDER BY` terms in entry order, then spec order.
    pub fn apply(&self, query: &mut dyn QueryBuilder, order_by_nulls_last: bool) {
        for entry in &self.entries {
            let nulls_first = entry.nulls.nulls_first(order_by_nulls_last);
            for expr in &entry.spec.specs {
                let expr = expr.to_sql(query.table_alias());
                query.order_by(expr, entry.ascending, nulls_first);
            }
        }
        if self.is_unique() {
            query.set_order_is_unique();
        }
    }
}

fn entries(value: &ConstValue) -> Result<Vec<&ConstValue>, SortError> {
    match value {
        ConstValue::Null => Ok(vec![]),
        ConstValue::List(items) => Ok(items.iter().collect()),
        ConstValue::Object(_) => Ok(vec![value]),
        other => Err(SortError::MalformedEntry(format!(
            "expected a list of sort entries, received {other}"
        ))),
    }
}

fn resolve_entry(
    keys: &TableSortKeys,
    nulls: &SortNullsType,
    entry: &ConstValue,
) -> Result<ResolvedSort, SortError> {
    let fields = match entry {
        ConstValue::Object(fields) => fields,
        other => {
            return Err(SortError::MalformedEntry(format!(
                "expected a sort entry, received {other}"
            )))
        }
    };

    let sort_by = match fields.get("sortBy") {
        Some(ConstValue::Object(sort_by)) => sort_by,
        Some(ConstValue::Null) | None => {
            return Err(SortError::MalformedEntry("sortBy is required".to_string()))
        }
        Some(other) => {
            return Err(SortError::MalformedEntry(format!(
                "sortBy must be a {} value, received {other}",
                keys.sort_by_type
            )))
        }
    };

    let set: Vec<_> = sort_by
        .iter()
        .filter(|(_, v)| !matches!(v, ConstValue::Null))
        .collect();
    let (key, value) = match set.as_slice() {
        [one] => *one,
        [] if !sort_by.is_empty() => return Err(SortError::NullSortBy),
        _ => return Err(SortError::ExactlyOneSortBy),
    };

    let producer = keys
        .producer(key.as_str())
        .ok_or_else(|| SortError::UnknownSortBy(key.to_string()))?;
    let spec = producer
        .sort_by(value)
        .map_err(|e| {
            debug!("Sort key '{key}' of {} rejected its value: {e}", keys.sort_by_type);
            e
        })?
        .sort_spec();
    if let Err(e) = spec.validate(producer.type_name()) {
        error!("Sort key '{key}' of {} failed: {e}", keys.sort_by_type);
        return Err(SortError::Internal);
    }

    let ascending = match fields.get("ascending") {
        None | Some(ConstValue::Null) => true,
        Some(ConstValue::Boolean(ascending)) => *ascending,
        Some(other) => {
            return Err(SortError::MalformedEntry(format!(
                "ascending must be a boolean, received {other}"
            )))
        }
    };
    let nulls = nulls.parse(fields.get("nulls"))?;

    Ok(ResolvedSort {
        spec,
        ascending,
        nulls,
    })
}

/// Resolve a `sort` argument.
///
/// A single entry may be given without the surrounding list. `null` and the
/// empty list leave the query unsorted and return `None`.
pub fn compile_sort(
    keys: &TableSortKeys,
    nulls: &SortNullsType,
    value: &ConstValue,
) -> Result<Option<CompiledSort>, SortError> {
    let entries = entries(value)?;
    if entries.is_empty() {
        return Ok(None);
    }

    let entries = entries
        .into_iter()
        .map(|entry| resolve_entry(keys, nulls, entry))
        .collect::<Result<Vec<_>, SortError>>()?;
    let compiled = CompiledSort { entries };
    debug!(
        "Compiled sort over {} with cursor prefix {:?}",
        keys.sort_by_type,
        compiled.cursor_prefix()
    );
    Ok(Some(compiled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::{SelectQuery, TABLE_ALIAS},
        sort::{build_table_sort, SortExpr, SortKeyProducer, SortBy},
        spec::{parse_spec, tests::fixture},
    };
    use assert_matches::assert_matches;
    use dynattr_database_types::TagValue;
    use insta::assert_snapshot;
    use std::sync::Arc;

    fn keys() -> Arc<TableSortKeys> {
        let mut introspection =
            fixture(Some(TagValue::Text("person_attribute".to_string())));
        introspection.tables[0].columns[1].is_unique = true;
        let person = &introspection.tables[0];
        let spec = parse_spec(&introspection, person).unwrap().map(Arc::new);
        build_table_sort(person, spec, &SortNullsType::default())
            .unwrap()
            .unwrap()
            .keys
    }

    fn sort(value: serde_json::Value) -> Result<Option<CompiledSort>, SortError> {
        compile_sort(
            &keys(),
            &SortNullsType::default(),
            &ConstValue::from_json(value).unwrap(),
        )
    }

    fn sql(sort: &CompiledSort, order_by_nulls_last: bool) -> String {
        let introspection = fixture(None);
        let mut query = SelectQuery::new(&introspection.tables[0]);
        sort.apply(&mut query, order_by_nulls_last);
        let order = query
            .order
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<String>>()
            .join(", ");
        format!("{order} unique={}", query.order_is_unique)
    }

    #[test]
    fn test_null_and_empty_sort_are_noops() {
        assert_eq!(sort(serde_json::json!(null)), Ok(None));
        assert_eq!(sort(serde_json::json!([])), Ok(None));
    }

    #[test]
    fn test_bare_entry_is_a_one_entry_list() {
        let bare = sort(serde_json::json!({"sortBy": {"field": "NAME"}}))
            .unwrap()
            .unwrap();
        let listed = sort(serde_json::json!([{"sortBy": {"field": "NAME"}}]))
            .unwrap()
            .unwrap();
        assert_eq!(bare, listed);
        assert_eq!(bare.entries[0].ascending, true);
        assert_eq!(bare.entries[0].nulls, SortNulls::Default);
    }

    #[test]
    fn test_order_by_follows_entry_order() {
        let compiled = sort(serde_json::json!([
            {"sortBy": {"dynamicAttribute": {"key": "height", "locale": "en"}}, "ascending": false, "nulls": "LAST"},
            {"sortBy": {"field": "NAME"}, "nulls": "FIRST"},
            {"sortBy": {"field": "ID"}},
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(
            compiled.cursor_prefix(),
            vec![
                r#"dynamic|{"key":"height","locale":"en"}"#.to_string(),
                "name".to_string(),
                "id".to_string()
            ]
        );
        assert_snapshot!(sql(&compiled, false), @r###"(SELECT da."value" FROM "app"."person_attribute" AS da WHERE (__local_0__."id" = da."person_id") AND (da."key" = 'height') AND (da."locale" = 'en')) DESC NULLS LAST, __local_0__."name" ASC NULLS FIRST, __local_0__."id" ASC unique=false"###);
    }

    fn order_terms(sort: &CompiledSort) -> Vec<String> {
        let introspection = fixture(None);
        let mut query = SelectQuery::new(&introspection.tables[0]);
        sort.apply(&mut query, false);
        query.order.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn test_name_nulls_last_then_id_descending() {
        let compiled = sort(serde_json::json!([
            {"sortBy": {"field": "NAME"}, "ascending": true, "nulls": "LAST"},
            {"sortBy": {"field": "ID"}, "ascending": false},
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(
            compiled.cursor_prefix(),
            vec!["name".to_string(), "id".to_string()]
        );
        assert_snapshot!(sql(&compiled, false), @r###"__local_0__."name" ASC NULLS LAST, __local_0__."id" DESC unique=true"###);
    }

    #[test]
    fn test_reversed_entries_reverse_the_order() {
        let forward = sort(serde_json::json!([
            {"sortBy": {"field": "NAME"}},
            {"sortBy": {"dynamicAttribute": {"key": "height"}}},
        ]))
        .unwrap()
        .unwrap();
        let backward = sort(serde_json::json!([
            {"sortBy": {"dynamicAttribute": {"key": "height"}}},
            {"sortBy": {"field": "NAME"}},
        ]))
        .unwrap()
        .unwrap();

        let mut reversed = order_terms(&forward);
        reversed.reverse();
        assert_eq!(order_terms(&backward), reversed);

        let mut prefix = forward.cursor_prefix();
        assert_ne!(prefix, backward.cursor_prefix());
        prefix.reverse();
        assert_eq!(prefix, backward.cursor_prefix());
    }

    #[test]
    fn test_distinct_matches_have_distinct_prefixes() {
        let prefix = |matched: serde_json::Value| {
            sort(serde_json::json!({"sortBy": {"dynamicAttribute": matched}}))
                .unwrap()
                .unwrap()
                .cursor_prefix()
        };

        let height = prefix(serde_json::json!({"key": "height"}));
        assert_ne!(height, prefix(serde_json::json!({"key": "weight"})));
        assert_ne!(height, prefix(serde_json::json!({"key": "height", "locale": "en"})));
        assert_eq!(
            prefix(serde_json::json!({"key": "height", "locale": "en"})),
            prefix(serde_json::json!({"locale": "en", "key": "height"}))
        );
    }

    #[test]
    fn test_default_nulls_respect_configuration() {
        let compiled = sort(serde_json::json!({"sortBy": {"field": "ID"}}))
            .unwrap()
            .unwrap();
        assert_eq!(sql(&compiled, false), r#"__local_0__."id" ASC unique=true"#);
        assert_eq!(
            sql(&compiled, true),
            r#"__local_0__."id" ASC NULLS LAST unique=true"#
        );
    }

    #[test]
    fn test_unique_only_when_every_entry_is_unique() {
        let unique = sort(serde_json::json!([
            {"sortBy": {"field": "ID"}},
            {"sortBy": {"field": "NAME"}},
        ]))
        .unwrap()
        .unwrap();
        assert!(unique.is_unique());

        let mixed = sort(serde_json::json!([
            {"sortBy": {"field": "ID"}},
            {"sortBy": {"dynamicAttribute": {"key": "height"}}},
        ]))
        .unwrap()
        .unwrap();
        assert!(!mixed.is_unique());
    }

    #[test]
    fn test_exactly_one_sort_by_key() {
        assert_eq!(
            sort(serde_json::json!({"sortBy": {}})),
            Err(SortError::ExactlyOneSortBy)
        );
        assert_eq!(
            sort(serde_json::json!({"sortBy": {"field": "ID", "dynamicAttribute": {"key": "a"}}})),
            Err(SortError::ExactlyOneSortBy)
        );
        assert_eq!(
            sort(serde_json::json!({"sortBy": {"field": null}})),
            Err(SortError::NullSortBy)
        );
        assert!(sort(serde_json::json!({"sortBy": {"field": "ID", "dynamicAttribute": null}}))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert_matches!(
            sort(serde_json::json!({"sortBy": {"field": "AGE"}})),
            Err(SortError::UnknownSortBy(_))
        );
        assert_matches!(
            sort(serde_json::json!({"sortBy": {"price": 1}})),
            Err(SortError::UnknownSortBy(_))
        );
    }

    #[test]
    fn test_producer_errors_reach_the_caller() {
        assert_matches!(
            sort(serde_json::json!({"sortBy": {"field": 5}})),
            Err(SortError::MalformedEntry(message)) if message.contains("PersonSortableField")
        );
    }

    #[derive(Debug)]
    struct BrokenProducer;

    impl SortKeyProducer for BrokenProducer {
        fn type_name(&self) -> &str {
            "Broken"
        }

        fn sort_by(&self, _: &ConstValue) -> Result<SortBy, SortError> {
            Ok(SortBy::Field(crate::sort::SortableField {
                column: String::new(),
                unique: false,
            }))
        }
    }

    #[test]
    fn test_broken_producer_is_an_internal_error() {
        let keys = TableSortKeys::new("PersonSortBy".to_string())
            .with("broken", Box::new(BrokenProducer));
        let result = compile_sort(
            &keys,
            &SortNullsType::default(),
            &ConstValue::from_json(serde_json::json!({"sortBy": {"broken": true}})).unwrap(),
        );
        assert_eq!(result, Err(SortError::Internal));
        assert_eq!(
            SortError::Internal.to_string(),
            "Failed to build this sort; internal error."
        );
    }

    #[test]
    fn test_sort_expr_resolves_against_alias() {
        let expr = SortExpr::Column("name".to_string());
        assert_eq!(expr.to_sql(TABLE_ALIAS).to_string(), r#"__local_0__."name""#);
    }
}
