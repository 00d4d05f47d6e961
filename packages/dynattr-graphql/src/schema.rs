//! Assembly of the dynamic schema from introspected database metadata.

use crate::{
    coerce::{coerce, scalar_name, CUSTOM_SCALARS},
    context::SchemaBuild,
    cursor::NATURAL_PREFIX,
    dynamic_attribute::{select_requested, InputObjectDynamicAttributeExt, ObjectDynamicAttributeExt},
    executor::{QueryExecutor, Row},
    filter::{is_filterable, TableFilter},
    inflection::{self, FILTER_ARGUMENT, SORT_ARGUMENT},
    query::{QueryBuilder, SelectQuery, SqlExpr},
    sort::{build_table_sort, compile_sort, SortNullsType, TableSortKeys},
    spec::DynamicAttributeSpec,
    util::*,
    GraphqlError, GraphqlResult,
};
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Scalar,
    Schema, TypeRef,
};
use async_graphql_value::ConstValue;
use dynattr_database_types::{
    tags::SORTABLE_TAG, Column, Introspection, OmitAction, Procedure, Table, TableId,
};
use dynattr_lib::config::SchemaConfig;
use sqlparser::ast::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

pub const QUERY_ROOT: &str = "Query";

/// Where a collection reads its rows from.
#[derive(Clone, Debug)]
enum Source {
    Table,
    Procedure {
        namespace: String,
        name: String,
        /// GraphQL argument name and the column view of each procedure argument.
        arguments: Vec<(String, Column)>,
    },
}

/// A query field returning a connection over the rows of one table.
struct Collection {
    table: Table,
    source: Source,
    spec: Option<Arc<DynamicAttributeSpec>>,
    sort: Option<Arc<TableSortKeys>>,
    filter: Option<TableFilter>,
    sort_nulls: Arc<SortNullsType>,
    order_by_nulls_last: bool,
    page_size_limit: u64,
    executor: Arc<dyn QueryExecutor>,
}

impl Collection {
    fn select(&self, ctx: &ResolverContext<'_>) -> GraphqlResult<SelectQuery> {
        match &self.source {
            Source::Table => Ok(SelectQuery::new(&self.table)),
            Source::Procedure {
                namespace,
                name,
                arguments,
            } => {
                let mut values = Vec::with_capacity(arguments.len());
                for (field, column) in arguments {
                    values.push(match ctx.get_arg_value(field)? {
                        Some(value) => coerce(&value, column)?,
                        None => Value::Null,
                    });
                }
                Ok(SelectQuery::from_procedure(
                    namespace,
                    name,
                    values,
                    &self.table,
                ))
            }
        }
    }

    /// Build the select for one request, with the paging window and the
    /// cursor prefix of the order in effect.
    fn prepare(
        &self,
        ctx: &ResolverContext<'_>,
    ) -> GraphqlResult<(SelectQuery, Paging, Vec<String>)> {
        let mut query = self.select(ctx)?;
        let alias = query.table_alias().to_string();

        if let Some(filter) = &self.filter {
            if let Some(value) = ctx.get_arg_value(FILTER_ARGUMENT)? {
                query.where_(filter.predicate(&alias, &value)?);
            }
        }

        let mut prefix = vec![NATURAL_PREFIX.to_string()];
        if let Some(keys) = &self.sort {
            if let Some(value) = ctx.get_arg_value(SORT_ARGUMENT)? {
                if let Some(sort) = compile_sort(keys, &self.sort_nulls, &value)? {
                    sort.apply(&mut query, self.order_by_nulls_last);
                    prefix = sort.cursor_prefix();
                }
            }
        }

        if !query.is_order_unique() {
            if let Some(columns) = self
                .table
                .primary_key()
                .and_then(|primary_key| self.table.key_columns(primary_key))
            {
                for column in columns {
                    query.order_by(SqlExpr::column(&alias, &column.name), true, None);
                }
                query.set_order_is_unique();
            }
        }

        if let Some(spec) = &self.spec {
            select_requested(spec, &mut query, ctx.field())?;
        }

        let paging = Paging::new(
            ctx.get_arg_u64(FIRST_ARGUMENT)?,
            ctx.get_arg_u64(OFFSET_ARGUMENT)?,
            ctx.get_arg_string(AFTER_ARGUMENT)?.as_deref(),
            &prefix,
            self.page_size_limit,
        )?;
        query.limit = Some(paging.limit());
        query.offset = paging.offset();

        Ok((query, paging, prefix))
    }

    async fn resolve(&self, ctx: &ResolverContext<'_>) -> GraphqlResult<Connection> {
        let (query, paging, prefix) = self.prepare(ctx)?;
        debug!("Executing query: {query}");
        let rows = self
            .executor
            .fetch(&query)
            .await
            .map_err(|e| GraphqlError::QueryError(e.to_string()))?;
        Ok(Connection::new(rows, &paging, &prefix))
    }

    fn into_field(self, name: String) -> Field {
        let type_name = inflection::table_type(&self.table);
        let table = self.table.clone();
        let arguments = match &self.source {
            Source::Procedure { arguments, .. } => arguments.clone(),
            Source::Table => vec![],
        };
        let sortable = self.sort.is_some();
        let filterable = self.filter.is_some();

        let collection = Arc::new(self);
        let mut field = Field::new(
            name,
            TypeRef::named_nn(TypeRef::connection(type_name)),
            move |ctx| {
                let collection = collection.clone();
                FieldFuture::new(async move {
                    let connection = collection.resolve(&ctx).await?;
                    Ok(Some(FieldValue::owned_any(connection)))
                })
            },
        );

        for (argument, column) in arguments {
            field = field.argument(InputValue::new(
                argument,
                TypeRef::named(scalar_name(column.column_type())),
            ));
        }
        field = field.paging_arguments();
        if sortable {
            field = field.sorting_arguments(&table);
        }
        if filterable {
            field = field.filtering_arguments(&table);
        }
        field
    }
}

fn readable_columns(table: &Table) -> impl Iterator<Item = &Column> {
    table
        .columns
        .iter()
        .filter(|c| !c.tags.omits(OmitAction::Read))
}

fn row_object(table: &Table, spec: Option<Arc<DynamicAttributeSpec>>) -> Object {
    let mut object = Object::new(inflection::table_type(table));
    for column in readable_columns(table) {
        let scalar = scalar_name(column.column_type());
        let type_ref = if column.is_not_null {
            TypeRef::named_nn(scalar)
        } else {
            TypeRef::named(scalar)
        };
        let name = column.name.clone();
        object = object.field(Field::new(
            inflection::column(column),
            type_ref,
            move |ctx| {
                let name = name.clone();
                FieldFuture::new(async move {
                    let row = ctx.parent::<Row>()?;
                    match row.get(&name) {
                        None | Some(serde_json::Value::Null) => Ok(None),
                        Some(value) => Ok(Some(FieldValue::value(ConstValue::from_json(
                            value.clone(),
                        )?))),
                    }
                })
            },
        ));
    }
    match spec {
        Some(spec) => object.dynamic_attribute_field(table, spec),
        None => object,
    }
}

/// What a registered table contributes to procedures returning its rows.
struct ExposedTable {
    spec: Option<Arc<DynamicAttributeSpec>>,
    sort: Option<Arc<TableSortKeys>>,
}

fn procedure_arguments(procedure: &Procedure) -> Vec<(String, Column)> {
    procedure
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            (
                inflection::procedure_argument(&arg.name),
                arg.as_column(i as i16 + 1),
            )
        })
        .collect()
}

/// Build the schema exposing the configured namespaces of `introspection`.
///
/// An invalid `@dynamicAttributes` tag on any exposed table fails the whole
/// build.
pub fn build_schema(
    introspection: &Introspection,
    config: &SchemaConfig,
    executor: Arc<dyn QueryExecutor>,
) -> GraphqlResult<Schema> {
    let build = SchemaBuild::new(introspection, config);

    let mut schema = CUSTOM_SCALARS
        .iter()
        .fold(Schema::build(QUERY_ROOT, None, None), |schema, scalar| {
            schema.register(Scalar::new(*scalar))
        })
        .register_sorting_types(build.sort_nulls())
        .register_paging_types()
        .register_filtering_types();
    let mut query_root = Object::new(QUERY_ROOT);

    let mut exposed: HashMap<TableId, ExposedTable> = HashMap::new();
    for table in introspection.tables_in(&config.schemas) {
        if !table.is_selectable || readable_columns(table).next().is_none() {
            warn!("Skipping {}: nothing can be read from it.", table.describe());
            continue;
        }

        let spec = build.dynamic_attribute_spec(table)?;
        let type_name = inflection::table_type(table);
        schema = schema
            .register(row_object(table, spec.clone()))
            .register(Object::new_connection(&type_name))
            .register(Object::new_edge(&type_name));

        if let Some(spec) = &spec {
            schema = schema.register(InputObject::new_dynamic_attribute(table, spec));
        }

        let filter = if is_filterable(table) {
            schema = schema.register(InputObject::new_table_filter(table, spec.is_some()));
            if let Some(spec) = &spec {
                schema = schema.register(InputObject::new_dynamic_attribute_filter(
                    table,
                    scalar_name(spec.value_column.column_type()),
                ));
            }
            Some(TableFilter::new(table, spec.clone()))
        } else {
            None
        };

        let sort = match build_table_sort(table, spec.clone(), build.sort_nulls())? {
            Some(types) => {
                if let Some(sortable_field) = types.sortable_field {
                    schema = schema.register(sortable_field);
                }
                schema = schema.register(types.sort_by).register(types.sort);
                Some(types.keys)
            }
            None => None,
        };

        if !table.tags.omits(OmitAction::Many) {
            let collection = Collection {
                table: table.clone(),
                source: Source::Table,
                spec: spec.clone(),
                sort: sort.clone(),
                filter,
                sort_nulls: build.sort_nulls().clone(),
                order_by_nulls_last: config.order_by_nulls_last,
                page_size_limit: config.page_size_limit,
                executor: executor.clone(),
            };
            query_root = query_root.field(collection.into_field(inflection::all_rows(table)));
        }

        exposed.insert(table.id, ExposedTable { spec, sort });
    }

    let mut procedures = 0;
    for procedure in introspection
        .procedures
        .iter()
        .filter(|p| config.schemas.contains(&p.namespace))
    {
        if !procedure.returns_set || procedure.tags.omits(OmitAction::Execute) {
            continue;
        }
        let (table, returned) = match procedure
            .return_table
            .and_then(|id| Some((introspection.table(id)?, exposed.get(&id)?)))
        {
            Some(found) => found,
            None => {
                debug!(
                    "Skipping procedure {}: it does not return an exposed table.",
                    procedure.qualified_name()
                );
                continue;
            }
        };

        let collection = Collection {
            table: table.clone(),
            source: Source::Procedure {
                namespace: procedure.namespace.clone(),
                name: procedure.name.clone(),
                arguments: procedure_arguments(procedure),
            },
            spec: returned.spec.clone(),
            sort: if procedure.tags.has(SORTABLE_TAG) {
                returned.sort.clone()
            } else {
                None
            },
            filter: None,
            sort_nulls: build.sort_nulls().clone(),
            order_by_nulls_last: config.order_by_nulls_last,
            page_size_limit: config.page_size_limit,
            executor: executor.clone(),
        };
        query_root = query_root.field(collection.into_field(inflection::procedure(procedure)));
        procedures += 1;
    }

    info!(
        "Built schema over {} table(s) and {procedures} procedure(s); {} dynamic attribute spec(s) parsed.",
        exposed.len(),
        build.spec_scans()
    );

    Ok(schema.register(query_root).finish()?)
}
