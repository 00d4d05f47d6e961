use crate::{
    sort::SortNullsType,
    spec::{parse_spec, DynamicAttributeSpec, SpecError},
};
use dynattr_database_types::{Introspection, Table, TableId};
use dynattr_lib::config::SchemaConfig;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    sync::Arc,
};
use tracing::debug;

/// State shared by everything built during one schema construction.
///
/// Parsed dynamic attribute specs are cached here and dropped with the build;
/// a second build over the same metadata parses again.
pub struct SchemaBuild<'a> {
    pub introspection: &'a Introspection,
    pub config: &'a SchemaConfig,
    specs: RefCell<HashMap<TableId, Option<Arc<DynamicAttributeSpec>>>>,
    scans: Cell<usize>,
    sort_nulls: Arc<SortNullsType>,
}

impl<'a> SchemaBuild<'a> {
    pub fn new(introspection: &'a Introspection, config: &'a SchemaConfig) -> Self {
        Self {
            introspection,
            config,
            specs: RefCell::new(HashMap::new()),
            scans: Cell::new(0),
            sort_nulls: Arc::new(SortNullsType::default()),
        }
    }

    /// The dynamic attribute spec of `table`, parsed at most once per build.
    ///
    /// Failures are not cached; they abort the build anyway.
    pub fn dynamic_attribute_spec(
        &self,
        table: &Table,
    ) -> Result<Option<Arc<DynamicAttributeSpec>>, SpecError> {
        if let Some(cached) = self.specs.borrow().get(&table.id) {
            debug!("Dynamic attribute spec of {} served from cache.", table.describe());
            return Ok(cached.clone());
        }

        self.scans.set(self.scans.get() + 1);
        let spec = parse_spec(self.introspection, table)?.map(Arc::new);
        if spec.is_some() {
            debug!("Parsed dynamic attribute spec of {}.", table.describe());
        }
        self.specs.borrow_mut().insert(table.id, spec.clone());
        Ok(spec)
    }

    /// Number of times a table's tag was actually parsed.
    pub fn spec_scans(&self) -> usize {
        self.scans.get()
    }

    pub fn sort_nulls(&self) -> &Arc<SortNullsType> {
        &self.sort_nulls
    }
}
