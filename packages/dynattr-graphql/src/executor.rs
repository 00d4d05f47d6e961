use crate::query::SelectQuery;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A result row, keyed by select alias.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row(pub Map<String, Value>);

impl Row {
    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.0.get(alias)
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Runs the selects built by collection resolvers.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch(&self, query: &SelectQuery) -> anyhow::Result<Vec<Row>>;
}

/// Returns no rows. Used where a schema is built only to be printed.
#[derive(Debug, Default)]
pub struct NoopExecutor;

#[async_trait]
impl QueryExecutor for NoopExecutor {
    async fn fetch(&self, _query: &SelectQuery) -> anyhow::Result<Vec<Row>> {
        Ok(vec![])
    }
}
