use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use strum::{AsRefStr, EnumString};

/// Smart tag carrying the dynamic attribute specification of a table.
pub const DYNAMIC_ATTRIBUTES_TAG: &str = "dynamicAttributes";

/// Smart tag overriding the GraphQL name of a table or column.
pub const NAME_TAG: &str = "name";

/// Smart tag removing a capability from a table or column.
pub const OMIT_TAG: &str = "omit";

/// Smart tag enabling the `sort` argument on a set-returning procedure.
pub const SORTABLE_TAG: &str = "sortable";

/// Value of a single smart tag, as parsed from a database comment.
///
/// `@sortable` is a flag, `@name person` is text and a tag repeated on several
/// lines of the comment becomes a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

/// Capabilities that can be removed with `@omit`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OmitAction {
    Read,
    Create,
    Update,
    Delete,
    All,
    Many,
    Order,
    Filter,
    Execute,
}

/// String-keyed declarative tags attached to a database entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SmartTags(BTreeMap<String, TagValue>);

impl SmartTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: TagValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.0.get(name)
    }

    /// Text value of a tag; flags and lists yield `None`.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(TagValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        matches!(
            self.0.get(name),
            Some(TagValue::Flag(true)) | Some(TagValue::Text(_)) | Some(TagValue::List(_))
        )
    }

    /// Whether `@omit` removes the given capability.
    ///
    /// A bare `@omit` removes everything; otherwise the value is a comma
    /// separated list of actions (`@omit order,filter`).
    pub fn omits(&self, action: OmitAction) -> bool {
        let listed = |item: &str| {
            item.split(',')
                .filter_map(|part| OmitAction::from_str(part.trim()).ok())
                .any(|a| a == action || a == OmitAction::All)
        };
        match self.0.get(OMIT_TAG) {
            Some(TagValue::Flag(flag)) => *flag,
            Some(TagValue::Text(text)) => listed(text),
            Some(TagValue::List(items)) => items.iter().any(|item| listed(item)),
            None => false,
        }
    }
}
