use super::SortError;
use crate::inflection::SORT_NULLS;
use async_graphql::dynamic::{Enum, EnumItem};
use async_graphql_value::{ConstValue, Name};
use std::str::FromStr;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

/// Where null values go in one sort entry.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SortNulls {
    #[default]
    Default,
    First,
    Last,
}

impl SortNulls {
    /// The `nulls_first` flag handed to the query builder.
    ///
    /// `DEFAULT` keeps the database's collation unless the schema is
    /// configured to put nulls last.
    pub fn nulls_first(self, order_by_nulls_last: bool) -> Option<bool> {
        match self {
            SortNulls::First => Some(true),
            SortNulls::Last => Some(false),
            SortNulls::Default if order_by_nulls_last => Some(false),
            SortNulls::Default => None,
        }
    }

    fn description(self) -> &'static str {
        match self {
            SortNulls::Default => "Order nulls the way the database orders them by default.",
            SortNulls::First => "Order nulls before all other values.",
            SortNulls::Last => "Order nulls after all other values.",
        }
    }
}

/// The shared `SortNulls` enum type.
///
/// One instance exists per schema build; every `<Type>Sort` input refers to it.
#[derive(Debug)]
pub struct SortNullsType {
    name: String,
}

impl Default for SortNullsType {
    fn default() -> Self {
        Self {
            name: SORT_NULLS.to_string(),
        }
    }
}

impl SortNullsType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the `nulls` field when a sort entry leaves it out.
    pub fn default_value(&self) -> ConstValue {
        ConstValue::Enum(Name::new(SortNulls::Default.as_ref()))
    }

    pub fn definition(&self) -> Enum {
        SortNulls::iter().fold(
            Enum::new(&self.name)
                .description("How to place null values within a sort."),
            |e, nulls| e.item(EnumItem::new(nulls.as_ref()).description(nulls.description())),
        )
    }

    /// Read the `nulls` field of a sort entry; absent means `DEFAULT`.
    pub fn parse(&self, value: Option<&ConstValue>) -> Result<SortNulls, SortError> {
        match value {
            None | Some(ConstValue::Null) => Ok(SortNulls::Default),
            Some(ConstValue::Enum(name)) => SortNulls::from_str(name.as_str())
                .map_err(|_| SortError::MalformedEntry(format!("unknown nulls value {name}"))),
            Some(ConstValue::String(name)) => SortNulls::from_str(name)
                .map_err(|_| SortError::MalformedEntry(format!("unknown nulls value {name}"))),
            Some(other) => Err(SortError::MalformedEntry(format!(
                "nulls must be a {} value, received {other}",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_placement() {
        assert_eq!(SortNulls::First.nulls_first(false), Some(true));
        assert_eq!(SortNulls::Last.nulls_first(false), Some(false));
        assert_eq!(SortNulls::Default.nulls_first(false), None);
        assert_eq!(SortNulls::Default.nulls_first(true), Some(false));
        assert_eq!(SortNulls::First.nulls_first(true), Some(true));
    }

    #[test]
    fn test_parse_nulls() {
        let nulls = SortNullsType::default();
        assert_eq!(nulls.parse(None), Ok(SortNulls::Default));
        assert_eq!(
            nulls.parse(Some(&ConstValue::Enum(Name::new("LAST")))),
            Ok(SortNulls::Last)
        );
        assert!(nulls
            .parse(Some(&ConstValue::Enum(Name::new("SOMETIMES"))))
            .is_err());
    }
}
