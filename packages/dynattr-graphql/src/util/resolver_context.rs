//! `async_graphql::dynamic::ResolverContext` helpers for reading parents and
//! arguments.

use async_graphql::dynamic::ResolverContext;
use async_graphql_value::ConstValue;
use extension_trait::extension_trait;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ResolverContextError {
    #[error("Failed to downcast parent value to {0}")]
    Parent(&'static str),
    #[error("Failed to get argument {0} as {1}")]
    Argument(String, &'static str),
}

type Result<T> = std::result::Result<T, ResolverContextError>;

#[extension_trait]
pub impl<'a> ResolverContextExt<'a> for ResolverContext<'a> {
    fn parent<T: 'static>(&self) -> Result<&T> {
        self.parent_value
            .try_downcast_ref::<T>()
            .map_err(|_| ResolverContextError::Parent(std::any::type_name::<T>()))
    }

    /// The argument's value; `None` when absent or null.
    fn get_arg_value(&self, name: &str) -> Result<Option<ConstValue>> {
        match self.args.get(name) {
            None => Ok(None),
            Some(arg) if arg.is_null() => Ok(None),
            Some(arg) => arg
                .deserialize::<ConstValue>()
                .map(Some)
                .map_err(|_| ResolverContextError::Argument(name.into(), "value")),
        }
    }

    fn get_arg_u64(&self, name: &str) -> Result<Option<u64>> {
        self.get_arg_value(name)?
            .map(|value| match value {
                ConstValue::Number(n) => n
                    .as_u64()
                    .ok_or_else(|| ResolverContextError::Argument(name.into(), "u64")),
                _ => Err(ResolverContextError::Argument(name.into(), "u64")),
            })
            .transpose()
    }

    fn get_arg_string(&self, name: &str) -> Result<Option<String>> {
        self.get_arg_value(name)?
            .map(|value| match value {
                ConstValue::String(s) => Ok(s),
                _ => Err(ResolverContextError::Argument(name.into(), "string")),
            })
            .transpose()
    }
}
