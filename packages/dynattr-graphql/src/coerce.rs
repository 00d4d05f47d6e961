//! Conversion of GraphQL input values into SQL literals for a column's type.

use async_graphql::dynamic::TypeRef;
use async_graphql_value::ConstValue;
use dynattr_database_types::{Column, ColumnType};
use sqlparser::ast::Value;
use thiserror::Error;

pub const BIG_INT: &str = "BigInt";
pub const BIG_FLOAT: &str = "BigFloat";
pub const UUID: &str = "UUID";
pub const DATE: &str = "Date";
pub const TIME: &str = "Time";
pub const DATETIME: &str = "Datetime";
pub const JSON: &str = "JSON";

/// Custom scalars that every generated schema registers.
pub const CUSTOM_SCALARS: [&str; 7] = [BIG_INT, BIG_FLOAT, UUID, DATE, TIME, DATETIME, JSON];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("Column '{column}' expects a {expected} value, received {received}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        received: String,
    },
    #[error("Value {value} is out of range for column '{column}' of type {expected}")]
    OutOfRange {
        column: String,
        expected: ColumnType,
        value: String,
    },
    #[error("Value for column '{column}' is {length} characters long; at most {max} allowed")]
    TooLong {
        column: String,
        max: usize,
        length: usize,
    },
    #[error("Could not serialize JSON value for column '{0}'")]
    Json(String),
}

/// Name of the GraphQL scalar representing a column type.
pub fn scalar_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Bool => TypeRef::BOOLEAN,
        ColumnType::Int2 | ColumnType::Int4 => TypeRef::INT,
        ColumnType::Int8 => BIG_INT,
        ColumnType::Float4 | ColumnType::Float8 => TypeRef::FLOAT,
        ColumnType::Numeric => BIG_FLOAT,
        ColumnType::Uuid => UUID,
        ColumnType::Date => DATE,
        ColumnType::Time => TIME,
        ColumnType::Timestamp | ColumnType::Timestamptz => DATETIME,
        ColumnType::Json | ColumnType::Jsonb => JSON,
        ColumnType::Text
        | ColumnType::Varchar
        | ColumnType::Bpchar
        | ColumnType::Name
        | ColumnType::Other => TypeRef::STRING,
    }
}

fn describe(value: &ConstValue) -> String {
    match value {
        ConstValue::Null => "null".to_string(),
        ConstValue::Number(n) => format!("number {n}"),
        ConstValue::String(s) => format!("string {s:?}"),
        ConstValue::Boolean(b) => format!("boolean {b}"),
        ConstValue::Binary(_) => "binary".to_string(),
        ConstValue::Enum(e) => format!("enum {e}"),
        ConstValue::List(_) => "list".to_string(),
        ConstValue::Object(_) => "object".to_string(),
    }
}

fn is_numeric_literal(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && s.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false)
}

/// Coerce `value` into a literal that can be compared against `column`.
///
/// `null` always becomes `NULL`; everything else must fit the column's type
/// and, for `varchar(n)`/`char(n)`, its length limit.
pub fn coerce(value: &ConstValue, column: &Column) -> Result<Value, CoercionError> {
    let column_type = column.column_type();
    let mismatch = || CoercionError::TypeMismatch {
        column: column.name.clone(),
        expected: column_type,
        received: describe(value),
    };
    let out_of_range = |v: String| CoercionError::OutOfRange {
        column: column.name.clone(),
        expected: column_type,
        value: v,
    };

    if let ConstValue::Null = value {
        return Ok(Value::Null);
    }

    match column_type {
        ColumnType::Bool => match value {
            ConstValue::Boolean(b) => Ok(Value::Boolean(*b)),
            _ => Err(mismatch()),
        },
        ColumnType::Int2 | ColumnType::Int4 | ColumnType::Int8 => {
            let n = match value {
                ConstValue::Number(n) => n.as_i64().ok_or_else(|| out_of_range(n.to_string()))?,
                ConstValue::String(s) if column_type == ColumnType::Int8 => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| out_of_range(s.clone()))?,
                _ => return Err(mismatch()),
            };
            let fits = match column_type {
                ColumnType::Int2 => i16::try_from(n).is_ok(),
                ColumnType::Int4 => i32::try_from(n).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(out_of_range(n.to_string()));
            }
            Ok(Value::Number(n.to_string(), false))
        }
        ColumnType::Float4 | ColumnType::Float8 | ColumnType::Numeric => match value {
            ConstValue::Number(n) => Ok(Value::Number(n.to_string(), false)),
            ConstValue::String(s)
                if column_type == ColumnType::Numeric && is_numeric_literal(s.trim()) =>
            {
                Ok(Value::Number(s.trim().to_string(), false))
            }
            _ => Err(mismatch()),
        },
        ColumnType::Json | ColumnType::Jsonb => {
            let json = value
                .clone()
                .into_json()
                .map_err(|_| CoercionError::Json(column.name.clone()))?;
            Ok(Value::SingleQuotedString(json.to_string()))
        }
        _ => {
            let text = match value {
                ConstValue::String(s) => s.clone(),
                ConstValue::Enum(name) => name.to_string(),
                ConstValue::Number(n) if column_type == ColumnType::Other => n.to_string(),
                _ => return Err(mismatch()),
            };
            if let Some(max) = column.max_length() {
                let length = text.chars().count();
                if length > max {
                    return Err(CoercionError::TooLong {
                        column: column.name.clone(),
                        max,
                        length,
                    });
                }
            }
            Ok(Value::SingleQuotedString(text))
        }
    }
}
