//! # dynattr-database-types
//!
//! The introspected Postgres metadata graph the schema builder works from:
//! tables, columns, constraints, procedures and the smart tags attached to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, EnumString};

pub mod tags;

pub use tags::{OmitAction, SmartTags, TagValue};

/// Postgres adds this header size to the `atttypmod` of length-limited types.
pub const VARHDRSZ: i32 = 4;

/// Object identifier of a relation (`pg_class.oid`).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of relation, as reported by `pg_class.relkind`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
    MaterializedView,
    ForeignTable,
    PartitionedTable,
}

/// Column types the schema builder knows how to expose and coerce.
///
/// Postgres identifies types by OID; anything not listed here is `Other` and
/// is handled as text.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Varchar,
    Bpchar,
    Name,
    Uuid,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Json,
    Jsonb,
    Other,
}

impl From<u32> for ColumnType {
    fn from(oid: u32) -> ColumnType {
        match oid {
            16 => ColumnType::Bool,
            19 => ColumnType::Name,
            20 => ColumnType::Int8,
            21 => ColumnType::Int2,
            23 => ColumnType::Int4,
            25 => ColumnType::Text,
            114 => ColumnType::Json,
            700 => ColumnType::Float4,
            701 => ColumnType::Float8,
            1042 => ColumnType::Bpchar,
            1043 => ColumnType::Varchar,
            1082 => ColumnType::Date,
            1083 => ColumnType::Time,
            1114 => ColumnType::Timestamp,
            1184 => ColumnType::Timestamptz,
            1700 => ColumnType::Numeric,
            2950 => ColumnType::Uuid,
            3802 => ColumnType::Jsonb,
            _ => ColumnType::Other,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl ColumnType {
    /// Whether values of this type are compared as integers.
    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::Int2 | ColumnType::Int4 | ColumnType::Int8)
    }

    /// Whether a type modifier on this type limits the string length.
    pub fn is_length_limited(&self) -> bool {
        matches!(self, ColumnType::Varchar | ColumnType::Bpchar)
    }
}

/// A column of a table (`pg_attribute`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// `attnum`, 1-based.
    pub position: i16,

    /// OID of the column's type.
    pub type_id: u32,

    /// `atttypmod`; `None` when the type carries no modifier.
    #[serde(default)]
    pub type_modifier: Option<i32>,

    /// Whether the column alone is covered by a unique constraint.
    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_not_null: bool,

    #[serde(default)]
    pub tags: SmartTags,
}

impl Column {
    pub fn column_type(&self) -> ColumnType {
        ColumnType::from(self.type_id)
    }

    /// Maximum string length allowed by a `varchar(n)`/`char(n)` modifier.
    pub fn max_length(&self) -> Option<usize> {
        match self.type_modifier {
            Some(typmod) if self.column_type().is_length_limited() && typmod > VARHDRSZ => {
                Some((typmod - VARHDRSZ) as usize)
            }
            _ => None,
        }
    }
}

/// Kind of a table constraint (`pg_constraint.contype`).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    #[strum(serialize = "p")]
    PrimaryKey,
    #[strum(serialize = "u")]
    Unique,
    #[strum(serialize = "f")]
    ForeignKey,
}

/// A constraint over an ordered list of columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,

    /// Column positions in declaration order.
    pub key_columns: Vec<i16>,
}

impl Constraint {
    pub fn is_unique_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey | ConstraintKind::Unique)
    }
}

fn default_selectable() -> bool {
    true
}

/// A relation (`pg_class`) with its columns and constraints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub namespace: String,
    pub name: String,

    #[serde(default)]
    pub kind: TableKind,

    pub columns: Vec<Column>,

    #[serde(default)]
    pub constraints: Vec<Constraint>,

    #[serde(default)]
    pub tags: SmartTags,

    /// Whether the current role may select from the table.
    #[serde(default = "default_selectable")]
    pub is_selectable: bool,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_at(&self, position: i16) -> Option<&Column> {
        self.columns.iter().find(|c| c.position == position)
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
    }

    /// Primary key or unique constraint with the given name.
    pub fn unique_constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.name == name && c.is_unique_key())
    }

    /// Columns of a constraint, in the constraint's declared order.
    ///
    /// `None` when any position names no column of this table.
    pub fn key_columns(&self, constraint: &Constraint) -> Option<Vec<&Column>> {
        constraint
            .key_columns
            .iter()
            .map(|position| self.column_at(*position))
            .collect()
    }

    /// Positions of `constraint` naming no column of this table.
    pub fn unresolved_key_columns(&self, constraint: &Constraint) -> Vec<i16> {
        constraint
            .key_columns
            .iter()
            .copied()
            .filter(|position| self.column_at(*position).is_none())
            .collect()
    }

    /// Whether `column` alone identifies a row of this table.
    pub fn is_column_unique(&self, column: &Column) -> bool {
        column.is_unique
            || self.constraints.iter().any(|c| {
                c.is_unique_key() && c.key_columns.as_slice() == [column.position]
            })
    }

    pub fn qualified_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.namespace, self.name)
    }

    /// Human readable reference used in diagnostics.
    pub fn describe(&self) -> String {
        format!("table {}", self.qualified_name())
    }

    /// SQL comment statement that would attach `@tag value` to this table.
    pub fn comment_with_tag(&self, tag: &str, value: &str) -> String {
        format!(
            "COMMENT ON TABLE {} IS E'@{} {}';",
            self.qualified_name(),
            tag,
            value.replace('\'', "''")
        )
    }
}

/// An argument of a procedure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureArg {
    pub name: String,
    pub type_id: u32,
    #[serde(default)]
    pub type_modifier: Option<i32>,
}

impl ProcedureArg {
    /// The argument viewed as a column, so it can share column coercion.
    pub fn as_column(&self, position: i16) -> Column {
        Column {
            name: self.name.clone(),
            position,
            type_id: self.type_id,
            type_modifier: self.type_modifier,
            is_unique: false,
            is_not_null: false,
            tags: SmartTags::default(),
        }
    }
}

/// A function (`pg_proc`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: u32,
    pub namespace: String,
    pub name: String,

    #[serde(default)]
    pub args: Vec<ProcedureArg>,

    /// Table whose row type the procedure returns, if any.
    #[serde(default)]
    pub return_table: Option<TableId>,

    #[serde(default)]
    pub returns_set: bool,

    #[serde(default)]
    pub tags: SmartTags,
}

impl Procedure {
    pub fn qualified_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.namespace, self.name)
    }
}

/// Everything introspected from one database.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Introspection {
    pub tables: Vec<Table>,

    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl Introspection {
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Tables whose namespace is one of `namespaces`, in introspection order.
    pub fn tables_in<'a>(
        &'a self,
        namespaces: &'a [String],
    ) -> impl Iterator<Item = &'a Table> + 'a {
        self.tables
            .iter()
            .filter(move |t| namespaces.iter().any(|ns| *ns == t.namespace))
    }
}
