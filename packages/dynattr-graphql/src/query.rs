//! The select statement a collection field runs, and the builder interface
//! sorts and filters write into.

use crate::subquery::DynamicAttributeSubquery;
use dynattr_database_types::Table;
use sqlparser::ast::{BinaryOperator, Ident, Value};
use std::fmt;

/// Alias of the queried table in the outer select.
pub const TABLE_ALIAS: &str = "__local_0__";

fn quoted(name: &str) -> Ident {
    Ident::with_quote('"', name)
}

/// A scalar SQL expression.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlExpr {
    Column { alias: String, column: String },
    Subquery(Box<DynamicAttributeSubquery>),
    Value(Value),
}

impl SqlExpr {
    pub fn column(alias: &str, column: &str) -> Self {
        SqlExpr::Column {
            alias: alias.to_string(),
            column: column.to_string(),
        }
    }
}

impl From<DynamicAttributeSubquery> for SqlExpr {
    fn from(subquery: DynamicAttributeSubquery) -> Self {
        SqlExpr::Subquery(Box::new(subquery))
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlExpr::Column { alias, column } => write!(f, "{alias}.{}", quoted(column)),
            SqlExpr::Subquery(subquery) => write!(f, "{subquery}"),
            SqlExpr::Value(value) => write!(f, "{value}"),
        }
    }
}

/// A boolean condition for a `WHERE` clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        left: SqlExpr,
        op: BinaryOperator,
        right: SqlExpr,
    },
    IsNull {
        expr: SqlExpr,
        negated: bool,
    },
    In {
        expr: SqlExpr,
        list: Vec<SqlExpr>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

fn join(f: &mut fmt::Formatter<'_>, predicates: &[Predicate], sep: &str) -> fmt::Result {
    let parts = predicates
        .iter()
        .map(|p| format!("({p})"))
        .collect::<Vec<String>>()
        .join(sep);
    write!(f, "{parts}")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Predicate::IsNull {
                expr,
                negated: false,
            } => write!(f, "{expr} IS NULL"),
            Predicate::IsNull {
                expr,
                negated: true,
            } => write!(f, "{expr} IS NOT NULL"),
            Predicate::In { expr, list } if list.is_empty() => write!(f, "{expr} IN (NULL)"),
            Predicate::In { expr, list } => write!(
                f,
                "{expr} IN ({})",
                list.iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Predicate::And(predicates) => join(f, predicates, " AND "),
            Predicate::Or(predicates) => join(f, predicates, " OR "),
            Predicate::Not(predicate) => write!(f, "NOT ({predicate})"),
        }
    }
}

/// One `ORDER BY` term.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderTerm {
    pub expr: SqlExpr,
    pub ascending: bool,

    /// `None` leaves null placement to the database's default collation.
    pub nulls_first: Option<bool>,
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, if self.ascending { "ASC" } else { "DESC" })?;
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST"),
            Some(false) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}

/// The interface sort and filter compilation write into.
pub trait QueryBuilder {
    fn table_alias(&self) -> &str;

    fn order_by(&mut self, expr: SqlExpr, ascending: bool, nulls_first: Option<bool>);

    /// Record that the current order identifies every row.
    fn set_order_is_unique(&mut self);

    fn is_order_unique(&self) -> bool;

    fn select(&mut self, expr: SqlExpr, alias: String);

    fn where_(&mut self, predicate: Predicate);
}

/// The relation a select reads from.
#[derive(Clone, Debug, PartialEq)]
pub enum QuerySource {
    Table {
        namespace: String,
        name: String,
    },
    Function {
        namespace: String,
        name: String,
        arguments: Vec<Value>,
    },
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Table { namespace, name } => {
                write!(f, "{}.{}", quoted(namespace), quoted(name))
            }
            QuerySource::Function {
                namespace,
                name,
                arguments,
            } => write!(
                f,
                "{}.{}({})",
                quoted(namespace),
                quoted(name),
                arguments
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
        }
    }
}

/// A select over one relation, rendered as Postgres SQL.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectQuery {
    pub source: QuerySource,
    pub alias: String,
    pub selections: Vec<(SqlExpr, String)>,
    pub predicates: Vec<Predicate>,
    pub order: Vec<OrderTerm>,
    pub order_is_unique: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Select every column of `table`, each under its own name.
    pub fn new(table: &Table) -> Self {
        let selections = table
            .columns
            .iter()
            .map(|c| (SqlExpr::column(TABLE_ALIAS, &c.name), c.name.clone()))
            .collect();
        Self {
            source: QuerySource::Table {
                namespace: table.namespace.clone(),
                name: table.name.clone(),
            },
            alias: TABLE_ALIAS.to_string(),
            selections,
            predicates: vec![],
            order: vec![],
            order_is_unique: false,
            limit: None,
            offset: None,
        }
    }

    /// A select over the rows returned by a set-returning function.
    pub fn from_procedure(
        namespace: &str,
        name: &str,
        arguments: Vec<Value>,
        returns: &Table,
    ) -> Self {
        let mut query = Self::new(returns);
        query.source = QuerySource::Function {
            namespace: namespace.to_string(),
            name: name.to_string(),
            arguments,
        };
        query
    }
}

impl QueryBuilder for SelectQuery {
    fn table_alias(&self) -> &str {
        &self.alias
    }

    fn order_by(&mut self, expr: SqlExpr, ascending: bool, nulls_first: Option<bool>) {
        self.order.push(OrderTerm {
            expr,
            ascending,
            nulls_first,
        });
    }

    fn set_order_is_unique(&mut self) {
        self.order_is_unique = true;
    }

    fn is_order_unique(&self) -> bool {
        self.order_is_unique
    }

    fn select(&mut self, expr: SqlExpr, alias: String) {
        self.selections.push((expr, alias));
    }

    fn where_(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selection = self
            .selections
            .iter()
            .map(|(expr, alias)| format!("{expr} AS {}", quoted(alias)))
            .collect::<Vec<String>>()
            .join(", ");
        let mut fragments = vec![
            format!("SELECT {selection}"),
            format!("FROM {} AS {}", self.source, self.alias),
        ];

        if !self.predicates.is_empty() {
            fragments.push(format!(
                "WHERE {}",
                self.predicates
                    .iter()
                    .map(|p| format!("({p})"))
                    .collect::<Vec<String>>()
                    .join(" AND ")
            ));
        }
        if !self.order.is_empty() {
            fragments.push(format!(
                "ORDER BY {}",
                self.order
                    .iter()
                    .map(|o| o.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ));
        }
        if let Some(limit) = self.limit {
            fragments.push(format!("LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            fragments.push(format!("OFFSET {offset}"));
        }

        write!(f, "{}", fragments.join(" "))
    }
}
