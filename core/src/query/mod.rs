//! SELECT statement composition.

pub mod join;

pub use join::*;

use crate::predicate::Predicate;
use crate::schema::{ColumnKind, Entity};
use crate::sql::{SQL, SQLChunk, Token};
use crate::value::Value;

/// Replacement for `NULL` in a projected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfNull {
    /// `IFNULL(col, 0)`
    Zero,
    /// `IFNULL(col, '')`
    Empty,
}

/// Time-zone conversion followed by textual formatting of a stored UTC value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTimeConverter {
    /// Target offset, e.g. `+07:00`.
    pub time_zone: Option<String>,
    /// `DATE_FORMAT` pattern, e.g. `%Y-%m-%d`.
    pub format: Option<String>,
}

impl DateTimeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_zone(mut self, offset: impl Into<String>) -> Self {
        self.time_zone = Some(offset.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Single-quoted SQL string literal.
fn literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// A projected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Col {
    pub name: String,
    pub table: String,
    pub alias: Option<String>,
    pub if_null: Option<IfNull>,
    pub date: Option<DateTimeConverter>,
}

pub fn col(name: impl Into<String>, table: impl Into<String>) -> Col {
    Col {
        name: name.into(),
        table: table.into(),
        alias: None,
        if_null: None,
        date: None,
    }
}

impl Col {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn if_null(mut self, replacement: IfNull) -> Self {
        self.if_null = Some(replacement);
        self
    }

    pub fn date(mut self, converter: DateTimeConverter) -> Self {
        self.date = Some(converter);
        self
    }

    /// Name of the column in the result set.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn is_wrapped(&self) -> bool {
        self.if_null.is_some()
            || self
                .date
                .as_ref()
                .is_some_and(|d| d.time_zone.is_some() || d.format.is_some())
    }

    /// The column expression with coalescing and date pipeline applied.
    pub fn expr(&self) -> SQL<'_> {
        let mut expr = SQL::qualified(self.table.as_str(), self.name.as_str());

        if let Some(date) = &self.date {
            if let Some(zone) = &date.time_zone {
                expr = SQL::func(
                    "CONVERT_TZ",
                    expr.push(Token::COMMA)
                        .push(SQLChunk::raw("'+00:00'"))
                        .push(Token::COMMA)
                        .push(SQLChunk::raw(literal(zone))),
                );
            }
            if let Some(format) = &date.format {
                expr = SQL::func(
                    "DATE_FORMAT",
                    expr.push(Token::COMMA).push(SQLChunk::raw(literal(format))),
                );
            }
        }

        match self.if_null {
            Some(IfNull::Zero) => {
                SQL::func("IFNULL", expr.push(Token::COMMA).push(SQLChunk::raw("0")))
            }
            Some(IfNull::Empty) => {
                SQL::func("IFNULL", expr.push(Token::COMMA).push(SQLChunk::raw("''")))
            }
            None => expr,
        }
    }

    /// `expr [AS alias]`; wrapped expressions are always aliased back to their output name.
    pub fn to_sql(&self) -> SQL<'_> {
        let expr = self.expr();
        if self.alias.is_some() || self.is_wrapped() {
            expr.alias(self.output_name())
        } else {
            expr
        }
    }
}

/// `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub table: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: table.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: table.into(),
            descending: true,
        }
    }

    fn to_sql(&self) -> SQL<'_> {
        SQL::qualified(self.table.as_str(), self.column.as_str()).push(if self.descending {
            Token::DESC
        } else {
            Token::ASC
        })
    }
}

/// Flat join of a related table onto the builder's root table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preload {
    pub table: String,
    /// Column of the root table.
    pub local_key: String,
    /// Column of the joined table.
    pub foreign_key: String,
    pub kind: JoinKind,
}

impl Preload {
    pub fn new(
        table: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
            kind: JoinKind::Inner,
        }
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Swaps which side holds the key, for joins walked child to parent.
    pub fn inverse(mut self) -> Self {
        std::mem::swap(&mut self.local_key, &mut self.foreign_key);
        self
    }

    fn to_sql<'a>(&'a self, root: &'a str) -> SQL<'a> {
        self.kind
            .to_sql()
            .push(SQLChunk::ident(self.table.as_str()))
            .push(Token::ON)
            .push(SQLChunk::qualified(root, self.local_key.as_str()))
            .push(Token::EQ)
            .push(SQLChunk::qualified(
                self.table.as_str(),
                self.foreign_key.as_str(),
            ))
    }
}

/// Composes `SELECT <projection> FROM <table> [JOIN ...] [WHERE ...] [ORDER BY ...] [LIMIT n]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    table: String,
    projection: Vec<Col>,
    preloads: Vec<Preload>,
    predicate: Option<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Root table of `E`, projecting its scalar and JSON columns.
    pub fn for_entity<E: Entity>() -> Self {
        let schema = E::schema();
        let table = schema.table();
        let projection = schema
            .columns()
            .iter()
            .filter(|c| matches!(c.kind, ColumnKind::Scalar { .. } | ColumnKind::Json { .. }))
            .map(|c| col(c.name(), table))
            .collect();
        Self {
            table: table.to_owned(),
            projection,
            ..Self::default()
        }
    }

    /// Replaces the projection.
    pub fn select(mut self, columns: impl IntoIterator<Item = Col>) -> Self {
        self.projection = columns.into_iter().collect();
        self
    }

    pub fn column(mut self, column: Col) -> Self {
        self.projection.push(column);
        self
    }

    pub fn join(mut self, preload: Preload) -> Self {
        self.preloads.push(preload);
        self
    }

    /// Adds a predicate, attaching it with its own conjunction.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.attach(predicate),
            None => predicate,
        });
        self
    }

    pub fn clear_where(mut self) -> Self {
        self.predicate = None;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Appends the projection, joins and ordering of `other` and ANDs its predicate.
    pub fn merge(mut self, other: QueryBuilder) -> Self {
        self.projection.extend(other.projection);
        self.preloads.extend(other.preloads);
        self.order_by.extend(other.order_by);
        if let Some(predicate) = other.predicate {
            self.predicate = Some(match self.predicate.take() {
                Some(existing) => existing.and(predicate),
                None => predicate,
            });
        }
        self
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[inline]
    pub fn projection(&self) -> &[Col] {
        &self.projection
    }

    #[inline]
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn is_ordered(&self) -> bool {
        !self.order_by.is_empty()
    }

    /// Comma-separated projection, `*` when empty.
    pub fn projection_sql(&self) -> SQL<'_> {
        if self.projection.is_empty() {
            return SQL::token(Token::STAR);
        }
        SQL::join(self.projection.iter().map(Col::to_sql), Token::COMMA)
    }

    pub(crate) fn where_sql(&self) -> SQL<'_> {
        self.predicate
            .as_ref()
            .map(Predicate::to_where)
            .unwrap_or_default()
    }

    /// `ORDER BY ...` and `LIMIT n`, when present.
    pub(crate) fn tail_sql(&self) -> SQL<'_> {
        let mut sql = SQL::empty();
        if !self.order_by.is_empty() {
            sql.push_mut(Token::ORDER);
            sql.push_mut(Token::BY);
            sql.append_mut(SQL::join(
                self.order_by.iter().map(OrderBy::to_sql),
                Token::COMMA,
            ));
        }
        if let Some(limit) = self.limit {
            sql.push_mut(Token::LIMIT);
            sql.push_mut(SQLChunk::raw(limit.to_string()));
        }
        sql
    }

    pub fn to_sql(&self) -> SQL<'_> {
        let mut sql = SQL::token(Token::SELECT)
            .append(self.projection_sql())
            .push(Token::FROM)
            .push(SQLChunk::ident(self.table.as_str()));
        for preload in &self.preloads {
            sql.append_mut(preload.to_sql(&self.table));
        }
        sql.append(self.where_sql()).append(self.tail_sql())
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        self.to_sql().build()
    }
}
