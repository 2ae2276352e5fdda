//! Single-row write statements rendered from a [`ChangeSet`].

use crate::changeset::{ChangeSet, FieldDescriptor};
use crate::error::{MapError, Result};
use crate::predicate::Predicate;
use crate::schema::PRIMARY_KEY;
use crate::sql::{SQL, SQLChunk, Token};
use crate::value::Value;

fn supplied<'c>(cs: &'c ChangeSet<'_>) -> impl Iterator<Item = &'c FieldDescriptor> {
    cs.supplied_columns()
        .iter()
        .filter_map(|column| cs.descriptor(column))
}

fn literal(descriptor: &FieldDescriptor) -> Value {
    descriptor.literal_value.clone().unwrap_or_default()
}

fn key_column(cs: &ChangeSet<'_>) -> &'static str {
    cs.primary_key_column().unwrap_or(PRIMARY_KEY)
}

/// `WHERE `Id` = ?` bound to the change-set's primary key.
fn key_condition<'a>(cs: &ChangeSet<'_>) -> SQL<'a> {
    SQL::token(Token::WHERE)
        .push(SQLChunk::ident(key_column(cs)))
        .push(Token::EQ)
        .push(cs.primary_key().clone())
}

/// ``INSERT INTO `table` (`a`, `b`) VALUES (?, ?)`` over the supplied columns.
///
/// Relation columns are written under their storage name with the key
/// resolved from the nested change-set or the foreign key passed directly.
pub fn insert_query(cs: &ChangeSet<'_>) -> Result<(String, Vec<Value>)> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for descriptor in supplied(cs) {
        columns.push(SQL::ident(descriptor.storage_name()));
        values.push(literal(descriptor));
    }

    let mut sql = SQL::token(Token::INSERT)
        .push(Token::INTO)
        .push(SQLChunk::ident(cs.table()));

    if columns.is_empty() {
        sql = sql.push(Token::DEFAULT).push(Token::VALUES);
    } else {
        sql = sql
            .append(SQL::join(columns, Token::COMMA).parens())
            .push(Token::VALUES)
            .append(SQL::param_list(values));
    }
    let built = sql.build();
    crate::relmap_trace_query!(&built.0, built.1.len());
    Ok(built)
}

/// ``UPDATE table SET `a` = ? WHERE `Id` = ?``, optionally narrowed by `extra`.
///
/// A relation column whose key resolves to the zero value is cleared with a
/// literal `NULL` instead of a bound argument.
pub fn update_query(cs: &ChangeSet<'_>, extra: Option<&Predicate>) -> Result<(String, Vec<Value>)> {
    let key = key_column(cs);
    let assignments: Vec<SQL<'_>> = supplied(cs)
        .filter(|descriptor| descriptor.column != key)
        .map(|descriptor| {
            let value = literal(descriptor);
            let target = SQL::ident(descriptor.storage_name()).push(Token::EQ);
            if descriptor.is_relation() && value.is_default() {
                target.push(Token::NULL)
            } else {
                target.push(value)
            }
        })
        .collect();

    if assignments.is_empty() {
        return Err(MapError::Statement(format!(
            "update of {} has no supplied columns",
            cs.entity()
        )));
    }

    let mut sql = SQL::token(Token::UPDATE)
        .push(SQLChunk::raw(cs.table()))
        .push(Token::SET)
        .append(SQL::join(assignments, Token::COMMA))
        .append(key_condition(cs));

    if let Some(extra) = extra.filter(|p| !p.is_empty()) {
        let condition = match extra {
            Predicate::Or(_) => extra.to_sql().parens(),
            _ => extra.to_sql(),
        };
        sql = sql.push(Token::AND).append(condition);
    }

    let built = sql.build();
    crate::relmap_trace_query!(&built.0, built.1.len());
    Ok(built)
}

/// ``DELETE FROM `table` WHERE `Id` = ?``.
pub fn delete_query(cs: &ChangeSet<'_>) -> Result<(String, Vec<Value>)> {
    let sql = SQL::token(Token::DELETE)
        .push(Token::FROM)
        .push(SQLChunk::ident(cs.table()))
        .append(key_condition(cs));
    let built = sql.build();
    crate::relmap_trace_query!(&built.0, built.1.len());
    Ok(built)
}
