//! Multi-level join planning.
//!
//! A chain of [`RelationEdge`]s is turned into a single statement in which
//! every edge below the root is reached through a nested subquery aliased
//! `r_<n>`. Each level keeps its own projection and `WHERE` scope, and every
//! column of a deeper level is re-exposed under its output name so the root
//! row carries `<Relation>$<Column>` names the row scanner can split.

use super::{Col, QueryBuilder};
use crate::error::{MapError, Result};
use crate::sql::{SQL, SQLChunk, Token};
use crate::value::Value;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn to_sql<'a>(self) -> SQL<'a> {
        match self {
            JoinKind::Inner => SQL::token(Token::INNER).push(Token::JOIN),
            JoinKind::Left => SQL::token(Token::LEFT).push(Token::JOIN),
            JoinKind::Right => SQL::token(Token::RIGHT).push(Token::JOIN),
        }
    }
}

/// Parent-to-child join edge: `from.from_key = to.to_key`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEdge {
    pub from: String,
    pub to: String,
    pub from_key: String,
    pub to_key: String,
    pub kind: JoinKind,
    /// Projection, predicate and (for the root edge) ordering of this level.
    pub builder: Option<QueryBuilder>,
}

impl RelationEdge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        from_key: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_key: from_key.into(),
            to_key: to_key.into(),
            kind: JoinKind::Inner,
            builder: None,
        }
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = Some(builder);
        self
    }

    fn reverse(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
        std::mem::swap(&mut self.from_key, &mut self.to_key);
    }
}

/// An edge after direction normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEdge {
    pub parent: String,
    pub child: String,
    pub parent_key: String,
    pub child_key: String,
    pub kind: JoinKind,
    /// Subquery alias through which the child is reached; `None` for the last edge.
    pub alias: Option<String>,
    pub builder: Option<QueryBuilder>,
}

impl PlannedEdge {
    /// The table or alias joined at this level.
    pub fn target(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.child)
    }

    fn projection(&self) -> &[Col] {
        self.builder.as_ref().map(|b| b.projection()).unwrap_or_default()
    }
}

/// Output name of a column projected below the root: explicit alias, or `<table>$<column>`.
fn nested_output_name(col: &Col) -> Cow<'_, str> {
    match &col.alias {
        Some(alias) => Cow::Borrowed(alias.as_str()),
        None => Cow::Owned(format!("{}${}", col.table, col.name)),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPlanner {
    edges: Vec<RelationEdge>,
}

impl JoinPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next edge of the chain.
    pub fn rel(mut self, edge: RelationEdge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn edges(&self) -> &[RelationEdge] {
        &self.edges
    }

    /// Whether the root level requests an ordering.
    pub fn is_ordered(&self) -> bool {
        self.edges
            .first()
            .and_then(|e| e.builder.as_ref())
            .is_some_and(QueryBuilder::is_ordered)
    }

    /// Orients every edge so the chain reads parent to child.
    ///
    /// Walking left to right, edge `i - 1` is reversed when edge `i` starts at
    /// the same table as edge `i - 1`, or ends at edge `i - 1`'s start. The
    /// last edge keeps its authored direction.
    pub fn normalize(&self) -> Vec<PlannedEdge> {
        let mut edges = self.edges.clone();
        for i in 1..edges.len() {
            let (done, rest) = edges.split_at_mut(i);
            let previous = &mut done[i - 1];
            let current = &rest[0];
            if current.from == previous.from || current.to == previous.from {
                previous.reverse();
            }
        }

        let last = edges.len().saturating_sub(1);
        edges
            .into_iter()
            .enumerate()
            .map(|(i, edge)| PlannedEdge {
                parent: edge.from,
                child: edge.to,
                parent_key: edge.from_key,
                child_key: edge.to_key,
                kind: edge.kind,
                alias: (i < last).then(|| format!("r_{}", i + 1)),
                builder: edge.builder,
            })
            .collect()
    }

    /// Renders the planned statement and its arguments.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        if self.edges.is_empty() {
            return Err(MapError::Statement("join planner has no edges".into()));
        }
        let planned = self.normalize();
        Ok(emit(&planned, 0).build())
    }
}

/// Emits level `index` of the chain, recursing into deeper levels.
fn emit(edges: &[PlannedEdge], index: usize) -> SQL<'_> {
    let edge = &edges[index];
    let is_root = index == 0;
    let mut columns: Vec<SQL<'_>> = Vec::new();

    // Deeper columns, re-exposed from the subquery joined at this level.
    if let Some(alias) = edge.alias.as_deref() {
        for deeper in &edges[index + 1..] {
            for col in deeper.projection() {
                let name = nested_output_name(col);
                let reselect = SQL::qualified(alias, name.clone());
                columns.push(if is_root { reselect.alias(name) } else { reselect });
            }
        }
    }

    for col in edge.projection() {
        columns.push(if is_root {
            col.to_sql()
        } else {
            col.expr().alias(nested_output_name(col))
        });
    }

    if !is_root {
        let above = &edges[index - 1];
        columns.push(SQL::qualified(edge.parent.as_str(), above.child_key.as_str()));
    }

    let projection = if columns.is_empty() {
        SQL::token(Token::STAR)
    } else {
        SQL::join(columns, Token::COMMA)
    };

    let mut sql = SQL::token(Token::SELECT)
        .append(projection)
        .push(Token::FROM)
        .push(SQLChunk::ident(edge.parent.as_str()))
        .append(edge.kind.to_sql());

    match edge.alias.as_deref() {
        Some(alias) => {
            sql = sql
                .append(emit(edges, index + 1).parens())
                .push(Token::AS)
                .push(SQLChunk::ident(alias));
        }
        None => sql.push_mut(SQLChunk::ident(edge.child.as_str())),
    }

    sql = sql
        .push(Token::ON)
        .push(SQLChunk::qualified(edge.parent.as_str(), edge.parent_key.as_str()))
        .push(Token::EQ)
        .push(SQLChunk::qualified(edge.target(), edge.child_key.as_str()));

    if let Some(builder) = &edge.builder {
        sql.append_mut(builder.where_sql());
        if is_root {
            sql.append_mut(builder.tail_sql());
        }
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Op, p};
    use crate::query::{OrderBy, col};

    #[test]
    fn single_edge_joins_the_table_directly() {
        let planner = JoinPlanner::new().rel(
            RelationEdge::new("products", "producttypes", "ProductTypeId", "Id").builder(
                QueryBuilder::new("products").select([
                    col("Id", "products"),
                    col("Name", "producttypes").alias("ProductTypeRel$Name"),
                ]),
            ),
        );
        let (sql, params) = planner.build().unwrap();
        assert_eq!(
            sql,
            "SELECT `products`.`Id`, `producttypes`.`Name` AS `ProductTypeRel$Name` \
             FROM `products` INNER JOIN `producttypes` \
             ON `products`.`ProductTypeId` = `producttypes`.`Id`"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn normalization_reverses_interior_edges_only() {
        let planner = JoinPlanner::new()
            .rel(RelationEdge::new("b", "a", "Id", "BId"))
            .rel(RelationEdge::new("b", "c", "CId", "Id"));
        let planned = planner.normalize();

        assert_eq!(planned[0].parent, "a");
        assert_eq!(planned[0].child, "b");
        assert_eq!(planned[0].parent_key, "BId");
        assert_eq!(planned[0].child_key, "Id");
        assert_eq!(planned[0].alias.as_deref(), Some("r_1"));

        assert_eq!(planned[1].parent, "b");
        assert_eq!(planned[1].child, "c");
        assert_eq!(planned[1].alias, None);
    }

    #[test]
    fn three_edges_nest_two_subqueries() {
        let planner = JoinPlanner::new()
            .rel(
                RelationEdge::new("a", "b", "BId", "Id").builder(
                    QueryBuilder::new("a")
                        .select([col("Id", "a"), col("Name", "a")])
                        .filter(p("Name", "a", Op::Like, "x%"))
                        .order_by(OrderBy::asc("Id", "a")),
                ),
            )
            .rel(
                RelationEdge::new("b", "c", "CId", "Id")
                    .kind(JoinKind::Left)
                    .builder(QueryBuilder::new("b").select([col("Name", "b")])),
            )
            .rel(
                RelationEdge::new("c", "d", "DId", "Id").builder(
                    QueryBuilder::new("c")
                        .select([col("Name", "c"), col("Name", "d").alias("DRel$Name")])
                        .filter(p("Active", "d", Op::Eq, 1)),
                ),
            );

        let (sql, params) = planner.build().unwrap();
        assert_eq!(sql.matches("(SELECT").count(), 2);
        assert_eq!(
            sql,
            "SELECT `r_1`.`b$Name` AS `b$Name`, `r_1`.`c$Name` AS `c$Name`, \
             `r_1`.`DRel$Name` AS `DRel$Name`, `a`.`Id`, `a`.`Name` \
             FROM `a` INNER JOIN (\
             SELECT `r_2`.`c$Name`, `r_2`.`DRel$Name`, `b`.`Name` AS `b$Name`, `b`.`Id` \
             FROM `b` LEFT JOIN (\
             SELECT `c`.`Name` AS `c$Name`, `d`.`Name` AS `DRel$Name`, `c`.`Id` \
             FROM `c` INNER JOIN `d` ON `c`.`DId` = `d`.`Id` WHERE `d`.`Active` = ?\
             ) AS `r_2` ON `b`.`CId` = `r_2`.`Id`\
             ) AS `r_1` ON `a`.`BId` = `r_1`.`Id` \
             WHERE `a`.`Name` LIKE ? ORDER BY `a`.`Id` ASC"
        );
        assert_eq!(params, vec![Value::Integer(1), Value::from("x%")]);
        assert!(planner.is_ordered());
    }

    #[test]
    fn empty_planner_is_an_error() {
        assert!(JoinPlanner::new().build().is_err());
    }
}
