//! Predicate trees compiled to `WHERE` clauses.
//!
//! Leaves are single comparisons. `And`/`Or` nodes join their children, and
//! any composite child is parenthesized when compiled, so
//! `and([p(a), or([p(b), p(c)]), p(d)])` renders as `a AND (b OR c) AND d`.

use crate::sql::{SQL, Token};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    IsNull,
    IsNotNull,
}

/// How a predicate attaches when appended to an existing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub column: String,
    /// Empty for an unqualified column.
    pub table: String,
    pub op: Op,
    pub operands: Vec<Value>,
    pub conjunction: Conjunction,
}

impl Term {
    fn to_sql(&self) -> SQL<'_> {
        let column = SQL::qualified(self.table.as_str(), self.column.as_str());
        let comparison = |token: Token| {
            let operand = self.operands.first().cloned().unwrap_or_default();
            SQL::token(token).append(SQL::param(operand))
        };
        match self.op {
            Op::Eq => column.append(comparison(Token::EQ)),
            Op::Ne => column.append(comparison(Token::NE)),
            Op::Lt => column.append(comparison(Token::LT)),
            Op::Le => column.append(comparison(Token::LE)),
            Op::Gt => column.append(comparison(Token::GT)),
            Op::Ge => column.append(comparison(Token::GE)),
            Op::Like => column.append(comparison(Token::LIKE)),
            Op::In if self.operands.is_empty() => column
                .push(Token::IN)
                .append(SQL::token(Token::NULL).parens()),
            Op::In => column
                .push(Token::IN)
                .append(SQL::param_list(self.operands.iter().cloned())),
            Op::IsNull => column.push(Token::IS).push(Token::NULL),
            Op::IsNotNull => column.push(Token::IS).push(Token::NOT).push(Token::NULL),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(Term),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

fn term(column: &str, table: &str, op: Op, operands: Vec<Value>, conjunction: Conjunction) -> Predicate {
    Predicate::Leaf(Term {
        column: column.to_owned(),
        table: table.to_owned(),
        op,
        operands,
        conjunction,
    })
}

/// Single comparison that attaches with AND.
pub fn p(column: &str, table: &str, op: Op, operand: impl Into<Value>) -> Predicate {
    term(column, table, op, vec![operand.into()], Conjunction::And)
}

/// Single comparison that attaches with OR.
pub fn or_p(column: &str, table: &str, op: Op, operand: impl Into<Value>) -> Predicate {
    term(column, table, op, vec![operand.into()], Conjunction::Or)
}

/// `column IN (...)`, attaching with AND.
pub fn p_in<V: Into<Value>>(
    column: &str,
    table: &str,
    operands: impl IntoIterator<Item = V>,
) -> Predicate {
    let operands = operands.into_iter().map(Into::into).collect();
    term(column, table, Op::In, operands, Conjunction::And)
}

/// `column IS NULL`, attaching with AND.
pub fn p_null(column: &str, table: &str) -> Predicate {
    term(column, table, Op::IsNull, Vec::new(), Conjunction::And)
}

/// `column IS NOT NULL`, attaching with AND.
pub fn p_not_null(column: &str, table: &str) -> Predicate {
    term(column, table, Op::IsNotNull, Vec::new(), Conjunction::And)
}

/// Conjunction of `predicates`. Nested `And` children are merged and a single
/// child is returned as-is.
pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut children = Vec::new();
    for predicate in predicates {
        match predicate {
            Predicate::And(inner) => children.extend(inner),
            other => children.push(other),
        }
    }
    if children.len() == 1 {
        return children.remove(0);
    }
    Predicate::And(children)
}

/// Disjunction of `predicates`. Nested `Or` children are merged and a single
/// child is returned as-is.
pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut children = Vec::new();
    for predicate in predicates {
        match predicate {
            Predicate::Or(inner) => children.extend(inner),
            other => children.push(other),
        }
    }
    if children.len() == 1 {
        return children.remove(0);
    }
    Predicate::Or(children)
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        and([self, other])
    }

    pub fn or(self, other: Predicate) -> Predicate {
        or([self, other])
    }

    /// Leaves carry their own conjunction; composites attach with AND.
    pub fn conjunction(&self) -> Conjunction {
        match self {
            Predicate::Leaf(term) => term.conjunction,
            Predicate::And(_) | Predicate::Or(_) => Conjunction::And,
        }
    }

    /// Appends `next` using `next`'s conjunction.
    pub fn attach(self, next: Predicate) -> Predicate {
        match next.conjunction() {
            Conjunction::And => self.and(next),
            Conjunction::Or => self.or(next),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Leaf(_) => false,
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().all(Predicate::is_empty)
            }
        }
    }

    /// Number of placeholders the compiled predicate binds.
    pub fn param_count(&self) -> usize {
        match self {
            Predicate::Leaf(term) => match term.op {
                Op::IsNull | Op::IsNotNull => 0,
                Op::In => term.operands.len(),
                _ => 1,
            },
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::param_count).sum()
            }
        }
    }

    pub fn to_sql(&self) -> SQL<'_> {
        match self {
            Predicate::Leaf(term) => term.to_sql(),
            Predicate::And(children) => Self::join(children, Token::AND),
            Predicate::Or(children) => Self::join(children, Token::OR),
        }
    }

    /// `WHERE <predicate>`, or nothing for an empty tree.
    pub fn to_where(&self) -> SQL<'_> {
        if self.is_empty() {
            return SQL::empty();
        }
        SQL::token(Token::WHERE).append(self.to_sql())
    }

    fn join(children: &[Predicate], separator: Token) -> SQL<'_> {
        SQL::join(
            children
                .iter()
                .filter(|child| !child.is_empty())
                .map(Predicate::grouped),
            separator,
        )
    }

    fn grouped(&self) -> SQL<'_> {
        match self {
            Predicate::Leaf(_) => self.to_sql(),
            Predicate::And(children) | Predicate::Or(children)
                if children.iter().filter(|c| !c.is_empty()).count() > 1 =>
            {
                self.to_sql().parens()
            }
            _ => self.to_sql(),
        }
    }
}

impl From<Term> for Predicate {
    fn from(value: Term) -> Self {
        Predicate::Leaf(value)
    }
}
