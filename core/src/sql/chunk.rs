use super::Token;
use crate::value::Value;
use std::borrow::Cow;
use std::fmt::Write;

/// A SQL chunk represents a part of an SQL statement.
///
/// - `Token` - SQL keywords and operators (SELECT, FROM, =, etc.)
/// - `Ident` - Backtick-quoted identifiers (`table`, `column`)
/// - `Qualified` - Qualified column reference (`table`.`column`)
/// - `Raw` - Unquoted raw SQL text (bare table names, literals)
/// - `Func` - Function name, rendered flush against its argument list
/// - `Param` - Positional placeholder carrying its argument
#[derive(Debug, Clone, PartialEq)]
pub enum SQLChunk<'a> {
    Token(Token),

    /// Renders as: `name`
    Ident(Cow<'a, str>),

    /// Renders as: `table`.`column`, or `column` when the table is empty
    Qualified {
        table: Cow<'a, str>,
        column: Cow<'a, str>,
    },

    /// Renders as-is
    Raw(Cow<'a, str>),

    /// Renders as: NAME, with no space before the following `(`
    Func(&'static str),

    /// Renders as: ?
    Param(Value),
}

impl<'a> SQLChunk<'a> {
    #[inline]
    pub fn ident(name: impl Into<Cow<'a, str>>) -> Self {
        Self::Ident(name.into())
    }

    #[inline]
    pub fn raw(text: impl Into<Cow<'a, str>>) -> Self {
        Self::Raw(text.into())
    }

    #[inline]
    pub fn qualified(table: impl Into<Cow<'a, str>>, column: impl Into<Cow<'a, str>>) -> Self {
        Self::Qualified {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Write chunk content to buffer
    pub(crate) fn write(&self, buf: &mut impl Write) {
        match self {
            SQLChunk::Token(token) => {
                let _ = buf.write_str(token.as_str());
            }
            SQLChunk::Ident(name) => {
                let _ = buf.write_char('`');
                let _ = buf.write_str(name);
                let _ = buf.write_char('`');
            }
            SQLChunk::Qualified { table, column } => {
                if !table.is_empty() {
                    let _ = buf.write_char('`');
                    let _ = buf.write_str(table);
                    let _ = buf.write_str("`.");
                }
                let _ = buf.write_char('`');
                let _ = buf.write_str(column);
                let _ = buf.write_char('`');
            }
            SQLChunk::Raw(text) => {
                let _ = buf.write_str(text);
            }
            SQLChunk::Func(name) => {
                let _ = buf.write_str(name);
            }
            SQLChunk::Param(_) => {
                let _ = buf.write_char('?');
            }
        }
    }

    /// Check if this chunk is "word-like" (needs space separation from other word-like chunks)
    #[inline]
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !matches!(
                t,
                Token::LPAREN
                    | Token::RPAREN
                    | Token::COMMA
                    | Token::DOT
                    | Token::EQ
                    | Token::NE
                    | Token::LT
                    | Token::GT
                    | Token::LE
                    | Token::GE
            ),
            SQLChunk::Ident(_)
            | SQLChunk::Qualified { .. }
            | SQLChunk::Raw(_)
            | SQLChunk::Func(_)
            | SQLChunk::Param(_) => true,
        }
    }
}

/// Canonical spacing logic for SQL chunk rendering.
pub(crate) fn chunk_needs_space(current: &SQLChunk<'_>, next: &SQLChunk<'_>) -> bool {
    // No space if current raw text ends with space
    if let SQLChunk::Raw(text) = current
        && text.ends_with(' ')
    {
        return false;
    }

    // No space if next raw text starts with space
    if let SQLChunk::Raw(text) = next
        && text.starts_with(' ')
    {
        return false;
    }

    match (current, next) {
        // No space before closing/separator punctuation
        (_, SQLChunk::Token(Token::RPAREN | Token::COMMA | Token::DOT)) => false,
        // No space after opening punctuation
        (SQLChunk::Token(Token::LPAREN | Token::DOT), _) => false,
        // Function call: IFNULL(...)
        (SQLChunk::Func(_), SQLChunk::Token(Token::LPAREN)) => false,
        // Space after comma
        (SQLChunk::Token(Token::COMMA), _) => true,
        // Space after closing paren if next is word-like (e.g., ") FROM")
        (SQLChunk::Token(Token::RPAREN), next) => next.is_word_like(),
        // Space before opening paren if preceded by word-like (e.g., "VALUES (")
        (current, SQLChunk::Token(Token::LPAREN)) => current.is_word_like(),
        // Space around comparison operators
        (SQLChunk::Token(t), _) if t.is_operator() => true,
        (_, SQLChunk::Token(t)) if t.is_operator() => true,
        // Space between all word-like chunks
        _ => current.is_word_like() && next.is_word_like(),
    }
}

// ==================== From implementations ====================

impl<'a> From<Token> for SQLChunk<'a> {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl<'a> From<Value> for SQLChunk<'a> {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Param(value)
    }
}
