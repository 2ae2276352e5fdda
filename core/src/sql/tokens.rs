/// SQL keywords, operators and punctuation.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // Statements
    SELECT,
    INSERT,
    INTO,
    VALUES,
    DEFAULT,
    UPDATE,
    SET,
    DELETE,
    FROM,
    WHERE,

    // Joins
    INNER,
    LEFT,
    RIGHT,
    JOIN,
    ON,
    AS,

    // Ordering
    ORDER,
    BY,
    ASC,
    DESC,
    LIMIT,

    // Logical
    AND,
    OR,
    NOT,
    IS,
    NULL,
    IN,
    LIKE,

    // Punctuation
    LPAREN,
    RPAREN,
    COMMA,
    DOT,
    STAR,

    // Comparison
    EQ,
    NE,
    LT,
    LE,
    GT,
    GE,
}

impl Token {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::INSERT => "INSERT",
            Token::INTO => "INTO",
            Token::VALUES => "VALUES",
            Token::DEFAULT => "DEFAULT",
            Token::UPDATE => "UPDATE",
            Token::SET => "SET",
            Token::DELETE => "DELETE",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::INNER => "INNER",
            Token::LEFT => "LEFT",
            Token::RIGHT => "RIGHT",
            Token::JOIN => "JOIN",
            Token::ON => "ON",
            Token::AS => "AS",
            Token::ORDER => "ORDER",
            Token::BY => "BY",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::LIMIT => "LIMIT",
            Token::AND => "AND",
            Token::OR => "OR",
            Token::NOT => "NOT",
            Token::IS => "IS",
            Token::NULL => "NULL",
            Token::IN => "IN",
            Token::LIKE => "LIKE",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
            Token::DOT => ".",
            Token::STAR => "*",
            Token::EQ => "=",
            Token::NE => "!=",
            Token::LT => "<",
            Token::LE => "<=",
            Token::GT => ">",
            Token::GE => ">=",
        }
    }

    #[inline]
    pub const fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::EQ | Token::NE | Token::LT | Token::LE | Token::GT | Token::GE
        )
    }
}
