//! Core mapping engine: schema descriptors, change-sets, predicate trees,
//! query and join rendering, row scanning and write statements.
//!
//! Nothing here talks to a database. Drivers hand rendered `(sql, args)`
//! pairs to a connection and feed result rows back through [`scan::RowSource`].

pub mod changeset;
pub mod error;
pub mod predicate;
pub mod query;
pub mod registry;
pub mod scan;
pub mod schema;
pub mod sql;
pub mod statement;
mod tracing;
pub mod value;

pub use changeset::{Action, ChangeSet, FieldDescriptor, Fields, Input, Message};
pub use error::{ErrorKind, MapError, Result};
pub use predicate::{Op, Predicate};
pub use query::join::{JoinKind, JoinPlanner, RelationEdge};
pub use query::{Col, OrderBy, Preload, QueryBuilder, col};
pub use registry::SchemaRegistry;
pub use scan::{RowScanner, RowSource, Rows};
pub use schema::{Entity, Field, Schema};
pub use sql::{SQL, SQLChunk, Token};
pub use statement::{delete_query, insert_query, update_query};
pub use value::{FromValue, Value};

pub mod prelude {
    pub use crate::changeset::{ChangeSet, Fields, Input, Message};
    pub use crate::error::{MapError, Result};
    pub use crate::predicate::{Op, Predicate, and, or, or_p, p, p_in, p_not_null, p_null};
    pub use crate::query::join::{JoinKind, JoinPlanner, RelationEdge};
    pub use crate::query::{Col, DateTimeConverter, IfNull, OrderBy, Preload, QueryBuilder, col};
    pub use crate::registry::SchemaRegistry;
    pub use crate::scan::{RowScanner, RowSource, Rows};
    pub use crate::schema::{Cardinality, Entity, Field, Schema};
    pub use crate::value::{FromValue, Value};
}
