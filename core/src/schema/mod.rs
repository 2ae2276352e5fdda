//! Explicit per-entity schema descriptors.
//!
//! Every entity type declares its columns once, in declaration order, with a
//! typed accessor/setter pair (or a relation) per column. The descriptor is
//! built lazily and shared for the lifetime of the process:
//!
//! ```ignore
//! impl Entity for Widget {
//!     const NAME: &'static str = "Widget";
//!
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: OnceLock<Schema<Widget>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::<Widget>::builder()
//!                 .scalar(Field::new("Id").auto_increment(), |w| w.id.into(), |w, v| {
//!                     w.id = v.decode()?;
//!                     Ok(())
//!                 })
//!                 .build()
//!         })
//!     }
//! }
//! ```

mod relation;

pub use relation::*;

use crate::error::Result;
use crate::value::Value;

/// Primary key column shared by every table.
pub const PRIMARY_KEY: &str = "Id";

/// Table name for an entity type: lower-cased type name plus `s`.
pub fn table_name(entity: &str) -> String {
    let mut table = entity.to_lowercase();
    table.push('s');
    table
}

/// A mapped entity type.
pub trait Entity: Default + Send + Sync + 'static {
    /// Type name, used for message prefixes, registry keys and table names.
    const NAME: &'static str;

    fn schema() -> &'static Schema<Self>;
}

/// Column flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub auto_increment: bool,
    pub nullable: bool,
    pub not_nullable: bool,
    pub json: bool,
}

impl Flags {
    /// Not-nullable columns that the database does not generate must be supplied on insert.
    #[inline]
    pub const fn is_required(&self) -> bool {
        self.not_nullable && !self.auto_increment
    }
}

/// Declared metadata of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub flags: Flags,
    /// Character ceiling for text values; `None` means unlimited.
    pub max_size: Option<usize>,
    pub date_format: Option<&'static str>,
    /// Column of the related entity that a relation column stores, e.g. `Id`.
    pub relation_column: Option<&'static str>,
}

impl Field {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            flags: Flags {
                auto_increment: false,
                nullable: false,
                not_nullable: false,
                json: false,
            },
            max_size: None,
            date_format: None,
            relation_column: None,
        }
    }

    pub const fn auto_increment(mut self) -> Self {
        self.flags.auto_increment = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.flags.nullable = true;
        self.flags.not_nullable = false;
        self
    }

    pub const fn not_nullable(mut self) -> Self {
        self.flags.not_nullable = true;
        self.flags.nullable = false;
        self
    }

    pub const fn max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub const fn date_format(mut self, format: &'static str) -> Self {
        self.date_format = Some(format);
        self
    }

    pub const fn relation_column(mut self, column: &'static str) -> Self {
        self.relation_column = Some(column);
        self
    }
}

pub type Getter<E> = fn(&E) -> Value;
pub type Setter<E> = fn(&mut E, Value) -> Result<()>;
pub type JsonSetter<E> = fn(&mut E, &[u8]) -> serde_json::Result<()>;

/// How a column's data reaches the entity.
pub enum ColumnKind<E> {
    Scalar { get: Getter<E>, set: Setter<E> },
    Json { set: JsonSetter<E> },
    OneToOne(Box<dyn Relation<E>>),
    OneToMany(Box<dyn Relation<E>>),
}

impl<E> std::fmt::Debug for ColumnKind<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Scalar { .. } => f.write_str("Scalar"),
            ColumnKind::Json { .. } => f.write_str("Json"),
            ColumnKind::OneToOne(rel) => f.debug_tuple("OneToOne").field(&rel.related()).finish(),
            ColumnKind::OneToMany(rel) => {
                f.debug_tuple("OneToMany").field(&rel.related()).finish()
            }
        }
    }
}

#[derive(Debug)]
pub struct Column<E> {
    pub field: Field,
    pub kind: ColumnKind<E>,
}

impl<E> Column<E> {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.field.name
    }

    pub fn relation(&self) -> Option<&dyn Relation<E>> {
        match &self.kind {
            ColumnKind::OneToOne(rel) | ColumnKind::OneToMany(rel) => Some(rel.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_json(&self) -> bool {
        matches!(self.kind, ColumnKind::Json { .. })
    }
}

/// The column layout of one entity type.
#[derive(Debug)]
pub struct Schema<E> {
    name: &'static str,
    table: String,
    primary_key: Option<usize>,
    columns: Vec<Column<E>>,
}

impl<E: Entity> Schema<E> {
    pub fn builder() -> SchemaBuilder<E> {
        SchemaBuilder {
            table: table_name(E::NAME),
            columns: Vec::new(),
        }
    }
}

impl<E> Schema<E> {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in declaration order.
    #[inline]
    pub fn columns(&self) -> &[Column<E>] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.field.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column<E>> {
        self.columns.iter().find(|c| c.field.name == name)
    }

    pub fn primary_key(&self) -> Option<&Column<E>> {
        self.primary_key.map(|i| &self.columns[i])
    }

    /// Reads the primary key from an entity, `NULL` when the schema has none.
    pub fn primary_key_of(&self, entity: &E) -> Value {
        match self.primary_key().map(|c| &c.kind) {
            Some(ColumnKind::Scalar { get, .. }) => get(entity),
            _ => Value::Null,
        }
    }

    pub fn json_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter(|c| c.is_json()).map(|c| c.field.name)
    }
}

pub struct SchemaBuilder<E> {
    table: String,
    columns: Vec<Column<E>>,
}

impl<E: Entity> SchemaBuilder<E> {
    /// Overrides the derived table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn scalar(mut self, field: Field, get: Getter<E>, set: Setter<E>) -> Self {
        self.columns.push(Column {
            field,
            kind: ColumnKind::Scalar { get, set },
        });
        self
    }

    pub fn json(mut self, mut field: Field, set: JsonSetter<E>) -> Self {
        field.flags.json = true;
        self.columns.push(Column {
            field,
            kind: ColumnKind::Json { set },
        });
        self
    }

    /// Embedded single related entity.
    pub fn one_to_one<R: Entity>(mut self, field: Field, attach: fn(&mut E, R)) -> Self {
        self.columns.push(Column {
            field,
            kind: ColumnKind::OneToOne(Box::new(Embedded::<E, R>::new(
                Cardinality::One,
                attach,
            ))),
        });
        self
    }

    /// Embedded ordered collection of related entities; `attach` appends.
    pub fn one_to_many<R: Entity>(mut self, field: Field, attach: fn(&mut E, R)) -> Self {
        self.columns.push(Column {
            field,
            kind: ColumnKind::OneToMany(Box::new(Embedded::<E, R>::new(
                Cardinality::Many,
                attach,
            ))),
        });
        self
    }

    pub fn build(self) -> Schema<E> {
        let primary_key = self
            .columns
            .iter()
            .position(|c| c.field.name == PRIMARY_KEY && matches!(c.kind, ColumnKind::Scalar { .. }));
        Schema {
            name: E::NAME,
            table: self.table,
            primary_key,
            columns: self.columns,
        }
    }
}
