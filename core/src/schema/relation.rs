use super::{ColumnKind, Entity, table_name};
use crate::changeset::{ChangeSet, Fields, Naming};
use crate::error::{MapError, Result};
use crate::registry::SchemaRegistry;
use crate::value::Value;
use std::any::Any;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Type-erased view of an entity, used where the concrete type is only known
/// through a relation (scan scratch instances, key write-back).
pub trait Record: Any + Send {
    fn entity_name(&self) -> &'static str;

    /// Assigns a scalar column. Returns `false` when the column is unknown or not scalar.
    fn assign(&mut self, column: &str, value: Value) -> Result<bool>;

    /// Decodes raw JSON into a JSON column. Scalar columns receive the text as-is.
    fn assign_json(&mut self, column: &str, raw: &[u8]) -> Result<bool>;

    fn primary_key(&self) -> Value;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<E: Entity> Record for E {
    fn entity_name(&self) -> &'static str {
        E::NAME
    }

    fn assign(&mut self, column: &str, value: Value) -> Result<bool> {
        match E::schema().column(column).map(|c| &c.kind) {
            Some(ColumnKind::Scalar { set, .. }) => set(self, value).map(|_| true),
            _ => Ok(false),
        }
    }

    fn assign_json(&mut self, column: &str, raw: &[u8]) -> Result<bool> {
        match E::schema().column(column).map(|c| &c.kind) {
            Some(ColumnKind::Json { set }) => {
                set(self, raw).map_err(|source| MapError::Decode {
                    entity: E::NAME,
                    column: column.to_owned(),
                    source,
                })?;
                Ok(true)
            }
            Some(ColumnKind::Scalar { set, .. }) => {
                let text = String::from_utf8_lossy(raw).into_owned();
                set(self, Value::Text(text)).map(|_| true)
            }
            _ => Ok(false),
        }
    }

    fn primary_key(&self) -> Value {
        E::schema().primary_key_of(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A column of `E` that embeds another entity type.
pub trait Relation<E>: Send + Sync {
    /// Type name of the related entity.
    fn related(&self) -> &'static str;

    fn related_table(&self) -> String {
        table_name(self.related())
    }

    fn cardinality(&self) -> Cardinality;

    /// Whether `column` of the related entity is declared as JSON.
    fn is_json(&self, column: &str) -> bool;

    fn register(&self, registry: &SchemaRegistry);

    /// Builds a change-set for the related entity and attaches the result to `owner`.
    fn cast_nested(
        &self,
        owner: &mut E,
        registry: &SchemaRegistry,
        fields: Fields,
        naming: Naming,
    ) -> Result<ChangeSet<'static>>;

    /// A default instance of the related entity.
    fn blank(&self) -> Box<dyn Record>;

    /// Attaches a related instance produced by [`Relation::blank`].
    fn attach(&self, owner: &mut E, item: Box<dyn Record>) -> Result<()>;
}

/// Relation to an entity type `R`, stored inside `E` through `attach`.
pub struct Embedded<E, R> {
    cardinality: Cardinality,
    attach: fn(&mut E, R),
    _marker: PhantomData<fn() -> R>,
}

impl<E, R> Embedded<E, R> {
    pub fn new(cardinality: Cardinality, attach: fn(&mut E, R)) -> Self {
        Self {
            cardinality,
            attach,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity, R: Entity> Relation<E> for Embedded<E, R> {
    fn related(&self) -> &'static str {
        R::NAME
    }

    fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    fn is_json(&self, column: &str) -> bool {
        R::schema().column(column).is_some_and(|c| c.is_json())
    }

    fn register(&self, registry: &SchemaRegistry) {
        registry.register::<R>();
    }

    fn cast_nested(
        &self,
        owner: &mut E,
        registry: &SchemaRegistry,
        fields: Fields,
        naming: Naming,
    ) -> Result<ChangeSet<'static>> {
        let mut related = R::default();
        let nested = ChangeSet::detached(&mut related, registry, fields, naming)?;
        (self.attach)(owner, related);
        Ok(nested)
    }

    fn blank(&self) -> Box<dyn Record> {
        Box::new(R::default())
    }

    fn attach(&self, owner: &mut E, item: Box<dyn Record>) -> Result<()> {
        let item = item.into_any().downcast::<R>().map_err(|_| {
            MapError::Mapping(format!(
                "{}: related instance is not a {}",
                E::NAME,
                R::NAME
            ))
        })?;
        (self.attach)(owner, *item);
        Ok(())
    }
}
