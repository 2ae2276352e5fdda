//! Change-sets: the column-scoped delta persisted by one statement.
//!
//! A change-set is built from an entity plus either a [`Message`] (fields
//! named `<EntityName><ColumnName>`) or bare [`Fields`]. Supplied values are
//! applied to the entity through its schema setters and recorded as literal
//! values on per-column [`FieldDescriptor`]s; a bitmask tracks required
//! columns that still lack a non-default value.

mod input;

pub use input::*;

use crate::error::{MapError, Result};
use crate::predicate::{Op, Predicate, and, p};
use crate::registry::SchemaRegistry;
use crate::schema::{Column, ColumnKind, Entity, Flags, Record};
use crate::value::Value;
use bit_vec::BitVec;
use hashbrown::HashMap;
use std::fmt;

/// What a change-set was last used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Insert,
    Update,
    Delete,
    Select,
}

/// Per-column metadata and the literal value supplied for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub column: &'static str,
    /// Position within this change-set's bitmask.
    pub ordinal_id: u32,
    pub flags: Flags,
    pub max_size: Option<usize>,
    pub literal_value: Option<Value>,
    /// Type name of the embedded entity, for relation columns.
    pub embedded_entity: Option<&'static str>,
    pub relation_column: Option<&'static str>,
    pub relation_table_hint: Option<String>,
    pub date_format: Option<&'static str>,
}

impl FieldDescriptor {
    fn from_column<E>(ordinal_id: u32, column: &Column<E>) -> Self {
        let relation = column.relation();
        Self {
            column: column.field.name,
            ordinal_id,
            flags: column.field.flags,
            max_size: column.field.max_size,
            literal_value: None,
            embedded_entity: relation.map(|r| r.related()),
            relation_column: column.field.relation_column,
            relation_table_hint: relation.map(|r| r.related_table()),
            date_format: column.field.date_format,
        }
    }

    #[inline]
    pub fn is_relation(&self) -> bool {
        self.embedded_entity.is_some()
    }

    /// Column name in the owning table. Relation columns are stored under
    /// `<RelatedType><RelationColumn>`, e.g. `ProductTypeId`.
    pub fn storage_name(&self) -> String {
        match (self.embedded_entity, self.relation_column) {
            (Some(entity), Some(column)) => format!("{entity}{column}"),
            _ => self.column.to_owned(),
        }
    }
}

pub struct ChangeSet<'e> {
    action: Option<Action>,
    entity: &'static str,
    table: String,
    primary_key_column: Option<&'static str>,
    descriptors: Vec<FieldDescriptor>,
    missing_required: BitVec,
    supplied: Vec<&'static str>,
    nested: HashMap<&'static str, ChangeSet<'static>>,
    primary_key: Value,
    target: Option<&'e mut (dyn Record + 'static)>,
}

impl<'e> ChangeSet<'e> {
    /// Builds a change-set from bare column names.
    pub fn cast_values<E: Entity>(
        entity: &'e mut E,
        registry: &SchemaRegistry,
        fields: Fields,
    ) -> Result<Self> {
        Self::cast(entity, registry, fields, Naming::Bare)
    }

    /// Builds a change-set from a message whose field names carry the entity prefix.
    pub fn cast_message<E: Entity, M: Message + ?Sized>(
        entity: &'e mut E,
        registry: &SchemaRegistry,
        message: &M,
    ) -> Result<Self> {
        Self::cast(entity, registry, message.fields(), Naming::Prefixed)
    }

    fn cast<E: Entity>(
        entity: &'e mut E,
        registry: &SchemaRegistry,
        fields: Fields,
        naming: Naming,
    ) -> Result<Self> {
        let detached = ChangeSet::detached(entity, registry, fields, naming)?;
        Ok(detached.bind(entity))
    }
}

impl ChangeSet<'static> {
    fn bind<'t>(self, target: &'t mut (dyn Record + 'static)) -> ChangeSet<'t> {
        ChangeSet {
            action: self.action,
            entity: self.entity,
            table: self.table,
            primary_key_column: self.primary_key_column,
            descriptors: self.descriptors,
            missing_required: self.missing_required,
            supplied: self.supplied,
            nested: self.nested,
            primary_key: self.primary_key,
            target: Some(target),
        }
    }

    /// Builds a change-set that does not hold on to the entity.
    pub fn detached<E: Entity>(
        entity: &mut E,
        registry: &SchemaRegistry,
        fields: Fields,
        naming: Naming,
    ) -> Result<Self> {
        registry.register::<E>();

        let mut changes = Self::blank::<E>();
        changes.apply(entity, registry, fields, naming)?;
        Ok(changes)
    }

    fn blank<E: Entity>() -> Self {
        let schema = E::schema();
        let columns = schema.columns();
        let mut missing_required = BitVec::from_elem(columns.len(), false);
        let descriptors = columns
            .iter()
            .enumerate()
            .map(|(ordinal, column)| {
                if column.field.flags.is_required() {
                    missing_required.set(ordinal, true);
                }
                FieldDescriptor::from_column(ordinal as u32, column)
            })
            .collect();

        ChangeSet {
            action: None,
            entity: E::NAME,
            table: schema.table().to_owned(),
            primary_key_column: schema.primary_key().map(|c| c.name()),
            descriptors,
            missing_required,
            supplied: Vec::new(),
            nested: HashMap::new(),
            primary_key: Value::Null,
            target: None,
        }
    }
}

impl<'e> ChangeSet<'e> {
    fn apply<E: Entity>(
        &mut self,
        entity: &mut E,
        registry: &SchemaRegistry,
        fields: Fields,
        naming: Naming,
    ) -> Result<()> {
        let schema = E::schema();

        for (name, input) in fields {
            let Some(column_name) = naming.column(E::NAME, &name) else {
                continue;
            };
            let Some(ordinal) = schema.position(column_name) else {
                continue;
            };
            let column = &schema.columns()[ordinal];

            let (value, satisfied) = match (&column.kind, input) {
                (ColumnKind::Scalar { set, .. }, Input::Value(value)) => {
                    if let (Some(max), Value::Text(text)) = (column.field.max_size, &value) {
                        let len = text.chars().count();
                        if len > max {
                            crate::relmap_trace_dropped!(E::NAME, column.name(), len, max);
                            continue;
                        }
                    }
                    set(entity, value.clone())?;
                    let satisfied = !value.is_default();
                    (value, satisfied)
                }
                (ColumnKind::Json { .. }, Input::Value(Value::Null)) => (Value::Null, false),
                (ColumnKind::Json { set }, Input::Json(document)) => {
                    let text = serde_json::to_string(&document)?;
                    set(entity, text.as_bytes()).map_err(|source| MapError::Decode {
                        entity: E::NAME,
                        column: column.name().to_owned(),
                        source,
                    })?;
                    (Value::Text(text), !document.is_null())
                }
                (ColumnKind::Json { set }, Input::Value(value)) if value.as_bytes().is_some() => {
                    let raw = value.as_bytes().unwrap_or_default();
                    set(entity, raw).map_err(|source| MapError::Decode {
                        entity: E::NAME,
                        column: column.name().to_owned(),
                        source,
                    })?;
                    let satisfied = !value.is_default();
                    (value, satisfied)
                }
                (
                    ColumnKind::OneToOne(relation) | ColumnKind::OneToMany(relation),
                    Input::Relation(sub),
                ) => {
                    let nested = relation.cast_nested(entity, registry, sub, naming)?;
                    let value = column
                        .field
                        .relation_column
                        .and_then(|c| nested.literal(c).cloned())
                        .unwrap_or_default();
                    let satisfied = match column.field.relation_column {
                        Some(_) => !value.is_default(),
                        None => true,
                    };
                    self.nested.insert(column.name(), nested);
                    (value, satisfied)
                }
                (ColumnKind::OneToOne(_) | ColumnKind::OneToMany(_), Input::Value(value)) => {
                    let satisfied = !value.is_default();
                    (value, satisfied)
                }
                (kind, input) => {
                    return Err(MapError::Mapping(format!(
                        "{}.{}: {} input does not fit a {kind:?} column",
                        E::NAME,
                        column.name(),
                        input_kind(&input),
                    )));
                }
            };

            self.record(ordinal, value, satisfied);
        }

        self.primary_key = schema.primary_key_of(entity);
        Ok(())
    }

    fn record(&mut self, ordinal: usize, value: Value, satisfied: bool) {
        let descriptor = &mut self.descriptors[ordinal];
        // A later default value re-opens the requirement.
        self.missing_required
            .set(ordinal, descriptor.flags.is_required() && !satisfied);
        descriptor.literal_value = Some(value);

        let supplies = !descriptor.flags.auto_increment
            && (!descriptor.is_relation() || descriptor.relation_column.is_some());
        if supplies && !self.supplied.contains(&descriptor.column) {
            self.supplied.push(descriptor.column);
        }
    }

    /// Assigns foreign-key values to relation columns and marks them supplied.
    pub fn set_rel_values(&mut self, fields: Fields) -> Result<()> {
        for (name, input) in fields {
            let Some(ordinal) = self.descriptors.iter().position(|d| d.column == name) else {
                continue;
            };
            let descriptor = &self.descriptors[ordinal];
            if !descriptor.is_relation() || descriptor.relation_column.is_none() {
                return Err(MapError::Mapping(format!(
                    "{}.{name} is not a relation column with a key target",
                    self.entity
                )));
            }
            let Input::Value(value) = input else {
                return Err(MapError::Mapping(format!(
                    "{}.{name}: relation keys must be plain values",
                    self.entity
                )));
            };
            let satisfied = !value.is_default();
            self.record(ordinal, value, satisfied);
        }
        Ok(())
    }

    /// Applies further bare-named values to the change-set and its entity.
    pub fn append_values<E: Entity>(
        &mut self,
        registry: &SchemaRegistry,
        fields: Fields,
    ) -> Result<()> {
        if self.entity != E::NAME {
            return Err(MapError::Mapping(format!(
                "change-set for {} cannot take {} values",
                self.entity,
                E::NAME
            )));
        }

        let Some(target) = self.target.take() else {
            let mut scratch = E::default();
            return self.apply(&mut scratch, registry, fields, Naming::Bare);
        };

        let result = match target.as_any_mut().downcast_mut::<E>() {
            Some(entity) => self.apply(entity, registry, fields, Naming::Bare),
            None => Err(MapError::Mapping(format!(
                "change-set target is not a {}",
                E::NAME
            ))),
        };
        self.target = Some(target);
        result
    }

    /// AND of equality terms over the current literal values of `columns`.
    pub fn unique_predicate(&self, columns: &[&str]) -> Result<Predicate> {
        let terms = columns
            .iter()
            .map(|name| {
                let descriptor = self.descriptor(name).ok_or_else(|| {
                    MapError::Mapping(format!("{} has no column {name}", self.entity))
                })?;
                let value = descriptor.literal_value.clone().ok_or_else(|| {
                    MapError::Mapping(format!("{}.{name} was not supplied", self.entity))
                })?;
                Ok(p(&descriptor.storage_name(), &self.table, Op::Eq, value))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(and(terms))
    }

    /// Writes a database-generated key back into the change-set and its entity.
    pub fn write_back_key(&mut self, key: Value) -> Result<()> {
        let Some(column) = self.primary_key_column else {
            return Ok(());
        };
        if let Some(target) = self.target.as_deref_mut() {
            target.assign(column, key.clone())?;
        }
        if let Some(descriptor) = self.descriptors.iter_mut().find(|d| d.column == column) {
            descriptor.literal_value = Some(key.clone());
        }
        self.primary_key = key;
        Ok(())
    }

    // ==================== accessors ====================

    #[inline]
    pub fn action(&self) -> Option<Action> {
        self.action
    }

    #[inline]
    pub fn mark(&mut self, action: Action) {
        self.action = Some(action);
    }

    #[inline]
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key_column(&self) -> Option<&'static str> {
        self.primary_key_column
    }

    /// Whether the primary key is generated by the database.
    pub fn has_generated_key(&self) -> bool {
        self.primary_key_column
            .and_then(|c| self.descriptor(c))
            .is_some_and(|d| d.flags.auto_increment)
    }

    #[inline]
    pub fn primary_key(&self) -> &Value {
        &self.primary_key
    }

    #[inline]
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, column: &str) -> Option<&FieldDescriptor> {
        self.descriptors.iter().find(|d| d.column == column)
    }

    pub fn literal(&self, column: &str) -> Option<&Value> {
        self.descriptor(column).and_then(|d| d.literal_value.as_ref())
    }

    /// Supplied columns in input order.
    #[inline]
    pub fn supplied_columns(&self) -> &[&'static str] {
        &self.supplied
    }

    pub fn nested(&self, column: &str) -> Option<&ChangeSet<'static>> {
        self.nested.get(column)
    }

    #[inline]
    pub fn missing_required_mask(&self) -> &BitVec {
        &self.missing_required
    }

    /// Required columns still missing, in declaration order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.missing_required
            .iter()
            .zip(&self.descriptors)
            .filter_map(|(missing, d)| missing.then_some(d.column))
            .collect()
    }

    #[inline]
    pub fn valid_insert(&self) -> bool {
        self.missing_required.none()
    }

    pub fn ensure_valid_insert(&self) -> Result<()> {
        if self.valid_insert() {
            return Ok(());
        }
        Err(MapError::Validation {
            entity: self.entity,
            missing: self.missing_required(),
        })
    }
}

fn input_kind(input: &Input) -> &'static str {
    match input {
        Input::Value(_) => "value",
        Input::Json(_) => "json",
        Input::Relation(_) => "relation",
    }
}

impl fmt::Debug for ChangeSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSet")
            .field("action", &self.action)
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("supplied", &self.supplied)
            .field("missing_required", &self.missing_required())
            .field("primary_key", &self.primary_key)
            .field("nested", &self.nested)
            .field("bound", &self.target.is_some())
            .finish()
    }
}
