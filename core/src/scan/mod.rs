//! Reconstruction of entity graphs from flat result rows.
//!
//! Columns named after a root field bind directly; columns named
//! `<RelationField>$<Column>` bind into a scratch instance of the related
//! entity, which is attached to the root once the row is complete. Rows that
//! share a primary key collapse into one entity: one-to-many relations
//! accumulate an item per row, one-to-one relations keep the last.

mod plan;

pub use plan::{RELATION_MARKER, RELATION_SEPARATOR, relation_owner, split_relation_column};

use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::schema::{ColumnKind, Entity, Record};
use crate::value::{Key, Value};
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use plan::{Binding, ScanPlan};

/// A cursor over result rows.
pub trait RowSource {
    fn columns(&self) -> &[String];

    fn next_row(&mut self) -> Result<Option<Vec<Value>>>;
}

/// Rows already held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Vec<Value>>,
}

impl Rows {
    pub fn new<C: Into<String>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Default::default(),
        }
    }

    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows.push_back(values.into_iter().collect());
        self
    }
}

impl RowSource for Rows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

/// Related instance being filled from one row.
struct Scratch {
    relation: usize,
    record: Box<dyn Record>,
    /// Set once any bound column was non-NULL.
    present: bool,
}

/// JSON bytes held back until the row's plain columns are bound.
struct PendingJson<'p> {
    /// `None` for the root entity, else the relation's schema position.
    relation: Option<usize>,
    column: &'p str,
    raw: Vec<u8>,
}

/// Per-scan accumulation state.
struct ScanContext<E> {
    entities_by_key: HashMap<Key, E>,
    insertion_order: Vec<Key>,
}

impl<E> ScanContext<E> {
    fn new() -> Self {
        Self {
            entities_by_key: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    fn finish(mut self, ordered: bool) -> Vec<E> {
        if ordered {
            return self
                .insertion_order
                .iter()
                .filter_map(|key| self.entities_by_key.remove(key))
                .collect();
        }
        self.entities_by_key.into_values().collect()
    }
}

/// Scans rows into entities of one type.
#[derive(Debug, Clone, Copy)]
pub struct RowScanner<'r> {
    registry: &'r SchemaRegistry,
    ordered: bool,
}

impl<'r> RowScanner<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            ordered: false,
        }
    }

    /// Emit entities in the order their keys first appeared.
    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn scan<E: Entity, S: RowSource + ?Sized>(&self, source: &mut S) -> Result<Vec<E>> {
        self.registry.register::<E>();
        let plan = ScanPlan::resolve::<E>(source.columns(), self.registry);
        let mut context = ScanContext::new();

        let mut rows = 0usize;
        while let Some(row) = source.next_row()? {
            self.scan_row(&plan, row, rows, &mut context)?;
            rows += 1;
        }

        let entities = context.finish(self.ordered);
        crate::relmap_trace_scan!(E::NAME, rows, entities.len());
        Ok(entities)
    }

    fn scan_row<E: Entity>(
        &self,
        plan: &ScanPlan,
        row: Vec<Value>,
        position: usize,
        context: &mut ScanContext<E>,
    ) -> Result<()> {
        let schema = E::schema();
        let columns = schema.columns();
        let mut entity = E::default();
        let mut scratches: Vec<Scratch> = Vec::new();
        let mut pending: Vec<PendingJson<'_>> = Vec::new();

        for (binding, value) in plan.bindings.iter().zip(row) {
            match binding {
                Binding::Ignored => {}
                Binding::Direct(at) => {
                    if let ColumnKind::Scalar { set, .. } = &columns[*at].kind {
                        set(&mut entity, value)?;
                    }
                }
                Binding::DirectJson(at) => {
                    if let Some(raw) = value.into_json_bytes() {
                        pending.push(PendingJson {
                            relation: None,
                            column: columns[*at].name(),
                            raw,
                        });
                    }
                }
                Binding::Related {
                    relation,
                    column,
                    json,
                } => {
                    let scratch = match scratches.iter().position(|s| s.relation == *relation) {
                        Some(i) => &mut scratches[i],
                        None => {
                            let Some(rel) = columns[*relation].relation() else {
                                continue;
                            };
                            scratches.push(Scratch {
                                relation: *relation,
                                record: rel.blank(),
                                present: false,
                            });
                            let last = scratches.len() - 1;
                            &mut scratches[last]
                        }
                    };
                    scratch.present |= !value.is_null();

                    if *json {
                        if let Some(raw) = value.into_json_bytes() {
                            pending.push(PendingJson {
                                relation: Some(*relation),
                                column,
                                raw,
                            });
                        }
                    } else {
                        scratch.record.assign(column, value)?;
                    }
                }
            }
        }

        for json in pending {
            match json.relation {
                None => {
                    Record::assign_json(&mut entity, json.column, &json.raw)?;
                }
                Some(relation) => {
                    if let Some(scratch) = scratches.iter_mut().find(|s| s.relation == relation) {
                        scratch.record.assign_json(json.column, &json.raw)?;
                    }
                }
            }
        }

        let key = match schema.primary_key() {
            Some(_) => schema.primary_key_of(&entity).key(),
            None => Key::Position(position),
        };
        let slot = match context.entities_by_key.entry(key) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                if self.ordered {
                    context.insertion_order.push(vacant.key().clone());
                }
                vacant.insert(entity)
            }
        };

        for scratch in scratches {
            if !scratch.present {
                continue;
            }
            if let Some(relation) = columns[scratch.relation].relation() {
                relation.attach(slot, scratch.record)?;
            }
        }
        Ok(())
    }
}
