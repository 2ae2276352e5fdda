use crate::registry::SchemaRegistry;
use crate::schema::{ColumnKind, Entity};

/// Separates a relation field from the related column in result column names.
pub const RELATION_SEPARATOR: char = '$';

/// Marker between the owning type name and the rest of a relation field name.
pub const RELATION_MARKER: &str = "Rel";

/// Where one result column lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Scalar field of the root entity, by schema position.
    Direct(usize),
    /// JSON field of the root entity, decoded after the row is bound.
    DirectJson(usize),
    /// Column of the entity embedded at schema position `relation`.
    Related {
        relation: usize,
        column: String,
        json: bool,
    },
    Ignored,
}

/// Bindings for every result column, resolved once per scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanPlan {
    pub bindings: Vec<Binding>,
}

/// Splits `ProductTypeRel$Name` into `("ProductTypeRel", "Name")`.
pub fn split_relation_column(name: &str) -> Option<(&str, &str)> {
    name.split_once(RELATION_SEPARATOR)
        .filter(|(field, column)| !field.is_empty() && !column.is_empty())
}

/// Owning schema named by a relation field, e.g. `ProductType` for `ProductTypeRel`.
pub fn relation_owner(field: &str) -> Option<&str> {
    field
        .split_once(RELATION_MARKER)
        .map(|(owner, _)| owner)
        .filter(|owner| !owner.is_empty())
}

impl ScanPlan {
    pub fn resolve<E: Entity>(columns: &[String], registry: &SchemaRegistry) -> Self {
        let bindings = columns
            .iter()
            .map(|name| Self::bind::<E>(name, registry))
            .collect();
        Self { bindings }
    }

    fn bind<E: Entity>(name: &str, registry: &SchemaRegistry) -> Binding {
        let schema = E::schema();

        if let Some(position) = schema.position(name) {
            return match &schema.columns()[position].kind {
                ColumnKind::Scalar { .. } if registry.is_json(E::NAME, name) => {
                    Binding::DirectJson(position)
                }
                ColumnKind::Scalar { .. } => Binding::Direct(position),
                ColumnKind::Json { .. } => Binding::DirectJson(position),
                ColumnKind::OneToOne(_) | ColumnKind::OneToMany(_) => Binding::Ignored,
            };
        }

        let Some((field, column)) = split_relation_column(name) else {
            return Binding::Ignored;
        };
        let Some(position) = schema.position(field) else {
            return Binding::Ignored;
        };
        let Some(relation) = schema.columns()[position].relation() else {
            return Binding::Ignored;
        };

        let owner = relation_owner(field).unwrap_or(relation.related());
        let json = registry.is_json(owner, column) || relation.is_json(column);
        Binding::Related {
            relation: position,
            column: column.to_owned(),
            json,
        }
    }
}
