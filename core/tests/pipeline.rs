//! Change-set to statement, and planned join to scanned entity graph, without a database.

use relmap_core::prelude::*;
use relmap_core::{insert_query, update_query};
use std::sync::OnceLock;

#[derive(Debug, Default, Clone, PartialEq)]
struct Brand {
    id: i64,
    name: String,
}

impl Entity for Brand {
    const NAME: &'static str = "Brand";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Brand>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Brand>::builder()
                .scalar(
                    Field::new("Id").auto_increment(),
                    |b| b.id.into(),
                    |b, v| {
                        b.id = v.decode()?;
                        Ok(())
                    },
                )
                .scalar(
                    Field::new("Name").not_nullable(),
                    |b| b.name.clone().into(),
                    |b, v| {
                        b.name = v.decode()?;
                        Ok(())
                    },
                )
                .build()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Widget {
    id: i64,
    name: String,
    brand: Option<Brand>,
    tags: Vec<Brand>,
}

impl Entity for Widget {
    const NAME: &'static str = "Widget";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Widget>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Widget>::builder()
                .scalar(
                    Field::new("Id").auto_increment(),
                    |w| w.id.into(),
                    |w, v| {
                        w.id = v.decode()?;
                        Ok(())
                    },
                )
                .scalar(
                    Field::new("Name").not_nullable(),
                    |w| w.name.clone().into(),
                    |w, v| {
                        w.name = v.decode()?;
                        Ok(())
                    },
                )
                .one_to_one::<Brand>(
                    Field::new("BrandRel").relation_column("Id"),
                    |w, b| w.brand = Some(b),
                )
                .one_to_many::<Brand>(Field::new("Tags"), |w, b| w.tags.push(b))
                .build()
        })
    }
}

#[test]
fn cast_then_render_update() {
    let registry = SchemaRegistry::new();
    let mut widget = Widget::default();
    let cs = ChangeSet::cast_values(
        &mut widget,
        &registry,
        Fields::new().set("Id", 7).set("Name", "lamp"),
    )
    .unwrap();

    let (sql, params) = update_query(&cs, None).unwrap();
    assert_eq!(sql, "UPDATE widgets SET `Name` = ? WHERE `Id` = ?");
    assert_eq!(params, vec![Value::from("lamp"), Value::Integer(7)]);

    let (sql, _) = insert_query(&cs).unwrap();
    assert_eq!(sql, "INSERT INTO `widgets` (`Name`) VALUES (?)");
}

#[test]
fn planned_columns_scan_into_nested_entities() {
    let planner = JoinPlanner::new().rel(
        RelationEdge::new("widgets", "brands", "BrandId", "Id").builder(
            QueryBuilder::new("widgets")
                .select([
                    col("Id", "widgets"),
                    col("Name", "widgets"),
                    col("Id", "brands").alias("BrandRel$Id"),
                    col("Name", "brands").alias("BrandRel$Name"),
                ])
                .order_by(OrderBy::asc("Id", "widgets")),
        ),
    );
    let (sql, _) = planner.build().unwrap();
    assert!(sql.contains("`brands`.`Name` AS `BrandRel$Name`"));

    // Rows as the statement above would return them.
    let mut rows = Rows::new(["Id", "Name", "BrandRel$Id", "BrandRel$Name", "Tags$Name"])
        .row([
            Value::Integer(2),
            Value::from("desk"),
            Value::Integer(9),
            Value::from("acme"),
            Value::from("wood"),
        ])
        .row([
            Value::Integer(1),
            Value::from("lamp"),
            Value::Null,
            Value::Null,
            Value::Null,
        ])
        .row([
            Value::Integer(2),
            Value::from("desk"),
            Value::Integer(9),
            Value::from("acme"),
            Value::from("oak"),
        ]);

    let registry = SchemaRegistry::new();
    let widgets: Vec<Widget> = RowScanner::new(&registry)
        .ordered(planner.is_ordered())
        .scan(&mut rows)
        .unwrap();

    assert_eq!(widgets.len(), 2);
    assert_eq!(widgets[0].id, 2);
    assert_eq!(
        widgets[0].brand,
        Some(Brand {
            id: 9,
            name: "acme".into()
        })
    );
    let tags: Vec<_> = widgets[0].tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, ["wood", "oak"]);

    assert_eq!(widgets[1].name, "lamp");
    assert_eq!(widgets[1].brand, None);
    assert!(widgets[1].tags.is_empty());
}
