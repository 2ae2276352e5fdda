#![allow(dead_code)]

use relmap::prelude::*;
use serde_json::Value as Json;
use std::sync::OnceLock;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProductType {
    pub id: i64,
    pub name: String,
    pub attributes: Json,
    pub aggregate_fields: Option<Json>,
    pub products: Vec<Product>,
}

impl Entity for ProductType {
    const NAME: &'static str = "ProductType";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<ProductType>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<ProductType>::builder()
                .scalar(
                    Field::new("Id").auto_increment(),
                    |t| t.id.into(),
                    |t, v| {
                        t.id = v.decode()?;
                        Ok(())
                    },
                )
                .scalar(
                    Field::new("Name").not_nullable().max_size(32),
                    |t| t.name.clone().into(),
                    |t, v| {
                        t.name = v.decode()?;
                        Ok(())
                    },
                )
                .json(Field::new("Attributes").not_nullable(), |t, raw| {
                    t.attributes = serde_json::from_slice(raw)?;
                    Ok(())
                })
                .json(Field::new("AggregateFields").nullable(), |t, raw| {
                    t.aggregate_fields = serde_json::from_slice(raw)?;
                    Ok(())
                })
                .one_to_many::<Product>(Field::new("Products"), |t, p| t.products.push(p))
                .build()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub product_type: Option<Box<ProductType>>,
}

impl Entity for Product {
    const NAME: &'static str = "Product";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Product>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Product>::builder()
                .scalar(
                    Field::new("Id").auto_increment(),
                    |p| p.id.into(),
                    |p, v| {
                        p.id = v.decode()?;
                        Ok(())
                    },
                )
                .scalar(
                    Field::new("Name").not_nullable(),
                    |p| p.name.clone().into(),
                    |p, v| {
                        p.name = v.decode()?;
                        Ok(())
                    },
                )
                .one_to_one::<ProductType>(
                    Field::new("ProductTypeRel")
                        .not_nullable()
                        .relation_column("Id"),
                    |p, t| p.product_type = Some(Box::new(t)),
                )
                .build()
        })
    }
}

/// Request shaped like an HTTP create payload: fields carry the entity prefix.
#[derive(Debug, Default)]
pub struct CreateProduct {
    pub product_name: String,
    pub product_type_id: i64,
}

impl Message for CreateProduct {
    fn fields(&self) -> Fields {
        Fields::new()
            .set("ProductName", self.product_name.as_str())
            .set("ProductProductTypeRel", self.product_type_id)
    }
}

pub const SCHEMA_SQL: &str = "
    CREATE TABLE producttypes (
        Id INTEGER PRIMARY KEY AUTOINCREMENT,
        Name TEXT NOT NULL UNIQUE,
        Attributes JSON NOT NULL,
        AggregateFields JSON
    );
    CREATE TABLE products (
        Id INTEGER PRIMARY KEY AUTOINCREMENT,
        Name TEXT NOT NULL,
        ProductTypeId INTEGER NOT NULL REFERENCES producttypes(Id)
    );
";

#[cfg(feature = "rusqlite")]
pub fn setup_repo() -> Repo {
    let repo = Repo::in_memory().expect("in-memory database");
    repo.execute_batch(SCHEMA_SQL).expect("create tables");
    repo
}

pub fn product_type_fields(name: &str) -> Fields {
    Fields::new()
        .set("Name", name)
        .json("Attributes", serde_json::json!({ "color": "red", "sizes": [1, 2] }))
}

#[cfg(feature = "rusqlite")]
/// Inserts a product type and returns its generated id.
pub fn insert_product_type(repo: &Repo, token: &CancellationToken, name: &str) -> i64 {
    let mut product_type = ProductType::default();
    let mut cs = ChangeSet::cast_values(&mut product_type, repo.registry(), product_type_fields(name))
        .expect("cast product type");
    repo.save(token, &mut cs).expect("save product type");
    drop(cs);
    product_type.id
}

#[cfg(feature = "rusqlite")]
/// Inserts a product pointing at `product_type_id` and returns its generated id.
pub fn insert_product(repo: &Repo, token: &CancellationToken, name: &str, product_type_id: i64) -> i64 {
    let mut product = Product::default();
    let mut cs = ChangeSet::cast_values(
        &mut product,
        repo.registry(),
        Fields::new().set("Name", name).set("ProductTypeRel", product_type_id),
    )
    .expect("cast product");
    repo.save(token, &mut cs).expect("save product");
    drop(cs);
    product.id
}
