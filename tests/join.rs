#![cfg(feature = "rusqlite")]

mod common;

use common::{Product, ProductType, insert_product, insert_product_type, setup_repo};
use relmap::prelude::*;

fn seed(repo: &Repo, token: &CancellationToken) {
    let lamps = insert_product_type(repo, token, "lamps");
    let chairs = insert_product_type(repo, token, "chairs");
    insert_product_type(repo, token, "tables");
    insert_product(repo, token, "desk lamp", lamps);
    insert_product(repo, token, "stool", chairs);
    insert_product(repo, token, "floor lamp", lamps);
}

#[test]
fn preloaded_relation_is_embedded_in_each_row() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    seed(&repo, &token);

    let builder = QueryBuilder::for_entity::<Product>()
        .column(col("Id", "producttypes").alias("ProductTypeRel$Id"))
        .column(col("Name", "producttypes").alias("ProductTypeRel$Name"))
        .column(col("Attributes", "producttypes").alias("ProductTypeRel$Attributes"))
        .join(Preload::new("producttypes", "ProductTypeId", "Id"))
        .filter(p("Name", "products", Op::Like, "%lamp"))
        .order_by(OrderBy::desc("Id", "products"));

    let products: Vec<Product> = repo.query(&token, &builder).unwrap();

    let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["floor lamp", "desk lamp"]);
    for product in &products {
        let product_type = product.product_type.as_deref().unwrap();
        assert_eq!(product_type.id, 1);
        assert_eq!(product_type.name, "lamps");
        assert_eq!(product_type.attributes["color"], "red");
    }
}

#[test]
fn one_to_many_rows_collapse_per_parent() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    seed(&repo, &token);

    let planner = JoinPlanner::new().rel(
        RelationEdge::new("producttypes", "products", "Id", "ProductTypeId")
            .kind(JoinKind::Left)
            .builder(
                QueryBuilder::new("producttypes")
                    .select([
                        col("Id", "producttypes"),
                        col("Name", "producttypes"),
                        col("Id", "products").alias("Products$Id"),
                        col("Name", "products").alias("Products$Name"),
                    ])
                    .order_by(OrderBy::asc("Id", "producttypes"))
                    .order_by(OrderBy::asc("Id", "products")),
            ),
    );

    let types: Vec<ProductType> = repo.query_join(&token, &planner).unwrap();

    let summary: Vec<(&str, Vec<&str>)> = types
        .iter()
        .map(|t| {
            (
                t.name.as_str(),
                t.products.iter().map(|p| p.name.as_str()).collect(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("lamps", vec!["desk lamp", "floor lamp"]),
            ("chairs", vec!["stool"]),
            ("tables", vec![]),
        ]
    );
}

#[test]
fn unordered_scan_still_dedups_by_key() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    seed(&repo, &token);

    let mut types: Vec<ProductType> = repo
        .raw_query(
            &token,
            "SELECT t.Id AS Id, t.Name AS Name, p.Name AS \"Products$Name\" \
             FROM producttypes t INNER JOIN products p ON p.ProductTypeId = t.Id",
            &[],
        )
        .unwrap();
    types.sort_by_key(|t| t.id);

    assert_eq!(types.len(), 2);
    assert_eq!(types[0].products.len(), 2);
    assert_eq!(types[1].products.len(), 1);
}
