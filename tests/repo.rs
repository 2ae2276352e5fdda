#![cfg(feature = "rusqlite")]

mod common;

use common::{
    CreateProduct, Product, ProductType, insert_product_type, product_type_fields, setup_repo,
};
use relmap::prelude::*;
use relmap::{Action, ErrorKind};

#[test]
fn insert_writes_generated_key_back() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let mut product_type = ProductType::default();
    let mut cs =
        ChangeSet::cast_values(&mut product_type, repo.registry(), product_type_fields("lamps"))
            .unwrap();
    repo.save(&token, &mut cs).unwrap();

    assert_eq!(cs.action(), Some(Action::Insert));
    assert_eq!(cs.primary_key(), &Value::Integer(1));
    drop(cs);
    assert_eq!(product_type.id, 1);
}

#[test]
fn saved_rows_scan_back_with_json_columns() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    let id = insert_product_type(&repo, &token, "lamps");

    let found: Vec<ProductType> = repo
        .query(
            &token,
            &QueryBuilder::for_entity::<ProductType>().filter(p("Id", "producttypes", Op::Eq, id)),
        )
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "lamps");
    assert_eq!(
        found[0].attributes,
        serde_json::json!({ "color": "red", "sizes": [1, 2] })
    );
    assert_eq!(found[0].aggregate_fields, None);
}

#[test]
fn scalar_json_documents_survive_numeric_affinity() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let mut product_type = ProductType::default();
    let mut cs = ChangeSet::cast_values(
        &mut product_type,
        repo.registry(),
        Fields::new()
            .set("Name", "counters")
            .json("Attributes", serde_json::json!(5))
            .json("AggregateFields", serde_json::json!(1.5)),
    )
    .unwrap();
    repo.save(&token, &mut cs).unwrap();
    drop(cs);

    let found: Vec<ProductType> = repo
        .query(&token, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert_eq!(found[0].attributes, serde_json::json!(5));
    assert_eq!(found[0].aggregate_fields, Some(serde_json::json!(1.5)));
}

#[test]
fn insert_without_required_columns_is_rejected_before_the_database() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let mut product = Product::default();
    let mut cs = ChangeSet::cast_values(
        &mut product,
        repo.registry(),
        Fields::new().set("Name", "orphan"),
    )
    .unwrap();
    let err = repo.save(&token, &mut cs).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(
        err.to_string(),
        "Required Fields aren't Nullable (ProductTypeRel)"
    );
    assert_eq!(cs.action(), None);
}

#[test]
fn message_requests_map_prefixed_fields() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    let type_id = insert_product_type(&repo, &token, "lamps");

    let request = CreateProduct {
        product_name: "desk lamp".into(),
        product_type_id: type_id,
    };
    let mut product = Product::default();
    let mut cs = ChangeSet::cast_message(&mut product, repo.registry(), &request).unwrap();
    assert_eq!(cs.supplied_columns(), ["Name", "ProductTypeRel"]);
    repo.save(&token, &mut cs).unwrap();
    drop(cs);

    assert_eq!(product.id, 1);
    assert_eq!(product.name, "desk lamp");
}

#[test]
fn duplicate_unique_value_is_a_conflict() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    insert_product_type(&repo, &token, "lamps");

    let mut again = ProductType::default();
    let mut cs =
        ChangeSet::cast_values(&mut again, repo.registry(), product_type_fields("lamps")).unwrap();
    let err = repo.save(&token, &mut cs).unwrap_err();

    assert!(matches!(err, MapError::Conflict(_)));
    assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[test]
fn missing_parent_row_is_classified() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let mut product = Product::default();
    let mut cs = ChangeSet::cast_values(
        &mut product,
        repo.registry(),
        Fields::new().set("Name", "ghost").set("ProductTypeRel", 99),
    )
    .unwrap();
    let err = repo.save(&token, &mut cs).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingParentKey);
}

#[test]
fn update_and_delete_report_missing_rows() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    let id = insert_product_type(&repo, &token, "lamps");

    let mut product_type = ProductType::default();
    let mut cs = ChangeSet::cast_values(
        &mut product_type,
        repo.registry(),
        Fields::new().set("Id", id).set("Name", "lights"),
    )
    .unwrap();
    repo.update_by_id(&token, &mut cs, None).unwrap();
    assert_eq!(cs.action(), Some(Action::Update));

    let mut missing = ProductType::default();
    let mut cs = ChangeSet::cast_values(
        &mut missing,
        repo.registry(),
        Fields::new().set("Id", 42).set("Name", "nothing"),
    )
    .unwrap();
    let err = repo.update_by_id(&token, &mut cs, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TargetNotFound);

    let err = repo.delete_by_id(&token, &mut cs).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TargetNotFound);

    let mut existing = ProductType::default();
    let mut cs =
        ChangeSet::cast_values(&mut existing, repo.registry(), Fields::new().set("Id", id))
            .unwrap();
    repo.delete_by_id(&token, &mut cs).unwrap();
    assert_eq!(cs.action(), Some(Action::Delete));

    let left: Vec<ProductType> = repo
        .query(&token, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert!(left.is_empty());
}

#[test]
fn update_with_extra_predicate_narrows_the_target() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    let id = insert_product_type(&repo, &token, "lamps");

    let mut product_type = ProductType::default();
    let mut cs = ChangeSet::cast_values(
        &mut product_type,
        repo.registry(),
        Fields::new().set("Id", id).set("Name", "lights"),
    )
    .unwrap();
    let stale = p("Name", "", Op::Eq, "chairs");
    let err = repo.update_by_id(&token, &mut cs, Some(&stale)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TargetNotFound);
}

#[test]
fn ordered_raw_query_keeps_statement_order() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    for name in ["b", "c", "a"] {
        insert_product_type(&repo, &token, name);
    }

    let sorted: Vec<ProductType> = repo
        .raw_query_ordered(
            &token,
            "SELECT Id, Name FROM producttypes WHERE Name <> ? ORDER BY Name DESC",
            &[Value::from("x")],
        )
        .unwrap();
    let names: Vec<_> = sorted.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["c", "b", "a"]);
}

#[test]
fn cancelled_token_stops_before_the_statement() {
    let repo = setup_repo();
    let token = CancellationToken::new();
    token.cancel();

    let mut product_type = ProductType::default();
    let mut cs =
        ChangeSet::cast_values(&mut product_type, repo.registry(), product_type_fields("lamps"))
            .unwrap();
    let err = repo.save(&token, &mut cs).unwrap_err();
    assert!(matches!(err, MapError::Cancelled));
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let live = CancellationToken::new();
    let all: Vec<ProductType> = repo
        .query(&live, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert!(all.is_empty());
}

#[test]
fn transaction_commits_on_success() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let product_id = repo
        .transaction(&token, |tx| {
            let mut product_type = ProductType::default();
            let mut cs = ChangeSet::cast_values(
                &mut product_type,
                repo.registry(),
                product_type_fields("lamps"),
            )?;
            tx.save(&mut cs)?;
            let type_id = cs.primary_key().clone();

            let mut product = Product::default();
            let mut cs = ChangeSet::cast_values(
                &mut product,
                repo.registry(),
                Fields::new().set("Name", "desk lamp").set("ProductTypeRel", type_id),
            )?;
            tx.save(&mut cs)?;
            Ok(cs.primary_key().clone())
        })
        .unwrap();

    assert_eq!(product_id, Value::Integer(1));
    let products: Vec<Product> = repo
        .query(&token, &QueryBuilder::for_entity::<Product>())
        .unwrap();
    assert_eq!(products.len(), 1);
}

#[test]
fn transaction_rolls_back_on_error() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let result: relmap::Result<()> = repo.transaction(&token, |tx| {
        let mut product_type = ProductType::default();
        let mut cs = ChangeSet::cast_values(
            &mut product_type,
            repo.registry(),
            product_type_fields("lamps"),
        )?;
        tx.save(&mut cs)?;

        let mut product = Product::default();
        let mut cs = ChangeSet::cast_values(
            &mut product,
            repo.registry(),
            Fields::new().set("Name", "ghost").set("ProductTypeRel", 99),
        )?;
        tx.save(&mut cs)
    });

    assert_eq!(result.unwrap_err().kind(), ErrorKind::MissingParentKey);
    let types: Vec<ProductType> = repo
        .query(&token, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert!(types.is_empty());
}

#[test]
fn transaction_cancelled_mid_scope_rolls_back() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let result = repo.transaction(&token, |tx| {
        let mut product_type = ProductType::default();
        let mut cs = ChangeSet::cast_values(
            &mut product_type,
            repo.registry(),
            product_type_fields("lamps"),
        )?;
        tx.save(&mut cs)?;
        tx.token().cancel();
        Ok(())
    });
    assert!(matches!(result, Err(MapError::Cancelled)));

    let live = CancellationToken::new();
    let types: Vec<ProductType> = repo
        .query(&live, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert!(types.is_empty());
}

#[test]
fn transaction_rolls_back_when_the_scope_panics() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = repo.transaction(&token, |tx| {
            let mut product_type = ProductType::default();
            let mut cs = ChangeSet::cast_values(
                &mut product_type,
                repo.registry(),
                product_type_fields("lamps"),
            )?;
            tx.save(&mut cs)?;
            if cs.primary_key() == &Value::Integer(1) {
                panic!("handler bug");
            }
            Ok(())
        });
    }));
    assert!(outcome.is_err());

    let types: Vec<ProductType> = repo
        .query(&token, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert!(types.is_empty());
}

#[test]
fn failed_rollback_keeps_the_scope_error() {
    let repo = setup_repo();
    let token = CancellationToken::new();

    let result: relmap::Result<()> = repo.transaction(&token, |tx| {
        let mut product_type = ProductType::default();
        let mut cs = ChangeSet::cast_values(
            &mut product_type,
            repo.registry(),
            product_type_fields("lamps"),
        )?;
        tx.save(&mut cs)?;
        // Ends the transaction early so the closing rollback has nothing to undo.
        let _: Vec<ProductType> = tx.raw_query("ROLLBACK", &[])?;
        Err(MapError::Statement("scope aborted".into()))
    });

    match result {
        Err(MapError::Statement(message)) => assert_eq!(message, "scope aborted"),
        other => panic!("unexpected result: {other:?}"),
    }
    let types: Vec<ProductType> = repo
        .query(&token, &QueryBuilder::for_entity::<ProductType>())
        .unwrap();
    assert!(types.is_empty());
}
