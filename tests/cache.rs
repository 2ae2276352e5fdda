mod common;

use common::ProductType;
use relmap::EntityCache;
use std::sync::Arc;
use std::thread;

fn product_type(id: i64, name: &str) -> ProductType {
    ProductType {
        id,
        name: name.to_owned(),
        ..ProductType::default()
    }
}

#[test]
fn insert_keeps_the_first_version() {
    let cache = EntityCache::<ProductType>::new();
    assert!(cache.insert(product_type(1, "lamps")));
    assert!(!cache.insert(product_type(1, "other")));

    assert_eq!(cache.get(1).unwrap().name, "lamps");
    assert!(cache.get(2).is_none());
}

#[test]
fn replace_only_touches_known_keys() {
    let cache = EntityCache::<ProductType>::new();
    cache.load([product_type(1, "lamps"), product_type(2, "chairs")]);

    assert!(cache.replace(product_type(2, "stools")));
    assert!(!cache.replace(product_type(9, "ghost")));

    let mut names: Vec<_> = cache.all().iter().map(|t| t.name.clone()).collect();
    names.sort();
    assert_eq!(names, ["lamps", "stools"]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn readers_keep_their_snapshot_after_a_replace() {
    let cache = EntityCache::<ProductType>::new();
    cache.insert(product_type(1, "lamps"));

    let before = cache.get(1).unwrap();
    cache.replace(product_type(1, "lights"));

    assert_eq!(before.name, "lamps");
    assert_eq!(cache.get(1).unwrap().name, "lights");
    assert_eq!(cache.remove(1).map(|t| t.id), Some(1));
    assert!(cache.is_empty());
}

#[test]
fn concurrent_writers_and_readers() {
    let cache = Arc::new(EntityCache::<ProductType>::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache.insert(product_type(i, "t"));
                cache.all().len()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap() >= 1);
    }
    assert_eq!(cache.len(), 8);
}
