//! Integration tests for the cart.
//!
//! Merging rules and persistence across controller restarts.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::Arc;

use digitrestau_client::{FileStorage, LocalStorage, MemoryStorage};
use digitrestau_core::DishId;
use digitrestau_integration_tests::{TestApp, dish};
use rust_decimal::Decimal;

// =============================================================================
// Merging
// =============================================================================

#[tokio::test]
async fn test_one_line_per_dish_with_summed_quantities() {
    let app = TestApp::offline(Arc::new(MemoryStorage::new()));
    let mafe = dish("d1", "Mafé", 850);
    let yassa = dish("d2", "Yassa", 900);
    let adds = [(&mafe, 1), (&yassa, 2), (&mafe, 3), (&yassa, 1), (&mafe, 5)];

    let mut expected: HashMap<&str, u32> = HashMap::new();
    for (d, q) in adds {
        app.controller.add_dish_to_cart(d, q, "");
        *expected.entry(d.id.as_str()).or_default() += q;
    }

    let cart = app.controller.snapshot().cart;
    assert_eq!(cart.len(), 2);
    for line in &cart {
        assert_eq!(line.quantity, expected[line.dish.id.as_str()]);
    }
    assert_eq!(app.controller.snapshot().cart_count, 12);
}

#[tokio::test]
async fn test_blank_instructions_keep_previous() {
    let app = TestApp::offline(Arc::new(MemoryStorage::new()));
    let mafe = dish("d1", "Mafé", 850);
    app.controller.add_dish_to_cart(&mafe, 1, "sans oignons");
    app.controller.add_dish_to_cart(&mafe, 2, "");

    let cart = app.controller.snapshot().cart;
    assert_eq!(cart[0].special_instructions, "sans oignons");
    assert_eq!(cart[0].quantity, 3);
}

#[tokio::test]
async fn test_quantity_updates() {
    let app = TestApp::offline(Arc::new(MemoryStorage::new()));
    app.controller.add_dish_to_cart(&dish("d1", "Mafé", 850), 1, "");
    app.controller.add_dish_to_cart(&dish("d2", "Yassa", 900), 1, "");
    app.controller.add_dish_to_cart(&dish("d3", "Thiéb", 1200), 1, "");

    app.controller.update_cart_quantity(&DishId::new("d1"), 0);
    app.controller.update_cart_quantity(&DishId::new("d2"), -5);
    app.controller.update_cart_quantity(&DishId::new("ghost"), 5);

    let cart = app.controller.snapshot().cart;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].dish.id.as_str(), "d3");
    assert_eq!(cart[0].quantity, 1);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_cart_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let first = TestApp::offline(Arc::new(FileStorage::new(&path)));
    first
        .controller
        .add_dish_to_cart(&dish("d1", "Mafé", 850), 2, "bien épicé");
    first
        .controller
        .add_dish_to_cart(&dish("d2", "Yassa", 900), 1, "");
    let before = first.controller.snapshot().cart;
    drop(first);

    let second = TestApp::offline(Arc::new(FileStorage::new(&path)));
    let after = second.controller.snapshot().cart;
    assert_eq!(after, before);
    assert_eq!(second.controller.snapshot().cart_subtotal, Decimal::new(2600, 2));
}

#[tokio::test]
async fn test_corrupt_storage_file_is_repaired_by_next_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "{truncated").unwrap();

    let first = TestApp::offline(Arc::new(FileStorage::new(&path)));
    first.controller.start().await;
    first
        .controller
        .add_dish_to_cart(&dish("d1", "Mafé", 850), 1, "");
    first.controller.elevate_to_admin().await;
    assert!(first.controller.is_admin());
    drop(first);

    let second = TestApp::offline(Arc::new(FileStorage::new(&path)));
    second.controller.start().await;
    assert_eq!(second.controller.snapshot().cart_count, 1);
    assert!(second.controller.is_admin());
}

#[tokio::test]
async fn test_checkout_clears_persisted_cart() {
    let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
    let app = TestApp::offline(storage.clone());
    app.controller.start().await;
    app.controller
        .add_dish_to_cart(&dish("d1", "Mafé", 850), 1, "");

    let order = app
        .controller
        .checkout(digitrestau_client::CheckoutDetails::default())
        .await
        .unwrap();
    assert_eq!(order.items.len(), 1);

    let reloaded = TestApp::offline(storage);
    assert!(reloaded.controller.snapshot().cart.is_empty());
}
