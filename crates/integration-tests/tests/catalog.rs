//! Integration tests for the catalog.
//!
//! Startup loading, optimistic saves without rollback, and order placement.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use digitrestau_client::test_support::InMemoryBackend;
use digitrestau_client::{Severity, View};
use digitrestau_core::{DishId, NewOrder, NewReview, OrderStatus, Settings};
use digitrestau_integration_tests::{TestApp, dish};
use rust_decimal::Decimal;

fn is_newest_first(app: &TestApp) -> bool {
    let orders = app.controller.snapshot().orders;
    orders.windows(2).all(|pair| pair[0].date >= pair[1].date)
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_initial_load_populates_everything() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_dishes(vec![dish("d1", "Mafé", 850), dish("d2", "Yassa", 900)]);
    backend.seed_orders(vec![
        InMemoryBackend::order_at("DR-000001", 100),
        InMemoryBackend::order_at("DR-000002", 300),
        InMemoryBackend::order_at("DR-000003", 200),
    ]);
    backend.seed_settings(Settings {
        restaurant_name: "Chez Laure".to_owned(),
        ..Settings::default()
    });
    let app = TestApp::online(backend);

    assert!(app.controller.is_loading());
    app.controller.start().await;
    assert!(!app.controller.is_loading());

    let snapshot = app.controller.snapshot();
    assert_eq!(snapshot.dishes[0].id.as_str(), "d2");
    assert_eq!(snapshot.orders[0].id.as_str(), "DR-000002");
    assert_eq!(snapshot.settings.restaurant_name, "Chez Laure");
    assert!(is_newest_first(&app));
    assert!(app.messages().is_empty());
}

#[tokio::test]
async fn test_failed_load_posts_one_error_and_finishes() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail_fetches(true);
    let app = TestApp::online(backend);
    app.controller.start().await;

    assert!(!app.controller.is_loading());
    let snapshot = app.controller.snapshot();
    assert!(snapshot.dishes.is_empty());
    assert_eq!(snapshot.settings, Settings::default());
    let errors = snapshot
        .notifications
        .iter()
        .filter(|n| n.severity == Severity::Error)
        .count();
    assert_eq!(errors, 1);
}

// =============================================================================
// Optimistic saves
// =============================================================================

#[tokio::test]
async fn test_failed_dish_save_keeps_sorted_list() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = TestApp::online(backend);
    app.controller.start().await;
    app.backend().fail_saves(true);

    app.controller
        .update_dishes(
            vec![dish("d1", "Mafé", 850), dish("d3", "Thiéb", 1200), dish("d2", "Yassa", 900)],
            "Plat ajouté.",
        )
        .await;

    let ids: Vec<String> = app
        .controller
        .snapshot()
        .dishes
        .iter()
        .map(|d| d.id.to_string())
        .collect();
    assert_eq!(ids, ["d3", "d2", "d1"]);
    let latest = app.controller.notifications().latest().unwrap();
    assert_eq!(latest.severity, Severity::Error);
    assert!(!app.messages().contains(&"Plat ajouté.".to_owned()));
}

#[tokio::test]
async fn test_successful_dish_save_reaches_backend() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = TestApp::online(backend);
    app.controller.start().await;

    app.controller
        .update_dishes(vec![dish("d1", "Mafé", 850)], "Plat ajouté.")
        .await;

    assert_eq!(app.backend().dishes().len(), 1);
    assert_eq!(
        app.controller.notifications().latest().unwrap().message,
        "Plat ajouté."
    );
}

#[tokio::test]
async fn test_reviews_round_trip() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_dishes(vec![dish("d1", "Mafé", 850)]);
    let app = TestApp::online(backend);
    app.controller.start().await;

    app.controller
        .add_review(
            &DishId::new("d1"),
            NewReview {
                author: "Awa".to_owned(),
                rating: 4,
                text: "Très bon".to_owned(),
            },
        )
        .await;
    let review = app.backend().dishes()[0].reviews[0].clone();
    assert_eq!(review.author, "Awa");

    app.controller.delete_review(&DishId::new("d1"), &review.id).await;
    assert!(app.backend().dishes()[0].reviews.is_empty());
    assert_eq!(
        app.controller.notifications().latest().unwrap().message,
        "Avis supprimé."
    );
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_add_order_shape() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = TestApp::online(backend);
    app.controller.start().await;

    let order = app
        .controller
        .add_order(NewOrder {
            subtotal: Decimal::new(2350, 2),
            total: Decimal::new(2350, 2),
            ..NewOrder::default()
        })
        .await;

    assert_eq!(order.status, OrderStatus::Confirmed);
    assert!(order.id.as_str().starts_with("DR-"));
    assert_eq!(order.subtotal, Decimal::new(2350, 2));
    assert_eq!(app.backend().orders()[0].id, order.id);
}

#[tokio::test]
async fn test_burst_of_orders_have_distinct_ids() {
    let app = TestApp::online(Arc::new(InMemoryBackend::new()));
    app.controller.start().await;

    let mut ids = Vec::new();
    for _ in 0..20 {
        ids.push(app.controller.add_order(NewOrder::default()).await.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_update_orders_sorts_newest_first() {
    let app = TestApp::online(Arc::new(InMemoryBackend::new()));
    app.controller.start().await;

    app.controller
        .update_orders(vec![
            InMemoryBackend::order_at("a", 10),
            InMemoryBackend::order_at("c", 30),
            InMemoryBackend::order_at("b", 20),
        ])
        .await;

    assert!(is_newest_first(&app));
    assert_eq!(
        app.controller.notifications().latest().unwrap().message,
        "Commandes mises à jour."
    );
}

#[tokio::test]
async fn test_order_history_is_per_user() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.register(
        "awa@example.com",
        "secret",
        digitrestau_client::remote::UserMetadata::default(),
    );
    let app = TestApp::online(backend);
    app.controller.start().await;
    app.controller.login("awa@example.com", "secret").await;
    app.controller.navigate(View::Menu);

    app.controller
        .add_dish_to_cart(&dish("d1", "Mafé", 850), 1, "");
    let mine = app
        .controller
        .checkout(digitrestau_client::CheckoutDetails::default())
        .await
        .unwrap();
    app.controller.add_order(NewOrder::default()).await;

    let history = app.controller.my_orders();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, mine.id);
    assert_eq!(history[0].customer_name, "awa");
    assert_eq!(app.controller.snapshot().orders.len(), 2);
}
