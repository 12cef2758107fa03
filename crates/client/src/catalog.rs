//! Catalog synchronization.
//!
//! Holds dishes, orders, boxes and settings in memory. Every mutation is
//! applied locally first and then persisted; a failed save is reported but
//! never rolled back, so the in-memory catalog stays the system of record
//! for the rest of the session.

use std::sync::Arc;

use chrono::Utc;
use digitrestau_core::{
    Dish, DishId, MealBox, NewOrder, NewReview, Order, OrderId, OrderStatus, Review, ReviewId,
    Settings, UserId, sort_by_id_desc, sort_newest_first,
};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::capture_failure;
use crate::ids::{MonotonicMillis, order_id_from_millis, review_id_from_millis};
use crate::notifications::NotificationQueue;
use crate::remote::{RemoteBackend, RemoteError};

/// Message shown when the startup load fails.
pub const LOAD_FAILED: &str = "Impossible de charger les données.";

#[derive(Debug, Clone, Default)]
struct CatalogState {
    dishes: Vec<Dish>,
    orders: Vec<Order>,
    boxes: Vec<MealBox>,
    settings: Settings,
}

/// In-memory catalog mirrored to the remote service.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CatalogSync {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    state: Mutex<CatalogState>,
    remote: Option<Arc<dyn RemoteBackend>>,
    notifications: NotificationQueue,
    ids: Arc<MonotonicMillis>,
}

impl CatalogSync {
    /// Create an empty catalog. Without a remote backend, saves are local only.
    pub fn new(
        remote: Option<Arc<dyn RemoteBackend>>,
        notifications: NotificationQueue,
        ids: Arc<MonotonicMillis>,
    ) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                state: Mutex::new(CatalogState::default()),
                remote,
                notifications,
                ids,
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Dishes, highest id first.
    #[must_use]
    pub fn dishes(&self) -> Vec<Dish> {
        self.inner.state.lock().dishes.clone()
    }

    #[must_use]
    pub fn dish(&self, dish_id: &DishId) -> Option<Dish> {
        self.inner
            .state
            .lock()
            .dishes
            .iter()
            .find(|d| &d.id == dish_id)
            .cloned()
    }

    /// Orders, newest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.inner.state.lock().orders.clone()
    }

    /// Orders placed by `user_id`, newest first.
    #[must_use]
    pub fn orders_for(&self, user_id: &UserId) -> Vec<Order> {
        self.inner
            .state
            .lock()
            .orders
            .iter()
            .filter(|o| o.is_for(user_id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn boxes(&self) -> Vec<MealBox> {
        self.inner.state.lock().boxes.clone()
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.inner.state.lock().settings.clone()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch all four collections concurrently.
    ///
    /// Any failed fetch fails the whole load: nothing is replaced and a
    /// single error notification is posted. Returns whether the load
    /// succeeded.
    #[instrument(skip(self))]
    pub async fn initial_load(&self) -> bool {
        let Some(remote) = self.inner.remote.clone() else {
            debug!("No remote backend, catalog starts empty");
            return true;
        };

        let fetched = tokio::try_join!(
            remote.get_dishes(),
            remote.get_orders(),
            remote.get_boxes(),
            remote.get_settings(),
        );

        match fetched {
            Ok((mut dishes, mut orders, boxes, settings)) => {
                sort_by_id_desc(&mut dishes);
                sort_newest_first(&mut orders);
                info!(
                    dishes = dishes.len(),
                    orders = orders.len(),
                    boxes = boxes.len(),
                    "Catalog loaded"
                );
                *self.inner.state.lock() = CatalogState {
                    dishes,
                    orders,
                    boxes,
                    settings,
                };
                true
            }
            Err(e) => {
                capture_failure("catalog.initial_load", &e);
                self.inner.notifications.error(LOAD_FAILED);
                false
            }
        }
    }

    /// Re-fetch the whole order collection and replace the local copy.
    #[instrument(skip(self))]
    pub async fn refresh_orders(&self) -> bool {
        let Some(remote) = self.inner.remote.clone() else {
            return false;
        };
        match remote.get_orders().await {
            Ok(mut orders) => {
                sort_newest_first(&mut orders);
                debug!(orders = orders.len(), "Orders refreshed");
                self.inner.state.lock().orders = orders;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh orders");
                false
            }
        }
    }

    // =========================================================================
    // Dishes and reviews
    // =========================================================================

    /// Replace the dish list and save it.
    #[instrument(skip(self, dishes), fields(count = dishes.len()))]
    pub async fn update_dishes(&self, mut dishes: Vec<Dish>, success_message: &str) {
        sort_by_id_desc(&mut dishes);
        self.inner.state.lock().dishes.clone_from(&dishes);

        let result = self
            .persist(|remote| async move { remote.save_dishes(&dishes).await })
            .await;
        self.report(
            "catalog.save_dishes",
            result,
            success_message,
            "Erreur lors de la sauvegarde des plats.",
        );
    }

    /// Publish a review on a dish. Unknown dishes are ignored.
    #[instrument(skip(self, review))]
    pub async fn add_review(&self, dish_id: &DishId, review: NewReview) {
        let review = review.with_id(ReviewId::new(review_id_from_millis(self.inner.ids.next())));
        let Some(dish) = self.replace_dish(dish_id, |dish| dish.with_review_prepended(review))
        else {
            return;
        };
        self.save_dish(
            dish,
            "Votre avis a été publié !",
            "Erreur lors de l'envoi de l'avis.",
        )
        .await;
    }

    /// Replace a review by id. Unknown dishes are ignored.
    #[instrument(skip(self, review), fields(review_id = %review.id))]
    pub async fn edit_review(&self, dish_id: &DishId, review: Review) {
        let Some(dish) = self.replace_dish(dish_id, |dish| dish.with_review_replaced(&review)) else {
            return;
        };
        self.save_dish(
            dish,
            "Avis mis à jour.",
            "Erreur lors de la mise à jour de l'avis.",
        )
        .await;
    }

    /// Remove a review by id. Unknown dishes are ignored.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, dish_id: &DishId, review_id: &ReviewId) {
        let Some(dish) = self.replace_dish(dish_id, |dish| dish.without_review(review_id)) else {
            return;
        };
        self.save_dish(dish, "Avis supprimé.", "Erreur lors de la suppression de l'avis.")
            .await;
    }

    /// Swap the dish `dish_id` for `change(dish)` in place.
    fn replace_dish(&self, dish_id: &DishId, change: impl FnOnce(&Dish) -> Dish) -> Option<Dish> {
        let mut state = self.inner.state.lock();
        let Some(slot) = state.dishes.iter_mut().find(|d| &d.id == dish_id) else {
            debug!(dish_id = %dish_id, "Dish not found, ignoring");
            return None;
        };
        *slot = change(slot);
        Some(slot.clone())
    }

    async fn save_dish(&self, dish: Dish, success: &str, failure: &str) {
        let result = self
            .persist(|remote| async move { remote.save_dishes(std::slice::from_ref(&dish)).await })
            .await;
        self.report("catalog.save_dish", result, success, failure);
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place a new order.
    ///
    /// The order gets a `DR-` identifier, the current instant and the
    /// initial status, is prepended locally, then sent to the service.
    #[instrument(skip(self, new_order))]
    pub async fn add_order(&self, new_order: NewOrder) -> Order {
        let id = OrderId::new(order_id_from_millis(self.inner.ids.next()));
        let order = Order::place(new_order, id, Utc::now(), OrderStatus::Confirmed);
        self.inner.state.lock().orders.insert(0, order.clone());
        info!(order_id = %order.id, total = %order.total, "Order placed");

        let placed = order.clone();
        let result = self
            .persist(|remote| async move { remote.create_order(&placed).await })
            .await;
        if let Err(e) = result {
            capture_failure("catalog.create_order", &e);
            self.inner
                .notifications
                .error("Erreur lors de l'envoi de la commande au serveur.");
        }
        order
    }

    /// Replace the order list and save it.
    #[instrument(skip(self, orders), fields(count = orders.len()))]
    pub async fn update_orders(&self, mut orders: Vec<Order>) {
        sort_newest_first(&mut orders);
        self.inner.state.lock().orders.clone_from(&orders);

        let result = self
            .persist(|remote| async move { remote.save_orders(&orders).await })
            .await;
        self.report(
            "catalog.save_orders",
            result,
            "Commandes mises à jour.",
            "Erreur sauvegarde commandes.",
        );
    }

    /// Move one order to `status`. Unknown orders are ignored.
    pub async fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) {
        let mut orders = self.orders();
        let Some(order) = orders.iter_mut().find(|o| &o.id == order_id) else {
            debug!(order_id = %order_id, "Order not found, ignoring");
            return;
        };
        order.status = status;
        self.update_orders(orders).await;
    }

    // =========================================================================
    // Boxes and settings
    // =========================================================================

    /// Replace the box list and save it.
    #[instrument(skip(self, boxes), fields(count = boxes.len()))]
    pub async fn update_boxes(&self, boxes: Vec<MealBox>) {
        self.inner.state.lock().boxes.clone_from(&boxes);

        let result = self
            .persist(|remote| async move { remote.save_boxes(&boxes).await })
            .await;
        self.report(
            "catalog.save_boxes",
            result,
            "Boxs mises à jour.",
            "Erreur lors de la sauvegarde des boxs.",
        );
    }

    /// Replace the settings and save them.
    #[instrument(skip(self, settings))]
    pub async fn update_settings(&self, settings: Settings) {
        self.inner.state.lock().settings = settings.clone();

        let result = self
            .persist(|remote| async move { remote.save_settings(&settings).await })
            .await;
        self.report(
            "catalog.save_settings",
            result,
            "Paramètres sauvegardés.",
            "Erreur lors de la sauvegarde des paramètres.",
        );
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Run `save` against the remote backend, or succeed locally without one.
    async fn persist<F, Fut>(&self, save: F) -> Result<(), RemoteError>
    where
        F: FnOnce(Arc<dyn RemoteBackend>) -> Fut,
        Fut: Future<Output = Result<(), RemoteError>>,
    {
        match self.inner.remote.clone() {
            Some(remote) => save(remote).await,
            None => Ok(()),
        }
    }

    fn report(&self, operation: &str, result: Result<(), RemoteError>, success: &str, failure: &str) {
        match result {
            Ok(()) => {
                self.inner.notifications.success(success);
            }
            Err(e) => {
                capture_failure(operation, &e);
                self.inner.notifications.error(failure);
            }
        }
    }
}

impl std::fmt::Debug for CatalogSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CatalogSync")
            .field("dishes", &state.dishes.len())
            .field("orders", &state.orders.len())
            .field("boxes", &state.boxes.len())
            .field("online", &self.inner.remote.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::notifications::Severity;
    use crate::test_support::InMemoryBackend;

    fn catalog_with(backend: &Arc<InMemoryBackend>) -> (CatalogSync, NotificationQueue) {
        let ids = Arc::new(MonotonicMillis::new());
        let notifications = NotificationQueue::new(ids.clone());
        let remote: Arc<dyn RemoteBackend> = backend.clone();
        (
            CatalogSync::new(Some(remote), notifications.clone(), ids),
            notifications,
        )
    }

    fn dish(id: &str) -> Dish {
        Dish::new(id, format!("Plat {id}"), Decimal::new(1000, 2))
    }

    fn review(author: &str) -> NewReview {
        NewReview {
            author: author.to_owned(),
            rating: 5,
            text: "Délicieux".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_initial_load_sorts() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_dishes(vec![dish("d1"), dish("d3"), dish("d2")]);
        backend.seed_orders(vec![
            InMemoryBackend::order_at("DR-000001", 10),
            InMemoryBackend::order_at("DR-000003", 30),
            InMemoryBackend::order_at("DR-000002", 20),
        ]);
        let (catalog, _) = catalog_with(&backend);

        assert!(catalog.initial_load().await);
        let dish_ids: Vec<String> = catalog.dishes().iter().map(|d| d.id.to_string()).collect();
        assert_eq!(dish_ids, ["d3", "d2", "d1"]);
        let order_ids: Vec<String> = catalog.orders().iter().map(|o| o.id.to_string()).collect();
        assert_eq!(order_ids, ["DR-000003", "DR-000002", "DR-000001"]);
    }

    #[tokio::test]
    async fn test_initial_load_failure_is_all_or_nothing() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_dishes(vec![dish("d1")]);
        backend.fail_fetches(true);
        let (catalog, notifications) = catalog_with(&backend);

        assert!(!catalog.initial_load().await);
        assert!(catalog.dishes().is_empty());
        let errors: Vec<_> = notifications
            .snapshot()
            .into_iter()
            .filter(|n| n.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, LOAD_FAILED);
    }

    #[tokio::test]
    async fn test_update_dishes_failure_keeps_optimistic_state() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_saves(true);
        let (catalog, notifications) = catalog_with(&backend);

        catalog
            .update_dishes(vec![dish("d1"), dish("d9"), dish("d5")], "Plats enregistrés.")
            .await;

        let ids: Vec<String> = catalog.dishes().iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, ["d9", "d5", "d1"]);
        let latest = notifications.latest().unwrap();
        assert_eq!(latest.severity, Severity::Error);
        assert_eq!(latest.message, "Erreur lors de la sauvegarde des plats.");
        assert!(
            notifications
                .snapshot()
                .iter()
                .all(|n| n.message != "Plats enregistrés.")
        );
    }

    #[tokio::test]
    async fn test_add_review_saves_only_that_dish() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_dishes(vec![dish("d1"), dish("d2")]);
        let (catalog, notifications) = catalog_with(&backend);
        catalog.initial_load().await;

        catalog.add_review(&DishId::new("d1"), review("Awa")).await;
        catalog.add_review(&DishId::new("d1"), review("Moussa")).await;

        let d1 = catalog.dish(&DishId::new("d1")).unwrap();
        assert_eq!(d1.reviews.len(), 2);
        assert_eq!(d1.reviews[0].author, "Moussa");
        assert!(d1.reviews[0].id.as_str().starts_with('r'));
        assert_ne!(d1.reviews[0].id, d1.reviews[1].id);

        let saved = backend.saved_dish_batches();
        assert!(saved.iter().all(|batch| batch.len() == 1));
        assert_eq!(
            notifications.latest().unwrap().message,
            "Votre avis a été publié !"
        );
    }

    #[tokio::test]
    async fn test_review_on_unknown_dish_is_silent() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, notifications) = catalog_with(&backend);

        catalog.add_review(&DishId::new("nope"), review("Awa")).await;
        catalog
            .delete_review(&DishId::new("nope"), &ReviewId::new("r1"))
            .await;

        assert!(notifications.snapshot().is_empty());
        assert!(backend.saved_dish_batches().is_empty());
    }

    #[tokio::test]
    async fn test_edit_and_delete_review() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_dishes(vec![dish("d1")]);
        let (catalog, _) = catalog_with(&backend);
        catalog.initial_load().await;
        catalog.add_review(&DishId::new("d1"), review("Awa")).await;

        let mut edited = catalog.dish(&DishId::new("d1")).unwrap().reviews[0].clone();
        edited.rating = 3;
        catalog.edit_review(&DishId::new("d1"), edited.clone()).await;
        assert_eq!(catalog.dish(&DishId::new("d1")).unwrap().reviews[0].rating, 3);

        catalog.delete_review(&DishId::new("d1"), &edited.id).await;
        assert!(catalog.dish(&DishId::new("d1")).unwrap().reviews.is_empty());
    }

    #[tokio::test]
    async fn test_add_order_assigns_identity() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, _) = catalog_with(&backend);

        let order = catalog
            .add_order(NewOrder {
                subtotal: Decimal::new(2350, 2),
                ..NewOrder::default()
            })
            .await;

        assert!(order.id.as_str().starts_with("DR-"));
        assert_eq!(order.id.as_str().len(), 9);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.subtotal, Decimal::new(2350, 2));
        assert_eq!(catalog.orders()[0].id, order.id);
        assert_eq!(backend.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_rapid_orders_do_not_collide() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, _) = catalog_with(&backend);
        let a = catalog.add_order(NewOrder::default()).await;
        let b = catalog.add_order(NewOrder::default()).await;
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_add_order_failure_keeps_order() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_saves(true);
        let (catalog, notifications) = catalog_with(&backend);

        catalog.add_order(NewOrder::default()).await;
        assert_eq!(catalog.orders().len(), 1);
        assert_eq!(
            notifications.latest().unwrap().message,
            "Erreur lors de l'envoi de la commande au serveur."
        );
    }

    #[tokio::test]
    async fn test_update_orders_sorts_newest_first() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, _) = catalog_with(&backend);
        catalog
            .update_orders(vec![
                InMemoryBackend::order_at("a", 1),
                InMemoryBackend::order_at("c", 3),
                InMemoryBackend::order_at("b", 2),
            ])
            .await;
        let ids: Vec<String> = catalog.orders().iter().map(|o| o.id.to_string()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_set_order_status() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, _) = catalog_with(&backend);
        let order = catalog.add_order(NewOrder::default()).await;

        catalog.set_order_status(&order.id, OrderStatus::Ready).await;
        assert_eq!(catalog.orders()[0].status, OrderStatus::Ready);
        assert_eq!(backend.orders()[0].status, OrderStatus::Ready);
    }

    #[tokio::test]
    async fn test_settings_and_boxes_report_both_ways() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, notifications) = catalog_with(&backend);

        catalog.update_settings(Settings::default()).await;
        assert_eq!(
            notifications.latest().unwrap().message,
            "Paramètres sauvegardés."
        );

        backend.fail_saves(true);
        catalog.update_boxes(Vec::new()).await;
        assert_eq!(notifications.latest().unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_orders_for_user() {
        let backend = Arc::new(InMemoryBackend::new());
        let (catalog, _) = catalog_with(&backend);
        let awa = UserId::new("awa");
        catalog
            .add_order(NewOrder {
                user_id: Some(awa.clone()),
                ..NewOrder::default()
            })
            .await;
        catalog.add_order(NewOrder::default()).await;

        assert_eq!(catalog.orders_for(&awa).len(), 1);
    }

    #[tokio::test]
    async fn test_offline_saves_succeed_locally() {
        let ids = Arc::new(MonotonicMillis::new());
        let notifications = NotificationQueue::new(ids.clone());
        let catalog = CatalogSync::new(None, notifications.clone(), ids);

        assert!(catalog.initial_load().await);
        catalog.update_boxes(Vec::new()).await;
        assert_eq!(notifications.latest().unwrap().message, "Boxs mises à jour.");
        assert!(!catalog.refresh_orders().await);
    }
}
