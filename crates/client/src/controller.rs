//! Application controller.
//!
//! Wires the cart, catalog, identity resolver, notification queue and
//! realtime bridge together and is the only write path for the view layer.
//! Every operation terminates its failures here: callers observe outcomes
//! through notifications and snapshots, never through returned errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use digitrestau_core::{
    CartItem, CurrentUser, Dish, DishId, MealBox, NewOrder, NewReview, Order, OrderId, OrderLine,
    OrderStatus, Review, ReviewId, Settings, UserId, format_price,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::alerts::{AlertPlayer, AlertSound, SilentAlerts, play_quietly};
use crate::bridge::RealtimeBridge;
use crate::cart::CartStore;
use crate::catalog::CatalogSync;
use crate::config::ClientConfig;
use crate::identity::IdentityResolver;
use crate::ids::MonotonicMillis;
use crate::navigation::{Navigator, View};
use crate::notifications::{Notification, NotificationQueue};
use crate::remote::{AuthEvent, ChangeKind, RemoteBackend, TableChange};
use crate::storage::{LocalAdminOverride, LocalStorage};

/// Notification posted when an administrator receives a new order.
pub const NEW_ORDER_MESSAGE: &str = "🔔 Nouvelle commande reçue !";

// =============================================================================
// Construction inputs
// =============================================================================

/// External collaborators of the controller.
pub struct Collaborators {
    /// Local durable storage for the cart and the override flag.
    pub storage: Arc<dyn LocalStorage>,
    /// Remote backend; `None` runs the client in degraded local mode.
    pub remote: Option<Arc<dyn RemoteBackend>>,
    pub alerts: Arc<dyn AlertPlayer>,
}

impl Collaborators {
    /// Offline collaborators over `storage`, with silent alerts.
    pub fn offline(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            remote: None,
            alerts: Arc::new(SilentAlerts),
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn with_alerts(mut self, alerts: Arc<dyn AlertPlayer>) -> Self {
        self.alerts = alerts;
        self
    }
}

/// Contact and delivery details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDetails {
    /// Falls back to the current user's name when empty.
    pub customer_name: String,
    /// Falls back to the current user's phone when empty.
    pub customer_phone: String,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

/// Owned copy of everything the view layer renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub user: Option<CurrentUser>,
    pub is_admin: bool,
    pub is_loading: bool,
    pub view: View,
    pub cart: Vec<CartItem>,
    pub cart_count: u64,
    pub cart_subtotal: Decimal,
    pub dishes: Vec<Dish>,
    pub orders: Vec<Order>,
    pub boxes: Vec<MealBox>,
    pub settings: Settings,
    pub notifications: Vec<Notification>,
}

// =============================================================================
// AppController
// =============================================================================

/// The application controller.
///
/// Cheap to clone; clones share state. Dropping the last clone stops the
/// realtime listeners.
#[derive(Clone)]
pub struct AppController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    notifications: NotificationQueue,
    navigator: Navigator,
    cart: CartStore,
    catalog: CatalogSync,
    identity: IdentityResolver,
    remote: Option<Arc<dyn RemoteBackend>>,
    alerts: Arc<dyn AlertPlayer>,
    loading: AtomicBool,
    started: AtomicBool,
    bridge: Mutex<RealtimeBridge>,
}

impl AppController {
    /// Build the controller and restore the cart from storage.
    ///
    /// Nothing is fetched until [`Self::start`].
    pub fn new(collaborators: Collaborators, config: &ClientConfig) -> Self {
        let Collaborators {
            storage,
            remote,
            alerts,
        } = collaborators;

        let ids = Arc::new(MonotonicMillis::new());
        let notifications = NotificationQueue::with_ttl(ids.clone(), config.notification_ttl);
        let navigator = Navigator::new();
        let cart = CartStore::load(storage.clone(), notifications.clone());
        let catalog = CatalogSync::new(remote.clone(), notifications.clone(), ids);
        let identity = IdentityResolver::new(
            LocalAdminOverride::new(storage),
            remote.clone(),
            config.admin.clone(),
            notifications.clone(),
            navigator.clone(),
        );

        Self {
            inner: Arc::new(ControllerInner {
                notifications,
                navigator,
                cart,
                catalog,
                identity,
                remote,
                alerts,
                loading: AtomicBool::new(true),
                started: AtomicBool::new(false),
                bridge: Mutex::new(RealtimeBridge::new()),
            }),
        }
    }

    /// Subscribe to realtime events, then load the catalog and resolve the
    /// identity concurrently.
    ///
    /// The loading flag clears once both settle, whatever their outcome.
    /// Later calls do nothing.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.connect_realtime();

        let (loaded, ()) = tokio::join!(
            self.inner.catalog.initial_load(),
            self.inner.identity.refresh_from_remote(),
        );
        self.inner.loading.store(false, Ordering::SeqCst);
        info!(
            loaded,
            online = self.inner.remote.is_some(),
            is_admin = self.inner.identity.is_admin(),
            "Client started"
        );
    }

    fn connect_realtime(&self) {
        let Some(remote) = &self.inner.remote else {
            return;
        };
        let mut bridge = self.inner.bridge.lock();

        let weak = Arc::downgrade(&self.inner);
        bridge.on_auth_event(remote.auth_events(), move |event| {
            let controller = Self::upgrade(&weak);
            async move {
                if let Some(controller) = controller {
                    controller.handle_auth_event(&event);
                }
            }
        });

        let weak = Arc::downgrade(&self.inner);
        bridge.on_order_change(remote.order_changes(), move |change| {
            let controller = Self::upgrade(&weak);
            async move {
                if let Some(controller) = controller {
                    controller.handle_order_change(&change).await;
                }
            }
        });
    }

    fn upgrade(weak: &Weak<ControllerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Stop the realtime listeners.
    pub fn shutdown(&self) {
        self.inner.bridge.lock().shutdown();
        debug!("Realtime listeners stopped");
    }

    // =========================================================================
    // Realtime
    // =========================================================================

    /// Apply an auth state change pushed by the backend.
    pub fn handle_auth_event(&self, event: &AuthEvent) {
        self.inner.identity.handle_auth_event(event);
    }

    /// React to a change in the orders table.
    ///
    /// The whole order list is re-fetched. A new order alerts administrators
    /// audibly and with a notification; a status change only chimes.
    #[instrument(skip(self), fields(event_type = ?change.event_type))]
    pub async fn handle_order_change(&self, change: &TableChange) {
        self.inner.catalog.refresh_orders().await;

        match change.event_type {
            ChangeKind::Insert if self.inner.identity.is_admin() => {
                play_quietly(self.inner.alerts.as_ref(), AlertSound::NewOrder);
                self.inner.notifications.success(NEW_ORDER_MESSAGE);
            }
            ChangeKind::Update => {
                play_quietly(self.inner.alerts.as_ref(), AlertSound::StatusChange);
            }
            ChangeKind::Insert | ChangeKind::Delete => {}
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub async fn login(&self, identifier: &str, credential: &str) {
        self.inner.identity.login(identifier, credential).await;
    }

    pub async fn logout(&self) {
        self.inner.identity.logout().await;
    }

    pub async fn elevate_to_admin(&self) {
        self.inner.identity.elevate_to_admin().await;
    }

    /// Store the avatar of the local administrator.
    pub fn set_local_avatar(&self, avatar_url: &str) {
        self.inner.identity.set_local_avatar(avatar_url);
    }

    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.inner.identity.current_user()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.identity.is_admin()
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add `quantity` of the dish `dish_id`. Unknown dishes are ignored.
    pub fn add_to_cart(&self, dish_id: &DishId, quantity: u32, instructions: &str) {
        if let Some(dish) = self.inner.catalog.dish(dish_id) {
            self.inner.cart.add(&dish, quantity, instructions);
        } else {
            debug!(dish_id = %dish_id, "Unknown dish, not added");
        }
    }

    /// Add a dish the caller already holds.
    pub fn add_dish_to_cart(&self, dish: &Dish, quantity: u32, instructions: &str) {
        self.inner.cart.add(dish, quantity, instructions);
    }

    pub fn update_cart_quantity(&self, dish_id: &DishId, quantity: i64) {
        self.inner.cart.set_quantity(dish_id, quantity);
    }

    pub fn clear_cart(&self) {
        self.inner.cart.clear();
    }

    /// Place an order for the cart contents and empty the cart.
    ///
    /// Returns the placed order, or `None` when nothing was ordered.
    #[instrument(skip(self, details))]
    pub async fn checkout(&self, details: CheckoutDetails) -> Option<Order> {
        let items = self.inner.cart.items();
        if items.is_empty() {
            self.inner.notifications.info("Votre panier est vide.");
            return None;
        }

        let settings = self.inner.catalog.settings();
        if !settings.accepting_orders {
            self.inner
                .notifications
                .error("Le restaurant ne prend pas de commandes pour le moment.");
            return None;
        }
        let subtotal = self.inner.cart.subtotal();
        if subtotal < settings.minimum_order {
            self.inner.notifications.error(format!(
                "Le montant minimum de commande est de {} €.",
                format_price(settings.minimum_order)
            ));
            return None;
        }

        let user = self.inner.identity.current_user();
        let customer_name = non_empty_or(details.customer_name, || {
            user.as_ref().map(|u| u.name.clone())
        });
        let customer_phone = non_empty_or(details.customer_phone, || {
            user.as_ref().map(|u| u.phone.clone())
        });

        let new_order = NewOrder {
            user_id: user.map(|u| u.id),
            customer_name,
            customer_phone,
            delivery_address: details.delivery_address,
            items: items.iter().map(OrderLine::from).collect(),
            subtotal,
            delivery_fee: settings.delivery_fee,
            total: subtotal + settings.delivery_fee,
            notes: details.notes,
        };

        let order = self.inner.catalog.add_order(new_order).await;
        self.inner.cart.clear();
        Some(order)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn update_dishes(&self, dishes: Vec<Dish>, success_message: &str) {
        self.inner
            .catalog
            .update_dishes(dishes, success_message)
            .await;
    }

    pub async fn add_review(&self, dish_id: &DishId, review: NewReview) {
        self.inner.catalog.add_review(dish_id, review).await;
    }

    pub async fn edit_review(&self, dish_id: &DishId, review: Review) {
        self.inner.catalog.edit_review(dish_id, review).await;
    }

    pub async fn delete_review(&self, dish_id: &DishId, review_id: &ReviewId) {
        self.inner.catalog.delete_review(dish_id, review_id).await;
    }

    pub async fn add_order(&self, new_order: NewOrder) -> Order {
        self.inner.catalog.add_order(new_order).await
    }

    pub async fn update_orders(&self, orders: Vec<Order>) {
        self.inner.catalog.update_orders(orders).await;
    }

    pub async fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) {
        self.inner.catalog.set_order_status(order_id, status).await;
    }

    pub async fn update_boxes(&self, boxes: Vec<MealBox>) {
        self.inner.catalog.update_boxes(boxes).await;
    }

    pub async fn update_settings(&self, settings: Settings) {
        self.inner.catalog.update_settings(settings).await;
    }

    /// Orders placed by `user_id`, newest first.
    #[must_use]
    pub fn orders_for(&self, user_id: &UserId) -> Vec<Order> {
        self.inner.catalog.orders_for(user_id)
    }

    /// Orders of the current user, newest first. Empty when signed out.
    #[must_use]
    pub fn my_orders(&self) -> Vec<Order> {
        self.current_user()
            .map(|user| self.orders_for(&user.id))
            .unwrap_or_default()
    }

    // =========================================================================
    // View state
    // =========================================================================

    pub fn navigate(&self, view: View) {
        self.inner.navigator.navigate(view);
    }

    #[must_use]
    pub fn current_view(&self) -> View {
        self.inner.navigator.current()
    }

    /// Whether the startup load is still running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    #[must_use]
    pub fn snapshot(&self) -> AppSnapshot {
        let identity = self.inner.identity.identity();
        let catalog = &self.inner.catalog;
        AppSnapshot {
            user: identity.user,
            is_admin: identity.is_admin,
            is_loading: self.is_loading(),
            view: self.current_view(),
            cart: self.inner.cart.items(),
            cart_count: self.inner.cart.item_count(),
            cart_subtotal: self.inner.cart.subtotal(),
            dishes: catalog.dishes(),
            orders: catalog.orders(),
            boxes: catalog.boxes(),
            settings: catalog.settings(),
            notifications: self.inner.notifications.snapshot(),
        }
    }
}

impl std::fmt::Debug for AppController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppController")
            .field("online", &self.inner.remote.is_some())
            .field("loading", &self.is_loading())
            .field("view", &self.current_view())
            .finish_non_exhaustive()
    }
}

fn non_empty_or(value: String, fallback: impl FnOnce() -> Option<String>) -> String {
    if value.trim().is_empty() {
        fallback().unwrap_or_default()
    } else {
        value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::notifications::Severity;
    use crate::storage::MemoryStorage;
    use crate::test_support::InMemoryBackend;

    fn offline() -> AppController {
        AppController::new(
            Collaborators::offline(Arc::new(MemoryStorage::new())),
            &ClientConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_start_clears_loading() {
        let controller = offline();
        assert!(controller.is_loading());
        controller.start().await;
        assert!(!controller.is_loading());
        assert!(controller.current_user().is_none());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_info_only() {
        let controller = offline();
        controller.start().await;

        assert!(controller.checkout(CheckoutDetails::default()).await.is_none());
        let latest = controller.notifications().latest().unwrap();
        assert_eq!(latest.severity, Severity::Info);
        assert!(controller.snapshot().orders.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_builds_order_and_clears_cart() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_dishes(vec![Dish::new("d1", "Mafé", Decimal::new(850, 2))]);
        backend.seed_settings(Settings {
            delivery_fee: Decimal::new(250, 2),
            ..Settings::default()
        });
        let controller = AppController::new(
            Collaborators::offline(Arc::new(MemoryStorage::new())).with_remote(backend.clone()),
            &ClientConfig::default(),
        );
        controller.start().await;

        controller.add_to_cart(&DishId::new("d1"), 2, "sans piment");
        let order = controller
            .checkout(CheckoutDetails {
                customer_name: "Awa".to_owned(),
                ..CheckoutDetails::default()
            })
            .await
            .unwrap();

        assert_eq!(order.subtotal, Decimal::new(1700, 2));
        assert_eq!(order.delivery_fee, Decimal::new(250, 2));
        assert_eq!(order.total, Decimal::new(1950, 2));
        assert_eq!(order.items[0].special_instructions, "sans piment");
        assert!(controller.snapshot().cart.is_empty());
        assert_eq!(backend.orders().len(), 1);
        controller.shutdown();
    }

    #[tokio::test]
    async fn test_checkout_respects_closed_kitchen() {
        let controller = offline();
        controller.start().await;
        controller
            .update_settings(Settings {
                accepting_orders: false,
                ..Settings::default()
            })
            .await;
        controller.add_dish_to_cart(&Dish::new("d1", "Mafé", Decimal::ONE), 1, "");

        assert!(controller.checkout(CheckoutDetails::default()).await.is_none());
        assert!(!controller.snapshot().cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_to_cart_ignores_unknown_dish() {
        let controller = offline();
        controller.add_to_cart(&DishId::new("nope"), 1, "");
        assert_eq!(controller.snapshot().cart_count, 0);
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or("Awa".to_owned(), || None), "Awa");
        assert_eq!(non_empty_or("  ".to_owned(), || Some("Moussa".to_owned())), "Moussa");
        assert_eq!(non_empty_or(String::new(), || None), "");
    }
}
