//! Shopping cart mirrored to local storage.
//!
//! At most one line per dish. The whole cart is written to storage after
//! every mutation while the cart lock is held, so the stored copy always
//! matches the latest in-memory state.

use std::sync::Arc;

use digitrestau_core::{CartItem, Dish, DishId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{add_breadcrumb, capture_failure};
use crate::notifications::NotificationQueue;
use crate::storage::{CART_KEY, LocalStorage, StorageError};

/// The cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    items: Mutex<Vec<CartItem>>,
    storage: Arc<dyn LocalStorage>,
    notifications: NotificationQueue,
}

impl CartStore {
    /// Restore the cart from storage.
    ///
    /// A missing or unreadable stored cart yields an empty cart.
    pub fn load(storage: Arc<dyn LocalStorage>, notifications: NotificationQueue) -> Self {
        let items = match read_stored(storage.as_ref()) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to load cart, starting empty");
                Vec::new()
            }
        };
        debug!(lines = items.len(), "Cart loaded");

        Self {
            inner: Arc::new(CartInner {
                items: Mutex::new(items),
                storage,
                notifications,
            }),
        }
    }

    /// Add `quantity` of `dish`.
    ///
    /// An existing line is incremented; its instructions are replaced only
    /// when `instructions` is non-empty. A zero quantity leaves the cart
    /// untouched but is still reported.
    pub fn add(&self, dish: &Dish, quantity: u32, instructions: &str) {
        if quantity > 0 {
            self.add_line(dish, quantity, instructions);
        }
        self.inner
            .notifications
            .success(format!("{quantity}x {} ajouté au panier !", dish.name));
    }

    fn add_line(&self, dish: &Dish, quantity: u32, instructions: &str) {
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|line| line.dish.id == dish.id) {
                line.quantity = line.quantity.saturating_add(quantity);
                if !instructions.is_empty() {
                    instructions.clone_into(&mut line.special_instructions);
                }
            } else {
                items.push(CartItem::new(dish.clone(), quantity, instructions));
            }
        });

        info!(dish_id = %dish.id, quantity, "Added to cart");
        add_breadcrumb("cart", "Added dish", Some(&[("dish_id", dish.id.as_str())]));
    }

    /// Replace the quantity of a line. Zero or less removes it.
    ///
    /// Unknown dish ids are ignored.
    pub fn set_quantity(&self, dish_id: &DishId, quantity: i64) {
        if !self.contains(dish_id) {
            return;
        }
        self.mutate(|items| {
            if quantity <= 0 {
                items.retain(|line| &line.dish.id != dish_id);
            } else if let Some(line) = items.iter_mut().find(|line| &line.dish.id == dish_id) {
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            }
        });
    }

    /// Empty the cart.
    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.items.lock().clone()
    }

    #[must_use]
    pub fn contains(&self, dish_id: &DishId) -> bool {
        self.inner.items.lock().iter().any(|line| &line.dish.id == dish_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .items
            .lock()
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.inner.items.lock().iter().map(CartItem::total).sum()
    }

    fn mutate(&self, change: impl FnOnce(&mut Vec<CartItem>)) {
        let mut items = self.inner.items.lock();
        change(&mut items);
        if let Err(e) = write_stored(self.inner.storage.as_ref(), &items) {
            capture_failure("cart.persist", &e);
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.inner.items.lock().len())
            .finish_non_exhaustive()
    }
}

fn read_stored(storage: &dyn LocalStorage) -> Result<Vec<CartItem>, StorageError> {
    match storage.get_item(CART_KEY)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string())),
        None => Ok(Vec::new()),
    }
}

fn write_stored(storage: &dyn LocalStorage, items: &[CartItem]) -> Result<(), StorageError> {
    let json = serde_json::to_string(items).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    storage.set_item(CART_KEY, &json)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::ids::MonotonicMillis;
    use crate::notifications::Severity;
    use crate::storage::MemoryStorage;

    fn dish(id: &str, name: &str, cents: i64) -> Dish {
        Dish::new(id, name, Decimal::new(cents, 2))
    }

    fn cart_on(storage: Arc<MemoryStorage>) -> (CartStore, NotificationQueue) {
        let notifications = NotificationQueue::new(Arc::new(MonotonicMillis::new()));
        (CartStore::load(storage, notifications.clone()), notifications)
    }

    fn cart() -> (CartStore, NotificationQueue) {
        cart_on(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_add_merges_by_dish_id() {
        let (cart, _) = cart();
        let mafe = dish("d1", "Mafé", 850);
        cart.add(&mafe, 1, "");
        cart.add(&dish("d2", "Yassa", 900), 2, "");
        cart.add(&mafe, 3, "");

        let items = cart.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].dish.id.as_str(), "d1");
        assert_eq!(items[0].quantity, 4);
        assert_eq!(items[1].quantity, 2);
        assert_eq!(cart.item_count(), 6);
    }

    #[tokio::test]
    async fn test_blank_instructions_never_overwrite() {
        let (cart, _) = cart();
        let mafe = dish("d1", "Mafé", 850);
        cart.add(&mafe, 1, "sans piment");
        cart.add(&mafe, 1, "");
        assert_eq!(cart.items()[0].special_instructions, "sans piment");

        cart.add(&mafe, 1, "bien épicé");
        assert_eq!(cart.items()[0].special_instructions, "bien épicé");
    }

    #[tokio::test]
    async fn test_add_reports_success() {
        let (cart, notifications) = cart();
        cart.add(&dish("d1", "Mafé", 850), 2, "");
        let latest = notifications.latest().unwrap();
        assert_eq!(latest.severity, Severity::Success);
        assert_eq!(latest.message, "2x Mafé ajouté au panier !");
    }

    #[tokio::test]
    async fn test_add_zero_reports_without_adding_a_line() {
        let (cart, notifications) = cart();
        cart.add(&dish("d1", "Mafé", 850), 0, "");
        assert!(cart.is_empty());
        let latest = notifications.latest().unwrap();
        assert_eq!(latest.severity, Severity::Success);
        assert_eq!(latest.message, "0x Mafé ajouté au panier !");
    }

    #[tokio::test]
    async fn test_set_quantity_removes_at_or_below_zero() {
        let (cart, _) = cart();
        cart.add(&dish("d1", "Mafé", 850), 1, "");
        cart.add(&dish("d2", "Yassa", 900), 1, "");

        cart.set_quantity(&DishId::new("d1"), 0);
        cart.set_quantity(&DishId::new("d2"), -5);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_unknown_id_is_noop() {
        let storage = Arc::new(MemoryStorage::new());
        let (cart, _) = cart_on(storage.clone());
        cart.add(&dish("d1", "Mafé", 850), 1, "");
        let stored_before = storage.get_item(CART_KEY).unwrap();

        cart.set_quantity(&DishId::new("missing"), 5);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(storage.get_item(CART_KEY).unwrap(), stored_before);
    }

    #[tokio::test]
    async fn test_set_quantity_replaces() {
        let (cart, _) = cart();
        cart.add(&dish("d1", "Mafé", 850), 4, "");
        cart.set_quantity(&DishId::new("d1"), 2);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.subtotal(), Decimal::new(1700, 2));
    }

    #[tokio::test]
    async fn test_round_trip_through_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let (cart, _) = cart_on(storage.clone());
        cart.add(&dish("d1", "Mafé", 850), 2, "sans oignons");
        cart.add(&dish("d2", "Yassa", 900), 1, "");

        let (reloaded, _) = cart_on(storage);
        assert_eq!(reloaded.items(), cart.items());
    }

    #[tokio::test]
    async fn test_clear_persists_empty_cart() {
        let storage = Arc::new(MemoryStorage::new());
        let (cart, _) = cart_on(storage.clone());
        cart.add(&dish("d1", "Mafé", 850), 2, "");
        cart.clear();
        assert_eq!(storage.get_item(CART_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(CART_KEY, "{broken").unwrap();
        let notifications = NotificationQueue::new(Arc::new(MonotonicMillis::new()));
        let cart = CartStore::load(storage, notifications);
        assert!(cart.is_empty());
    }
}
