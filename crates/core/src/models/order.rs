//! Customer orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::CartItem;
use crate::types::{DishId, OrderId, OrderStatus, UserId, line_total};

/// One line of an order, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub dish_id: DishId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: String,
}

impl OrderLine {
    /// Price of the whole line.
    #[must_use]
    pub fn total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            dish_id: item.dish.id.clone(),
            name: item.dish.name.clone(),
            unit_price: item.dish.price,
            quantity: item.quantity,
            special_instructions: item.special_instructions.clone(),
        }
    }
}

/// Order data supplied by the client before the identifier, date and status
/// are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: Option<String>,
    pub items: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub notes: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Creation instant; the canonical sort key (newest first).
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub delivery_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub total: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Order {
    /// Turn client-supplied order data into a placed order.
    #[must_use]
    pub fn place(new: NewOrder, id: OrderId, date: DateTime<Utc>, status: OrderStatus) -> Self {
        Self {
            id,
            date,
            status,
            user_id: new.user_id,
            customer_name: new.customer_name,
            customer_phone: new.customer_phone,
            delivery_address: new.delivery_address,
            items: new.items,
            subtotal: new.subtotal,
            delivery_fee: new.delivery_fee,
            total: new.total,
            notes: new.notes,
        }
    }

    /// Whether the order belongs to `user_id`.
    #[must_use]
    pub fn is_for(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }
}

/// Sort orders newest first.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.date.cmp(&a.date));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn order_at(id: &str, secs: i64) -> Order {
        Order::place(
            NewOrder::default(),
            OrderId::new(id),
            Utc.timestamp_opt(secs, 0).unwrap(),
            OrderStatus::Confirmed,
        )
    }

    #[test]
    fn test_sort_newest_first() {
        let mut orders = vec![order_at("a", 10), order_at("b", 30), order_at("c", 20)];
        sort_newest_first(&mut orders);
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_place_keeps_amounts() {
        let new = NewOrder {
            subtotal: Decimal::new(2350, 2),
            total: Decimal::new(2350, 2),
            ..NewOrder::default()
        };
        let order = Order::place(
            new,
            OrderId::new("DR-000001"),
            Utc::now(),
            OrderStatus::Confirmed,
        );
        assert_eq!(order.subtotal, Decimal::new(2350, 2));
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn test_deserialize_sparse_remote_row() {
        let json = r#"{"id":"DR-482913","date":"2025-03-02T18:45:00Z","status":"Prête","total":31}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Ready);
        assert_eq!(order.total, Decimal::new(31, 0));
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_is_for() {
        let mut order = order_at("a", 1);
        order.user_id = Some(UserId::new("u1"));
        assert!(order.is_for(&UserId::new("u1")));
        assert!(!order.is_for(&UserId::new("u2")));
    }
}
