//! Shopping cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Dish;
use crate::types::{DishId, line_total};

/// A dish in the cart.
///
/// Serialized flat (dish fields next to `quantity` and
/// `specialInstructions`), which is the shape persisted in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub dish: Dish,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: String,
}

impl CartItem {
    /// Create a line item.
    #[must_use]
    pub fn new(dish: Dish, quantity: u32, special_instructions: impl Into<String>) -> Self {
        Self {
            dish,
            quantity,
            special_instructions: special_instructions.into(),
        }
    }

    /// Uniqueness key of the line.
    #[must_use]
    pub const fn dish_id(&self) -> &DishId {
        &self.dish.id
    }

    /// Price of the whole line.
    #[must_use]
    pub fn total(&self) -> Decimal {
        line_total(self.dish.price, self.quantity)
    }
}
