//! Meal boxes and restaurant settings.
//!
//! Both are plain value objects: loaded once, replaced wholesale on save.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::BoxId;

/// A pre-composed meal box sold as a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealBox {
    pub id: BoxId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Names of the dishes included in the box.
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Restaurant-wide settings edited from the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub restaurant_name: String,
    pub phone: String,
    pub address: String,
    pub opening_hours: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub minimum_order: Decimal,
    /// Whether the kitchen currently accepts new orders.
    pub accepting_orders: bool,
    pub logo_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            restaurant_name: "DigitRestau".to_owned(),
            phone: String::new(),
            address: String::new(),
            opening_hours: "11h00 - 23h00".to_owned(),
            delivery_fee: Decimal::ZERO,
            minimum_order: Decimal::ZERO,
            accepting_orders: true,
            logo_url: None,
        }
    }
}
