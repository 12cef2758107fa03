//! Order status values.
//!
//! The remote `orders` table stores the status as free text written by the
//! admin surface. Known values map to dedicated variants; anything else is
//! preserved verbatim so a newer admin build cannot break older clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Waiting for the kitchen to accept it.
    Pending,
    /// Initial status of every order placed by a client.
    #[default]
    Confirmed,
    /// Being cooked.
    Preparing,
    /// Ready for pickup or delivery.
    Ready,
    /// Out for delivery.
    Delivering,
    /// Handed to the customer.
    Delivered,
    /// Cancelled by the restaurant or the customer.
    Cancelled,
    /// Status written by another client that this build does not know.
    Other(String),
}

impl OrderStatus {
    /// Wire label of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "En attente",
            Self::Confirmed => "Confirmée",
            Self::Preparing => "En préparation",
            Self::Ready => "Prête",
            Self::Delivering => "En livraison",
            Self::Delivered => "Livrée",
            Self::Cancelled => "Annulée",
            Self::Other(label) => label,
        }
    }

    /// Whether the order can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl From<String> for OrderStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "En attente" => Self::Pending,
            "Confirmée" => Self::Confirmed,
            "En préparation" => Self::Preparing,
            "Prête" => Self::Ready,
            "En livraison" => Self::Delivering,
            "Livrée" => Self::Delivered,
            "Annulée" => Self::Cancelled,
            _ => Self::Other(label),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
