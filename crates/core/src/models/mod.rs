//! Domain entities.
//!
//! Field names serialize in camelCase to match the JSON the remote data
//! service and the persisted cart already use.

pub mod cart;
pub mod catalog;
pub mod dish;
pub mod order;
pub mod user;

pub use cart::CartItem;
pub use catalog::{MealBox, Settings};
pub use dish::{Dish, NewReview, Review, sort_by_id_desc};
pub use order::{NewOrder, Order, OrderLine, sort_newest_first};
pub use user::{
    CurrentUser, LOCAL_ADMIN_ID, LOCAL_ADMIN_NAME, LOCAL_ADMIN_PHONE, LOCAL_ADMIN_POINTS,
};
