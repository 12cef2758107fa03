//! Order listing, reviews and order status.

use digitrestau_client::AppController;
use digitrestau_core::{DishId, NewReview, OrderId, OrderStatus};

use super::CliError;
use crate::output;

/// Author shown on reviews written while signed out.
const ANONYMOUS_AUTHOR: &str = "Anonyme";

/// All orders for administrators, the user's own otherwise.
pub fn orders(controller: &AppController) {
    if controller.is_admin() {
        output::orders(&controller.snapshot().orders);
    } else {
        output::orders(&controller.my_orders());
    }
}

/// Publish a review under the current user's name.
///
/// # Errors
///
/// Returns `CliError::UnknownDish` if the menu has no such dish.
pub async fn review(
    controller: &AppController,
    dish_id: &str,
    rating: u8,
    text: String,
) -> Result<(), CliError> {
    let dish_id = DishId::new(dish_id);
    if !controller.snapshot().dishes.iter().any(|d| d.id == dish_id) {
        return Err(CliError::UnknownDish(dish_id.into_inner()));
    }
    let author = controller
        .current_user()
        .map_or_else(|| ANONYMOUS_AUTHOR.to_owned(), |user| user.name);

    controller
        .add_review(
            &dish_id,
            NewReview {
                author,
                rating,
                text,
            },
        )
        .await;
    Ok(())
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns `CliError::NotAdmin` for non-administrators and
/// `CliError::UnknownOrder` if no order has that id.
pub async fn set_status(
    controller: &AppController,
    order_id: &str,
    status: String,
) -> Result<(), CliError> {
    if !controller.is_admin() {
        return Err(CliError::NotAdmin);
    }
    let order_id = OrderId::new(order_id);
    if !controller.snapshot().orders.iter().any(|o| o.id == order_id) {
        return Err(CliError::UnknownOrder(order_id.into_inner()));
    }
    controller
        .set_order_status(&order_id, OrderStatus::from(status))
        .await;
    Ok(())
}
