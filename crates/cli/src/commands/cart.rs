//! Cart and checkout commands.

use digitrestau_client::{AppController, CheckoutDetails};
use digitrestau_core::DishId;

use super::CliError;
use crate::output;

/// Add a dish by id.
///
/// # Errors
///
/// Returns `CliError::UnknownDish` if the menu has no such dish.
pub fn add(
    controller: &AppController,
    dish_id: &str,
    quantity: u32,
    instructions: &str,
) -> Result<(), CliError> {
    let dish_id = DishId::new(dish_id);
    if !controller.snapshot().dishes.iter().any(|d| d.id == dish_id) {
        return Err(CliError::UnknownDish(dish_id.into_inner()));
    }
    controller.add_to_cart(&dish_id, quantity, instructions);
    show(controller);
    Ok(())
}

/// Replace a line's quantity.
///
/// # Errors
///
/// Returns `CliError::UnknownDish` if the cart has no line for the dish.
pub fn set(controller: &AppController, dish_id: &str, quantity: i64) -> Result<(), CliError> {
    let dish_id = DishId::new(dish_id);
    if !controller.snapshot().cart.iter().any(|line| line.dish.id == dish_id) {
        return Err(CliError::UnknownDish(dish_id.into_inner()));
    }
    controller.update_cart_quantity(&dish_id, quantity);
    show(controller);
    Ok(())
}

pub fn show(controller: &AppController) {
    let snapshot = controller.snapshot();
    output::cart(&snapshot.cart, snapshot.cart_count, snapshot.cart_subtotal);
}

pub async fn checkout(
    controller: &AppController,
    customer_name: String,
    customer_phone: String,
    delivery_address: Option<String>,
    notes: Option<String>,
) {
    let details = CheckoutDetails {
        customer_name,
        customer_phone,
        delivery_address,
        notes,
    };
    if let Some(order) = controller.checkout(details).await {
        output::order_placed(&order);
    }
}
