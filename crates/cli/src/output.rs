//! Plain-text rendering of client state.

#![allow(clippy::print_stdout)]

use digitrestau_client::{Notification, Severity};
use digitrestau_core::{CartItem, CurrentUser, Dish, Order, format_price};
use rust_decimal::Decimal;

pub fn dishes(dishes: &[Dish]) {
    if dishes.is_empty() {
        println!("Aucun plat.");
        return;
    }
    for dish in dishes {
        let rating = dish
            .average_rating()
            .map_or_else(String::new, |r| format!("  ★ {r:.1} ({})", dish.reviews.len()));
        let availability = if dish.available { "" } else { "  [indisponible]" };
        println!(
            "{:<8} {:<32} {:>8} €{rating}{availability}",
            dish.id,
            dish.name,
            format_price(dish.price)
        );
    }
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("Aucune commande.");
        return;
    }
    for order in orders {
        println!(
            "{}  {}  {:<16} {:>8} €  {}",
            order.id,
            order.date.format("%Y-%m-%d %H:%M"),
            order.status,
            format_price(order.total),
            order.customer_name
        );
        for line in &order.items {
            println!("    {}x {}", line.quantity, line.name);
        }
    }
}

pub fn order_placed(order: &Order) {
    println!(
        "Commande {} enregistrée ({}), total {} €.",
        order.id,
        order.status,
        format_price(order.total)
    );
}

pub fn cart(items: &[CartItem], count: u64, subtotal: Decimal) {
    if items.is_empty() {
        println!("Panier vide.");
        return;
    }
    for item in items {
        print!(
            "{:<8} {}x {:<32} {:>8} €",
            item.dish.id,
            item.quantity,
            item.dish.name,
            format_price(item.total())
        );
        if item.special_instructions.is_empty() {
            println!();
        } else {
            println!("  ({})", item.special_instructions);
        }
    }
    println!("{count} article(s), sous-total {} €", format_price(subtotal));
}

pub fn user(user: Option<&CurrentUser>, is_admin: bool) {
    let Some(user) = user else {
        println!("Non connecté.");
        return;
    };
    let role = if is_admin { "administrateur" } else { "client" };
    let email = user.email.as_ref().map_or("-", |e| e.as_str());
    println!("{} <{email}> ({role}), {} points", user.name, user.points);
}

pub fn notifications(notifications: &[Notification]) {
    for notification in notifications {
        let marker = match notification.severity {
            Severity::Success => "✔",
            Severity::Error => "✖",
            Severity::Info => "ℹ",
        };
        println!("{marker} {}", notification.message);
    }
}
