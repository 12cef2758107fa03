//! DigitRestau CLI - Order from, and run, a DigitRestau restaurant.
//!
//! # Usage
//!
//! ```bash
//! # Browse the menu and fill the cart
//! digitrestau menu
//! digitrestau cart add d12 --quantity 2 --instructions "sans piment"
//! digitrestau checkout --name "Awa" --phone 0700000000
//!
//! # Sign in, then follow incoming orders
//! digitrestau login admin@digitrestau.com --password admin123
//! digitrestau watch
//! ```
//!
//! # Commands
//!
//! - `menu` / `orders` / `whoami` - Read the catalog and identity
//! - `login` / `logout` / `become-admin` / `avatar` - Manage the identity
//! - `cart` - Add, update, show or clear cart lines
//! - `checkout` - Order the cart contents
//! - `review` - Review a dish
//! - `status` - Move an order to a new status (back office)
//! - `watch` - Stay connected and print realtime activity
//!
//! Configuration comes from the environment; see `digitrestau_client::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use digitrestau_client::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bell;
mod commands;
mod output;

#[derive(Parser)]
#[command(name = "digitrestau")]
#[command(author, version, about = "DigitRestau ordering client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dishes
    Menu,
    /// List orders (all of them for administrators, your own otherwise)
    Orders,
    /// Show the current user
    Whoami,
    /// Sign in
    Login {
        /// Email address (or phone number)
        identifier: String,

        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Grant administrator access to the current user
    BecomeAdmin,
    /// Set the avatar of the local administrator
    Avatar {
        /// Image URL
        url: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Order the cart contents
    Checkout {
        #[arg(short, long, default_value = "")]
        name: String,

        #[arg(short, long, default_value = "")]
        phone: String,

        /// Delivery address (pickup when omitted)
        #[arg(short, long)]
        address: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Review a dish
    Review {
        dish_id: String,

        /// Rating from 1 to 5
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        #[arg(short, long, default_value = "")]
        text: String,
    },
    /// Move an order to a new status
    Status {
        order_id: String,

        /// Status label (e.g. "En préparation", "Prête", "Livrée")
        status: String,
    },
    /// Stay connected and print realtime activity until interrupted
    Watch,
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a dish
    Add {
        dish_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(short, long, default_value = "")]
        instructions: String,
    },
    /// Replace the quantity of a line (0 or less removes it)
    Set {
        dish_id: String,

        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Show the cart
    Show,
    /// Empty the cart
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "digitrestau_client=info,digitrestau_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => commands::run(cli.command, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}
