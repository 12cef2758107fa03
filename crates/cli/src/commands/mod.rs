//! Command implementations.
//!
//! Every command opens a session, starts the controller, performs its
//! operation through the controller and prints the notifications it raised.

mod account;
mod cart;
mod catalog;
mod watch;

use std::sync::Arc;

use digitrestau_client::supabase::SupabaseClient;
use digitrestau_client::{
    AppController, ClientConfig, ClientError, Collaborators, ConfigError, FileStorage,
    LocalStorage,
};
use thiserror::Error;

use crate::bell::TerminalBell;
use crate::{CartAction, Commands, output};

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Unknown dish: {0}")]
    UnknownDish(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Administrator access required")]
    NotAdmin,
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Client(e.into())
    }
}

/// A started controller and, when online, the backend it talks to.
pub struct Session {
    pub controller: AppController,
    pub supabase: Option<SupabaseClient>,
}

impl Session {
    /// Build the controller over file storage and start it.
    pub async fn open(config: &ClientConfig) -> Self {
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(&config.storage_path));
        let supabase = config
            .supabase
            .as_ref()
            .map(|supabase| SupabaseClient::with_session_store(supabase, storage.clone()));

        let mut collaborators =
            Collaborators::offline(storage).with_alerts(Arc::new(TerminalBell));
        if let Some(client) = &supabase {
            collaborators = collaborators.with_remote(Arc::new(client.clone()));
        }

        let controller = AppController::new(collaborators, config);
        controller.start().await;
        Self {
            controller,
            supabase,
        }
    }

    fn close(self) {
        output::notifications(&self.controller.notifications().snapshot());
        self.controller.shutdown();
    }
}

/// Run one command.
pub async fn run(command: Commands, config: &ClientConfig) -> Result<(), CliError> {
    let session = Session::open(config).await;
    let controller = &session.controller;

    let result = match command {
        Commands::Menu => {
            output::dishes(&controller.snapshot().dishes);
            Ok(())
        }
        Commands::Orders => {
            catalog::orders(controller);
            Ok(())
        }
        Commands::Whoami => {
            output::user(controller.current_user().as_ref(), controller.is_admin());
            Ok(())
        }
        Commands::Login {
            identifier,
            password,
        } => {
            account::login(controller, &identifier, &password).await;
            Ok(())
        }
        Commands::Logout => {
            controller.logout().await;
            Ok(())
        }
        Commands::BecomeAdmin => {
            controller.elevate_to_admin().await;
            Ok(())
        }
        Commands::Avatar { url } => {
            controller.set_local_avatar(&url);
            Ok(())
        }
        Commands::Cart { action } => match action {
            CartAction::Add {
                dish_id,
                quantity,
                instructions,
            } => cart::add(controller, &dish_id, quantity, &instructions),
            CartAction::Set { dish_id, quantity } => cart::set(controller, &dish_id, quantity),
            CartAction::Show => {
                cart::show(controller);
                Ok(())
            }
            CartAction::Clear => {
                controller.clear_cart();
                Ok(())
            }
        },
        Commands::Checkout {
            name,
            phone,
            address,
            notes,
        } => {
            cart::checkout(controller, name, phone, address, notes).await;
            Ok(())
        }
        Commands::Review {
            dish_id,
            rating,
            text,
        } => catalog::review(controller, &dish_id, rating, text).await,
        Commands::Status { order_id, status } => {
            catalog::set_status(controller, &order_id, status).await
        }
        Commands::Watch => {
            watch::run(&session).await;
            Ok(())
        }
    };

    session.close();
    result
}
