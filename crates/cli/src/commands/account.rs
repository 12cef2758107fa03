//! Sign-in.

use digitrestau_client::AppController;

use crate::output;

/// Sign in and show who the client now acts for.
pub async fn login(controller: &AppController, identifier: &str, password: &str) {
    controller.login(identifier, password).await;
    output::user(controller.current_user().as_ref(), controller.is_admin());
}
