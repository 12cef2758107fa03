//! In-memory backend for tests.
//!
//! Behaves like the Supabase backend as far as the engine can observe:
//! saves are upserts by id, auth calls publish [`AuthEvent`]s, and pushed
//! order changes arrive on [`RealtimeSource::order_changes`]. Failure
//! switches let tests drive every error path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use digitrestau_core::{Dish, Email, MealBox, NewOrder, Order, OrderId, OrderStatus, Settings};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::remote::{
    AuthEvent, AuthService, CatalogService, ChangeKind, RealtimeSource, RemoteError, RemoteUser,
    TableChange, UserMetadata, UserMetadataPatch,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Default)]
struct BackendState {
    dishes: Vec<Dish>,
    orders: Vec<Order>,
    boxes: Vec<MealBox>,
    settings: Settings,
    /// Accounts keyed by lowercase email.
    accounts: HashMap<String, (String, RemoteUser)>,
    session: Option<RemoteUser>,
    saved_dish_batches: Vec<Vec<Dish>>,
}

/// Backend that keeps everything in process memory.
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    fail_fetches: AtomicBool,
    fail_saves: AtomicBool,
    fail_user_updates: AtomicBool,
    sign_out_calls: AtomicUsize,
    auth_tx: broadcast::Sender<AuthEvent>,
    order_tx: broadcast::Sender<TableChange>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (auth_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (order_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(BackendState::default()),
            fail_fetches: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            fail_user_updates: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
            auth_tx,
            order_tx,
        }
    }

    /// An order dated `secs` seconds after the epoch.
    #[must_use]
    pub fn order_at(id: &str, secs: i64) -> Order {
        Order::place(
            NewOrder::default(),
            OrderId::new(id),
            DateTime::from_timestamp(secs, 0).unwrap_or_default(),
            OrderStatus::Confirmed,
        )
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn seed_dishes(&self, dishes: Vec<Dish>) {
        self.state.lock().dishes = dishes;
    }

    pub fn seed_orders(&self, orders: Vec<Order>) {
        self.state.lock().orders = orders;
    }

    pub fn seed_boxes(&self, boxes: Vec<MealBox>) {
        self.state.lock().boxes = boxes;
    }

    pub fn seed_settings(&self, settings: Settings) {
        self.state.lock().settings = settings;
    }

    /// Create an account and return its user.
    pub fn register(&self, email: &str, password: &str, metadata: UserMetadata) -> RemoteUser {
        let key = email.to_lowercase();
        let user = RemoteUser::new(format!("uid-{key}"), Email::parse(email).ok())
            .with_metadata(metadata);
        self.state
            .lock()
            .accounts
            .insert(key, (password.to_owned(), user.clone()));
        user
    }

    /// Start with `user` signed in, as if a session had been restored.
    pub fn restore_session(&self, user: RemoteUser) {
        self.state.lock().session = Some(user);
    }

    // =========================================================================
    // Failure switches
    // =========================================================================

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_user_updates(&self, fail: bool) {
        self.fail_user_updates.store(fail, Ordering::SeqCst);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn dishes(&self) -> Vec<Dish> {
        self.state.lock().dishes.clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().orders.clone()
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    /// Every `save_dishes` payload, in call order.
    #[must_use]
    pub fn saved_dish_batches(&self) -> Vec<Vec<Dish>> {
        self.state.lock().saved_dish_batches.clone()
    }

    #[must_use]
    pub fn session_user(&self) -> Option<RemoteUser> {
        self.state.lock().session.clone()
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Pushes from elsewhere
    // =========================================================================

    /// Publish an auth event as if another tab had caused it.
    pub fn emit_auth(&self, event: AuthEvent) {
        let _ = self.auth_tx.send(event);
    }

    /// Insert an order as another client would, and push the change.
    pub fn push_new_order(&self, order: Order) {
        self.state.lock().orders.push(order);
        self.emit_order_change(ChangeKind::Insert);
    }

    /// Change an order's status as the kitchen would, and push the change.
    pub fn push_status(&self, order_id: &OrderId, status: OrderStatus) {
        if let Some(order) = self
            .state
            .lock()
            .orders
            .iter_mut()
            .find(|o| &o.id == order_id)
        {
            order.status = status;
        }
        self.emit_order_change(ChangeKind::Update);
    }

    pub fn emit_order_change(&self, kind: ChangeKind) {
        let _ = self.order_tx.send(TableChange::new(kind, "orders"));
    }

    fn check_fetch(&self) -> Result<(), RemoteError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("fetch disabled".to_owned()));
        }
        Ok(())
    }

    fn check_save(&self) -> Result<(), RemoteError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("save disabled".to_owned()));
        }
        Ok(())
    }
}

fn upsert<T: Clone>(target: &mut Vec<T>, incoming: &[T], same: impl Fn(&T, &T) -> bool) {
    for item in incoming {
        match target.iter_mut().find(|existing| same(existing, item)) {
            Some(existing) => existing.clone_from(item),
            None => target.push(item.clone()),
        }
    }
}

#[async_trait]
impl CatalogService for InMemoryBackend {
    async fn get_dishes(&self) -> Result<Vec<Dish>, RemoteError> {
        self.check_fetch()?;
        Ok(self.state.lock().dishes.clone())
    }

    async fn save_dishes(&self, dishes: &[Dish]) -> Result<(), RemoteError> {
        self.check_save()?;
        let mut state = self.state.lock();
        state.saved_dish_batches.push(dishes.to_vec());
        upsert(&mut state.dishes, dishes, |a, b| a.id == b.id);
        Ok(())
    }

    async fn get_orders(&self) -> Result<Vec<Order>, RemoteError> {
        self.check_fetch()?;
        Ok(self.state.lock().orders.clone())
    }

    async fn save_orders(&self, orders: &[Order]) -> Result<(), RemoteError> {
        self.check_save()?;
        upsert(&mut self.state.lock().orders, orders, |a, b| a.id == b.id);
        Ok(())
    }

    async fn create_order(&self, order: &Order) -> Result<(), RemoteError> {
        self.check_save()?;
        self.state.lock().orders.push(order.clone());
        Ok(())
    }

    async fn get_boxes(&self) -> Result<Vec<MealBox>, RemoteError> {
        self.check_fetch()?;
        Ok(self.state.lock().boxes.clone())
    }

    async fn save_boxes(&self, boxes: &[MealBox]) -> Result<(), RemoteError> {
        self.check_save()?;
        upsert(&mut self.state.lock().boxes, boxes, |a, b| a.id == b.id);
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings, RemoteError> {
        self.check_fetch()?;
        Ok(self.state.lock().settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), RemoteError> {
        self.check_save()?;
        self.state.lock().settings = settings.clone();
        Ok(())
    }
}

#[async_trait]
impl AuthService for InMemoryBackend {
    async fn sign_in(&self, identifier: &str, credential: &str) -> Result<RemoteUser, RemoteError> {
        let user = {
            let mut state = self.state.lock();
            let user = match state.accounts.get(&identifier.to_lowercase()) {
                Some((password, user)) if password == credential => user.clone(),
                _ => return Err(RemoteError::Auth("Invalid login credentials".to_owned())),
            };
            state.session = Some(user.clone());
            user
        };
        let _ = self.auth_tx.send(AuthEvent::signed_in(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().session = None;
        let _ = self.auth_tx.send(AuthEvent::signed_out());
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<RemoteUser>, RemoteError> {
        self.check_fetch()?;
        Ok(self.state.lock().session.clone())
    }

    async fn update_user(&self, patch: &UserMetadataPatch) -> Result<RemoteUser, RemoteError> {
        if self.fail_user_updates.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("update disabled".to_owned()));
        }
        let user = {
            let mut state = self.state.lock();
            let Some(session) = state.session.as_mut() else {
                return Err(RemoteError::NotSignedIn);
            };
            patch.apply_to(&mut session.metadata);
            let user = session.clone();
            if let Some(key) = user.email.as_ref().map(|e| e.as_str().to_lowercase())
                && let Some((_, account)) = state.accounts.get_mut(&key)
            {
                account.clone_from(&user);
            }
            user
        };
        let _ = self.auth_tx.send(AuthEvent::user_updated(user.clone()));
        Ok(user)
    }

    async fn refresh_session(&self) -> Result<Option<RemoteUser>, RemoteError> {
        let user = self.state.lock().session.clone();
        if let Some(user) = &user {
            let _ = self.auth_tx.send(AuthEvent::token_refreshed(user.clone()));
        }
        Ok(user)
    }
}

impl RealtimeSource for InMemoryBackend {
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }

    fn order_changes(&self) -> broadcast::Receiver<TableChange> {
        self.order_tx.subscribe()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryBackend")
            .field("dishes", &state.dishes.len())
            .field("orders", &state.orders.len())
            .field("signed_in", &state.session.is_some())
            .finish_non_exhaustive()
    }
}
