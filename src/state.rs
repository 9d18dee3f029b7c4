use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::accounts::AccountService;
use crate::engine::enrichment::OrderEnricher;
use crate::engine::lifecycle::OrderLifecycle;
use crate::models::event::OrderEvent;
use crate::observability::metrics::Metrics;
use crate::security::password::PlaintextVerifier;
use crate::store::{IdentityStore, MemoryStore, OrderRepository};

pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub identities: Arc<dyn IdentityStore>,
    pub lifecycle: OrderLifecycle,
    pub enrichment: OrderEnricher,
    pub accounts: AccountService,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    /// State backed by a fresh in-memory store.
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_backends(store.clone(), store, config)
    }

    pub fn with_backends(
        orders: Arc<dyn OrderRepository>,
        identities: Arc<dyn IdentityStore>,
        config: Config,
    ) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));
        let metrics = Metrics::new();
        let authorizer = config.authorization_mode.authorizer();

        let lifecycle = OrderLifecycle::new(
            orders.clone(),
            identities.clone(),
            authorizer,
            order_events_tx.clone(),
            metrics.clone(),
            config.store_timeout,
        );
        let enrichment =
            OrderEnricher::new(orders.clone(), identities.clone(), config.store_timeout);
        let accounts = AccountService::new(
            identities.clone(),
            Arc::new(PlaintextVerifier),
            config.store_timeout,
        );

        Self {
            orders,
            identities,
            lifecycle,
            enrichment,
            accounts,
            order_events_tx,
            metrics,
            config,
        }
    }
}
