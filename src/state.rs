use std::sync::Arc;

use crate::config::Config;
use crate::email::EmailService;
use crate::payments::CheckoutProvider;
use crate::publisher::EventPublisher;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub payments: Arc<dyn CheckoutProvider>,
    pub email: EmailService,
    pub events: EventPublisher,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        payments: Arc<dyn CheckoutProvider>,
        email: EmailService,
        events: EventPublisher,
    ) -> Self {
        Self { store, payments, email, events, config: Arc::new(config) }
    }
}
