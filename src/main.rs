//! Case Storefront - custom phone case shop backend

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use case_storefront::email::EmailService;
use case_storefront::payments::{CheckoutProvider, DisabledProvider, StripeClient};
use case_storefront::publisher::EventPublisher;
use case_storefront::store::PgStore;
use case_storefront::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                None
            }
        },
        None => None,
    };

    let payments: Arc<dyn CheckoutProvider> = match (&config.stripe_secret_key, &config.stripe_webhook_secret) {
        (Some(key), Some(secret)) => Arc::new(StripeClient::new(key, secret)),
        _ => {
            tracing::warn!("Stripe is not configured, checkout is disabled");
            Arc::new(DisabledProvider)
        }
    };
    let email = EmailService::new(config.resend_api_key.clone(), config.email_from.clone(), config.public_url.clone());
    let addr = config.addr();

    let state = AppState::new(config, Arc::new(store), payments, email, EventPublisher::new(nats));
    let app = router(state);

    tracing::info!("Case storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
