use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "casestore";

/// Publishes domain events to NATS when a client is configured.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn subject(event: &DomainEvent) -> String {
        format!("{SUBJECT_PREFIX}.{}", event.kind())
    }

    /// Best effort; failures are logged.
    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let subject = Self::subject(event);
        let Some(nats) = &self.nats else {
            tracing::debug!(%subject, "Event (no broker configured)");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "Failed to serialize event");
                return;
            }
        };
        if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "Failed to publish event");
        }
    }
}
