//! Best-effort NATS fan-out of committed domain events
use tracing::warn;
use crate::domain::events::DomainEvent;

pub fn subject(tenant: &str, event: &DomainEvent) -> String {
    format!("restaurant.{}.split_bill.{}", tenant, event.kind())
}

/// Publish `events` when a client is configured. Failures are logged only; the
/// state change they describe is already committed.
pub async fn publish(nats: Option<&async_nats::Client>, tenant: &str, events: &[DomainEvent]) {
    let Some(client) = nats else { return };
    for event in events {
        let subject = subject(tenant, event);
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => { warn!(subject = %subject, error = %e, "Failed to encode event"); continue; }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            warn!(subject = %subject, error = %e, "Failed to publish event");
        }
    }
}
