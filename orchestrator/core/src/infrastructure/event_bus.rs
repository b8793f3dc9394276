// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Service Request Events
//
// In-memory event streaming on tokio broadcast channels. Observers (audit
// log, CLI watchers) subscribe; events are lost on restart.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::ServiceRequestEvent;

/// Event bus for publishing and subscribing to lifecycle events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ServiceRequestEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before slow receivers lag.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: ServiceRequestEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            org_id: None,
        }
    }

    /// Only events for one organization
    pub fn subscribe_org(&self, org_id: impl Into<String>) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            org_id: Some(org_id.into()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<ServiceRequestEvent>,
    org_id: Option<String>,
}

impl EventReceiver {
    fn wanted(&self, event: &ServiceRequestEvent) -> bool {
        self.org_id
            .as_deref()
            .map_or(true, |org_id| event.org_id() == org_id)
    }

    /// Wait for the next matching event
    pub async fn recv(&mut self) -> Result<ServiceRequestEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;
            if self.wanted(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event without blocking
    pub fn try_recv(&mut self) -> Result<ServiceRequestEvent, EventBusError> {
        loop {
            let event = self.receiver.try_recv().map_err(|e| match e {
                broadcast::error::TryRecvError::Empty => EventBusError::Empty,
                broadcast::error::TryRecvError::Closed => EventBusError::Closed,
                broadcast::error::TryRecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;
            if self.wanted(&event) {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn removed(org_id: &str) -> ServiceRequestEvent {
        ServiceRequestEvent::RequestRemoved {
            org_id: org_id.to_string(),
            partner: "WU".to_string(),
            svc_name: "REMITTANCE".to_string(),
            removed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish(removed("org-1"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.org_id(), "org-1");
    }

    #[tokio::test]
    async fn test_org_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_org("org-2");

        event_bus.publish(removed("org-1"));
        event_bus.publish(removed("org-2"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.org_id(), "org-2");
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(removed("org-1"));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }
}
