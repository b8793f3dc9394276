// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Notification delivery.
//!
//! # Components
//!
//! - [`HttpNotificationDispatcher`]: POSTs the notification as JSON to the
//!   email integration endpoint
//! - [`LogNotificationDispatcher`]: logs instead of sending, used when no
//!   endpoint is configured
//! - [`NotificationQueue`]: bounded hand-off queue drained by a worker pool.
//!   Implements [`NotificationSink`] so lifecycle operations never wait on
//!   delivery.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::config::NotificationConfig;
use crate::domain::notification::{
    NotificationDispatcher, NotificationError, NotificationSink, ServiceNotification,
};

pub struct HttpNotificationDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotificationDispatcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Delivery(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send_notification(&self, notification: &ServiceNotification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected { status, body });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogNotificationDispatcher {
    async fn send_notification(&self, notification: &ServiceNotification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient_email,
            status = %notification.status,
            service = %notification.service_name,
            partners = %notification.partner_names,
            "Notification (no endpoint configured)"
        );
        Ok(())
    }
}

/// Pick the dispatcher for a configuration: HTTP when an endpoint is set.
pub fn dispatcher_from_config(config: &NotificationConfig) -> Result<Arc<dyn NotificationDispatcher>, NotificationError> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpNotificationDispatcher::new(
            endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogNotificationDispatcher)),
    }
}

/// Bounded notification queue with a fixed worker pool.
///
/// `dispatch` never blocks: a full or closed queue drops the notification
/// with an error log. [`NotificationQueue::shutdown`] stops intake and waits
/// for queued notifications to be delivered.
pub struct NotificationQueue {
    sender: Mutex<Option<mpsc::Sender<ServiceNotification>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationQueue {
    /// Spawn `workers` delivery tasks on the current tokio runtime.
    pub fn start(dispatcher: Arc<dyn NotificationDispatcher>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = receiver.clone();
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(notification) = next else {
                            debug!(worker, "Notification worker stopping");
                            break;
                        };
                        deliver(dispatcher.as_ref(), &notification).await;
                    }
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    pub fn from_config(dispatcher: Arc<dyn NotificationDispatcher>, config: &NotificationConfig) -> Self {
        Self::start(dispatcher, config.workers, config.queue_capacity)
    }

    /// Close intake and drain. Later `dispatch` calls are dropped.
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Notification worker terminated abnormally: {}", e);
            }
        }
    }
}

async fn deliver(dispatcher: &dyn NotificationDispatcher, notification: &ServiceNotification) {
    match dispatcher.send_notification(notification).await {
        Ok(()) => {
            metrics::counter!("dsa_notifications_dispatched_total", "outcome" => "delivered").increment(1);
            info!(
                recipient = %notification.recipient_email,
                status = %notification.status,
                service = %notification.service_name,
                "Resolution notification delivered"
            );
        }
        Err(e) => {
            metrics::counter!("dsa_notifications_failed_total").increment(1);
            error!(
                recipient = %notification.recipient_email,
                status = %notification.status,
                service = %notification.service_name,
                "Resolution notification failed: {}",
                e
            );
        }
    }
}

impl NotificationSink for NotificationQueue {
    fn dispatch(&self, notification: ServiceNotification) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            metrics::counter!("dsa_notifications_dropped_total").increment(1);
            warn!(service = %notification.service_name, "Notification queue closed, dropping notification");
            return;
        };

        match sender.try_send(notification) {
            Ok(()) => {
                metrics::counter!("dsa_notifications_dispatched_total", "outcome" => "queued").increment(1);
            }
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                metrics::counter!("dsa_notifications_dropped_total").increment(1);
                error!(
                    recipient = %dropped.recipient_email,
                    service = %dropped.service_name,
                    "Notification queue full, dropping notification"
                );
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                metrics::counter!("dsa_notifications_dropped_total").increment(1);
                warn!(service = %dropped.service_name, "Notification queue closed, dropping notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service_request::RequestStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn notification(status: RequestStatus) -> ServiceNotification {
        ServiceNotification {
            recipient_email: "ops@merchant.ph".to_string(),
            status,
            service_name: "REMITTANCE".to_string(),
            remark: "Please resubmit".to_string(),
            partner_names: "Western Union, Transfast".to_string(),
        }
    }

    #[derive(Default)]
    struct CountingDispatcher {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl NotificationDispatcher for CountingDispatcher {
        async fn send_notification(&self, _: &ServiceNotification) -> Result<(), NotificationError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_http_dispatcher_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notify")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "recipient_email": "ops@merchant.ph",
                "status": "REJECTED",
                "service_name": "REMITTANCE",
                "partner_names": "Western Union, Transfast"
            })))
            .with_status(202)
            .create_async()
            .await;

        let dispatcher =
            HttpNotificationDispatcher::new(format!("{}/notify", server.url()), Duration::from_secs(5)).unwrap();
        dispatcher
            .send_notification(&notification(RequestStatus::Rejected))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_dispatcher_reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/notify")
            .with_status(500)
            .with_body("mailer down")
            .create_async()
            .await;

        let dispatcher =
            HttpNotificationDispatcher::new(format!("{}/notify", server.url()), Duration::from_secs(5)).unwrap();
        let err = dispatcher
            .send_notification(&notification(RequestStatus::Accepted))
            .await
            .unwrap_err();

        match err {
            NotificationError::Rejected { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "mailer down");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_queue_drains_on_shutdown() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let queue = NotificationQueue::start(dispatcher.clone(), 2, 16);

        for _ in 0..5 {
            queue.dispatch(notification(RequestStatus::Accepted));
        }
        queue.shutdown().await;

        assert_eq!(dispatcher.sent.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_dropped() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let queue = NotificationQueue::start(dispatcher.clone(), 1, 4);
        queue.shutdown().await;

        queue.dispatch(notification(RequestStatus::Rejected));
        assert_eq!(dispatcher.sent.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_log_dispatcher_selected_without_endpoint() {
        let config = NotificationConfig::default();
        assert!(dispatcher_from_config(&config).is_ok());
    }
}
