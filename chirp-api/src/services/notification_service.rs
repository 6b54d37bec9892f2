//! Notification Service
//!
//! Creates notifications as a side effect of interactions and serves the
//! recipient's notification list. Creation never fails the caller: a store
//! error is logged, counted and reported to the failure hook.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chirp_core::{
    ChirpError, Notification, NotificationId, NotificationRequest, PageRequest, Pagination, UserId,
};
use chirp_storage::GraphStore;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics::with_metrics;

/// Receives every notification right after it is persisted.
///
/// The presence registry implements this to push `notification:new` to
/// the recipient's live connections.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// Called with the request and the error whenever creation fails.
pub type NotificationFailureHook = Arc<dyn Fn(&NotificationRequest, &ChirpError) + Send + Sync>;

/// One page of a recipient's notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
    pub unread_count: u64,
}

/// Best-effort notification creation plus the recipient-facing reads.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn GraphStore>,
    sink: Option<Arc<dyn NotificationSink>>,
    failure_hook: Option<NotificationFailureHook>,
    failures: Arc<AtomicU64>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("has_sink", &self.sink.is_some())
            .field("failures", &self.failure_count())
            .finish()
    }
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            sink: None,
            failure_hook: None,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_failure_hook(mut self, hook: NotificationFailureHook) -> Self {
        self.failure_hook = Some(hook);
        self
    }

    /// Creations that failed since this dispatcher was built.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Persist a notification for `request`.
    ///
    /// Returns the stored notification, or `None` when the store rejected
    /// it. Never propagates an error.
    pub async fn notify(&self, request: NotificationRequest) -> Option<Notification> {
        let notification = request.into_notification();
        match self.store.notification_insert(&notification).await {
            Ok(()) => {
                with_metrics(|m| m.record_notification_created(notification.notification_type));
                tracing::debug!(
                    notification_id = %notification.id,
                    recipient = %notification.recipient,
                    notification_type = %notification.notification_type,
                    "notification created"
                );
                if let Some(sink) = &self.sink {
                    sink.deliver(&notification);
                }
                Some(notification)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                with_metrics(|m| m.record_notification_failure());
                tracing::warn!(
                    error = %err,
                    recipient = %request.recipient,
                    sender = %request.sender,
                    notification_type = %request.notification_type,
                    "failed to create notification"
                );
                if let Some(hook) = &self.failure_hook {
                    hook(&request, &err);
                }
                None
            }
        }
    }

    /// Newest-first page of `recipient`'s notifications with the unread total.
    pub async fn list(&self, recipient: UserId, page: PageRequest) -> ApiResult<NotificationPage> {
        let notifications = self.store.notification_list(recipient, page).await?;
        let total = self.store.notification_count(recipient).await?;
        let unread_count = self.store.notification_count_unread(recipient).await?;
        Ok(NotificationPage {
            notifications,
            pagination: Pagination::new(page, total),
            unread_count,
        })
    }

    /// Mark one notification read. Only the recipient may do so; anyone
    /// else gets a not-found.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> ApiResult<Notification> {
        self.store
            .notification_mark_read(id, recipient)
            .await?
            .ok_or_else(ApiError::notification_not_found)
    }

    /// Mark every unread notification read, returning how many changed.
    pub async fn mark_all_read(&self, recipient: UserId) -> ApiResult<u64> {
        Ok(self.store.notification_mark_all_read(recipient).await?)
    }

    pub async fn unread_count(&self, recipient: UserId) -> ApiResult<u64> {
        Ok(self.store.notification_count_unread(recipient).await?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
