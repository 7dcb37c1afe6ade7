//! Continuation publisher — re-emits workflow state to trigger the next
//! invocation.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use fleetroll_state::{continuation_subject, Notification, StateError, WorkflowState};

use crate::api::{ApiError, ApiFuture, MessageBus};
use crate::error::FleetResult;
use crate::journal::{Action, Journal};

#[derive(Clone)]
pub struct ContinuationPublisher {
    bus: Arc<dyn MessageBus>,
}

impl ContinuationPublisher {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Publish `state` on `channel` and return the notification sent
    /// (or, under dry run, the one that would have been sent).
    pub async fn publish(
        &self,
        journal: &mut Journal,
        state: &WorkflowState,
        channel: &str,
    ) -> FleetResult<Notification> {
        let group = state
            .group_name
            .as_deref()
            .ok_or(StateError::Missing("group_name"))?;
        let notification = Notification::for_state(state, channel)?;
        let subject = continuation_subject(group);

        if journal.is_dry_run() {
            info!(
                %channel,
                %subject,
                message = %notification.message,
                "DRY RUN: publish continuation"
            );
        } else {
            info!(%channel, %subject, "publishing continuation");
            self.bus.publish(&notification).await?;
        }

        journal.record(Action::Publish {
            channel: channel.to_string(),
            subject,
            message: notification.message.clone(),
        });
        Ok(notification)
    }
}

/// In-process bus: published notifications queue up until popped.
#[derive(Debug, Default)]
pub struct LocalBus {
    queue: Mutex<VecDeque<Notification>>,
    published: Mutex<u64>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest pending notification.
    pub async fn pop(&self) -> Option<Notification> {
        self.queue.lock().await.pop_front()
    }

    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Total notifications ever published.
    pub async fn published(&self) -> u64 {
        *self.published.lock().await
    }
}

impl MessageBus for LocalBus {
    fn publish<'a>(&'a self, notification: &'a Notification) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            if notification.channel.is_empty() {
                return Err(ApiError::new("publish", "empty channel"));
            }
            self.queue.lock().await.push_back(notification.clone());
            *self.published.lock().await += 1;
            Ok(())
        })
    }
}
