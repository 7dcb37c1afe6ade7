//! Capability traits for the fleet and the message bus.
//!
//! Implementations wrap a cloud SDK (or, for tests, [`crate::SimFleet`]).
//! Every mutating operation is expected to be naturally idempotent:
//! tag-set, terminate-by-id and set-capacity-to-absolute-value can be
//! replayed safely when a continuation is delivered twice.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetroll_state::{GroupName, InstanceId, Notification};

/// Health status string reported for an instance that is fully in service.
pub const HEALTHY: &str = "Healthy";

/// Tag key applied to instances that should stop receiving new work.
pub const DRAIN_TAG: &str = "drain";

/// Boxed future returned by the capability traits.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// A failed call against the fleet or the bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct ApiError {
    pub operation: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// One member of a group and its reported health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHealth {
    pub instance_id: InstanceId,
    pub health_status: String,
}

/// Point-in-time view of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub name: GroupName,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_capacity: u32,
    pub instances: Vec<InstanceHealth>,
}

impl GroupSnapshot {
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|i| i.instance_id.clone()).collect()
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.instances.iter().any(|i| i.instance_id == instance_id)
    }
}

/// Absolute capacity settings for a group. `max_size` is only sent
/// when it has to be raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityUpdate {
    pub group_name: GroupName,
    pub desired_capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
}

/// Read and mutate auto-scaling groups.
pub trait FleetApi: Send + Sync {
    /// Describe every group matching `names`.
    fn describe_groups<'a>(&'a self, names: &'a [GroupName]) -> ApiFuture<'a, Vec<GroupSnapshot>>;

    /// Set `key = value` on every listed instance.
    fn create_tags<'a>(
        &'a self,
        instance_ids: &'a [InstanceId],
        key: &'a str,
        value: &'a str,
    ) -> ApiFuture<'a, ()>;

    fn update_group<'a>(&'a self, update: &'a CapacityUpdate) -> ApiFuture<'a, ()>;

    /// Terminate one instance. With `decrement_desired == false` the
    /// group launches a replacement.
    fn terminate_instance<'a>(
        &'a self,
        instance_id: &'a str,
        decrement_desired: bool,
    ) -> ApiFuture<'a, ()>;
}

/// Publish a notification so a later invocation picks it up.
pub trait MessageBus: Send + Sync {
    fn publish<'a>(&'a self, notification: &'a Notification) -> ApiFuture<'a, ()>;
}
