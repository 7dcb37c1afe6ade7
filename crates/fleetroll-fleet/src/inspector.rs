//! Fleet inspector — group metadata and per-instance health.

use std::sync::Arc;

use tracing::{debug, error};

use crate::api::{FleetApi, GroupSnapshot, HEALTHY};
use crate::error::{FleetError, FleetResult};

/// Reads group state through a [`FleetApi`].
#[derive(Clone)]
pub struct FleetInspector {
    api: Arc<dyn FleetApi>,
}

impl FleetInspector {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self { api }
    }

    /// Describe exactly one group.
    ///
    /// Zero or several matches are configuration errors and are not
    /// retried.
    pub async fn describe(&self, group: &str) -> FleetResult<GroupSnapshot> {
        debug!(%group, "describing group");
        let names = [group.to_string()];
        let mut groups = self.api.describe_groups(&names).await?;

        if groups.len() != 1 {
            error!(%group, found = groups.len(), "unable to describe group");
            return Err(FleetError::Lookup {
                group: group.to_string(),
                found: groups.len(),
            });
        }

        let snapshot = groups.remove(0);
        debug!(
            %group,
            instances = snapshot.instances.len(),
            healthy = healthy_count(&snapshot),
            desired = snapshot.desired_capacity,
            max = snapshot.max_size,
            "group described"
        );
        Ok(snapshot)
    }
}

/// Instances whose status is exactly `"Healthy"`. Anything else,
/// transitional states included, is not yet healthy.
pub fn healthy_count(snapshot: &GroupSnapshot) -> u32 {
    snapshot
        .instances
        .iter()
        .filter(|i| i.health_status == HEALTHY)
        .count() as u32
}
