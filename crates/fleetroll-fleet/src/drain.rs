//! Drain marker — tags instances so schedulers stop placing work on them.

use std::sync::Arc;

use tracing::info;

use fleetroll_state::InstanceId;

use crate::api::{FleetApi, DRAIN_TAG};
use crate::error::FleetResult;
use crate::journal::{Action, Journal};

#[derive(Clone)]
pub struct DrainMarker {
    api: Arc<dyn FleetApi>,
}

impl DrainMarker {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self { api }
    }

    /// Set the `drain` tag to `draining` on every listed instance.
    ///
    /// Re-applying the same value is a no-op for the fleet. An empty list
    /// sends nothing.
    pub async fn mark_draining(
        &self,
        journal: &mut Journal,
        instance_ids: &[InstanceId],
        draining: bool,
    ) -> FleetResult<()> {
        if instance_ids.is_empty() {
            return Ok(());
        }

        let value = draining.to_string();
        if journal.is_dry_run() {
            info!(
                instances = ?instance_ids,
                key = DRAIN_TAG,
                %value,
                "DRY RUN: tag instances to prevent scheduling"
            );
        } else {
            info!(instances = ?instance_ids, key = DRAIN_TAG, %value, "setting drain tag");
            self.api.create_tags(instance_ids, DRAIN_TAG, &value).await?;
        }

        journal.record(Action::Tag {
            instance_ids: instance_ids.to_vec(),
            key: DRAIN_TAG.to_string(),
            value,
        });
        Ok(())
    }
}
