//! Termination controller — removes one instance at a time.

use std::sync::Arc;

use tracing::info;

use crate::api::FleetApi;
use crate::error::FleetResult;
use crate::journal::{Action, Journal};

#[derive(Clone)]
pub struct TerminationController {
    api: Arc<dyn FleetApi>,
}

impl TerminationController {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self { api }
    }

    /// Terminate `instance_id` without lowering desired capacity, so the
    /// group launches a replacement.
    pub async fn terminate_one(
        &self,
        journal: &mut Journal,
        group: &str,
        instance_id: &str,
    ) -> FleetResult<()> {
        if journal.is_dry_run() {
            info!(
                %group,
                instance = %instance_id,
                decrement_desired = false,
                "DRY RUN: terminate instance"
            );
        } else {
            info!(%group, instance = %instance_id, "terminating instance");
            self.api.terminate_instance(instance_id, false).await?;
        }

        journal.record(Action::Terminate {
            instance_id: instance_id.to_string(),
            decrement_desired: false,
        });
        Ok(())
    }
}
