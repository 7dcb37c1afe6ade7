//! Capacity scaler — one-shot temporary growth of a group.
//!
//! ```text
//! additional = ceil(desired * growth_percent / 100)
//! target     = desired + additional
//! max_size   = max(current_max, target)
//! ```
//!
//! The group is never scaled back down here. It returns to its original
//! size as the original instances are terminated.

use std::sync::Arc;

use tracing::info;

use crate::api::{CapacityUpdate, FleetApi};
use crate::error::FleetResult;
use crate::journal::{Action, Journal};

/// Compute the capacity update for growing `group` by `growth_percent`.
///
/// `max_size` is set only when the target exceeds the current max.
pub fn plan_growth(
    group: &str,
    current_desired: u32,
    current_max: u32,
    growth_percent: u32,
) -> CapacityUpdate {
    let additional = current_desired.saturating_mul(growth_percent).div_ceil(100);
    let target = current_desired.saturating_add(additional);
    CapacityUpdate {
        group_name: group.to_string(),
        desired_capacity: target,
        max_size: (target > current_max).then_some(target),
    }
}

#[derive(Clone)]
pub struct CapacityScaler {
    api: Arc<dyn FleetApi>,
}

impl CapacityScaler {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self { api }
    }

    /// Grow the group and return the new desired capacity.
    pub async fn grow(
        &self,
        journal: &mut Journal,
        group: &str,
        current_desired: u32,
        current_max: u32,
        growth_percent: u32,
    ) -> FleetResult<u32> {
        let update = plan_growth(group, current_desired, current_max, growth_percent);

        if journal.is_dry_run() {
            info!(
                %group,
                desired = update.desired_capacity,
                max = ?update.max_size,
                "DRY RUN: update group capacity"
            );
        } else {
            info!(
                %group,
                from = current_desired,
                desired = update.desired_capacity,
                max = ?update.max_size,
                "growing group"
            );
            self.api.update_group(&update).await?;
        }

        let target = update.desired_capacity;
        journal.record(Action::UpdateCapacity(update));
        Ok(target)
    }
}
