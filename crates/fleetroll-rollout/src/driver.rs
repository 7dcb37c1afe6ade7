//! In-process driver — runs a whole workflow against a [`LocalBus`].
//!
//! In production each continuation is a separate invocation triggered by
//! the message bus. The driver plays the bus's part: it pops each
//! published continuation and feeds it back into the controller until
//! the workflow reaches a terminal outcome. Under dry run nothing is
//! published, so the driver feeds back the continuation the controller
//! returned instead.

use tracing::{debug, info};

use fleetroll_fleet::LocalBus;
use fleetroll_state::Event;

use crate::controller::{Invocation, Outcome, RollingUpdate};
use crate::error::{RollError, RollResult};

/// Every invocation of a driven workflow, in order.
#[derive(Debug, Clone)]
pub struct DriveReport {
    pub invocations: Vec<Invocation>,
}

impl DriveReport {
    /// The terminal outcome.
    pub fn outcome(&self) -> &Outcome {
        self.invocations
            .last()
            .map(|i| &i.outcome)
            .unwrap_or(&Outcome::Skipped)
    }
}

/// Run `first` and every continuation it spawns to completion.
pub async fn drive(update: &RollingUpdate, bus: &LocalBus, first: Event) -> RollResult<DriveReport> {
    let mut invocations = Vec::new();
    let mut event = first;

    loop {
        let invocation = update.handle(&event).await?;
        debug!(
            invocation = invocations.len() + 1,
            outcome = ?invocation.outcome,
            "invocation finished"
        );

        let next = match &invocation.outcome {
            outcome if outcome.is_terminal() => None,
            Outcome::Continuing { continuation, .. } if invocation.state.dry_run => {
                Some(Event::from_notification(continuation.clone()))
            }
            _ => {
                let notification = bus.pop().await.ok_or_else(|| RollError::Undelivered {
                    group: invocation.state.group_name.clone().unwrap_or_default(),
                })?;
                Some(Event::from_notification(notification))
            }
        };

        invocations.push(invocation);
        match next {
            Some(e) => event = e,
            None => break,
        }
    }

    info!(invocations = invocations.len(), "workflow finished");
    Ok(DriveReport { invocations })
}
