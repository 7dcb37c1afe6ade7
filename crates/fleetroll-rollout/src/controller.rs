//! Rolling-update controller — one invocation of the state machine.
//!
//! The controller holds no workflow state of its own. Everything it
//! needs arrives in the triggering message, and everything the next
//! invocation needs leaves in the continuation it publishes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use fleetroll_fleet::{
    healthy_count, Action, CapacityScaler, ContinuationPublisher, DrainMarker, FleetApi,
    FleetInspector, GroupSnapshot, Journal, JournalEntry, MessageBus, TerminationController,
};
use fleetroll_state::{Event, Notification, Phase, StateError, WorkflowDefaults, WorkflowState};

use crate::error::RollResult;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The message was not a rolling-update message, or its workflow
    /// had already finished.
    Skipped,
    /// Originals remain; the evolved state was published.
    Continuing {
        iteration: u32,
        remaining: usize,
        continuation: Notification,
    },
    /// Every original instance has been terminated.
    Completed { iterations: u32 },
    /// The iteration budget ran out with originals still in the group.
    Aborted {
        iteration: u32,
        max_iterations: u32,
        remaining: usize,
    },
}

impl Outcome {
    /// Process exit value: `1` for a skipped message, `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Skipped => 1,
            _ => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Continuing { .. })
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub outcome: Outcome,
    /// State after this invocation.
    pub state: WorkflowState,
    /// Side effects executed or, under dry run, simulated.
    pub journal: Vec<JournalEntry>,
}

impl Invocation {
    fn skipped(state: WorkflowState) -> Self {
        Self {
            outcome: Outcome::Skipped,
            state,
            journal: Vec::new(),
        }
    }
}

/// Drives a rolling update: drain, grow, then trim originals as
/// replacements turn healthy.
pub struct RollingUpdate {
    inspector: FleetInspector,
    drain: DrainMarker,
    scaler: CapacityScaler,
    terminator: TerminationController,
    publisher: ContinuationPublisher,
    defaults: WorkflowDefaults,
}

impl RollingUpdate {
    pub fn new(fleet: Arc<dyn FleetApi>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            inspector: FleetInspector::new(fleet.clone()),
            drain: DrainMarker::new(fleet.clone()),
            scaler: CapacityScaler::new(fleet.clone()),
            terminator: TerminationController::new(fleet),
            publisher: ContinuationPublisher::new(bus),
            defaults: WorkflowDefaults::default(),
        }
    }

    /// Override the values applied to first messages that omit them.
    pub fn with_defaults(mut self, defaults: WorkflowDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Handle one trigger event.
    pub async fn handle(&self, event: &Event) -> RollResult<Invocation> {
        info!("starting invocation");
        let notification = event.notification()?;
        if notification.group_name()?.is_none() {
            info!("no group specified, skipping");
            return Ok(Invocation::skipped(WorkflowState::default()));
        }
        let state = notification.decode_state()?;
        self.step(state, &notification.channel).await
    }

    /// Advance `state` by one step. Continuations go out on `channel`.
    pub async fn step(&self, mut state: WorkflowState, channel: &str) -> RollResult<Invocation> {
        let Some(group) = state.group_name.clone() else {
            info!("no group specified, skipping");
            return Ok(Invocation::skipped(state));
        };

        let phase = state.effective_phase();
        if phase.is_terminal() {
            warn!(%group, ?phase, "workflow already finished, skipping");
            return Ok(Invocation::skipped(state));
        }

        state.apply_defaults(&self.defaults);
        let mut journal = Journal::new(state.dry_run);

        let snapshot = if phase == Phase::Uninitialized {
            self.setup(&mut state, &group, &mut journal).await?
        } else {
            state.phase = Phase::Converging;
            let snapshot = self.inspector.describe(&group).await?;
            prune_departed(&mut state, &snapshot);
            snapshot
        };

        self.trim(&mut state, &group, &snapshot, &mut journal).await?;
        let outcome = self.decide(&mut state, &group, channel, &mut journal).await?;
        debug!(
            %group,
            actions = journal.entries().len(),
            executed = journal.mutations().count(),
            dry_run = journal.is_dry_run(),
            "invocation journal"
        );

        Ok(Invocation {
            outcome,
            state,
            journal: journal.into_entries(),
        })
    }

    /// Capture the baseline, drain the originals, grow the group, then
    /// wait and return a fresh snapshot.
    async fn setup(
        &self,
        state: &mut WorkflowState,
        group: &str,
        journal: &mut Journal,
    ) -> RollResult<GroupSnapshot> {
        let snapshot = self.inspector.describe(group).await?;
        let originals = snapshot.instance_ids();
        let multiplier = state
            .iters_per_instance
            .unwrap_or(self.defaults.iters_per_instance);

        state.max_size = Some(snapshot.max_size);
        state.desired_capacity = Some(snapshot.desired_capacity);
        state.baseline_count = Some(snapshot.instances.len() as u32);
        state.iteration = Some(1);
        state.max_iterations = Some(multiplier.saturating_mul(originals.len() as u32));
        state.instance_ids = Some(originals.clone());
        state.phase = Phase::Converging;

        info!(
            %group,
            instances = originals.len(),
            max_size = snapshot.max_size,
            desired = snapshot.desired_capacity,
            max_iterations = ?state.max_iterations,
            growth_percent = state.growth_percent(),
            dry_run = state.dry_run,
            "rolling update metadata"
        );

        self.drain.mark_draining(journal, &originals, true).await?;
        self.scaler
            .grow(
                journal,
                group,
                snapshot.desired_capacity,
                snapshot.max_size,
                state.growth_percent(),
            )
            .await?;

        pause(journal, state.pause_seconds(), "waiting for instance creation").await;
        Ok(self.inspector.describe(group).await?)
    }

    /// Terminate one original for every healthy instance above the
    /// baseline. Returns how many were terminated.
    async fn trim(
        &self,
        state: &mut WorkflowState,
        group: &str,
        snapshot: &GroupSnapshot,
        journal: &mut Journal,
    ) -> RollResult<u32> {
        let baseline = state.baseline()?;
        let healthy = healthy_count(snapshot);
        let mut surplus = i64::from(healthy) - i64::from(baseline.baseline_count);
        if journal.is_dry_run() {
            surplus = 1;
        }

        info!(
            %group,
            healthy,
            baseline = baseline.baseline_count,
            surplus,
            "checked group health"
        );

        let ids = state.instance_ids.get_or_insert_with(Vec::new);
        let mut removed = 0;
        while surplus > 0 {
            let Some(instance_id) = ids.last().cloned() else {
                break;
            };
            self.terminator.terminate_one(journal, group, &instance_id).await?;
            ids.pop();
            removed += 1;
            surplus -= 1;
        }
        Ok(removed)
    }

    /// Finish, abort, or pause and publish the next step.
    async fn decide(
        &self,
        state: &mut WorkflowState,
        group: &str,
        channel: &str,
        journal: &mut Journal,
    ) -> RollResult<Outcome> {
        let iteration = state.iteration.ok_or(StateError::Missing("iteration"))?;
        let remaining = state.remaining();

        if remaining == 0 {
            state.phase = Phase::Completed;
            info!(%group, iterations = iteration, "no original instances left, rolling update completed");
            return Ok(Outcome::Completed {
                iterations: iteration,
            });
        }

        let max_iterations = state.baseline()?.max_iterations;
        let next = iteration.saturating_add(1);
        state.iteration = Some(next);

        if next > max_iterations {
            state.phase = Phase::Aborted;
            error!(
                %group,
                iteration = next,
                max_iterations,
                remaining,
                "exceeded the maximum number of iterations, ending loop"
            );
            return Ok(Outcome::Aborted {
                iteration: next,
                max_iterations,
                remaining,
            });
        }

        info!(%group, remaining, iteration = next, "pausing to wait for scaling operations to complete");
        pause(journal, state.pause_seconds(), "waiting for replacements").await;
        let continuation = self.publisher.publish(journal, state, channel).await?;

        Ok(Outcome::Continuing {
            iteration: next,
            remaining,
            continuation,
        })
    }
}

/// Block for `seconds`, or just log it under dry run.
async fn pause(journal: &mut Journal, seconds: u64, reason: &str) {
    if journal.is_dry_run() {
        info!(seconds, %reason, "DRY RUN: would sleep");
    } else {
        info!(seconds, %reason, "pausing");
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }
    journal.record(Action::Pause { seconds });
}

/// Drop originals the group no longer contains, e.g. because a
/// duplicate delivery already terminated them.
fn prune_departed(state: &mut WorkflowState, snapshot: &GroupSnapshot) {
    let Some(ids) = state.instance_ids.as_mut() else {
        return;
    };
    let before = ids.len();
    ids.retain(|id| snapshot.contains(id));
    if ids.len() < before {
        warn!(
            group = %snapshot.name,
            dropped = before - ids.len(),
            "original instances already gone from group"
        );
    }
}
