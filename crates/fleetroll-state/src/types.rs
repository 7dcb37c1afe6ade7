//! Domain types for the rolling-update workflow.
//!
//! `WorkflowState` is serialized as the body of every continuation
//! message. Setup fields are filled in once, on the first invocation,
//! and afterwards only `instance_ids` shrinks and `iteration` grows.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StateError, StateResult};

/// Name of an auto-scaling group.
pub type GroupName = String;

/// Identifier of a compute instance.
pub type InstanceId = String;

/// Seconds to wait between steps when the first message does not say.
pub const DEFAULT_PAUSE_SECS: u64 = 30;

/// Temporary headroom over desired capacity, in percent.
pub const DEFAULT_GROWTH_PERCENT: u32 = 20;

/// Iteration budget per original instance.
pub const DEFAULT_ITERS_PER_INSTANCE: u32 = 10;

// ── Phase ─────────────────────────────────────────────────────────

/// Where a workflow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Setup has not run yet.
    #[default]
    Uninitialized,
    /// Originals are being replaced as surplus capacity turns healthy.
    Converging,
    /// Every original instance is gone.
    Completed,
    /// The iteration budget ran out.
    Aborted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted)
    }
}

// ── Defaults ──────────────────────────────────────────────────────

/// Values applied to a first message that leaves them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefaults {
    pub pause_seconds: u64,
    pub growth_percent: u32,
    pub iters_per_instance: u32,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            pause_seconds: DEFAULT_PAUSE_SECS,
            growth_percent: DEFAULT_GROWTH_PERCENT,
            iters_per_instance: DEFAULT_ITERS_PER_INSTANCE,
        }
    }
}

// ── Workflow state ────────────────────────────────────────────────

/// The complete state of one rolling update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Target group. A message without one is not ours.
    #[serde(default, alias = "asg_name", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<GroupName>,

    /// Simulate every mutating call.
    #[serde(default)]
    pub dry_run: bool,

    /// Fractional values from the wire are rounded up to whole seconds.
    #[serde(
        default,
        alias = "pause",
        deserialize_with = "whole_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub pause_seconds: Option<u64>,

    /// Original fleet still waiting to be terminated.
    #[serde(default, alias = "ec2_inst_ids", skip_serializing_if = "Option::is_none")]
    pub instance_ids: Option<Vec<InstanceId>>,

    #[serde(default, alias = "asg_max", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,

    #[serde(default, alias = "asg_desired", skip_serializing_if = "Option::is_none")]
    pub desired_capacity: Option<u32>,

    /// Instance count observed before the update started.
    #[serde(default, alias = "asg_count", skip_serializing_if = "Option::is_none")]
    pub baseline_count: Option<u32>,

    #[serde(default, alias = "iter", skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,

    #[serde(default, alias = "max_iters", skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_percent: Option<u32>,

    /// Overrides the per-instance iteration multiplier.
    #[serde(default, alias = "iters_per_inst", skip_serializing_if = "Option::is_none")]
    pub iters_per_instance: Option<u32>,

    #[serde(default)]
    pub phase: Phase,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Whole(u64),
    Fraction(f64),
}

fn whole_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<Seconds>::deserialize(deserializer)?.map(|s| match s {
        Seconds::Whole(n) => n,
        Seconds::Fraction(f) => f.max(0.0).ceil() as u64,
    }))
}

/// Capacity snapshot taken once when the workflow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub max_size: u32,
    pub desired_capacity: u32,
    pub baseline_count: u32,
    pub max_iterations: u32,
}

impl WorkflowState {
    /// A fresh workflow for `group`.
    pub fn new(group: &str) -> Self {
        Self {
            group_name: Some(group.to_string()),
            ..Default::default()
        }
    }

    /// Decode a state from a JSON message body.
    pub fn from_json(body: &str) -> StateResult<Self> {
        serde_json::from_str(body).map_err(|e| StateError::Deserialize(e.to_string()))
    }

    /// Encode the state as a JSON message body.
    pub fn to_json(&self) -> StateResult<String> {
        serde_json::to_string(self).map_err(|e| StateError::Serialize(e.to_string()))
    }

    /// The phase this state is in.
    ///
    /// Messages written before `phase` existed carry only `instance_ids`;
    /// their presence means setup already ran.
    pub fn effective_phase(&self) -> Phase {
        match self.phase {
            Phase::Uninitialized if self.instance_ids.is_some() => Phase::Converging,
            phase => phase,
        }
    }

    /// Fill in knobs the message left out.
    pub fn apply_defaults(&mut self, defaults: &WorkflowDefaults) {
        self.pause_seconds.get_or_insert(defaults.pause_seconds);
        self.growth_percent.get_or_insert(defaults.growth_percent);
    }

    pub fn pause_seconds(&self) -> u64 {
        self.pause_seconds.unwrap_or(DEFAULT_PAUSE_SECS)
    }

    pub fn growth_percent(&self) -> u32 {
        self.growth_percent.unwrap_or(DEFAULT_GROWTH_PERCENT)
    }

    /// Original instances not yet terminated.
    pub fn remaining(&self) -> usize {
        self.instance_ids.as_ref().map_or(0, Vec::len)
    }

    /// The setup snapshot. Fails if setup never ran.
    pub fn baseline(&self) -> StateResult<Baseline> {
        Ok(Baseline {
            max_size: self.max_size.ok_or(StateError::Missing("max_size"))?,
            desired_capacity: self
                .desired_capacity
                .ok_or(StateError::Missing("desired_capacity"))?,
            baseline_count: self
                .baseline_count
                .ok_or(StateError::Missing("baseline_count"))?,
            max_iterations: self
                .max_iterations
                .ok_or(StateError::Missing("max_iterations"))?,
        })
    }
}
