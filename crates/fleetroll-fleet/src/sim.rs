//! In-memory fleet that behaves like an auto-scaling group.
//!
//! Groups launch instances to match desired capacity. New instances
//! report `Pending` until they have been seen by `warmup_describes`
//! describe calls, then `Healthy`. Every call is recorded so tests can
//! assert on exactly what a workflow sent.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use fleetroll_state::{GroupName, InstanceId};

use crate::api::{ApiError, ApiFuture, CapacityUpdate, FleetApi, GroupSnapshot, InstanceHealth, HEALTHY};

const PENDING: &str = "Pending";

fn default_warmup() -> u32 {
    1
}

/// Starting layout of a simulated group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimGroup {
    pub name: GroupName,
    #[serde(default)]
    pub min_size: u32,
    pub max_size: u32,
    pub desired_capacity: u32,
    /// Starting members, all healthy. Generated from
    /// `desired_capacity` when empty.
    #[serde(default)]
    pub instance_ids: Vec<InstanceId>,
    /// Describe calls a new instance needs before it reports healthy.
    #[serde(default = "default_warmup")]
    pub warmup_describes: u32,
}

impl SimGroup {
    /// A group of `count` healthy instances at full capacity.
    pub fn new(name: &str, count: u32) -> Self {
        Self {
            name: name.to_string(),
            min_size: 0,
            max_size: count,
            desired_capacity: count,
            instance_ids: Vec::new(),
            warmup_describes: default_warmup(),
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_warmup(mut self, describes: u32) -> Self {
        self.warmup_describes = describes;
        self
    }
}

/// A call received by the simulated fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    DescribeGroups(Vec<GroupName>),
    CreateTags {
        instance_ids: Vec<InstanceId>,
        key: String,
        value: String,
    },
    UpdateGroup(CapacityUpdate),
    TerminateInstance {
        instance_id: InstanceId,
        decrement_desired: bool,
    },
}

impl SimCall {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, SimCall::DescribeGroups(_))
    }
}

#[derive(Debug)]
struct Member {
    id: InstanceId,
    warmup_left: u32,
}

impl Member {
    fn health(&self) -> &'static str {
        if self.warmup_left == 0 { HEALTHY } else { PENDING }
    }
}

#[derive(Debug)]
struct Group {
    name: GroupName,
    min_size: u32,
    max_size: u32,
    desired: u32,
    warmup: u32,
    members: Vec<Member>,
}

impl Group {
    fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            name: self.name.clone(),
            min_size: self.min_size,
            max_size: self.max_size,
            desired_capacity: self.desired,
            instances: self
                .members
                .iter()
                .map(|m| InstanceHealth {
                    instance_id: m.id.clone(),
                    health_status: m.health().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct SimInner {
    groups: Vec<Group>,
    tags: HashMap<InstanceId, HashMap<String, String>>,
    calls: Vec<SimCall>,
    failing: HashSet<&'static str>,
    launched: u32,
}

impl SimInner {
    fn next_id(&mut self) -> InstanceId {
        self.launched += 1;
        format!("i-{:08x}", self.launched)
    }

    /// Launch or retire members until the group matches its desired size.
    fn reconcile(&mut self, index: usize) {
        while (self.groups[index].members.len() as u32) < self.groups[index].desired {
            let id = self.next_id();
            let warmup = self.groups[index].warmup;
            debug!(group = %self.groups[index].name, instance = %id, "sim: launching instance");
            self.groups[index].members.push(Member {
                id,
                warmup_left: warmup,
            });
        }
        let group = &mut self.groups[index];
        while group.members.len() as u32 > group.desired {
            if let Some(m) = group.members.pop() {
                debug!(group = %group.name, instance = %m.id, "sim: retiring instance");
            }
        }
    }

    fn take_failure(&mut self, operation: &'static str) -> Result<(), ApiError> {
        if self.failing.remove(operation) {
            return Err(ApiError::new(operation, "injected failure"));
        }
        Ok(())
    }
}

/// Simulated auto-scaling service.
#[derive(Debug, Default)]
pub struct SimFleet {
    inner: Mutex<SimInner>,
}

impl SimFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. Two groups may share a name to model an ambiguous lookup.
    pub fn with_group(self, spec: SimGroup) -> Self {
        let mut inner = self.inner.into_inner();
        let mut members: Vec<Member> = spec
            .instance_ids
            .iter()
            .map(|id| Member {
                id: id.clone(),
                warmup_left: 0,
            })
            .collect();
        while (members.len() as u32) < spec.desired_capacity {
            members.push(Member {
                id: inner.next_id(),
                warmup_left: 0,
            });
        }
        inner.groups.push(Group {
            name: spec.name,
            min_size: spec.min_size,
            max_size: spec.max_size,
            desired: spec.desired_capacity,
            warmup: spec.warmup_describes,
            members,
        });
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Make the next call to `operation` fail.
    pub async fn fail_next(&self, operation: &'static str) {
        self.inner.lock().await.failing.insert(operation);
    }

    /// Every call received so far.
    pub async fn calls(&self) -> Vec<SimCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Calls that would have changed a real fleet.
    pub async fn mutating_calls(&self) -> Vec<SimCall> {
        self.calls()
            .await
            .into_iter()
            .filter(SimCall::is_mutating)
            .collect()
    }

    /// Current state of a group, without advancing warmup.
    pub async fn peek(&self, name: &str) -> Option<GroupSnapshot> {
        let inner = self.inner.lock().await;
        inner.groups.iter().find(|g| g.name == name).map(Group::snapshot)
    }

    pub async fn tag(&self, instance_id: &str, key: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.tags.get(instance_id).and_then(|t| t.get(key)).cloned()
    }
}

impl FleetApi for SimFleet {
    fn describe_groups<'a>(&'a self, names: &'a [GroupName]) -> ApiFuture<'a, Vec<GroupSnapshot>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.calls.push(SimCall::DescribeGroups(names.to_vec()));
            inner.take_failure("describe_groups")?;

            let mut out = Vec::new();
            for group in inner.groups.iter_mut().filter(|g| names.contains(&g.name)) {
                for member in &mut group.members {
                    member.warmup_left = member.warmup_left.saturating_sub(1);
                }
                out.push(group.snapshot());
            }
            Ok(out)
        })
    }

    fn create_tags<'a>(
        &'a self,
        instance_ids: &'a [InstanceId],
        key: &'a str,
        value: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.calls.push(SimCall::CreateTags {
                instance_ids: instance_ids.to_vec(),
                key: key.to_string(),
                value: value.to_string(),
            });
            inner.take_failure("create_tags")?;

            for id in instance_ids {
                inner
                    .tags
                    .entry(id.clone())
                    .or_default()
                    .insert(key.to_string(), value.to_string());
            }
            Ok(())
        })
    }

    fn update_group<'a>(&'a self, update: &'a CapacityUpdate) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.calls.push(SimCall::UpdateGroup(update.clone()));
            inner.take_failure("update_group")?;

            let index = inner
                .groups
                .iter()
                .position(|g| g.name == update.group_name)
                .ok_or_else(|| {
                    ApiError::new("update_group", format!("no group named {}", update.group_name))
                })?;

            let group = &mut inner.groups[index];
            let max_size = update.max_size.unwrap_or(group.max_size);
            if update.desired_capacity > max_size {
                return Err(ApiError::new(
                    "update_group",
                    format!(
                        "desired capacity {} exceeds max size {}",
                        update.desired_capacity, max_size
                    ),
                ));
            }
            group.max_size = max_size;
            group.desired = update.desired_capacity;
            inner.reconcile(index);
            Ok(())
        })
    }

    fn terminate_instance<'a>(
        &'a self,
        instance_id: &'a str,
        decrement_desired: bool,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.calls.push(SimCall::TerminateInstance {
                instance_id: instance_id.to_string(),
                decrement_desired,
            });
            inner.take_failure("terminate_instance")?;

            let index = inner
                .groups
                .iter()
                .position(|g| g.members.iter().any(|m| m.id == instance_id))
                .ok_or_else(|| {
                    ApiError::new(
                        "terminate_instance",
                        format!("instance {instance_id} is not in any group"),
                    )
                })?;

            let group = &mut inner.groups[index];
            group.members.retain(|m| m.id != instance_id);
            if decrement_desired {
                group.desired = group.desired.saturating_sub(1);
            }
            inner.tags.remove(instance_id);
            inner.reconcile(index);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn launched_instances_warm_up_over_describes() {
        let fleet = SimFleet::new().with_group(SimGroup::new("g1", 2).with_max_size(4).with_warmup(2));
        let update = CapacityUpdate {
            group_name: "g1".to_string(),
            desired_capacity: 3,
            max_size: None,
        };
        fleet.update_group(&update).await.unwrap();

        let names = vec!["g1".to_string()];
        let first = fleet.describe_groups(&names).await.unwrap();
        assert_eq!(first[0].instances.len(), 3);
        assert_eq!(first[0].instances[2].health_status, "Pending");

        let second = fleet.describe_groups(&names).await.unwrap();
        assert_eq!(second[0].instances[2].health_status, HEALTHY);
    }

    #[tokio::test]
    async fn desired_above_max_is_rejected() {
        let fleet = SimFleet::new().with_group(SimGroup::new("g1", 2));
        let update = CapacityUpdate {
            group_name: "g1".to_string(),
            desired_capacity: 3,
            max_size: None,
        };
        let err = fleet.update_group(&update).await.unwrap_err();
        assert_eq!(err.operation, "update_group");
        assert_eq!(fleet.peek("g1").await.unwrap().desired_capacity, 2);
    }

    #[tokio::test]
    async fn terminate_without_decrement_launches_replacement() {
        let fleet = SimFleet::new().with_group(SimGroup::new("g1", 2));
        let before = fleet.peek("g1").await.unwrap().instance_ids();

        fleet.terminate_instance(&before[1], false).await.unwrap();

        let after = fleet.peek("g1").await.unwrap();
        assert_eq!(after.instances.len(), 2);
        assert!(!after.contains(&before[1]));
        assert_eq!(after.instances[1].health_status, "Pending");
    }

    #[tokio::test]
    async fn terminate_with_decrement_shrinks_group() {
        let fleet = SimFleet::new().with_group(SimGroup::new("g1", 2));
        let ids = fleet.peek("g1").await.unwrap().instance_ids();

        fleet.terminate_instance(&ids[0], true).await.unwrap();

        let after = fleet.peek("g1").await.unwrap();
        assert_eq!(after.desired_capacity, 1);
        assert_eq!(after.instances.len(), 1);
    }

    #[tokio::test]
    async fn terminating_unknown_instance_fails() {
        let fleet = SimFleet::new().with_group(SimGroup::new("g1", 1));
        assert!(fleet.terminate_instance("i-missing", false).await.is_err());
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let fleet = SimFleet::new().with_group(SimGroup::new("g1", 1));
        fleet.fail_next("create_tags").await;
        let ids = vec!["i-00000001".to_string()];

        assert!(fleet.create_tags(&ids, "drain", "true").await.is_err());
        assert!(fleet.create_tags(&ids, "drain", "true").await.is_ok());
        assert_eq!(fleet.tag("i-00000001", "drain").await.as_deref(), Some("true"));
        assert_eq!(fleet.mutating_calls().await.len(), 2);
    }

    #[test]
    fn group_spec_defaults() {
        let spec: SimGroup =
            serde_json::from_str(r#"{"name":"g1","max_size":4,"desired_capacity":2}"#).unwrap();
        assert_eq!(spec.warmup_describes, 1);
        assert_eq!(spec.min_size, 0);
        assert!(spec.instance_ids.is_empty());
    }
}
