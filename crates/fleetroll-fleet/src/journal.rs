//! Record of the side effects an invocation performed or simulated.

use serde::{Deserialize, Serialize};

use fleetroll_state::InstanceId;

use crate::api::CapacityUpdate;

/// A side effect, with the exact arguments sent (or that would be sent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Tag {
        instance_ids: Vec<InstanceId>,
        key: String,
        value: String,
    },
    UpdateCapacity(CapacityUpdate),
    Terminate {
        instance_id: InstanceId,
        decrement_desired: bool,
    },
    Pause {
        seconds: u64,
    },
    Publish {
        channel: String,
        subject: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(flatten)]
    pub action: Action,
    /// True when the action was only logged.
    pub simulated: bool,
}

/// Per-invocation execution context.
///
/// Under dry run, components log and record their action instead of
/// calling the collaborator.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    dry_run: bool,
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            entries: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Append an action, flagged according to the journal's mode.
    pub fn record(&mut self, action: Action) {
        self.entries.push(JournalEntry {
            action,
            simulated: self.dry_run,
        });
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<JournalEntry> {
        self.entries
    }

    /// Executed (not simulated) actions, pauses excluded.
    pub fn mutations(&self) -> impl Iterator<Item = &Action> {
        self.entries
            .iter()
            .filter(|e| !e.simulated && !matches!(e.action, Action::Pause { .. }))
            .map(|e| &e.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_follow_journal_mode() {
        let mut live = Journal::new(false);
        live.record(Action::Pause { seconds: 30 });
        live.record(Action::Terminate {
            instance_id: "i-1".to_string(),
            decrement_desired: false,
        });
        assert!(live.entries().iter().all(|e| !e.simulated));
        assert_eq!(live.mutations().count(), 1);

        let mut dry = Journal::new(true);
        dry.record(Action::Terminate {
            instance_id: "i-1".to_string(),
            decrement_desired: false,
        });
        assert!(dry.entries()[0].simulated);
        assert_eq!(dry.mutations().count(), 0);
    }

    #[test]
    fn entry_serializes_flat() {
        let entry = JournalEntry {
            action: Action::Pause { seconds: 5 },
            simulated: true,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"action":"pause","seconds":5,"simulated":true}"#);
    }
}
