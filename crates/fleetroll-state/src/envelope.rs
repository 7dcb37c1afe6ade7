//! Notification envelope that carries workflow state between invocations.

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::types::{GroupName, WorkflowState};

/// Subject line of every continuation message.
pub fn continuation_subject(group: &str) -> String {
    format!("Rolling update of asg: {group}")
}

/// An inbound trigger. Only the first record is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Records")]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Sns")]
    pub notification: Notification,
}

/// A published message: body plus the channel it travels on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// JSON-encoded `WorkflowState`.
    #[serde(rename = "Message")]
    pub message: String,

    /// Channel the next invocation will be triggered from.
    #[serde(rename = "TopicArn")]
    pub channel: String,

    #[serde(rename = "Subject", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Notification {
    /// Wrap `state` for publication on `channel`.
    pub fn for_state(state: &WorkflowState, channel: &str) -> StateResult<Self> {
        let subject = state.group_name.as_deref().map(continuation_subject);
        Ok(Self {
            message: state.to_json()?,
            channel: channel.to_string(),
            subject,
        })
    }

    /// Group the message is addressed to, read without decoding the rest
    /// of the body. Messages from other producers sharing the channel
    /// have none, whatever else they carry.
    pub fn group_name(&self) -> StateResult<Option<GroupName>> {
        let body: serde_json::Value = serde_json::from_str(&self.message)
            .map_err(|e| StateError::Deserialize(e.to_string()))?;
        Ok(["group_name", "asg_name"]
            .iter()
            .find_map(|key| body.get(key))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string))
    }

    pub fn decode_state(&self) -> StateResult<WorkflowState> {
        WorkflowState::from_json(&self.message)
    }
}

impl Event {
    pub fn from_notification(notification: Notification) -> Self {
        Self {
            records: vec![Record { notification }],
        }
    }

    /// Build a trigger event carrying `state`.
    pub fn for_state(state: &WorkflowState, channel: &str) -> StateResult<Self> {
        Ok(Self::from_notification(Notification::for_state(state, channel)?))
    }

    pub fn from_json(raw: &str) -> StateResult<Self> {
        serde_json::from_str(raw).map_err(|e| StateError::Deserialize(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> StateResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StateError::Serialize(e.to_string()))
    }

    /// The notification that triggered this invocation.
    pub fn notification(&self) -> StateResult<&Notification> {
        self.records
            .first()
            .map(|r| &r.notification)
            .ok_or(StateError::EmptyEvent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sns_shaped_event() {
        let raw = r#"{
            "Records": [
                {
                    "Sns": {
                        "Message": "{\"dry_run\": true, \"growth_percent\": 400, \"asg_name\": \"dev-ecs-cluster\"}",
                        "TopicArn": "dev-ecs-roll"
                    }
                }
            ]
        }"#;
        let event = Event::from_json(raw).unwrap();
        let notification = event.notification().unwrap();
        assert_eq!(notification.channel, "dev-ecs-roll");
        assert!(notification.subject.is_none());

        let state = notification.decode_state().unwrap();
        assert!(state.dry_run);
        assert_eq!(state.growth_percent, Some(400));
        assert_eq!(state.group_name.as_deref(), Some("dev-ecs-cluster"));
    }

    fn notification(message: &str) -> Notification {
        Notification {
            message: message.to_string(),
            channel: "t".to_string(),
            subject: None,
        }
    }

    #[test]
    fn group_name_ignores_the_rest_of_the_body() {
        let foreign = notification(r#"{"phase":"deploying","dry_run":"yes","iteration":"abc"}"#);
        assert_eq!(foreign.group_name().unwrap(), None);
        assert!(foreign.decode_state().is_err());

        assert_eq!(notification("[1, 2]").group_name().unwrap(), None);
        assert_eq!(notification(r#"{"group_name":7}"#).group_name().unwrap(), None);
        assert_eq!(
            notification(r#"{"asg_name":"dev","iter":"x"}"#).group_name().unwrap().as_deref(),
            Some("dev")
        );
        assert!(notification("not json").group_name().is_err());
    }

    #[test]
    fn empty_event_is_rejected() {
        let event = Event { records: vec![] };
        assert!(matches!(event.notification(), Err(StateError::EmptyEvent)));
    }

    #[test]
    fn continuation_carries_subject_and_channel() {
        let mut state = WorkflowState::new("g1");
        state.iteration = Some(2);
        let event = Event::for_state(&state, "topic-a").unwrap();
        let notification = event.notification().unwrap();
        assert_eq!(notification.channel, "topic-a");
        assert_eq!(
            notification.subject.as_deref(),
            Some("Rolling update of asg: g1")
        );
        assert_eq!(notification.decode_state().unwrap(), state);
    }
}
