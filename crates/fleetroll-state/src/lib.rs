//! fleetroll-state — the message-borne state of a rolling update.
//!
//! A rolling update keeps no store of its own. Everything needed to
//! resume it lives in [`WorkflowState`], which travels as the JSON body
//! of the notification that triggers each invocation.
//!
//! # Wire format
//!
//! ```text
//! {"Records":[{"Sns":{
//!     "TopicArn": "<continuation channel>",
//!     "Subject":  "Rolling update of asg: <group>",
//!     "Message":  "<WorkflowState as JSON>"
//! }}]}
//! ```
//!
//! Field names written by older handlers (`asg_name`, `ec2_inst_ids`,
//! `iter`, ...) are accepted on input and re-emitted under the current
//! names.

pub mod envelope;
pub mod error;
pub mod types;

pub use envelope::{continuation_subject, Event, Notification, Record};
pub use error::{StateError, StateResult};
pub use types::*;
