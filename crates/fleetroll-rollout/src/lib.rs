//! fleetroll rolling update — the state machine that replaces a group's
//! instances without downtime.
//!
//! Each invocation reads a [`WorkflowState`](fleetroll_state::WorkflowState)
//! from the triggering event, advances it one step, and either finishes
//! or publishes the evolved state so the next invocation can resume.
//!
//! ```text
//! Uninitialized ── drain, grow, pause ──► Converging ◄─┐
//!                                             │        │ pause + publish
//!                     terminate surplus ──────┤────────┘
//!                                             ├──► Completed (no originals left)
//!                                             └──► Aborted   (iteration budget spent)
//! ```
//!
//! # Components
//!
//! - **`controller`** — `RollingUpdate`, one invocation of the state machine
//! - **`driver`** — feeds continuations back in until a terminal outcome
//! - **`error`** — `RollError`

pub mod controller;
pub mod driver;
pub mod error;

pub use controller::{Invocation, Outcome, RollingUpdate};
pub use driver::{drive, DriveReport};
pub use error::{RollError, RollResult};
