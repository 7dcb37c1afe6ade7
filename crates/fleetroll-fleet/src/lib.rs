//! fleetroll-fleet — the collaborators a rolling update drives.
//!
//! The rolling-update core never talks to a cloud API directly. It goes
//! through two capability traits, [`FleetApi`] and [`MessageBus`], and a
//! thin component per concern:
//!
//! - **`inspector`** — describe a group, count healthy instances
//! - **`drain`** — tag instances as draining
//! - **`scaler`** — grow desired capacity by a percentage
//! - **`terminate`** — remove one instance, keep desired capacity
//! - **`publish`** — re-emit workflow state as a continuation
//!
//! Every mutating component records what it did (or, under dry run,
//! would have done) in a [`Journal`].
//!
//! [`SimFleet`] and [`LocalBus`] are in-memory implementations used by
//! tests and by the `fleetroll simulate` command.

pub mod api;
pub mod drain;
pub mod error;
pub mod inspector;
pub mod journal;
pub mod publish;
pub mod scaler;
pub mod sim;
pub mod terminate;

pub use api::{
    ApiError, ApiFuture, CapacityUpdate, FleetApi, GroupSnapshot, InstanceHealth, MessageBus,
    DRAIN_TAG, HEALTHY,
};
pub use drain::DrainMarker;
pub use error::{FleetError, FleetResult};
pub use inspector::{healthy_count, FleetInspector};
pub use journal::{Action, Journal, JournalEntry};
pub use publish::{ContinuationPublisher, LocalBus};
pub use scaler::{plan_growth, CapacityScaler};
pub use sim::{SimCall, SimFleet, SimGroup};
pub use terminate::TerminationController;
