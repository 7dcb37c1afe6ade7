use std::sync::Arc;

use serde_json::json;
use tracing::info;

use fleetroll_fleet::{Action, LocalBus, SimFleet, SimGroup};
use fleetroll_rollout::{drive, DriveReport, RollingUpdate};
use fleetroll_state::{Event, WorkflowDefaults, WorkflowState};

/// Parameters of a simulated rollout.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub group: SimGroup,
    pub state: WorkflowState,
    pub channel: String,
}

/// Drive a full rolling update against an in-memory fleet and print a
/// JSON summary. Returns the process exit value.
pub async fn simulate(sim: Simulation, defaults: WorkflowDefaults) -> anyhow::Result<i32> {
    let report = run(sim, defaults).await?;
    Ok(report.outcome().exit_code())
}

async fn run(sim: Simulation, defaults: WorkflowDefaults) -> anyhow::Result<DriveReport> {
    let group = sim.group.name.clone();
    let fleet = Arc::new(SimFleet::new().with_group(sim.group));
    let bus = Arc::new(LocalBus::new());
    let update = RollingUpdate::new(fleet.clone(), bus.clone()).with_defaults(defaults);

    let event = Event::for_state(&sim.state, &sim.channel)?;
    let report = drive(&update, &bus, event).await?;

    for (n, invocation) in report.invocations.iter().enumerate() {
        info!(
            step = n + 1,
            iteration = ?invocation.state.iteration,
            remaining = invocation.state.remaining(),
            outcome = ?invocation.outcome,
            "simulated invocation"
        );
    }

    let summary = json!({
        "group": fleet.peek(&group).await,
        "invocations": report.invocations.len(),
        "terminated": terminated(&report),
        "outcome": report.outcome(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(report)
}

/// Instances terminated (or, under dry run, that would have been).
fn terminated(report: &DriveReport) -> Vec<String> {
    report
        .invocations
        .iter()
        .flat_map(|i| i.journal.iter())
        .filter_map(|e| match &e.action {
            Action::Terminate { instance_id, .. } => Some(instance_id.clone()),
            _ => None,
        })
        .collect()
}
