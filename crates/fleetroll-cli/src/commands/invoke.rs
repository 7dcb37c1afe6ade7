use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fleetroll_fleet::LocalBus;
use fleetroll_rollout::RollingUpdate;
use fleetroll_state::{Event, WorkflowDefaults};

use crate::fixture::FleetFixture;

/// Run one invocation of `event_path` against the fleet in `fleet_path`
/// and print the invocation as JSON. Returns the process exit value.
pub async fn invoke(
    event_path: &Path,
    fleet_path: &Path,
    defaults: WorkflowDefaults,
) -> anyhow::Result<i32> {
    let raw = std::fs::read_to_string(event_path)
        .with_context(|| format!("failed to read event {}", event_path.display()))?;
    let event = Event::from_json(&raw)?;

    let fleet = Arc::new(FleetFixture::from_file(fleet_path)?.into_fleet());
    let bus = Arc::new(LocalBus::new());
    let update = RollingUpdate::new(fleet, bus.clone()).with_defaults(defaults);

    let invocation = update.handle(&event).await?;
    info!(
        outcome = ?invocation.outcome,
        published = bus.published().await,
        "invocation finished"
    );

    println!("{}", serde_json::to_string_pretty(&invocation)?);
    Ok(invocation.outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const FLEET: &str = "[[groups]]\nname = \"web\"\nmax_size = 3\ndesired_capacity = 3\n";

    #[tokio::test]
    async fn foreign_event_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(
            dir.path(),
            "event.json",
            r#"{"Records":[{"Sns":{"Message":"{}","TopicArn":"t"}}]}"#,
        );
        let fleet = write(dir.path(), "fleet.toml", FLEET);

        let code = invoke(&event, &fleet, WorkflowDefaults::default()).await.unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn dry_run_event_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(
            dir.path(),
            "event.json",
            r#"{"Records":[{"Sns":{"Message":"{\"group_name\":\"web\",\"dry_run\":true}","TopicArn":"t"}}]}"#,
        );
        let fleet = write(dir.path(), "fleet.toml", FLEET);

        let code = invoke(&event, &fleet, WorkflowDefaults::default()).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn unknown_group_fails() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(
            dir.path(),
            "event.json",
            r#"{"Records":[{"Sns":{"Message":"{\"group_name\":\"db\"}","TopicArn":"t"}}]}"#,
        );
        let fleet = write(dir.path(), "fleet.toml", FLEET);

        assert!(invoke(&event, &fleet, WorkflowDefaults::default()).await.is_err());
    }
}
