use std::path::Path;

use anyhow::bail;

use fleetroll_state::{Event, WorkflowState};

use crate::config::{FleetrollConfig, DEFAULT_CONFIG_FILE};

/// Write a scaffold fleetroll.toml into `dir`.
pub fn init(dir: &Path) -> anyhow::Result<()> {
    let output = dir.join(DEFAULT_CONFIG_FILE);
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    std::fs::write(&output, FleetrollConfig::scaffold().to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

/// Print the trigger event that starts a rolling update.
pub fn event(state: &WorkflowState, channel: &str) -> anyhow::Result<()> {
    println!("{}", Event::for_state(state, channel)?.to_json_pretty()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();

        let written = FleetrollConfig::from_file(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(written.defaults.pause_seconds, Some(30));

        assert!(init(dir.path()).is_err());
    }
}
