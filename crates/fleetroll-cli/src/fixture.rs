//! Fleet fixture files for running against a simulated fleet.
//!
//! ```toml
//! [[groups]]
//! name = "web"
//! max_size = 4
//! desired_capacity = 3
//! warmup_describes = 1
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use fleetroll_fleet::{SimFleet, SimGroup};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetFixture {
    #[serde(default)]
    pub groups: Vec<SimGroup>,
}

impl FleetFixture {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fleet fixture {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("invalid fleet fixture {}", path.display()))
    }

    pub fn into_fleet(self) -> SimFleet {
        self.groups
            .into_iter()
            .fold(SimFleet::new(), |fleet, group| fleet.with_group(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups() {
        let fixture: FleetFixture = toml::from_str(
            r#"
[[groups]]
name = "web"
max_size = 4
desired_capacity = 3

[[groups]]
name = "worker"
max_size = 2
desired_capacity = 2
instance_ids = ["i-a", "i-b"]
warmup_describes = 3
"#,
        )
        .unwrap();

        assert_eq!(fixture.groups.len(), 2);
        assert_eq!(fixture.groups[0].warmup_describes, 1);
        assert_eq!(fixture.groups[1].instance_ids, vec!["i-a", "i-b"]);
    }

    #[tokio::test]
    async fn builds_a_fleet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        std::fs::write(
            &path,
            "[[groups]]\nname = \"web\"\nmax_size = 2\ndesired_capacity = 2\ninstance_ids = [\"i-a\"]\n",
        )
        .unwrap();

        let fleet = FleetFixture::from_file(&path).unwrap().into_fleet();
        let snap = fleet.peek("web").await.unwrap();
        assert_eq!(snap.instances.len(), 2);
        assert!(snap.contains("i-a"));
    }
}
