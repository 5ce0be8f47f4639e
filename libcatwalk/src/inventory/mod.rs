//! YAML device inventory: hosts keyed by name, display groups, and shared
//! credential defaults. An optional site code selects `<site>_`-prefixed
//! hosts/groups files so one checkout can drive several sites.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::log::*;

pub mod host;

pub use host::{Host, HostVars, Port};

#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error("failed reading inventory file: {0}")]
    Io(#[from] io::Error),
    #[error("failed deserializing inventory file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Shared credential defaults from `defaults.yaml`. Either field may be left
/// unset, in which case the operator is prompted at kickoff.
#[derive(Getters, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl Defaults {
    pub fn set_username(&mut self, username: String) {
        self.username = Some(username);
    }

    pub fn set_password(&mut self, password: String) {
        self.password = Some(password);
    }
}

#[derive(Getters, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    hosts: HashMap<String, Host>,
    #[serde(default)]
    groups: HashMap<String, Vec<String>>,
    #[serde(default)]
    defaults: Defaults,
}

/// The three files backing an inventory directory, in load order: hosts,
/// groups, defaults. Only the hosts file is site-prefixed together with the
/// groups file; defaults are shared across sites.
pub fn inventory_paths(dir: &Path, site: Option<&str>) -> (PathBuf, PathBuf, PathBuf) {
    let prefix = site.map(|s| format!("{s}_")).unwrap_or_default();
    (
        dir.join(format!("{prefix}hosts.yaml")),
        dir.join(format!("{prefix}groups.yaml")),
        dir.join("defaults.yaml"),
    )
}

impl Inventory {
    /// Load an inventory from a directory. The hosts file is required; the
    /// groups and defaults files are optional.
    #[tracing::instrument]
    pub async fn load(dir: &Path, site: Option<&str>) -> Result<Self, InventoryError> {
        let (hosts_path, groups_path, defaults_path) = inventory_paths(dir, site);

        debug!("inventory: loading hosts from {}", hosts_path.display());
        let hosts = serde_yaml::from_str(&fs::read_to_string(&hosts_path).await?)?;

        let groups = match fs::read_to_string(&groups_path).await {
            Ok(raw) => serde_yaml::from_str(&raw)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        let defaults = match fs::read_to_string(&defaults_path).await {
            Ok(raw) => serde_yaml::from_str(&raw)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Defaults::default(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            hosts,
            groups,
            defaults,
        })
    }

    /// Every host whose platform matches, sorted by name so runs print in a
    /// stable order.
    pub fn filter_platform(&self, platform: &str) -> Vec<(String, Host)> {
        let mut matched: Vec<(String, Host)> = self
            .hosts
            .iter()
            .filter(|(_name, host)| host.platform() == platform)
            .map(|(name, host)| (name.clone(), host.clone()))
            .collect();
        matched.sort_by(|(a, _), (b, _)| a.cmp(b));
        matched
    }

    /// Names of the groups a host belongs to.
    pub fn groups_for_host(&self, name: &str) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|(_group, members)| members.iter().any(|m| m == name))
            .map(|(group, _members)| group.as_str())
            .collect()
    }

    pub fn defaults_mut(&mut self) -> &mut Defaults {
        &mut self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_code_selects_prefixed_files() {
        let (hosts, groups, defaults) = inventory_paths(Path::new("inventory"), Some("rdu"));
        assert_eq!(Path::new("inventory/rdu_hosts.yaml"), hosts);
        assert_eq!(Path::new("inventory/rdu_groups.yaml"), groups);
        assert_eq!(Path::new("inventory/defaults.yaml"), defaults);

        let (hosts, _, _) = inventory_paths(Path::new("inventory"), None);
        assert_eq!(Path::new("inventory/hosts.yaml"), hosts);
    }

    #[test]
    fn test_hosts_yaml_parses_with_vars() {
        let raw = r#"
SW1:
  host: 10.10.20.11
  platform: ios
  vars:
    vlans: [10, 20]
    ise_pri: 10.10.30.5
    ise_sec: 10.10.30.6
    ise_key: sekrit
    excluded_intf: [Gi1/0/2]
    uplinks: [Gi1/0/48]
SW2:
  host: 10.10.20.12
  port: 2222
  platform: nxos
"#;
        let hosts: HashMap<String, Host> = serde_yaml::from_str(raw).unwrap();
        let sw1 = &hosts["SW1"];
        assert_eq!("10.10.20.11", sw1.host());
        assert_eq!(22, *sw1.port());
        assert_eq!(&Some(vec![10, 20]), sw1.vars().vlans());
        assert_eq!(&Some("10.10.30.5".to_string()), sw1.vars().ise_pri());
        assert_eq!(2222, *hosts["SW2"].port());

        let inventory = Inventory {
            hosts,
            groups: HashMap::new(),
            defaults: Defaults::default(),
        };
        let matched = inventory.filter_platform("ios");
        assert_eq!(1, matched.len());
        assert_eq!("SW1", matched[0].0);
    }

    #[test]
    fn test_groups_for_host() {
        let mut groups = HashMap::new();
        groups.insert("access-stacks".to_string(), vec!["SW1".to_string()]);
        let inventory = Inventory {
            hosts: HashMap::new(),
            groups,
            defaults: Defaults::default(),
        };
        assert_eq!(vec!["access-stacks"], inventory.groups_for_host("SW1"));
        assert!(inventory.groups_for_host("SW9").is_empty());
    }
}
