use derive_getters::Getters;
use serde::{Deserialize, Serialize};

pub type Port = u16;

pub fn default_ssh_port() -> Port {
    22
}

/// One device in the inventory: where to reach it, what platform it speaks,
/// and the per-host attribute block consumed by the configuration tasks.
#[derive(Getters, Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    host: String,
    #[serde(default = "self::default_ssh_port")]
    port: Port,
    platform: String,
    #[serde(default)]
    vars: HostVars,
}

impl Host {
    pub fn new<S: Into<String>>(host: S, platform: S) -> Self {
        Self {
            host: host.into(),
            port: default_ssh_port(),
            platform: platform.into(),
            vars: HostVars::default(),
        }
    }

    pub fn new_with_port<S: Into<String>>(host: S, platform: S, port: Port) -> Self {
        Self {
            host: host.into(),
            port,
            platform: platform.into(),
            vars: HostVars::default(),
        }
    }

    pub fn new_with_vars<S: Into<String>>(host: S, platform: S, vars: HostVars) -> Self {
        Self {
            host: host.into(),
            port: default_ssh_port(),
            platform: platform.into(),
            vars,
        }
    }
}

/// Per-host attributes set by the operator in `hosts.yaml`. Every field is
/// optional at load time; tasks that need a field surface a missing-attribute
/// error for that host rather than rendering an incomplete configuration.
#[derive(Getters, Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostVars {
    #[serde(default)]
    vlans: Option<Vec<u16>>,
    #[serde(default)]
    ise_pri: Option<String>,
    #[serde(default)]
    ise_sec: Option<String>,
    #[serde(default)]
    ise_key: Option<String>,
    #[serde(default)]
    excluded_intf: Option<Vec<String>>,
    #[serde(default)]
    uplinks: Option<Vec<String>>,
}

impl HostVars {
    pub fn new(
        vlans: Vec<u16>,
        ise_pri: impl Into<String>,
        ise_sec: impl Into<String>,
        ise_key: impl Into<String>,
        excluded_intf: Vec<String>,
        uplinks: Vec<String>,
    ) -> Self {
        Self {
            vlans: Some(vlans),
            ise_pri: Some(ise_pri.into()),
            ise_sec: Some(ise_sec.into()),
            ise_key: Some(ise_key.into()),
            excluded_intf: Some(excluded_intf),
            uplinks: Some(uplinks),
        }
    }
}
