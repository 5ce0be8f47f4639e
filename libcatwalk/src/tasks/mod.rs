//! Per-host configuration tasks and the typed context they hang derived
//! facts on. Each task records the facts it produces and reads the facts it
//! needs through accessors that fail with [`TaskError::MissingFact`] when a
//! prerequisite task has not run, so data dependencies between tasks are
//! explicit instead of living in a free-form attribute bag.

use serde::Serialize;

use crate::parse::{Interface, ParseError};
use crate::session::SessionError;

pub mod aaa;
pub mod dot1x;

#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unexpected response to `{command}`: {detail}")]
    UnexpectedResponse { command: String, detail: String },
    #[error("host `{host}` is missing required attribute `{attribute}`")]
    MissingAttribute { host: String, attribute: &'static str },
    #[error("fact `{0}` has not been gathered for this host")]
    MissingFact(&'static str),
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),
}

/// An access port selected for dot1x, carrying the VLAN it serves today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPort {
    pub interface: String,
    pub access_vlan: u16,
}

/// Facts derived for one host over the course of a run. Owned exclusively by
/// the worker processing that host; nothing here is shared across hosts.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    sw_version: Option<String>,
    sw_model: Option<String>,
    interfaces: Option<Vec<Interface>>,
    uplink_interfaces: Option<Vec<String>>,
    access_interfaces: Option<Vec<AccessPort>>,
    global_cfg: Option<String>,
    uplink_intf_cfg: Option<String>,
    access_intf_cfg: Option<String>,
}

impl HostContext {
    pub fn record_facts(&mut self, version: String, model: String, interfaces: Vec<Interface>) {
        self.sw_version = Some(version);
        self.sw_model = Some(model);
        self.interfaces = Some(interfaces);
    }

    pub fn record_classified(&mut self, uplinks: Vec<String>, access: Vec<AccessPort>) {
        self.uplink_interfaces = Some(uplinks);
        self.access_interfaces = Some(access);
    }

    pub fn record_rendered(&mut self, global: String, uplink: String, access: String) {
        self.global_cfg = Some(global);
        self.uplink_intf_cfg = Some(uplink);
        self.access_intf_cfg = Some(access);
    }

    pub fn sw_version(&self) -> Result<&str, TaskError> {
        self.sw_version
            .as_deref()
            .ok_or(TaskError::MissingFact("sw_version"))
    }

    pub fn sw_model(&self) -> Result<&str, TaskError> {
        self.sw_model
            .as_deref()
            .ok_or(TaskError::MissingFact("sw_model"))
    }

    pub fn interfaces(&self) -> Result<&[Interface], TaskError> {
        self.interfaces
            .as_deref()
            .ok_or(TaskError::MissingFact("interfaces"))
    }

    pub fn uplink_interfaces(&self) -> Result<&[String], TaskError> {
        self.uplink_interfaces
            .as_deref()
            .ok_or(TaskError::MissingFact("uplink_interfaces"))
    }

    pub fn access_interfaces(&self) -> Result<&[AccessPort], TaskError> {
        self.access_interfaces
            .as_deref()
            .ok_or(TaskError::MissingFact("access_interfaces"))
    }

    pub fn global_cfg(&self) -> Result<&str, TaskError> {
        self.global_cfg
            .as_deref()
            .ok_or(TaskError::MissingFact("global_cfg"))
    }

    pub fn uplink_intf_cfg(&self) -> Result<&str, TaskError> {
        self.uplink_intf_cfg
            .as_deref()
            .ok_or(TaskError::MissingFact("uplink_intf_cfg"))
    }

    pub fn access_intf_cfg(&self) -> Result<&str, TaskError> {
        self.access_intf_cfg
            .as_deref()
            .ok_or(TaskError::MissingFact("access_intf_cfg"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_ungathered_fact_is_a_typed_error() {
        let ctx = HostContext::default();
        assert!(matches!(
            ctx.sw_model(),
            Err(TaskError::MissingFact("sw_model"))
        ));
        assert!(matches!(
            ctx.interfaces(),
            Err(TaskError::MissingFact("interfaces"))
        ));
    }

    #[test]
    fn test_recorded_facts_read_back() {
        let mut ctx = HostContext::default();
        ctx.record_facts("15.2(4)E8".into(), "C3750X".into(), vec![]);
        assert_eq!("C3750X", ctx.sw_model().unwrap());
        assert_eq!("15.2(4)E8", ctx.sw_version().unwrap());
        assert!(ctx.interfaces().unwrap().is_empty());
        // classification has not run yet
        assert!(ctx.uplink_interfaces().is_err());
    }
}
