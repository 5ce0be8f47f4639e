//! IBNS dot1x configuration rendering. Facts are gathered from the device,
//! interfaces are partitioned into uplink and access roles from the host's
//! membership lists, and a template family is selected by hardware model:
//! 3750-family stacks only speak IBNSv1, everything else gets IBNSv2. The
//! rendered text is stored on the host context for audit or a later push;
//! nothing here writes configuration to the device.

use crate::inventory::HostVars;
use crate::log::*;
use crate::parse::{self, Interface};
use crate::session::ConsoleSession;
use crate::template::{Context, TemplateEngine};

use super::{AccessPort, HostContext, TaskError};

pub const SHOW_VERSION_CMD: &str = "show version";
pub const SHOW_SWITCHPORT_CMD: &str = "show interface switchport";

/// The two IBNS template families and the template files each renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    IbnsV1,
    IbnsV2,
}

impl TemplateFamily {
    /// Select a family from the model family token of `show version`.
    pub fn for_model(model: &str) -> Self {
        if model.contains("3750") {
            TemplateFamily::IbnsV1
        } else {
            TemplateFamily::IbnsV2
        }
    }

    pub fn global_template(&self) -> &'static str {
        match self {
            TemplateFamily::IbnsV1 => "ibnsv1_global.tera",
            TemplateFamily::IbnsV2 => "ibnsv2_global.tera",
        }
    }

    pub fn access_template(&self) -> &'static str {
        match self {
            TemplateFamily::IbnsV1 => "ibnsv1_access_intf.tera",
            TemplateFamily::IbnsV2 => "ibnsv2_access_intf.tera",
        }
    }

    /// Uplinks are excluded from dot1x either way; one template serves both
    /// families.
    pub fn uplink_template(&self) -> &'static str {
        "ibns_uplink_intf.tera"
    }
}

impl std::fmt::Display for TemplateFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateFamily::IbnsV1 => write!(f, "IBNSv1"),
            TemplateFamily::IbnsV2 => write!(f, "IBNSv2"),
        }
    }
}

/// The host attributes the dot1x tasks read, all present. Borrowed out of a
/// [`HostVars`] by [`require_vars`], which names the first missing one.
#[derive(Debug, Clone, Copy)]
pub struct Dot1xVars<'a> {
    pub vlans: &'a [u16],
    pub ise_pri: &'a str,
    pub ise_sec: &'a str,
    pub ise_key: &'a str,
    pub excluded_intf: &'a [String],
    pub uplinks: &'a [String],
}

pub fn require_vars<'a>(host: &str, vars: &'a HostVars) -> Result<Dot1xVars<'a>, TaskError> {
    let missing = |attribute: &'static str| TaskError::MissingAttribute {
        host: host.to_string(),
        attribute,
    };
    Ok(Dot1xVars {
        vlans: vars.vlans().as_deref().ok_or_else(|| missing("vlans"))?,
        ise_pri: vars.ise_pri().as_deref().ok_or_else(|| missing("ise_pri"))?,
        ise_sec: vars.ise_sec().as_deref().ok_or_else(|| missing("ise_sec"))?,
        ise_key: vars.ise_key().as_deref().ok_or_else(|| missing("ise_key"))?,
        excluded_intf: vars
            .excluded_intf()
            .as_deref()
            .ok_or_else(|| missing("excluded_intf"))?,
        uplinks: vars.uplinks().as_deref().ok_or_else(|| missing("uplinks"))?,
    })
}

/// Pull software version, hardware model, and the interface table off the
/// device. The first task of the workflow; everything downstream reads the
/// returned context.
#[tracing::instrument(skip(session))]
pub async fn gather_facts(
    session: &mut (dyn ConsoleSession + Send),
) -> Result<HostContext, TaskError> {
    let output = session.send_command(SHOW_VERSION_CMD).await?;
    let version = parse::show_version(&output)?;
    let model = parse::model_family(&version.hardware)?.to_string();
    debug!("model {} running {}", model, version.version);

    let output = session.send_command(SHOW_SWITCHPORT_CMD).await?;
    let interfaces = parse::show_interface_switchport(&output)?;
    debug!("discovered {} interfaces", interfaces.len());

    let mut ctx = HostContext::default();
    ctx.record_facts(version.version, model, interfaces);
    Ok(ctx)
}

/// Partition discovered interfaces into uplink and access roles, in
/// discovery order. Uplink membership is checked first and wins, so an
/// interface in both lists is an uplink. Interfaces in neither list are
/// dropped from further processing.
pub fn classify_interfaces(
    interfaces: &[Interface],
    uplinks: &[String],
    excluded: &[String],
) -> (Vec<String>, Vec<AccessPort>) {
    let mut uplink_interfaces = vec![];
    let mut access_interfaces = vec![];
    for intf in interfaces {
        if uplinks.iter().any(|u| u == &intf.interface) {
            uplink_interfaces.push(intf.interface.clone());
        } else if excluded.iter().any(|e| e == &intf.interface) {
            access_interfaces.push(AccessPort {
                interface: intf.interface.clone(),
                // IOS reports VLAN 1 for ports never assigned one
                access_vlan: intf.access_vlan.unwrap_or(1),
            });
        }
    }
    (uplink_interfaces, access_interfaces)
}

/// Classify the host's interfaces and render the selected template family
/// against its full attribute set, storing the blobs back on the context.
#[tracing::instrument(skip(engine, vars, ctx))]
pub fn render_port_config(
    engine: &TemplateEngine,
    host: &str,
    vars: &HostVars,
    ctx: &mut HostContext,
) -> Result<TemplateFamily, TaskError> {
    let vars = require_vars(host, vars)?;
    let (uplink_interfaces, access_interfaces) =
        classify_interfaces(ctx.interfaces()?, vars.uplinks, vars.excluded_intf);
    ctx.record_classified(uplink_interfaces, access_interfaces);

    let family = TemplateFamily::for_model(ctx.sw_model()?);
    debug!("{}: selected {:?} for model {}", host, family, ctx.sw_model()?);

    let mut context = Context::new();
    context.insert("hostname", host);
    context.insert("sw_model", ctx.sw_model()?);
    context.insert("vlans", vars.vlans);
    context.insert("ise_pri", vars.ise_pri);
    context.insert("ise_sec", vars.ise_sec);
    context.insert("ise_key", vars.ise_key);
    context.insert("uplink_interfaces", ctx.uplink_interfaces()?);
    context.insert("access_interfaces", ctx.access_interfaces()?);

    let global = engine.render(family.global_template(), &context)?;
    let uplink = engine.render(family.uplink_template(), &context)?;
    let access = engine.render(family.access_template(), &context)?;
    ctx.record_rendered(global, uplink, access);

    Ok(family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ScriptedSession;

    fn interface(name: &str, vlan: u16) -> Interface {
        Interface {
            interface: name.to_string(),
            access_vlan: Some(vlan),
        }
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_family_selection_by_model() {
        assert_eq!(TemplateFamily::IbnsV1, TemplateFamily::for_model("C3750X"));
        assert_eq!(TemplateFamily::IbnsV1, TemplateFamily::for_model("C3750"));
        assert_eq!(TemplateFamily::IbnsV2, TemplateFamily::for_model("C3850"));
        assert_eq!(TemplateFamily::IbnsV2, TemplateFamily::for_model("C9300"));
    }

    #[test]
    fn test_classification_partitions_by_membership() {
        let interfaces = vec![
            interface("Gi1/0/1", 1),
            interface("Gi1/0/2", 10),
            interface("Gi1/0/3", 20),
        ];
        let (uplinks, access) = classify_interfaces(
            &interfaces,
            &strings(&["Gi1/0/1"]),
            &strings(&["Gi1/0/2"]),
        );
        assert_eq!(vec!["Gi1/0/1"], uplinks);
        assert_eq!(
            vec![AccessPort {
                interface: "Gi1/0/2".to_string(),
                access_vlan: 10,
            }],
            access
        );
        // Gi1/0/3 is in neither list and is dropped
    }

    #[test]
    fn test_classification_keeps_discovery_order() {
        let interfaces = vec![
            interface("Gi1/0/4", 40),
            interface("Gi1/0/2", 20),
            interface("Gi1/0/3", 30),
        ];
        let (_, access) = classify_interfaces(
            &interfaces,
            &[],
            &strings(&["Gi1/0/2", "Gi1/0/3", "Gi1/0/4"]),
        );
        let order: Vec<&str> = access.iter().map(|p| p.interface.as_str()).collect();
        assert_eq!(vec!["Gi1/0/4", "Gi1/0/2", "Gi1/0/3"], order);
    }

    #[test]
    fn test_uplink_membership_wins_over_exclusion() {
        let interfaces = vec![interface("Gi1/0/1", 1)];
        let both = strings(&["Gi1/0/1"]);
        let (uplinks, access) = classify_interfaces(&interfaces, &both, &both);
        assert_eq!(vec!["Gi1/0/1"], uplinks);
        assert!(access.is_empty());
    }

    #[tokio::test]
    async fn test_gather_facts() {
        let mut session = ScriptedSession::new(&[
            (
                "show version",
                "show version\n\
                 Cisco IOS Software, C3750E Software (C3750E-UNIVERSALK9-M), Version 15.2(4)E8, RELEASE SOFTWARE (fc3)\n\
                 cisco WS-C3750X-48PF-S (PowerPC405) processor (revision A0) with 262144K bytes of memory.\n\
                 Model number                       : WS-C3750X-48PF-S\n\
                 SW1#",
            ),
            (
                "show interface switchport",
                "show interface switchport\n\
                 Name: Gi1/0/1\n\
                 Administrative Mode: trunk\n\
                 Access Mode VLAN: 1 (default)\n\
                 \n\
                 Name: Gi1/0/2\n\
                 Administrative Mode: static access\n\
                 Access Mode VLAN: 10 (VLAN0010)\n\
                 SW1#",
            ),
        ]);

        let ctx = gather_facts(&mut session).await.unwrap();

        assert_eq!("15.2(4)E8", ctx.sw_version().unwrap());
        assert_eq!("C3750X", ctx.sw_model().unwrap());
        assert_eq!(2, ctx.interfaces().unwrap().len());
        assert!(session.drained());
    }

    fn test_engine() -> TemplateEngine {
        TemplateEngine::from_raw(&[
            (
                "ibnsv1_global.tera",
                "radius-server host {{ ise_pri }} key {{ ise_key }}",
            ),
            (
                "ibnsv2_global.tera",
                "radius server ISE\n address ipv4 {{ ise_pri }}",
            ),
            (
                "ibns_uplink_intf.tera",
                "{% for intf in uplink_interfaces %}interface {{ intf }}\n{% endfor %}",
            ),
            (
                "ibnsv1_access_intf.tera",
                "{% for port in access_interfaces %}interface {{ port.interface }} vlan {{ port.access_vlan }}\n{% endfor %}",
            ),
            (
                "ibnsv2_access_intf.tera",
                "{% for port in access_interfaces %}interface {{ port.interface }}\n{% endfor %}",
            ),
        ])
        .unwrap()
    }

    fn full_vars() -> HostVars {
        HostVars::new(
            vec![10, 20],
            "10.10.30.5",
            "10.10.30.6",
            "sekrit",
            vec!["Gi1/0/2".to_string()],
            vec!["Gi1/0/1".to_string()],
        )
    }

    #[test]
    fn test_render_stores_blobs_on_context() {
        let mut ctx = HostContext::default();
        ctx.record_facts(
            "15.2(4)E8".into(),
            "C3750X".into(),
            vec![
                interface("Gi1/0/1", 1),
                interface("Gi1/0/2", 10),
                interface("Gi1/0/3", 20),
            ],
        );

        let family =
            render_port_config(&test_engine(), "SW1", &full_vars(), &mut ctx).unwrap();

        assert_eq!(TemplateFamily::IbnsV1, family);
        assert_eq!(
            "radius-server host 10.10.30.5 key sekrit",
            ctx.global_cfg().unwrap()
        );
        assert_eq!("interface Gi1/0/1\n", ctx.uplink_intf_cfg().unwrap());
        assert_eq!(
            "interface Gi1/0/2 vlan 10\n",
            ctx.access_intf_cfg().unwrap()
        );
    }

    #[test]
    fn test_shipped_templates_render_for_both_families() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../templates");
        let engine = TemplateEngine::from_dir(&dir).unwrap();
        let interfaces = vec![
            interface("Gi1/0/1", 1),
            interface("Gi1/0/2", 10),
            interface("Gi1/0/3", 20),
        ];

        let mut ctx = HostContext::default();
        ctx.record_facts("15.2(4)E8".into(), "C3750X".into(), interfaces.clone());
        let family = render_port_config(&engine, "SW1", &full_vars(), &mut ctx).unwrap();
        assert_eq!(TemplateFamily::IbnsV1, family);
        assert!(ctx
            .global_cfg()
            .unwrap()
            .contains("radius-server host 10.10.30.5"));
        assert!(ctx.uplink_intf_cfg().unwrap().contains("interface Gi1/0/1"));
        let access = ctx.access_intf_cfg().unwrap();
        assert!(access.contains("interface Gi1/0/2"));
        assert!(access.contains("switchport access vlan 10"));
        assert!(access.contains("authentication port-control auto"));

        let mut ctx = HostContext::default();
        ctx.record_facts("16.12.4".into(), "C9300".into(), interfaces);
        let family = render_port_config(&engine, "SW2", &full_vars(), &mut ctx).unwrap();
        assert_eq!(TemplateFamily::IbnsV2, family);
        assert!(ctx.global_cfg().unwrap().contains("radius server ISE-PRIMARY"));
        assert!(ctx
            .access_intf_cfg()
            .unwrap()
            .contains("service-policy type control subscriber"));
    }

    #[test]
    fn test_render_fails_on_missing_attribute() {
        let mut ctx = HostContext::default();
        ctx.record_facts("15.2(4)E8".into(), "C3750X".into(), vec![]);

        let vars = HostVars::default();
        let err = render_port_config(&test_engine(), "SW1", &vars, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            TaskError::MissingAttribute {
                attribute: "vlans",
                ..
            }
        ));
    }

    #[test]
    fn test_render_before_facts_is_a_missing_fact() {
        let mut ctx = HostContext::default();
        let err =
            render_port_config(&test_engine(), "SW1", &full_vars(), &mut ctx).unwrap_err();
        assert!(matches!(err, TaskError::MissingFact("interfaces")));
    }
}
