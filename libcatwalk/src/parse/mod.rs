//! Regex extraction over Catalyst `show` output. IOS output is meant for
//! operators, not machines, so these parsers anchor on the handful of lines
//! whose shape has been stable across train releases.

use regex::Regex;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("could not find `{0}` in command output")]
    Missing(&'static str),
}

/// The fields pulled out of `show version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowVersion {
    pub version: String,
    pub hardware: String,
}

/// One interface block from `show interface switchport`, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub interface: String,
    pub access_vlan: Option<u16>,
}

/// Parse `show version`: the IOS version from the banner line and the
/// hardware model from the `Model number` field, falling back to the
/// `cisco <model> (...) processor` line on stacks that omit it.
pub fn show_version(output: &str) -> Result<ShowVersion, ParseError> {
    let version_re = Regex::new(r"Version ([^,\s]+)").expect("hardcoded pattern");
    let model_re = Regex::new(r"(?m)^Model [Nn]umber\s*:\s*(\S+)").expect("hardcoded pattern");
    let processor_re = Regex::new(r"(?m)^cisco (\S+) \(").expect("hardcoded pattern");

    let version = version_re
        .captures(output)
        .map(|caps| caps[1].to_string())
        .ok_or(ParseError::Missing("Version"))?;
    let hardware = model_re
        .captures(output)
        .or_else(|| processor_re.captures(output))
        .map(|caps| caps[1].to_string())
        .ok_or(ParseError::Missing("Model number"))?;

    Ok(ShowVersion { version, hardware })
}

/// The model family token of a hardware string: the second dash-separated
/// field, e.g. `WS-C3750X-48PF-S` -> `C3750X`.
pub fn model_family(hardware: &str) -> Result<&str, ParseError> {
    hardware
        .split('-')
        .nth(1)
        .ok_or(ParseError::Missing("model family"))
}

/// Parse `show interface switchport` into one record per `Name:` block,
/// keeping discovery order.
pub fn show_interface_switchport(output: &str) -> Result<Vec<Interface>, ParseError> {
    let name_re = Regex::new(r"(?m)^Name:\s+(\S+)").expect("hardcoded pattern");
    let vlan_re = Regex::new(r"(?m)^Access Mode VLAN:\s+(\d+)").expect("hardcoded pattern");

    let starts: Vec<(usize, String)> = name_re
        .captures_iter(output)
        .filter_map(|caps| {
            caps.get(0)
                .map(|whole| (whole.start(), caps[1].to_string()))
        })
        .collect();

    if starts.is_empty() {
        return Err(ParseError::Missing("Name"));
    }

    let mut interfaces = Vec::with_capacity(starts.len());
    for (i, (start, interface)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(output.len());
        let block = &output[*start..end];
        let access_vlan = vlan_re
            .captures(block)
            .and_then(|caps| caps[1].parse().ok());
        interfaces.push(Interface {
            interface: interface.clone(),
            access_vlan,
        });
    }
    Ok(interfaces)
}
