//! Expect-style CLI sessions. A [`ConsoleSession`] sends one line at a time
//! and blocks until the device emits the expected prompt pattern; sending the
//! next line before the pattern appears would be interpreted by the device as
//! a different command, so every exchange names its pattern explicitly.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::log::*;

pub mod ssh;

pub use ssh::SshSession;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("ssh transport error: {0}")]
    Ssh(#[from] thrussh::Error),
    #[error("authentication failed for user `{0}`")]
    AuthenticationFailed(String),
    #[error("channel closed while waiting for `{0}`")]
    ChannelClosed(String),
    #[error("timed out after {timeout:?} waiting for `{pattern}`")]
    Timeout { pattern: String, timeout: Duration },
}

/// The pattern a device must emit before the next line may be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// A case-sensitive literal substring anywhere in the accumulated
    /// output. Used for mid-command interactive prompts, where the device
    /// is waiting for operator confirmation rather than showing a prompt.
    Literal(String),
    /// An exec prompt: the last output line ends with `#`. Matches both the
    /// privileged prompt (`SW1#`) and the configuration prompt.
    Prompt,
    /// The configuration-mode prompt, e.g. `SW1(config)#`.
    ConfigPrompt,
}

impl Expect {
    pub fn literal<S: Into<String>>(s: S) -> Self {
        Self::Literal(s.into())
    }

    pub fn matches(&self, output: &str) -> bool {
        let last_line = output.lines().rev().find(|line| !line.trim().is_empty());
        match self {
            Expect::Literal(s) => output.contains(s.as_str()),
            Expect::Prompt => last_line.map_or(false, |line| line.trim_end().ends_with('#')),
            Expect::ConfigPrompt => last_line.map_or(false, |line| {
                let line = line.trim_end();
                line.contains("(config") && line.ends_with('#')
            }),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Literal(s) => write!(f, "{s}"),
            Expect::Prompt => write!(f, "#"),
            Expect::ConfigPrompt => write!(f, "(config)#"),
        }
    }
}

/// A persistent CLI connection to one device.
///
/// [`ConsoleSession::send_expect`] is the raw primitive: the returned text is
/// the whole exchange, command echo and trailing prompt included, so callers
/// that need an audit transcript get it verbatim. The provided methods layer
/// the common cases on top.
#[async_trait]
pub trait ConsoleSession: Send {
    /// Send one line and block until `expect` matches the accumulated
    /// output. Returns the raw exchange.
    async fn send_expect(&mut self, line: &str, expect: &Expect) -> Result<String, SessionError>;

    /// Close the session. Best-effort; errors after this are ignored.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Run a non-interactive command and return its output with the command
    /// echo and trailing prompt stripped.
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        let raw = self.send_expect(command, &Expect::Prompt).await?;
        Ok(strip_exchange(command, &raw))
    }

    async fn enter_config_mode(&mut self) -> Result<String, SessionError> {
        self.send_expect("configure terminal", &Expect::ConfigPrompt)
            .await
    }

    async fn exit_config_mode(&mut self) -> Result<String, SessionError> {
        self.send_expect("end", &Expect::Prompt).await
    }
}

/// Drop the leading command echo and the trailing prompt line from a raw
/// exchange, leaving just the device's response.
pub fn strip_exchange(command: &str, raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();
    if lines
        .first()
        .map_or(false, |line| line.trim_end().ends_with(command))
    {
        lines.remove(0);
    }
    if lines
        .last()
        .map_or(false, |line| line.trim_end().ends_with('#'))
    {
        lines.pop();
    }
    lines.join("\n").trim_matches('\n').to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::*;

    /// A scripted stand-in for a real device: each entry is the line the
    /// device expects to receive next and the raw output it replies with.
    /// Panics (failing the test) on any out-of-order send, and checks that
    /// the scripted reply actually satisfies the caller's pattern the way a
    /// real device's output would.
    pub(crate) struct ScriptedSession {
        script: VecDeque<(String, String)>,
        pub sent: Vec<(String, Expect)>,
    }

    impl ScriptedSession {
        pub(crate) fn new(script: &[(&str, &str)]) -> Self {
            Self {
                script: script
                    .iter()
                    .map(|(line, reply)| (line.to_string(), reply.to_string()))
                    .collect(),
                sent: vec![],
            }
        }

        pub(crate) fn drained(&self) -> bool {
            self.script.is_empty()
        }
    }

    #[async_trait]
    impl ConsoleSession for ScriptedSession {
        async fn send_expect(
            &mut self,
            line: &str,
            expect: &Expect,
        ) -> Result<String, SessionError> {
            self.sent.push((line.to_string(), expect.clone()));
            let (want, reply) = self
                .script
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted send: {line}"));
            assert_eq!(want, line, "device received an out-of-order line");
            assert!(
                expect.matches(&reply),
                "scripted reply does not satisfy expected pattern `{expect}`: {reply}"
            );
            Ok(reply)
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_matches_last_line_only() {
        assert!(Expect::Prompt.matches("show clock\n12:00:00 UTC\nSW1#"));
        assert!(Expect::Prompt.matches("end\nSW1(config)#"));
        assert!(!Expect::Prompt.matches("Do you wish to continue? [yes]: "));
        assert!(!Expect::Prompt.matches("SW1# show clock\npartial output"));
    }

    #[test]
    fn test_config_prompt_requires_config_marker() {
        assert!(Expect::ConfigPrompt.matches("configure terminal\nSW1(config)#"));
        assert!(Expect::ConfigPrompt.matches("interface Gi1/0/1\nSW1(config-if)#"));
        assert!(!Expect::ConfigPrompt.matches("configure terminal\nSW1#"));
    }

    #[test]
    fn test_literal_is_case_sensitive() {
        assert!(Expect::literal("yes").matches("Do you wish to continue? [yes]: "));
        assert!(!Expect::literal("yes").matches("Do you wish to continue? [YES]: "));
    }

    #[test]
    fn test_strip_exchange() {
        let raw = "show ip interface brief\nVlan1   10.0.0.1   up   up\nSW1#";
        assert_eq!(
            "Vlan1   10.0.0.1   up   up",
            strip_exchange("show ip interface brief", raw)
        );
        // a response with no echo or prompt passes through untouched
        assert_eq!("just output", strip_exchange("show clock", "just output"));
    }
}
