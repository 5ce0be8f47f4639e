//! Forcing legacy AAA authentication display into new-style mode on 3750X
//! stacks. Detection is a read-only `show`-style command; the conversion is
//! an interactive dance where the device stops mid-command and waits for the
//! operator to type `yes`, so every exchange names the prompt pattern it
//! blocks on.

use crate::log::*;
use crate::session::{ConsoleSession, Expect};

use super::TaskError;

pub const DISPLAY_MODE_CMD: &str = "authentication display config-mode";
pub const NEW_STYLE_CMD: &str = "authentication display new-style";
/// The accounting-identity command that triggers the device-side
/// confirmation prompt when the display mode is still legacy.
pub const CONVERT_CMD: &str = "aaa accounting identity default start-stop group ISE";
/// Both the substring the device's confirmation prompt contains and the
/// literal token sent back to confirm. Case-sensitive.
pub const CONFIRM_TOKEN: &str = "yes";
/// Status line reported for a host once the conversion lands.
pub const CONVERTED_STATUS: &str = "authentication display new-style enabled";

/// How a device currently renders its AAA configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AaaDisplayMode {
    Legacy,
    NewStyle,
    Unknown,
}

impl AaaDisplayMode {
    /// Classify the one-line response to [`DISPLAY_MODE_CMD`].
    pub fn classify(response: &str) -> Self {
        let response = response.trim();
        if response.is_empty() {
            AaaDisplayMode::Unknown
        } else if response.contains("legacy") {
            AaaDisplayMode::Legacy
        } else {
            AaaDisplayMode::NewStyle
        }
    }
}

/// Ask the device which display mode it is in. Read-only; safe to run on
/// every host every run.
pub async fn detect_display_mode(
    session: &mut (dyn ConsoleSession + Send),
) -> Result<(AaaDisplayMode, String), TaskError> {
    let response = session.send_command(DISPLAY_MODE_CMD).await?;
    let response = response.trim().to_string();
    if response.lines().count() > 1 || response.starts_with('%') {
        return Err(TaskError::UnexpectedResponse {
            command: DISPLAY_MODE_CMD.into(),
            detail: response,
        });
    }
    match AaaDisplayMode::classify(&response) {
        AaaDisplayMode::Unknown => Err(TaskError::UnexpectedResponse {
            command: DISPLAY_MODE_CMD.into(),
            detail: response,
        }),
        mode => Ok((mode, response)),
    }
}

/// States of the conversion, in the order a healthy run passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    DetectedLegacy,
    DisplaySwitched,
    ConversionArmed,
    ConfirmationSent,
    Converted,
}

/// Drives a device already detected as legacy through the new-style
/// conversion. The interactive exchanges are kept verbatim (command echo and
/// prompt included) in a transcript for audit logging. There is no rollback:
/// a failure leaves the device where it stopped, and the recovery path is to
/// re-run the workflow, which no-ops once the device reports new-style.
#[derive(Debug)]
pub struct ConversionDriver {
    state: ConversionState,
    transcript: String,
}

impl ConversionDriver {
    pub fn new() -> Self {
        Self {
            state: ConversionState::DetectedLegacy,
            transcript: String::new(),
        }
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    /// Raw text of every interactive exchange driven so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    fn advance(&mut self, to: ConversionState) {
        debug!("aaa conversion: {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    /// Run the conversion to completion.
    #[tracing::instrument(skip(self, session))]
    pub async fn run(
        &mut self,
        session: &mut (dyn ConsoleSession + Send),
    ) -> Result<(), TaskError> {
        // switch the display to new-style; non-interactive
        session.send_command(NEW_STYLE_CMD).await?;
        self.advance(ConversionState::DisplaySwitched);

        let raw = session.enter_config_mode().await?;
        self.transcript.push_str(&raw);
        self.advance(ConversionState::ConversionArmed);

        // the device stops mid-command here and waits for confirmation, so
        // block on the literal prompt text rather than an exec prompt
        let raw = session
            .send_expect(CONVERT_CMD, &Expect::literal(CONFIRM_TOKEN))
            .await?;
        self.transcript.push_str(&raw);
        self.advance(ConversionState::ConfirmationSent);

        let raw = session
            .send_expect(CONFIRM_TOKEN, &Expect::Prompt)
            .await?;
        self.transcript.push_str(&raw);
        let raw = session.exit_config_mode().await?;
        self.transcript.push_str(&raw);
        self.advance(ConversionState::Converted);

        Ok(())
    }
}

impl Default for ConversionDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-host task: detect the display mode and convert when it is legacy,
/// no-op otherwise. Returns the status line to report for the host.
#[tracing::instrument(skip(session))]
pub async fn force_new_style(
    host: &str,
    session: &mut (dyn ConsoleSession + Send),
) -> Result<String, TaskError> {
    let (mode, response) = detect_display_mode(session).await?;
    info!("{}: {}", host, response);
    match mode {
        AaaDisplayMode::Legacy => {
            let mut driver = ConversionDriver::new();
            driver.run(session).await?;
            debug!("{}: conversion transcript:\n{}", host, driver.transcript());
            Ok(CONVERTED_STATUS.to_string())
        }
        _ => Ok(response),
    }
}
