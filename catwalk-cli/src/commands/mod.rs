use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use clap::ArgMatches;
use color_eyre::eyre::{Result, WrapErr};
use dialoguer::{Confirm, Input, Password};
use regex::Regex;
use thiserror::Error;

use catwalk::inventory::{Host, Inventory};
use catwalk::log::*;
use catwalk::runner::RunReport;

pub mod aaa;
pub mod dot1x;

/// Platform tag a host must carry in the inventory to be picked up by these
/// workflows.
pub const PLATFORM: &str = "ios";

#[derive(Error, Debug)]
pub enum CommandErrors {
    #[error("Prompt interaction failed.")]
    PromptInteractionFailed(
        #[from]
        #[source]
        dialoguer::Error,
    ),
    #[error("Required user input `{0}` is missing.")]
    RequiredUserInputMissing(String),
    #[error("Argument `{0}` failed validation `{1}`")]
    InputValidationFailure(String, String),
    #[error("No hosts in the inventory match platform `{0}`.")]
    NoMatchingHosts(String),
    #[error("Run declined at the proceed prompt.")]
    DeclinedToProceed,
    #[error("Invalid subcommand `{0}`.")]
    InvalidSubcommand(String),
    #[error("No subcommand provided.")]
    NoSubcommandProvided,
}

pub struct CliContext<'a> {
    pub matches: &'a ArgMatches,
}

impl<'a> CliContext<'a> {
    pub fn new(matches: &'a ArgMatches) -> Self {
        Self { matches }
    }
}

#[async_trait]
pub trait Command<'a> {
    fn new() -> Self
    where
        Self: Sized;

    async fn run(&self, context: &'a CliContext) -> Result<()>;
}

pub trait Interactive {
    fn prompt_for_input(&self, message: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(message)
            .interact()
            .map_err(CommandErrors::PromptInteractionFailed)
            .context("Prompting user input failed.")
    }

    fn prompt_for_password(&self, message: &str) -> Result<String> {
        Password::new()
            .with_prompt(message)
            .interact()
            .map_err(CommandErrors::PromptInteractionFailed)
            .context("Prompting for a password failed.")
    }

    fn confirm_proceed(&self, message: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(CommandErrors::PromptInteractionFailed)
            .context("Prompting for confirmation failed.")
    }

    /// Read argument from the CLI args with a validation function.
    fn read_argument_with_validator<V>(
        &self,
        arg_matches: &ArgMatches,
        id: &str,
        validator: &mut V,
    ) -> Result<String>
    where
        V: FnMut(&String) -> Result<(), CommandErrors>,
    {
        if let Some(arg) = arg_matches.get_one::<String>(id) {
            validator(arg)?;
            Ok(arg.clone())
        } else {
            Err(CommandErrors::RequiredUserInputMissing(id.into()))?
        }
    }

    /// Read argument from the CLI args with regex validation.
    fn read_argument_with_regex_validation(
        &self,
        arg_matches: &ArgMatches,
        id: &str,
        regex: &Regex,
    ) -> Result<String> {
        self.read_argument_with_validator(arg_matches, id, &mut |input| {
            if regex.is_match(input) {
                Ok(())
            } else {
                Err(CommandErrors::InputValidationFailure(
                    id.into(),
                    regex.as_str().into(),
                ))
            }
        })
    }
}

/// Everything a workflow needs after kickoff: the matched targets, resolved
/// credentials, and the run knobs.
pub struct RunSetup {
    pub inventory: Inventory,
    pub targets: Vec<(String, Host)>,
    pub username: String,
    pub password: String,
    pub concurrency: usize,
    pub timeout: Duration,
}

/// Shared kickoff sequence: load the inventory for the optional site code,
/// filter to the Catalyst platform, bail when nothing matches, list the
/// devices this run will touch, resolve credentials (prompting for whatever
/// the defaults file leaves unset), and gate on the proceed confirmation.
pub(crate) async fn kickoff(
    cmd: &impl Interactive,
    matches: &ArgMatches,
    banner: &str,
) -> Result<RunSetup> {
    let site_format = Regex::new(r"^[a-z0-9]{2,8}$").expect("hardcoded pattern");
    let site = match matches.get_one::<String>("site") {
        Some(_) => Some(cmd.read_argument_with_regex_validation(matches, "site", &site_format)?),
        None => None,
    };
    let inventory_dir = PathBuf::from(
        matches
            .get_one::<String>("inventory")
            .map(String::as_str)
            .unwrap_or("inventory"),
    );
    let concurrency: usize = matches
        .get_one::<String>("concurrency")
        .map(String::as_str)
        .unwrap_or("8")
        .parse()
        .context("--concurrency must be a number")?;
    let timeout = Duration::from_secs(
        matches
            .get_one::<String>("timeout")
            .map(String::as_str)
            .unwrap_or("20")
            .parse()
            .context("--timeout must be a number of seconds")?,
    );

    let mut inventory = Inventory::load(&inventory_dir, site.as_deref())
        .await
        .context("Failed loading inventory")?;
    let targets = inventory.filter_platform(PLATFORM);
    if targets.is_empty() {
        error!("no matching hosts in inventory");
        return Err(CommandErrors::NoMatchingHosts(PLATFORM.into()).into());
    }

    println!("* {banner}");
    println!("* this run will touch the following devices:");
    for (name, host) in &targets {
        let groups = inventory.groups_for_host(name);
        if groups.is_empty() {
            println!("** {}: {}:{}", name, host.host(), host.port());
        } else {
            println!(
                "** {}: {}:{} ({})",
                name,
                host.host(),
                host.port(),
                groups.join(", ")
            );
        }
    }

    info!("checking inventory for credentials");
    let username = match inventory.defaults().username() {
        Some(username) => username.clone(),
        None => {
            let username = cmd.prompt_for_input("Username")?;
            inventory.defaults_mut().set_username(username.clone());
            username
        }
    };
    let password = match inventory.defaults().password() {
        Some(password) => password.clone(),
        None => {
            let password = cmd.prompt_for_password("Password")?;
            inventory.defaults_mut().set_password(password.clone());
            password
        }
    };

    if !matches.get_flag("yes") && !cmd.confirm_proceed("Proceed with this run?")? {
        println!("* exiting without touching any device");
        return Err(CommandErrors::DeclinedToProceed.into());
    }

    Ok(RunSetup {
        inventory,
        targets,
        username,
        password,
        concurrency,
        timeout,
    })
}

/// End-of-run report: every failed host with its error, or a clean bill.
pub(crate) fn print_run_summary<T>(report: &RunReport<T>) {
    if report.is_clean() {
        println!("* failed hosts: none");
    } else {
        println!("* failed hosts:");
        for failure in report.failed() {
            println!("** {}: {}", failure.host, failure.error);
        }
    }
}
