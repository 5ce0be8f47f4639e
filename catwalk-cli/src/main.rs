#![forbid(unsafe_code)]

use clap::{command, Arg, ArgAction};
use color_eyre::eyre::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::Command;

mod commands;

use catwalk::log::*;

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre()?;

    // Command configuration
    let matches = command!()
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Turn debugging information on. Overrides -q. Can specify up to -vv.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Silence all output. Overridden by -v.")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            command!("aaa")
                .about("Force new-style AAA authentication display on 3750X stacks.")
                .arg(
                    Arg::new("site")
                        .help("Site code selecting which inventory files to load. No prefix by default."),
                )
                .arg(
                    Arg::new("inventory")
                        .help("Path to the inventory directory.")
                        .short('i')
                        .long("inventory")
                        .default_value("inventory"),
                )
                .arg(
                    Arg::new("concurrency")
                        .help("How many devices to work on at once.")
                        .short('c')
                        .long("concurrency")
                        .default_value("8"),
                )
                .arg(
                    Arg::new("timeout")
                        .help("Seconds to wait for each expected prompt.")
                        .long("timeout")
                        .default_value("20"),
                )
                .arg(
                    Arg::new("yes")
                        .help("Skip the proceed confirmation.")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("dot1x")
                .about("Render IBNS dot1x interface configuration for Catalyst switches.")
                .arg(
                    Arg::new("site")
                        .help("Site code selecting which inventory files to load. No prefix by default."),
                )
                .arg(
                    Arg::new("inventory")
                        .help("Path to the inventory directory.")
                        .short('i')
                        .long("inventory")
                        .default_value("inventory"),
                )
                .arg(
                    Arg::new("templates")
                        .help("Path to the template directory.")
                        .short('t')
                        .long("templates")
                        .default_value("templates"),
                )
                .arg(
                    Arg::new("concurrency")
                        .help("How many devices to work on at once.")
                        .short('c')
                        .long("concurrency")
                        .default_value("8"),
                )
                .arg(
                    Arg::new("timeout")
                        .help("Seconds to wait for each expected prompt.")
                        .long("timeout")
                        .default_value("20"),
                )
                .arg(
                    Arg::new("yes")
                        .help("Skip the proceed confirmation.")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand_required(true)
        .get_matches();

    // Set up logging
    let logging_config = tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::new(
            time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        ))
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
        .compact();

    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_count("verbose") as usize;
    let logging_config = if quiet && verbose == 0 {
        logging_config.with_max_level(LevelFilter::ERROR)
    } else if verbose > 0 {
        let level = match verbose {
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        logging_config.with_max_level(level)
    } else {
        logging_config.with_max_level(LevelFilter::ERROR)
    };

    let subscriber = logging_config.finish();
    subscriber.init();

    // Run the commands
    if let Some((subcommand, matches)) = matches.subcommand() {
        let ctx = commands::CliContext::new(matches);
        debug!(
            "matched subcommand {} with matches: {:?}",
            &subcommand,
            &matches.ids().map(|id| id.as_str()).collect::<Vec<_>>()
        );
        match subcommand {
            "aaa" => commands::aaa::AaaCommand::new().run(&ctx).await?,
            "dot1x" => commands::dot1x::Dot1xCommand::new().run(&ctx).await?,
            name => {
                return Err(commands::CommandErrors::InvalidSubcommand(name.to_string()).into())
            }
        }
        Ok(())
    } else {
        Err(commands::CommandErrors::NoSubcommandProvided.into())
    }
}
