use std::path::PathBuf;

use async_trait::async_trait;
use color_eyre::eyre::{Result, WrapErr};

use catwalk::log::*;
use catwalk::runner::{run_on_hosts, RunReport};
use catwalk::session::{ConsoleSession, SshSession};
use catwalk::tasks::dot1x::{self, TemplateFamily};
use catwalk::template::TemplateEngine;

use super::{kickoff, print_run_summary, RunSetup};

/// The dot1x workflow, two passes over the inventory: gather facts from each
/// device, then classify its ports and render the IBNS template family its
/// hardware model calls for. Rendered configuration stays on the host
/// context for audit; nothing is pushed.
pub struct Dot1xCommand;

impl Dot1xCommand {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<'a> super::Command<'a> for Dot1xCommand {
    fn new() -> Self
    where
        Self: Sized,
    {
        Self {}
    }

    async fn run(&self, context: &'a super::CliContext) -> Result<()> {
        let matches = context.matches;
        let RunSetup {
            targets,
            username,
            password,
            concurrency,
            timeout,
            ..
        } = kickoff(
            self,
            matches,
            "This run will render IBNS dot1x configurations for Catalyst switches.",
        )
        .await?;

        let templates_dir = PathBuf::from(
            matches
                .get_one::<String>("templates")
                .map(String::as_str)
                .unwrap_or("templates"),
        );
        let engine = TemplateEngine::from_dir(&templates_dir)
            .wrap_err("Failed loading configuration templates")?;

        // first pass: facts
        info!("gathering facts across {} hosts", targets.len());
        let mut facts = run_on_hosts(targets, concurrency, |name, host| {
            let username = username.clone();
            let password = password.clone();
            async move {
                let mut session = SshSession::connect(
                    host.host(),
                    *host.port(),
                    &username,
                    &password,
                    timeout,
                )
                .await?;
                let gathered = dot1x::gather_facts(&mut session).await;
                session.close().await?;
                let ctx = gathered?;
                println!(
                    "*** {}: {} running {} ({} interfaces) ***",
                    name,
                    ctx.sw_model()?,
                    ctx.sw_version()?,
                    ctx.interfaces()?.len()
                );
                Ok((host, ctx))
            }
        })
        .await;

        let mut summary: RunReport<TemplateFamily> = RunReport::default();
        summary.absorb_failures(&mut facts);

        // second pass: classify and render; hosts that failed fact
        // gathering are excluded
        let survivors = facts.into_completed();
        info!("rendering dot1x configuration for {} hosts", survivors.len());
        let engine = &engine;
        let mut rendered = run_on_hosts(survivors, concurrency, |name, payload| async move {
            let (host, mut ctx) = payload;
            let family = dot1x::render_port_config(engine, &name, host.vars(), &mut ctx)?;
            println!(
                "*** {}: rendered {} config: {} uplinks, {} access ports ***",
                name,
                family,
                ctx.uplink_interfaces()?.len(),
                ctx.access_interfaces()?.len()
            );
            debug!("{}: global config:\n{}", name, ctx.global_cfg()?);
            debug!("{}: uplink config:\n{}", name, ctx.uplink_intf_cfg()?);
            debug!("{}: access config:\n{}", name, ctx.access_intf_cfg()?);
            Ok(family)
        })
        .await;

        summary.absorb_failures(&mut rendered);
        print_run_summary(&summary);
        Ok(())
    }
}

impl super::Interactive for Dot1xCommand {}
