use async_trait::async_trait;
use color_eyre::eyre::Result;

use catwalk::log::*;
use catwalk::runner::run_on_hosts;
use catwalk::session::{ConsoleSession, SshSession};
use catwalk::tasks::aaa;

use super::{kickoff, print_run_summary, RunSetup};

/// The 3750X AAA workflow: detect each stack's authentication display mode
/// and drive the interactive new-style conversion on the ones still in
/// legacy mode.
pub struct AaaCommand;

impl AaaCommand {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<'a> super::Command<'a> for AaaCommand {
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
            "This run will force new-style AAA authentication display on Catalyst stacks.",
        )
        .await?;

        info!("applying AAA display conversion across {} hosts", targets.len());
        let report = run_on_hosts(targets, concurrency, |name, host| {
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
                let status = aaa::force_new_style(&name, &mut session).await;
                session.close().await?;
                let status = status?;
                println!("*** {}: {} ***", name, status);
                Ok(status)
            }
        })
        .await;

        print_run_summary(&report);
        Ok(())
    }
}

impl super::Interactive for AaaCommand {}
