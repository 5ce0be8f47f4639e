//! [`ConsoleSession`] over SSH, password-authenticated, with a PTY + shell
//! channel per device. Catalyst gear answers on an interactive shell rather
//! than per-command exec channels, so every exchange is a write followed by
//! an accumulate-until-pattern read.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thrussh::client;
use thrussh::ChannelMsg;

use super::{ConsoleSession, Expect, SessionError};
use crate::log::*;

pub struct SshSession {
    session: client::Handle<CatalystClient>,
    channel: client::Channel,
    timeout: Duration,
}

impl SshSession {
    /// Connect, authenticate, open a shell, and settle the session: drain
    /// the login banner up to the first prompt, then disable paging so
    /// `show` output arrives in one piece.
    #[tracing::instrument(skip(password))]
    pub async fn connect(
        addr: &str,
        port: u16,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let config = Arc::new(client::Config::default());
        debug!("connecting to {}:{}", addr, port);
        let mut session = client::connect(config, (addr, port), CatalystClient).await?;
        if !session.authenticate_password(username, password).await? {
            return Err(SessionError::AuthenticationFailed(username.to_string()));
        }
        debug!("authenticated, opening shell channel");
        let mut channel = session.channel_open_session().await?;
        channel.request_pty(true, "vt100", 120, 40, 0, 0, &[]).await?;
        channel.request_shell(true).await?;

        let mut this = Self {
            session,
            channel,
            timeout,
        };
        this.read_until(&Expect::Prompt).await?;
        this.send_expect("terminal length 0", &Expect::Prompt)
            .await?;
        Ok(this)
    }

    /// Accumulate channel output until `expect` matches, bounded by the
    /// session timeout.
    async fn read_until(&mut self, expect: &Expect) -> Result<String, SessionError> {
        let limit = self.timeout;
        let channel = &mut self.channel;
        let read = tokio::time::timeout(limit, async {
            let mut buffer = String::new();
            loop {
                if expect.matches(&buffer) {
                    return Ok(buffer);
                }
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => {
                        buffer.push_str(&String::from_utf8_lossy(&data));
                    }
                    Some(ChannelMsg::ExtendedData { data, ext: _ }) => {
                        buffer.push_str(&String::from_utf8_lossy(&data));
                    }
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                        return Err(SessionError::ChannelClosed(expect.to_string()));
                    }
                    Some(_) => {}
                }
            }
        })
        .await;

        match read {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout {
                pattern: expect.to_string(),
                timeout: limit,
            }),
        }
    }
}

#[async_trait]
impl ConsoleSession for SshSession {
    #[tracing::instrument(skip(self))]
    async fn send_expect(&mut self, line: &str, expect: &Expect) -> Result<String, SessionError> {
        let payload = format!("{line}\n");
        self.channel.data(payload.as_bytes()).await?;
        let raw = self.read_until(expect).await?;
        trace!("exchange complete: {} bytes", raw.len());
        Ok(raw)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        // log out cleanly; the device closes the channel on exit
        let _ = self.channel.data(&b"exit\n"[..]).await;
        Ok(())
    }
}

struct CatalystClient;

impl client::Handler for CatalystClient {
    type Error = SessionError;
    type FutureUnit = futures::future::Ready<Result<(Self, client::Session), Self::Error>>;
    type FutureBool = futures::future::Ready<Result<(Self, bool), Self::Error>>;

    fn finished_bool(self, b: bool) -> Self::FutureBool {
        futures::future::ready(Ok((self, b)))
    }

    fn finished(self, session: client::Session) -> Self::FutureUnit {
        futures::future::ready(Ok((self, session)))
    }

    // Switch host keys are rarely in anyone's known_hosts; accept them the
    // way interactive operators do.
    fn check_server_key(
        self,
        _server_public_key: &thrussh_keys::key::PublicKey,
    ) -> Self::FutureBool {
        self.finished_bool(true)
    }
}
