//! Transport seam between the session pool and the wire.
//!
//! [`Connector`] opens one authenticated connection per device;
//! [`Transport`] runs single commands over it. The SSH implementation keeps
//! one `async-ssh2-tokio` client per device and opens a fresh exec channel
//! with a PTY request for every command, which is how interactive network
//! CLIs expect to be driven. Tests substitute a scripted connector.

use async_trait::async_trait;
use log::debug;
use russh::ChannelMsg;
use std::time::Duration;

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::{Config, ServerCheckMethod};

use crate::config::SecurityProfile;
use crate::error::{OrchestratorError, Result};
use crate::model::{Credentials, Device};

/// Raw outcome of one command execution on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: u32,
}

/// One live authenticated connection to a device.
#[async_trait]
pub trait Transport: Send {
    /// Runs a single command and collects its output. Transport loss raises;
    /// a non-zero exit status is reported in the output, not as an error.
    async fn exec(&mut self, command: &str) -> Result<ExecOutput>;

    /// Whether the underlying connection still reports itself usable.
    fn is_open(&self) -> bool;

    /// Closes the connection. Must not fail; close errors are swallowed.
    async fn close(&mut self);
}

/// Opens authenticated transports. The pool owns exactly one connector.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        device: &Device,
        credentials: &Credentials,
    ) -> Result<Box<dyn Transport>>;
}

/// SSH connector using password authentication.
pub struct SshConnector {
    profile: SecurityProfile,
    server_check: ServerCheckMethod,
    /// Server-side inactivity keepalive window; independent of the pool's
    /// idle sweep.
    inactivity_timeout: Duration,
}

impl SshConnector {
    pub fn new(profile: SecurityProfile) -> Self {
        Self {
            profile,
            // Managed devices rotate host keys on reimage; pinning is left
            // to deployments that maintain a known-hosts file.
            server_check: ServerCheckMethod::NoCheck,
            inactivity_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_server_check(mut self, server_check: ServerCheckMethod) -> Self {
        self.server_check = server_check;
        self
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(SecurityProfile::default())
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(
        &self,
        device: &Device,
        credentials: &Credentials,
    ) -> Result<Box<dyn Transport>> {
        let config = Config {
            preferred: self.profile.preferred(),
            inactivity_timeout: Some(self.inactivity_timeout),
            ..Default::default()
        };

        let client = Client::connect_with_config(
            (device.ip.clone(), device.ssh_port),
            &credentials.username,
            AuthMethod::with_password(&credentials.password),
            self.server_check.clone(),
            config,
        )
        .await
        .map_err(|err| {
            OrchestratorError::Connection(format!("{}: {err}", device.addr_label()))
        })?;
        debug!("{} SSH connection established", device.addr_label());

        Ok(Box::new(SshTransport {
            client,
            addr: device.addr_label(),
        }))
    }
}

/// One authenticated SSH client; each `exec` opens its own channel.
pub struct SshTransport {
    client: Client,
    addr: String,
}

#[async_trait]
impl Transport for SshTransport {
    async fn exec(&mut self, command: &str) -> Result<ExecOutput> {
        let mut channel = self
            .client
            .get_channel()
            .await
            .map_err(|err| OrchestratorError::Execution(format!("{}: {err}", self.addr)))?;

        // Network CLIs gate paging and some config commands behind a TTY.
        channel
            .request_pty(false, "xterm", 80, 24, 0, 0, &[])
            .await
            .map_err(|err| OrchestratorError::Execution(format!("{}: {err}", self.addr)))?;
        channel
            .exec(true, command)
            .await
            .map_err(|err| OrchestratorError::Execution(format!("{}: {err}", self.addr)))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_status = None;

        // Drain until the channel closes; the exit status may arrive after EOF.
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    if let Ok(text) = std::str::from_utf8(data) {
                        stdout.push_str(text);
                    }
                }
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    if let Ok(text) = std::str::from_utf8(data) {
                        stderr.push_str(text);
                    }
                }
                ChannelMsg::ExitStatus { exit_status: code } => {
                    exit_status = Some(code);
                }
                _ => {}
            }
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            // Devices that never report a status are treated as clean exits;
            // their CLI errors surface in the output text instead.
            exit_status: exit_status.unwrap_or(0),
        })
    }

    fn is_open(&self) -> bool {
        !self.client.is_closed()
    }

    async fn close(&mut self) {
        if let Err(err) = self.client.disconnect().await {
            debug!("{} disconnect error ignored: {err}", self.addr);
        }
    }
}
