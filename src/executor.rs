//! Command execution against pooled device sessions.
//!
//! Two failure planes are kept strictly apart: transport/resource failures
//! (cannot connect, session lost mid-command) raise
//! [`crate::error::OrchestratorError`], while command-level failures (the
//! device rejected the command, non-zero exit) are ordinary data on
//! [`CommandResult`]. A diagnostic command that one dialect does not
//! support is an expected outcome callers branch on, not a fault.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{OrchestratorError, Result};
use crate::intent::dialect;
use crate::parse::{self, DeviceInfo};
use crate::pool::{SessionLease, SessionPool};
use crate::store::{ActivityLevel, AuditSink};

/// Options for single and batched command execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecOptions {
    /// Halt a batch at the first failed command.
    pub stop_on_error: bool,
    /// Per-command deadline in seconds; `None` uses the configured default.
    pub timeout_secs: Option<u64>,
}

/// Immutable outcome of one command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    pub output: String,
    pub error: String,
    /// Exit indicator as reported by the transport; `None` when the result
    /// was synthesized from a raised error.
    pub exit_code: Option<u32>,
    pub command: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

impl CommandResult {
    /// Failed result synthesized from a raised error, used where a batch is
    /// in progress and the error must join the result stream instead of
    /// aborting it.
    pub fn from_error(device_id: &str, command: &str, err: &OrchestratorError) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: err.to_string(),
            exit_code: None,
            command: command.to_string(),
            device_id: device_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a connectivity probe. Never raises; unreachable devices are
/// reported through `connected: false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    pub connected: bool,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs commands on devices through the session pool.
#[derive(Clone)]
pub struct CommandExecutor {
    pool: Arc<SessionPool>,
    audit: Arc<dyn AuditSink>,
}

impl CommandExecutor {
    pub fn new(pool: Arc<SessionPool>, audit: Arc<dyn AuditSink>) -> Self {
        Self { pool, audit }
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    fn timeout_for(&self, options: &ExecOptions) -> Duration {
        options
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.pool.config().command_timeout())
    }

    /// Executes one command, acquiring (or reusing) the device session.
    ///
    /// Raises only for transport/resource failures; a rejected command comes
    /// back as `success: false`.
    pub async fn run(
        &self,
        device_id: &str,
        command: &str,
        options: &ExecOptions,
    ) -> Result<CommandResult> {
        let mut lease = self.pool.acquire(device_id).await?;
        self.run_on_lease(&mut lease, command, options).await
    }

    /// Executes one command on an already-acquired lease.
    pub async fn run_on_lease(
        &self,
        lease: &mut SessionLease,
        command: &str,
        options: &ExecOptions,
    ) -> Result<CommandResult> {
        let device = lease.device().clone();
        self.audit
            .log_activity(
                ActivityLevel::Info,
                &format!("Executing command on {}", device.name),
                json!({ "command": command }),
            )
            .await;

        let output = lease.exec(command, self.timeout_for(options)).await?;
        let result = CommandResult {
            success: output.exit_status == 0,
            output: output.stdout,
            error: output.stderr,
            exit_code: Some(output.exit_status),
            command: command.to_string(),
            device_id: device.id.clone(),
            timestamp: Utc::now(),
        };

        self.audit
            .log_activity(
                ActivityLevel::Info,
                &format!("Command executed on {}", device.name),
                json!({
                    "command": command,
                    "exitCode": result.exit_code,
                    "outputLength": result.output.len(),
                }),
            )
            .await;
        Ok(result)
    }

    /// Executes `commands` strictly in order against the same pooled session.
    ///
    /// Never raises: a raised error is folded into the result stream as a
    /// synthesized failure. With `stop_on_error` set, execution halts after
    /// the first failed result, so the returned list may be shorter than
    /// `commands`. The batch carries no aggregate success flag; inspect the
    /// last element and the length.
    pub async fn run_batch(
        &self,
        device_id: &str,
        commands: &[String],
        options: &ExecOptions,
    ) -> Vec<CommandResult> {
        let mut results = Vec::with_capacity(commands.len());

        for command in commands {
            match self.run(device_id, command, options).await {
                Ok(result) => {
                    let failed = !result.success;
                    results.push(result);
                    if failed && options.stop_on_error {
                        break;
                    }
                }
                Err(err) => {
                    debug!("batch command '{command}' on {device_id} raised: {err}");
                    self.audit
                        .log_activity(
                            ActivityLevel::Error,
                            "Command execution failed",
                            json!({
                                "deviceId": device_id,
                                "command": command,
                                "error": err.to_string(),
                            }),
                        )
                        .await;
                    results.push(CommandResult::from_error(device_id, command, &err));
                    if options.stop_on_error {
                        break;
                    }
                }
            }
        }

        results
    }

    /// Probes a device by running its version banner command and parsing the
    /// output. Reachability state is written back by the pool as a side
    /// effect of the acquisition.
    pub async fn test_connectivity(&self, device_id: &str) -> ConnectivityReport {
        let mut lease = match self.pool.acquire(device_id).await {
            Ok(lease) => lease,
            Err(err) => {
                return ConnectivityReport {
                    connected: false,
                    last_seen: Utc::now(),
                    device_info: None,
                    error: Some(err.to_string()),
                };
            }
        };

        let banner = dialect::command_set(lease.device().dialect)
            .map(|set| set.version_banner())
            .unwrap_or("show version");

        match self
            .run_on_lease(&mut lease, banner, &ExecOptions::default())
            .await
        {
            Ok(result) => ConnectivityReport {
                connected: result.success,
                last_seen: result.timestamp,
                device_info: Some(parse::parse_device_info(&result.output)),
                error: None,
            },
            Err(err) => ConnectivityReport {
                connected: false,
                last_seen: Utc::now(),
                device_info: None,
                error: Some(err.to_string()),
            },
        }
    }
}
