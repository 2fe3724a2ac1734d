//! Intent translation: high-level network intents rendered into per-dialect
//! command scripts, executed, and persisted.
//!
//! Every apply operation follows the same shape: resolve the device's
//! dialect, render a linear script, run it through the executor (which never
//! raises inside a batch), then update the record store. Device execution and
//! record persistence are not transactional: the caller sees both the
//! per-command results and the resulting record and decides what to do about
//! partial failures. There is no rollback.

pub mod dialect;

mod firewall;
mod vlan;
mod vpn;

pub use vpn::TunnelTestReport;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};
use crate::executor::{CommandExecutor, CommandResult, ExecOptions};
use crate::model::Dialect;
use crate::parse::{
    self, AclStats, DeviceInfo, FirewallRuleSnapshot, InterfaceStatus, VlanSnapshot,
    VpnTunnelSnapshot,
};
use crate::store::{AuditSink, DeviceRegistry, RecordStore};

/// Outcome of an intent that created a record: the persisted record plus the
/// full command/result trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedIntent<T> {
    pub record: T,
    pub commands: Vec<String>,
    pub results: Vec<CommandResult>,
}

/// Outcome of an intent that only mutated device state or removed a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentOutcome {
    pub commands: Vec<String>,
    pub results: Vec<CommandResult>,
}

/// Translates network intents into command scripts and keeps the record
/// store in step with what was pushed to devices.
#[derive(Clone)]
pub struct IntentEngine {
    executor: CommandExecutor,
    registry: Arc<dyn DeviceRegistry>,
    store: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditSink>,
}

impl IntentEngine {
    pub fn new(
        executor: CommandExecutor,
        registry: Arc<dyn DeviceRegistry>,
        store: Arc<dyn RecordStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            executor,
            registry,
            store,
            audit,
        }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Looks up the device's dialect in the registry.
    pub(crate) async fn device_dialect(&self, device_id: &str) -> Result<Dialect> {
        let devices = self.registry.load_devices().await?;
        devices
            .into_iter()
            .find(|device| device.id == device_id)
            .map(|device| device.dialect)
            .ok_or_else(|| OrchestratorError::DeviceNotFound(device_id.to_string()))
    }

    /// Applies a rendered script. Intent batches run to completion so the
    /// trace shows every statement's outcome; callers inspect the results.
    pub(crate) async fn apply_script(
        &self,
        device_id: &str,
        commands: &[String],
    ) -> Vec<CommandResult> {
        self.executor
            .run_batch(device_id, commands, &ExecOptions::default())
            .await
    }

    /// Live interface listing parsed from the device.
    pub async fn device_interfaces(&self, device_id: &str) -> Result<Vec<InterfaceStatus>> {
        let mut lease = self.executor.pool().acquire(device_id).await?;
        let set = dialect::command_set(lease.device().dialect)?;
        let result = self
            .executor
            .run_on_lease(&mut lease, set.interface_brief(), &ExecOptions::default())
            .await?;
        Ok(parse::parse_interfaces(&result.output))
    }

    /// Live VLAN listing parsed from the device.
    pub async fn device_vlans(&self, device_id: &str) -> Result<Vec<VlanSnapshot>> {
        let mut lease = self.executor.pool().acquire(device_id).await?;
        let set = dialect::command_set(lease.device().dialect)?;
        let result = self
            .executor
            .run_on_lease(&mut lease, set.vlan_brief(), &ExecOptions::default())
            .await?;
        Ok(parse::parse_vlans(&result.output))
    }

    /// Live access-list statements parsed from the device. Display-only:
    /// snapshots carry no identifiers and are never written back.
    pub async fn device_firewall_rules(&self, device_id: &str) -> Result<Vec<FirewallRuleSnapshot>> {
        let mut lease = self.executor.pool().acquire(device_id).await?;
        let set = dialect::command_set(lease.device().dialect)?;
        let result = self
            .executor
            .run_on_lease(&mut lease, set.access_list_dump(), &ExecOptions::default())
            .await?;
        Ok(parse::parse_firewall_rules(&result.output))
    }

    /// Aggregate hit counters from the device's access-list dump.
    pub async fn device_firewall_stats(&self, device_id: &str) -> Result<AclStats> {
        let mut lease = self.executor.pool().acquire(device_id).await?;
        let set = dialect::command_set(lease.device().dialect)?;
        let result = self
            .executor
            .run_on_lease(&mut lease, set.access_list_dump(), &ExecOptions::default())
            .await?;
        Ok(parse::parse_acl_stats(&result.output))
    }

    /// Live tunnel status parsed from the device's crypto session dump.
    pub async fn device_vpn_status(&self, device_id: &str) -> Result<Vec<VpnTunnelSnapshot>> {
        let mut lease = self.executor.pool().acquire(device_id).await?;
        let set = dialect::command_set(lease.device().dialect)?;
        let result = self
            .executor
            .run_on_lease(&mut lease, set.crypto_session_dump(), &ExecOptions::default())
            .await?;
        Ok(parse::parse_vpn_status(&result.output))
    }

    /// Hostname/model/version fields parsed from the device's version banner.
    pub async fn device_info(&self, device_id: &str) -> Result<DeviceInfo> {
        let mut lease = self.executor.pool().acquire(device_id).await?;
        let set = dialect::command_set(lease.device().dialect)?;
        let result = self
            .executor
            .run_on_lease(&mut lease, set.version_banner(), &ExecOptions::default())
            .await?;
        Ok(parse::parse_device_info(&result.output))
    }
}
