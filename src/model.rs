//! Core data model: devices, credentials, dialects, domain records, intents.
//!
//! Domain records are the *write* side of the system: always constructed by
//! an intent translator from caller-supplied fields plus server-assigned
//! defaults, then persisted to the external store. Read snapshots parsed from
//! device output live in [`crate::parse`] and are intentionally separate
//! types; the two are never reconciled into one state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AppConfig;

/// Command vocabulary / output format family of a device.
///
/// Parsed from the registry's free-form type string. Unrecognized tags map to
/// [`Dialect::Unknown`] so a registry edit can never make deserialization
/// fail; commands against such a device fail with `UnsupportedDialect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    CiscoRouter,
    CiscoSwitch,
    Pfsense,
    #[serde(other)]
    Unknown,
}

impl Dialect {
    /// Stable tag used in logs and error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::CiscoRouter => "cisco_router",
            Dialect::CiscoSwitch => "cisco_switch",
            Dialect::Pfsense => "pfsense",
            Dialect::Unknown => "unknown",
        }
    }
}

/// Last-known reachability of a device, recorded opportunistically after
/// connection attempts. Never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReachabilityState {
    Unknown,
    Online,
    Offline,
}

/// A managed network element reachable over SSH.
///
/// Owned by the external device registry; the orchestration layer reads it
/// per-call and only writes back [`Device::status`] / [`Device::last_seen`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable, caller-assigned identifier.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub dialect: Dialect,
    /// Network address (hostname or IP literal).
    pub ip: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    /// Device-specific username; falls back to the process-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Device-specific password; falls back to the process-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_reachability")]
    pub status: ReachabilityState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_reachability() -> ReachabilityState {
    ReachabilityState::Unknown
}

impl Device {
    /// Resolves the effective credential pair: device-specific value first,
    /// else the process-wide default, per field independently.
    pub fn credentials(&self, config: &AppConfig) -> Option<Credentials> {
        let username = self
            .username
            .clone()
            .or_else(|| config.default_username.clone())?;
        let password = self
            .password
            .clone()
            .or_else(|| config.default_password.clone())?;
        Some(Credentials { username, password })
    }

    /// `host:port` label used in logs and audit events.
    pub fn addr_label(&self) -> String {
        format!("{}:{}", self.ip, self.ssh_port)
    }
}

/// Effective username/password pair used for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// SHA-256 fingerprint stored on the pooled session so a credential
    /// rotation in the registry forces reconnection instead of silently
    /// reusing a session authenticated with stale credentials.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.username.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.password.as_bytes());
        hasher.finalize().into()
    }
}

/// Persisted VLAN record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vlan {
    /// Caller-supplied numeric VLAN tag. Uniqueness is enforced against the
    /// local record set only, never against the device.
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    /// Attached device count, maintained by the monitoring layer.
    #[serde(default)]
    pub devices: u32,
    #[serde(default)]
    pub subnet: String,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a persisted firewall rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    Active,
    Disabled,
}

/// Persisted firewall rule record.
///
/// `id` is a process-local sequence, caller-visible and never device-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    pub id: u64,
    pub priority: u32,
    pub name: String,
    pub action: String,
    pub source: String,
    pub destination: String,
    pub port: String,
    pub protocol: String,
    pub status: RuleState,
    pub hits: u64,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
}

/// Operational state of a VPN tunnel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TunnelState {
    Up,
    Down,
}

/// Persisted site-to-site VPN tunnel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VpnTunnel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tunnel_type: String,
    pub local_ip: String,
    pub remote_ip: String,
    pub status: TunnelState,
    pub bandwidth: String,
    pub latency: u32,
    pub uptime: String,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub device_id: String,
    pub local_subnet: String,
    pub remote_subnet: String,
    pub created_at: DateTime<Utc>,
}

/// Intent to create a VLAN on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVlan {
    pub vlan_id: u16,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Switchport mode for a VLAN port assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    Access,
    Trunk,
}

/// Intent to bind a switch interface to a VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortAssignment {
    pub interface: String,
    pub vlan_id: u16,
    pub mode: PortMode,
}

/// Intent to create a firewall rule on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewFirewallRule {
    pub name: String,
    /// Passed through verbatim into the access-control statement
    /// (e.g. "permit", "deny").
    pub action: String,
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Defaults to "ip" in the generated statement and "any" in the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Doubles as the access-list number. Defaults to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

/// Intent to create a site-to-site VPN tunnel.
///
/// All device-side object names are derived from `name` with fixed suffixes
/// (`_SET`, `_MAP`, `_ACL`) so the deletion script can regenerate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTunnel {
    pub name: String,
    #[serde(rename = "remoteIP")]
    pub remote_ip: String,
    pub local_subnet: String,
    pub remote_subnet: String,
    pub preshared_key: String,
}
