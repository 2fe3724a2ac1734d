//! Parsers for free-text diagnostic command output.
//!
//! Vendor CLI output carries no grammar guarantee, so every parser here is a
//! finite, restartable, line-oriented scan with one shared contract: it never
//! fails. Malformed, empty, or unexpected input degrades to an empty or
//! partial collection. Parsed snapshots are *read* views for display only:
//! they carry no stable identifiers and are never reconciled with the
//! persisted domain records.

mod device_info;
mod firewall;
mod interfaces;
mod vlan;
mod vpn;

pub use device_info::{DeviceInfo, parse_device_info};
pub use firewall::{AclStats, FirewallRuleSnapshot, parse_acl_stats, parse_firewall_rules};
pub use interfaces::{InterfaceStatus, parse_interfaces};
pub use vlan::{VlanSnapshot, parse_vlans};
pub use vpn::{VpnTunnelSnapshot, parse_vpn_status};
