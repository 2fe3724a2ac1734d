use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One VLAN line from a `show vlan brief` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VlanSnapshot {
    pub id: u16,
    pub name: String,
    pub status: String,
    pub ports: Vec<String>,
}

static VLAN_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+(\S+)\s+(\S+)\s+(.*)").expect("vlan line pattern"));

/// Scans vlan-brief output for `<id> <name> <status> <ports...>` lines.
/// Lines with fewer than four whitespace-delimited groups, or a VLAN id out
/// of range, are ignored silently.
pub fn parse_vlans(output: &str) -> Vec<VlanSnapshot> {
    output
        .lines()
        .filter_map(|line| {
            let caps = VLAN_LINE.captures(line)?;
            let id = caps[1].parse::<u16>().ok()?;
            Some(VlanSnapshot {
                id,
                name: caps[2].to_string(),
                status: caps[3].to_ascii_lowercase(),
                ports: caps[4]
                    .trim()
                    .split(',')
                    .map(|port| port.trim().to_string())
                    .filter(|port| !port.is_empty())
                    .collect(),
            })
        })
        .collect()
}
