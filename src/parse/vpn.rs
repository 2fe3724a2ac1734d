use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::TunnelState;

/// One tunnel observed in a crypto session dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VpnTunnelSnapshot {
    #[serde(rename = "remoteIP")]
    pub remote_ip: String,
    pub status: TunnelState,
}

static PEER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Peer: (\d+\.\d+\.\d+\.\d+)").expect("peer pattern"));

/// Scans crypto-session output with a strict one-pass, two-state machine:
/// a peer-address line opens a tunnel record at "down"; a later
/// "Session status: UP" line flips the *current* tunnel to "up". Status
/// lines seen before any peer line are dropped, and consecutive peer lines
/// without an intervening up-marker leave the earlier tunnels at "down".
pub fn parse_vpn_status(output: &str) -> Vec<VpnTunnelSnapshot> {
    let mut tunnels: Vec<VpnTunnelSnapshot> = Vec::new();

    for line in output.lines() {
        if line.contains("Session status: UP") {
            if let Some(current) = tunnels.last_mut() {
                current.status = TunnelState::Up;
            }
        } else if let Some(caps) = PEER_LINE.captures(line) {
            tunnels.push(VpnTunnelSnapshot {
                remote_ip: caps[1].to_string(),
                status: TunnelState::Down,
            });
        }
    }

    tunnels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_then_up_marks_tunnel_up() {
        let tunnels = parse_vpn_status("Peer: 10.0.0.5\nSession status: UP\n");
        assert_eq!(tunnels.len(), 1);
        assert_eq!(tunnels[0].remote_ip, "10.0.0.5");
        assert_eq!(tunnels[0].status, TunnelState::Up);
    }

    #[test]
    fn status_before_any_peer_is_dropped() {
        let tunnels = parse_vpn_status("Session status: UP\nPeer: 10.0.0.5\n");
        assert_eq!(tunnels.len(), 1);
        assert_eq!(tunnels[0].status, TunnelState::Down);
    }

    #[test]
    fn consecutive_peers_without_up_stay_down() {
        let output = "Peer: 10.0.0.5\nPeer: 10.0.0.6\nSession status: UP\n";
        let tunnels = parse_vpn_status(output);
        assert_eq!(tunnels.len(), 2);
        assert_eq!(tunnels[0].status, TunnelState::Down);
        assert_eq!(tunnels[1].status, TunnelState::Up);
    }

    #[test]
    fn peer_line_without_ipv4_is_ignored() {
        assert!(parse_vpn_status("Peer: fe80::1\n").is_empty());
    }

    #[test]
    fn empty_input_yields_no_tunnels() {
        assert!(parse_vpn_status("").is_empty());
    }
}
