//! Per-dialect command vocabularies.
//!
//! Translators never branch on a dialect inline; they fetch the dialect's
//! [`CommandSet`] from the lookup table and let it render the script. Adding
//! support for a new platform means one new `CommandSet` implementation and
//! one arm in [`command_set`].

use crate::error::{OrchestratorError, Result};
use crate::model::{Dialect, NewFirewallRule, NewTunnel, NewVlan, PortAssignment, PortMode};

/// Command vocabulary of one device family.
///
/// Configuration scripts are linear: enter configuration mode, apply the
/// statements, exit, persist. There is deliberately no compensating script;
/// a batch that halts partway leaves the device partially configured and the
/// caller decides whether to retry or intervene.
pub trait CommandSet: Send + Sync {
    fn vlan_create(&self, intent: &NewVlan) -> Vec<String>;
    fn vlan_delete(&self, vlan_id: u16) -> Vec<String>;
    fn port_assignment(&self, assignment: &PortAssignment) -> Vec<String>;
    /// `priority` is the resolved access-list number (caller applies the
    /// default).
    fn firewall_rule_create(&self, rule: &NewFirewallRule, priority: u32) -> Vec<String>;
    fn firewall_rule_delete(&self, priority: u32) -> Vec<String>;
    fn tunnel_create(&self, tunnel: &NewTunnel) -> Vec<String>;
    /// Regenerates the derived object names from the tunnel name, so
    /// deletion needs no state beyond the persisted record.
    fn tunnel_delete(&self, name: &str, remote_ip: &str) -> Vec<String>;

    fn version_banner(&self) -> &'static str;
    fn interface_brief(&self) -> &'static str;
    fn vlan_brief(&self) -> &'static str;
    fn access_list_dump(&self) -> &'static str;
    fn crypto_session_dump(&self) -> &'static str;
    fn running_config(&self) -> &'static str;
    fn ping(&self, target: &str) -> String;
}

static CISCO_IOS: CiscoIosCommands = CiscoIosCommands;

/// Resolves a dialect tag to its command vocabulary.
pub fn command_set(dialect: Dialect) -> Result<&'static dyn CommandSet> {
    match dialect {
        Dialect::CiscoRouter | Dialect::CiscoSwitch => Ok(&CISCO_IOS),
        other => Err(OrchestratorError::UnsupportedDialect(
            other.tag().to_string(),
        )),
    }
}

/// Classic IOS-style CLI shared by the managed routers and switches.
struct CiscoIosCommands;

impl CiscoIosCommands {
    fn transform_set_name(name: &str) -> String {
        format!("{name}_SET")
    }

    fn crypto_map_name(name: &str) -> String {
        format!("{name}_MAP")
    }

    fn acl_name(name: &str) -> String {
        format!("{name}_ACL")
    }
}

impl CommandSet for CiscoIosCommands {
    fn vlan_create(&self, intent: &NewVlan) -> Vec<String> {
        let mut commands = vec![
            "configure terminal".to_string(),
            format!("vlan {}", intent.vlan_id),
            format!("name {}", intent.name),
        ];
        if let Some(description) = &intent.description {
            commands.push(format!("description {description}"));
        }
        commands.extend([
            "exit".to_string(),
            "exit".to_string(),
            "write memory".to_string(),
        ]);
        commands
    }

    fn vlan_delete(&self, vlan_id: u16) -> Vec<String> {
        vec![
            "configure terminal".to_string(),
            format!("no vlan {vlan_id}"),
            "exit".to_string(),
            "write memory".to_string(),
        ]
    }

    fn port_assignment(&self, assignment: &PortAssignment) -> Vec<String> {
        let (mode, binding) = match assignment.mode {
            PortMode::Access => (
                "switchport mode access".to_string(),
                format!("switchport access vlan {}", assignment.vlan_id),
            ),
            PortMode::Trunk => (
                "switchport mode trunk".to_string(),
                format!("switchport trunk allowed vlan {}", assignment.vlan_id),
            ),
        };
        vec![
            "configure terminal".to_string(),
            format!("interface {}", assignment.interface),
            mode,
            binding,
            "exit".to_string(),
            "exit".to_string(),
            "write memory".to_string(),
        ]
    }

    fn firewall_rule_create(&self, rule: &NewFirewallRule, priority: u32) -> Vec<String> {
        let protocol = rule.protocol.as_deref().unwrap_or("ip");
        let port_qualifier = rule
            .port
            .as_deref()
            .map(|port| format!(" eq {port}"))
            .unwrap_or_default();
        vec![
            "configure terminal".to_string(),
            format!(
                "access-list {priority} {} {protocol} {} {}{port_qualifier}",
                rule.action, rule.source, rule.destination
            ),
            "exit".to_string(),
            "write memory".to_string(),
        ]
    }

    fn firewall_rule_delete(&self, priority: u32) -> Vec<String> {
        vec![
            "configure terminal".to_string(),
            format!("no access-list {priority}"),
            "exit".to_string(),
            "write memory".to_string(),
        ]
    }

    fn tunnel_create(&self, tunnel: &NewTunnel) -> Vec<String> {
        let set_name = Self::transform_set_name(&tunnel.name);
        let map_name = Self::crypto_map_name(&tunnel.name);
        let acl_name = Self::acl_name(&tunnel.name);
        vec![
            "configure terminal".to_string(),
            // Key-exchange policy.
            "crypto isakmp policy 10".to_string(),
            "encr aes".to_string(),
            "hash sha256".to_string(),
            "authentication pre-share".to_string(),
            "group 14".to_string(),
            "exit".to_string(),
            // Shared secret keyed by peer address.
            format!(
                "crypto isakmp key {} address {}",
                tunnel.preshared_key, tunnel.remote_ip
            ),
            // Transform/cipher set.
            format!("crypto ipsec transform-set {set_name} esp-aes esp-sha256-hmac"),
            "exit".to_string(),
            // Peering map referencing the interesting-traffic ACL.
            format!("crypto map {map_name} 10 ipsec-isakmp"),
            format!("set peer {}", tunnel.remote_ip),
            format!("set transform-set {set_name}"),
            format!("match address {acl_name}"),
            "exit".to_string(),
            // Interesting traffic: the local/remote subnet pair.
            format!("ip access-list extended {acl_name}"),
            format!(
                "permit ip {} {}",
                tunnel.local_subnet, tunnel.remote_subnet
            ),
            "exit".to_string(),
            "exit".to_string(),
            "write memory".to_string(),
        ]
    }

    fn tunnel_delete(&self, name: &str, remote_ip: &str) -> Vec<String> {
        vec![
            "configure terminal".to_string(),
            format!("no crypto map {}", Self::crypto_map_name(name)),
            format!(
                "no crypto ipsec transform-set {}",
                Self::transform_set_name(name)
            ),
            format!("no ip access-list extended {}", Self::acl_name(name)),
            format!("no crypto isakmp key {remote_ip}"),
            "exit".to_string(),
            "write memory".to_string(),
        ]
    }

    fn version_banner(&self) -> &'static str {
        "show version"
    }

    fn interface_brief(&self) -> &'static str {
        "show interfaces brief"
    }

    fn vlan_brief(&self) -> &'static str {
        "show vlan brief"
    }

    fn access_list_dump(&self) -> &'static str {
        "show access-lists"
    }

    fn crypto_session_dump(&self) -> &'static str {
        "show crypto session"
    }

    fn running_config(&self) -> &'static str {
        "show running-config"
    }

    fn ping(&self, target: &str) -> String {
        format!("ping {target} count 5")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ios() -> &'static dyn CommandSet {
        command_set(Dialect::CiscoRouter).expect("ios command set")
    }

    #[test]
    fn router_and_switch_share_the_ios_vocabulary() {
        assert!(command_set(Dialect::CiscoRouter).is_ok());
        assert!(command_set(Dialect::CiscoSwitch).is_ok());
    }

    #[test]
    fn pfsense_and_unknown_are_unsupported() {
        assert!(matches!(
            command_set(Dialect::Pfsense),
            Err(OrchestratorError::UnsupportedDialect(_))
        ));
        assert!(matches!(
            command_set(Dialect::Unknown),
            Err(OrchestratorError::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn vlan_create_script_is_linear_and_persists() {
        let commands = ios().vlan_create(&NewVlan {
            vlan_id: 100,
            name: "Guest".to_string(),
            description: Some("Guest access".to_string()),
        });
        assert_eq!(commands[0], "configure terminal");
        assert_eq!(commands[1], "vlan 100");
        assert_eq!(commands[2], "name Guest");
        assert_eq!(commands[3], "description Guest access");
        assert_eq!(commands.last().map(String::as_str), Some("write memory"));
    }

    #[test]
    fn vlan_create_omits_missing_description() {
        let commands = ios().vlan_create(&NewVlan {
            vlan_id: 200,
            name: "Corp".to_string(),
            description: None,
        });
        assert!(!commands.iter().any(|c| c.starts_with("description")));
    }

    #[test]
    fn firewall_rule_defaults_protocol_and_appends_port_qualifier() {
        let rule = NewFirewallRule {
            name: "Block-P2P".to_string(),
            action: "deny".to_string(),
            source: "internal".to_string(),
            destination: "any".to_string(),
            port: Some("6881-6999".to_string()),
            protocol: None,
            priority: None,
        };
        let commands = ios().firewall_rule_create(&rule, 100);
        assert_eq!(
            commands[1],
            "access-list 100 deny ip internal any eq 6881-6999"
        );
    }

    #[test]
    fn trunk_assignment_uses_allowed_vlan() {
        let commands = ios().port_assignment(&PortAssignment {
            interface: "GigabitEthernet0/1".to_string(),
            vlan_id: 300,
            mode: PortMode::Trunk,
        });
        assert!(commands.contains(&"switchport mode trunk".to_string()));
        assert!(commands.contains(&"switchport trunk allowed vlan 300".to_string()));
    }

    #[test]
    fn tunnel_scripts_share_derived_object_names() {
        let tunnel = NewTunnel {
            name: "SiteB".to_string(),
            remote_ip: "203.0.113.50".to_string(),
            local_subnet: "192.168.1.0 0.0.0.255".to_string(),
            remote_subnet: "10.10.0.0 0.0.255.255".to_string(),
            preshared_key: "s3cret".to_string(),
        };
        let create = ios().tunnel_create(&tunnel);
        let delete = ios().tunnel_delete("SiteB", "203.0.113.50");

        for object in ["SiteB_SET", "SiteB_MAP", "SiteB_ACL"] {
            assert!(create.iter().any(|c| c.contains(object)), "{object} in create");
            assert!(delete.iter().any(|c| c.contains(object)), "{object} in delete");
        }
        assert!(delete.contains(&"no crypto isakmp key 203.0.113.50".to_string()));
        assert_eq!(create.last().map(String::as_str), Some("write memory"));
    }
}
