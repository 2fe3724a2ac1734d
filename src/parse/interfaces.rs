use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Interface families recognized in `show interfaces brief` output.
const INTERFACE_FAMILIES: &[&str] = &["GigabitEthernet", "FastEthernet"];

/// One interface line from a brief listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStatus {
    pub name: String,
    pub status: String,
    pub protocol: String,
    pub description: String,
}

/// Scans interface-brief output. Lines without a recognized interface-family
/// token or with fewer than three whitespace-delimited fields are ignored
/// silently.
pub fn parse_interfaces(output: &str) -> Vec<InterfaceStatus> {
    output
        .lines()
        .filter_map(|line| {
            if !INTERFACE_FAMILIES.iter().any(|family| line.contains(family)) {
                return None;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            Some(InterfaceStatus {
                name: parts[0].to_string(),
                status: parts[1].to_string(),
                protocol: parts[2].to_string(),
                description: parts[3..].join(" "),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_interface_families() {
        let output = "\
Interface              Status    Protocol  Description
GigabitEthernet0/0     up        up        Uplink to core
FastEthernet0/1        down      down
Vlan100                up        up        SVI
";
        let interfaces = parse_interfaces(output);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0].name, "GigabitEthernet0/0");
        assert_eq!(interfaces[0].description, "Uplink to core");
        assert_eq!(interfaces[1].name, "FastEthernet0/1");
        assert_eq!(interfaces[1].description, "");
    }

    #[test]
    fn short_lines_are_ignored() {
        let interfaces = parse_interfaces("GigabitEthernet0/0 up\n");
        assert!(interfaces.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_set() {
        assert!(parse_interfaces("").is_empty());
    }
}
