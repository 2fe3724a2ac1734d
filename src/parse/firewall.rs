use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One access-control statement from an access-list dump.
///
/// Deliberately carries no identifier: the dump is lossy and order-dependent,
/// so parsed rules must never be used as persistence keys. The persisted
/// [`crate::model::FirewallRule`] records are the only stable handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleSnapshot {
    pub priority: String,
    pub action: String,
    pub protocol: String,
    pub source: String,
    pub destination: String,
    pub status: String,
}

/// Aggregate counters from an access-list dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AclStats {
    pub total_rules: u64,
    pub active_rules: u64,
    pub total_hits: u64,
    pub blocked_connections: u64,
}

static MATCH_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+) matches\)").expect("match count pattern"));

/// Scans access-list output for statement lines. A line qualifies when it
/// contains the `access-list` marker and at least four whitespace-delimited
/// tokens; source and destination default to "any" when absent.
pub fn parse_firewall_rules(output: &str) -> Vec<FirewallRuleSnapshot> {
    output
        .lines()
        .filter_map(|line| {
            if !line.contains("access-list") {
                return None;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            Some(FirewallRuleSnapshot {
                priority: parts[1].to_string(),
                action: parts[2].to_string(),
                protocol: parts[3].to_string(),
                source: parts.get(4).unwrap_or(&"any").to_string(),
                destination: parts.get(5).unwrap_or(&"any").to_string(),
                status: "active".to_string(),
            })
        })
        .collect()
}

/// Tallies rule counts and `(N matches)` hit counters from the same dump.
pub fn parse_acl_stats(output: &str) -> AclStats {
    let mut stats = AclStats::default();
    for line in output.lines() {
        if !line.contains("access-list") {
            continue;
        }
        stats.total_rules += 1;
        stats.active_rules += 1;
        if let Some(caps) = MATCH_COUNT.captures(line) {
            if let Ok(hits) = caps[1].parse::<u64>() {
                stats.total_hits += hits;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACL_DUMP: &str = "\
Extended IP access list 100
access-list 100 deny tcp internal any eq 6881 (892 matches)
access-list 100 permit ip any any (15420 matches)
access-list 110 deny udp
not a rule line
";

    #[test]
    fn parses_statement_lines_with_positional_fields() {
        let rules = parse_firewall_rules(ACL_DUMP);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].priority, "100");
        assert_eq!(rules[0].action, "deny");
        assert_eq!(rules[0].protocol, "tcp");
        assert_eq!(rules[0].source, "internal");
        assert_eq!(rules[0].destination, "any");
    }

    #[test]
    fn missing_endpoints_default_to_any() {
        let rules = parse_firewall_rules("access-list 110 deny udp\n");
        assert_eq!(rules[0].source, "any");
        assert_eq!(rules[0].destination, "any");
    }

    #[test]
    fn identical_lines_parse_identically() {
        // Snapshots carry no generated identifiers, so reparsing is stable.
        let first = parse_firewall_rules(ACL_DUMP);
        let second = parse_firewall_rules(ACL_DUMP);
        assert_eq!(first, second);
    }

    #[test]
    fn short_marker_lines_are_ignored() {
        assert!(parse_firewall_rules("access-list 100\n").is_empty());
    }

    #[test]
    fn stats_count_rules_and_hits() {
        let stats = parse_acl_stats(ACL_DUMP);
        assert_eq!(stats.total_rules, 3);
        assert_eq!(stats.active_rules, 3);
        assert_eq!(stats.total_hits, 892 + 15420);
        assert_eq!(stats.blocked_connections, 0);
    }
}
