use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fields extracted from a version banner. Absent fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub hostname: String,
    pub model: String,
    pub os_version: String,
    pub uptime: String,
    pub serial_number: String,
}

static HOSTNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)hostname\s+(\S+)").expect("hostname pattern"));
static SERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Processor board ID\s+(\S+)").expect("serial pattern"));

/// Extracts hostname, model, OS line, uptime, and serial number from version
/// banner output. Each field matches independently per line and later
/// matches overwrite earlier ones (last-match-wins).
pub fn parse_device_info(output: &str) -> DeviceInfo {
    let mut info = DeviceInfo::default();

    for line in output.lines() {
        if line.contains("hostname") {
            if let Some(caps) = HOSTNAME.captures(line) {
                info.hostname = caps[1].to_string();
            }
        } else if line.contains("Cisco") && line.contains("processor") {
            info.model = line.trim().to_string();
        } else if line.contains("IOS") || line.contains("Version") {
            info.os_version = line.trim().to_string();
        } else if line.contains("uptime") {
            info.uptime = line.trim().to_string();
        } else if let Some(caps) = SERIAL.captures(line) {
            info.serial_number = caps[1].to_string();
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_VERSION: &str = "\
Cisco IOS Software, ISR Software (X86_64_LINUX_IOSD-UNIVERSALK9-M), Version 16.9.4
Router-1 uptime is 2 weeks, 3 days, 4 hours
Cisco ISR4331/K9 (1RU) processor with 1687137K/6147K bytes of memory.
Processor board ID FLM2049W1JG
hostname Router-1
";

    #[test]
    fn extracts_all_fields() {
        let info = parse_device_info(SHOW_VERSION);
        assert_eq!(info.hostname, "Router-1");
        assert!(info.model.contains("processor"));
        assert!(info.os_version.contains("Version 16.9.4"));
        assert!(info.uptime.contains("uptime"));
        assert_eq!(info.serial_number, "FLM2049W1JG");
    }

    #[test]
    fn later_matches_overwrite_earlier_ones() {
        let output = "hostname first\nhostname second\n";
        assert_eq!(parse_device_info(output).hostname, "second");
    }

    #[test]
    fn unrelated_output_yields_empty_info() {
        assert_eq!(parse_device_info("% Invalid input\n"), DeviceInfo::default());
    }
}
