//! VPN intents: site-to-site tunnel creation, deletion, reachability test.
//!
//! Device-side crypto objects are named by suffixing the tunnel name
//! (`_SET`, `_MAP`, `_ACL`), so the deletion script is reproducible from the
//! persisted record alone.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AppliedIntent, IntentEngine, IntentOutcome, dialect};
use crate::error::{OrchestratorError, Result};
use crate::executor::ExecOptions;
use crate::model::{NewTunnel, TunnelState, VpnTunnel};
use crate::store::ActivityLevel;

/// Outcome of a tunnel reachability test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TunnelTestReport {
    pub tunnel_id: String,
    pub success: bool,
    pub output: String,
}

impl IntentEngine {
    /// Configures a site-to-site tunnel on the device and persists the
    /// record. The record starts in the `down` state; live status comes from
    /// [`IntentEngine::device_vpn_status`].
    pub async fn create_tunnel(
        &self,
        device_id: &str,
        intent: NewTunnel,
    ) -> Result<AppliedIntent<VpnTunnel>> {
        let devices = self.registry.load_devices().await?;
        let device = devices
            .into_iter()
            .find(|device| device.id == device_id)
            .ok_or_else(|| OrchestratorError::DeviceNotFound(device_id.to_string()))?;
        let set = dialect::command_set(device.dialect)?;
        let commands = set.tunnel_create(&intent);
        let results = self.apply_script(device_id, &commands).await;

        let mut tunnels = self.store.load_tunnels().await?;
        let next_id = tunnels
            .iter()
            .filter_map(|tunnel| tunnel.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let record = VpnTunnel {
            id: next_id.to_string(),
            name: intent.name,
            tunnel_type: "site-to-site".to_string(),
            local_ip: device.ip,
            remote_ip: intent.remote_ip,
            status: TunnelState::Down,
            bandwidth: String::new(),
            latency: 0,
            uptime: String::new(),
            bytes_in: 0,
            bytes_out: 0,
            device_id: device_id.to_string(),
            local_subnet: intent.local_subnet,
            remote_subnet: intent.remote_subnet,
            created_at: Utc::now(),
        };
        tunnels.push(record.clone());
        self.store.save_tunnels(tunnels).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "VPN tunnel created",
                json!({ "tunnelId": record.id, "deviceId": device_id }),
            )
            .await;

        Ok(AppliedIntent {
            record,
            commands,
            results,
        })
    }

    /// Tears down a tunnel's crypto objects on the device and drops the
    /// record.
    ///
    /// The record is removed unconditionally: a device that refused every
    /// teardown command still loses its local record, and the operator
    /// reconciles from the live snapshot.
    pub async fn delete_tunnel(&self, device_id: &str, tunnel_id: &str) -> Result<IntentOutcome> {
        let tunnels = self.store.load_tunnels().await?;
        let tunnel = tunnels
            .iter()
            .find(|tunnel| tunnel.id == tunnel_id)
            .ok_or_else(|| OrchestratorError::RecordNotFound(format!("vpn tunnel {tunnel_id}")))?;

        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let commands = set.tunnel_delete(&tunnel.name, &tunnel.remote_ip);
        let results = self.apply_script(device_id, &commands).await;

        let remaining = tunnels
            .into_iter()
            .filter(|tunnel| tunnel.id != tunnel_id)
            .collect();
        self.store.save_tunnels(remaining).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "VPN tunnel deleted",
                json!({ "tunnelId": tunnel_id, "deviceId": device_id }),
            )
            .await;

        Ok(IntentOutcome { commands, results })
    }

    /// Pings the tunnel's remote endpoint from the device and reports
    /// whether every probe came back.
    pub async fn test_tunnel(&self, device_id: &str, tunnel_id: &str) -> Result<TunnelTestReport> {
        let tunnels = self.store.load_tunnels().await?;
        let tunnel = tunnels
            .iter()
            .find(|tunnel| tunnel.id == tunnel_id)
            .ok_or_else(|| OrchestratorError::RecordNotFound(format!("vpn tunnel {tunnel_id}")))?;

        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let command = set.ping(&tunnel.remote_ip);
        let result = self
            .executor
            .run(device_id, &command, &ExecOptions::default())
            .await?;

        let success = result.success && result.output.contains("5 packets transmitted, 5 received");
        Ok(TunnelTestReport {
            tunnel_id: tunnel_id.to_string(),
            success,
            output: result.output,
        })
    }
}
