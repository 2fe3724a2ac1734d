//! VLAN intents: create, delete, port assignment.

use chrono::Utc;
use serde_json::json;

use super::{AppliedIntent, IntentEngine, IntentOutcome, dialect};
use crate::error::Result;
use crate::model::{NewVlan, PortAssignment, Vlan};
use crate::store::ActivityLevel;

impl IntentEngine {
    /// Creates a VLAN on the device and persists the record.
    ///
    /// The record is written regardless of per-command outcomes; the trace in
    /// the returned [`AppliedIntent`] is the caller's view of what actually
    /// reached the device.
    pub async fn create_vlan(
        &self,
        device_id: &str,
        intent: NewVlan,
    ) -> Result<AppliedIntent<Vlan>> {
        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let commands = set.vlan_create(&intent);
        let results = self.apply_script(device_id, &commands).await;

        let record = Vlan {
            id: intent.vlan_id,
            name: intent.name,
            description: intent.description.unwrap_or_default(),
            status: "active".to_string(),
            devices: 0,
            subnet: String::new(),
            device_id: device_id.to_string(),
            created_at: Utc::now(),
        };
        let mut vlans = self.store.load_vlans().await?;
        vlans.push(record.clone());
        self.store.save_vlans(vlans).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "VLAN created",
                json!({ "vlanId": record.id, "deviceId": device_id }),
            )
            .await;

        Ok(AppliedIntent {
            record,
            commands,
            results,
        })
    }

    /// Deletes a VLAN from the device and drops the local record.
    ///
    /// The local record is removed even when every device command failed; a
    /// device that re-advertises the VLAN will show it in the live snapshot
    /// while the record set no longer lists it.
    pub async fn delete_vlan(&self, device_id: &str, vlan_id: u16) -> Result<IntentOutcome> {
        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let commands = set.vlan_delete(vlan_id);
        let results = self.apply_script(device_id, &commands).await;

        let mut vlans = self.store.load_vlans().await?;
        vlans.retain(|vlan| !(vlan.id == vlan_id && vlan.device_id == device_id));
        self.store.save_vlans(vlans).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "VLAN deleted",
                json!({ "vlanId": vlan_id, "deviceId": device_id }),
            )
            .await;

        Ok(IntentOutcome { commands, results })
    }

    /// Binds a switch interface to a VLAN in access or trunk mode. Pure
    /// device mutation, no record is kept.
    pub async fn assign_port(
        &self,
        device_id: &str,
        assignment: PortAssignment,
    ) -> Result<IntentOutcome> {
        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let commands = set.port_assignment(&assignment);
        let results = self.apply_script(device_id, &commands).await;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "Port assigned to VLAN",
                json!({
                    "interface": assignment.interface,
                    "vlanId": assignment.vlan_id,
                    "deviceId": device_id,
                }),
            )
            .await;

        Ok(IntentOutcome { commands, results })
    }
}
