//! Firewall intents: rule creation, enable/disable, deletion.
//!
//! The persisted rule id is a process-local sequence; the device only ever
//! sees the access-list number (the rule's priority). Enable/disable is a
//! record-only state flip, since no device command exists for it in the supported
//! dialects, so the record's `status` and the device's running config can
//! legitimately disagree.

use chrono::Utc;
use serde_json::json;

use super::{AppliedIntent, IntentEngine, IntentOutcome, dialect};
use crate::error::{OrchestratorError, Result};
use crate::model::{FirewallRule, NewFirewallRule, RuleState};
use crate::store::ActivityLevel;

const DEFAULT_PRIORITY: u32 = 100;

impl IntentEngine {
    /// Creates a firewall rule on the device and persists the record.
    ///
    /// The access-list number comes from the intent's priority (default 100).
    /// The record id is `max(existing ids) + 1`, assigned locally.
    pub async fn create_firewall_rule(
        &self,
        device_id: &str,
        intent: NewFirewallRule,
    ) -> Result<AppliedIntent<FirewallRule>> {
        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let priority = intent.priority.unwrap_or(DEFAULT_PRIORITY);
        let commands = set.firewall_rule_create(&intent, priority);
        let results = self.apply_script(device_id, &commands).await;

        let mut rules = self.store.load_firewall_rules().await?;
        let next_id = rules.iter().map(|rule| rule.id).max().unwrap_or(0) + 1;
        let record = FirewallRule {
            id: next_id,
            priority,
            name: intent.name,
            action: intent.action,
            source: intent.source,
            destination: intent.destination,
            port: intent.port.unwrap_or_else(|| "any".to_string()),
            protocol: intent.protocol.unwrap_or_else(|| "any".to_string()),
            status: RuleState::Active,
            hits: 0,
            device_id: device_id.to_string(),
            created_at: Utc::now(),
        };
        rules.push(record.clone());
        self.store.save_firewall_rules(rules).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "Firewall rule created",
                json!({ "ruleId": record.id, "priority": priority, "deviceId": device_id }),
            )
            .await;

        Ok(AppliedIntent {
            record,
            commands,
            results,
        })
    }

    /// Flips a rule's persisted state between active and disabled.
    ///
    /// Record-only: no command is sent to the device.
    pub async fn set_firewall_rule_status(
        &self,
        rule_id: u64,
        status: RuleState,
    ) -> Result<FirewallRule> {
        let mut rules = self.store.load_firewall_rules().await?;
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| OrchestratorError::RecordNotFound(format!("firewall rule {rule_id}")))?;
        rule.status = status;
        let updated = rule.clone();
        self.store.save_firewall_rules(rules).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "Firewall rule status changed",
                json!({ "ruleId": rule_id, "status": updated.status }),
            )
            .await;
        Ok(updated)
    }

    /// Removes a rule's access-list from the device and drops the record.
    ///
    /// The record is removed even when the device commands failed.
    pub async fn delete_firewall_rule(
        &self,
        device_id: &str,
        rule_id: u64,
    ) -> Result<IntentOutcome> {
        let rules = self.store.load_firewall_rules().await?;
        let rule = rules
            .iter()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| OrchestratorError::RecordNotFound(format!("firewall rule {rule_id}")))?;
        let priority = rule.priority;

        let set = dialect::command_set(self.device_dialect(device_id).await?)?;
        let commands = set.firewall_rule_delete(priority);
        let results = self.apply_script(device_id, &commands).await;

        let remaining = rules.into_iter().filter(|rule| rule.id != rule_id).collect();
        self.store.save_firewall_rules(remaining).await?;

        self.audit
            .log_activity(
                ActivityLevel::Info,
                "Firewall rule deleted",
                json!({ "ruleId": rule_id, "priority": priority, "deviceId": device_id }),
            )
            .await;

        Ok(IntentOutcome { commands, results })
    }
}
