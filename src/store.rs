//! External collaborator interfaces: device registry, record stores, audit sink.
//!
//! The orchestration core consumes these as whole-collection load/replace
//! contracts with no partial-update API and no transaction spanning multiple
//! collections. [`JsonFileStore`] is the reference implementation (JSON files
//! in a data directory, timestamped backups, JSONL activity log);
//! [`MemoryStore`] backs tests and embedded use.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::error::{OrchestratorError, Result};
use crate::model::{Device, FirewallRule, Vlan, VpnTunnel};

/// Owner of the device inventory.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn load_devices(&self) -> Result<Vec<Device>>;
    async fn save_devices(&self, devices: Vec<Device>) -> Result<()>;
}

/// Owner of the domain record collections, one whole-collection
/// read/replace pair per entity.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load_vlans(&self) -> Result<Vec<Vlan>>;
    async fn save_vlans(&self, vlans: Vec<Vlan>) -> Result<()>;

    async fn load_firewall_rules(&self) -> Result<Vec<FirewallRule>>;
    async fn save_firewall_rules(&self, rules: Vec<FirewallRule>) -> Result<()>;

    async fn load_tunnels(&self) -> Result<Vec<VpnTunnel>>;
    async fn save_tunnels(&self, tunnels: Vec<VpnTunnel>) -> Result<()>;
}

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

impl ActivityLevel {
    fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Info => "info",
            ActivityLevel::Warn => "warn",
            ActivityLevel::Error => "error",
        }
    }
}

/// Fire-and-forget audit trail.
///
/// Implementations must swallow their own failures; a broken sink never
/// fails the calling operation, which is why the method returns `()`.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_activity(&self, level: ActivityLevel, message: &str, metadata: Value);
}

/// Audit sink that forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn log_activity(&self, level: ActivityLevel, message: &str, metadata: Value) {
        match level {
            ActivityLevel::Info => log::info!("{message} {metadata}"),
            ActivityLevel::Warn => log::warn!("{message} {metadata}"),
            ActivityLevel::Error => log::error!("{message} {metadata}"),
        }
    }
}

#[derive(Serialize)]
struct ActivityEntry<'a> {
    timestamp: String,
    level: &'static str,
    message: &'a str,
    metadata: &'a Value,
}

/// JSON-file backed implementation of the registry and record stores.
///
/// Layout under the root directory: `data/` for collections, `backups/` for
/// pre-save snapshots, `logs/` for the daily JSONL activity log.
pub struct JsonFileStore {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    logs_dir: PathBuf,
}

impl JsonFileStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let store = Self {
            data_dir: root.join("data"),
            backup_dir: root.join("backups"),
            logs_dir: root.join("logs"),
        };
        tokio::fs::create_dir_all(&store.data_dir).await?;
        tokio::fs::create_dir_all(&store.backup_dir).await?;
        tokio::fs::create_dir_all(&store.logs_dir).await?;
        Ok(store)
    }

    async fn load_collection<T: DeserializeOwned>(&self, filename: &str) -> Result<Vec<T>> {
        let path = self.data_dir.join(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_collection<T: Serialize>(&self, filename: &str, items: &[T]) -> Result<()> {
        let path = self.data_dir.join(filename);

        // Snapshot the previous contents before replacing them. Backup
        // failures are tolerated for files that do not exist yet. The name
        // carries a process-local sequence number so that two saves of the
        // same collection within one millisecond cannot clobber each other's
        // backup.
        if let Ok(existing) = tokio::fs::read(&path).await {
            static BACKUP_SEQ: AtomicU64 = AtomicU64::new(0);
            let seq = BACKUP_SEQ.fetch_add(1, Ordering::Relaxed);
            let backup = self.backup_dir.join(format!(
                "{filename}.{}.{seq}.bak",
                Utc::now().timestamp_millis()
            ));
            if let Err(err) = tokio::fs::write(&backup, existing).await {
                debug!("backup of {filename} failed: {err}");
            }
        }

        let json = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }

    /// Loads the process configuration, falling back to defaults when the
    /// file is absent.
    pub async fn load_config(&self) -> Result<AppConfig> {
        let path = self.data_dir.join("config.json");
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let path = self.data_dir.join("config.json");
        let json = serde_json::to_vec_pretty(config)?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for JsonFileStore {
    async fn load_devices(&self) -> Result<Vec<Device>> {
        self.load_collection("devices.json").await
    }

    async fn save_devices(&self, devices: Vec<Device>) -> Result<()> {
        self.save_collection("devices.json", &devices).await
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn load_vlans(&self) -> Result<Vec<Vlan>> {
        self.load_collection("vlans.json").await
    }

    async fn save_vlans(&self, vlans: Vec<Vlan>) -> Result<()> {
        self.save_collection("vlans.json", &vlans).await
    }

    async fn load_firewall_rules(&self) -> Result<Vec<FirewallRule>> {
        self.load_collection("firewall_rules.json").await
    }

    async fn save_firewall_rules(&self, rules: Vec<FirewallRule>) -> Result<()> {
        self.save_collection("firewall_rules.json", &rules).await
    }

    async fn load_tunnels(&self) -> Result<Vec<VpnTunnel>> {
        self.load_collection("vpn_tunnels.json").await
    }

    async fn save_tunnels(&self, tunnels: Vec<VpnTunnel>) -> Result<()> {
        self.save_collection("vpn_tunnels.json", &tunnels).await
    }
}

#[async_trait]
impl AuditSink for JsonFileStore {
    async fn log_activity(&self, level: ActivityLevel, message: &str, metadata: Value) {
        let now = Utc::now();
        let entry = ActivityEntry {
            timestamp: now.to_rfc3339(),
            level: level.as_str(),
            message,
            metadata: &metadata,
        };
        let Ok(mut line) = serde_json::to_vec(&entry) else {
            return;
        };
        line.push(b'\n');

        let path = self
            .logs_dir
            .join(format!("app.{}.log", now.format("%Y-%m-%d")));
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(&line).await
        }
        .await;
        if let Err(err) = result {
            debug!("audit append failed: {err}");
        }
    }
}

#[derive(Default)]
struct MemoryInner {
    devices: Vec<Device>,
    vlans: Vec<Vlan>,
    rules: Vec<FirewallRule>,
    tunnels: Vec<VpnTunnel>,
}

/// In-memory registry/record store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_devices(devices: Vec<Device>) -> Self {
        let store = Self::new();
        store.inner.write().await.devices = devices;
        store
    }

    /// Makes every save fail with a storage error. Used to exercise the
    /// best-effort write-back paths.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_saves {
            Err(OrchestratorError::Storage(
                "memory store is read-only".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceRegistry for MemoryStore {
    async fn load_devices(&self) -> Result<Vec<Device>> {
        Ok(self.inner.read().await.devices.clone())
    }

    async fn save_devices(&self, devices: Vec<Device>) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.devices = devices;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load_vlans(&self) -> Result<Vec<Vlan>> {
        Ok(self.inner.read().await.vlans.clone())
    }

    async fn save_vlans(&self, vlans: Vec<Vlan>) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.vlans = vlans;
        Ok(())
    }

    async fn load_firewall_rules(&self) -> Result<Vec<FirewallRule>> {
        Ok(self.inner.read().await.rules.clone())
    }

    async fn save_firewall_rules(&self, rules: Vec<FirewallRule>) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.rules = rules;
        Ok(())
    }

    async fn load_tunnels(&self) -> Result<Vec<VpnTunnel>> {
        Ok(self.inner.read().await.tunnels.clone())
    }

    async fn save_tunnels(&self, tunnels: Vec<VpnTunnel>) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.tunnels = tunnels;
        Ok(())
    }
}

/// Audit sink that retains events in memory for assertions.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<(ActivityLevel, String, Value)>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<(ActivityLevel, String, Value)> {
        self.events.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .map(|(_, message, _)| message.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn log_activity(&self, level: ActivityLevel, message: &str, metadata: Value) {
        self.events
            .write()
            .await
            .push((level, message.to_string(), metadata));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dialect, ReachabilityState};

    fn sample_device() -> Device {
        Device {
            id: "1".to_string(),
            name: "Router-1".to_string(),
            dialect: Dialect::CiscoRouter,
            ip: "192.168.1.10".to_string(),
            ssh_port: 22,
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            status: ReachabilityState::Unknown,
            location: Some("Main Office".to_string()),
            model: Some("ISR 4331".to_string()),
            created_at: Utc::now(),
            last_seen: None,
        }
    }

    #[tokio::test]
    async fn file_store_round_trips_devices() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).await.expect("open");

        assert!(store.load_devices().await.expect("load empty").is_empty());

        store
            .save_devices(vec![sample_device()])
            .await
            .expect("save");
        let loaded = store.load_devices().await.expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "1");
        assert_eq!(loaded[0].dialect, Dialect::CiscoRouter);
    }

    #[tokio::test]
    async fn file_store_backs_up_before_replacing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).await.expect("open");

        store
            .save_devices(vec![sample_device()])
            .await
            .expect("first save");
        store.save_devices(Vec::new()).await.expect("second save");

        let mut backups = std::fs::read_dir(dir.path().join("backups"))
            .expect("read backups")
            .count();
        // First save has nothing to back up; second save snapshots one file.
        assert_eq!(backups, 1);

        store.save_devices(Vec::new()).await.expect("third save");
        backups = std::fs::read_dir(dir.path().join("backups"))
            .expect("read backups")
            .count();
        assert_eq!(backups, 2);
    }

    #[tokio::test]
    async fn file_store_config_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).await.expect("open");

        let config = store.load_config().await.expect("load config");
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn activity_log_appends_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).await.expect("open");

        store
            .log_activity(
                ActivityLevel::Info,
                "SSH connection established",
                serde_json::json!({"device": "1"}),
            )
            .await;
        store
            .log_activity(ActivityLevel::Error, "connect failed", Value::Null)
            .await;

        let log_dir = dir.path().join("logs");
        let entry = std::fs::read_dir(&log_dir)
            .expect("read logs")
            .next()
            .expect("log file")
            .expect("dir entry");
        let contents = std::fs::read_to_string(entry.path()).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).expect("jsonl");
        assert_eq!(first["level"], "info");
        assert_eq!(first["metadata"]["device"], "1");
    }

    #[tokio::test]
    async fn memory_store_failing_saves_surface_storage_error() {
        let store = MemoryStore::new().failing_saves();
        let err = store.save_vlans(Vec::new()).await.expect_err("must fail");
        assert!(matches!(err, OrchestratorError::Storage(_)));
    }
}
