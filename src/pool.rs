//! Pooled authenticated sessions, one per device identifier.
//!
//! The pool owns the only shared mutable state in the orchestration core: a
//! table of per-device session slots. Lookup and insert happen under a global
//! lock; everything slower (connecting, executing) happens under the
//! per-device slot lock, so concurrent acquisitions for the same device
//! serialize instead of racing to create duplicate sessions, and
//! acquisitions for different devices never block each other.
//!
//! Lifecycle: sessions are created lazily on first command, reused while the
//! transport stays open and the registry credentials are unchanged, closed by
//! the idle sweep or by [`SessionPool::shutdown`]. The sweep skips slots that
//! are currently borrowed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::debug;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::error::{OrchestratorError, Result};
use crate::model::{Device, ReachabilityState};
use crate::store::{ActivityLevel, AuditSink, DeviceRegistry};
use crate::transport::{Connector, ExecOutput, Transport};

struct PooledSession {
    transport: Box<dyn Transport>,
    #[allow(dead_code)]
    created_at: Instant,
    last_used: Instant,
    credential_fingerprint: [u8; 32],
}

/// Per-device pool entry. `None` between session teardown and re-creation.
struct Slot {
    session: Option<PooledSession>,
}

/// Exclusive borrow of a device's session for the duration of one command
/// (or one batch). Holding the lease blocks the sweep and any other caller
/// targeting the same device.
pub struct SessionLease {
    device: Device,
    guard: OwnedMutexGuard<Slot>,
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease")
            .field("device", &self.device.id)
            .field("live", &self.guard.session.is_some())
            .finish()
    }
}

impl SessionLease {
    /// The device record loaded for this acquisition.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Runs one command on the leased session with a hard deadline.
    pub async fn exec(&mut self, command: &str, timeout: Duration) -> Result<ExecOutput> {
        let session = self
            .guard
            .session
            .as_mut()
            .ok_or_else(|| OrchestratorError::Execution("session already closed".to_string()))?;

        match tokio::time::timeout(timeout, session.transport.exec(command)).await {
            Err(_) => Err(OrchestratorError::ExecTimeout(format!(
                "{} did not answer '{command}' within {timeout:?}",
                self.device.addr_label()
            ))),
            Ok(Err(err)) => Err(err),
            Ok(Ok(output)) => {
                session.last_used = Instant::now();
                Ok(output)
            }
        }
    }
}

/// Connection pool holding at most one live session per device identifier.
pub struct SessionPool {
    connector: Arc<dyn Connector>,
    registry: Arc<dyn DeviceRegistry>,
    audit: Arc<dyn AuditSink>,
    config: AppConfig,
    slots: Mutex<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl SessionPool {
    pub fn new(
        connector: Arc<dyn Connector>,
        registry: Arc<dyn DeviceRegistry>,
        audit: Arc<dyn AuditSink>,
        config: AppConfig,
    ) -> Self {
        Self {
            connector,
            registry,
            audit,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Acquires the session for `device_id`, creating it if needed.
    ///
    /// Reuses an existing session when its transport is still open and the
    /// registry credentials have not rotated; otherwise the stale session is
    /// closed and a fresh one is established under a bounded connect
    /// deadline. Every acquisition, successful or not, emits one audit event.
    pub async fn acquire(&self, device_id: &str) -> Result<SessionLease> {
        // Slot lookup and slot lock are taken in separate steps, so the sweep
        // can evict the slot in between. After locking, confirm the map still
        // holds this exact slot; a swept slot is abandoned and the lookup
        // retried against the live entry, keeping the one-session-per-device
        // invariant.
        let mut guard = loop {
            let slot = {
                let mut slots = self.slots.lock().await;
                slots
                    .entry(device_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(Slot { session: None })))
                    .clone()
            };
            let guard = slot.clone().lock_owned().await;
            let slots = self.slots.lock().await;
            match slots.get(device_id) {
                Some(current) if Arc::ptr_eq(current, &slot) => break guard,
                _ => continue,
            }
        };

        // The registry owns the device record; re-read it on every
        // acquisition so address or credential edits take effect.
        let devices = self.registry.load_devices().await?;
        let device = devices
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| OrchestratorError::DeviceNotFound(device_id.to_string()))?;
        let credentials = device
            .credentials(&self.config)
            .ok_or_else(|| OrchestratorError::CredentialsMissing(device_id.to_string()))?;
        let fingerprint = credentials.fingerprint();

        if let Some(session) = guard.session.as_mut() {
            if session.transport.is_open() && session.credential_fingerprint == fingerprint {
                session.last_used = Instant::now();
                debug!("session reuse for {}", device.addr_label());
                self.audit
                    .log_activity(
                        ActivityLevel::Info,
                        &format!("SSH session reused for {} ({})", device.name, device.ip),
                        json!({ "deviceId": device.id }),
                    )
                    .await;
                return Ok(SessionLease { device, guard });
            }
            // Unusable or authenticated with stale credentials: discard and
            // fall through to creation.
            if let Some(mut stale) = guard.session.take() {
                debug!("discarding stale session for {}", device.addr_label());
                stale.transport.close().await;
            }
        }

        let connect = tokio::time::timeout(
            self.config.connect_timeout(),
            self.connector.connect(&device, &credentials),
        )
        .await;

        let transport = match connect {
            Err(_) => {
                let err = OrchestratorError::ConnectTimeout(device.addr_label());
                self.note_connect_failure(&device, &err).await;
                return Err(err);
            }
            Ok(Err(err)) => {
                self.note_connect_failure(&device, &err).await;
                return Err(err);
            }
            Ok(Ok(transport)) => transport,
        };

        let now = Instant::now();
        guard.session = Some(PooledSession {
            transport,
            created_at: now,
            last_used: now,
            credential_fingerprint: fingerprint,
        });

        self.audit
            .log_activity(
                ActivityLevel::Info,
                &format!("SSH connection established to {} ({})", device.name, device.ip),
                json!({ "deviceId": device.id }),
            )
            .await;
        self.note_reachability(&device.id, ReachabilityState::Online)
            .await;

        Ok(SessionLease { device, guard })
    }

    async fn note_connect_failure(&self, device: &Device, err: &OrchestratorError) {
        self.audit
            .log_activity(
                ActivityLevel::Error,
                &format!("Failed to connect to {} ({})", device.name, device.ip),
                json!({ "deviceId": device.id, "error": err.to_string() }),
            )
            .await;
        self.note_reachability(&device.id, ReachabilityState::Offline)
            .await;
    }

    /// Best-effort write-back of the last-known reachability state. The
    /// registry stays authoritative; failures here never fail the caller.
    async fn note_reachability(&self, device_id: &str, state: ReachabilityState) {
        let result = async {
            let mut devices = self.registry.load_devices().await?;
            if let Some(device) = devices.iter_mut().find(|d| d.id == device_id) {
                device.status = state;
                if state == ReachabilityState::Online {
                    device.last_seen = Some(Utc::now());
                }
                self.registry.save_devices(devices).await?;
            }
            Ok::<(), OrchestratorError>(())
        }
        .await;
        if let Err(err) = result {
            debug!("reachability write-back for {device_id} skipped: {err}");
        }
    }

    /// Closes and removes every session idle beyond the configured threshold,
    /// plus any session whose transport already died. Slots currently
    /// borrowed by a lease are skipped. Returns the number of sessions
    /// removed.
    pub async fn sweep_once(&self) -> usize {
        let idle_timeout = self.config.pool.idle_timeout();
        let mut slots = self.slots.lock().await;
        let mut expired = Vec::new();

        for (device_id, slot) in slots.iter() {
            let Ok(mut guard) = slot.clone().try_lock_owned() else {
                continue; // borrowed and in active use
            };
            let evict = match guard.session.as_ref() {
                Some(session) => {
                    !session.transport.is_open() || session.last_used.elapsed() >= idle_timeout
                }
                // Empty slot left over from a failed acquisition.
                None => true,
            };
            if evict {
                if let Some(mut session) = guard.session.take() {
                    debug!("sweeping idle session for {device_id}");
                    session.transport.close().await;
                }
                expired.push(device_id.clone());
            }
        }

        let removed = expired
            .iter()
            .filter(|id| slots.remove(id.as_str()).is_some())
            .count();
        removed
    }

    /// Spawns the periodic idle sweep. The task ends on its own once the
    /// pool is dropped.
    pub fn spawn_sweeper(pool: &Arc<Self>) -> JoinHandle<()> {
        let interval = pool.config.pool.sweep_interval();
        let weak = Arc::downgrade(pool);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(pool) = weak.upgrade() else {
                    break;
                };
                let removed = pool.sweep_once().await;
                if removed > 0 {
                    debug!("idle sweep closed {removed} session(s)");
                }
            }
        })
    }

    /// Drains the pool, attempting to close every live transport. Individual
    /// close failures are tolerated so shutdown cannot hang on one bad
    /// session.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Arc<Mutex<Slot>>)> =
            self.slots.lock().await.drain().collect();
        for (device_id, slot) in drained {
            let mut guard = slot.lock().await;
            if let Some(mut session) = guard.session.take() {
                debug!("closing session for {device_id} on shutdown");
                session.transport.close().await;
            }
        }
    }

    /// Number of pooled entries, borrowed or idle. Diagnostic only.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}
