//! # netops-core - Device Connection & Command Orchestration
//!
//! `netops-core` sits between high-level network management intents and the
//! SSH sessions that carry them out. It pools authenticated sessions per
//! device, executes ordered command batches with per-command outcomes,
//! translates VLAN / firewall / VPN intents into per-dialect command
//! scripts, and parses free-text diagnostic output into display snapshots.
//!
//! ## Features
//!
//! - **Session Pooling**: At most one live SSH session per device, reused
//!   across commands, reaped by an idle sweep that skips borrowed sessions
//! - **Two Failure Planes**: Transport and resource failures raise errors;
//!   a device rejecting a command is ordinary result data
//! - **Intent Translation**: VLAN, firewall, and VPN intents rendered into
//!   linear command scripts per device dialect, with no rollback
//! - **Never-Failing Parsers**: Diagnostic output parsers degrade to empty
//!   or partial snapshots instead of erroring
//! - **Legacy Compatibility**: Selectable SSH algorithm profiles for old
//!   network gear
//! - **Async/Await**: Built on Tokio throughout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netops_core::config::AppConfig;
//! use netops_core::executor::CommandExecutor;
//! use netops_core::intent::IntentEngine;
//! use netops_core::model::NewVlan;
//! use netops_core::pool::SessionPool;
//! use netops_core::store::JsonFileStore;
//! use netops_core::transport::SshConnector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(JsonFileStore::open("./state").await?);
//!     let config = store.load_config().await?;
//!
//!     let connector = Arc::new(SshConnector::new(config.security_profile));
//!     let pool = Arc::new(SessionPool::new(
//!         connector,
//!         store.clone(),
//!         store.clone(),
//!         config,
//!     ));
//!     let _sweeper = SessionPool::spawn_sweeper(&pool);
//!
//!     let executor = CommandExecutor::new(pool.clone(), store.clone());
//!     let engine = IntentEngine::new(executor, store.clone(), store.clone(), store);
//!
//!     let applied = engine
//!         .create_vlan(
//!             "1",
//!             NewVlan {
//!                 vlan_id: 100,
//!                 name: "Guest".to_string(),
//!                 description: Some("Guest access".to_string()),
//!             },
//!         )
//!         .await?;
//!     for result in &applied.results {
//!         println!("{} -> success: {}", result.command, result.success);
//!     }
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`pool::SessionPool`] - Per-device session pool with idle sweep
//! - [`executor::CommandExecutor`] - Single and batched command execution
//! - [`intent::IntentEngine`] - Intent-to-script translation and persistence
//! - [`parse`] - Never-failing parsers for diagnostic command output
//! - [`store`] - Device registry, record store, and audit sink contracts
//! - [`error::OrchestratorError`] - Error types for transport and storage

pub mod config;
pub mod error;
pub mod executor;
pub mod intent;
pub mod model;
pub mod parse;
pub mod pool;
pub mod store;
pub mod transport;
