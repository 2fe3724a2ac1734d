//! Process-wide configuration and SSH algorithm profiles.
//!
//! [`AppConfig`] carries the default device credentials, the connect/command
//! deadlines, and the session-pool tuning knobs. [`SecurityProfile`] selects
//! the SSH algorithm preference lists negotiated with a device: a strict
//! modern set, and a legacy set matching what older managed routers and
//! switches actually offer (group14 key exchange, CBC ciphers, ssh-rsa and
//! ssh-dss host keys).

use std::borrow::Cow;
use std::time::Duration;

use russh::keys::{Algorithm, HashAlg};
use russh::{Preferred, cipher, compression, kex, mac};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Key exchange algorithms for the secure profile, in order of preference.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G14_SHA256,
];

/// Key exchange algorithms offered by legacy network devices.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[kex::DH_G14_SHA256, kex::DH_G14_SHA1, kex::DH_G1_SHA1];

/// Ciphers for the secure profile.
pub const SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

/// CBC-mode ciphers still common on legacy device firmware.
pub const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CTR,
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
];

/// MAC algorithms for the secure profile.
pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
];

/// MAC algorithms accepted by legacy devices.
pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] =
    &[mac::HMAC_SHA256, mac::HMAC_SHA512, mac::HMAC_SHA1];

/// Host key algorithms for the secure profile.
pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
];

/// Host key algorithms including the ssh-rsa/ssh-dss pair legacy devices present.
pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
    Algorithm::Dsa,
];

/// Compression preference shared by both profiles.
pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] =
    &[compression::NONE, compression::ZLIB];

/// SSH algorithm policy for session establishment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SecurityProfile {
    /// Strict modern algorithms.
    Secure,
    /// Broad compatibility with older device firmware (default; the managed
    /// fleet is heterogeneous and frequently behind on SSH stacks).
    #[default]
    LegacyCompatible,
}

impl SecurityProfile {
    /// Algorithm preference lists handed to russh for negotiation.
    pub fn preferred(&self) -> Preferred {
        match self {
            SecurityProfile::Secure => Preferred {
                kex: Cow::Borrowed(SECURE_KEX_ORDER),
                key: Cow::Borrowed(SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(SECURE_CIPHERS),
                mac: Cow::Borrowed(SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityProfile::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(LEGACY_KEX_ORDER),
                key: Cow::Borrowed(LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(LEGACY_CIPHERS),
                mac: Cow::Borrowed(LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}

/// Session-pool tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    /// Sessions idle longer than this are closed by the sweep.
    pub idle_timeout_secs: u64,
    /// Interval of the background sweep task.
    pub sweep_interval_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 600,
            sweep_interval_secs: 300,
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Process-wide orchestration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Fallback username for devices without their own credential pair.
    pub default_username: Option<String>,
    /// Fallback password for devices without their own credential pair.
    pub default_password: Option<String>,
    /// Deadline for TCP connect plus SSH auth handshake.
    pub connect_timeout_secs: u64,
    /// Default per-command execution deadline.
    pub command_timeout_secs: u64,
    pub security_profile: SecurityProfile,
    pub pool: PoolConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_username: None,
            default_password: None,
            connect_timeout_secs: 10,
            command_timeout_secs: 60,
            security_profile: SecurityProfile::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
