// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the map share service.
//!
//! Defaults: 5 draft saves per minute per client, 30 GiB of required
//! storage headroom, 18-character share ids.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Secret used for share id checksums when `SHARE_SECRET` is unset.
///
/// Running on this value is flagged at startup and refused in production.
pub const DEFAULT_SECRET: &str = "NoRandomFound43908";

/// Configuration for the map share service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public base URL used in retrieval links; derived from the request's
    /// Host header when unset.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Share id configuration
    #[serde(default)]
    pub share_id: ShareIdConfig,

    /// Payload validation limits
    #[serde(default)]
    pub validation: ValidationLimits,
}

/// Rate limiting configuration for the draft-save endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window per client address (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the `shares/` and `drafts/` trees (default: ./data)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Minimum free space that must remain on the storage filesystem for a
    /// write to be admitted (default: 30 GiB)
    #[serde(default = "default_min_free_bytes")]
    pub min_free_bytes: u64,
}

/// Share id configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareIdConfig {
    /// Secret mixed into the id checksum (default: built-in fallback)
    #[serde(default = "default_secret")]
    pub secret: String,
}

/// Field length limits for share payload validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Maximum length of a placed tile's `id` field (default: 120)
    #[serde(default = "default_tile_id_len")]
    pub max_tile_id_len: usize,

    /// Maximum length of a placed tile's `stampId` field (default: 120)
    #[serde(default = "default_tile_id_len")]
    pub max_stamp_id_len: usize,

    /// Maximum length of a placed tile's `color` field (default: 30)
    #[serde(default = "default_color_len")]
    pub max_color_len: usize,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_min_free_bytes() -> u64 {
    30 * 1024 * 1024 * 1024
}

fn default_secret() -> String {
    DEFAULT_SECRET.to_string()
}

fn default_tile_id_len() -> usize {
    120
}

fn default_color_len() -> usize {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: None,
            rate_limit: RateLimitConfig::default(),
            storage: StorageConfig::default(),
            share_id: ShareIdConfig::default(),
            validation: ValidationLimits::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            min_free_bytes: default_min_free_bytes(),
        }
    }
}

impl Default for ShareIdConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
        }
    }
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_tile_id_len: default_tile_id_len(),
            max_stamp_id_len: default_tile_id_len(),
            max_color_len: default_color_len(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl ShareIdConfig {
    /// Whether the service is running on the built-in fallback secret.
    pub fn is_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}
