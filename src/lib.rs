// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Map Share API
//!
//! This crate provides the draft/share persistence subsystem for the map
//! editor:
//!
//! - Checksum-verified 18-character share ids, minted from a CSPRNG
//! - All-or-nothing schema validation of untrusted share payloads
//! - Write-once, capacity-guarded file storage (one JSON file per share)
//! - Per-client-address rate limiting of draft saves (5 per minute default)

pub mod config;
pub mod handlers;
pub mod limiter;
pub mod share_id;
pub mod storage;
pub mod validator;

pub use config::Config;
pub use limiter::{DraftRateLimiter, RateLimitResult};
pub use share_id::{ShareIdCodec, ShareIdError, SHARE_ID_LEN};
pub use storage::{ShareStore, StoreError};
pub use validator::{SaveData, ShareValidator, ValidationError};
