// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Share id generation and verification.
//!
//! A share id is 18 lowercase hex characters: a 16-character random base
//! followed by a 2-character checksum, the truncated SHA-256 of the base and
//! a process-wide secret. Any instance holding the secret can reject a forged
//! or mistyped id without touching storage.
//!
//! The 2-character checksum (256 values) is a structural integrity check,
//! not an authenticity boundary.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Total share id length in characters.
pub const SHARE_ID_LEN: usize = 18;

/// Length of the random base portion.
const BASE_LEN: usize = 16;

/// Reasons a candidate share id fails verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShareIdError {
    #[error("share id must be exactly 18 characters long, got {0}")]
    WrongLength(usize),

    #[error("share id must be hexadecimal")]
    NotHex,

    #[error("share id checksum is invalid")]
    BadChecksum,
}

/// Mints and verifies checksum-carrying share ids.
#[derive(Debug, Clone)]
pub struct ShareIdCodec {
    secret: String,
}

impl ShareIdCodec {
    /// Create a codec over the process-wide secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generate a fresh share id.
    ///
    /// The base is drawn from the OS random source; predictable ids would
    /// allow enumeration of stored shares.
    pub fn generate(&self) -> String {
        let mut base_bytes = [0u8; BASE_LEN / 2];
        OsRng.fill_bytes(&mut base_bytes);
        let base = hex::encode(base_bytes);
        let checksum = self.checksum(&base);
        format!("{base}{checksum}")
    }

    /// Check a candidate id, reporting why it fails.
    pub fn check(&self, candidate: &str) -> Result<(), ShareIdError> {
        if candidate.len() != SHARE_ID_LEN {
            return Err(ShareIdError::WrongLength(candidate.len()));
        }
        if !candidate.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ShareIdError::NotHex);
        }

        let (base, provided) = candidate.split_at(BASE_LEN);
        let computed = self.checksum(base);
        if !constant_time_eq(provided.as_bytes(), computed.as_bytes()) {
            return Err(ShareIdError::BadChecksum);
        }

        Ok(())
    }

    /// Whether a candidate id was minted by this system.
    pub fn verify(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }

    /// First two hex characters of `sha256(base || secret)`.
    fn checksum(&self, base: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(base.as_bytes());
        hasher.update(self.secret.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..1])
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
