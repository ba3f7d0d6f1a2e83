// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

use rand::RngCore;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a valid share payload whose first tile carries a marker.
pub fn generate_share_payload(marker: &str) -> Value {
    json!({
        "placedTiles": [{
            "id": marker,
            "stampId": "city",
            "origin": {"x": 4, "y": -2},
            "color": "#3b82f6"
        }],
        "view": {"x": 0, "y": 0, "zoom": 1}
    })
}

/// Generate raw draft bodies of varying sizes.
pub fn generate_draft_bodies(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let tiles: Vec<Value> = (0..(i % 5))
                .map(|t| json!({"id": format!("tile-{i}-{t}")}))
                .collect();
            json!({"placedTiles": tiles, "view": {"x": i, "y": 0, "zoom": 1}})
                .to_string()
                .into_bytes()
        })
        .collect()
}

/// Generate random 18-hex-character ids that were never minted by a codec.
///
/// Each has a 1/256 chance of hitting a valid checksum by accident; that
/// residual rate is exactly what the enumeration tests measure.
pub fn generate_forged_ids(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut bytes = [0u8; 9];
            rng.fill_bytes(&mut bytes);
            hex::encode(bytes)
        })
        .collect()
}

/// Malformed id variations that must be rejected before storage is touched.
pub fn generate_malformed_ids() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "deadbeef",
        "deadbeefdeadbeef0",
        "deadbeefdeadbeef000",
        "deadbeefdeadbeefzz",
        "../../../etc/passwd",
        "DEADBEEFDEADBEEFXX",
        "деадбеефдеадбееф00",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_forged_ids() {
        let ids = generate_forged_ids(100);
        assert_eq!(ids.len(), 100);
        assert!(ids
            .iter()
            .all(|id| id.len() == 18 && id.bytes().all(|b| b.is_ascii_hexdigit())));
    }

    #[test]
    fn test_generate_share_payload() {
        let payload = generate_share_payload("m1");
        assert_eq!(payload["placedTiles"][0]["id"], json!("m1"));
        assert!(payload["view"]["zoom"].is_number());
    }
}
