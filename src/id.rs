//! Id generation for records stored alongside links.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Upper bound (exclusive) of menu item ids.
const MENU_ID_SPACE: u64 = 1_000_000;

/// Upper bound (exclusive) of numeric link values derived from string ids.
const NUMERIC_ID_SPACE: u64 = 1_000_000_000;

fn digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Stable id of a menu item from its content and placement.
pub fn menu_item_id(content: &str, parent_id: u64, position: usize) -> u64 {
    let hash = digest(&[
        content.as_bytes(),
        &parent_id.to_le_bytes(),
        &(position as u64).to_le_bytes(),
    ]);
    // 8 hex chars = 32 bits
    u64::from(u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])) % MENU_ID_SPACE
}

/// Unique record id from content + time + entropy.
/// Format: prefix + "_" + 48 bits of SHA256 in decimal.
pub fn record_id(prefix: &str, content: &str, created_at: DateTime<Utc>) -> String {
    let hash = digest(&[
        content.as_bytes(),
        &created_at.timestamp_nanos_opt().unwrap_or(0).to_le_bytes(),
        // Add 8 bytes of randomness to prevent collisions
        &rand::rng().random::<[u8; 8]>(),
    ]);
    let numeric = u64::from_be_bytes([0, 0, hash[0], hash[1], hash[2], hash[3], hash[4], hash[5]]);
    if prefix.is_empty() {
        numeric.to_string()
    } else {
        format!("{}_{}", prefix, numeric)
    }
}

/// Map a string id onto a link value.
pub fn id_to_number(id: &str) -> u64 {
    let hash = digest(&[id.as_bytes()]);
    u64::from(u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])) % NUMERIC_ID_SPACE
}
