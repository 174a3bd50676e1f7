//! Broker routing-key math. Pure functions only: the
//! exchange topology and the queue bindings themselves are owned by the
//! broker configuration, out of scope for this crate.

use md5::{Digest, Md5};

/// Top 24 bits of `MD5((debtor_id, creditor_id))`, used both to decide
/// which shard a pair of ids belongs to and to compute the inbound
/// routing key.
pub fn shard_key(debtor_id: i64, creditor_id: i64) -> u32 {
    let mut hasher = Md5::new();
    hasher.update(debtor_id.to_be_bytes());
    hasher.update(creditor_id.to_be_bytes());
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], 0]) >> 8
}

/// The top 24 bits of `shard_key`, rendered as 24 dot-separated bits:
/// the routing key bound to the `accounts_in` exchange.
pub fn inbound_routing_key(debtor_id: i64, creditor_id: i64) -> String {
    let key = shard_key(debtor_id, creditor_id);
    (0..24)
        .map(|i| if key & (1 << (23 - i)) != 0 { '1' } else { '0' })
        .map(String::from)
        .collect::<Vec<_>>()
        .join(".")
}

/// A 16-hex-char dot-separated representation of a target account id,
/// used as the routing key on the three outbound exchanges
/// (`to_creditors`, `to_debtors`, `to_coordinators`) plus self-posting on
/// `accounts_in`.
pub fn outbound_routing_key(id: i64) -> String {
    format!("{:016x}", id as u64)
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_key_is_24_bits() {
        assert!(shard_key(1, 2) <= 0x00FF_FFFF);
    }

    #[test]
    fn inbound_routing_key_has_24_dot_separated_bits() {
        let key = inbound_routing_key(1, 2);
        let parts: Vec<_> = key.split('.').collect();
        assert_eq!(parts.len(), 24);
        assert!(parts.iter().all(|p| *p == "0" || *p == "1"));
    }

    #[test]
    fn outbound_routing_key_has_16_hex_chars() {
        let key = outbound_routing_key(255);
        let parts: Vec<_> = key.split('.').collect();
        assert_eq!(parts.len(), 16);
        assert_eq!(parts.last(), Some(&"f"));
    }

    #[test]
    fn outbound_routing_key_handles_negative_ids() {
        let key = outbound_routing_key(-1);
        assert_eq!(key.split('.').count(), 16);
        assert!(key.chars().all(|c| c == 'f' || c == '.'));
    }
}
