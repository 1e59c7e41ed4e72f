//! Bucket key derivation.
//!
//! The key must be deterministic across processes and restarts — instances
//! share a backend — so it is a hash of a canonical serialization, not
//! anything address-dependent.

use sha1::{Digest, Sha1};

use crate::operation::Operation;

/// Derive the bucket key for a projected operation, actor, and owning rule.
///
/// Canonicalization: projected labels are sorted by key, then `|actor=<actor>`
/// is appended, then the rule's own declared-operation shape (its section
/// header, reconstructed from its patterns) is mixed in as a discriminator
/// so two rules with different shapes but identical projections don't
/// collide.
pub fn bucket_key(projected: &Operation, actor: &str, rule_discriminator: &str) -> Vec<u8> {
    let mut labels: Vec<(&str, &str)> = projected.iter().collect();
    labels.sort_unstable_by_key(|(k, _)| *k);

    let mut canonical = String::new();
    for (k, v) in labels {
        canonical.push_str(k);
        canonical.push('=');
        canonical.push_str(v);
        canonical.push('&');
    }
    canonical.push_str("|actor=");
    canonical.push_str(actor);
    canonical.push_str("|rule=");
    canonical.push_str(rule_discriminator);

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> Vec<u8> {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = Vec::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0x0f) as usize]);
    }
    out
}
