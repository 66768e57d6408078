//! Deterministic rollout bucketing.
//!
//! Buckets must agree across replicas and across builds, so the hash is a
//! fixed 32-bit FNV-1a rather than `std`'s randomly seeded hashers.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Number of buckets; percentages map directly onto bucket indices.
pub const BUCKETS: u32 = 100;

pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Stable bucket in `0..100` for an evaluation key. The empty key hashes to
/// the offset basis and lands in bucket 61.
pub fn bucket(evaluation_key: &str) -> u8 {
    (fnv1a(evaluation_key.as_bytes()) % BUCKETS) as u8
}

/// `bucket < percentage`, with 0 and 100 decided without hashing.
pub fn in_rollout(evaluation_key: &str, percentage: u8) -> bool {
    match percentage {
        0 => false,
        p if p >= 100 => true,
        p => bucket(evaluation_key) < p,
    }
}
