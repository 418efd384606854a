/*!

Fast, deterministic hashing for internal maps. The keys we hash (`TypeId`s, `EntityId`s, short
names) are not attacker controlled, so we trade DoS resistance for speed with `rustc_hash`.

*/

use std::hash::Hasher;

pub use rustc_hash::FxHasher;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Hashes a string slice, for deriving per-stream seeds from a base seed. The result is the same
/// from run to run of one build, which is what seeded runs rely on. `rustc_hash` does not promise
/// the same value across pointer widths or crate versions, so seeds only reproduce a run on the
/// same target with the same dependency versions.
pub fn hash_str(data: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_str_is_stable() {
        assert_eq!(hash_str("EventRng"), hash_str("EventRng"));
        assert_ne!(hash_str("EventRng"), hash_str("OtherRng"));
    }
}
