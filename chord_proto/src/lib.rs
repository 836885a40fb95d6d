pub mod chord {
    tonic::include_proto!("chord");
}

/// Hashes an address or key string down to an identifier on the ring
/// `Z/2^m`. The digest is stable across processes (SHA-1, folded to a
/// `u64`) and is masked to the low `m` bits so every ring parameter from
/// `m = 1` to `m = 64` draws from the same underlying hash.
pub fn hash_id(s: &str, m: u32) -> u64 {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    let full = u64::from_be_bytes(bytes);
    mask(full, m)
}

/// Masks an identifier down to the low `m` bits of the ring. `m = 64` is
/// the identity (shifting by 64 is undefined for `u64`).
pub fn mask(id: u64, m: u32) -> u64 {
    if m >= 64 {
        id
    } else {
        id & ((1u64 << m) - 1)
    }
}
