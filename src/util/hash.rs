//! Username hashing for registration

/// 32-bit polymorphic hash over UTF-16 code units: `h = h * 31 + unit`,
/// wrapping. This is the id the server knows the player by.
pub fn username_hash(name: &str) -> u32 {
    name.encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)))
}
