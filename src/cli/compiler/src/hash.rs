/* src/cli/compiler/src/hash.rs */

use sha2::{Digest, Sha256};

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Standard FNV-1a 32-bit hash.
pub(crate) fn fnv1a_32(input: &str) -> u32 {
  let mut hash = FNV_OFFSET;
  for byte in input.bytes() {
    hash ^= u32::from(byte);
    hash = hash.wrapping_mul(FNV_PRIME);
  }
  hash
}

/// Lowercase base-36 rendering of a 32-bit value (at most 7 chars).
pub(crate) fn base36(mut value: u32) -> String {
  const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
  if value == 0 {
    return "0".to_string();
  }
  let mut buf = Vec::with_capacity(7);
  while value > 0 {
    buf.push(DIGITS[(value % 36) as usize]);
    value /= 36;
  }
  buf.reverse();
  String::from_utf8_lossy(&buf).into_owned()
}

/// Short class-name suffix for a (file, class) pair.
pub(crate) fn short_hash(input: &str) -> String {
  base36(fnv1a_32(input))
}

/// Hex SHA-256 of the concatenated parts, NUL-separated so that
/// `("ab", "c")` and `("a", "bc")` differ.
pub(crate) fn sha256_hex(parts: &[&str]) -> String {
  let mut hasher = Sha256::new();
  for (i, part) in parts.iter().enumerate() {
    if i > 0 {
      hasher.update([0u8]);
    }
    hasher.update(part.as_bytes());
  }
  hex::encode(hasher.finalize())
}
