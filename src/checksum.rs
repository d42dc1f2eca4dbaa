//! Single-byte XOR checksum.
//!
//! The checksum is the XOR of every frame byte except the checksum itself.
//! Verification folds the stored checksum in complemented and XORs the rest
//! of the frame; an intact frame reduces to `0xFF`.
//!
//! This catches any single-bit error and most multi-bit errors a noisy
//! channel produces.  It is not a cryptographic integrity check.

/// Value an intact frame reduces to under [`verify`].
pub const VALID: u8 = 0xFF;

/// XOR of all bytes in `data`.
///
/// `data` must not include the checksum byte.
pub fn compute(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Check a serialised frame whose first byte is the checksum.
///
/// Returns `false` for an empty buffer.
pub fn verify(frame: &[u8]) -> bool {
    match frame.split_first() {
        Some((checksum, rest)) => !checksum ^ compute(rest) == VALID,
        None => false,
    }
}
