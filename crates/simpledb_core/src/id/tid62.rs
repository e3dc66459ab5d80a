//! Time-sortable ids in base62.
//!
//! Layout: 4 bytes of seconds since [`TID62_EPOCH`] (big-endian) followed by
//! 8 random bytes, read as one 96-bit big-endian integer and written in
//! base62, zero-padded to [`TID62_LEN`] characters. Because the timestamp
//! occupies the most significant bytes and the width is fixed, string order
//! matches creation order at one-second granularity.

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// 2020-01-01 00:00:00 UTC.
pub const TID62_EPOCH: u64 = 1_577_836_800;

/// Digit alphabet; index is digit value.
pub const TID62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of every tid62 id.
pub const TID62_LEN: usize = 17;

/// Generates a tid62 id for the current time.
#[must_use]
pub fn new_tid62() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    tid62_at(now)
}

/// Generates a tid62 id for the given Unix time in seconds.
///
/// Times before the epoch clamp to zero; times past the 32-bit range clamp
/// to the maximum.
#[must_use]
pub fn tid62_at(unix_secs: u64) -> String {
    let mut buf = [0u8; 12];

    let ts = u32::try_from(unix_secs.saturating_sub(TID62_EPOCH)).unwrap_or(u32::MAX);
    buf[0..4].copy_from_slice(&ts.to_be_bytes());
    OsRng.fill_bytes(&mut buf[4..12]);

    encode_tid62(&buf)
}

/// Generates `"{prefix}-{tid62}"`.
#[must_use]
pub fn tid62_with_prefix(prefix: &str) -> String {
    format!("{prefix}-{}", new_tid62())
}

/// Encodes 12 bytes as a fixed-width base62 string.
#[must_use]
pub fn encode_tid62(bytes: &[u8; 12]) -> String {
    let mut wide = [0u8; 16];
    wide[4..].copy_from_slice(bytes);
    let mut n = u128::from_be_bytes(wide);

    // least significant digit first
    let mut digits = Vec::with_capacity(TID62_LEN);
    while n > 0 {
        digits.push(TID62_ALPHABET[(n % 62) as usize]);
        n /= 62;
    }
    while digits.len() < TID62_LEN {
        digits.push(TID62_ALPHABET[0]);
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

/// Returns the Unix time in seconds embedded in a tid62 id.
///
/// Returns `None` if `id` is not a well-formed tid62 id. A
/// `"{prefix}-{tid62}"` id is accepted; the prefix is ignored.
#[must_use]
pub fn tid62_timestamp(id: &str) -> Option<u64> {
    let tid = id.rsplit('-').next()?;
    if tid.len() != TID62_LEN {
        return None;
    }

    let mut n: u128 = 0;
    for b in tid.bytes() {
        let digit = TID62_ALPHABET.iter().position(|&a| a == b)?;
        n = n.checked_mul(62)?.checked_add(digit as u128)?;
    }
    if n >> 96 != 0 {
        return None;
    }

    let ts = (n >> 64) as u32;
    Some(TID62_EPOCH + u64::from(ts))
}
