//! Collision-resistant random ids.
//!
//! A cuid2-style id: one random lowercase letter (so ids never start with a
//! digit) followed by base-36 digits of a SHA-256 digest over the current
//! time, a process-wide counter, a per-process fingerprint and fresh random
//! salt. No state is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Length of every cuid.
pub const CUID_LEN: usize = 24;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn fingerprint() -> &'static [u8; 32] {
    static FINGERPRINT: OnceLock<[u8; 32]> = OnceLock::new();
    FINGERPRINT.get_or_init(|| {
        let mut hasher = Sha256::new();
        hasher.update(std::process::id().to_be_bytes());
        hasher.update(Uuid::new_v4().as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    })
}

/// Generates a new cuid.
#[must_use]
pub fn new_cuid() -> String {
    let mut rng = rand::thread_rng();

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt: [u8; 32] = rng.gen();

    let mut hasher = Sha256::new();
    hasher.update(millis.to_be_bytes());
    hasher.update(count.to_be_bytes());
    hasher.update(fingerprint());
    hasher.update(salt);
    let digest = hasher.finalize();

    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    let mut n = u128::from_be_bytes(head);

    let mut id = String::with_capacity(CUID_LEN);
    id.push(char::from(b'a' + rng.gen_range(0..26u8)));
    for _ in 1..CUID_LEN {
        id.push(char::from(BASE36[(n % 36) as usize]));
        n /= 36;
    }
    id
}
