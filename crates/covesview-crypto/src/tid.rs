use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Base32-sortkey alphabet used by AT Protocol TIDs.
const BASE32_SORTKEY: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";

/// TID (Timestamp Identifier) generator, used to mint record keys for
/// records this AppView composes on an actor's behalf before handing them to
/// that actor's data server.
///
/// Produces 13-character, monotonically increasing, base32-sortkey encoded
/// identifiers from `(microsecond_timestamp << 10 | clock_id)`.
pub struct TidGenerator {
    clock_id: u16,
    last: AtomicU64,
}

impl TidGenerator {
    /// Create a new TID generator with a random 10-bit clock ID.
    pub fn new() -> Self {
        let clock_id = (rand::random::<u16>()) & 0x03FF;
        Self {
            clock_id,
            last: AtomicU64::new(0),
        }
    }

    /// Generate the next TID.
    ///
    /// Guarantees monotonically increasing values even when called within
    /// the same microsecond by incrementing the stored timestamp.
    pub fn next_tid(&self) -> String {
        let now_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_micros() as u64;

        let candidate = (now_micros << 10) | (self.clock_id as u64);

        let value = loop {
            let last = self.last.load(Ordering::Acquire);
            let next = if candidate > last { candidate } else { last + 1 };
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break next,
                Err(_) => continue,
            }
        };

        encode_base32_sortkey(value)
    }
}

impl Default for TidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_base32_sortkey(mut value: u64) -> String {
    let mut buf = [0u8; 13];
    for i in (0..13).rev() {
        buf[i] = BASE32_SORTKEY[(value & 0x1F) as usize];
        value >>= 5;
    }
    String::from_utf8(buf.to_vec()).expect("base32-sortkey chars are valid UTF-8")
}
