use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Room codes draw from a 31-character alphabet with the lookalikes
/// (0/O, 1/I/L) removed, so codes survive being read aloud.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 4;

/// Get current timestamp in milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Nanosecond-resolution timestamp used to seed a room's RNG stream from its
/// creation moment.
pub fn creation_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos() as u64
}

/// Mint a candidate room code. Uniqueness is the registry's job.
pub fn random_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Mint an opaque reconnect token for one session.
pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_no_lookalikes() {
        assert_eq!(ROOM_CODE_ALPHABET.len(), 31);
        for c in [b'0', b'O', b'1', b'I', b'L'] {
            assert!(!ROOM_CODE_ALPHABET.contains(&c));
        }
    }

    #[test]
    fn room_codes_use_the_alphabet() {
        for _ in 0..50 {
            let code = random_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn tokens_are_distinct() {
        assert_ne!(random_token(), random_token());
    }
}
