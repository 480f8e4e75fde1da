use rand::Rng;

pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Longest code `is_well_formed` accepts.
pub const MAX_CODE_LENGTH: usize = 64;

const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Draws `length` symbols uniformly from `[a-z0-9]`.
///
/// No uniqueness is checked here; a zero length yields an empty string and
/// callers are expected to reject it.
pub fn generate(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Whether `code` could have come from `generate`: 1 to `MAX_CODE_LENGTH`
/// symbols of `[a-z0-9]`.
pub fn is_well_formed(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}
