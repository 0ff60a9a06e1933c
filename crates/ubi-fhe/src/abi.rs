//! ABI layout of decrypted clear values.
//!
//! Each value occupies one 32-byte big-endian word, in the order of the
//! handle list it was decrypted from.

use crate::error::FheError;

/// Width of one ABI word.
pub const WORD: usize = 32;

/// Encode `u32` clear values as consecutive ABI words.
pub fn encode_u32s(values: &[u32]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * WORD];
    for (i, v) in values.iter().enumerate() {
        out[(i + 1) * WORD - 4..(i + 1) * WORD].copy_from_slice(&v.to_be_bytes());
    }
    out
}

/// Decode consecutive ABI words as `u32` values.
///
/// Rejects trailing bytes and words whose value does not fit in 32 bits.
pub fn decode_u32s(bytes: &[u8]) -> Result<Vec<u32>, FheError> {
    if bytes.len() % WORD != 0 {
        return Err(FheError::Abi(format!(
            "length {} is not a multiple of {WORD}",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(WORD)
        .enumerate()
        .map(|(i, word)| {
            if word[..WORD - 4].iter().any(|b| *b != 0) {
                return Err(FheError::Abi(format!("word {i} overflows uint32")));
            }
            let mut be = [0u8; 4];
            be.copy_from_slice(&word[WORD - 4..]);
            Ok(u32::from_be_bytes(be))
        })
        .collect()
}

/// Decode exactly one `u32` clear value.
pub fn decode_single_u32(bytes: &[u8]) -> Result<u32, FheError> {
    match decode_u32s(bytes)?.as_slice() {
        [v] => Ok(*v),
        other => Err(FheError::Abi(format!(
            "expected exactly one value, got {}",
            other.len()
        ))),
    }
}
