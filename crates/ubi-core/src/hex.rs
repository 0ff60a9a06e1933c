//! Lowercase hex codec with optional `0x` prefix.

use crate::error::UbiError;

/// Render bytes as lowercase hex, without prefix.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Render bytes as lowercase hex with a `0x` prefix.
pub fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", encode(bytes))
}

/// Decode a hex string. A leading `0x`/`0X` is accepted and stripped.
pub fn decode(s: &str) -> Result<Vec<u8>, UbiError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(UbiError::InvalidIdentifier(format!(
            "odd-length hex string ({} chars)",
            s.len()
        )));
    }
    s.as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(UbiError::InvalidIdentifier(format!(
                "invalid hex at offset {}",
                i * 2
            ))),
        })
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode a hex string into a fixed-width array.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], UbiError> {
    let bytes = decode(s)?;
    if bytes.len() != N {
        return Err(UbiError::InvalidIdentifier(format!(
            "expected {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
