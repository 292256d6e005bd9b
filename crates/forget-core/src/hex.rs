//! Strict lowercase hex encoding.
//!
//! Decoding rejects uppercase digits so that every byte string has exactly
//! one textual form. A single flipped character in a serialized proof can
//! never decode to the same bytes.

use crate::error::ValidationError;

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decode lowercase hex into bytes.
pub fn decode(s: &str) -> Result<Vec<u8>, ValidationError> {
    if s.len() % 2 != 0 {
        return Err(ValidationError::InvalidHex(format!(
            "odd length {}",
            s.len()
        )));
    }
    s.as_bytes()
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = nibble(pair[0]).ok_or_else(|| bad_digit(i * 2, pair[0]))?;
            let lo = nibble(pair[1]).ok_or_else(|| bad_digit(i * 2 + 1, pair[1]))?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

/// Decode lowercase hex into a fixed-size array.
pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], ValidationError> {
    let bytes = decode(s)?;
    if bytes.len() != N {
        return Err(ValidationError::InvalidHex(format!(
            "expected {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// First four bytes as hex, for redacted `Debug` output.
pub fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn bad_digit(pos: usize, c: u8) -> ValidationError {
    ValidationError::InvalidHex(format!("invalid digit {:?} at position {pos}", c as char))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known() {
        assert_eq!(encode(&[0x00, 0xff, 0x92, 0x0a]), "00ff920a");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_roundtrip() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_uppercase() {
        assert!(decode("FF").is_err());
        assert!(decode("aB").is_err());
    }

    #[test]
    fn test_decode_rejects_odd_length_and_garbage() {
        assert!(decode("abc").is_err());
        assert!(decode("zz").is_err());
        assert!(decode("0x").is_err());
    }

    #[test]
    fn test_decode_array_length_checked() {
        assert!(decode_array::<2>("0011").is_ok());
        assert!(decode_array::<2>("001122").is_err());
    }

    #[test]
    fn test_prefix_short_input() {
        assert_eq!(prefix(&[1, 2]), "0102");
        assert_eq!(prefix(&[1, 2, 3, 4, 5]), "01020304");
    }
}
