//! Fixed-width hexadecimal identifiers.
//!
//! Protocol identifiers travel as ASCII hex inside XML text nodes. A token
//! must carry at least `2 * out.len()` hex digits; only that prefix is
//! decoded, the caller decides what trailing characters are acceptable.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexIdError {
    #[error("identifier '{token}' is too short: expected {expected} hex digits, got {actual}")]
    TooShort {
        token: String,
        expected: usize,
        actual: usize,
    },

    #[error("identifier '{0}' contains non hexadecimal characters")]
    InvalidDigit(String),
}

/// Decodes the first `2 * out.len()` hex digits of `token` into `out`.
pub fn hex_to_bytes(token: &str, out: &mut [u8]) -> Result<(), HexIdError> {
    let expected = out.len() * 2;
    if token.len() < expected {
        return Err(HexIdError::TooShort {
            token: token.to_string(),
            expected,
            actual: token.len(),
        });
    }

    let prefix = token
        .get(..expected)
        .ok_or_else(|| HexIdError::InvalidDigit(token.to_string()))?;

    hex::decode_to_slice(prefix, out).map_err(|_| HexIdError::InvalidDigit(token.to_string()))
}

/// Lower-case hex rendering, used for logging and `Display` impls.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_exact_width() {
        let mut out = [0u8; 4];
        hex_to_bytes("deadBEEF", &mut out).unwrap();
        assert_eq!(out, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_decode_ignores_trailing_digits() {
        let mut out = [0u8; 2];
        hex_to_bytes("cafe01", &mut out).unwrap();
        assert_eq!(out, [0xca, 0xfe]);
    }

    #[test]
    fn test_short_token_is_rejected() {
        let mut out = [0u8; 16];
        let err = hex_to_bytes("abcd", &mut out).unwrap_err();
        assert!(matches!(
            err,
            HexIdError::TooShort {
                expected: 32,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_digit_is_rejected() {
        let mut out = [0u8; 2];
        assert!(matches!(
            hex_to_bytes("zz00", &mut out),
            Err(HexIdError::InvalidDigit(_))
        ));
    }

    #[test]
    fn test_multibyte_prefix_is_rejected() {
        let mut out = [0u8; 2];
        assert!(hex_to_bytes("éé00", &mut out).is_err());
    }

    #[test]
    fn test_bytes_to_hex() {
        assert_eq!(bytes_to_hex(&[0x00, 0x1f, 0xa0]), "001fa0");
    }
}
