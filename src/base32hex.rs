//! Base32Hex (RFC 4648 extended hex alphabet) without padding characters.
//!
//! The input is one big-endian bit stream, cut into 5-bit groups from the
//! most significant bit. The last group is filled with zero bits.

use crate::error::{Error, Result};

/// The 32 output symbols, indexed by group value.
pub const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";

/// Number of zero bits appended so that `bit_len` becomes a multiple of five.
pub const fn padding_bits(bit_len: usize) -> usize {
    (5 - bit_len % 5) % 5
}

/// Encodes bytes as Base32Hex text. Empty input gives an empty string.
///
/// # Example
///
/// ```rust
/// use paybysquare::base32hex;
///
/// assert_eq!(base32hex::encode(b"foobar"), "CPNMUOJ1E8");
/// ```
pub fn encode(data: &[u8]) -> String {
    let bit_len = data.len() * 8;
    let mut out = String::with_capacity((bit_len + padding_bits(bit_len)) / 5);
    let mut accum: u32 = 0;
    let mut accum_bits: u8 = 0;
    for &byte in data {
        accum = (accum << 8) | u32::from(byte);
        accum_bits += 8;
        while accum_bits >= 5 {
            accum_bits -= 5;
            out.push(symbol(accum >> accum_bits));
        }
        accum &= (1 << accum_bits) - 1;
    }
    if accum_bits > 0 {
        out.push(symbol(accum << (5 - accum_bits)));
    }
    out
}

/// Decodes Base32Hex text, ignoring case.
///
/// Bits left over after the last whole byte are the encoder's padding and
/// are dropped.
///
/// # Errors
///
/// Returns [`Error::InvalidSymbol`] for a character outside the alphabet.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let mut buffer = BitBuffer::with_capacity(text.len() * 5 / 8);
    for (position, c) in text.chars().enumerate() {
        let value = value_of(c).ok_or(Error::InvalidSymbol { symbol: c, position })?;
        buffer.append_bits(value, 5);
    }
    Ok(buffer.into_bytes())
}

fn symbol(group: u32) -> char {
    char::from(ALPHABET[(group & 0x1F) as usize])
}

fn value_of(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'A'..='V' => Some(c as u8 - b'A' + 10),
        'a'..='v' => Some(c as u8 - b'a' + 10),
        _ => None,
    }
}

/// Appends bit groups MSB first and keeps only whole bytes.
struct BitBuffer {
    data: Vec<u8>,
    accum: u16,
    accum_bits: u8,
}

impl BitBuffer {
    fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            accum: 0,
            accum_bits: 0,
        }
    }

    fn append_bits(&mut self, val: u8, len: u8) {
        debug_assert!(len <= 8 && u16::from(val) >> len == 0);
        self.accum = (self.accum << len) | u16::from(val);
        self.accum_bits += len;
        if self.accum_bits >= 8 {
            self.accum_bits -= 8;
            self.data.push((self.accum >> self.accum_bits) as u8);
            self.accum &= (1 << self.accum_bits) - 1;
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rfc4648_vectors() {
        let cases: [(&[u8], &str); 7] = [
            (b"", ""),
            (b"f", "CO"),
            (b"fo", "CPNG"),
            (b"foo", "CPNMU"),
            (b"foob", "CPNMUOG"),
            (b"fooba", "CPNMUOJ1"),
            (b"foobar", "CPNMUOJ1E8"),
        ];
        for (raw, text) in cases {
            assert_eq!(encode(raw), text);
            assert_eq!(decode(text).unwrap(), raw);
        }
    }

    #[test]
    fn test_padding_bits() {
        assert_eq!(padding_bits(0), 0);
        assert_eq!(padding_bits(8), 2);
        assert_eq!(padding_bits(16), 4);
        assert_eq!(padding_bits(24), 1);
        assert_eq!(padding_bits(32), 3);
        assert_eq!(padding_bits(40), 0);
    }

    #[test]
    fn test_single_bytes() {
        assert_eq!(encode(&[0x00]), "00");
        assert_eq!(encode(&[0xFF]), "VS");
        assert_eq!(encode(&[0x80]), "G0");
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        assert_eq!(decode("cpnmuoj1e8").unwrap(), b"foobar");
    }

    #[test]
    fn test_decode_rejects_foreign_symbols() {
        match decode("CPNW") {
            Err(Error::InvalidSymbol { symbol, position }) => {
                assert_eq!(symbol, 'W');
                assert_eq!(position, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(decode("CO=").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Decoding an encoded byte string returns the original bytes.
        #[test]
        fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 0..300)) {
            let text = encode(&data);
            prop_assert_eq!(text.len(), (data.len() * 8 + 4) / 5);
            prop_assert_eq!(decode(&text).unwrap(), data);
        }
    }
}
