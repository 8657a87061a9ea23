//! CRC32 framing of the serialized payment record.

use crate::error::{Error, Result};

/// Length of the little-endian checksum in bytes.
pub const CHECKSUM_LEN: usize = 4;

/// Standard CRC32 (IEEE 802.3 polynomial, reflected, final XOR).
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Returns `data` followed by its CRC32 in little-endian order.
pub fn append_checksum(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(data).to_le_bytes());
    out
}

/// Returns the CRC32 of `data` in little-endian order followed by `data`.
pub fn prepend_checksum(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    out.extend_from_slice(&crc32(data).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// Splits a payload produced by [`append_checksum`] and verifies it.
pub fn strip_appended_checksum(data: &[u8]) -> Result<&[u8]> {
    let split = data
        .len()
        .checked_sub(CHECKSUM_LEN)
        .ok_or(Error::InvalidHeader("payload shorter than its checksum"))?;
    let (payload, stored) = data.split_at(split);
    verify(payload, stored)?;
    Ok(payload)
}

/// Splits a payload produced by [`prepend_checksum`] and verifies it.
pub fn strip_prepended_checksum(data: &[u8]) -> Result<&[u8]> {
    if data.len() < CHECKSUM_LEN {
        return Err(Error::InvalidHeader("payload shorter than its checksum"));
    }
    let (stored, payload) = data.split_at(CHECKSUM_LEN);
    verify(payload, stored)?;
    Ok(payload)
}

fn verify(payload: &[u8], stored: &[u8]) -> Result<()> {
    let mut le = [0u8; CHECKSUM_LEN];
    le.copy_from_slice(stored);
    let expected = u32::from_le_bytes(le);
    let actual = crc32(payload);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_append_layout() {
        let out = append_checksum(b"123456789");
        assert_eq!(&out[..9], b"123456789");
        assert_eq!(&out[9..], &[0x26, 0x39, 0xF4, 0xCB]);
        assert_eq!(strip_appended_checksum(&out).unwrap(), b"123456789");
    }

    #[test]
    fn test_prepend_layout() {
        let out = prepend_checksum(b"123456789");
        assert_eq!(&out[..4], &[0x26, 0x39, 0xF4, 0xCB]);
        assert_eq!(&out[4..], b"123456789");
        assert_eq!(strip_prepended_checksum(&out).unwrap(), b"123456789");
    }

    #[test]
    fn test_detects_corruption() {
        let mut out = append_checksum(b"\t1\t1\t15.00\tEUR");
        out[3] ^= 0x01;
        assert!(matches!(
            strip_appended_checksum(&out),
            Err(Error::ChecksumMismatch { .. })
        ));
        assert!(matches!(
            strip_prepended_checksum(&[1, 2]),
            Err(Error::InvalidHeader(_))
        ));
    }
}
