//! Binary framing of a compressed payment record.
//!
//! Three layouts are in circulation for PAY by square codes. [`Framing::BySquare`]
//! is the published one and the default; the others are kept for reading and
//! producing codes made by older generators.
//!
//! ```text
//! BySquare        [type|version][doctype|reserved][len u16 LE] LZMA( crc32 LE | record )
//! LengthPrefixed  [len u16 LE]                                 LZMA( record | crc32 LE )
//! LzmaProperties  [len u16 LE][props 5B]                       LZMA( record | crc32 LE )
//! ```
//!
//! `len` is always the length of the checksummed record before compression.

use tracing::debug;

use crate::checksum;
use crate::error::{Error, Result};
use crate::lzma;

/// Layout of the bytes that precede and wrap the LZMA stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Framing {
    /// Two header bytes, a 16-bit length, then the compressed
    /// checksum-first payload.
    #[default]
    BySquare,
    /// A 16-bit length followed by the compressed checksum-last payload.
    LengthPrefixed,
    /// Like [`Framing::LengthPrefixed`] with the 5-byte LZMA properties
    /// header between the length and the stream.
    LzmaProperties,
}

/// The two leading bytes of a [`Framing::BySquare`] frame, one nibble each.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Header {
    /// 0 for PAY by square.
    pub by_square_type: u8,
    /// 0 for version 1.0.0, 1 for 1.1.0.
    pub version: u8,
    /// 0 for a payment order.
    pub document_type: u8,
    pub reserved: u8,
}

impl Header {
    /// Packs the four nibbles into two bytes.
    pub fn to_bytes(self) -> [u8; 2] {
        [
            (self.by_square_type & 0x0F) << 4 | (self.version & 0x0F),
            (self.document_type & 0x0F) << 4 | (self.reserved & 0x0F),
        ]
    }

    /// Unpacks the four nibbles.
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            by_square_type: bytes[0] >> 4,
            version: bytes[0] & 0x0F,
            document_type: bytes[1] >> 4,
            reserved: bytes[1] & 0x0F,
        }
    }
}

/// Checksums, compresses and frames a serialized record.
///
/// # Errors
///
/// Returns [`Error::PayloadTooLarge`] if the checksummed record exceeds the
/// 16-bit length field, or [`Error::Compression`] from the LZMA encoder.
pub fn pack(record: &[u8], framing: Framing, header: Header) -> Result<Vec<u8>> {
    let checksummed = match framing {
        Framing::BySquare => checksum::prepend_checksum(record),
        Framing::LengthPrefixed | Framing::LzmaProperties => checksum::append_checksum(record),
    };
    let len = u16::try_from(checksummed.len()).map_err(|_| Error::PayloadTooLarge(checksummed.len()))?;
    let compressed = lzma::compress(&checksummed)?;

    let mut out = Vec::with_capacity(compressed.len() + 9);
    if framing == Framing::BySquare {
        out.extend_from_slice(&header.to_bytes());
    }
    out.extend_from_slice(&len.to_le_bytes());
    if framing == Framing::LzmaProperties {
        out.extend_from_slice(&lzma::properties());
    }
    out.extend_from_slice(&compressed);
    debug!(?framing, record = record.len(), frame = out.len(), "packed payment record");
    Ok(out)
}

/// Reverses [`pack`], returning the verified record bytes and the header
/// (the default header for framings without one).
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] for truncated frames, unknown document
/// types or a foreign properties header, [`Error::LengthMismatch`] or
/// [`Error::Decompression`] for a damaged stream and
/// [`Error::ChecksumMismatch`] if the CRC does not match.
pub fn unpack(frame: &[u8], framing: Framing) -> Result<(Vec<u8>, Header)> {
    let mut rest = frame;
    let header = if framing == Framing::BySquare {
        let bytes = take::<2>(&mut rest)?;
        let header = Header::from_bytes(bytes);
        if header.by_square_type != 0 || header.document_type != 0 {
            return Err(Error::InvalidHeader("not a PAY by square payment order"));
        }
        header
    } else {
        Header::default()
    };
    let len = usize::from(u16::from_le_bytes(take::<2>(&mut rest)?));
    if framing == Framing::LzmaProperties && take::<5>(&mut rest)? != lzma::properties() {
        return Err(Error::InvalidHeader("unsupported LZMA properties"));
    }

    let checksummed = lzma::decompress(rest, Some(len))?;
    let record = match framing {
        Framing::BySquare => checksum::strip_prepended_checksum(&checksummed)?,
        Framing::LengthPrefixed | Framing::LzmaProperties => {
            checksum::strip_appended_checksum(&checksummed)?
        }
    };
    Ok((record.to_vec(), header))
}

fn take<const N: usize>(rest: &mut &[u8]) -> Result<[u8; N]> {
    if rest.len() < N {
        return Err(Error::InvalidHeader("frame is truncated"));
    }
    let (head, tail) = rest.split_at(N);
    *rest = tail;
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok(out)
}
