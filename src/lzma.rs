//! Raw LZMA1 streams with the fixed PAY by square filter parameters.
//!
//! The stream carries no container. Decoders need the same `lc`, `lp`, `pb`
//! and dictionary size, either agreed out of band or read from the 5-byte
//! properties header returned by [`properties`].
//!
//! liblzma is driven through its `.lzma` (alone) coder: the 13-byte alone
//! header is dropped after encoding and rebuilt before decoding.

use tracing::debug;
use xz2::stream::{Action, LzmaOptions, Status, Stream};

use crate::error::{Error, Result};

/// Literal context bits.
pub const LITERAL_CONTEXT_BITS: u32 = 3;
/// Literal position bits.
pub const LITERAL_POSITION_BITS: u32 = 0;
/// Position bits.
pub const POSITION_BITS: u32 = 2;
/// Dictionary size, 128 KiB.
pub const DICT_SIZE: u32 = 128 * 1024;

// Remaining match finder and mode settings come from this preset.
const PRESET: u32 = 6;

// Properties plus a 64-bit uncompressed size.
const ALONE_HEADER_LEN: usize = 13;

/// Returns the LZMA properties header: one byte `(pb * 5 + lp) * 9 + lc`
/// followed by the dictionary size in little-endian order.
pub fn properties() -> [u8; 5] {
    let props = ((POSITION_BITS * 5 + LITERAL_POSITION_BITS) * 9 + LITERAL_CONTEXT_BITS) as u8;
    let dict = DICT_SIZE.to_le_bytes();
    [props, dict[0], dict[1], dict[2], dict[3]]
}

fn options() -> Result<LzmaOptions> {
    let mut opts = LzmaOptions::new_preset(PRESET).map_err(|e| Error::Compression(e.to_string()))?;
    opts.literal_context_bits(LITERAL_CONTEXT_BITS)
        .literal_position_bits(LITERAL_POSITION_BITS)
        .position_bits(POSITION_BITS)
        .dict_size(DICT_SIZE);
    Ok(opts)
}

/// Header the alone decoder expects in front of a raw stream, with the
/// uncompressed size left unknown.
fn alone_header() -> [u8; ALONE_HEADER_LEN] {
    let mut header = [0xFF; ALONE_HEADER_LEN];
    header[..5].copy_from_slice(&properties());
    header
}

/// Compresses `data` into a raw LZMA1 stream terminated by an end marker.
///
/// # Errors
///
/// Returns [`Error::Compression`] if liblzma rejects the options. This
/// does not happen for any input with the fixed parameters above.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let compression = |e: xz2::stream::Error| Error::Compression(e.to_string());
    let mut stream = Stream::new_lzma_encoder(&options()?).map_err(compression)?;
    let mut out = Vec::with_capacity(data.len() + ALONE_HEADER_LEN + 64);
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }
        let consumed = stream.total_in() as usize;
        let status = stream
            .process_vec(&data[consumed..], &mut out, Action::Finish)
            .map_err(compression)?;
        if matches!(status, Status::StreamEnd) {
            break;
        }
    }
    if out.len() < ALONE_HEADER_LEN || out[..5] != properties() {
        return Err(Error::Compression("unexpected .lzma header from encoder".into()));
    }
    out.drain(..ALONE_HEADER_LEN);
    debug!(input = data.len(), output = out.len(), "lzma compressed");
    Ok(out)
}

/// Decompresses a raw LZMA1 stream.
///
/// Streams written without an end marker are accepted when `expected_len`
/// is given: decoding stops once that many bytes have been produced.
///
/// # Errors
///
/// Returns [`Error::Decompression`] for corrupt input or a stream that ends
/// before `expected_len` bytes.
pub fn decompress(data: &[u8], expected_len: Option<usize>) -> Result<Vec<u8>> {
    let decompression = |e: xz2::stream::Error| Error::Decompression(e.to_string());
    let mut stream = Stream::new_lzma_decoder(u64::MAX).map_err(decompression)?;
    let mut input = Vec::with_capacity(ALONE_HEADER_LEN + data.len());
    input.extend_from_slice(&alone_header());
    input.extend_from_slice(data);
    let data = input.as_slice();
    let mut out = Vec::with_capacity(expected_len.unwrap_or(data.len() * 4).max(64));
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }
        let consumed = stream.total_in() as usize;
        let before = out.len();
        let status = stream
            .process_vec(&data[consumed..], &mut out, Action::Run)
            .map_err(decompression)?;
        if matches!(status, Status::StreamEnd) {
            break;
        }
        if expected_len.is_some_and(|n| out.len() >= n) {
            break;
        }
        if out.len() == before && stream.total_in() as usize == consumed {
            return Err(Error::Decompression("stream ended without end marker".into()));
        }
    }
    if let Some(n) = expected_len {
        if out.len() < n {
            return Err(Error::LengthMismatch {
                expected: n,
                actual: out.len(),
            });
        }
        out.truncate(n);
    }
    Ok(out)
}
