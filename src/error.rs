/// Errors produced while building, encoding, decoding or rendering a payment code.
///
/// No stage returns partial output: an error anywhere in the chain aborts the
/// whole operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The amount is not a finite decimal number.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    /// The LZMA encoder rejected its configuration or input.
    #[error("LZMA compression failed: {0}")]
    Compression(String),

    /// The LZMA stream could not be decoded.
    #[error("LZMA decompression failed: {0}")]
    Decompression(String),

    /// The checksummed payload does not fit the 16-bit length field.
    #[error("payload has {0} bytes, the frame length field holds at most 65535")]
    PayloadTooLarge(usize),

    /// A character outside the Base32Hex alphabet.
    #[error("invalid Base32Hex symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    /// The frame header is truncated or carries an unsupported type.
    #[error("invalid frame header: {0}")]
    InvalidHeader(&'static str),

    /// The decompressed payload length differs from the length stored in the header.
    #[error("payload length is {actual}, header declares {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The stored CRC32 does not match the payload.
    #[error("checksum mismatch, expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// The decoded text is not a 19-field payment record.
    #[error("malformed payment record: {0}")]
    MalformedRecord(String),

    /// The QR library could not fit or encode the text.
    #[error("QR render failed: {0}")]
    QrRender(#[from] qrcode::types::QrError),

    /// Box size and border give an image too large to allocate.
    #[error("image of {modules} modules at {box_size} px with a {border}-module border is too large")]
    ImageTooLarge { modules: u32, box_size: u32, border: u32 },

    /// The raster could not be encoded as PNG.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// Writing a rendered image failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The company registry transport failed.
    #[error("company registry request failed: {0}")]
    Registry(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
