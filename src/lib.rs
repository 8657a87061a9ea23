//! # paybysquare
//!
//! A Rust library for generating PAY by square payment QR codes, the standard
//! used by Slovak banking apps to prefill a payment from an invoice.
//!
//! A payment order goes through a fixed chain of stages, each consuming the
//! exact output of the previous one:
//!
//! ```text
//! PaymentOrder -> tab-delimited record -> CRC32 -> LZMA1 + frame header -> Base32Hex -> QR image
//! ```
//!
//! ## Features
//!
//! - Build the 19-field payment record with IBAN normalization and field truncation.
//! - Byte-exact framing: CRC32, raw LZMA1 (`lc=3 lp=0 pb=2`, 128 KiB dictionary), Base32Hex.
//! - Decode existing codes back into their payment record.
//! - Render codes as PNG data URIs, PNG files, SVG or terminal art.
//! - SEPA (EPC) QR payloads for foreign banking apps.
//! - Company lookup by IČO with a TTL cache and a pluggable registry transport.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! paybysquare = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Encode an invoice payment and decode it again:
//!
//! ```rust
//! use paybysquare::{decode_payment, encode_payment_string, Field, Framing, PaymentOrder};
//!
//! let order = PaymentOrder {
//!     amount: "15.00".parse().unwrap(),
//!     iban: "SK2111000000002943281214".into(),
//!     variable_symbol: "20260001".into(),
//!     due_date: "20260215".into(),
//!     beneficiary_name: "Test s.r.o.".into(),
//!     ..PaymentOrder::default()
//! };
//! let text = encode_payment_string(&order).unwrap();
//! let record = decode_payment(&text, Framing::BySquare).unwrap();
//! assert_eq!(record.get(Field::Amount), "15.00");
//! ```
//!
//! Generate an image for an HTML template:
//!
//! ```rust
//! use paybysquare::{encode_payment_qr, PaymentOrder};
//!
//! let order = PaymentOrder {
//!     amount: "99.90".parse().unwrap(),
//!     iban: "SK21 1100 0000 0029 4328 1214".into(),
//!     ..PaymentOrder::default()
//! };
//! let uri = encode_payment_qr(&order).unwrap();
//! assert!(uri.starts_with("data:image/png;base64,"));
//! ```
//!
//! ## Modules
//!
//! - [`payment`]: Payment orders and the positional record.
//! - [`checksum`], [`lzma`], [`frame`], [`base32hex`]: The codec stages.
//! - [`render`]: QR rendering to PNG, SVG and text.
//! - [`sepa`]: EPC QR payloads.
//! - [`company`]: Registry lookup of company details.

pub mod amount;
pub mod base32hex;
pub mod checksum;
pub mod company;
pub mod error;
pub mod frame;
pub mod lzma;
pub mod payment;
pub mod render;
pub mod sepa;

pub use amount::Amount;
pub use error::{Error, Result};
pub use frame::{Framing, Header};
pub use payment::{Field, PaymentOrder, PaymentRecord};
pub use render::{QrCodeEcc, RenderOptions};

use tracing::{debug, warn};

/// Encoding choices that change the produced bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct EncodeOptions {
    pub framing: Framing,
    pub header: Header,
}

/// Encodes a payment order into PAY by square text with the default framing.
///
/// # Errors
///
/// Returns [`Error::PayloadTooLarge`] or [`Error::Compression`]; no partial
/// text is ever returned.
pub fn encode_payment_string(order: &PaymentOrder) -> Result<String> {
    encode_payment_string_with(order, &EncodeOptions::default())
}

/// Encodes a payment order into PAY by square text.
pub fn encode_payment_string_with(order: &PaymentOrder, opts: &EncodeOptions) -> Result<String> {
    let record = PaymentRecord::build(order).serialize();
    let frame = frame::pack(record.as_bytes(), opts.framing, opts.header)?;
    let text = base32hex::encode(&frame);
    debug!(record = record.len(), frame = frame.len(), text = text.len(), "encoded payment");
    Ok(text)
}

/// Encodes a payment order and renders it as a PNG data URI
/// (`data:image/png;base64,...`) with error correction level M.
///
/// # Errors
///
/// Any encoding error, [`Error::QrRender`] if the text does not fit a QR
/// code, or [`Error::Image`] if PNG encoding fails.
pub fn encode_payment_qr(order: &PaymentOrder) -> Result<String> {
    let text = encode_payment_string(order)?;
    render::render_data_uri(&text, &RenderOptions::default())
}

/// Decodes PAY by square text into its payment record.
///
/// # Errors
///
/// Returns [`Error::InvalidSymbol`], [`Error::InvalidHeader`],
/// [`Error::Decompression`], [`Error::LengthMismatch`],
/// [`Error::ChecksumMismatch`] or [`Error::MalformedRecord`].
pub fn decode_payment(text: &str, framing: Framing) -> Result<PaymentRecord> {
    let frame = base32hex::decode(text.trim())?;
    let (record, _header) = frame::unpack(&frame, framing)?;
    let record = String::from_utf8(record)
        .map_err(|e| Error::MalformedRecord(format!("record is not UTF-8: {e}")))?;
    PaymentRecord::parse(&record)
}

/// What an invoice shows for payment.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PaymentDisplay {
    /// A PAY by square code as a PNG data URI.
    Qr(String),
    /// Plain payment details, used when no code could be produced.
    PlainText(String),
}

/// Renders the payment code, falling back to plain IBAN text on failure.
pub fn payment_display(order: &PaymentOrder, opts: &RenderOptions) -> PaymentDisplay {
    let rendered = encode_payment_string(order).and_then(|text| render::render_data_uri(&text, opts));
    match rendered {
        Ok(uri) => PaymentDisplay::Qr(uri),
        Err(e) => {
            warn!(error = %e, "payment QR failed, showing plain payment details");
            PaymentDisplay::PlainText(plain_text(order))
        }
    }
}

fn plain_text(order: &PaymentOrder) -> String {
    let record = PaymentRecord::build(order);
    let mut lines = vec![
        format!("IBAN: {}", record.get(Field::Iban)),
        format!("Suma: {} {}", record.get(Field::Amount), record.get(Field::CurrencyCode)),
    ];
    for (label, field) in [
        ("VS", Field::VariableSymbol),
        ("KS", Field::ConstantSymbol),
        ("SS", Field::SpecificSymbol),
    ] {
        if !record.get(field).is_empty() {
            lines.push(format!("{label}: {}", record.get(field)));
        }
    }
    lines.join("\n")
}
