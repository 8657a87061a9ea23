//! EPC QR ("BCD") payload for SEPA credit transfers.
//!
//! Understood by most European banking apps outside Slovakia, where PAY by
//! square is not supported.

use crate::error::Result;
use crate::payment::PaymentOrder;
use crate::render::{self, QrCodeEcc, RenderOptions};

const REFERENCE_MAX_CHARS: usize = 35;
const NAME_MAX_CHARS: usize = 70;
const NOTE_MAX_CHARS: usize = 140;

/// Builds the EPC QR text (version 002, UTF-8, SCT).
///
/// Lines: service tag, version, character set, identification, BIC, name,
/// IBAN, amount, purpose, remittance reference, remittance text,
/// beneficiary information.
pub fn payload(order: &PaymentOrder, reference: &str) -> String {
    let iban: String = order
        .iban
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let lines = [
        "BCD".to_string(),
        "002".to_string(),
        "1".to_string(),
        "SCT".to_string(),
        order.swift.trim().to_uppercase(),
        order.beneficiary_name.chars().take(NAME_MAX_CHARS).collect(),
        iban,
        format!("EUR{}", order.amount),
        String::new(),
        reference.chars().take(REFERENCE_MAX_CHARS).collect(),
        order.note.chars().take(NOTE_MAX_CHARS).collect(),
        String::new(),
    ];
    lines.join("\n")
}

/// Rendering preferences for EPC codes: level M with a 2-module border.
pub fn render_options() -> RenderOptions {
    RenderOptions {
        ecc: QrCodeEcc::Medium,
        box_size: 10,
        border: 2,
    }
}

/// Renders the EPC QR code as a PNG data URI.
pub fn render_data_uri(order: &PaymentOrder, reference: &str) -> Result<String> {
    render::render_data_uri(&payload(order, reference), &render_options())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_lines() {
        let order = PaymentOrder {
            amount: "15".parse().unwrap(),
            iban: "SK21 1100 0000 0029 4328 1214".into(),
            swift: "tatrskbx".into(),
            beneficiary_name: "Test s.r.o.".into(),
            note: "Faktura 20260001".into(),
            ..PaymentOrder::default()
        };
        let text = payload(&order, "20260001");
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(
            lines,
            [
                "BCD",
                "002",
                "1",
                "SCT",
                "TATRSKBX",
                "Test s.r.o.",
                "SK2111000000002943281214",
                "EUR15.00",
                "",
                "20260001",
                "Faktura 20260001",
                "",
            ]
        );
    }

    #[test]
    fn test_reference_is_truncated() {
        let text = payload(&PaymentOrder::default(), &"9".repeat(40));
        assert_eq!(text.split('\n').nth(9).unwrap().len(), 35);
    }

    #[test]
    fn test_render_data_uri() {
        let uri = render_data_uri(&PaymentOrder::default(), "").unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
