//! Payment orders and their tab-delimited PAY by square record.
//!
//! A [`PaymentOrder`] is what an invoice hands over: amount, account and the
//! Slovak payment symbols. [`PaymentRecord`] is the fixed 19-field layout that
//! is checksummed, compressed and encoded.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{Error, Result};

/// Number of positional fields in a single-payment record.
pub const FIELD_COUNT: usize = 19;

/// Maximum length of the payment note, in characters.
pub const NOTE_MAX_CHARS: usize = 140;

/// Maximum length of the beneficiary name and each address line, in characters.
pub const BENEFICIARY_MAX_CHARS: usize = 70;

/// A single payment order as entered on an invoice.
///
/// Every field except `amount` and `iban` is optional and defaults to an
/// empty string; `currency` defaults to `EUR`.
///
/// # Example
///
/// ```rust
/// use paybysquare::{Amount, PaymentOrder};
///
/// let order = PaymentOrder {
///     amount: "15.00".parse::<Amount>().unwrap(),
///     iban: "SK21 1100 0000 0029 4328 1214".into(),
///     variable_symbol: "20260001".into(),
///     due_date: "2026-02-15".into(),
///     ..PaymentOrder::default()
/// };
/// assert_eq!(order.currency, "EUR");
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentOrder {
    pub amount: Amount,
    pub iban: String,
    pub swift: String,
    pub variable_symbol: String,
    pub constant_symbol: String,
    pub specific_symbol: String,
    pub note: String,
    pub beneficiary_name: String,
    pub address_line_1: String,
    pub address_line_2: String,
    /// `YYYYMMDD`; a `YYYY-MM-DD` value is accepted and has its dashes removed.
    pub due_date: String,
    pub currency: String,
    pub invoice_id: String,
    pub originator_reference: String,
}

impl Default for PaymentOrder {
    fn default() -> Self {
        Self {
            amount: Amount::ZERO,
            iban: String::new(),
            swift: String::new(),
            variable_symbol: String::new(),
            constant_symbol: String::new(),
            specific_symbol: String::new(),
            note: String::new(),
            beneficiary_name: String::new(),
            address_line_1: String::new(),
            address_line_2: String::new(),
            due_date: String::new(),
            currency: "EUR".to_string(),
            invoice_id: String::new(),
            originator_reference: String::new(),
        }
    }
}

/// The positional fields of a PAY by square payment order.
///
/// Field order is fixed; an omitted value is an empty string and keeps its
/// position.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PaymentRecord {
    fields: [String; FIELD_COUNT],
}

/// Named positions inside a [`PaymentRecord`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(usize)]
pub enum Field {
    InvoiceId = 0,
    PaymentCount,
    PaymentOptions,
    Amount,
    CurrencyCode,
    DueDate,
    VariableSymbol,
    ConstantSymbol,
    SpecificSymbol,
    OriginatorReference,
    Note,
    BankAccountCount,
    Iban,
    Bic,
    StandingOrder,
    DirectDebit,
    BeneficiaryName,
    AddressLine1,
    AddressLine2,
}

impl PaymentRecord {
    /// Builds the record for one payment order paid to one bank account.
    ///
    /// The IBAN loses its spaces and dashes and is uppercased; the note is
    /// truncated to [`NOTE_MAX_CHARS`], the beneficiary fields to
    /// [`BENEFICIARY_MAX_CHARS`]. Tabs are removed from every field.
    pub fn build(order: &PaymentOrder) -> Self {
        let iban: String = order
            .iban
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
            .to_uppercase();
        let due_date: String = order.due_date.trim().chars().filter(|c| *c != '-').collect();

        let fields = [
            clean(&order.invoice_id),
            "1".to_string(),
            "1".to_string(),
            order.amount.to_string(),
            clean(order.currency.trim()),
            clean(&due_date),
            clean(order.variable_symbol.trim()),
            clean(order.constant_symbol.trim()),
            clean(order.specific_symbol.trim()),
            clean(&order.originator_reference),
            truncate(&clean(&order.note), NOTE_MAX_CHARS),
            "1".to_string(),
            clean(&iban),
            clean(order.swift.trim()).to_uppercase(),
            "0".to_string(),
            "0".to_string(),
            truncate(&clean(&order.beneficiary_name), BENEFICIARY_MAX_CHARS),
            truncate(&clean(&order.address_line_1), BENEFICIARY_MAX_CHARS),
            truncate(&clean(&order.address_line_2), BENEFICIARY_MAX_CHARS),
        ];
        Self { fields }
    }

    /// Parses a tab-delimited record back into its fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] unless the text has exactly
    /// [`FIELD_COUNT`] fields.
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('\t').collect();
        if parts.len() != FIELD_COUNT {
            return Err(Error::MalformedRecord(format!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                parts.len()
            )));
        }
        let fields = core::array::from_fn(|i| parts[i].to_string());
        Ok(Self { fields })
    }

    /// Returns the value at the given position.
    pub fn get(&self, field: Field) -> &str {
        &self.fields[field as usize]
    }

    /// Returns all positional values in order.
    pub fn fields(&self) -> &[String; FIELD_COUNT] {
        &self.fields
    }

    /// Joins the fields with tabs.
    pub fn serialize(&self) -> String {
        self.fields.join("\t")
    }
}

fn clean(value: &str) -> String {
    value.chars().filter(|c| *c != '\t').collect()
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> PaymentOrder {
        PaymentOrder {
            amount: "15.00".parse().unwrap(),
            iban: "SK2111000000002943281214".into(),
            due_date: "20260215".into(),
            variable_symbol: "20260001".into(),
            beneficiary_name: "Test s.r.o.".into(),
            ..PaymentOrder::default()
        }
    }

    #[test]
    fn test_serialize_reference_order() {
        let record = PaymentRecord::build(&sample_order());
        assert_eq!(
            record.serialize(),
            "\t1\t1\t15.00\tEUR\t20260215\t20260001\t\t\t\t\t1\tSK2111000000002943281214\t\t0\t0\tTest s.r.o.\t\t"
        );
    }

    #[test]
    fn test_empty_optional_fields_keep_positions() {
        let record = PaymentRecord::build(&sample_order());
        let text = record.serialize();
        assert_eq!(text.split('\t').count(), FIELD_COUNT);
        assert_eq!(record.get(Field::Bic), "");
        assert_eq!(record.get(Field::Note), "");
        assert_eq!(record.get(Field::AddressLine1), "");
        assert_eq!(record.get(Field::AddressLine2), "");
        assert_eq!(record.get(Field::BeneficiaryName), "Test s.r.o.");
    }

    #[test]
    fn test_variable_symbol_changes_only_its_position() {
        let a = PaymentRecord::build(&sample_order()).serialize();
        let mut order = sample_order();
        order.variable_symbol = "99990000".into();
        let b = PaymentRecord::build(&order).serialize();

        let (a, b): (Vec<&str>, Vec<&str>) = (a.split('\t').collect(), b.split('\t').collect());
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(&b).enumerate() {
            if i == Field::VariableSymbol as usize {
                assert_ne!(x, y);
            } else {
                assert_eq!(x, y, "field {i} changed");
            }
        }
    }

    #[test]
    fn test_note_truncation_boundary() {
        let mut order = sample_order();
        order.note = "n".repeat(140);
        assert_eq!(PaymentRecord::build(&order).get(Field::Note), order.note);

        order.note = "n".repeat(141);
        assert_eq!(PaymentRecord::build(&order).get(Field::Note).chars().count(), 140);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let mut order = sample_order();
        order.beneficiary_name = "č".repeat(75);
        order.address_line_1 = "Hlavná 1".into();
        let record = PaymentRecord::build(&order);
        assert_eq!(record.get(Field::BeneficiaryName), "č".repeat(70));
        assert_eq!(record.get(Field::AddressLine1), "Hlavná 1");
    }

    #[test]
    fn test_normalizes_iban_bic_and_date() {
        let mut order = sample_order();
        order.iban = "sk21 1100-0000 0029 4328 1214".into();
        order.swift = " tatrskbx ".into();
        order.due_date = "2026-02-15".into();
        let record = PaymentRecord::build(&order);
        assert_eq!(record.get(Field::Iban), "SK2111000000002943281214");
        assert_eq!(record.get(Field::Bic), "TATRSKBX");
        assert_eq!(record.get(Field::DueDate), "20260215");
    }

    #[test]
    fn test_tabs_are_removed() {
        let mut order = sample_order();
        order.note = "faktura\t2026".into();
        let record = PaymentRecord::build(&order);
        assert_eq!(record.get(Field::Note), "faktura2026");
        assert_eq!(record.serialize().split('\t').count(), FIELD_COUNT);
    }

    #[test]
    fn test_parse_inverts_serialize() {
        let record = PaymentRecord::build(&sample_order());
        assert_eq!(PaymentRecord::parse(&record.serialize()).unwrap(), record);
        assert!(matches!(
            PaymentRecord::parse("1\t2\t3"),
            Err(Error::MalformedRecord(_))
        ));
    }
}
