//! paybysquare - PAY by square payment QR codes from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use paybysquare::company::{self, CompanyLookup, CompanyRegistry, TtlCache};
use paybysquare::{
    decode_payment, encode_payment_string_with, render, sepa, Amount, EncodeOptions, Field,
    Framing, Header, PaymentOrder, QrCodeEcc, RenderOptions,
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// paybysquare - PAY by square payment QR codes
#[derive(Parser, Debug)]
#[command(name = "paybysquare")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a payment order as a PAY by square code
    Encode {
        #[command(flatten)]
        order: OrderArgs,

        /// Frame layout around the compressed record
        #[arg(long, value_enum, default_value_t = FramingArg::BySquare)]
        framing: FramingArg,

        /// Header version nibble (0 = 1.0.0, 1 = 1.1.0)
        #[arg(long, default_value_t = 0)]
        header_version: u8,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Decode PAY by square text and print its fields
    Decode {
        /// The encoded text, as read from the QR code
        text: String,

        #[arg(long, value_enum, default_value_t = FramingArg::BySquare)]
        framing: FramingArg,
    },

    /// Build a SEPA (EPC) QR code for the same payment order
    Sepa {
        #[command(flatten)]
        order: OrderArgs,

        /// Remittance reference, at most 35 characters
        #[arg(long, default_value = "")]
        reference: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Look a company up by IČO in a JSON directory of registry records
    Company {
        /// Company identification number
        ico: String,

        /// JSON file with a list of registry records
        #[arg(long)]
        directory: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OrderArgs {
    /// Read the payment order from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["amount", "iban"])]
    json: Option<PathBuf>,

    /// Amount, e.g. 15.00 or 15,00
    #[arg(long, required_unless_present = "json")]
    amount: Option<String>,

    /// Beneficiary IBAN
    #[arg(long, required_unless_present = "json")]
    iban: Option<String>,

    #[arg(long, default_value = "")]
    swift: String,

    #[arg(long, default_value = "")]
    variable_symbol: String,

    #[arg(long, default_value = "")]
    constant_symbol: String,

    #[arg(long, default_value = "")]
    specific_symbol: String,

    #[arg(long, default_value = "")]
    note: String,

    #[arg(long, default_value = "")]
    beneficiary_name: String,

    #[arg(long, default_value = "")]
    address_line_1: String,

    #[arg(long, default_value = "")]
    address_line_2: String,

    /// Due date, YYYYMMDD or YYYY-MM-DD
    #[arg(long, default_value = "")]
    due_date: String,

    #[arg(long, default_value = "EUR")]
    currency: String,
}

impl OrderArgs {
    fn into_order(self) -> Result<PaymentOrder> {
        if let Some(path) = self.json {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("invalid payment order in {}", path.display()));
        }
        let amount: Amount = self.amount.unwrap_or_default().parse()?;
        Ok(PaymentOrder {
            amount,
            iban: self.iban.unwrap_or_default(),
            swift: self.swift,
            variable_symbol: self.variable_symbol,
            constant_symbol: self.constant_symbol,
            specific_symbol: self.specific_symbol,
            note: self.note,
            beneficiary_name: self.beneficiary_name,
            address_line_1: self.address_line_1,
            address_line_2: self.address_line_2,
            due_date: self.due_date,
            currency: self.currency,
            ..PaymentOrder::default()
        })
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// What to print or write
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Write PNG or SVG output to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Error correction level
    #[arg(long, value_enum, default_value_t = EccArg::Medium)]
    ecc: EccArg,

    /// Pixels per module
    #[arg(long, default_value_t = 10)]
    box_size: u32,

    /// Quiet zone width in modules
    #[arg(long)]
    border: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// The encoded text only
    Text,
    /// PNG as a base64 data URI
    DataUri,
    /// PNG file (requires --output)
    Png,
    /// SVG markup
    Svg,
    /// Block characters for the terminal
    Console,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FramingArg {
    BySquare,
    LengthPrefixed,
    LzmaProperties,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::BySquare => Framing::BySquare,
            FramingArg::LengthPrefixed => Framing::LengthPrefixed,
            FramingArg::LzmaProperties => Framing::LzmaProperties,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EccArg {
    Low,
    Medium,
    Quartile,
    High,
}

impl From<EccArg> for QrCodeEcc {
    fn from(arg: EccArg) -> Self {
        match arg {
            EccArg::Low => QrCodeEcc::Low,
            EccArg::Medium => QrCodeEcc::Medium,
            EccArg::Quartile => QrCodeEcc::Quartile,
            EccArg::High => QrCodeEcc::High,
        }
    }
}

/// Registry backed by a JSON file, for offline lookups.
struct FileRegistry {
    records: Vec<Value>,
}

impl FileRegistry {
    fn open(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        Ok(Self {
            records: company::search_items(&value),
        })
    }
}

impl CompanyRegistry for FileRegistry {
    fn fetch(&self, ico: &str) -> paybysquare::Result<Option<Value>> {
        Ok(self
            .records
            .iter()
            .find(|r| company::Company::from_record(r).ico == ico)
            .cloned())
    }

    fn search(&self, query: &str, limit: usize) -> paybysquare::Result<Value> {
        let needle = query.to_lowercase();
        let hits = self
            .records
            .iter()
            .filter(|r| {
                let c = company::Company::from_record(r);
                c.name.to_lowercase().contains(&needle) || c.ico.contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(Value::Array(hits))
    }
}

fn emit(text: &str, output: &OutputArgs, default_border: u32) -> Result<()> {
    let opts = RenderOptions {
        ecc: output.ecc.into(),
        box_size: output.box_size,
        border: output.border.unwrap_or(default_border),
    };
    match output.format {
        Format::Text => println!("{text}"),
        Format::DataUri => println!("{}", render::render_data_uri(text, &opts)?),
        Format::Console => print!("{}", render::render_console(text, &opts)?),
        Format::Svg => {
            let svg = render::render_svg(text, &opts)?;
            match &output.output {
                Some(path) => fs::write(path, svg)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{svg}"),
            }
        }
        Format::Png => {
            let path = output
                .output
                .as_deref()
                .context("--format png needs --output")?;
            let written = render::save_png(
                text,
                &opts,
                path.parent().filter(|p| !p.as_os_str().is_empty()),
                path.file_name().and_then(|n| n.to_str()),
            )?;
            info!(path = %written.display(), "wrote PNG");
            println!("{}", written.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Encode {
            order,
            framing,
            header_version,
            output,
        } => {
            let order = order.into_order()?;
            let opts = EncodeOptions {
                framing: framing.into(),
                header: Header {
                    version: header_version,
                    ..Header::default()
                },
            };
            let text = encode_payment_string_with(&order, &opts).context("failed to encode payment")?;
            emit(&text, &output, RenderOptions::default().border)?;
        }
        Commands::Decode { text, framing } => {
            let record = decode_payment(&text, framing.into()).context("failed to decode payment")?;
            let labels = [
                Field::InvoiceId,
                Field::Amount,
                Field::CurrencyCode,
                Field::DueDate,
                Field::VariableSymbol,
                Field::ConstantSymbol,
                Field::SpecificSymbol,
                Field::OriginatorReference,
                Field::Note,
                Field::Iban,
                Field::Bic,
                Field::BeneficiaryName,
                Field::AddressLine1,
                Field::AddressLine2,
            ];
            for field in labels {
                println!("{:<20} {}", format!("{field:?}"), record.get(field));
            }
        }
        Commands::Sepa {
            order,
            reference,
            output,
        } => {
            let order = order.into_order()?;
            let text = sepa::payload(&order, &reference);
            emit(&text, &output, sepa::render_options().border)?;
        }
        Commands::Company { ico, directory } => {
            let registry = FileRegistry::open(&directory)?;
            let cache = Mutex::new(TtlCache::new(company::DEFAULT_TTL));
            let lookup = CompanyLookup::new(registry, &cache);
            let found = lookup
                .lookup(&ico)
                .with_context(|| format!("no company with IČO {ico}"))?;
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
    }

    Ok(())
}
