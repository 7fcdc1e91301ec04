use crate::models::TransferRecord;
use csv::Writer;
use serde::Serialize;
use std::io::{self, Write};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

/// Receives each decoded record once, in arrival order.
pub trait Reporter {
    fn report(&mut self, record: &TransferRecord);
}

#[derive(Debug, Serialize)]
struct TransferRow {
    block_number: u64,
    kind: &'static str,
    from: String,
    to: String,
    amount: String,
    raw_amount: String,
    transaction_hash: Option<String>,
    log_index: Option<u64>,
}

impl From<&TransferRecord> for TransferRow {
    fn from(record: &TransferRecord) -> Self {
        TransferRow {
            block_number: record.block_number,
            kind: record.kind.as_str(),
            from: record.from.to_string(),
            to: record.to.to_string(),
            amount: record.amount.to_string(),
            raw_amount: record.raw_amount.to_string(),
            transaction_hash: record.transaction_hash.map(|h| format!("{h:?}")),
            log_index: record.log_index,
        }
    }
}

pub fn format_text(record: &TransferRecord, symbol: Option<&str>) -> String {
    let mut line = format!(
        "Block #{}: {} from {} to {}, amount: {}",
        record.block_number, record.kind, record.from, record.to, record.amount
    );
    if let Some(symbol) = symbol {
        line.push(' ');
        line.push_str(symbol);
    }
    line
}

enum Sink<W: Write> {
    Text(W),
    Json(W),
    Csv(Writer<W>),
}

/// Writes one line (or CSV row) per record. Write errors are logged and dropped.
pub struct ConsoleReporter<W: Write> {
    sink: Sink<W>,
    symbol: Option<String>,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(format: OutputFormat, symbol: Option<String>) -> Self {
        Self::new(io::stdout(), format, symbol)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(writer: W, format: OutputFormat, symbol: Option<String>) -> Self {
        let sink = match format {
            OutputFormat::Text => Sink::Text(writer),
            OutputFormat::Json => Sink::Json(writer),
            OutputFormat::Csv => Sink::Csv(Writer::from_writer(writer)),
        };
        ConsoleReporter { sink, symbol }
    }

    fn write(&mut self, record: &TransferRecord) -> anyhow::Result<()> {
        match &mut self.sink {
            Sink::Text(w) => {
                writeln!(w, "{}", format_text(record, self.symbol.as_deref()))?;
                w.flush()?;
            }
            Sink::Json(w) => {
                let mut value = serde_json::to_value(TransferRow::from(record))?;
                if let Some(symbol) = &self.symbol {
                    value["symbol"] = symbol.clone().into();
                }
                writeln!(w, "{value}")?;
                w.flush()?;
            }
            Sink::Csv(w) => {
                w.serialize(TransferRow::from(record))?;
                w.flush()?;
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> Option<W> {
        match self.sink {
            Sink::Text(w) | Sink::Json(w) => Some(w),
            Sink::Csv(w) => w.into_inner().ok(),
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, record: &TransferRecord) {
        if let Err(e) = self.write(record) {
            warn!("Failed to report transfer at block {}: {}", record.block_number, e);
        }
    }
}
