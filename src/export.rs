//! CSV rendering of transaction listings.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::Result;
use crate::models::Transaction;

/// Column headings, in output order.
pub const CSV_HEADER: [&str; 8] = [
    "Date",
    "Amount",
    "Currency",
    "Remote Name",
    "Purpose",
    "Remote IBAN",
    "Remote BIC",
    "Transaction Code",
];

/// Renders transactions as CSV.
///
/// The header row is always written. Fields containing a comma, a double
/// quote or a line break are quoted with embedded quotes doubled; every row
/// ends with `\n`. A bare `\r` counts as a line break and is quoted too.
///
/// # Errors
///
/// Returns [`crate::error::BankingError::Csv`] or
/// [`crate::error::BankingError::Io`] if the in-memory writer fails.
pub fn to_csv(transactions: &[Transaction]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for tx in transactions {
        let amount = tx.amount.to_string();
        writer.write_record([
            tx.date.as_str(),
            amount.as_str(),
            tx.currency.as_str(),
            tx.remote_name.as_str(),
            tx.purpose.as_str(),
            tx.remote_iban.as_str(),
            tx.remote_bic.as_str(),
            tx.transaction_code.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    tracing::trace!(rows = transactions.len(), bytes = text.len(), "rendered CSV");
    Ok(text)
}
