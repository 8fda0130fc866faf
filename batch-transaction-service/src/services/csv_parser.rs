//! CSV ingestion for batch uploads.
//!
//! The first row of an upload is a header and is discarded unread. Every
//! following row is positional:
//!
//! ```text
//! bank_dest, account_id_dest, account_name_dest, amount, ...
//! ```
//!
//! Columns past the fourth are ignored. Rows come out in file order and that
//! order is what gets persisted. A file without even a header row is rejected.

use crate::models::DetailRecord;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

/// Number of positional columns a data row must carry.
pub const REQUIRED_COLUMNS: usize = 4;

/// Column widths of `transaction_details`, in characters.
pub const MAX_BANK_DEST_LEN: usize = 64;
pub const MAX_ACCOUNT_ID_DEST_LEN: usize = 64;
pub const MAX_ACCOUNT_NAME_DEST_LEN: usize = 255;

/// Reasons an upload is rejected. `row` is the 1-based data row, not
/// counting the discarded header; header-level failures report row 0.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("upload has no header row")]
    MissingHeader,

    #[error("row {row}: amount '{value}' is not a number")]
    MalformedAmount { row: usize, value: String },

    #[error("row {row}: amount '{value}' is negative")]
    NegativeAmount { row: usize, value: String },

    #[error("row {row}: expected at least 4 columns, found {found}")]
    MissingFields { row: usize, found: usize },

    #[error("row {row}: {column} is longer than {max} characters")]
    FieldTooLong {
        row: usize,
        column: &'static str,
        max: usize,
    },

    #[error("row {row}: {message}")]
    Csv { row: usize, message: String },
}

impl ParseError {
    pub fn row(&self) -> usize {
        match self {
            Self::MissingHeader => 0,
            Self::MalformedAmount { row, .. }
            | Self::NegativeAmount { row, .. }
            | Self::MissingFields { row, .. }
            | Self::FieldTooLong { row, .. }
            | Self::Csv { row, .. } => *row,
        }
    }
}

/// Lazy, single-pass sequence of parsed rows.
///
/// Stops for good after the first error, so a caller that collects it never
/// sees rows past a bad one.
pub struct DetailRecords<R: Read> {
    records: StringRecordsIntoIter<R>,
    row: usize,
    failed: bool,
    header_error: Option<ParseError>,
}

impl<R: Read> DetailRecords<R> {
    pub fn new(reader: R) -> Self {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        // An empty header record means the input ended before any row.
        let header_error = match reader.byte_headers() {
            Ok(header) if header.is_empty() => Some(ParseError::MissingHeader),
            Ok(_) => None,
            Err(e) => Some(ParseError::Csv {
                row: 0,
                message: e.to_string(),
            }),
        };

        Self {
            records: reader.into_records(),
            row: 0,
            failed: false,
            header_error,
        }
    }

    fn convert(&self, record: &StringRecord) -> Result<DetailRecord, ParseError> {
        let row = self.row;
        if record.len() < REQUIRED_COLUMNS {
            return Err(ParseError::MissingFields {
                row,
                found: record.len(),
            });
        }

        let bank_dest = bounded(row, &record[0], "bank_dest", MAX_BANK_DEST_LEN)?;
        let account_id_dest = bounded(row, &record[1], "account_id_dest", MAX_ACCOUNT_ID_DEST_LEN)?;
        let account_name_dest =
            bounded(row, &record[2], "account_name_dest", MAX_ACCOUNT_NAME_DEST_LEN)?;
        let amount = parse_amount(row, &record[3])?;

        Ok(DetailRecord {
            bank_dest,
            account_id_dest,
            account_name_dest,
            amount,
        })
    }
}

impl<R: Read> Iterator for DetailRecords<R> {
    type Item = Result<DetailRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(err) = self.header_error.take() {
            self.failed = true;
            return Some(Err(err));
        }

        let next = self.records.next()?;
        self.row += 1;

        let result = next
            .map_err(|e| ParseError::Csv {
                row: self.row,
                message: e.to_string(),
            })
            .and_then(|record| self.convert(&record));

        self.failed = result.is_err();
        Some(result)
    }
}

/// Parse a whole upload. All-or-nothing: the first bad row fails the call and
/// every row parsed so far is dropped.
pub fn parse<R: Read>(reader: R) -> Result<Vec<DetailRecord>, ParseError> {
    DetailRecords::new(reader).collect()
}

fn bounded(row: usize, raw: &str, column: &'static str, max: usize) -> Result<String, ParseError> {
    if raw.chars().count() > max {
        return Err(ParseError::FieldTooLong { row, column, max });
    }
    Ok(raw.to_string())
}

/// Decimal literal first, then scientific notation (`1e3`).
fn parse_amount(row: usize, raw: &str) -> Result<Decimal, ParseError> {
    let amount = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| ParseError::MalformedAmount {
            row,
            value: raw.to_string(),
        })?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ParseError::NegativeAmount {
            row,
            value: raw.to_string(),
        });
    }

    Ok(amount)
}
