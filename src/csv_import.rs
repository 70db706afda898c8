//! Parses the CSV export of the budget spreadsheet into transaction records.

use std::io;

use csv::{ReaderBuilder, Trim};

use crate::{Error, TransactionRecord};

/// Parse every data row of the CSV in `reader`.
///
/// The first row must be a header naming the record fields, e.g.
/// `Transaction_ID,Date,Subsidiary,Sector,User_ID,Allocated_Budget,...`.
/// Columns may come in any order and surrounding whitespace is ignored.
///
/// # Errors
/// Returns [Error::InvalidCSV] naming the first row that could not be parsed,
/// e.g. because a column is missing or an amount is not a number.
pub fn read_records<R: io::Read>(reader: R) -> Result<Vec<TransactionRecord>, Error> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    reader
        .deserialize::<TransactionRecord>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|error| {
                // Row 1 is the header.
                let row_number = error
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(index as u64 + 2);

                Error::InvalidCSV(format!("row {row_number}: {error}"))
            })
        })
        .collect()
}
