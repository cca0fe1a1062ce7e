//! Supplemental sale prices, read from CSV with the header
//! `security,date,price,amount,shares`.

use anyhow::{Context, Result};
use cost_basis::{parse_date, SupplementRecord};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct SupplementRow {
    security: String,
    date: String,
    price: f64,
    amount: f64,
    shares: f64,
}

pub fn read<R: Read>(reader: R) -> Result<Vec<SupplementRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, row) in csv_reader.deserialize::<SupplementRow>().enumerate() {
        let row = row.with_context(|| format!("supplemental row {}", i + 1))?;
        records.push(SupplementRecord {
            date: parse_date(&row.date)
                .with_context(|| format!("supplemental row {} for {}", i + 1, row.security))?,
            security: row.security,
            price: row.price,
            amount: row.amount,
            shares: row.shares,
        });
    }
    Ok(records)
}
