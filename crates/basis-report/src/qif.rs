//! Reader for Quicken interchange (QIF) investment exports.
//!
//! Only `!Type:Invst` sections are read. Each record is a run of lines keyed
//! by their first character and closed by `^`.

use anyhow::{bail, Context, Result};
use cost_basis::RawTransaction;

#[derive(Debug, Default)]
struct Record {
    security: Option<String>,
    tx: RawTransaction,
    amount_u: Option<f64>,
    has_fields: bool,
}

impl Record {
    fn finish(self, out: &mut Vec<(String, RawTransaction)>, line_no: usize) {
        if !self.has_fields {
            return;
        }
        let mut tx = self.tx;
        if tx.amount.is_none() {
            tx.amount = self.amount_u;
        }
        match self.security {
            Some(security) => out.push((security, tx)),
            None => tracing::warn!(
                line = line_no,
                date = %tx.date,
                action = %tx.action,
                "skipping investment record without a security"
            ),
        }
    }
}

/// Parse QIF text into (security, transaction) pairs in file order.
pub fn parse(input: &str) -> Result<Vec<(String, RawTransaction)>> {
    let mut out = Vec::new();
    let mut in_investments = false;
    let mut record = Record::default();

    for (i, raw_line) in input.lines().enumerate() {
        let line_no = i + 1;
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('!') {
            if header.to_ascii_lowercase().starts_with("type:") {
                in_investments = header.eq_ignore_ascii_case("type:invst");
                record = Record::default();
            }
            continue;
        }
        if !in_investments {
            continue;
        }

        let mut chars = line.chars();
        let Some(code) = chars.next() else {
            continue;
        };
        let value = chars.as_str().trim();
        match code {
            '^' => {
                std::mem::take(&mut record).finish(&mut out, line_no);
                continue;
            }
            'D' => record.tx.date = value.to_string(),
            'N' => record.tx.action = value.to_string(),
            'Y' => record.security = Some(value.to_string()).filter(|s| !s.is_empty()),
            'Q' => record.tx.shares = number(value, line_no)?,
            'T' => record.tx.amount = number(value, line_no)?,
            'U' => record.amount_u = number(value, line_no)?,
            'O' => record.tx.commission = number(value, line_no)?,
            'I' => record.tx.price = number(value, line_no)?,
            _ => {}
        }
        record.has_fields = true;
    }

    if record.has_fields {
        bail!("QIF input ends in the middle of a record");
    }
    Ok(out)
}

fn number(value: &str, line_no: usize) -> Result<Option<f64>> {
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != '$').collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let n = cleaned
        .parse::<f64>()
        .with_context(|| format!("line {}: '{}' is not a number", line_no, value))?;
    Ok(Some(n))
}
