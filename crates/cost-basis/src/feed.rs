//! Transaction feed: per-security transaction lists and the supplemental
//! sale-price merge.

use crate::error::{CostBasisError, Result};
use crate::transaction::{RawTransaction, Transaction, TransactionKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Share counts in supplemental records are matched within this tolerance.
const SHARE_MATCH_TOLERANCE: f64 = 0.001;

/// Confirmed sale price for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementRecord {
    pub security: String,
    pub date: NaiveDate,
    pub price: f64,
    pub amount: f64,
    pub shares: f64,
}

/// Transactions of every security in an account, each list in feed order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    securities: BTreeMap<String, Vec<Transaction>>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from untyped records, keeping feed order per security.
    pub fn from_records<I, S>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RawTransaction)>,
        S: Into<String>,
    {
        let mut portfolio = Self::new();
        for (security, raw) in records {
            portfolio.push(security, Transaction::from_record(&raw)?);
        }
        Ok(portfolio)
    }

    pub fn push(&mut self, security: impl Into<String>, tx: Transaction) {
        self.securities.entry(security.into()).or_default().push(tx);
    }

    pub fn securities(&self) -> impl Iterator<Item = &str> {
        self.securities.keys().map(|s| s.as_str())
    }

    pub fn transactions(&self, security: &str) -> Option<&[Transaction]> {
        self.securities.get(security).map(|txs| txs.as_slice())
    }

    pub fn len(&self) -> usize {
        self.securities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.securities.is_empty()
    }

    /// Keep only the named securities.
    pub fn retain_securities(&mut self, names: &[String]) {
        self.securities.retain(|name, _| names.iter().any(|n| n == name));
    }

    /// Fill in confirmed sale prices.
    ///
    /// Each record must match a sale of the same security on the same date
    /// for the same number of shares that has no price yet. The first such
    /// sale in feed order takes the record's price and amount.
    pub fn merge_supplement(&mut self, records: &[SupplementRecord]) -> Result<usize> {
        for record in records {
            let txs = self
                .securities
                .get_mut(&record.security)
                .ok_or_else(|| CostBasisError::UnknownSecurity(record.security.clone()))?;

            let target = txs.iter_mut().find_map(|tx| {
                if tx.date != record.date {
                    return None;
                }
                match &mut tx.kind {
                    TransactionKind::Dispose {
                        shares,
                        amount,
                        price,
                        ..
                    } if price.is_none()
                        && (*shares - record.shares).abs() < SHARE_MATCH_TOLERANCE =>
                    {
                        Some((amount, price))
                    }
                    _ => None,
                }
            });

            let (amount, price) = target.ok_or_else(|| CostBasisError::UnmatchedSupplement {
                security: record.security.clone(),
                date: record.date,
                shares: record.shares,
            })?;
            *amount = record.amount;
            *price = Some(record.price);

            debug!(
                security = %record.security,
                date = %record.date,
                price = record.price,
                "merged supplemental sale price"
            );
        }
        Ok(records.len())
    }

    /// Every sale must carry a price once supplemental data is merged.
    pub fn require_sale_prices(&self) -> Result<()> {
        for (security, txs) in &self.securities {
            for tx in txs {
                if let TransactionKind::Dispose { shares, price: None, .. } = &tx.kind {
                    return Err(CostBasisError::MissingSalePrice {
                        security: security.clone(),
                        date: tx.date,
                        shares: *shares,
                    });
                }
            }
        }
        Ok(())
    }
}

impl IntoIterator for Portfolio {
    type Item = (String, Vec<Transaction>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<Transaction>>;

    fn into_iter(self) -> Self::IntoIter {
        self.securities.into_iter()
    }
}
