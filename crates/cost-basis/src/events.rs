//! Ledger events emitted for each applied transaction.

use crate::ledger::Totals;
use crate::sale::Valuation;
use crate::transaction::WashAdjustment;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyEvent {
    pub date: NaiveDate,
    pub action: String,
    pub shares: f64,
    /// Lot price per share, after any deferred wash-sale adjustment
    pub price: f64,
    /// Amount paid including commission
    pub amount: f64,
    /// Deferred wash-sale adjustment this acquisition absorbed
    pub wash: Option<WashAdjustment>,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellEvent {
    pub date: NaiveDate,
    pub action: String,
    pub shares: f64,
    pub price: Option<f64>,
    /// Confirmed sale proceeds
    pub proceeds: Option<f64>,
    pub totals: Totals,
    pub fifo: Valuation,
    pub average_cost: Valuation,
}

impl SellEvent {
    pub fn valuations(&self) -> [&Valuation; 2] {
        [&self.fifo, &self.average_cost]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEvent {
    pub date: NaiveDate,
    pub ratio: f64,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotPosition {
    pub date: NaiveDate,
    pub shares: f64,
    pub price: f64,
}

/// Open lots after a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotsSnapshot {
    pub date: NaiveDate,
    pub lots: Vec<LotPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Buy(BuyEvent),
    Sell(SellEvent),
    Split(SplitEvent),
    Lots(LotsSnapshot),
}
