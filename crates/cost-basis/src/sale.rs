//! Sale Matching
//!
//! Consumes lots oldest first to cover a sale and values the consumed shares
//! two ways: at each lot's own price (FIFO) and at the holding's blended
//! average cost.

use crate::ledger::Lot;
use crate::term::{classify, Term};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a sale's cost basis is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValuationMethod {
    Fifo,
    AverageCost,
}

impl std::fmt::Display for ValuationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuationMethod::Fifo => write!(f, "FIFO"),
            ValuationMethod::AverageCost => write!(f, "Average cost"),
        }
    }
}

/// Slice of a lot consumed by one sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLot {
    /// Acquisition date of the source lot
    pub date: NaiveDate,
    pub shares: f64,
    pub price: f64,
    pub term: Term,
}

impl SaleLot {
    pub fn amount(&self) -> f64 {
        self.price * self.shares
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TermTotal {
    pub shares: f64,
    pub amount: f64,
}

/// Replacement shares that absorbed part of a disallowed loss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WashNotice {
    /// Date of the replacement lot or transaction
    pub date: NaiveDate,
    pub shares: f64,
    pub amount: f64,
}

/// One valuation of a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub method: ValuationMethod,
    pub lots: Vec<SaleLot>,
    pub short: TermTotal,
    pub long: TermTotal,
    /// Cost basis removed by the sale
    pub basis: f64,
    pub wash_sales: Vec<WashNotice>,
    pub wash_total: f64,
}

impl Valuation {
    fn from_lots(method: ValuationMethod, lots: Vec<SaleLot>) -> Self {
        let mut short = TermTotal::default();
        let mut long = TermTotal::default();
        for lot in &lots {
            let bucket = match lot.term {
                Term::Short => &mut short,
                Term::Long => &mut long,
            };
            bucket.shares += lot.shares;
            bucket.amount += lot.amount();
        }

        Self {
            method,
            basis: short.amount + long.amount,
            lots,
            short,
            long,
            wash_sales: Vec::new(),
            wash_total: 0.0,
        }
    }

    /// Each slice priced at its own lot's basis
    pub fn fifo(slices: &[SaleLot]) -> Self {
        Self::from_lots(ValuationMethod::Fifo, slices.to_vec())
    }

    /// Every slice priced at the holding's pre-sale average basis
    pub fn average_cost(slices: &[SaleLot], average: f64) -> Self {
        let lots = slices
            .iter()
            .map(|s| SaleLot {
                price: average,
                ..s.clone()
            })
            .collect();
        Self::from_lots(ValuationMethod::AverageCost, lots)
    }

    pub fn shares(&self) -> f64 {
        self.short.shares + self.long.shares
    }

    /// Gain (negative for a loss) against the given proceeds
    pub fn gain(&self, proceeds: f64) -> f64 {
        proceeds - self.basis
    }
}

/// Result of walking the lot queue for a sale
#[derive(Debug, Clone, PartialEq)]
pub struct FifoMatch {
    pub slices: Vec<SaleLot>,
    /// Shares the lots could not cover
    pub unfilled: f64,
}

/// Take `shares` from `lots`, oldest first, decrementing them in place.
///
/// Each slice carries its lot's price and the term it was held for as of
/// `sale_date`.
pub fn match_fifo(lots: &mut [Lot], sale_date: NaiveDate, shares: f64, epsilon: f64) -> FifoMatch {
    let mut remaining = shares;
    let mut slices = Vec::new();

    for lot in lots.iter_mut() {
        if remaining <= epsilon {
            break;
        }
        if lot.shares == 0.0 {
            continue;
        }

        let taken = if remaining <= lot.shares {
            remaining
        } else {
            lot.shares
        };
        lot.shares -= taken;
        if lot.shares.abs() < epsilon {
            lot.shares = 0.0;
        }
        remaining -= taken;

        slices.push(SaleLot {
            date: lot.date,
            shares: taken,
            price: lot.price,
            term: classify(lot.date, sale_date),
        });
    }

    FifoMatch {
        slices,
        unfilled: remaining.max(0.0),
    }
}
