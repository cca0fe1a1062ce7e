//! Holdings Ledger
//!
//! Lot inventory and running totals for one security. Transactions must be
//! applied oldest first; sales consult the not-yet-applied transactions of
//! the same security when searching for wash-sale replacement shares.

use crate::config::EngineConfig;
use crate::error::{CostBasisError, Result};
use crate::events::{BuyEvent, LotPosition, LotsSnapshot, SellEvent, SplitEvent};
use crate::sale::{match_fifo, Valuation};
use crate::transaction::{Transaction, TransactionKind};
use crate::wash_sale::WashSaleAdjuster;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Block of shares acquired on one date at one basis price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub date: NaiveDate,
    /// Basis per share, including any wash-sale adjustment
    pub price: f64,
    pub shares: f64,
    /// Shares already used as wash-sale replacement shares
    pub washed_shares: f64,
}

impl Lot {
    pub fn new(date: NaiveDate, price: f64, shares: f64) -> Self {
        Self {
            date,
            price,
            shares,
            washed_shares: 0.0,
        }
    }

    /// Shares still available to absorb a disallowed loss
    pub fn washable_shares(&self) -> f64 {
        (self.shares - self.washed_shares).max(0.0)
    }
}

/// Running totals of a holding
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub shares: f64,
    pub basis: f64,
}

impl Totals {
    pub fn average_cost(&self) -> f64 {
        if self.shares > 0.0 {
            self.basis / self.shares
        } else {
            0.0
        }
    }
}

/// Lot inventory of a single security
#[derive(Debug, Clone)]
pub struct Holdings {
    security: String,
    config: EngineConfig,
    lots: Vec<Lot>,
    total_basis: f64,
    total_shares: f64,
}

impl Holdings {
    pub fn new(security: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            security: security.into(),
            config,
            lots: Vec::new(),
            total_basis: 0.0,
            total_shares: 0.0,
        }
    }

    pub fn security(&self) -> &str {
        &self.security
    }

    /// Lots in acquisition order, including exhausted ones
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn totals(&self) -> Totals {
        Totals {
            shares: self.total_shares,
            basis: self.total_basis,
        }
    }

    /// Record an acquisition as a new lot at the back of the queue.
    pub fn apply_buy(&mut self, tx: &Transaction) -> Result<BuyEvent> {
        let TransactionKind::Acquire {
            shares,
            amount,
            commission,
            wash,
        } = &tx.kind
        else {
            return Err(self.wrong_kind(tx, "an acquisition"));
        };
        if *shares <= 0.0 {
            return Err(CostBasisError::InvalidTransaction(format!(
                "{} of {} on {} has no shares",
                tx.action, self.security, tx.date
            )));
        }

        let cost = amount + commission;
        let price = cost / shares + wash.price;

        let mut lot = Lot::new(tx.date, price, *shares);
        lot.washed_shares = wash.washed_shares.min(*shares);
        self.lots.push(lot);

        self.total_basis += cost + wash.basis;
        self.total_shares += shares;

        debug!(
            security = %self.security,
            date = %tx.date,
            shares,
            price,
            "applied {}", tx.action
        );

        Ok(BuyEvent {
            date: tx.date,
            action: tx.action.to_string(),
            shares: *shares,
            price,
            amount: cost,
            wash: (!wash.is_empty()).then_some(*wash),
            totals: self.totals(),
        })
    }

    /// Scale every lot by the split ratio; total basis is unchanged.
    pub fn apply_split(&mut self, tx: &Transaction) -> Result<SplitEvent> {
        let TransactionKind::Split { shares } = &tx.kind else {
            return Err(self.wrong_kind(tx, "a split"));
        };
        let ratio = shares / 10.0;
        if ratio <= 0.0 || !ratio.is_finite() {
            return Err(CostBasisError::InvalidTransaction(format!(
                "split of {} on {} has ratio {}",
                self.security, tx.date, ratio
            )));
        }

        for lot in &mut self.lots {
            lot.shares *= ratio;
            lot.price /= ratio;
            lot.washed_shares *= ratio;
        }
        self.total_shares *= ratio;

        debug!(security = %self.security, date = %tx.date, ratio, "applied split");

        Ok(SplitEvent {
            date: tx.date,
            ratio,
            totals: self.totals(),
        })
    }

    /// Dispose of shares oldest lot first.
    ///
    /// `remaining` holds this security's transactions that have not been
    /// applied yet, in feed order. A loss sale with confirmed proceeds may
    /// queue wash-sale adjustments on acquisitions in it.
    pub fn apply_sell(&mut self, tx: &Transaction, remaining: &mut [Transaction]) -> Result<SellEvent> {
        let TransactionKind::Dispose {
            shares,
            amount,
            price,
            ..
        } = &tx.kind
        else {
            return Err(self.wrong_kind(tx, "a sale"));
        };
        let shares = *shares;
        let epsilon = self.config.share_epsilon;

        let held: f64 = self.lots.iter().map(|lot| lot.shares).sum();
        if shares > held + epsilon {
            return Err(CostBasisError::Oversold {
                security: self.security.clone(),
                date: tx.date,
                requested: shares,
                held,
            });
        }
        let average = self.totals().average_cost();

        let matched = match_fifo(&mut self.lots, tx.date, shares, epsilon);

        let mut fifo = Valuation::fifo(&matched.slices);
        let mut average_cost = Valuation::average_cost(&matched.slices, average);

        self.total_basis -= average * shares;
        self.total_shares -= shares;
        if self.total_shares.abs() < epsilon {
            self.total_shares = 0.0;
        }
        if self.total_basis.abs() < epsilon {
            self.total_basis = 0.0;
        }

        let proceeds = price.map(|_| *amount);
        if let Some(proceeds) = proceeds.filter(|_| self.config.wash_sale_enabled) {
            let adjuster = WashSaleAdjuster::new(&self.config);

            let fifo_wash =
                adjuster.search(&self.lots, remaining, tx.date, shares, fifo.basis - proceeds);
            let average_wash = adjuster.search(
                &self.lots,
                remaining,
                tx.date,
                shares,
                average_cost.basis - proceeds,
            );

            if let Some(search) = &fifo_wash {
                adjuster.apply_fifo(search, &mut self.lots, remaining);
                adjuster.record(search, &mut fifo);
            }
            if let Some(search) = &average_wash {
                self.total_basis += adjuster.apply_average_cost(search, remaining);
                adjuster.record(search, &mut average_cost);
            }

            let searches: Vec<_> = fifo_wash.iter().chain(average_wash.iter()).collect();
            adjuster.mark_washed(&searches, &mut self.lots, remaining);

            for valuation in [&fifo, &average_cost] {
                if valuation.wash_total > 0.0 {
                    warn!(
                        security = %self.security,
                        date = %tx.date,
                        method = %valuation.method,
                        disallowed = valuation.wash_total,
                        "wash sale"
                    );
                }
            }
        }

        debug!(
            security = %self.security,
            date = %tx.date,
            shares,
            "applied {}", tx.action
        );

        Ok(SellEvent {
            date: tx.date,
            action: tx.action.to_string(),
            shares,
            price: *price,
            proceeds,
            totals: self.totals(),
            fifo,
            average_cost,
        })
    }

    /// Lots that still hold shares
    pub fn snapshot(&self, date: NaiveDate) -> LotsSnapshot {
        LotsSnapshot {
            date,
            lots: self
                .lots
                .iter()
                .filter(|lot| lot.shares != 0.0)
                .map(|lot| LotPosition {
                    date: lot.date,
                    shares: lot.shares,
                    price: lot.price,
                })
                .collect(),
        }
    }

    fn wrong_kind(&self, tx: &Transaction, expected: &str) -> CostBasisError {
        CostBasisError::InvalidTransaction(format!(
            "{} of {} on {} is not {}",
            tx.action, self.security, tx.date, expected
        ))
    }
}
