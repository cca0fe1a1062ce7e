//! Wash Sale Adjustment
//!
//! A loss on a sale is disallowed when replacement shares are acquired within
//! the window around the sale. The disallowed loss is moved into the basis of
//! the replacement shares: existing lots are adjusted right away, and
//! acquisitions still ahead in the feed get a deferred adjustment that the
//! ledger applies when it reaches them.

use crate::config::EngineConfig;
use crate::ledger::Lot;
use crate::sale::{Valuation, WashNotice};
use crate::transaction::Transaction;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days around a sale in which acquisitions count as replacements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WashSaleWindow {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

impl WashSaleWindow {
    pub fn new(sale_date: NaiveDate, window_days: u32) -> Self {
        let days = Duration::days(window_days as i64);
        Self {
            window_start: sale_date - days,
            window_end: sale_date + days,
        }
    }

    /// Check if a date is within this window
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.window_start && date <= self.window_end
    }
}

/// Where replacement shares were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Replacement {
    /// Index into the lot queue
    Lot(usize),
    /// Index into the not-yet-applied transactions
    Pending(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementMatch {
    pub replacement: Replacement,
    pub date: NaiveDate,
    pub shares: f64,
    pub amount: f64,
}

/// Replacement shares found for one valuation's loss
#[derive(Debug, Clone, PartialEq)]
pub struct WashSearch {
    pub loss: f64,
    pub matches: Vec<ReplacementMatch>,
}

impl WashSearch {
    pub fn total(&self) -> f64 {
        self.matches.iter().map(|m| m.amount).sum()
    }

    fn total_for(&self, pending: bool) -> f64 {
        self.matches
            .iter()
            .filter(|m| matches!(m.replacement, Replacement::Pending(_)) == pending)
            .map(|m| m.amount)
            .sum()
    }
}

pub struct WashSaleAdjuster {
    window_days: u32,
    epsilon: f64,
}

impl WashSaleAdjuster {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window_days: config.wash_sale_window_days,
            epsilon: config.share_epsilon,
        }
    }

    /// Find replacement shares for a loss of `loss` on `shares_sold` shares.
    ///
    /// Existing lots are searched first in queue order, then acquisitions in
    /// `remaining`. Shares already used as replacements are never reused.
    /// Returns `None` when there is no loss to disallow.
    pub fn search(
        &self,
        lots: &[Lot],
        remaining: &[Transaction],
        sale_date: NaiveDate,
        shares_sold: f64,
        loss: f64,
    ) -> Option<WashSearch> {
        if loss <= self.epsilon || shares_sold <= 0.0 {
            return None;
        }

        let window = WashSaleWindow::new(sale_date, self.window_days);
        let loss_per_share = loss / shares_sold;
        let mut unmatched = shares_sold;
        let mut matches = Vec::new();

        let existing = lots
            .iter()
            .enumerate()
            .map(|(i, lot)| (Replacement::Lot(i), lot.date, lot.washable_shares()));
        let upcoming = remaining.iter().enumerate().filter_map(|(i, tx)| {
            let wash = tx.wash()?;
            let shares = tx.shares()?;
            Some((
                Replacement::Pending(i),
                tx.date,
                (shares - wash.washed_shares).max(0.0),
            ))
        });

        for (replacement, date, washable) in existing.chain(upcoming) {
            if unmatched <= self.epsilon {
                break;
            }
            if washable <= 0.0 || !window.contains(date) {
                continue;
            }

            let shares = washable.min(unmatched);
            unmatched -= shares;
            matches.push(ReplacementMatch {
                replacement,
                date,
                shares,
                amount: shares * loss_per_share,
            });
        }

        Some(WashSearch { loss, matches })
    }

    /// Raise per-share prices by the disallowed loss.
    ///
    /// The amount is spread over all shares of a lot, not only the washed ones.
    pub fn apply_fifo(&self, search: &WashSearch, lots: &mut [Lot], remaining: &mut [Transaction]) {
        for m in &search.matches {
            match m.replacement {
                Replacement::Lot(i) => {
                    if let Some(lot) = lots.get_mut(i).filter(|lot| lot.shares > 0.0) {
                        lot.price += m.amount / lot.shares;
                    }
                }
                Replacement::Pending(i) => {
                    if let Some(tx) = remaining.get_mut(i) {
                        let shares = tx.shares().unwrap_or(0.0);
                        if let Some(wash) = tx.wash_mut().filter(|_| shares > 0.0) {
                            wash.price += m.amount / shares;
                        }
                    }
                }
            }
        }
    }

    /// Queue basis increases on upcoming acquisitions.
    ///
    /// Returns the increase for existing lots, which the caller adds to the
    /// holding's total basis in one step.
    pub fn apply_average_cost(&self, search: &WashSearch, remaining: &mut [Transaction]) -> f64 {
        for m in &search.matches {
            if let Replacement::Pending(i) = m.replacement {
                if let Some(wash) = remaining.get_mut(i).and_then(|tx| tx.wash_mut()) {
                    wash.basis += m.amount;
                }
            }
        }
        search.total_for(false)
    }

    /// Attach notices to the valuation when anything was disallowed.
    pub fn record(&self, search: &WashSearch, valuation: &mut Valuation) {
        let total = search.total();
        if total <= self.epsilon {
            return;
        }
        valuation.wash_sales = search
            .matches
            .iter()
            .map(|m| WashNotice {
                date: m.date,
                shares: m.shares,
                amount: m.amount,
            })
            .collect();
        valuation.wash_total = total;
    }

    /// Mark replacement shares as used, once per sale.
    ///
    /// Both valuations search the same shares, so a replacement matched by
    /// both is only counted once.
    pub fn mark_washed(&self, searches: &[&WashSearch], lots: &mut [Lot], remaining: &mut [Transaction]) {
        let mut washed: BTreeMap<Replacement, f64> = BTreeMap::new();
        for search in searches {
            for m in &search.matches {
                let entry = washed.entry(m.replacement).or_insert(0.0);
                *entry = entry.max(m.shares);
            }
        }

        for (replacement, shares) in washed {
            match replacement {
                Replacement::Lot(i) => {
                    if let Some(lot) = lots.get_mut(i) {
                        lot.washed_shares += shares;
                    }
                }
                Replacement::Pending(i) => {
                    if let Some(wash) = remaining.get_mut(i).and_then(|tx| tx.wash_mut()) {
                        wash.washed_shares += shares;
                    }
                }
            }
        }
    }
}
