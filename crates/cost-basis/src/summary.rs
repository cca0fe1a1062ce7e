//! Tax Year Summary
//!
//! Rolls sale events up into per-year short and long term totals for each
//! valuation method.

use crate::events::LedgerEvent;
use crate::sale::{Valuation, ValuationMethod};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals for one holding period within a tax year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TermSummary {
    pub shares: f64,
    pub proceeds: f64,
    pub basis: f64,
}

impl TermSummary {
    pub fn gain(&self) -> f64 {
        self.proceeds - self.basis
    }
}

/// Year-end totals for one valuation method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxYearSummary {
    pub tax_year: i32,
    pub method: ValuationMethod,
    pub short_term: TermSummary,
    pub long_term: TermSummary,
    /// Losses disallowed by the wash-sale rule
    pub wash_sale_disallowed: f64,
    /// Sales whose proceeds were not confirmed
    pub unpriced_sales: usize,
}

impl TaxYearSummary {
    fn new(tax_year: i32, method: ValuationMethod) -> Self {
        Self {
            tax_year,
            method,
            short_term: TermSummary::default(),
            long_term: TermSummary::default(),
            wash_sale_disallowed: 0.0,
            unpriced_sales: 0,
        }
    }

    pub fn net_gain(&self) -> f64 {
        self.short_term.gain() + self.long_term.gain()
    }

    /// Net gain with disallowed losses added back
    pub fn reportable_gain(&self) -> f64 {
        self.net_gain() + self.wash_sale_disallowed
    }

    fn add(&mut self, valuation: &Valuation, proceeds: Option<f64>) {
        let shares = valuation.shares();
        let share_of = |part: f64| match proceeds {
            Some(p) if shares > 0.0 => p * part / shares,
            _ => 0.0,
        };

        self.short_term.shares += valuation.short.shares;
        self.short_term.basis += valuation.short.amount;
        self.short_term.proceeds += share_of(valuation.short.shares);

        self.long_term.shares += valuation.long.shares;
        self.long_term.basis += valuation.long.amount;
        self.long_term.proceeds += share_of(valuation.long.shares);

        self.wash_sale_disallowed += valuation.wash_total;
        if proceeds.is_none() {
            self.unpriced_sales += 1;
        }
    }

    /// Fold sale events into summaries ordered by year, then method.
    pub fn from_events<'a, I>(events: I) -> Vec<TaxYearSummary>
    where
        I: IntoIterator<Item = &'a LedgerEvent>,
    {
        let mut summaries: BTreeMap<(i32, ValuationMethod), TaxYearSummary> = BTreeMap::new();

        for event in events {
            let LedgerEvent::Sell(sale) = event else {
                continue;
            };
            let year = sale.date.year();
            for valuation in sale.valuations() {
                summaries
                    .entry((year, valuation.method))
                    .or_insert_with(|| TaxYearSummary::new(year, valuation.method))
                    .add(valuation, sale.proceeds);
            }
        }

        summaries.into_values().collect()
    }
}
