//! Cost Basis Engine
//!
//! Runs one holdings ledger per security over that security's transactions.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::LedgerEvent;
use crate::feed::Portfolio;
use crate::ledger::{Holdings, Totals};
use crate::transaction::{Transaction, TransactionKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Events of one security, in transaction order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub security: String,
    pub events: Vec<LedgerEvent>,
    pub final_totals: Totals,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Apply a security's transactions in order.
    ///
    /// Deferred wash-sale adjustments are written into `transactions` ahead
    /// of the one being applied, so the list is taken by value.
    pub fn process_security(&self, security: &str, mut transactions: Vec<Transaction>) -> Result<SecurityReport> {
        let mut holdings = Holdings::new(security, self.config);
        let mut events = Vec::new();

        for i in 0..transactions.len() {
            let (applied, remaining) = transactions.split_at_mut(i + 1);
            let tx = &applied[i];

            let event = match &tx.kind {
                TransactionKind::Acquire { .. } => LedgerEvent::Buy(holdings.apply_buy(tx)?),
                TransactionKind::Dispose { .. } => LedgerEvent::Sell(holdings.apply_sell(tx, remaining)?),
                TransactionKind::Split { .. } => LedgerEvent::Split(holdings.apply_split(tx)?),
                TransactionKind::Inert => {
                    debug!(security, date = %tx.date, action = %tx.action, "ignoring transaction");
                    continue;
                }
            };
            events.push(event);

            if self.config.lot_snapshots {
                events.push(LedgerEvent::Lots(holdings.snapshot(tx.date)));
            }
        }

        let final_totals = holdings.totals();
        info!(
            security,
            transactions = transactions.len(),
            shares = final_totals.shares,
            basis = final_totals.basis,
            "processed security"
        );

        Ok(SecurityReport {
            security: security.to_string(),
            events,
            final_totals,
        })
    }

    /// Process every security independently.
    ///
    /// A failing security is reported and does not stop the others.
    pub fn process_portfolio(&self, portfolio: Portfolio) -> Vec<(String, Result<SecurityReport>)> {
        portfolio
            .into_iter()
            .map(|(security, transactions)| {
                let result = self.process_security(&security, transactions);
                if let Err(e) = &result {
                    error!(security = %security, "aborted: {}", e);
                }
                (security, result)
            })
            .collect()
    }
}
