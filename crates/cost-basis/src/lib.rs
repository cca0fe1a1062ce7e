//! Cost Basis
//!
//! Lot-level cost basis for an investment account: FIFO and average-cost
//! valuation of every sale, short/long term classification, and US
//! wash-sale loss deferral into replacement shares.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod feed;
pub mod ledger;
pub mod sale;
pub mod summary;
pub mod term;
pub mod transaction;
pub mod wash_sale;

#[cfg(test)]
mod tests;

pub use config::EngineConfig;
pub use engine::{Engine, SecurityReport};
pub use error::{CostBasisError, Result};
pub use events::{BuyEvent, LedgerEvent, LotPosition, LotsSnapshot, SellEvent, SplitEvent};
pub use feed::{Portfolio, SupplementRecord};
pub use ledger::{Holdings, Lot, Totals};
pub use sale::{SaleLot, TermTotal, Valuation, ValuationMethod, WashNotice};
pub use summary::{TaxYearSummary, TermSummary};
pub use term::{classify, Term};
pub use transaction::{
    parse_date, Action, ActionKind, RawTransaction, Transaction, TransactionKind, WashAdjustment,
};
pub use wash_sale::{WashSaleAdjuster, WashSaleWindow};
