//! Transactions
//!
//! A transaction is a dated action on one security. The action name comes
//! from the account export (Quicken investment action names) and decides
//! which shape of data the transaction carries.

use crate::error::{CostBasisError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Recognized account actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Shares transferred into the account
    ShrsIn,
    /// Reinvested dividend
    ReinvDiv,
    /// Reinvested interest
    ReinvInt,
    /// Reinvested short-term capital gain distribution
    ReinvSh,
    /// Reinvested mid-term capital gain distribution
    ReinvMd,
    /// Reinvested long-term capital gain distribution
    ReinvLg,
    Buy,
    /// Shares transferred out of the account
    ShrsOut,
    Sell,
    /// Stock split, share count encodes ten times the ratio
    StkSplit,
    /// Anything else (cash moves, dividends paid out, reminders...)
    Other(String),
}

/// What an action does to holdings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Acquire,
    Dispose,
    Split,
    Inert,
}

impl Action {
    /// Parse an action name, ignoring case. Unknown names become `Other`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "shrsin" => Action::ShrsIn,
            "reinvdiv" => Action::ReinvDiv,
            "reinvint" => Action::ReinvInt,
            "reinvsh" => Action::ReinvSh,
            "reinvmd" => Action::ReinvMd,
            "reinvlg" => Action::ReinvLg,
            "buy" | "buyx" => Action::Buy,
            "shrsout" => Action::ShrsOut,
            "sell" | "sellx" => Action::Sell,
            "stksplit" => Action::StkSplit,
            _ => Action::Other(name.trim().to_string()),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::ShrsIn
            | Action::ReinvDiv
            | Action::ReinvInt
            | Action::ReinvSh
            | Action::ReinvMd
            | Action::ReinvLg
            | Action::Buy => ActionKind::Acquire,
            Action::ShrsOut | Action::Sell => ActionKind::Dispose,
            Action::StkSplit => ActionKind::Split,
            Action::Other(_) => ActionKind::Inert,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ShrsIn => write!(f, "ShrsIn"),
            Action::ReinvDiv => write!(f, "ReinvDiv"),
            Action::ReinvInt => write!(f, "ReinvInt"),
            Action::ReinvSh => write!(f, "ReinvSh"),
            Action::ReinvMd => write!(f, "ReinvMd"),
            Action::ReinvLg => write!(f, "ReinvLg"),
            Action::Buy => write!(f, "Buy"),
            Action::ShrsOut => write!(f, "ShrsOut"),
            Action::Sell => write!(f, "Sell"),
            Action::StkSplit => write!(f, "StkSplit"),
            Action::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Wash-sale adjustment queued on a future acquisition by an earlier sale.
///
/// Written while the acquisition is still in the look-ahead window and
/// consumed when the ledger finally applies it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WashAdjustment {
    /// Added to the security's total basis (average-cost valuation)
    pub basis: f64,
    /// Added to the new lot's per-share price (FIFO valuation)
    pub price: f64,
    /// Shares already used as replacement shares
    pub washed_shares: f64,
}

impl WashAdjustment {
    pub fn is_empty(&self) -> bool {
        self.basis == 0.0 && self.price == 0.0 && self.washed_shares == 0.0
    }
}

/// Data carried by each kind of transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionKind {
    Acquire {
        shares: f64,
        amount: f64,
        commission: f64,
        wash: WashAdjustment,
    },
    Dispose {
        shares: f64,
        amount: f64,
        commission: f64,
        /// Confirmed execution price; proceeds are only trusted once set
        price: Option<f64>,
    },
    Split {
        /// Ten times the split ratio
        shares: f64,
    },
    Inert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub action: Action,
    pub kind: TransactionKind,
}

/// Untyped transaction as read from a feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: String,
    pub action: String,
    pub shares: Option<f64>,
    pub amount: Option<f64>,
    pub commission: Option<f64>,
    pub price: Option<f64>,
}

impl Transaction {
    pub fn buy(date: NaiveDate, shares: f64, amount: f64) -> Self {
        Self {
            date,
            action: Action::Buy,
            kind: TransactionKind::Acquire {
                shares,
                amount,
                commission: 0.0,
                wash: WashAdjustment::default(),
            },
        }
    }

    pub fn sell(date: NaiveDate, shares: f64, amount: f64, price: Option<f64>) -> Self {
        Self {
            date,
            action: Action::Sell,
            kind: TransactionKind::Dispose {
                shares,
                amount,
                commission: 0.0,
                price,
            },
        }
    }

    pub fn split(date: NaiveDate, shares: f64) -> Self {
        Self {
            date,
            action: Action::StkSplit,
            kind: TransactionKind::Split { shares },
        }
    }

    /// Build a typed transaction from a feed record.
    pub fn from_record(raw: &RawTransaction) -> Result<Self> {
        let date = parse_date(&raw.date)?;
        let action = Action::parse(&raw.action);
        let shares = raw.shares.unwrap_or(0.0);
        let amount = raw.amount.unwrap_or(0.0);
        let commission = raw.commission.unwrap_or(0.0);

        let kind = match action.kind() {
            ActionKind::Acquire => {
                require_positive_shares(&action, date, shares)?;
                TransactionKind::Acquire {
                    shares,
                    amount,
                    commission,
                    wash: WashAdjustment::default(),
                }
            }
            ActionKind::Dispose => {
                require_positive_shares(&action, date, shares)?;
                TransactionKind::Dispose {
                    shares,
                    amount,
                    commission,
                    price: raw.price,
                }
            }
            ActionKind::Split => {
                require_positive_shares(&action, date, shares)?;
                TransactionKind::Split { shares }
            }
            ActionKind::Inert => TransactionKind::Inert,
        };

        Ok(Self { date, action, kind })
    }

    pub fn with_commission(mut self, fee: f64) -> Self {
        match &mut self.kind {
            TransactionKind::Acquire { commission, .. }
            | TransactionKind::Dispose { commission, .. } => *commission = fee,
            _ => {}
        }
        self
    }

    /// Share count, if this kind of transaction has one
    pub fn shares(&self) -> Option<f64> {
        match &self.kind {
            TransactionKind::Acquire { shares, .. }
            | TransactionKind::Dispose { shares, .. }
            | TransactionKind::Split { shares } => Some(*shares),
            TransactionKind::Inert => None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match &self.kind {
            TransactionKind::Dispose { price, .. } => *price,
            _ => None,
        }
    }

    /// Pending wash adjustment of a not-yet-applied acquisition
    pub fn wash(&self) -> Option<&WashAdjustment> {
        match &self.kind {
            TransactionKind::Acquire { wash, .. } => Some(wash),
            _ => None,
        }
    }

    pub fn wash_mut(&mut self) -> Option<&mut WashAdjustment> {
        match &mut self.kind {
            TransactionKind::Acquire { wash, .. } => Some(wash),
            _ => None,
        }
    }
}

fn require_positive_shares(action: &Action, date: NaiveDate, shares: f64) -> Result<()> {
    if shares > 0.0 && shares.is_finite() {
        Ok(())
    } else {
        Err(CostBasisError::InvalidTransaction(format!(
            "{} on {} needs a positive share count, got {}",
            action, date, shares
        )))
    }
}

/// Parse an ISO (`2004-01-05`) or Quicken (`1/5'04`, `1/5/98`, `1/5/2004`) date.
///
/// Quicken marks years after 1999 with an apostrophe; a two-digit year after
/// a slash is in the 1900s.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let s = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    let invalid = || CostBasisError::InvalidDate(input.to_string());

    let (month_day, year, apostrophe) = match s.rsplit_once('\'') {
        Some((md, y)) => (md, y, true),
        None => {
            let (md, y) = s.rsplit_once('/').ok_or_else(invalid)?;
            (md, y, false)
        }
    };
    let (month, day) = month_day.split_once('/').ok_or_else(invalid)?;

    let month: u32 = month.trim().parse().map_err(|_| invalid())?;
    let day: u32 = day.trim().parse().map_err(|_| invalid())?;
    let year_digits = year.trim();
    let short_year: i32 = year_digits.parse().map_err(|_| invalid())?;

    let year = match (year_digits.len(), apostrophe) {
        (1 | 2, true) => 2000 + short_year,
        (1 | 2, false) => 1900 + short_year,
        (4, _) => short_year,
        _ => return Err(invalid()),
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}
