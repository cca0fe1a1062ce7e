use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostBasisError {
    #[error("Sold {requested} shares of {security} on {date} but only {held} were held")]
    Oversold {
        security: String,
        date: NaiveDate,
        requested: f64,
        held: f64,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Supplemental record names unknown security: {0}")]
    UnknownSecurity(String),

    #[error("No transaction for {security} on {date} with {shares} shares matches supplemental record")]
    UnmatchedSupplement {
        security: String,
        date: NaiveDate,
        shares: f64,
    },

    #[error("Sale of {shares} shares of {security} on {date} has no price")]
    MissingSalePrice {
        security: String,
        date: NaiveDate,
        shares: f64,
    },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CostBasisError>;
