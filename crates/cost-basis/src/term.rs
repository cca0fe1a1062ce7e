//! Holding Period Classification
//!
//! A holding becomes long-term only strictly after its one-year anniversary:
//! shares bought on March 5 and sold on March 5 of the next year are still
//! short-term, sold on March 6 they are long-term.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Short,
    Long,
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Short => write!(f, "short"),
            Term::Long => write!(f, "long"),
        }
    }
}

/// Months held past which a holding is long-term.
const LONG_TERM_MONTHS: i32 = 12;

/// Classify shares acquired on `acquired` and disposed of on `disposed`.
pub fn classify(acquired: NaiveDate, disposed: NaiveDate) -> Term {
    let buy_month = acquired.year() * 12 + acquired.month() as i32;
    let buy_day = acquired.day();

    let mut sell_month = disposed.year() * 12 + disposed.month() as i32;
    let mut sell_day = disposed.day();

    // Borrow a pseudo-month; only the ordering of days matters below.
    if sell_day < buy_day {
        sell_day += 31;
        sell_month -= 1;
    }

    let mut months = sell_month - buy_month;
    if sell_day > buy_day {
        months += 1;
    }

    if months <= LONG_TERM_MONTHS {
        Term::Short
    } else {
        Term::Long
    }
}
