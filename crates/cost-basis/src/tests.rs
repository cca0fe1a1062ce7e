use chrono::{Duration, NaiveDate};

use crate::engine::{Engine, SecurityReport};
use crate::error::CostBasisError;
use crate::events::{BuyEvent, LedgerEvent, SellEvent};
use crate::feed::{Portfolio, SupplementRecord};
use crate::sale::ValuationMethod;
use crate::summary::TaxYearSummary;
use crate::term::Term;
use crate::transaction::{Action, Transaction, TransactionKind};
use crate::EngineConfig;

/// Helper: day `n` counted from 2024-01-01.
fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

/// Helper: a sale with confirmed proceeds.
fn confirmed_sell(date: NaiveDate, shares: f64, amount: f64) -> Transaction {
    Transaction::sell(date, shares, amount, Some(amount / shares))
}

/// Helper: engine without lot snapshots, so events map one-to-one.
fn engine() -> Engine {
    Engine::new(EngineConfig {
        lot_snapshots: false,
        ..EngineConfig::default()
    })
}

fn run(txs: Vec<Transaction>) -> SecurityReport {
    engine().process_security("ACME", txs).unwrap()
}

fn sells(report: &SecurityReport) -> Vec<&SellEvent> {
    report
        .events
        .iter()
        .filter_map(|e| match e {
            LedgerEvent::Sell(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn buys(report: &SecurityReport) -> Vec<&BuyEvent> {
    report
        .events
        .iter()
        .filter_map(|e| match e {
            LedgerEvent::Buy(b) => Some(b),
            _ => None,
        })
        .collect()
}

#[test]
fn test_full_liquidation() {
    let report = run(vec![
        Transaction::buy(day(0), 3.0, 30.0),
        Transaction::buy(day(5), 4.5, 50.0),
        Transaction::buy(day(9), 2.5, 40.0),
        Transaction::sell(day(20), 10.0, 130.0, None),
    ]);

    let sale = sells(&report)[0];
    let sold: f64 = sale.fifo.lots.iter().map(|l| l.shares).sum();
    assert!((sold - 10.0).abs() < 1e-9);
    assert_eq!(report.final_totals.shares, 0.0);
    assert_eq!(report.final_totals.basis, 0.0);
    assert!((sale.fifo.basis - 120.0).abs() < 1e-9);
    assert!((sale.average_cost.basis - 120.0).abs() < 1e-9);
}

#[test]
fn test_fifo_order_leaves_newest_lot_untouched() {
    let report = run(vec![
        Transaction::buy(day(0), 5.0, 500.0),
        Transaction::buy(day(1), 5.0, 10.0),
        Transaction::buy(day(2), 5.0, 50.0),
        Transaction::sell(day(3), 7.0, 70.0, None),
    ]);

    let sale = sells(&report)[0];
    assert_eq!(sale.fifo.lots.len(), 2);
    assert_eq!((sale.fifo.lots[0].date, sale.fifo.lots[0].shares), (day(0), 5.0));
    assert_eq!((sale.fifo.lots[1].date, sale.fifo.lots[1].shares), (day(1), 2.0));
    assert!((sale.fifo.basis - 504.0).abs() < 1e-9);
    assert_eq!(report.final_totals.shares, 8.0);
}

#[test]
fn test_split_through_engine() {
    let report = Engine::default()
        .process_security(
            "ACME",
            vec![
                Transaction::buy(day(0), 100.0, 1000.0),
                Transaction::split(day(10), 20.0),
            ],
        )
        .unwrap();

    // buy, lots, split, lots
    assert_eq!(report.events.len(), 4);
    match &report.events[3] {
        LedgerEvent::Lots(snapshot) => {
            assert_eq!(snapshot.lots.len(), 1);
            assert_eq!(snapshot.lots[0].shares, 200.0);
            assert_eq!(snapshot.lots[0].price, 5.0);
        }
        other => panic!("expected lots snapshot, got {:?}", other),
    }
    assert_eq!(report.final_totals.shares, 200.0);
    assert_eq!(report.final_totals.basis, 1000.0);
}

#[test]
fn test_gain_triggers_no_wash_sale() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 100.0),
        confirmed_sell(day(10), 10.0, 150.0),
        Transaction::buy(day(20), 10.0, 120.0),
    ]);

    let sale = sells(&report)[0];
    assert!(sale.fifo.wash_sales.is_empty());
    assert!(sale.average_cost.wash_sales.is_empty());
    assert_eq!(sale.fifo.wash_total, 0.0);
    assert!(buys(&report)[1].wash.is_none());
    assert_eq!(buys(&report)[1].price, 12.0);
}

#[test]
fn test_loss_defers_into_future_purchase() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 100.0),
        confirmed_sell(day(10), 10.0, 50.0),
        Transaction::buy(day(20), 10.0, 80.0),
    ]);

    let sale = sells(&report)[0];
    assert_eq!(sale.fifo.wash_sales.len(), 1);
    assert_eq!(sale.fifo.wash_sales[0].date, day(20));
    assert_eq!(sale.fifo.wash_sales[0].shares, 10.0);
    assert!((sale.fifo.wash_sales[0].amount - 50.0).abs() < 1e-9);
    assert!((sale.fifo.wash_total - 50.0).abs() < 1e-9);
    assert!((sale.average_cost.wash_total - 50.0).abs() < 1e-9);

    let replacement = buys(&report)[1];
    let wash = replacement.wash.expect("deferred adjustment applied");
    assert!((wash.price - 5.0).abs() < 1e-9);
    assert!((wash.basis - 50.0).abs() < 1e-9);
    assert_eq!(wash.washed_shares, 10.0);
    assert!((replacement.price - 13.0).abs() < 1e-9);
    assert!((report.final_totals.basis - 130.0).abs() < 1e-9);
}

#[test]
fn test_purchase_outside_window_is_not_replacement() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 100.0),
        confirmed_sell(day(10), 10.0, 50.0),
        Transaction::buy(day(41), 10.0, 80.0),
    ]);

    let sale = sells(&report)[0];
    assert!(sale.fifo.wash_sales.is_empty());
    assert!(buys(&report)[1].wash.is_none());
}

#[test]
fn test_loss_defers_into_earlier_purchase() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 200.0),
        Transaction::buy(day(50), 10.0, 100.0),
        confirmed_sell(day(60), 10.0, 100.0),
    ]);

    let sale = sells(&report)[0];
    // FIFO sells the $20 lot: $100 loss, all of it absorbed by the day-50 lot
    assert!((sale.fifo.basis - 200.0).abs() < 1e-9);
    assert!((sale.fifo.wash_total - 100.0).abs() < 1e-9);
    assert_eq!(sale.fifo.wash_sales[0].date, day(50));

    // Average cost is $15: $50 loss added to total basis
    assert!((sale.average_cost.basis - 150.0).abs() < 1e-9);
    assert!((sale.average_cost.wash_total - 50.0).abs() < 1e-9);
    assert!((report.final_totals.basis - 200.0).abs() < 1e-9);
    assert_eq!(report.final_totals.shares, 10.0);
}

#[test]
fn test_washed_shares_are_not_reused_by_later_sales() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 200.0),
        confirmed_sell(day(9), 5.0, 50.0),
        confirmed_sell(day(11), 2.0, 20.0),
    ]);

    let sales = sells(&report);
    // First loss washes into the 5 shares left in the same lot
    assert!((sales[0].fifo.wash_total - 50.0).abs() < 1e-9);
    assert_eq!(sales[0].fifo.wash_sales[0].shares, 5.0);

    // Those shares are spent as replacements; the second loss stands
    assert!((sales[1].fifo.basis - 60.0).abs() < 1e-9);
    assert!(sales[1].fifo.wash_sales.is_empty());
    assert!(sales[1].average_cost.wash_sales.is_empty());
}

#[test]
fn test_pending_purchase_absorbs_loss_once_lot_is_spent() {
    let report = run(vec![
        Transaction::buy(day(0), 20.0, 200.0),
        confirmed_sell(day(5), 10.0, 50.0),
        confirmed_sell(day(8), 10.0, 50.0),
        Transaction::buy(day(15), 10.0, 60.0),
    ]);

    let sales = sells(&report);
    // First loss washes into the 10 shares left in the day-0 lot
    assert_eq!(sales[0].fifo.wash_sales.len(), 1);
    assert_eq!(sales[0].fifo.wash_sales[0].date, day(0));

    // Those are spent, so the second loss goes to the upcoming purchase
    assert!((sales[1].fifo.basis - 150.0).abs() < 1e-9);
    assert_eq!(sales[1].fifo.wash_sales.len(), 1);
    assert_eq!(sales[1].fifo.wash_sales[0].date, day(15));
    assert_eq!(sales[1].fifo.wash_sales[0].shares, 10.0);
    assert!((sales[1].fifo.wash_sales[0].amount - 100.0).abs() < 1e-9);
    assert!((sales[1].average_cost.wash_total - 100.0).abs() < 1e-9);

    let wash = buys(&report)[1].wash.expect("deferred adjustment applied");
    assert_eq!(wash.washed_shares, 10.0);
    assert!((wash.price - 10.0).abs() < 1e-9);
    assert!((wash.basis - 100.0).abs() < 1e-9);
    assert!((buys(&report)[1].price - 16.0).abs() < 1e-9);
    assert!((report.final_totals.basis - 160.0).abs() < 1e-9);
}

#[test]
fn test_pending_replacement_is_not_reused_by_later_sale() {
    // The day-0 lot is outside both windows, so only the day-70 purchase
    // can replace either sale.
    let report = run(vec![
        Transaction::buy(day(0), 20.0, 200.0),
        confirmed_sell(day(60), 10.0, 50.0),
        confirmed_sell(day(65), 10.0, 50.0),
        Transaction::buy(day(70), 10.0, 100.0),
    ]);

    let sales = sells(&report);
    assert_eq!(sales[0].fifo.wash_sales.len(), 1);
    assert_eq!(sales[0].fifo.wash_sales[0].date, day(70));
    assert_eq!(sales[0].fifo.wash_sales[0].shares, 10.0);

    // All ten shares were taken by the first sale
    assert!(sales[1].fifo.wash_sales.is_empty());
    assert!(sales[1].average_cost.wash_sales.is_empty());
    assert_eq!(sales[1].fifo.wash_total, 0.0);

    let wash = buys(&report)[1].wash.expect("deferred adjustment applied");
    assert_eq!(wash.washed_shares, 10.0);
    assert!((wash.price - 5.0).abs() < 1e-9);
    assert!((wash.basis - 50.0).abs() < 1e-9);
    assert!((report.final_totals.basis - 150.0).abs() < 1e-9);
}

#[test]
fn test_unconfirmed_sale_skips_wash_sale_check() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 100.0),
        Transaction::sell(day(10), 10.0, 50.0, None),
        Transaction::buy(day(20), 10.0, 80.0),
    ]);

    assert!(sells(&report)[0].fifo.wash_sales.is_empty());
    assert!(buys(&report)[1].wash.is_none());
}

#[test]
fn test_wash_sale_check_can_be_disabled() {
    let engine = Engine::new(EngineConfig {
        wash_sale_enabled: false,
        lot_snapshots: false,
        ..EngineConfig::default()
    });
    let report = engine
        .process_security(
            "ACME",
            vec![
                Transaction::buy(day(0), 10.0, 100.0),
                confirmed_sell(day(10), 10.0, 50.0),
                Transaction::buy(day(20), 10.0, 80.0),
            ],
        )
        .unwrap();
    assert!(sells(&report)[0].fifo.wash_sales.is_empty());
}

#[test]
fn test_inert_actions_emit_nothing() {
    let mut txs = vec![Transaction::buy(day(0), 10.0, 100.0)];
    txs.push(Transaction {
        date: day(1),
        action: Action::Other("Div".to_string()),
        kind: TransactionKind::Inert,
    });
    let report = run(txs);
    assert_eq!(report.events.len(), 1);
}

#[test]
fn test_terms_in_sale_breakdown() {
    let start = NaiveDate::from_ymd_opt(1997, 3, 5).unwrap();
    let report = run(vec![
        Transaction::buy(start, 5.0, 50.0),
        Transaction::buy(start + Duration::days(200), 5.0, 50.0),
        Transaction::sell(NaiveDate::from_ymd_opt(1998, 3, 6).unwrap(), 10.0, 200.0, None),
    ]);

    let sale = sells(&report)[0];
    assert_eq!(sale.fifo.lots[0].term, Term::Long);
    assert_eq!(sale.fifo.lots[1].term, Term::Short);
    assert_eq!(sale.fifo.long.shares, 5.0);
    assert_eq!(sale.fifo.short.shares, 5.0);
}

#[test]
fn test_batch_continues_after_failing_security() {
    let mut portfolio = Portfolio::new();
    portfolio.push("BAD", Transaction::buy(day(0), 1.0, 10.0));
    portfolio.push("BAD", Transaction::sell(day(1), 2.0, 20.0, None));
    portfolio.push("GOOD", Transaction::buy(day(0), 1.0, 10.0));

    let results = engine().process_portfolio(portfolio);
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0].1, Err(CostBasisError::Oversold { .. })));
    assert!(results[1].1.is_ok());
}

#[test]
fn test_supplement_then_process() {
    let mut portfolio = Portfolio::new();
    portfolio.push("ACME", Transaction::buy(day(0), 10.0, 100.0));
    portfolio.push("ACME", Transaction::sell(day(10), 10.0, 0.0, None));
    portfolio.push("ACME", Transaction::buy(day(20), 10.0, 80.0));

    portfolio
        .merge_supplement(&[SupplementRecord {
            security: "ACME".to_string(),
            date: day(10),
            price: 5.0,
            amount: 50.0,
            shares: 10.0,
        }])
        .unwrap();
    portfolio.require_sale_prices().unwrap();

    let (_, result) = engine().process_portfolio(portfolio).remove(0);
    let report = result.unwrap();
    assert!((sells(&report)[0].fifo.wash_total - 50.0).abs() < 1e-9);
}

#[test]
fn test_tax_year_summary() {
    let report = run(vec![
        Transaction::buy(day(0), 10.0, 200.0),
        Transaction::buy(day(50), 10.0, 100.0),
        confirmed_sell(day(60), 10.0, 100.0),
        Transaction::sell(day(70), 5.0, 100.0, None),
    ]);

    let summaries = TaxYearSummary::from_events(&report.events);
    assert_eq!(summaries.len(), 2);

    let fifo = &summaries[0];
    assert_eq!(fifo.tax_year, 2024);
    assert_eq!(fifo.method, ValuationMethod::Fifo);
    assert_eq!(fifo.short_term.shares, 15.0);
    assert!((fifo.short_term.proceeds - 100.0).abs() < 1e-9);
    assert!((fifo.wash_sale_disallowed - 100.0).abs() < 1e-9);
    assert_eq!(fifo.unpriced_sales, 1);
    assert_eq!(fifo.long_term.shares, 0.0);

    assert_eq!(summaries[1].method, ValuationMethod::AverageCost);
}

#[test]
fn test_events_serialize_with_type_tag() {
    let report = run(vec![Transaction::buy(day(0), 1.0, 10.0)]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["events"][0]["type"], "buy");
    assert_eq!(json["security"], "ACME");
}
