//! Text rendering of ledger events.
//!
//! Currency is shown to 2 decimals, share counts and prices to 4.

use cost_basis::{
    BuyEvent, LedgerEvent, LotsSnapshot, SecurityReport, SellEvent, SplitEvent, TaxYearSummary,
    Totals, Valuation,
};
use std::fmt::Write;

pub fn report(report: &SecurityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", report.security);
    for event in &report.events {
        match event {
            LedgerEvent::Buy(buy) => render_buy(&mut out, buy),
            LedgerEvent::Sell(sell) => render_sell(&mut out, sell),
            LedgerEvent::Split(split) => render_split(&mut out, split),
            LedgerEvent::Lots(lots) => render_lots(&mut out, lots),
        }
    }
    let _ = writeln!(out, "Final: {}", totals(&report.final_totals));
    out
}

fn totals(t: &Totals) -> String {
    format!(
        "{:.4} shares, basis ${:.2}, avg ${:.4}/share",
        t.shares,
        t.basis,
        t.average_cost()
    )
}

fn render_buy(out: &mut String, buy: &BuyEvent) {
    let _ = writeln!(
        out,
        "{}  {:<8} {:>12.4} @ {:>10.4}  ${:>12.2}   [{}]",
        buy.date,
        buy.action,
        buy.shares,
        buy.price,
        buy.amount,
        totals(&buy.totals)
    );
    if let Some(wash) = &buy.wash {
        let _ = writeln!(
            out,
            "    wash-sale adjustment: +${:.4}/share (FIFO), +${:.2} basis (average), {:.4} shares used",
            wash.price, wash.basis, wash.washed_shares
        );
    }
}

fn render_sell(out: &mut String, sell: &SellEvent) {
    let price = sell
        .price
        .map(|p| format!("@ {:>10.4}", p))
        .unwrap_or_else(|| format!("{:>12}", "(unpriced)"));
    let proceeds = sell
        .proceeds
        .map(|p| format!("${:>12.2}", p))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "{}  {:<8} {:>12.4} {}  {}   [{}]",
        sell.date,
        sell.action,
        sell.shares,
        price,
        proceeds,
        totals(&sell.totals)
    );
    for valuation in sell.valuations() {
        render_valuation(out, valuation, sell.proceeds);
    }
}

fn render_valuation(out: &mut String, valuation: &Valuation, proceeds: Option<f64>) {
    let _ = writeln!(out, "    {}:", valuation.method);
    for lot in &valuation.lots {
        let _ = writeln!(
            out,
            "      {}  {:>12.4} @ {:>10.4}  ${:>12.2}  {}",
            lot.date,
            lot.shares,
            lot.price,
            lot.amount(),
            lot.term
        );
    }
    let _ = writeln!(
        out,
        "      short {:.4} shares ${:.2}, long {:.4} shares ${:.2}",
        valuation.short.shares, valuation.short.amount, valuation.long.shares, valuation.long.amount
    );
    if let Some(p) = proceeds {
        let _ = writeln!(out, "      gain ${:.2}", valuation.gain(p));
    }
    for notice in &valuation.wash_sales {
        let _ = writeln!(
            out,
            "      wash sale: ${:.2} disallowed into {:.4} shares of {}",
            notice.amount, notice.shares, notice.date
        );
    }
    if valuation.wash_total > 0.0 {
        let _ = writeln!(out, "      wash sale total: ${:.2}", valuation.wash_total);
    }
}

fn render_split(out: &mut String, split: &SplitEvent) {
    let _ = writeln!(
        out,
        "{}  {:<8} ratio {:.4}   [{}]",
        split.date,
        "StkSplit",
        split.ratio,
        totals(&split.totals)
    );
}

fn render_lots(out: &mut String, snapshot: &LotsSnapshot) {
    if snapshot.lots.is_empty() {
        return;
    }
    let lots: Vec<String> = snapshot
        .lots
        .iter()
        .map(|lot| format!("{} {:.4}", lot.date, lot.shares))
        .collect();
    let _ = writeln!(out, "    lots: {}", lots.join(", "));
}

pub fn summaries(summaries: &[TaxYearSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Tax year summary ==");
    for s in summaries {
        let _ = writeln!(out, "{} {}:", s.tax_year, s.method);
        for (label, term) in [("short", &s.short_term), ("long", &s.long_term)] {
            let _ = writeln!(
                out,
                "  {:<5} {:>12.4} shares  proceeds ${:>12.2}  basis ${:>12.2}  gain ${:>12.2}",
                label,
                term.shares,
                term.proceeds,
                term.basis,
                term.gain()
            );
        }
        let _ = writeln!(
            out,
            "  wash sale disallowed ${:.2}, reportable gain ${:.2}",
            s.wash_sale_disallowed,
            s.reportable_gain()
        );
        if s.unpriced_sales > 0 {
            let _ = writeln!(out, "  {} sale(s) without confirmed proceeds", s.unpriced_sales);
        }
    }
    out
}
