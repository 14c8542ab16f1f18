//! Renders the per-cycle analysis report for the console.
//!
//! The report body carries no wall-clock time, so two identical snapshots
//! produce byte-identical output.

use crate::analysis::MarketSummary;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY, Attribute, Cell, CellAlignment,
    Color, ContentArrangement, Table,
};
use std::fmt::Write;

fn currency_symbol(vs_currency: &str) -> String {
    match vs_currency.to_ascii_lowercase().as_str() {
        "usd" => "$".to_string(),
        "eur" => "\u{20ac}".to_string(),
        "gbp" => "\u{a3}".to_string(),
        "jpy" => "\u{a5}".to_string(),
        other => format!("{} ", other.to_uppercase()),
    }
}

// 1234567.0 -> "1,234,567"
fn group_digits(value: f64) -> String {
    let raw = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

fn format_change(change: Option<f64>) -> String {
    change.map_or_else(|| "n/a".to_string(), |c| format!("{:.2}%", c))
}

fn leaderboard_table(summary: &MarketSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Rank").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Symbol").add_attribute(Attribute::Bold),
            Cell::new("Market Cap")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
        ]);

    for (i, asset) in summary.top_by_market_cap.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&asset.name),
            Cell::new(asset.symbol.to_uppercase()),
            Cell::new(group_digits(asset.market_cap)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn render(summary: &MarketSummary, vs_currency: &str) -> String {
    let symbol = currency_symbol(vs_currency);
    let mut out = String::new();

    let _ = writeln!(out, "--- Analysis Report ---");
    let _ = writeln!(
        out,
        "Top {} Cryptocurrencies by Market Cap:",
        summary.top_by_market_cap.len()
    );
    let _ = writeln!(out, "{}", leaderboard_table(summary));
    let _ = writeln!(
        out,
        "Average Price of Top {} Cryptocurrencies: {}{:.2}",
        summary.asset_count, symbol, summary.mean_price
    );
    let _ = writeln!(
        out,
        "Highest 24h Percentage Price Change: {}",
        format_change(summary.max_change_24h)
    );
    let _ = writeln!(
        out,
        "Lowest 24h Percentage Price Change: {}",
        format_change(summary.min_change_24h)
    );
    let _ = writeln!(out, "-----------------------");
    out
}

pub fn print(summary: &MarketSummary, vs_currency: &str) {
    println!("\n{}", render(summary, vs_currency));
}
