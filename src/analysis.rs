//! Snapshot validation and the per-cycle aggregate statistics.

use crate::error::PipelineError;
use crate::markets::RawRecord;
use serde_json::Value;
use std::cmp::Ordering;

/// Fields every record must carry for the snapshot to be accepted.
pub const REQUIRED_FIELDS: &[&str] = &[
    "name",
    "symbol",
    "current_price",
    "market_cap",
    "total_volume",
    "price_change_percentage_24h",
];

/// Size of the market-cap leaderboard in the report.
const TOP_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedAsset {
    pub name: String,
    pub symbol: String,
    pub market_cap: f64,
}

/// Derived, ephemeral statistics for one snapshot. Recomputed from scratch
/// every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSummary {
    pub asset_count: usize,
    pub top_by_market_cap: Vec<RankedAsset>,
    pub mean_price: f64,
    // None when every record's 24h change was null.
    pub max_change_24h: Option<f64>,
    pub min_change_24h: Option<f64>,
}

// Providers occasionally ship numbers as strings; accept both.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(record: &RawRecord, key: &str, index: usize) -> Result<String, PipelineError> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PipelineError::Validation(format!("record {} has a non-text '{}' field", index, key))
        })
}

fn numeric_field(record: &RawRecord, key: &str, index: usize) -> Result<f64, PipelineError> {
    record.get(key).and_then(numeric).ok_or_else(|| {
        PipelineError::Validation(format!("record {} has a non-numeric '{}' field", index, key))
    })
}

// The key must exist (checked beforehand); a null value means the provider
// has no 24h figure for this asset and the record is skipped in max/min.
fn change_field(record: &RawRecord, index: usize) -> Result<Option<f64>, PipelineError> {
    match record.get("price_change_percentage_24h") {
        Some(Value::Null) | None => Ok(None),
        Some(value) => numeric(value).map(Some).ok_or_else(|| {
            PipelineError::Validation(format!(
                "record {} has a non-numeric 'price_change_percentage_24h' field",
                index
            ))
        }),
    }
}

/// Validates a snapshot and computes its summary statistics.
///
/// Rejection is all-or-nothing: the first record missing a required field
/// fails the whole snapshot and no summary is produced. Pure function, no
/// I/O.
pub fn analyze(snapshot: &[RawRecord]) -> Result<MarketSummary, PipelineError> {
    if snapshot.is_empty() {
        return Err(PipelineError::Validation(
            "snapshot contains no records".to_string(),
        ));
    }

    let mut ranked = Vec::with_capacity(snapshot.len());
    let mut price_sum = 0.0;
    let mut max_change: Option<f64> = None;
    let mut min_change: Option<f64> = None;

    for (index, record) in snapshot.iter().enumerate() {
        for &key in REQUIRED_FIELDS {
            if !record.contains_key(key) {
                return Err(PipelineError::Validation(format!(
                    "record {} is missing required field '{}'",
                    index, key
                )));
            }
        }

        let name = string_field(record, "name", index)?;
        let symbol = string_field(record, "symbol", index)?;
        let current_price = numeric_field(record, "current_price", index)?;
        let market_cap = numeric_field(record, "market_cap", index)?;
        numeric_field(record, "total_volume", index)?;

        price_sum += current_price;

        if let Some(change) = change_field(record, index)? {
            max_change = Some(max_change.map_or(change, |m: f64| m.max(change)));
            min_change = Some(min_change.map_or(change, |m: f64| m.min(change)));
        }

        ranked.push(RankedAsset {
            name,
            symbol,
            market_cap,
        });
    }

    // Stable sort keeps the provider's relative order for equal caps.
    ranked.sort_by(|a, b| {
        b.market_cap
            .partial_cmp(&a.market_cap)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(TOP_COUNT);

    Ok(MarketSummary {
        asset_count: snapshot.len(),
        top_by_market_cap: ranked,
        mean_price: price_sum / snapshot.len() as f64,
        max_change_24h: max_change,
        min_change_24h: min_change,
    })
}
