//! Turning scored candidates into persisted match rows.
//!
//! Benchmark candidates never reach the table; real candidates are compared against the benchmark's net price
//! and written with all monetary fields clamped to the storable range. Insertion is idempotent per
//! (quotation, opportunity) pair, so a retried job can run this step again safely.
use agm_common::Money;
use futures_util::future::join_all;
use log::*;

use crate::{
    db_types::{NewMatch, PaymentOption, QuotationContext, ReferenceDiffType},
    matching::scoring::ScoredMatch,
    traits::MatchingDatabase,
};

/// Persists every real scored match. Returns the ids of the rows actually inserted; duplicates and row-level
/// failures are logged and skipped without affecting their siblings.
pub async fn persist_matches<B: MatchingDatabase>(
    db: &B,
    ctx: &QuotationContext,
    results: &[ScoredMatch],
    benchmark: Option<&ScoredMatch>,
) -> Vec<i64> {
    let rows = results
        .iter()
        .filter(|r| !r.is_benchmark())
        .filter_map(|r| build_new_match(ctx, r, benchmark))
        .collect::<Vec<NewMatch>>();
    let inserts = rows.iter().map(|row| db.insert_match(row));
    let outcomes = join_all(inserts).await;
    let mut inserted = Vec::with_capacity(rows.len());
    for (row, outcome) in rows.iter().zip(outcomes) {
        match outcome {
            Ok(Some(id)) => inserted.push(id),
            Ok(None) => {
                debug!("🗃️ Match for quotation #{} / opportunity #{} already exists", row.quotation_id,
                    row.opportunity_id)
            },
            Err(e) => {
                error!("🗃️ Could not persist the match for quotation #{} / opportunity #{}: {e}", row.quotation_id,
                    row.opportunity_id)
            },
        }
    }
    inserted
}

/// Builds the insertable row for one scored candidate, or `None` when its chosen payment option has vanished
/// from the loaded context.
fn build_new_match(ctx: &QuotationContext, result: &ScoredMatch, benchmark: Option<&ScoredMatch>)
    -> Option<NewMatch>
{
    let Some(option) = result.candidate.payment_option(result.payment_option_id) else {
        warn!("🗃️ Payment option #{} is missing from opportunity #{}. Skipping this match", result.payment_option_id,
            result.candidate.id());
        return None;
    };
    let quantity = ctx.quantity_tons();
    let (benchmark_price, benchmark_diff, benchmark_diff_percent) = benchmark_comparison(result, benchmark);
    Some(NewMatch {
        quotation_id: ctx.id(),
        opportunity_id: result.candidate.id(),
        payment_option_id: option.id,
        score: Money::clamped(result.score),
        profitability: Money::clamped(result.profitability),
        commission: Money::clamped(result.commission_total),
        transportation_cost: Money::clamped(result.transport_cost_total),
        price_per_ton: Money::clamped(result.price_per_ton),
        total_amount: Money::clamped(result.price_per_ton * quantity),
        exchange_rate_used: result.exchange_rate_used,
        distance_km: result.distance_km.round() as i64,
        is_promoted: result.is_promoted,
        transport_rate_applied: Some(Money::clamped(result.transport_rate_per_ton)),
        payment_term_days: option.payment_term_days,
        is_reference_based: option.is_reference_based,
        reference_diff_display: reference_diff_display(option),
        benchmark_price_per_ton: benchmark_price,
        benchmark_difference: benchmark_diff,
        benchmark_difference_percent: benchmark_diff_percent,
    })
}

/// Compares the candidate's net price per ton (normalized price minus transport per ton) against the
/// benchmark's. Returns `(benchmark raw price, absolute difference, percentage difference)`, all `None` when no
/// benchmark was scored. The stored benchmark price is the reference market's quoted price per ton; transport
/// is netted out on both sides only for the difference and percentage. The percentage is `None` when the
/// benchmark nets out to zero.
fn benchmark_comparison(result: &ScoredMatch, benchmark: Option<&ScoredMatch>)
    -> (Option<Money>, Option<Money>, Option<f64>)
{
    let Some(bench) = benchmark else {
        return (None, None, None);
    };
    let bench_net = bench.price_per_ton - bench.transport_rate_per_ton;
    let this_net = result.price_per_ton - result.transport_rate_per_ton;
    let difference = this_net - bench_net;
    let percent = if bench_net.abs() > f64::EPSILON {
        Some((difference / bench_net * 10_000.0).round() / 100.0)
    } else {
        None
    };
    (Some(Money::clamped(bench.price_per_ton)), Some(Money::clamped(difference)), percent)
}

/// The human-readable reference-diff tag for reference-based payment options: `+5%`, `-USD 3`, `+200 ARS`.
fn reference_diff_display(option: &PaymentOption) -> Option<String> {
    if !option.is_reference_based {
        return None;
    }
    let diff = option.reference_diff?;
    let value = diff.to_f64();
    let sign = if value < 0.0 { "-" } else { "+" };
    let magnitude = trim_decimals(value.abs());
    let display = match option.reference_diff_type {
        ReferenceDiffType::Percentage => format!("{sign}{magnitude}%"),
        ReferenceDiffType::Fixed if option.reference_diff_currency.is_foreign() => {
            format!("{sign}{} {magnitude}", option.reference_diff_currency)
        },
        ReferenceDiffType::Fixed => format!("{sign}{magnitude} {}", option.reference_diff_currency),
    };
    Some(display)
}

fn trim_decimals(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
