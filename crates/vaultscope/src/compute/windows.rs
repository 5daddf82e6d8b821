//! Time-windowed APR/APY from irregularly spaced period snapshots.
//!
//! All windows are measured back from the end of the most recent completed
//! period rather than from the wall clock, so an open, still-accruing
//! period never skews a result. Missing or insufficient history yields
//! zeros: that is a normal state, not a fault.

use crate::model::PeriodSummary;
use crate::normalize::finite_or_zero;

pub const SECONDS_PER_YEAR: f64 = 365.0 * 86400.0;

const DAY_SECONDS: i64 = 86400;
const WINDOW_30D: i64 = 30 * DAY_SECONDS;
const WINDOW_7D: i64 = 7 * DAY_SECONDS;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowYields {
    pub apr_all: f64,
    pub apr_30d: f64,
    pub apr_7d: f64,
    pub apy_all: f64,
    pub apy_30d: f64,
    pub apy_7d: f64,
}

/// Derive linear APR and compounded APY over the full history and over
/// rolling 30-day and 7-day windows. Input order is irrelevant; endpoints
/// are discovered by scanning, never assumed from sort order.
pub fn yield_windows(summaries: &[PeriodSummary]) -> WindowYields {
    let mut out = WindowYields::default();

    let Some(latest) = latest_completed(summaries) else {
        return out;
    };
    let Some(p_end) = end_price(latest) else {
        return out;
    };
    let latest_end_ts = latest.end_timestamp();

    if let Some(earliest) = earliest_valid_start(summaries) {
        if let Some(p_start) = start_price(earliest) {
            let window = latest_end_ts - earliest.start_timestamp;
            if window > 0 {
                let (apr, apy) = annualized(p_start, p_end, window as f64);
                out.apr_all = apr;
                out.apy_all = apy;
            }
        }
    }

    let (apr_30d, apy_30d) = fixed_window(summaries, latest_end_ts, p_end, WINDOW_30D);
    out.apr_30d = apr_30d;
    out.apy_30d = apy_30d;

    let (apr_7d, apy_7d) = fixed_window(summaries, latest_end_ts, p_end, WINDOW_7D);
    out.apr_7d = apr_7d;
    out.apy_7d = apy_7d;

    out
}

/// Whole days since the earliest usable snapshot. None when history gives
/// no valid starting point; callers must not conflate that with age zero.
pub fn vault_age_days(summaries: &[PeriodSummary], now_ts: i64) -> Option<u64> {
    let earliest = earliest_valid_start(summaries)?;
    let age = now_ts - earliest.start_timestamp;
    (age >= 0).then(|| (age / DAY_SECONDS) as u64)
}

/// APR/APY over exactly `window` seconds ending at `latest_end_ts`. The
/// start price is interpolated within the one completed period containing
/// the target instant; a gap in history at that instant yields zeros
/// rather than a guess.
fn fixed_window(
    summaries: &[PeriodSummary],
    latest_end_ts: i64,
    p_end: f64,
    window: i64,
) -> (f64, f64) {
    let target = latest_end_ts - window;
    if target < 0 {
        return (0.0, 0.0);
    }
    let containing = summaries
        .iter()
        .filter(|s| s.is_completed())
        .filter(|s| s.start_timestamp <= target && target <= s.end_timestamp())
        .max_by_key(|s| s.start_timestamp);
    let Some(containing) = containing else {
        return (0.0, 0.0);
    };
    let Some(p_start) = price_at(containing, target) else {
        return (0.0, 0.0);
    };
    annualized(p_start, p_end, window as f64)
}

/// Price-per-share at `ts` within a period, linearly interpolated between
/// the period's boundary prices. Exact boundaries return the boundary
/// price itself, with no interpolation error.
fn price_at(summary: &PeriodSummary, ts: i64) -> Option<f64> {
    let p_start = start_price(summary)?;
    let p_end = end_price(summary)?;
    if ts <= summary.start_timestamp {
        return Some(p_start);
    }
    if ts >= summary.end_timestamp() {
        return Some(p_end);
    }
    let elapsed = (ts - summary.start_timestamp) as f64 / summary.duration_seconds as f64;
    let p = p_start + elapsed * (p_end - p_start);
    p.is_finite().then_some(p)
}

fn start_price(summary: &PeriodSummary) -> Option<f64> {
    price_ratio(summary.total_assets_at_start, summary.total_supply_at_start)
}

fn end_price(summary: &PeriodSummary) -> Option<f64> {
    price_ratio(summary.total_assets_at_end, summary.end_supply())
}

fn price_ratio(assets: f64, supply: f64) -> Option<f64> {
    if !assets.is_finite() || !supply.is_finite() || supply <= 0.0 {
        return None;
    }
    let price = assets / supply;
    (price.is_finite() && price > 0.0).then_some(price)
}

fn latest_completed(summaries: &[PeriodSummary]) -> Option<&PeriodSummary> {
    summaries
        .iter()
        .filter(|s| s.is_completed())
        .max_by_key(|s| s.end_timestamp())
}

fn earliest_valid_start(summaries: &[PeriodSummary]) -> Option<&PeriodSummary> {
    summaries
        .iter()
        .filter(|s| start_price(s).is_some())
        .min_by_key(|s| s.start_timestamp)
}

/// Linear APR and compounded APY between two prices over a window. Any
/// degenerate input or non-finite intermediate collapses to zeros.
fn annualized(p_start: f64, p_end: f64, window_seconds: f64) -> (f64, f64) {
    if p_start <= 0.0 || p_end <= 0.0 || window_seconds <= 0.0 {
        return (0.0, 0.0);
    }
    let periods_per_year = SECONDS_PER_YEAR / window_seconds;
    let apr = (p_end - p_start) / p_start * periods_per_year;
    let apy = (p_end / p_start).powf(periods_per_year) - 1.0;
    (finite_or_zero(apr), finite_or_zero(apy))
}
