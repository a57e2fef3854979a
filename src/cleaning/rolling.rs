//! Centered rolling statistics over a time-ordered series.
//!
//! A window of size `w` centered on position `i` covers
//! `[end - w, end)` with `end = i + 1 + (w - 1) / 2`, so even windows lean
//! one element towards the past. Positions whose window does not fit inside
//! the series get `None`; no partial windows are ever computed.

use std::ops::Range;

/// Bounds of the centered window around `index`, if it fits.
pub fn centered_window(index: usize, len: usize, window: usize) -> Option<Range<usize>> {
    if window == 0 {
        return None;
    }

    let end = index + 1 + (window - 1) / 2;
    if end > len || end < window {
        return None;
    }

    Some(end - window..end)
}

fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    (0..values.len())
        .map(|i| centered_window(i, values.len(), window).and_then(|range| stat(&values[range])))
        .collect()
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

pub fn rolling_median(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, median)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
