//! Small NaN-aware reducers shared by the series summaries and the
//! cross-contributor aggregations.

/// Arithmetic mean of the finite values, `NaN` when there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Root-mean-square of the finite values, `NaN` when there are none.
pub fn nan_rms(values: &[f64]) -> f64 {
    let squares: Vec<f64> = values.iter().map(|v| v * v).collect();
    nan_mean(&squares).sqrt()
}

/// Median of the finite values, `NaN` when there are none.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut ok: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if ok.is_empty() {
        return f64::NAN;
    }
    ok.sort_by(f64::total_cmp);
    let mid = ok.len() / 2;
    if ok.len() % 2 == 0 {
        (ok[mid - 1] + ok[mid]) / 2.0
    } else {
        ok[mid]
    }
}

/// Population standard deviation (`ddof = 0`) of the finite values.
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let squares: Vec<f64> = values
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| (v - mean).powi(2))
        .collect();
    nan_mean(&squares).sqrt()
}

pub fn finite_min(values: &[f64]) -> Option<f64> {
    values.iter().copied().filter(|v| v.is_finite()).reduce(f64::min)
}

pub fn finite_max(values: &[f64]) -> Option<f64> {
    values.iter().copied().filter(|v| v.is_finite()).reduce(f64::max)
}

/// Linear interpolation of `(xp, fp)` at `x`, clamped to the end values
/// outside the sampled range. `xp` must be ascending.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // first index with xp[i] > x; guaranteed 1..n by the clamps above
    let hi = xp[..n].partition_point(|&v| v <= x);
    let lo = hi - 1;
    let span = xp[hi] - xp[lo];
    if span <= 0.0 {
        return fp[lo];
    }
    fp[lo] + (fp[hi] - fp[lo]) * (x - xp[lo]) / span
}
