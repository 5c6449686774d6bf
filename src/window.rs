//! Windowing and smoothing.
//!
//! The `*_in_place` methods rewrite a series' arrays and are the narrow
//! fast path; everything else returns a new series.

use crate::data::model::{MassSeries, RateSeries, Series, WorkingRateSeries};
use crate::error::{CombineError, Result};

/// Slack for bin and window edges.
const EDGE_EPS: f64 = 1e-9;

fn retain<T: Copy>(values: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    values.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
}

// ---------------------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------------------

impl RateSeries {
    /// Clip to `[min, max]`. Intervals straddling a bound are clipped to it;
    /// intervals entirely outside are dropped.
    pub fn truncate_in_place(&mut self, min: Option<f64>, max: Option<f64>) {
        let lo = min.unwrap_or(f64::NEG_INFINITY);
        let hi = max.unwrap_or(f64::INFINITY);

        let keep: Vec<bool> = self
            .t0
            .iter()
            .zip(&self.t1)
            .map(|(&t0, &t1)| t1 >= lo && t0 <= hi)
            .collect();
        for t0 in &mut self.t0 {
            *t0 = t0.max(lo);
        }
        for t1 in &mut self.t1 {
            *t1 = t1.min(hi);
        }

        retain(&mut self.t0, &keep);
        retain(&mut self.t1, &keep);
        retain(&mut self.rate, &keep);
        retain(&mut self.error, &keep);
        retain(&mut self.area, &keep);
    }
}

impl MassSeries {
    /// Keep samples with `min <= t <= max`.
    pub fn truncate_in_place(&mut self, min: Option<f64>, max: Option<f64>) {
        let keep = in_window(&self.t, min, max);
        retain(&mut self.t, &keep);
        retain(&mut self.mass, &keep);
        retain(&mut self.error, &keep);
        retain(&mut self.area, &keep);
    }
}

impl WorkingRateSeries {
    /// Keep samples with `min <= t <= max`.
    pub fn truncate_in_place(&mut self, min: Option<f64>, max: Option<f64>) {
        let keep = in_window(&self.t, min, max);
        retain(&mut self.t, &keep);
        retain(&mut self.rate, &keep);
        retain(&mut self.error, &keep);
        retain(&mut self.area, &keep);
    }
}

fn in_window(t: &[f64], min: Option<f64>, max: Option<f64>) -> Vec<bool> {
    let lo = min.unwrap_or(f64::NEG_INFINITY);
    let hi = max.unwrap_or(f64::INFINITY);
    t.iter().map(|&t| t >= lo && t <= hi).collect()
}

impl Series {
    /// In-place truncation. Any other holder of this series' arrays sees the
    /// clipped data, so callers must treat the pre-truncation series as gone.
    pub fn truncate_in_place(&mut self, min: Option<f64>, max: Option<f64>) {
        match self {
            Series::Rate(s) => s.truncate_in_place(min, max),
            Series::Mass(s) => s.truncate_in_place(min, max),
            Series::Working(s) => s.truncate_in_place(min, max),
        }
    }

    /// Truncated copy; `self` is left untouched.
    pub fn truncate(&self, min: Option<f64>, max: Option<f64>) -> Series {
        let mut out = self.clone();
        out.truncate_in_place(min, max);
        out
    }
}

// ---------------------------------------------------------------------------
// Reduction onto a coarser grid
// ---------------------------------------------------------------------------

struct Reduced {
    t: Vec<f64>,
    v: Vec<f64>,
    e: Vec<f64>,
    a: Vec<f64>,
}

/// Bin `(t, v, e, a)` into `[offset + k·window, offset + (k+1)·window)`,
/// emitting one sample per bin at its centre: mean value, quadrature-mean
/// error, mean area. Bins without a finite value are gaps: leading gaps take
/// the first finite bin's values when `backfill` is set, all others are left
/// out.
fn reduce_arrays(t: &[f64], v: &[f64], e: &[f64], a: &[f64], window: f64, offset: f64, backfill: bool) -> Reduced {
    let mut out = Reduced { t: Vec::new(), v: Vec::new(), e: Vec::new(), a: Vec::new() };
    let bin_of = |t: f64| ((t - offset) / window + EDGE_EPS).floor() as i64;

    let mut leading: Vec<i64> = Vec::new();
    let mut i = 0;
    while i < t.len() {
        let k = bin_of(t[i]);
        let start = i;
        while i < t.len() && bin_of(t[i]) == k {
            i += 1;
        }
        let finite: Vec<usize> = (start..i).filter(|&j| v[j].is_finite()).collect();
        if finite.is_empty() {
            if out.t.is_empty() {
                leading.push(k);
            }
            continue;
        }

        let n = finite.len() as f64;
        let value = finite.iter().map(|&j| v[j]).sum::<f64>() / n;
        let error = finite.iter().map(|&j| e[j] * e[j]).sum::<f64>().sqrt() / n;
        let area = finite.iter().map(|&j| a[j]).sum::<f64>() / n;

        if out.t.is_empty() && backfill {
            for &gap in &leading {
                out.t.push(offset + (gap as f64 + 0.5) * window);
                out.v.push(value);
                out.e.push(error);
                out.a.push(area);
            }
        }
        out.t.push(offset + (k as f64 + 0.5) * window);
        out.v.push(value);
        out.e.push(error);
        out.a.push(area);
    }
    out
}

fn check_window(window: f64) -> Result<()> {
    if !(window > 0.0) || !window.is_finite() {
        return Err(CombineError::InvalidParameter(format!("window must be positive, got {window}")));
    }
    Ok(())
}

impl WorkingRateSeries {
    /// Resample onto a grid of spacing `window` phased at `offset`.
    pub fn reduce(&self, window: f64, offset: f64, backfill: bool) -> Result<WorkingRateSeries> {
        check_window(window)?;
        let r = reduce_arrays(&self.t, &self.rate, &self.error, &self.area, window, offset, backfill);
        Ok(WorkingRateSeries {
            info: self.info.clone(),
            t: r.t,
            rate: r.v,
            error: r.e,
            area: r.a,
            step: window,
        })
    }
}

impl MassSeries {
    /// Resample onto a grid of spacing `window` phased at `offset`.
    pub fn reduce(&self, window: f64, offset: f64, backfill: bool) -> Result<MassSeries> {
        check_window(window)?;
        let r = reduce_arrays(&self.t, &self.mass, &self.error, &self.area, window, offset, backfill);
        Ok(MassSeries { info: self.info.clone(), t: r.t, mass: r.v, error: r.e, area: r.a })
    }
}

// ---------------------------------------------------------------------------
// Smoothing
// ---------------------------------------------------------------------------

/// Centred moving average of total width `window` (time units). Near the
/// ends the half-width shrinks to the distance to the nearest end so the
/// window stays symmetric. Errors are combined in quadrature over the same
/// window: `sqrt(Σe²) / n`.
fn smooth_arrays(t: &[f64], v: &[f64], e: &[f64], window: f64) -> (Vec<f64>, Vec<f64>) {
    let n = t.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let (first, last) = (t[0], t[n - 1]);
    let half = window / 2.0;

    (0..n)
        .map(|i| {
            let h = half.min(t[i] - first).min(last - t[i]);
            let lo = t[..i].partition_point(|&x| x < t[i] - h - EDGE_EPS);
            let hi = i + t[i..].partition_point(|&x| x <= t[i] + h + EDGE_EPS);
            let count = (hi - lo) as f64;
            let value = v[lo..hi].iter().sum::<f64>() / count;
            let error = e[lo..hi].iter().map(|x| x * x).sum::<f64>().sqrt() / count;
            (value, error)
        })
        .unzip()
}

impl WorkingRateSeries {
    /// Moving-average smoothing over `window` years; length is preserved.
    pub fn smooth(&self, window: f64) -> Result<WorkingRateSeries> {
        check_window(window)?;
        let (rate, error) = smooth_arrays(&self.t, &self.rate, &self.error, window);
        Ok(WorkingRateSeries { rate, error, ..self.clone() })
    }
}

impl MassSeries {
    /// Moving-average smoothing over `window` years; length is preserved.
    pub fn smooth(&self, window: f64) -> Result<MassSeries> {
        check_window(window)?;
        let (mass, error) = smooth_arrays(&self.t, &self.mass, &self.error, window);
        Ok(MassSeries { mass, error, ..self.clone() })
    }
}

impl Series {
    /// Reduce point-sampled variants; interval rates must be chunked first
    /// and come back as `None`.
    pub fn reduce(&self, window: f64, offset: f64, backfill: bool) -> Result<Option<Series>> {
        Ok(match self {
            Series::Working(s) => Some(s.reduce(window, offset, backfill)?.into()),
            Series::Mass(s) => Some(s.reduce(window, offset, backfill)?.into()),
            Series::Rate(_) => None,
        })
    }

    /// Smooth point-sampled variants; interval rates come back as `None`.
    pub fn smooth(&self, window: f64) -> Result<Option<Series>> {
        Ok(match self {
            Series::Working(s) => Some(s.smooth(window)?.into()),
            Series::Mass(s) => Some(s.smooth(window)?.into()),
            Series::Rate(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::basins::{BasinGroup, IceSheet};
    use crate::data::model::SeriesInfo;

    fn info() -> SeriesInfo {
        SeriesInfo::new(BasinGroup::Zwally, IceSheet::Eais).with_user("charlie")
    }

    fn working(t: Vec<f64>, rate: Vec<f64>) -> WorkingRateSeries {
        let n = t.len();
        WorkingRateSeries::new(info(), t, rate, vec![1.0; n], vec![0.0; n], 1.0).unwrap()
    }

    #[test]
    fn truncate_clips_straddling_interval() {
        let s = RateSeries::new(
            info(),
            vec![1990.0, 1999.0],
            vec![1991.0, 2000.0],
            vec![5.0, 7.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        )
        .unwrap();
        let mut clipped = s.clone();
        clipped.truncate_in_place(Some(1999.5), Some(2000.5));
        assert_eq!(clipped.t0(), &[1999.5]);
        assert_eq!(clipped.t1(), &[2000.0]);
        assert_eq!(clipped.rate(), &[7.0]);
        // the source is untouched by the pure variant
        let pure = Series::Rate(s.clone()).truncate(Some(1999.5), Some(2000.5));
        assert_eq!(pure.len(), 1);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn truncate_points_inclusive() {
        let mut w = working(vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]);
        w.truncate_in_place(Some(2.0), Some(3.0));
        assert_eq!(w.t(), &[2.0, 3.0]);
        assert_eq!(w.rate(), &[2.0, 3.0]);
    }

    #[test]
    fn reduce_bins_and_centres() {
        let t: Vec<f64> = (0..24).map(|i| 2000.0 + i as f64 / 12.0).collect();
        let rate: Vec<f64> = (0..24).map(|i| if i < 12 { 1.0 } else { 3.0 }).collect();
        let n = t.len();
        let w = WorkingRateSeries::new(info(), t, rate, vec![2.0; n], vec![0.0; n], 1.0 / 12.0).unwrap();
        let r = w.reduce(1.0, 0.0, false).unwrap();
        assert_eq!(r.t(), &[2000.5, 2001.5]);
        assert_eq!(r.rate(), &[1.0, 3.0]);
        assert!((r.error()[0] - 2.0 * 12f64.sqrt() / 12.0).abs() < 1e-12);
        assert_eq!(r.step(), 1.0);
    }

    #[test]
    fn reduce_backfills_leading_gaps_only_on_request() {
        let w = working(vec![0.5, 1.5, 2.5, 3.5], vec![f64::NAN, f64::NAN, 4.0, 6.0]);
        let plain = w.reduce(1.0, 0.0, false).unwrap();
        assert_eq!(plain.t(), &[2.5, 3.5]);
        let filled = w.reduce(1.0, 0.0, true).unwrap();
        assert_eq!(filled.t(), &[0.5, 1.5, 2.5, 3.5]);
        assert_eq!(filled.rate(), &[4.0, 4.0, 4.0, 6.0]);
    }

    #[test]
    fn smooth_preserves_length_and_truncates_symmetrically() {
        let w = working(vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![0.0, 3.0, 6.0, 9.0, 30.0]);
        let s = w.smooth(2.0).unwrap();
        assert_eq!(s.len(), 5);
        // ends see only themselves; interior points average their neighbours
        assert_eq!(s.rate()[0], 0.0);
        assert_eq!(s.rate()[1], 3.0);
        assert_eq!(s.rate()[3], 15.0);
        assert_eq!(s.rate()[4], 30.0);
        assert!((s.error()[2] - 3f64.sqrt() / 3.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_window_is_rejected() {
        let w = working(vec![0.0], vec![1.0]);
        assert!(w.smooth(0.0).is_err());
        assert!(w.reduce(-1.0, 0.0, false).is_err());
    }
}
