//! Combination engine: pools many irregular `(times, values)` chunks onto one
//! regular time grid.
//!
//! Each chunk is sampled at every grid point inside its time span (linearly
//! interpolated between its own samples); a one-point chunk, or a chunk too
//! short to contain a grid point, lands on the nearest grid point. All
//! samples landing on a grid point are pooled. Grid points no chunk reaches
//! are left out of the output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::model::{RateSeries, WorkingRateSeries};
use crate::stats;

/// Monthly grid step, in years.
pub const MONTH: f64 = 1.0 / 12.0;

/// Slack when deciding whether a chunk boundary sits on a grid point.
const GRID_EPS: f64 = 1e-6;

/// How values landing on the same grid point are pooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Arithmetic mean.
    #[default]
    Mean,
    /// `sqrt(Σv²) / n`, for error chunks.
    Quadrature,
}

/// One ascending run of samples fed to [`combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub t: Vec<f64>,
    pub v: Vec<f64>,
}

impl Chunk {
    pub fn new(t: Vec<f64>, v: Vec<f64>) -> Self {
        Chunk { t, v }
    }

    pub fn point(t: f64, v: f64) -> Self {
        Chunk { t: vec![t], v: vec![v] }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Pool {
    sum: f64,
    sum_sq: f64,
    count: usize,
}

impl Pool {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.sum_sq += v * v;
        self.count += 1;
    }

    fn value(&self, pooling: Pooling) -> f64 {
        let n = self.count as f64;
        match pooling {
            Pooling::Mean => self.sum / n,
            Pooling::Quadrature => self.sum_sq.sqrt() / n,
        }
    }
}

fn grid_index(t: f64, step: f64) -> i64 {
    (t / step).round() as i64
}

/// Grid points `(index, value)` one chunk contributes.
fn sample_chunk(chunk: &Chunk, step: f64) -> Vec<(i64, f64)> {
    let n = chunk.t.len().min(chunk.v.len());
    if n == 0 {
        return Vec::new();
    }
    let (t, v) = (&chunk.t[..n], &chunk.v[..n]);
    let (start, end) = (t[0], t[n - 1]);
    if n == 1 || !(end > start) {
        return vec![(grid_index(start, step), v[0])];
    }

    let first = (start / step - GRID_EPS).ceil() as i64;
    let last = (end / step + GRID_EPS).floor() as i64;
    if first > last {
        let mid = (start + end) / 2.0;
        return vec![(grid_index(mid, step), stats::interp(mid, t, v))];
    }
    (first..=last)
        .map(|k| (k, stats::interp(k as f64 * step, t, v)))
        .collect()
}

/// Pool all chunks onto a grid of spacing `step`. Returns ascending grid
/// times and the pooled value at each.
pub fn combine(chunks: &[Chunk], pooling: Pooling, step: f64) -> (Vec<f64>, Vec<f64>) {
    let mut pools: BTreeMap<i64, Pool> = BTreeMap::new();
    for chunk in chunks {
        for (k, v) in sample_chunk(chunk, step) {
            pools.entry(k).or_default().add(v);
        }
    }
    pools
        .into_iter()
        .map(|(k, pool)| (k as f64 * step, pool.value(pooling)))
        .unzip()
}

// ---------------------------------------------------------------------------
// Chunking interval rates
// ---------------------------------------------------------------------------

impl RateSeries {
    /// Split into engine chunks: point samples become one-point chunks and
    /// interval samples two-point chunks holding the value across the
    /// interval. `values` picks which per-sample array is chunked.
    fn chunks(&self, values: &[f64]) -> Vec<Chunk> {
        (0..self.len())
            .map(|i| {
                if self.t0[i] == self.t1[i] {
                    Chunk::point(self.t0[i], values[i])
                } else {
                    Chunk::new(vec![self.t0[i], self.t1[i]], vec![values[i], values[i]])
                }
            })
            .collect()
    }

    /// Regularize onto a grid of spacing `step`. Rates and areas are pooled
    /// by mean, errors in quadrature. Identity and flags are kept: this is a
    /// change of sampling, not a derived product.
    pub fn chunk_rates(&self, step: f64) -> WorkingRateSeries {
        let (t, rate) = combine(&self.chunks(&self.rate), Pooling::Mean, step);
        let (_, error) = combine(&self.chunks(&self.error), Pooling::Quadrature, step);
        let (_, area) = combine(&self.chunks(&self.area), Pooling::Mean, step);

        WorkingRateSeries { info: self.info.clone(), t, rate, error, area, step }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::basins::{BasinGroup, IceSheet};
    use crate::data::model::SeriesInfo;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn overlapping_chunks_pool_by_mean() {
        let chunks = vec![
            Chunk::new(vec![0.0, 2.0], vec![10.0, 10.0]),
            Chunk::new(vec![1.0, 3.0], vec![20.0, 20.0]),
        ];
        let (t, v) = combine(&chunks, Pooling::Mean, 1.0);
        assert!(close(&t, &[0.0, 1.0, 2.0, 3.0]));
        assert!(close(&v, &[10.0, 15.0, 15.0, 20.0]));
    }

    #[test]
    fn quadrature_pooling_shrinks_agreeing_errors() {
        let chunks = vec![Chunk::point(1.0, 2.0), Chunk::point(1.0, 2.0)];
        let (_, e) = combine(&chunks, Pooling::Quadrature, 1.0);
        assert!(close(&e, &[8f64.sqrt() / 2.0]));
    }

    #[test]
    fn nan_poisons_only_its_grid_point() {
        let chunks = vec![Chunk::point(0.0, f64::NAN), Chunk::point(0.0, 2.0), Chunk::point(1.0, 4.0)];
        let (t, v) = combine(&chunks, Pooling::Mean, 1.0);
        assert!(close(&t, &[0.0, 1.0]));
        assert!(v[0].is_nan());
        assert_eq!(v[1], 4.0);
    }

    #[test]
    fn points_snap_to_nearest_grid_point() {
        let chunks = vec![Chunk::point(2000.04, 1.0), Chunk::point(2000.10, 3.0)];
        let (t, v) = combine(&chunks, Pooling::Mean, MONTH);
        assert_eq!(t.len(), 2);
        assert!((t[0] - 2000.0).abs() < 1e-9);
        assert!((t[1] - (2000.0 + MONTH)).abs() < 1e-9);
        assert!(close(&v, &[1.0, 3.0]));
    }

    #[test]
    fn uncovered_grid_points_are_omitted() {
        let chunks = vec![Chunk::point(0.0, 1.0), Chunk::point(3.0, 2.0)];
        let (t, _) = combine(&chunks, Pooling::Mean, 1.0);
        assert!(close(&t, &[0.0, 3.0]));
    }

    #[test]
    fn chunk_rates_regularizes_mixed_sampling() {
        let info = SeriesInfo::new(BasinGroup::Rignot, IceSheet::Gris);
        let series = RateSeries::new(
            info,
            vec![2000.0, 2000.5],
            vec![2000.5, 2000.5],
            vec![-100.0, -200.0],
            vec![10.0, 10.0],
            vec![1.0, 1.0],
        )
        .unwrap();

        let working = series.chunk_rates(MONTH);
        assert_eq!(working.len(), 7);
        assert!(close(&working.rate()[..6], &[-100.0; 6]));
        // the interval end and the point sample share the last grid point
        assert!((working.rate()[6] + 150.0).abs() < 1e-9);
        assert!((working.error()[6] - 200f64.sqrt() / 2.0).abs() < 1e-9);
        assert!(!working.info.computed);
    }
}
