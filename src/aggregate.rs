//! Combining several series into one: scheme merges, sums across basins and
//! averages across independent estimates.
//!
//! Incompatible inputs (mixed kinds, no common times, partial coverage in a
//! merge) give `None`, never an error; callers skip that branch.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::basins::BasinGroup;
use crate::data::model::{MassSeries, RateSeries, Series, SeriesInfo, SeriesKind, WorkingRateSeries};
use crate::matching::{common_times, match_times, union_times};
use crate::stats;

/// Error propagation for [`sum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SumErrors {
    /// `sqrt(Σe²)`, for independent errors.
    #[default]
    Quadrature,
    /// `Σe`, the worst case.
    Linear,
}

/// Central-tendency rule for [`average`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AverageMode {
    #[default]
    Mean,
    Median,
    /// Inverse-variance mean, each value weighted by `1/e²`. With
    /// [`AverageErrors::Quadrature`] the error is `1/sqrt(Σ1/e²)`.
    /// Contributors with a zero or non-finite error carry no weight; when
    /// none is left this falls back to the plain mean.
    Weighted,
}

/// Error derivation for [`average`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AverageErrors {
    /// `sqrt(Σe² / n)` of the contributing errors.
    #[default]
    Quadrature,
    /// Standard deviation of the contributing values, after rejecting
    /// values more than `nsigma` deviations from the mean.
    Spread,
}

// ---------------------------------------------------------------------------
// Scheme merge
// ---------------------------------------------------------------------------

fn merged_info(a: &SeriesInfo, b: &SeriesInfo) -> SeriesInfo {
    let mut info = a.clone();
    info.absorb_flags(b);
    info.basin_group = BasinGroup::Sheets;
    info.merged = true;
    info
}

fn mean_pair(a: &[f64], ia: &[usize], b: &[f64], ib: &[usize]) -> Vec<f64> {
    ia.iter().zip(ib).map(|(&i, &j)| (a[i] + b[j]) / 2.0).collect()
}

fn rms_pair(a: &[f64], ia: &[usize], b: &[f64], ib: &[usize]) -> Vec<f64> {
    ia.iter()
        .zip(ib)
        .map(|(&i, &j)| ((a[i] * a[i] + b[j] * b[j]) / 2.0).sqrt())
        .collect()
}

/// Both series have the same length and every sample found a partner.
fn fully_covered(na: usize, nb: usize, ia: &[usize], ib: &[usize]) -> bool {
    na == nb && ia.len() == na && ib.len() == nb
}

impl RateSeries {
    /// Merge two schemes' versions of the same series, matched on interval
    /// start.
    pub fn merge(a: &RateSeries, b: &RateSeries, tol: f64) -> Option<RateSeries> {
        let (ia, ib) = match_times(&a.t0, &b.t0, tol);
        if !fully_covered(a.len(), b.len(), &ia, &ib) {
            return None;
        }
        Some(RateSeries {
            info: merged_info(&a.info, &b.info),
            t0: ia.iter().map(|&i| a.t0[i]).collect(),
            t1: ia.iter().map(|&i| a.t1[i]).collect(),
            rate: mean_pair(&a.rate, &ia, &b.rate, &ib),
            error: rms_pair(&a.error, &ia, &b.error, &ib),
            area: mean_pair(&a.area, &ia, &b.area, &ib),
        })
    }
}

impl MassSeries {
    /// Merge two schemes' versions of the same series. An empty match is
    /// also a failure.
    pub fn merge(a: &MassSeries, b: &MassSeries, tol: f64) -> Option<MassSeries> {
        let (ia, ib) = match_times(&a.t, &b.t, tol);
        if ia.is_empty() || !fully_covered(a.len(), b.len(), &ia, &ib) {
            return None;
        }
        Some(MassSeries {
            info: merged_info(&a.info, &b.info),
            t: ia.iter().map(|&i| a.t[i]).collect(),
            mass: mean_pair(&a.mass, &ia, &b.mass, &ib),
            error: rms_pair(&a.error, &ia, &b.error, &ib),
            area: mean_pair(&a.area, &ia, &b.area, &ib),
        })
    }
}

impl WorkingRateSeries {
    /// Merge two schemes' versions of the same series.
    pub fn merge(a: &WorkingRateSeries, b: &WorkingRateSeries, tol: f64) -> Option<WorkingRateSeries> {
        let (ia, ib) = match_times(&a.t, &b.t, tol);
        if !fully_covered(a.len(), b.len(), &ia, &ib) {
            return None;
        }
        Some(WorkingRateSeries {
            info: merged_info(&a.info, &b.info),
            t: ia.iter().map(|&i| a.t[i]).collect(),
            rate: mean_pair(&a.rate, &ia, &b.rate, &ib),
            error: rms_pair(&a.error, &ia, &b.error, &ib),
            area: mean_pair(&a.area, &ia, &b.area, &ib),
            step: a.step,
        })
    }
}

/// Merge two series of the same kind into one unified-scheme series: values
/// and areas averaged, errors `sqrt((ea² + eb²) / 2)`, flags OR-ed. `None`
/// when the kinds differ or the samples do not match one to one.
pub fn merge(a: &Series, b: &Series, tol: f64) -> Option<Series> {
    match (a, b) {
        (Series::Rate(a), Series::Rate(b)) => RateSeries::merge(a, b, tol).map(Series::Rate),
        (Series::Mass(a), Series::Mass(b)) => MassSeries::merge(a, b, tol).map(Series::Mass),
        (Series::Working(a), Series::Working(b)) => WorkingRateSeries::merge(a, b, tol).map(Series::Working),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Shared plumbing for sum and average
// ---------------------------------------------------------------------------

/// Kind shared by every input, when it is one that sum/average accept.
fn point_kind(series: &[&Series]) -> Option<SeriesKind> {
    let kind = series.first()?.kind();
    if kind == SeriesKind::Rate {
        debug!("interval rate series must be chunked before combining");
        return None;
    }
    if series.iter().any(|s| s.kind() != kind) {
        debug!("cannot combine series of different kinds");
        return None;
    }
    Some(kind)
}

fn common<T: PartialEq + Clone>(values: impl Iterator<Item = Option<T>>) -> Option<T> {
    let mut iter = values;
    let first = iter.next()??;
    for v in iter {
        if v.as_ref() != Some(&first) {
            return None;
        }
    }
    Some(first)
}

/// Identity of a combination product: fields every input agrees on are
/// kept, contributor-specific ones are dropped when they disagree, flags are
/// OR-ed.
fn combined_info(series: &[&Series]) -> SeriesInfo {
    let infos: Vec<&SeriesInfo> = series.iter().map(|s| s.info()).collect();
    let mut info = infos[0].clone();
    info.user = common(infos.iter().map(|i| i.user.clone()));
    info.user_group = common(infos.iter().map(|i| i.user_group.clone()));
    info.data_group = common(infos.iter().map(|i| i.data_group.clone()));
    if infos.iter().any(|i| i.basin_group != info.basin_group) {
        info.basin_group = BasinGroup::Sheets;
    }
    for other in &infos[1..] {
        info.absorb_flags(other);
    }
    info
}

fn build(kind: SeriesKind, info: SeriesInfo, t: Vec<f64>, v: Vec<f64>, e: Vec<f64>, a: Vec<f64>, step: f64) -> Series {
    match kind {
        SeriesKind::Mass => MassSeries { info, t, mass: v, error: e, area: a }.into(),
        _ => WorkingRateSeries { info, t, rate: v, error: e, area: a, step }.into(),
    }
}

fn grid_step(series: &[&Series]) -> f64 {
    match series[0] {
        Series::Working(w) => w.step,
        _ => crate::combine::MONTH,
    }
}

// ---------------------------------------------------------------------------
// Sum
// ---------------------------------------------------------------------------

/// Element-wise sum over the times every input shares, e.g. sub-basins into
/// an ice sheet. Areas add. `None` for empty, mixed-kind or interval inputs,
/// or when there is no common time.
pub fn sum(series: &[&Series], errors: SumErrors, tol: f64) -> Option<Series> {
    let kind = point_kind(series)?;
    let times: Vec<_> = series.iter().map(|s| s.t()).collect();
    let t = common_times(times.iter().map(|t| t.as_ref()), tol);
    if t.is_empty() {
        debug!("no common time across {} series, nothing to sum", series.len());
        return None;
    }

    let mut value = vec![0.0; t.len()];
    let mut error = vec![0.0; t.len()];
    let mut area = vec![0.0; t.len()];
    for (s, st) in series.iter().zip(&times) {
        let (ic, is) = match_times(&t, st, tol);
        for (&k, &i) in ic.iter().zip(&is) {
            value[k] += s.values()[i];
            area[k] += s.area()[i];
            error[k] += match errors {
                SumErrors::Quadrature => s.errors()[i].powi(2),
                SumErrors::Linear => s.errors()[i],
            };
        }
    }
    if errors == SumErrors::Quadrature {
        error.iter_mut().for_each(|e| *e = e.sqrt());
    }

    let mut info = combined_info(series);
    info.basin_area = series
        .iter()
        .map(|s| s.info().basin_area)
        .sum::<Option<f64>>();
    Some(build(kind, info, t, value, error, area, grid_step(series)))
}

// ---------------------------------------------------------------------------
// Average
// ---------------------------------------------------------------------------

/// Values kept at one time point after optional outlier rejection.
fn reject_outliers(samples: Vec<(f64, f64, f64)>, nsigma: Option<f64>) -> Vec<(f64, f64, f64)> {
    let Some(nsigma) = nsigma else {
        return samples;
    };
    let values: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let (mean, std) = (stats::nan_mean(&values), stats::nan_std(&values));
    if !(std > 0.0) {
        return samples;
    }
    let kept: Vec<_> = samples
        .iter()
        .copied()
        .filter(|s| (s.0 - mean).abs() <= nsigma * std)
        .collect();
    if kept.is_empty() {
        debug!("{nsigma}-sigma cut rejects all {} values, keeping them", samples.len());
        return samples;
    }
    kept
}

/// Inverse-variance mean and its error, `None` when no sample has a usable
/// error.
fn inverse_variance(samples: &[(f64, f64, f64)]) -> Option<(f64, f64)> {
    let (sum_w, sum_wv) = samples
        .iter()
        .filter(|s| s.1.is_finite() && s.1 > 0.0)
        .fold((0.0, 0.0), |(w, wv), s| {
            let weight = 1.0 / (s.1 * s.1);
            (w + weight, wv + weight * s.0)
        });
    (sum_w > 0.0).then(|| (sum_wv / sum_w, 1.0 / sum_w.sqrt()))
}

/// Combine independent estimates of one quantity at every time any of them
/// covers. At each time only the inputs with a finite value there take
/// part. `nsigma` only applies to [`AverageErrors::Spread`]: contributors
/// further than `nsigma` standard deviations from that time's mean are
/// dropped before the value and spread are recomputed.
///
/// The result always uses the unified basin scheme. `None` for empty,
/// mixed-kind or interval inputs.
pub fn average(
    series: &[&Series],
    mode: AverageMode,
    errors: AverageErrors,
    nsigma: Option<f64>,
    tol: f64,
) -> Option<Series> {
    let kind = point_kind(series)?;
    let times: Vec<_> = series.iter().map(|s| s.t()).collect();
    let t_all = union_times(times.iter().map(|t| t.as_ref()), tol);

    // per time point: (value, error, area) from every contributor there
    let mut columns: Vec<Vec<(f64, f64, f64)>> = vec![Vec::new(); t_all.len()];
    for (s, st) in series.iter().zip(&times) {
        let (iu, is) = match_times(&t_all, st, tol);
        for (&k, &i) in iu.iter().zip(&is) {
            let v = s.values()[i];
            if v.is_finite() {
                columns[k].push((v, s.errors()[i], s.area()[i]));
            }
        }
    }

    let (mut t, mut value, mut error, mut area) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (time, samples) in t_all.into_iter().zip(columns) {
        if samples.is_empty() {
            continue;
        }
        let kept = match errors {
            AverageErrors::Quadrature => samples,
            AverageErrors::Spread => reject_outliers(samples, nsigma),
        };
        let values: Vec<f64> = kept.iter().map(|s| s.0).collect();
        let n = kept.len() as f64;
        let weighted = match mode {
            AverageMode::Weighted => inverse_variance(&kept),
            _ => None,
        };

        t.push(time);
        value.push(match (mode, weighted) {
            (AverageMode::Median, _) => stats::nan_median(&values),
            (_, Some((v, _))) => v,
            _ => stats::nan_mean(&values),
        });
        error.push(match (errors, weighted) {
            (AverageErrors::Quadrature, Some((_, e))) => e,
            (AverageErrors::Quadrature, None) => (kept.iter().map(|s| s.1 * s.1).sum::<f64>() / n).sqrt(),
            (AverageErrors::Spread, _) => stats::nan_std(&values),
        });
        area.push(kept.iter().map(|s| s.2).sum::<f64>() / n);
    }
    if t.is_empty() {
        debug!("no finite values across {} series, nothing to average", series.len());
        return None;
    }

    let mut info = combined_info(series);
    info.basin_group = BasinGroup::Sheets;
    let areas: Vec<f64> = series.iter().filter_map(|s| s.info().basin_area).collect();
    info.basin_area = (!areas.is_empty()).then(|| stats::nan_mean(&areas));
    Some(build(kind, info, t, value, error, area, grid_step(series)))
}
