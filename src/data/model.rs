use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::basins::{BasinGroup, BasinId};
use crate::error::{CombineError, Result};
use crate::stats;

// ---------------------------------------------------------------------------
// SeriesInfo – identity shared by every series variant
// ---------------------------------------------------------------------------

/// Who produced a series, what technique it comes from, and which region it
/// describes, plus the provenance flags set by derived products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Contributor name.
    pub user: Option<String>,
    /// Technique group, e.g. `RA`, `GMB`, `IOM`.
    pub user_group: Option<String>,
    pub data_group: Option<String>,
    pub basin_group: BasinGroup,
    pub basin_id: BasinId,
    /// Basin area in km², when the contributor supplied one.
    pub basin_area: Option<f64>,
    /// Derived rather than raw.
    #[serde(default)]
    pub computed: bool,
    /// Product of a scheme merge.
    #[serde(default)]
    pub merged: bool,
    /// Product of a basin summation.
    #[serde(default)]
    pub aggregated: bool,
}

impl SeriesInfo {
    pub fn new(basin_group: BasinGroup, basin_id: impl Into<BasinId>) -> Self {
        SeriesInfo {
            user: None,
            user_group: None,
            data_group: None,
            basin_group,
            basin_id: basin_id.into(),
            basin_area: None,
            computed: false,
            merged: false,
            aggregated: false,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_user_group(mut self, group: impl Into<String>) -> Self {
        self.user_group = Some(group.into());
        self
    }

    pub fn with_data_group(mut self, group: impl Into<String>) -> Self {
        self.data_group = Some(group.into());
        self
    }

    pub fn with_basin_area(mut self, area: f64) -> Self {
        self.basin_area = Some(area);
        self
    }

    /// Short label used in log lines and error messages.
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}:{}",
            self.user.as_deref().unwrap_or("-"),
            self.user_group.as_deref().unwrap_or("-"),
            self.basin_group,
            self.basin_id
        )
    }

    /// OR the provenance flags of `other` into `self`.
    pub(crate) fn absorb_flags(&mut self, other: &SeriesInfo) {
        self.computed |= other.computed;
        self.merged |= other.merged;
        self.aggregated |= other.aggregated;
    }
}

impl fmt::Display for SeriesInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// -- construction checks --

fn check_len(info: &SeriesInfo, field: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(CombineError::LengthMismatch {
            series: info.label(),
            field,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_errors(info: &SeriesInfo, errors: &[f64]) -> Result<()> {
    match errors.iter().position(|e| *e < 0.0) {
        Some(index) => Err(CombineError::NegativeError {
            series: info.label(),
            index,
            value: errors[index],
        }),
        None => Ok(()),
    }
}

fn check_ascending(info: &SeriesInfo, t: &[f64]) -> Result<()> {
    if let Some(i) = t.windows(2).position(|w| !(w[0] < w[1])) {
        return Err(CombineError::NotAscending {
            series: info.label(),
            index: i + 1,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RateSeries – dM/dt over (possibly zero-width) intervals
// ---------------------------------------------------------------------------

/// Mass-change rate samples, each held over `[t0, t1]`. A point sample has
/// `t0 == t1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSeries {
    pub info: SeriesInfo,
    pub(crate) t0: Vec<f64>,
    pub(crate) t1: Vec<f64>,
    pub(crate) rate: Vec<f64>,
    pub(crate) error: Vec<f64>,
    pub(crate) area: Vec<f64>,
}

impl RateSeries {
    pub fn new(
        info: SeriesInfo,
        t0: Vec<f64>,
        t1: Vec<f64>,
        rate: Vec<f64>,
        error: Vec<f64>,
        area: Vec<f64>,
    ) -> Result<Self> {
        let n = t0.len();
        check_len(&info, "t1", n, t1.len())?;
        check_len(&info, "rate", n, rate.len())?;
        check_len(&info, "error", n, error.len())?;
        check_len(&info, "area", n, area.len())?;
        check_errors(&info, &error)?;
        if let Some(i) = t0.windows(2).position(|w| w[1] < w[0]) {
            return Err(CombineError::NotAscending {
                series: info.label(),
                index: i + 1,
            });
        }
        if let Some(index) = t0.iter().zip(&t1).position(|(a, b)| a > b) {
            return Err(CombineError::InvertedInterval {
                series: info.label(),
                index,
                t0: t0[index],
                t1: t1[index],
            });
        }
        Ok(RateSeries { info, t0, t1, rate, error, area })
    }

    pub fn t0(&self) -> &[f64] {
        &self.t0
    }

    pub fn t1(&self) -> &[f64] {
        &self.t1
    }

    /// Interval midpoints.
    pub fn t(&self) -> Vec<f64> {
        self.t0.iter().zip(&self.t1).map(|(a, b)| (a + b) / 2.0).collect()
    }

    pub fn rate(&self) -> &[f64] {
        &self.rate
    }

    pub fn error(&self) -> &[f64] {
        &self.error
    }

    pub fn area(&self) -> &[f64] {
        &self.area
    }

    pub fn len(&self) -> usize {
        self.t0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MassSeries – cumulative dM
// ---------------------------------------------------------------------------

/// Cumulative mass change at strictly ascending times.
#[derive(Debug, Clone, PartialEq)]
pub struct MassSeries {
    pub info: SeriesInfo,
    pub(crate) t: Vec<f64>,
    pub(crate) mass: Vec<f64>,
    pub(crate) error: Vec<f64>,
    pub(crate) area: Vec<f64>,
}

impl MassSeries {
    pub fn new(
        info: SeriesInfo,
        t: Vec<f64>,
        mass: Vec<f64>,
        error: Vec<f64>,
        area: Vec<f64>,
    ) -> Result<Self> {
        let n = t.len();
        check_len(&info, "mass", n, mass.len())?;
        check_len(&info, "error", n, error.len())?;
        check_len(&info, "area", n, area.len())?;
        check_errors(&info, &error)?;
        check_ascending(&info, &t)?;
        Ok(MassSeries { info, t, mass, error, area })
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    pub fn error(&self) -> &[f64] {
        &self.error
    }

    pub fn area(&self) -> &[f64] {
        &self.area
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

// ---------------------------------------------------------------------------
// WorkingRateSeries – regularized point-sampled rates
// ---------------------------------------------------------------------------

/// Point-sampled rates on the regular grid produced by the combination
/// engine. `step` is the grid spacing the samples were placed on.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingRateSeries {
    pub info: SeriesInfo,
    pub(crate) t: Vec<f64>,
    pub(crate) rate: Vec<f64>,
    pub(crate) error: Vec<f64>,
    pub(crate) area: Vec<f64>,
    pub(crate) step: f64,
}

impl WorkingRateSeries {
    pub fn new(
        info: SeriesInfo,
        t: Vec<f64>,
        rate: Vec<f64>,
        error: Vec<f64>,
        area: Vec<f64>,
        step: f64,
    ) -> Result<Self> {
        if !(step > 0.0) {
            return Err(CombineError::InvalidParameter(format!(
                "{}: grid step must be positive, got {step}",
                info.label()
            )));
        }
        let n = t.len();
        check_len(&info, "rate", n, rate.len())?;
        check_len(&info, "error", n, error.len())?;
        check_len(&info, "area", n, area.len())?;
        check_errors(&info, &error)?;
        check_ascending(&info, &t)?;
        Ok(WorkingRateSeries { info, t, rate, error, area, step })
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn rate(&self) -> &[f64] {
        &self.rate
    }

    pub fn error(&self) -> &[f64] {
        &self.error
    }

    pub fn area(&self) -> &[f64] {
        &self.area
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Series – the closed set of variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Rate,
    Mass,
    Working,
}

/// One time series of any kind. Collections hold these; the combination
/// functions dispatch on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Rate(RateSeries),
    Mass(MassSeries),
    Working(WorkingRateSeries),
}

impl Series {
    pub fn info(&self) -> &SeriesInfo {
        match self {
            Series::Rate(s) => &s.info,
            Series::Mass(s) => &s.info,
            Series::Working(s) => &s.info,
        }
    }

    pub fn info_mut(&mut self) -> &mut SeriesInfo {
        match self {
            Series::Rate(s) => &mut s.info,
            Series::Mass(s) => &mut s.info,
            Series::Working(s) => &mut s.info,
        }
    }

    pub fn kind(&self) -> SeriesKind {
        match self {
            Series::Rate(_) => SeriesKind::Rate,
            Series::Mass(_) => SeriesKind::Mass,
            Series::Working(_) => SeriesKind::Working,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Series::Rate(s) => s.len(),
            Series::Mass(s) => s.len(),
            Series::Working(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample times; interval midpoints for rate series.
    pub fn t(&self) -> Cow<'_, [f64]> {
        match self {
            Series::Rate(s) => Cow::Owned(s.t()),
            Series::Mass(s) => Cow::Borrowed(&s.t),
            Series::Working(s) => Cow::Borrowed(&s.t),
        }
    }

    /// Rates or masses, depending on the variant.
    pub fn values(&self) -> &[f64] {
        match self {
            Series::Rate(s) => &s.rate,
            Series::Mass(s) => &s.mass,
            Series::Working(s) => &s.rate,
        }
    }

    pub fn errors(&self) -> &[f64] {
        match self {
            Series::Rate(s) => &s.error,
            Series::Mass(s) => &s.error,
            Series::Working(s) => &s.error,
        }
    }

    pub fn area(&self) -> &[f64] {
        match self {
            Series::Rate(s) => &s.area,
            Series::Mass(s) => &s.area,
            Series::Working(s) => &s.area,
        }
    }

    /// Earliest time covered, counting interval starts for rate series.
    pub fn min_time(&self) -> Option<f64> {
        match self {
            Series::Rate(s) => stats::finite_min(&s.t0).into_iter().chain(stats::finite_min(&s.t1)).reduce(f64::min),
            _ => stats::finite_min(&self.t()),
        }
    }

    /// Latest time covered, counting interval ends for rate series.
    pub fn max_time(&self) -> Option<f64> {
        match self {
            Series::Rate(s) => stats::finite_max(&s.t0).into_iter().chain(stats::finite_max(&s.t1)).reduce(f64::max),
            _ => stats::finite_max(&self.t()),
        }
    }

    /// NaN-ignoring mean of the values.
    pub fn mean(&self) -> f64 {
        stats::nan_mean(self.values())
    }

    /// Root-mean-square of the errors.
    pub fn sigma(&self) -> f64 {
        stats::nan_rms(self.errors())
    }

    pub fn min_value(&self) -> Option<f64> {
        stats::finite_min(self.values())
    }

    pub fn max_value(&self) -> Option<f64> {
        stats::finite_max(self.values())
    }
}

impl From<RateSeries> for Series {
    fn from(s: RateSeries) -> Self {
        Series::Rate(s)
    }
}

impl From<MassSeries> for Series {
    fn from(s: MassSeries) -> Self {
        Series::Mass(s)
    }
}

impl From<WorkingRateSeries> for Series {
    fn from(s: WorkingRateSeries) -> Self {
        Series::Working(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::basins::IceSheet;

    fn info() -> SeriesInfo {
        SeriesInfo::new(BasinGroup::Zwally, IceSheet::Gris).with_user("alpha")
    }

    #[test]
    fn rate_series_rejects_short_arrays() {
        let err = RateSeries::new(info(), vec![1.0, 2.0], vec![1.0], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2])
            .unwrap_err();
        assert!(matches!(err, CombineError::LengthMismatch { field: "t1", expected: 2, found: 1, .. }));
    }

    #[test]
    fn rate_series_rejects_inverted_interval() {
        let err = RateSeries::new(info(), vec![2.0], vec![1.0], vec![0.0], vec![0.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, CombineError::InvertedInterval { index: 0, .. }));
    }

    #[test]
    fn rate_series_rejects_descending_starts() {
        let err = RateSeries::new(
            info(),
            vec![2001.0, 2000.0],
            vec![2002.0, 2001.0],
            vec![0.0; 2],
            vec![0.0; 2],
            vec![0.0; 2],
        )
        .unwrap_err();
        assert!(matches!(err, CombineError::NotAscending { index: 1, .. }));

        // equal starts are fine for rates
        assert!(RateSeries::new(info(), vec![2000.0; 2], vec![2000.0, 2001.0], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]).is_ok());
    }

    #[test]
    fn negative_errors_are_rejected() {
        let err = MassSeries::new(info(), vec![1.0, 2.0], vec![0.0; 2], vec![1.0, -1.0], vec![0.0; 2]).unwrap_err();
        assert!(matches!(err, CombineError::NegativeError { index: 1, .. }));
    }

    #[test]
    fn mass_times_must_be_strictly_ascending() {
        let err = MassSeries::new(info(), vec![1.0, 1.0], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]).unwrap_err();
        assert!(matches!(err, CombineError::NotAscending { index: 1, .. }));
    }

    #[test]
    fn summaries_ignore_nan() {
        let s: Series = RateSeries::new(
            info(),
            vec![2000.0, 2001.0, 2002.0],
            vec![2001.0, 2001.0, 2003.0],
            vec![-10.0, f64::NAN, -20.0],
            vec![3.0, 4.0, f64::NAN],
            vec![0.0; 3],
        )
        .unwrap()
        .into();

        assert_eq!(s.t().as_ref(), &[2000.5, 2001.0, 2002.5]);
        assert_eq!(s.min_time(), Some(2000.0));
        assert_eq!(s.max_time(), Some(2003.0));
        assert_eq!(s.mean(), -15.0);
        assert!((s.sigma() - 12.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.min_value(), Some(-20.0));
        assert_eq!(s.max_value(), Some(-10.0));
    }

    #[test]
    fn empty_series_has_no_time_range() {
        let s: Series = MassSeries::new(info(), vec![], vec![], vec![], vec![]).unwrap().into();
        assert!(s.is_empty());
        assert_eq!(s.min_time(), None);
    }
}
