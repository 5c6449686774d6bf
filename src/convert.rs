//! Rate ↔ mass conversion.
//!
//! Cumulative mass has no observable zero point, so integrated curves can be
//! shifted to pass through a shared reference value at a reference time
//! before they are compared.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::data::model::{MassSeries, RateSeries, Series, WorkingRateSeries};
use crate::error::Result;
use crate::stats;

/// Reference point an integrated mass curve is shifted through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub time: f64,
    #[serde(default)]
    pub value: f64,
}

impl Alignment {
    /// Zero mass at `time`.
    pub fn at(time: f64) -> Self {
        Alignment { time, value: 0.0 }
    }
}

fn cumulative(increments: impl Iterator<Item = f64>) -> Vec<f64> {
    increments
        .scan(0.0, |acc, d| {
            *acc += d;
            Some(*acc)
        })
        .collect()
}

impl MassSeries {
    /// Shift the curve so it passes through `align.value` at `align.time`,
    /// interpolating between samples and clamping outside the covered range.
    pub fn align(&mut self, align: Alignment) {
        let current = stats::interp(align.time, &self.t, &self.mass);
        if !current.is_finite() {
            warn!("{}: cannot align at {}, no finite mass there", self.info, align.time);
            return;
        }
        let shift = align.value - current;
        self.mass.iter_mut().for_each(|m| *m += shift);
    }

    /// First differences between consecutive samples as rates over the gap
    /// between them. Each interval carries the error of the sample it starts
    /// at, unchanged.
    pub fn derive_rates(&self) -> RateSeries {
        let n = self.len().saturating_sub(1);
        let t0 = self.t[..n].to_vec();
        let t1 = self.t[self.len().min(1)..].to_vec();
        let rate = self
            .t
            .windows(2)
            .zip(self.mass.windows(2))
            .map(|(t, m)| (m[1] - m[0]) / (t[1] - t[0]))
            .collect();
        let error = self.error[..n].to_vec();
        let area = self.area.windows(2).map(|a| (a[0] + a[1]) / 2.0).collect();

        let mut info = self.info.clone();
        info.computed = true;
        RateSeries { info, t0, t1, rate, error, area }
    }
}

impl WorkingRateSeries {
    /// Running sum of `rate × step`. Errors are carried unchanged.
    pub fn integrate(&self, align: Option<Alignment>) -> MassSeries {
        let mass = cumulative(self.rate.iter().map(|r| r * self.step));
        let mut info = self.info.clone();
        info.computed = true;

        let mut out = MassSeries {
            info,
            t: self.t.clone(),
            mass,
            error: self.error.clone(),
            area: self.area.clone(),
        };
        if let Some(align) = align {
            out.align(align);
        }
        out
    }
}

impl RateSeries {
    /// Running sum of `rate × (t1 − t0)`, placed at interval ends. Expects
    /// contiguous, non-overlapping intervals such as [`MassSeries::derive_rates`]
    /// produces. Interval ends out of order give
    /// [`NotAscending`](crate::error::CombineError::NotAscending); chunk such
    /// series first. Point samples have no width and add nothing.
    pub fn integrate(&self, align: Option<Alignment>) -> Result<MassSeries> {
        let points = self.t0.iter().zip(&self.t1).filter(|(a, b)| a == b).count();
        if points > 0 {
            warn!("{}: {points} point samples carry no duration and add no mass", self.info);
        }

        let mass = cumulative(
            self.rate
                .iter()
                .zip(self.t0.iter().zip(&self.t1))
                .map(|(r, (t0, t1))| r * (t1 - t0)),
        );
        let mut info = self.info.clone();
        info.computed = true;

        let mut out = MassSeries::new(info, self.t1.clone(), mass, self.error.clone(), self.area.clone())?;
        if let Some(align) = align {
            out.align(align);
        }
        Ok(out)
    }
}

/// Integrate any rate variant; mass series have nothing to integrate.
/// Interval rates whose ends are out of order come back as `None`.
pub fn integrate(series: &Series, align: Option<Alignment>) -> Option<MassSeries> {
    match series {
        Series::Rate(s) => match s.integrate(align) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("{e}; chunk overlapping intervals before integrating");
                None
            }
        },
        Series::Working(s) => Some(s.integrate(align)),
        Series::Mass(_) => None,
    }
}

/// Differentiate a mass series; rate variants are returned as `None`.
pub fn derive_rates(series: &Series) -> Option<RateSeries> {
    match series {
        Series::Mass(s) => Some(s.derive_rates()),
        _ => None,
    }
}
