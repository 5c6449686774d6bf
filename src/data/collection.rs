use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info, warn};

use super::basins::{BasinGroup, BasinId, BasinTaxonomy, IceSheet};
use super::filter::SeriesFilter;
use super::model::{Series, SeriesKind};
use crate::aggregate::{self, AverageErrors, AverageMode, SumErrors};
use crate::convert::{self, Alignment};
use crate::error::{CombineError, Result};
use crate::stats;

// ---------------------------------------------------------------------------
// Collection – an addressable set of series
// ---------------------------------------------------------------------------

/// An ordered set of series. Filtering shares the underlying series rather
/// than copying their arrays; every transforming operation returns a new
/// collection and leaves this one untouched.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    series: Vec<Arc<Series>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter().map(|s| s.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&Series> {
        self.series.get(index).map(|s| s.as_ref())
    }

    pub fn add_series(&mut self, series: impl Into<Series>) {
        self.series.push(Arc::new(series.into()));
    }

    /// Append every series of `other`, sharing them.
    pub fn extend_from(&mut self, other: &Collection) {
        self.series.extend(other.series.iter().cloned());
    }

    /// Series passing `filter`, sharing the originals.
    pub fn filter(&self, filter: &SeriesFilter) -> Collection {
        Collection {
            series: self
                .series
                .iter()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect(),
        }
    }

    fn refs(&self) -> Vec<&Series> {
        self.iter().collect()
    }

    // -- summaries --

    /// Distinct contributor names, sorted.
    pub fn users(&self) -> Vec<String> {
        self.iter()
            .filter_map(|s| s.info().user.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct basin identifiers, sorted.
    pub fn basin_ids(&self) -> Vec<BasinId> {
        self.iter()
            .map(|s| s.info().basin_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn min_time(&self) -> Option<f64> {
        let mins: Vec<f64> = self.iter().filter_map(Series::min_time).collect();
        stats::finite_min(&mins)
    }

    pub fn max_time(&self) -> Option<f64> {
        let maxs: Vec<f64> = self.iter().filter_map(Series::max_time).collect();
        stats::finite_max(&maxs)
    }

    /// Check every basin identifier against `taxonomy`.
    pub fn validate(&self, taxonomy: &BasinTaxonomy) -> Result<()> {
        for s in self.iter() {
            let info = s.info();
            if !taxonomy.contains(info.basin_group, &info.basin_id) {
                return Err(CombineError::UnknownBasin {
                    scheme: info.basin_group,
                    basin: info.basin_id.clone(),
                });
            }
        }
        Ok(())
    }

    // -- per-series transforms --

    fn map_each<F>(&self, f: F) -> Collection
    where
        F: Fn(&Series) -> Option<Series>,
    {
        self.iter().filter_map(f).collect()
    }

    /// Regularize interval rate series onto a grid of spacing `step`; other
    /// kinds are shared unchanged.
    pub fn chunk_series(&self, step: f64) -> Collection {
        let series = self
            .series
            .iter()
            .map(|s| match s.as_ref() {
                Series::Rate(r) => Arc::new(Series::Working(r.chunk_rates(step))),
                _ => Arc::clone(s),
            })
            .collect();
        Collection { series }
    }

    /// Bring every series onto the working-rate grid: interval rates are
    /// chunked, mass series differentiated and then chunked.
    pub fn to_working(&self, step: f64) -> Collection {
        let series = self
            .series
            .iter()
            .map(|s| match s.as_ref() {
                Series::Rate(r) => Arc::new(Series::Working(r.chunk_rates(step))),
                Series::Mass(m) => Arc::new(Series::Working(m.derive_rates().chunk_rates(step))),
                Series::Working(_) => Arc::clone(s),
            })
            .collect();
        Collection { series }
    }

    /// Integrate every rate series; mass series are skipped.
    pub fn integrate(&self, align: Option<Alignment>) -> Collection {
        self.map_each(|s| convert::integrate(s, align).map(Series::Mass))
    }

    /// Differentiate every mass series; rate series are skipped.
    pub fn derive_rates(&self) -> Collection {
        self.map_each(|s| convert::derive_rates(s).map(Series::Rate))
    }

    /// Truncated copies of every series.
    pub fn truncate(&self, min: Option<f64>, max: Option<f64>) -> Collection {
        self.map_each(|s| Some(s.truncate(min, max)))
    }

    /// Reduce every point-sampled series; interval rates are skipped.
    pub fn reduce(&self, window: f64, offset: f64, backfill: bool) -> Result<Collection> {
        let mut out = Collection::new();
        for s in self.iter() {
            if let Some(r) = s.reduce(window, offset, backfill)? {
                out.add_series(r);
            }
        }
        Ok(out)
    }

    /// Smooth every point-sampled series; interval rates are skipped.
    pub fn smooth(&self, window: f64) -> Result<Collection> {
        let mut out = Collection::new();
        for s in self.iter() {
            if let Some(r) = s.smooth(window)? {
                out.add_series(r);
            }
        }
        Ok(out)
    }

    // -- combinations --

    /// Sum of every series; see [`aggregate::sum`].
    pub fn sum(&self, errors: SumErrors, tol: f64) -> Option<Series> {
        aggregate::sum(&self.refs(), errors, tol)
    }

    /// Average of every series; see [`aggregate::average`].
    pub fn average(&self, mode: AverageMode, errors: AverageErrors, nsigma: Option<f64>, tol: f64) -> Option<Series> {
        aggregate::average(&self.refs(), mode, errors, nsigma, tol)
    }

    /// Replace each pair of series that differ only in source scheme with
    /// their unified-scheme merge. Pairs whose samples do not match one to
    /// one are kept as they are. Two series of the same scheme for one
    /// identity make the merge ambiguous and abort.
    pub fn merge(&self, tol: f64) -> Result<Collection> {
        type Key = (Option<String>, Option<String>, Option<String>, BasinId, SeriesKind);
        let key = |s: &Series| -> Key {
            let i = s.info();
            (i.user.clone(), i.user_group.clone(), i.data_group.clone(), i.basin_id.clone(), s.kind())
        };

        // key → (zwally index, rignot index)
        let mut pairs: BTreeMap<Key, (Option<usize>, Option<usize>)> = BTreeMap::new();
        for (idx, s) in self.iter().enumerate() {
            let scheme = s.info().basin_group;
            let entry = pairs.entry(key(s)).or_default();
            let slot = match scheme {
                BasinGroup::Zwally => &mut entry.0,
                BasinGroup::Rignot => &mut entry.1,
                BasinGroup::Sheets => continue,
            };
            if slot.replace(idx).is_some() {
                return Err(CombineError::DuplicateSeries {
                    series: s.info().label(),
                    scheme,
                });
            }
        }

        // index of the first partner → merged series; index of the second → dropped
        let mut replaced: BTreeMap<usize, Series> = BTreeMap::new();
        let mut dropped: BTreeSet<usize> = BTreeSet::new();
        for (z, r) in pairs.into_values() {
            let (Some(z), Some(r)) = (z, r) else {
                if let Some(only) = z.or(r) {
                    debug!("{}: no partner in the other scheme", self.series[only].info().label());
                }
                continue;
            };
            let (a, b) = (&self.series[z], &self.series[r]);
            match aggregate::merge(a, b, tol) {
                Some(merged) => {
                    replaced.insert(z.min(r), merged);
                    dropped.insert(z.max(r));
                }
                None => warn!(
                    "{}: {} and {} samples do not match, keeping both schemes",
                    a.info().label(),
                    a.len(),
                    b.len()
                ),
            }
        }
        info!("merged {} scheme pairs", replaced.len());

        let series = self
            .series
            .iter()
            .enumerate()
            .filter(|(i, _)| !dropped.contains(i))
            .map(|(i, s)| match replaced.remove(&i) {
                Some(m) => Arc::new(m),
                None => Arc::clone(s),
            })
            .collect();
        Ok(Collection { series })
    }

    /// For every contributor and source scheme, synthesize each ice-sheet
    /// series the contributor did not supply but whose sub-basins are all
    /// present, by summing them with quadrature errors. New series are
    /// flagged `aggregated` and appended. Returns how many were added.
    pub fn sum_basins(&mut self, taxonomy: &BasinTaxonomy, tol: f64) -> usize {
        let mut added = Vec::new();
        for user in self.users() {
            let user_data = self.filter(&SeriesFilter::new().user(user.as_str()));
            for scheme in BasinGroup::SOURCES {
                let scheme_data = user_data.filter(&SeriesFilter::new().basin_group(scheme));
                for sheet in IceSheet::SHEETS {
                    let basins = taxonomy.basins(scheme, sheet);
                    if basins.is_empty() {
                        continue;
                    }
                    if !scheme_data.filter(&SeriesFilter::new().basin_id(sheet)).is_empty() {
                        continue;
                    }
                    let parts = scheme_data.filter(&SeriesFilter::new().basin_ids(basins.iter().map(BasinId::basin)));
                    let present: BTreeSet<BasinId> = parts.basin_ids().into_iter().collect();
                    if present.len() != basins.len() {
                        continue;
                    }

                    let Some(mut series) = parts.sum(SumErrors::Quadrature, tol) else {
                        debug!("{user}: {scheme} basins of {sheet} share no time, not summed");
                        continue;
                    };
                    let info = series.info_mut();
                    info.user = Some(user.clone());
                    info.basin_group = scheme;
                    info.basin_id = sheet.into();
                    info.aggregated = true;
                    added.push(series);
                }
            }
        }

        let count = added.len();
        if count > 0 {
            info!("synthesized {count} ice-sheet series from sub-basins");
        }
        for s in added {
            self.add_series(s);
        }
        count
    }
}

impl FromIterator<Series> for Collection {
    fn from_iter<I: IntoIterator<Item = Series>>(iter: I) -> Self {
        Collection {
            series: iter.into_iter().map(Arc::new).collect(),
        }
    }
}
