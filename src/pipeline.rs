//! One analysis run: contributor series → per-group and overall consensus
//! for every ice sheet and region.

use log::{debug, info};

use crate::config::ProcessConfig;
use crate::convert::{self, Alignment};
use crate::data::basins::{BasinGroup, IceSheet};
use crate::data::collection::Collection;
use crate::data::filter::SeriesFilter;
use crate::data::model::Series;
use crate::error::Result;

/// Everything a run produces. Rate collections hold working rate series,
/// mass collections their integrals.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Input series as working rates, after basin summation and scheme merge.
    pub rate_data: Collection,
    /// Integrals of `rate_data`.
    pub mass_data: Collection,
    /// One series per technique group and ice sheet.
    pub groups_sheets_rate: Collection,
    pub groups_sheets_mass: Collection,
    /// One series per technique group and region.
    pub groups_regions_rate: Collection,
    pub groups_regions_mass: Collection,
    /// Cross-group consensus per ice sheet.
    pub sheets_rate: Collection,
    pub sheets_mass: Collection,
    /// Cross-group consensus per region.
    pub regions_rate: Collection,
    pub regions_mass: Collection,
}

/// Add `series` to `rate` and its integral to `mass`.
fn push_with_integral(rate: &mut Collection, mass: &mut Collection, series: Series, align: Option<Alignment>) {
    if let Some(m) = convert::integrate(&series, align) {
        mass.add_series(m);
    }
    rate.add_series(series);
}

fn with_region(mut series: Series, region: IceSheet) -> Series {
    let info = series.info_mut();
    info.basin_id = region.into();
    info.basin_group = BasinGroup::Sheets;
    series
}

/// Run the full reconciliation over `input`.
///
/// Series that cannot be combined (no overlap, no contributors for a group)
/// are skipped; only inconsistent input aborts the run.
pub fn process(input: &Collection, config: &ProcessConfig) -> Result<ProcessOutput> {
    config.validate()?;
    input.validate(&config.taxonomy)?;

    let tol = config.match_tolerance;
    let align = config.alignment();
    let groups = config.active_groups();

    let mut rate_data = input.to_working(config.step);
    rate_data.sum_basins(&config.taxonomy, tol);
    let rate_data = rate_data.merge(tol)?;
    let mass_data = rate_data.integrate(align);

    let mut out = ProcessOutput {
        rate_data,
        mass_data,
        ..ProcessOutput::default()
    };

    let average = |c: &Collection| {
        c.average(config.combine_method, config.average_errors, config.nsigma, tol)
    };

    for group in &groups {
        let group_data = out.rate_data.filter(&SeriesFilter::new().user_group(group.as_str()));
        for sheet in IceSheet::SHEETS {
            let Some(series) = average(&group_data.filter(&SeriesFilter::new().basin_id(sheet))) else {
                debug!("{group}: no {sheet} contributions");
                continue;
            };
            push_with_integral(&mut out.groups_sheets_rate, &mut out.groups_sheets_mass, series, align);
        }

        let group_sheets = out.groups_sheets_rate.filter(&SeriesFilter::new().user_group(group.as_str()));
        for region in &config.taxonomy.regions {
            let parts = group_sheets.filter(&SeriesFilter::new().basin_ids(region.sheets.iter().copied()));
            if parts.len() != region.sheets.len() {
                debug!("{group}: {} needs {} sheets, have {}", region.id, region.sheets.len(), parts.len());
                continue;
            }
            let Some(series) = parts.sum(config.sum_errors, tol) else {
                continue;
            };
            let series = with_region(series, region.id);
            push_with_integral(&mut out.groups_regions_rate, &mut out.groups_regions_mass, series, align);
        }
        info!(
            "{group}: {} sheet and {} region estimates",
            out.groups_sheets_rate.filter(&SeriesFilter::new().user_group(group.as_str())).len(),
            out.groups_regions_rate.filter(&SeriesFilter::new().user_group(group.as_str())).len()
        );
    }

    for sheet in IceSheet::SHEETS {
        let Some(series) = average(&out.groups_sheets_rate.filter(&SeriesFilter::new().basin_id(sheet))) else {
            continue;
        };
        push_with_integral(&mut out.sheets_rate, &mut out.sheets_mass, series, align);
    }

    for region in &config.taxonomy.regions {
        let parts = out.sheets_rate.filter(&SeriesFilter::new().basin_ids(region.sheets.iter().copied()));
        if parts.len() != region.sheets.len() {
            continue;
        }
        let Some(series) = parts.sum(config.sum_errors, tol) else {
            continue;
        };
        let series = with_region(series, region.id);
        push_with_integral(&mut out.regions_rate, &mut out.regions_mass, series, align);
    }
    info!(
        "{} sheet and {} region consensus estimates",
        out.sheets_rate.len(),
        out.regions_rate.len()
    );

    Ok(out)
}
