//! CSV export: one `time,value,error` row per sample, ascending in time.
//! Where files go is up to the caller.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::model::Series;

/// Write `series` to `writer`. Samples are sorted by time; rate series use
/// interval midpoints.
pub fn write_series_csv<W: Write>(writer: W, series: &Series) -> Result<()> {
    let t = series.t();
    let mut order: Vec<usize> = (0..series.len()).collect();
    order.sort_by(|&a, &b| t[a].total_cmp(&t[b]));

    let mut wr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for i in order {
        wr.serialize((t[i], series.values()[i], series.errors()[i]))
            .with_context(|| format!("writing sample {i} of {}", series.info()))?;
    }
    wr.flush().context("flushing CSV output")?;
    Ok(())
}

/// Write `series` as CSV to `path`, replacing any existing file.
pub fn save_series(path: &Path, series: &Series) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_series_csv(file, series).with_context(|| format!("saving {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::basins::{BasinGroup, IceSheet};
    use crate::data::model::{RateSeries, SeriesInfo};

    #[test]
    fn rows_are_time_value_error_in_time_order() {
        let info = SeriesInfo::new(BasinGroup::Sheets, IceSheet::Gris);
        let series: Series = RateSeries::new(
            info,
            vec![2000.0, 2001.0],
            vec![2010.0, 2002.0],
            vec![-1.0, -2.5],
            vec![0.25, 0.5],
            vec![0.0, 0.0],
        )
        .unwrap()
        .into();

        let mut buf = Vec::new();
        write_series_csv(&mut buf, &series).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "2001.5,-2.5,0.5\n2005.0,-1.0,0.25\n");
    }
}
