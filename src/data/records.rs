use serde::{Deserialize, Serialize};

use super::basins::{BasinGroup, BasinId, BasinTaxonomy};
use super::collection::Collection;
use super::model::{MassSeries, RateSeries, Series, SeriesInfo};
use crate::error::Result;

// ---------------------------------------------------------------------------
// RawRecord – one contribution as handed over by a loader
// ---------------------------------------------------------------------------

/// The arrays of one contribution, either rates over intervals or cumulative
/// mass. `area` may be omitted; it then defaults to the basin area (or NaN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Samples {
    Rate {
        t0: Vec<f64>,
        t1: Vec<f64>,
        rate: Vec<f64>,
        error: Vec<f64>,
        #[serde(default)]
        area: Option<Vec<f64>>,
    },
    Mass {
        t: Vec<f64>,
        mass: Vec<f64>,
        error: Vec<f64>,
        #[serde(default)]
        area: Option<Vec<f64>>,
    },
}

/// Identity plus samples, e.g. one row of a submission spreadsheet.
///
/// ```json
/// {
///   "user": "Alpha", "user_group": "RA", "basin_group": "zwally",
///   "basin_id": "gris", "basin_area": 1.7e6,
///   "samples": { "kind": "rate", "t0": [2003.0], "t1": [2004.0],
///                "rate": [-250.0], "error": [30.0] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub user_group: Option<String>,
    #[serde(default)]
    pub data_group: Option<String>,
    pub basin_group: BasinGroup,
    pub basin_id: BasinId,
    #[serde(default)]
    pub basin_area: Option<f64>,
    pub samples: Samples,
}

impl RawRecord {
    /// Validate the arrays and build the series.
    pub fn into_series(self) -> Result<Series> {
        let info = SeriesInfo {
            user: self.user,
            user_group: self.user_group,
            data_group: self.data_group,
            basin_group: self.basin_group,
            basin_id: self.basin_id,
            basin_area: self.basin_area,
            computed: false,
            merged: false,
            aggregated: false,
        };
        let fill = |n: usize| vec![self.basin_area.unwrap_or(f64::NAN); n];

        Ok(match self.samples {
            Samples::Rate { t0, t1, rate, error, area } => {
                let area = area.unwrap_or_else(|| fill(t0.len()));
                RateSeries::new(info, t0, t1, rate, error, area)?.into()
            }
            Samples::Mass { t, mass, error, area } => {
                let area = area.unwrap_or_else(|| fill(t.len()));
                MassSeries::new(info, t, mass, error, area)?.into()
            }
        })
    }
}

impl Collection {
    /// Build a collection from loader records. The first malformed record
    /// or unknown basin aborts with no partial result.
    pub fn from_records<I>(records: I, taxonomy: &BasinTaxonomy) -> Result<Collection>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let collection = records
            .into_iter()
            .map(RawRecord::into_series)
            .collect::<Result<Collection>>()?;
        collection.validate(taxonomy)?;
        log::info!("accepted {} input series", collection.len());
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::basins::IceSheet;
    use crate::data::model::SeriesKind;
    use crate::error::CombineError;

    const RECORD: &str = r#"{
        "user": "Alpha", "user_group": "RA", "basin_group": "zwally",
        "basin_id": "gris", "basin_area": 2.0,
        "samples": { "kind": "rate", "t0": [2003.0, 2004.0], "t1": [2004.0, 2005.0],
                     "rate": [-250.0, -260.0], "error": [30.0, 31.0] }
    }"#;

    #[test]
    fn record_deserializes_and_fills_area() {
        let record: RawRecord = serde_json::from_str(RECORD).unwrap();
        let series = record.into_series().unwrap();
        assert_eq!(series.kind(), SeriesKind::Rate);
        assert_eq!(series.info().basin_id, BasinId::Sheet(IceSheet::Gris));
        assert_eq!(series.area(), &[2.0, 2.0]);
    }

    #[test]
    fn malformed_record_aborts_collection() {
        let good: RawRecord = serde_json::from_str(RECORD).unwrap();
        let mut bad = good.clone();
        if let Samples::Rate { error, .. } = &mut bad.samples {
            error.pop();
        }
        let err = Collection::from_records([good, bad], &BasinTaxonomy::default()).unwrap_err();
        assert!(matches!(err, CombineError::LengthMismatch { field: "error", .. }));
    }
}
