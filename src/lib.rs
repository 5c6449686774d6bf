//! Reconciles independent ice-sheet mass-balance estimates into consensus
//! time series.
//!
//! Contributors hand in rates over intervals or cumulative mass for basins
//! and ice sheets. The crate regularizes them onto a common grid
//! ([`combine`]), synthesizes missing ice-sheet totals from sub-basins,
//! merges the two basin schemes, averages within and across technique
//! groups, sums ice sheets into regions ([`aggregate`]) and converts between
//! rate and mass ([`convert`]), propagating errors at every step.
//! [`pipeline::process`] runs the whole chain.

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod export;
pub mod matching;
pub mod pipeline;
pub mod stats;
pub mod window;

pub use aggregate::{AverageErrors, AverageMode, SumErrors};
pub use config::ProcessConfig;
pub use convert::Alignment;
pub use data::basins::{BasinGroup, BasinId, BasinTaxonomy, IceSheet, Region};
pub use data::collection::Collection;
pub use data::filter::SeriesFilter;
pub use data::model::{MassSeries, RateSeries, Series, SeriesInfo, SeriesKind, WorkingRateSeries};
pub use data::records::{RawRecord, Samples};
pub use error::CombineError;
pub use pipeline::{process, ProcessOutput};
