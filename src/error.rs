use thiserror::Error;

use crate::data::basins::{BasinGroup, BasinId};

/// Unrecoverable data or configuration errors. A run that hits one of these
/// produces no output; recoverable incompatibilities between series (no
/// overlap, partial coverage, mixed kinds) are reported as `None` by the
/// combination functions instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CombineError {
    #[error("{series}: '{field}' has {found} values but {expected} were expected")]
    LengthMismatch {
        series: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{series}: negative error {value} at index {index}")]
    NegativeError {
        series: String,
        index: usize,
        value: f64,
    },
    #[error("{series}: interval {index} ends before it starts ({t0} > {t1})")]
    InvertedInterval {
        series: String,
        index: usize,
        t0: f64,
        t1: f64,
    },
    #[error("{series}: time {index} is out of order")]
    NotAscending { series: String, index: usize },
    #[error("unknown basin '{basin}' in the {scheme} scheme")]
    UnknownBasin { scheme: BasinGroup, basin: BasinId },
    #[error("{series}: more than one {scheme} series, schemes cannot be merged")]
    DuplicateSeries { series: String, scheme: BasinGroup },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, CombineError>;
