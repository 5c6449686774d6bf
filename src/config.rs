use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AverageErrors, AverageMode, SumErrors};
use crate::combine::MONTH;
use crate::convert::Alignment;
use crate::data::basins::BasinTaxonomy;
use crate::error::CombineError;
use crate::matching::DEFAULT_TOLERANCE;

// ---------------------------------------------------------------------------
// ProcessConfig – everything one analysis run depends on
// ---------------------------------------------------------------------------

/// Settings for [`process`](crate::pipeline::process). Every field has a
/// default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "methods_skip": ["IOM"], "align_date": 2003.0, "average_errors": "spread" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Technique groups to process, in output order.
    pub groups: Vec<String>,
    /// Groups removed from `groups`.
    pub methods_skip: Vec<String>,
    pub combine_method: AverageMode,
    pub average_errors: AverageErrors,
    /// Outlier threshold for spread errors; `None` keeps every contributor.
    pub nsigma: Option<f64>,
    pub sum_errors: SumErrors,
    /// Integrated mass is zero at this time, when set.
    pub align_date: Option<f64>,
    /// Combination-engine grid step, in years.
    pub step: f64,
    /// Matching tolerance, in years.
    pub match_tolerance: f64,
    pub taxonomy: BasinTaxonomy,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            groups: vec!["RA".to_string(), "GMB".to_string(), "IOM".to_string()],
            methods_skip: Vec::new(),
            combine_method: AverageMode::Mean,
            average_errors: AverageErrors::Quadrature,
            nsigma: None,
            sum_errors: SumErrors::Quadrature,
            align_date: None,
            step: MONTH,
            match_tolerance: DEFAULT_TOLERANCE,
            taxonomy: BasinTaxonomy::default(),
        }
    }
}

impl ProcessConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ProcessConfig = serde_json::from_str(text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// Reject values the combination functions cannot work with.
    pub fn validate(&self) -> std::result::Result<(), CombineError> {
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(CombineError::InvalidParameter(format!("step must be positive, got {}", self.step)));
        }
        if !(self.match_tolerance >= 0.0) || self.match_tolerance >= self.step / 2.0 {
            return Err(CombineError::InvalidParameter(format!(
                "match_tolerance must be in [0, step/2), got {}",
                self.match_tolerance
            )));
        }
        if let Some(n) = self.nsigma {
            if !(n > 0.0) {
                return Err(CombineError::InvalidParameter(format!("nsigma must be positive, got {n}")));
            }
        }
        Ok(())
    }

    /// `groups` minus `methods_skip`.
    pub fn active_groups(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| !self.methods_skip.contains(g))
            .cloned()
            .collect()
    }

    pub fn alignment(&self) -> Option<Alignment> {
        self.align_date.map(Alignment::at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ProcessConfig::from_json_str(
            r#"{ "methods_skip": ["IOM"], "align_date": 2003.0, "average_errors": "spread", "nsigma": 3.0 }"#,
        )
        .unwrap();
        assert_eq!(config.active_groups(), vec!["RA".to_string(), "GMB".to_string()]);
        assert_eq!(config.alignment(), Some(Alignment::at(2003.0)));
        assert_eq!(config.average_errors, AverageErrors::Spread);
        assert_eq!(config.step, MONTH);
        assert_eq!(config.taxonomy, BasinTaxonomy::default());
    }

    #[test]
    fn weighted_combine_method_parses() {
        let config = ProcessConfig::from_json_str(r#"{ "combine_method": "weighted" }"#).unwrap();
        assert_eq!(config.combine_method, AverageMode::Weighted);
        assert_eq!(config.average_errors, AverageErrors::Quadrature);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ProcessConfig::from_json_str(r#"{ "step": 0.0 }"#).is_err());
        assert!(ProcessConfig::from_json_str(r#"{ "nsigma": -1.0 }"#).is_err());
        assert!(ProcessConfig::from_json_str(r#"{ "match_tolerance": 0.5 }"#).is_err());
    }

    #[test]
    fn taxonomy_round_trips_through_json() {
        let text = serde_json::to_string(&ProcessConfig::default()).unwrap();
        let back = ProcessConfig::from_json_str(&text).unwrap();
        assert_eq!(back, ProcessConfig::default());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ProcessConfig::load(Path::new("/nonexistent/icemass.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
