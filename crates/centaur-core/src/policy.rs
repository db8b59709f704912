//! Threshold policy shared by the analyzer, the recommendation engine and any
//! presentation layer. Cutpoints live here and nowhere else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CentaurError, Result};

/// Ordered saturation severity scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Minor,
    Moderate,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Minor => write!(f, "MINOR"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Verdict on the ratio of recommended to current exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureBand {
    /// Recommended exposure is much shorter than the current one.
    Low,
    Good,
    /// Recommended exposure is much longer than the current one.
    High,
}

impl fmt::Display for ExposureBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Good => write!(f, "good"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Exposure-factor cutpoints. Both edges belong to the good band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposureBands {
    #[serde(default = "default_decrease_below")]
    pub decrease_below: f64,
    #[serde(default = "default_increase_above")]
    pub increase_above: f64,
}

fn default_decrease_below() -> f64 {
    0.67
}
fn default_increase_above() -> f64 {
    1.5
}

impl Default for ExposureBands {
    fn default() -> Self {
        Self {
            decrease_below: default_decrease_below(),
            increase_above: default_increase_above(),
        }
    }
}

impl ExposureBands {
    pub fn classify(&self, factor: f64) -> ExposureBand {
        if factor > self.increase_above {
            ExposureBand::High
        } else if factor < self.decrease_below {
            ExposureBand::Low
        } else {
            ExposureBand::Good
        }
    }
}

/// Saturation classification cutpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaturationPolicy {
    /// Pixels at or above this fraction of the saturation level are near-saturated.
    #[serde(default = "default_near_fraction")]
    pub near_saturation_fraction: f32,
    /// Connected near-saturated regions smaller than this are hot pixels.
    #[serde(default = "default_hot_pixel_max_cluster")]
    pub min_cluster_pixels: usize,
    /// Clustered share of the frame (percent) above which severity is MODERATE.
    #[serde(default = "default_moderate_percent")]
    pub moderate_percent: f64,
    #[serde(default = "default_high_percent")]
    pub high_percent: f64,
    #[serde(default = "default_critical_percent")]
    pub critical_percent: f64,
    /// Exposure multiplier recommended for MODERATE saturation.
    #[serde(default = "default_moderate_reduction")]
    pub moderate_reduction: f64,
    /// Exposure multiplier recommended for HIGH and CRITICAL saturation.
    #[serde(default = "default_severe_reduction")]
    pub severe_reduction: f64,
}

fn default_near_fraction() -> f32 {
    0.95
}
fn default_hot_pixel_max_cluster() -> usize {
    10
}
fn default_moderate_percent() -> f64 {
    0.1
}
fn default_high_percent() -> f64 {
    1.0
}
fn default_critical_percent() -> f64 {
    5.0
}
fn default_moderate_reduction() -> f64 {
    0.7
}
fn default_severe_reduction() -> f64 {
    0.5
}

impl Default for SaturationPolicy {
    fn default() -> Self {
        Self {
            near_saturation_fraction: default_near_fraction(),
            min_cluster_pixels: default_hot_pixel_max_cluster(),
            moderate_percent: default_moderate_percent(),
            high_percent: default_high_percent(),
            critical_percent: default_critical_percent(),
            moderate_reduction: default_moderate_reduction(),
            severe_reduction: default_severe_reduction(),
        }
    }
}

impl SaturationPolicy {
    /// Severity from the near-saturated pixel count and the clustered share of the frame.
    pub fn classify(&self, near_saturated: usize, clustered_percent: f64) -> Severity {
        if near_saturated == 0 {
            Severity::None
        } else if clustered_percent > self.critical_percent {
            Severity::Critical
        } else if clustered_percent > self.high_percent {
            Severity::High
        } else if clustered_percent > self.moderate_percent {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }

    /// Exposure multiplier for a saturation severity, if it calls for a reduction.
    pub fn reduction_for(&self, severity: Severity) -> Option<f64> {
        match severity {
            Severity::High | Severity::Critical => Some(self.severe_reduction),
            Severity::Moderate => Some(self.moderate_reduction),
            Severity::None | Severity::Minor => None,
        }
    }
}

/// The named policy table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default)]
    pub exposure: ExposureBands,
    #[serde(default)]
    pub saturation: SaturationPolicy,
    /// SII/OIII exposure relative to the H-alpha baseline.
    #[serde(default = "default_sho_ratio")]
    pub sho_ratio: f64,
    /// Optimal sub length is only mentioned when it differs from the current sub by more than this.
    #[serde(default = "default_sub_tolerance")]
    pub sub_length_tolerance_secs: f64,
}

fn default_sho_ratio() -> f64 {
    0.6
}
fn default_sub_tolerance() -> f64 {
    60.0
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            exposure: ExposureBands::default(),
            saturation: SaturationPolicy::default(),
            sho_ratio: default_sho_ratio(),
            sub_length_tolerance_secs: default_sub_tolerance(),
        }
    }
}

impl PolicyTable {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.exposure.decrease_below <= 0.0
            || self.exposure.decrease_below > self.exposure.increase_above
        {
            return Err(CentaurError::InvalidConfig(format!(
                "policy.exposure bands must satisfy 0 < {} <= {}",
                self.exposure.decrease_below, self.exposure.increase_above
            )));
        }
        let sat = &self.saturation;
        if !(sat.moderate_percent <= sat.high_percent && sat.high_percent <= sat.critical_percent) {
            return Err(CentaurError::InvalidConfig(
                "policy.saturation cutpoints must be ascending".into(),
            ));
        }
        if !(0.0..=1.0).contains(&sat.near_saturation_fraction) {
            return Err(CentaurError::InvalidConfig(
                "policy.saturation.near_saturation_fraction must be within [0, 1]".into(),
            ));
        }
        if self.sho_ratio <= 0.0 {
            return Err(CentaurError::InvalidConfig(
                "policy.sho_ratio must be positive".into(),
            ));
        }
        Ok(())
    }
}
