use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::policy::Severity;
use crate::report::Report;

/// Most frequent recommendation lines kept per cohort.
const TOP_RECOMMENDATIONS: usize = 3;

/// Cohort key for aggregate summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Filter,
    Rig,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Rig => write!(f, "rig"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl RangeStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            min,
            max,
            count: values.len(),
        })
    }
}

/// Aggregates over the reports sharing a filter or rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub key: String,
    pub file_count: usize,
    pub mean_current_exposure: Option<f64>,
    pub mean_recommended_exposure: Option<f64>,
    pub mean_sho_exposure: Option<f64>,
    pub mean_snr_background: Option<f64>,
    pub sky_brightness: Option<RangeStats>,
    pub severity_counts: BTreeMap<Severity, usize>,
    /// Most frequent recommendation lines with their counts.
    pub top_recommendations: Vec<(String, usize)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub path: PathBuf,
    pub attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub group_by: GroupBy,
    pub total_files: usize,
    /// Cohorts ordered by key.
    pub cohorts: Vec<CohortSummary>,
    pub quarantined: Vec<QuarantineRecord>,
}

/// Group reports into cohorts and aggregate the non-null metrics of each.
pub fn summarize<'a>(
    reports: impl IntoIterator<Item = &'a Report>,
    quarantined: &[QuarantineRecord],
    group_by: GroupBy,
) -> Summary {
    let mut groups: BTreeMap<String, Vec<&Report>> = BTreeMap::new();
    for report in reports {
        let key = match group_by {
            GroupBy::Filter => report.file_info.filter.clone(),
            GroupBy::Rig => report.file_info.rig.clone(),
        };
        groups.entry(key).or_default().push(report);
    }

    let total_files = groups.values().map(Vec::len).sum();
    let cohorts = groups
        .into_iter()
        .map(|(key, members)| cohort(key, &members))
        .collect();

    Summary {
        group_by,
        total_files,
        cohorts,
        quarantined: quarantined.to_vec(),
    }
}

fn cohort(key: String, members: &[&Report]) -> CohortSummary {
    let sky: Vec<f64> = members
        .iter()
        .filter_map(|r| r.analysis.sky_brightness.as_ref()?.mag_per_arcsec2)
        .collect();

    let mut severity_counts = BTreeMap::new();
    for sat in members.iter().filter_map(|r| r.analysis.saturation_analysis.as_ref()) {
        *severity_counts.entry(sat.severity).or_insert(0) += 1;
    }

    let mut line_counts: HashMap<&str, usize> = HashMap::new();
    for line in members.iter().flat_map(|r| r.recommendations.iter()) {
        *line_counts.entry(line.as_str()).or_insert(0) += 1;
    }
    let mut top: Vec<(String, usize)> = line_counts
        .into_iter()
        .map(|(line, count)| (line.to_string(), count))
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_RECOMMENDATIONS);

    CohortSummary {
        key,
        file_count: members.len(),
        mean_current_exposure: mean_of(members, |r| r.analysis.current_exposure),
        mean_recommended_exposure: mean_of(members, |r| r.analysis.recommended_exposure),
        mean_sho_exposure: mean_of(members, |r| {
            r.analysis
                .sho_recommendation
                .as_ref()
                .map(|s| s.recommended_exposure)
        }),
        mean_snr_background: mean_of(members, |r| {
            r.analysis.snr_metrics.as_ref().map(|s| s.snr_background)
        }),
        sky_brightness: RangeStats::from_values(&sky),
        severity_counts,
        top_recommendations: top,
    }
}

fn mean_of(members: &[&Report], metric: impl Fn(&Report) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = members.iter().filter_map(|r| metric(r)).collect();
    RangeStats::from_values(&values).map(|s| s.mean)
}
