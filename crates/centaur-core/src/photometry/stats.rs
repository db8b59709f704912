use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Mean, median and standard deviation after iterative sigma clipping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClippedStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    /// Values remaining after clipping.
    #[serde(skip)]
    pub count: usize,
}

/// Finite pixel values for which `exclude` is false, in row-major order.
///
/// Rows are gathered in parallel for large frames and concatenated in order,
/// so the output is the same either way.
pub fn collect_values(data: &Array2<f32>, exclude: Option<&Array2<bool>>) -> Vec<f32> {
    let (h, w) = data.dim();
    let gather_row = |row: usize| -> Vec<f32> {
        (0..w)
            .filter(|&col| !exclude.is_some_and(|m| m[[row, col]]))
            .map(|col| data[[row, col]])
            .filter(|v| v.is_finite())
            .collect()
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h).into_par_iter().map(gather_row).collect();
        rows.concat()
    } else {
        (0..h).flat_map(gather_row).collect()
    }
}

/// Median of `values`, reordering them in place. `None` when empty.
pub fn median_in_place(values: &mut [f32]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    let upper = *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1;
    if n % 2 == 1 {
        Some(upper as f64)
    } else {
        let lower = *values[..mid]
            .select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b))
            .1;
        Some((lower as f64 + upper as f64) / 2.0)
    }
}

/// Population mean and standard deviation, summed sequentially in f64.
pub fn mean_std(values: &[f32]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    Some((mean, var.sqrt()))
}

/// Sigma-clipped statistics: repeatedly drop values further than
/// `sigma` standard deviations from the median until nothing changes or
/// `max_iters` passes have run.
pub fn sigma_clipped_stats(values: &[f32], sigma: f64, max_iters: usize) -> Option<ClippedStats> {
    let mut kept: Vec<f32> = values.to_vec();
    let mut scratch: Vec<f32> = Vec::with_capacity(kept.len());

    for _ in 0..max_iters {
        scratch.clear();
        scratch.extend_from_slice(&kept);
        let median = median_in_place(&mut scratch)?;
        let (_, std) = mean_std(&kept)?;
        let limit = sigma * std;

        let before = kept.len();
        kept.retain(|&v| (v as f64 - median).abs() <= limit);
        if kept.len() == before {
            break;
        }
    }

    let (mean, std) = mean_std(&kept)?;
    scratch.clear();
    scratch.extend_from_slice(&kept);
    let median = median_in_place(&mut scratch)?;
    Some(ClippedStats {
        mean,
        median,
        std,
        count: kept.len(),
    })
}
