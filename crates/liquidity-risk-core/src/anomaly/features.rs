use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Median};

use crate::ratios::{RatioRecord, FEATURE_NAMES};

const N_FEATURES: usize = FEATURE_NAMES.len();

/// Rows = periods, columns = [`FEATURE_NAMES`]. Undefined cells take the
/// median of the defined cells in their column, or 0 when none is defined.
pub fn build_feature_matrix(records: &[RatioRecord]) -> Vec<Vec<f64>> {
    let cells: Vec<[Option<f64>; N_FEATURES]> = records
        .iter()
        .map(|r| r.features().map(|v| v.value().and_then(|d| d.to_f64())))
        .collect();

    let fill: Vec<f64> = (0..N_FEATURES)
        .map(|col| {
            let defined: Vec<f64> = cells.iter().filter_map(|row| row[col]).collect();
            if defined.is_empty() {
                0.0
            } else {
                Data::new(defined).median()
            }
        })
        .collect();

    cells
        .iter()
        .map(|row| {
            row.iter()
                .zip(&fill)
                .map(|(cell, median)| cell.unwrap_or(*median))
                .collect()
        })
        .collect()
}

/// Flatten columns whose spread is immaterial next to the typical level of
/// the ratio, so rounding noise cannot isolate a period on its own.
///
/// A level column and its delta column share the scale
/// `min_relative_spread * |median level|`. Returns the number of columns
/// flattened.
pub fn suppress_immaterial(matrix: &mut [Vec<f64>], min_relative_spread: f64) -> usize {
    if matrix.is_empty() || min_relative_spread <= 0.0 {
        return 0;
    }
    let levels = N_FEATURES / 2;
    let mut flattened = 0;

    for level in 0..levels {
        let scale = Data::new(matrix.iter().map(|row| row[level]).collect::<Vec<_>>())
            .median()
            .abs();
        let tolerance = min_relative_spread * scale;

        for col in [level, level + levels] {
            let (lo, hi) = matrix
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), row| {
                    (lo.min(row[col]), hi.max(row[col]))
                });
            if hi > lo && hi - lo <= tolerance {
                for row in matrix.iter_mut() {
                    row[col] = 0.0;
                }
                flattened += 1;
            }
        }
    }
    flattened
}
