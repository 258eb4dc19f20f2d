//! Reduction functions shared by focal, aggregate and extract.

use std::fmt;
use std::sync::Arc;

use crate::error::{RasterError, Result};

/// Caller-supplied reducer over the valid values of a window or region.
pub type ReduceFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// How a set of cell values collapses into one value.
///
/// Every reducer sees only valid values; no-data cells are removed before
/// the call. An empty input always reduces to no-data.
///
/// Results are written into a [`GridBuffer`](crate::GridBuffer), so a
/// result equal to the grid's sentinel reads back as no-data.
#[derive(Clone, Default)]
pub enum Reducer {
    Sum,
    #[default]
    Mean,
    Min,
    Max,
    /// Middle order statistic; the mean of the two middle values for even counts.
    Median,
    /// Most frequent value; ties go to the smallest value.
    Mode,
    /// Sample standard deviation (n - 1 denominator).
    StandardDeviation,
    /// A pure function over the valid values. A NaN result is treated as no-data.
    Custom(ReduceFn),
}

impl Reducer {
    /// Wrap a closure as a custom reducer.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Parse a built-in reducer name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "mean" | "avg" | "average" => Some(Self::Mean),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "median" => Some(Self::Median),
            "mode" | "modal" => Some(Self::Mode),
            "sd" | "std" | "stddev" => Some(Self::StandardDeviation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::StandardDeviation => "sd",
            Self::Custom(_) => "custom",
        }
    }

    /// Reduce valid values. `values` may be reordered.
    pub fn reduce(&self, values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        let result = match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => median(values),
            Self::Mode => mode(values),
            Self::StandardDeviation => return standard_deviation(values),
            Self::Custom(f) => f(values),
        };

        (!result.is_nan()).then_some(result)
    }

    /// Reduce values with per-cell coverage weights in `(0, 1]`.
    ///
    /// Sum and mean are area-weighted; min and max consider every cell with
    /// positive weight. Order statistics have no weighted form here.
    pub fn reduce_weighted(&self, values: &[f64], weights: &[f64]) -> Result<Option<f64>> {
        if values.len() != weights.len() {
            return Err(RasterError::dimension_mismatch(
                format!("{} weights", values.len()),
                format!("{} weights", weights.len()),
            ));
        }

        let pairs = values
            .iter()
            .zip(weights)
            .filter(|(_, w)| **w > 0.0)
            .map(|(v, w)| (*v, *w));

        let result = match self {
            Self::Sum => {
                let mut any = false;
                let total = pairs.fold(0.0, |acc, (v, w)| {
                    any = true;
                    acc + v * w
                });
                any.then_some(total)
            }
            Self::Mean => {
                let (total, weight) = pairs.fold((0.0, 0.0), |(t, s), (v, w)| (t + v * w, s + w));
                (weight > 0.0).then(|| total / weight)
            }
            Self::Min => pairs.map(|(v, _)| v).reduce(f64::min),
            Self::Max => pairs.map(|(v, _)| v).reduce(f64::max),
            other => {
                return Err(RasterError::unsupported(format!(
                    "reducer '{}' has no weighted form",
                    other.name()
                )))
            }
        };

        Ok(result)
    }

    /// Check that the reducer can be evaluated with coverage weights.
    pub fn supports_weights(&self) -> bool {
        matches!(self, Self::Sum | Self::Mean | Self::Min | Self::Max)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => write!(f, "Custom(..)"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn mode(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);

    // Sorted ascending, so a strictly-greater count keeps the smallest value on ties.
    let mut best = values[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < values.len() {
        let mut j = i + 1;
        while j < values.len() && values[j] == values[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = values[i];
        }
        i = j;
    }
    best
}

fn standard_deviation(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce(reducer: Reducer, values: &[f64]) -> Option<f64> {
        let mut buf = values.to_vec();
        reducer.reduce(&mut buf)
    }

    #[test]
    fn test_basic_reducers() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(reduce(Reducer::Sum, &values), Some(10.0));
        assert_eq!(reduce(Reducer::Mean, &values), Some(2.5));
        assert_eq!(reduce(Reducer::Min, &values), Some(1.0));
        assert_eq!(reduce(Reducer::Max, &values), Some(4.0));
    }

    #[test]
    fn test_median_even_count_averages_middle() {
        assert_eq!(reduce(Reducer::Median, &[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(reduce(Reducer::Median, &[5.0, 1.0, 3.0]), Some(3.0));
    }

    #[test]
    fn test_mode_tie_takes_smallest() {
        assert_eq!(reduce(Reducer::Mode, &[3.0, 1.0, 3.0, 1.0, 2.0]), Some(1.0));
        assert_eq!(reduce(Reducer::Mode, &[7.0, 2.0, 7.0]), Some(7.0));
        assert_eq!(reduce(Reducer::Mode, &[9.0, 8.0]), Some(8.0));
    }

    #[test]
    fn test_standard_deviation() {
        let sd = reduce(Reducer::StandardDeviation, &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
            .unwrap();
        // Sample sd of the classic example: sqrt(32 / 7)
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(reduce(Reducer::StandardDeviation, &[3.0]), None);
    }

    #[test]
    fn test_empty_reduces_to_none() {
        assert_eq!(reduce(Reducer::Sum, &[]), None);
        assert_eq!(reduce(Reducer::custom(|v| v.len() as f64), &[]), None);
    }

    #[test]
    fn test_custom_reducer() {
        let range = Reducer::custom(|v| {
            let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = v.iter().copied().fold(f64::INFINITY, f64::min);
            max - min
        });
        assert_eq!(reduce(range, &[3.0, 9.0, 4.0]), Some(6.0));
        assert_eq!(reduce(Reducer::custom(|_| f64::NAN), &[1.0]), None);
    }

    #[test]
    fn test_weighted_reducers() {
        let values = [10.0, 20.0, 30.0];
        let weights = [1.0, 0.5, 0.0];
        assert_eq!(Reducer::Sum.reduce_weighted(&values, &weights).unwrap(), Some(20.0));
        let mean = Reducer::Mean.reduce_weighted(&values, &weights).unwrap().unwrap();
        assert!((mean - 20.0 / 1.5).abs() < 1e-12);
        assert_eq!(Reducer::Max.reduce_weighted(&values, &weights).unwrap(), Some(20.0));
        assert_eq!(Reducer::Mean.reduce_weighted(&[], &[]).unwrap(), None);
        assert!(matches!(
            Reducer::Median.reduce_weighted(&values, &weights),
            Err(RasterError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_from_name() {
        assert!(matches!(Reducer::from_name("SUM"), Some(Reducer::Sum)));
        assert!(matches!(Reducer::from_name("sd"), Some(Reducer::StandardDeviation)));
        assert!(Reducer::from_name("bogus").is_none());
    }
}
