//! Standardization of RFM features to comparable scale.

use ndarray::Array2;

/// Per-dimension mean and population standard deviation fitted on the
/// cleaned feature matrix.
///
/// The statistics are returned alongside the segmentation result and are
/// never cached between invocations.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Scaler {
    pub mean: [f64; 3],
    pub std: [f64; 3],
}

impl Scaler {
    /// Fit the scaler on an `(n, 3)` feature matrix.
    pub fn fit(features: &Array2<f64>) -> Self {
        let n = features.nrows().max(1) as f64;
        let mut mean = [0.0; 3];
        let mut std = [0.0; 3];

        for c in 0..3 {
            for r in 0..features.nrows() {
                mean[c] += features[[r, c]];
            }
            mean[c] /= n;
        }
        for c in 0..3 {
            for r in 0..features.nrows() {
                let d = features[[r, c]] - mean[c];
                std[c] += d * d;
            }
            std[c] = (std[c] / n).sqrt();
        }

        Self { mean, std }
    }

    /// Standardize each value as `(x - mean) / std`.
    ///
    /// A zero-stddev dimension (all customers identical on that axis) maps
    /// to exactly 0.0 for every row; the division is never performed.
    pub fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut scaled = Array2::zeros((features.nrows(), 3));
        for c in 0..3 {
            if self.std[c] == 0.0 {
                continue;
            }
            for r in 0..features.nrows() {
                scaled[[r, c]] = (features[[r, c]] - self.mean[c]) / self.std[c];
            }
        }
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_population_statistics() {
        let features =
            Array2::from_shape_vec((2, 3), vec![1.0, 10.0, 100.0, 3.0, 30.0, 300.0]).unwrap();
        let scaler = Scaler::fit(&features);
        assert_eq!(scaler.mean, [2.0, 20.0, 200.0]);
        // population stddev, not sample
        assert_eq!(scaler.std, [1.0, 10.0, 100.0]);
    }

    #[test]
    fn test_transform_standardizes() {
        let features =
            Array2::from_shape_vec((2, 3), vec![1.0, 10.0, 100.0, 3.0, 30.0, 300.0]).unwrap();
        let scaler = Scaler::fit(&features);
        let scaled = scaler.transform(&features);
        for c in 0..3 {
            assert_eq!(scaled[[0, c]], -1.0);
            assert_eq!(scaled[[1, c]], 1.0);
        }
    }

    #[test]
    fn test_zero_stddev_dimension_maps_to_zero() {
        // frequency identical for every customer
        let features = Array2::from_shape_vec(
            (3, 3),
            vec![1.0, 5.0, 100.0, 2.0, 5.0, 200.0, 3.0, 5.0, 300.0],
        )
        .unwrap();
        let scaler = Scaler::fit(&features);
        assert_eq!(scaler.std[1], 0.0);
        let scaled = scaler.transform(&features);
        for r in 0..3 {
            assert_eq!(scaled[[r, 1]], 0.0);
            assert!(scaled[[r, 1]].is_finite());
        }
        // other dimensions still standardized
        assert!(scaled[[0, 0]] < 0.0 && scaled[[2, 0]] > 0.0);
    }
}
