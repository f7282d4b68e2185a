//! Deterministic K-Means clustering over standardized RFM features.
//!
//! Each restart runs Lloyd iteration from a k-means++ seeding drawn from a
//! `StdRng` seeded with `base_seed + run_index`. Restarts are independent
//! and run in parallel; the reduction picks the lowest inertia with ties
//! broken by lowest run index, so the selected assignment is reproducible
//! bit-for-bit for a fixed input order and seed.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::SegmentationError;

/// Number of customer value tiers produced by the segmentation.
pub const SEGMENT_COUNT: usize = 3;

/// Default seed, restart count and iteration cap.
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_RESTARTS: usize = 10;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Outcome of the selected clustering restart.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster index per input row
    pub labels: Vec<usize>,
    /// Final centroids in standardized space, `(SEGMENT_COUNT, 3)`
    pub centroids: Array2<f64>,
    /// Sum of squared point-to-assigned-centroid distances
    pub inertia: f64,
    /// Index of the restart this fit came from
    pub run_index: usize,
    /// Iterations executed before stopping
    pub iterations: usize,
    /// Whether assignments stabilized before the iteration cap
    pub converged: bool,
}

impl KMeansFit {
    /// Member count per cluster index.
    pub fn cluster_sizes(&self) -> [usize; SEGMENT_COUNT] {
        let mut sizes = [0; SEGMENT_COUNT];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Fit K-Means with multiple seeded restarts and pick the best.
///
/// Hitting the iteration cap in a restart is not an error; the restart's
/// last state competes like any other. Every cluster in the returned fit
/// is non-empty.
pub fn fit_kmeans(
    features: &Array2<f64>,
    seed: u64,
    n_restarts: usize,
    max_iterations: usize,
) -> Result<KMeansFit, SegmentationError> {
    if features.nrows() < SEGMENT_COUNT {
        return Err(SegmentationError::insufficient(features.nrows()));
    }

    let runs: Vec<KMeansFit> = (0..n_restarts.max(1))
        .into_par_iter()
        .map(|run| lloyd_run(features, seed.wrapping_add(run as u64), max_iterations, run))
        .collect();

    // collect() preserves run order; strict < keeps the lowest run index
    // on tied inertia regardless of task completion order
    runs.into_iter()
        .reduce(|best, cand| if cand.inertia < best.inertia { cand } else { best })
        .ok_or_else(|| SegmentationError::internal("no clustering restart produced a result"))
}

/// One seeded Lloyd run: seed, iterate, accept the last state at the cap.
fn lloyd_run(
    features: &Array2<f64>,
    seed: u64,
    max_iterations: usize,
    run_index: usize,
) -> KMeansFit {
    let n = features.nrows();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = seed_centroids(features, &mut rng);
    let mut assignments = vec![0usize; n];
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..max_iterations {
        iterations = iter + 1;

        let mut dist_sq = vec![0.0f64; n];
        let mut next = vec![0usize; n];
        for i in 0..n {
            let (best, d) = nearest_centroid(features.row(i), &centroids);
            next[i] = best;
            dist_sq[i] = d;
        }
        let mut changed = iter == 0 || next != assignments;
        assignments = next;

        let mut counts = [0usize; SEGMENT_COUNT];
        for &a in &assignments {
            counts[a] += 1;
        }

        // A cluster that lost all members is re-seeded from the point
        // farthest from its currently assigned centroid, taken from a
        // cluster that can spare one. Lowest point index wins ties.
        while let Some(empty) = counts.iter().position(|&c| c == 0) {
            let mut farthest: Option<usize> = None;
            for i in 0..n {
                if counts[assignments[i]] <= 1 || dist_sq[i] < 0.0 {
                    continue;
                }
                if farthest.map_or(true, |f| dist_sq[i] > dist_sq[f]) {
                    farthest = Some(i);
                }
            }
            let Some(point) = farthest else { break };
            counts[assignments[point]] -= 1;
            assignments[point] = empty;
            counts[empty] = 1;
            dist_sq[point] = -1.0;
            changed = true;
        }

        let mut sums = [[0.0f64; 3]; SEGMENT_COUNT];
        for (i, &a) in assignments.iter().enumerate() {
            for c in 0..3 {
                sums[a][c] += features[[i, c]];
            }
        }
        for j in 0..SEGMENT_COUNT {
            for c in 0..3 {
                centroids[[j, c]] = sums[j][c] / counts[j] as f64;
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }

    let inertia = compute_inertia(features, &assignments, &centroids);
    KMeansFit {
        labels: assignments,
        centroids,
        inertia,
        run_index,
        iterations,
        converged,
    }
}

/// k-means++ seeding: first centroid uniform, the rest weighted by squared
/// distance to the nearest already-chosen centroid.
fn seed_centroids(features: &Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
    let n = features.nrows();
    let mut centroids = Array2::zeros((SEGMENT_COUNT, 3));
    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&features.row(first));

    for chosen in 1..SEGMENT_COUNT {
        let weights: Vec<f64> = (0..n)
            .map(|i| {
                (0..chosen)
                    .map(|j| sq_dist(features.row(i), centroids.row(j)))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let pick = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (i, &w) in weights.iter().enumerate() {
                cumsum += w;
                if cumsum >= threshold {
                    selected = i;
                    break;
                }
            }
            selected
        } else {
            // every point coincides with a chosen centroid
            rng.gen_range(0..n)
        };
        centroids.row_mut(chosen).assign(&features.row(pick));
    }
    centroids
}

/// Nearest centroid by Euclidean distance; ties go to the lowest index.
fn nearest_centroid(point: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = sq_dist(point, centroids.row(0));
    for j in 1..centroids.nrows() {
        let d = sq_dist(point, centroids.row(j));
        if d < best_dist {
            best_dist = d;
            best = j;
        }
    }
    (best, best_dist)
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn compute_inertia(features: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(i, &cluster)| sq_dist(features.row(i), centroids.row(cluster)))
        .sum()
}
