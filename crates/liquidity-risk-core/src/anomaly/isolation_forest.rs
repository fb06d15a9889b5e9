use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use rand::SeedableRng;

use crate::error::LiquidityRiskError;
use crate::LiquidityRiskResult;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` points; normalizes path lengths across subsample sizes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, x: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] < *threshold {
                    left.path_length(x, depth + 1)
                } else {
                    right.path_length(x, depth + 1)
                }
            }
        }
    }
}

fn grow(data: &[Vec<f64>], rows: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    let n_features = data[rows[0]].len();
    let ranges: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|f| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                (lo.min(data[r][f]), hi.max(data[r][f]))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();

    // identical points cannot be separated
    if ranges.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| data[r][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, limit, rng)),
        right: Box::new(grow(data, right, depth + 1, limit, rng)),
    }
}

/// An ensemble of random isolation trees. Points that are isolated after few
/// splits on average score close to 1.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Grow `n_trees` trees, each on a subsample of `min(max_samples, n)` rows
    /// drawn without replacement. All randomness comes from `seed`.
    pub fn fit(
        data: &[Vec<f64>],
        n_trees: usize,
        max_samples: usize,
        seed: u64,
    ) -> LiquidityRiskResult<Self> {
        if data.is_empty() {
            return Err(LiquidityRiskError::InsufficientData {
                required: 1,
                supplied: 0,
            });
        }
        if n_trees == 0 {
            return Err(LiquidityRiskError::InvalidInput {
                field: "n_trees".into(),
                reason: "Must be at least 1".into(),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = max_samples.min(data.len()).max(1);
        let limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..n_trees)
            .map(|_| {
                let rows = index::sample(&mut rng, data.len(), sample_size).into_vec();
                grow(data, rows, 0, limit, &mut rng)
            })
            .collect();

        Ok(Self { trees, sample_size })
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Mean path length of `x` across the ensemble.
    pub fn mean_path_length(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(x, 0)).sum();
        total / self.trees.len() as f64
    }

    /// 2^(-E[h(x)] / c(psi)), in (0, 1].
    pub fn score(&self, x: &[f64]) -> f64 {
        let c = average_path_length(self.sample_size);
        if c == 0.0 {
            return 0.5;
        }
        2f64.powf(-self.mean_path_length(x) / c)
    }
}
