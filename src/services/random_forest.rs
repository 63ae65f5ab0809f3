//! Bagged CART regression trees.
//!
//! Each tree is grown on a bootstrap sample of the rows, splitting on the
//! feature/threshold pair with the largest reduction in squared error. All
//! features are considered at every split. Predictions average the trees.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::ModelFailure;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 8,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    position: usize,
    sorted: Vec<usize>,
}

/// Grows one tree over the rows listed in `indices`.
struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: &'a ForestParams,
}

impl TreeBuilder<'_> {
    fn mean(&self, indices: &[usize]) -> f64 {
        indices.iter().map(|&i| self.y[i]).sum::<f64>() / indices.len() as f64
    }

    fn build(&self, indices: &[usize], depth: usize) -> Node {
        let leaf = Node::Leaf(self.mean(indices));

        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return leaf;
        }

        let first = self.y[indices[0]];
        if indices.iter().all(|&i| self.y[i] == first) {
            return leaf;
        }

        match self.best_split(indices) {
            Some(split) => {
                let (left, right) = split.sorted.split_at(split.position);
                Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(self.build(left, depth + 1)),
                    right: Box::new(self.build(right, depth + 1)),
                }
            }
            None => leaf,
        }
    }

    /// Exhaustive search using prefix sums of y and y² over each sorted feature.
    fn best_split(&self, indices: &[usize]) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        if n < 2 * min_leaf {
            return None;
        }

        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<(f64, BestSplit)> = None;

        for feature in 0..self.x.ncols() {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for position in 1..n {
                let y = self.y[sorted[position - 1]];
                left_sum += y;
                left_sq += y * y;

                if position < min_leaf || n - position < min_leaf {
                    continue;
                }

                let lower = self.x[[sorted[position - 1], feature]];
                let upper = self.x[[sorted[position], feature]];
                if lower >= upper {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_n = position as f64;
                let right_n = (n - position) as f64;
                let sse = (left_sq - left_sum * left_sum / left_n) + (right_sq - right_sum * right_sum / right_n);

                if best.as_ref().map_or(true, |(best_sse, _)| sse < *best_sse) {
                    best = Some((
                        sse,
                        BestSplit {
                            feature,
                            threshold: lower + (upper - lower) / 2.0,
                            position,
                            sorted: Vec::new(),
                        },
                    ));
                }
            }
        }

        let (sse, mut split) = best?;
        if !(sse < parent_sse) {
            return None;
        }

        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| self.x[[a, split.feature]].total_cmp(&self.x[[b, split.feature]]));
        split.sorted = sorted;
        Some(split)
    }
}

/// An ensemble of regression trees fitted on bootstrap samples.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Node>,
}

impl RandomForest {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &ForestParams) -> Result<Self, ModelFailure> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(ModelFailure::InsufficientData("empty training matrix".to_string()));
        }
        if y.len() != n {
            return Err(ModelFailure::FitFailed(format!(
                "{} feature rows but {} labels",
                n,
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(ModelFailure::FitFailed("forest needs at least one tree".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ModelFailure::InvalidValue("training data is not finite".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let builder = TreeBuilder { x, y, params };

        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                builder.build(&sample, 0)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
        self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_one(row)).collect()
    }

    /// Coefficient of determination of the forest on `(x, y)`.
    pub fn r2_score(&self, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let predictions = self.predict(x);
        let y_mean = y.mean().unwrap_or(0.0);

        let ss_res: f64 = y.iter().zip(predictions.iter()).map(|(a, p)| (a - p).powi(2)).sum();
        let ss_tot: f64 = y.iter().map(|a| (a - y_mean).powi(2)).sum();

        if ss_tot == 0.0 {
            return if ss_res == 0.0 { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }
}
