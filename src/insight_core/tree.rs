//! Isolation tree: random axis-aligned partitioning of a sub-sample.
//!
//! Every leaf satisfies one of: it holds a single point, it sits at the
//! height limit, or all of its points are identical in every dimension.

use ndarray::{Array2, ArrayView1};
use rand::Rng;

use super::path_length::average_path_length;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Internal {
        /// Split dimension
        feature: usize,
        /// Points with `x[feature] < threshold` go left, the rest go right
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        /// Number of sample points that terminated here
        size: usize,
        depth: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsolationTree {
    root: Node,
    height_limit: usize,
}

impl IsolationTree {
    /// Build a tree over the rows of `data` selected by `indices`
    ///
    /// `indices` is reordered in place while partitioning.
    pub fn build<R: Rng + ?Sized>(
        data: &Array2<f64>,
        indices: &mut [usize],
        height_limit: usize,
        rng: &mut R,
    ) -> Self {
        let root = grow(data, indices, 0, height_limit, rng);
        Self { root, height_limit }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn height_limit(&self) -> usize {
        self.height_limit
    }

    /// Edges from the root to the leaf containing `x`, plus `c(size)` for
    /// leaves that still hold more than one point
    pub fn path_length(&self, x: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut edges = 0usize;
        loop {
            match node {
                Node::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] < *threshold { left } else { right };
                    edges += 1;
                }
                Node::Leaf { size, .. } => {
                    return edges as f64 + average_path_length(*size);
                }
            }
        }
    }

    /// `(size, depth)` of every leaf, left to right
    pub fn leaves(&self) -> Vec<(usize, usize)> {
        let mut leaves = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                Node::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                Node::Leaf { size, depth } => leaves.push((*size, *depth)),
            }
        }
        leaves
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        self.leaves()
            .iter()
            .map(|&(_, depth)| depth)
            .max()
            .unwrap_or(0)
    }
}

fn grow<R: Rng + ?Sized>(
    data: &Array2<f64>,
    indices: &mut [usize],
    depth: usize,
    height_limit: usize,
    rng: &mut R,
) -> Node {
    let size = indices.len();
    if size <= 1 || depth >= height_limit {
        return Node::Leaf { size, depth };
    }

    // Only dimensions with spread at this node can split it; picking uniformly
    // among them is the same as resampling until a non-constant one comes up.
    let splittable: Vec<(usize, f64, f64)> = (0..data.ncols())
        .filter_map(|feature| {
            let (min, max) = column_range(data, indices, feature);
            (max > min).then_some((feature, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf { size, depth };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = split_threshold(rng.gen_range(min..max), min, max);

    let split = partition(data, indices, feature, threshold);
    let (left_indices, right_indices) = indices.split_at_mut(split);

    Node::Internal {
        feature,
        threshold,
        left: Box::new(grow(data, left_indices, depth + 1, height_limit, rng)),
        right: Box::new(grow(data, right_indices, depth + 1, height_limit, rng)),
    }
}

/// Keep a drawn threshold strictly inside `(min, max)`
///
/// `gen_range` may return `min` itself, which would leave the left side
/// empty. The midpoint is used instead; when `min` and `max` are adjacent
/// floats there is no value between them and `max` is the only split.
fn split_threshold(drawn: f64, min: f64, max: f64) -> f64 {
    if drawn > min && drawn < max {
        return drawn;
    }
    let mid = min + (max - min) / 2.0;
    if mid > min && mid < max {
        mid
    } else {
        max
    }
}

fn column_range(data: &Array2<f64>, indices: &[usize], feature: usize) -> (f64, f64) {
    indices
        .iter()
        .map(|&row| data[[row, feature]])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        })
}

/// Move rows below `threshold` to the front; returns the count of such rows
fn partition(data: &Array2<f64>, indices: &mut [usize], feature: usize, threshold: f64) -> usize {
    let mut split = 0;
    for i in 0..indices.len() {
        if data[[indices[i], feature]] < threshold {
            indices.swap(i, split);
            split += 1;
        }
    }
    split
}
