//! k-d tree for nearest-neighbour queries over sample matrices
//!
//! Rows of an (n, d) matrix are the points. The tree stores indices only and
//! borrows the matrix, so building it never copies sample data.

use ndarray::ArrayView2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct Node {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Neighbour candidate ordered by squared distance (max-heap on distance)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Balanced k-d tree over the rows of a sample matrix
pub struct KdTree<'a> {
    points: ArrayView2<'a, f64>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl<'a> KdTree<'a> {
    /// Build a tree by recursive median splits, cycling through the axes
    pub fn new(points: ArrayView2<'a, f64>) -> Self {
        let mut tree = Self {
            points,
            nodes: Vec::with_capacity(points.nrows()),
            root: None,
        };
        let mut indices: Vec<usize> = (0..points.nrows()).collect();
        tree.root = tree.build(&mut indices, 0);
        tree
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether the tree holds no points
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    fn build(&mut self, indices: &mut [usize], depth: usize) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let dims = self.points.ncols().max(1);
        let axis = depth % dims;
        let mid = indices.len() / 2;
        let points = self.points;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            let va = points.get((a, axis)).copied().unwrap_or(0.0);
            let vb = points.get((b, axis)).copied().unwrap_or(0.0);
            va.total_cmp(&vb)
        });

        let (lower, rest) = indices.split_at_mut(mid);
        let (&mut point, upper) = rest.split_first_mut()?;

        let left = self.build(lower, depth + 1);
        let right = self.build(upper, depth + 1);
        self.nodes.push(Node {
            point,
            axis,
            left,
            right,
        });
        Some(self.nodes.len() - 1)
    }

    fn distance_sq(&self, a: usize, b: usize) -> f64 {
        self.points
            .row(a)
            .iter()
            .zip(self.points.row(b).iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }

    /// Euclidean distance from point `index` to its k-th nearest other point
    ///
    /// The query point itself is excluded; duplicates of it are not. Returns
    /// `None` when fewer than `k` other points exist.
    pub fn kth_neighbor_distance(&self, index: usize, k: usize) -> Option<f64> {
        if k == 0 || index >= self.len() {
            return None;
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(self.root, index, k, &mut heap);
        if heap.len() < k {
            return None;
        }
        heap.peek().map(|worst| worst.distance_sq.sqrt())
    }

    fn search(
        &self,
        node: Option<usize>,
        query: usize,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let Some(node) = node.and_then(|n| self.nodes.get(n)).copied() else {
            return;
        };

        if node.point != query {
            let candidate = Candidate {
                distance_sq: self.distance_sq(query, node.point),
                index: node.point,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        let query_value = self.points.get((query, node.axis)).copied().unwrap_or(0.0);
        let split_value = self.points.get((node.point, node.axis)).copied().unwrap_or(0.0);
        let diff = query_value - split_value;
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search(near, query, k, heap);

        let must_visit_far = heap.len() < k
            || heap
                .peek()
                .is_some_and(|worst| diff * diff < worst.distance_sq);
        if must_visit_far {
            self.search(far, query, k, heap);
        }
    }
}
