//! Optimal transport between coordinate-augmented patches
//!
//! Each patch is a uniform empirical distribution over its pixels, seen as
//! points in (row, col, values...) space. The ground cost is the Euclidean
//! distance raised to the Wasserstein order ρ. The exact solver runs
//! successive shortest paths on the transportation network; the Sinkhorn
//! solver iterates entropic scaling in the log domain, which stays stable for
//! small regularisation strengths.

use log::{debug, warn};
use ndarray::{Array2, ArrayView2};

use crate::analysis::divergence::pairwise_mean;
use crate::io::configuration::{
    EXACT_TRANSPORT_PAIR_WARNING, SINKHORN_MAX_ITERATIONS, SINKHORN_TOLERANCE,
};
use crate::io::error::{Result, invalid_parameter};
use crate::preprocess::filters::resize_bilinear;
use crate::spatial::{BoundaryPolicy, ImageBuffer, PatchGrid};

/// Optimal-transport solver selection
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransportSolver {
    /// Network-flow solution of the exact transportation problem
    Exact,
    /// Entropically regularised approximation
    Sinkhorn {
        /// Regularisation strength; smaller is closer to exact but slower
        regularization: f64,
    },
}

/// Pairwise ground costs `‖a_i − b_j‖^order`
pub fn cost_matrix(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>, order: f64) -> Array2<f64> {
    Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
        let distance = a
            .row(i)
            .iter()
            .zip(b.row(j).iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt();
        distance.powf(order)
    })
}

/// Minimum expected cost between uniform distributions over rows and columns
///
/// Masses are scaled to integers (each source holds `m / g` units, each sink
/// `n / g` units for an n × m cost matrix with g = gcd(n, m)) and routed by
/// successive shortest paths with Dijkstra on reduced costs. Returns `NaN`
/// for an empty side.
pub fn exact_transport_cost(cost: &Array2<f64>) -> f64 {
    let (sources, sinks) = cost.dim();
    if sources == 0 || sinks == 0 {
        return f64::NAN;
    }
    let node_count = sources + sinks;
    let divisor = greatest_common_divisor(sources, sinks);
    let total_units = (sources * sinks / divisor) as u64;
    let mut supply = vec![(sinks / divisor) as u64; sources];
    let mut demand = vec![(sources / divisor) as u64; sinks];
    let mut flow = Array2::<u64>::zeros((sources, sinks));
    let mut potential = vec![0.0_f64; node_count];
    let mut remaining = total_units;
    let at = |i: usize, j: usize| cost.get((i, j)).copied().unwrap_or(f64::INFINITY);

    let mut distance = vec![f64::INFINITY; node_count];
    let mut previous: Vec<Option<usize>> = vec![None; node_count];
    let mut visited = vec![false; node_count];

    while remaining > 0 {
        distance.fill(f64::INFINITY);
        previous.fill(None);
        visited.fill(false);
        for (source, &units) in supply.iter().enumerate() {
            if units > 0 {
                if let Some(d) = distance.get_mut(source) {
                    *d = 0.0;
                }
            }
        }

        // Dense Dijkstra: sources are nodes 0..n, sinks n..n+m
        loop {
            let next = (0..node_count)
                .filter(|&v| !visited.get(v).copied().unwrap_or(true))
                .filter(|&v| distance.get(v).is_some_and(|d| d.is_finite()))
                .min_by(|&u, &v| {
                    let du = distance.get(u).copied().unwrap_or(f64::INFINITY);
                    let dv = distance.get(v).copied().unwrap_or(f64::INFINITY);
                    du.total_cmp(&dv)
                });
            let Some(node) = next else { break };
            if let Some(flag) = visited.get_mut(node) {
                *flag = true;
            }
            let node_distance = distance.get(node).copied().unwrap_or(f64::INFINITY);
            let node_potential = potential.get(node).copied().unwrap_or(0.0);

            if node < sources {
                // Forward arcs source -> sink have unlimited capacity
                for sink in 0..sinks {
                    let target = sources + sink;
                    let reduced = at(node, sink) + node_potential
                        - potential.get(target).copied().unwrap_or(0.0);
                    relax(&mut distance, &mut previous, node, target, node_distance + reduced.max(0.0));
                }
            } else {
                // Backward arcs sink -> source exist where flow was sent
                let sink = node - sources;
                for source in 0..sources {
                    if flow.get((source, sink)).copied().unwrap_or(0) > 0 {
                        let reduced = -at(source, sink) + node_potential
                            - potential.get(source).copied().unwrap_or(0.0);
                        relax(&mut distance, &mut previous, node, source, node_distance + reduced.max(0.0));
                    }
                }
            }
        }

        let target = (0..sinks)
            .filter(|&sink| demand.get(sink).copied().unwrap_or(0) > 0)
            .map(|sink| sources + sink)
            .filter(|&node| distance.get(node).is_some_and(|d| d.is_finite()))
            .min_by(|&u, &v| {
                let du = distance.get(u).copied().unwrap_or(f64::INFINITY);
                let dv = distance.get(v).copied().unwrap_or(f64::INFINITY);
                du.total_cmp(&dv)
            });
        let Some(target) = target else {
            debug!("exact transport stalled with {remaining} units unrouted");
            return f64::NAN;
        };

        let target_distance = distance.get(target).copied().unwrap_or(0.0);
        for (p, d) in potential.iter_mut().zip(&distance) {
            *p += d.min(target_distance);
        }

        // Walk the path back to its source, collecting the bottleneck
        let mut path = Vec::new();
        let mut node = target;
        while let Some(parent) = previous.get(node).copied().flatten() {
            path.push((parent, node));
            node = parent;
        }
        let origin = node;
        let mut bottleneck = supply
            .get(origin)
            .copied()
            .unwrap_or(0)
            .min(demand.get(target - sources).copied().unwrap_or(0));
        for &(from, to) in &path {
            if from >= sources {
                bottleneck = bottleneck.min(flow.get((to, from - sources)).copied().unwrap_or(0));
            }
        }
        if bottleneck == 0 {
            return f64::NAN;
        }

        for &(from, to) in &path {
            if from < sources {
                if let Some(units) = flow.get_mut((from, to - sources)) {
                    *units += bottleneck;
                }
            } else if let Some(units) = flow.get_mut((to, from - sources)) {
                *units -= bottleneck;
            }
        }
        if let Some(units) = supply.get_mut(origin) {
            *units -= bottleneck;
        }
        if let Some(units) = demand.get_mut(target - sources) {
            *units -= bottleneck;
        }
        remaining -= bottleneck;
    }

    let total: f64 = flow
        .indexed_iter()
        .map(|((i, j), &units)| units as f64 * at(i, j))
        .sum();
    total / total_units as f64
}

const fn greatest_common_divisor(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

fn relax(
    distance: &mut [f64],
    previous: &mut [Option<usize>],
    from: usize,
    to: usize,
    candidate: f64,
) {
    if let (Some(current), Some(parent)) = (distance.get_mut(to), previous.get_mut(to)) {
        if candidate < *current {
            *current = candidate;
            *parent = Some(from);
        }
    }
}

fn log_sum_exp(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    let max = collected.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + collected.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Transport cost of the entropic optimal plan between uniform distributions
///
/// Log-domain Sinkhorn iterations update the dual potentials until the row
/// marginals match within `SINKHORN_TOLERANCE`. The returned value is the
/// linear cost `⟨P, C⟩` of the regularised plan, without the entropy term.
pub fn sinkhorn_transport_cost(cost: &Array2<f64>, regularization: f64) -> f64 {
    let (sources, sinks) = cost.dim();
    if sources == 0 || sinks == 0 || regularization <= 0.0 {
        return f64::NAN;
    }
    let log_a = -(sources as f64).ln();
    let log_b = -(sinks as f64).ln();
    let mut f = vec![0.0_f64; sources];
    let mut g = vec![0.0_f64; sinks];
    let at = |i: usize, j: usize| cost.get((i, j)).copied().unwrap_or(f64::INFINITY);

    for iteration in 0..SINKHORN_MAX_ITERATIONS {
        for (i, fi) in f.iter_mut().enumerate() {
            let lse = log_sum_exp(g.iter().enumerate().map(|(j, gj)| (gj - at(i, j)) / regularization));
            *fi = regularization * (log_a - lse);
        }
        for (j, gj) in g.iter_mut().enumerate() {
            let lse = log_sum_exp(f.iter().enumerate().map(|(i, fi)| (fi - at(i, j)) / regularization));
            *gj = regularization * (log_b - lse);
        }

        // Column marginals are exact after the g update; check the rows
        let row_error: f64 = f
            .iter()
            .enumerate()
            .map(|(i, fi)| {
                let mass: f64 = g
                    .iter()
                    .enumerate()
                    .map(|(j, gj)| ((fi + gj - at(i, j)) / regularization).exp())
                    .sum();
                (mass - log_a.exp()).abs()
            })
            .sum();
        if row_error < SINKHORN_TOLERANCE {
            debug!("sinkhorn converged after {} iterations", iteration + 1);
            break;
        }
    }

    f.iter()
        .enumerate()
        .map(|(i, fi)| {
            g.iter()
                .enumerate()
                .map(|(j, gj)| {
                    let c = at(i, j);
                    ((fi + gj - c) / regularization).exp() * c
                })
                .sum::<f64>()
        })
        .sum()
}

/// Wasserstein distance of order `order` between two point clouds
pub fn wasserstein_distance(
    a: ArrayView2<'_, f64>,
    b: ArrayView2<'_, f64>,
    order: f64,
    solver: TransportSolver,
) -> f64 {
    let cost = cost_matrix(a, b, order);
    let transport_cost = match solver {
        TransportSolver::Exact => exact_transport_cost(&cost),
        TransportSolver::Sinkhorn { regularization } => {
            sinkhorn_transport_cost(&cost, regularization)
        }
    };
    transport_cost.max(0.0).powf(1.0 / order)
}

/// Number of transport problems solved for `patches` patches
///
/// Distances are symmetric, so each unordered pair and each self-pair is
/// solved once.
pub const fn transport_pair_count(patches: usize) -> usize {
    patches * (patches + 1) / 2
}

/// Mean Wasserstein distance between all pairs of valid patches
///
/// Patches are coordinate-augmented and pixel values scaled by the maximum
/// level. When `downscale` is given the image is shrunk first.
///
/// # Errors
///
/// Returns an error if the patch size is zero or the downscale factor invalid
pub fn mean_patch_wasserstein(
    image: &ImageBuffer,
    patch_size: usize,
    boundary: BoundaryPolicy,
    order: f64,
    solver: TransportSolver,
    downscale: Option<f64>,
) -> Result<f64> {
    if !order.is_finite() || order < 1.0 {
        return Err(invalid_parameter("wasserstein_order", &order, &"must be at least 1"));
    }
    let scaled;
    let source = match downscale {
        Some(factor) => {
            scaled = resize_bilinear(image, factor)?;
            &scaled
        }
        None => image,
    };
    let grid = PatchGrid::decompose(source, patch_size, patch_size, true, boundary)?;
    let clouds = grid.point_clouds(source, source.max_level());
    let pairs = transport_pair_count(clouds.len());
    debug!("transport between {} patches, {pairs} pairs ({solver:?})", clouds.len());
    if solver == TransportSolver::Exact && pairs > EXACT_TRANSPORT_PAIR_WARNING {
        warn!(
            "exact transport over {pairs} patch pairs will be slow; \
             consider --sinkhorn or --transport-downscale"
        );
    }
    Ok(pairwise_mean(&clouds, |a, b| {
        wasserstein_distance(a.view(), b.view(), order, solver)
    }))
}
