//! Fruchterman-Reingold spring layout.
//!
//! Nodes start at uniform random positions in the unit square drawn from a
//! seeded generator, so a given graph and seed always yield the same layout.
//! Connected nodes attract with `d^2 / k`, all pairs repel with `k^2 / d`,
//! and each step moves a node at most the current temperature, which cools
//! linearly to zero. The result is centered on the origin and scaled so the
//! largest coordinate magnitude is 1.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::graph::BipartiteGraph;

const MIN_DISTANCE: f64 = 0.01;
const THRESHOLD: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Positions indexed by `NodeIndex::index()`.
pub fn spring_layout(graph: &BipartiteGraph, seed: u64, iterations: usize) -> Vec<Point> {
    let g = &graph.graph;
    let n = g.node_count();

    match n {
        0 => return Vec::new(),
        1 => return vec![Point { x: 0.0, y: 0.0 }],
        _ => {}
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut pos: Vec<[f64; 2]> = (0..n).map(|_| [rng.gen::<f64>(), rng.gen::<f64>()]).collect();

    let mut adjacent = vec![vec![false; n]; n];
    for edge in g.edge_indices() {
        if let Some((a, b)) = g.edge_endpoints(edge) {
            adjacent[a.index()][b.index()] = true;
            adjacent[b.index()][a.index()] = true;
        }
    }

    let k = (1.0 / n as f64).sqrt();
    let span = |axis: usize| {
        let (lo, hi) = pos
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p[axis]), hi.max(p[axis])));
        hi - lo
    };
    let mut t = span(0).max(span(1)) * 0.1;
    let dt = t / (iterations as f64 + 1.0);

    let mut ran = 0;
    for _ in 0..iterations {
        ran += 1;
        let mut displacement = vec![[0.0f64; 2]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = pos[i][0] - pos[j][0];
                let dy = pos[i][1] - pos[j][1];
                let d = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
                let attraction = if adjacent[i][j] { d / k } else { 0.0 };
                let force = k * k / (d * d) - attraction;
                displacement[i][0] += dx * force;
                displacement[i][1] += dy * force;
            }
        }

        // Frobenius norm of the step matrix, averaged over nodes.
        let mut moved_sq = 0.0f64;
        for (p, disp) in pos.iter_mut().zip(&displacement) {
            let length = (disp[0] * disp[0] + disp[1] * disp[1]).sqrt().max(MIN_DISTANCE);
            let step = [disp[0] * t / length, disp[1] * t / length];
            p[0] += step[0];
            p[1] += step[1];
            moved_sq += step[0] * step[0] + step[1] * step[1];
        }

        t -= dt;
        if moved_sq.sqrt() / (n as f64) < THRESHOLD {
            break;
        }
    }
    debug!(nodes = n, iterations = ran, "spring layout converged");

    rescale(&mut pos);
    pos.into_iter().map(|[x, y]| Point { x, y }).collect()
}

fn rescale(pos: &mut [[f64; 2]]) {
    let n = pos.len() as f64;
    let mean_x = pos.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = pos.iter().map(|p| p[1]).sum::<f64>() / n;

    let mut lim: f64 = 0.0;
    for p in pos.iter_mut() {
        p[0] -= mean_x;
        p[1] -= mean_y;
        lim = lim.max(p[0].abs()).max(p[1].abs());
    }

    if lim > 0.0 {
        for p in pos.iter_mut() {
            p[0] /= lim;
            p[1] /= lim;
        }
    }
}
