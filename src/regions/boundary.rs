use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::grid::Grid;

/// Safety valve for boundary walks over malformed adjacency graphs.
const MAX_WALK_STEPS: usize = 20_000;

/// Completed loops between cooperative yield points.
const LOOP_YIELD_INTERVAL: usize = 16;

/// Point budget per loop before uniform-stride downsampling kicks in.
pub const MAX_LOOP_POINTS: usize = 800;

/// Snapped point in pixel space. Integer keys make coincident segment
/// endpoints from adjacent cells collapse exactly.
pub type Point = (i64, i64);
type Seg = (Point, Point);

/// Geometry parameters for one extraction run.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryConfig {
    /// Pixel size of one grid cell on the render surface.
    pub cell_w: f64,
    pub cell_h: f64,
    /// Endpoint snap quantum in pixels (typically grid_divisor / 2).
    pub snap: i64,
    /// Chaikin corner-cutting iterations (clamped to 1-3).
    pub chaikin_iters: u32,
}

#[inline]
fn snap_coord(v: f64, snap: i64) -> i64 {
    (v / snap as f64).round() as i64 * snap
}

/// Emit one segment per cell edge whose neighbor (or the grid border)
/// belongs to a different region, grouped by region id.
pub fn extract_segments(
    assign: &Grid<i32>,
    seed_count: usize,
    cfg: &BoundaryConfig,
) -> Vec<Vec<Seg>> {
    let (gw, gh) = (assign.w, assign.h);
    let mut segments: Vec<Vec<Seg>> = vec![Vec::new(); seed_count];
    let at = |x: i32, y: i32| -> i32 {
        if x < 0 || x >= gw as i32 || y < 0 || y >= gh as i32 {
            -1
        } else {
            assign.data[y as usize * gw + x as usize]
        }
    };
    for gy in 0..gh {
        for gx in 0..gw {
            let id = assign.get(gx, gy);
            if id < 0 {
                continue;
            }
            let x = gx as f64 * cfg.cell_w;
            let y = gy as f64 * cfg.cell_h;
            let x2 = x + cfg.cell_w;
            let y2 = y + cfg.cell_h;
            let (ix, iy) = (gx as i32, gy as i32);
            let mut add = |x1: f64, y1: f64, x2: f64, y2: f64| {
                segments[id as usize].push((
                    (snap_coord(x1, cfg.snap), snap_coord(y1, cfg.snap)),
                    (snap_coord(x2, cfg.snap), snap_coord(y2, cfg.snap)),
                ));
            };
            if at(ix, iy - 1) != id {
                add(x, y, x2, y);
            }
            if at(ix + 1, iy) != id {
                add(x2, y, x2, y2);
            }
            if at(ix, iy + 1) != id {
                add(x2, y2, x, y2);
            }
            if at(ix - 1, iy) != id {
                add(x, y2, x, y);
            }
        }
    }
    segments
}

/// Reconstruct closed loops from one region's undirected segments: build a
/// point adjacency map, then walk from each unvisited edge taking any
/// neighbor other than the point just left, until the walk returns to its
/// start or trips the step cap. Walks shorter than 3 points are dropped.
/// Ordered maps keep the traversal deterministic.
pub async fn build_loops(segs: &[Seg]) -> Vec<Vec<Point>> {
    if segs.is_empty() {
        return Vec::new();
    }
    let mut adj: BTreeMap<Point, BTreeSet<Point>> = BTreeMap::new();
    for &(a, b) in segs {
        if a == b {
            continue; // degenerate after snapping
        }
        adj.entry(a).or_default().insert(b);
        adj.entry(b).or_default().insert(a);
    }

    let mut loops = Vec::new();
    let mut visited: HashSet<(Point, Point)> = HashSet::new();
    let mut walked = 0usize;

    let starts: Vec<(Point, Point)> = adj
        .iter()
        .flat_map(|(&a, nbrs)| nbrs.iter().map(move |&b| (a, b)))
        .collect();

    for (start, first) in starts {
        if visited.contains(&(start, first)) {
            continue;
        }
        let mut current = start;
        let mut prev: Option<Point> = None;
        let mut ring = vec![current];
        let mut steps = 0;
        loop {
            let Some(nbrs) = adj.get(&current) else { break };
            let Some(&next) = nbrs.iter().find(|&&p| Some(p) != prev) else {
                break; // dead end
            };
            visited.insert((current, next));
            visited.insert((next, current));
            prev = Some(current);
            current = next;
            steps += 1;
            if current == start || steps > MAX_WALK_STEPS {
                break;
            }
            ring.push(current);
        }
        if ring.len() > 2 {
            loops.push(ring);
        }
        walked += 1;
        if walked % LOOP_YIELD_INTERVAL == 0 {
            tokio::task::yield_now().await;
        }
    }
    loops
}

/// Signed shoelace area of a closed polygon.
pub fn polygon_area(pts: &[(f64, f64)]) -> f64 {
    let n = pts.len();
    let mut a = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        a += pts[i].0 * pts[j].1 - pts[j].0 * pts[i].1;
    }
    a / 2.0
}

/// Area-weighted polygon centroid; falls back to the first vertex when the
/// polygon is degenerate.
pub fn polygon_centroid(pts: &[(f64, f64)]) -> (f64, f64) {
    let n = pts.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut a = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = pts[i].0 * pts[j].1 - pts[j].0 * pts[i].1;
        cx += (pts[i].0 + pts[j].0) * cross;
        cy += (pts[i].1 + pts[j].1) * cross;
        a += cross;
    }
    a /= 2.0;
    if a.abs() < 1e-9 {
        return pts[0];
    }
    (cx / (6.0 * a), cy / (6.0 * a))
}

/// Uniform-stride downsample to at most `limit` points.
pub fn downsample_loop(pts: &[(f64, f64)], limit: usize) -> Vec<(f64, f64)> {
    if pts.len() <= limit {
        return pts.to_vec();
    }
    let step = pts.len().div_ceil(limit);
    pts.iter().copied().step_by(step).collect()
}

/// Chaikin corner cutting on a closed polygon: each edge is replaced by its
/// 25% and 75% interpolants. Point count doubles per iteration.
pub fn chaikin(pts: &[(f64, f64)], iterations: u32) -> Vec<(f64, f64)> {
    let mut out = pts.to_vec();
    for _ in 0..iterations {
        let mut next = Vec::with_capacity(out.len() * 2);
        for i in 0..out.len() {
            let p0 = out[i];
            let p1 = out[(i + 1) % out.len()];
            next.push((0.75 * p0.0 + 0.25 * p1.0, 0.75 * p0.1 + 0.25 * p1.1));
            next.push((0.25 * p0.0 + 0.75 * p1.0, 0.25 * p0.1 + 0.75 * p1.1));
        }
        out = next;
    }
    out
}

/// Full extraction for every region: loops above the minimum area
/// (2 cell areas), largest first, downsampled and Chaikin-smoothed.
/// Regions yielding no valid loop get an empty polygon list.
pub async fn trace_regions(
    assign: &Grid<i32>,
    seed_count: usize,
    cfg: &BoundaryConfig,
) -> Vec<Vec<Vec<(f64, f64)>>> {
    let min_area = cfg.cell_w * cfg.cell_h * 2.0;
    let iters = cfg.chaikin_iters.clamp(1, 3);
    let segments = extract_segments(assign, seed_count, cfg);

    let mut out: Vec<Vec<Vec<(f64, f64)>>> = Vec::with_capacity(seed_count);
    for segs in &segments {
        let loops = build_loops(segs).await;
        let mut polys: Vec<(Vec<(f64, f64)>, f64)> = loops
            .into_iter()
            .map(|ring| {
                let pts: Vec<(f64, f64)> =
                    ring.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
                let area = polygon_area(&pts).abs();
                (pts, area)
            })
            .filter(|(_, area)| *area > min_area)
            .collect();
        polys.sort_by(|a, b| b.1.total_cmp(&a.1));
        out.push(
            polys
                .into_iter()
                .map(|(pts, _)| chaikin(&downsample_loop(&pts, MAX_LOOP_POINTS), iters))
                .collect(),
        );
    }
    out
}
