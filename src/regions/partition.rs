use crate::geo::{BBox, LonLat};
use crate::grid::Grid;
use crate::rng::Rng;

/// Rows processed between cooperative yield points during assignment.
const ASSIGN_YIELD_ROWS: usize = 32;

/// Lloyd jitter amplitude in degrees, to avoid perfectly regular tiling.
const RELAX_JITTER: f64 = 0.5;

/// Everything the assignment + relaxation step needs, snapshotted so it can
/// cross a thread boundary to the worker unchanged.
#[derive(Clone)]
pub struct PartitionJob {
    pub grid_w: usize,
    pub grid_h: usize,
    /// Downsampled terrain pixels, RGBA, grid_w x grid_h.
    pub pixels: Vec<u8>,
    pub seeds: Vec<LonLat>,
    pub river_mask: Option<Grid<bool>>,
    pub iterations: u32,
    pub bbox: BBox,
    pub ocean_color: [u8; 3],
    pub ocean_dist: f32,
    /// Seed for the relaxation jitter stream.
    pub relax_seed: u64,
}

/// Result of one partitioning run: relaxed seed positions and the final
/// assignment grid (-1 = water/unassigned, else dense seed index).
#[derive(Clone, PartialEq)]
pub struct PartitionOutcome {
    pub seeds: Vec<LonLat>,
    pub assignments: Grid<i32>,
}

#[inline]
pub fn is_water(pixels: &[u8], idx: usize, ocean: [u8; 3], dist: f32) -> bool {
    let p = idx * 4;
    let dr = pixels[p] as f32 - ocean[0] as f32;
    let dg = pixels[p + 1] as f32 - ocean[1] as f32;
    let db = pixels[p + 2] as f32 - ocean[2] as f32;
    dr * dr + dg * dg + db * db < dist * dist
}

fn seeds_to_grid(seeds: &[LonLat], bbox: &BBox, gw: usize, gh: usize) -> Vec<(f64, f64)> {
    seeds
        .iter()
        .map(|s| bbox.lon_lat_to_xy(*s, gw, gh))
        .collect()
}

/// Assign one band of rows to their nearest seed. First minimal squared
/// distance wins, so ties resolve by seed order.
fn assign_rows(
    assign: &mut Grid<i32>,
    rows: std::ops::Range<usize>,
    job: &PartitionJob,
    seed_grid: &[(f64, f64)],
) {
    let gw = job.grid_w;
    for gy in rows {
        for gx in 0..gw {
            let idx = gy * gw + gx;
            if is_water(&job.pixels, idx, job.ocean_color, job.ocean_dist) {
                continue;
            }
            if let Some(mask) = &job.river_mask {
                if mask.data[idx] {
                    continue;
                }
            }
            let mut best = -1i32;
            let mut best_d = f64::INFINITY;
            for (si, (sx, sy)) in seed_grid.iter().enumerate() {
                let dx = sx - gx as f64;
                let dy = sy - gy as f64;
                let d = dx * dx + dy * dy;
                if d < best_d {
                    best_d = d;
                    best = si as i32;
                }
            }
            assign.data[idx] = best;
        }
    }
}

fn assign_cells_inner(job: &PartitionJob, seed_grid: &[(f64, f64)]) -> Grid<i32> {
    let mut assign = Grid::filled(job.grid_w, job.grid_h, -1i32);
    assign_rows(&mut assign, 0..job.grid_h, job, seed_grid);
    assign
}

/// Cooperative assignment: identical output to the blocking kernel, but
/// yields to the runtime between row bands so the host stays responsive.
pub async fn assign_cells(job: &PartitionJob, seeds: &[LonLat]) -> Grid<i32> {
    let seed_grid = seeds_to_grid(seeds, &job.bbox, job.grid_w, job.grid_h);
    let mut assign = Grid::filled(job.grid_w, job.grid_h, -1i32);
    let mut y = 0;
    while y < job.grid_h {
        let end = (y + ASSIGN_YIELD_ROWS).min(job.grid_h);
        assign_rows(&mut assign, y..end, job, &seed_grid);
        y = end;
        tokio::task::yield_now().await;
    }
    assign
}

/// One Lloyd step: move each seed to the centroid of its assigned cells
/// plus bounded jitter, clamped to the bbox. Seeds with no cells stay put.
fn relax_step(
    assign: &Grid<i32>,
    seeds: &[LonLat],
    bbox: &BBox,
    rng: &mut Rng,
) -> Vec<LonLat> {
    let (gw, gh) = (assign.w, assign.h);
    let mut sums = vec![(0f64, 0f64, 0usize); seeds.len()];
    for gy in 0..gh {
        for gx in 0..gw {
            let id = assign.get(gx, gy);
            if id < 0 {
                continue;
            }
            let s = &mut sums[id as usize];
            s.0 += gx as f64;
            s.1 += gy as f64;
            s.2 += 1;
        }
    }
    seeds
        .iter()
        .enumerate()
        .map(|(i, old)| {
            let (sx, sy, n) = sums[i];
            if n == 0 {
                return *old;
            }
            let c = bbox.xy_to_lon_lat(sx / n as f64, sy / n as f64, gw, gh);
            bbox.clamp(LonLat::new(
                c.lon + rng.range_f64(-RELAX_JITTER, RELAX_JITTER),
                c.lat + rng.range_f64(-RELAX_JITTER, RELAX_JITTER),
            ))
        })
        .collect()
}

/// Voronoi assignment with Lloyd relaxation, cooperative flavor.
pub async fn lloyd_relax(job: &PartitionJob) -> PartitionOutcome {
    let iters = job.iterations.clamp(1, 4);
    let mut rng = Rng::new(job.relax_seed);
    let mut seeds = job.seeds.clone();
    for _ in 0..iters {
        let assign = assign_cells(job, &seeds).await;
        seeds = relax_step(&assign, &seeds, &job.bbox, &mut rng);
        tokio::task::yield_now().await;
    }
    let assignments = assign_cells(job, &seeds).await;
    PartitionOutcome { seeds, assignments }
}

/// Blocking equivalent of `lloyd_relax`, used on the worker thread. Shares
/// the same kernels and jitter stream, so output is bit-identical.
pub fn lloyd_relax_blocking(job: &PartitionJob) -> PartitionOutcome {
    let iters = job.iterations.clamp(1, 4);
    let mut rng = Rng::new(job.relax_seed);
    let mut seeds = job.seeds.clone();
    for _ in 0..iters {
        let seed_grid = seeds_to_grid(&seeds, &job.bbox, job.grid_w, job.grid_h);
        let assign = assign_cells_inner(job, &seed_grid);
        seeds = relax_step(&assign, &seeds, &job.bbox, &mut rng);
    }
    let seed_grid = seeds_to_grid(&seeds, &job.bbox, job.grid_w, job.grid_h);
    let assignments = assign_cells_inner(job, &seed_grid);
    PartitionOutcome { seeds, assignments }
}

/// Rasterize river polylines into a hard separator mask on the grid. The
/// line is dilated by one cell, giving a two-cell stroke that regions
/// cannot leak through diagonally.
pub fn rasterize_rivers(
    rivers: &[Vec<LonLat>],
    gw: usize,
    gh: usize,
    bbox: &BBox,
) -> Grid<bool> {
    let mut mask = Grid::<bool>::new(gw, gh);
    for line in rivers {
        for pair in line.windows(2) {
            let (x0, y0) = bbox.lon_lat_to_xy(pair[0], gw, gh);
            let (x1, y1) = bbox.lon_lat_to_xy(pair[1], gw, gh);
            draw_mask_line(
                &mut mask,
                x0.round() as i64,
                y0.round() as i64,
                x1.round() as i64,
                y1.round() as i64,
            );
        }
    }
    let mut out = mask.clone();
    for gy in 0..gh {
        for gx in 0..gw {
            if mask.get(gx, gy) {
                for (nx, ny) in crate::grid::neighbors4(gx, gy, gw, gh) {
                    out.set(nx, ny, true);
                }
            }
        }
    }
    out
}

fn draw_mask_line(mask: &mut Grid<bool>, mut x0: i64, mut y0: i64, x1: i64, y1: i64) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if x0 >= 0 && x0 < mask.w as i64 && y0 >= 0 && y0 < mask.h as i64 {
            mask.set(x0 as usize, y0 as usize, true);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
