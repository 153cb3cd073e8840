use crate::grid::{Grid, neighbors8};
use crate::regions::partition::is_water;

/// Rows processed between cooperative yield points during filtering.
const FILTER_YIELD_ROWS: usize = 16;

/// Cap smoothing passes by grid resolution tier so coarse previews stay
/// cheap: divisor >= 16 allows 1 pass, >= 8 allows 2, finer grids 3.
pub fn clamp_passes(smooth_passes: u32, grid_divisor: u32) -> u32 {
    let smooth = smooth_passes.min(5);
    if grid_divisor >= 16 {
        smooth.min(1)
    } else if grid_divisor >= 8 {
        smooth.min(2)
    } else {
        smooth.min(3)
    }
}

fn majority_rows(
    next: &mut Grid<i32>,
    rows: std::ops::Range<usize>,
    assign: &Grid<i32>,
    pixels: &[u8],
    ocean: [u8; 3],
    ocean_dist: f32,
) {
    let (gw, gh) = (assign.w, assign.h);
    for gy in rows {
        for gx in 0..gw {
            let idx = gy * gw + gx;
            let current = assign.data[idx];
            if current == -1 || is_water(pixels, idx, ocean, ocean_dist) {
                next.data[idx] = -1;
                continue;
            }
            // Count assigned ids over the 8-neighborhood; at most 8 distinct.
            let mut ids = [0i32; 8];
            let mut counts = [0u32; 8];
            let mut n = 0;
            for (nx, ny) in neighbors8(gx, gy, gw, gh) {
                let nid = assign.data[ny * gw + nx];
                if nid == -1 {
                    continue;
                }
                match ids[..n].iter().position(|&v| v == nid) {
                    Some(i) => counts[i] += 1,
                    None => {
                        ids[n] = nid;
                        counts[n] = 1;
                        n += 1;
                    }
                }
            }
            // Ties keep the cell's current value: replace only on a strictly
            // greater neighbor count than the incumbent's.
            let mut best = current;
            let mut best_count = ids[..n]
                .iter()
                .position(|&v| v == current)
                .map(|i| counts[i])
                .unwrap_or(0);
            for i in 0..n {
                if counts[i] > best_count {
                    best_count = counts[i];
                    best = ids[i];
                }
            }
            next.data[idx] = best;
        }
    }
}

/// Majority-filter smoothing over the assignment grid. Water cells and
/// unassigned cells are never touched. Yields between row bands.
pub async fn majority_filter(
    assign: &mut Grid<i32>,
    pixels: &[u8],
    passes: u32,
    ocean: [u8; 3],
    ocean_dist: f32,
) {
    for _ in 0..passes {
        let mut next = Grid::filled(assign.w, assign.h, -1i32);
        let mut y = 0;
        while y < assign.h {
            let end = (y + FILTER_YIELD_ROWS).min(assign.h);
            majority_rows(&mut next, y..end, assign, pixels, ocean, ocean_dist);
            y = end;
            tokio::task::yield_now().await;
        }
        *assign = next;
    }
}

/// Merge threshold: a region must own at least this many cells to survive.
pub fn min_region_size(grid_w: usize, grid_h: usize, seed_count: usize) -> usize {
    let avg = grid_w * grid_h / seed_count.max(1);
    10.max((avg as f64 * 0.08).round() as usize)
}

/// Single-pass merge of undersized regions into the neighbor sharing the
/// most boundary adjacency (first encountered wins ties). A just-merged
/// region is not re-evaluated within the same call; a region with no region
/// neighbor (fully water-bound) survives as-is.
pub fn merge_small(assign: &mut Grid<i32>, seed_count: usize) {
    let (gw, gh) = (assign.w, assign.h);
    let mut sizes = vec![0usize; seed_count];
    for &v in &assign.data {
        if v >= 0 {
            sizes[v as usize] += 1;
        }
    }

    // Adjacency edge counts per region, insertion-ordered for the tie rule.
    let mut adj: Vec<Vec<(i32, u32)>> = vec![Vec::new(); seed_count];
    for gy in 0..gh {
        for gx in 0..gw {
            let id = assign.get(gx, gy);
            if id < 0 {
                continue;
            }
            let dirs: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
            for (dx, dy) in dirs {
                let nx = gx as i32 + dx;
                let ny = gy as i32 + dy;
                if nx < 0 || nx >= gw as i32 || ny < 0 || ny >= gh as i32 {
                    continue;
                }
                let nid = assign.data[ny as usize * gw + nx as usize];
                if nid < 0 || nid == id {
                    continue;
                }
                let entry = &mut adj[id as usize];
                match entry.iter_mut().find(|(other, _)| *other == nid) {
                    Some((_, c)) => *c += 1,
                    None => entry.push((nid, 1)),
                }
            }
        }
    }

    let min_size = min_region_size(gw, gh, seed_count);
    for cid in 0..seed_count {
        if sizes[cid] == 0 || sizes[cid] >= min_size {
            continue;
        }
        let mut best: Option<i32> = None;
        let mut best_c = 0u32;
        for &(nid, c) in &adj[cid] {
            if c > best_c {
                best_c = c;
                best = Some(nid);
            }
        }
        if let Some(target) = best {
            for v in assign.data.iter_mut() {
                if *v == cid as i32 {
                    *v = target;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAND: [u8; 4] = [180, 180, 180, 255];
    const OCEAN: [u8; 3] = crate::config::OCEAN_COLOR;
    const DIST: f32 = crate::config::OCEAN_DIST;

    fn land_pixels(gw: usize, gh: usize) -> Vec<u8> {
        let mut px = vec![0u8; gw * gh * 4];
        for i in 0..gw * gh {
            px[i * 4..i * 4 + 4].copy_from_slice(&LAND);
        }
        px
    }

    #[tokio::test]
    async fn majority_filter_removes_speckle() {
        let (gw, gh) = (16, 16);
        let mut assign = Grid::filled(gw, gh, 0i32);
        assign.set(8, 8, 1); // lone speckle cell
        let pixels = land_pixels(gw, gh);
        majority_filter(&mut assign, &pixels, 1, OCEAN, DIST).await;
        assert_eq!(assign.get(8, 8), 0);
    }

    #[tokio::test]
    async fn majority_filter_keeps_water_untouched() {
        let (gw, gh) = (8, 8);
        let mut assign = Grid::filled(gw, gh, 0i32);
        let mut pixels = land_pixels(gw, gh);
        // One ocean cell in the middle.
        let idx = 4 * gw + 4;
        pixels[idx * 4..idx * 4 + 3].copy_from_slice(&OCEAN);
        assign.data[idx] = -1;
        majority_filter(&mut assign, &pixels, 3, OCEAN, DIST).await;
        assert_eq!(assign.data[idx], -1);
    }

    #[tokio::test]
    async fn neighbor_tie_keeps_current_assignment() {
        // Center cell sees four corner neighbors of id 1 and four edge
        // neighbors of id 0; a 4-4 tie must not flip it.
        let mut assign = Grid::filled(3, 3, 0i32);
        assign.set(0, 0, 1);
        assign.set(2, 0, 1);
        assign.set(0, 2, 1);
        assign.set(2, 2, 1);
        let pixels = land_pixels(3, 3);
        majority_filter(&mut assign, &pixels, 1, OCEAN, DIST).await;
        assert_eq!(assign.get(1, 1), 0);
    }

    #[test]
    fn pass_caps_follow_divisor_tier() {
        assert_eq!(clamp_passes(5, 16), 1);
        assert_eq!(clamp_passes(5, 8), 2);
        assert_eq!(clamp_passes(5, 4), 3);
        assert_eq!(clamp_passes(0, 4), 0);
    }

    #[test]
    fn small_region_merges_into_dominant_neighbor() {
        let (gw, gh) = (20, 20);
        // Region 0 owns the grid except a 2x2 patch of region 1.
        let mut assign = Grid::filled(gw, gh, 0i32);
        for y in 9..11 {
            for x in 9..11 {
                assign.set(x, y, 1);
            }
        }
        let min = min_region_size(gw, gh, 2); // avg 200 -> 16
        assert!(4 < min);
        merge_small(&mut assign, 2);
        assert!(assign.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn surviving_regions_meet_threshold() {
        let (gw, gh) = (20, 10);
        let mut assign = Grid::filled(gw, gh, -1i32);
        // Region 0: left half; region 1: right half; region 2: tiny strip
        // adjacent to region 1.
        for y in 0..gh {
            for x in 0..10 {
                assign.set(x, y, 0);
            }
            for x in 10..20 {
                assign.set(x, y, 1);
            }
        }
        for y in 0..3 {
            assign.set(19, y, 2);
        }
        merge_small(&mut assign, 3);
        let mut sizes = [0usize; 3];
        for &v in &assign.data {
            if v >= 0 {
                sizes[v as usize] += 1;
            }
        }
        let min = min_region_size(gw, gh, 3);
        for (id, &s) in sizes.iter().enumerate() {
            assert!(s == 0 || s >= min, "region {id} survived at size {s}");
        }
        assert_eq!(sizes[2], 0);
    }
}
