use rayon::prelude::*;

use crate::geo::BBox;
use crate::grid::Grid;
use crate::rng::{splitmix64, Rng};
use crate::terrain::{lerp_color, TerrainRaster};
use crate::PassOutput;

const SALT_PALETTE: u64 = 0x7265_6700_CAFE_0005;

/// Translucent fill strength of the region overlay.
const FILL_ALPHA: f32 = 0.35;
const OUTLINE: [u8; 4] = [30, 30, 40, 255];

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 4] {
    let h = h.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
        255,
    ]
}

/// Evenly hue-spaced palette with a small seeded jitter so adjacent indices
/// stay distinguishable run to run.
pub fn region_palette(n: usize, seed: u64) -> Vec<[u8; 4]> {
    let mut rng = Rng::new(splitmix64(seed ^ SALT_PALETTE));
    (0..n)
        .map(|i| {
            let hue = i as f32 * 360.0 / n.max(1) as f32 + rng.range_f64(-15.0, 15.0) as f32;
            hsl_to_rgb(hue, 0.9, 0.55)
        })
        .collect()
}

fn stroke_line(rgba: &mut [u8], w: usize, h: usize, x0: i64, y0: i64, x1: i64, y1: i64) {
    let (mut x, mut y) = (x0, y0);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h {
            let i = (y as usize * w + x as usize) * 4;
            rgba[i..i + 4].copy_from_slice(&OUTLINE);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Composite the political overlay onto the terrain render: translucent
/// per-region fill expanded from the assignment grid, then polygon outlines.
pub fn render_regions(
    terrain: &TerrainRaster,
    pass: &PassOutput,
    region_total: usize,
    bbox: &BBox,
    seed: u64,
) -> Vec<u8> {
    let w = terrain.w;
    let h = terrain.h;
    let palette = region_palette(region_total, seed);
    let mut rgba = terrain.rgba.clone();

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        let gy = (y * pass.grid_h / h).min(pass.grid_h - 1);
        for x in 0..w {
            let gx = (x * pass.grid_w / w).min(pass.grid_w - 1);
            let id = pass.assignments.get(gx, gy);
            if id < 0 {
                continue;
            }
            let fill = palette[id as usize % palette.len()];
            let mut base = [0u8; 4];
            base.copy_from_slice(&row[x * 4..x * 4 + 4]);
            let out = lerp_color(base, fill, FILL_ALPHA);
            row[x * 4..x * 4 + 4].copy_from_slice(&out);
        }
    });

    for region in &pass.regions {
        for ring in &region.polygons {
            for i in 0..ring.len() {
                let a = bbox.lon_lat_to_xy(ring[i], w, h);
                let b = bbox.lon_lat_to_xy(ring[(i + 1) % ring.len()], w, h);
                stroke_line(
                    &mut rgba,
                    w,
                    h,
                    a.0.round() as i64,
                    a.1.round() as i64,
                    b.0.round() as i64,
                    b.1.round() as i64,
                );
            }
        }
    }

    rgba
}

/// Diagnostic: flat color per assignment id, water dark.
pub fn render_assignments(assign: &Grid<i32>) -> Vec<u8> {
    let w = assign.w;
    let h = assign.h;
    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let id = assign.data[i];
        let color = if id < 0 {
            [16, 24, 38, 255]
        } else {
            let v = crate::rng::splitmix32(id as u32 * 7 + 123);
            [
                (v & 0xFF) as u8 | 60,
                ((v >> 8) & 0xFF) as u8 | 60,
                ((v >> 16) & 0xFF) as u8 | 60,
                255,
            ]
        };
        rgba[i * 4..i * 4 + 4].copy_from_slice(&color);
    }
    rgba
}
