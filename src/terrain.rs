use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::config::Params;
use crate::geo::BBox;
use crate::noise::{NoiseParams, fractal_noise};
use crate::rng::seed_u32;

const SALT_TERRAIN: u64 = 0x7265_6700_CAFE_0001;

// Classic palette. Water stays inside the ocean color band so the
// partitioner's color-distance test classifies it reliably.
const WATER_DEEP: [u8; 4] = [96, 148, 198, 255];
const WATER_SHALLOW: [u8; 4] = [122, 178, 224, 255];
const BEACH_LIGHT: [u8; 4] = [240, 217, 181, 255];
const BEACH_SAND: [u8; 4] = [209, 181, 123, 255];
const GRASS_LOW: [u8; 4] = [75, 191, 91, 255];
const GRASS_HIGH: [u8; 4] = [47, 139, 58, 255];
const ROCK_LOW: [u8; 4] = [139, 122, 107, 255];
const ROCK_HIGH: [u8; 4] = [128, 115, 109, 255];
const SNOW_LOW: [u8; 4] = [234, 234, 234, 255];
const SNOW_HIGH: [u8; 4] = [255, 255, 255, 255];

#[inline]
pub fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

fn shade(e: f32, coast: f32) -> [u8; 4] {
    if e < coast {
        lerp_color(WATER_DEEP, WATER_SHALLOW, e / coast.max(1e-6))
    } else if e < coast + 0.1 {
        lerp_color(BEACH_LIGHT, BEACH_SAND, (e - coast) / 0.1)
    } else if e < 0.75 {
        lerp_color(GRASS_LOW, GRASS_HIGH, (e - coast - 0.1) / (0.75 - coast - 0.1).max(1e-6))
    } else if e < 0.9 {
        lerp_color(ROCK_LOW, ROCK_HIGH, (e - 0.75) / 0.15)
    } else {
        lerp_color(SNOW_LOW, SNOW_HIGH, ((e - 0.9) / 0.1).min(1.0))
    }
}

/// Rendered base terrain: the pixel buffer the partitioner classifies
/// against, plus the raw elevation field for diagnostics.
pub struct TerrainRaster {
    pub w: usize,
    pub h: usize,
    pub rgba: Vec<u8>,
    pub elevation: Vec<f32>,
}

/// Render the base terrain for a bbox at w x h. Elevation is fractal value
/// noise sampled in lon/lat, so preview and refined passes at different
/// resolutions agree on where the coastline falls.
pub fn render_terrain(
    seed: u64,
    w: usize,
    h: usize,
    bbox: &BBox,
    noise: &NoiseParams,
    coast_threshold: f32,
) -> TerrainRaster {
    let noise_seed = seed_u32(seed, SALT_TERRAIN);
    let mut rgba = vec![0u8; w * h * 4];
    let mut elevation = vec![0f32; w * h];

    rgba.par_chunks_mut(w * 4)
        .zip(elevation.par_chunks_mut(w))
        .enumerate()
        .for_each(|(y, (row, elev_row))| {
            for x in 0..w {
                let p = bbox.xy_to_lon_lat(x as f64 + 0.5, y as f64 + 0.5, w, h);
                let e = fractal_noise(p.lon as f32, p.lat as f32, noise_seed, noise);
                elev_row[x] = e;
                let color = shade(e, coast_threshold);
                row[x * 4..x * 4 + 4].copy_from_slice(&color);
            }
        });

    TerrainRaster {
        w,
        h,
        rgba,
        elevation,
    }
}

/// Nearest-pixel downsample of the terrain render to the assignment grid.
/// Returns a gw x gh RGBA buffer.
pub fn downsample(terrain: &TerrainRaster, gw: usize, gh: usize) -> Vec<u8> {
    let mut out = vec![0u8; gw * gh * 4];
    for gy in 0..gh {
        let sy = (((gy as f64 + 0.5) / gh as f64) * terrain.h as f64) as usize;
        let sy = sy.min(terrain.h - 1);
        for gx in 0..gw {
            let sx = (((gx as f64 + 0.5) / gw as f64) * terrain.w as f64) as usize;
            let sx = sx.min(terrain.w - 1);
            let src = (sy * terrain.w + sx) * 4;
            let dst = (gy * gw + gx) * 4;
            out[dst..dst + 4].copy_from_slice(&terrain.rgba[src..src + 4]);
        }
    }
    out
}

/// Cache key: full render identity, including every tunable that shapes the
/// raster. Float fields are compared bit-exactly.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TerrainKey {
    pub seed: u64,
    pub w: usize,
    pub h: usize,
    pub bbox_bits: [u64; 4],
    /// scale, octaves, persistence.
    pub noise_bits: [u32; 3],
    pub coast_bits: u32,
}

impl TerrainKey {
    pub fn new(
        seed: u64,
        w: usize,
        h: usize,
        bbox: &BBox,
        noise: &NoiseParams,
        coast_threshold: f32,
    ) -> Self {
        Self {
            seed,
            w,
            h,
            bbox_bits: [
                bbox.west.to_bits(),
                bbox.east.to_bits(),
                bbox.north.to_bits(),
                bbox.south.to_bits(),
            ],
            noise_bits: [
                noise.scale.to_bits(),
                noise.octaves,
                noise.persistence.to_bits(),
            ],
            coast_bits: coast_threshold.to_bits(),
        }
    }
}

/// Injected render cache: key -> finished raster, no eviction. A repeated
/// generation with the same seed/extent/resolution reuses the base render;
/// anything else renders fresh under a new key.
#[derive(Default)]
pub struct TerrainCache {
    inner: Mutex<HashMap<TerrainKey, Arc<TerrainRaster>>>,
}

impl TerrainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_render(
        &self,
        seed: u64,
        w: usize,
        h: usize,
        bbox: &BBox,
        params: &Params,
    ) -> Arc<TerrainRaster> {
        let key = TerrainKey::new(seed, w, h, bbox, &params.noise, params.coast_threshold);
        if let Some(hit) = self.inner.lock().unwrap().get(&key) {
            return hit.clone();
        }
        let raster = Arc::new(render_terrain(
            seed,
            w,
            h,
            bbox,
            &params.noise,
            params.coast_threshold,
        ));
        self.inner
            .lock()
            .unwrap()
            .entry(key)
            .or_insert_with(|| raster.clone())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OCEAN_COLOR, OCEAN_DIST};

    fn dist_to_ocean(c: [u8; 4]) -> f32 {
        let dr = c[0] as f32 - OCEAN_COLOR[0] as f32;
        let dg = c[1] as f32 - OCEAN_COLOR[1] as f32;
        let db = c[2] as f32 - OCEAN_COLOR[2] as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    #[test]
    fn water_shades_stay_in_ocean_band() {
        for i in 0..=100 {
            let e = i as f32 / 100.0 * 0.449;
            assert!(dist_to_ocean(shade(e, 0.45)) < OCEAN_DIST, "e={e}");
        }
    }

    #[test]
    fn land_shades_leave_ocean_band() {
        for i in 0..=100 {
            let e = 0.45 + i as f32 / 100.0 * 0.55;
            assert!(dist_to_ocean(shade(e, 0.45)) >= OCEAN_DIST, "e={e}");
        }
    }

    #[test]
    fn render_is_deterministic() {
        let bbox = BBox::NORTH_AMERICA;
        let n = NoiseParams::default();
        let a = render_terrain(42, 64, 32, &bbox, &n, 0.45);
        let b = render_terrain(42, 64, 32, &bbox, &n, 0.45);
        assert_eq!(a.rgba, b.rgba);
    }

    #[test]
    fn cache_returns_same_raster_for_same_key() {
        let cache = TerrainCache::new();
        let params = Params::default();
        let a = cache.get_or_render(7, 32, 16, &BBox::NORTH_AMERICA, &params);
        let b = cache.get_or_render(7, 32, 16, &BBox::NORTH_AMERICA, &params);
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.get_or_render(8, 32, 16, &BBox::NORTH_AMERICA, &params);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn cache_rerenders_when_tunables_change() {
        let cache = TerrainCache::new();
        let mut params = Params::default();
        let a = cache.get_or_render(7, 32, 16, &BBox::NORTH_AMERICA, &params);

        // Same seed/size/bbox, different coastline: must not reuse the
        // raster classified against the previous threshold.
        params.coast_threshold = 0.1;
        let b = cache.get_or_render(7, 32, 16, &BBox::NORTH_AMERICA, &params);
        assert!(!Arc::ptr_eq(&a, &b));

        params.noise.scale = 40.0;
        let c = cache.get_or_render(7, 32, 16, &BBox::NORTH_AMERICA, &params);
        assert!(!Arc::ptr_eq(&b, &c));

        // Unchanged tunables still hit.
        let d = cache.get_or_render(7, 32, 16, &BBox::NORTH_AMERICA, &params);
        assert!(Arc::ptr_eq(&c, &d));
    }

    #[test]
    fn downsample_preserves_extents() {
        let bbox = BBox::NORTH_AMERICA;
        let t = render_terrain(1, 80, 40, &bbox, &NoiseParams::default(), 0.45);
        let small = downsample(&t, 20, 10);
        assert_eq!(small.len(), 20 * 10 * 4);
    }
}
