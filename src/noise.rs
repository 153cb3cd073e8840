use crate::rng::hash2;

#[inline]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Corner value in [0, 1) derived purely from the lattice position and seed.
#[inline]
fn lattice(ix: i32, iy: i32, seed: u32) -> f32 {
    (hash2(ix, iy, seed) >> 8) as f32 / 16777216.0
}

/// 2D value noise in [0, 1): pseudo-random values at the four surrounding
/// integer lattice corners, bilinearly interpolated with smoothstep easing.
/// Stable across calls for the same seed and coordinates, which the
/// land/water classification relies on between preview and refined passes.
#[inline]
pub fn value_noise(x: f32, y: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = x - ix as f32;
    let fy = y - iy as f32;
    let sx = smoothstep(fx);
    let sy = smoothstep(fy);

    let v00 = lattice(ix, iy, seed);
    let v10 = lattice(ix + 1, iy, seed);
    let v01 = lattice(ix, iy + 1, seed);
    let v11 = lattice(ix + 1, iy + 1, seed);

    lerp(lerp(v00, v10, sx), lerp(v01, v11, sx), sy)
}

/// Fractal noise parameters. `scale` is the base wavelength in input units;
/// larger values produce broader, more continent-like shapes.
#[derive(Clone, Copy, Debug)]
pub struct NoiseParams {
    pub scale: f32,
    pub octaves: u32,
    pub persistence: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            scale: 80.0,
            octaves: 4,
            persistence: 0.5,
        }
    }
}

/// Multi-octave value noise in [0, 1]: doubling frequency, geometrically
/// decaying amplitude, normalized by total amplitude so the range holds for
/// any octave count.
pub fn fractal_noise(x: f32, y: f32, seed: u32, params: &NoiseParams) -> f32 {
    let mut sum = 0.0;
    let mut amp = 1.0;
    let mut freq = 1.0 / params.scale.max(1e-6);
    let mut norm = 0.0;
    for _ in 0..params.octaves {
        sum += value_noise(x * freq, y * freq, seed) * amp;
        norm += amp;
        amp *= params.persistence;
        freq *= 2.0;
    }
    if norm > 0.0 { sum / norm } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_noise_deterministic_and_in_range() {
        for i in 0..200 {
            let x = i as f32 * 0.37 - 20.0;
            let y = i as f32 * 0.53 + 3.0;
            let a = value_noise(x, y, 1234);
            let b = value_noise(x, y, 1234);
            assert_eq!(a.to_bits(), b.to_bits());
            assert!((0.0..1.0).contains(&a));
        }
    }

    #[test]
    fn different_seeds_decorrelate() {
        let a = value_noise(3.7, -2.1, 1);
        let b = value_noise(3.7, -2.1, 2);
        assert_ne!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn fractal_noise_normalized() {
        let params = NoiseParams {
            scale: 40.0,
            octaves: 6,
            persistence: 0.7,
        };
        for i in 0..200 {
            let x = i as f32 * 1.3 - 100.0;
            let y = i as f32 * 0.9 + 14.0;
            let e = fractal_noise(x, y, 42, &params);
            assert!((0.0..=1.0).contains(&e), "out of range: {e}");
        }
    }

    #[test]
    fn fractal_noise_matches_on_reruns() {
        let params = NoiseParams::default();
        let a: Vec<u32> = (0..64)
            .map(|i| fractal_noise(i as f32 * 2.0, -i as f32, 9, &params).to_bits())
            .collect();
        let b: Vec<u32> = (0..64)
            .map(|i| fractal_noise(i as f32 * 2.0, -i as f32, 9, &params).to_bits())
            .collect();
        assert_eq!(a, b);
    }
}
