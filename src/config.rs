use crate::geo::{BBox, LonLat};
use crate::noise::NoiseParams;

/// Canonical ocean fill color of the terrain render. Cells of the
/// downsampled raster within `OCEAN_DIST` of this color are water.
pub const OCEAN_COLOR: [u8; 3] = [113, 166, 213];

/// Euclidean RGB distance below which a cell counts as ocean. Hand-tuned
/// against the terrain palette; override via `Params` if the palette changes.
pub const OCEAN_DIST: f32 = 45.0;

/// A point of interest that biases region seed placement.
#[derive(Clone, Copy, Debug)]
pub struct WeightedPoint {
    pub lon: f64,
    pub lat: f64,
    pub weight: f64,
}

impl WeightedPoint {
    pub const fn new(lon: f64, lat: f64, weight: f64) -> Self {
        Self { lon, lat, weight }
    }
}

/// Corrective rule for one over-weighted, sparsely-populated corner of the
/// map (the Alaska panhandle in the default table): at most `max_seeds`
/// seeds may land west of `west_of` and north of `north_of`; the excess is
/// relocated `shift_south` degrees southward. A hand-tuned bias, kept as
/// configuration rather than derived.
#[derive(Clone, Copy, Debug)]
pub struct SparseZone {
    pub west_of: f64,
    pub north_of: f64,
    pub max_seeds: usize,
    pub shift_south: f64,
}

impl Default for SparseZone {
    fn default() -> Self {
        Self {
            west_of: -140.0,
            north_of: 55.0,
            max_seeds: 2,
            shift_south: 12.0,
        }
    }
}

/// Default seed bias table: North American population/resource centers.
pub fn default_weight_points() -> Vec<WeightedPoint> {
    vec![
        WeightedPoint::new(-74.0060, 40.7128, 3.0), // New York
        WeightedPoint::new(-118.2437, 34.0522, 3.0), // Los Angeles
        WeightedPoint::new(-87.6298, 41.8781, 2.0), // Chicago
        WeightedPoint::new(-99.1332, 19.4326, 2.0), // Mexico City
        WeightedPoint::new(-79.3832, 43.6532, 1.5), // Toronto
        WeightedPoint::new(-123.1207, 49.2827, 1.2), // Vancouver
        WeightedPoint::new(-122.3321, 47.6062, 1.3), // Seattle
        WeightedPoint::new(-95.3698, 29.7604, 1.8), // Houston
        WeightedPoint::new(-112.0740, 33.4484, 1.1), // Phoenix
        WeightedPoint::new(-80.1918, 25.7617, 1.0), // Miami
        WeightedPoint::new(-104.9903, 39.7392, 1.0), // Denver
        WeightedPoint::new(-106.3468, 56.1304, 0.6), // northern central Canada
        WeightedPoint::new(-149.4937, 64.2008, 0.6), // Alaska interior
        WeightedPoint::new(-89.0, 43.5, 0.9),       // Great Lakes
        WeightedPoint::new(-95.9928, 36.154, 0.7),  // Kansas region
        WeightedPoint::new(-111.0937, 45.5202, 0.6), // northern Rockies
        WeightedPoint::new(-100.0, 45.0, 0.6),      // Prairies
        WeightedPoint::new(-101.0, 29.4, 0.7),      // Texas
        WeightedPoint::new(-80.0, 35.0, 0.7),       // East coast mid
        WeightedPoint::new(-75.0, 39.0, 0.7),       // Mid-Atlantic
        WeightedPoint::new(-88.0, 19.0, 0.7),       // Yucatan / Mexico gulf
    ]
}

/// All user-tunable knobs. Out-of-range values are clamped where consumed,
/// never rejected.
#[derive(Clone, Debug)]
pub struct Params {
    /// Number of region seeds per generation.
    pub region_count: usize,
    /// Majority-filter passes (0-5, further capped per grid-divisor tier).
    pub smooth_passes: u32,
    /// Base-resolution divisor for the assignment grid (bigger = coarser).
    pub grid_divisor: u32,
    /// Lloyd relaxation rounds (clamped to 1-4).
    pub relax_iterations: u32,

    // Terrain
    pub noise: NoiseParams,
    /// Elevation below this renders (and classifies) as water.
    pub coast_threshold: f32,

    // Land/water classification
    pub ocean_color: [u8; 3],
    pub ocean_dist: f32,

    // Seed biasing
    pub weight_points: Vec<WeightedPoint>,
    pub sparse_zone: SparseZone,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            region_count: 21,
            smooth_passes: 2,
            grid_divisor: 8,
            relax_iterations: 2,
            noise: NoiseParams::default(),
            coast_threshold: 0.45,
            ocean_color: OCEAN_COLOR,
            ocean_dist: OCEAN_DIST,
            weight_points: default_weight_points(),
            sparse_zone: SparseZone::default(),
        }
    }
}

/// One end-to-end generation request: extent, render size, seed, tunables,
/// and optional river polylines acting as hard region separators.
#[derive(Clone, Debug)]
pub struct GenConfig {
    pub seed: u64,
    pub width: usize,
    pub height: usize,
    pub bbox: BBox,
    pub params: Params,
    pub rivers: Option<Vec<Vec<LonLat>>>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 1920,
            height: 1080,
            bbox: BBox::NORTH_AMERICA,
            params: Params::default(),
            rivers: None,
        }
    }
}
