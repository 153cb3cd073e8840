use serde::{Deserialize, Serialize};

/// A longitude/latitude point in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Working extent in degrees, equirectangular throughout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

impl BBox {
    /// Default focus area of the generator.
    pub const NORTH_AMERICA: BBox = BBox {
        west: -170.0,
        east: -50.0,
        north: 72.0,
        south: 14.0,
    };

    pub fn clamp(&self, p: LonLat) -> LonLat {
        LonLat {
            lon: p.lon.clamp(self.west, self.east),
            lat: p.lat.clamp(self.south, self.north),
        }
    }

    pub fn contains(&self, p: LonLat) -> bool {
        p.lon >= self.west && p.lon <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    /// Project lon/lat to raster coordinates for a w x h surface.
    pub fn lon_lat_to_xy(&self, p: LonLat, w: usize, h: usize) -> (f64, f64) {
        let x = (p.lon - self.west) / (self.east - self.west) * w as f64;
        let y = (self.north - p.lat) / (self.north - self.south) * h as f64;
        (x, y)
    }

    /// Inverse of `lon_lat_to_xy`.
    pub fn xy_to_lon_lat(&self, x: f64, y: f64, w: usize, h: usize) -> LonLat {
        LonLat {
            lon: self.west + (x / w as f64) * (self.east - self.west),
            lat: self.north - (y / h as f64) * (self.north - self.south),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_round_trip() {
        let bbox = BBox::NORTH_AMERICA;
        let (w, h) = (1920, 1080);
        for &(lon, lat) in &[(-170.0, 72.0), (-50.0, 14.0), (-100.0, 40.0), (-149.5, 64.2)] {
            let p = LonLat::new(lon, lat);
            let (x, y) = bbox.lon_lat_to_xy(p, w, h);
            let back = bbox.xy_to_lon_lat(x, y, w, h);
            assert!((back.lon - lon).abs() < 1e-9);
            assert!((back.lat - lat).abs() < 1e-9);
        }
    }

    #[test]
    fn corners_map_to_surface_corners() {
        let bbox = BBox::NORTH_AMERICA;
        let (x, y) = bbox.lon_lat_to_xy(LonLat::new(-170.0, 72.0), 100, 50);
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = bbox.lon_lat_to_xy(LonLat::new(-50.0, 14.0), 100, 50);
        assert_eq!((x, y), (100.0, 50.0));
    }

    #[test]
    fn clamp_bounds_points() {
        let bbox = BBox::NORTH_AMERICA;
        let p = bbox.clamp(LonLat::new(-200.0, 80.0));
        assert_eq!(p, LonLat::new(-170.0, 72.0));
    }
}
