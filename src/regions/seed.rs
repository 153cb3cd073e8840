use crate::config::{SparseZone, WeightedPoint};
use crate::geo::{BBox, LonLat};
use crate::rng::Rng;

// Jitter applied around a drawn point of interest, in degrees.
const JITTER_LON: f64 = 3.0;
const JITTER_LAT: f64 = 2.0;

// Points this far outside the bbox still participate in the draw.
const MARGIN_LON: f64 = 20.0;
const MARGIN_LAT: f64 = 10.0;

fn pick_weighted<'a>(points: &'a [WeightedPoint], rng: &mut Rng) -> &'a WeightedPoint {
    let total: f64 = points.iter().map(|p| p.weight).sum();
    let mut t = rng.next_f64() * total;
    for p in points {
        t -= p.weight;
        if t <= 0.0 {
            return p;
        }
    }
    &points[points.len() - 1]
}

/// Draw `k` region seeds biased toward the weighted points of interest:
/// cumulative-weight selection, bounded jitter, clamped to the bbox. The
/// sparse-zone rule then relocates any excess high-latitude seeds southward.
pub fn sample_seeds(
    k: usize,
    points: &[WeightedPoint],
    bbox: &BBox,
    zone: &SparseZone,
    rng: &mut Rng,
) -> Vec<LonLat> {
    let candidates: Vec<WeightedPoint> = points
        .iter()
        .filter(|p| {
            p.lon >= bbox.west - MARGIN_LON
                && p.lon <= bbox.east + MARGIN_LON
                && p.lat >= bbox.south - MARGIN_LAT
                && p.lat <= bbox.north + MARGIN_LAT
        })
        .copied()
        .collect();

    let mut seeds = Vec::with_capacity(k);
    for _ in 0..k {
        let p = if candidates.is_empty() {
            // No usable bias points: uniform draw over the bbox.
            LonLat::new(
                rng.range_f64(bbox.west, bbox.east),
                rng.range_f64(bbox.south, bbox.north),
            )
        } else {
            let w = pick_weighted(&candidates, rng);
            LonLat::new(
                w.lon + rng.range_f64(-JITTER_LON, JITTER_LON),
                w.lat + rng.range_f64(-JITTER_LAT, JITTER_LAT),
            )
        };
        seeds.push(bbox.clamp(p));
    }

    let in_zone = |s: &LonLat| s.lon < zone.west_of && s.lat > zone.north_of;
    let zone_count = seeds.iter().filter(|s| in_zone(s)).count();
    if zone_count > zone.max_seeds {
        let mut moved = 0;
        for s in seeds.iter_mut() {
            if moved >= zone_count - zone.max_seeds {
                break;
            }
            if in_zone(s) {
                s.lat = (s.lat - zone.shift_south).max(bbox.south + 5.0);
                moved += 1;
            }
        }
    }

    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_weight_points;

    #[test]
    fn sampling_is_deterministic_and_bounded() {
        let bbox = BBox::NORTH_AMERICA;
        let points = default_weight_points();
        let zone = SparseZone::default();
        let a = sample_seeds(21, &points, &bbox, &zone, &mut Rng::new(42));
        let b = sample_seeds(21, &points, &bbox, &zone, &mut Rng::new(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 21);
        for s in &a {
            assert!(bbox.contains(*s), "seed out of bounds: {s:?}");
        }
    }

    #[test]
    fn sparse_zone_keeps_at_most_max_seeds() {
        let bbox = BBox::NORTH_AMERICA;
        // All weight on the Alaska interior so every draw lands in the zone.
        let points = vec![WeightedPoint::new(-149.5, 64.2, 1.0)];
        let zone = SparseZone::default();
        let seeds = sample_seeds(8, &points, &bbox, &zone, &mut Rng::new(7));
        let in_zone = seeds
            .iter()
            .filter(|s| s.lon < zone.west_of && s.lat > zone.north_of)
            .count();
        assert!(in_zone <= zone.max_seeds, "{in_zone} seeds left in zone");
        assert_eq!(seeds.len(), 8);
    }

    #[test]
    fn falls_back_to_uniform_without_candidates() {
        let bbox = BBox::NORTH_AMERICA;
        // Far outside the bbox margins.
        let points = vec![WeightedPoint::new(120.0, -30.0, 5.0)];
        let seeds = sample_seeds(5, &points, &bbox, &SparseZone::default(), &mut Rng::new(3));
        assert_eq!(seeds.len(), 5);
        for s in &seeds {
            assert!(bbox.contains(*s));
        }
    }
}
