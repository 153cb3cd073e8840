use crate::geo::LonLat;
use crate::rng::Rng;

// Themed word pools keyed by rough geography of the default extent.
const NORTH: &[&str] = &["Glacial", "Frost", "Boreal", "Arctic", "Fjord", "Tundra"];
const PACIFIC: &[&str] = &["Cascadia", "Rainshore", "Pacifica", "Fogreach"];
const PRAIRIE: &[&str] = &["Prairie", "Wheat", "Golden", "Plains", "Windstep"];
const MOUNTAIN: &[&str] = &["Rock", "Ridge", "Crown", "Highland", "Spine"];
const GULF: &[&str] = &["Gulf", "Bay", "Marsh", "Delta"];
const EAST: &[&str] = &["Hearth", "Harbor", "Granite", "Iron"];
const SOUTHERN: &[&str] = &["Sierra", "Sol", "Cenote", "Basin"];
const FALLBACK: &[&str] = &["Frontier", "Belt", "Shore", "Wastes"];
const SUFFIX: &[&str] = &["Dominion", "Marches", "Expanse", "Heights", "Terrace", "Province"];

fn pick<'a>(pool: &'a [&'a str], rng: &mut Rng) -> &'a str {
    pool[rng.range_usize(pool.len())]
}

/// Derive an evocative region name from its centroid. Non-exclusive
/// latitude/longitude predicates each contribute a themed word; a suffix
/// noun is always appended. Names are deterministic for a given rng state
/// but not guaranteed unique across regions.
pub fn region_name(c: LonLat, rng: &mut Rng) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if c.lat > 60.0 {
        parts.push(pick(NORTH, rng));
    }
    if c.lon < -140.0 || (c.lon < -130.0 && c.lat > 50.0) {
        parts.push(pick(PACIFIC, rng));
    }
    if c.lon > -125.0 && c.lon < -95.0 && c.lat > 30.0 && c.lat < 55.0 {
        parts.push(pick(PRAIRIE, rng));
    }
    if c.lon > -120.0 && c.lon < -100.0 && c.lat > 35.0 && c.lat < 65.0 {
        parts.push(pick(MOUNTAIN, rng));
    }
    if c.lat < 30.0 {
        parts.push(pick(GULF, rng));
    }
    if c.lon > -90.0 && c.lon < -65.0 {
        parts.push(pick(EAST, rng));
    }
    if c.lat < 25.0 {
        parts.push(pick(SOUTHERN, rng));
    }
    if parts.is_empty() {
        parts.push(pick(FALLBACK, rng));
    }
    format!("{} {}", parts.join(" "), pick(SUFFIX, rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        let c = LonLat::new(-100.0, 45.0);
        let a = region_name(c, &mut Rng::new(5));
        let b = region_name(c, &mut Rng::new(5));
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn high_latitude_contributes_a_northern_word() {
        let name = region_name(LonLat::new(-100.0, 65.0), &mut Rng::new(1));
        assert!(
            NORTH.iter().any(|w| name.starts_with(w)),
            "unexpected name: {name}"
        );
    }

    #[test]
    fn interior_fallback_still_names() {
        // Outside every predicate band: mid-Atlantic-ish latitude, far east.
        let name = region_name(LonLat::new(-60.0, 40.0), &mut Rng::new(9));
        let first = name.split(' ').next().unwrap();
        assert!(FALLBACK.contains(&first), "unexpected name: {name}");
        assert!(SUFFIX.iter().any(|s| name.ends_with(s)));
    }
}
