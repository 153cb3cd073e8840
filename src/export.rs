use serde::Serialize;

use crate::Region;

/// GeoJSON position, [lon, lat].
type Position = [f64; 2];

#[derive(Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

#[derive(Serialize)]
pub struct RegionProperties {
    pub id: usize,
    pub name: String,
    pub cell_count: usize,
}

#[derive(Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: RegionProperties,
    pub geometry: Geometry,
}

#[derive(Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

/// GeoJSON rings must repeat their first position at the end.
fn closed_ring(ring: &[crate::geo::LonLat]) -> Vec<Position> {
    let mut out: Vec<Position> = ring.iter().map(|p| [p.lon, p.lat]).collect();
    if let Some(&first) = out.first() {
        if out.last() != Some(&first) {
            out.push(first);
        }
    }
    out
}

/// Each region becomes one Feature: a Polygon when it has a single loop, a
/// MultiPolygon otherwise. Every loop is an outer ring; holes are not
/// produced by the tracer.
pub fn regions_to_feature_collection(regions: &[Region]) -> FeatureCollection {
    let features = regions
        .iter()
        .map(|r| {
            let geometry = if r.polygons.len() == 1 {
                Geometry::Polygon {
                    coordinates: vec![closed_ring(&r.polygons[0])],
                }
            } else {
                Geometry::MultiPolygon {
                    coordinates: r
                        .polygons
                        .iter()
                        .map(|ring| vec![closed_ring(ring)])
                        .collect(),
                }
            };
            Feature {
                kind: "Feature",
                properties: RegionProperties {
                    id: r.id,
                    name: r.name.clone(),
                    cell_count: r.cell_count,
                },
                geometry,
            }
        })
        .collect();
    FeatureCollection {
        kind: "FeatureCollection",
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LonLat;

    fn region(id: usize, loops: usize) -> Region {
        let ring = vec![
            LonLat::new(-120.0, 50.0),
            LonLat::new(-90.0, 50.0),
            LonLat::new(-90.0, 30.0),
        ];
        Region {
            id,
            seed: LonLat::new(-100.0, 40.0),
            polygons: vec![ring; loops],
            centroid: LonLat::new(-100.0, 43.3),
            name: format!("Region {id}"),
            cell_count: 42,
        }
    }

    #[test]
    fn rings_are_explicitly_closed() {
        let fc = regions_to_feature_collection(&[region(0, 1)]);
        match &fc.features[0].geometry {
            Geometry::Polygon { coordinates } => {
                let ring = &coordinates[0];
                assert_eq!(ring.len(), 4);
                assert_eq!(ring.first(), ring.last());
            }
            _ => panic!("expected Polygon for a single loop"),
        }
    }

    #[test]
    fn multiple_loops_become_a_multipolygon() {
        let fc = regions_to_feature_collection(&[region(3, 2)]);
        match &fc.features[0].geometry {
            Geometry::MultiPolygon { coordinates } => {
                assert_eq!(coordinates.len(), 2);
                assert_eq!(coordinates[0][0].first(), coordinates[0][0].last());
            }
            _ => panic!("expected MultiPolygon for two loops"),
        }
    }

    #[test]
    fn serializes_as_geojson() {
        let fc = regions_to_feature_collection(&[region(0, 1), region(1, 3)]);
        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(json["features"][1]["geometry"]["type"], "MultiPolygon");
        assert_eq!(json["features"][0]["properties"]["name"], "Region 0");
        assert_eq!(json["features"][0]["properties"]["cell_count"], 42);
    }
}
