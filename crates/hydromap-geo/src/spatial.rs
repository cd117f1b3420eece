use geo::{Area, Distance, Euclidean, Haversine, Length, MultiPolygon, Point};
use hydromap_core::error::Result;
use hydromap_core::models::{Crs, LonLat};

use crate::transform::reproject_multipolygon;

/// Meters per degree of longitude along the equator
pub const METERS_PER_DEGREE_EQUATOR: f64 = 111_320.0;

/// Great-circle distance in meters between two WGS84 points
pub fn haversine_distance(a: LonLat, b: LonLat) -> f64 {
    Haversine.distance(Point::new(a.lon, a.lat), Point::new(b.lon, b.lat))
}

/// Approximate meters per degree at a latitude
pub fn meters_per_degree(lat: f64) -> f64 {
    METERS_PER_DEGREE_EQUATOR * lat.to_radians().cos()
}

/// Total planar perimeter over every exterior and interior ring
pub fn perimeter(geometry: &MultiPolygon<f64>) -> f64 {
    geometry
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| Euclidean.length(ring))
        .sum()
}

/// Area and perimeter measured in an equal-area projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualAreaMeasure {
    pub area_m2: f64,
    pub perimeter_m: f64,
}

/// Reproject to the equal-area CRS and measure area and perimeter in meters
pub fn measure_equal_area(geometry: &MultiPolygon<f64>, crs: &Crs) -> Result<EqualAreaMeasure> {
    let projected = reproject_multipolygon(geometry, crs, &Crs::equal_area())?;
    Ok(EqualAreaMeasure {
        area_m2: projected.unsigned_area(),
        perimeter_m: perimeter(&projected),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_distance(LonLat::new(0.0, 0.0), LonLat::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
        assert_eq!(haversine_distance(LonLat::new(5.0, 5.0), LonLat::new(5.0, 5.0)), 0.0);
    }

    #[test]
    fn test_meters_per_degree() {
        assert_eq!(meters_per_degree(0.0), 111_320.0);
        assert!((meters_per_degree(60.0) - 55_660.0).abs() < 1e-6);
    }

    #[test]
    fn test_perimeter_counts_holes() {
        let square = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 2.0), (x: 1.0, y: 1.0)]],
        );
        let mp = MultiPolygon::new(vec![square]);
        assert_eq!(perimeter(&mp), 20.0);
        assert_eq!(mp.unsigned_area(), 15.0);
    }

    #[test]
    fn test_equal_area_of_one_degree_cell() {
        let cell = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        let measure = measure_equal_area(&cell, &Crs::wgs84()).unwrap();
        // A 1x1 degree cell at the equator is roughly 12,300 km2
        let km2 = measure.area_m2 / 1e6;
        assert!((12_000.0..12_600.0).contains(&km2), "got {}", km2);
        assert!(measure.perimeter_m > 400_000.0);
    }
}
