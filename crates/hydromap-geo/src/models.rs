//! Conversions from `geo` geometries to GeoJSON features.

use geo::Geometry as GeoGeometry;
use geojson::{Feature, Geometry, JsonObject, Value};

/// Wrap a geometry and a properties bag into a GeoJSON feature
pub fn to_feature(geometry: &GeoGeometry<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
