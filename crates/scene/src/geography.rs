use foundation::math::LngLat;

use crate::components::Properties;

/// Geographic geometry of a feature, coordinates in degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoGeometry {
    Point(LngLat),
    MultiPoint(Vec<LngLat>),
    LineString(Vec<LngLat>),
    MultiLineString(Vec<Vec<LngLat>>),
    /// Outer ring first, holes after.
    Polygon(Vec<Vec<LngLat>>),
    MultiPolygon(Vec<Vec<Vec<LngLat>>>),
}

impl GeoGeometry {
    pub fn is_empty(&self) -> bool {
        match self {
            GeoGeometry::Point(_) => false,
            GeoGeometry::MultiPoint(points) | GeoGeometry::LineString(points) => points.is_empty(),
            GeoGeometry::MultiLineString(lines) | GeoGeometry::Polygon(lines) => {
                lines.iter().all(Vec::is_empty)
            }
            GeoGeometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().all(Vec::is_empty)
            }
        }
    }
}

/// One pre-parsed region of the topology source, identified by a stable id
/// (e.g. an ISO alpha-3 country code or a US state code).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub id: String,
    pub properties: Properties,
    pub geometry: GeoGeometry,
}

impl RegionFeature {
    pub fn new(id: impl Into<String>, geometry: GeoGeometry) -> Self {
        Self {
            id: id.into(),
            properties: Properties::default(),
            geometry,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name")
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoGeometry, RegionFeature};
    use foundation::math::LngLat;

    #[test]
    fn feature_exposes_name_property() {
        let feature = RegionFeature::new("FRA", GeoGeometry::Point(LngLat::new(2.0, 46.0)))
            .with_property("name", "France");
        assert_eq!(feature.name(), Some("France"));
        assert_eq!(feature.id, "FRA");
    }

    #[test]
    fn empty_geometries_are_detected() {
        assert!(GeoGeometry::LineString(Vec::new()).is_empty());
        assert!(GeoGeometry::Polygon(vec![Vec::new()]).is_empty());
        assert!(!GeoGeometry::Point(LngLat::new(0.0, 0.0)).is_empty());
        assert!(!GeoGeometry::MultiPolygon(vec![vec![vec![LngLat::new(0.0, 0.0)]]]).is_empty());
    }
}
