use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::math::{LngLat, Vec2, angular_distance, great_circle_points};
use scene::components::PathData;
use scene::{GeoGeometry, Projection, RegionFeature};
use serde_json::Value;

use crate::datum::Datum;

/// Connector endpoint anchors (capital cities), by region id.
pub const ARC_ANCHORS: &[(&str, LngLat)] = &[
    ("CAN", LngLat { lng: -114.665293, lat: 56.624472 }),
    ("CHL", LngLat { lng: -70.669265, lat: -33.448890 }),
    ("HRV", LngLat { lng: 15.981919, lat: 45.815011 }),
    ("IDN", LngLat { lng: 106.845599, lat: -6.208763 }),
    ("JPN", LngLat { lng: 139.691706, lat: 35.689487 }),
    ("MYS", LngLat { lng: 101.686855, lat: 3.139003 }),
    ("NOR", LngLat { lng: 10.752245, lat: 59.913869 }),
    ("USA", LngLat { lng: -100.760145, lat: 41.140276 }),
    ("VNM", LngLat { lng: 105.834160, lat: 21.027764 }),
];

/// Visual centers for marker placement, by region id.
pub const MARKER_ANCHORS: &[(&str, LngLat)] = &[("USA", LngLat { lng: -98.58333, lat: 39.83333 })];

pub fn anchor(table: &[(&str, LngLat)], id: &str) -> Option<LngLat> {
    table.iter().find(|(k, _)| *k == id).map(|(_, at)| *at)
}

/// Projection plus the region features currently drawn, so regions can be
/// looked up (and their centroids taken) by id.
pub struct ProjectionAdapter {
    projection: Box<dyn Projection>,
    features: BTreeMap<String, Rc<RegionFeature>>,
    order: Vec<String>,
}

impl ProjectionAdapter {
    pub fn new(projection: Box<dyn Projection>) -> Self {
        Self {
            projection,
            features: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    pub fn project(&self, at: LngLat) -> Option<Vec2> {
        self.projection.project(at)
    }

    pub fn lat_lng_to_xy(&self, lat: f64, lng: f64) -> Option<Vec2> {
        self.project(LngLat::new(lng, lat))
    }

    pub fn path_for(&self, geometry: &GeoGeometry) -> Option<PathData> {
        self.projection.path_for(geometry)
    }

    /// Replaces the set of drawn regions.
    pub fn set_features(&mut self, features: impl IntoIterator<Item = Rc<RegionFeature>>) {
        self.features.clear();
        self.order.clear();
        for feature in features {
            if self.features.insert(feature.id.clone(), Rc::clone(&feature)).is_none() {
                self.order.push(feature.id.clone());
            }
        }
    }

    pub fn feature(&self, id: &str) -> Option<&Rc<RegionFeature>> {
        self.features.get(id)
    }

    /// Drawn regions in draw order.
    pub fn features(&self) -> impl Iterator<Item = &Rc<RegionFeature>> + '_ {
        self.order.iter().filter_map(|id| self.features.get(id))
    }

    pub fn centroid_of(&self, id: &str) -> Option<Vec2> {
        let feature = self.features.get(id)?;
        self.projection
            .centroid_of(&feature.geometry)
            .filter(|c| c.is_finite())
    }
}

impl std::fmt::Debug for ProjectionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionAdapter")
            .field("features", &self.order)
            .finish_non_exhaustive()
    }
}

/// Screen position of a marker: its `latitude`/`longitude` when both are
/// present, else the centroid of the `centered` region, else that region's
/// fixed anchor.
pub fn marker_position(adapter: &ProjectionAdapter, datum: &Datum) -> Option<Vec2> {
    if datum.contains("latitude") && datum.contains("longitude") {
        let lat = datum.number("latitude")?;
        let lng = datum.number("longitude")?;
        return adapter.lat_lng_to_xy(lat, lng);
    }
    let region = datum.str("centered")?;
    adapter
        .centroid_of(region)
        .or_else(|| adapter.project(anchor(MARKER_ANCHORS, region)?))
}

/// One end of a connector.
#[derive(Debug, Clone, PartialEq)]
pub enum ArcEndpoint {
    Coordinates(LngLat),
    Region(String),
}

impl ArcEndpoint {
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) => Some(ArcEndpoint::Region(id.clone())),
            Value::Object(_) => {
                let datum = Datum::from_value(value.clone())?;
                let lat = datum.number("latitude")?;
                let lng = datum.number("longitude")?;
                Some(ArcEndpoint::Coordinates(LngLat::new(lng, lat)))
            }
            _ => None,
        }
    }
}

/// A resolved endpoint. `geo` is known unless the endpoint fell back to a
/// region centroid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub screen: Vec2,
    pub geo: Option<LngLat>,
}

/// Coordinates project directly; region ids use the anchor table first and
/// the drawn region's centroid second.
pub fn resolve_endpoint(adapter: &ProjectionAdapter, endpoint: &ArcEndpoint) -> Option<ResolvedEndpoint> {
    match endpoint {
        ArcEndpoint::Coordinates(at) => Some(ResolvedEndpoint {
            screen: adapter.project(*at)?,
            geo: Some(*at),
        }),
        ArcEndpoint::Region(id) => match anchor(ARC_ANCHORS, id) {
            Some(at) => Some(ResolvedEndpoint {
                screen: adapter.project(at)?,
                geo: Some(at),
            }),
            None => Some(ResolvedEndpoint {
                screen: adapter.centroid_of(id)?,
                geo: None,
            }),
        },
    }
}

/// Bowed connector: one smooth cubic whose control point sits at the
/// midpoint offset by `(50, -75) * sharpness`. The offset is not rotated
/// with the connector.
pub fn bezier_arc(origin: Vec2, destination: Vec2, sharpness: f64) -> PathData {
    let mid = origin.midpoint(destination);
    let ctrl = Vec2::new(mid.x + 50.0 * sharpness, mid.y - 75.0 * sharpness);
    PathData::new().move_to(origin).smooth_cubic_to(ctrl, destination)
}

/// Great-circle connector sampled at roughly one point per degree.
pub fn great_arc(adapter: &ProjectionAdapter, origin: LngLat, destination: LngLat) -> Option<PathData> {
    let degrees = angular_distance(origin, destination).to_degrees();
    let segments = (degrees.round() as usize).max(1);
    let points = great_circle_points(origin, destination, segments);
    adapter.path_for(&GeoGeometry::LineString(points))
}

/// Connector path for an arc datum with `origin` and `destination` fields.
pub fn arc_path(
    adapter: &ProjectionAdapter,
    datum: &Datum,
    sharpness: f64,
    use_great_arc: bool,
) -> Option<PathData> {
    let origin = resolve_endpoint(adapter, &ArcEndpoint::parse(datum.get("origin")?)?)?;
    let destination = resolve_endpoint(adapter, &ArcEndpoint::parse(datum.get("destination")?)?)?;
    if use_great_arc
        && let (Some(a), Some(b)) = (origin.geo, destination.geo)
    {
        return great_arc(adapter, a, b);
    }
    Some(bezier_arc(origin.screen, destination.screen, sharpness))
}
