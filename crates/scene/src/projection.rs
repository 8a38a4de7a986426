use std::f64::consts::{FRAC_PI_4, PI};

use foundation::math::{LngLat, Vec2};

use crate::components::{PathCommand, PathData};
use crate::geography::GeoGeometry;

/// Mapping from geographic to screen coordinates.
///
/// Only `project` is required; path and centroid construction default to
/// projecting every vertex. Points that fail to project are dropped.
pub trait Projection {
    fn project(&self, at: LngLat) -> Option<Vec2>;

    fn path_for(&self, geometry: &GeoGeometry) -> Option<PathData> {
        let mut path = PathData::new();
        match geometry {
            GeoGeometry::Point(_) | GeoGeometry::MultiPoint(_) => return None,
            GeoGeometry::LineString(line) => append_line(self, &mut path, line, false),
            GeoGeometry::MultiLineString(lines) => {
                for line in lines {
                    append_line(self, &mut path, line, false);
                }
            }
            GeoGeometry::Polygon(rings) => {
                for ring in rings {
                    append_line(self, &mut path, ring, true);
                }
            }
            GeoGeometry::MultiPolygon(polygons) => {
                for ring in polygons.iter().flatten() {
                    append_line(self, &mut path, ring, true);
                }
            }
        }
        (!path.is_empty()).then_some(path)
    }

    /// Screen-space centroid: area-weighted for polygons, length-weighted
    /// for lines, the mean for points. Degenerate polygons fall back to
    /// their outline and degenerate lines to their vertices.
    fn centroid_of(&self, geometry: &GeoGeometry) -> Option<Vec2> {
        let rings: Vec<(Vec<Vec2>, bool)> = match geometry {
            GeoGeometry::Point(p) => return self.project(*p),
            GeoGeometry::MultiPoint(points) => return mean(&project_all(self, points)),
            GeoGeometry::LineString(line) => return line_centroid(&[project_all(self, line)]),
            GeoGeometry::MultiLineString(lines) => {
                let lines: Vec<_> = lines.iter().map(|l| project_all(self, l)).collect();
                return line_centroid(&lines);
            }
            GeoGeometry::Polygon(rings) => rings
                .iter()
                .enumerate()
                .map(|(i, ring)| (project_all(self, ring), i == 0))
                .collect(),
            GeoGeometry::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(|rings| {
                    rings
                        .iter()
                        .enumerate()
                        .map(|(i, ring)| (project_all(self, ring), i == 0))
                })
                .collect(),
        };
        polygon_centroid(&rings).or_else(|| {
            let outlines: Vec<_> = rings.into_iter().map(|(r, _)| r).collect();
            line_centroid(&outlines)
        })
    }
}

fn project_all<P: Projection + ?Sized>(projection: &P, points: &[LngLat]) -> Vec<Vec2> {
    points
        .iter()
        .filter_map(|p| projection.project(*p))
        .filter(|p| p.is_finite())
        .collect()
}

fn append_line<P: Projection + ?Sized>(
    projection: &P,
    path: &mut PathData,
    line: &[LngLat],
    closed: bool,
) {
    let points = project_all(projection, line);
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    path.push(PathCommand::MoveTo(*first));
    for p in rest {
        path.push(PathCommand::LineTo(*p));
    }
    if closed {
        path.push(PathCommand::ClosePath);
    }
}

fn mean(points: &[Vec2]) -> Option<Vec2> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
    Some(sum.scale(1.0 / points.len() as f64))
}

fn line_centroid(lines: &[Vec<Vec2>]) -> Option<Vec2> {
    let mut total = 0.0;
    let mut acc = Vec2::ZERO;
    for line in lines {
        for pair in line.windows(2) {
            let len = pair[0].distance(pair[1]);
            total += len;
            acc = acc + pair[0].midpoint(pair[1]).scale(len);
        }
    }
    if total > 1e-12 {
        return Some(acc.scale(1.0 / total));
    }
    let all: Vec<Vec2> = lines.iter().flatten().copied().collect();
    mean(&all)
}

/// Shoelace centroid. Outer rings add their area and holes subtract it,
/// regardless of winding.
fn polygon_centroid(rings: &[(Vec<Vec2>, bool)]) -> Option<Vec2> {
    let mut area = 0.0;
    let mut acc = Vec2::ZERO;
    for (ring, outer) in rings {
        if ring.len() < 3 {
            continue;
        }
        let mut ring_area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            let cross = a.x * b.y - b.x * a.y;
            ring_area += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        if ring_area.abs() < 1e-12 {
            continue;
        }
        // Normalize winding so the sign only reflects outer vs hole.
        let sign = if *outer { 1.0 } else { -1.0 } * ring_area.signum();
        area += sign * ring_area / 2.0;
        acc = acc + Vec2::new(cx, cy).scale(sign / 6.0);
    }
    (area.abs() > 1e-12).then(|| acc.scale(1.0 / area))
}

/// Plate carrée projection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Equirectangular {
    pub scale: f64,
    pub translate: Vec2,
}

impl Equirectangular {
    /// Fits the whole world into a `width`-wide viewport.
    pub fn fit(width: f64, height: f64) -> Self {
        Self {
            scale: (width + 1.0) / 2.0 / PI,
            translate: Vec2::new(width / 2.0, height / 1.8),
        }
    }
}

impl Projection for Equirectangular {
    fn project(&self, at: LngLat) -> Option<Vec2> {
        if !at.is_finite() {
            return None;
        }
        Some(Vec2::new(
            self.translate.x + self.scale * at.lng.to_radians(),
            self.translate.y - self.scale * at.lat.to_radians(),
        ))
    }
}

/// Spherical Mercator. Poles have no finite image and are rejected.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mercator {
    pub scale: f64,
    pub translate: Vec2,
}

impl Mercator {
    pub fn fit(width: f64, height: f64) -> Self {
        Self {
            scale: (width + 1.0) / 2.0 / PI,
            translate: Vec2::new(width / 2.0, height / 1.45),
        }
    }
}

impl Projection for Mercator {
    fn project(&self, at: LngLat) -> Option<Vec2> {
        if !at.is_finite() || at.lat.abs() >= 90.0 {
            return None;
        }
        let y = (FRAC_PI_4 + at.lat.to_radians() / 2.0).tan().ln();
        let out = Vec2::new(
            self.translate.x + self.scale * at.lng.to_radians(),
            self.translate.y - self.scale * y,
        );
        out.is_finite().then_some(out)
    }
}

/// Builds a viewport-fitted projection from its configuration name.
pub fn fitted_projection(name: &str, width: f64, height: f64) -> Option<Box<dyn Projection>> {
    match name {
        "equirectangular" => Some(Box::new(Equirectangular::fit(width, height))),
        "mercator" => Some(Box::new(Mercator::fit(width, height))),
        _ => None,
    }
}
