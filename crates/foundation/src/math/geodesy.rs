/// Geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    fn to_unit(self) -> [f64; 3] {
        let lat = self.lat.to_radians();
        let lng = self.lng.to_radians();
        [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
    }

    fn from_unit(v: [f64; 3]) -> Self {
        let lat = v[2].clamp(-1.0, 1.0).asin();
        let lng = v[1].atan2(v[0]);
        Self::new(lng.to_degrees(), lat.to_degrees())
    }
}

/// Central angle between two coordinates, in radians (haversine form).
pub fn angular_distance(a: LngLat, b: LngLat) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Samples the shorter great-circle arc from `a` to `b`.
///
/// Returns `segments + 1` points including both endpoints. Coincident or
/// antipodal endpoints (where the arc is degenerate or undefined) yield a
/// straight two-point line.
pub fn great_circle_points(a: LngLat, b: LngLat, segments: usize) -> Vec<LngLat> {
    let omega = angular_distance(a, b);
    let segments = segments.max(1);
    let sin_omega = omega.sin();
    if omega.abs() < 1e-12 || sin_omega.abs() < 1e-12 {
        return vec![a, b];
    }

    let va = a.to_unit();
    let vb = b.to_unit();
    let mut out = Vec::with_capacity(segments + 1);
    out.push(a);
    for i in 1..segments {
        let t = i as f64 / segments as f64;
        let wa = ((1.0 - t) * omega).sin() / sin_omega;
        let wb = (t * omega).sin() / sin_omega;
        let v = [
            wa * va[0] + wb * vb[0],
            wa * va[1] + wb * vb[1],
            wa * va[2] + wb * vb[2],
        ];
        out.push(LngLat::from_unit(v));
    }
    out.push(b);
    out
}

#[cfg(test)]
mod tests {
    use super::{LngLat, angular_distance, great_circle_points};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn quarter_turn_along_equator() {
        let d = angular_distance(LngLat::new(0.0, 0.0), LngLat::new(90.0, 0.0));
        assert_close(d, std::f64::consts::FRAC_PI_2, 1e-12);
    }

    #[test]
    fn equator_arc_stays_on_equator() {
        let pts = great_circle_points(LngLat::new(0.0, 0.0), LngLat::new(90.0, 0.0), 3);
        assert_eq!(pts.len(), 4);
        assert_close(pts[1].lng, 30.0, 1e-9);
        assert_close(pts[2].lng, 60.0, 1e-9);
        for p in &pts {
            assert_close(p.lat, 0.0, 1e-9);
        }
    }

    #[test]
    fn meridian_arc_bulges_poleward() {
        // Two points at 45N separated by 90 degrees of longitude: the great
        // circle between them passes north of the parallel.
        let pts = great_circle_points(LngLat::new(-45.0, 45.0), LngLat::new(45.0, 45.0), 2);
        assert_eq!(pts.len(), 3);
        assert_close(pts[1].lng, 0.0, 1e-9);
        assert!(pts[1].lat > 45.0);
    }

    #[test]
    fn coincident_points_degenerate_to_line() {
        let p = LngLat::new(10.0, 20.0);
        assert_eq!(great_circle_points(p, p, 8), vec![p, p]);
    }
}
