use foundation::math::LngLat;
use scene::components::{Attr, AttrSet, PrimitiveKind};
use scene::entity::LayerId;
use scene::{GeoGeometry, LayerPlacement};
use serde_json::Value;

use crate::datum::Key;
use crate::error::EngineError;
use crate::geometry::ProjectionAdapter;
use crate::options::GraticuleOptions;
use crate::reconcile::{PrimitiveFactory, ReconcileSummary, reconcile};
use crate::registry::{LayerRenderer, RenderContext};

/// Meridians on multiples of this run pole to pole; the rest stop at ±80°.
const MAJOR_STEP: f64 = 90.0;
const MINOR_EXTENT: f64 = 80.0;

fn samples(from: f64, to: f64, precision: f64) -> Vec<f64> {
    let n = ((to - from) / precision).ceil() as usize;
    (0..=n).map(|i| (from + i as f64 * precision).min(to)).collect()
}

/// Meridians every `step` degrees from -180 and parallels every `step`
/// degrees within ±80°, each sampled every `precision` degrees.
/// Non-positive or non-finite settings yield no lines.
pub fn graticule_lines(step: f64, precision: f64) -> Vec<Vec<LngLat>> {
    if !(step.is_finite() && precision.is_finite() && step > 0.0 && precision > 0.0) {
        return Vec::new();
    }
    let mut lines = Vec::new();

    let mut lng = -180.0;
    while lng < 180.0 {
        let extent = if lng % MAJOR_STEP == 0.0 { 90.0 } else { MINOR_EXTENT };
        lines.push(
            samples(-extent, extent, precision)
                .into_iter()
                .map(|lat| LngLat::new(lng, lat))
                .collect(),
        );
        lng += step;
    }

    let mut lat = (-MINOR_EXTENT / step).ceil() * step;
    while lat <= MINOR_EXTENT {
        lines.push(
            samples(-180.0, 180.0, precision)
                .into_iter()
                .map(|lng| LngLat::new(lng, lat))
                .collect(),
        );
        lat += step;
    }
    lines
}

/// A single path of meridians and parallels drawn beneath the regions.
#[derive(Debug, Clone)]
pub struct GraticuleLayer {
    defaults: GraticuleOptions,
}

impl GraticuleLayer {
    pub fn new(defaults: GraticuleOptions) -> Self {
        Self { defaults }
    }
}

impl Default for GraticuleLayer {
    fn default() -> Self {
        Self::new(GraticuleOptions::class_defaults())
    }
}

impl LayerRenderer for GraticuleLayer {
    type Options = GraticuleOptions;
    type Input = ();

    fn class_defaults(&self) -> &GraticuleOptions {
        &self.defaults
    }

    fn parse(&self, _name: &str, _data: Value) -> Result<(), EngineError> {
        Ok(())
    }

    fn placement(&self, cx: &RenderContext<'_>) -> LayerPlacement {
        match cx.regions {
            Some(regions) => LayerPlacement::Below(regions),
            None => LayerPlacement::Bottom,
        }
    }

    fn render(
        &self,
        cx: &mut RenderContext<'_>,
        layer: LayerId,
        _input: (),
        options: &GraticuleOptions,
    ) -> ReconcileSummary {
        let lines = graticule_lines(options.step.unwrap_or(10.0), options.precision.unwrap_or(2.5));
        let factory = GraticuleFactory { adapter: cx.adapter };
        reconcile(cx.stage, layer, &[GeoGeometry::MultiLineString(lines)], &factory)
    }
}

struct GraticuleFactory<'a> {
    adapter: &'a ProjectionAdapter,
}

impl PrimitiveFactory for GraticuleFactory<'_> {
    type Item = GeoGeometry;

    fn key(&self, _item: &GeoGeometry) -> Key {
        Key::new("graticule")
    }

    fn kind(&self, _item: &GeoGeometry) -> PrimitiveKind {
        PrimitiveKind::Line
    }

    fn attributes(&self, item: &GeoGeometry) -> Option<AttrSet> {
        let path = self.adapter.path_for(item)?;
        Some(
            AttrSet::new()
                .with(Attr::D, path)
                .with(Attr::Fill, "none")
                .with(Attr::Stroke, "#777")
                .with(Attr::StrokeWidth, 0.5)
                .with(Attr::StrokeOpacity, 0.5),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{GraticuleLayer, graticule_lines};
    use crate::geometry::ProjectionAdapter;
    use crate::options::GraticuleOptions;
    use crate::registry::LayerRegistry;
    use crate::registry::RenderContext;
    use crate::stage::Stage;
    use crate::symbology::Fills;
    use foundation::math::LngLat;
    use scene::components::{Attr, AttrValue};
    use scene::{Equirectangular, LayerPlacement, World};
    use serde_json::Value;

    #[test]
    fn lines_cover_meridians_and_parallels() {
        let lines = graticule_lines(10.0, 2.5);
        // 36 meridians, 17 parallels.
        assert_eq!(lines.len(), 53);

        let prime = &lines[18];
        assert_eq!(prime.first(), Some(&LngLat::new(0.0, -90.0)));
        assert_eq!(prime.last(), Some(&LngLat::new(0.0, 90.0)));
        let minor = &lines[1];
        assert_eq!(minor.first(), Some(&LngLat::new(-170.0, -80.0)));
        assert_eq!(minor.len(), 65);

        let equator = &lines[36 + 8];
        assert!(equator.iter().all(|p| p.lat == 0.0));
        assert_eq!(equator.last().map(|p| p.lng), Some(180.0));
    }

    #[test]
    fn bad_settings_yield_nothing() {
        assert!(graticule_lines(0.0, 2.5).is_empty());
        assert!(graticule_lines(10.0, f64::NAN).is_empty());
    }

    #[test]
    fn graticule_sits_below_regions() {
        let mut stage = Stage::new(World::headless());
        let regions = stage.add_layer("datamaps-subunits", LayerPlacement::Top);
        let adapter = ProjectionAdapter::new(Box::new(Equirectangular::fit(800.0, 450.0)));
        let fills = Fills::default();
        let filters = BTreeMap::new();
        let mut registry = LayerRegistry::new();
        registry.register("graticule", GraticuleLayer::default());

        let mut cx = RenderContext {
            stage: &mut stage,
            adapter: &adapter,
            fills: &fills,
            filters: &filters,
            regions: Some(regions),
        };
        let handle = registry
            .invoke("graticule", &mut cx, Value::Null, Some(Box::new(GraticuleOptions::default())), false)
            .unwrap();
        assert_eq!(handle.summary.created, 1);

        let order: Vec<_> = stage.world().layers().iter().map(|l| l.id).collect();
        assert_eq!(order, vec![handle.layer, regions]);
        let id = stage.members(handle.layer)[0];
        assert_eq!(stage.attr(id, Attr::Stroke), Some(&AttrValue::from("#777")));
        assert_eq!(stage.attr(id, Attr::Fill), Some(&AttrValue::from("none")));
    }
}
