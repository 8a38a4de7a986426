use std::collections::BTreeMap;
use std::rc::Rc;

use runtime::Timing;
use scene::components::{Attr, AttrSet, AttrValue, PrimitiveKind};
use scene::entity::{LayerId, PrimitiveId};
use serde_json::Value;

use crate::datum::{Datum, Key, KeyFn, dataset_from_value};
use crate::error::EngineError;
use crate::geometry::{ProjectionAdapter, marker_position};
use crate::interaction::{HoverBinding, HoverConfig};
use crate::options::BubbleOptions;
use crate::reconcile::{PrimitiveFactory, ReconcileSummary, reconcile};
use crate::registry::{LayerRenderer, RenderContext};
use crate::stage::Stage;
use crate::symbology::{Fills, StyleContext, resolve_field};

/// Radius grow and update transitions.
pub const BUBBLE_TRANSITION_MS: f64 = 400.0;

/// Circle markers placed by coordinates or by region.
#[derive(Debug, Clone)]
pub struct BubblesLayer {
    defaults: BubbleOptions,
}

impl BubblesLayer {
    pub fn new(defaults: BubbleOptions) -> Self {
        Self { defaults }
    }
}

impl Default for BubblesLayer {
    fn default() -> Self {
        Self::new(BubbleOptions::class_defaults())
    }
}

impl LayerRenderer for BubblesLayer {
    type Options = BubbleOptions;
    type Input = Vec<Datum>;

    fn class_defaults(&self) -> &BubbleOptions {
        &self.defaults
    }

    fn parse(&self, name: &str, data: Value) -> Result<Vec<Datum>, EngineError> {
        dataset_from_value(name, data)
    }

    fn render(
        &self,
        cx: &mut RenderContext<'_>,
        layer: LayerId,
        input: Vec<Datum>,
        options: &BubbleOptions,
    ) -> ReconcileSummary {
        let factory = BubbleFactory::new(cx.adapter, cx.fills, cx.filters, options);
        reconcile(cx.stage, layer, &input, &factory)
    }
}

pub struct BubbleFactory<'a> {
    adapter: &'a ProjectionAdapter,
    fills: &'a Fills,
    filters: &'a BTreeMap<String, String>,
    options: &'a BubbleOptions,
    key: KeyFn,
    hover: Option<Rc<HoverConfig>>,
}

impl<'a> BubbleFactory<'a> {
    pub fn new(
        adapter: &'a ProjectionAdapter,
        fills: &'a Fills,
        filters: &'a BTreeMap<String, String>,
        options: &'a BubbleOptions,
    ) -> Self {
        Self {
            adapter,
            fills,
            filters,
            options,
            key: options.key.clone().unwrap_or_default(),
            hover: options.hover.config(false).map(Rc::new),
        }
    }

    fn animates(&self) -> bool {
        self.options.animate.unwrap_or(true)
    }
}

impl PrimitiveFactory for BubbleFactory<'_> {
    type Item = Datum;

    fn key(&self, item: &Datum) -> Key {
        self.key.key(item)
    }

    fn kind(&self, _item: &Datum) -> PrimitiveKind {
        PrimitiveKind::Circle
    }

    fn attributes(&self, item: &Datum) -> Option<AttrSet> {
        let at = marker_position(self.adapter, item)?;
        let cx = StyleContext::new(item);
        let options = self.options;

        let fill = resolve_field("fillKey", options.fill_key.as_ref(), &cx)
            .and_then(|key| self.fills.get(&key))
            .unwrap_or_else(|| self.fills.default_fill())
            .to_string();
        let filter = resolve_field("filterKey", options.filter_key.as_ref(), &cx)
            .and_then(|key| self.filters.get(&key).cloned());

        let mut attrs = AttrSet::new()
            .with(Attr::Cx, at.x)
            .with(Attr::Cy, at.y)
            .with(Attr::Fill, fill);
        attrs.set_opt(
            Attr::R,
            resolve_field("radius", options.radius.as_ref(), &cx).map(AttrValue::Number),
        );
        attrs.set_opt(Attr::Filter, filter.map(AttrValue::Text));
        attrs.set_opt(
            Attr::Stroke,
            resolve_field("borderColor", options.border_color.as_ref(), &cx).map(AttrValue::Text),
        );
        attrs.set_opt(
            Attr::StrokeWidth,
            resolve_field("borderWidth", options.border_width.as_ref(), &cx).map(AttrValue::Number),
        );
        attrs.set_opt(
            Attr::StrokeOpacity,
            resolve_field("borderOpacity", options.border_opacity.as_ref(), &cx).map(AttrValue::Number),
        );
        attrs.set_opt(
            Attr::FillOpacity,
            resolve_field("fillOpacity", options.fill_opacity.as_ref(), &cx).map(AttrValue::Number),
        );
        Some(attrs)
    }

    /// With `animate` on, the circle starts at radius 0 and grows.
    fn enter(&self, stage: &mut Stage, id: PrimitiveId, _item: &Datum, mut attrs: AttrSet) {
        if !self.animates() {
            stage.set_all(id, attrs);
            return;
        }
        let radius = attrs.remove(Attr::R).flatten();
        stage.set_all(id, attrs);
        stage.set(id, Attr::R, Some(AttrValue::Number(0.0)));
        stage.animate(id, Attr::R, radius, Timing::new(BUBBLE_TRANSITION_MS));
    }

    fn update(&self, stage: &mut Stage, id: PrimitiveId, _item: &Datum, attrs: AttrSet) {
        stage.animate_all(id, attrs, Timing::new(BUBBLE_TRANSITION_MS));
    }

    /// Waits `exitDelay`, shrinks to radius 0, then detaches.
    fn exit(&self, stage: &mut Stage, id: PrimitiveId) {
        let delay = self.options.exit_delay.unwrap_or(0.0);
        stage.exit(
            id,
            AttrSet::new().with(Attr::R, 0.0),
            Timing::default().with_delay(delay),
        );
    }

    fn info(&self, item: &Datum) -> Option<Datum> {
        Some(item.clone())
    }

    fn binding(&self, _item: &Datum) -> Option<HoverBinding> {
        self.hover.as_ref().map(|config| HoverBinding {
            geography: None,
            config: Rc::clone(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::BubblesLayer;
    use crate::datum::{Datum, Key, KeyFn};
    use crate::error::EngineError;
    use crate::geometry::ProjectionAdapter;
    use crate::options::{BubbleOptions, Overlay};
    use crate::reconcile::ReconcileSummary;
    use crate::registry::{LayerRenderer, RenderContext};
    use crate::stage::Stage;
    use crate::symbology::Fills;
    use foundation::math::{LngLat, Vec2};
    use foundation::time::Time;
    use scene::components::{Attr, AttrValue};
    use scene::entity::LayerId;
    use scene::{Equirectangular, GeoGeometry, LayerPlacement, RegionFeature, World};
    use serde_json::{Value, json};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }

    struct Fixture {
        stage: Stage,
        adapter: ProjectionAdapter,
        fills: Fills,
        filters: BTreeMap<String, String>,
        layer: LayerId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut stage = Stage::new(World::headless());
            let layer = stage.add_layer("bubbles", LayerPlacement::Top);
            let mut adapter = ProjectionAdapter::new(Box::new(Equirectangular::fit(800.0, 450.0)));
            let ring = vec![
                LngLat::new(0.0, 0.0),
                LngLat::new(10.0, 0.0),
                LngLat::new(10.0, 10.0),
                LngLat::new(0.0, 10.0),
                LngLat::new(0.0, 0.0),
            ];
            adapter.set_features([Rc::new(RegionFeature::new("SQR", GeoGeometry::Polygon(vec![ring])))]);
            let mut filters = BTreeMap::new();
            filters.insert("glow".to_string(), "url(#glow)".to_string());
            Self {
                stage,
                adapter,
                fills: Fills::default().with("BIG", "#306596"),
                filters,
                layer,
            }
        }

        fn render(&mut self, data: Value, options: &BubbleOptions) -> Result<ReconcileSummary, EngineError> {
            let renderer = BubblesLayer::default();
            let input = renderer.parse("bubbles", data)?;
            let options = options.overlay(renderer.class_defaults());
            let mut cx = RenderContext {
                stage: &mut self.stage,
                adapter: &self.adapter,
                fills: &self.fills,
                filters: &self.filters,
                regions: None,
            };
            Ok(renderer.render(&mut cx, self.layer, input, &options))
        }

        fn number(&self, key: &Key, attr: Attr) -> Option<f64> {
            let id = self.stage.lookup(self.layer, key)?;
            self.stage.attr(id, attr).and_then(AttrValue::as_number)
        }
    }

    fn by_id() -> BubbleOptions {
        BubbleOptions {
            key: Some(KeyFn::field("id")),
            ..BubbleOptions::default()
        }
    }

    #[test]
    fn radius_grows_from_zero() {
        let mut fx = Fixture::new();
        let summary = fx
            .render(json!([{"id": "A", "latitude": 10, "longitude": 20, "radius": 8}]), &by_id())
            .unwrap();
        assert_eq!(summary.created, 1);
        let key = Key::from("id:A");
        assert_eq!(fx.number(&key, Attr::R), Some(0.0));

        fx.stage.advance(Time::from_millis(200.0));
        let mid = fx.number(&key, Attr::R).unwrap();
        assert!(mid > 0.0 && mid < 8.0);
        fx.stage.advance(Time::from_millis(400.0));
        assert_eq!(fx.number(&key, Attr::R), Some(8.0));
    }

    #[test]
    fn coordinate_update_moves_existing_marker() {
        let mut fx = Fixture::new();
        fx.render(json!([{"id": "A", "latitude": 10, "longitude": 20, "radius": 5}]), &by_id())
            .unwrap();
        let key = KeyFn::field("id").key(&Datum::new().with("id", "A"));
        let start = fx.adapter.lat_lng_to_xy(10.0, 20.0).unwrap();
        assert_close(fx.number(&key, Attr::Cx).unwrap(), start.x);

        let summary = fx
            .render(json!([{"id": "A", "latitude": 30, "longitude": 40, "radius": 5}]), &by_id())
            .unwrap();
        assert_eq!(summary, ReconcileSummary { updated: 1, ..ReconcileSummary::default() });
        fx.stage.advance(Time::from_millis(1_000.0));

        let end: Vec2 = fx.adapter.lat_lng_to_xy(30.0, 40.0).unwrap();
        assert_eq!(fx.stage.members(fx.layer).len(), 1);
        assert_close(fx.number(&key, Attr::Cx).unwrap(), end.x);
        assert_close(fx.number(&key, Attr::Cy).unwrap(), end.y);
    }

    #[test]
    fn exit_waits_delay_then_shrinks_and_detaches() {
        let mut fx = Fixture::new();
        let options = BubbleOptions {
            animate: Some(false),
            ..by_id()
        };
        fx.render(json!([{"id": "A", "centered": "SQR", "radius": 6}]), &options)
            .unwrap();
        let summary = fx.render(json!([]), &options).unwrap();
        assert_eq!(summary.removed, 1);

        let key = Key::from("id:A");
        fx.stage.advance(Time::from_millis(100.0));
        assert_eq!(fx.number(&key, Attr::R), Some(6.0));
        fx.stage.advance(Time::from_millis(225.0));
        let shrinking = fx.number(&key, Attr::R).unwrap();
        assert!(shrinking < 6.0);
        fx.stage.advance(Time::from_millis(350.0));
        assert!(fx.stage.members(fx.layer).is_empty());
    }

    #[test]
    fn styles_come_from_datum_then_options() {
        let mut fx = Fixture::new();
        let options = BubbleOptions {
            animate: Some(false),
            ..BubbleOptions::default()
        };
        let datum = json!({"centered": "SQR", "radius": 4, "fillKey": "BIG", "filterKey": "glow", "borderWidth": 3});
        fx.render(json!([datum.clone()]), &options).unwrap();

        let key = Key::structural(&Datum::from_value(datum).unwrap());
        let id = fx.stage.lookup(fx.layer, &key).unwrap();
        assert_eq!(fx.stage.attr(id, Attr::Fill), Some(&AttrValue::from("#306596")));
        assert_eq!(fx.stage.attr(id, Attr::Filter), Some(&AttrValue::from("url(#glow)")));
        assert_eq!(fx.stage.attr(id, Attr::StrokeWidth), Some(&AttrValue::Number(3.0)));
        assert_eq!(fx.stage.attr(id, Attr::FillOpacity), Some(&AttrValue::Number(0.75)));
        assert_eq!(fx.stage.attr(id, Attr::Stroke), Some(&AttrValue::from("#FFFFFF")));
        let centroid = fx.adapter.centroid_of("SQR").unwrap();
        assert_close(fx.stage.attr(id, Attr::Cx).and_then(AttrValue::as_number).unwrap(), centroid.x);
        assert!(fx.stage.binding(id).is_some_and(|b| b.geography.is_none()));
    }

    #[test]
    fn unplaceable_markers_are_skipped() {
        let mut fx = Fixture::new();
        let summary = fx
            .render(json!([{"centered": "ZZZ", "radius": 4}, {"latitude": 1, "longitude": 2}]), &BubbleOptions::default())
            .unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn non_array_data_is_rejected() {
        let mut fx = Fixture::new();
        let err = fx.render(json!({"id": "A"}), &BubbleOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::InputShape { .. }));
        assert!(fx.stage.members(fx.layer).is_empty());
    }
}
