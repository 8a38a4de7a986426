use std::rc::Rc;

use runtime::{Ease, Timing};
use scene::components::{Attr, AttrSet, AttrValue, PrimitiveKind};
use scene::entity::{LayerId, PrimitiveId};
use serde_json::Value;

use crate::datum::{Datum, Key, dataset_from_value};
use crate::error::EngineError;
use crate::geometry::{ProjectionAdapter, arc_path};
use crate::interaction::{HoverBinding, HoverConfig};
use crate::options::ArcOptions;
use crate::reconcile::{PrimitiveFactory, ReconcileSummary, reconcile};
use crate::registry::{LayerRenderer, RenderContext};
use crate::stage::Stage;
use crate::symbology::{Style, StyleContext, resolve_field};

/// Pause before a new connector starts drawing in.
pub const DRAW_IN_DELAY_MS: f64 = 100.0;

/// Curved connectors between two endpoints.
#[derive(Debug, Clone)]
pub struct ArcsLayer {
    defaults: ArcOptions,
}

impl ArcsLayer {
    pub fn new(defaults: ArcOptions) -> Self {
        Self { defaults }
    }
}

impl Default for ArcsLayer {
    fn default() -> Self {
        Self::new(ArcOptions::class_defaults())
    }
}

impl LayerRenderer for ArcsLayer {
    type Options = ArcOptions;
    type Input = Vec<Datum>;

    fn class_defaults(&self) -> &ArcOptions {
        &self.defaults
    }

    /// Also lifts each entry's nested `options` object to its top level.
    fn parse(&self, name: &str, data: Value) -> Result<Vec<Datum>, EngineError> {
        let mut data = dataset_from_value(name, data)?;
        for datum in &mut data {
            datum.flatten_options();
        }
        Ok(data)
    }

    fn render(
        &self,
        cx: &mut RenderContext<'_>,
        layer: LayerId,
        input: Vec<Datum>,
        options: &ArcOptions,
    ) -> ReconcileSummary {
        let factory = ArcFactory::new(cx.adapter, options);
        reconcile(cx.stage, layer, &input, &factory)
    }
}

pub struct ArcFactory<'a> {
    adapter: &'a ProjectionAdapter,
    options: &'a ArcOptions,
    hover: Option<Rc<HoverConfig>>,
}

impl<'a> ArcFactory<'a> {
    pub fn new(adapter: &'a ProjectionAdapter, options: &'a ArcOptions) -> Self {
        Self {
            adapter,
            options,
            hover: options.hover.config(false).map(Rc::new),
        }
    }

    fn number(&self, datum: &Datum, field: &str, option: Option<&Style<f64>>, fallback: f64) -> f64 {
        resolve_field(field, option, &StyleContext::new(datum)).unwrap_or(fallback)
    }
}

impl PrimitiveFactory for ArcFactory<'_> {
    type Item = Datum;

    /// Connectors are identified by their full content.
    fn key(&self, item: &Datum) -> Key {
        Key::structural(item)
    }

    fn kind(&self, _item: &Datum) -> PrimitiveKind {
        PrimitiveKind::ConnectorPath
    }

    fn attributes(&self, item: &Datum) -> Option<AttrSet> {
        let sharpness = self.number(item, "arcSharpness", self.options.arc_sharpness.as_ref(), 1.0);
        let great_arc = self.options.great_arc.unwrap_or(false);
        let path = arc_path(self.adapter, item, sharpness, great_arc)?;
        let cx = StyleContext::new(item);

        let mut attrs = AttrSet::new()
            .with(Attr::D, path)
            .with(Attr::StrokeLinecap, "round")
            .with(Attr::Fill, "none")
            .with(Attr::Opacity, 1.0);
        attrs.set_opt(
            Attr::Stroke,
            resolve_field("strokeColor", self.options.stroke_color.as_ref(), &cx).map(AttrValue::Text),
        );
        attrs.set_opt(
            Attr::StrokeWidth,
            resolve_field("strokeWidth", self.options.stroke_width.as_ref(), &cx).map(AttrValue::Number),
        );
        Some(attrs)
    }

    /// Draws the stroke in after a short pause.
    fn enter(&self, stage: &mut Stage, id: PrimitiveId, item: &Datum, attrs: AttrSet) {
        stage.set_all(id, attrs);
        let speed = self.number(item, "animationSpeed", self.options.animation_speed.as_ref(), 600.0);
        stage.reveal(
            id,
            Timing::new(speed)
                .with_delay(DRAW_IN_DELAY_MS)
                .with_ease(Ease::CubicOut),
        );
    }

    /// A finished draw-in leaves a dash sized for the old path; it is
    /// dropped so a changed path is fully stroked.
    fn update(&self, stage: &mut Stage, id: PrimitiveId, _item: &Datum, attrs: AttrSet) {
        stage.set_all(id, attrs);
        if !stage.is_animating(id, Attr::StrokeDashoffset) {
            stage.set(id, Attr::StrokeDasharray, None);
            stage.set(id, Attr::StrokeDashoffset, None);
        }
    }

    fn exit(&self, stage: &mut Stage, id: PrimitiveId) {
        stage.exit(id, AttrSet::new().with(Attr::Opacity, 0.0), Timing::default());
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
    use super::ArcsLayer;
    use crate::datum::{Datum, Key};
    use crate::error::EngineError;
    use crate::geometry::{ProjectionAdapter, bezier_arc};
    use crate::options::{ArcOptions, HoverOptions, Overlay};
    use crate::reconcile::ReconcileSummary;
    use crate::registry::{LayerRenderer, RenderContext};
    use crate::stage::Stage;
    use crate::symbology::{Fills, Style};
    use foundation::time::Time;
    use scene::components::{Attr, AttrValue, PathCommand};
    use scene::entity::{LayerId, PrimitiveId};
    use scene::{Equirectangular, LayerPlacement, World};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

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
            let layer = stage.add_layer("arc", LayerPlacement::Top);
            Self {
                stage,
                adapter: ProjectionAdapter::new(Box::new(Equirectangular::fit(800.0, 450.0))),
                fills: Fills::default(),
                filters: BTreeMap::new(),
                layer,
            }
        }

        fn render(&mut self, data: Value, options: &ArcOptions) -> Result<ReconcileSummary, EngineError> {
            let renderer = ArcsLayer::default();
            let input = renderer.parse("arc", data)?;
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

        fn only(&self) -> PrimitiveId {
            let members = self.stage.members(self.layer);
            assert_eq!(members.len(), 1);
            members[0]
        }

        fn number(&self, id: PrimitiveId, attr: Attr) -> Option<f64> {
            self.stage.attr(id, attr).and_then(AttrValue::as_number)
        }
    }

    fn nyc_to_lax() -> Value {
        json!({
            "origin": {"latitude": 40.64, "longitude": -73.77},
            "destination": {"latitude": 33.94, "longitude": -118.40}
        })
    }

    #[test]
    fn bezier_connector_between_coordinates() {
        let mut fx = Fixture::new();
        fx.render(json!([nyc_to_lax()]), &ArcOptions::default()).unwrap();
        let id = fx.only();

        let origin = fx.adapter.lat_lng_to_xy(40.64, -73.77).unwrap();
        let destination = fx.adapter.lat_lng_to_xy(33.94, -118.40).unwrap();
        assert_eq!(
            fx.stage.attr(id, Attr::D),
            Some(&AttrValue::Path(bezier_arc(origin, destination, 1.0)))
        );
        assert_eq!(fx.stage.attr(id, Attr::Fill), Some(&AttrValue::from("none")));
        assert_eq!(fx.stage.attr(id, Attr::StrokeLinecap), Some(&AttrValue::from("round")));
        assert_eq!(fx.stage.attr(id, Attr::Stroke), Some(&AttrValue::from("#DD1C77")));
        assert!(fx.stage.binding(id).is_none());
    }

    #[test]
    fn stroke_draws_in_after_delay() {
        let mut fx = Fixture::new();
        fx.render(json!([nyc_to_lax()]), &ArcOptions::default()).unwrap();
        let id = fx.only();
        let length = fx.stage.world().path_length(id).unwrap();
        assert!(length > 0.0);
        assert_eq!(fx.number(id, Attr::StrokeDashoffset), Some(length));

        fx.stage.advance(Time::from_millis(100.0));
        assert_eq!(fx.number(id, Attr::StrokeDashoffset), Some(length));
        fx.stage.advance(Time::from_millis(400.0));
        let partial = fx.number(id, Attr::StrokeDashoffset).unwrap();
        assert!(partial > 0.0 && partial < length);
        fx.stage.advance(Time::from_millis(700.0));
        assert_eq!(fx.number(id, Attr::StrokeDashoffset), Some(0.0));
    }

    #[test]
    fn nested_options_and_datum_styles_apply() {
        let mut fx = Fixture::new();
        let mut datum = nyc_to_lax();
        datum["options"] = json!({"strokeWidth": 3, "arcSharpness": 0, "animationSpeed": 50});
        fx.render(json!([datum]), &ArcOptions::default()).unwrap();
        let id = fx.only();

        assert_eq!(fx.number(id, Attr::StrokeWidth), Some(3.0));
        let Some(AttrValue::Path(path)) = fx.stage.attr(id, Attr::D) else {
            panic!("expected a path");
        };
        let PathCommand::SmoothCubicTo { ctrl, .. } = path.commands()[1] else {
            panic!("expected a smooth cubic");
        };
        let origin = fx.adapter.lat_lng_to_xy(40.64, -73.77).unwrap();
        let destination = fx.adapter.lat_lng_to_xy(33.94, -118.40).unwrap();
        assert_eq!(ctrl, origin.midpoint(destination));

        let info = fx.stage.info(id).unwrap();
        assert!(!info.contains("options"));
        fx.stage.advance(Time::from_millis(150.0));
        assert_eq!(fx.number(id, Attr::StrokeDashoffset), Some(0.0));
    }

    #[test]
    fn great_arc_follows_the_geodesic() {
        let mut fx = Fixture::new();
        let options = ArcOptions {
            great_arc: Some(true),
            ..ArcOptions::default()
        };
        fx.render(json!([nyc_to_lax()]), &options).unwrap();
        let id = fx.only();
        let Some(AttrValue::Path(path)) = fx.stage.attr(id, Attr::D) else {
            panic!("expected a path");
        };
        assert!(path.commands().len() > 10);
        assert!(path.commands()[1..].iter().all(|c| matches!(c, PathCommand::LineTo(_))));
    }

    #[test]
    fn region_endpoints_use_anchor_table() {
        let mut fx = Fixture::new();
        let summary = fx
            .render(json!([{"origin": "JPN", "destination": "USA"}, {"origin": "JPN", "destination": "ZZZ"}]), &ArcOptions::default())
            .unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn removed_connectors_fade_then_detach() {
        let mut fx = Fixture::new();
        fx.render(json!([nyc_to_lax()]), &ArcOptions::default()).unwrap();
        let id = fx.only();
        let summary = fx.render(json!([]), &ArcOptions::default()).unwrap();
        assert_eq!(summary.removed, 1);
        assert!(!fx.stage.is_animating(id, Attr::StrokeDashoffset));

        fx.stage.advance(Time::from_millis(125.0));
        let opacity = fx.number(id, Attr::Opacity).unwrap();
        assert!(opacity > 0.0 && opacity < 1.0);
        fx.stage.advance(Time::from_millis(250.0));
        assert!(!fx.stage.contains(id));
    }

    #[test]
    fn popup_binding_only_when_enabled() {
        let mut fx = Fixture::new();
        let options = ArcOptions {
            hover: HoverOptions {
                popup_on_hover: Some(true),
                ..HoverOptions::default()
            },
            stroke_color: Some(Style::Fixed("#000".into())),
            ..ArcOptions::default()
        };
        fx.render(json!([nyc_to_lax()]), &options).unwrap();
        let id = fx.only();
        let binding = fx.stage.binding(id).unwrap();
        assert!(binding.config.popup_on_hover);
        assert!(!binding.config.highlight_on_hover);
        assert_eq!(fx.stage.attr(id, Attr::Stroke), Some(&AttrValue::from("#000")));

        let key = Key::structural(&Datum::from_value(nyc_to_lax()).unwrap());
        assert_eq!(fx.stage.lookup(fx.layer, &key), Some(id));
    }
}
