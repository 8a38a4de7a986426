use std::collections::BTreeMap;
use std::rc::Rc;

use runtime::Timing;
use scene::RegionFeature;
use scene::components::{Attr, AttrSet, AttrValue, PrimitiveKind};
use scene::entity::LayerId;
use serde_json::Value;
use tracing::{debug, warn};

use crate::datum::{Datum, Key};
use crate::error::{EngineError, json_kind};
use crate::geometry::ProjectionAdapter;
use crate::interaction::{HoverBinding, HoverConfig};
use crate::options::GeographyOptions;
use crate::reconcile::{PrimitiveFactory, ReconcileSummary, reconcile};
use crate::stage::Stage;
use crate::symbology::{Fills, StyleContext, resolve_field};

/// Layer class of the choropleth subunits.
pub const REGION_CLASS: &str = "datamaps-subunits";

/// Regions dropped by the geography options, honoring `hideAntarctica`
/// and `hideHawaiiAndAlaska`.
pub fn visible_regions(
    features: impl IntoIterator<Item = Rc<RegionFeature>>,
    options: &GeographyOptions,
) -> Vec<Rc<RegionFeature>> {
    let hide_antarctica = options.hide_antarctica.unwrap_or(true);
    let hide_hawaii_and_alaska = options.hide_hawaii_and_alaska.unwrap_or(false);
    features
        .into_iter()
        .filter(|f| !(hide_antarctica && f.id == "ATA"))
        .filter(|f| !(hide_hawaii_and_alaska && (f.id == "HI" || f.id == "AK")))
        .collect()
}

/// `fills[fillKey]`, else `fillColor`, else the default fill.
pub fn region_fill(fills: &Fills, data: Option<&Datum>) -> String {
    data.and_then(|d| d.str("fillKey").and_then(|k| fills.get(k)).or_else(|| d.str("fillColor")))
        .unwrap_or_else(|| fills.default_fill())
        .to_string()
}

pub struct RegionItem {
    pub feature: Rc<RegionFeature>,
    pub data: Option<Datum>,
}

pub struct RegionFactory<'a> {
    adapter: &'a ProjectionAdapter,
    fills: &'a Fills,
    options: &'a GeographyOptions,
    hover: Option<Rc<HoverConfig>>,
}

impl<'a> RegionFactory<'a> {
    pub fn new(adapter: &'a ProjectionAdapter, fills: &'a Fills, options: &'a GeographyOptions) -> Self {
        Self {
            adapter,
            fills,
            options,
            hover: options.hover.config(true).map(Rc::new),
        }
    }
}

impl PrimitiveFactory for RegionFactory<'_> {
    type Item = RegionItem;

    fn key(&self, item: &RegionItem) -> Key {
        Key::new(item.feature.id.as_str())
    }

    fn kind(&self, _item: &RegionItem) -> PrimitiveKind {
        PrimitiveKind::RegionPath
    }

    fn attributes(&self, item: &RegionItem) -> Option<AttrSet> {
        let path = self.adapter.path_for(&item.feature.geometry)?;
        let empty = Datum::new();
        let datum = item.data.as_ref().unwrap_or(&empty);
        let cx = StyleContext::with_geography(datum, &item.feature);

        let mut attrs = AttrSet::new()
            .with(Attr::D, path)
            .with(Attr::Fill, region_fill(self.fills, item.data.as_ref()));
        attrs.set_opt(
            Attr::StrokeWidth,
            resolve_field("borderWidth", self.options.border_width.as_ref(), &cx).map(AttrValue::Number),
        );
        attrs.set_opt(
            Attr::StrokeOpacity,
            resolve_field("borderOpacity", self.options.border_opacity.as_ref(), &cx).map(AttrValue::Number),
        );
        attrs.set_opt(
            Attr::Stroke,
            resolve_field("borderColor", self.options.border_color.as_ref(), &cx).map(AttrValue::Text),
        );
        Some(attrs)
    }

    fn info(&self, item: &RegionItem) -> Option<Datum> {
        Some(item.data.clone().unwrap_or_default())
    }

    fn binding(&self, item: &RegionItem) -> Option<HoverBinding> {
        self.hover.as_ref().map(|config| HoverBinding {
            geography: Some(Rc::clone(&item.feature)),
            config: Rc::clone(config),
        })
    }
}

/// Reconciles one region primitive per drawn feature, keyed by region id.
pub fn draw_regions(
    stage: &mut Stage,
    layer: LayerId,
    adapter: &ProjectionAdapter,
    data: &BTreeMap<String, Datum>,
    fills: &Fills,
    options: &GeographyOptions,
) -> ReconcileSummary {
    let items: Vec<RegionItem> = adapter
        .features()
        .map(|feature| RegionItem {
            feature: Rc::clone(feature),
            data: data.get(&feature.id).cloned(),
        })
        .collect();
    reconcile(stage, layer, &items, &RegionFactory::new(adapter, fills, options))
}

/// Recolors regions from a mapping of region id to a color string or to an
/// object with `color`, `fillColor` or `fillKey`.
///
/// Object values are merged into the stored region data, new fields first.
/// `reset` clears all stored data and fades every region back to the
/// default fill before the updates apply. Returns how many regions were
/// recolored.
pub fn update_styles(
    stage: &mut Stage,
    layer: LayerId,
    data: &mut BTreeMap<String, Datum>,
    fills: &Fills,
    updates: &Value,
    reset: bool,
) -> Result<usize, EngineError> {
    let Value::Object(updates) = updates else {
        return Err(EngineError::InputShape {
            layer: REGION_CLASS.to_string(),
            expected: "an object keyed by region id",
            found: json_kind(updates).to_string(),
        });
    };

    if reset {
        data.clear();
        for (_, id) in stage.entries(layer) {
            stage.set_info(id, Datum::new());
            stage.animate(
                id,
                Attr::Fill,
                Some(AttrValue::from(fills.default_fill())),
                Timing::default(),
            );
        }
    }

    let mut recolored = 0;
    for (region, value) in updates {
        if region.is_empty() {
            continue;
        }
        let color = match value {
            Value::String(color) => Some(color.as_str()),
            Value::Object(fields) => fields
                .get("color")
                .and_then(Value::as_str)
                .or_else(|| fields.get("fillColor").and_then(Value::as_str))
                .or_else(|| fields.get("fillKey").and_then(Value::as_str).and_then(|k| fills.get(k))),
            _ => None,
        };
        let id = stage.lookup(layer, &Key::new(region.as_str()));

        if let Value::Object(fields) = value {
            let mut merged = Datum::from_map(fields.clone());
            if let Some(previous) = data.get(region) {
                merged.defaults_from(previous);
            }
            if let Some(id) = id {
                stage.set_info(id, merged.clone());
            }
            data.insert(region.clone(), merged);
        }

        let Some(id) = id else {
            warn!(region = region.as_str(), "style update names a region that is not drawn");
            continue;
        };
        let Some(color) = color else {
            warn!(region = region.as_str(), "style update carries no usable color");
            continue;
        };
        stage.animate(id, Attr::Fill, Some(AttrValue::from(color)), Timing::default());
        recolored += 1;
    }

    debug!(layer = layer.0, recolored, reset, "updated region styles");
    Ok(recolored)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::{REGION_CLASS, draw_regions, region_fill, update_styles, visible_regions};
    use crate::datum::{Datum, Key};
    use crate::error::EngineError;
    use crate::geometry::ProjectionAdapter;
    use crate::options::GeographyOptions;
    use crate::stage::Stage;
    use crate::symbology::Fills;
    use foundation::math::LngLat;
    use foundation::time::Time;
    use pretty_assertions::assert_eq;
    use scene::components::{Attr, AttrValue};
    use scene::entity::LayerId;
    use scene::{Equirectangular, GeoGeometry, LayerPlacement, RegionFeature, World};
    use serde_json::json;

    fn square(id: &str, lng: f64, lat: f64) -> Rc<RegionFeature> {
        let ring = vec![
            LngLat::new(lng, lat),
            LngLat::new(lng + 5.0, lat),
            LngLat::new(lng + 5.0, lat + 5.0),
            LngLat::new(lng, lat + 5.0),
            LngLat::new(lng, lat),
        ];
        Rc::new(RegionFeature::new(id, GeoGeometry::Polygon(vec![ring])).with_property("name", id))
    }

    fn fills() -> Fills {
        Fills::default().with("HIGH", "#f00").with("LOW", "#00f")
    }

    struct Fixture {
        stage: Stage,
        layer: LayerId,
        data: BTreeMap<String, Datum>,
    }

    fn drawn(data: serde_json::Value) -> Fixture {
        let options = GeographyOptions::class_defaults();
        let mut adapter = ProjectionAdapter::new(Box::new(Equirectangular::fit(800.0, 450.0)));
        adapter.set_features(visible_regions(
            vec![square("USA", -100.0, 35.0), square("CAN", -110.0, 55.0), square("ATA", 0.0, -80.0)],
            &options,
        ));
        let data: BTreeMap<String, Datum> = serde_json::from_value(data).unwrap();
        let mut stage = Stage::new(World::headless());
        let layer = stage.add_layer(REGION_CLASS, LayerPlacement::Top);
        draw_regions(&mut stage, layer, &adapter, &data, &fills(), &options);
        Fixture { stage, layer, data }
    }

    fn fill(fx: &Fixture, region: &str) -> Option<String> {
        let id = fx.stage.lookup(fx.layer, &Key::from(region))?;
        fx.stage.attr(id, Attr::Fill).and_then(AttrValue::as_text).map(str::to_string)
    }

    fn settle(fx: &mut Fixture) {
        fx.stage.advance(Time::from_millis(1_000.0));
    }

    #[test]
    fn hides_antarctica_and_optionally_hawaii_alaska() {
        let features = vec![square("ATA", 0.0, -80.0), square("HI", -155.0, 20.0), square("TX", -100.0, 30.0)];
        let ids = |options: &GeographyOptions| -> Vec<String> {
            visible_regions(features.clone(), options)
                .iter()
                .map(|f| f.id.clone())
                .collect()
        };
        assert_eq!(ids(&GeographyOptions::class_defaults()), vec!["HI", "TX"]);
        let options = GeographyOptions {
            hide_antarctica: Some(false),
            hide_hawaii_and_alaska: Some(true),
            ..GeographyOptions::class_defaults()
        };
        assert_eq!(ids(&options), vec!["ATA", "TX"]);
    }

    #[test]
    fn fill_prefers_fill_key_then_fill_color() {
        let fills = fills();
        let keyed = Datum::from_value(json!({"fillKey": "HIGH", "fillColor": "#123"})).unwrap();
        let colored = Datum::from_value(json!({"fillKey": "MISSING", "fillColor": "#123"})).unwrap();
        assert_eq!(region_fill(&fills, Some(&keyed)), "#f00");
        assert_eq!(region_fill(&fills, Some(&colored)), "#123");
        assert_eq!(region_fill(&fills, None), "#ABDDA4");
    }

    #[test]
    fn draw_applies_data_borders_and_hover() {
        let fx = drawn(json!({"USA": {"fillKey": "HIGH"}}));
        assert_eq!(fx.stage.members(fx.layer).len(), 2);
        assert_eq!(fill(&fx, "USA").as_deref(), Some("#f00"));
        assert_eq!(fill(&fx, "CAN").as_deref(), Some("#ABDDA4"));

        let usa = fx.stage.lookup(fx.layer, &Key::from("USA")).unwrap();
        assert_eq!(fx.stage.attr(usa, Attr::Stroke), Some(&AttrValue::from("#FDFDFD")));
        assert_eq!(fx.stage.attr(usa, Attr::StrokeWidth), Some(&AttrValue::Number(1.0)));
        assert_eq!(fx.stage.info(usa).and_then(|d| d.str("fillKey")), Some("HIGH"));
        let binding = fx.stage.binding(usa).unwrap();
        assert!(binding.config.raise_on_highlight);
        assert_eq!(binding.geography.as_ref().map(|g| g.id.as_str()), Some("USA"));
    }

    #[test]
    fn string_update_recolors_only_named_region() {
        let mut fx = drawn(json!({}));
        let count = update_styles(
            &mut fx.stage,
            fx.layer,
            &mut fx.data,
            &fills(),
            &json!({"USA": "#FF0000"}),
            false,
        )
        .unwrap();
        settle(&mut fx);
        assert_eq!(count, 1);
        assert_eq!(fill(&fx, "USA").as_deref(), Some("#FF0000"));
        assert_eq!(fill(&fx, "CAN").as_deref(), Some("#ABDDA4"));
        assert!(fx.data.is_empty());
    }

    #[test]
    fn object_update_merges_into_stored_data() {
        let mut fx = drawn(json!({"USA": {"fillKey": "HIGH", "electoral": 270}}));
        update_styles(
            &mut fx.stage,
            fx.layer,
            &mut fx.data,
            &fills(),
            &json!({"USA": {"fillKey": "LOW"}}),
            false,
        )
        .unwrap();
        settle(&mut fx);
        assert_eq!(fill(&fx, "USA").as_deref(), Some("#00f"));
        assert_eq!(fx.data["USA"].str("fillKey"), Some("LOW"));
        assert_eq!(fx.data["USA"].number("electoral"), Some(270.0));
        let usa = fx.stage.lookup(fx.layer, &Key::from("USA")).unwrap();
        assert_eq!(fx.stage.info(usa).and_then(|d| d.number("electoral")), Some(270.0));
    }

    #[test]
    fn reset_reverts_every_fill_and_clears_data() {
        let mut fx = drawn(json!({"USA": {"fillKey": "HIGH"}, "CAN": {"fillColor": "#0f0"}}));
        update_styles(&mut fx.stage, fx.layer, &mut fx.data, &fills(), &json!({}), true).unwrap();
        settle(&mut fx);
        assert_eq!(fill(&fx, "USA").as_deref(), Some("#ABDDA4"));
        assert_eq!(fill(&fx, "CAN").as_deref(), Some("#ABDDA4"));
        assert!(fx.data.is_empty());
        let can = fx.stage.lookup(fx.layer, &Key::from("CAN")).unwrap();
        assert_eq!(fx.stage.info(can), Some(&Datum::new()));
    }

    #[test]
    fn unknown_regions_and_bad_values_are_skipped() {
        let mut fx = drawn(json!({}));
        let count = update_styles(
            &mut fx.stage,
            fx.layer,
            &mut fx.data,
            &fills(),
            &json!({"FRA": "#fff", "USA": 7, "CAN": {"fillKey": "NOPE"}}),
            false,
        )
        .unwrap();
        assert_eq!(count, 0);
        assert!(fx.data.contains_key("CAN"));
    }

    #[test]
    fn non_object_update_is_rejected() {
        let mut fx = drawn(json!({}));
        let err = update_styles(&mut fx.stage, fx.layer, &mut fx.data, &fills(), &json!(["USA"]), false)
            .unwrap_err();
        assert!(matches!(err, EngineError::InputShape { found, .. } if found == "an array"));
    }
}
