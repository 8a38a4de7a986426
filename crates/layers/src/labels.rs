use foundation::math::{LngLat, Vec2};
use scene::components::{Attr, AttrSet, PrimitiveKind};
use scene::entity::LayerId;
use serde_json::Value;

use crate::datum::Key;
use crate::error::EngineError;
use crate::geometry::ProjectionAdapter;
use crate::options::LabelOptions;
use crate::reconcile::{PrimitiveFactory, ReconcileSummary, reconcile};
use crate::registry::{LayerRenderer, RenderContext};

/// Regions too small to hold their label; their labels are stacked off
/// the coast and joined to the region by a leader line.
pub const SMALL_REGIONS: [&str; 9] = ["VT", "NH", "MA", "RI", "CT", "NJ", "DE", "MD", "DC"];

/// Where the stacked labels start.
pub const STACK_ANCHOR: LngLat = LngLat {
    lng: -67.707617,
    lat: 42.722131,
};

/// One region label or one leader line.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelItem {
    Text {
        region: String,
        at: Option<Vec2>,
        text: String,
    },
    Leader {
        region: String,
        from: Option<Vec2>,
        to: Option<Vec2>,
    },
}

/// Offset subtracted from x and added to y of the region centroid.
fn label_offset(region: &str) -> (f64, f64) {
    let mut dx = 7.5;
    let mut dy = 5.0;
    if matches!(region, "FL" | "KY" | "MI") {
        dx = -2.5;
    }
    if region == "NY" {
        dx = -1.0;
    }
    if region == "MI" {
        dy = 18.0;
    }
    if region == "LA" {
        dx = 13.0;
    }
    (dx, dy)
}

fn label_text(region: &str, options: &LabelOptions) -> String {
    options
        .custom_label_text
        .as_ref()
        .and_then(|texts| texts.get(region))
        .map(String::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or(region)
        .to_string()
}

/// Text and leader items for every drawn region, in draw order.
pub fn layout_labels(adapter: &ProjectionAdapter, options: &LabelOptions) -> Vec<LabelItem> {
    let stack = adapter.project(STACK_ANCHOR);
    let line_height = 2.0 + options.font_size.unwrap_or(12.0);

    let mut items = Vec::new();
    for feature in adapter.features() {
        let region = feature.id.as_str();
        let center = adapter.centroid_of(region);
        let small = SMALL_REGIONS.iter().position(|r| *r == region);
        let at = match small {
            Some(index) => stack.map(|s| Vec2::new(s.x, s.y + index as f64 * line_height)),
            None => center.map(|c| {
                let (dx, dy) = label_offset(region);
                Vec2::new(c.x - dx, c.y + dy)
            }),
        };
        if small.is_some() {
            items.push(LabelItem::Leader {
                region: region.to_string(),
                from: at.map(|p| Vec2::new(p.x - 3.0, p.y - 5.0)),
                to: center,
            });
        }
        items.push(LabelItem::Text {
            region: region.to_string(),
            at,
            text: label_text(region, options),
        });
    }
    items
}

/// Region labels. Takes no data; labels follow the drawn regions.
#[derive(Debug, Clone, Default)]
pub struct LabelsLayer {
    defaults: LabelOptions,
}

impl LabelsLayer {
    pub fn new(defaults: LabelOptions) -> Self {
        Self { defaults }
    }
}

impl LayerRenderer for LabelsLayer {
    type Options = LabelOptions;
    type Input = ();

    fn class_defaults(&self) -> &LabelOptions {
        &self.defaults
    }

    fn parse(&self, _name: &str, _data: Value) -> Result<(), EngineError> {
        Ok(())
    }

    fn render(
        &self,
        cx: &mut RenderContext<'_>,
        layer: LayerId,
        _input: (),
        options: &LabelOptions,
    ) -> ReconcileSummary {
        let items = layout_labels(cx.adapter, options);
        reconcile(cx.stage, layer, &items, &LabelFactory { options })
    }
}

struct LabelFactory<'a> {
    options: &'a LabelOptions,
}

impl LabelFactory<'_> {
    fn color(&self) -> String {
        self.options.label_color.clone().unwrap_or_else(|| "#000".to_string())
    }
}

impl PrimitiveFactory for LabelFactory<'_> {
    type Item = LabelItem;

    fn key(&self, item: &LabelItem) -> Key {
        match item {
            LabelItem::Text { region, .. } => Key::new(format!("text:{region}")),
            LabelItem::Leader { region, .. } => Key::new(format!("line:{region}")),
        }
    }

    fn kind(&self, item: &LabelItem) -> PrimitiveKind {
        match item {
            LabelItem::Text { .. } => PrimitiveKind::Text,
            LabelItem::Leader { .. } => PrimitiveKind::Line,
        }
    }

    fn attributes(&self, item: &LabelItem) -> Option<AttrSet> {
        match item {
            LabelItem::Text { at, text, .. } => {
                let at = (*at)?;
                Some(
                    AttrSet::new()
                        .with(Attr::X, at.x)
                        .with(Attr::Y, at.y)
                        .with(
                            Attr::FontSize,
                            format!("{}px", self.options.font_size.unwrap_or(10.0)),
                        )
                        .with(
                            Attr::FontFamily,
                            self.options.font_family.as_deref().unwrap_or("Verdana"),
                        )
                        .with(Attr::Fill, self.color())
                        .with(Attr::Text, text.as_str()),
                )
            }
            LabelItem::Leader { from, to, .. } => {
                let (from, to) = ((*from)?, (*to)?);
                Some(
                    AttrSet::new()
                        .with(Attr::X1, from.x)
                        .with(Attr::Y1, from.y)
                        .with(Attr::X2, to.x)
                        .with(Attr::Y2, to.y)
                        .with(Attr::Stroke, self.color())
                        .with(Attr::StrokeWidth, self.options.line_width.unwrap_or(1.0)),
                )
            }
        }
    }
}
