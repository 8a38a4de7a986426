use std::fmt;
use std::rc::Rc;

use foundation::math::Vec2;
use scene::RegionFeature;
use scene::components::{Attr, AttrValue, HoverSnapshot};
use scene::entity::PrimitiveId;
use serde_json::Value;
use tracing::warn;

use crate::datum::Datum;
use crate::error::TemplateError;
use crate::stage::Stage;
use crate::symbology::{Style, StyleContext, resolve_field};

/// Vertical distance between the pointer and the tooltip.
pub const POPUP_OFFSET_Y: f64 = 30.0;

/// Attributes captured on hover-enter and restored on hover-exit.
pub const HIGHLIGHT_ATTRS: [Attr; 5] = [
    Attr::Fill,
    Attr::Stroke,
    Attr::StrokeWidth,
    Attr::StrokeOpacity,
    Attr::FillOpacity,
];

/// Arguments of a popup template: the hovered region (region layers only)
/// and the primitive's current data record.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub geography: Option<&'a RegionFeature>,
    pub data: &'a Datum,
}

#[derive(Clone)]
pub struct PopupTemplate(Rc<dyn Fn(&TemplateContext<'_>) -> Result<String, TemplateError>>);

impl PopupTemplate {
    pub fn new(f: impl Fn(&TemplateContext<'_>) -> Result<String, TemplateError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn render(&self, cx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        (self.0)(cx)
    }

    /// `<strong>` region name.
    pub fn region_name() -> Self {
        Self::new(|cx| {
            let name = cx
                .geography
                .and_then(RegionFeature::name)
                .ok_or_else(|| TemplateError("region has no name".into()))?;
            Ok(format!("<div class=\"hoverinfo\"><strong>{name}</strong></div>"))
        })
    }

    /// `<strong>` datum `name` field.
    pub fn datum_name() -> Self {
        Self::new(|cx| {
            let name = match cx.data.get("name") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(TemplateError("datum has no name".into())),
            };
            Ok(format!("<div class=\"hoverinfo\"><strong>{name}</strong></div>"))
        })
    }

    /// Origin and destination of a connector: coordinates as JSON, region
    /// ids as `A -> B`, nothing otherwise.
    pub fn arc_endpoints() -> Self {
        Self::new(|cx| {
            let (Some(origin), Some(destination)) = (cx.data.get("origin"), cx.data.get("destination"))
            else {
                return Ok(String::new());
            };
            let has_coords = |v: &Value| v.get("latitude").is_some() && v.get("longitude").is_some();
            if has_coords(origin) && has_coords(destination) {
                return Ok(format!(
                    "<div class=\"hoverinfo\"><strong>Arc</strong><br>Origin: {origin}<br>Destination: {destination}</div>"
                ));
            }
            let text = |v: &Value| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(format!(
                "<div class=\"hoverinfo\"><strong>Arc</strong><br>{} -> {}</div>",
                text(origin),
                text(destination)
            ))
        })
    }
}

impl fmt::Debug for PopupTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PopupTemplate(..)")
    }
}

/// Resolved hover behavior of one layer invocation.
#[derive(Debug, Clone)]
pub struct HoverConfig {
    pub popup_on_hover: bool,
    pub highlight_on_hover: bool,
    /// Promote the highlighted primitive to the top of its layer.
    pub raise_on_highlight: bool,
    pub highlight_fill_color: Option<Style<String>>,
    pub highlight_border_color: Option<Style<String>>,
    pub highlight_border_width: Option<Style<f64>>,
    pub highlight_border_opacity: Option<Style<f64>>,
    pub highlight_fill_opacity: Option<Style<f64>>,
    pub popup_template: Option<PopupTemplate>,
}

impl HoverConfig {
    fn highlight_values(&self, cx: &StyleContext<'_>) -> [(Attr, Option<AttrValue>); 5] {
        let text = |field: &str, style: &Option<Style<String>>| {
            resolve_field(field, style.as_ref(), cx).map(AttrValue::Text)
        };
        let number = |field: &str, style: &Option<Style<f64>>| {
            resolve_field(field, style.as_ref(), cx).map(AttrValue::Number)
        };
        [
            (Attr::Fill, text("highlightFillColor", &self.highlight_fill_color)),
            (Attr::Stroke, text("highlightBorderColor", &self.highlight_border_color)),
            (
                Attr::StrokeWidth,
                number("highlightBorderWidth", &self.highlight_border_width),
            ),
            (
                Attr::StrokeOpacity,
                number("highlightBorderOpacity", &self.highlight_border_opacity),
            ),
            (
                Attr::FillOpacity,
                number("highlightFillOpacity", &self.highlight_fill_opacity),
            ),
        ]
    }
}

/// Hover handlers attached to one primitive.
#[derive(Debug, Clone)]
pub struct HoverBinding {
    pub geography: Option<Rc<RegionFeature>>,
    pub config: Rc<HoverConfig>,
}

/// The single positioned popup of a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tooltip {
    pub visible: bool,
    pub content: String,
    pub position: Vec2,
    /// Primitive whose pointer-move handler currently feeds the tooltip.
    pub owner: Option<PrimitiveId>,
}

impl Tooltip {
    pub(crate) fn hide(&mut self) {
        self.visible = false;
        self.owner = None;
    }
}

impl Stage {
    /// `Idle -> Highlighted`. Re-entering a highlighted primitive keeps the
    /// first snapshot and only refreshes the tooltip.
    pub fn hover_enter(&mut self, id: PrimitiveId, pointer: Vec2) -> bool {
        let Some(binding) = self.bindings.get(&id).cloned() else {
            return false;
        };
        let config = &binding.config;
        let info = self.info(id).cloned().unwrap_or_default();

        if config.highlight_on_hover {
            let already = self
                .world
                .primitive(id)
                .is_some_and(|p| p.is_highlighted());
            if !already {
                let Some(primitive) = self.world.primitive(id) else {
                    return false;
                };
                let snapshot = HoverSnapshot::capture(primitive.attrs(), &HIGHLIGHT_ATTRS);
                let cx = StyleContext {
                    datum: &info,
                    geography: binding.geography.as_deref(),
                };
                let values = config.highlight_values(&cx);
                self.world.set_snapshot(id, snapshot);
                for (attr, value) in values {
                    self.world.set_attr(id, attr, value);
                }
                if config.raise_on_highlight {
                    self.world.raise(id);
                }
            }
        }

        if config.popup_on_hover {
            self.tooltip.owner = Some(id);
            self.tooltip.visible = true;
            self.refresh_tooltip(id, pointer, &binding, &info);
        }
        true
    }

    /// Regenerates tooltip content and position. Ignored unless `id` owns
    /// the tooltip.
    pub fn pointer_move(&mut self, id: PrimitiveId, pointer: Vec2) -> bool {
        if self.tooltip.owner != Some(id) {
            return false;
        }
        let Some(binding) = self.bindings.get(&id).cloned() else {
            return false;
        };
        let info = self.info(id).cloned().unwrap_or_default();
        self.refresh_tooltip(id, pointer, &binding, &info);
        true
    }

    /// `Highlighted -> Idle`: restores the snapshot verbatim and hides the
    /// tooltip.
    pub fn hover_exit(&mut self, id: PrimitiveId) -> bool {
        let restored = match self.world.take_snapshot(id) {
            Some(snapshot) => {
                for (attr, value) in snapshot.into_values() {
                    self.world.set_attr(id, attr, value);
                }
                true
            }
            None => false,
        };
        self.tooltip.hide();
        restored
    }

    fn refresh_tooltip(&mut self, id: PrimitiveId, pointer: Vec2, binding: &HoverBinding, info: &Datum) {
        let content = match &binding.config.popup_template {
            Some(template) => {
                let cx = TemplateContext {
                    geography: binding.geography.as_deref(),
                    data: info,
                };
                template.render(&cx).unwrap_or_else(|e| {
                    warn!(primitive = id.index(), "{e}; showing empty tooltip");
                    String::new()
                })
            }
            None => String::new(),
        };
        self.tooltip.content = content;
        self.tooltip.position = Vec2::new(pointer.x, pointer.y + POPUP_OFFSET_Y);
    }
}
