use std::collections::BTreeMap;

use serde::Deserialize;

use crate::datum::{Datum, KeyFn};
use crate::error::EngineError;
use crate::interaction::{HoverConfig, PopupTemplate};
use crate::symbology::{Fills, Style};

/// Field-wise override merge: caller values win, the rest comes from
/// `defaults`.
pub trait Overlay {
    fn overlay(&self, defaults: &Self) -> Self;
}

macro_rules! overlay_fields {
    ($ty:ty { $($field:ident),* $(,)? } $(nested { $($nested:ident),* $(,)? })?) => {
        impl Overlay for $ty {
            fn overlay(&self, defaults: &Self) -> Self {
                Self {
                    $($field: self.$field.clone().or_else(|| defaults.$field.clone()),)*
                    $($($nested: self.$nested.overlay(&defaults.$nested),)*)?
                }
            }
        }
    };
}

/// Hover behavior shared by every interactive layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HoverOptions {
    pub popup_on_hover: Option<bool>,
    pub highlight_on_hover: Option<bool>,
    pub highlight_fill_color: Option<Style<String>>,
    pub highlight_border_color: Option<Style<String>>,
    pub highlight_border_width: Option<Style<f64>>,
    pub highlight_border_opacity: Option<Style<f64>>,
    pub highlight_fill_opacity: Option<Style<f64>>,
    #[serde(skip)]
    pub popup_template: Option<PopupTemplate>,
}

overlay_fields!(HoverOptions {
    popup_on_hover,
    highlight_on_hover,
    highlight_fill_color,
    highlight_border_color,
    highlight_border_width,
    highlight_border_opacity,
    highlight_fill_opacity,
    popup_template,
});

impl HoverOptions {
    fn highlight_defaults() -> Self {
        Self {
            popup_on_hover: Some(true),
            highlight_on_hover: Some(true),
            highlight_fill_color: Some(Style::Fixed("#FC8D59".into())),
            highlight_border_color: Some(Style::Fixed("rgba(250, 15, 160, 0.2)".into())),
            highlight_border_width: Some(Style::Fixed(2.0)),
            highlight_border_opacity: Some(Style::Fixed(1.0)),
            highlight_fill_opacity: None,
            popup_template: None,
        }
    }

    /// Resolved switches and styles; `None` when the layer is not interactive.
    pub fn config(&self, raise_on_highlight: bool) -> Option<HoverConfig> {
        let popup = self.popup_on_hover.unwrap_or(false);
        let highlight = self.highlight_on_hover.unwrap_or(false);
        if !popup && !highlight {
            return None;
        }
        Some(HoverConfig {
            popup_on_hover: popup,
            highlight_on_hover: highlight,
            raise_on_highlight,
            highlight_fill_color: self.highlight_fill_color.clone(),
            highlight_border_color: self.highlight_border_color.clone(),
            highlight_border_width: self.highlight_border_width.clone(),
            highlight_border_opacity: self.highlight_border_opacity.clone(),
            highlight_fill_opacity: self.highlight_fill_opacity.clone(),
            popup_template: self.popup_template.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeographyOptions {
    pub hide_antarctica: Option<bool>,
    pub hide_hawaii_and_alaska: Option<bool>,
    pub border_width: Option<Style<f64>>,
    pub border_opacity: Option<Style<f64>>,
    pub border_color: Option<Style<String>>,
    #[serde(flatten)]
    pub hover: HoverOptions,
}

overlay_fields!(GeographyOptions {
    hide_antarctica,
    hide_hawaii_and_alaska,
    border_width,
    border_opacity,
    border_color,
} nested { hover });

impl GeographyOptions {
    pub fn class_defaults() -> Self {
        Self {
            hide_antarctica: Some(true),
            hide_hawaii_and_alaska: Some(false),
            border_width: Some(Style::Fixed(1.0)),
            border_opacity: Some(Style::Fixed(1.0)),
            border_color: Some(Style::Fixed("#FDFDFD".into())),
            hover: HoverOptions {
                popup_template: Some(PopupTemplate::region_name()),
                ..HoverOptions::highlight_defaults()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BubbleOptions {
    pub radius: Option<Style<f64>>,
    pub fill_key: Option<Style<String>>,
    pub filter_key: Option<Style<String>>,
    pub fill_opacity: Option<Style<f64>>,
    pub border_width: Option<Style<f64>>,
    pub border_opacity: Option<Style<f64>>,
    pub border_color: Option<Style<String>>,
    pub animate: Option<bool>,
    pub exit_delay: Option<f64>,
    #[serde(skip)]
    pub key: Option<KeyFn>,
    #[serde(flatten)]
    pub hover: HoverOptions,
}

overlay_fields!(BubbleOptions {
    radius,
    fill_key,
    filter_key,
    fill_opacity,
    border_width,
    border_opacity,
    border_color,
    animate,
    exit_delay,
    key,
} nested { hover });

impl BubbleOptions {
    pub fn class_defaults() -> Self {
        Self {
            radius: None,
            fill_key: None,
            filter_key: None,
            fill_opacity: Some(Style::Fixed(0.75)),
            border_width: Some(Style::Fixed(2.0)),
            border_opacity: Some(Style::Fixed(1.0)),
            border_color: Some(Style::Fixed("#FFFFFF".into())),
            animate: Some(true),
            exit_delay: Some(100.0),
            key: Some(KeyFn::structural()),
            hover: HoverOptions {
                highlight_fill_opacity: Some(Style::Fixed(0.85)),
                popup_template: Some(PopupTemplate::datum_name()),
                ..HoverOptions::highlight_defaults()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArcOptions {
    pub stroke_color: Option<Style<String>>,
    pub stroke_width: Option<Style<f64>>,
    pub arc_sharpness: Option<Style<f64>>,
    pub animation_speed: Option<Style<f64>>,
    pub great_arc: Option<bool>,
    #[serde(flatten)]
    pub hover: HoverOptions,
}

overlay_fields!(ArcOptions {
    stroke_color,
    stroke_width,
    arc_sharpness,
    animation_speed,
    great_arc,
} nested { hover });

impl ArcOptions {
    pub fn class_defaults() -> Self {
        Self {
            stroke_color: Some(Style::Fixed("#DD1C77".into())),
            stroke_width: Some(Style::Fixed(1.0)),
            arc_sharpness: Some(Style::Fixed(1.0)),
            animation_speed: Some(Style::Fixed(600.0)),
            great_arc: Some(false),
            hover: HoverOptions {
                popup_on_hover: Some(false),
                highlight_on_hover: Some(false),
                popup_template: Some(PopupTemplate::arc_endpoints()),
                ..HoverOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelOptions {
    pub label_color: Option<String>,
    pub line_width: Option<f64>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub custom_label_text: Option<BTreeMap<String, String>>,
}

overlay_fields!(LabelOptions {
    label_color,
    line_width,
    font_size,
    font_family,
    custom_label_text,
});

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraticuleOptions {
    /// Degrees between adjacent meridians and parallels.
    pub step: Option<f64>,
    /// Sampling interval along each line, in degrees.
    pub precision: Option<f64>,
}

overlay_fields!(GraticuleOptions { step, precision });

impl GraticuleOptions {
    pub fn class_defaults() -> Self {
        Self {
            step: Some(10.0),
            precision: Some(2.5),
        }
    }
}

/// Map-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapOptions {
    pub scope: String,
    pub projection: String,
    pub width: f64,
    pub height: f64,
    /// Scale layers to the container on [`resize`](crate::OverlayMap::resize).
    pub responsive: bool,
    /// Height over width of a responsive container.
    pub aspect_ratio: f64,
    pub fills: Fills,
    pub filters: BTreeMap<String, String>,
    /// Initial per-region data, keyed by region id.
    pub data: BTreeMap<String, Datum>,
    pub geography_config: GeographyOptions,
    pub bubbles_config: BubbleOptions,
    pub arc_config: ArcOptions,
    pub labels_config: LabelOptions,
    pub graticule_config: GraticuleOptions,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            scope: "world".to_string(),
            projection: "equirectangular".to_string(),
            width: 800.0,
            height: 450.0,
            responsive: false,
            aspect_ratio: 0.5625,
            fills: Fills::default(),
            filters: BTreeMap::new(),
            data: BTreeMap::new(),
            geography_config: GeographyOptions::default(),
            bubbles_config: BubbleOptions::default(),
            arc_config: ArcOptions::default(),
            labels_config: LabelOptions::default(),
            graticule_config: GraticuleOptions::default(),
        }
    }
}

impl MapOptions {
    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text)
            .map_err(|e| EngineError::Configuration(format!("invalid map options: {e}")))
    }

    /// Every per-layer section merged over its class defaults.
    pub fn with_class_defaults(&self) -> Self {
        Self {
            fills: self.fills.merged_over(&Fills::default()),
            geography_config: self
                .geography_config
                .overlay(&GeographyOptions::class_defaults()),
            bubbles_config: self.bubbles_config.overlay(&BubbleOptions::class_defaults()),
            arc_config: self.arc_config.overlay(&ArcOptions::class_defaults()),
            labels_config: self.labels_config.clone(),
            graticule_config: self
                .graticule_config
                .overlay(&GraticuleOptions::class_defaults()),
            ..self.clone()
        }
    }
}
