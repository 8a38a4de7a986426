use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use scene::LayerPlacement;
use scene::entity::LayerId;
use serde_json::Value;
use tracing::info;

use crate::error::EngineError;
use crate::geometry::ProjectionAdapter;
use crate::options::Overlay;
use crate::reconcile::ReconcileSummary;
use crate::stage::Stage;
use crate::symbology::Fills;

/// Everything a renderer may touch while drawing one layer.
pub struct RenderContext<'a> {
    pub stage: &'a mut Stage,
    pub adapter: &'a ProjectionAdapter,
    pub fills: &'a Fills,
    pub filters: &'a BTreeMap<String, String>,
    /// The region (subunit) layer, once drawn.
    pub regions: Option<LayerId>,
}

/// A named layer plugin.
pub trait LayerRenderer {
    type Options: Overlay + Clone + 'static;
    type Input: 'static;

    /// Options used for fields the caller leaves unset.
    fn class_defaults(&self) -> &Self::Options;

    /// Validates caller data before anything is created.
    fn parse(&self, name: &str, data: Value) -> Result<Self::Input, EngineError>;

    fn placement(&self, _cx: &RenderContext<'_>) -> LayerPlacement {
        LayerPlacement::Top
    }

    fn render(
        &self,
        cx: &mut RenderContext<'_>,
        layer: LayerId,
        input: Self::Input,
        options: &Self::Options,
    ) -> ReconcileSummary;
}

/// Result of one plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerHandle {
    pub name: String,
    pub layer: LayerId,
    pub summary: ReconcileSummary,
}

struct Prepared {
    input: Box<dyn Any>,
    options: Rc<dyn Any>,
}

trait ErasedRenderer {
    fn erased_prepare(
        &self,
        name: &str,
        data: Value,
        options: Option<Box<dyn Any>>,
        stored: Option<&dyn Any>,
    ) -> Result<Prepared, EngineError>;

    fn erased_placement(&self, cx: &RenderContext<'_>) -> LayerPlacement;

    fn erased_render(&self, cx: &mut RenderContext<'_>, layer: LayerId, prepared: Prepared) -> ReconcileSummary;
}

impl<R: LayerRenderer> ErasedRenderer for R {
    fn erased_prepare(
        &self,
        name: &str,
        data: Value,
        options: Option<Box<dyn Any>>,
        stored: Option<&dyn Any>,
    ) -> Result<Prepared, EngineError> {
        let options: R::Options = match options {
            Some(boxed) => boxed
                .downcast::<R::Options>()
                .map_err(|_| EngineError::OptionsMismatch {
                    layer: name.to_string(),
                })?
                .overlay(self.class_defaults()),
            None => stored
                .and_then(|s| s.downcast_ref::<R::Options>())
                .cloned()
                .unwrap_or_else(|| self.class_defaults().clone()),
        };
        let input = self.parse(name, data)?;
        Ok(Prepared {
            input: Box::new(input),
            options: Rc::new(options),
        })
    }

    fn erased_placement(&self, cx: &RenderContext<'_>) -> LayerPlacement {
        LayerRenderer::placement(self, cx)
    }

    fn erased_render(&self, cx: &mut RenderContext<'_>, layer: LayerId, prepared: Prepared) -> ReconcileSummary {
        let (Ok(input), Some(options)) = (
            prepared.input.downcast::<R::Input>(),
            prepared.options.downcast_ref::<R::Options>(),
        ) else {
            return ReconcileSummary::default();
        };
        LayerRenderer::render(self, cx, layer, *input, options)
    }
}

struct NamedLayer {
    layer: LayerId,
    options: Rc<dyn Any>,
}

/// Name to renderer mapping plus the current layer instance of each name.
#[derive(Default)]
pub struct LayerRegistry {
    renderers: BTreeMap<String, Rc<dyn ErasedRenderer>>,
    layers: BTreeMap<String, NamedLayer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `renderer`. The first registration of a name wins;
    /// later ones return `false` and change nothing.
    pub fn register<R: LayerRenderer + 'static>(&mut self, name: &str, renderer: R) -> bool {
        if self.renderers.contains_key(name) {
            return false;
        }
        self.renderers.insert(name.to_string(), Rc::new(renderer));
        info!(layer = name, "registered layer renderer");
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.renderers.keys().map(String::as_str)
    }

    /// Current layer instance for `name`.
    pub fn layer(&self, name: &str) -> Option<LayerId> {
        self.layers.get(name).map(|l| l.layer)
    }

    /// Runs the renderer registered under `name`.
    ///
    /// Without `create_new_layer` the existing layer is reused and, when no
    /// options are passed, so are the options it was created with. Caller
    /// options are merged over the renderer's class defaults. Data and
    /// option errors abort before any layer is created.
    pub fn invoke(
        &mut self,
        name: &str,
        cx: &mut RenderContext<'_>,
        data: Value,
        options: Option<Box<dyn Any>>,
        create_new_layer: bool,
    ) -> Result<LayerHandle, EngineError> {
        let renderer = self
            .renderers
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownLayer(name.to_string()))?;
        let reuse = if create_new_layer {
            None
        } else {
            self.layers.get(name)
        };
        let prepared = renderer.erased_prepare(name, data, options, reuse.map(|l| l.options.as_ref()))?;
        let reused = reuse.map(|l| l.layer);

        let layer = match reused {
            Some(layer) => layer,
            None => {
                let placement = renderer.erased_placement(cx);
                let layer = cx.stage.add_layer(name, placement);
                info!(layer = name, id = layer.0, "created layer");
                self.layers.insert(
                    name.to_string(),
                    NamedLayer {
                        layer,
                        options: Rc::clone(&prepared.options),
                    },
                );
                layer
            }
        };
        let summary = renderer.erased_render(cx, layer, prepared);
        Ok(LayerHandle {
            name: name.to_string(),
            layer,
            summary,
        })
    }
}

impl std::fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .field(
                "layers",
                &self.layers.iter().map(|(k, v)| (k, v.layer)).collect::<Vec<_>>(),
            )
            .finish()
    }
}
