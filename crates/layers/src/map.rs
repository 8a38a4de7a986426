use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::math::Vec2;
use foundation::time::Time;
use runtime::Frame;
use scene::entity::{LayerId, PrimitiveId};
use scene::{DrawingBackend, LayerPlacement, Projection, RegionFeature, World, fitted_projection};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::arcs::ArcsLayer;
use crate::bubbles::BubblesLayer;
use crate::datum::{Datum, Key};
use crate::error::EngineError;
use crate::geometry::ProjectionAdapter;
use crate::graticule::GraticuleLayer;
use crate::interaction::Tooltip;
use crate::labels::LabelsLayer;
use crate::options::{ArcOptions, BubbleOptions, GraticuleOptions, LabelOptions, MapOptions};
use crate::reconcile::ReconcileSummary;
use crate::regions::{REGION_CLASS, draw_regions, update_styles, visible_regions};
use crate::registry::{LayerHandle, LayerRegistry, LayerRenderer, RenderContext};
use crate::stage::Stage;

/// Collects the capabilities an [`OverlayMap`] needs.
pub struct OverlayMapBuilder {
    options: MapOptions,
    projection: Option<Box<dyn Projection>>,
    backend: Option<Box<dyn DrawingBackend>>,
    features: Vec<Rc<RegionFeature>>,
    start: Time,
}

impl OverlayMapBuilder {
    pub fn new(options: MapOptions) -> Self {
        Self {
            options,
            projection: None,
            backend: None,
            features: Vec::new(),
            start: Time::ZERO,
        }
    }

    /// Engine time at construction. Defaults to zero; hosts advancing the
    /// map with an absolute clock pass its current reading.
    pub fn start_time(mut self, start: Time) -> Self {
        self.start = start;
        self
    }

    /// Overrides the projection named in the options.
    pub fn projection(mut self, projection: Box<dyn Projection>) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn backend(mut self, backend: Box<dyn DrawingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Region features of the configured scope.
    pub fn features(mut self, features: impl IntoIterator<Item = RegionFeature>) -> Self {
        self.features = features.into_iter().map(Rc::new).collect();
        self
    }

    /// Creates the map, registers the built-in layers and draws the
    /// regions. Fails without a drawing backend or with a projection name
    /// that is not built in.
    pub fn build(self) -> Result<OverlayMap, EngineError> {
        let options = self.options.with_class_defaults();
        let Some(backend) = self.backend else {
            return Err(EngineError::Configuration("no drawing backend supplied".into()));
        };
        let projection = match self.projection {
            Some(projection) => projection,
            None => fitted_projection(&options.projection, options.width, options.height).ok_or_else(|| {
                EngineError::Configuration(format!("unknown projection `{}`", options.projection))
            })?,
        };

        let mut stage = Stage::starting_at(World::new(backend), self.start);
        let regions = stage.add_layer(REGION_CLASS, LayerPlacement::Bottom);

        let mut registry = LayerRegistry::new();
        registry.register("bubbles", BubblesLayer::new(options.bubbles_config.clone()));
        registry.register("arc", ArcsLayer::new(options.arc_config.clone()));
        registry.register("labels", LabelsLayer::new(options.labels_config.clone()));
        registry.register("graticule", GraticuleLayer::new(options.graticule_config.clone()));

        let mut map = OverlayMap {
            region_data: options.data.clone(),
            options,
            stage,
            adapter: ProjectionAdapter::new(projection),
            registry,
            features: self.features,
            regions,
        };
        map.draw();
        Ok(map)
    }
}

/// An interactive overlay map: regions plus named plugin layers over one
/// projection and drawing surface.
pub struct OverlayMap {
    options: MapOptions,
    stage: Stage,
    adapter: ProjectionAdapter,
    registry: LayerRegistry,
    features: Vec<Rc<RegionFeature>>,
    regions: LayerId,
    region_data: BTreeMap<String, Datum>,
}

impl OverlayMap {
    pub fn builder(options: MapOptions) -> OverlayMapBuilder {
        OverlayMapBuilder::new(options)
    }

    /// Reconciles the region layer with the features and stored data.
    pub fn draw(&mut self) -> ReconcileSummary {
        let geography = &self.options.geography_config;
        self.adapter
            .set_features(visible_regions(self.features.iter().cloned(), geography));
        let summary = draw_regions(
            &mut self.stage,
            self.regions,
            &self.adapter,
            &self.region_data,
            &self.options.fills,
            geography,
        );
        info!(
            scope = self.options.scope.as_str(),
            regions = self.stage.members(self.regions).len(),
            "drew regions"
        );
        summary
    }

    /// [`draw`](Self::draw), then `done` with the map.
    pub fn draw_with(&mut self, done: impl FnOnce(&mut OverlayMap)) -> ReconcileSummary {
        let summary = self.draw();
        done(self);
        summary
    }

    /// Runs the layer registered under `name`. `options` must be the
    /// renderer's option type; fields left unset come from its defaults.
    pub fn apply_layer(
        &mut self,
        name: &str,
        data: Value,
        options: Option<Box<dyn Any>>,
        create_new_layer: bool,
    ) -> Result<LayerHandle, EngineError> {
        let mut cx = RenderContext {
            stage: &mut self.stage,
            adapter: &self.adapter,
            fills: &self.options.fills,
            filters: &self.options.filters,
            regions: Some(self.regions),
        };
        self.registry.invoke(name, &mut cx, data, options, create_new_layer)
    }

    /// [`apply_layer`](Self::apply_layer), then `done` once the renderer
    /// has returned. Transitions may still be running.
    pub fn apply_layer_with(
        &mut self,
        name: &str,
        data: Value,
        options: Option<Box<dyn Any>>,
        create_new_layer: bool,
        done: impl FnOnce(&mut OverlayMap, &LayerHandle),
    ) -> Result<LayerHandle, EngineError> {
        let handle = self.apply_layer(name, data, options, create_new_layer)?;
        done(self, &handle);
        Ok(handle)
    }

    pub fn bubbles(&mut self, data: Value, options: Option<BubbleOptions>) -> Result<LayerHandle, EngineError> {
        self.apply_layer("bubbles", data, boxed(options), false)
    }

    pub fn arc(&mut self, data: Value, options: Option<ArcOptions>) -> Result<LayerHandle, EngineError> {
        self.apply_layer("arc", data, boxed(options), false)
    }

    pub fn labels(&mut self, options: Option<LabelOptions>) -> Result<LayerHandle, EngineError> {
        self.apply_layer("labels", Value::Null, boxed(options), false)
    }

    pub fn graticule(&mut self, options: Option<GraticuleOptions>) -> Result<LayerHandle, EngineError> {
        self.apply_layer("graticule", Value::Null, boxed(options), false)
    }

    /// Adds a named layer plugin. The first registration of a name wins.
    pub fn register_plugin<R: LayerRenderer + 'static>(&mut self, name: &str, renderer: R) -> bool {
        self.registry.register(name, renderer)
    }

    /// Recolors regions and merges object values into their stored data.
    /// See [`update_styles`](crate::regions::update_styles).
    pub fn update_styles(&mut self, updates: &Value, reset: bool) -> Result<usize, EngineError> {
        update_styles(
            &mut self.stage,
            self.regions,
            &mut self.region_data,
            &self.options.fills,
            updates,
            reset,
        )
    }

    pub fn hover_enter(&mut self, id: PrimitiveId, pointer: Vec2) -> bool {
        self.stage.hover_enter(id, pointer)
    }

    pub fn pointer_move(&mut self, id: PrimitiveId, pointer: Vec2) -> bool {
        self.stage.pointer_move(id, pointer)
    }

    pub fn hover_exit(&mut self, id: PrimitiveId) -> bool {
        self.stage.hover_exit(id)
    }

    /// Scales every layer to a container now `new_width` wide, relative to
    /// the configured width. Does nothing unless the map is responsive.
    pub fn resize(&mut self, new_width: f64) -> bool {
        if !self.options.responsive {
            return false;
        }
        if !(new_width.is_finite() && new_width > 0.0 && self.options.width > 0.0) {
            warn!(new_width, "ignoring resize to an unusable width");
            return false;
        }
        let scale = new_width / self.options.width;
        let layers = self.stage.scale_layers(scale);
        debug!(scale, layers, "resized map");
        true
    }

    /// Container height for `width` under the configured aspect ratio.
    pub fn height_for(&self, width: f64) -> f64 {
        width * self.options.aspect_ratio
    }

    /// Drives running transitions to `now`.
    pub fn advance(&mut self, now: Time) -> usize {
        self.stage.advance(now)
    }

    pub fn tick(&mut self, frame: Frame) -> usize {
        self.advance(frame.time)
    }

    pub fn lat_lng_to_xy(&self, lat: f64, lng: f64) -> Option<Vec2> {
        self.adapter.lat_lng_to_xy(lat, lng)
    }

    /// An empty layer for host-drawn content.
    pub fn add_layer(&mut self, class: &str, placement: LayerPlacement) -> LayerId {
        self.stage.add_layer(class, placement)
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn adapter(&self) -> &ProjectionAdapter {
        &self.adapter
    }

    pub fn tooltip(&self) -> &Tooltip {
        self.stage.tooltip()
    }

    pub fn regions_layer(&self) -> LayerId {
        self.regions
    }

    /// Current layer of a named plugin.
    pub fn layer(&self, name: &str) -> Option<LayerId> {
        self.registry.layer(name)
    }

    pub fn region(&self, id: &str) -> Option<PrimitiveId> {
        self.stage.lookup(self.regions, &Key::new(id))
    }

    /// Stored data of a region.
    pub fn region_data(&self, id: &str) -> Option<&Datum> {
        self.region_data.get(id)
    }
}

impl std::fmt::Debug for OverlayMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayMap")
            .field("scope", &self.options.scope)
            .field("regions", &self.regions)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn boxed<T: 'static>(options: Option<T>) -> Option<Box<dyn Any>> {
    options.map(|o| Box::new(o) as Box<dyn Any>)
}
