// footprint_engine: marker clustering and placement for the footprint map.
// Clustering, render planning, camera choreography and selection live here; the page only mounts.

mod camera;
mod cluster;
mod error;
mod geo;
mod info_window;
mod layers;
mod render;
mod sdk;
mod selection;
mod source;
mod types;
mod widget;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

pub use camera::{first_of, CameraSequencer, Completion, MotionOutcome, MotionToken};
pub use cluster::{cluster, Cluster, Geotagged};
pub use error::EngineError;
pub use geo::{distance, Bounds, LngLat};
pub use info_window::{format_create_time, render_info_window};
pub use layers::{BaseLayer, LayerState, MapLayer, Overlay};
pub use render::{
    plan_markers, render, BadgeTier, MarkerContent, MarkerRegistry, MarkerTarget, RenderMode,
    RenderPlan,
};
pub use sdk::{MapSurface, MarkerSpec, MotionEvent, Timer};
pub use selection::{Selection, SelectionEffect, SelectionEvent, Transition};
pub use source::{parse_footprints, parse_footprints_or_empty, FootprintRecord, FootprintSpec};
pub use types::*;
pub use widget::{cluster_target_zoom, scale_label, FootprintMap};

#[cfg(target_arch = "wasm32")]
pub use web::{AmapSurface, BrowserTimer, FootprintMapApp};

/// Install the panic hook and route `tracing` events to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    tracing_wasm::set_as_global_default();
}

/// Stateless engine interface exposed to JavaScript.
/// Batch calls over JSON so the page can cluster and plan without a map.
#[wasm_bindgen]
pub struct FootprintEngine {
    config: EngineConfig,
}

impl FootprintEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn cluster_json(&self, footprints_json: &str) -> Result<String, EngineError> {
        let footprints = parse_footprints(footprints_json)?;
        let clusters = cluster(&footprints, self.config.map_settings.cluster_distance_meters);
        Ok(serde_json::to_string(&clusters)?)
    }

    fn plan_json(&self, footprints_json: &str, zoom: f64) -> Result<String, EngineError> {
        let footprints = parse_footprints(footprints_json)?;
        let plan = plan_markers(&footprints, zoom, &self.config.map_settings);
        Ok(serde_json::to_string(&plan)?)
    }

    fn info_window_for(&self, spec_json: &str) -> Result<String, EngineError> {
        let spec: FootprintSpec = serde_json::from_str(spec_json)?;
        Ok(render_info_window(&spec, &self.config.map_settings))
    }
}

#[wasm_bindgen]
impl FootprintEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<FootprintEngine, JsValue> {
        let config = EngineConfig::from_json(config_json)?;
        Ok(FootprintEngine { config })
    }

    /// Cluster a `[{spec: {...}}]` list with the configured threshold.
    /// Returns `[{ center, count, members, bounds }]`.
    pub fn cluster(&self, footprints_json: &str) -> Result<String, JsValue> {
        self.cluster_json(footprints_json).map_err(JsValue::from)
    }

    /// Lay out markers for `zoom` without touching a map.
    /// Returns `{ mode, targets }`.
    pub fn plan_markers(&self, footprints_json: &str, zoom: f64) -> Result<String, JsValue> {
        self.plan_json(footprints_json, zoom).map_err(JsValue::from)
    }

    /// Info-window HTML for one footprint `spec` object.
    pub fn info_window_html(&self, spec_json: &str) -> Result<String, JsValue> {
        self.info_window_for(spec_json).map_err(JsValue::from)
    }

    pub fn scale_label(&self, zoom: f64) -> String {
        scale_label(zoom).to_string()
    }

    /// Great-circle distance in meters.
    pub fn distance(&self, lng_a: f64, lat_a: f64, lng_b: f64, lat_b: f64) -> f64 {
        distance(LngLat::new(lng_a, lat_a), LngLat::new(lng_b, lat_b))
    }
}
