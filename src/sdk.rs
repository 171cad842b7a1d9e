// The map SDK and the clock, as seen by the engine.
// The browser build implements these over the AMap JS API and gloo timers (see `web`);
// tests drive them with fakes.

use futures_util::future::LocalBoxFuture;

use crate::error::EngineError;
use crate::geo::LngLat;
use crate::layers::MapLayer;
use crate::render::MarkerContent;
use crate::types::MarkerId;

/// Which notification ended a camera motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    MoveEnd,
    ZoomEnd,
}

/// Everything needed to place one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LngLat,
    pub content: MarkerContent,
    /// Label used in logs and as image alt text.
    pub title: String,
}

/// Imperative surface of the map SDK.
///
/// Methods take `&self`: the SDK object lives on the JS side and the engine is
/// single-threaded. Durations are in milliseconds; `None` leaves the animation
/// to the SDK default.
pub trait MapSurface {
    /// Turn on animation, scroll-wheel, double-click and keyboard controls.
    fn enable_interaction(&self);

    fn zoom(&self) -> f64;

    fn set_zoom(&self, zoom: f64, duration_ms: Option<u32>);
    fn pan_to(&self, target: LngLat, duration_ms: u32);
    fn set_pitch(&self, degrees: f64, duration_ms: Option<u32>);
    fn set_rotation(&self, degrees: f64, duration_ms: Option<u32>);

    /// Place a marker. Clicks on it are reported back with the returned id.
    fn add_marker(&self, marker: &MarkerSpec) -> Result<MarkerId, EngineError>;

    /// Remove every marker previously added.
    fn clear_markers(&self);

    /// Transient visual cue on a marker. Unknown ids are ignored.
    fn pulse_marker(&self, id: MarkerId, duration_ms: u32);

    fn open_info_window(&self, position: LngLat, html: &str);
    fn close_info_window(&self);

    fn show_layer(&self, layer: MapLayer);
    fn hide_layer(&self, layer: MapLayer);

    /// Resolves with the first move-end or zoom-end notification.
    ///
    /// The subscription is live from the moment this is called and is released
    /// when the returned future completes or is dropped.
    fn motion_end(&self) -> LocalBoxFuture<'static, MotionEvent>;
}

/// Source of delays.
pub trait Timer {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()>;
}
