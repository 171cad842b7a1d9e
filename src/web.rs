// Browser glue: AMap JS API bindings, the `MapSurface`/`Timer` implementations
// over them, and the `FootprintMapApp` entry point the page mounts.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_channel::oneshot;
use futures_util::future::{join, pending, FutureExt, LocalBoxFuture};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Reflect};
use serde_json::json;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event};

use crate::error::EngineError;
use crate::geo::LngLat;
use crate::info_window::{LINK_BUTTON_CLASS, WINDOW_CLASS};
use crate::layers::{BaseLayer, MapLayer, Overlay};
use crate::render::PULSE_CLASS;
use crate::sdk::{MapSurface, MarkerSpec, MotionEvent, Timer};
use crate::source::fetch_footprints;
use crate::types::{EngineConfig, MarkerId};
use crate::widget::FootprintMap;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = AMap, js_name = Map)]
    #[derive(Clone)]
    type AmapMap;

    #[wasm_bindgen(constructor, catch, js_namespace = AMap, js_class = "Map")]
    fn new(container: &str, options: &JsValue) -> Result<AmapMap, JsValue>;

    #[wasm_bindgen(method, js_name = getZoom)]
    fn get_zoom(this: &AmapMap) -> f64;

    #[wasm_bindgen(method, js_name = setZoom)]
    fn set_zoom(this: &AmapMap, zoom: f64);

    #[wasm_bindgen(method, js_name = setZoom)]
    fn set_zoom_animated(this: &AmapMap, zoom: f64, immediately: bool, duration: u32);

    #[wasm_bindgen(method, js_name = panTo)]
    fn pan_to(this: &AmapMap, position: &Array, duration: u32);

    #[wasm_bindgen(method, js_name = setPitch)]
    fn set_pitch(this: &AmapMap, pitch: f64);

    #[wasm_bindgen(method, js_name = setPitch)]
    fn set_pitch_animated(this: &AmapMap, pitch: f64, immediately: bool, duration: u32);

    #[wasm_bindgen(method, js_name = setRotation)]
    fn set_rotation(this: &AmapMap, rotation: f64);

    #[wasm_bindgen(method, js_name = setRotation)]
    fn set_rotation_animated(this: &AmapMap, rotation: f64, immediately: bool, duration: u32);

    #[wasm_bindgen(method, js_name = setStatus)]
    fn set_status(this: &AmapMap, status: &JsValue);

    #[wasm_bindgen(method)]
    fn add(this: &AmapMap, overlay: &AmapMarker);

    #[wasm_bindgen(method)]
    fn remove(this: &AmapMap, overlay: &AmapMarker);

    #[wasm_bindgen(method)]
    fn on(this: &AmapMap, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method)]
    fn off(this: &AmapMap, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method, js_name = add)]
    fn add_layer(this: &AmapMap, layer: &AmapTileLayer);

    /// Any `AMap.TileLayer` flavour; they share `show`/`hide`.
    type AmapTileLayer;

    #[wasm_bindgen(constructor, js_namespace = ["AMap", "TileLayer"], js_class = "Satellite")]
    fn new_satellite() -> AmapTileLayer;

    #[wasm_bindgen(constructor, js_namespace = ["AMap", "TileLayer"], js_class = "RoadNet")]
    fn new_road_net() -> AmapTileLayer;

    #[wasm_bindgen(constructor, js_namespace = ["AMap", "TileLayer"], js_class = "Traffic")]
    fn new_traffic() -> AmapTileLayer;

    #[wasm_bindgen(method)]
    fn show(this: &AmapTileLayer);

    #[wasm_bindgen(method)]
    fn hide(this: &AmapTileLayer);

    #[wasm_bindgen(js_namespace = AMap, js_name = Marker)]
    type AmapMarker;

    #[wasm_bindgen(constructor, catch, js_namespace = AMap, js_class = "Marker")]
    fn new(options: &JsValue) -> Result<AmapMarker, JsValue>;

    #[wasm_bindgen(method, js_name = on)]
    fn on_event(this: &AmapMarker, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(js_namespace = AMap, js_name = InfoWindow)]
    type AmapInfoWindow;

    #[wasm_bindgen(constructor, js_namespace = AMap, js_class = "InfoWindow")]
    fn new(options: &JsValue) -> AmapInfoWindow;

    #[wasm_bindgen(method, js_name = setContent)]
    fn set_content(this: &AmapInfoWindow, html: &str);

    #[wasm_bindgen(method)]
    fn open(this: &AmapInfoWindow, map: &AmapMap, position: &Array);

    #[wasm_bindgen(method)]
    fn close(this: &AmapInfoWindow);

    #[wasm_bindgen(js_namespace = AMap, js_name = Pixel)]
    type AmapPixel;

    #[wasm_bindgen(constructor, js_namespace = AMap, js_class = "Pixel")]
    fn new(x: f64, y: f64) -> AmapPixel;
}

type Handler = Closure<dyn FnMut(JsValue)>;

fn lng_lat_array(p: LngLat) -> Array {
    Array::of2(&JsValue::from_f64(p.lng), &JsValue::from_f64(p.lat))
}

fn to_js(value: &serde_json::Value) -> Result<JsValue, EngineError> {
    js_sys::JSON::parse(&value.to_string()).map_err(|e| EngineError::Sdk(format!("{:?}", e)))
}

fn set_prop(target: &JsValue, key: &str, value: &JsValue) -> Result<(), EngineError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| EngineError::Sdk(format!("{:?}", e)))
}

struct PlacedMarker {
    id: MarkerId,
    marker: AmapMarker,
    content: Element,
    _on_click: Handler,
}

/// Satellite, road-net and traffic tiles, added to the map hidden.
struct TileLayers {
    satellite: AmapTileLayer,
    road_net: AmapTileLayer,
    traffic: AmapTileLayer,
}

impl TileLayers {
    fn install(map: &AmapMap) -> Self {
        let layers = TileLayers {
            satellite: AmapTileLayer::new_satellite(),
            road_net: AmapTileLayer::new_road_net(),
            traffic: AmapTileLayer::new_traffic(),
        };
        for layer in MapLayer::ALL {
            let tiles = layers.get(layer);
            map.add_layer(tiles);
            tiles.hide();
        }
        layers
    }

    fn get(&self, layer: MapLayer) -> &AmapTileLayer {
        match layer {
            MapLayer::Satellite => &self.satellite,
            MapLayer::RoadNet => &self.road_net,
            MapLayer::Traffic => &self.traffic,
        }
    }
}

/// `MapSurface` over an `AMap.Map`.
pub struct AmapSurface {
    map: AmapMap,
    layers: TileLayers,
    info_window: AmapInfoWindow,
    markers: RefCell<Vec<PlacedMarker>>,
    next_id: Cell<u32>,
    on_marker_click: RefCell<Option<Rc<dyn Fn(MarkerId)>>>,
}

impl AmapSurface {
    fn new(map: AmapMap) -> Result<Self, EngineError> {
        let options = to_js(&json!({ "isCustom": true, "autoMove": false }))?;
        set_prop(&options, "offset", &AmapPixel::new(0.0, -10.0))?;
        Ok(AmapSurface {
            layers: TileLayers::install(&map),
            map,
            info_window: AmapInfoWindow::new(&options),
            markers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            on_marker_click: RefCell::new(None),
        })
    }

    fn set_marker_click(&self, handler: Rc<dyn Fn(MarkerId)>) {
        *self.on_marker_click.borrow_mut() = Some(handler);
    }
}

/// Unsubscribes the motion-end handlers when the wait is over.
struct MotionSubscription {
    map: AmapMap,
    on_move: Handler,
    on_zoom: Handler,
}

impl Drop for MotionSubscription {
    fn drop(&mut self) {
        self.map.off("moveend", self.on_move.as_ref().unchecked_ref());
        self.map.off("zoomend", self.on_zoom.as_ref().unchecked_ref());
    }
}

impl MapSurface for AmapSurface {
    fn enable_interaction(&self) {
        let status = json!({
            "animateEnable": true,
            "scrollWheel": true,
            "doubleClickZoom": true,
            "keyboardEnable": true,
        });
        match to_js(&status) {
            Ok(status) => self.map.set_status(&status),
            Err(err) => warn!(error = %err, "failed to enable map interaction"),
        }
    }

    fn zoom(&self) -> f64 {
        self.map.get_zoom()
    }

    fn set_zoom(&self, zoom: f64, duration_ms: Option<u32>) {
        match duration_ms {
            Some(ms) => self.map.set_zoom_animated(zoom, false, ms),
            None => self.map.set_zoom(zoom),
        }
    }

    fn pan_to(&self, target: LngLat, duration_ms: u32) {
        self.map.pan_to(&lng_lat_array(target), duration_ms);
    }

    fn set_pitch(&self, degrees: f64, duration_ms: Option<u32>) {
        match duration_ms {
            Some(ms) => self.map.set_pitch_animated(degrees, false, ms),
            None => self.map.set_pitch(degrees),
        }
    }

    fn set_rotation(&self, degrees: f64, duration_ms: Option<u32>) {
        match duration_ms {
            Some(ms) => self.map.set_rotation_animated(degrees, false, ms),
            None => self.map.set_rotation(degrees),
        }
    }

    fn add_marker(&self, spec: &MarkerSpec) -> Result<MarkerId, EngineError> {
        let marker_error = |e: JsValue| EngineError::MarkerCreation {
            name: spec.title.clone(),
            message: format!("{:?}", e),
        };

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| EngineError::Sdk("no document".to_string()))?;
        let content = document.create_element("div").map_err(marker_error)?;
        content.set_inner_html(&spec.content.to_html(&spec.title));

        let options = to_js(&json!({ "anchor": "bottom-center", "title": spec.title }))?;
        set_prop(&options, "position", &lng_lat_array(spec.position))?;
        set_prop(&options, "content", &content)?;
        set_prop(&options, "offset", &AmapPixel::new(0.0, 0.0))?;
        let marker = AmapMarker::new(&options).map_err(marker_error)?;

        let id = MarkerId::new(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));

        let sink = self.on_marker_click.borrow().clone();
        let on_click: Handler = Closure::new(move |_: JsValue| {
            if let Some(sink) = &sink {
                sink(id);
            }
        });
        marker.on_event("click", on_click.as_ref().unchecked_ref());
        self.map.add(&marker);

        self.markers.borrow_mut().push(PlacedMarker {
            id,
            marker,
            content,
            _on_click: on_click,
        });
        Ok(id)
    }

    fn clear_markers(&self) {
        for placed in self.markers.borrow_mut().drain(..) {
            self.map.remove(&placed.marker);
        }
    }

    fn pulse_marker(&self, id: MarkerId, duration_ms: u32) {
        let badge = self
            .markers
            .borrow()
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.content.first_element_child());
        let Some(badge) = badge else {
            return;
        };
        if badge.class_list().add_1(PULSE_CLASS).is_err() {
            return;
        }
        spawn_local(async move {
            TimeoutFuture::new(duration_ms).await;
            let _ = badge.class_list().remove_1(PULSE_CLASS);
        });
    }

    fn open_info_window(&self, position: LngLat, html: &str) {
        self.info_window.set_content(html);
        self.info_window.open(&self.map, &lng_lat_array(position));
    }

    fn close_info_window(&self) {
        self.info_window.close();
    }

    fn show_layer(&self, layer: MapLayer) {
        self.layers.get(layer).show();
    }

    fn hide_layer(&self, layer: MapLayer) {
        self.layers.get(layer).hide();
    }

    fn motion_end(&self) -> LocalBoxFuture<'static, MotionEvent> {
        let (tx, rx) = oneshot::channel();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let handler = |event: MotionEvent| -> Handler {
            let tx = tx.clone();
            Closure::new(move |_: JsValue| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(event);
                }
            })
        };
        let subscription = MotionSubscription {
            map: self.map.clone(),
            on_move: handler(MotionEvent::MoveEnd),
            on_zoom: handler(MotionEvent::ZoomEnd),
        };
        self.map.on("moveend", subscription.on_move.as_ref().unchecked_ref());
        self.map.on("zoomend", subscription.on_zoom.as_ref().unchecked_ref());

        async move {
            let _subscription = subscription;
            match rx.await {
                Ok(event) => event,
                Err(_) => pending().await,
            }
        }
        .boxed_local()
    }
}

/// `Timer` over `setTimeout`.
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        TimeoutFuture::new(ms).boxed_local()
    }
}

async fn map_ready(map: &AmapMap) {
    let (tx, rx) = oneshot::channel::<()>();
    let tx = RefCell::new(Some(tx));
    let on_complete: Handler = Closure::new(move |_: JsValue| {
        if let Some(tx) = tx.borrow_mut().take() {
            let _ = tx.send(());
        }
    });
    map.on("complete", on_complete.as_ref().unchecked_ref());
    let _ = rx.await;
    map.off("complete", on_complete.as_ref().unchecked_ref());
}

type Widget = FootprintMap<AmapSurface, BrowserTimer>;

/// The mounted footprint map.
#[wasm_bindgen]
pub struct FootprintMapApp {
    widget: Rc<Widget>,
    _map_handlers: Vec<Handler>,
    _document_click: Closure<dyn FnMut(Event)>,
}

#[wasm_bindgen]
impl FootprintMapApp {
    /// Create the map in `container_id`, load the footprints and wire events.
    pub async fn mount(container_id: String, config_json: String) -> Result<FootprintMapApp, JsValue> {
        let config = EngineConfig::from_json(&config_json)?;
        let s = &config.map_settings;

        let mut options = json!({
            "zoom": s.initial_zoom,
            "center": [s.initial_center.lng, s.initial_center.lat],
            "pitch": s.initial_pitch,
            "viewMode": "3D",
            "rotateEnable": true,
            "pitchEnable": true,
            "showBuildingBlock": true,
            "animateEnable": true,
            "scrollWheel": true,
            "doubleClickZoom": true,
            "keyboardEnable": true,
            "dragEnable": true,
            "zoomEnable": true,
            "resizeEnable": true,
        });
        if let Some(style) = &s.map_style {
            options["mapStyle"] = json!(style);
        }
        let options = to_js(&options)?;
        let map = AmapMap::new(&container_id, &options)?;

        // The list is fetched while the map loads.
        let url = s.footprints_url.clone();
        let (footprints, ()) = join(fetch_footprints(&url), map_ready(&map)).await;
        info!(container = %container_id, "map ready");

        let surface = Rc::new(AmapSurface::new(map.clone()).map_err(JsValue::from)?);
        let widget = Rc::new(FootprintMap::new(surface.clone(), Rc::new(BrowserTimer), config));

        let w = Rc::downgrade(&widget);
        surface.set_marker_click(Rc::new(move |id: MarkerId| {
            if let Some(w) = w.upgrade() {
                spawn_local(async move { w.on_marker_click(id).await });
            }
        }));

        widget.set_footprints(footprints);

        let w = Rc::downgrade(&widget);
        let on_zoom_end: Handler = Closure::new(move |_: JsValue| {
            if let Some(w) = w.upgrade() {
                spawn_local(async move { w.on_zoom_end().await });
            }
        });
        map.on("zoomend", on_zoom_end.as_ref().unchecked_ref());

        let w = Rc::downgrade(&widget);
        let on_click: Handler = Closure::new(move |_: JsValue| {
            if let Some(w) = w.upgrade() {
                w.on_background_click();
            }
        });
        map.on("click", on_click.as_ref().unchecked_ref());

        let document_click = install_window_clicks(Rc::downgrade(&widget))?;

        Ok(FootprintMapApp {
            widget,
            _map_handlers: vec![on_zoom_end, on_click],
            _document_click: document_click,
        })
    }

    pub fn zoom_in(&self) {
        self.widget.zoom_in();
    }

    pub fn zoom_out(&self) {
        self.widget.zoom_out();
    }

    pub fn scale_label(&self) -> String {
        self.widget.scale_label().to_string()
    }

    pub fn marker_count(&self) -> usize {
        self.widget.marker_count()
    }

    /// Switch the base map: `"normal"` or `"satellite"`.
    pub fn select_base_layer(&self, name: &str) -> Result<(), JsValue> {
        let base: BaseLayer = name.parse()?;
        let w = self.widget.clone();
        spawn_local(async move { w.select_base_layer(base).await });
        Ok(())
    }

    /// Flip an overlay: `"road"` or `"traffic"`.
    pub fn toggle_overlay(&self, name: &str) -> Result<(), JsValue> {
        let overlay: Overlay = name.parse()?;
        let w = self.widget.clone();
        spawn_local(async move { w.toggle_overlay(overlay).await });
        Ok(())
    }

    /// Set an overlay from a checkbox state.
    pub fn set_overlay(&self, name: &str, on: bool) -> Result<(), JsValue> {
        let overlay: Overlay = name.parse()?;
        let w = self.widget.clone();
        spawn_local(async move { w.set_overlay(overlay, on).await });
        Ok(())
    }

    /// Current layer choice as JSON: `{ base, road, traffic }`.
    pub fn layers(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.widget.layers())
            .map_err(|e| JsValue::from(EngineError::from(e)))
    }
}

/// Delegated clicks inside the info window: the article action opens a new
/// tab, anything else closes the window.
fn install_window_clicks(widget: std::rc::Weak<Widget>) -> Result<Closure<dyn FnMut(Event)>, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let link_selector = format!(".{}", LINK_BUTTON_CLASS);
    let window_selector = format!(".{}", WINDOW_CLASS);
    let handler = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };

        if let Ok(Some(link)) = target.closest(&link_selector) {
            event.prevent_default();
            event.stop_propagation();
            if let Some(url) = link.get_attribute("data-article-url").filter(|u| !u.is_empty()) {
                debug!(%url, "opening linked article");
                if let Err(err) = window.open_with_url_and_target(&url, "_blank") {
                    warn!(error = ?err, "failed to open article");
                }
            }
            return;
        }

        if let Ok(Some(_)) = target.closest(&window_selector) {
            if let Some(w) = widget.upgrade() {
                w.on_info_window_click();
            }
        }
    });
    document.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())?;
    Ok(handler)
}
