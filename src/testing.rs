// Test doubles: a recording map surface and a manually advanced clock.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures_channel::oneshot;
use futures_executor::LocalPool;
use futures_util::future::{pending, FutureExt, LocalBoxFuture};
use futures_util::task::LocalSpawnExt;

use crate::error::EngineError;
use crate::geo::LngLat;
use crate::layers::MapLayer;
use crate::sdk::{MapSurface, MarkerSpec, MotionEvent, Timer};
use crate::source::FootprintSpec;
use crate::types::MarkerId;

pub(crate) fn footprint(name: &str, lng: f64, lat: f64) -> FootprintSpec {
    FootprintSpec {
        name: name.to_string(),
        longitude: Some(lng),
        latitude: Some(lat),
        ..Default::default()
    }
}

/// Spawn `fut` on `pool` and expose its output once it completes.
pub(crate) fn spawn_tracked<F, T>(pool: &LocalPool, fut: F) -> Rc<RefCell<Option<T>>>
where
    F: Future<Output = T> + 'static,
    T: 'static,
{
    let slot = Rc::new(RefCell::new(None));
    let out = slot.clone();
    pool.spawner()
        .spawn_local(async move {
            let value = fut.await;
            *out.borrow_mut() = Some(value);
        })
        .expect("spawn on local pool");
    slot
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MapCall {
    EnableInteraction,
    SetZoom(f64, Option<u32>),
    PanTo(LngLat, u32),
    SetPitch(f64, Option<u32>),
    SetRotation(f64, Option<u32>),
    AddMarker(MarkerId),
    ClearMarkers,
    Pulse(MarkerId, u32),
    OpenInfoWindow(LngLat),
    CloseInfoWindow,
    ShowLayer(MapLayer),
    HideLayer(MapLayer),
}

/// Map surface that records every call and only reports motion end when told to.
pub(crate) struct FakeMap {
    calls: RefCell<Vec<MapCall>>,
    zoom: Cell<f64>,
    center: Cell<LngLat>,
    markers: RefCell<Vec<(MarkerId, MarkerSpec)>>,
    next_id: Cell<u32>,
    failing_titles: RefCell<Vec<String>>,
    listeners: RefCell<Vec<oneshot::Sender<MotionEvent>>>,
    info_window: RefCell<Option<String>>,
}

impl FakeMap {
    pub(crate) fn new(zoom: f64) -> Self {
        FakeMap {
            calls: RefCell::new(Vec::new()),
            zoom: Cell::new(zoom),
            center: Cell::new(LngLat::new(116.397428, 39.90923)),
            markers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            failing_titles: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            info_window: RefCell::new(None),
        }
    }

    pub(crate) fn calls(&self) -> Vec<MapCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Simulate a user-driven zoom without recording a call.
    pub(crate) fn force_zoom(&self, zoom: f64) {
        self.zoom.set(zoom);
    }

    pub(crate) fn fail_marker_titled(&self, title: &str) {
        self.failing_titles.borrow_mut().push(title.to_string());
    }

    pub(crate) fn marker_count(&self) -> usize {
        self.markers.borrow().len()
    }

    pub(crate) fn marker_ids(&self) -> Vec<MarkerId> {
        self.markers.borrow().iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn marker_position(&self, id: MarkerId) -> Option<LngLat> {
        self.markers
            .borrow()
            .iter()
            .find(|(m, _)| *m == id)
            .map(|(_, spec)| spec.position)
    }

    pub(crate) fn marker_titled(&self, title: &str) -> Option<MarkerId> {
        self.markers
            .borrow()
            .iter()
            .find(|(_, spec)| spec.title == title)
            .map(|(id, _)| *id)
    }

    /// Where the last `pan_to` left the camera.
    pub(crate) fn center(&self) -> LngLat {
        self.center.get()
    }

    pub(crate) fn info_window(&self) -> Option<String> {
        self.info_window.borrow().clone()
    }

    /// Live motion-end subscriptions.
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|tx| !tx.is_canceled())
            .count()
    }

    /// Deliver a motion-end notification to every current subscriber.
    pub(crate) fn emit(&self, event: MotionEvent) {
        let listeners: Vec<_> = self.listeners.borrow_mut().drain(..).collect();
        for tx in listeners {
            let _ = tx.send(event);
        }
    }

    fn record(&self, call: MapCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl MapSurface for FakeMap {
    fn enable_interaction(&self) {
        self.record(MapCall::EnableInteraction);
    }

    fn zoom(&self) -> f64 {
        self.zoom.get()
    }

    fn set_zoom(&self, zoom: f64, duration_ms: Option<u32>) {
        self.zoom.set(zoom);
        self.record(MapCall::SetZoom(zoom, duration_ms));
    }

    fn pan_to(&self, target: LngLat, duration_ms: u32) {
        self.center.set(target);
        self.record(MapCall::PanTo(target, duration_ms));
    }

    fn set_pitch(&self, degrees: f64, duration_ms: Option<u32>) {
        self.record(MapCall::SetPitch(degrees, duration_ms));
    }

    fn set_rotation(&self, degrees: f64, duration_ms: Option<u32>) {
        self.record(MapCall::SetRotation(degrees, duration_ms));
    }

    fn add_marker(&self, marker: &MarkerSpec) -> Result<MarkerId, EngineError> {
        if self.failing_titles.borrow().contains(&marker.title) {
            return Err(EngineError::MarkerCreation {
                name: marker.title.clone(),
                message: "rejected by fake map".to_string(),
            });
        }
        let id = MarkerId::new(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.markers.borrow_mut().push((id, marker.clone()));
        self.record(MapCall::AddMarker(id));
        Ok(id)
    }

    fn clear_markers(&self) {
        self.markers.borrow_mut().clear();
        self.record(MapCall::ClearMarkers);
    }

    fn pulse_marker(&self, id: MarkerId, duration_ms: u32) {
        self.record(MapCall::Pulse(id, duration_ms));
    }

    fn open_info_window(&self, position: LngLat, html: &str) {
        *self.info_window.borrow_mut() = Some(html.to_string());
        self.record(MapCall::OpenInfoWindow(position));
    }

    fn close_info_window(&self) {
        *self.info_window.borrow_mut() = None;
        self.record(MapCall::CloseInfoWindow);
    }

    fn show_layer(&self, layer: MapLayer) {
        self.record(MapCall::ShowLayer(layer));
    }

    fn hide_layer(&self, layer: MapLayer) {
        self.record(MapCall::HideLayer(layer));
    }

    fn motion_end(&self) -> LocalBoxFuture<'static, MotionEvent> {
        let (tx, rx) = oneshot::channel();
        self.listeners.borrow_mut().push(tx);
        async move {
            match rx.await {
                Ok(event) => event,
                Err(_) => pending().await,
            }
        }
        .boxed_local()
    }
}

/// Clock that only moves when a test calls `advance`.
pub(crate) struct ManualTimer {
    now: Cell<u64>,
    pending: RefCell<Vec<(u64, oneshot::Sender<()>)>>,
}

impl ManualTimer {
    pub(crate) fn new() -> Self {
        ManualTimer {
            now: Cell::new(0),
            pending: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn advance(&self, ms: u64) {
        let now = self.now.get() + ms;
        self.now.set(now);

        let due: Vec<_> = {
            let mut pending = self.pending.borrow_mut();
            let (due, rest): (Vec<_>, Vec<_>) = pending.drain(..).partition(|(at, _)| *at <= now);
            *pending = rest;
            due
        };
        for (_, tx) in due {
            let _ = tx.send(());
        }
    }
}

impl Timer for ManualTimer {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .borrow_mut()
            .push((self.now.get() + u64::from(ms), tx));
        async move {
            if rx.await.is_err() {
                pending::<()>().await;
            }
        }
        .boxed_local()
    }
}
