// The footprint map widget: owns the point set, the markers on the map and the
// selection, and turns SDK events into camera moves and re-renders.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, info};

use crate::camera::CameraSequencer;
use crate::geo::{Bounds, LngLat};
use crate::info_window::render_info_window;
use crate::layers::{BaseLayer, LayerState, MapLayer, Overlay};
use crate::render::{render, MarkerRegistry, MarkerTarget};
use crate::sdk::{MapSurface, Timer};
use crate::selection::{Selection, SelectionEffect, SelectionEvent};
use crate::source::FootprintSpec;
use crate::types::{EngineConfig, MapSettings, MarkerId};

/// Human-readable scale for a zoom level.
pub fn scale_label(zoom: f64) -> &'static str {
    match zoom {
        z if z >= 15.0 => "100 米",
        z if z >= 12.0 => "1 公里",
        z if z >= 9.0 => "10 公里",
        z if z >= 6.0 => "100 公里",
        z if z >= 3.0 => "1000 公里",
        _ => "10000 公里",
    }
}

/// Zoom a cluster click lands on, capped at `max_zoom`.
pub fn cluster_target_zoom(current: f64, settings: &MapSettings) -> f64 {
    (current + 2.0).min(settings.max_zoom)
}

pub struct FootprintMap<M: MapSurface, T: Timer> {
    map: Rc<M>,
    timer: Rc<T>,
    settings: MapSettings,
    sequencer: CameraSequencer,
    footprints: RefCell<Vec<FootprintSpec>>,
    registry: RefCell<MarkerRegistry>,
    selection: Cell<Selection>,
    /// A zoom change arrived while a window was open.
    rerender_pending: Cell<bool>,
    layers: Cell<LayerState>,
}

impl<M: MapSurface, T: Timer> FootprintMap<M, T> {
    pub fn new(map: Rc<M>, timer: Rc<T>, config: EngineConfig) -> Self {
        FootprintMap {
            map,
            timer,
            settings: config.map_settings,
            sequencer: CameraSequencer::new(config.motion_settings),
            footprints: RefCell::new(Vec::new()),
            registry: RefCell::new(MarkerRegistry::default()),
            selection: Cell::new(Selection::Idle),
            rerender_pending: Cell::new(false),
            layers: Cell::new(LayerState::default()),
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn selection(&self) -> Selection {
        self.selection.get()
    }

    pub fn marker_count(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn marker_target(&self, id: MarkerId) -> Option<MarkerTarget> {
        self.registry.borrow().get(id).cloned()
    }

    /// Replace the point set and redraw, unless a window is open.
    pub fn set_footprints(&self, footprints: Vec<FootprintSpec>) {
        info!(count = footprints.len(), "loaded footprints");
        *self.footprints.borrow_mut() = footprints;
        if self.selection.get().allows_rerender() {
            self.rerender();
        } else {
            self.rerender_pending.set(true);
        }
    }

    /// Clear every marker and lay them out again for the current zoom.
    pub fn rerender(&self) {
        self.rerender_pending.set(false);
        self.map.clear_markers();
        let registry = render(
            &*self.map,
            &self.footprints.borrow(),
            self.map.zoom(),
            &self.settings,
        );
        *self.registry.borrow_mut() = registry;
    }

    /// Zoom-end handler: re-evaluate the render mode once the map is idle.
    pub async fn on_zoom_end(&self) {
        if !self.selection.get().allows_rerender() {
            self.defer_rerender();
            return;
        }
        // Let a click that raced the zoom settle first.
        self.timer.sleep(self.settings.rerender_delay_ms).await;
        if !self.selection.get().allows_rerender() {
            self.defer_rerender();
            return;
        }
        self.rerender();
    }

    fn defer_rerender(&self) {
        debug!("info window open, deferring marker re-render");
        self.rerender_pending.set(true);
    }

    pub async fn on_marker_click(&self, id: MarkerId) {
        let Some(target) = self.marker_target(id) else {
            debug!(marker = id.as_u32(), "click on unknown marker");
            return;
        };
        match target {
            MarkerTarget::Singleton {
                footprint,
                position,
            } => self.select(id, &footprint, position).await,
            MarkerTarget::Cluster { bounds, .. } => self.zoom_into_cluster(id, bounds).await,
        }
    }

    pub fn on_background_click(&self) {
        self.apply(SelectionEvent::BackgroundClick);
    }

    pub fn on_info_window_click(&self) {
        self.apply(SelectionEvent::WindowClick);
    }

    async fn select(&self, id: MarkerId, footprint: &FootprintSpec, position: LngLat) {
        if let Some(open) = self.apply(SelectionEvent::MarkerClick(id)) {
            self.open(open, footprint, position).await;
        }
    }

    /// Run a selection transition. Returns the marker to open, if any.
    fn apply(&self, event: SelectionEvent) -> Option<MarkerId> {
        let transition = self.selection.get().on(event);
        self.selection.set(transition.next);

        let mut to_open = None;
        for effect in transition.effects {
            match effect {
                SelectionEffect::CloseWindow => self.map.close_info_window(),
                SelectionEffect::LevelCamera { animated, rotation } => {
                    let duration = animated.then_some(self.settings.reset_duration_ms);
                    self.map.set_pitch(0.0, duration);
                    if rotation {
                        self.map.set_rotation(0.0, duration);
                    }
                }
                SelectionEffect::Open(id) => to_open = Some(id),
            }
        }

        if !transition.next.is_open() {
            // Whatever was flying towards a window is no longer wanted.
            self.sequencer.cancel();
            if self.rerender_pending.get() {
                self.rerender();
            }
        }
        to_open
    }

    async fn open(&self, id: MarkerId, footprint: &FootprintSpec, position: LngLat) {
        let outcome = self
            .sequencer
            .move_to(&*self.map, &*self.timer, position)
            .await;
        if !outcome.is_current() || self.selection.get() != Selection::Open(id) {
            return;
        }
        let token = self.sequencer.current();

        let html = render_info_window(footprint, &self.settings);
        self.map.open_info_window(position, &html);
        debug!(marker = id.as_u32(), name = %footprint.name, ?outcome, "opened info window");

        self.timer.sleep(self.settings.open_pitch_delay_ms).await;
        if self.sequencer.is_current(token) && self.selection.get() == Selection::Open(id) {
            self.map.set_pitch(self.settings.open_pitch, None);
        }
    }

    async fn zoom_into_cluster(&self, id: MarkerId, bounds: Bounds) {
        let target_zoom = cluster_target_zoom(self.map.zoom(), &self.settings);
        let outcome = self
            .sequencer
            .move_to(&*self.map, &*self.timer, bounds.center())
            .await;
        if !outcome.is_current() {
            return;
        }

        self.map.set_zoom(target_zoom, None);
        self.map.set_pitch(0.0, None);
        self.map.set_rotation(0.0, None);
        self.map.pulse_marker(id, self.settings.pulse_duration_ms);
        debug!(marker = id.as_u32(), target_zoom, "zoomed into cluster");
    }

    pub fn zoom_in(&self) {
        let zoom = self.map.zoom();
        if zoom < self.settings.zoom_button_max {
            self.map.set_zoom(zoom + 1.0, None);
        }
    }

    pub fn zoom_out(&self) {
        let zoom = self.map.zoom();
        if zoom > self.settings.min_zoom {
            self.map.set_zoom(zoom - 1.0, None);
        }
    }

    pub fn scale_label(&self) -> &'static str {
        scale_label(self.map.zoom())
    }

    pub fn layers(&self) -> LayerState {
        self.layers.get()
    }

    pub async fn select_base_layer(&self, base: BaseLayer) {
        self.layers.set(self.layers.get().select_base(base));
        self.update_layers().await;
    }

    pub async fn toggle_overlay(&self, overlay: Overlay) {
        self.layers.set(self.layers.get().toggle(overlay));
        self.update_layers().await;
    }

    pub async fn set_overlay(&self, overlay: Overlay, on: bool) {
        self.layers.set(self.layers.get().set_overlay(overlay, on));
        self.update_layers().await;
    }

    /// Push the layer state to the map one tile layer per stagger step.
    /// Every step reads the latest state, so overlapping updates converge.
    async fn update_layers(&self) {
        for (step, layer) in MapLayer::ALL.into_iter().enumerate() {
            if step > 0 {
                self.timer.sleep(self.settings.layer_stagger_ms).await;
            }
            if self.layers.get().is_visible(layer) {
                self.map.show_layer(layer);
            } else {
                self.map.hide_layer(layer);
            }
        }
        debug!(layers = ?self.layers.get(), "map layers updated");
    }
}
