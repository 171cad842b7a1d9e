// Strong typing over strings. Newtypes for marker handles, typed settings passed from JS.
// Every setting has a serde default so the page can send `{}`.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geo::LngLat;

/// Handle of a marker placed on the map. Assigned by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(u32);

impl MarkerId {
    pub const fn new(id: u32) -> Self {
        MarkerId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Engine configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub map_settings: MapSettings,
    #[serde(default)]
    pub motion_settings: MotionSettings,
}

impl EngineConfig {
    /// Parse a page-supplied config. Blank input means all defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = if json.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let m = &self.map_settings;
        if !(m.cluster_distance_meters.is_finite() && m.cluster_distance_meters > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "cluster_distance_meters must be positive, got {}",
                m.cluster_distance_meters
            )));
        }
        if m.min_zoom > m.max_zoom || m.zoom_button_max > m.max_zoom {
            return Err(EngineError::InvalidConfig(format!(
                "zoom bounds out of order: min {} / button max {} / max {}",
                m.min_zoom, m.zoom_button_max, m.max_zoom
            )));
        }
        if self.motion_settings.fallback_timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "fallback_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Render, zoom, and info-window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    /// Below this zoom level markers are clustered.
    #[serde(default = "default_cluster_zoom_threshold")]
    pub cluster_zoom_threshold: f64,
    /// Points within this many meters of a cluster seed join it.
    #[serde(default = "default_cluster_distance_meters")]
    pub cluster_distance_meters: f64,
    /// Upper bound for cluster-click zoom.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
    /// Lower bound for the zoom-out button.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    /// Upper bound for the zoom-in button.
    #[serde(default = "default_zoom_button_max")]
    pub zoom_button_max: f64,
    /// Delay before the second selection check on zoom end (milliseconds).
    #[serde(default = "default_rerender_delay_ms")]
    pub rerender_delay_ms: u32,
    /// Cluster marker pulse length (milliseconds).
    #[serde(default = "default_pulse_duration_ms")]
    pub pulse_duration_ms: u32,
    /// Pitch applied once an info window is showing.
    #[serde(default = "default_open_pitch")]
    pub open_pitch: f64,
    #[serde(default = "default_open_pitch_delay_ms")]
    pub open_pitch_delay_ms: u32,
    /// Animation length of the pitch/rotation reset on close (milliseconds).
    #[serde(default = "default_reset_duration_ms")]
    pub reset_duration_ms: u32,
    /// Gap between successive tile-layer updates (milliseconds).
    #[serde(default = "default_layer_stagger_ms")]
    pub layer_stagger_ms: u32,
    /// Offset used when formatting creation times, in minutes east of UTC.
    #[serde(default = "default_time_offset_minutes")]
    pub time_offset_minutes: i32,
    /// Image shown when a footprint has none.
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f64,
    #[serde(default = "default_initial_center")]
    pub initial_center: LngLat,
    #[serde(default = "default_initial_pitch")]
    pub initial_pitch: f64,
    /// AMap style URI; the SDK default when absent.
    #[serde(default)]
    pub map_style: Option<String>,
    /// Endpoint returning the footprint list.
    #[serde(default = "default_footprints_url")]
    pub footprints_url: String,
}

fn default_cluster_zoom_threshold() -> f64 {
    6.0
}

fn default_cluster_distance_meters() -> f64 {
    10_000.0
}

fn default_max_zoom() -> f64 {
    20.0
}

fn default_min_zoom() -> f64 {
    3.0
}

fn default_zoom_button_max() -> f64 {
    18.0
}

fn default_rerender_delay_ms() -> u32 {
    100
}

fn default_pulse_duration_ms() -> u32 {
    600
}

fn default_open_pitch() -> f64 {
    60.0
}

fn default_open_pitch_delay_ms() -> u32 {
    100
}

fn default_reset_duration_ms() -> u32 {
    500
}

fn default_layer_stagger_ms() -> u32 {
    100
}

fn default_time_offset_minutes() -> i32 {
    480 // UTC+8
}

fn default_placeholder_image() -> String {
    "https://www.lik.cc/upload/loading8.gif".to_string()
}

fn default_initial_zoom() -> f64 {
    4.0
}

fn default_initial_center() -> LngLat {
    LngLat::new(116.397428, 39.90923)
}

fn default_initial_pitch() -> f64 {
    35.0
}

fn default_footprints_url() -> String {
    "/apis/api.footprint.lik.cc/v1alpha1/listAllFootprints".to_string()
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            cluster_zoom_threshold: default_cluster_zoom_threshold(),
            cluster_distance_meters: default_cluster_distance_meters(),
            max_zoom: default_max_zoom(),
            min_zoom: default_min_zoom(),
            zoom_button_max: default_zoom_button_max(),
            rerender_delay_ms: default_rerender_delay_ms(),
            pulse_duration_ms: default_pulse_duration_ms(),
            open_pitch: default_open_pitch(),
            open_pitch_delay_ms: default_open_pitch_delay_ms(),
            reset_duration_ms: default_reset_duration_ms(),
            layer_stagger_ms: default_layer_stagger_ms(),
            time_offset_minutes: default_time_offset_minutes(),
            placeholder_image: default_placeholder_image(),
            initial_zoom: default_initial_zoom(),
            initial_center: default_initial_center(),
            initial_pitch: default_initial_pitch(),
            map_style: None,
            footprints_url: default_footprints_url(),
        }
    }
}

/// Camera choreography settings for marker clicks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionSettings {
    /// Street-level zoom reached on a marker click.
    #[serde(default = "default_target_zoom")]
    pub target_zoom_on_marker_click: f64,
    #[serde(default = "default_zoom_duration_ms")]
    pub zoom_duration_ms: u32,
    /// Pause between the zoom and the pan so the zoom can settle.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u32,
    #[serde(default = "default_pan_duration_ms")]
    pub pan_duration_ms: u32,
    /// Upper bound on waiting for a move/zoom end notification.
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u32,
    /// Tilt applied on arrival.
    #[serde(default = "default_arrival_pitch")]
    pub arrival_pitch: f64,
    #[serde(default = "default_arrival_pitch_duration_ms")]
    pub arrival_pitch_duration_ms: u32,
}

fn default_target_zoom() -> f64 {
    18.0
}

fn default_zoom_duration_ms() -> u32 {
    600
}

fn default_settle_delay_ms() -> u32 {
    100
}

fn default_pan_duration_ms() -> u32 {
    800
}

fn default_fallback_timeout_ms() -> u32 {
    1500
}

fn default_arrival_pitch() -> f64 {
    50.0
}

fn default_arrival_pitch_duration_ms() -> u32 {
    500
}

impl Default for MotionSettings {
    fn default() -> Self {
        MotionSettings {
            target_zoom_on_marker_click: default_target_zoom(),
            zoom_duration_ms: default_zoom_duration_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            pan_duration_ms: default_pan_duration_ms(),
            fallback_timeout_ms: default_fallback_timeout_ms(),
            arrival_pitch: default_arrival_pitch(),
            arrival_pitch_duration_ms: default_arrival_pitch_duration_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.map_settings.cluster_zoom_threshold, 6.0);
        assert_eq!(config.map_settings.cluster_distance_meters, 10_000.0);
        assert_eq!(config.map_settings.max_zoom, 20.0);
        assert_eq!(config.motion_settings.target_zoom_on_marker_click, 18.0);
        assert_eq!(config.motion_settings.fallback_timeout_ms, 1500);
    }

    #[test]
    fn partial_settings_keep_other_defaults() {
        let json = r#"{"map_settings":{"cluster_zoom_threshold":8},"motion_settings":{"fallback_timeout_ms":900}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.map_settings.cluster_zoom_threshold, 8.0);
        assert_eq!(config.map_settings.pulse_duration_ms, 600);
        assert_eq!(config.motion_settings.fallback_timeout_ms, 900);
        assert_eq!(config.motion_settings.pan_duration_ms, 800);
    }

    #[test]
    fn manual_default_matches_serde_default() {
        let from_json: MapSettings = serde_json::from_str("{}").unwrap();
        let manual = MapSettings::default();
        assert_eq!(from_json.initial_center, manual.initial_center);
        assert_eq!(from_json.footprints_url, manual.footprints_url);
        assert_eq!(from_json.time_offset_minutes, manual.time_offset_minutes);
    }

    #[test]
    fn blank_config_is_default() {
        let config = EngineConfig::from_json("  ").unwrap();
        assert_eq!(config.map_settings.min_zoom, 3.0);
    }

    #[test]
    fn rejects_bad_config() {
        let err = EngineConfig::from_json(r#"{"map_settings":{"cluster_distance_meters":0}}"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::from_json(r#"{"map_settings":{"min_zoom":21}}"#).unwrap_err();
        assert!(err.to_string().contains("zoom bounds"));

        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn marker_id_roundtrip() {
        assert_eq!(MarkerId::new(7).as_u32(), 7);
    }
}
