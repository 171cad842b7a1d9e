// Map layers: the base map choice plus the road and traffic overlays.
// The state is a plain value; the widget pushes it to the SDK one tile layer at a time.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Base map under the markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseLayer {
    #[default]
    Normal,
    Satellite,
}

/// Switchable overlay drawn over the base map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overlay {
    Road,
    Traffic,
}

/// A tile layer on the map SDK side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapLayer {
    Satellite,
    RoadNet,
    Traffic,
}

impl MapLayer {
    /// Update order. Each step after the first waits one stagger interval.
    pub const ALL: [MapLayer; 3] = [MapLayer::Satellite, MapLayer::RoadNet, MapLayer::Traffic];
}

impl FromStr for BaseLayer {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(BaseLayer::Normal),
            "satellite" => Ok(BaseLayer::Satellite),
            other => Err(EngineError::UnknownLayer(other.to_string())),
        }
    }
}

impl FromStr for Overlay {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "road" => Ok(Overlay::Road),
            "traffic" => Ok(Overlay::Traffic),
            other => Err(EngineError::UnknownLayer(other.to_string())),
        }
    }
}

/// Which layers the user asked for. Starts on the normal map with no overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LayerState {
    pub base: BaseLayer,
    pub road: bool,
    pub traffic: bool,
}

impl LayerState {
    pub fn select_base(self, base: BaseLayer) -> Self {
        LayerState { base, ..self }
    }

    pub fn set_overlay(self, overlay: Overlay, on: bool) -> Self {
        match overlay {
            Overlay::Road => LayerState { road: on, ..self },
            Overlay::Traffic => LayerState { traffic: on, ..self },
        }
    }

    pub fn toggle(self, overlay: Overlay) -> Self {
        self.set_overlay(overlay, !self.overlay(overlay))
    }

    pub fn overlay(&self, overlay: Overlay) -> bool {
        match overlay {
            Overlay::Road => self.road,
            Overlay::Traffic => self.traffic,
        }
    }

    pub fn is_visible(&self, layer: MapLayer) -> bool {
        match layer {
            MapLayer::Satellite => self.base == BaseLayer::Satellite,
            MapLayer::RoadNet => self.road,
            MapLayer::Traffic => self.traffic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_plain() {
        let state = LayerState::default();
        assert_eq!(state.base, BaseLayer::Normal);
        assert!(MapLayer::ALL.iter().all(|l| !state.is_visible(*l)));
    }

    #[test]
    fn base_choice_keeps_overlays() {
        let state = LayerState::default()
            .toggle(Overlay::Traffic)
            .select_base(BaseLayer::Satellite);
        assert!(state.is_visible(MapLayer::Satellite));
        assert!(state.is_visible(MapLayer::Traffic));
        assert!(!state.is_visible(MapLayer::RoadNet));

        let state = state.select_base(BaseLayer::Normal);
        assert!(!state.is_visible(MapLayer::Satellite));
        assert!(state.traffic);
    }

    #[test]
    fn toggle_flips_one_overlay() {
        let state = LayerState::default().toggle(Overlay::Road);
        assert!(state.road);
        assert!(!state.traffic);
        assert_eq!(state.toggle(Overlay::Road), LayerState::default());
        assert!(state.set_overlay(Overlay::Road, true).road);
    }

    #[test]
    fn names_parse() {
        assert_eq!("satellite".parse::<BaseLayer>().unwrap(), BaseLayer::Satellite);
        assert_eq!("traffic".parse::<Overlay>().unwrap(), Overlay::Traffic);
        assert!(matches!(
            "terrain".parse::<Overlay>(),
            Err(EngineError::UnknownLayer(name)) if name == "terrain"
        ));
        assert!("road".parse::<BaseLayer>().is_err());
    }
}
