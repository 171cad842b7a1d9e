// Marker placement: pick clustered or individual mode from the zoom level,
// build marker content, place markers through the map surface, and remember
// what each marker stands for so clicks can be dispatched.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cluster::{cluster, Geotagged};
use crate::geo::{Bounds, LngLat};
use crate::info_window::escape_html;
use crate::sdk::{MapSurface, MarkerSpec};
use crate::source::FootprintSpec;
use crate::types::{MapSettings, MarkerId};

/// How a render pass lays out markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderMode {
    Clustered,
    Individual,
}

impl RenderMode {
    pub fn for_zoom(zoom: f64, settings: &MapSettings) -> Self {
        if zoom < settings.cluster_zoom_threshold {
            RenderMode::Clustered
        } else {
            RenderMode::Individual
        }
    }
}

/// Visual size bucket of a cluster badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BadgeTier {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl BadgeTier {
    pub fn for_count(count: usize) -> Self {
        match count {
            n if n >= 100 => BadgeTier::ExtraLarge,
            n if n >= 50 => BadgeTier::Large,
            n if n >= 10 => BadgeTier::Medium,
            _ => BadgeTier::Small,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            BadgeTier::Small => "likcc-footprint-cluster-small",
            BadgeTier::Medium => "likcc-footprint-cluster-medium",
            BadgeTier::Large => "likcc-footprint-cluster-large",
            BadgeTier::ExtraLarge => "likcc-footprint-cluster-xlarge",
        }
    }
}

/// CSS class toggled on a cluster badge while it pulses.
pub const PULSE_CLASS: &str = "likcc-footprint-cluster-pulse";

/// What a marker looks like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum MarkerContent {
    /// Round photo marker for a single footprint.
    Photo { image_url: String },
    /// Numbered badge for a cluster.
    Badge { count: usize, tier: BadgeTier },
}

impl MarkerContent {
    /// HTML handed to the SDK as custom marker content.
    pub fn to_html(&self, title: &str) -> String {
        match self {
            MarkerContent::Photo { image_url } => format!(
                r#"<div class="custom-marker"><div class="marker-image"><img src="{}" alt="{}"></div></div>"#,
                escape_html(image_url),
                escape_html(title)
            ),
            MarkerContent::Badge { count, tier } => format!(
                r#"<div class="likcc-footprint-cluster-marker {}">{}<div class="likcc-footprint-cluster-pointer"></div></div>"#,
                tier.css_class(),
                count
            ),
        }
    }
}

/// What clicking a marker acts on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum MarkerTarget {
    Singleton {
        footprint: FootprintSpec,
        position: LngLat,
    },
    Cluster {
        count: usize,
        center: LngLat,
        bounds: Bounds,
        tier: BadgeTier,
    },
}

impl MarkerTarget {
    pub fn position(&self) -> LngLat {
        match self {
            MarkerTarget::Singleton { position, .. } => *position,
            MarkerTarget::Cluster { center, .. } => *center,
        }
    }

    /// Build the SDK-facing marker description.
    pub fn marker_spec(&self, settings: &MapSettings) -> MarkerSpec {
        match self {
            MarkerTarget::Singleton { footprint, position } => {
                let image_url = footprint
                    .image
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(settings.placeholder_image.as_str())
                    .to_string();
                let title = if footprint.name.is_empty() {
                    "足迹标记".to_string()
                } else {
                    footprint.name.clone()
                };
                MarkerSpec {
                    position: *position,
                    content: MarkerContent::Photo { image_url },
                    title,
                }
            }
            MarkerTarget::Cluster {
                count,
                center,
                tier,
                ..
            } => MarkerSpec {
                position: *center,
                content: MarkerContent::Badge {
                    count: *count,
                    tier: *tier,
                },
                title: format!("{} footprints", count),
            },
        }
    }
}

/// Marker layout for one render pass, before anything touches the map.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPlan {
    pub mode: RenderMode,
    pub targets: Vec<MarkerTarget>,
}

/// Decide the mode for `zoom` and lay out one target per marker.
pub fn plan_markers(footprints: &[FootprintSpec], zoom: f64, settings: &MapSettings) -> RenderPlan {
    let mode = RenderMode::for_zoom(zoom, settings);

    let targets = match mode {
        RenderMode::Clustered => cluster(footprints, settings.cluster_distance_meters)
            .into_iter()
            .filter_map(|c| {
                if c.is_singleton() {
                    let footprint = c.members.into_iter().next()?;
                    // The member's own coordinate, not the centroid.
                    let position = footprint.position()?;
                    Some(MarkerTarget::Singleton { footprint, position })
                } else {
                    let count = c.count();
                    Some(MarkerTarget::Cluster {
                        count,
                        center: c.center,
                        bounds: c.bounds,
                        tier: BadgeTier::for_count(count),
                    })
                }
            })
            .collect(),
        RenderMode::Individual => footprints
            .iter()
            .filter_map(|fp| match fp.position() {
                Some(position) => Some(MarkerTarget::Singleton {
                    footprint: fp.clone(),
                    position,
                }),
                None => {
                    warn!(
                        name = %fp.name,
                        longitude = ?fp.longitude,
                        latitude = ?fp.latitude,
                        "skipping footprint with invalid coordinates"
                    );
                    None
                }
            })
            .collect(),
    };

    RenderPlan { mode, targets }
}

/// Markers currently on the map and what each one stands for.
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    mode: Option<RenderMode>,
    entries: BTreeMap<MarkerId, MarkerTarget>,
}

impl MarkerRegistry {
    pub fn get(&self, id: MarkerId) -> Option<&MarkerTarget> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mode of the pass that produced these markers.
    pub fn mode(&self) -> Option<RenderMode> {
        self.mode
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &MarkerTarget)> {
        self.entries.iter().map(|(id, target)| (*id, target))
    }
}

/// Place markers for `footprints` at `zoom`.
///
/// A marker the SDK refuses to create is logged and skipped; the rest still render.
pub fn render<M: MapSurface + ?Sized>(
    map: &M,
    footprints: &[FootprintSpec],
    zoom: f64,
    settings: &MapSettings,
) -> MarkerRegistry {
    let plan = plan_markers(footprints, zoom, settings);
    let mut registry = MarkerRegistry {
        mode: Some(plan.mode),
        entries: BTreeMap::new(),
    };

    for target in plan.targets {
        let spec = target.marker_spec(settings);
        match map.add_marker(&spec) {
            Ok(id) => {
                registry.entries.insert(id, target);
            }
            Err(err) => {
                warn!(error = %err, title = %spec.title, "failed to create marker");
            }
        }
    }

    debug!(
        mode = ?plan.mode,
        zoom,
        markers = registry.len(),
        "rendered footprint markers"
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{footprint, FakeMap};

    fn chengdu_and_wuhan() -> Vec<FootprintSpec> {
        vec![
            footprint("a", 104.0660, 30.5720),
            footprint("b", 104.0750, 30.5800),
            footprint("c", 104.0800, 30.5650),
            footprint("d", 104.0700, 30.5600),
            footprint("e", 109.2000, 30.5700),
        ]
    }

    #[test]
    fn zoom_threshold_boundary() {
        let settings = MapSettings::default();
        assert_eq!(RenderMode::for_zoom(5.0, &settings), RenderMode::Clustered);
        assert_eq!(RenderMode::for_zoom(5.99, &settings), RenderMode::Clustered);
        assert_eq!(RenderMode::for_zoom(6.0, &settings), RenderMode::Individual);
        assert_eq!(RenderMode::for_zoom(18.0, &settings), RenderMode::Individual);
    }

    #[test]
    fn badge_tiers() {
        assert_eq!(BadgeTier::for_count(2), BadgeTier::Small);
        assert_eq!(BadgeTier::for_count(9), BadgeTier::Small);
        assert_eq!(BadgeTier::for_count(10), BadgeTier::Medium);
        assert_eq!(BadgeTier::for_count(49), BadgeTier::Medium);
        assert_eq!(BadgeTier::for_count(50), BadgeTier::Large);
        assert_eq!(BadgeTier::for_count(99), BadgeTier::Large);
        assert_eq!(BadgeTier::for_count(100), BadgeTier::ExtraLarge);
        assert_eq!(BadgeTier::for_count(5000), BadgeTier::ExtraLarge);
    }

    #[test]
    fn clustered_plan_at_low_zoom() {
        let plan = plan_markers(&chengdu_and_wuhan(), 4.0, &MapSettings::default());
        assert_eq!(plan.mode, RenderMode::Clustered);
        assert_eq!(plan.targets.len(), 2);

        match &plan.targets[0] {
            MarkerTarget::Cluster { count, tier, bounds, .. } => {
                assert_eq!(*count, 4);
                assert_eq!(*tier, BadgeTier::Small);
                assert_eq!(bounds.min_lng, 104.0660);
                assert_eq!(bounds.max_lng, 104.0800);
            }
            other => panic!("expected a cluster, got {:?}", other),
        }
        match &plan.targets[1] {
            MarkerTarget::Singleton { footprint, position } => {
                assert_eq!(footprint.name, "e");
                assert_eq!(*position, LngLat::new(109.2, 30.57));
            }
            other => panic!("expected a singleton, got {:?}", other),
        }
    }

    #[test]
    fn individual_plan_skips_invalid_points() {
        let mut footprints = chengdu_and_wuhan();
        footprints.push(FootprintSpec {
            name: "broken".to_string(),
            longitude: None,
            latitude: Some(1.0),
            ..Default::default()
        });

        let plan = plan_markers(&footprints, 6.0, &MapSettings::default());
        assert_eq!(plan.mode, RenderMode::Individual);
        assert_eq!(plan.targets.len(), 5);
        assert!(plan
            .targets
            .iter()
            .all(|t| matches!(t, MarkerTarget::Singleton { .. })));
    }

    #[test]
    fn render_registers_placed_markers() {
        let map = FakeMap::new(4.0);
        let registry = render(&map, &chengdu_and_wuhan(), 4.0, &MapSettings::default());

        assert_eq!(registry.mode(), Some(RenderMode::Clustered));
        assert_eq!(registry.len(), 2);
        assert_eq!(map.marker_count(), 2);
        for (id, target) in registry.iter() {
            assert_eq!(map.marker_position(id), Some(target.position()));
        }
    }

    #[test]
    fn render_survives_marker_failures() {
        let map = FakeMap::new(10.0);
        map.fail_marker_titled("b");

        let registry = render(&map, &chengdu_and_wuhan(), 10.0, &MapSettings::default());

        assert_eq!(registry.len(), 4);
        assert!(registry.iter().all(|(_, t)| match t {
            MarkerTarget::Singleton { footprint, .. } => footprint.name != "b",
            MarkerTarget::Cluster { .. } => false,
        }));
    }

    #[test]
    fn marker_html() {
        let badge = MarkerContent::Badge {
            count: 57,
            tier: BadgeTier::Large,
        };
        let html = badge.to_html("57 footprints");
        assert!(html.contains("likcc-footprint-cluster-large"));
        assert!(html.contains(">57<"));

        let photo = MarkerContent::Photo {
            image_url: "https://example.com/x.jpg".to_string(),
        };
        let html = photo.to_html("Tom & Jerry");
        assert!(html.contains(r#"src="https://example.com/x.jpg""#));
        assert!(html.contains(r#"alt="Tom &amp; Jerry""#));
    }

    #[test]
    fn singleton_marker_falls_back_to_placeholder() {
        let settings = MapSettings::default();
        let target = MarkerTarget::Singleton {
            footprint: footprint("", 1.0, 2.0),
            position: LngLat::new(1.0, 2.0),
        };
        let spec = target.marker_spec(&settings);
        assert_eq!(spec.title, "足迹标记");
        assert_eq!(
            spec.content,
            MarkerContent::Photo {
                image_url: settings.placeholder_image.clone()
            }
        );
    }
}
