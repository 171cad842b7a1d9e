// Greedy single-pass clustering over a longitude-sorted point list.
// O(n^2) distance checks in the worst case; the longitude pre-filter skips most far pairs.
// Absorption is measured against the seed's fixed position, not the moving centroid.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::geo::{distance, Bounds, LngLat, METERS_PER_DEGREE};

/// Anything with an optional map position.
pub trait Geotagged {
    /// `None` when the coordinates are missing or not finite.
    fn position(&self) -> Option<LngLat>;
}

impl Geotagged for LngLat {
    fn position(&self) -> Option<LngLat> {
        self.is_finite().then_some(*self)
    }
}

/// A group of nearby points, recomputed on every render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<P> {
    /// Running centroid of the members.
    pub center: LngLat,
    /// Members in discovery order; the seed comes first.
    pub members: Vec<P>,
    pub bounds: Bounds,
}

impl<P> Cluster<P> {
    fn seeded(point: P, at: LngLat) -> Self {
        Cluster {
            center: at,
            members: vec![point],
            bounds: Bounds::from_point(at),
        }
    }

    fn absorb(&mut self, point: P, at: LngLat) {
        self.members.push(point);
        let n = self.members.len() as f64;
        self.center = LngLat::new(
            (self.center.lng * (n - 1.0) + at.lng) / n,
            (self.center.lat * (n - 1.0) + at.lat) / n,
        );
        self.bounds.extend(at);
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

// JSON shape: `{ center, count, members, bounds }`.
impl<P: Serialize> Serialize for Cluster<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Cluster", 4)?;
        state.serialize_field("center", &self.center)?;
        state.serialize_field("count", &self.count())?;
        state.serialize_field("members", &self.members)?;
        state.serialize_field("bounds", &self.bounds)?;
        state.end()
    }
}

/// Partition `points` into clusters of radius `threshold_meters` around each seed.
///
/// Points without a valid position are dropped. The result is deterministic for a
/// given input order: ties in longitude keep their original relative order.
pub fn cluster<P: Geotagged + Clone>(points: &[P], threshold_meters: f64) -> Vec<Cluster<P>> {
    let mut located: Vec<(LngLat, &P)> = points
        .iter()
        .filter_map(|p| p.position().map(|at| (at, p)))
        .collect();
    located.sort_by(|a, b| a.0.lng.total_cmp(&b.0.lng));

    let max_lng_delta = threshold_meters / METERS_PER_DEGREE;
    let mut assigned = vec![false; located.len()];
    let mut clusters = Vec::new();

    for i in 0..located.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let (seed, point) = located[i];
        let mut current = Cluster::seeded(point.clone(), seed);

        // Every earlier index is already assigned, either as a seed or as a member.
        for j in (i + 1)..located.len() {
            if assigned[j] {
                continue;
            }
            let (other, other_point) = located[j];
            if (other.lng - seed.lng).abs() > max_lng_delta {
                continue;
            }
            if distance(seed, other) <= threshold_meters {
                current.absorb(other_point.clone(), other);
                assigned[j] = true;
            }
        }

        clusters.push(current);
    }

    clusters
}
