//! Spatial declustering for markers that share near-identical coordinates.
//!
//! Finds are bucketed by coordinates rounded to 5 decimal places. A bucket of
//! one renders at its true position. A bucket of N > 1 spreads its members on
//! a small circle around each member's own point:
//!
//! ```text
//! radius = 0.0004 + N * 0.0001      (degrees)
//! angle  = 2π * index / N
//! render = (lat + radius * cos(angle), lng + radius * sin(angle))
//! ```
//!
//! `index` is the member's zero-based position within its bucket, in the
//! order the bucket's members appear in the input. The layout is therefore a
//! pure function of the input sequence: same order in, same positions out.

use std::collections::HashMap;
use std::f64::consts::TAU;

use dewmap_common::{CoordKey, Find, GeoPoint};

pub const BASE_RADIUS_DEG: f64 = 0.0004;
pub const RADIUS_STEP_DEG: f64 = 0.0001;

/// A find paired with the position its marker is drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFind {
    pub find: Find,
    pub render: GeoPoint,
    /// Members sharing this find's bucket, including itself.
    pub cluster_size: usize,
    pub cluster_index: usize,
}

impl PlacedFind {
    pub fn is_jittered(&self) -> bool {
        self.cluster_size > 1
    }
}

impl AsRef<Find> for PlacedFind {
    fn as_ref(&self) -> &Find {
        &self.find
    }
}

/// Circle radius for a bucket of `n` members.
pub fn jitter_radius(n: usize) -> f64 {
    BASE_RADIUS_DEG + n as f64 * RADIUS_STEP_DEG
}

/// Render position of member `index` of a bucket of `n` around `origin`.
pub fn jitter_position(origin: GeoPoint, index: usize, n: usize) -> GeoPoint {
    if n <= 1 {
        return origin;
    }
    let radius = jitter_radius(n);
    let angle = TAU * index as f64 / n as f64;
    GeoPoint::new(
        origin.lat + radius * angle.cos(),
        origin.lng + radius * angle.sin(),
    )
}

/// Ephemeral per-call bucket: member positions in first-seen order.
#[derive(Default)]
struct ClusterBucket {
    members: Vec<usize>,
}

/// Assign every find a render position. Output order matches input order.
pub fn decluster(finds: &[Find]) -> Vec<PlacedFind> {
    let mut buckets: HashMap<CoordKey, ClusterBucket> = HashMap::new();
    for (pos, find) in finds.iter().enumerate() {
        buckets
            .entry(find.point().bucket_key())
            .or_default()
            .members
            .push(pos);
    }

    // (index within bucket, bucket size) per input position
    let mut slots = vec![(0usize, 1usize); finds.len()];
    for bucket in buckets.values() {
        let n = bucket.members.len();
        for (index, &pos) in bucket.members.iter().enumerate() {
            slots[pos] = (index, n);
        }
    }

    finds
        .iter()
        .zip(slots)
        .map(|(find, (index, n))| PlacedFind {
            find: find.clone(),
            render: jitter_position(find.point(), index, n),
            cluster_size: n,
            cluster_index: index,
        })
        .collect()
}
