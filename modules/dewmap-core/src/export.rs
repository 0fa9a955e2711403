//! GeoJSON rendering of placed finds.

use serde_json::{json, Value};

use crate::decluster::PlacedFind;

/// One `Point` feature per find, at its render (declustered) position.
pub fn to_geojson(placed: &[PlacedFind]) -> Value {
    let features: Vec<Value> = placed
        .iter()
        .map(|p| {
            json!({
                "type": "Feature",
                "id": p.find.id,
                "geometry": {
                    "type": "Point",
                    "coordinates": [p.render.lng, p.render.lat],
                },
                "properties": {
                    "flavor": p.find.flavor,
                    "size": p.find.size,
                    "locationName": p.find.location_name,
                    "address": p.find.address,
                    "createdAt": p.find.created_at.to_rfc3339(),
                    "clusterSize": p.cluster_size,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
