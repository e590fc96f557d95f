//! Split a bounding box into a grid of smaller tiles.

use rooftally_core::Bbox;

/// Tiles of at most `step` degrees on each side covering `bbox`, row by row
/// from the south-west corner.
///
/// A degenerate box yields itself. A non-positive or non-finite `step` yields
/// the whole box as one tile.
#[must_use]
pub fn partition_bbox(bbox: &Bbox, step: f64) -> Vec<Bbox> {
    if !step.is_finite() || step <= 0.0 {
        return vec![*bbox];
    }
    let lon_edges = edges(bbox.min_lon(), bbox.max_lon(), step);
    let lat_edges = edges(bbox.min_lat(), bbox.max_lat(), step);

    let mut tiles = Vec::with_capacity((lon_edges.len() - 1) * (lat_edges.len() - 1));
    for lat in lat_edges.windows(2) {
        for lon in lon_edges.windows(2) {
            if let Ok(tile) = Bbox::new(lon[0], lat[0], lon[1], lat[1]) {
                tiles.push(tile);
            }
        }
    }
    tiles
}

fn edges(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut out = vec![min];
    let mut next = min + step;
    while next < max {
        out.push(next);
        next += step;
    }
    out.push(max);
    out
}
