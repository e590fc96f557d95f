//! Decoding of GeoJSON `FeatureCollection` responses into footprints.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use rooftally_core::{Footprint, SourceError};
use serde::Deserialize;
use serde_json::{Map, Value};

type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Unsupported,
}

/// Decode a GeoJSON `FeatureCollection` body.
///
/// Features without polygonal geometry are skipped. The footprint id is the
/// feature `id`, then `properties.id`, then the first vertex as `lon,lat`.
pub fn parse_feature_collection(body: &str) -> Result<Vec<Footprint>, SourceError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|err| SourceError::Parse {
            message: err.to_string(),
        })?;
    if collection.kind != "FeatureCollection" {
        return Err(SourceError::Parse {
            message: format!("expected a FeatureCollection, got {}", collection.kind),
        });
    }
    Ok(collection
        .features
        .into_iter()
        .filter_map(into_footprint)
        .collect())
}

fn into_footprint(feature: Feature) -> Option<Footprint> {
    let geometry = match feature.geometry? {
        Geometry::Polygon { coordinates } => MultiPolygon::new(vec![polygon(coordinates)?]),
        Geometry::MultiPolygon { coordinates } => {
            MultiPolygon::new(coordinates.into_iter().filter_map(polygon).collect())
        }
        Geometry::Unsupported => return None,
    };
    if geometry.0.is_empty() {
        return None;
    }
    let id = feature
        .id
        .as_ref()
        .and_then(id_text)
        .or_else(|| {
            feature
                .properties
                .as_ref()
                .and_then(|props| props.get("id"))
                .and_then(id_text)
        })
        .or_else(|| first_vertex_id(&geometry))?;
    Some(Footprint::new(id, geometry))
}

fn polygon(rings: Vec<Ring>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter().map(line_string);
    let exterior = rings.next()?;
    if exterior.0.len() < 3 {
        return None;
    }
    Some(Polygon::new(exterior, rings.collect()))
}

fn line_string(ring: Ring) -> LineString<f64> {
    ring.into_iter()
        .filter_map(|position| match position.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect()
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn first_vertex_id(geometry: &MultiPolygon<f64>) -> Option<String> {
    let first = geometry.0.first()?.exterior().0.first()?;
    Some(format!("{},{}", first.x, first.y))
}
